//! Builders shared by the reconciler tests.

use mockall::predicate::eq;
use osc_capi_core::resources::crd::v1beta1::osccluster::{OscNet, OscNetwork, OscNetworkResources};

use crate::cloud::{
    error::CloudError,
    tag::{MockTagService, Tag},
};

use super::scope::ClusterScope;

pub const NET_ID: &str = "vpc-test-net-uid";

pub fn generic_error(message: &str) -> CloudError {
    CloudError::Other(message.to_owned())
}

/// `test-net` in `10.0.0.0/16` for cluster `test-cluster`, other sections defaulted
pub fn test_network() -> OscNetwork {
    OscNetwork {
        cluster_name: Some("test-cluster".to_owned()),
        net: OscNet {
            name: "test-net".to_owned(),
            ip_range: "10.0.0.0/16".to_owned(),
            resource_id: None,
        },
        ..Default::default()
    }
}

pub fn new_scope(network: &OscNetwork) -> ClusterScope {
    ClusterScope::new("uid", network, OscNetworkResources::default())
}

/// scope whose net was already created
pub fn scope_with_net(network: &OscNetwork) -> ClusterScope {
    let mut scope = new_scope(network);
    scope.resources.net_ref.set("test-net-uid", NET_ID);
    scope.resources.managed_by.mark_capi(NET_ID);
    scope
}

pub fn expect_untagged(tags: &mut MockTagService, name: &'static str) {
    tags.expect_read_tag()
        .with(eq("Name"), eq(name))
        .times(1)
        .returning(|_, _| Ok(None));
}

pub fn expect_tagged(tags: &mut MockTagService, name: &'static str, resource_id: &'static str) {
    tags.expect_read_tag()
        .with(eq("Name"), eq(name))
        .times(1)
        .returning(move |key, value| {
            Ok(Some(Tag {
                key: key.to_owned(),
                value: value.to_owned(),
                resource_id: resource_id.to_owned(),
                resource_type: String::new(),
            }))
        });
}

pub fn failing_tags() -> MockTagService {
    let mut tags = MockTagService::new();
    tags.expect_read_tag()
        .returning(|_, _| Err(generic_error("ReadTag generic error")));
    tags
}
