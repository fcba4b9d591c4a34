use log::{debug, info};
use osc_capi_core::resources::labels::NAME_TAG_KEY;

use crate::cloud::{
    public_ip::PublicIpService,
    tag::{cluster_resource_tags, TagService},
};

use super::{
    error::ReconcilerError,
    scope::{adopt_resource_id, forget_resource, record_untagged, retag_resource, ClusterScope},
};

pub async fn reconcile_public_ip(
    scope: &mut ClusterScope,
    public_ips: &dyn PublicIpService,
    tags: &dyn TagService,
) -> Result<(), ReconcilerError> {
    let cluster_name = scope.cluster_name();

    for public_ip_spec in scope.network.public_ips.clone() {
        let public_ip_name = scope.suffixed(&public_ip_spec.name);
        let tag = tags
            .read_tag(NAME_TAG_KEY, &public_ip_name)
            .await
            .map_err(ReconcilerError::cloud("cannot get tag"))?;
        let public_ip_id = adopt_resource_id(
            &mut scope.resources.public_ip_ref,
            &mut scope.resources.managed_by,
            &public_ip_name,
            public_ip_spec.resource_id.as_deref(),
            tag.as_ref().map(|tag| tag.resource_id.as_str()),
        );

        if let Some(public_ip_id) = public_ip_id {
            let public_ip = public_ips
                .get_public_ip(&public_ip_id)
                .await
                .map_err(ReconcilerError::cloud("cannot read publicip"))?;

            if let Some(public_ip) = public_ip {
                debug!("Public ip {public_ip_name} is {}", public_ip.public_ip);
                retag_resource(
                    tags,
                    tag.as_ref(),
                    &scope.resources.managed_by,
                    &public_ip_id,
                    cluster_resource_tags(&cluster_name, &public_ip_name),
                )
                .await?;
                continue;
            }
        }

        info!("Allocating public ip {public_ip_name}...");

        let public_ip = public_ips
            .create_public_ip(&cluster_name, &public_ip_name)
            .await
            .map_err(record_untagged(
                &mut scope.resources.public_ip_ref,
                &mut scope.resources.managed_by,
                &public_ip_name,
            ))
            .map_err(ReconcilerError::cloud("cannot create publicip"))?;

        scope
            .resources
            .public_ip_ref
            .set(&public_ip_name, &public_ip.public_ip_id);
        scope.resources.managed_by.mark_capi(&public_ip.public_ip_id);
    }

    Ok(())
}

pub async fn reconcile_delete_public_ip(
    scope: &mut ClusterScope,
    public_ips: &dyn PublicIpService,
) -> Result<(), ReconcilerError> {
    for public_ip_spec in scope.network.public_ips.clone() {
        let public_ip_name = scope.suffixed(&public_ip_spec.name);
        let Some(public_ip_id) = scope
            .resources
            .public_ip_ref
            .try_get(&public_ip_name)
            .map(str::to_owned)
        else {
            continue;
        };

        if scope.resources.managed_by.is_external(&public_ip_id) {
            info!("Keeping public ip {public_ip_id}, it isn't managed by the cluster");
        } else if public_ips
            .get_public_ip(&public_ip_id)
            .await
            .map_err(ReconcilerError::cloud("cannot read publicip"))?
            .is_none()
        {
            info!("Public ip {public_ip_name} is already released");
        } else {
            info!("Releasing public ip {public_ip_name}...");

            public_ips
                .delete_public_ip(&public_ip_id)
                .await
                .map_err(ReconcilerError::cloud("cannot delete publicip"))?;
        }

        forget_resource(
            &mut scope.resources.public_ip_ref,
            &mut scope.resources.managed_by,
            &public_ip_name,
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use osc_capi_core::resources::crd::v1beta1::osccluster::{OscNetwork, OscPublicIp};

    use crate::{
        cloud::{
            error::CloudError,
            public_ip::{MockPublicIpService, PublicIp},
            tag::{cluster_resource_tags, MockTagService},
        },
        cluster::reconciler::{
            fixtures::{
                expect_tagged, expect_untagged, failing_tags, generic_error, new_scope,
                test_network,
            },
            scope::ClusterScope,
        },
    };

    use super::{reconcile_delete_public_ip, reconcile_public_ip};

    const PUBLIC_IP_ID: &str = "eipalloc-test-publicip-uid";

    fn network() -> OscNetwork {
        OscNetwork {
            public_ips: vec![OscPublicIp {
                name: "test-publicip".to_owned(),
                resource_id: None,
            }],
            ..test_network()
        }
    }

    fn public_ip() -> PublicIp {
        PublicIp {
            public_ip_id: PUBLIC_IP_ID.to_owned(),
            public_ip: "192.0.2.10".to_owned(),
            link_public_ip_id: None,
        }
    }

    fn referenced_scope() -> ClusterScope {
        let mut scope = new_scope(&network());
        scope
            .resources
            .public_ip_ref
            .set("test-publicip-uid", PUBLIC_IP_ID);
        scope.resources.managed_by.mark_capi(PUBLIC_IP_ID);
        scope
    }

    #[tokio::test]
    async fn public_ip_is_allocated_once() {
        let mut scope = new_scope(&network());
        let mut public_ips = MockPublicIpService::new();
        let mut tags = MockTagService::new();

        expect_untagged(&mut tags, "test-publicip-uid");
        public_ips
            .expect_create_public_ip()
            .with(eq("test-cluster-uid"), eq("test-publicip-uid"))
            .times(1)
            .returning(|_, _| Ok(public_ip()));

        reconcile_public_ip(&mut scope, &public_ips, &tags)
            .await
            .unwrap();

        assert_eq!(
            scope.resources.public_ip_ref.get("test-publicip-uid"),
            Ok(PUBLIC_IP_ID)
        );

        let mut tags = MockTagService::new();
        expect_tagged(&mut tags, "test-publicip-uid", PUBLIC_IP_ID);
        public_ips.checkpoint();
        public_ips
            .expect_get_public_ip()
            .with(eq(PUBLIC_IP_ID))
            .times(1)
            .returning(|_| Ok(Some(public_ip())));
        public_ips.expect_create_public_ip().never();

        reconcile_public_ip(&mut scope, &public_ips, &tags)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn public_ip_allocated_without_tags_is_not_allocated_again() {
        let mut scope = new_scope(&network());
        let mut public_ips = MockPublicIpService::new();
        let mut tags = MockTagService::new();

        expect_untagged(&mut tags, "test-publicip-uid");
        public_ips
            .expect_create_public_ip()
            .times(1)
            .returning(|_, _| {
                Err(CloudError::untagged(PUBLIC_IP_ID)(generic_error(
                    "CreateTags generic error",
                )))
            });

        reconcile_public_ip(&mut scope, &public_ips, &tags)
            .await
            .unwrap_err();

        assert_eq!(
            scope.resources.public_ip_ref.get("test-publicip-uid"),
            Ok(PUBLIC_IP_ID)
        );

        let mut tags = MockTagService::new();
        expect_untagged(&mut tags, "test-publicip-uid");
        tags.expect_create_resource_tags()
            .with(
                eq(PUBLIC_IP_ID),
                eq(cluster_resource_tags("test-cluster-uid", "test-publicip-uid")),
            )
            .times(1)
            .returning(|_, _| Ok(()));
        public_ips.checkpoint();
        public_ips
            .expect_get_public_ip()
            .returning(|_| Ok(Some(public_ip())));
        public_ips.expect_create_public_ip().never();

        reconcile_public_ip(&mut scope, &public_ips, &tags)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn public_ip_failures_are_reported() {
        let error = reconcile_public_ip(
            &mut new_scope(&network()),
            &MockPublicIpService::new(),
            &failing_tags(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.to_string(), "cannot get tag: ReadTag generic error");

        let mut public_ips = MockPublicIpService::new();
        let mut tags = MockTagService::new();
        expect_untagged(&mut tags, "test-publicip-uid");
        public_ips
            .expect_get_public_ip()
            .returning(|_| Err(generic_error("GetPublicIp generic error")));
        let error = reconcile_public_ip(&mut referenced_scope(), &public_ips, &tags)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot read publicip: GetPublicIp generic error"
        );

        let mut public_ips = MockPublicIpService::new();
        let mut tags = MockTagService::new();
        expect_untagged(&mut tags, "test-publicip-uid");
        public_ips
            .expect_create_public_ip()
            .returning(|_, _| Err(generic_error("CreatePublicIp generic error")));
        let error = reconcile_public_ip(&mut new_scope(&network()), &public_ips, &tags)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot create publicip: CreatePublicIp generic error"
        );
    }

    #[tokio::test]
    async fn delete_releases_owned_public_ips() {
        let mut scope = referenced_scope();
        let mut public_ips = MockPublicIpService::new();

        public_ips
            .expect_get_public_ip()
            .returning(|_| Ok(Some(public_ip())));
        public_ips
            .expect_delete_public_ip()
            .with(eq(PUBLIC_IP_ID))
            .times(1)
            .returning(|_| Ok(()));

        reconcile_delete_public_ip(&mut scope, &public_ips)
            .await
            .unwrap();

        assert!(scope.resources.public_ip_ref.is_empty());
    }

    #[tokio::test]
    async fn delete_failure_is_reported() {
        let mut scope = referenced_scope();
        let mut public_ips = MockPublicIpService::new();

        public_ips
            .expect_get_public_ip()
            .returning(|_| Ok(Some(public_ip())));
        public_ips
            .expect_delete_public_ip()
            .returning(|_| Err(generic_error("DeletePublicIp generic error")));

        let error = reconcile_delete_public_ip(&mut scope, &public_ips)
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "cannot delete publicip: DeletePublicIp generic error"
        );
    }
}
