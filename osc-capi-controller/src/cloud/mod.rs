//! Outscale API seam
//!
//! Every resource family is exposed as a small trait so the reconcilers can be exercised
//! against mocks. [`client::OscClient`] implements all of them over the OAPI REST interface.

use serde::{Deserialize, Serialize};

use self::{
    client::OscClient, internet_service::InternetServiceService,
    load_balancer::LoadBalancerService, nat_service::NatServiceService, net::NetService,
    public_ip::PublicIpService, route_table::RouteTableService,
    security_group::SecurityGroupService, subnet::SubnetService, tag::TagService,
};

pub mod client;
pub mod error;
pub mod internet_service;
pub mod load_balancer;
pub mod nat_service;
pub mod net;
pub mod public_ip;
pub mod route_table;
pub mod security_group;
pub mod signer;
pub mod subnet;
pub mod tag;
pub mod vm;

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct ResourceTag {
    pub key: String,
    pub value: String,
}

impl ResourceTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Serialize, Debug, Default)]
pub(crate) struct EmptyRequest {}

#[derive(Deserialize, Debug)]
pub(crate) struct IgnoredResponse {}

/// Borrowed set of services a cluster reconciliation pass talks to.
pub struct CloudServices<'a> {
    pub net: &'a dyn NetService,
    pub subnet: &'a dyn SubnetService,
    pub internet_service: &'a dyn InternetServiceService,
    pub public_ip: &'a dyn PublicIpService,
    pub nat_service: &'a dyn NatServiceService,
    pub route_table: &'a dyn RouteTableService,
    pub security_group: &'a dyn SecurityGroupService,
    pub load_balancer: &'a dyn LoadBalancerService,
    pub tag: &'a dyn TagService,
}

impl<'a> CloudServices<'a> {
    pub fn from_client(client: &'a OscClient) -> Self {
        Self {
            net: client,
            subnet: client,
            internet_service: client,
            public_ip: client,
            nat_service: client,
            route_table: client,
            security_group: client,
            load_balancer: client,
            tag: client,
        }
    }
}
