use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::resources::{
    conditions::Condition,
    refs::{ManagedBy, ResourceReference},
};

#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "OscCluster",
    namespaced,
    status = "OscClusterStatus",
    derive = "Default",
    printcolumn = r#"{"name":"Ready", "type":"boolean", "jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Endpoint", "type":"string", "jsonPath":".spec.controlPlaneEndpoint.host"}"#
)]
pub struct OscClusterSpec {
    /// desired network topology, empty sections fall back to the defaults
    #[serde(default)]
    pub network: OscNetwork,
    /// endpoint of the control plane, filled by the controller from the load balancer
    pub control_plane_endpoint: Option<ApiEndpoint>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    pub host: String,
    pub port: i32,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscNetwork {
    pub net: OscNet,
    pub subnets: Vec<OscSubnet>,
    pub internet_service: OscInternetService,
    pub nat_service: OscNatService,
    pub public_ips: Vec<OscPublicIp>,
    pub route_tables: Vec<OscRouteTable>,
    pub security_groups: Vec<OscSecurityGroup>,
    pub load_balancer: OscLoadBalancer,
    /// cluster name used in resource tags
    pub cluster_name: Option<String>,
    /// default subregion for subnets that don't specify one
    pub subregion_name: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscNet {
    pub name: String,
    pub ip_range: String,
    /// id of an existing net, such a net is never deleted by the controller
    pub resource_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscSubnet {
    pub name: String,
    pub ip_subnet_range: String,
    pub subregion_name: Option<String>,
    pub resource_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscInternetService {
    pub name: String,
    pub resource_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscNatService {
    pub name: String,
    pub public_ip_name: String,
    pub subnet_name: String,
    pub resource_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscPublicIp {
    pub name: String,
    pub resource_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscRouteTable {
    pub name: String,
    /// names of the subnets linked to this route table
    pub subnets: Vec<String>,
    pub routes: Vec<OscRoute>,
    pub resource_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscRoute {
    pub name: String,
    /// name of the internet service or nat service the route points to
    pub target_name: String,
    /// `gateway` for an internet service, `nat` for a nat service
    pub target_type: String,
    pub destination: String,
    pub resource_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscSecurityGroup {
    pub name: String,
    pub description: String,
    /// extra tag key set on the security group (e.g. `OscK8sMainSG`)
    pub tag: Option<String>,
    pub security_group_rules: Vec<OscSecurityGroupRule>,
    pub resource_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscSecurityGroupRule {
    pub name: String,
    /// `Inbound` or `Outbound`
    pub flow: String,
    /// `tcp`, `udp`, `icmp` or `-1`
    pub ip_protocol: String,
    pub ip_range: String,
    pub from_port_range: i32,
    pub to_port_range: i32,
    pub resource_id: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscLoadBalancer {
    pub load_balancer_name: String,
    /// `internet-facing` or `internal`
    pub load_balancer_type: String,
    pub subnet_name: String,
    pub security_group_name: String,
    pub listener: OscLoadBalancerListener,
    pub health_check: OscLoadBalancerHealthCheck,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscLoadBalancerListener {
    pub backend_port: i32,
    pub backend_protocol: String,
    pub load_balancer_port: i32,
    pub load_balancer_protocol: String,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscLoadBalancerHealthCheck {
    pub check_interval: i32,
    pub healthy_threshold: i32,
    pub port: i32,
    pub protocol: String,
    pub timeout: i32,
    pub unhealthy_threshold: i32,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OscClusterStatus {
    /// whether the infrastructure is provisioned
    #[serde(default)]
    pub ready: bool,
    /// subregions the cluster machines can be placed in
    pub failure_domains: Option<BTreeMap<String, FailureDomain>>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// identifiers of the provisioned cloud resources
    #[serde(default)]
    pub network: OscNetworkResources,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailureDomain {
    pub control_plane: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscNetworkResources {
    pub net_ref: ResourceReference,
    pub subnet_ref: ResourceReference,
    pub internet_service_ref: ResourceReference,
    pub public_ip_ref: ResourceReference,
    pub nat_service_ref: ResourceReference,
    pub route_table_ref: ResourceReference,
    /// route name to the id of the route table holding it
    pub route_ref: ResourceReference,
    /// route table name to the link ids of its subnets
    pub link_route_table_ref: BTreeMap<String, Vec<String>>,
    pub security_group_ref: ResourceReference,
    /// security group rule name to the id of the security group holding it
    pub security_group_rule_ref: ResourceReference,
    pub load_balancer_ref: ResourceReference,
    pub managed_by: ManagedBy,
}

#[cfg(test)]
mod tests {
    use kube::CustomResourceExt;

    use super::{OscCluster, OscClusterSpec, OscClusterStatus};

    #[test]
    fn crd_is_namespaced_under_infrastructure_group() {
        let crd = OscCluster::crd();

        assert_eq!(OscCluster::crd_name(), "oscclusters.infrastructure.cluster.x-k8s.io");
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.versions[0].name, "v1beta1");
    }

    #[test]
    fn empty_spec_deserializes_with_empty_sections() {
        let spec: OscClusterSpec = serde_json::from_str("{}").unwrap();

        assert!(spec.network.route_tables.is_empty());
        assert!(spec.network.net.name.is_empty());
        assert!(spec.control_plane_endpoint.is_none());
    }

    #[test]
    fn status_keeps_route_links_per_route_table() {
        let status: OscClusterStatus = serde_json::from_str(
            r#"{
                "ready": false,
                "network": {
                    "routeTableRef": {"resourceMap": {"rt-kw-uid": "rtb-1"}},
                    "linkRouteTableRef": {"rt-kw-uid": ["rtbassoc-1", "rtbassoc-2"]}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(status.network.route_table_ref.get("rt-kw-uid"), Ok("rtb-1"));
        assert_eq!(status.network.link_route_table_ref["rt-kw-uid"].len(), 2);
        assert!(status.network.net_ref.is_empty());
    }
}
