use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

pub const CONTROL_PLANE_ROLE: &str = "controlplane";

#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "OscMachineTemplate",
    namespaced,
    status = "OscMachineTemplateStatus",
    derive = "Default"
)]
pub struct OscMachineTemplateSpec {
    pub template: OscMachineTemplateResource,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OscMachineTemplateResource {
    pub spec: OscMachineSpec,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscMachineSpec {
    pub node: OscNode,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscNode {
    pub vm: OscVm,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OscVm {
    pub name: String,
    /// outscale vm type, e.g. `tinav5.c4r8p1`
    pub vm_type: String,
    /// `controlplane` for control plane machines, empty for workers
    pub role: String,
    pub replica: i32,
    /// name of the OscCluster the machines belong to
    pub cluster_name: String,
    pub subregion_name: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OscMachineTemplateStatus {
    /// resources a single machine provides, used by the autoscaler to scale from zero
    #[serde(default)]
    pub capacity: BTreeMap<String, String>,
}
