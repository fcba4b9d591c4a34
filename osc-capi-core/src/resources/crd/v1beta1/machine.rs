use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Read-only view of the Cluster API `Machine`.
#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1beta1",
    kind = "Machine",
    namespaced,
    status = "MachineStatus",
    derive = "Default"
)]
pub struct MachineSpec {
    pub cluster_name: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    pub phase: Option<String>,
}

impl Machine {
    pub fn is_ready(&self) -> bool {
        matches!(
            self.status.as_ref().and_then(|status| status.phase.as_deref()),
            Some("Running") | Some("Provisioned")
        )
    }
}
