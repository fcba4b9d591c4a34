use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Read-only view of the Cluster API `Cluster`, only the fields the provider looks at.
#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1beta1",
    kind = "Cluster",
    namespaced,
    derive = "Default"
)]
pub struct ClusterSpec {
    pub paused: Option<bool>,
}
