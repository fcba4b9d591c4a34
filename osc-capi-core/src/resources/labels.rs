use kube::{api::ListParams, Resource};

use crate::CLUSTER_API_GROUP;

pub const CLUSTER_NAME_LABEL: &str = "cluster.x-k8s.io/cluster-name";
pub const CONTROL_PLANE_LABEL: &str = "cluster.x-k8s.io/control-plane";
pub const DEPLOYMENT_NAME_LABEL: &str = "cluster.x-k8s.io/deployment-name";
pub const PAUSED_ANNOTATION: &str = "cluster.x-k8s.io/paused";

pub const NAME_TAG_KEY: &str = "Name";
pub const CLUSTER_TAG_KEY_PREFIX: &str = "OscK8sClusterID";
pub const OWNED_TAG_VALUE: &str = "owned";
pub const LOAD_BALANCER_CLUSTER_TAG_KEY: &str = "clustername";

pub const MANAGED_BY_CAPI: &str = "capi";
pub const MANAGED_BY_EXTERNAL: &str = "external";

pub fn managed_by_key(resource_id: &str) -> String {
    format!("managed-by/{resource_id}")
}

pub fn cluster_tag_key(cluster_name: &str) -> String {
    format!("{CLUSTER_TAG_KEY_PREFIX}/{cluster_name}")
}

pub fn get_cluster_machines_listparams(cluster_name: &str) -> ListParams {
    ListParams::default().labels(&format!("{CLUSTER_NAME_LABEL}={cluster_name}"))
}

pub fn is_paused<T: Resource>(object: &T) -> bool {
    object
        .meta()
        .annotations
        .as_ref()
        .map(|annotations| annotations.contains_key(PAUSED_ANNOTATION))
        .unwrap_or(false)
}

pub fn has_label<T: Resource>(object: &T, label: &str) -> bool {
    object
        .meta()
        .labels
        .as_ref()
        .map(|labels| labels.contains_key(label))
        .unwrap_or(false)
}

/// name of the CAPI `Cluster` owning the object, if the cluster controller has set it already
pub fn get_owner_cluster_name<T: Resource>(object: &T) -> Option<&str> {
    object
        .meta()
        .owner_references
        .as_ref()?
        .iter()
        .find(|owner| {
            owner.kind == "Cluster"
                && owner
                    .api_version
                    .split('/')
                    .next()
                    .map(|group| group == CLUSTER_API_GROUP)
                    .unwrap_or(false)
        })
        .map(|owner| owner.name.as_str())
}
