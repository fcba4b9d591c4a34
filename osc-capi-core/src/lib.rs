pub mod helpers;
pub mod kubernetes;
pub mod resources;
pub mod validation;

pub const CLUSTER_API_GROUP: &str = "cluster.x-k8s.io";
