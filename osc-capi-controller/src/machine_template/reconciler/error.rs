use thiserror::Error;

use crate::cloud::error::CloudError;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Object is missing metadata!")]
    MissingObjectMetadata,
    #[error("Couldn't patch the resource! Reason: {}", .0)]
    KubeApiError(kube::Error),
    #[error("OscCluster {} does not exist", .0)]
    MissingCluster(String),
    #[error("cannot get ListMachine: {}", .0)]
    ListMachines(kube::Error),
    #[error("{}", .0)]
    Capacity(#[from] CloudError),
}
