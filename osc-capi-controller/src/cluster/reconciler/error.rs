use osc_capi_core::{resources::refs::RefError, validation::InvalidResource};
use thiserror::Error;

use crate::cloud::error::CloudError;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Object is missing metadata!")]
    MissingObjectMetadata,
    #[error("Couldn't patch the resource! Reason: {}", .0)]
    KubeApiError(kube::Error),
    #[error("{}", .0)]
    MissingReference(#[from] RefError),
    #[error("{}", .0)]
    InvalidSpec(InvalidResource),
    #[error("{action}: {source}")]
    Cloud {
        action: &'static str,
        source: CloudError,
    },
    #[error("{}", .0)]
    UnprefixedCloud(CloudError),
    #[error("LoadBalancer {name} already exists and belongs to cluster {owner}")]
    LoadBalancerConflict { name: String, owner: String },
}

impl ReconcilerError {
    /// Wraps a cloud failure with the stable prefix surfaced in the status conditions.
    pub fn cloud(action: &'static str) -> impl FnOnce(CloudError) -> Self {
        move |source| Self::Cloud { action, source }
    }

    /// Errors fixed by editing the OscCluster object.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ReconcilerError::InvalidSpec(_) | ReconcilerError::LoadBalancerConflict { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use osc_capi_core::resources::refs::RefError;

    use crate::cloud::error::CloudError;

    use super::ReconcilerError;

    #[test]
    fn cloud_errors_carry_the_action_prefix() {
        let error = ReconcilerError::cloud("cannot create route")(CloudError::Other(
            "CreateRoute generic error".to_owned(),
        ));

        assert_eq!(
            error.to_string(),
            "cannot create route: CreateRoute generic error"
        );
    }

    #[test]
    fn missing_references_are_reported_verbatim() {
        let error = ReconcilerError::from(RefError::NotFound("test-net-uid".to_owned()));

        assert_eq!(error.to_string(), "test-net-uid does not exist");
        assert!(!error.is_user_error());
    }
}
