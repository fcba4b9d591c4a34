use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("Request to the Outscale API failed! Reason: {}", .0)]
    Request(reqwest::Error),
    #[error("Couldn't encode the request! Reason: {}", .0)]
    Encode(serde_json::Error),
    #[error("Couldn't decode the response! Reason: {}", .0)]
    Decode(serde_json::Error),
    #[error("Invalid endpoint '{}'!", .0)]
    InvalidEndpoint(String),
    #[error("{status} {error_type} ({code}): {details}")]
    Api {
        status: u16,
        code: String,
        error_type: String,
        details: String,
    },
    #[error("{}", .0)]
    Other(String),
    /// The resource was created but `CreateTags` failed afterwards.
    #[error("{resource_id} was created but not tagged: {source}")]
    Untagged {
        resource_id: String,
        source: Box<CloudError>,
    },
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorResponse {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ApiErrorEntry {
    code: String,
    #[serde(rename = "Type")]
    error_type: String,
    details: String,
}

impl CloudError {
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let entry = serde_json::from_slice::<ApiErrorResponse>(body)
            .ok()
            .and_then(|response| response.errors.into_iter().next())
            .unwrap_or_else(|| ApiErrorEntry {
                details: String::from_utf8_lossy(body).into_owned(),
                ..Default::default()
            });

        CloudError::Api {
            status,
            code: entry.code,
            error_type: entry.error_type,
            details: entry.details,
        }
    }

    /// Turns a tagging failure into [`CloudError::Untagged`] for the freshly created `resource_id`.
    pub fn untagged(resource_id: &str) -> impl FnOnce(CloudError) -> Self + '_ {
        move |source| CloudError::Untagged {
            resource_id: resource_id.to_owned(),
            source: Box::new(source),
        }
    }

    pub fn untagged_resource_id(&self) -> Option<&str> {
        match self {
            CloudError::Untagged { resource_id, .. } => Some(resource_id),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            CloudError::Api {
                status, error_type, ..
            } => *status == 404 || error_type == "InvalidResource",
            _ => false,
        }
    }
}
