use chrono::Utc;
use log::debug;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Url,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::ProviderConfig;

use super::{
    error::CloudError,
    signer::{RequestSigner, CONTENT_TYPE as SIGNED_CONTENT_TYPE, DATE_HEADER},
};

const API_PATH: &str = "/api/v1";
const USER_AGENT: &str = concat!("osc-capi-controller/", env!("CARGO_PKG_VERSION"));

/// OAPI client implementing every cloud service trait.
#[derive(Debug, Clone)]
pub struct OscClient {
    http: reqwest::Client,
    base_url: Url,
    host: String,
    signer: RequestSigner,
}

impl OscClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, CloudError> {
        let endpoint = config.endpoint();
        let base_url =
            Url::parse(&endpoint).map_err(|_| CloudError::InvalidEndpoint(endpoint.clone()))?;
        let host = match (base_url.host_str(), base_url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
            (None, _) => return Err(CloudError::InvalidEndpoint(endpoint)),
        };
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(CloudError::Request)?;

        Ok(Self {
            http,
            base_url,
            host,
            signer: RequestSigner::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                config.region.clone(),
            ),
        })
    }

    pub(super) async fn call<Req, Resp>(
        &self,
        operation: &str,
        request: &Req,
    ) -> Result<Resp, CloudError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        debug!("Calling {operation}...");

        let path = format!("{API_PATH}/{operation}");
        let url = self
            .base_url
            .join(&path)
            .map_err(|_| CloudError::InvalidEndpoint(path.clone()))?;
        let body = serde_json::to_vec(request).map_err(CloudError::Encode)?;
        let signed = self.signer.sign(&self.host, &path, &body, Utc::now())?;

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, SIGNED_CONTENT_TYPE)
            .header(DATE_HEADER, signed.date)
            .header(AUTHORIZATION, signed.authorization)
            .body(body)
            .send()
            .await
            .map_err(CloudError::Request)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(CloudError::Request)?;

        if !status.is_success() {
            return Err(CloudError::from_response(status.as_u16(), &bytes));
        }

        serde_json::from_slice(&bytes).map_err(CloudError::Decode)
    }
}
