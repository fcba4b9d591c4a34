use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use super::{
    client::OscClient, error::CloudError, tag::cluster_resource_tags, EmptyRequest,
    IgnoredResponse,
};

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct PublicIp {
    pub public_ip_id: String,
    pub public_ip: String,
    /// set while the ip is attached to a vm or a nat service
    pub link_public_ip_id: Option<String>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PublicIpService: Send + Sync {
    async fn create_public_ip(
        &self,
        cluster_name: &str,
        public_ip_name: &str,
    ) -> Result<PublicIp, CloudError>;
    async fn get_public_ip(&self, public_ip_id: &str) -> Result<Option<PublicIp>, CloudError>;
    async fn delete_public_ip(&self, public_ip_id: &str) -> Result<(), CloudError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreatePublicIpResponse {
    public_ip: PublicIp,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadPublicIpsRequest<'a> {
    filters: PublicIpIdsFilter<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PublicIpIdsFilter<'a> {
    public_ip_ids: [&'a str; 1],
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadPublicIpsResponse {
    public_ips: Vec<PublicIp>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeletePublicIpRequest<'a> {
    public_ip_id: &'a str,
}

#[async_trait]
impl PublicIpService for OscClient {
    async fn create_public_ip(
        &self,
        cluster_name: &str,
        public_ip_name: &str,
    ) -> Result<PublicIp, CloudError> {
        let response: CreatePublicIpResponse = self
            .call("CreatePublicIp", &EmptyRequest::default())
            .await?;
        let public_ip = response.public_ip;

        self.create_tags(
            &[&public_ip.public_ip_id],
            &cluster_resource_tags(cluster_name, public_ip_name),
        )
        .await
        .map_err(CloudError::untagged(&public_ip.public_ip_id))?;

        Ok(public_ip)
    }

    async fn get_public_ip(&self, public_ip_id: &str) -> Result<Option<PublicIp>, CloudError> {
        let response: ReadPublicIpsResponse = self
            .call(
                "ReadPublicIps",
                &ReadPublicIpsRequest {
                    filters: PublicIpIdsFilter {
                        public_ip_ids: [public_ip_id],
                    },
                },
            )
            .await?;

        Ok(response.public_ips.into_iter().next())
    }

    async fn delete_public_ip(&self, public_ip_id: &str) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call("DeletePublicIp", &DeletePublicIpRequest { public_ip_id })
            .await?;

        Ok(())
    }
}
