use async_trait::async_trait;
use log::info;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use super::{
    client::OscClient, error::CloudError, tag::cluster_resource_tags, IgnoredResponse,
};

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct Net {
    pub net_id: String,
    pub ip_range: String,
    pub state: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NetService: Send + Sync {
    async fn create_net(
        &self,
        ip_range: &str,
        cluster_name: &str,
        net_name: &str,
    ) -> Result<Net, CloudError>;
    async fn get_net(&self, net_id: &str) -> Result<Option<Net>, CloudError>;
    async fn delete_net(&self, net_id: &str) -> Result<(), CloudError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateNetRequest<'a> {
    ip_range: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateNetResponse {
    net: Net,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadNetsRequest<'a> {
    filters: NetIdsFilter<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NetIdsFilter<'a> {
    net_ids: [&'a str; 1],
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadNetsResponse {
    nets: Vec<Net>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteNetRequest<'a> {
    net_id: &'a str,
}

#[async_trait]
impl NetService for OscClient {
    async fn create_net(
        &self,
        ip_range: &str,
        cluster_name: &str,
        net_name: &str,
    ) -> Result<Net, CloudError> {
        let response: CreateNetResponse =
            self.call("CreateNet", &CreateNetRequest { ip_range }).await?;
        let net = response.net;

        self.create_tags(&[&net.net_id], &cluster_resource_tags(cluster_name, net_name))
            .await
            .map_err(CloudError::untagged(&net.net_id))?;
        info!("Created net '{net_name}' ({})", net.net_id);

        Ok(net)
    }

    async fn get_net(&self, net_id: &str) -> Result<Option<Net>, CloudError> {
        let response: ReadNetsResponse = self
            .call(
                "ReadNets",
                &ReadNetsRequest {
                    filters: NetIdsFilter { net_ids: [net_id] },
                },
            )
            .await?;

        Ok(response.nets.into_iter().next())
    }

    async fn delete_net(&self, net_id: &str) -> Result<(), CloudError> {
        let _: IgnoredResponse = self.call("DeleteNet", &DeleteNetRequest { net_id }).await?;

        Ok(())
    }
}
