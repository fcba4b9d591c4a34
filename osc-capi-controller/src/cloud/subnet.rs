use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use osc_capi_core::resources::crd::v1beta1::osccluster::OscSubnet;
use serde::{Deserialize, Serialize};

use super::{
    client::OscClient, error::CloudError, tag::cluster_resource_tags, IgnoredResponse,
};

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct Subnet {
    pub subnet_id: String,
    pub net_id: String,
    pub ip_range: String,
    pub subregion_name: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SubnetService: Send + Sync {
    async fn create_subnet(
        &self,
        spec: &OscSubnet,
        net_id: &str,
        cluster_name: &str,
        subnet_name: &str,
    ) -> Result<Subnet, CloudError>;
    async fn get_subnet_ids_from_net_ids(&self, net_id: &str) -> Result<Vec<String>, CloudError>;
    async fn delete_subnet(&self, subnet_id: &str) -> Result<(), CloudError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSubnetRequest<'a> {
    ip_range: &'a str,
    net_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subregion_name: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSubnetResponse {
    subnet: Subnet,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadSubnetsRequest<'a> {
    filters: NetIdsFilter<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NetIdsFilter<'a> {
    net_ids: [&'a str; 1],
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadSubnetsResponse {
    subnets: Vec<Subnet>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteSubnetRequest<'a> {
    subnet_id: &'a str,
}

#[async_trait]
impl SubnetService for OscClient {
    async fn create_subnet(
        &self,
        spec: &OscSubnet,
        net_id: &str,
        cluster_name: &str,
        subnet_name: &str,
    ) -> Result<Subnet, CloudError> {
        let response: CreateSubnetResponse = self
            .call(
                "CreateSubnet",
                &CreateSubnetRequest {
                    ip_range: &spec.ip_subnet_range,
                    net_id,
                    subregion_name: spec.subregion_name.as_deref(),
                },
            )
            .await?;
        let subnet = response.subnet;

        self.create_tags(
            &[&subnet.subnet_id],
            &cluster_resource_tags(cluster_name, subnet_name),
        )
        .await
        .map_err(CloudError::untagged(&subnet.subnet_id))?;

        Ok(subnet)
    }

    async fn get_subnet_ids_from_net_ids(&self, net_id: &str) -> Result<Vec<String>, CloudError> {
        let response: ReadSubnetsResponse = self
            .call(
                "ReadSubnets",
                &ReadSubnetsRequest {
                    filters: NetIdsFilter { net_ids: [net_id] },
                },
            )
            .await?;

        Ok(response
            .subnets
            .into_iter()
            .map(|subnet| subnet.subnet_id)
            .collect())
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call("DeleteSubnet", &DeleteSubnetRequest { subnet_id })
            .await?;

        Ok(())
    }
}
