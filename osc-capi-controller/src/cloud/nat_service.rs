use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use super::{
    client::OscClient, error::CloudError, tag::cluster_resource_tags, IgnoredResponse,
};

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct NatService {
    pub nat_service_id: String,
    pub subnet_id: String,
    pub net_id: String,
    pub state: String,
}

impl NatService {
    /// deleted nat services stay visible for a while
    pub fn is_deleted(&self) -> bool {
        self.state == "deleted" || self.state == "deleting"
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NatServiceService: Send + Sync {
    async fn create_nat_service(
        &self,
        public_ip_id: &str,
        subnet_id: &str,
        cluster_name: &str,
        nat_service_name: &str,
    ) -> Result<NatService, CloudError>;
    async fn get_nat_service(&self, nat_service_id: &str)
        -> Result<Option<NatService>, CloudError>;
    async fn delete_nat_service(&self, nat_service_id: &str) -> Result<(), CloudError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateNatServiceRequest<'a> {
    public_ip_id: &'a str,
    subnet_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateNatServiceResponse {
    nat_service: NatService,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadNatServicesRequest<'a> {
    filters: NatServiceIdsFilter<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NatServiceIdsFilter<'a> {
    nat_service_ids: [&'a str; 1],
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadNatServicesResponse {
    nat_services: Vec<NatService>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteNatServiceRequest<'a> {
    nat_service_id: &'a str,
}

#[async_trait]
impl NatServiceService for OscClient {
    async fn create_nat_service(
        &self,
        public_ip_id: &str,
        subnet_id: &str,
        cluster_name: &str,
        nat_service_name: &str,
    ) -> Result<NatService, CloudError> {
        let response: CreateNatServiceResponse = self
            .call(
                "CreateNatService",
                &CreateNatServiceRequest {
                    public_ip_id,
                    subnet_id,
                },
            )
            .await?;
        let nat_service = response.nat_service;

        self.create_tags(
            &[&nat_service.nat_service_id],
            &cluster_resource_tags(cluster_name, nat_service_name),
        )
        .await
        .map_err(CloudError::untagged(&nat_service.nat_service_id))?;

        Ok(nat_service)
    }

    async fn get_nat_service(
        &self,
        nat_service_id: &str,
    ) -> Result<Option<NatService>, CloudError> {
        let response: ReadNatServicesResponse = self
            .call(
                "ReadNatServices",
                &ReadNatServicesRequest {
                    filters: NatServiceIdsFilter {
                        nat_service_ids: [nat_service_id],
                    },
                },
            )
            .await?;

        Ok(response
            .nat_services
            .into_iter()
            .find(|nat_service| !nat_service.is_deleted()))
    }

    async fn delete_nat_service(&self, nat_service_id: &str) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call("DeleteNatService", &DeleteNatServiceRequest { nat_service_id })
            .await?;

        Ok(())
    }
}
