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
pub struct InternetService {
    pub internet_service_id: String,
    /// empty while the internet service isn't linked to a net
    pub net_id: String,
    pub state: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait InternetServiceService: Send + Sync {
    async fn create_internet_service(
        &self,
        cluster_name: &str,
        internet_service_name: &str,
    ) -> Result<InternetService, CloudError>;
    async fn get_internet_service(
        &self,
        internet_service_id: &str,
    ) -> Result<Option<InternetService>, CloudError>;
    async fn link_internet_service(
        &self,
        internet_service_id: &str,
        net_id: &str,
    ) -> Result<(), CloudError>;
    async fn unlink_internet_service(
        &self,
        internet_service_id: &str,
        net_id: &str,
    ) -> Result<(), CloudError>;
    async fn delete_internet_service(&self, internet_service_id: &str) -> Result<(), CloudError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateInternetServiceResponse {
    internet_service: InternetService,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadInternetServicesRequest<'a> {
    filters: InternetServiceIdsFilter<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InternetServiceIdsFilter<'a> {
    internet_service_ids: [&'a str; 1],
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadInternetServicesResponse {
    internet_services: Vec<InternetService>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LinkInternetServiceRequest<'a> {
    internet_service_id: &'a str,
    net_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteInternetServiceRequest<'a> {
    internet_service_id: &'a str,
}

#[async_trait]
impl InternetServiceService for OscClient {
    async fn create_internet_service(
        &self,
        cluster_name: &str,
        internet_service_name: &str,
    ) -> Result<InternetService, CloudError> {
        let response: CreateInternetServiceResponse = self
            .call("CreateInternetService", &EmptyRequest::default())
            .await?;
        let internet_service = response.internet_service;

        self.create_tags(
            &[&internet_service.internet_service_id],
            &cluster_resource_tags(cluster_name, internet_service_name),
        )
        .await
        .map_err(CloudError::untagged(&internet_service.internet_service_id))?;

        Ok(internet_service)
    }

    async fn get_internet_service(
        &self,
        internet_service_id: &str,
    ) -> Result<Option<InternetService>, CloudError> {
        let response: ReadInternetServicesResponse = self
            .call(
                "ReadInternetServices",
                &ReadInternetServicesRequest {
                    filters: InternetServiceIdsFilter {
                        internet_service_ids: [internet_service_id],
                    },
                },
            )
            .await?;

        Ok(response.internet_services.into_iter().next())
    }

    async fn link_internet_service(
        &self,
        internet_service_id: &str,
        net_id: &str,
    ) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call(
                "LinkInternetService",
                &LinkInternetServiceRequest {
                    internet_service_id,
                    net_id,
                },
            )
            .await?;

        Ok(())
    }

    async fn unlink_internet_service(
        &self,
        internet_service_id: &str,
        net_id: &str,
    ) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call(
                "UnlinkInternetService",
                &LinkInternetServiceRequest {
                    internet_service_id,
                    net_id,
                },
            )
            .await?;

        Ok(())
    }

    async fn delete_internet_service(&self, internet_service_id: &str) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call(
                "DeleteInternetService",
                &DeleteInternetServiceRequest {
                    internet_service_id,
                },
            )
            .await?;

        Ok(())
    }
}
