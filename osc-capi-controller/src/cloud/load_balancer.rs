use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use osc_capi_core::resources::crd::v1beta1::osccluster::{
    OscLoadBalancer, OscLoadBalancerHealthCheck, OscLoadBalancerListener,
};
use serde::{Deserialize, Serialize};

use super::{client::OscClient, error::CloudError, IgnoredResponse, ResourceTag};

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct LoadBalancer {
    pub load_balancer_name: String,
    pub load_balancer_type: String,
    pub dns_name: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub health_check: HealthCheck,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct HealthCheck {
    pub check_interval: i32,
    pub healthy_threshold: i32,
    pub port: i32,
    pub protocol: String,
    pub timeout: i32,
    pub unhealthy_threshold: i32,
}

impl From<&OscLoadBalancerHealthCheck> for HealthCheck {
    fn from(health_check: &OscLoadBalancerHealthCheck) -> Self {
        Self {
            check_interval: health_check.check_interval,
            healthy_threshold: health_check.healthy_threshold,
            port: health_check.port,
            protocol: health_check.protocol.clone(),
            timeout: health_check.timeout,
            unhealthy_threshold: health_check.unhealthy_threshold,
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LoadBalancerService: Send + Sync {
    async fn get_load_balancer(
        &self,
        load_balancer_name: &str,
    ) -> Result<Option<LoadBalancer>, CloudError>;
    async fn create_load_balancer(
        &self,
        spec: &OscLoadBalancer,
        subnet_id: &str,
        security_group_id: &str,
    ) -> Result<LoadBalancer, CloudError>;
    async fn configure_health_check(
        &self,
        load_balancer_name: &str,
        health_check: &OscLoadBalancerHealthCheck,
    ) -> Result<LoadBalancer, CloudError>;
    async fn create_load_balancer_tag(
        &self,
        load_balancer_name: &str,
        tag: &ResourceTag,
    ) -> Result<(), CloudError>;
    async fn get_load_balancer_tag(
        &self,
        load_balancer_name: &str,
        key: &str,
    ) -> Result<Option<String>, CloudError>;
    async fn delete_load_balancer(&self, load_balancer_name: &str) -> Result<(), CloudError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Listener<'a> {
    backend_port: i32,
    backend_protocol: &'a str,
    load_balancer_port: i32,
    load_balancer_protocol: &'a str,
}

impl<'a> From<&'a OscLoadBalancerListener> for Listener<'a> {
    fn from(listener: &'a OscLoadBalancerListener) -> Self {
        Self {
            backend_port: listener.backend_port,
            backend_protocol: &listener.backend_protocol,
            load_balancer_port: listener.load_balancer_port,
            load_balancer_protocol: &listener.load_balancer_protocol,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateLoadBalancerRequest<'a> {
    load_balancer_name: &'a str,
    load_balancer_type: &'a str,
    listeners: [Listener<'a>; 1],
    subnets: [&'a str; 1],
    security_groups: [&'a str; 1],
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerResponse {
    load_balancer: LoadBalancer,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateLoadBalancerRequest<'a> {
    load_balancer_name: &'a str,
    health_check: HealthCheck,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadLoadBalancersRequest<'a> {
    filters: LoadBalancerNamesFilter<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerNamesFilter<'a> {
    load_balancer_names: [&'a str; 1],
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadLoadBalancersResponse {
    load_balancers: Vec<LoadBalancer>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateLoadBalancerTagsRequest<'a> {
    load_balancer_names: [&'a str; 1],
    tags: [&'a ResourceTag; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadLoadBalancerTagsRequest<'a> {
    load_balancer_names: [&'a str; 1],
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadLoadBalancerTagsResponse {
    tags: Vec<ResourceTag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteLoadBalancerRequest<'a> {
    load_balancer_name: &'a str,
}

#[async_trait]
impl LoadBalancerService for OscClient {
    async fn get_load_balancer(
        &self,
        load_balancer_name: &str,
    ) -> Result<Option<LoadBalancer>, CloudError> {
        let response: ReadLoadBalancersResponse = self
            .call(
                "ReadLoadBalancers",
                &ReadLoadBalancersRequest {
                    filters: LoadBalancerNamesFilter {
                        load_balancer_names: [load_balancer_name],
                    },
                },
            )
            .await?;

        Ok(response.load_balancers.into_iter().next())
    }

    async fn create_load_balancer(
        &self,
        spec: &OscLoadBalancer,
        subnet_id: &str,
        security_group_id: &str,
    ) -> Result<LoadBalancer, CloudError> {
        let response: LoadBalancerResponse = self
            .call(
                "CreateLoadBalancer",
                &CreateLoadBalancerRequest {
                    load_balancer_name: &spec.load_balancer_name,
                    load_balancer_type: &spec.load_balancer_type,
                    listeners: [(&spec.listener).into()],
                    subnets: [subnet_id],
                    security_groups: [security_group_id],
                },
            )
            .await?;

        Ok(response.load_balancer)
    }

    async fn configure_health_check(
        &self,
        load_balancer_name: &str,
        health_check: &OscLoadBalancerHealthCheck,
    ) -> Result<LoadBalancer, CloudError> {
        let response: LoadBalancerResponse = self
            .call(
                "UpdateLoadBalancer",
                &UpdateLoadBalancerRequest {
                    load_balancer_name,
                    health_check: health_check.into(),
                },
            )
            .await?;

        Ok(response.load_balancer)
    }

    async fn create_load_balancer_tag(
        &self,
        load_balancer_name: &str,
        tag: &ResourceTag,
    ) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call(
                "CreateLoadBalancerTags",
                &CreateLoadBalancerTagsRequest {
                    load_balancer_names: [load_balancer_name],
                    tags: [tag],
                },
            )
            .await?;

        Ok(())
    }

    async fn get_load_balancer_tag(
        &self,
        load_balancer_name: &str,
        key: &str,
    ) -> Result<Option<String>, CloudError> {
        let response: ReadLoadBalancerTagsResponse = self
            .call(
                "ReadLoadBalancerTags",
                &ReadLoadBalancerTagsRequest {
                    load_balancer_names: [load_balancer_name],
                },
            )
            .await?;

        Ok(response
            .tags
            .into_iter()
            .find(|tag| tag.key == key)
            .map(|tag| tag.value))
    }

    async fn delete_load_balancer(&self, load_balancer_name: &str) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call(
                "DeleteLoadBalancer",
                &DeleteLoadBalancerRequest { load_balancer_name },
            )
            .await?;

        Ok(())
    }
}
