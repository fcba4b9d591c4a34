use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use osc_capi_core::resources::crd::v1beta1::osccluster::OscSecurityGroupRule;
use serde::{Deserialize, Serialize};

use super::{
    client::OscClient, error::CloudError, tag::cluster_resource_tags, IgnoredResponse,
    ResourceTag,
};

pub const OUTBOUND_FLOW: &str = "Outbound";

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct SecurityGroup {
    pub security_group_id: String,
    pub security_group_name: String,
    pub net_id: String,
    pub inbound_rules: Vec<SecurityGroupRule>,
    pub outbound_rules: Vec<SecurityGroupRule>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct SecurityGroupRule {
    pub from_port_range: i32,
    pub to_port_range: i32,
    pub ip_protocol: String,
    pub ip_ranges: Vec<String>,
}

impl SecurityGroup {
    pub fn has_rule(&self, rule: &OscSecurityGroupRule) -> bool {
        let rules = if rule.flow == OUTBOUND_FLOW {
            &self.outbound_rules
        } else {
            &self.inbound_rules
        };

        rules.iter().any(|existing| {
            existing.ip_protocol == rule.ip_protocol
                && existing.from_port_range == rule.from_port_range
                && existing.to_port_range == rule.to_port_range
                && existing.ip_ranges.iter().any(|range| *range == rule.ip_range)
        })
    }
}

/// Cluster tags of a security group, plus `{tag}/{cluster_name}=True` when `tag` is set.
pub fn security_group_tags(
    cluster_name: &str,
    security_group_name: &str,
    tag: &str,
) -> Vec<ResourceTag> {
    let mut tags = cluster_resource_tags(cluster_name, security_group_name);
    if !tag.is_empty() {
        tags.push(ResourceTag::new(format!("{tag}/{cluster_name}"), "True"));
    }
    tags
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecurityGroupService: Send + Sync {
    /// `tag` is an extra marker key (e.g. `OscK8sMainSG`), ignored when empty.
    async fn create_security_group(
        &self,
        net_id: &str,
        cluster_name: &str,
        security_group_name: &str,
        description: &str,
        tag: &str,
    ) -> Result<SecurityGroup, CloudError>;
    async fn create_security_group_rule(
        &self,
        security_group_id: &str,
        rule: &OscSecurityGroupRule,
    ) -> Result<SecurityGroup, CloudError>;
    async fn get_security_group(
        &self,
        security_group_id: &str,
    ) -> Result<Option<SecurityGroup>, CloudError>;
    async fn get_security_group_ids_from_net_ids(
        &self,
        net_id: &str,
    ) -> Result<Vec<String>, CloudError>;
    async fn delete_security_group(&self, security_group_id: &str) -> Result<(), CloudError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSecurityGroupRequest<'a> {
    description: &'a str,
    net_id: &'a str,
    security_group_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroupResponse {
    security_group: SecurityGroup,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSecurityGroupRuleRequest<'a> {
    flow: &'a str,
    security_group_id: &'a str,
    rules: [SecurityGroupRule; 1],
}

#[derive(Serialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ReadSecurityGroupsRequest {
    filters: SecurityGroupFilters,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroupFilters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    security_group_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    net_ids: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadSecurityGroupsResponse {
    security_groups: Vec<SecurityGroup>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteSecurityGroupRequest<'a> {
    security_group_id: &'a str,
}

impl OscClient {
    async fn read_security_groups(
        &self,
        filters: SecurityGroupFilters,
    ) -> Result<Vec<SecurityGroup>, CloudError> {
        let response: ReadSecurityGroupsResponse = self
            .call("ReadSecurityGroups", &ReadSecurityGroupsRequest { filters })
            .await?;

        Ok(response.security_groups)
    }
}

#[async_trait]
impl SecurityGroupService for OscClient {
    async fn create_security_group(
        &self,
        net_id: &str,
        cluster_name: &str,
        security_group_name: &str,
        description: &str,
        tag: &str,
    ) -> Result<SecurityGroup, CloudError> {
        let response: SecurityGroupResponse = self
            .call(
                "CreateSecurityGroup",
                &CreateSecurityGroupRequest {
                    description,
                    net_id,
                    security_group_name,
                },
            )
            .await?;
        let security_group = response.security_group;

        self.create_tags(
            &[&security_group.security_group_id],
            &security_group_tags(cluster_name, security_group_name, tag),
        )
        .await
        .map_err(CloudError::untagged(&security_group.security_group_id))?;

        Ok(security_group)
    }

    async fn create_security_group_rule(
        &self,
        security_group_id: &str,
        rule: &OscSecurityGroupRule,
    ) -> Result<SecurityGroup, CloudError> {
        let response: SecurityGroupResponse = self
            .call(
                "CreateSecurityGroupRule",
                &CreateSecurityGroupRuleRequest {
                    flow: &rule.flow,
                    security_group_id,
                    rules: [SecurityGroupRule {
                        from_port_range: rule.from_port_range,
                        to_port_range: rule.to_port_range,
                        ip_protocol: rule.ip_protocol.clone(),
                        ip_ranges: vec![rule.ip_range.clone()],
                    }],
                },
            )
            .await?;

        Ok(response.security_group)
    }

    async fn get_security_group(
        &self,
        security_group_id: &str,
    ) -> Result<Option<SecurityGroup>, CloudError> {
        let security_groups = self
            .read_security_groups(SecurityGroupFilters {
                security_group_ids: vec![security_group_id.to_owned()],
                ..Default::default()
            })
            .await?;

        Ok(security_groups.into_iter().next())
    }

    async fn get_security_group_ids_from_net_ids(
        &self,
        net_id: &str,
    ) -> Result<Vec<String>, CloudError> {
        let security_groups = self
            .read_security_groups(SecurityGroupFilters {
                net_ids: vec![net_id.to_owned()],
                ..Default::default()
            })
            .await?;

        Ok(security_groups
            .into_iter()
            .map(|security_group| security_group.security_group_id)
            .collect())
    }

    async fn delete_security_group(&self, security_group_id: &str) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call(
                "DeleteSecurityGroup",
                &DeleteSecurityGroupRequest { security_group_id },
            )
            .await?;

        Ok(())
    }
}
