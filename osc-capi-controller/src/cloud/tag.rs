use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use osc_capi_core::resources::labels::{cluster_tag_key, NAME_TAG_KEY, OWNED_TAG_VALUE};
use serde::{Deserialize, Serialize};

use super::{client::OscClient, error::CloudError, IgnoredResponse, ResourceTag};

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
    pub resource_id: String,
    pub resource_type: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait TagService: Send + Sync {
    /// Finds the first resource tagged with `key=value`.
    async fn read_tag(&self, key: &str, value: &str) -> Result<Option<Tag>, CloudError>;

    /// Tags a single resource, used to finish the tagging of a resource created untagged.
    async fn create_resource_tags(
        &self,
        resource_id: &str,
        tags: Vec<ResourceTag>,
    ) -> Result<(), CloudError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadTagsRequest<'a> {
    filters: ReadTagsFilters<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadTagsFilters<'a> {
    keys: [&'a str; 1],
    values: [&'a str; 1],
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadTagsResponse {
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateTagsRequest<'a> {
    resource_ids: &'a [&'a str],
    tags: &'a [ResourceTag],
}

/// `Name` tag plus the cluster ownership tag every provisioned resource carries.
pub fn cluster_resource_tags(cluster_name: &str, name: &str) -> Vec<ResourceTag> {
    vec![
        ResourceTag::new(NAME_TAG_KEY, name),
        ResourceTag::new(cluster_tag_key(cluster_name), OWNED_TAG_VALUE),
    ]
}

impl OscClient {
    pub(super) async fn create_tags(
        &self,
        resource_ids: &[&str],
        tags: &[ResourceTag],
    ) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call(
                "CreateTags",
                &CreateTagsRequest {
                    resource_ids,
                    tags,
                },
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TagService for OscClient {
    async fn read_tag(&self, key: &str, value: &str) -> Result<Option<Tag>, CloudError> {
        let response: ReadTagsResponse = self
            .call(
                "ReadTags",
                &ReadTagsRequest {
                    filters: ReadTagsFilters {
                        keys: [key],
                        values: [value],
                    },
                },
            )
            .await?;

        Ok(response.tags.into_iter().next())
    }

    async fn create_resource_tags(
        &self,
        resource_id: &str,
        tags: Vec<ResourceTag>,
    ) -> Result<(), CloudError> {
        self.create_tags(&[resource_id], &tags).await
    }
}

#[cfg(test)]
mod tests {
    use super::cluster_resource_tags;

    #[test]
    fn cluster_resources_are_named_and_owned() {
        let tags = cluster_resource_tags("cluster-api-uid", "cluster-api-net-uid");

        assert_eq!(tags[0].key, "Name");
        assert_eq!(tags[0].value, "cluster-api-net-uid");
        assert_eq!(tags[1].key, "OscK8sClusterID/cluster-api-uid");
        assert_eq!(tags[1].value, "owned");
    }
}
