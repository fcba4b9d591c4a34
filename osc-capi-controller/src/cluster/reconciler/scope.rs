use log::info;
use osc_capi_core::resources::{
    crd::v1beta1::osccluster::{OscNetwork, OscNetworkResources},
    defaults::DEFAULT_CLUSTER_NAME,
    refs::{ManagedBy, ResourceReference},
};

use crate::cloud::{
    error::CloudError,
    tag::{Tag, TagService},
    ResourceTag,
};

use super::error::ReconcilerError;

/// State of one reconciliation pass: the defaulted network spec and the references
/// recorded so far, written back to the status once the pass is over.
pub struct ClusterScope {
    uid: String,
    pub network: OscNetwork,
    pub resources: OscNetworkResources,
}

impl ClusterScope {
    pub fn new(uid: impl Into<String>, network: &OscNetwork, resources: OscNetworkResources) -> Self {
        Self {
            uid: uid.into(),
            network: network.defaulted(),
            resources,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// `{name}-{uid}`, the tag name and reference key of a resource
    pub fn suffixed(&self, name: &str) -> String {
        format!("{name}-{}", self.uid)
    }

    pub fn cluster_name(&self) -> String {
        self.suffixed(
            self.network
                .cluster_name
                .as_deref()
                .unwrap_or(DEFAULT_CLUSTER_NAME),
        )
    }

    pub fn into_resources(self) -> OscNetworkResources {
        self.resources
    }
}

/// Picks up the id of a resource that exists without being referenced yet: the one set
/// in the spec (brought by the user) or the one found through its `Name` tag (status lost).
/// Returns the referenced id, if any.
pub fn adopt_resource_id(
    reference: &mut ResourceReference,
    managed_by: &mut ManagedBy,
    name: &str,
    spec_id: Option<&str>,
    tagged_id: Option<&str>,
) -> Option<String> {
    match (spec_id.filter(|id| !id.is_empty()), tagged_id) {
        (Some(id), _) => {
            reference.set(name, id);
            managed_by.mark_external(id);
        }
        (None, Some(id)) if reference.try_get(name).is_none() => {
            reference.set(name, id);
            managed_by.mark_capi(id);
        }
        _ => (),
    }

    reference.try_get(name).map(str::to_owned)
}

/// Drops the reference of a deleted or released resource and its ownership record.
pub fn forget_resource(reference: &mut ResourceReference, managed_by: &mut ManagedBy, name: &str) {
    if let Some(id) = reference.remove(name) {
        managed_by.forget(&id);
    }
}

/// Records the resource left behind by a creation whose tagging failed, so that the next
/// pass tags it instead of creating another one.
pub fn record_untagged<'a>(
    reference: &'a mut ResourceReference,
    managed_by: &'a mut ManagedBy,
    name: &'a str,
) -> impl FnOnce(CloudError) -> CloudError + 'a {
    move |error| {
        if let Some(resource_id) = error.untagged_resource_id() {
            reference.set(name, resource_id);
            managed_by.mark_capi(resource_id);
        }
        error
    }
}

/// Tags an existing provider-owned resource whose `Name` tag couldn't be found.
pub async fn retag_resource(
    tags: &dyn TagService,
    tag: Option<&Tag>,
    managed_by: &ManagedBy,
    resource_id: &str,
    resource_tags: Vec<ResourceTag>,
) -> Result<(), ReconcilerError> {
    if tag.is_some() || managed_by.is_external(resource_id) {
        return Ok(());
    }

    info!("Tagging {resource_id}...");

    tags.create_resource_tags(resource_id, resource_tags)
        .await
        .map_err(ReconcilerError::cloud("cannot tag resource"))
}
