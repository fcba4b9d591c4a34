use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::labels::{managed_by_key, MANAGED_BY_CAPI, MANAGED_BY_EXTERNAL};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RefError {
    #[error("{} does not exist", .0)]
    NotFound(String),
}

/// Maps uid-suffixed resource names to the identifiers assigned by the cloud provider.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    #[serde(default)]
    pub resource_map: BTreeMap<String, String>,
}

impl ResourceReference {
    pub fn get(&self, name: &str) -> Result<&str, RefError> {
        self.try_get(name)
            .ok_or_else(|| RefError::NotFound(name.to_owned()))
    }

    pub fn try_get(&self, name: &str) -> Option<&str> {
        self.resource_map.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, id: impl Into<String>) {
        self.resource_map.insert(name.into(), id.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.resource_map.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.resource_map.is_empty()
    }
}

/// Records who owns a cloud resource, keyed with [`managed_by_key`].
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedBy {
    #[serde(default)]
    pub resource_map: BTreeMap<String, String>,
}

impl ManagedBy {
    pub fn mark_capi(&mut self, resource_id: &str) {
        self.resource_map
            .entry(managed_by_key(resource_id))
            .or_insert_with(|| MANAGED_BY_CAPI.to_owned());
    }

    pub fn mark_external(&mut self, resource_id: &str) {
        self.resource_map
            .insert(managed_by_key(resource_id), MANAGED_BY_EXTERNAL.to_owned());
    }

    pub fn is_external(&self, resource_id: &str) -> bool {
        self.resource_map
            .get(&managed_by_key(resource_id))
            .map(|value| value == MANAGED_BY_EXTERNAL)
            .unwrap_or(false)
    }

    pub fn forget(&mut self, resource_id: &str) {
        self.resource_map.remove(&managed_by_key(resource_id));
    }
}
