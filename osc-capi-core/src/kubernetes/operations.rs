use std::fmt::Debug;

use k8s_openapi::{
    serde::{de::DeserializeOwned, Serialize},
    NamespaceResourceScope,
};
use kube::{
    api::{ListParams, Patch, PatchParams},
    Client, Resource,
};
use log::debug;
use serde_json::json;

use crate::{helpers::pretty_type_name, kubernetes::GetApi};

pub async fn try_get_resource<T>(
    client: &Client,
    name: &str,
    namespace: &str,
) -> Result<Option<T>, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    client.namespaced_api::<T>(namespace).get_opt(name).await
}

pub async fn list_resources<T>(
    client: &Client,
    namespace: &str,
    list_params: &ListParams,
) -> Result<Vec<T>, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    Ok(client
        .namespaced_api::<T>(namespace)
        .list(list_params)
        .await?
        .items)
}

pub async fn apply_resource_status<T, S>(
    client: &Client,
    status: S,
    name: &str,
    namespace: &str,
    patch_params: &PatchParams,
) -> Result<T, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
    S: Serialize,
{
    debug!(
        "Applying '{name}' {} status in '{namespace}' namespace...",
        pretty_type_name::<T>()
    );

    let patch = json!({
        "apiVersion": T::api_version(&()),
        "kind": T::kind(&()),
        "status": status,
    });

    client
        .namespaced_api::<T>(namespace)
        .patch_status(name, &patch_params.clone().force(), &Patch::Apply(&patch))
        .await
}

pub async fn merge_resource_spec<T, S>(
    client: &Client,
    spec: S,
    name: &str,
    namespace: &str,
    patch_params: &PatchParams,
) -> Result<T, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
    S: Serialize,
{
    debug!(
        "Patching '{name}' {} spec in '{namespace}' namespace...",
        pretty_type_name::<T>()
    );

    let patch = json!({ "spec": spec });

    client
        .namespaced_api::<T>(namespace)
        .patch(name, patch_params, &Patch::Merge(&patch))
        .await
}
