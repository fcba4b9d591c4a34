use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};

pub mod operations;

pub trait GetApi {
    fn namespaced_api<T>(&self, namespace: &str) -> Api<T>
    where
        T: Resource<Scope = NamespaceResourceScope>,
        <T as Resource>::DynamicType: Default;

    fn global_api<T>(&self) -> Api<T>
    where
        T: Resource,
        <T as Resource>::DynamicType: Default;
}

impl GetApi for Client {
    fn namespaced_api<T>(&self, namespace: &str) -> Api<T>
    where
        T: Resource<Scope = NamespaceResourceScope>,
        <T as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.clone(), namespace)
    }

    fn global_api<T>(&self) -> Api<T>
    where
        T: Resource,
        <T as Resource>::DynamicType: Default,
    {
        Api::all(self.clone())
    }
}
