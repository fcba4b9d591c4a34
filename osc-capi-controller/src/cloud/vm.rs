use std::collections::BTreeMap;

use async_trait::async_trait;
use log::info;
#[cfg(test)]
use mockall::automock;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{client::OscClient, error::CloudError};

pub const CPU_CAPACITY: &str = "cpu";
pub const MEMORY_CAPACITY: &str = "memory";

static TINA_TYPE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^tinav(?P<gen>\d+)\.c(?P<cpu>\d+)r(?P<ram>\d+)p(?P<perf>\d+)$")
        .expect("tina vm type regex")
});

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct Vm {
    pub vm_id: String,
    pub vm_type: String,
    pub state: String,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct VmType {
    pub vm_type_name: String,
    pub vcore_count: i32,
    /// GiB
    pub memory_size: f32,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait VmService: Send + Sync {
    /// Node capacity (`cpu`, `memory`) of `vm_type`, for machines tagged `tag_key=tag_value`.
    async fn get_capacity(
        &self,
        tag_key: &str,
        tag_value: &str,
        vm_type: &str,
    ) -> Result<BTreeMap<String, String>, CloudError>;
}

/// Decodes `tinav{generation}.c{cores}r{ram}p{performance}` types without an API call.
pub fn parse_tina_type(vm_type: &str) -> Option<(i32, i32)> {
    let captures = TINA_TYPE_REGEX.captures(vm_type)?;
    let cpu = captures.name("cpu")?.as_str().parse().ok()?;
    let ram = captures.name("ram")?.as_str().parse().ok()?;

    Some((cpu, ram))
}

pub fn capacity(cpu: i32, memory_gib: i32) -> BTreeMap<String, String> {
    BTreeMap::from([
        (CPU_CAPACITY.to_owned(), cpu.to_string()),
        (MEMORY_CAPACITY.to_owned(), format!("{memory_gib}Gi")),
    ])
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadVmTypesRequest<'a> {
    filters: VmTypeNamesFilter<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct VmTypeNamesFilter<'a> {
    vm_type_names: [&'a str; 1],
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadVmTypesResponse {
    vm_types: Vec<VmType>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadVmsRequest {
    filters: VmTagsFilter,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct VmTagsFilter {
    tags: [String; 1],
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadVmsResponse {
    vms: Vec<Vm>,
}

impl OscClient {
    async fn read_vm_type(&self, vm_type: &str) -> Result<VmType, CloudError> {
        let response: ReadVmTypesResponse = self
            .call(
                "ReadVmTypes",
                &ReadVmTypesRequest {
                    filters: VmTypeNamesFilter {
                        vm_type_names: [vm_type],
                    },
                },
            )
            .await?;

        response
            .vm_types
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::Other(format!("unknown vm type {vm_type}")))
    }
}

#[async_trait]
impl VmService for OscClient {
    async fn get_capacity(
        &self,
        tag_key: &str,
        tag_value: &str,
        vm_type: &str,
    ) -> Result<BTreeMap<String, String>, CloudError> {
        let response: ReadVmsResponse = self
            .call(
                "ReadVms",
                &ReadVmsRequest {
                    filters: VmTagsFilter {
                        tags: [format!("{tag_key}={tag_value}")],
                    },
                },
            )
            .await?;
        let running = response
            .vms
            .iter()
            .filter(|vm| vm.vm_type == vm_type)
            .count();
        info!("{running} vm(s) of type {vm_type} tagged {tag_key}={tag_value}");

        if let Some((cpu, ram)) = parse_tina_type(vm_type) {
            return Ok(capacity(cpu, ram));
        }

        let vm_type = self.read_vm_type(vm_type).await?;

        Ok(capacity(
            vm_type.vcore_count,
            vm_type.memory_size.round() as i32,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{capacity, parse_tina_type};

    #[test]
    fn tina_types_are_decoded() {
        assert_eq!(parse_tina_type("tinav5.c4r8p1"), Some((4, 8)));
        assert_eq!(parse_tina_type("tinav6.c16r64p2"), Some((16, 64)));
    }

    #[test]
    fn other_types_are_not_decoded() {
        assert_eq!(parse_tina_type("m4.xlarge"), None);
        assert_eq!(parse_tina_type("tinav5.c4r8"), None);
    }

    #[test]
    fn capacity_uses_kubernetes_quantities() {
        let capacity = capacity(2, 4);

        assert_eq!(capacity["cpu"], "2");
        assert_eq!(capacity["memory"], "4Gi");
    }
}
