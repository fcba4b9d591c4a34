use std::{collections::BTreeMap, sync::Arc, time::Duration};

use kube::{api::PatchParams, runtime::controller::Action};
use log::{debug, info};
use osc_capi_core::{
    helpers::RequireMetadata,
    kubernetes::operations::{apply_resource_status, list_resources, try_get_resource},
    resources::{
        crd::v1beta1::{
            machine::Machine,
            osccluster::OscCluster,
            oscmachinetemplate::{
                OscMachineTemplate, OscMachineTemplateStatus, OscVm, CONTROL_PLANE_ROLE,
            },
        },
        labels::{
            cluster_tag_key, get_cluster_machines_listparams, has_label, is_paused,
            CONTROL_PLANE_LABEL, DEPLOYMENT_NAME_LABEL, OWNED_TAG_VALUE,
        },
    },
};

use crate::{cloud::vm::VmService, machine_template::MACHINE_TEMPLATE_FIELD_MANAGER};

use self::{context::ReconcilerContext, error::ReconcilerError};

pub mod context;
pub mod error;

const ERROR_REQUEUE_SECS: u64 = 10;
const WAIT_REQUEUE_SECS: u64 = 30;

pub async fn reconcile_osc_machine_template(
    object: Arc<OscMachineTemplate>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, ReconcilerError> {
    let name = object.require_name_or(ReconcilerError::MissingObjectMetadata)?;
    let namespace = object.require_namespace_or(ReconcilerError::MissingObjectMetadata)?;

    if is_paused(&*object) {
        info!("OscMachineTemplate '{name}' is paused");
        return Ok(Action::await_change());
    }

    let vm = &object.spec.template.spec.node.vm;
    let counts = if vm.replica == 1 {
        debug!("Single replica template '{name}', not waiting for machines");
        MachineCounts::single_control_plane()
    } else {
        let machines = list_resources::<Machine>(
            &context.client,
            namespace,
            &get_cluster_machines_listparams(&vm.cluster_name),
        )
        .await
        .map_err(ReconcilerError::ListMachines)?;

        MachineCounts::from_machines(&machines)
    };

    if !counts.is_role_ready(&vm.role) {
        info!("Waiting for a ready machine before computing the capacity of '{name}'...");
        return Ok(Action::requeue(Duration::from_secs(WAIT_REQUEUE_SECS)));
    }

    let cluster = try_get_resource::<OscCluster>(&context.client, &vm.cluster_name, namespace)
        .await
        .map_err(ReconcilerError::KubeApiError)?
        .ok_or_else(|| ReconcilerError::MissingCluster(vm.cluster_name.clone()))?;
    let cluster_uid = cluster.require_uid_or(ReconcilerError::MissingObjectMetadata)?;

    let capacity = reconcile_capacity(vm, cluster_uid, &context.cloud).await?;

    apply_resource_status::<OscMachineTemplate, _>(
        &context.client,
        OscMachineTemplateStatus { capacity },
        name,
        namespace,
        &PatchParams::apply(MACHINE_TEMPLATE_FIELD_MANAGER),
    )
    .await
    .map_err(ReconcilerError::KubeApiError)?;

    Ok(Action::await_change())
}

pub fn reconcile_osc_machine_template_error(
    _object: Arc<OscMachineTemplate>,
    _error: &ReconcilerError,
    _context: Arc<ReconcilerContext>,
) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
}

/// Capacity of a single machine built from `vm`, for the cluster with the given uid.
pub async fn reconcile_capacity(
    vm: &OscVm,
    cluster_uid: &str,
    vms: &dyn VmService,
) -> Result<BTreeMap<String, String>, ReconcilerError> {
    let cluster_name = format!("{}-{cluster_uid}", vm.cluster_name);
    let capacity = vms
        .get_capacity(&cluster_tag_key(&cluster_name), OWNED_TAG_VALUE, &vm.vm_type)
        .await?;

    Ok(capacity)
}

#[derive(Debug, Default, PartialEq)]
struct MachineCounts {
    control_planes: usize,
    ready_control_planes: usize,
    workers: usize,
    ready_workers: usize,
}

impl MachineCounts {
    fn single_control_plane() -> Self {
        Self {
            control_planes: 1,
            ready_control_planes: 1,
            ..Default::default()
        }
    }

    fn from_machines(machines: &[Machine]) -> Self {
        let mut counts = Self::default();

        for machine in machines {
            if has_label(machine, CONTROL_PLANE_LABEL) {
                counts.control_planes += 1;
                if machine.is_ready() {
                    counts.ready_control_planes += 1;
                }
            }
            if has_label(machine, DEPLOYMENT_NAME_LABEL) {
                counts.workers += 1;
                if machine.is_ready() {
                    counts.ready_workers += 1;
                }
            }
        }

        counts
    }

    fn is_role_ready(&self, role: &str) -> bool {
        match role {
            CONTROL_PLANE_ROLE => self.control_planes > 0 && self.ready_control_planes > 0,
            "" => self.workers > 0 && self.ready_workers > 0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use kube::core::ObjectMeta;
    use mockall::predicate::eq;
    use osc_capi_core::resources::{
        crd::v1beta1::{
            machine::{Machine, MachineStatus},
            oscmachinetemplate::OscVm,
        },
        labels::{CONTROL_PLANE_LABEL, DEPLOYMENT_NAME_LABEL},
    };

    use crate::cloud::{
        error::CloudError,
        vm::{capacity, MockVmService},
    };

    use super::{reconcile_capacity, MachineCounts};

    fn machine(label: &str, phase: &str) -> Machine {
        Machine {
            metadata: ObjectMeta {
                name: Some(format!("{label}-{phase}").to_lowercase()),
                labels: Some(BTreeMap::from([(label.to_owned(), "".to_owned())])),
                ..Default::default()
            },
            status: Some(MachineStatus {
                phase: Some(phase.to_owned()),
            }),
            ..Default::default()
        }
    }

    fn vm(role: &str) -> OscVm {
        OscVm {
            name: "test-vm".to_owned(),
            vm_type: "tinav5.c4r8p1".to_owned(),
            role: role.to_owned(),
            replica: 3,
            cluster_name: "test-cluster".to_owned(),
            subregion_name: None,
        }
    }

    #[test]
    fn machines_are_counted_by_role() {
        let counts = MachineCounts::from_machines(&[
            machine(CONTROL_PLANE_LABEL, "Running"),
            machine(CONTROL_PLANE_LABEL, "Pending"),
            machine(DEPLOYMENT_NAME_LABEL, "Provisioned"),
            machine(DEPLOYMENT_NAME_LABEL, "Failed"),
            machine("app", "Running"),
        ]);

        assert_eq!(
            counts,
            MachineCounts {
                control_planes: 2,
                ready_control_planes: 1,
                workers: 2,
                ready_workers: 1,
            }
        );
    }

    #[test]
    fn role_needs_a_ready_machine_of_its_kind() {
        let pending_workers = MachineCounts::from_machines(&[
            machine(CONTROL_PLANE_LABEL, "Running"),
            machine(DEPLOYMENT_NAME_LABEL, "Provisioning"),
        ]);

        assert!(pending_workers.is_role_ready("controlplane"));
        assert!(!pending_workers.is_role_ready(""));
        assert!(!pending_workers.is_role_ready("bastion"));
        assert!(!MachineCounts::from_machines(&[]).is_role_ready("controlplane"));
    }

    #[test]
    fn single_replica_counts_as_ready_control_plane() {
        let counts = MachineCounts::single_control_plane();

        assert!(counts.is_role_ready("controlplane"));
        assert!(!counts.is_role_ready(""));
    }

    #[tokio::test]
    async fn capacity_is_read_for_the_cluster_tag() {
        let mut vms = MockVmService::new();

        vms.expect_get_capacity()
            .with(
                eq("OscK8sClusterID/test-cluster-uid"),
                eq("owned"),
                eq("tinav5.c4r8p1"),
            )
            .times(1)
            .returning(|_, _, _| Ok(capacity(4, 8)));

        let capacity = reconcile_capacity(&vm(""), "uid", &vms).await.unwrap();

        assert_eq!(capacity["cpu"], "4");
        assert_eq!(capacity["memory"], "8Gi");
    }

    #[tokio::test]
    async fn capacity_failure_is_reported_verbatim() {
        let mut vms = MockVmService::new();

        vms.expect_get_capacity()
            .returning(|_, _, _| Err(CloudError::Other("GetCapacity generic error".to_owned())));

        let error = reconcile_capacity(&vm("controlplane"), "uid", &vms)
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "GetCapacity generic error");
    }
}
