use std::{collections::BTreeMap, sync::Arc, time::Duration};

use kube::{
    api::PatchParams,
    runtime::{
        controller::Action,
        finalizer::{finalizer, Error as FinalizerError, Event as FinalizerEvent},
    },
    CustomResourceExt,
};
use log::info;
use osc_capi_core::{
    helpers::RequireMetadata,
    kubernetes::{
        operations::{apply_resource_status, merge_resource_spec, try_get_resource},
        GetApi,
    },
    resources::{
        conditions::{
            mark_false, mark_true, Condition, ConditionSeverity,
            INTERNET_SERVICE_READY_CONDITION, LOAD_BALANCER_READY_CONDITION,
            NAT_SERVICE_READY_CONDITION, NET_READY_CONDITION, PUBLIC_IPS_READY_CONDITION,
            READY_CONDITION, ROUTE_TABLES_READY_CONDITION, SECURITY_GROUPS_READY_CONDITION,
            SUBNETS_READY_CONDITION,
        },
        crd::v1beta1::{
            cluster::Cluster,
            osccluster::{ApiEndpoint, FailureDomain, OscCluster, OscClusterStatus, OscNetwork},
        },
        labels::{get_owner_cluster_name, is_paused},
    },
    validation::validate_network,
};
use serde_json::json;

use crate::{cloud::CloudServices, cluster::CLUSTER_FIELD_MANAGER};

use self::{context::ReconcilerContext, error::ReconcilerError, scope::ClusterScope};

pub mod context;
pub mod error;
pub mod internet_service;
pub mod load_balancer;
pub mod nat_service;
pub mod net;
pub mod public_ip;
pub mod route_table;
pub mod scope;
pub mod security_group;
pub mod subnet;

#[cfg(test)]
mod fixtures;

const RECONCILE_REQUEUE_SECS: u64 = 60 * 5;
const USER_ERROR_REQUEUE_SECS: u64 = 60;
const ERROR_REQUEUE_SECS: u64 = 10;
const WAIT_REQUEUE_SECS: u64 = 30;

pub async fn reconcile_osc_cluster(
    object: Arc<OscCluster>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, FinalizerError<ReconcilerError>> {
    let namespace = object.require_namespace_or(FinalizerError::ApplyFailed(
        ReconcilerError::MissingObjectMetadata,
    ))?;
    let osc_cluster_api = context.client.namespaced_api::<OscCluster>(namespace);
    let finalizer_name = format!("{}/cleanup", OscCluster::crd_name());

    finalizer(&osc_cluster_api, &finalizer_name, object, |event| async {
        match event {
            FinalizerEvent::Apply(osc_cluster) => try_reconcile(&osc_cluster, &context).await,
            FinalizerEvent::Cleanup(osc_cluster) => cleanup(&osc_cluster, &context).await,
        }
    })
    .await
}

pub fn reconcile_osc_cluster_error(
    _object: Arc<OscCluster>,
    error: &FinalizerError<ReconcilerError>,
    _context: Arc<ReconcilerContext>,
) -> Action {
    Action::requeue(match error {
        FinalizerError::ApplyFailed(error) | FinalizerError::CleanupFailed(error)
            if error.is_user_error() =>
        {
            Duration::from_secs(USER_ERROR_REQUEUE_SECS)
        }
        _ => Duration::from_secs(ERROR_REQUEUE_SECS),
    })
}

async fn try_reconcile(
    object: &OscCluster,
    context: &ReconcilerContext,
) -> Result<Action, ReconcilerError> {
    let name = object.require_name_or(ReconcilerError::MissingObjectMetadata)?;
    let namespace = object.require_namespace_or(ReconcilerError::MissingObjectMetadata)?;
    let uid = object.require_uid_or(ReconcilerError::MissingObjectMetadata)?;

    if !is_owner_ready(object, namespace, context).await? {
        return Ok(Action::requeue(Duration::from_secs(WAIT_REQUEUE_SECS)));
    }

    let mut status = object.status.clone().unwrap_or_default();
    let mut scope = ClusterScope::new(
        uid,
        &object.spec.network,
        std::mem::take(&mut status.network),
    );
    let cloud = CloudServices::from_client(&context.cloud);

    let reconcile_result = reconcile_normal(&mut scope, &cloud, &mut status.conditions).await;
    let network = scope.network.clone();
    status.network = scope.into_resources();

    match reconcile_result {
        Ok(dns_name) => {
            status.ready = true;
            status.failure_domains = Some(get_failure_domains(&network));
            mark_true(&mut status.conditions, READY_CONDITION);

            apply_status(context, name, namespace, &status).await?;
            ensure_control_plane_endpoint(object, &network, dns_name, context).await?;

            Ok(Action::requeue(Duration::from_secs(RECONCILE_REQUEUE_SECS)))
        }
        Err(error) => {
            mark_failed(&mut status.conditions, &error);

            let _ = apply_status(context, name, namespace, &status).await;

            Err(error)
        }
    }
}

/// Provisions every resource in dependency order and returns the DNS name of the
/// control plane load balancer. Each step records its outcome as a condition.
async fn reconcile_normal(
    scope: &mut ClusterScope,
    cloud: &CloudServices<'_>,
    conditions: &mut Vec<Condition>,
) -> Result<String, ReconcilerError> {
    validate_network(&scope.network, scope.uid()).map_err(ReconcilerError::InvalidSpec)?;

    track(
        conditions,
        NET_READY_CONDITION,
        "NetReconciliationFailed",
        net::reconcile_net(scope, cloud.net, cloud.tag).await,
    )?;
    track(
        conditions,
        SUBNETS_READY_CONDITION,
        "SubnetReconciliationFailed",
        subnet::reconcile_subnet(scope, cloud.subnet, cloud.tag).await,
    )?;
    track(
        conditions,
        INTERNET_SERVICE_READY_CONDITION,
        "InternetServiceReconciliationFailed",
        internet_service::reconcile_internet_service(scope, cloud.internet_service, cloud.tag)
            .await,
    )?;
    track(
        conditions,
        PUBLIC_IPS_READY_CONDITION,
        "PublicIpReconciliationFailed",
        public_ip::reconcile_public_ip(scope, cloud.public_ip, cloud.tag).await,
    )?;
    track(
        conditions,
        NAT_SERVICE_READY_CONDITION,
        "NatServiceReconciliationFailed",
        nat_service::reconcile_nat_service(scope, cloud.nat_service, cloud.tag).await,
    )?;
    track(
        conditions,
        ROUTE_TABLES_READY_CONDITION,
        "RouteTableReconciliationFailed",
        route_table::reconcile_route_table(scope, cloud.route_table, cloud.tag).await,
    )?;
    track(
        conditions,
        SECURITY_GROUPS_READY_CONDITION,
        "SecurityGroupReconciliationFailed",
        security_group::reconcile_security_group(scope, cloud.security_group, cloud.tag).await,
    )?;

    track(
        conditions,
        LOAD_BALANCER_READY_CONDITION,
        "LoadBalancerReconciliationFailed",
        load_balancer::reconcile_load_balancer(scope, cloud.load_balancer).await,
    )
}

async fn cleanup(object: &OscCluster, context: &ReconcilerContext) -> Result<Action, ReconcilerError> {
    let name = object.require_name_or(ReconcilerError::MissingObjectMetadata)?;
    let namespace = object.require_namespace_or(ReconcilerError::MissingObjectMetadata)?;
    let uid = object.require_uid_or(ReconcilerError::MissingObjectMetadata)?;

    info!("Deleting the infrastructure of '{name}' in '{namespace}' namespace...");

    let mut status = object.status.clone().unwrap_or_default();
    let mut scope = ClusterScope::new(
        uid,
        &object.spec.network,
        std::mem::take(&mut status.network),
    );
    let cloud = CloudServices::from_client(&context.cloud);

    let cleanup_result = reconcile_delete(&mut scope, &cloud).await;
    status.network = scope.into_resources();
    status.ready = false;

    match cleanup_result {
        Ok(_) => {
            apply_status(context, name, namespace, &status).await?;

            Ok(Action::await_change())
        }
        Err(error) => {
            mark_failed(&mut status.conditions, &error);

            let _ = apply_status(context, name, namespace, &status).await;

            Err(error)
        }
    }
}

/// Tears the resources down in reverse dependency order. Routes go before the nat
/// service and the internet service they point to.
async fn reconcile_delete(
    scope: &mut ClusterScope,
    cloud: &CloudServices<'_>,
) -> Result<(), ReconcilerError> {
    load_balancer::reconcile_delete_load_balancer(scope, cloud.load_balancer).await?;

    if !scope.resources.route_table_ref.is_empty() {
        route_table::reconcile_delete_route_table(scope, cloud.route_table).await?;
    }

    nat_service::reconcile_delete_nat_service(scope, cloud.nat_service).await?;
    public_ip::reconcile_delete_public_ip(scope, cloud.public_ip).await?;

    if !scope.resources.security_group_ref.is_empty() {
        security_group::reconcile_delete_security_group(scope, cloud.security_group).await?;
    }

    internet_service::reconcile_delete_internet_service(scope, cloud.internet_service).await?;

    if !scope.resources.subnet_ref.is_empty() {
        subnet::reconcile_delete_subnet(scope, cloud.subnet).await?;
    }

    net::reconcile_delete_net(scope, cloud.net).await
}

/// Whether the owning CAPI `Cluster` is set, exists and isn't paused.
async fn is_owner_ready(
    object: &OscCluster,
    namespace: &str,
    context: &ReconcilerContext,
) -> Result<bool, ReconcilerError> {
    let Some(cluster_name) = get_owner_cluster_name(object) else {
        info!("Waiting for the Cluster controller to set the owner reference...");
        return Ok(false);
    };

    let cluster = try_get_resource::<Cluster>(&context.client, cluster_name, namespace)
        .await
        .map_err(ReconcilerError::KubeApiError)?;

    match cluster {
        None => {
            info!("Waiting for cluster '{cluster_name}' to appear...");
            Ok(false)
        }
        Some(cluster) if cluster.spec.paused.unwrap_or(false) || is_paused(object) => {
            info!("Cluster '{cluster_name}' is paused");
            Ok(false)
        }
        Some(_) => Ok(true),
    }
}

async fn ensure_control_plane_endpoint(
    object: &OscCluster,
    network: &OscNetwork,
    dns_name: String,
    context: &ReconcilerContext,
) -> Result<(), ReconcilerError> {
    if object.spec.control_plane_endpoint.is_some() || dns_name.is_empty() {
        return Ok(());
    }

    let endpoint = ApiEndpoint {
        host: dns_name,
        port: network.load_balancer.listener.load_balancer_port,
    };

    info!(
        "Setting the control plane endpoint to {}:{}",
        endpoint.host, endpoint.port
    );

    merge_resource_spec::<OscCluster, _>(
        &context.client,
        json!({ "controlPlaneEndpoint": endpoint }),
        object.require_name_or(ReconcilerError::MissingObjectMetadata)?,
        object.require_namespace_or(ReconcilerError::MissingObjectMetadata)?,
        &PatchParams::apply(CLUSTER_FIELD_MANAGER),
    )
    .await
    .map_err(ReconcilerError::KubeApiError)?;

    Ok(())
}

async fn apply_status(
    context: &ReconcilerContext,
    name: &str,
    namespace: &str,
    status: &OscClusterStatus,
) -> Result<(), ReconcilerError> {
    apply_resource_status::<OscCluster, _>(
        &context.client,
        status,
        name,
        namespace,
        &PatchParams::apply(CLUSTER_FIELD_MANAGER),
    )
    .await
    .map_err(ReconcilerError::KubeApiError)?;

    Ok(())
}

fn track<T>(
    conditions: &mut Vec<Condition>,
    condition: &str,
    reason: &str,
    result: Result<T, ReconcilerError>,
) -> Result<T, ReconcilerError> {
    match &result {
        Ok(_) => mark_true(conditions, condition),
        Err(error) => mark_false(
            conditions,
            condition,
            reason,
            ConditionSeverity::Warning,
            error.to_string(),
        ),
    }

    result
}

fn mark_failed(conditions: &mut Vec<Condition>, error: &ReconcilerError) {
    let severity = if error.is_user_error() {
        ConditionSeverity::Error
    } else {
        ConditionSeverity::Warning
    };

    mark_false(
        conditions,
        READY_CONDITION,
        get_error_reason(error),
        severity,
        error.to_string(),
    );
}

fn get_error_reason(error: &ReconcilerError) -> &'static str {
    match error {
        ReconcilerError::MissingObjectMetadata => "MissingObjectMetadata",
        ReconcilerError::KubeApiError(_) => "KubernetesApiError",
        ReconcilerError::MissingReference(_) => "MissingReference",
        ReconcilerError::InvalidSpec(_) => "InvalidSpec",
        ReconcilerError::Cloud { .. } | ReconcilerError::UnprefixedCloud(_) => "CloudApiError",
        ReconcilerError::LoadBalancerConflict { .. } => "LoadBalancerConflict",
    }
}

fn get_failure_domains(network: &OscNetwork) -> BTreeMap<String, FailureDomain> {
    network
        .subnets
        .iter()
        .filter_map(|subnet| subnet.subregion_name.clone())
        .map(|subregion| {
            (
                subregion,
                FailureDomain {
                    control_plane: true,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use osc_capi_core::{
        resources::{
            conditions::{get_condition, is_true, ConditionSeverity, READY_CONDITION},
            crd::v1beta1::osccluster::{OscNetwork, OscSubnet},
            refs::RefError,
        },
        validation::{InvalidResource, ValidationError},
    };

    use super::{get_failure_domains, mark_failed, track, ReconcilerError};

    #[test]
    fn failure_domains_are_the_distinct_subregions() {
        let subnet = |name: &str, subregion: &str| OscSubnet {
            name: name.to_owned(),
            ip_subnet_range: "10.0.0.0/24".to_owned(),
            subregion_name: Some(subregion.to_owned()),
            resource_id: None,
        };
        let network = OscNetwork {
            subnets: vec![
                subnet("kcp-a", "eu-west-2a"),
                subnet("kw-a", "eu-west-2a"),
                subnet("kw-b", "eu-west-2b"),
            ],
            ..Default::default()
        };

        let domains = get_failure_domains(&network);

        assert_eq!(
            domains.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["eu-west-2a", "eu-west-2b"]
        );
        assert!(domains["eu-west-2b"].control_plane);
    }

    #[test]
    fn tracked_steps_set_their_condition() {
        let mut conditions = vec![];

        let ok: Result<(), ReconcilerError> = Ok(());
        track(&mut conditions, "NetReady", "NetReconciliationFailed", ok).unwrap();
        let failed: Result<(), ReconcilerError> =
            Err(RefError::NotFound("test-net-uid".to_owned()).into());
        track(
            &mut conditions,
            "SubnetsReady",
            "SubnetReconciliationFailed",
            failed,
        )
        .unwrap_err();

        assert!(is_true(&conditions, "NetReady"));
        let subnets = get_condition(&conditions, "SubnetsReady").unwrap();
        assert_eq!(subnets.reason.as_deref(), Some("SubnetReconciliationFailed"));
        assert_eq!(subnets.message.as_deref(), Some("test-net-uid does not exist"));
    }

    #[test]
    fn invalid_spec_fails_ready_with_error_severity() {
        let mut conditions = vec![];
        let error = ReconcilerError::InvalidSpec(InvalidResource::new(
            "test-net-uid",
            ValidationError::InvalidCidr("10.0.0.0/42".to_owned()),
        ));

        mark_failed(&mut conditions, &error);

        let ready = get_condition(&conditions, READY_CONDITION).unwrap();
        assert_eq!(ready.reason.as_deref(), Some("InvalidSpec"));
        assert_eq!(ready.severity, Some(ConditionSeverity::Error));
    }
}
