use log::{debug, info};
use osc_capi_core::resources::labels::NAME_TAG_KEY;

use crate::cloud::{
    nat_service::NatServiceService,
    tag::{cluster_resource_tags, TagService},
};

use super::{
    error::ReconcilerError,
    scope::{adopt_resource_id, forget_resource, record_untagged, retag_resource, ClusterScope},
};

/// Creates the nat service in its subnet behind its public ip.
pub async fn reconcile_nat_service(
    scope: &mut ClusterScope,
    nat_services: &dyn NatServiceService,
    tags: &dyn TagService,
) -> Result<(), ReconcilerError> {
    let nat_service_spec = scope.network.nat_service.clone();
    let public_ip_name = scope.suffixed(&nat_service_spec.public_ip_name);
    let public_ip_id = scope.resources.public_ip_ref.get(&public_ip_name)?.to_owned();
    let subnet_name = scope.suffixed(&nat_service_spec.subnet_name);
    let subnet_id = scope.resources.subnet_ref.get(&subnet_name)?.to_owned();

    let nat_service_name = scope.suffixed(&nat_service_spec.name);
    let tag = tags
        .read_tag(NAME_TAG_KEY, &nat_service_name)
        .await
        .map_err(ReconcilerError::cloud("cannot get tag"))?;
    let nat_service_id = adopt_resource_id(
        &mut scope.resources.nat_service_ref,
        &mut scope.resources.managed_by,
        &nat_service_name,
        nat_service_spec.resource_id.as_deref(),
        tag.as_ref().map(|tag| tag.resource_id.as_str()),
    );

    if let Some(nat_service_id) = nat_service_id {
        let nat_service = nat_services
            .get_nat_service(&nat_service_id)
            .await
            .map_err(ReconcilerError::cloud("cannot read natservice"))?;

        if let Some(nat_service) = nat_service {
            debug!(
                "Nat service {nat_service_name} is {}",
                nat_service.state
            );
            return retag_resource(
                tags,
                tag.as_ref(),
                &scope.resources.managed_by,
                &nat_service_id,
                cluster_resource_tags(&scope.cluster_name(), &nat_service_name),
            )
            .await;
        }
    }

    info!("Creating nat service {nat_service_name} in {subnet_id}...");

    let nat_service = nat_services
        .create_nat_service(
            &public_ip_id,
            &subnet_id,
            &scope.cluster_name(),
            &nat_service_name,
        )
        .await
        .map_err(record_untagged(
            &mut scope.resources.nat_service_ref,
            &mut scope.resources.managed_by,
            &nat_service_name,
        ))
        .map_err(ReconcilerError::cloud("cannot create natservice"))?;

    scope
        .resources
        .nat_service_ref
        .set(&nat_service_name, &nat_service.nat_service_id);
    scope
        .resources
        .managed_by
        .mark_capi(&nat_service.nat_service_id);

    Ok(())
}

pub async fn reconcile_delete_nat_service(
    scope: &mut ClusterScope,
    nat_services: &dyn NatServiceService,
) -> Result<(), ReconcilerError> {
    let nat_service_name = scope.suffixed(&scope.network.nat_service.name);
    let Some(nat_service_id) = scope
        .resources
        .nat_service_ref
        .try_get(&nat_service_name)
        .map(str::to_owned)
    else {
        debug!("Nat service {nat_service_name} was never created");
        return Ok(());
    };

    if scope.resources.managed_by.is_external(&nat_service_id) {
        info!("Keeping nat service {nat_service_id}, it isn't managed by the cluster");
    } else if nat_services
        .get_nat_service(&nat_service_id)
        .await
        .map_err(ReconcilerError::cloud("cannot read natservice"))?
        .is_none()
    {
        info!("Nat service {nat_service_name} is already deleted");
    } else {
        info!("Deleting nat service {nat_service_name}...");

        nat_services
            .delete_nat_service(&nat_service_id)
            .await
            .map_err(ReconcilerError::cloud("cannot delete natservice"))?;
    }

    forget_resource(
        &mut scope.resources.nat_service_ref,
        &mut scope.resources.managed_by,
        &nat_service_name,
    );

    Ok(())
}
