use log::{debug, info};
use osc_capi_core::resources::labels::NAME_TAG_KEY;

use crate::cloud::{
    subnet::SubnetService,
    tag::{cluster_resource_tags, TagService},
};

use super::{
    error::ReconcilerError,
    scope::{adopt_resource_id, forget_resource, record_untagged, retag_resource, ClusterScope},
};

pub async fn reconcile_subnet(
    scope: &mut ClusterScope,
    subnets: &dyn SubnetService,
    tags: &dyn TagService,
) -> Result<(), ReconcilerError> {
    let net_name = scope.suffixed(&scope.network.net.name);
    let net_id = scope.resources.net_ref.get(&net_name)?.to_owned();
    let subnet_ids = subnets
        .get_subnet_ids_from_net_ids(&net_id)
        .await
        .map_err(ReconcilerError::cloud("cannot list subnets"))?;
    let cluster_name = scope.cluster_name();

    for subnet_spec in scope.network.subnets.clone() {
        let subnet_name = scope.suffixed(&subnet_spec.name);
        let tag = tags
            .read_tag(NAME_TAG_KEY, &subnet_name)
            .await
            .map_err(ReconcilerError::cloud("cannot get tag"))?;
        let subnet_id = adopt_resource_id(
            &mut scope.resources.subnet_ref,
            &mut scope.resources.managed_by,
            &subnet_name,
            subnet_spec.resource_id.as_deref(),
            tag.as_ref().map(|tag| tag.resource_id.as_str()),
        );

        if let Some(subnet_id) = subnet_id.filter(|id| tag.is_some() || subnet_ids.contains(id)) {
            debug!("Subnet {subnet_name} exists");
            retag_resource(
                tags,
                tag.as_ref(),
                &scope.resources.managed_by,
                &subnet_id,
                cluster_resource_tags(&cluster_name, &subnet_name),
            )
            .await?;
            continue;
        }

        info!(
            "Creating subnet {subnet_name} ({}) in {net_id}...",
            subnet_spec.ip_subnet_range
        );

        let subnet = subnets
            .create_subnet(&subnet_spec, &net_id, &cluster_name, &subnet_name)
            .await
            .map_err(record_untagged(
                &mut scope.resources.subnet_ref,
                &mut scope.resources.managed_by,
                &subnet_name,
            ))
            .map_err(ReconcilerError::cloud("cannot create subnet"))?;

        scope.resources.subnet_ref.set(&subnet_name, &subnet.subnet_id);
        scope.resources.managed_by.mark_capi(&subnet.subnet_id);
    }

    Ok(())
}

pub async fn reconcile_delete_subnet(
    scope: &mut ClusterScope,
    subnets: &dyn SubnetService,
) -> Result<(), ReconcilerError> {
    let net_name = scope.suffixed(&scope.network.net.name);
    let net_id = scope.resources.net_ref.get(&net_name)?.to_owned();
    let subnet_ids = subnets
        .get_subnet_ids_from_net_ids(&net_id)
        .await
        .map_err(ReconcilerError::cloud("cannot list subnets"))?;

    for subnet_spec in scope.network.subnets.clone() {
        let subnet_name = scope.suffixed(&subnet_spec.name);
        let Some(subnet_id) = scope
            .resources
            .subnet_ref
            .try_get(&subnet_name)
            .map(str::to_owned)
        else {
            continue;
        };

        if !subnet_ids.contains(&subnet_id) {
            info!("Subnet {subnet_name} is already deleted");
        } else if scope.resources.managed_by.is_external(&subnet_id) {
            info!("Keeping subnet {subnet_id}, it isn't managed by the cluster");
        } else {
            info!("Deleting subnet {subnet_name}...");

            subnets
                .delete_subnet(&subnet_id)
                .await
                .map_err(ReconcilerError::cloud("cannot delete subnet"))?;
        }

        forget_resource(
            &mut scope.resources.subnet_ref,
            &mut scope.resources.managed_by,
            &subnet_name,
        );
    }

    Ok(())
}
