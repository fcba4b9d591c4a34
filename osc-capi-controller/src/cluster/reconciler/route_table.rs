use log::{debug, info};
use osc_capi_core::resources::{
    crd::v1beta1::osccluster::OscRoute, defaults::GATEWAY_TARGET_TYPE, labels::NAME_TAG_KEY,
};

use crate::cloud::{
    route_table::{LinkRouteTable, RouteTableService},
    tag::{cluster_resource_tags, TagService},
};

use super::{
    error::ReconcilerError,
    scope::{adopt_resource_id, forget_resource, record_untagged, retag_resource, ClusterScope},
};

/// Creates the missing route tables of the net, links them to their subnets and makes
/// sure every route exists.
pub async fn reconcile_route_table(
    scope: &mut ClusterScope,
    route_tables: &dyn RouteTableService,
    tags: &dyn TagService,
) -> Result<(), ReconcilerError> {
    let net_name = scope.suffixed(&scope.network.net.name);
    let net_id = scope.resources.net_ref.get(&net_name)?.to_owned();
    let route_table_ids = route_tables
        .get_route_table_ids_from_net_ids(&net_id)
        .await
        .map_err(ReconcilerError::cloud("list route tables"))?;
    let cluster_name = scope.cluster_name();

    for route_table_spec in scope.network.route_tables.clone() {
        let route_table_name = scope.suffixed(&route_table_spec.name);
        let tag = tags
            .read_tag(NAME_TAG_KEY, &route_table_name)
            .await
            .map_err(ReconcilerError::cloud("cannot get tag"))?;
        let route_table_id = adopt_resource_id(
            &mut scope.resources.route_table_ref,
            &mut scope.resources.managed_by,
            &route_table_name,
            route_table_spec.resource_id.as_deref(),
            tag.as_ref().map(|tag| tag.resource_id.as_str()),
        );

        let listed = route_table_id
            .as_ref()
            .is_some_and(|id| route_table_ids.contains(id));

        let (route_table_id, existing_links) = if !listed && tag.is_none() {
            info!("Creating route table {route_table_name}...");

            let route_table = route_tables
                .create_route_table(&net_id, &cluster_name, &route_table_name)
                .await
                .map_err(record_untagged(
                    &mut scope.resources.route_table_ref,
                    &mut scope.resources.managed_by,
                    &route_table_name,
                ))
                .map_err(ReconcilerError::cloud("cannot create routetable"))?;
            let route_table_id = route_table.route_table_id;

            scope
                .resources
                .route_table_ref
                .set(&route_table_name, &route_table_id);
            scope.resources.managed_by.mark_capi(&route_table_id);
            scope
                .resources
                .link_route_table_ref
                .remove(&route_table_name);

            (route_table_id, Some(Vec::new()))
        } else {
            let route_table_id = scope
                .resources
                .route_table_ref
                .get(&route_table_name)?
                .to_owned();

            retag_resource(
                tags,
                tag.as_ref(),
                &scope.resources.managed_by,
                &route_table_id,
                cluster_resource_tags(&cluster_name, &route_table_name),
            )
            .await?;

            (route_table_id, None)
        };

        reconcile_route_table_links(
            scope,
            &route_table_spec.subnets,
            &route_table_name,
            &route_table_id,
            existing_links,
            route_tables,
        )
        .await?;

        for route in &route_table_spec.routes {
            reconcile_route(scope, route, &route_table_name, route_tables).await?;
        }
    }

    Ok(())
}

/// Links the route table to the subnets whose link isn't recorded yet. `existing_links`
/// are the links of the table when known, they are read from the API otherwise so that
/// links made by an interrupted pass are recorded instead of made twice.
async fn reconcile_route_table_links(
    scope: &mut ClusterScope,
    subnets: &[String],
    route_table_name: &str,
    route_table_id: &str,
    existing_links: Option<Vec<LinkRouteTable>>,
    route_tables: &dyn RouteTableService,
) -> Result<(), ReconcilerError> {
    let recorded = scope
        .resources
        .link_route_table_ref
        .get(route_table_name)
        .map_or(0, Vec::len);
    if recorded >= subnets.len() {
        return Ok(());
    }

    let existing_links = match existing_links {
        Some(links) => links,
        None => route_tables
            .get_route_table(vec![route_table_id.to_owned()])
            .await
            .map_err(ReconcilerError::cloud("cannot get route table"))?
            .map(|route_table| route_table.link_route_tables)
            .unwrap_or_default(),
    };

    for subnet in subnets {
        let subnet_name = scope.suffixed(subnet);
        let subnet_id = scope.resources.subnet_ref.get(&subnet_name)?.to_owned();
        let link_id = match existing_links.iter().find(|link| link.subnet_id == subnet_id) {
            Some(link) => link.link_route_table_id.clone(),
            None => {
                info!("Linking route table {route_table_name} to {subnet_name}...");

                route_tables
                    .link_route_table(route_table_id, &subnet_id)
                    .await
                    .map_err(ReconcilerError::cloud("cannot link routetable with net"))?
            }
        };

        let links = scope
            .resources
            .link_route_table_ref
            .entry(route_table_name.to_owned())
            .or_default();
        if !links.contains(&link_id) {
            links.push(link_id);
        }
    }

    Ok(())
}

/// Creates the route if the route table doesn't carry it, including routes deleted
/// by hand.
pub async fn reconcile_route(
    scope: &mut ClusterScope,
    route: &OscRoute,
    route_table_name: &str,
    route_tables: &dyn RouteTableService,
) -> Result<(), ReconcilerError> {
    let target_id = get_route_target_id(scope, route)?;
    let route_name = scope.suffixed(&route.name);
    let route_table_id = scope
        .resources
        .route_table_ref
        .get(route_table_name)?
        .to_owned();

    let route_table = route_tables
        .get_route_table_from_route(&route_table_id, &target_id, &route.target_type)
        .await
        .map_err(ReconcilerError::cloud("cannot get route table"))?;

    let route_table = match route_table {
        Some(route_table) => route_table,
        None => {
            info!(
                "Creating route {route_name} to {} in {route_table_id}...",
                route.destination
            );

            route_tables
                .create_route(
                    &route.destination,
                    &route_table_id,
                    &target_id,
                    &route.target_type,
                )
                .await
                .map_err(ReconcilerError::cloud("cannot create route"))?
        }
    };

    scope
        .resources
        .route_ref
        .set(route_name, route_table.route_table_id);

    Ok(())
}

pub async fn reconcile_delete_route(
    scope: &mut ClusterScope,
    route: &OscRoute,
    route_tables: &dyn RouteTableService,
) -> Result<(), ReconcilerError> {
    let target_id = get_route_target_id(scope, route)?;
    let route_name = scope.suffixed(&route.name);
    let route_table_id = scope.resources.route_ref.get(&route_name)?.to_owned();

    let route_table = route_tables
        .get_route_table_from_route(&route_table_id, &target_id, &route.target_type)
        .await
        .map_err(ReconcilerError::cloud("checking route table"))?;

    if route_table.is_none() {
        info!("Route {route_name} is already deleted");
        scope.resources.route_ref.remove(&route_name);
        return Ok(());
    }

    info!("Deleting route {route_name}...");

    route_tables
        .delete_route(&route.destination, &route_table_id)
        .await
        .map_err(ReconcilerError::cloud("cannot delete route"))?;
    scope.resources.route_ref.remove(&route_name);

    Ok(())
}

/// Deletes the routes, subnet links and route tables of the net. Route tables brought
/// by the user are emptied of the cluster routes but kept.
pub async fn reconcile_delete_route_table(
    scope: &mut ClusterScope,
    route_tables: &dyn RouteTableService,
) -> Result<(), ReconcilerError> {
    let net_name = scope.suffixed(&scope.network.net.name);
    let net_id = scope.resources.net_ref.get(&net_name)?.to_owned();
    let route_table_ids = route_tables
        .get_route_table_ids_from_net_ids(&net_id)
        .await
        .map_err(ReconcilerError::UnprefixedCloud)?;

    for route_table_spec in scope.network.route_tables.clone() {
        let route_table_name = scope.suffixed(&route_table_spec.name);
        let Some(route_table_id) = scope
            .resources
            .route_table_ref
            .try_get(&route_table_name)
            .map(str::to_owned)
        else {
            debug!("Route table {route_table_name} was never created");
            continue;
        };

        if !route_table_ids.contains(&route_table_id) {
            info!("Route table {route_table_name} is already deleted");
            forget_route_table(scope, &route_table_name);
            continue;
        }

        for route in &route_table_spec.routes {
            let route_name = scope.suffixed(&route.name);
            if scope.resources.route_ref.try_get(&route_name).is_none() {
                continue;
            }

            reconcile_delete_route(scope, route, route_tables).await?;
        }

        let link_ids = scope
            .resources
            .link_route_table_ref
            .get(&route_table_name)
            .cloned()
            .unwrap_or_default();
        for link_id in link_ids {
            route_tables
                .unlink_route_table(&link_id)
                .await
                .map_err(ReconcilerError::cloud("cannot unlink routeTable"))?;

            if let Some(links) = scope
                .resources
                .link_route_table_ref
                .get_mut(&route_table_name)
            {
                links.retain(|id| id != &link_id);
            }
        }

        if scope.resources.managed_by.is_external(&route_table_id) {
            info!("Keeping route table {route_table_id}, it isn't managed by the cluster");
        } else {
            info!("Deleting route table {route_table_name}...");

            route_tables
                .delete_route_table(&route_table_id)
                .await
                .map_err(ReconcilerError::cloud("cannot delete routeTable"))?;
        }

        forget_route_table(scope, &route_table_name);
    }

    Ok(())
}

fn get_route_target_id(scope: &ClusterScope, route: &OscRoute) -> Result<String, ReconcilerError> {
    let target_name = scope.suffixed(&route.target_name);
    let reference = if route.target_type == GATEWAY_TARGET_TYPE {
        &scope.resources.internet_service_ref
    } else {
        &scope.resources.nat_service_ref
    };

    Ok(reference.get(&target_name)?.to_owned())
}

fn forget_route_table(scope: &mut ClusterScope, route_table_name: &str) {
    forget_resource(
        &mut scope.resources.route_table_ref,
        &mut scope.resources.managed_by,
        route_table_name,
    );
    scope
        .resources
        .link_route_table_ref
        .remove(route_table_name);
}
