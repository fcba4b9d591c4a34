use log::{debug, info};
use osc_capi_core::resources::{
    crd::v1beta1::osccluster::OscSecurityGroup, labels::NAME_TAG_KEY,
};

use crate::cloud::{
    security_group::{security_group_tags, SecurityGroupService},
    tag::TagService,
};

use super::{
    error::ReconcilerError,
    scope::{adopt_resource_id, forget_resource, record_untagged, retag_resource, ClusterScope},
};

/// Creates the missing security groups of the net and adds the rules they lack.
pub async fn reconcile_security_group(
    scope: &mut ClusterScope,
    security_groups: &dyn SecurityGroupService,
    tags: &dyn TagService,
) -> Result<(), ReconcilerError> {
    let net_name = scope.suffixed(&scope.network.net.name);
    let net_id = scope.resources.net_ref.get(&net_name)?.to_owned();
    let security_group_ids = security_groups
        .get_security_group_ids_from_net_ids(&net_id)
        .await
        .map_err(ReconcilerError::cloud("cannot list securitygroups"))?;
    let cluster_name = scope.cluster_name();

    for security_group_spec in scope.network.security_groups.clone() {
        let security_group_name = scope.suffixed(&security_group_spec.name);
        let tag = tags
            .read_tag(NAME_TAG_KEY, &security_group_name)
            .await
            .map_err(ReconcilerError::cloud("cannot get tag"))?;
        let security_group_id = adopt_resource_id(
            &mut scope.resources.security_group_ref,
            &mut scope.resources.managed_by,
            &security_group_name,
            security_group_spec.resource_id.as_deref(),
            tag.as_ref().map(|tag| tag.resource_id.as_str()),
        );

        let security_group = match security_group_id {
            Some(id) if security_group_ids.contains(&id) || tag.is_some() => {
                let existing = security_groups
                    .get_security_group(&id)
                    .await
                    .map_err(ReconcilerError::cloud("cannot read securitygroup"))?;

                if existing.is_some() {
                    retag_resource(
                        tags,
                        tag.as_ref(),
                        &scope.resources.managed_by,
                        &id,
                        security_group_tags(
                            &cluster_name,
                            &security_group_name,
                            security_group_spec.tag.as_deref().unwrap_or_default(),
                        ),
                    )
                    .await?;
                }

                existing.unwrap_or_default()
            }
            _ => {
                info!("Creating security group {security_group_name}...");

                let security_group = security_groups
                    .create_security_group(
                        &net_id,
                        &cluster_name,
                        &security_group_name,
                        &security_group_spec.description,
                        security_group_spec.tag.as_deref().unwrap_or_default(),
                    )
                    .await
                    .map_err(record_untagged(
                        &mut scope.resources.security_group_ref,
                        &mut scope.resources.managed_by,
                        &security_group_name,
                    ))
                    .map_err(ReconcilerError::cloud("cannot create securitygroup"))?;

                scope
                    .resources
                    .security_group_ref
                    .set(&security_group_name, &security_group.security_group_id);
                scope
                    .resources
                    .managed_by
                    .mark_capi(&security_group.security_group_id);

                security_group
            }
        };

        let security_group_id = scope
            .resources
            .security_group_ref
            .get(&security_group_name)?
            .to_owned();

        for rule in &security_group_spec.security_group_rules {
            let rule_name = scope.suffixed(&rule.name);

            if security_group.has_rule(rule) {
                debug!("Security group rule {rule_name} exists");
            } else {
                info!(
                    "Adding rule {rule_name} ({} {}-{} from {}) to {security_group_name}...",
                    rule.ip_protocol, rule.from_port_range, rule.to_port_range, rule.ip_range
                );

                security_groups
                    .create_security_group_rule(&security_group_id, rule)
                    .await
                    .map_err(ReconcilerError::cloud("cannot create securitygrouprule"))?;
            }

            scope
                .resources
                .security_group_rule_ref
                .set(rule_name, &security_group_id);
        }
    }

    Ok(())
}

/// Deleting a security group still used by a vm or a load balancer fails, the caller
/// retries once the dependants are gone.
pub async fn reconcile_delete_security_group(
    scope: &mut ClusterScope,
    security_groups: &dyn SecurityGroupService,
) -> Result<(), ReconcilerError> {
    let net_name = scope.suffixed(&scope.network.net.name);
    let net_id = scope.resources.net_ref.get(&net_name)?.to_owned();
    let security_group_ids = security_groups
        .get_security_group_ids_from_net_ids(&net_id)
        .await
        .map_err(ReconcilerError::cloud("cannot list securitygroups"))?;

    for security_group_spec in scope.network.security_groups.clone() {
        let security_group_name = scope.suffixed(&security_group_spec.name);
        let Some(security_group_id) = scope
            .resources
            .security_group_ref
            .try_get(&security_group_name)
            .map(str::to_owned)
        else {
            continue;
        };

        if !security_group_ids.contains(&security_group_id) {
            info!("Security group {security_group_name} is already deleted");
        } else if scope.resources.managed_by.is_external(&security_group_id) {
            info!("Keeping security group {security_group_id}, it isn't managed by the cluster");
        } else {
            info!("Deleting security group {security_group_name}...");

            security_groups
                .delete_security_group(&security_group_id)
                .await
                .map_err(ReconcilerError::cloud("cannot delete securitygroup"))?;
        }

        forget_security_group(scope, &security_group_spec, &security_group_name);
    }

    Ok(())
}

fn forget_security_group(
    scope: &mut ClusterScope,
    security_group_spec: &OscSecurityGroup,
    security_group_name: &str,
) {
    for rule in &security_group_spec.security_group_rules {
        let rule_name = scope.suffixed(&rule.name);
        scope.resources.security_group_rule_ref.remove(&rule_name);
    }

    forget_resource(
        &mut scope.resources.security_group_ref,
        &mut scope.resources.managed_by,
        security_group_name,
    );
}
