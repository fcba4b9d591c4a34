use log::{debug, info, warn};
use osc_capi_core::resources::labels::LOAD_BALANCER_CLUSTER_TAG_KEY;

use crate::cloud::{
    load_balancer::{LoadBalancer, LoadBalancerService},
    ResourceTag,
};

use super::{error::ReconcilerError, scope::ClusterScope};

/// Makes sure the control plane load balancer exists and belongs to this cluster.
/// Returns its DNS name.
pub async fn reconcile_load_balancer(
    scope: &mut ClusterScope,
    load_balancers: &dyn LoadBalancerService,
) -> Result<String, ReconcilerError> {
    let load_balancer_spec = scope.network.load_balancer.clone();
    let load_balancer_name = load_balancer_spec.load_balancer_name.clone();
    let subnet_name = scope.suffixed(&load_balancer_spec.subnet_name);
    let subnet_id = scope.resources.subnet_ref.get(&subnet_name)?.to_owned();
    let security_group_name = scope.suffixed(&load_balancer_spec.security_group_name);
    let security_group_id = scope
        .resources
        .security_group_ref
        .get(&security_group_name)?
        .to_owned();
    let cluster_name = scope.cluster_name();

    let existing = load_balancers
        .get_load_balancer(&load_balancer_name)
        .await
        .map_err(ReconcilerError::cloud("cannot get loadbalancer"))?;

    let load_balancer = match existing {
        Some(load_balancer) => {
            let owner = load_balancers
                .get_load_balancer_tag(&load_balancer_name, LOAD_BALANCER_CLUSTER_TAG_KEY)
                .await
                .map_err(ReconcilerError::cloud("cannot get loadbalancer tag"))?;

            match owner {
                Some(owner) if owner != cluster_name => {
                    return Err(ReconcilerError::LoadBalancerConflict {
                        name: load_balancer_name,
                        owner,
                    })
                }
                Some(_) => load_balancer,
                None => {
                    // an earlier pass created it but didn't get to finish the setup
                    finish_load_balancer(scope, load_balancers, &cluster_name).await?
                }
            }
        }
        None => {
            info!("Creating load balancer {load_balancer_name}...");

            load_balancers
                .create_load_balancer(&load_balancer_spec, &subnet_id, &security_group_id)
                .await
                .map_err(ReconcilerError::cloud("cannot create loadbalancer"))?;

            finish_load_balancer(scope, load_balancers, &cluster_name).await?
        }
    };

    scope
        .resources
        .load_balancer_ref
        .set(&load_balancer_name, &load_balancer_name);

    debug!(
        "Load balancer {load_balancer_name} is reachable at {}",
        load_balancer.dns_name
    );

    Ok(load_balancer.dns_name)
}

async fn finish_load_balancer(
    scope: &ClusterScope,
    load_balancers: &dyn LoadBalancerService,
    cluster_name: &str,
) -> Result<LoadBalancer, ReconcilerError> {
    let load_balancer_spec = &scope.network.load_balancer;
    let load_balancer_name = &load_balancer_spec.load_balancer_name;

    let load_balancer = load_balancers
        .configure_health_check(load_balancer_name, &load_balancer_spec.health_check)
        .await
        .map_err(ReconcilerError::cloud("cannot configure healthcheck"))?;

    load_balancers
        .create_load_balancer_tag(
            load_balancer_name,
            &ResourceTag::new(LOAD_BALANCER_CLUSTER_TAG_KEY, cluster_name),
        )
        .await
        .map_err(ReconcilerError::cloud("cannot tag loadbalancer"))?;

    Ok(load_balancer)
}

pub async fn reconcile_delete_load_balancer(
    scope: &mut ClusterScope,
    load_balancers: &dyn LoadBalancerService,
) -> Result<(), ReconcilerError> {
    let load_balancer_name = scope.network.load_balancer.load_balancer_name.clone();
    let load_balancer = load_balancers
        .get_load_balancer(&load_balancer_name)
        .await
        .map_err(ReconcilerError::cloud("cannot get loadbalancer"))?;

    if load_balancer.is_none() {
        info!("Load balancer {load_balancer_name} is already deleted");
        scope.resources.load_balancer_ref.remove(&load_balancer_name);
        return Ok(());
    }

    let owner = load_balancers
        .get_load_balancer_tag(&load_balancer_name, LOAD_BALANCER_CLUSTER_TAG_KEY)
        .await
        .map_err(ReconcilerError::cloud("cannot get loadbalancer tag"))?;
    let owned = match owner {
        Some(owner) => owner == scope.cluster_name(),
        None => scope
            .resources
            .load_balancer_ref
            .try_get(&load_balancer_name)
            .is_some(),
    };

    if owned {
        info!("Deleting load balancer {load_balancer_name}...");

        load_balancers
            .delete_load_balancer(&load_balancer_name)
            .await
            .map_err(ReconcilerError::cloud("cannot delete loadbalancer"))?;
    } else {
        warn!("Keeping load balancer {load_balancer_name}, it belongs to another cluster");
    }

    scope.resources.load_balancer_ref.remove(&load_balancer_name);

    Ok(())
}

#[cfg(test)]
mod tests {
    use mockall::predicate::{always, eq};
    use osc_capi_core::resources::{
        crd::v1beta1::osccluster::{OscLoadBalancer, OscNetwork},
        defaults::default_load_balancer,
    };

    use crate::{
        cloud::{
            load_balancer::{LoadBalancer, MockLoadBalancerService},
            ResourceTag,
        },
        cluster::reconciler::{
            error::ReconcilerError,
            fixtures::{generic_error, scope_with_net, test_network},
            scope::ClusterScope,
        },
    };

    use super::{reconcile_delete_load_balancer, reconcile_load_balancer};

    const LOAD_BALANCER_NAME: &str = "test-loadbalancer";
    const DNS_NAME: &str = "test-loadbalancer.eu-west-2.lbu.outscale.com";
    const SUBNET_ID: &str = "subnet-test-subnet-uid";
    const SECURITY_GROUP_ID: &str = "sg-test-securitygroup-uid";

    fn network() -> OscNetwork {
        OscNetwork {
            load_balancer: OscLoadBalancer {
                load_balancer_name: LOAD_BALANCER_NAME.to_owned(),
                subnet_name: "test-subnet".to_owned(),
                security_group_name: "test-securitygroup".to_owned(),
                ..default_load_balancer()
            },
            ..test_network()
        }
    }

    fn load_balancer() -> LoadBalancer {
        LoadBalancer {
            load_balancer_name: LOAD_BALANCER_NAME.to_owned(),
            dns_name: DNS_NAME.to_owned(),
            ..Default::default()
        }
    }

    fn provisioned_scope() -> ClusterScope {
        let mut scope = scope_with_net(&network());
        scope.resources.subnet_ref.set("test-subnet-uid", SUBNET_ID);
        scope
            .resources
            .security_group_ref
            .set("test-securitygroup-uid", SECURITY_GROUP_ID);
        scope
    }

    fn expect_owner(load_balancers: &mut MockLoadBalancerService, owner: Option<&'static str>) {
        load_balancers
            .expect_get_load_balancer_tag()
            .with(eq(LOAD_BALANCER_NAME), eq("clustername"))
            .times(1)
            .returning(move |_, _| Ok(owner.map(str::to_owned)));
    }

    fn expect_finished(load_balancers: &mut MockLoadBalancerService) {
        load_balancers
            .expect_configure_health_check()
            .with(eq(LOAD_BALANCER_NAME), always())
            .times(1)
            .returning(|_, health_check| {
                assert_eq!(health_check.port, 6443);
                Ok(load_balancer())
            });
        load_balancers
            .expect_create_load_balancer_tag()
            .with(
                eq(LOAD_BALANCER_NAME),
                eq(ResourceTag::new("clustername", "test-cluster-uid")),
            )
            .times(1)
            .returning(|_, _| Ok(()));
    }

    #[tokio::test]
    async fn load_balancer_is_created_configured_and_tagged() {
        let mut scope = provisioned_scope();
        let mut load_balancers = MockLoadBalancerService::new();

        load_balancers
            .expect_get_load_balancer()
            .with(eq(LOAD_BALANCER_NAME))
            .returning(|_| Ok(None));
        load_balancers
            .expect_create_load_balancer()
            .with(always(), eq(SUBNET_ID), eq(SECURITY_GROUP_ID))
            .times(1)
            .returning(|_, _, _| Ok(load_balancer()));
        expect_finished(&mut load_balancers);

        let dns_name = reconcile_load_balancer(&mut scope, &load_balancers)
            .await
            .unwrap();

        assert_eq!(dns_name, DNS_NAME);
        assert_eq!(
            scope.resources.load_balancer_ref.get(LOAD_BALANCER_NAME),
            Ok(LOAD_BALANCER_NAME)
        );
    }

    #[tokio::test]
    async fn owned_load_balancer_is_reused() {
        let mut scope = provisioned_scope();
        let mut load_balancers = MockLoadBalancerService::new();

        load_balancers
            .expect_get_load_balancer()
            .returning(|_| Ok(Some(load_balancer())));
        expect_owner(&mut load_balancers, Some("test-cluster-uid"));
        load_balancers.expect_create_load_balancer().never();
        load_balancers.expect_configure_health_check().never();

        let dns_name = reconcile_load_balancer(&mut scope, &load_balancers)
            .await
            .unwrap();

        assert_eq!(dns_name, DNS_NAME);
    }

    #[tokio::test]
    async fn untagged_load_balancer_setup_is_resumed() {
        let mut scope = provisioned_scope();
        let mut load_balancers = MockLoadBalancerService::new();

        load_balancers
            .expect_get_load_balancer()
            .returning(|_| Ok(Some(load_balancer())));
        expect_owner(&mut load_balancers, None);
        load_balancers.expect_create_load_balancer().never();
        expect_finished(&mut load_balancers);

        reconcile_load_balancer(&mut scope, &load_balancers)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn load_balancer_of_another_cluster_is_a_conflict() {
        let mut scope = provisioned_scope();
        let mut load_balancers = MockLoadBalancerService::new();

        load_balancers
            .expect_get_load_balancer()
            .returning(|_| Ok(Some(load_balancer())));
        expect_owner(&mut load_balancers, Some("other-cluster-uid"));

        let error = reconcile_load_balancer(&mut scope, &load_balancers)
            .await
            .unwrap_err();

        assert!(matches!(
            &error,
            ReconcilerError::LoadBalancerConflict { owner, .. } if owner == "other-cluster-uid"
        ));
        assert!(error.is_user_error());
        assert!(scope.resources.load_balancer_ref.is_empty());
    }

    #[tokio::test]
    async fn load_balancer_requires_subnet_and_security_group() {
        let mut scope = provisioned_scope();
        scope.resources.subnet_ref.remove("test-subnet-uid");
        let error = reconcile_load_balancer(&mut scope, &MockLoadBalancerService::new())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "test-subnet-uid does not exist");

        let mut scope = provisioned_scope();
        scope
            .resources
            .security_group_ref
            .remove("test-securitygroup-uid");
        let error = reconcile_load_balancer(&mut scope, &MockLoadBalancerService::new())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "test-securitygroup-uid does not exist");
    }

    #[tokio::test]
    async fn load_balancer_failures_are_reported() {
        let mut load_balancers = MockLoadBalancerService::new();
        load_balancers
            .expect_get_load_balancer()
            .returning(|_| Err(generic_error("GetLoadBalancer generic error")));
        let error = reconcile_load_balancer(&mut provisioned_scope(), &load_balancers)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot get loadbalancer: GetLoadBalancer generic error"
        );

        let mut load_balancers = MockLoadBalancerService::new();
        load_balancers
            .expect_get_load_balancer()
            .returning(|_| Ok(None));
        load_balancers
            .expect_create_load_balancer()
            .returning(|_, _, _| Err(generic_error("CreateLoadBalancer generic error")));
        let error = reconcile_load_balancer(&mut provisioned_scope(), &load_balancers)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot create loadbalancer: CreateLoadBalancer generic error"
        );

        let mut load_balancers = MockLoadBalancerService::new();
        load_balancers
            .expect_get_load_balancer()
            .returning(|_| Ok(None));
        load_balancers
            .expect_create_load_balancer()
            .returning(|_, _, _| Ok(load_balancer()));
        load_balancers
            .expect_configure_health_check()
            .returning(|_, _| Err(generic_error("ConfigureHealthCheck generic error")));
        let error = reconcile_load_balancer(&mut provisioned_scope(), &load_balancers)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot configure healthcheck: ConfigureHealthCheck generic error"
        );

        let mut load_balancers = MockLoadBalancerService::new();
        load_balancers
            .expect_get_load_balancer()
            .returning(|_| Ok(None));
        load_balancers
            .expect_create_load_balancer()
            .returning(|_, _, _| Ok(load_balancer()));
        load_balancers
            .expect_configure_health_check()
            .returning(|_, _| Ok(load_balancer()));
        load_balancers
            .expect_create_load_balancer_tag()
            .returning(|_, _| Err(generic_error("CreateLoadBalancerTag generic error")));
        let error = reconcile_load_balancer(&mut provisioned_scope(), &load_balancers)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot tag loadbalancer: CreateLoadBalancerTag generic error"
        );
    }

    #[tokio::test]
    async fn delete_removes_owned_load_balancer() {
        let mut scope = provisioned_scope();
        scope
            .resources
            .load_balancer_ref
            .set(LOAD_BALANCER_NAME, LOAD_BALANCER_NAME);
        let mut load_balancers = MockLoadBalancerService::new();

        load_balancers
            .expect_get_load_balancer()
            .returning(|_| Ok(Some(load_balancer())));
        expect_owner(&mut load_balancers, Some("test-cluster-uid"));
        load_balancers
            .expect_delete_load_balancer()
            .with(eq(LOAD_BALANCER_NAME))
            .times(1)
            .returning(|_| Ok(()));

        reconcile_delete_load_balancer(&mut scope, &load_balancers)
            .await
            .unwrap();

        assert!(scope.resources.load_balancer_ref.is_empty());
    }

    #[tokio::test]
    async fn delete_keeps_foreign_load_balancer() {
        let mut scope = provisioned_scope();
        let mut load_balancers = MockLoadBalancerService::new();

        load_balancers
            .expect_get_load_balancer()
            .returning(|_| Ok(Some(load_balancer())));
        expect_owner(&mut load_balancers, Some("other-cluster-uid"));
        load_balancers.expect_delete_load_balancer().never();

        reconcile_delete_load_balancer(&mut scope, &load_balancers)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_failure_is_reported() {
        let mut scope = provisioned_scope();
        let mut load_balancers = MockLoadBalancerService::new();

        load_balancers
            .expect_get_load_balancer()
            .returning(|_| Ok(Some(load_balancer())));
        expect_owner(&mut load_balancers, Some("test-cluster-uid"));
        load_balancers
            .expect_delete_load_balancer()
            .returning(|_| Err(generic_error("DeleteLoadBalancer generic error")));

        let error = reconcile_delete_load_balancer(&mut scope, &load_balancers)
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "cannot delete loadbalancer: DeleteLoadBalancer generic error"
        );
    }
}
