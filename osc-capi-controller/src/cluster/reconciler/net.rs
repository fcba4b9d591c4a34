use log::{debug, info};
use osc_capi_core::resources::labels::NAME_TAG_KEY;

use crate::cloud::{
    net::NetService,
    tag::{cluster_resource_tags, TagService},
};

use super::{
    error::ReconcilerError,
    scope::{adopt_resource_id, forget_resource, record_untagged, retag_resource, ClusterScope},
};

pub async fn reconcile_net(
    scope: &mut ClusterScope,
    nets: &dyn NetService,
    tags: &dyn TagService,
) -> Result<(), ReconcilerError> {
    let net_spec = scope.network.net.clone();
    let net_name = scope.suffixed(&net_spec.name);
    let tag = tags
        .read_tag(NAME_TAG_KEY, &net_name)
        .await
        .map_err(ReconcilerError::cloud("cannot get tag"))?;
    let net_id = adopt_resource_id(
        &mut scope.resources.net_ref,
        &mut scope.resources.managed_by,
        &net_name,
        net_spec.resource_id.as_deref(),
        tag.as_ref().map(|tag| tag.resource_id.as_str()),
    );

    if let Some(net_id) = net_id {
        let net = nets
            .get_net(&net_id)
            .await
            .map_err(ReconcilerError::cloud("cannot read net"))?;

        if net.is_some() {
            debug!("Net {net_name} ({net_id}) exists");
            return retag_resource(
                tags,
                tag.as_ref(),
                &scope.resources.managed_by,
                &net_id,
                cluster_resource_tags(&scope.cluster_name(), &net_name),
            )
            .await;
        }

        info!("Net {net_id} is gone, recreating {net_name}...");
    } else {
        info!("Creating net {net_name}...");
    }

    let net = nets
        .create_net(&net_spec.ip_range, &scope.cluster_name(), &net_name)
        .await
        .map_err(record_untagged(
            &mut scope.resources.net_ref,
            &mut scope.resources.managed_by,
            &net_name,
        ))
        .map_err(ReconcilerError::cloud("cannot create net"))?;

    scope.resources.net_ref.set(&net_name, &net.net_id);
    scope.resources.managed_by.mark_capi(&net.net_id);

    Ok(())
}

pub async fn reconcile_delete_net(
    scope: &mut ClusterScope,
    nets: &dyn NetService,
) -> Result<(), ReconcilerError> {
    let net_name = scope.suffixed(&scope.network.net.name);
    let Some(net_id) = scope.resources.net_ref.try_get(&net_name).map(str::to_owned) else {
        debug!("Net {net_name} was never created");
        return Ok(());
    };

    if scope.resources.managed_by.is_external(&net_id) {
        info!("Keeping net {net_id}, it isn't managed by the cluster");
    } else if nets
        .get_net(&net_id)
        .await
        .map_err(ReconcilerError::cloud("cannot read net"))?
        .is_none()
    {
        info!("Net {net_name} is already deleted");
    } else {
        info!("Deleting net {net_name}...");

        nets.delete_net(&net_id)
            .await
            .map_err(ReconcilerError::cloud("cannot delete net"))?;
    }

    forget_resource(
        &mut scope.resources.net_ref,
        &mut scope.resources.managed_by,
        &net_name,
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use crate::{
        cloud::{
            error::CloudError,
            net::{MockNetService, Net},
            tag::{cluster_resource_tags, MockTagService},
        },
        cluster::reconciler::fixtures::{
            expect_tagged, expect_untagged, failing_tags, generic_error, new_scope,
            scope_with_net, test_network, NET_ID,
        },
    };

    use super::{reconcile_delete_net, reconcile_net};

    fn net() -> Net {
        Net {
            net_id: NET_ID.to_owned(),
            ip_range: "10.0.0.0/16".to_owned(),
            state: "available".to_owned(),
        }
    }

    #[tokio::test]
    async fn missing_net_is_created_and_owned() {
        let mut scope = new_scope(&test_network());
        let mut nets = MockNetService::new();
        let mut tags = MockTagService::new();

        expect_untagged(&mut tags, "test-net-uid");
        nets.expect_create_net()
            .with(eq("10.0.0.0/16"), eq("test-cluster-uid"), eq("test-net-uid"))
            .times(1)
            .returning(|_, _, _| Ok(net()));

        reconcile_net(&mut scope, &nets, &tags).await.unwrap();

        assert_eq!(scope.resources.net_ref.get("test-net-uid"), Ok(NET_ID));
        assert!(!scope.resources.managed_by.is_external(NET_ID));
        assert!(!scope.resources.managed_by.resource_map.is_empty());
    }

    #[tokio::test]
    async fn existing_net_is_not_recreated() {
        let mut scope = scope_with_net(&test_network());
        let mut nets = MockNetService::new();
        let mut tags = MockTagService::new();

        expect_tagged(&mut tags, "test-net-uid", NET_ID);
        nets.expect_get_net()
            .with(eq(NET_ID))
            .times(1)
            .returning(|_| Ok(Some(net())));
        nets.expect_create_net().never();

        reconcile_net(&mut scope, &nets, &tags).await.unwrap();
    }

    #[tokio::test]
    async fn untagged_net_is_recorded_then_tagged_on_the_next_pass() {
        let mut scope = new_scope(&test_network());
        let mut nets = MockNetService::new();
        let mut tags = MockTagService::new();

        expect_untagged(&mut tags, "test-net-uid");
        nets.expect_create_net().times(1).returning(|_, _, _| {
            Err(CloudError::untagged(NET_ID)(generic_error(
                "CreateTags generic error",
            )))
        });

        let error = reconcile_net(&mut scope, &nets, &tags).await.unwrap_err();

        assert_eq!(
            error.to_string(),
            "cannot create net: vpc-test-net-uid was created but not tagged: CreateTags generic error"
        );
        assert_eq!(scope.resources.net_ref.get("test-net-uid"), Ok(NET_ID));
        assert!(!scope.resources.managed_by.is_external(NET_ID));

        let mut nets = MockNetService::new();
        let mut tags = MockTagService::new();

        expect_untagged(&mut tags, "test-net-uid");
        tags.expect_create_resource_tags()
            .with(
                eq(NET_ID),
                eq(cluster_resource_tags("test-cluster-uid", "test-net-uid")),
            )
            .times(1)
            .returning(|_, _| Ok(()));
        nets.expect_get_net()
            .with(eq(NET_ID))
            .times(1)
            .returning(|_| Ok(Some(net())));
        nets.expect_create_net().never();

        reconcile_net(&mut scope, &nets, &tags).await.unwrap();

        assert_eq!(scope.resources.net_ref.get("test-net-uid"), Ok(NET_ID));
    }

    #[tokio::test]
    async fn tagged_net_is_adopted() {
        let mut scope = new_scope(&test_network());
        let mut nets = MockNetService::new();
        let mut tags = MockTagService::new();

        expect_tagged(&mut tags, "test-net-uid", NET_ID);
        nets.expect_get_net()
            .times(1)
            .returning(|_| Ok(Some(net())));

        reconcile_net(&mut scope, &nets, &tags).await.unwrap();

        assert_eq!(scope.resources.net_ref.get("test-net-uid"), Ok(NET_ID));
    }

    #[tokio::test]
    async fn net_failures_are_reported() {
        let mut scope = new_scope(&test_network());
        let error = reconcile_net(&mut scope, &MockNetService::new(), &failing_tags())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "cannot get tag: ReadTag generic error");

        let mut scope = scope_with_net(&test_network());
        let mut tags = MockTagService::new();
        let mut nets = MockNetService::new();
        expect_untagged(&mut tags, "test-net-uid");
        nets.expect_get_net()
            .returning(|_| Err(generic_error("GetNet generic error")));
        let error = reconcile_net(&mut scope, &nets, &tags).await.unwrap_err();
        assert_eq!(error.to_string(), "cannot read net: GetNet generic error");

        let mut scope = new_scope(&test_network());
        let mut tags = MockTagService::new();
        let mut nets = MockNetService::new();
        expect_untagged(&mut tags, "test-net-uid");
        nets.expect_create_net()
            .returning(|_, _, _| Err(generic_error("CreateNet generic error")));
        let error = reconcile_net(&mut scope, &nets, &tags).await.unwrap_err();
        assert_eq!(error.to_string(), "cannot create net: CreateNet generic error");
    }

    #[tokio::test]
    async fn delete_removes_owned_net() {
        let mut scope = scope_with_net(&test_network());
        let mut nets = MockNetService::new();

        nets.expect_get_net()
            .with(eq(NET_ID))
            .returning(|_| Ok(Some(net())));
        nets.expect_delete_net()
            .with(eq(NET_ID))
            .times(1)
            .returning(|_| Ok(()));

        reconcile_delete_net(&mut scope, &nets).await.unwrap();

        assert!(scope.resources.net_ref.is_empty());
        assert!(scope.resources.managed_by.resource_map.is_empty());
    }

    #[tokio::test]
    async fn delete_keeps_external_and_tolerates_missing_nets() {
        let mut external = scope_with_net(&test_network());
        external.resources.managed_by.mark_external(NET_ID);
        let mut nets = MockNetService::new();
        nets.expect_delete_net().never();

        reconcile_delete_net(&mut external, &nets).await.unwrap();
        assert!(external.resources.net_ref.is_empty());

        let mut gone = scope_with_net(&test_network());
        nets.expect_get_net().times(1).returning(|_| Ok(None));

        reconcile_delete_net(&mut gone, &nets).await.unwrap();
        assert!(gone.resources.net_ref.is_empty());

        reconcile_delete_net(&mut new_scope(&test_network()), &nets)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_failure_is_reported() {
        let mut scope = scope_with_net(&test_network());
        let mut nets = MockNetService::new();

        nets.expect_get_net().returning(|_| Ok(Some(net())));
        nets.expect_delete_net()
            .returning(|_| Err(generic_error("DeleteNet generic error")));

        let error = reconcile_delete_net(&mut scope, &nets).await.unwrap_err();

        assert_eq!(error.to_string(), "cannot delete net: DeleteNet generic error");
        assert_eq!(scope.resources.net_ref.get("test-net-uid"), Ok(NET_ID));
    }
}
