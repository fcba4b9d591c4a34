use log::{debug, info};
use osc_capi_core::resources::labels::NAME_TAG_KEY;

use crate::cloud::{
    internet_service::InternetServiceService,
    tag::{cluster_resource_tags, TagService},
};

use super::{
    error::ReconcilerError,
    scope::{adopt_resource_id, forget_resource, record_untagged, retag_resource, ClusterScope},
};

/// Makes sure the internet service exists and is attached to the net.
pub async fn reconcile_internet_service(
    scope: &mut ClusterScope,
    internet_services: &dyn InternetServiceService,
    tags: &dyn TagService,
) -> Result<(), ReconcilerError> {
    let net_name = scope.suffixed(&scope.network.net.name);
    let net_id = scope.resources.net_ref.get(&net_name)?.to_owned();
    let internet_service_spec = scope.network.internet_service.clone();
    let internet_service_name = scope.suffixed(&internet_service_spec.name);
    let tag = tags
        .read_tag(NAME_TAG_KEY, &internet_service_name)
        .await
        .map_err(ReconcilerError::cloud("cannot get tag"))?;
    let internet_service_id = adopt_resource_id(
        &mut scope.resources.internet_service_ref,
        &mut scope.resources.managed_by,
        &internet_service_name,
        internet_service_spec.resource_id.as_deref(),
        tag.as_ref().map(|tag| tag.resource_id.as_str()),
    );

    let existing = match internet_service_id {
        Some(id) => internet_services
            .get_internet_service(&id)
            .await
            .map_err(ReconcilerError::cloud("cannot read internet service"))?,
        None => None,
    };

    let internet_service = match existing {
        Some(internet_service) => {
            retag_resource(
                tags,
                tag.as_ref(),
                &scope.resources.managed_by,
                &internet_service.internet_service_id,
                cluster_resource_tags(&scope.cluster_name(), &internet_service_name),
            )
            .await?;

            internet_service
        }
        None => {
            info!("Creating internet service {internet_service_name}...");

            let internet_service = internet_services
                .create_internet_service(&scope.cluster_name(), &internet_service_name)
                .await
                .map_err(record_untagged(
                    &mut scope.resources.internet_service_ref,
                    &mut scope.resources.managed_by,
                    &internet_service_name,
                ))
                .map_err(ReconcilerError::cloud("cannot create internetservice"))?;

            scope
                .resources
                .internet_service_ref
                .set(&internet_service_name, &internet_service.internet_service_id);
            scope
                .resources
                .managed_by
                .mark_capi(&internet_service.internet_service_id);

            internet_service
        }
    };

    if !internet_service.net_id.is_empty() {
        debug!(
            "Internet service {internet_service_name} is linked to {}",
            internet_service.net_id
        );
        return Ok(());
    }

    info!("Linking internet service {internet_service_name} to {net_id}...");

    internet_services
        .link_internet_service(&internet_service.internet_service_id, &net_id)
        .await
        .map_err(ReconcilerError::cloud("cannot link internetService with net"))
}

pub async fn reconcile_delete_internet_service(
    scope: &mut ClusterScope,
    internet_services: &dyn InternetServiceService,
) -> Result<(), ReconcilerError> {
    let internet_service_name = scope.suffixed(&scope.network.internet_service.name);
    let Some(internet_service_id) = scope
        .resources
        .internet_service_ref
        .try_get(&internet_service_name)
        .map(str::to_owned)
    else {
        debug!("Internet service {internet_service_name} was never created");
        return Ok(());
    };

    if scope.resources.managed_by.is_external(&internet_service_id) {
        info!("Keeping internet service {internet_service_id}, it isn't managed by the cluster");
    } else {
        let internet_service = internet_services
            .get_internet_service(&internet_service_id)
            .await
            .map_err(ReconcilerError::cloud("cannot read internet service"))?;

        match internet_service {
            None => info!("Internet service {internet_service_name} is already deleted"),
            Some(internet_service) => {
                if !internet_service.net_id.is_empty() {
                    internet_services
                        .unlink_internet_service(&internet_service_id, &internet_service.net_id)
                        .await
                        .map_err(ReconcilerError::cloud("cannot unlink internetService"))?;
                }

                info!("Deleting internet service {internet_service_name}...");

                internet_services
                    .delete_internet_service(&internet_service_id)
                    .await
                    .map_err(ReconcilerError::cloud("cannot delete internetService"))?;
            }
        }
    }

    forget_resource(
        &mut scope.resources.internet_service_ref,
        &mut scope.resources.managed_by,
        &internet_service_name,
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use osc_capi_core::resources::crd::v1beta1::osccluster::{OscInternetService, OscNetwork};

    use crate::{
        cloud::{
            error::CloudError,
            internet_service::{InternetService, MockInternetServiceService},
            tag::{cluster_resource_tags, MockTagService},
        },
        cluster::reconciler::{
            fixtures::{
                expect_tagged, expect_untagged, failing_tags, generic_error, scope_with_net, test_network,
                NET_ID,
            },
            scope::ClusterScope,
        },
    };

    use super::{reconcile_delete_internet_service, reconcile_internet_service};

    const INTERNET_SERVICE_ID: &str = "igw-test-internetservice-uid";

    fn network() -> OscNetwork {
        OscNetwork {
            internet_service: OscInternetService {
                name: "test-internetservice".to_owned(),
                resource_id: None,
            },
            ..test_network()
        }
    }

    fn internet_service(net_id: &str) -> InternetService {
        InternetService {
            internet_service_id: INTERNET_SERVICE_ID.to_owned(),
            net_id: net_id.to_owned(),
            state: "available".to_owned(),
        }
    }

    fn referenced_scope() -> ClusterScope {
        let mut scope = scope_with_net(&network());
        scope
            .resources
            .internet_service_ref
            .set("test-internetservice-uid", INTERNET_SERVICE_ID);
        scope.resources.managed_by.mark_capi(INTERNET_SERVICE_ID);
        scope
    }

    #[tokio::test]
    async fn internet_service_is_created_and_linked() {
        let mut scope = scope_with_net(&network());
        let mut internet_services = MockInternetServiceService::new();
        let mut tags = MockTagService::new();

        expect_untagged(&mut tags, "test-internetservice-uid");
        internet_services
            .expect_create_internet_service()
            .with(eq("test-cluster-uid"), eq("test-internetservice-uid"))
            .times(1)
            .returning(|_, _| Ok(internet_service("")));
        internet_services
            .expect_link_internet_service()
            .with(eq(INTERNET_SERVICE_ID), eq(NET_ID))
            .times(1)
            .returning(|_, _| Ok(()));

        reconcile_internet_service(&mut scope, &internet_services, &tags)
            .await
            .unwrap();

        assert_eq!(
            scope
                .resources
                .internet_service_ref
                .get("test-internetservice-uid"),
            Ok(INTERNET_SERVICE_ID)
        );
    }

    #[tokio::test]
    async fn detached_internet_service_is_relinked() {
        let mut scope = referenced_scope();
        let mut internet_services = MockInternetServiceService::new();
        let mut tags = MockTagService::new();

        expect_tagged(&mut tags, "test-internetservice-uid", INTERNET_SERVICE_ID);
        internet_services
            .expect_get_internet_service()
            .with(eq(INTERNET_SERVICE_ID))
            .returning(|_| Ok(Some(internet_service(""))));
        internet_services.expect_create_internet_service().never();
        internet_services
            .expect_link_internet_service()
            .times(1)
            .returning(|_, _| Ok(()));

        reconcile_internet_service(&mut scope, &internet_services, &tags)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn linked_internet_service_is_left_alone() {
        let mut scope = referenced_scope();
        let mut internet_services = MockInternetServiceService::new();
        let mut tags = MockTagService::new();

        expect_tagged(&mut tags, "test-internetservice-uid", INTERNET_SERVICE_ID);
        internet_services
            .expect_get_internet_service()
            .returning(|_| Ok(Some(internet_service(NET_ID))));
        internet_services.expect_link_internet_service().never();

        reconcile_internet_service(&mut scope, &internet_services, &tags)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn untagged_internet_service_is_recorded_then_tagged() {
        let mut scope = scope_with_net(&network());
        let mut internet_services = MockInternetServiceService::new();
        let mut tags = MockTagService::new();

        expect_untagged(&mut tags, "test-internetservice-uid");
        internet_services
            .expect_create_internet_service()
            .times(1)
            .returning(|_, _| {
                Err(CloudError::untagged(INTERNET_SERVICE_ID)(generic_error(
                    "CreateTags generic error",
                )))
            });
        internet_services.expect_link_internet_service().never();

        reconcile_internet_service(&mut scope, &internet_services, &tags)
            .await
            .unwrap_err();

        assert_eq!(
            scope
                .resources
                .internet_service_ref
                .get("test-internetservice-uid"),
            Ok(INTERNET_SERVICE_ID)
        );

        let mut internet_services = MockInternetServiceService::new();
        let mut tags = MockTagService::new();

        expect_untagged(&mut tags, "test-internetservice-uid");
        tags.expect_create_resource_tags()
            .with(
                eq(INTERNET_SERVICE_ID),
                eq(cluster_resource_tags(
                    "test-cluster-uid",
                    "test-internetservice-uid",
                )),
            )
            .times(1)
            .returning(|_, _| Ok(()));
        internet_services
            .expect_get_internet_service()
            .returning(|_| Ok(Some(internet_service(""))));
        internet_services.expect_create_internet_service().never();
        internet_services
            .expect_link_internet_service()
            .with(eq(INTERNET_SERVICE_ID), eq(NET_ID))
            .times(1)
            .returning(|_, _| Ok(()));

        reconcile_internet_service(&mut scope, &internet_services, &tags)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn internet_service_failures_are_reported() {
        let error = reconcile_internet_service(
            &mut referenced_scope(),
            &MockInternetServiceService::new(),
            &failing_tags(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.to_string(), "cannot get tag: ReadTag generic error");

        let mut internet_services = MockInternetServiceService::new();
        let mut tags = MockTagService::new();
        expect_untagged(&mut tags, "test-internetservice-uid");
        internet_services
            .expect_get_internet_service()
            .returning(|_| Err(generic_error("GetInternetService generic error")));
        let error = reconcile_internet_service(&mut referenced_scope(), &internet_services, &tags)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot read internet service: GetInternetService generic error"
        );

        let mut internet_services = MockInternetServiceService::new();
        let mut tags = MockTagService::new();
        expect_untagged(&mut tags, "test-internetservice-uid");
        internet_services
            .expect_create_internet_service()
            .returning(|_, _| Err(generic_error("CreateInternetService generic error")));
        let error = reconcile_internet_service(
            &mut scope_with_net(&network()),
            &internet_services,
            &tags,
        )
        .await
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot create internetservice: CreateInternetService generic error"
        );

        let mut internet_services = MockInternetServiceService::new();
        let mut tags = MockTagService::new();
        expect_untagged(&mut tags, "test-internetservice-uid");
        internet_services
            .expect_create_internet_service()
            .returning(|_, _| Ok(internet_service("")));
        internet_services
            .expect_link_internet_service()
            .returning(|_, _| Err(generic_error("LinkInternetService generic error")));
        let error = reconcile_internet_service(
            &mut scope_with_net(&network()),
            &internet_services,
            &tags,
        )
        .await
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot link internetService with net: LinkInternetService generic error"
        );
    }

    #[tokio::test]
    async fn delete_unlinks_then_deletes() {
        let mut scope = referenced_scope();
        let mut internet_services = MockInternetServiceService::new();

        internet_services
            .expect_get_internet_service()
            .returning(|_| Ok(Some(internet_service(NET_ID))));
        internet_services
            .expect_unlink_internet_service()
            .with(eq(INTERNET_SERVICE_ID), eq(NET_ID))
            .times(1)
            .returning(|_, _| Ok(()));
        internet_services
            .expect_delete_internet_service()
            .with(eq(INTERNET_SERVICE_ID))
            .times(1)
            .returning(|_| Ok(()));

        reconcile_delete_internet_service(&mut scope, &internet_services)
            .await
            .unwrap();

        assert!(scope.resources.internet_service_ref.is_empty());
    }

    #[tokio::test]
    async fn delete_tolerates_internet_service_already_gone() {
        let mut scope = referenced_scope();
        let mut internet_services = MockInternetServiceService::new();

        internet_services
            .expect_get_internet_service()
            .returning(|_| Ok(None));
        internet_services.expect_delete_internet_service().never();

        reconcile_delete_internet_service(&mut scope, &internet_services)
            .await
            .unwrap();

        assert!(scope.resources.internet_service_ref.is_empty());
    }

    #[tokio::test]
    async fn delete_failures_are_reported() {
        let mut internet_services = MockInternetServiceService::new();
        internet_services
            .expect_get_internet_service()
            .returning(|_| Ok(Some(internet_service(NET_ID))));
        internet_services
            .expect_unlink_internet_service()
            .returning(|_, _| Err(generic_error("UnlinkInternetService generic error")));
        let error = reconcile_delete_internet_service(&mut referenced_scope(), &internet_services)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot unlink internetService: UnlinkInternetService generic error"
        );

        let mut internet_services = MockInternetServiceService::new();
        internet_services
            .expect_get_internet_service()
            .returning(|_| Ok(Some(internet_service(""))));
        internet_services
            .expect_delete_internet_service()
            .returning(|_| Err(generic_error("DeleteInternetService generic error")));
        let error = reconcile_delete_internet_service(&mut referenced_scope(), &internet_services)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot delete internetService: DeleteInternetService generic error"
        );
    }
}
