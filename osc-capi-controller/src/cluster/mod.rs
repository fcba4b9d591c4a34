use std::sync::Arc;

use futures::StreamExt;
use kube::runtime::{watcher::Config, Controller};
use log::info;
use osc_capi_core::{kubernetes::GetApi, resources::crd::v1beta1::osccluster::OscCluster};

use crate::helpers::handle_reconciliation_result;

use self::reconciler::{
    context::ReconcilerContext, reconcile_osc_cluster, reconcile_osc_cluster_error,
};

pub mod reconciler;

pub const CLUSTER_FIELD_MANAGER: &str = "osc-capi-cluster-controller";

pub async fn start_cluster_controller(context: Arc<ReconcilerContext>) {
    info!("Creating OscCluster controller...");

    let controller = Controller::new(
        context.client.global_api::<OscCluster>(),
        Config::default(),
    )
    .shutdown_on_signal()
    .run(reconcile_osc_cluster, reconcile_osc_cluster_error, context.clone())
    .for_each(handle_reconciliation_result::<OscCluster, _>);

    info!("OscCluster controller created!");

    controller.await;

    info!("Exiting OscCluster controller!");
}
