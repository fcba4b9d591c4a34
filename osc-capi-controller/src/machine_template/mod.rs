use std::sync::Arc;

use futures::StreamExt;
use kube::runtime::{watcher::Config, Controller};
use log::info;
use osc_capi_core::{
    kubernetes::GetApi, resources::crd::v1beta1::oscmachinetemplate::OscMachineTemplate,
};

use crate::helpers::handle_reconciliation_result;

use self::reconciler::{
    context::ReconcilerContext, reconcile_osc_machine_template,
    reconcile_osc_machine_template_error,
};

pub mod reconciler;

pub const MACHINE_TEMPLATE_FIELD_MANAGER: &str = "osc-capi-machine-template-controller";

pub async fn start_machine_template_controller(context: Arc<ReconcilerContext>) {
    info!("Creating OscMachineTemplate controller...");

    let controller = Controller::new(
        context.client.global_api::<OscMachineTemplate>(),
        Config::default(),
    )
    .shutdown_on_signal()
    .run(
        reconcile_osc_machine_template,
        reconcile_osc_machine_template_error,
        context.clone(),
    )
    .for_each(handle_reconciliation_result::<OscMachineTemplate, _>);

    info!("OscMachineTemplate controller created!");

    controller.await;

    info!("Exiting OscMachineTemplate controller!");
}
