use std::{error::Error, process::exit, sync::Arc};

use cloud::client::OscClient;
use cluster::start_cluster_controller;
use config::ProviderConfig;
use kube::Client;
use machine_template::start_machine_template_controller;
use tokio::join;

mod cloud;
mod cluster;
mod config;
mod helpers;
mod machine_template;

#[tokio::main()]
async fn main() -> Result<(), Box<dyn Error>> {
    configure_logger();

    let config = get_config();
    let client = create_client().await;
    let cloud = create_cloud_client(&config);

    let cluster_context = Arc::new(cluster::reconciler::context::ReconcilerContext {
        client: client.clone(),
        cloud: cloud.clone(),
    });
    let machine_template_context =
        Arc::new(machine_template::reconciler::context::ReconcilerContext { client, cloud });

    join!(
        start_cluster_controller(cluster_context),
        start_machine_template_controller(machine_template_context),
    );

    Ok(())
}

async fn create_client() -> Client {
    match Client::try_default().await {
        Ok(client) => client,
        Err(error) => {
            log::error!("Couldn't create client! {error:?}");
            exit(6)
        }
    }
}

fn get_config() -> ProviderConfig {
    match ProviderConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            log::error!("Couldn't retrieve the Outscale credentials! {error:?}");
            exit(7)
        }
    }
}

fn create_cloud_client(config: &ProviderConfig) -> OscClient {
    match OscClient::new(config) {
        Ok(client) => client,
        Err(error) => {
            log::error!("Couldn't create the Outscale API client! {error:?}");
            exit(8)
        }
    }
}

fn configure_logger() {
    env_logger::builder()
        .default_format()
        .format_module_path(false)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init()
}
