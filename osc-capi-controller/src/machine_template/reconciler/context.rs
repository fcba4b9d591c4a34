use kube::Client;

use crate::cloud::client::OscClient;

pub struct ReconcilerContext {
    pub client: Client,
    pub cloud: OscClient,
}
