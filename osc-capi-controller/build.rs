use std::{
    fs::{create_dir_all, write},
    path::Path,
};

use kube::CustomResourceExt;
use osc_capi_core::resources::crd::v1beta1::{
    osccluster::OscCluster, oscmachinetemplate::OscMachineTemplate,
};

const CRD_OUTPUT: &str = "../crd/v1beta1";

fn main() {
    let crd_output = Path::new(CRD_OUTPUT);

    create_dir_all(crd_output).unwrap();

    for (name, crd) in [
        (OscCluster::crd_name(), OscCluster::crd()),
        (OscMachineTemplate::crd_name(), OscMachineTemplate::crd()),
    ] {
        write(
            crd_output.join(format!("{name}.yaml")),
            serde_yaml::to_string(&crd).unwrap(),
        )
        .unwrap();
    }

    println!("cargo:rerun-if-changed=../osc-capi-core/src/resources/crd");
}
