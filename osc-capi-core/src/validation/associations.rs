use crate::resources::crd::v1beta1::osccluster::OscNetwork;

use super::{InvalidResource, ValidationError};

fn missing(kind: &'static str, name: String, owner: &'static str) -> InvalidResource {
    InvalidResource::new(
        name.clone(),
        ValidationError::MissingAssociation { kind, name, owner },
    )
}

fn has_subnet(network: &OscNetwork, name: &str) -> bool {
    network.subnets.iter().any(|subnet| subnet.name == name)
}

pub fn check_nat_service_subnet_association(
    network: &OscNetwork,
    uid: &str,
) -> Result<(), InvalidResource> {
    let subnet_name = &network.nat_service.subnet_name;

    if has_subnet(network, subnet_name) {
        Ok(())
    } else {
        Err(missing("subnet", format!("{subnet_name}-{uid}"), "natService"))
    }
}

pub fn check_nat_service_public_ip_association(
    network: &OscNetwork,
    uid: &str,
) -> Result<(), InvalidResource> {
    let public_ip_name = &network.nat_service.public_ip_name;

    if network.public_ips.iter().any(|ip| &ip.name == public_ip_name) {
        Ok(())
    } else {
        Err(missing("publicIp", format!("{public_ip_name}-{uid}"), "natService"))
    }
}

pub fn check_route_table_subnet_association(
    network: &OscNetwork,
    uid: &str,
) -> Result<(), InvalidResource> {
    let linked_subnets = network
        .route_tables
        .iter()
        .flat_map(|route_table| route_table.subnets.iter());

    for subnet_name in linked_subnets {
        if !has_subnet(network, subnet_name) {
            return Err(missing("subnet", format!("{subnet_name}-{uid}"), "routeTable"));
        }
    }

    Ok(())
}

pub fn check_load_balancer_subnet_association(
    network: &OscNetwork,
    uid: &str,
) -> Result<(), InvalidResource> {
    let subnet_name = &network.load_balancer.subnet_name;

    if has_subnet(network, subnet_name) {
        Ok(())
    } else {
        Err(missing("subnet", format!("{subnet_name}-{uid}"), "loadBalancer"))
    }
}

pub fn check_load_balancer_security_group_association(
    network: &OscNetwork,
    uid: &str,
) -> Result<(), InvalidResource> {
    let security_group_name = &network.load_balancer.security_group_name;

    if network
        .security_groups
        .iter()
        .any(|sg| &sg.name == security_group_name)
    {
        Ok(())
    } else {
        Err(missing(
            "securityGroup",
            format!("{security_group_name}-{uid}"),
            "loadBalancer",
        ))
    }
}
