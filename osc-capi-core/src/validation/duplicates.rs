use itertools::Itertools;

use crate::resources::crd::v1beta1::osccluster::OscNetwork;

use super::{InvalidResource, ValidationError};

fn check_duplicates<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), InvalidResource> {
    match names.duplicates().next() {
        Some(name) => Err(InvalidResource::new(
            name,
            ValidationError::DuplicateName(name.to_owned()),
        )),
        None => Ok(()),
    }
}

pub fn check_subnet_duplicate_name(network: &OscNetwork) -> Result<(), InvalidResource> {
    check_duplicates(network.subnets.iter().map(|subnet| subnet.name.as_str()))
}

pub fn check_public_ip_duplicate_name(network: &OscNetwork) -> Result<(), InvalidResource> {
    check_duplicates(network.public_ips.iter().map(|ip| ip.name.as_str()))
}

pub fn check_route_table_duplicate_name(network: &OscNetwork) -> Result<(), InvalidResource> {
    check_duplicates(network.route_tables.iter().map(|rt| rt.name.as_str()))
}

/// Route names only have to be unique inside their route table.
pub fn check_route_duplicate_name(network: &OscNetwork) -> Result<(), InvalidResource> {
    for route_table in network.route_tables.iter() {
        check_duplicates(route_table.routes.iter().map(|route| route.name.as_str()))?;
    }

    Ok(())
}

pub fn check_security_group_duplicate_name(network: &OscNetwork) -> Result<(), InvalidResource> {
    check_duplicates(network.security_groups.iter().map(|sg| sg.name.as_str()))
}

/// Rule names only have to be unique inside their security group.
pub fn check_security_group_rule_duplicate_name(
    network: &OscNetwork,
) -> Result<(), InvalidResource> {
    for security_group in network.security_groups.iter() {
        check_duplicates(
            security_group
                .security_group_rules
                .iter()
                .map(|rule| rule.name.as_str()),
        )?;
    }

    Ok(())
}
