use thiserror::Error;

use crate::resources::crd::v1beta1::osccluster::OscNetwork;

pub mod associations;
pub mod duplicates;
pub mod format;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid Tag Name")]
    InvalidTagName,
    #[error("invalid CIDR address: {}", .0)]
    InvalidCidr(String),
    #[error("Invalid subregionName")]
    InvalidSubregionName,
    #[error("Invalid Port")]
    InvalidPort,
    #[error("Invalid protocol")]
    InvalidProtocol,
    #[error("Invalid flow")]
    InvalidFlow,
    #[error("Invalid Description")]
    InvalidDescription,
    #[error("Invalid targetType")]
    InvalidTargetType,
    #[error("Invalid LoadBalancer Name")]
    InvalidLoadBalancerName,
    #[error("Invalid LoadBalancer Type")]
    InvalidLoadBalancerType,
    #[error("{} already exist", .0)]
    DuplicateName(String),
    #[error("{kind} {name} does not exist in {owner}")]
    MissingAssociation {
        kind: &'static str,
        name: String,
        owner: &'static str,
    },
}

/// A validation failure together with the tag name of the offending resource.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{reason}")]
pub struct InvalidResource {
    pub name: String,
    pub reason: ValidationError,
}

impl InvalidResource {
    pub fn new(name: impl Into<String>, reason: ValidationError) -> Self {
        Self {
            name: name.into(),
            reason,
        }
    }
}

/// Runs every format, duplicate and association check against an already defaulted network.
pub fn validate_network(network: &OscNetwork, uid: &str) -> Result<(), InvalidResource> {
    format::check_net_format(network, uid)?;
    format::check_subnet_format(network, uid)?;
    format::check_internet_service_format(network, uid)?;
    format::check_public_ip_format(network, uid)?;
    format::check_nat_service_format(network, uid)?;
    format::check_route_table_format(network, uid)?;
    format::check_route_format(network, uid)?;
    format::check_security_group_format(network, uid)?;
    format::check_security_group_rule_format(network, uid)?;
    format::check_load_balancer_format(network)?;

    duplicates::check_subnet_duplicate_name(network)?;
    duplicates::check_public_ip_duplicate_name(network)?;
    duplicates::check_route_table_duplicate_name(network)?;
    duplicates::check_route_duplicate_name(network)?;
    duplicates::check_security_group_duplicate_name(network)?;
    duplicates::check_security_group_rule_duplicate_name(network)?;

    associations::check_nat_service_subnet_association(network, uid)?;
    associations::check_nat_service_public_ip_association(network, uid)?;
    associations::check_route_table_subnet_association(network, uid)?;
    associations::check_load_balancer_subnet_association(network, uid)?;
    associations::check_load_balancer_security_group_association(network, uid)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::resources::crd::v1beta1::osccluster::OscNetwork;

    use super::validate_network;

    #[test]
    fn default_network_is_valid() {
        let network = OscNetwork::default().defaulted();

        assert_eq!(validate_network(&network, "7d3a2b1c-uid"), Ok(()));
    }
}
