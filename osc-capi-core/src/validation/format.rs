use ipnet::Ipv4Net;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::resources::{
    crd::v1beta1::osccluster::OscNetwork,
    defaults::{GATEWAY_TARGET_TYPE, NAT_TARGET_TYPE},
};

use super::{InvalidResource, ValidationError};

static TAG_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Za-z\-_\s\.\(\)\?!,\[\]:\$\+\*/=]{0,255}$").expect("tag name regex")
});
static SUBREGION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+(-[a-z]+)+-[0-9][a-z]$").expect("subregion regex"));
static DESCRIPTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\x20-\x7E]{0,255}$").expect("description regex"));
static LOAD_BALANCER_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z\-]{1,32}$").expect("load balancer name regex"));

const VALID_PROTOCOLS: [&str; 4] = ["tcp", "udp", "icmp", "-1"];
const VALID_FLOWS: [&str; 2] = ["Inbound", "Outbound"];
const VALID_LOAD_BALANCER_TYPES: [&str; 2] = ["internet-facing", "internal"];

pub fn validate_tag_name(name: &str) -> Result<(), ValidationError> {
    if TAG_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTagName)
    }
}

pub fn validate_cidr(cidr: &str) -> Result<(), ValidationError> {
    cidr.parse::<Ipv4Net>()
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidCidr(cidr.to_owned()))
}

pub fn validate_subregion_name(subregion: &str) -> Result<(), ValidationError> {
    if SUBREGION_REGEX.is_match(subregion) {
        Ok(())
    } else {
        Err(ValidationError::InvalidSubregionName)
    }
}

/// -1 stands for "every port" and is only meaningful with icmp or the `-1` protocol
pub fn validate_port(port: i32) -> Result<(), ValidationError> {
    if (-1..=65535).contains(&port) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPort)
    }
}

fn validate_one_of(
    value: &str,
    allowed: &[&str],
    error: ValidationError,
) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(error)
    }
}

fn suffixed(name: &str, uid: &str) -> String {
    format!("{name}-{uid}")
}

fn with_name<T>(name: &str, result: Result<T, ValidationError>) -> Result<T, InvalidResource> {
    result.map_err(|reason| InvalidResource::new(name, reason))
}

pub fn check_net_format(network: &OscNetwork, uid: &str) -> Result<(), InvalidResource> {
    let name = suffixed(&network.net.name, uid);

    with_name(&name, validate_tag_name(&name))?;
    with_name(&name, validate_cidr(&network.net.ip_range))
}

pub fn check_subnet_format(network: &OscNetwork, uid: &str) -> Result<(), InvalidResource> {
    for subnet in network.subnets.iter() {
        let name = suffixed(&subnet.name, uid);

        with_name(&name, validate_tag_name(&name))?;
        with_name(&name, validate_cidr(&subnet.ip_subnet_range))?;
        if let Some(subregion) = &subnet.subregion_name {
            with_name(&name, validate_subregion_name(subregion))?;
        }
    }

    Ok(())
}

pub fn check_internet_service_format(
    network: &OscNetwork,
    uid: &str,
) -> Result<(), InvalidResource> {
    let name = suffixed(&network.internet_service.name, uid);

    with_name(&name, validate_tag_name(&name))
}

pub fn check_public_ip_format(network: &OscNetwork, uid: &str) -> Result<(), InvalidResource> {
    for public_ip in network.public_ips.iter() {
        let name = suffixed(&public_ip.name, uid);

        with_name(&name, validate_tag_name(&name))?;
    }

    Ok(())
}

pub fn check_nat_service_format(network: &OscNetwork, uid: &str) -> Result<(), InvalidResource> {
    let name = suffixed(&network.nat_service.name, uid);

    with_name(&name, validate_tag_name(&name))
}

pub fn check_route_table_format(network: &OscNetwork, uid: &str) -> Result<(), InvalidResource> {
    for route_table in network.route_tables.iter() {
        let name = suffixed(&route_table.name, uid);

        with_name(&name, validate_tag_name(&name))?;
    }

    Ok(())
}

pub fn check_route_format(network: &OscNetwork, uid: &str) -> Result<(), InvalidResource> {
    for route in network.route_tables.iter().flat_map(|rt| rt.routes.iter()) {
        let name = suffixed(&route.name, uid);

        with_name(&name, validate_tag_name(&name))?;
        with_name(&name, validate_cidr(&route.destination))?;
        with_name(
            &name,
            validate_one_of(
                &route.target_type,
                &[GATEWAY_TARGET_TYPE, NAT_TARGET_TYPE],
                ValidationError::InvalidTargetType,
            ),
        )?;
    }

    Ok(())
}

pub fn check_security_group_format(
    network: &OscNetwork,
    uid: &str,
) -> Result<(), InvalidResource> {
    for security_group in network.security_groups.iter() {
        let name = suffixed(&security_group.name, uid);

        with_name(&name, validate_tag_name(&name))?;
        if !DESCRIPTION_REGEX.is_match(&security_group.description) {
            return Err(InvalidResource::new(name, ValidationError::InvalidDescription));
        }
    }

    Ok(())
}

pub fn check_security_group_rule_format(
    network: &OscNetwork,
    uid: &str,
) -> Result<(), InvalidResource> {
    let rules = network
        .security_groups
        .iter()
        .flat_map(|sg| sg.security_group_rules.iter());

    for rule in rules {
        let name = suffixed(&rule.name, uid);

        with_name(&name, validate_tag_name(&name))?;
        with_name(
            &name,
            validate_one_of(&rule.flow, &VALID_FLOWS, ValidationError::InvalidFlow),
        )?;
        with_name(
            &name,
            validate_one_of(
                &rule.ip_protocol,
                &VALID_PROTOCOLS,
                ValidationError::InvalidProtocol,
            ),
        )?;
        with_name(&name, validate_cidr(&rule.ip_range))?;
        with_name(&name, validate_port(rule.from_port_range))?;
        with_name(&name, validate_port(rule.to_port_range))?;
    }

    Ok(())
}

pub fn check_load_balancer_format(network: &OscNetwork) -> Result<(), InvalidResource> {
    let load_balancer = &network.load_balancer;
    let name = &load_balancer.load_balancer_name;

    if !LOAD_BALANCER_NAME_REGEX.is_match(name) {
        return Err(InvalidResource::new(
            name,
            ValidationError::InvalidLoadBalancerName,
        ));
    }
    with_name(
        name,
        validate_one_of(
            &load_balancer.load_balancer_type,
            &VALID_LOAD_BALANCER_TYPES,
            ValidationError::InvalidLoadBalancerType,
        ),
    )?;
    with_name(name, validate_port(load_balancer.listener.backend_port))?;
    with_name(name, validate_port(load_balancer.listener.load_balancer_port))?;
    with_name(name, validate_port(load_balancer.health_check.port))
}
