use super::crd::v1beta1::osccluster::{
    OscInternetService, OscLoadBalancer, OscLoadBalancerHealthCheck, OscLoadBalancerListener,
    OscNatService, OscNet, OscNetwork, OscPublicIp, OscRoute, OscRouteTable, OscSecurityGroup,
    OscSecurityGroupRule, OscSubnet,
};

pub const DEFAULT_CLUSTER_NAME: &str = "cluster-api";
pub const DEFAULT_SUBREGION_NAME: &str = "eu-west-2a";

pub const DEFAULT_NET_NAME: &str = "cluster-api-net";
pub const DEFAULT_NET_IP_RANGE: &str = "10.0.0.0/16";

pub const DEFAULT_SUBNET_KCP_NAME: &str = "cluster-api-subnet-kcp";
pub const DEFAULT_SUBNET_KCP_IP_RANGE: &str = "10.0.4.0/24";
pub const DEFAULT_SUBNET_KW_NAME: &str = "cluster-api-subnet-kw";
pub const DEFAULT_SUBNET_KW_IP_RANGE: &str = "10.0.3.0/24";
pub const DEFAULT_SUBNET_PUBLIC_NAME: &str = "cluster-api-subnet-public";
pub const DEFAULT_SUBNET_PUBLIC_IP_RANGE: &str = "10.0.2.0/24";

pub const DEFAULT_INTERNET_SERVICE_NAME: &str = "cluster-api-internetservice";
pub const DEFAULT_NAT_SERVICE_NAME: &str = "cluster-api-natservice";
pub const DEFAULT_PUBLIC_IP_NAT_NAME: &str = "cluster-api-publicip-nat";

pub const DEFAULT_ROUTE_TABLE_KW_NAME: &str = "cluster-api-routetable-kw";
pub const DEFAULT_ROUTE_KW_NAME: &str = "cluster-api-route-kw";
pub const DEFAULT_ROUTE_TABLE_KCP_NAME: &str = "cluster-api-routetable-kcp";
pub const DEFAULT_ROUTE_KCP_NAME: &str = "cluster-api-route-kcp";
pub const DEFAULT_ROUTE_TABLE_PUBLIC_NAME: &str = "cluster-api-routetable-public";
pub const DEFAULT_ROUTE_PUBLIC_NAME: &str = "cluster-api-route-public";
pub const DEFAULT_DESTINATION: &str = "0.0.0.0/0";

pub const DEFAULT_SECURITY_GROUP_KW_NAME: &str = "cluster-api-securitygroup-kw";
pub const DEFAULT_SECURITY_GROUP_KCP_NAME: &str = "cluster-api-securitygroup-kcp";
pub const DEFAULT_SECURITY_GROUP_LB_NAME: &str = "cluster-api-securitygroup-lb";
pub const DEFAULT_SECURITY_GROUP_NODE_NAME: &str = "cluster-api-securitygroup-node";
pub const DEFAULT_MAIN_SECURITY_GROUP_TAG: &str = "OscK8sMainSG";

pub const DEFAULT_LOAD_BALANCER_NAME: &str = "OscClusterApi-1";
pub const DEFAULT_LOAD_BALANCER_TYPE: &str = "internet-facing";
pub const DEFAULT_API_PORT: i32 = 6443;

pub const GATEWAY_TARGET_TYPE: &str = "gateway";
pub const NAT_TARGET_TYPE: &str = "nat";

impl OscNetwork {
    /// Returns a copy with every empty section replaced by its default.
    pub fn defaulted(&self) -> OscNetwork {
        let mut network = self.clone();

        if network.net.name.is_empty() {
            network.net = default_net();
        }
        if network.subnets.is_empty() {
            network.subnets = default_subnets();
        }
        let subregion = network
            .subregion_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SUBREGION_NAME.to_owned());
        for subnet in network.subnets.iter_mut() {
            if subnet.subregion_name.is_none() {
                subnet.subregion_name = Some(subregion.clone());
            }
        }
        if network.internet_service.name.is_empty() {
            network.internet_service = default_internet_service();
        }
        if network.nat_service.name.is_empty() {
            network.nat_service = default_nat_service();
        }
        if network.public_ips.is_empty() {
            network.public_ips = default_public_ips();
        }
        if network.route_tables.is_empty() {
            network.route_tables = default_route_tables();
        }
        if network.security_groups.is_empty() {
            network.security_groups = default_security_groups();
        }
        if network.load_balancer.load_balancer_name.is_empty() {
            network.load_balancer = default_load_balancer();
        }
        if network.cluster_name.is_none() {
            network.cluster_name = Some(DEFAULT_CLUSTER_NAME.to_owned());
        }

        network
    }
}

pub fn default_net() -> OscNet {
    OscNet {
        name: DEFAULT_NET_NAME.to_owned(),
        ip_range: DEFAULT_NET_IP_RANGE.to_owned(),
        resource_id: None,
    }
}

pub fn default_subnets() -> Vec<OscSubnet> {
    [
        (DEFAULT_SUBNET_KCP_NAME, DEFAULT_SUBNET_KCP_IP_RANGE),
        (DEFAULT_SUBNET_KW_NAME, DEFAULT_SUBNET_KW_IP_RANGE),
        (DEFAULT_SUBNET_PUBLIC_NAME, DEFAULT_SUBNET_PUBLIC_IP_RANGE),
    ]
    .into_iter()
    .map(|(name, range)| OscSubnet {
        name: name.to_owned(),
        ip_subnet_range: range.to_owned(),
        subregion_name: Some(DEFAULT_SUBREGION_NAME.to_owned()),
        resource_id: None,
    })
    .collect()
}

pub fn default_internet_service() -> OscInternetService {
    OscInternetService {
        name: DEFAULT_INTERNET_SERVICE_NAME.to_owned(),
        resource_id: None,
    }
}

pub fn default_nat_service() -> OscNatService {
    OscNatService {
        name: DEFAULT_NAT_SERVICE_NAME.to_owned(),
        public_ip_name: DEFAULT_PUBLIC_IP_NAT_NAME.to_owned(),
        subnet_name: DEFAULT_SUBNET_PUBLIC_NAME.to_owned(),
        resource_id: None,
    }
}

pub fn default_public_ips() -> Vec<OscPublicIp> {
    vec![OscPublicIp {
        name: DEFAULT_PUBLIC_IP_NAT_NAME.to_owned(),
        resource_id: None,
    }]
}

pub fn default_route_tables() -> Vec<OscRouteTable> {
    let route_table = |name: &str, subnet: &str, route: &str, target: &str, target_type: &str| {
        OscRouteTable {
            name: name.to_owned(),
            subnets: vec![subnet.to_owned()],
            routes: vec![OscRoute {
                name: route.to_owned(),
                target_name: target.to_owned(),
                target_type: target_type.to_owned(),
                destination: DEFAULT_DESTINATION.to_owned(),
                resource_id: None,
            }],
            resource_id: None,
        }
    };

    vec![
        route_table(
            DEFAULT_ROUTE_TABLE_KW_NAME,
            DEFAULT_SUBNET_KW_NAME,
            DEFAULT_ROUTE_KW_NAME,
            DEFAULT_NAT_SERVICE_NAME,
            NAT_TARGET_TYPE,
        ),
        route_table(
            DEFAULT_ROUTE_TABLE_KCP_NAME,
            DEFAULT_SUBNET_KCP_NAME,
            DEFAULT_ROUTE_KCP_NAME,
            DEFAULT_NAT_SERVICE_NAME,
            NAT_TARGET_TYPE,
        ),
        route_table(
            DEFAULT_ROUTE_TABLE_PUBLIC_NAME,
            DEFAULT_SUBNET_PUBLIC_NAME,
            DEFAULT_ROUTE_PUBLIC_NAME,
            DEFAULT_INTERNET_SERVICE_NAME,
            GATEWAY_TARGET_TYPE,
        ),
    ]
}

fn inbound_rule(name: &str, protocol: &str, range: &str, from: i32, to: i32) -> OscSecurityGroupRule {
    OscSecurityGroupRule {
        name: name.to_owned(),
        flow: "Inbound".to_owned(),
        ip_protocol: protocol.to_owned(),
        ip_range: range.to_owned(),
        from_port_range: from,
        to_port_range: to,
        resource_id: None,
    }
}

pub fn default_security_groups() -> Vec<OscSecurityGroup> {
    vec![
        OscSecurityGroup {
            name: DEFAULT_SECURITY_GROUP_KW_NAME.to_owned(),
            description: "Security Group Kw with cluster-api".to_owned(),
            tag: None,
            security_group_rules: vec![
                inbound_rule("cluster-api-securitygrouprule-api-kubelet-kw", "tcp", DEFAULT_SUBNET_KW_IP_RANGE, 10250, 10250),
                inbound_rule("cluster-api-securitygrouprule-api-kubelet-kcp", "tcp", DEFAULT_SUBNET_KCP_IP_RANGE, 10250, 10250),
                inbound_rule("cluster-api-securitygrouprule-nodeip-kw", "tcp", DEFAULT_SUBNET_KW_IP_RANGE, 30000, 32767),
                inbound_rule("cluster-api-securitygrouprule-nodeip-kcp", "tcp", DEFAULT_SUBNET_KCP_IP_RANGE, 30000, 32767),
                inbound_rule("cluster-api-securitygrouprule-kw-bgp", "tcp", DEFAULT_NET_IP_RANGE, 179, 179),
            ],
            resource_id: None,
        },
        OscSecurityGroup {
            name: DEFAULT_SECURITY_GROUP_KCP_NAME.to_owned(),
            description: "Security Group Kcp with cluster-api".to_owned(),
            tag: None,
            security_group_rules: vec![
                inbound_rule("cluster-api-securitygrouprule-api-kw", "tcp", DEFAULT_SUBNET_KW_IP_RANGE, DEFAULT_API_PORT, DEFAULT_API_PORT),
                inbound_rule("cluster-api-securitygrouprule-api-kcp", "tcp", DEFAULT_SUBNET_KCP_IP_RANGE, DEFAULT_API_PORT, DEFAULT_API_PORT),
                inbound_rule("cluster-api-securitygrouprule-etcd", "tcp", DEFAULT_SUBNET_KCP_IP_RANGE, 2378, 2380),
                inbound_rule("cluster-api-securitygrouprule-kubelet-kcp", "tcp", DEFAULT_SUBNET_KCP_IP_RANGE, 10250, 10252),
                inbound_rule("cluster-api-securitygrouprule-kcp-nodeip-kw", "tcp", DEFAULT_SUBNET_KW_IP_RANGE, 30000, 32767),
                inbound_rule("cluster-api-securitygrouprule-kcp-nodeip-kcp", "tcp", DEFAULT_SUBNET_KCP_IP_RANGE, 30000, 32767),
                inbound_rule("cluster-api-securitygrouprule-kcp-bgp", "tcp", DEFAULT_NET_IP_RANGE, 179, 179),
            ],
            resource_id: None,
        },
        OscSecurityGroup {
            name: DEFAULT_SECURITY_GROUP_LB_NAME.to_owned(),
            description: "Security Group Lb with cluster-api".to_owned(),
            tag: None,
            security_group_rules: vec![inbound_rule(
                "cluster-api-securitygrouprule-lb",
                "tcp",
                DEFAULT_DESTINATION,
                DEFAULT_API_PORT,
                DEFAULT_API_PORT,
            )],
            resource_id: None,
        },
        OscSecurityGroup {
            name: DEFAULT_SECURITY_GROUP_NODE_NAME.to_owned(),
            description: "Security Group Node with cluster-api".to_owned(),
            tag: Some(DEFAULT_MAIN_SECURITY_GROUP_TAG.to_owned()),
            security_group_rules: vec![
                inbound_rule("cluster-api-securitygrouprule-calico-vxlan", "udp", DEFAULT_NET_IP_RANGE, 4789, 4789),
                inbound_rule("cluster-api-securitygrouprule-calico-typha", "udp", DEFAULT_NET_IP_RANGE, 5473, 5473),
                inbound_rule("cluster-api-securitygrouprule-calico-wireguard", "udp", DEFAULT_NET_IP_RANGE, 51820, 51820),
                inbound_rule("cluster-api-securitygrouprule-icmp", "icmp", DEFAULT_NET_IP_RANGE, -1, -1),
            ],
            resource_id: None,
        },
    ]
}

pub fn default_load_balancer() -> OscLoadBalancer {
    OscLoadBalancer {
        load_balancer_name: DEFAULT_LOAD_BALANCER_NAME.to_owned(),
        load_balancer_type: DEFAULT_LOAD_BALANCER_TYPE.to_owned(),
        subnet_name: DEFAULT_SUBNET_PUBLIC_NAME.to_owned(),
        security_group_name: DEFAULT_SECURITY_GROUP_LB_NAME.to_owned(),
        listener: OscLoadBalancerListener {
            backend_port: DEFAULT_API_PORT,
            backend_protocol: "TCP".to_owned(),
            load_balancer_port: DEFAULT_API_PORT,
            load_balancer_protocol: "TCP".to_owned(),
        },
        health_check: OscLoadBalancerHealthCheck {
            check_interval: 5,
            healthy_threshold: 5,
            port: DEFAULT_API_PORT,
            protocol: "TCP".to_owned(),
            timeout: 5,
            unhealthy_threshold: 2,
        },
    }
}
