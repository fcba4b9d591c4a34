use std::fmt::Display;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

pub const READY_CONDITION: &str = "Ready";
pub const NET_READY_CONDITION: &str = "NetReady";
pub const SUBNETS_READY_CONDITION: &str = "SubnetsReady";
pub const INTERNET_SERVICE_READY_CONDITION: &str = "InternetServiceReady";
pub const PUBLIC_IPS_READY_CONDITION: &str = "PublicIpsReady";
pub const NAT_SERVICE_READY_CONDITION: &str = "NatServiceReady";
pub const ROUTE_TABLES_READY_CONDITION: &str = "RouteTablesReady";
pub const SECURITY_GROUPS_READY_CONDITION: &str = "SecurityGroupsReady";
pub const LOAD_BALANCER_READY_CONDITION: &str = "LoadBalancerReady";

/// Cluster API style condition
#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub severity: Option<ConditionSeverity>,
    pub last_transition_time: Option<DateTime<Utc>>,
    /// CamelCase reason of the last transition
    pub reason: Option<String>,
    /// human readable details, for failures this carries the error message
    pub message: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, JsonSchema)]
pub enum ConditionSeverity {
    Error,
    Warning,
    Info,
}

impl Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionStatus::True => f.write_str("True"),
            ConditionStatus::False => f.write_str("False"),
            ConditionStatus::Unknown => f.write_str("Unknown"),
        }
    }
}

impl Condition {
    pub fn ready(type_: &str) -> Self {
        Self {
            type_: type_.to_owned(),
            status: ConditionStatus::True,
            severity: None,
            last_transition_time: Some(Utc::now()),
            reason: None,
            message: None,
        }
    }

    pub fn failed(type_: &str, reason: &str, severity: ConditionSeverity, message: String) -> Self {
        Self {
            type_: type_.to_owned(),
            status: ConditionStatus::False,
            severity: Some(severity),
            last_transition_time: Some(Utc::now()),
            reason: Some(reason.to_owned()),
            message: Some(message),
        }
    }
}

/// Inserts or replaces a condition of the same type. The transition time only moves
/// when the status flips.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

pub fn mark_true(conditions: &mut Vec<Condition>, type_: &str) {
    set_condition(conditions, Condition::ready(type_));
}

pub fn mark_false(
    conditions: &mut Vec<Condition>,
    type_: &str,
    reason: &str,
    severity: ConditionSeverity,
    message: String,
) {
    set_condition(
        conditions,
        Condition::failed(type_, reason, severity, message),
    );
}

pub fn is_true(conditions: &[Condition], type_: &str) -> bool {
    conditions
        .iter()
        .any(|c| c.type_ == type_ && c.status == ConditionStatus::True)
}

pub fn get_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}
