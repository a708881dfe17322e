//! Domain types shared across fleetroll crates.
//!
//! These mirror what the cloud provider reports about an autoscaling
//! group: capacity, member instances and their lifecycle states, and
//! per-instance health as seen through the attached target group.

use serde::{Deserialize, Serialize};

/// Opaque provider-assigned instance identifier.
pub type InstanceId = String;

/// Identifier (name or ARN) of a load-balancer target group.
pub type TargetGroupId = String;

// ── Group state ────────────────────────────────────────────────────

/// Point-in-time view of an autoscaling group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupSnapshot {
    pub name: String,
    /// Requested steady-state instance count.
    pub desired: u32,
    /// Upper bound the provider will not exceed.
    pub max: u32,
    /// Current member instances, in provider order.
    pub instances: Vec<InstanceSummary>,
    /// Attached target group identifiers (any number; the orchestrator
    /// requires exactly one).
    pub target_groups: Vec<TargetGroupId>,
}

impl GroupSnapshot {
    /// Ids of members currently counted toward serving capacity.
    pub fn in_service_ids(&self) -> Vec<InstanceId> {
        self.instances
            .iter()
            .filter(|i| i.lifecycle == LifecycleState::InService)
            .map(|i| i.id.clone())
            .collect()
    }

    /// Number of in-service members.
    pub fn in_service_count(&self) -> u32 {
        self.instances
            .iter()
            .filter(|i| i.lifecycle == LifecycleState::InService)
            .count() as u32
    }

    /// Whether `id` is still a member of the group, in any lifecycle state.
    pub fn is_member(&self, id: &str) -> bool {
        self.instances.iter().any(|i| i.id == id)
    }
}

/// A group member and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceSummary {
    pub id: InstanceId,
    pub lifecycle: LifecycleState,
}

// ── Instance lifecycle ─────────────────────────────────────────────

/// Lifecycle state of a group member, as reported by the provider.
///
/// Anything other than `InService` counts as "not yet ready" — the
/// provider uses a wider state set (warm-up hooks, standby) than the
/// orchestrator distinguishes, so unknown states land in `Other`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LifecycleState {
    Pending,
    InService,
    Detaching,
    Detached,
    Terminating,
    Terminated,
    Other(String),
}

impl LifecycleState {
    /// Parse a provider lifecycle string.
    pub fn parse(s: &str) -> Self {
        match s {
            "Pending" => LifecycleState::Pending,
            "InService" => LifecycleState::InService,
            "Detaching" => LifecycleState::Detaching,
            "Detached" => LifecycleState::Detached,
            "Terminating" => LifecycleState::Terminating,
            "Terminated" => LifecycleState::Terminated,
            other => LifecycleState::Other(other.to_string()),
        }
    }
}

// ── Target health ──────────────────────────────────────────────────

/// Per-instance health as observed via the target group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TargetHealth {
    /// Registration in progress, health not yet established.
    Initial,
    Healthy,
    Unhealthy,
    /// Deregistering; connections draining.
    Draining,
    /// Not registered with the target group.
    Unused,
    /// Health checks disabled or state unknown.
    Unavailable,
}

impl TargetHealth {
    /// Parse a provider health-state string.
    pub fn parse(s: &str) -> Self {
        match s {
            "initial" => TargetHealth::Initial,
            "healthy" => TargetHealth::Healthy,
            "unhealthy" => TargetHealth::Unhealthy,
            "draining" => TargetHealth::Draining,
            "unused" => TargetHealth::Unused,
            _ => TargetHealth::Unavailable,
        }
    }
}

// ── Capacity overrides ─────────────────────────────────────────────

/// User-supplied capacity overrides for one roll.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacityOverrides {
    /// Steady-state capacity to restore at the end of the roll.
    pub desired: Option<u32>,
    /// Burst capacity used while old and new instances coexist.
    pub deployment: Option<u32>,
    /// Max capacity to restore at the end of the roll.
    pub max: Option<u32>,
}
