//! In-memory simulated autoscaling group.
//!
//! `SimFleet` models the provider-side convergence the orchestrator
//! waits on: capacity changes launch or scale in instances, launches
//! pass through `Pending` before `InService`, fresh instances report
//! `Initial` health before `Healthy`, and detachments drain before the
//! member disappears. Time advances one step per read operation
//! (`describe_group` / `target_health`), so polling drives the
//! simulation deterministically.
//!
//! Used by the engine's tests and the CLI's `--simulate` rehearsal mode.

use std::collections::HashSet;

use tokio::sync::Mutex;
use tracing::debug;

use async_trait::async_trait;

use fleetroll_core::{
    GroupSnapshot, InstanceId, InstanceSummary, LifecycleState, TargetGroupId, TargetHealth,
};

use crate::api::FleetProvider;
use crate::error::{ProviderError, ProviderResult};

struct SimInstance {
    id: InstanceId,
    lifecycle: LifecycleState,
    health: TargetHealth,
    /// Steps remaining in the current lifecycle transition.
    countdown: u32,
    /// Steps remaining until `Initial` health becomes `Healthy`.
    health_countdown: u32,
}

struct SimState {
    name: String,
    desired: u32,
    max: u32,
    target_groups: Vec<TargetGroupId>,
    members: Vec<SimInstance>,
    /// Total instances ever launched (id counter).
    launched: u32,
    /// Every id ever handed out.
    known: HashSet<InstanceId>,
    /// Ids destroyed via `terminate_instance` or scale-in.
    terminated: Vec<InstanceId>,
    /// Ids whose detach requests are rejected (fault injection).
    detach_failures: HashSet<InstanceId>,
    /// When set, every capacity update is rejected (fault injection).
    reject_capacity_updates: bool,
    /// Every accepted (desired, max) update, in order.
    capacity_log: Vec<(u32, u32)>,
}

/// A simulated autoscaling group behind the [`FleetProvider`] trait.
pub struct SimFleet {
    /// Steps a lifecycle or health transition takes.
    latency: u32,
    state: Mutex<SimState>,
}

impl SimFleet {
    /// Create a group named `name` with `desired` instances already in
    /// service and healthy, and one attached target group `tg-<name>`.
    pub fn new(name: &str, desired: u32, max: u32) -> Self {
        let mut state = SimState {
            name: name.to_string(),
            desired,
            max,
            target_groups: vec![format!("tg-{name}")],
            members: Vec::new(),
            launched: 0,
            known: HashSet::new(),
            terminated: Vec::new(),
            detach_failures: HashSet::new(),
            reject_capacity_updates: false,
            capacity_log: Vec::new(),
        };
        for _ in 0..desired {
            let id = next_id(&mut state);
            state.members.push(SimInstance {
                id,
                lifecycle: LifecycleState::InService,
                health: TargetHealth::Healthy,
                countdown: 0,
                health_countdown: 0,
            });
        }
        Self {
            latency: 1,
            state: Mutex::new(state),
        }
    }

    /// Steps each lifecycle/health transition takes (default 1).
    pub fn with_latency(mut self, latency: u32) -> Self {
        self.latency = latency;
        self
    }

    /// Replace the attached target groups (for discovery-validation tests).
    pub async fn set_target_groups(&self, target_groups: Vec<TargetGroupId>) {
        self.state.lock().await.target_groups = target_groups;
    }

    /// Reject future detach requests for `id`.
    pub async fn inject_detach_failure(&self, id: &str) {
        self.state.lock().await.detach_failures.insert(id.to_string());
    }

    /// Reject every future capacity update.
    pub async fn reject_capacity_updates(&self) {
        self.state.lock().await.reject_capacity_updates = true;
    }

    /// Current member snapshot without advancing the simulation.
    pub async fn peek(&self) -> GroupSnapshot {
        snapshot(&*self.state.lock().await)
    }

    /// Ids destroyed so far, in destruction order.
    pub async fn terminated_ids(&self) -> Vec<InstanceId> {
        self.state.lock().await.terminated.clone()
    }

    /// Every accepted (desired, max) capacity update, in order.
    pub async fn capacity_updates(&self) -> Vec<(u32, u32)> {
        self.state.lock().await.capacity_log.clone()
    }

    /// Advance one step: progress transitions, then reconcile toward
    /// the requested desired capacity.
    fn step(&self, state: &mut SimState) {
        // Progress in-flight transitions.
        let mut gone = Vec::new();
        for inst in &mut state.members {
            match inst.lifecycle {
                LifecycleState::Pending => {
                    if inst.countdown > 0 {
                        inst.countdown -= 1;
                    }
                    if inst.countdown == 0 {
                        inst.lifecycle = LifecycleState::InService;
                    }
                }
                LifecycleState::InService => {
                    if inst.health == TargetHealth::Initial {
                        if inst.health_countdown > 0 {
                            inst.health_countdown -= 1;
                        }
                        if inst.health_countdown == 0 {
                            inst.health = TargetHealth::Healthy;
                        }
                    }
                }
                LifecycleState::Detaching | LifecycleState::Terminating => {
                    if inst.countdown > 0 {
                        inst.countdown -= 1;
                    }
                    if inst.countdown == 0 {
                        gone.push(inst.id.clone());
                    }
                }
                _ => {}
            }
        }
        for id in gone {
            let terminating = state
                .members
                .iter()
                .any(|i| i.id == id && i.lifecycle == LifecycleState::Terminating);
            state.members.retain(|i| i.id != id);
            if terminating {
                state.terminated.push(id);
            }
        }

        // Launch up to desired.
        let active = active_count(state);
        if active < state.desired {
            let deficit = state.desired - active;
            for _ in 0..deficit {
                let id = next_id(state);
                debug!(group = %state.name, instance = %id, "sim: launching");
                state.members.push(SimInstance {
                    id,
                    lifecycle: if self.latency == 0 {
                        LifecycleState::InService
                    } else {
                        LifecycleState::Pending
                    },
                    health: if self.latency == 0 {
                        TargetHealth::Healthy
                    } else {
                        TargetHealth::Initial
                    },
                    countdown: self.latency,
                    health_countdown: self.latency,
                });
            }
        }

        // Scale in, oldest members first.
        let active = active_count(state);
        if active > state.desired {
            let mut excess = active - state.desired;
            for inst in &mut state.members {
                if excess == 0 {
                    break;
                }
                if matches!(
                    inst.lifecycle,
                    LifecycleState::Pending | LifecycleState::InService
                ) {
                    debug!(group = %state.name, instance = %inst.id, "sim: scaling in");
                    inst.lifecycle = LifecycleState::Terminating;
                    inst.health = TargetHealth::Draining;
                    inst.countdown = self.latency;
                    excess -= 1;
                }
            }
            if self.latency == 0 {
                // Zero-latency transitions complete within the same step.
                let doomed: Vec<InstanceId> = state
                    .members
                    .iter()
                    .filter(|i| i.lifecycle == LifecycleState::Terminating && i.countdown == 0)
                    .map(|i| i.id.clone())
                    .collect();
                for id in doomed {
                    state.members.retain(|i| i.id != id);
                    state.terminated.push(id);
                }
            }
        }
    }
}

fn next_id(state: &mut SimState) -> InstanceId {
    state.launched += 1;
    let id = format!("i-{:04}", state.launched);
    state.known.insert(id.clone());
    id
}

fn active_count(state: &SimState) -> u32 {
    state
        .members
        .iter()
        .filter(|i| {
            matches!(
                i.lifecycle,
                LifecycleState::Pending | LifecycleState::InService
            )
        })
        .count() as u32
}

fn snapshot(state: &SimState) -> GroupSnapshot {
    GroupSnapshot {
        name: state.name.clone(),
        desired: state.desired,
        max: state.max,
        instances: state
            .members
            .iter()
            .map(|i| InstanceSummary {
                id: i.id.clone(),
                lifecycle: i.lifecycle.clone(),
            })
            .collect(),
        target_groups: state.target_groups.clone(),
    }
}

#[async_trait]
impl FleetProvider for SimFleet {
    async fn describe_group(&self, name: &str) -> ProviderResult<GroupSnapshot> {
        let mut state = self.state.lock().await;
        if state.name != name {
            return Err(ProviderError::GroupNotFound(name.to_string()));
        }
        self.step(&mut state);
        Ok(snapshot(&state))
    }

    async fn update_capacity(&self, name: &str, desired: u32, max: u32) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        if state.name != name {
            return Err(ProviderError::GroupNotFound(name.to_string()));
        }
        if state.reject_capacity_updates {
            return Err(ProviderError::Api("capacity update rejected".to_string()));
        }
        if desired > max {
            return Err(ProviderError::Api(format!(
                "desired capacity {desired} exceeds max {max}"
            )));
        }
        state.capacity_log.push((desired, max));
        state.desired = desired;
        state.max = max;
        Ok(())
    }

    async fn target_health(
        &self,
        target_group: &str,
        instance: &str,
    ) -> ProviderResult<TargetHealth> {
        let mut state = self.state.lock().await;
        if !state.target_groups.iter().any(|tg| tg == target_group) {
            return Err(ProviderError::Api(format!(
                "unknown target group: {target_group}"
            )));
        }
        self.step(&mut state);
        if let Some(inst) = state.members.iter().find(|i| i.id == instance) {
            return Ok(match inst.lifecycle {
                LifecycleState::Detaching | LifecycleState::Terminating => TargetHealth::Draining,
                _ => inst.health,
            });
        }
        if state.known.contains(instance) {
            // Launched once, no longer registered.
            return Ok(TargetHealth::Unused);
        }
        Err(ProviderError::InstanceNotFound(instance.to_string()))
    }

    async fn detach_instance(
        &self,
        group: &str,
        instance: &str,
        decrement_desired: bool,
    ) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        if state.name != group {
            return Err(ProviderError::GroupNotFound(group.to_string()));
        }
        if state.detach_failures.contains(instance) {
            return Err(ProviderError::Api(format!(
                "detach rejected for {instance}"
            )));
        }
        let latency = self.latency;
        let Some(inst) = state.members.iter_mut().find(|i| i.id == instance) else {
            return Err(ProviderError::InstanceNotFound(instance.to_string()));
        };
        inst.lifecycle = LifecycleState::Detaching;
        inst.health = TargetHealth::Draining;
        inst.countdown = latency;
        if latency == 0 {
            state.members.retain(|i| i.id != instance);
        }
        if decrement_desired {
            state.desired = state.desired.saturating_sub(1);
        }
        Ok(())
    }

    async fn terminate_instance(&self, instance: &str) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        if !state.known.contains(instance) {
            return Err(ProviderError::InstanceNotFound(instance.to_string()));
        }
        if state.terminated.iter().any(|id| id == instance) {
            return Err(ProviderError::Api(format!(
                "instance already terminated: {instance}"
            )));
        }
        if let Some(inst) = state.members.iter_mut().find(|i| i.id == instance) {
            // Still attached; drain it out of the group as it dies.
            inst.lifecycle = LifecycleState::Terminating;
            inst.countdown = self.latency;
            if self.latency == 0 {
                state.members.retain(|i| i.id != instance);
                state.terminated.push(instance.to_string());
            }
        } else {
            state.terminated.push(instance.to_string());
        }
        Ok(())
    }
}
