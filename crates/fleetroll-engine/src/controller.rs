//! Run controller — sequences the roll phases.
//!
//! One roll is strictly sequential: inspect, plan, optionally defuse an
//! oversized fleet, burst up, verify the replacements serve traffic,
//! retire the old cohort, restore the original capacity. Every phase
//! before `Retiring` fails fast; retirement alone tolerates
//! per-instance failures.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use fleetroll_core::{CapacityOverrides, InstanceId};
use fleetroll_provider::FleetProvider;

use crate::error::RollResult;
use crate::inspector;
use crate::planner::{self, RollPlan};
use crate::retirer::{self, RetireOutcome};
use crate::scaler;
use crate::waiter::Waiter;

/// Max capacity floor applied while pre-downscaling, so a fleet with a
/// tight configured max still has headroom to converge downward.
const PRE_DOWNSCALE_MAX_FLOOR: u32 = 20;

/// Where the roll currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RollPhase {
    Inspecting,
    Planning,
    PreDownscaling,
    ScalingUp,
    WaitingUp,
    DiscoveringNewInstances,
    HealthChecking,
    Retiring,
    ScalingDown,
    WaitingDown,
    Done,
}

/// What one completed roll did.
#[derive(Debug)]
pub struct RollReport {
    pub plan: RollPlan,
    /// Replacement instances launched by the burst, in discovery order.
    pub launched: Vec<InstanceId>,
    /// Old instances detached and terminated.
    pub retired: Vec<InstanceId>,
    /// Old instances left behind, with the error that stopped them.
    pub failed: Vec<(InstanceId, String)>,
}

/// Drives one roll against one group.
pub struct Roller<'a> {
    provider: &'a dyn FleetProvider,
    waiter: Waiter,
    phase: RollPhase,
}

impl<'a> Roller<'a> {
    pub fn new(provider: &'a dyn FleetProvider, waiter: Waiter) -> Self {
        Self {
            provider,
            waiter,
            phase: RollPhase::Inspecting,
        }
    }

    /// Phase the roll is in (the phase it failed in, after an error).
    pub fn phase(&self) -> &RollPhase {
        &self.phase
    }

    fn enter(&mut self, next: RollPhase) {
        debug!(from = ?self.phase, to = ?next, "phase transition");
        self.phase = next;
    }

    /// Run the full roll protocol.
    pub async fn run(
        &mut self,
        group: &str,
        overrides: &CapacityOverrides,
    ) -> RollResult<RollReport> {
        self.enter(RollPhase::Inspecting);
        let view = inspector::inspect(self.provider, group).await?;

        self.enter(RollPhase::Planning);
        let plan = planner::plan(view.desired, view.max, overrides)?;
        info!(
            group = %group,
            desired = plan.desired_capacity,
            max = plan.max_capacity,
            deployment = plan.deployment_capacity,
            deployment_max = plan.deployment_max_capacity,
            downscale_first = plan.downscale_first(),
            "planned roll"
        );

        // The old cohort: every instance serving before the burst. An
        // oversized fleet is shrunk first, and the snapshot taken from
        // the survivors.
        let old: Vec<InstanceId> = if let Some(downscale_to) = plan.downscale_to {
            self.enter(RollPhase::PreDownscaling);
            info!(group = %group, downscale_to, "downscaling oversized fleet before burst");
            scaler::set_capacity(
                self.provider,
                group,
                downscale_to,
                plan.max_capacity.max(PRE_DOWNSCALE_MAX_FLOOR),
            )
            .await?;
            self.waiter
                .wait_for_instance_count(self.provider, group, downscale_to)
                .await?;
            self.provider.describe_group(group).await?.in_service_ids()
        } else {
            view.in_service.clone()
        };

        self.enter(RollPhase::ScalingUp);
        scaler::set_capacity(
            self.provider,
            group,
            plan.deployment_capacity,
            plan.deployment_max_capacity,
        )
        .await?;

        self.enter(RollPhase::WaitingUp);
        self.waiter
            .wait_for_instance_count(self.provider, group, plan.deployment_capacity)
            .await?;

        self.enter(RollPhase::DiscoveringNewInstances);
        let old_set: HashSet<&InstanceId> = old.iter().collect();
        let launched: Vec<InstanceId> = self
            .provider
            .describe_group(group)
            .await?
            .in_service_ids()
            .into_iter()
            .filter(|id| !old_set.contains(id))
            .collect();
        info!(group = %group, count = launched.len(), "discovered replacement instances");

        self.enter(RollPhase::HealthChecking);
        for id in &launched {
            self.waiter
                .wait_for_instance_health(self.provider, &view.target_group, id)
                .await?;
        }

        self.enter(RollPhase::Retiring);
        let outcome: RetireOutcome = retirer::retire(self.provider, &self.waiter, group, &old).await;
        if !outcome.fully_retired() {
            warn!(
                group = %group,
                failed = outcome.failed.len(),
                retired = outcome.retired.len(),
                "roll continues with unretired instances"
            );
        }

        self.enter(RollPhase::ScalingDown);
        scaler::set_capacity(self.provider, group, plan.desired_capacity, plan.max_capacity)
            .await?;

        self.enter(RollPhase::WaitingDown);
        self.waiter
            .wait_for_instance_count(self.provider, group, plan.desired_capacity)
            .await?;

        self.enter(RollPhase::Done);
        info!(
            group = %group,
            launched = launched.len(),
            retired = outcome.retired.len(),
            failed = outcome.failed.len(),
            "roll complete"
        );

        Ok(RollReport {
            plan,
            launched,
            retired: outcome.retired,
            failed: outcome.failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::RollError;
    use fleetroll_provider::SimFleet;
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_roller(fleet: &SimFleet) -> Roller<'_> {
        let waiter = Waiter::new(Duration::from_millis(1)).with_progress(Arc::new(NoProgress));
        Roller::new(fleet, waiter)
    }

    #[tokio::test]
    async fn roll_replaces_every_instance() {
        let fleet = SimFleet::new("web", 3, 6).with_latency(1);
        let old = fleet.peek().await.in_service_ids();

        let mut roller = fast_roller(&fleet);
        let report = roller.run("web", &CapacityOverrides::default()).await.unwrap();

        assert_eq!(roller.phase(), &RollPhase::Done);
        assert_eq!(report.retired, old);
        assert!(report.failed.is_empty());
        assert_eq!(report.launched.len(), 3);

        // Capacity restored, membership fully replaced.
        let snap = fleet.peek().await;
        assert_eq!(snap.desired, 3);
        assert_eq!(snap.max, 6);
        assert_eq!(snap.in_service_count(), 3);
        for inst in &snap.instances {
            assert!(report.launched.contains(&inst.id));
            assert!(!old.contains(&inst.id));
        }

        // Exactly two capacity mutations: burst, then restore.
        assert_eq!(fleet.capacity_updates().await, vec![(6, 6), (3, 6)]);
    }

    #[tokio::test]
    async fn new_instances_never_include_old_ones() {
        let fleet = SimFleet::new("web", 4, 8).with_latency(1);
        let old = fleet.peek().await.in_service_ids();

        let report = fast_roller(&fleet)
            .run("web", &CapacityOverrides::default())
            .await
            .unwrap();

        for id in &report.launched {
            assert!(!old.contains(id));
        }
        assert_eq!(report.launched.len(), 4);
    }

    #[tokio::test]
    async fn oversized_fleet_is_defused_before_burst() {
        let fleet = SimFleet::new("big", 15, 20).with_latency(1);

        let report = fast_roller(&fleet)
            .run("big", &CapacityOverrides::default())
            .await
            .unwrap();

        // Downscale to 10 first, then burst to 30, then restore 15.
        assert_eq!(
            fleet.capacity_updates().await,
            vec![(10, 20), (30, 30), (15, 20)]
        );
        // The burst replaced the 10 survivors.
        assert_eq!(report.retired.len(), 10);
        assert_eq!(report.launched.len(), 20);

        let snap = fleet.peek().await;
        assert_eq!(snap.desired, 15);
        assert_eq!(snap.max, 20);
        assert_eq!(snap.in_service_count(), 15);
    }

    #[tokio::test]
    async fn capacity_rejection_aborts_run() {
        let fleet = SimFleet::new("web", 3, 6).with_latency(1);
        fleet.reject_capacity_updates().await;

        let mut roller = fast_roller(&fleet);
        let err = roller
            .run("web", &CapacityOverrides::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RollError::Api(_)));
        assert_eq!(roller.phase(), &RollPhase::ScalingUp);
        // Nothing was destroyed.
        assert!(fleet.terminated_ids().await.is_empty());
        assert_eq!(fleet.peek().await.in_service_count(), 3);
    }

    #[tokio::test]
    async fn invalid_plan_aborts_before_any_mutation() {
        let fleet = SimFleet::new("web", 3, 6);
        let overrides = CapacityOverrides {
            desired: Some(5),
            deployment: Some(5),
            ..Default::default()
        };

        let mut roller = fast_roller(&fleet);
        let err = roller.run("web", &overrides).await.unwrap_err();

        assert!(matches!(err, RollError::InvalidPlan { .. }));
        assert_eq!(roller.phase(), &RollPhase::Planning);
        assert!(fleet.capacity_updates().await.is_empty());
    }

    #[tokio::test]
    async fn stuck_instance_does_not_stop_the_roll() {
        let fleet = SimFleet::new("web", 3, 6).with_latency(1);
        let old = fleet.peek().await.in_service_ids();
        fleet.inject_detach_failure(&old[1]).await;

        let mut roller = fast_roller(&fleet);
        let report = roller.run("web", &CapacityOverrides::default()).await.unwrap();

        assert_eq!(roller.phase(), &RollPhase::Done);
        assert_eq!(report.retired, vec![old[0].clone(), old[2].clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, old[1]);

        // The rest of the cohort still died, and the restore converged.
        let terminated = fleet.terminated_ids().await;
        assert!(terminated.contains(&old[0]));
        assert!(terminated.contains(&old[2]));
        let snap = fleet.peek().await;
        assert_eq!(snap.desired, 3);
        assert_eq!(snap.in_service_count(), 3);
    }

    #[tokio::test]
    async fn missing_group_fails_in_inspection() {
        let fleet = SimFleet::new("web", 3, 6);
        let mut roller = fast_roller(&fleet);

        let err = roller
            .run("ghost", &CapacityOverrides::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RollError::GroupNotFound(_)));
        assert_eq!(roller.phase(), &RollPhase::Inspecting);
    }

    #[tokio::test]
    async fn desired_override_changes_the_restored_capacity() {
        let fleet = SimFleet::new("web", 2, 8).with_latency(1);

        let report = fast_roller(&fleet)
            .run(
                "web",
                &CapacityOverrides {
                    desired: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(report.plan.desired_capacity, 4);
        assert_eq!(report.plan.deployment_capacity, 8);

        let snap = fleet.peek().await;
        assert_eq!(snap.desired, 4);
        assert_eq!(snap.in_service_count(), 4);
    }
}
