//! Capacity planner — pure arithmetic over capacities, no I/O.
//!
//! The burst (deployment) capacity must strictly exceed both the target
//! steady state and the current fleet size, otherwise no new instances
//! would exist to replace old ones. Oversized fleets are downscaled
//! before bursting so the doubling never produces a capacity spike.

use serde::{Deserialize, Serialize};

use fleetroll_core::CapacityOverrides;

use crate::error::{RollError, RollResult};

/// Fleets above this size are downscaled before the burst.
pub const DOWNSCALE_THRESHOLD: u32 = 10;

/// Capacity an oversized fleet is brought down to first.
pub const DOWNSCALE_TO: u32 = 10;

/// Capacity targets for one roll.
///
/// Created once at run start and owned by the run controller for the
/// duration of the roll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RollPlan {
    /// Steady-state capacity to restore at the end.
    pub desired_capacity: u32,
    /// Max capacity to restore at the end.
    pub max_capacity: u32,
    /// Burst capacity while old and new instances coexist.
    pub deployment_capacity: u32,
    /// Max capacity during the burst.
    pub deployment_max_capacity: u32,
    /// Set when the current fleet exceeds the downscale threshold.
    pub downscale_to: Option<u32>,
}

impl RollPlan {
    /// Whether the fleet must shrink before the burst.
    pub fn downscale_first(&self) -> bool {
        self.downscale_to.is_some()
    }
}

/// Compute the plan from observed capacity plus user overrides.
pub fn plan(
    current_desired: u32,
    current_max: u32,
    overrides: &CapacityOverrides,
) -> RollResult<RollPlan> {
    let desired_capacity = overrides.desired.unwrap_or(current_desired);

    let downscale_to = (current_desired > DOWNSCALE_THRESHOLD).then_some(DOWNSCALE_TO);

    let deployment_capacity = overrides
        .deployment
        .unwrap_or(2 * current_desired.max(desired_capacity));

    let max_capacity = overrides.max.unwrap_or(current_max);
    let deployment_max_capacity = max_capacity.max(deployment_capacity);

    if deployment_capacity <= desired_capacity || deployment_capacity <= current_desired {
        return Err(RollError::InvalidPlan {
            deployment: deployment_capacity,
            desired: desired_capacity,
            current: current_desired,
        });
    }

    Ok(RollPlan {
        desired_capacity,
        max_capacity,
        deployment_capacity,
        deployment_max_capacity,
        downscale_to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> CapacityOverrides {
        CapacityOverrides::default()
    }

    #[test]
    fn doubles_current_capacity_by_default() {
        let plan = plan(3, 6, &no_overrides()).unwrap();
        assert_eq!(
            plan,
            RollPlan {
                desired_capacity: 3,
                max_capacity: 6,
                deployment_capacity: 6,
                deployment_max_capacity: 6,
                downscale_to: None,
            }
        );
    }

    #[test]
    fn oversized_fleet_downscales_first() {
        let plan = plan(15, 20, &no_overrides()).unwrap();
        assert!(plan.downscale_first());
        assert_eq!(plan.downscale_to, Some(10));
        assert_eq!(plan.deployment_capacity, 30);
        assert_eq!(plan.deployment_max_capacity, 30);
    }

    #[test]
    fn threshold_is_exclusive() {
        // At the threshold exactly: no downscale.
        assert!(!plan(10, 20, &no_overrides()).unwrap().downscale_first());
        assert!(plan(11, 20, &no_overrides()).unwrap().downscale_first());
    }

    #[test]
    fn burst_doubles_the_larger_of_current_and_override() {
        // Override below current: burst still doubles current.
        let p = plan(4, 8, &CapacityOverrides {
            desired: Some(2),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(p.desired_capacity, 2);
        assert_eq!(p.deployment_capacity, 8);

        // Override above current: burst doubles the override.
        let p = plan(2, 8, &CapacityOverrides {
            desired: Some(4),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(p.deployment_capacity, 8);
    }

    #[test]
    fn deployment_max_never_below_burst() {
        let p = plan(3, 4, &no_overrides()).unwrap();
        // Burst 6 exceeds max 4, so the deployment max is raised with it.
        assert_eq!(p.deployment_capacity, 6);
        assert_eq!(p.deployment_max_capacity, 6);
        // The restore max is untouched.
        assert_eq!(p.max_capacity, 4);
    }

    #[test]
    fn max_override_is_respected() {
        let p = plan(3, 6, &CapacityOverrides {
            max: Some(12),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(p.max_capacity, 12);
        assert_eq!(p.deployment_max_capacity, 12);
    }

    #[test]
    fn burst_not_exceeding_desired_is_invalid() {
        let err = plan(3, 6, &CapacityOverrides {
            desired: Some(5),
            deployment: Some(5),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            RollError::InvalidPlan {
                deployment: 5,
                desired: 5,
                current: 3
            }
        ));
    }

    #[test]
    fn burst_not_exceeding_current_is_invalid() {
        let err = plan(6, 8, &CapacityOverrides {
            desired: Some(2),
            deployment: Some(4),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, RollError::InvalidPlan { .. }));
    }

    #[test]
    fn planning_is_pure() {
        let overrides = CapacityOverrides {
            desired: Some(4),
            deployment: None,
            max: Some(10),
        };
        assert_eq!(
            plan(3, 6, &overrides).unwrap(),
            plan(3, 6, &overrides).unwrap()
        );
    }

    #[test]
    fn empty_group_cannot_be_planned() {
        // 2 * 0 = 0 never strictly exceeds 0.
        let err = plan(0, 0, &no_overrides()).unwrap_err();
        assert!(matches!(err, RollError::InvalidPlan { .. }));
    }
}
