//! Instance retirer — detach then terminate the old cohort.
//!
//! Retirement is the one phase with partial-failure tolerance: a single
//! stuck or already-gone instance must not block retirement of the rest
//! of the cohort. Each instance is handled independently and failures
//! are carried as data in the outcome, logged with the instance id.

use tracing::{info, warn};

use fleetroll_core::InstanceId;
use fleetroll_provider::FleetProvider;

use crate::waiter::Waiter;

/// What happened to each member of the cohort.
#[derive(Debug, Default)]
pub struct RetireOutcome {
    /// Detached and terminated, in processing order.
    pub retired: Vec<InstanceId>,
    /// Left behind, with the error that stopped them.
    pub failed: Vec<(InstanceId, String)>,
}

impl RetireOutcome {
    pub fn fully_retired(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Retire `instances` from `group`, one at a time in the given order.
///
/// Per instance: detach with the capacity-decrement flag (so desired
/// capacity shrinks as old instances leave), wait for the detachment to
/// be observed, then request termination. The two steps are not atomic
/// and are separately confirmed.
pub async fn retire(
    provider: &dyn FleetProvider,
    waiter: &Waiter,
    group: &str,
    instances: &[InstanceId],
) -> RetireOutcome {
    let mut outcome = RetireOutcome::default();

    for id in instances {
        if let Err(e) = retire_one(provider, waiter, group, id).await {
            warn!(group = %group, instance = %id, error = %e, "instance retirement failed, continuing");
            outcome.failed.push((id.clone(), e));
        } else {
            info!(group = %group, instance = %id, "instance retired");
            outcome.retired.push(id.clone());
        }
    }

    outcome
}

async fn retire_one(
    provider: &dyn FleetProvider,
    waiter: &Waiter,
    group: &str,
    id: &str,
) -> Result<(), String> {
    provider
        .detach_instance(group, id, true)
        .await
        .map_err(|e| format!("detach: {e}"))?;

    waiter
        .wait_for_detachment(provider, group, id)
        .await
        .map_err(|e| format!("awaiting detachment: {e}"))?;

    provider
        .terminate_instance(id)
        .await
        .map_err(|e| format!("terminate: {e}"))?;

    Ok(())
}
