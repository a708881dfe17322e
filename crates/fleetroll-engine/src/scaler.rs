//! Scaler — the only place desired/max capacity is mutated.
//!
//! One idempotent remote request per call, no automatic retry: a
//! rejected capacity mutation is fatal to the run rather than silently
//! resubmitted.

use tracing::info;

use fleetroll_provider::FleetProvider;

use crate::error::RollResult;

/// Set the group's desired and max capacity in one request.
///
/// Max is raised alongside desired when the requested combination would
/// otherwise violate `desired <= max`.
pub async fn set_capacity(
    provider: &dyn FleetProvider,
    group: &str,
    desired: u32,
    max: u32,
) -> RollResult<()> {
    let max = max.max(desired);
    info!(group = %group, desired, max, "updating group capacity");
    provider.update_capacity(group, desired, max).await?;
    Ok(())
}
