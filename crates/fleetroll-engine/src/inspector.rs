//! Fleet inspector — reads and validates current group state.
//!
//! One describe round trip, no side effects. Target-group discovery
//! requires exactly one attached target group: zero means health can't
//! be observed at all, more than one means it is ambiguous which one
//! gates the roll, and both abort before anything is mutated.

use tracing::debug;

use fleetroll_core::{InstanceId, TargetGroupId};
use fleetroll_provider::{FleetProvider, ProviderError};

use crate::error::{RollError, RollResult};

/// Validated view of a group at inspection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetView {
    pub desired: u32,
    pub max: u32,
    pub in_service: Vec<InstanceId>,
    pub target_group: TargetGroupId,
}

/// Inspect `group`: capacity, in-service members, the single attached
/// target group.
pub async fn inspect(provider: &dyn FleetProvider, group: &str) -> RollResult<FleetView> {
    let snap = provider.describe_group(group).await.map_err(|e| match e {
        ProviderError::GroupNotFound(name) => RollError::GroupNotFound(name),
        other => RollError::Api(other),
    })?;

    let target_group = match snap.target_groups.len() {
        0 => return Err(RollError::NoTargetGroup(group.to_string())),
        1 => snap.target_groups[0].clone(),
        count => {
            return Err(RollError::AmbiguousTargetGroup {
                group: group.to_string(),
                count,
            });
        }
    };

    let view = FleetView {
        desired: snap.desired,
        max: snap.max,
        in_service: snap.in_service_ids(),
        target_group,
    };

    debug!(
        group = %group,
        desired = view.desired,
        max = view.max,
        in_service = view.in_service.len(),
        target_group = %view.target_group,
        "inspected group"
    );

    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetroll_provider::SimFleet;

    #[tokio::test]
    async fn inspect_reads_capacity_and_members() {
        let fleet = SimFleet::new("web", 3, 6);
        let view = inspect(&fleet, "web").await.unwrap();

        assert_eq!(view.desired, 3);
        assert_eq!(view.max, 6);
        assert_eq!(view.in_service.len(), 3);
        assert_eq!(view.target_group, "tg-web");
    }

    #[tokio::test]
    async fn missing_group_fails() {
        let fleet = SimFleet::new("web", 3, 6);
        let err = inspect(&fleet, "api").await.unwrap_err();
        assert!(matches!(err, RollError::GroupNotFound(name) if name == "api"));
    }

    #[tokio::test]
    async fn zero_target_groups_fails() {
        let fleet = SimFleet::new("web", 3, 6);
        fleet.set_target_groups(vec![]).await;

        let err = inspect(&fleet, "web").await.unwrap_err();
        assert!(matches!(err, RollError::NoTargetGroup(_)));
    }

    #[tokio::test]
    async fn multiple_target_groups_fail() {
        let fleet = SimFleet::new("web", 3, 6);
        fleet
            .set_target_groups(vec!["tg-a".to_string(), "tg-b".to_string()])
            .await;

        let err = inspect(&fleet, "web").await.unwrap_err();
        assert!(matches!(
            err,
            RollError::AmbiguousTargetGroup { count: 2, .. }
        ));
    }
}
