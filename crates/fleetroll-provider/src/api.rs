//! The `FleetProvider` trait — the five remote operations the
//! orchestrator consumes.
//!
//! Semantics, not literal provider call signatures. Implementations
//! must be safe to call sequentially from a single control flow; the
//! orchestrator never issues concurrent capacity mutations.

use async_trait::async_trait;

use fleetroll_core::{GroupSnapshot, TargetHealth};

use crate::error::ProviderResult;

/// Remote operations against one cloud provider.
#[async_trait]
pub trait FleetProvider: Send + Sync {
    /// Describe an autoscaling group: capacity, members with lifecycle
    /// states, attached target groups.
    async fn describe_group(&self, name: &str) -> ProviderResult<GroupSnapshot>;

    /// Set the group's desired and max capacity in a single request.
    ///
    /// Idempotent; any rejection (invalid combination, throttling) is an
    /// error the caller treats as fatal.
    async fn update_capacity(&self, name: &str, desired: u32, max: u32) -> ProviderResult<()>;

    /// Health of one instance as seen by the target group.
    async fn target_health(
        &self,
        target_group: &str,
        instance: &str,
    ) -> ProviderResult<TargetHealth>;

    /// Remove an instance from the group without destroying it.
    ///
    /// With `decrement_desired`, the group's desired capacity shrinks by
    /// one in the same request, so departing instances are not replaced.
    async fn detach_instance(
        &self,
        group: &str,
        instance: &str,
        decrement_desired: bool,
    ) -> ProviderResult<()>;

    /// Destroy an instance. The instance should already be detached.
    async fn terminate_instance(&self, instance: &str) -> ProviderResult<()>;
}
