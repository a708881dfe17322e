//! Convergence waiter — polling until a condition holds.
//!
//! One polling discipline shared by all conditions: a fixed short
//! interval, progress reported through an observer, and no timeout
//! unless one is configured. Waiting is polling-for-eventual-state,
//! not retry-on-error: a failed describe during polling aborts the
//! wait.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fleetroll_provider::FleetProvider;

use crate::error::{RollError, RollResult};
use crate::progress::{LogProgress, Progress};

/// Polls a condition at a fixed interval until it holds.
pub struct Waiter {
    interval: Duration,
    timeout: Option<Duration>,
    progress: Arc<dyn Progress>,
}

impl Waiter {
    /// Create a waiter polling at `interval`, no timeout, logging progress.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
            progress: Arc::new(LogProgress::default()),
        }
    }

    /// Give up with [`RollError::WaitTimeout`] after `timeout`.
    /// `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the progress observer.
    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    /// Poll `check` until it yields a value.
    ///
    /// `check` returns `Ok(None)` while the condition does not hold;
    /// any error it returns aborts the wait.
    pub async fn poll_until<T, F, Fut>(&self, condition: &str, mut check: F) -> RollResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RollResult<Option<T>>>,
    {
        let started = Instant::now();
        loop {
            if let Some(value) = check().await? {
                self.progress.done(condition, started.elapsed());
                return Ok(value);
            }
            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    return Err(RollError::WaitTimeout {
                        condition: condition.to_string(),
                        elapsed_secs: started.elapsed().as_secs(),
                    });
                }
            }
            self.progress.tick(condition, started.elapsed());
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Wait until the group's in-service count equals `target` exactly.
    pub async fn wait_for_instance_count(
        &self,
        provider: &dyn FleetProvider,
        group: &str,
        target: u32,
    ) -> RollResult<()> {
        let condition = format!("group {group} at {target} in-service instances");
        self.poll_until(&condition, move || async move {
            let snap = provider.describe_group(group).await?;
            Ok((snap.in_service_count() == target).then_some(()))
        })
        .await
    }

    /// Wait until `instance` reports healthy through the target group.
    pub async fn wait_for_instance_health(
        &self,
        provider: &dyn FleetProvider,
        target_group: &str,
        instance: &str,
    ) -> RollResult<()> {
        let condition = format!("instance {instance} healthy");
        self.poll_until(&condition, move || async move {
            let health = provider.target_health(target_group, instance).await?;
            Ok((health == fleetroll_core::TargetHealth::Healthy).then_some(()))
        })
        .await
    }

    /// Wait until `instance` no longer appears in the group's members.
    pub async fn wait_for_detachment(
        &self,
        provider: &dyn FleetProvider,
        group: &str,
        instance: &str,
    ) -> RollResult<()> {
        let condition = format!("instance {instance} detached from {group}");
        self.poll_until(&condition, move || async move {
            let snap = provider.describe_group(group).await?;
            Ok((!snap.is_member(instance)).then_some(()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use fleetroll_provider::SimFleet;

    fn fast_waiter() -> Waiter {
        Waiter::new(Duration::from_millis(1)).with_progress(Arc::new(NoProgress))
    }

    #[tokio::test]
    async fn waits_for_exact_instance_count() {
        let fleet = SimFleet::new("web", 2, 8).with_latency(2);
        fleet.update_capacity("web", 5, 8).await.unwrap();

        fast_waiter()
            .wait_for_instance_count(&fleet, "web", 5)
            .await
            .unwrap();

        assert_eq!(fleet.peek().await.in_service_count(), 5);
    }

    #[tokio::test]
    async fn waits_for_instance_health() {
        let fleet = SimFleet::new("web", 1, 4).with_latency(2);
        fleet.update_capacity("web", 2, 4).await.unwrap();

        let waiter = fast_waiter();
        waiter.wait_for_instance_count(&fleet, "web", 2).await.unwrap();

        let snap = fleet.peek().await;
        let new_id = snap.instances.last().unwrap().id.clone();
        waiter
            .wait_for_instance_health(&fleet, "tg-web", &new_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waits_for_detachment() {
        let fleet = SimFleet::new("web", 3, 6).with_latency(2);
        let id = fleet.peek().await.instances[0].id.clone();

        fleet.detach_instance("web", &id, true).await.unwrap();
        fast_waiter()
            .wait_for_detachment(&fleet, "web", &id)
            .await
            .unwrap();

        assert!(!fleet.peek().await.is_member(&id));
    }

    #[tokio::test]
    async fn times_out_when_configured() {
        let fleet = SimFleet::new("web", 2, 4);
        // Count 5 is unreachable: desired stays 2.
        let err = fast_waiter()
            .with_timeout(Some(Duration::from_millis(20)))
            .wait_for_instance_count(&fleet, "web", 5)
            .await
            .unwrap_err();

        assert!(matches!(err, RollError::WaitTimeout { .. }));
    }

    #[tokio::test]
    async fn describe_failure_during_polling_is_fatal() {
        let fleet = SimFleet::new("web", 2, 4);
        let err = fast_waiter()
            .wait_for_instance_count(&fleet, "nope", 2)
            .await
            .unwrap_err();

        assert!(matches!(err, RollError::Api(_)));
    }

    #[tokio::test]
    async fn overshoot_is_not_a_match() {
        // Exact matching: waiting for a count below the fleet size does
        // not succeed just because the count is "at least" the target.
        let fleet = SimFleet::new("web", 4, 8);
        let err = fast_waiter()
            .with_timeout(Some(Duration::from_millis(20)))
            .wait_for_instance_count(&fleet, "web", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, RollError::WaitTimeout { .. }));
    }
}
