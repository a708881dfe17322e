//! The fleetroll orchestrator.
//!
//! Replaces every in-service instance of an autoscaling group with
//! freshly launched ones, with zero-downtime semantics: burst capacity
//! up, wait for the replacements to serve traffic, retire the old
//! cohort, restore the original capacity.
//!
//! # Components
//!
//! - **`inspector`** — reads and validates current group state
//! - **`planner`** — pure capacity arithmetic producing a [`RollPlan`]
//! - **`scaler`** — the only place desired/max capacity is mutated
//! - **`waiter`** — polling until a convergence condition holds
//! - **`retirer`** — detach + terminate with per-instance failure tolerance
//! - **`controller`** — the roll state machine sequencing the phases

pub mod controller;
pub mod error;
pub mod inspector;
pub mod planner;
pub mod progress;
pub mod retirer;
pub mod scaler;
pub mod waiter;

pub use controller::{RollPhase, RollReport, Roller};
pub use error::{RollError, RollResult};
pub use inspector::FleetView;
pub use planner::{plan, RollPlan, DOWNSCALE_THRESHOLD, DOWNSCALE_TO};
pub use progress::{LogProgress, NoProgress, Progress};
pub use retirer::RetireOutcome;
pub use waiter::Waiter;
