pub mod assistant;
pub mod checklist;
pub mod clock;
pub mod error;
pub mod holidays;
pub mod keys;
pub mod materialize;
pub mod notebook;
pub mod notifications;
pub mod recurrence;
pub mod reminder;
pub mod service;
pub mod state;

pub use crate::error::Error;
pub use crate::service::{PlannerService, PlannerServiceBuilder, SnapshotStore};
pub use crate::state::PlannerState;
