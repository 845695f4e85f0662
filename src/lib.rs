//! Life-cycle events of dynamic communities.
//!
//! Reads a dynamic community timeline (each community's sequence of
//! step-local communities over time) and detects split, merge, birth,
//! death, intermittence, expansion and contraction events, producing a
//! regularized timeline and an event log for visualisation.

pub mod community;
pub mod config;
pub mod error;
pub mod events;
pub mod membership;
pub mod pipeline;
mod records;
pub mod render;
pub mod timeline;

pub use community::{DynamicCommunity, Step};
pub use config::Thresholds;
pub use error::{Result, TimelineError};
pub use events::{Endpoint, Event, EventKind, EventLog, EventSet};
pub use membership::StepCommunities;
pub use pipeline::{Analysis, Regularized};
pub use timeline::{Duplicate, Timeline};
