//! Error types for the `community-timeline` crate.

use std::path::PathBuf;

/// Errors raised while reading inputs or measuring the timeline.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// A timeline line is not of the form `NAME:STEPS`.
    #[error("line {line}: expected NAME:STEPS, got {content:?}")]
    MalformedLine { line: u64, content: String },

    /// A step token is not of the form `TIME=COMMUNITY`.
    #[error("line {line}: malformed step {token:?}, expected TIME=COMMUNITY")]
    MalformedStep { line: u64, token: String },

    /// A dynamic community has no steps.
    #[error("line {line}: dynamic community {name:?} has no steps")]
    EmptyCommunity { line: u64, name: String },

    /// Two dynamic communities share a name.
    #[error("line {line}: duplicate dynamic community {name:?}")]
    DuplicateName { line: u64, name: String },

    /// Step numbers of a dynamic community are not strictly increasing.
    #[error("line {line}: steps of {name:?} are not strictly increasing")]
    NonIncreasingSteps { line: u64, name: String },

    /// The membership table has no entry for a step community in the timeline.
    #[error("no members recorded for community {community} at step {step}")]
    MissingMembership { step: u32, community: u32 },

    /// A step community has no members, so size ratios are undefined.
    #[error("community {community} at step {step} has no members")]
    EmptyMembership { step: u32, community: u32 },

    /// A step file holds something other than space-separated member ids.
    #[error("{}: line {line}: bad member {token:?}", path.display())]
    MalformedMembership {
        path: PathBuf,
        line: u64,
        token: String,
    },

    /// A detection threshold is negative or not finite.
    #[error("invalid {name} threshold: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
