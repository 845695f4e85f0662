//! Staged event detection.
//!
//! Detection order matters because split and merge detection truncate the
//! timeline that every later detector reads. Each stage consumes the
//! previous one, so the order cannot be skipped or swapped:
//!
//! ```text
//! Timeline --regularize--> Regularized --analyze(table, thresholds)--> Analysis
//! ```

use tracing::info;

use crate::config::Thresholds;
use crate::error::Result;
use crate::events::{EventLog, EventSet};
use crate::membership::StepCommunities;
use crate::timeline::Timeline;

/// A timeline after split and merge regularization.
#[derive(Debug, Clone)]
pub struct Regularized {
    timeline: Timeline,
    splits: EventSet,
    merges: EventSet,
}

impl Timeline {
    /// Detect splits then merges, regularizing the timeline, and drop split
    /// events the merge pass left dangling.
    pub fn regularize(mut self) -> Regularized {
        let mut splits = self.find_splits();
        let merges = self.find_merges();
        splits.remove_orphans(&self);

        info!(
            communities = self.len(),
            splits = splits.len(),
            merges = merges.len(),
            "timeline regularized"
        );
        Regularized {
            timeline: self,
            splits,
            merges,
        }
    }
}

impl Regularized {
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn splits(&self) -> &EventSet {
        &self.splits
    }

    pub fn merges(&self) -> &EventSet {
        &self.merges
    }

    /// Detect the remaining life-cycle events on the regularized timeline.
    ///
    /// Fails when `thresholds` are invalid or when `table` lacks a step
    /// community the timeline refers to.
    pub fn analyze(self, table: &StepCommunities, thresholds: Thresholds) -> Result<Analysis> {
        thresholds.validate()?;
        let timeline = self.timeline;

        let births = timeline.find_births();
        let deaths = timeline.find_deaths();
        let intermittents = timeline.find_intermittents();
        let expansions = timeline.find_expansions(table, thresholds.expansion)?;
        let contractions = timeline.find_contractions(table, thresholds.contraction)?;

        let events = EventLog {
            splits: self.splits,
            births,
            merges: self.merges,
            deaths,
            intermittents,
            expansions,
            contractions,
        };
        info!(
            communities = timeline.len(),
            events = events.len(),
            "timeline analyzed"
        );
        Ok(Analysis { timeline, events })
    }
}

/// Final regularized timeline and every event detected on it.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub timeline: Timeline,
    pub events: EventLog,
}
