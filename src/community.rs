//! Steps and dynamic communities.
//!
//! A dynamic community is a named lineage of step-local communities, written
//! in the tracker text format as `NAME:TIME=COMMUNITY,TIME=COMMUNITY,...`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, TimelineError};

/// One observation of a dynamic community: the step-local community it
/// occupies at a given time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Step {
    #[serde(rename = "step")]
    pub number: u32,
    pub community: u32,
}

impl Step {
    pub const fn new(number: u32, community: u32) -> Self {
        Self { number, community }
    }

    /// Parse a `TIME=COMMUNITY` token found on input line `line`.
    pub(crate) fn parse(token: &str, line: u64) -> Result<Self> {
        let malformed = || TimelineError::MalformedStep {
            line,
            token: token.to_string(),
        };
        let (number, community) = token.trim().split_once('=').ok_or_else(malformed)?;
        let number: u32 = number.trim().parse().map_err(|_| malformed())?;
        let community: u32 = community.trim().parse().map_err(|_| malformed())?;
        if number == 0 || community == 0 {
            return Err(malformed());
        }
        Ok(Self::new(number, community))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.number, self.community)
    }
}

/// A named, time-ordered sequence of [`Step`]s.
///
/// Step numbers are strictly increasing; a jump of more than one marks an
/// intermittence. The sequence is never empty and only ever shrinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DynamicCommunity {
    pub(crate) name: String,
    #[serde(rename = "data")]
    pub(crate) steps: Vec<Step>,
}

impl DynamicCommunity {
    /// Build a community from the two halves of a `NAME:STEPS` line.
    pub(crate) fn parse(name: &str, raw_steps: &str, line: u64) -> Result<Self> {
        let name = name.trim();
        if raw_steps.trim().is_empty() {
            return Err(TimelineError::EmptyCommunity {
                line,
                name: name.to_string(),
            });
        }
        let steps = raw_steps
            .split(',')
            .map(|token| Step::parse(token, line))
            .collect::<Result<Vec<_>>>()?;

        if steps.windows(2).any(|w| w[0].number >= w[1].number) {
            return Err(TimelineError::NonIncreasingSteps {
                line,
                name: name.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            steps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn first(&self) -> Step {
        self.steps[0]
    }

    pub fn last(&self) -> Step {
        self.steps[self.steps.len() - 1]
    }

    /// Whether this community occupies time step `number`.
    pub fn contains_step(&self, number: u32) -> bool {
        self.steps.binary_search_by_key(&number, |s| s.number).is_ok()
    }

    // Only called with a step of this community, so the lineage never empties.
    pub(crate) fn remove_until(&mut self, step: Step) {
        self.steps.retain(|s| s.number >= step.number);
    }

    pub(crate) fn remove_after(&mut self, step: Step) {
        self.steps.retain(|s| s.number <= step.number);
    }
}

impl FromStr for DynamicCommunity {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, raw_steps) = s.split_once(':').ok_or_else(|| TimelineError::MalformedLine {
            line: 1,
            content: s.to_string(),
        })?;
        Self::parse(name, raw_steps, 1)
    }
}

impl fmt::Display for DynamicCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
