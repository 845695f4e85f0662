//! Detection thresholds.

use crate::error::{Result, TimelineError};

/// Default relative size change for expansions and contractions (10%).
pub const DEFAULT_THRESHOLD: f64 = 0.10;

/// Relative size changes a community must strictly exceed between two
/// consecutive steps to count as an expansion or a contraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub expansion: f64,
    pub contraction: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            expansion: DEFAULT_THRESHOLD,
            contraction: DEFAULT_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(expansion: f64, contraction: f64) -> Result<Self> {
        let thresholds = Self {
            expansion,
            contraction,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Both thresholds must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("expansion", self.expansion), ("contraction", self.contraction)] {
            if !value.is_finite() || value < 0.0 {
                return Err(TimelineError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }
}
