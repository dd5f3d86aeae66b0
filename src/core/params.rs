use derive_getters::Getters;

use super::error::{RemapError, Result};

/// Already resolved thresholds consumed by the decision engine and the scheduler.
#[derive(Getters, Copy, Clone, Debug, PartialEq, Eq)]
pub struct RemapParams {
    /// Reads with at least this many clipped bases are unmapped inside flagged intervals.
    soft_clip: u32,
    /// Intervals with the observed max depth >= this floor are high-depth.
    min_depth: u32,
    /// Pairs with |insert size| above this ceiling are considered chimeric.
    max_insert: u64,
    /// Number of read bases allowed to fall outside of an interval.
    tolerance: u64,
    /// Margin added on both sides of an interval when slicing the record source.
    padding: u64,
    workers: usize,
}

impl RemapParams {
    pub fn new(
        soft_clip: u32,
        min_depth: u32,
        max_insert: u64,
        tolerance: u64,
        padding: u64,
        workers: usize,
    ) -> Result<Self> {
        let invalid = |parameter: &str, reason: &str| {
            Err(RemapError::InvalidParameter { parameter: parameter.into(), reason: reason.into() })
        };
        if soft_clip == 0 {
            return invalid("soft-clip", "must be >= 1, otherwise every read in a flagged interval is unmapped");
        }
        if max_insert == 0 {
            return invalid("max-insert", "must be >= 1");
        }
        if workers == 0 {
            return invalid("threads", "must be >= 1");
        }
        Ok(Self { soft_clip, min_depth, max_insert, tolerance, padding, workers })
    }
}

impl Default for RemapParams {
    fn default() -> Self {
        Self { soft_clip: 20, min_depth: 200, max_insert: 1000, tolerance: 10, padding: 500, workers: 1 }
    }
}
