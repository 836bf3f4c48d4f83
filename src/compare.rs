//! Baseline vs tuned comparison

use crate::error::SimulationError;
use crate::types::{ComparisonDelta, ComparisonResult, SimulationStats};

/// Compute `tuned - baseline` for the headline metrics.
///
/// Both summaries must come from the same frame sequence; differing
/// `total_frames` is rejected rather than silently compared.
pub fn compare_stats(
    baseline: &SimulationStats,
    tuned: &SimulationStats,
) -> Result<ComparisonResult, SimulationError> {
    if baseline.total_frames != tuned.total_frames {
        return Err(SimulationError::IncomparableRuns {
            baseline_frames: baseline.total_frames,
            tuned_frames: tuned.total_frames,
        });
    }

    Ok(ComparisonResult {
        baseline: *baseline,
        tuned: *tuned,
        delta: ComparisonDelta {
            phone_frames_change: signed_diff(tuned.phone_frames, baseline.phone_frames),
            events_change: signed_diff(tuned.total_commits, baseline.total_commits),
        },
    })
}

fn signed_diff(a: u64, b: u64) -> i64 {
    a as i64 - b as i64
}
