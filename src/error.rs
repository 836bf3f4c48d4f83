//! Error types for the re-simulation engine

use thiserror::Error;

/// Errors that can occur while loading frames or running a simulation.
///
/// Everything except the JSON/parse variants is a caller-side precondition
/// violation, rejected before any frame is folded.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid phone threshold: {0} (must be finite and >= 0)")]
    InvalidThreshold(f64),

    #[error("Invalid debounce duration: {0}s (must be finite and > 0)")]
    InvalidDebounceDuration(f64),

    #[error("Invalid frame rate: {0} (must be > 0)")]
    InvalidFps(u32),

    #[error("Frames out of order at index {index}: timestamp {current}s follows {previous}s")]
    OutOfOrderFrames {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("Frame number not increasing at index {index}: {current} follows {previous}")]
    NonMonotonicFrameNumber {
        index: usize,
        previous: u64,
        current: u64,
    },

    #[error("Invalid timestamp at index {index}: {value}")]
    InvalidTimestamp { index: usize, value: f64 },

    #[error("Cannot compare runs over different sequences: baseline has {baseline_frames} frames, tuned has {tuned_frames}")]
    IncomparableRuns {
        baseline_frames: u64,
        tuned_frames: u64,
    },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse frame records: {0}")]
    ParseError(String),
}
