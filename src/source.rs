//! Frame record loading and boundary validation
//!
//! The vision pipeline writes frame records either as a JSON array or as
//! newline-delimited JSON. This module parses both and checks the ordering
//! preconditions the debounce machine relies on.

use crate::error::SimulationError;
use crate::types::FrameRecord;

/// Loader for upstream frame record sequences
pub struct FrameSource;

impl FrameSource {
    /// Parse a JSON string containing an array of frame records
    pub fn parse_array(json: &str) -> Result<Vec<FrameRecord>, SimulationError> {
        let frames: Vec<FrameRecord> = serde_json::from_str(json)?;
        Ok(frames)
    }

    /// Parse NDJSON (newline-delimited JSON) containing frame records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<FrameRecord>, SimulationError> {
        let mut frames = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<FrameRecord>(trimmed) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    return Err(SimulationError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(frames)
    }

    /// Check that timestamps are finite and non-decreasing and that frame
    /// numbers strictly increase. Fails on the first violation.
    pub fn validate(frames: &[FrameRecord]) -> Result<(), SimulationError> {
        let mut previous: Option<&FrameRecord> = None;

        for (index, frame) in frames.iter().enumerate() {
            if !frame.timestamp_sec.is_finite() {
                return Err(SimulationError::InvalidTimestamp {
                    index,
                    value: frame.timestamp_sec,
                });
            }

            if let Some(prev) = previous {
                if frame.timestamp_sec < prev.timestamp_sec {
                    return Err(SimulationError::OutOfOrderFrames {
                        index,
                        previous: prev.timestamp_sec,
                        current: frame.timestamp_sec,
                    });
                }
                if frame.frame_number <= prev.frame_number {
                    return Err(SimulationError::NonMonotonicFrameNumber {
                        index,
                        previous: prev.frame_number,
                        current: frame.frame_number,
                    });
                }
            }

            previous = Some(frame);
        }

        Ok(())
    }
}
