//! Simulation parameters
//!
//! The two operator-tunable knobs (phone threshold and debounce duration)
//! plus the fixed frame-rate assumption used to turn a duration into a
//! consecutive-frame count.

use crate::error::SimulationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default wrist-to-ear distance below which a person is flagged (normalized)
pub const DEFAULT_PHONE_THRESHOLD: f64 = 0.05;

/// Default minimum time a candidate state must persist (seconds)
pub const DEFAULT_DEBOUNCE_DURATION_SEC: f64 = 0.55;

/// Assumed capture frame rate
pub const DEFAULT_FPS: u32 = 24;

/// Parameters for one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Persons with `min_distance < phone_threshold` are flagged
    pub phone_threshold: f64,
    /// How long a candidate must persist before it is committed
    pub debounce_duration_sec: f64,
    pub fps: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            phone_threshold: DEFAULT_PHONE_THRESHOLD,
            debounce_duration_sec: DEFAULT_DEBOUNCE_DURATION_SEC,
            fps: DEFAULT_FPS,
        }
    }
}

impl SimulationParams {
    pub fn new(phone_threshold: f64, debounce_duration_sec: f64) -> Self {
        Self {
            phone_threshold,
            debounce_duration_sec,
            ..Self::default()
        }
    }

    pub fn with_phone_threshold(mut self, phone_threshold: f64) -> Self {
        self.phone_threshold = phone_threshold;
        self
    }

    pub fn with_debounce_duration(mut self, debounce_duration_sec: f64) -> Self {
        self.debounce_duration_sec = debounce_duration_sec;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Parse parameters from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply the keys present in a JSON object on top of `self`.
    ///
    /// Unlike [`SimulationParams::from_json`], missing fields keep the values
    /// of `self` rather than the defaults.
    pub fn overlay_json(&self, json: &str) -> Result<Self, SimulationError> {
        let overrides: Value = serde_json::from_str(json)?;
        let Value::Object(overrides) = overrides else {
            return Err(SimulationError::ParseError(
                "Parameters must be a JSON object".to_string(),
            ));
        };

        let mut merged = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut merged {
            fields.extend(overrides);
        }
        Ok(serde_json::from_value(merged)?)
    }

    /// Reject parameter sets that would make the simulation meaningless.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.phone_threshold.is_finite() || self.phone_threshold < 0.0 {
            return Err(SimulationError::InvalidThreshold(self.phone_threshold));
        }
        if !self.debounce_duration_sec.is_finite() || self.debounce_duration_sec <= 0.0 {
            return Err(SimulationError::InvalidDebounceDuration(
                self.debounce_duration_sec,
            ));
        }
        if self.fps == 0 {
            return Err(SimulationError::InvalidFps(self.fps));
        }
        Ok(())
    }

    /// Consecutive frames a candidate needs: `ceil(duration * fps)`.
    ///
    /// Only meaningful for validated parameters; always at least 1.
    pub fn min_run_length(&self) -> u32 {
        let frames = (self.debounce_duration_sec * f64::from(self.fps)).ceil();
        (frames as u32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = SimulationParams::default();
        assert_eq!(params.phone_threshold, 0.05);
        assert_eq!(params.fps, 24);
        assert!(params.validate().is_ok());
        // 0.55 * 24 = 13.2
        assert_eq!(params.min_run_length(), 14);
    }

    #[test]
    fn test_min_run_length() {
        assert_eq!(SimulationParams::new(0.05, 0.5).min_run_length(), 12);
        assert_eq!(SimulationParams::new(0.05, 0.1).min_run_length(), 3);
        assert_eq!(SimulationParams::new(0.05, 2.0).min_run_length(), 48);
        assert_eq!(
            SimulationParams::new(0.05, 1.0).with_fps(30).min_run_length(),
            30
        );
    }

    #[test]
    fn test_rejects_invalid_threshold() {
        for bad in [-0.01, f64::NAN, f64::INFINITY] {
            let params = SimulationParams::default().with_phone_threshold(bad);
            assert!(matches!(
                params.validate(),
                Err(SimulationError::InvalidThreshold(_))
            ));
        }
        assert!(SimulationParams::default()
            .with_phone_threshold(0.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rejects_invalid_debounce() {
        for bad in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            let params = SimulationParams::default().with_debounce_duration(bad);
            assert!(matches!(
                params.validate(),
                Err(SimulationError::InvalidDebounceDuration(_))
            ));
        }
    }

    #[test]
    fn test_rejects_zero_fps() {
        let params = SimulationParams::default().with_fps(0);
        assert!(matches!(params.validate(), Err(SimulationError::InvalidFps(0))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params = SimulationParams::from_json(r#"{"phone_threshold": 0.08}"#).unwrap();
        assert_eq!(params.phone_threshold, 0.08);
        assert_eq!(params.debounce_duration_sec, DEFAULT_DEBOUNCE_DURATION_SEC);
        assert_eq!(params.fps, DEFAULT_FPS);
    }

    #[test]
    fn test_overlay_keeps_base_for_missing_fields() {
        let base = SimulationParams::new(0.05, 0.3).with_fps(30);
        let tuned = base.overlay_json(r#"{"phone_threshold": 0.08}"#).unwrap();

        assert_eq!(tuned.phone_threshold, 0.08);
        assert_eq!(tuned.debounce_duration_sec, 0.3);
        assert_eq!(tuned.fps, 30);

        // Empty object is the base itself
        assert_eq!(base.overlay_json("{}").unwrap(), base);
    }

    #[test]
    fn test_overlay_rejects_non_object() {
        let base = SimulationParams::default();
        assert!(matches!(
            base.overlay_json("[0.05]"),
            Err(SimulationError::ParseError(_))
        ));
        assert!(matches!(
            base.overlay_json(r#"{"fps": "fast"}"#),
            Err(SimulationError::JsonError(_))
        ));
    }
}
