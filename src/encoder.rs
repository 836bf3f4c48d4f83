//! Report encoding
//!
//! Wraps simulation runs and comparisons into exportable JSON reports with
//! producer metadata. Stats and events inside a report are exactly those of
//! the run; only the envelope (run id, computation time) differs between
//! encodings.

use crate::error::SimulationError;
use crate::events::{EventLog, EventSummary};
use crate::params::SimulationParams;
use crate::pipeline::SimulationRun;
use crate::types::{CommittedEvent, ComparisonResult, SimulatedFrame, SimulationStats};
use crate::{PRODUCER_NAME, RESIM_VERSION};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Report format version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Exported simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub run_id: String,
    pub computed_at_utc: String,
    pub params: SimulationParams,
    pub min_run_length: u32,
    pub stats: SimulationStats,
    pub event_summary: EventSummary,
    pub events: Vec<CommittedEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<SimulatedFrame>>,
}

/// Exported comparison between two parameter sets
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub baseline_params: SimulationParams,
    pub tuned_params: SimulationParams,
    #[serde(flatten)]
    pub result: ComparisonResult,
}

/// Encoder for simulation reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    fn producer(&self) -> ReportProducer {
        ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: RESIM_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    /// Wrap a run into a report, optionally carrying the simulated frames
    pub fn encode_run(&self, run: &SimulationRun, include_frames: bool) -> SimulationReport {
        SimulationReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer(),
            run_id: Uuid::new_v4().to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            params: run.params,
            min_run_length: run.params.min_run_length(),
            stats: run.stats,
            event_summary: EventLog::new(&run.events).summary(),
            events: run.events.clone(),
            frames: include_frames.then(|| run.frames.clone()),
        }
    }

    /// Wrap a comparison into a report
    pub fn encode_comparison(
        &self,
        baseline_params: &SimulationParams,
        tuned_params: &SimulationParams,
        result: &ComparisonResult,
    ) -> ComparisonReport {
        ComparisonReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            baseline_params: *baseline_params,
            tuned_params: *tuned_params,
            result: result.clone(),
        }
    }

    /// Encode a run report to pretty JSON
    pub fn encode_run_to_json(
        &self,
        run: &SimulationRun,
        include_frames: bool,
    ) -> Result<String, SimulationError> {
        let report = self.encode_run(run, include_frames);
        serde_json::to_string_pretty(&report).map_err(SimulationError::JsonError)
    }
}
