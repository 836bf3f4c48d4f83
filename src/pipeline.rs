//! Simulation orchestration
//!
//! This module provides the public API of the engine. It validates the run
//! parameters and frame order, then folds the frame sequence through the
//! raw signal deriver and the debounce machine, tallying statistics and
//! collecting committed events on the way.

use crate::compare::compare_stats;
use crate::debounce::DebounceMachine;
use crate::error::SimulationError;
use crate::params::SimulationParams;
use crate::signals::SignalDeriver;
use crate::source::FrameSource;
use crate::types::{
    CommittedEvent, ComparisonResult, ComplianceCategory, FrameRecord, PhoneCategory,
    SimulatedFrame, SimulationStats, StateMachineBlock,
};
use log::{info, trace, warn};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Output of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRun {
    pub params: SimulationParams,
    pub frames: Vec<SimulatedFrame>,
    pub events: Vec<CommittedEvent>,
    pub stats: SimulationStats,
}

/// Re-simulate a frame sequence under `params`.
///
/// Pipeline stages, per frame in order:
/// 1. SignalDeriver - Apply the phone threshold and classify the frame
/// 2. DebounceMachine - Advance the stable/pending state
/// 3. Aggregation - Count raw categories and collect commits
///
/// An empty sequence yields zero-filled stats and no events.
pub fn simulate(
    frames: &[FrameRecord],
    params: &SimulationParams,
) -> Result<SimulationRun, SimulationError> {
    if let Err(e) = params.validate().and_then(|_| FrameSource::validate(frames)) {
        warn!("rejecting simulation run: {}", e);
        return Err(e);
    }

    let mut machine = DebounceMachine::from_params(params)?;
    let mut stats = SimulationStats::default();
    let mut events = Vec::new();
    let mut simulated = Vec::with_capacity(frames.len());

    for frame in frames {
        let derived = SignalDeriver::derive(frame, params.phone_threshold);
        let raw_state = derived.raw_state();
        let step = machine.step(raw_state);

        stats.total_frames += 1;
        match derived.raw_compliance {
            ComplianceCategory::Compliant => stats.compliant_frames += 1,
            ComplianceCategory::NonCompliant => stats.non_compliant_frames += 1,
            ComplianceCategory::Unknown => {}
        }
        if derived.raw_phone == PhoneCategory::Phone {
            stats.phone_frames += 1;
        }

        if let Some(transition) = step.transition {
            events.push(CommittedEvent {
                frame_number: frame.frame_number,
                timestamp_sec: frame.timestamp_sec,
                old_state: transition.old_state,
                new_state: transition.new_state,
                event_type: transition.event_type,
            });
        }

        let mut metrics = frame.metrics.clone();
        metrics.phone_count = derived.phone_count;

        let mut extra = frame.extra.clone();
        extra.remove("simulated_commit");

        simulated.push(SimulatedFrame {
            frame_number: frame.frame_number,
            timestamp_sec: frame.timestamp_sec,
            metrics,
            persons: derived.persons,
            state_machine: StateMachineBlock {
                raw_state,
                current_state: step.stable_state,
                pending_state: step.pending_state,
                time_in_pending: step.time_in_pending,
                debounce_threshold: params.debounce_duration_sec,
            },
            simulated_commit: step.transition.is_some(),
            extra,
        });
    }

    stats.total_commits = events.len() as u64;

    info!(
        "simulated {} frames (phone_threshold={}, debounce={}s, min_run={}): {} commits",
        stats.total_frames,
        params.phone_threshold,
        params.debounce_duration_sec,
        machine.min_run_length(),
        stats.total_commits
    );

    Ok(SimulationRun {
        params: *params,
        frames: simulated,
        events,
        stats,
    })
}

/// Run two parameter sets over the same frames and compare their statistics.
pub fn compare_parameters(
    frames: &[FrameRecord],
    baseline: &SimulationParams,
    tuned: &SimulationParams,
) -> Result<ComparisonResult, SimulationError> {
    let baseline_run = simulate(frames, baseline)?;
    let tuned_run = simulate(frames, tuned)?;
    compare_stats(&baseline_run.stats, &tuned_run.stats)
}

/// Cache key: exact bit patterns of the parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ParamKey {
    phone_threshold: u64,
    debounce_duration_sec: u64,
    fps: u32,
}

impl From<&SimulationParams> for ParamKey {
    fn from(params: &SimulationParams) -> Self {
        Self {
            phone_threshold: params.phone_threshold.to_bits(),
            debounce_duration_sec: params.debounce_duration_sec.to_bits(),
            fps: params.fps,
        }
    }
}

/// Simulator bound to one frame sequence, memoizing runs by parameters.
///
/// Use this when an operator sweeps parameters back and forth over the
/// same recording.
pub struct Simulator {
    frames: Vec<FrameRecord>,
    cache: HashMap<ParamKey, SimulationRun>,
}

impl Simulator {
    /// Create a simulator over a frame sequence
    pub fn new(frames: Vec<FrameRecord>) -> Self {
        Self {
            frames,
            cache: HashMap::new(),
        }
    }

    /// Parse a JSON array of frame records and bind a simulator to it
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        Ok(Self::new(FrameSource::parse_array(json)?))
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    /// Run (or fetch the memoized run for) `params`
    pub fn run(&mut self, params: &SimulationParams) -> Result<&SimulationRun, SimulationError> {
        match self.cache.entry(ParamKey::from(params)) {
            Entry::Occupied(entry) => {
                trace!("cache hit for {:?}", params);
                Ok(&*entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let run = simulate(&self.frames, params)?;
                Ok(&*entry.insert(run))
            }
        }
    }

    /// Compare two parameter sets over this simulator's frames
    pub fn compare(
        &mut self,
        baseline: &SimulationParams,
        tuned: &SimulationParams,
    ) -> Result<ComparisonResult, SimulationError> {
        let baseline_stats = self.run(baseline)?.stats;
        let tuned_stats = self.run(tuned)?.stats;
        compare_stats(&baseline_stats, &tuned_stats)
    }

    /// Number of memoized runs
    pub fn cached_runs(&self) -> usize {
        self.cache.len()
    }

    /// Drop all memoized runs
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
