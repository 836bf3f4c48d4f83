//! Core data types for the re-simulation engine
//!
//! This module defines the frame records delivered by the upstream vision
//! pipeline, the categories tracked by the debounce machine, and the
//! outputs (events, statistics, comparisons) of a simulation run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Compliance axis of a frame classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCategory {
    #[default]
    Unknown,
    Compliant,
    NonCompliant,
}

/// Phone-use axis of a frame classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneCategory {
    #[default]
    Unknown,
    Phone,
    NoPhone,
}

/// The (compliance, phone) pair tracked by the debounce machine.
///
/// Serializes as a two-element array, e.g. `["compliant", "no_phone"]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    from = "(ComplianceCategory, PhoneCategory)",
    into = "(ComplianceCategory, PhoneCategory)"
)]
pub struct StableState {
    pub compliance: ComplianceCategory,
    pub phone: PhoneCategory,
}

impl StableState {
    /// State before any valid observation: `(Unknown, Unknown)`
    pub const INITIAL: StableState = StableState {
        compliance: ComplianceCategory::Unknown,
        phone: PhoneCategory::Unknown,
    };

    pub fn new(compliance: ComplianceCategory, phone: PhoneCategory) -> Self {
        Self { compliance, phone }
    }

    pub fn is_initial(&self) -> bool {
        *self == Self::INITIAL
    }
}

impl From<(ComplianceCategory, PhoneCategory)> for StableState {
    fn from((compliance, phone): (ComplianceCategory, PhoneCategory)) -> Self {
        Self { compliance, phone }
    }
}

impl From<StableState> for (ComplianceCategory, PhoneCategory) {
    fn from(state: StableState) -> Self {
        (state.compliance, state.phone)
    }
}

/// Aggregate per-frame counts as delivered upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameMetrics {
    pub total_persons: u32,
    pub compliant_count: u32,
    pub non_compliant_count: u32,
    /// Recomputed on every re-simulation
    pub phone_count: u32,
    /// Frame-level flags and counts beyond the four above, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rail polygon hit-test result for one person
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RailHitTest {
    /// True if any hand landmark fell inside any rail polygon
    #[serde(default)]
    pub any_hit: bool,
    /// Per-rail flags and hit points, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Phone heuristic measurement for one person
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneHeuristic {
    /// Minimum observed wrist-to-ear distance (normalized coordinates).
    /// Null when no wrist/ear pair was visible.
    #[serde(default)]
    pub min_distance: Option<f64>,
    /// Threshold the flag below was computed with
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub is_phone_talking: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One person observation within a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    /// Unique within a frame only; no identity is tracked across frames
    pub person_id: u32,
    #[serde(default)]
    pub rail_hit_test: RailHitTest,
    #[serde(default)]
    pub phone_heuristic: PhoneHeuristic,
    /// Boxes, pose landmarks and anything else the vision pipeline attached
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersonRecord {
    pub fn rail_contact(&self) -> bool {
        self.rail_hit_test.any_hit
    }

    pub fn phone_distance(&self) -> Option<f64> {
        self.phone_heuristic.min_distance
    }

    pub fn phone_flag(&self) -> bool {
        self.phone_heuristic.is_phone_talking
    }
}

/// One time-stamped analysis snapshot from the vision pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_number: u64,
    /// Seconds from sequence start
    pub timestamp_sec: f64,
    #[serde(default)]
    pub metrics: FrameMetrics,
    #[serde(default)]
    pub persons: Vec<PersonRecord>,
    /// State machine snapshot written by the pipeline run that produced this
    /// record. Never read by the simulation; replaced in the output.
    #[serde(rename = "state_machine", default, skip_serializing)]
    pub prior_state: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Debounce machine observability block attached to every simulated frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMachineBlock {
    /// Instantaneous classification of this frame
    pub raw_state: StableState,
    /// Debounced state after processing this frame
    pub current_state: StableState,
    pub pending_state: Option<StableState>,
    /// Pending run length converted to seconds
    pub time_in_pending: f64,
    /// Debounce duration the run was simulated with (seconds)
    pub debounce_threshold: f64,
}

/// A frame record re-derived under a specific parameter set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedFrame {
    pub frame_number: u64,
    pub timestamp_sec: f64,
    pub metrics: FrameMetrics,
    pub persons: Vec<PersonRecord>,
    pub state_machine: StateMachineBlock,
    /// True on the frame where a transition was committed
    pub simulated_commit: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Label of a committed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CompliantStart,
    NonCompliantStart,
    PhoneDetected,
    PhoneEnded,
}

impl EventType {
    /// Label a transition. A compliance change takes priority over a phone
    /// change when both axes moved.
    pub fn for_transition(old: StableState, new: StableState) -> Self {
        if old.compliance != new.compliance {
            match new.compliance {
                ComplianceCategory::Compliant => EventType::CompliantStart,
                ComplianceCategory::NonCompliant | ComplianceCategory::Unknown => {
                    EventType::NonCompliantStart
                }
            }
        } else {
            match new.phone {
                PhoneCategory::Phone => EventType::PhoneDetected,
                PhoneCategory::NoPhone | PhoneCategory::Unknown => EventType::PhoneEnded,
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CompliantStart => "compliant_start",
            EventType::NonCompliantStart => "non_compliant_start",
            EventType::PhoneDetected => "phone_detected",
            EventType::PhoneEnded => "phone_ended",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A debounced state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedEvent {
    pub frame_number: u64,
    pub timestamp_sec: f64,
    pub old_state: StableState,
    pub new_state: StableState,
    pub event_type: EventType,
}

/// Frame-level counters for one run.
///
/// Frame counters measure raw signal prevalence; only `total_commits`
/// depends on debouncing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub total_frames: u64,
    pub compliant_frames: u64,
    pub non_compliant_frames: u64,
    pub phone_frames: u64,
    pub total_commits: u64,
}

/// Signed differences `tuned - baseline`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonDelta {
    pub phone_frames_change: i64,
    pub events_change: i64,
}

/// Baseline vs tuned statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub baseline: SimulationStats,
    pub tuned: SimulationStats,
    pub delta: ComparisonDelta,
}
