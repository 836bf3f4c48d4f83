//! Stairs Resim - Parameter re-simulation engine for staircase safety analysis
//!
//! Resim replays a precomputed vision-pipeline recording under new decision
//! thresholds without re-running inference: frame records → raw signal
//! derivation → debounce state machine → statistics → comparison.
//!
//! ## Modules
//!
//! - **Signals**: Re-apply a phone threshold to measured wrist-to-ear distances
//! - **Debounce**: Hysteresis over the (compliance, phone) state pair
//! - **Pipeline**: Fold a frame sequence into events and statistics
//! - **Compare**: Baseline vs tuned deltas

pub mod compare;
pub mod debounce;
pub mod encoder;
pub mod error;
pub mod events;
pub mod params;
pub mod pipeline;
pub mod signals;
pub mod source;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use compare::compare_stats;
pub use error::SimulationError;
pub use params::SimulationParams;
pub use pipeline::{compare_parameters, simulate, SimulationRun, Simulator};
pub use source::FrameSource;
pub use types::{
    CommittedEvent, ComparisonResult, ComplianceCategory, EventType, FrameRecord, PhoneCategory,
    SimulationStats, StableState,
};

/// Resim version embedded in all reports
pub const RESIM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "stairs-resim";
