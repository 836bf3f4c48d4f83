//! Debounce state machine
//!
//! Turns the flickering per-frame raw states into a stable state with
//! hysteresis. A candidate state must be observed on `min_run_length`
//! consecutive frames before it replaces the stable state; each such
//! replacement is reported as a [`Transition`].
//!
//! The machine is a plain accumulator: it owns no references and touches no
//! shared state, so independent runs can proceed side by side.

use crate::error::SimulationError;
use crate::params::SimulationParams;
use crate::types::{ComplianceCategory, EventType, StableState};
use log::debug;

/// A committed change of the stable state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub old_state: StableState,
    pub new_state: StableState,
    pub event_type: EventType,
}

/// Machine state after consuming one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebounceStep {
    pub stable_state: StableState,
    pub pending_state: Option<StableState>,
    pub pending_run_length: u32,
    /// Pending run length in seconds at the assumed frame rate
    pub time_in_pending: f64,
    pub transition: Option<Transition>,
}

/// Sequential debounce reducer over raw frame states
#[derive(Debug, Clone)]
pub struct DebounceMachine {
    min_run_length: u32,
    fps: u32,
    stable_state: StableState,
    pending_state: Option<StableState>,
    pending_run_length: u32,
}

impl DebounceMachine {
    /// Create a machine requiring `min_run_length` consecutive frames per commit.
    ///
    /// Zero for either argument is raised to 1. Public callers go through
    /// [`DebounceMachine::from_params`], whose parameters are validated first.
    pub(crate) fn new(min_run_length: u32, fps: u32) -> Self {
        Self {
            min_run_length: min_run_length.max(1),
            fps: fps.max(1),
            stable_state: StableState::INITIAL,
            pending_state: None,
            pending_run_length: 0,
        }
    }

    /// Create a machine from parameters, rejecting any that fail validation
    pub fn from_params(params: &SimulationParams) -> Result<Self, SimulationError> {
        params.validate()?;
        Ok(Self::new(params.min_run_length(), params.fps))
    }

    pub fn min_run_length(&self) -> u32 {
        self.min_run_length
    }

    pub fn stable_state(&self) -> StableState {
        self.stable_state
    }

    pub fn pending_state(&self) -> Option<StableState> {
        self.pending_state
    }

    /// Consume the raw state of the next frame in timestamp order.
    pub fn step(&mut self, raw: StableState) -> DebounceStep {
        let transition = if self.stable_state.is_initial() {
            // Cold start: the first observation with people in it is adopted
            // as-is, without debounce and without an event.
            if raw.compliance != ComplianceCategory::Unknown {
                self.stable_state = raw;
            }
            None
        } else if raw == self.stable_state || raw.compliance == ComplianceCategory::Unknown {
            // Back to the stable state, or an empty frame that cannot be a
            // candidate: either way the consecutive run is broken.
            self.clear_pending();
            None
        } else {
            if self.pending_state == Some(raw) {
                self.pending_run_length += 1;
            } else {
                self.pending_state = Some(raw);
                self.pending_run_length = 1;
            }

            if self.pending_run_length >= self.min_run_length {
                Some(self.commit(raw))
            } else {
                None
            }
        };

        DebounceStep {
            stable_state: self.stable_state,
            pending_state: self.pending_state,
            pending_run_length: self.pending_run_length,
            time_in_pending: self.time_in_pending(),
            transition,
        }
    }

    /// Current pending run length converted to seconds
    pub fn time_in_pending(&self) -> f64 {
        f64::from(self.pending_run_length) / f64::from(self.fps)
    }

    fn commit(&mut self, new_state: StableState) -> Transition {
        let old_state = self.stable_state;
        let event_type = EventType::for_transition(old_state, new_state);
        debug!(
            "committing {} after {} frames: {:?} -> {:?}",
            event_type, self.pending_run_length, old_state, new_state
        );

        self.stable_state = new_state;
        self.clear_pending();

        Transition {
            old_state,
            new_state,
            event_type,
        }
    }

    fn clear_pending(&mut self) {
        self.pending_state = None;
        self.pending_run_length = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PhoneCategory;

    const NON_COMPLIANT: StableState = StableState {
        compliance: ComplianceCategory::NonCompliant,
        phone: PhoneCategory::NoPhone,
    };
    const COMPLIANT: StableState = StableState {
        compliance: ComplianceCategory::Compliant,
        phone: PhoneCategory::NoPhone,
    };
    const ON_PHONE: StableState = StableState {
        compliance: ComplianceCategory::NonCompliant,
        phone: PhoneCategory::Phone,
    };
    const EMPTY: StableState = StableState {
        compliance: ComplianceCategory::Unknown,
        phone: PhoneCategory::NoPhone,
    };

    fn feed(machine: &mut DebounceMachine, state: StableState, frames: usize) -> Vec<DebounceStep> {
        (0..frames).map(|_| machine.step(state)).collect()
    }

    #[test]
    fn test_cold_start_adopts_first_observation() {
        let mut machine = DebounceMachine::new(12, 24);

        let step = machine.step(NON_COMPLIANT);
        assert_eq!(step.stable_state, NON_COMPLIANT);
        assert_eq!(step.pending_state, None);
        assert!(step.transition.is_none());
    }

    #[test]
    fn test_cold_start_waits_for_people() {
        let mut machine = DebounceMachine::new(12, 24);

        let steps = feed(&mut machine, EMPTY, 5);
        assert!(steps.iter().all(|s| s.stable_state.is_initial()));
        assert!(steps.iter().all(|s| s.pending_state.is_none()));

        let step = machine.step(COMPLIANT);
        assert_eq!(step.stable_state, COMPLIANT);
        assert!(step.transition.is_none());
    }

    #[test]
    fn test_transient_is_suppressed() {
        let mut machine = DebounceMachine::new(12, 24);
        feed(&mut machine, NON_COMPLIANT, 12);

        let flicker = feed(&mut machine, COMPLIANT, 11);
        assert!(flicker.iter().all(|s| s.transition.is_none()));
        assert_eq!(flicker[10].pending_run_length, 11);
        assert_eq!(flicker[10].stable_state, NON_COMPLIANT);

        let back = machine.step(NON_COMPLIANT);
        assert_eq!(back.pending_state, None);
        assert_eq!(back.pending_run_length, 0);
        assert_eq!(back.stable_state, NON_COMPLIANT);
    }

    #[test]
    fn test_persistent_change_commits_once() {
        let mut machine = DebounceMachine::new(12, 24);
        machine.step(NON_COMPLIANT);

        let steps = feed(&mut machine, COMPLIANT, 20);
        let commits: Vec<_> = steps
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.transition.map(|t| (i, t)))
            .collect();

        assert_eq!(commits.len(), 1);
        let (index, transition) = commits[0];
        assert_eq!(index, 11);
        assert_eq!(transition.old_state, NON_COMPLIANT);
        assert_eq!(transition.new_state, COMPLIANT);
        assert_eq!(transition.event_type, EventType::CompliantStart);
        assert_eq!(steps[11].pending_state, None);
        assert_eq!(steps[19].stable_state, COMPLIANT);
    }

    #[test]
    fn test_losing_rail_contact_commits_non_compliant_start() {
        let mut machine = DebounceMachine::new(3, 24);
        machine.step(COMPLIANT);

        let steps = feed(&mut machine, NON_COMPLIANT, 3);
        assert!(steps[..2].iter().all(|s| s.transition.is_none()));

        let transition = steps[2].transition.unwrap();
        assert_eq!(transition.old_state, COMPLIANT);
        assert_eq!(transition.new_state, NON_COMPLIANT);
        assert_eq!(transition.event_type, EventType::NonCompliantStart);
        assert_eq!(machine.stable_state(), NON_COMPLIANT);
    }

    #[test]
    fn test_from_params_rejects_invalid_params() {
        let params = SimulationParams::new(0.05, 0.0);
        assert!(matches!(
            DebounceMachine::from_params(&params),
            Err(SimulationError::InvalidDebounceDuration(_))
        ));

        let machine = DebounceMachine::from_params(&SimulationParams::new(0.05, 0.5)).unwrap();
        assert_eq!(machine.min_run_length(), 12);
    }

    #[test]
    fn test_new_candidate_restarts_run() {
        let mut machine = DebounceMachine::new(4, 24);
        machine.step(NON_COMPLIANT);

        feed(&mut machine, COMPLIANT, 3);
        let step = machine.step(ON_PHONE);
        assert_eq!(step.pending_state, Some(ON_PHONE));
        assert_eq!(step.pending_run_length, 1);

        let steps = feed(&mut machine, ON_PHONE, 3);
        let transition = steps[2].transition.unwrap();
        assert_eq!(transition.event_type, EventType::PhoneDetected);
    }

    #[test]
    fn test_empty_frame_breaks_pending_run() {
        let mut machine = DebounceMachine::new(4, 24);
        machine.step(NON_COMPLIANT);

        feed(&mut machine, COMPLIANT, 3);
        let step = machine.step(EMPTY);
        assert_eq!(step.pending_state, None);
        assert_eq!(step.stable_state, NON_COMPLIANT);

        let steps = feed(&mut machine, EMPTY, 10);
        assert!(steps.iter().all(|s| s.transition.is_none()));
        assert_eq!(machine.stable_state(), NON_COMPLIANT);
    }

    #[test]
    fn test_single_frame_run_commits_immediately() {
        let mut machine = DebounceMachine::new(1, 24);
        machine.step(NON_COMPLIANT);

        let step = machine.step(COMPLIANT);
        assert!(step.transition.is_some());
        assert_eq!(step.stable_state, COMPLIANT);
    }

    #[test]
    fn test_time_in_pending() {
        let mut machine = DebounceMachine::new(24, 24);
        machine.step(NON_COMPLIANT);

        let steps = feed(&mut machine, COMPLIANT, 6);
        assert!((steps[5].time_in_pending - 0.25).abs() < 1e-9);
    }
}
