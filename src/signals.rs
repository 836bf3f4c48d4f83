//! Raw signal derivation
//!
//! Re-applies a phone threshold to the distances already measured upstream
//! and classifies a single frame:
//! - Per-person phone flag (`min_distance < threshold`, strict)
//! - Frame phone count
//! - Raw compliance and raw phone categories (any-hit semantics)

use crate::types::{ComplianceCategory, FrameRecord, PersonRecord, PhoneCategory, StableState};

/// Instantaneous classification of one frame under one threshold
#[derive(Debug, Clone)]
pub struct DerivedFrame {
    /// Persons with `phone_heuristic` rewritten for the new threshold
    pub persons: Vec<PersonRecord>,
    pub phone_count: u32,
    pub raw_compliance: ComplianceCategory,
    pub raw_phone: PhoneCategory,
}

impl DerivedFrame {
    pub fn raw_state(&self) -> StableState {
        StableState::new(self.raw_compliance, self.raw_phone)
    }
}

/// Deriver for per-frame raw signals
pub struct SignalDeriver;

impl SignalDeriver {
    /// Derive raw signals for a frame. Never mutates the input record.
    pub fn derive(frame: &FrameRecord, phone_threshold: f64) -> DerivedFrame {
        let persons: Vec<PersonRecord> = frame
            .persons
            .iter()
            .map(|person| apply_phone_threshold(person, phone_threshold))
            .collect();

        let phone_count = persons.iter().filter(|p| p.phone_flag()).count() as u32;
        let raw_compliance = classify_compliance(&persons);
        let raw_phone = if phone_count > 0 {
            PhoneCategory::Phone
        } else {
            PhoneCategory::NoPhone
        };

        DerivedFrame {
            persons,
            phone_count,
            raw_compliance,
            raw_phone,
        }
    }
}

/// Whether a measured distance counts as phone use under `threshold`
pub fn is_phone_distance(distance: Option<f64>, threshold: f64) -> bool {
    matches!(distance, Some(d) if d < threshold)
}

fn apply_phone_threshold(person: &PersonRecord, threshold: f64) -> PersonRecord {
    let mut updated = person.clone();
    updated.phone_heuristic.threshold = threshold;
    updated.phone_heuristic.is_phone_talking = is_phone_distance(person.phone_distance(), threshold);
    updated
}

/// One person touching the rail makes the whole frame compliant
fn classify_compliance(persons: &[PersonRecord]) -> ComplianceCategory {
    if persons.is_empty() {
        ComplianceCategory::Unknown
    } else if persons.iter().any(PersonRecord::rail_contact) {
        ComplianceCategory::Compliant
    } else {
        ComplianceCategory::NonCompliant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameMetrics, PhoneHeuristic, RailHitTest};
    use serde_json::Map;

    fn person(id: u32, rail: bool, distance: Option<f64>) -> PersonRecord {
        PersonRecord {
            person_id: id,
            rail_hit_test: RailHitTest {
                any_hit: rail,
                extra: Map::new(),
            },
            phone_heuristic: PhoneHeuristic {
                min_distance: distance,
                threshold: 0.05,
                is_phone_talking: false,
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    fn frame(persons: Vec<PersonRecord>) -> FrameRecord {
        FrameRecord {
            frame_number: 0,
            timestamp_sec: 0.0,
            metrics: FrameMetrics::default(),
            persons,
            prior_state: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_empty_frame_is_unknown() {
        let derived = SignalDeriver::derive(&frame(vec![]), 0.05);
        assert_eq!(derived.raw_compliance, ComplianceCategory::Unknown);
        assert_eq!(derived.raw_phone, PhoneCategory::NoPhone);
        assert_eq!(derived.phone_count, 0);
    }

    #[test]
    fn test_any_hit_overrides_non_compliant_persons() {
        let input = frame(vec![
            person(0, false, None),
            person(1, false, None),
            person(2, true, None),
        ]);
        let derived = SignalDeriver::derive(&input, 0.05);
        assert_eq!(derived.raw_compliance, ComplianceCategory::Compliant);

        let input = frame(vec![person(0, false, None), person(1, false, None)]);
        let derived = SignalDeriver::derive(&input, 0.05);
        assert_eq!(derived.raw_compliance, ComplianceCategory::NonCompliant);
    }

    #[test]
    fn test_threshold_is_strict() {
        let input = frame(vec![person(0, true, Some(0.05)), person(1, true, Some(0.049))]);
        let derived = SignalDeriver::derive(&input, 0.05);

        assert!(!derived.persons[0].phone_flag());
        assert!(derived.persons[1].phone_flag());
        assert_eq!(derived.phone_count, 1);
        assert_eq!(derived.raw_phone, PhoneCategory::Phone);
    }

    #[test]
    fn test_rewrites_threshold_without_touching_input() {
        let input = frame(vec![person(0, false, Some(0.08))]);

        let derived = SignalDeriver::derive(&input, 0.1);
        assert!(derived.persons[0].phone_flag());
        assert_eq!(derived.persons[0].phone_heuristic.threshold, 0.1);

        assert!(!input.persons[0].phone_flag());
        assert_eq!(input.persons[0].phone_heuristic.threshold, 0.05);

        let derived = SignalDeriver::derive(&input, 0.05);
        assert!(!derived.persons[0].phone_flag());
        assert_eq!(derived.raw_state(), StableState::new(ComplianceCategory::NonCompliant, PhoneCategory::NoPhone));
    }

    #[test]
    fn test_missing_distance_never_flagged() {
        assert!(!is_phone_distance(None, 1.0));
        assert!(is_phone_distance(Some(0.0), 0.01));
        assert!(!is_phone_distance(Some(0.0), 0.0));
    }
}
