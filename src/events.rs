//! Committed event queries
//!
//! Filtering, paging and summarizing the event list of a run, the way the
//! live event feed exposes it to dashboards.

use crate::types::{CommittedEvent, EventType};
use serde::Serialize;
use std::collections::BTreeMap;

/// Page size used when none is given
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// One page of events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPage {
    pub events: Vec<CommittedEvent>,
    /// Number of events matching the filter, before paging
    pub total: usize,
}

/// Aggregate view over an event list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub total_events: usize,
    /// Count per event label, in label order
    pub event_types: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_event_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_time: Option<f64>,
}

/// Read-only view over a chronological event list
pub struct EventLog<'a> {
    events: &'a [CommittedEvent],
}

impl<'a> EventLog<'a> {
    pub fn new(events: &'a [CommittedEvent]) -> Self {
        Self { events }
    }

    /// Events of one type, in order
    pub fn filter(&self, event_type: EventType) -> impl Iterator<Item = &'a CommittedEvent> + '_ {
        self.events
            .iter()
            .filter(move |event| event.event_type == event_type)
    }

    /// Skip `offset` events of the (optionally filtered) list and take `limit`
    pub fn page(&self, offset: usize, limit: usize, event_type: Option<EventType>) -> EventPage {
        let matching: Vec<&CommittedEvent> = self
            .events
            .iter()
            .filter(|event| event_type.map_or(true, |t| event.event_type == t))
            .collect();

        EventPage {
            total: matching.len(),
            events: matching
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        }
    }

    pub fn summary(&self) -> EventSummary {
        let mut event_types = BTreeMap::new();
        for event in self.events {
            *event_types
                .entry(event.event_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        EventSummary {
            total_events: self.events.len(),
            event_types,
            first_event_time: self.events.first().map(|e| e.timestamp_sec),
            last_event_time: self.events.last().map(|e| e.timestamp_sec),
        }
    }
}
