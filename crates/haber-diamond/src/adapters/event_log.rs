//! # Event Log Adapters
//!
//! Sinks for committed notifications.
//!
//! - `InMemoryEventLog`: keeps every record, for tests and inspection
//! - `TracingEventSink`: writes each record to the log

use crate::events::{topics, EventRecord};
use crate::ports::outbound::EventSink;
use parking_lot::RwLock;
use tracing::info;

/// Append-only in-memory event log.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    records: RwLock<Vec<EventRecord>>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records published so far.
    #[must_use]
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.read().clone()
    }

    /// Number of published records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl EventSink for InMemoryEventLog {
    fn publish(&self, record: EventRecord) {
        self.records.write().push(record);
    }
}

/// Sink that logs every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, record: EventRecord) {
        info!(
            topic = topics::for_event(&record.event),
            sequence = record.sequence,
            call_id = %record.call_id,
            event = ?record.event,
            "{}",
            record.event.name()
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================
