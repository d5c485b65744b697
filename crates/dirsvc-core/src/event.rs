//! Event value type for the directory service's event distribution core.
//!
//! Mirrors the shape of the original Go `internal/events` event model —
//! kind, timestamp, resource id, labels, metadata — generalized from the
//! single-purpose enums a daemon's append-only log would use into the
//! fixed set of record/sync lifecycle events this bus distributes.

use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::error::DirectoryError;

/// Classification of events the bus can carry.
///
/// `Unspecified` exists solely so zero-initialized/default values can be
/// detected and rejected by [`Event::validate`]; it is never a value a
/// producer should construct deliberately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Unspecified,
    RecordPushed,
    RecordPulled,
    RecordDeleted,
    RecordPublished,
    RecordUnpublished,
    RecordSigned,
    SyncCreated,
    SyncCompleted,
    SyncFailed,
}

impl EventKind {
    pub fn is_specified(self) -> bool {
        !matches!(self, Self::Unspecified)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unspecified => "unspecified",
            Self::RecordPushed => "record.pushed",
            Self::RecordPulled => "record.pulled",
            Self::RecordDeleted => "record.deleted",
            Self::RecordPublished => "record.published",
            Self::RecordUnpublished => "record.unpublished",
            Self::RecordSigned => "record.signed",
            Self::SyncCreated => "sync.created",
            Self::SyncCompleted => "sync.completed",
            Self::SyncFailed => "sync.failed",
        };
        f.write_str(s)
    }
}

/// An immutable description of a past occurrence in the system.
///
/// Once handed to [`crate::event::EventBuilder::build`] (and, in the daemon
/// crate, to the bus's `publish`), the value is never mutated in place —
/// producers that reuse a source struct get their own copy back.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub kind: EventKind,
    /// Unix epoch nanoseconds. Zero means "unset" for validation purposes.
    pub timestamp_nanos: u64,
    pub resource_id: String,
    pub labels: Vec<String>,
    pub metadata: HashMap<String, String>,
}

impl Event {
    /// A valid event has a non-empty id, a non-empty resource id, a
    /// specified kind, and a non-zero timestamp.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.id.is_empty() {
            return Err(DirectoryError::Validation("event id is empty".into()));
        }
        if self.resource_id.is_empty() {
            return Err(DirectoryError::Validation(
                "event resource_id is empty".into(),
            ));
        }
        if !self.kind.is_specified() {
            return Err(DirectoryError::Validation(
                "event type is unspecified".into(),
            ));
        }
        if self.timestamp_nanos == 0 {
            return Err(DirectoryError::Validation("event timestamp is zero".into()));
        }
        Ok(())
    }
}

/// Fluent builder for [`Event`], independent of any bus.
///
/// Tests and producers can assemble an event value without ever touching a
/// bus; publication is a separate, explicit step.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    kind: EventKind,
    resource_id: String,
    labels: Vec<String>,
    metadata: HashMap<String, String>,
}

impl EventBuilder {
    pub fn new(kind: EventKind, resource_id: impl Into<String>) -> Self {
        Self {
            kind,
            resource_id: resource_id.into(),
            labels: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    #[must_use = "builder methods return a new EventBuilder and do not modify self"]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    #[must_use = "builder methods return a new EventBuilder and do not modify self"]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Event {
        Event {
            id: Uuid::new_v4().to_string(),
            kind: self.kind,
            timestamp_nanos: now_nanos(),
            resource_id: self.resource_id,
            labels: self.labels,
            metadata: self.metadata,
        }
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_display() {
        assert_eq!(EventKind::RecordPushed.to_string(), "record.pushed");
        assert_eq!(EventKind::SyncFailed.to_string(), "sync.failed");
        assert_eq!(EventKind::Unspecified.to_string(), "unspecified");
    }

    #[test]
    fn builder_produces_valid_event() {
        let event = EventBuilder::new(EventKind::RecordPushed, "cid-1")
            .with_labels(["/skills/AI/ML"])
            .with_metadata("record_count", "3")
            .build();

        assert!(!event.id.is_empty());
        assert_eq!(event.resource_id, "cid-1");
        assert_eq!(event.labels, vec!["/skills/AI/ML".to_string()]);
        assert_eq!(event.metadata.get("record_count"), Some(&"3".to_string()));
        assert!(event.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unspecified_kind() {
        let event = EventBuilder::new(EventKind::Unspecified, "cid-1").build();
        assert!(matches!(
            event.validate(),
            Err(DirectoryError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_resource_id() {
        let event = EventBuilder::new(EventKind::RecordPushed, "").build();
        assert!(matches!(
            event.validate(),
            Err(DirectoryError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_timestamp() {
        let mut event = EventBuilder::new(EventKind::RecordPushed, "cid-1").build();
        event.timestamp_nanos = 0;
        assert!(matches!(
            event.validate(),
            Err(DirectoryError::Validation(_))
        ));
    }

    #[test]
    fn two_builds_yield_distinct_ids() {
        let a = EventBuilder::new(EventKind::RecordPushed, "cid-1").build();
        let b = EventBuilder::new(EventKind::RecordPushed, "cid-1").build();
        assert_ne!(a.id, b.id);
    }
}
