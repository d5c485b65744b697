//! Conversions between the domain event types in `dirsvc-core` and the wire
//! types generated from `proto/directory/v1/events.proto`.

use dirsvc_core::event::{Event, EventKind};

use crate::directory::v1 as proto;

impl From<EventKind> for proto::EventType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Unspecified => proto::EventType::EventTypeUnspecified,
            EventKind::RecordPushed => proto::EventType::RecordPushed,
            EventKind::RecordPulled => proto::EventType::RecordPulled,
            EventKind::RecordDeleted => proto::EventType::RecordDeleted,
            EventKind::RecordPublished => proto::EventType::RecordPublished,
            EventKind::RecordUnpublished => proto::EventType::RecordUnpublished,
            EventKind::RecordSigned => proto::EventType::RecordSigned,
            EventKind::SyncCreated => proto::EventType::SyncCreated,
            EventKind::SyncCompleted => proto::EventType::SyncCompleted,
            EventKind::SyncFailed => proto::EventType::SyncFailed,
        }
    }
}

impl From<proto::EventType> for EventKind {
    fn from(kind: proto::EventType) -> Self {
        match kind {
            proto::EventType::EventTypeUnspecified => EventKind::Unspecified,
            proto::EventType::RecordPushed => EventKind::RecordPushed,
            proto::EventType::RecordPulled => EventKind::RecordPulled,
            proto::EventType::RecordDeleted => EventKind::RecordDeleted,
            proto::EventType::RecordPublished => EventKind::RecordPublished,
            proto::EventType::RecordUnpublished => EventKind::RecordUnpublished,
            proto::EventType::RecordSigned => EventKind::RecordSigned,
            proto::EventType::SyncCreated => EventKind::SyncCreated,
            proto::EventType::SyncCompleted => EventKind::SyncCompleted,
            proto::EventType::SyncFailed => EventKind::SyncFailed,
        }
    }
}

impl From<&Event> for proto::Event {
    fn from(event: &Event) -> Self {
        proto::Event {
            id: event.id.clone(),
            r#type: proto::EventType::from(event.kind) as i32,
            timestamp: Some(nanos_to_timestamp(event.timestamp_nanos)),
            resource_id: event.resource_id.clone(),
            labels: event.labels.clone(),
            metadata: event.metadata.clone(),
        }
    }
}

impl From<Event> for proto::Event {
    fn from(event: Event) -> Self {
        proto::Event::from(&event)
    }
}

/// Converts a wire `Event` back into the domain type. The only fallible
/// part is the enum tag, which `prost` already clamps to a valid variant on
/// decode, so this conversion cannot fail.
impl From<proto::Event> for Event {
    fn from(event: proto::Event) -> Self {
        let kind = proto::EventType::try_from(event.r#type).unwrap_or(proto::EventType::EventTypeUnspecified);
        Event {
            id: event.id,
            kind: EventKind::from(kind),
            timestamp_nanos: event.timestamp.map(timestamp_to_nanos).unwrap_or(0),
            resource_id: event.resource_id,
            labels: event.labels,
            metadata: event.metadata,
        }
    }
}

fn nanos_to_timestamp(nanos: u64) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: (nanos / 1_000_000_000) as i64,
        nanos: (nanos % 1_000_000_000) as i32,
    }
}

fn timestamp_to_nanos(ts: prost_types::Timestamp) -> u64 {
    let seconds = ts.seconds.max(0) as u64;
    let nanos = ts.nanos.max(0) as u64;
    seconds.saturating_mul(1_000_000_000).saturating_add(nanos)
}
