//! Subscription filter predicates.
//!
//! A filter is a pure, total function from an event to a boolean. Built as a
//! small closed algebra rather than boxed closures so `And`/`Or`/`Not`
//! combinators can be expressed and inspected directly.

use dirsvc_core::event::{Event, EventKind};

/// A predicate over events.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// True iff the event's kind equals any of the given kinds.
    EventType(Vec<EventKind>),
    /// True iff the event's `resource_id` exactly equals any of the given ids.
    Cid(Vec<String>),
    /// True iff any event label contains any of the given fragments as a
    /// substring. Substring, not prefix, matching is contractual.
    Label(Vec<String>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Evaluate the predicate against an event. Total: never panics, handles
    /// empty labels/metadata trivially.
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Filter::EventType(kinds) => kinds.contains(&event.kind),
            Filter::Cid(cids) => cids.iter().any(|c| c == &event.resource_id),
            Filter::Label(fragments) => fragments
                .iter()
                .any(|frag| event.labels.iter().any(|label| label.contains(frag.as_str()))),
            Filter::And(filters) => filters.iter().all(|f| f.matches(event)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(event)),
            Filter::Not(inner) => !inner.matches(event),
        }
    }

    /// Build a subscription filter from the dimensions of a `Listen`
    /// request. An omitted dimension imposes no constraint; an empty list
    /// of dimensions (no types, no cids, no labels) matches everything.
    pub fn from_request(
        event_types: Vec<EventKind>,
        cid_filters: Vec<String>,
        label_filters: Vec<String>,
    ) -> Filter {
        let mut parts = Vec::new();
        if !event_types.is_empty() {
            parts.push(Filter::EventType(event_types));
        }
        if !cid_filters.is_empty() {
            parts.push(Filter::Cid(cid_filters));
        }
        if !label_filters.is_empty() {
            parts.push(Filter::Label(label_filters));
        }
        Filter::And(parts)
    }
}
