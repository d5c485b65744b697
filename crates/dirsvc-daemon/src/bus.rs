//! The event bus: asynchronous fan-out, filter evaluation, backpressure, and
//! subscription lifecycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use dirsvc_core::config::EventsConfig;
use dirsvc_core::event::{Event, EventBuilder, EventKind};

use crate::bootstrap::Logger;
use crate::filter::Filter;

/// Atomic delivery counters. Read via [`EventBus::metrics_snapshot`].
#[derive(Debug, Default)]
struct BusMetrics {
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

/// A point-in-time read of the bus's delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusMetricsSnapshot {
    pub published_total: u64,
    pub delivered_total: u64,
    pub dropped_total: u64,
    pub subscribers_total: u64,
}

/// A registered subscription: its filter, delivery channel, and cancel
/// signal. Cheaply cloneable for fan-out snapshots.
struct Subscription {
    filters: Arc<Filter>,
    tx: mpsc::Sender<Event>,
    cancelled: Arc<AtomicBool>,
}

/// A snapshot of one subscriber, held by a fan-out task independent of the
/// registry lock.
struct SubscriberHandle {
    id: String,
    filters: Arc<Filter>,
    tx: mpsc::Sender<Event>,
    cancelled: Arc<AtomicBool>,
}

/// In-process publish/subscribe bus fanning events out to streaming
/// subscribers without ever blocking a producer.
pub struct EventBus {
    subscribers: RwLock<HashMap<String, Subscription>>,
    metrics: BusMetrics,
    inflight: AtomicUsize,
    notify: Notify,
    config: EventsConfig,
    logger: Logger,
}

impl EventBus {
    pub fn new(config: EventsConfig, logger: Logger) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            metrics: BusMetrics::default(),
            inflight: AtomicUsize::new(0),
            notify: Notify::new(),
            config,
            logger: logger.component("event-bus"),
        }
    }

    /// Validate, count, and fan out an event to matching subscribers. Never
    /// blocks: fan-out runs on a spawned task and this call returns as soon
    /// as the task has been scheduled.
    pub fn publish(self: &Arc<Self>, event: Event) {
        if let Err(err) = event.validate() {
            self.logger
                .warn_with("dropping invalid event", &[("error", &err.to_string())]);
            return;
        }

        self.metrics.published.fetch_add(1, Ordering::Relaxed);
        if self.config.log_published_events {
            self.logger.debug_with(
                "published event",
                &[("id", &event.id), ("kind", &event.kind.to_string())],
            );
        }

        let snapshot: Vec<SubscriberHandle> = {
            let subs = read_subscribers(&self.subscribers);
            subs.iter()
                .map(|(id, sub)| SubscriberHandle {
                    id: id.clone(),
                    filters: Arc::clone(&sub.filters),
                    tx: sub.tx.clone(),
                    cancelled: Arc::clone(&sub.cancelled),
                })
                .collect()
        };

        self.inflight.fetch_add(1, Ordering::SeqCst);
        let bus = Arc::clone(self);
        tokio::spawn(async move {
            let mut delivered = 0u64;
            let mut dropped = 0u64;

            for handle in snapshot {
                if handle.cancelled.load(Ordering::Relaxed) {
                    continue;
                }
                if !handle.filters.matches(&event) {
                    continue;
                }
                match handle.tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        dropped += 1;
                        if bus.config.log_slow_consumers {
                            bus.logger.warn_with(
                                "dropping event for slow consumer",
                                &[("subscriber_id", &handle.id)],
                            );
                        }
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        // Raced with teardown: the subscriber no longer
                        // wants the event. Expected, not counted.
                    }
                }
            }

            bus.metrics.delivered.fetch_add(delivered, Ordering::Relaxed);
            bus.metrics.dropped.fetch_add(dropped, Ordering::Relaxed);
            if bus.inflight.fetch_sub(1, Ordering::SeqCst) == 1 {
                bus.notify.notify_waiters();
            }
        });
    }

    /// Register a subscriber with the given filter and return its id plus a
    /// receive-only channel. The channel is readable immediately.
    pub fn subscribe(&self, filters: Filter) -> (String, mpsc::Receiver<Event>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.config.subscriber_buffer_size.max(1));
        let sub = Subscription {
            filters: Arc::new(filters),
            tx,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        write_subscribers(&self.subscribers).insert(id.clone(), sub);
        (id, rx)
    }

    /// Remove a subscription, signal its cancel flag, and wait for every
    /// in-flight publication task to finish before returning. Idempotent:
    /// unknown ids are no-ops.
    pub async fn unsubscribe(&self, id: &str) {
        let removed = write_subscribers(&self.subscribers).remove(id);
        let Some(sub) = removed else {
            return;
        };
        sub.cancelled.store(true, Ordering::Relaxed);

        loop {
            let notified = self.notify.notified();
            if self.inflight.load(Ordering::SeqCst) == 0 {
                break;
            }
            notified.await;
        }
        // `sub` drops here, releasing this registry's Sender clone. Any
        // clones held by now-finished fan-out tasks have already dropped,
        // so the receiver observes channel closure at this point.
    }

    /// Snapshot count of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        read_subscribers(&self.subscribers).len()
    }

    /// Atomic read of the bus's delivery counters.
    pub fn metrics_snapshot(&self) -> BusMetricsSnapshot {
        BusMetricsSnapshot {
            published_total: self.metrics.published.load(Ordering::Relaxed),
            delivered_total: self.metrics.delivered.load(Ordering::Relaxed),
            dropped_total: self.metrics.dropped.load(Ordering::Relaxed),
            subscribers_total: self.subscriber_count() as u64,
        }
    }

    // -- Typed convenience publishers --

    pub fn record_pushed(
        self: &Arc<Self>,
        cid: &str,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.publish(EventBuilder::new(EventKind::RecordPushed, cid).with_labels(labels).build());
    }

    pub fn record_pulled(
        self: &Arc<Self>,
        cid: &str,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.publish(EventBuilder::new(EventKind::RecordPulled, cid).with_labels(labels).build());
    }

    pub fn record_deleted(
        self: &Arc<Self>,
        cid: &str,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.publish(EventBuilder::new(EventKind::RecordDeleted, cid).with_labels(labels).build());
    }

    pub fn record_published(
        self: &Arc<Self>,
        cid: &str,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.publish(
            EventBuilder::new(EventKind::RecordPublished, cid)
                .with_labels(labels)
                .build(),
        );
    }

    pub fn record_unpublished(
        self: &Arc<Self>,
        cid: &str,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.publish(
            EventBuilder::new(EventKind::RecordUnpublished, cid)
                .with_labels(labels)
                .build(),
        );
    }

    pub fn record_signed(
        self: &Arc<Self>,
        cid: &str,
        labels: impl IntoIterator<Item = impl Into<String>>,
        signer: &str,
    ) {
        self.publish(
            EventBuilder::new(EventKind::RecordSigned, cid)
                .with_labels(labels)
                .with_metadata("signer", signer)
                .build(),
        );
    }

    pub fn sync_created(self: &Arc<Self>, sync_id: &str, remote_url: &str) {
        self.publish(
            EventBuilder::new(EventKind::SyncCreated, sync_id)
                .with_metadata("remote_url", remote_url)
                .build(),
        );
    }

    pub fn sync_completed(self: &Arc<Self>, sync_id: &str, remote_url: &str, record_count: u64) {
        self.publish(
            EventBuilder::new(EventKind::SyncCompleted, sync_id)
                .with_metadata("remote_url", remote_url)
                .with_metadata("record_count", record_count.to_string())
                .build(),
        );
    }

    pub fn sync_failed(self: &Arc<Self>, sync_id: &str, remote_url: &str, error: &str) {
        self.publish(
            EventBuilder::new(EventKind::SyncFailed, sync_id)
                .with_metadata("remote_url", remote_url)
                .with_metadata("error", error)
                .build(),
        );
    }
}

/// A facade over [`EventBus`] that tolerates an absent bus: every method
/// degrades to a no-op so call sites never need a presence check.
#[derive(Clone)]
pub struct SafeBus(Option<Arc<EventBus>>);

impl SafeBus {
    pub fn enabled(bus: Arc<EventBus>) -> Self {
        Self(Some(bus))
    }

    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn publish(&self, event: Event) {
        if let Some(bus) = &self.0 {
            bus.publish(event);
        }
    }

    pub fn subscribe(&self, filters: Filter) -> (String, Option<mpsc::Receiver<Event>>) {
        match &self.0 {
            Some(bus) => {
                let (id, rx) = bus.subscribe(filters);
                (id, Some(rx))
            }
            None => (String::new(), None),
        }
    }

    pub async fn unsubscribe(&self, id: &str) {
        if let Some(bus) = &self.0 {
            bus.unsubscribe(id).await;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.as_ref().map_or(0, |bus| bus.subscriber_count())
    }

    pub fn metrics_snapshot(&self) -> BusMetricsSnapshot {
        self.0.as_ref().map_or_else(BusMetricsSnapshot::default, |bus| bus.metrics_snapshot())
    }

    pub fn record_pushed(&self, cid: &str, labels: impl IntoIterator<Item = impl Into<String>>) {
        if let Some(bus) = &self.0 {
            bus.record_pushed(cid, labels);
        }
    }

    pub fn record_pulled(&self, cid: &str, labels: impl IntoIterator<Item = impl Into<String>>) {
        if let Some(bus) = &self.0 {
            bus.record_pulled(cid, labels);
        }
    }

    pub fn record_deleted(&self, cid: &str, labels: impl IntoIterator<Item = impl Into<String>>) {
        if let Some(bus) = &self.0 {
            bus.record_deleted(cid, labels);
        }
    }

    pub fn record_published(&self, cid: &str, labels: impl IntoIterator<Item = impl Into<String>>) {
        if let Some(bus) = &self.0 {
            bus.record_published(cid, labels);
        }
    }

    pub fn record_unpublished(&self, cid: &str, labels: impl IntoIterator<Item = impl Into<String>>) {
        if let Some(bus) = &self.0 {
            bus.record_unpublished(cid, labels);
        }
    }

    pub fn record_signed(
        &self,
        cid: &str,
        labels: impl IntoIterator<Item = impl Into<String>>,
        signer: &str,
    ) {
        if let Some(bus) = &self.0 {
            bus.record_signed(cid, labels, signer);
        }
    }

    pub fn sync_created(&self, sync_id: &str, remote_url: &str) {
        if let Some(bus) = &self.0 {
            bus.sync_created(sync_id, remote_url);
        }
    }

    pub fn sync_completed(&self, sync_id: &str, remote_url: &str, record_count: u64) {
        if let Some(bus) = &self.0 {
            bus.sync_completed(sync_id, remote_url, record_count);
        }
    }

    pub fn sync_failed(&self, sync_id: &str, remote_url: &str, error: &str) {
        if let Some(bus) = &self.0 {
            bus.sync_failed(sync_id, remote_url, error);
        }
    }
}

// -- RwLock helpers with poison recovery --

fn read_subscribers(
    lock: &RwLock<HashMap<String, Subscription>>,
) -> std::sync::RwLockReadGuard<'_, HashMap<String, Subscription>> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_subscribers(
    lock: &RwLock<HashMap<String, Subscription>>,
) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Subscription>> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
