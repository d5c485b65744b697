//! gRPC server implementation for the `DirectoryEvents` streaming service.

use std::pin::Pin;
use std::sync::Arc;

use tokio_stream::Stream;
use tonic::{Request, Response, Status};

use dirsvc_rpc::directory::v1 as proto;
use proto::directory_events_server::DirectoryEvents;

use crate::bootstrap::Logger;
use crate::bus::EventBus;
use crate::errors::ListenError;
use crate::filter::Filter;
use crate::limiter::RequestLimiter;

/// Header carrying the caller's client id, used for per-client rate
/// limiting. Unauthenticated callers fall back to the global bucket.
const CLIENT_ID_METADATA_KEY: &str = "x-client-id";

/// Implements the `Listen` streaming RPC by bridging a bus subscription
/// into a `tonic` response stream.
pub struct ListenService {
    bus: Arc<EventBus>,
    limiter: Arc<RequestLimiter>,
    logger: Logger,
}

impl ListenService {
    pub fn new(bus: Arc<EventBus>, limiter: Arc<RequestLimiter>, logger: Logger) -> Self {
        Self {
            bus,
            limiter,
            logger: logger.component("listen-service"),
        }
    }
}

type ListenStream = Pin<Box<dyn Stream<Item = Result<proto::ListenResponse, Status>> + Send>>;

#[tonic::async_trait]
impl DirectoryEvents for ListenService {
    type ListenStream = ListenStream;

    async fn listen(
        &self,
        request: Request<proto::ListenRequest>,
    ) -> Result<Response<Self::ListenStream>, Status> {
        let client_id = request
            .metadata()
            .get(CLIENT_ID_METADATA_KEY)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !self.limiter.check(&client_id, "Listen") {
            return Err(Status::resource_exhausted("rate limit exceeded for Listen"));
        }

        let req = request.into_inner();
        let event_types: Vec<dirsvc_core::event::EventKind> = req
            .event_types
            .into_iter()
            .map(|t| proto::EventType::try_from(t).unwrap_or(proto::EventType::EventTypeUnspecified))
            .map(dirsvc_core::event::EventKind::from)
            .collect();

        if req.cid_filters.iter().any(String::is_empty) || req.label_filters.iter().any(String::is_empty) {
            return Err(ListenError::InvalidRequest("filters must not contain empty strings".into()).into());
        }

        let filter = Filter::from_request(event_types, req.cid_filters, req.label_filters);
        let (subscription_id, rx) = self.bus.subscribe(filter);
        self.logger.info_with("listen subscribed", &[("subscription_id", &subscription_id)]);

        let bus = Arc::clone(&self.bus);
        let logger = self.logger.clone();
        let stream = SubscriptionStream {
            rx,
            bus,
            subscription_id,
            logger,
        };

        Ok(Response::new(Box::pin(stream)))
    }
}

/// Wraps a subscriber's receive channel as a `tonic` response stream,
/// running `unsubscribe` exactly once when the stream is dropped — whether
/// that happens from client cancellation, an early return, or clean EOF.
struct SubscriptionStream {
    rx: tokio::sync::mpsc::Receiver<dirsvc_core::event::Event>,
    bus: Arc<EventBus>,
    subscription_id: String,
    logger: Logger,
}

impl Stream for SubscriptionStream {
    type Item = Result<proto::ListenResponse, Status>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        match self.rx.poll_recv(cx) {
            std::task::Poll::Ready(Some(event)) => std::task::Poll::Ready(Some(Ok(proto::ListenResponse {
                event: Some(proto::Event::from(event)),
            }))),
            std::task::Poll::Ready(None) => std::task::Poll::Ready(None),
            std::task::Poll::Pending => std::task::Poll::Pending,
        }
    }
}

impl Drop for SubscriptionStream {
    fn drop(&mut self) {
        let bus = Arc::clone(&self.bus);
        let id = self.subscription_id.clone();
        let logger = self.logger.clone();
        tokio::spawn(async move {
            bus.unsubscribe(&id).await;
            logger.info_with("listen unsubscribed", &[("subscription_id", &id)]);
        });
    }
}
