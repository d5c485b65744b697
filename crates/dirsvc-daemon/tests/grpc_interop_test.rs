//! End-to-end gRPC interop tests for the `DirectoryEvents` streaming
//! service: a real tonic server bound to a random port, a real client
//! connection, exercising the scenarios the event distribution core must
//! satisfy.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;

use dirsvc_core::config::{EventsConfig, LimiterConfig};
use dirsvc_daemon::bootstrap::{Logger, LoggingConfig};
use dirsvc_daemon::bus::EventBus;
use dirsvc_daemon::limiter::RequestLimiter;
use dirsvc_daemon::server::ListenService;
use dirsvc_rpc::directory::v1 as proto;
use dirsvc_rpc::directory::v1::directory_events_client::DirectoryEventsClient;
use dirsvc_rpc::directory::v1::directory_events_server::DirectoryEventsServer;
use tonic::transport::{Channel, Server};

async fn start_server_and_client(
    events: EventsConfig,
    limiter_cfg: LimiterConfig,
) -> (DirectoryEventsClient<Channel>, Arc<EventBus>) {
    let logger = Logger::new(&LoggingConfig::default());
    let bus = Arc::new(EventBus::new(events, logger.clone()));
    let limiter = Arc::new(RequestLimiter::new(limiter_cfg));
    let service = ListenService::new(Arc::clone(&bus), limiter, logger);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);

    tokio::spawn(async move {
        Server::builder()
            .add_service(DirectoryEventsServer::new(service))
            .serve_with_incoming(incoming)
            .await
            .unwrap();
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let channel = Channel::from_shared(format!("http://{addr}"))
        .unwrap()
        .connect()
        .await
        .unwrap();
    (DirectoryEventsClient::new(channel), bus)
}

fn enabled_limiter(global_rps: f64, global_burst: f64, per_client_rps: f64, per_client_burst: f64) -> LimiterConfig {
    LimiterConfig {
        enabled: true,
        global_rps,
        global_burst,
        per_client_rps,
        per_client_burst,
        method_limits: std::collections::HashMap::new(),
    }
}

#[tokio::test]
async fn listen_delivers_events_matching_filter_and() {
    let (mut client, bus) = start_server_and_client(
        EventsConfig::default(),
        enabled_limiter(1000.0, 1000.0, 1000.0, 1000.0),
    )
    .await;

    let mut stream = client
        .listen(proto::ListenRequest {
            event_types: vec![proto::EventType::RecordPushed as i32],
            cid_filters: vec![],
            label_filters: vec!["/skills/AI".to_string()],
        })
        .await
        .unwrap()
        .into_inner();

    bus.record_pushed("A", ["/skills/AI/ML"]);
    bus.record_published("B", ["/skills/AI"]);
    bus.record_pushed("C", ["/domains/medical"]);

    let first = stream.message().await.unwrap().expect("one event expected");
    assert_eq!(first.event.unwrap().resource_id, "A");

    let second = tokio::time::timeout(std::time::Duration::from_millis(100), stream.message()).await;
    assert!(second.is_err(), "no further events should arrive");
}

#[tokio::test]
async fn two_listeners_receive_independently() {
    let (mut client, bus) = start_server_and_client(
        EventsConfig::default(),
        enabled_limiter(1000.0, 1000.0, 1000.0, 1000.0),
    )
    .await;

    let mut all_events = client
        .listen(proto::ListenRequest::default())
        .await
        .unwrap()
        .into_inner();
    let mut deletions_only = client
        .listen(proto::ListenRequest {
            event_types: vec![proto::EventType::RecordDeleted as i32],
            cid_filters: vec![],
            label_filters: vec![],
        })
        .await
        .unwrap()
        .into_inner();

    bus.record_pushed("X", Vec::<String>::new());
    bus.record_deleted("Y", Vec::<String>::new());

    let a1 = all_events.message().await.unwrap().unwrap();
    assert_eq!(a1.event.unwrap().resource_id, "X");
    let a2 = all_events.message().await.unwrap().unwrap();
    assert_eq!(a2.event.unwrap().resource_id, "Y");

    let b1 = deletions_only.message().await.unwrap().unwrap();
    assert_eq!(b1.event.unwrap().resource_id, "Y");
}

#[tokio::test]
async fn slow_consumer_drops_tail_events() {
    let mut events_cfg = EventsConfig::default();
    events_cfg.subscriber_buffer_size = 2;
    let (mut client, bus) = start_server_and_client(events_cfg, enabled_limiter(1000.0, 1000.0, 1000.0, 1000.0)).await;

    let mut stream = client
        .listen(proto::ListenRequest::default())
        .await
        .unwrap()
        .into_inner();

    for i in 0..10 {
        bus.record_pushed(&format!("r{i}"), Vec::<String>::new());
    }
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    let snap = bus.metrics_snapshot();
    assert_eq!(snap.published_total, 10);
    assert!(snap.dropped_total >= 8, "dropped={}", snap.dropped_total);

    // Drain whatever made it through without hanging.
    let mut received = 0;
    while tokio::time::timeout(std::time::Duration::from_millis(50), stream.message())
        .await
        .ok()
        .and_then(Result::ok)
        .flatten()
        .is_some()
    {
        received += 1;
    }
    assert_eq!(received as u64, snap.delivered_total);
}

#[tokio::test]
async fn dropping_the_client_stream_unsubscribes_cleanly() {
    let (mut client, bus) = start_server_and_client(
        EventsConfig::default(),
        enabled_limiter(1000.0, 1000.0, 1000.0, 1000.0),
    )
    .await;

    {
        let _stream = client
            .listen(proto::ListenRequest::default())
            .await
            .unwrap()
            .into_inner();
        assert_eq!(bus.subscriber_count(), 1);
    }

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn per_client_rate_limit_rejects_after_burst() {
    let (mut client, _bus) = start_server_and_client(EventsConfig::default(), enabled_limiter(1000.0, 1000.0, 10.0, 2.0)).await;

    let mut request = tonic::Request::new(proto::ListenRequest::default());
    request.metadata_mut().insert("x-client-id", "client-a".parse().unwrap());
    client.listen(request).await.unwrap();

    let mut request = tonic::Request::new(proto::ListenRequest::default());
    request.metadata_mut().insert("x-client-id", "client-a".parse().unwrap());
    client.listen(request).await.unwrap();

    let mut request = tonic::Request::new(proto::ListenRequest::default());
    request.metadata_mut().insert("x-client-id", "client-a".parse().unwrap());
    let err = client.listen(request).await.unwrap_err();
    assert_eq!(err.code(), tonic::Code::ResourceExhausted);
}

#[tokio::test]
async fn malformed_request_is_rejected_as_invalid_argument() {
    let (mut client, _bus) = start_server_and_client(
        EventsConfig::default(),
        enabled_limiter(1000.0, 1000.0, 1000.0, 1000.0),
    )
    .await;

    let err = client
        .listen(proto::ListenRequest {
            event_types: vec![],
            cid_filters: vec![String::new()],
            label_filters: vec![],
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::InvalidArgument);
}
