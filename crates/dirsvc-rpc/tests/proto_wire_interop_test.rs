#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use dirsvc_rpc::directory::v1 as proto;
use prost::Message;

#[test]
fn listen_request_roundtrips_through_the_wire() {
    let request = proto::ListenRequest {
        event_types: vec![proto::EventType::RecordPushed as i32, proto::EventType::RecordDeleted as i32],
        cid_filters: vec!["cid-1".to_string()],
        label_filters: vec!["/skills/AI".to_string()],
    };

    let bytes = request.encode_to_vec();
    let decoded = proto::ListenRequest::decode(bytes.as_slice()).expect("decode");
    assert_eq!(decoded, request);
}

#[test]
fn listen_response_roundtrips_through_the_wire() {
    let mut metadata = HashMap::new();
    metadata.insert("signer".to_string(), "alice".to_string());

    let response = proto::ListenResponse {
        event: Some(proto::Event {
            id: "evt-1".to_string(),
            r#type: proto::EventType::RecordSigned as i32,
            timestamp: Some(prost_types::Timestamp {
                seconds: 1_770_652_800,
                nanos: 0,
            }),
            resource_id: "cid-1".to_string(),
            labels: vec!["/skills/AI/ML".to_string()],
            metadata,
        }),
    };

    let bytes = response.encode_to_vec();
    let decoded = proto::ListenResponse::decode(bytes.as_slice()).expect("decode");
    assert_eq!(decoded, response);
}

#[test]
fn empty_listen_request_matches_everything_on_the_wire() {
    let request = proto::ListenRequest::default();
    assert!(request.event_types.is_empty());
    assert!(request.cid_filters.is_empty());
    assert!(request.label_filters.is_empty());
}

#[test]
fn event_type_enum_values_are_stable() {
    assert_eq!(proto::EventType::EventTypeUnspecified as i32, 0);
    assert_eq!(proto::EventType::RecordPushed as i32, 1);
    assert_eq!(proto::EventType::RecordPulled as i32, 2);
    assert_eq!(proto::EventType::RecordDeleted as i32, 3);
    assert_eq!(proto::EventType::RecordPublished as i32, 4);
    assert_eq!(proto::EventType::RecordUnpublished as i32, 5);
    assert_eq!(proto::EventType::RecordSigned as i32, 6);
    assert_eq!(proto::EventType::SyncCreated as i32, 7);
    assert_eq!(proto::EventType::SyncCompleted as i32, 8);
    assert_eq!(proto::EventType::SyncFailed as i32, 9);
}
