//! dirsvc-rpc: generated gRPC types for the directory service's event
//! streaming protocol.

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "dirsvc-rpc"
}

pub mod directory {
    pub mod v1 {
        tonic::include_proto!("directory.v1");
    }
}

mod convert;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::crate_label;
    use super::directory::v1;

    #[test]
    fn crate_label_is_stable() {
        assert_eq!(crate_label(), "dirsvc-rpc");
    }

    #[test]
    fn directory_events_service_types_are_available() {
        type Client = v1::directory_events_client::DirectoryEventsClient<tonic::transport::Channel>;
        let _ = std::any::type_name::<Client>();
        let _ = v1::ListenRequest::default();
        let _ = v1::EventType::RecordPushed as i32;
    }
}
