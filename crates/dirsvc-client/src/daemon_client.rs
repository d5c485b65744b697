//! A blocking-friendly handle to the directory service's event daemon.
//!
//! `DaemonClient` owns a small current-thread tokio runtime so that
//! callers living outside an async context (CLIs, scripts) can dial the
//! daemon and open a `Listen` stream with a single blocking call.

use std::time::Duration;

use dirsvc_rpc::directory::v1::directory_events_client::DirectoryEventsClient;
use dirsvc_rpc::directory::v1::{ListenRequest, ListenResponse};
use tonic::transport::{Channel, Endpoint};
use tonic::Streaming;

const DEFAULT_TARGET: &str = "127.0.0.1:50051";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
const TARGET_ENV_VAR: &str = "DIRECTORY_SERVER_ADDR";

/// Connection parameters for [`DaemonClient::connect`].
#[derive(Debug, Clone, Default)]
pub struct DaemonClientConfig {
    pub target: Option<String>,
    pub timeout: Duration,
}

/// A connected handle to the directory event daemon, plus the runtime
/// that drives it.
pub struct DaemonClient {
    target: String,
    timeout: Duration,
    runtime: tokio::runtime::Runtime,
    client: DirectoryEventsClient<Channel>,
}

impl DaemonClient {
    /// Resolves the target, dials the daemon, and returns a ready client.
    pub fn connect(config: DaemonClientConfig) -> Result<Self, String> {
        let target = resolve_daemon_target(config.target.as_deref());
        let timeout = normalize_timeout(config.timeout);
        let runtime = build_runtime()?;
        let client = runtime.block_on(connect_client(&target, timeout))?;
        Ok(Self {
            target,
            timeout,
            runtime,
            client,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Opens a `Listen` stream for `request`, blocking until the stream
    /// is established (not until events arrive).
    pub fn listen(&mut self, request: ListenRequest) -> Result<Streaming<ListenResponse>, String> {
        let timeout = self.timeout;
        let client = &mut self.client;
        self.runtime
            .block_on(with_timeout(timeout, "listen", client.listen(request)))
            .map(tonic::Response::into_inner)
    }

    pub fn runtime(&self) -> &tokio::runtime::Runtime {
        &self.runtime
    }
}

fn resolve_daemon_target(explicit_target: Option<&str>) -> String {
    resolve_daemon_target_with_env(explicit_target, std::env::var(TARGET_ENV_VAR).ok())
}

fn resolve_daemon_target_with_env(explicit_target: Option<&str>, env_target: Option<String>) -> String {
    let candidate = explicit_target
        .map(str::to_string)
        .or(env_target)
        .unwrap_or_else(|| DEFAULT_TARGET.to_string());
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        DEFAULT_TARGET.to_string()
    } else {
        normalize_target(trimmed)
    }
}

fn normalize_target(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("http://{target}")
    }
}

fn normalize_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        DEFAULT_TIMEOUT
    } else {
        timeout
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("failed to build client runtime: {err}"))
}

async fn connect_client(target: &str, timeout: Duration) -> Result<DirectoryEventsClient<Channel>, String> {
    let endpoint = Endpoint::from_shared(target.to_string())
        .map_err(|err| format!("invalid daemon target {target:?}: {err}"))?
        .connect_timeout(timeout)
        .timeout(timeout);

    let channel = with_timeout(timeout, "connect", endpoint.connect())
        .await
        .map_err(|err| format!("failed to connect to directory daemon at {target}: {err}"))?;

    Ok(DirectoryEventsClient::new(channel))
}

async fn with_timeout<T, E, F>(timeout: Duration, operation_name: &str, fut: F) -> Result<T, String>
where
    F: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(format!("{operation_name} failed: {err}")),
        Err(_) => Err(format!("{operation_name} timed out after {timeout:?}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn target_resolution_prefers_explicit_over_env() {
        let resolved = resolve_daemon_target_with_env(Some("10.0.0.1:9000"), Some("10.0.0.2:9000".to_string()));
        assert_eq!(resolved, "http://10.0.0.1:9000");
    }

    #[test]
    fn target_resolution_uses_env_then_default() {
        let resolved = resolve_daemon_target_with_env(None, Some("10.0.0.2:9000".to_string()));
        assert_eq!(resolved, "http://10.0.0.2:9000");

        let resolved = resolve_daemon_target_with_env(None, None);
        assert_eq!(resolved, format!("http://{DEFAULT_TARGET}"));
    }

    #[test]
    fn target_resolution_preserves_scheme() {
        let resolved = resolve_daemon_target_with_env(Some("https://daemon.internal:443"), None);
        assert_eq!(resolved, "https://daemon.internal:443");
    }

    #[test]
    fn empty_explicit_target_falls_back_to_default() {
        let resolved = resolve_daemon_target_with_env(Some("   "), None);
        assert_eq!(resolved, format!("http://{DEFAULT_TARGET}"));
    }

    #[test]
    fn timeout_normalization_replaces_zero_with_default() {
        assert_eq!(normalize_timeout(Duration::ZERO), DEFAULT_TIMEOUT);
        assert_eq!(normalize_timeout(Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[test]
    fn connect_surfaces_dial_errors() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = DaemonClient::connect(DaemonClientConfig {
            target: Some(addr.to_string()),
            timeout: Duration::from_millis(200),
        })
        .unwrap_err();

        assert!(
            err.contains("failed to connect to directory daemon"),
            "unexpected error: {err}"
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn timeout_handling_reports_elapsed_operation() {
        let never = std::future::pending::<Result<(), String>>();
        let err = with_timeout(Duration::from_millis(10), "probe", never).await.unwrap_err();
        assert!(err.contains("probe timed out"), "unexpected error: {err}");
    }
}
