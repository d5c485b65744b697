//! Entry point for the directory service event distribution daemon.
//!
//! Bootstrap sequence:
//!   1. Parse CLI flags
//!   2. Load configuration (defaults, then YAML file, then env overrides)
//!   3. Initialize logging
//!   4. Build the event bus and request limiter
//!   5. Serve the `DirectoryEvents` gRPC service until a shutdown signal

use std::sync::Arc;

use dirsvc_core::config::ServerConfig;
use dirsvc_daemon::bootstrap::{init_logger, LoggingConfig, ServerOptions, VersionInfo};
use dirsvc_daemon::bus::EventBus;
use dirsvc_daemon::limiter::RequestLimiter;
use dirsvc_daemon::server::ListenService;
use dirsvc_rpc::directory::v1::directory_events_server::DirectoryEventsServer;

#[tokio::main]
async fn main() {
    let version = VersionInfo::default();
    let args = parse_args();

    let cfg = match ServerConfig::load(args.config_file.as_deref().map(std::path::Path::new)) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    let log_cfg = LoggingConfig::from(&cfg.logging);
    let logger = init_logger(&log_cfg);

    let opts = ServerOptions {
        hostname: args.hostname.unwrap_or_default(),
        port: args.port.unwrap_or_default(),
        version: version.version.clone(),
    };

    logger.info_with(
        "dirsvc-daemon starting",
        &[("version", &version.version), ("commit", &version.commit)],
    );

    let bus = Arc::new(EventBus::new(cfg.events.clone(), logger.clone()));
    let limiter = Arc::new(RequestLimiter::new(cfg.limiter.clone()));
    let service = ListenService::new(Arc::clone(&bus), limiter, logger.clone());

    let bind_addr = opts.bind_addr();
    let addr = match bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            logger.error_with("invalid bind address", &[("bind", &bind_addr), ("error", &err.to_string())]);
            std::process::exit(1);
        }
    };

    logger.info_with("dirsvc-daemon ready", &[("bind", &bind_addr)]);

    if let Err(err) = tonic::transport::Server::builder()
        .add_service(DirectoryEventsServer::new(service))
        .serve(addr)
        .await
    {
        logger.error_with("server exited with error", &[("error", &err.to_string())]);
        std::process::exit(1);
    }
}

#[derive(Default)]
struct DaemonArgs {
    hostname: Option<String>,
    port: Option<u16>,
    config_file: Option<String>,
}

fn parse_args() -> DaemonArgs {
    let mut args = DaemonArgs::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--hostname" => args.hostname = iter.next(),
            "--port" => {
                if let Some(v) = iter.next() {
                    args.port = v.parse().ok();
                }
            }
            "--config" => args.config_file = iter.next(),
            _ => {} // Ignore unknown flags for forward-compatibility.
        }
    }
    args
}
