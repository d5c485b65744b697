//! Daemon bootstrap: bind-address defaults, structured logging, and
//! sensitive-value redaction.

use std::fmt;
use std::io::Write;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default bind host for the directory event service.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default gRPC port for the directory event service.
pub const DEFAULT_PORT: u16 = 50051;

// ---------------------------------------------------------------------------
// ServerOptions
// ---------------------------------------------------------------------------

/// Runtime options for the daemon binary.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            version: "dev".into(),
        }
    }
}

impl ServerOptions {
    /// Returns the effective hostname (default if empty).
    pub fn effective_hostname(&self) -> &str {
        if self.hostname.is_empty() {
            DEFAULT_HOST
        } else {
            &self.hostname
        }
    }

    /// Returns the effective port (default if zero).
    pub fn effective_port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_PORT
        } else {
            self.port
        }
    }

    /// Returns the bind address as "host:port".
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.effective_hostname(), self.effective_port())
    }
}

// ---------------------------------------------------------------------------
// Log level
// ---------------------------------------------------------------------------

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Parse a log level string (case-insensitive, defaults to Info).
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().trim() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            "fatal" => Self::Fatal,
            _ => Self::Info,
        }
    }

    /// Returns true if a message at `msg_level` should be logged given this filter level.
    pub fn should_log(self, msg_level: LogLevel) -> bool {
        msg_level >= self
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Log format
// ---------------------------------------------------------------------------

/// Output format for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Console,
    Json,
}

impl LogFormat {
    /// Parse a format string (defaults to Console).
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().trim() {
            "json" => Self::Json,
            _ => Self::Console,
        }
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Resolved logging configuration, parsed from [`dirsvc_core::config::LoggingConfig`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Console,
        }
    }
}

impl From<&dirsvc_core::config::LoggingConfig> for LoggingConfig {
    fn from(cfg: &dirsvc_core::config::LoggingConfig) -> Self {
        Self {
            level: LogLevel::parse(&cfg.level),
            format: LogFormat::parse(&cfg.format),
        }
    }
}

/// A structured logger with component/field context.
#[derive(Debug, Clone)]
pub struct Logger {
    level: LogLevel,
    format: LogFormat,
    fields: Vec<(String, String)>,
}

impl Logger {
    /// Create a new logger from the given config.
    pub fn new(cfg: &LoggingConfig) -> Self {
        Self {
            level: cfg.level,
            format: cfg.format,
            fields: Vec::new(),
        }
    }

    /// Create a child logger with an additional field.
    pub fn with_field(&self, key: &str, value: &str) -> Self {
        let mut child = self.clone();
        child.fields.push((key.to_string(), value.to_string()));
        child
    }

    /// Create a child logger for a named component.
    pub fn component(&self, name: &str) -> Self {
        self.with_field("component", name)
    }

    /// Create a child logger scoped to a client address.
    pub fn with_client(&self, client_id: &str) -> Self {
        self.with_field("client_id", client_id)
    }

    /// Create a child logger scoped to an RPC method name.
    pub fn with_method(&self, method: &str) -> Self {
        self.with_field("method", method)
    }

    /// Log a message at the given level.
    pub fn log(&self, level: LogLevel, msg: &str) {
        self.log_with_fields(level, msg, &[]);
    }

    /// Log a message with extra inline fields.
    pub fn log_with_fields(&self, level: LogLevel, msg: &str, extra: &[(&str, &str)]) {
        if !self.level.should_log(level) {
            return;
        }

        let stderr = std::io::stderr();
        let mut handle = stderr.lock();

        match self.format {
            LogFormat::Console => {
                let now = chrono::Utc::now().format("%H:%M:%S");
                let _ = write!(handle, "{now} {level} ");
                for (k, v) in &self.fields {
                    let _ = write!(handle, "{k}={v} ");
                }
                for (k, v) in extra {
                    let _ = write!(handle, "{k}={v} ");
                }
                let _ = writeln!(handle, "{msg}");
            }
            LogFormat::Json => {
                let _ = write!(
                    handle,
                    "{{\"time\":\"{}\",\"level\":\"{}\"",
                    chrono::Utc::now().to_rfc3339(),
                    level,
                );
                for (k, v) in &self.fields {
                    let _ = write!(handle, ",\"{k}\":\"{v}\"");
                }
                for (k, v) in extra {
                    let _ = write!(handle, ",\"{k}\":\"{v}\"");
                }
                let _ = writeln!(handle, ",\"message\":\"{msg}\"}}");
            }
        }
    }

    pub fn trace(&self, msg: &str) {
        self.log(LogLevel::Trace, msg);
    }

    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }

    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }

    pub fn info_with(&self, msg: &str, fields: &[(&str, &str)]) {
        self.log_with_fields(LogLevel::Info, msg, fields);
    }

    pub fn debug_with(&self, msg: &str, fields: &[(&str, &str)]) {
        self.log_with_fields(LogLevel::Debug, msg, fields);
    }

    pub fn warn_with(&self, msg: &str, fields: &[(&str, &str)]) {
        self.log_with_fields(LogLevel::Warn, msg, fields);
    }

    pub fn error_with(&self, msg: &str, fields: &[(&str, &str)]) {
        self.log_with_fields(LogLevel::Error, msg, fields);
    }
}

// ---------------------------------------------------------------------------
// Redaction
// ---------------------------------------------------------------------------

/// Sensitive field names that should be redacted.
const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_key",
    "apikey",
    "api-key",
    "authorization",
    "auth",
    "credential",
];

/// Replacement value for redacted data.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Check if a field name is considered sensitive.
pub fn is_sensitive_field(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENSITIVE_FIELDS.iter().any(|f| lower.contains(f))
}

/// Redact an event's metadata map before it is logged, without mutating the
/// event itself.
pub fn redact_metadata<'a>(
    metadata: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> Vec<(String, String)> {
    metadata
        .into_iter()
        .map(|(k, v)| {
            if is_sensitive_field(k) {
                (k.clone(), REDACTED_VALUE.to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Version info
// ---------------------------------------------------------------------------

/// Build information injected at compile time or defaulting to "dev".
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub version: String,
    pub commit: String,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            version: option_env!("DIRSVC_VERSION").unwrap_or("dev").to_string(),
            commit: option_env!("DIRSVC_COMMIT").unwrap_or("none").to_string(),
        }
    }
}

/// Convenience: create a logger from the bootstrap config, with component "dirsvc-daemon".
pub fn init_logger(cfg: &LoggingConfig) -> Logger {
    Logger::new(cfg).component("dirsvc-daemon")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
