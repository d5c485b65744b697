//! Configuration types for the directory service's event distribution core.
//!
//! Root configuration struct and nested section types with full defaults,
//! validation, YAML file loading, and environment variable overrides.

use std::collections::HashMap;
use std::path::Path;

use crate::validation::ValidationErrors;

const ENV_PREFIX: &str = "DIRECTORY_SERVER_";

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

/// Root configuration for the directory service daemon.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub events: EventsConfig,
    pub limiter: LimiterConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            events: EventsConfig::default(),
            limiter: LimiterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads defaults, then an optional YAML file, then environment
    /// variable overrides, in that precedence order.
    pub fn load(yaml_path: Option<&Path>) -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Some(path) = yaml_path {
            cfg.merge_yaml_file(path)?;
        }
        cfg.apply_env_overrides();
        cfg.validate().map_err(|e| e.to_string())?;
        Ok(cfg)
    }

    fn merge_yaml_file(&mut self, path: &Path) -> Result<(), String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("reading config file {}: {e}", path.display()))?;
        let raw: RawServerConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("parsing config file {}: {e}", path.display()))?;
        raw.merge_into(self);
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_usize("EVENTS_SUBSCRIBER_BUFFER_SIZE") {
            self.events.subscriber_buffer_size = v;
        }
        if let Some(v) = env_bool("EVENTS_LOG_SLOW_CONSUMERS") {
            self.events.log_slow_consumers = v;
        }
        if let Some(v) = env_bool("EVENTS_LOG_PUBLISHED_EVENTS") {
            self.events.log_published_events = v;
        }

        if let Some(v) = env_bool("RATELIMIT_ENABLED") {
            self.limiter.enabled = v;
        }
        if let Some(v) = env_f64("RATELIMIT_GLOBAL_RPS") {
            self.limiter.global_rps = v;
        }
        if let Some(v) = env_f64("RATELIMIT_GLOBAL_BURST") {
            self.limiter.global_burst = v;
        }
        if let Some(v) = env_f64("RATELIMIT_PER_CLIENT_RPS") {
            self.limiter.per_client_rps = v;
        }
        if let Some(v) = env_f64("RATELIMIT_PER_CLIENT_BURST") {
            self.limiter.per_client_burst = v;
        }

        if let Some(v) = env_string("LOGGING_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env_string("LOGGING_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Validates the entire configuration, aggregating every failure.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.events.subscriber_buffer_size == 0 {
            errors.add(
                "events.subscriber_buffer_size",
                "must be at least 1",
            );
        }

        match self.logging.level.to_lowercase().trim() {
            "debug" | "info" | "warn" | "error" => {}
            _ => errors.add("logging.level", "must be one of debug, info, warn, error"),
        }
        match self.logging.format.to_lowercase().trim() {
            "console" | "json" => {}
            _ => errors.add("logging.format", "must be one of console, json"),
        }

        if self.limiter.enabled {
            validate_rate_burst(&mut errors, "limiter.global", self.limiter.global_rps, self.limiter.global_burst);
            validate_rate_burst(
                &mut errors,
                "limiter.per_client",
                self.limiter.per_client_rps,
                self.limiter.per_client_burst,
            );
            for (method, limit) in &self.limiter.method_limits {
                validate_rate_burst(
                    &mut errors,
                    &format!("limiter.method_limits[{method}]"),
                    limit.rps,
                    limit.burst,
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_rate_burst(errors: &mut ValidationErrors, path: &str, rps: f64, burst: f64) {
    if rps < 0.0 {
        errors.add(format!("{path}.rps"), "must be zero or greater");
    }
    if burst < 0.0 {
        errors.add(format!("{path}.burst"), "must be zero or greater");
    }
    if rps > 0.0 && burst > 0.0 && burst < rps {
        errors.add(path.to_string(), "burst must be >= rps when both are nonzero");
    }
}

// ---------------------------------------------------------------------------
// Section configs
// ---------------------------------------------------------------------------

/// Event bus tuning and observability knobs.
#[derive(Debug, Clone)]
pub struct EventsConfig {
    /// Per-subscriber bounded channel capacity. Full channels drop the event.
    pub subscriber_buffer_size: usize,
    /// Emit a log line when a publication is dropped due to a full channel.
    pub log_slow_consumers: bool,
    /// Emit a debug-level log line for every successfully published event.
    pub log_published_events: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer_size: 100,
            log_slow_consumers: true,
            log_published_events: false,
        }
    }
}

/// Per-method token bucket override.
#[derive(Debug, Clone, Copy)]
pub struct MethodLimit {
    pub rps: f64,
    pub burst: f64,
}

/// Request rate limiter configuration.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    pub enabled: bool,
    pub global_rps: f64,
    pub global_burst: f64,
    pub per_client_rps: f64,
    pub per_client_burst: f64,
    /// Per-RPC-method overrides, keyed by method name. YAML-only: there is
    /// no environment variable form for this field.
    pub method_limits: HashMap<String, MethodLimit>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            global_rps: 500.0,
            global_burst: 1000.0,
            per_client_rps: 50.0,
            per_client_burst: 100.0,
            method_limits: HashMap::new(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "console".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// YAML deserialization shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct RawServerConfig {
    events: RawEventsConfig,
    limiter: RawLimiterConfig,
    logging: RawLoggingConfig,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct RawEventsConfig {
    subscriber_buffer_size: Option<usize>,
    log_slow_consumers: Option<bool>,
    log_published_events: Option<bool>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct RawLimiterConfig {
    enabled: Option<bool>,
    global_rps: Option<f64>,
    global_burst: Option<f64>,
    per_client_rps: Option<f64>,
    per_client_burst: Option<f64>,
    method_limits: HashMap<String, RawMethodLimit>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct RawMethodLimit {
    rps: f64,
    burst: f64,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct RawLoggingConfig {
    level: Option<String>,
    format: Option<String>,
}

impl RawServerConfig {
    fn merge_into(self, cfg: &mut ServerConfig) {
        if let Some(v) = self.events.subscriber_buffer_size {
            cfg.events.subscriber_buffer_size = v;
        }
        if let Some(v) = self.events.log_slow_consumers {
            cfg.events.log_slow_consumers = v;
        }
        if let Some(v) = self.events.log_published_events {
            cfg.events.log_published_events = v;
        }

        if let Some(v) = self.limiter.enabled {
            cfg.limiter.enabled = v;
        }
        if let Some(v) = self.limiter.global_rps {
            cfg.limiter.global_rps = v;
        }
        if let Some(v) = self.limiter.global_burst {
            cfg.limiter.global_burst = v;
        }
        if let Some(v) = self.limiter.per_client_rps {
            cfg.limiter.per_client_rps = v;
        }
        if let Some(v) = self.limiter.per_client_burst {
            cfg.limiter.per_client_burst = v;
        }
        for (method, limit) in self.limiter.method_limits {
            cfg.limiter.method_limits.insert(
                method,
                MethodLimit {
                    rps: limit.rps,
                    burst: limit.burst,
                },
            );
        }

        if let Some(v) = self.logging.level {
            cfg.logging.level = v;
        }
        if let Some(v) = self.logging.format {
            cfg.logging.format = v;
        }
    }
}

// ---------------------------------------------------------------------------
// Env var helpers
// ---------------------------------------------------------------------------

fn env_string(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}")).ok()
}

fn env_bool(suffix: &str) -> Option<bool> {
    env_string(suffix).and_then(|v| match v.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}

fn env_usize(suffix: &str) -> Option<usize> {
    env_string(suffix).and_then(|v| v.parse().ok())
}

fn env_f64(suffix: &str) -> Option<f64> {
    env_string(suffix).and_then(|v| v.parse().ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = ServerConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_log_level() {
        let mut cfg = ServerConfig::default();
        cfg.logging.level = "bogus".into();
        let errors = cfg.validate().expect_err("expected validation error");
        assert!(errors.to_string().contains("logging.level"));
    }

    #[test]
    fn validate_rejects_negative_rps() {
        let mut cfg = ServerConfig::default();
        cfg.limiter.global_rps = -1.0;
        let errors = cfg.validate().expect_err("expected validation error");
        assert!(errors.to_string().contains("global.rps"));
    }

    #[test]
    fn validate_rejects_burst_below_rps() {
        let mut cfg = ServerConfig::default();
        cfg.limiter.global_rps = 100.0;
        cfg.limiter.global_burst = 10.0;
        let errors = cfg.validate().expect_err("expected validation error");
        assert!(errors.to_string().contains("limiter.global"));
    }

    #[test]
    fn validate_aggregates_multiple_errors() {
        let mut cfg = ServerConfig::default();
        cfg.logging.level = "bogus".into();
        cfg.logging.format = "xml".into();
        let errors = cfg.validate().expect_err("expected validation error");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn merge_yaml_overrides_defaults() {
        let yaml = "events:\n  subscriber_buffer_size: 128\nlimiter:\n  enabled: false\n";
        let mut cfg = ServerConfig::default();
        let raw: RawServerConfig = serde_yaml::from_str(yaml).expect("valid yaml");
        raw.merge_into(&mut cfg);
        assert_eq!(cfg.events.subscriber_buffer_size, 128);
        assert!(!cfg.limiter.enabled);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.limiter.global_rps, 500.0);
    }

    #[test]
    fn method_limits_merge_from_yaml() {
        let yaml = "limiter:\n  method_limits:\n    Listen:\n      rps: 10\n      burst: 20\n";
        let mut cfg = ServerConfig::default();
        let raw: RawServerConfig = serde_yaml::from_str(yaml).expect("valid yaml");
        raw.merge_into(&mut cfg);
        let limit = cfg.limiter.method_limits.get("Listen").expect("method present");
        assert_eq!(limit.rps, 10.0);
        assert_eq!(limit.burst, 20.0);
    }
}
