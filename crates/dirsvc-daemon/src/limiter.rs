//! Token-bucket request rate limiter keyed by client and RPC method.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::Instant;

use dirsvc_core::config::LimiterConfig;

const GLOBAL_KEY: &str = "__global__";

/// A single token bucket: capacity `burst`, refilling continuously at `rps`
/// tokens per second.
struct Bucket {
    rps: f64,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(rps: f64, burst: f64) -> Self {
        Self {
            rps,
            burst,
            tokens: burst,
            last_refill: Instant::now(),
        }
    }

    /// Refill based on elapsed time, then consume one token if available.
    fn try_consume(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * self.rps).min(self.burst);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Rate limiter with three tiers of buckets: a single global bucket, one
/// per-client bucket per client id, and (when a method override exists in
/// config) one per `(client, method)` pair. Each request resolves to
/// exactly one bucket — the first applicable tier wins — and consumes at
/// most one token, from that bucket alone.
pub struct RequestLimiter {
    config: LimiterConfig,
    global: Mutex<Bucket>,
    per_client: RwLock<HashMap<String, Mutex<Bucket>>>,
    per_method: RwLock<HashMap<String, Mutex<Bucket>>>,
}

impl RequestLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        let global = Mutex::new(Bucket::new(config.global_rps, config.global_burst));
        Self {
            config,
            global,
            per_client: RwLock::new(HashMap::new()),
            per_method: RwLock::new(HashMap::new()),
        }
    }

    /// Returns `true` if the request is allowed, consuming a single token
    /// from exactly one bucket: a method override bucket if `method` has
    /// one configured, else the caller's per-client bucket if `client_id`
    /// is non-empty, else the global bucket. A refused request consumes no
    /// tokens. Disabled limiters always allow.
    pub fn check(&self, client_id: &str, method: &str) -> bool {
        if !self.config.enabled {
            return true;
        }

        let client_key = client_key(client_id);

        if let Some(limit) = self.config.method_limits.get(method) {
            let method_key = format!("{client_key}|{method}");
            return self.consume_from(&self.per_method, &method_key, limit.rps, limit.burst);
        }

        if !client_id.is_empty() {
            return self.consume_from(&self.per_client, &client_key, self.config.per_client_rps, self.config.per_client_burst);
        }

        self.global.lock().unwrap_or_else(|p| p.into_inner()).try_consume()
    }

    fn consume_from(
        &self,
        registry: &RwLock<HashMap<String, Mutex<Bucket>>>,
        key: &str,
        rps: f64,
        burst: f64,
    ) -> bool {
        {
            let buckets = read_buckets(registry);
            if let Some(bucket) = buckets.get(key) {
                return bucket.lock().unwrap_or_else(|p| p.into_inner()).try_consume();
            }
        }

        let mut buckets = write_buckets(registry);
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(Bucket::new(rps, burst)));
        bucket.lock().unwrap_or_else(|p| p.into_inner()).try_consume()
    }
}

fn client_key(client_id: &str) -> String {
    if client_id.is_empty() {
        GLOBAL_KEY.to_string()
    } else {
        client_id.to_string()
    }
}

fn read_buckets(
    lock: &RwLock<HashMap<String, Mutex<Bucket>>>,
) -> std::sync::RwLockReadGuard<'_, HashMap<String, Mutex<Bucket>>> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_buckets(
    lock: &RwLock<HashMap<String, Mutex<Bucket>>>,
) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Mutex<Bucket>>> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
