//! Application state management

use crate::auth::{AuthService, CookiePolicy};
use sked_core::config::AppConfig;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;

/// Per-endpoint request statistics
#[derive(Debug, Clone, Default)]
pub struct EndpointMetrics {
    /// Responses by HTTP status code
    pub status_counts: BTreeMap<u16, u64>,
    /// Latency histogram buckets
    pub latency_buckets: LatencyBuckets,
    pub total_latency_us: u64,
    pub latency_count: u64,
}

/// Cumulative-friendly latency buckets (upper bounds in seconds)
#[derive(Debug, Clone, Default)]
pub struct LatencyBuckets {
    pub under_10ms: u64,
    pub ms_10_50: u64,
    pub ms_50_100: u64,
    pub ms_100_500: u64,
    pub ms_500_1000: u64,
    pub over_1s: u64,
}

impl LatencyBuckets {
    fn observe(&mut self, latency_us: u64) {
        let bucket = match latency_us {
            0..=9_999 => &mut self.under_10ms,
            10_000..=49_999 => &mut self.ms_10_50,
            50_000..=99_999 => &mut self.ms_50_100,
            100_000..=499_999 => &mut self.ms_100_500,
            500_000..=999_999 => &mut self.ms_500_1000,
            _ => &mut self.over_1s,
        };
        *bucket += 1;
    }

    /// `(le, count)` pairs for the bounded buckets, in ascending order
    pub fn bounded(&self) -> [(&'static str, u64); 5] {
        [
            ("0.01", self.under_10ms),
            ("0.05", self.ms_10_50),
            ("0.1", self.ms_50_100),
            ("0.5", self.ms_100_500),
            ("1.0", self.ms_500_1000),
        ]
    }
}

impl EndpointMetrics {
    fn observe(&mut self, status: u16, latency_us: u64) {
        *self.status_counts.entry(status).or_default() += 1;
        self.latency_buckets.observe(latency_us);
        self.total_latency_us += latency_us;
        self.latency_count += 1;
    }
}

/// Application state shared across handlers
///
/// Holds no per-request identity; the access guard passes that through
/// request extensions.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Account lifecycle orchestration
    pub auth: AuthService,
    /// Refresh token cookie attributes
    pub cookie: CookiePolicy,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Request statistics keyed by route template
    pub metrics: RwLock<HashMap<String, EndpointMetrics>>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig, auth: AuthService) -> Self {
        let cookie = CookiePolicy {
            max_age_secs: auth.tokens().refresh_ttl_secs(),
            secure: config.auth.cookie_secure,
        };

        Self {
            config,
            auth,
            cookie,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Record one completed request
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.metrics
            .write()
            .await
            .entry(endpoint)
            .or_default()
            .observe(status, latency_us);
    }
}
