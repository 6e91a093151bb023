//! # Application State Management
//!
//! Shared state accessed by every HTTP handler and both WebSocket channels.
//! Everything mutable sits behind `Arc<RwLock<T>>` or its own internal lock,
//! so handlers running on different workers can share it freely.
//!
//! ## What lives here:
//! - Runtime configuration (updatable through the config endpoint)
//! - Request metrics (updated by middleware on every request)
//! - The interview stores: invite tokens, candidate profiles, interview
//!   statuses, document storage, and the audio/video rendezvous registry
//! - The analysis hook fired when an interview fully completes

use crate::auth::TokenStore;
use crate::candidates::CandidateDirectory;
use crate::config::AppConfig;
use crate::interview::documents::FsDocumentStore;
use crate::interview::rendezvous::RendezvousRegistry;
use crate::interview::report::{CommandReportGenerator, NoopReportGenerator, ReportGenerator};
use crate::interview::status::InterviewRegistry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state shared across all request handlers.
///
/// ## Thread Safety:
/// Cloning an `AppState` clones `Arc` handles, never the data behind them.
/// Every HTTP worker holds its own clone pointing at the same stores.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics, updated by middleware on every request
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,

    /// Active interview invite tokens
    pub tokens: Arc<TokenStore>,

    /// Candidate profiles keyed by id
    pub candidates: Arc<CandidateDirectory>,

    /// Interview lifecycle statuses keyed by candidate id
    pub interviews: Arc<InterviewRegistry>,

    /// Filesystem store of job descriptions, question banks, and resumes
    pub documents: Arc<FsDocumentStore>,

    /// Per-candidate rendezvous signals between the audio and video channels
    pub rendezvous: Arc<RendezvousRegistry>,

    /// Downstream analysis hook fired when both channels have finished
    pub reports: Arc<dyn ReportGenerator>,
}

/// Performance metrics collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Current number of live interview audio sessions
    pub active_sessions: u32,

    /// Per-endpoint statistics, keyed by "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    /// Number of requests to this specific endpoint
    pub request_count: u64,

    /// Total time spent processing all requests to this endpoint
    pub total_duration_ms: u64,

    /// Number of errors that occurred for this endpoint
    pub error_count: u64,
}

impl AppState {
    /// Create a new AppState from a validated configuration.
    pub fn new(config: AppConfig) -> Self {
        let documents = Arc::new(FsDocumentStore::new(&config.storage.files_dir));
        let reports: Arc<dyn ReportGenerator> = if config.report.analysis_command.trim().is_empty()
        {
            Arc::new(NoopReportGenerator)
        } else {
            Arc::new(CommandReportGenerator::new(
                config.report.analysis_command.clone(),
            ))
        };

        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            tokens: Arc::new(TokenStore::new()),
            candidates: Arc::new(CandidateDirectory::new()),
            interviews: Arc::new(InterviewRegistry::new()),
            documents,
            rendezvous: Arc::new(RendezvousRegistry::new()),
            reports,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(AppConfig::default())
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the lock immediately, so other threads are never
    /// blocked while a handler works with the config.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Increment the total request counter (called by middleware).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (called when any request fails).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// A new interview audio session went live.
    pub fn increment_active_sessions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_sessions += 1;
    }

    /// An interview audio session ended.
    ///
    /// Guards against underflow so a stray double-decrement cannot panic.
    pub fn decrement_active_sessions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_sessions > 0 {
            metrics.active_sessions -= 1;
        }
    }

    /// Get a snapshot of current metrics (used for the /metrics endpoint).
    ///
    /// Clones the data so the lock is not held while the HTTP response is
    /// being serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_sessions: metrics.active_sessions,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint as a fraction (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_counter_never_underflows() {
        let state = AppState::for_tests();
        state.decrement_active_sessions();
        state.increment_active_sessions();
        state.decrement_active_sessions();
        assert_eq!(state.get_metrics_snapshot().active_sessions, 0);
    }

    #[test]
    fn test_endpoint_metrics_accumulate() {
        let state = AppState::for_tests();
        state.record_endpoint_request("GET /api/v1/health", 10, false);
        state.record_endpoint_request("GET /api/v1/health", 30, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["GET /api/v1/health"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.error_count, 1);
        assert!((metric.average_duration_ms() - 20.0).abs() < f64::EPSILON);
        assert!((metric.error_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_config_rejects_invalid() {
        let state = AppState::for_tests();
        let mut bad = AppConfig::default();
        bad.server.port = 0;
        assert!(state.update_config(bad).is_err());
        assert_eq!(state.get_config().server.port, 8080);
    }
}
