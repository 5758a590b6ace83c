//! Application state
//!
//! Shared state for API handlers: the data source tracker plus read-only
//! operational handles.

use std::sync::Arc;
use std::time::Instant;

use aircap_datasource::DataSourceTracker;
use aircap_pipeline::ChainMetricsHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The data source supervisor all handlers delegate to
    pub tracker: Arc<DataSourceTracker>,

    /// Packet chain counters for the metrics endpoint
    pub chain_metrics: Option<ChainMetricsHandle>,

    /// Server start time for uptime reporting
    pub start_time: Instant,
}

impl AppState {
    /// Create application state around a tracker
    pub fn new(tracker: Arc<DataSourceTracker>) -> Self {
        Self {
            tracker,
            chain_metrics: None,
            start_time: Instant::now(),
        }
    }

    /// Attach packet chain metrics
    pub fn with_chain_metrics(mut self, handle: ChainMetricsHandle) -> Self {
        self.chain_metrics = Some(handle);
        self
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
