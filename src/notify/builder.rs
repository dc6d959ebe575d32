//! Builder for constructing MonitorService instances.

use crate::notify::MonitorService;
use crate::notify::monitor::MonitorShared;
use crate::sources::MonitorSettings;
use std::time::Duration;

#[cfg(feature = "metrics")]
use crate::metrics::MonitorMetrics;

/// Builder for a [`MonitorService`].
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_ini::prelude::*;
/// use std::time::Duration;
///
/// # async fn example() -> Result<()> {
/// let settings = MonitorSettings::load(None, Some("APP"))?;
///
/// let monitor = MonitorService::builder()
///     .with_settings(&settings)
///     .shutdown_timeout(Duration::from_secs(2))
///     .start();
/// # monitor.shutdown().await
/// # }
/// ```
pub struct MonitorBuilder {
    poll_interval: Duration,
    shutdown_timeout: Duration,
    #[cfg(feature = "metrics")]
    metrics: Option<MonitorMetrics>,
}

impl MonitorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        let defaults = MonitorSettings::default();
        Self {
            poll_interval: defaults.poll_interval(),
            shutdown_timeout: defaults.shutdown_timeout(),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Take the poll interval and shutdown timeout from loaded settings.
    pub fn with_settings(mut self, settings: &MonitorSettings) -> Self {
        self.poll_interval = settings.poll_interval();
        self.shutdown_timeout = settings.shutdown_timeout();
        self
    }

    /// Time between poll cycles.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Time between poll cycles, in seconds.
    pub fn poll_interval_secs(self, secs: u64) -> Self {
        self.poll_interval(Duration::from_secs(secs))
    }

    /// How long [`MonitorService::shutdown`] waits for the poll task.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Record poll and notification metrics with `meter`.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(MonitorMetrics::new(meter));
        self
    }

    /// Start the monitor's poll task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn start(self) -> MonitorService {
        #[allow(unused_mut)]
        let mut shared = MonitorShared::new(self.poll_interval);

        #[cfg(feature = "metrics")]
        if let Some(metrics) = self.metrics {
            shared.set_metrics(metrics);
        }

        MonitorService::spawn(shared, self.shutdown_timeout)
    }
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
