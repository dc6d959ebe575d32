//! Monitor metrics tracking using OpenTelemetry.

use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::time::Instant;

/// Metrics collector for poll cycles and notifications.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_ini::metrics::MonitorMetrics;
/// use opentelemetry::global;
///
/// let metrics = MonitorMetrics::new(global::meter("hotswap-ini"));
///
/// let timer = metrics.start_poll();
/// // ... scan watched files ...
/// metrics.record_poll(timer, 3);
/// ```
#[derive(Clone)]
pub struct MonitorMetrics {
    poll_cycles: Counter<u64>,
    poll_duration: Histogram<f64>,
    changes_detected: Counter<u64>,
    reparse_failures: Counter<u64>,
    notifications: Counter<u64>,
    watched_files: Gauge<i64>,
    active_subscribers: Gauge<i64>,
}

impl MonitorMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let poll_cycles = meter
            .u64_counter("hotswap_ini.poll.cycles")
            .with_description("Total number of poll cycles")
            .build();

        let poll_duration = meter
            .f64_histogram("hotswap_ini.poll.duration")
            .with_description("Duration of poll cycles in seconds, including callbacks")
            .with_unit("s")
            .build();

        let changes_detected = meter
            .u64_counter("hotswap_ini.changes.detected")
            .with_description("Number of file changes that were reparsed")
            .build();

        let reparse_failures = meter
            .u64_counter("hotswap_ini.reparse.failures")
            .with_description("Number of changed files that could not be read")
            .build();

        let notifications = meter
            .u64_counter("hotswap_ini.notifications")
            .with_description("Number of subscriber callbacks invoked")
            .build();

        let watched_files = meter
            .i64_gauge("hotswap_ini.files.watched")
            .with_description("Number of registered configuration files")
            .build();

        let active_subscribers = meter
            .i64_gauge("hotswap_ini.subscribers.active")
            .with_description("Number of active subscribers across all files")
            .build();

        Self {
            poll_cycles,
            poll_duration,
            changes_detected,
            reparse_failures,
            notifications,
            watched_files,
            active_subscribers,
        }
    }

    /// Start timing a poll cycle.
    pub fn start_poll(&self) -> Instant {
        self.poll_cycles.add(1, &[]);
        Instant::now()
    }

    /// Record the end of a poll cycle that found `changed` modified files.
    pub fn record_poll(&self, start: Instant, changed: usize) {
        self.poll_duration.record(start.elapsed().as_secs_f64(), &[]);
        self.changes_detected.add(changed as u64, &[]);
    }

    /// Record a changed file that could not be reparsed.
    pub fn record_reparse_failure(&self) {
        self.reparse_failures.add(1, &[]);
    }

    /// Record `count` callbacks invoked for one change.
    pub fn record_notifications(&self, count: usize) {
        self.notifications.add(count as u64, &[]);
    }

    /// Update registry size gauges.
    pub fn update_registry(&self, watched: usize, subscribers: usize) {
        self.watched_files.record(watched as i64, &[]);
        self.active_subscribers.record(subscribers as i64, &[]);
    }
}
