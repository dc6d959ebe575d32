//! Built-in metrics for the change monitor.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Poll cycles and their duration
//! - Detected changes and failed reparses
//! - Delivered notifications
//! - Watched files and active subscribers
//!
//! # Examples
//!
//! ```rust,no_run
//! use hotswap_ini::prelude::*;
//! use opentelemetry::global;
//!
//! # async fn example() -> Result<()> {
//! let monitor = MonitorService::builder()
//!     .with_metrics(global::meter("my-app"))
//!     .start();
//! # monitor.shutdown().await
//! # }
//! ```

mod monitor_metrics;

pub use monitor_metrics::MonitorMetrics;
