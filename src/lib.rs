//! # hotswap-ini
//!
//! INI-style configuration files with content fingerprints and polling
//! hot-reload notifications.
//!
//! ## Overview
//!
//! `hotswap-ini` parses section/key/value files and keeps them in sync with
//! disk for long-running processes:
//! - Lock-free reads of the current parse using `arc-swap`
//! - A fingerprint per section and per file that ignores whitespace,
//!   comments, and declaration order
//! - A polling monitor that reparses changed files and notifies subscribers
//!   exactly once per change
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hotswap_ini::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let monitor = MonitorService::builder().poll_interval_secs(5).start();
//! let tree = Arc::new(ConfigTree::open("config/app.ini"));
//!
//! // Called once right away with count 0, then once per change
//! monitor.subscribe(&tree, |tree, count| {
//!     let state = tree.get();
//!     let port = state.section("server").first_value("port").get_u32(0, 8080);
//!     println!("change #{count}: port {port} ({})", state.fingerprint());
//! });
//!
//! monitor.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## File format
//!
//! ```text
//! ; comments start with ';' or '#'
//! [Server]
//! port  = 8080
//! hosts = a.example, b.example   # values split on ','
//! ```
//!
//! Section and key names are case-insensitive; interior spaces become
//! underscores. Missing sections and keys resolve to empty sentinels, so
//! lookups never fail.
//!
//! ## Feature Flags
//!
//! - `metrics`: OpenTelemetry metrics for poll cycles and notifications

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod sources;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{ConfigSection, ConfigTree, ConfigValue, TreeState};
    pub use crate::error::{ConfigError, Result};
    pub use crate::notify::{MonitorBuilder, MonitorService, SubscriptionId};
    pub use crate::sources::{IniParser, MonitorSettings};
}
