//! Settings for the change monitor, loaded with the `config` crate.

use crate::error::Result;
use config::{Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default number of seconds between poll cycles.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default number of seconds to wait for the poll task to stop.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Monitor tuning knobs.
///
/// Missing fields take their defaults, so an empty file or no file at all
/// is valid.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_ini::sources::MonitorSettings;
/// use std::path::Path;
///
/// # fn example() -> hotswap_ini::error::Result<()> {
/// // MONITOR_POLL_INTERVAL_SECS=2 overrides the file value
/// let settings = MonitorSettings::load(Some(Path::new("monitor.toml")), Some("MONITOR"))?;
/// println!("polling every {:?}", settings.poll_interval());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,
    /// Seconds to wait for the poll task during shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl MonitorSettings {
    /// Load settings from an optional file, then environment overrides.
    ///
    /// The file format is detected from its extension (TOML, JSON, YAML).
    /// With `env_prefix = Some("APP")`, `APP_POLL_INTERVAL_SECS` overrides
    /// `poll_interval_secs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed, or if a value
    /// has the wrong type.
    pub fn load(file: Option<&Path>, env_prefix: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        if let Some(prefix) = env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let settings = builder.build()?.try_deserialize::<Self>()?;
        tracing::debug!(?settings, "loaded monitor settings");
        Ok(settings)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Shutdown timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
