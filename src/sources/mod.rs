//! Where configuration comes from: the file parser and monitor settings.

mod parser;
mod settings;

pub use parser::IniParser;
pub use settings::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SHUTDOWN_TIMEOUT_SECS, MonitorSettings};
