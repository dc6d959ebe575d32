//! Configuration change monitoring.
//!
//! A [`MonitorService`] polls registered files and delivers change
//! notifications to subscribers synchronously, exactly once per detected
//! change.

mod builder;
pub mod monitor;
pub mod subscriber;

pub use builder::MonitorBuilder;
pub use monitor::{MIN_POLL_INTERVAL, MonitorService};
pub use subscriber::{SubscriberRegistry, SubscriptionId};
