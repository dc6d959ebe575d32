//! Polling change monitor for watched configuration files.

use crate::core::ConfigTree;
use crate::error::{ConfigError, Result};
use crate::notify::{MonitorBuilder, SubscriberRegistry, SubscriptionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

#[cfg(feature = "metrics")]
use crate::metrics::MonitorMetrics;

/// Shortest poll interval the loop will sleep for.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Registry entry for one watched file.
struct WatchedConfig {
    tree: Arc<ConfigTree>,
    change_count: u64,
    subscribers: SubscriberRegistry,
}

/// State shared between the service handle and its poll task.
pub(crate) struct MonitorShared {
    registry: Mutex<HashMap<PathBuf, WatchedConfig>>,
    poll_interval_ms: AtomicU64,
    force_update: Notify,
    #[cfg(feature = "metrics")]
    metrics: Option<MonitorMetrics>,
}

impl MonitorShared {
    pub(crate) fn new(poll_interval: Duration) -> Self {
        let shared = Self {
            registry: Mutex::new(HashMap::new()),
            poll_interval_ms: AtomicU64::new(0),
            force_update: Notify::new(),
            #[cfg(feature = "metrics")]
            metrics: None,
        };
        shared.set_poll_interval(poll_interval);
        shared
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn set_metrics(&mut self, metrics: MonitorMetrics) {
        self.metrics = Some(metrics);
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.load(Ordering::Relaxed))
    }

    fn set_poll_interval(&self, interval: Duration) {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.poll_interval_ms.store(millis, Ordering::Relaxed);
    }

    /// Scan every watched file once, reparsing and notifying on change.
    ///
    /// Holds the registry lock for the whole scan, callbacks included.
    fn poll_cycle(&self) -> usize {
        #[cfg(feature = "metrics")]
        let timer = self.metrics.as_ref().map(MonitorMetrics::start_poll);

        let mut registry = self.registry.lock();
        let mut changed = 0;

        for (path, watched) in registry.iter_mut() {
            let on_disk = match fs::metadata(path).and_then(|meta| meta.modified()) {
                Ok(time) => time,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "stat failed, skipping");
                    continue;
                }
            };

            if !watched.tree.is_modified_since(on_disk) {
                continue;
            }

            if let Err(e) = watched.tree.reparse() {
                tracing::warn!(path = %path.display(), error = %e, "changed file could not be reparsed");
                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics.record_reparse_failure();
                }
                continue;
            }

            watched.change_count += 1;
            tracing::info!(
                path = %path.display(),
                count = watched.change_count,
                fingerprint = %watched.tree.fingerprint(),
                subscribers = watched.subscribers.len(),
                "configuration changed"
            );

            let _notified = watched
                .subscribers
                .notify_all(&watched.tree, watched.change_count);
            #[cfg(feature = "metrics")]
            if let Some(metrics) = &self.metrics {
                metrics.record_notifications(_notified);
            }

            changed += 1;
        }

        #[cfg(feature = "metrics")]
        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            metrics.record_poll(timer, changed);
        }

        changed
    }

    #[cfg(feature = "metrics")]
    fn update_gauges(&self, registry: &HashMap<PathBuf, WatchedConfig>) {
        if let Some(metrics) = &self.metrics {
            let subscribers = registry.values().map(|w| w.subscribers.len()).sum();
            metrics.update_registry(registry.len(), subscribers);
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn update_gauges(&self, _registry: &HashMap<PathBuf, WatchedConfig>) {}
}

/// Get the entry for `tree`, creating it if the path is not yet watched.
fn watched_entry<'a>(
    registry: &'a mut HashMap<PathBuf, WatchedConfig>,
    tree: &Arc<ConfigTree>,
) -> &'a mut WatchedConfig {
    registry
        .entry(tree.path().to_path_buf())
        .or_insert_with(|| {
            tracing::info!(path = %tree.path().display(), "watching configuration");
            WatchedConfig {
                tree: Arc::clone(tree),
                change_count: 0,
                subscribers: SubscriberRegistry::new(),
            }
        })
}

/// Background service that polls watched files and notifies subscribers.
///
/// One task runs the poll loop for the lifetime of the service. Every
/// registry operation and every poll cycle takes the same lock, so
/// subscriber callbacks run with that lock held. Callbacks must return
/// quickly and must not call back into the monitor; a slow callback delays
/// polling of every file and blocks concurrent `subscribe` calls.
///
/// Entries are keyed by path. A second tree opened on an already watched
/// path shares the first tree's entry, and callbacks receive the first tree.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_ini::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<()> {
/// let monitor = MonitorService::builder()
///     .poll_interval(Duration::from_secs(5))
///     .start();
///
/// let tree = Arc::new(ConfigTree::open("config/app.ini"));
/// let id = monitor.subscribe(&tree, |tree, count| {
///     println!("{} is at version {} ({})", tree.name(), count, tree.fingerprint());
/// });
///
/// // ... later
/// monitor.unsubscribe(&tree, id);
/// monitor.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct MonitorService {
    shared: Arc<MonitorShared>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown_timeout: Duration,
}

impl MonitorService {
    /// Create a builder for configuring and starting a monitor.
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// Spawn the poll task on the current tokio runtime.
    pub(crate) fn spawn(shared: MonitorShared, shutdown_timeout: Duration) -> Self {
        let shared = Arc::new(shared);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_poll_loop(Arc::clone(&shared), shutdown_rx));

        Self {
            shared,
            shutdown,
            task: Mutex::new(Some(task)),
            shutdown_timeout,
        }
    }

    /// Start watching `tree` if its path is not watched yet.
    pub fn register(&self, tree: &Arc<ConfigTree>) {
        let mut registry = self.shared.registry.lock();
        watched_entry(&mut registry, tree);
        self.shared.update_gauges(&registry);
    }

    /// Subscribe `callback` to changes of `tree`, registering it if needed.
    ///
    /// The callback is invoked once before this returns, with the current
    /// tree and a change count of 0. After that it runs once per detected
    /// change with the entry's incremented change count.
    pub fn subscribe<F>(&self, tree: &Arc<ConfigTree>, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<ConfigTree>, u64) + Send + Sync + 'static,
    {
        let id = SubscriptionId::allocate();

        let mut registry = self.shared.registry.lock();
        let watched = watched_entry(&mut registry, tree);
        callback(&watched.tree, 0);
        watched.subscribers.insert(id, callback);

        tracing::debug!(path = %tree.path().display(), %id, "subscribed");
        self.shared.update_gauges(&registry);
        id
    }

    /// Remove one subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, tree: &ConfigTree, id: SubscriptionId) -> bool {
        let mut registry = self.shared.registry.lock();
        let removed = registry
            .get_mut(tree.path())
            .is_some_and(|watched| watched.subscribers.remove(id));

        if removed {
            tracing::debug!(path = %tree.path().display(), %id, "unsubscribed");
        }
        self.shared.update_gauges(&registry);
        removed
    }

    /// Remove every subscription for `tree`. The file stays watched.
    pub fn clear_subscribers(&self, tree: &ConfigTree) {
        let mut registry = self.shared.registry.lock();
        if let Some(watched) = registry.get_mut(tree.path()) {
            watched.subscribers.clear();
            tracing::debug!(path = %tree.path().display(), "cleared subscribers");
        }
        self.shared.update_gauges(&registry);
    }

    /// Set the poll interval in seconds. Applies from the next sleep on.
    pub fn set_poll_interval_secs(&self, secs: u64) {
        self.set_poll_interval(Duration::from_secs(secs));
    }

    /// Set the poll interval. Values below [`MIN_POLL_INTERVAL`] are raised
    /// to it. Applies from the next sleep on.
    pub fn set_poll_interval(&self, interval: Duration) {
        self.shared.set_poll_interval(interval);
        tracing::debug!(interval = ?self.shared.poll_interval(), "poll interval updated");
    }

    /// Current poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.shared.poll_interval()
    }

    /// Wake the poll task for an immediate cycle.
    ///
    /// Does not wait for the cycle. A request made while a cycle is running
    /// triggers another cycle right after it.
    pub fn force_update(&self) {
        self.shared.force_update.notify_one();
    }

    /// Run one poll cycle on the calling thread.
    ///
    /// Blocks on the registry lock and on file I/O. Returns the number of
    /// files found changed and reparsed.
    pub fn poll_now(&self) -> usize {
        self.shared.poll_cycle()
    }

    /// Number of changes detected for `tree`, or `None` if it is not watched.
    pub fn change_count(&self, tree: &ConfigTree) -> Option<u64> {
        self.shared
            .registry
            .lock()
            .get(tree.path())
            .map(|watched| watched.change_count)
    }

    /// Number of subscribers for `tree`.
    pub fn subscriber_count(&self, tree: &ConfigTree) -> usize {
        self.shared
            .registry
            .lock()
            .get(tree.path())
            .map_or(0, |watched| watched.subscribers.len())
    }

    /// Number of watched files.
    pub fn watched_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    /// Stop the poll task and wait for it to finish.
    ///
    /// Calling this more than once is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ShutdownTimeout`] if the task does not stop
    /// within the configured timeout, or [`ConfigError::ShutdownFailed`] if
    /// it panicked. Both mean the monitor is in an unknown state and should
    /// be treated as fatal.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown.send_replace(true);

        let task = self.task.lock().take();
        let Some(task) = task else {
            return Ok(());
        };

        match tokio::time::timeout(self.shutdown_timeout, task).await {
            Ok(Ok(())) => {
                tracing::info!("monitor stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "monitor task failed");
                Err(ConfigError::ShutdownFailed(e.to_string()))
            }
            Err(_) => {
                tracing::error!(timeout = ?self.shutdown_timeout, "monitor did not stop in time");
                Err(ConfigError::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }
}

impl Drop for MonitorService {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

/// The poll loop: one cycle, then sleep until the interval elapses, an
/// update is forced, or shutdown is requested.
async fn run_poll_loop(shared: Arc<MonitorShared>, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(interval = ?shared.poll_interval(), "monitor started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let cycle = Arc::clone(&shared);
        if let Err(e) = tokio::task::spawn_blocking(move || cycle.poll_cycle()).await {
            tracing::error!(error = %e, "poll cycle panicked");
        }

        let interval = shared.poll_interval();
        tokio::select! {
            _ = shared.force_update.notified() => {
                tracing::debug!("forced poll cycle");
            }
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("poll loop exited");
}
