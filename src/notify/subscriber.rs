//! Subscriber callbacks for a single watched configuration.

use crate::core::ConfigTree;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

type ChangeCallback = Box<dyn Fn(&Arc<ConfigTree>, u64) + Send + Sync>;

/// Identifies one subscription for later removal.
///
/// Ids come from a process-wide counter, so they never repeat within a
/// process even across independent monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocate a fresh id.
    pub fn allocate() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callbacks registered for one watched file.
///
/// Callbacks run in subscription order. The registry itself is not
/// synchronized; the monitor keeps it behind its registry lock.
///
/// # Examples
///
/// ```rust
/// use hotswap_ini::core::ConfigTree;
/// use hotswap_ini::notify::{SubscriberRegistry, SubscriptionId};
/// use std::sync::Arc;
///
/// let mut registry = SubscriberRegistry::new();
/// let tree = Arc::new(ConfigTree::open("missing.ini"));
///
/// registry.insert(SubscriptionId::allocate(), |tree, count| {
///     println!("{} changed ({})", tree.name(), count);
/// });
///
/// assert_eq!(registry.notify_all(&tree, 1), 1);
/// ```
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: BTreeMap<SubscriptionId, ChangeCallback>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `id`.
    pub fn insert<F>(&mut self, id: SubscriptionId, callback: F)
    where
        F: Fn(&Arc<ConfigTree>, u64) + Send + Sync + 'static,
    {
        self.subscribers.insert(id, Box::new(callback));
    }

    /// Remove a subscription. Returns `false` if it was not present.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Remove every subscription.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Invoke every callback once with `(tree, change_count)`.
    ///
    /// A panicking callback is logged and does not stop the remaining ones.
    /// Returns the number of callbacks invoked.
    pub fn notify_all(&self, tree: &Arc<ConfigTree>, change_count: u64) -> usize {
        for (id, callback) in &self.subscribers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| callback(tree, change_count)));
            if let Err(payload) = result {
                tracing::error!(
                    %id,
                    path = %tree.path().display(),
                    count = change_count,
                    panic = panic_message(payload.as_ref()),
                    "subscriber panicked"
                );
            }
        }
        self.subscribers.len()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("ids", &self.subscribers.keys().collect::<Vec<_>>())
            .finish()
    }
}
