//! Integration tests for the polling change monitor.

use hotswap_ini::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

const BASE_MTIME: u64 = 1_000_000;

fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    rewrite(&path, contents, BASE_MTIME);
    path
}

/// Replace `path` the way editors do: write a sibling, stamp it, rename it
/// into place. The poll loop never sees a half-updated mtime.
fn rewrite(path: &Path, contents: &str, mtime: u64) {
    let staging = path.with_extension("staging");
    fs::write(&staging, contents).unwrap();
    set_mtime(&staging, mtime);
    fs::rename(&staging, path).unwrap();
}

fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
}

fn quiet_monitor() -> MonitorService {
    MonitorService::builder()
        .poll_interval(Duration::from_secs(3600))
        .start()
}

/// Subscribe and forward every `(count, fingerprint)` to a channel.
fn subscribe_channel(
    monitor: &MonitorService,
    tree: &Arc<ConfigTree>,
) -> (SubscriptionId, mpsc::UnboundedReceiver<(u64, String)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = monitor.subscribe(tree, move |tree, count| {
        let _ = tx.send((count, tree.fingerprint()));
    });
    (id, rx)
}

#[tokio::test]
async fn test_subscribe_delivers_initial_state() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "app.ini", "[server]\nport = 8080\n");

    let monitor = quiet_monitor();
    let tree = Arc::new(ConfigTree::open(&path));
    let (_id, mut rx) = subscribe_channel(&monitor, &tree);

    let (count, fingerprint) = rx.try_recv().unwrap();
    assert_eq!(count, 0);
    assert_eq!(fingerprint, tree.fingerprint());

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_force_update_delivers_change_once() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "app.ini", "[server]\nport = 8080\n");

    let monitor = quiet_monitor();
    let tree = Arc::new(ConfigTree::open(&path));
    let (_id, mut rx) = subscribe_channel(&monitor, &tree);
    let (_, initial) = rx.recv().await.unwrap();

    rewrite(&path, "[server]\nport = 9090\n", BASE_MTIME + 1);
    monitor.force_update();

    let (count, fingerprint) = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(count, 1);
    assert_ne!(fingerprint, initial);
    assert_eq!(
        tree.get().section("server").first_value("port").get_u32(0, 0),
        9090
    );

    // Nothing further without another modification
    assert_eq!(monitor.poll_now(), 0);
    assert!(rx.try_recv().is_err());
    assert_eq!(monitor.change_count(&tree), Some(1));

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_equal_or_older_mtime_is_not_a_change() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "app.ini", "[a]\nx = 1\n");

    let monitor = quiet_monitor();
    let tree = Arc::new(ConfigTree::open(&path));
    let (_id, mut rx) = subscribe_channel(&monitor, &tree);
    rx.recv().await.unwrap();

    rewrite(&path, "[a]\nx = 2\n", BASE_MTIME);
    assert_eq!(monitor.poll_now(), 0);

    set_mtime(&path, BASE_MTIME - 10);
    assert_eq!(monitor.poll_now(), 0);

    assert!(rx.try_recv().is_err());
    assert_eq!(monitor.change_count(&tree), Some(0));
    assert_eq!(tree.get().section("a").first_value("x").get_i32(0, 0), 1);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_timer_driven_poll() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "timer.ini", "[a]\nx = 1\n");

    let monitor = MonitorService::builder()
        .poll_interval(Duration::from_millis(20))
        .start();
    let tree = Arc::new(ConfigTree::open(&path));
    let (_id, mut rx) = subscribe_channel(&monitor, &tree);
    rx.recv().await.unwrap();

    rewrite(&path, "[a]\nx = 2\n", BASE_MTIME + 5);

    let (count, _) = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(count, 1);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cosmetic_edit_notifies_with_same_fingerprint() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "cosmetic.ini", "[a]\nx = 1, 2\n");

    let monitor = quiet_monitor();
    let tree = Arc::new(ConfigTree::open(&path));
    let (_id, mut rx) = subscribe_channel(&monitor, &tree);
    let (_, initial) = rx.recv().await.unwrap();

    rewrite(&path, "# reformatted\n\n[a]\n   x=1,2   # same values\n", BASE_MTIME + 1);
    monitor.poll_now();

    let (count, fingerprint) = rx.try_recv().unwrap();
    assert_eq!(count, 1);
    assert_eq!(fingerprint, initial);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_every_subscriber_notified_exactly_once() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "fanout.ini", "[a]\nx = 1\n");

    let monitor = quiet_monitor();
    let tree = Arc::new(ConfigTree::open(&path));

    let counters: Vec<_> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let mut ids = Vec::new();
    for counter in &counters {
        let counter = Arc::clone(counter);
        ids.push(monitor.subscribe(&tree, move |_, count| {
            if count > 0 {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    assert!(monitor.unsubscribe(&tree, ids[1]));

    rewrite(&path, "[a]\nx = 2\n", BASE_MTIME + 1);
    monitor.poll_now();
    monitor.poll_now();

    assert_eq!(counters[0].load(Ordering::SeqCst), 1);
    assert_eq!(counters[1].load(Ordering::SeqCst), 0);
    assert_eq!(counters[2].load(Ordering::SeqCst), 1);

    monitor.clear_subscribers(&tree);
    set_mtime(&path, BASE_MTIME + 2);
    monitor.poll_now();
    assert_eq!(counters[0].load(Ordering::SeqCst), 1);
    assert_eq!(monitor.change_count(&tree), Some(2));

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_panicking_subscriber_does_not_starve_others() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "panics.ini", "[a]\nx = 1\n");

    let monitor = quiet_monitor();
    let tree = Arc::new(ConfigTree::open(&path));

    monitor.subscribe(&tree, |_, count| {
        if count > 0 {
            panic!("subscriber failure");
        }
    });
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = Arc::clone(&hits);
    monitor.subscribe(&tree, move |_, count| {
        if count > 0 {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        }
    });

    rewrite(&path, "[a]\nx = 2\n", BASE_MTIME + 1);
    assert_eq!(monitor.poll_now(), 1);
    assert_eq!(monitor.poll_now(), 0);

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(monitor.change_count(&tree), Some(1));

    // The background loop survives and keeps delivering
    rewrite(&path, "[a]\nx = 3\n", BASE_MTIME + 2);
    monitor.force_update();
    timeout(Duration::from_secs(5), async {
        while hits.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(monitor.change_count(&tree), Some(2));

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_poll_interval_change_applies_from_next_sleep() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "interval.ini", "[a]\nx = 1\n");

    let monitor = quiet_monitor();
    let tree = Arc::new(ConfigTree::open(&path));
    let (_id, mut rx) = subscribe_channel(&monitor, &tree);
    rx.recv().await.unwrap();

    // Let the loop finish its first cycle and enter the long sleep
    tokio::time::sleep(Duration::from_millis(200)).await;

    monitor.set_poll_interval(Duration::from_millis(20));
    rewrite(&path, "[a]\nx = 2\n", BASE_MTIME + 1);

    // The current sleep still uses the old interval
    assert!(timeout(Duration::from_millis(300), rx.recv()).await.is_err());
    assert_eq!(monitor.change_count(&tree), Some(0));

    monitor.force_update();
    let (count, _) = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(count, 1);

    // Later sleeps use the new interval
    rewrite(&path, "[a]\nx = 3\n", BASE_MTIME + 2);
    let (count, _) = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(count, 2);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_only_changed_file_notifies() {
    let temp_dir = TempDir::new().unwrap();
    let first_path = write_config(&temp_dir, "first.ini", "[a]\nx = 1\n");
    let second_path = write_config(&temp_dir, "second.ini", "[b]\ny = 1\n");

    let monitor = quiet_monitor();
    let first = Arc::new(ConfigTree::open(&first_path));
    let second = Arc::new(ConfigTree::open(&second_path));
    let (_, mut first_rx) = subscribe_channel(&monitor, &first);
    let (_, mut second_rx) = subscribe_channel(&monitor, &second);
    first_rx.recv().await.unwrap();
    second_rx.recv().await.unwrap();
    assert_eq!(monitor.watched_count(), 2);

    rewrite(&second_path, "[b]\ny = 2\n", BASE_MTIME + 1);
    monitor.poll_now();

    assert!(first_rx.try_recv().is_err());
    assert_eq!(second_rx.try_recv().unwrap().0, 1);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_deleted_file_keeps_last_state() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "gone.ini", "[a]\nx = 1\n");

    let monitor = quiet_monitor();
    let tree = Arc::new(ConfigTree::open(&path));
    let (_id, mut rx) = subscribe_channel(&monitor, &tree);
    rx.recv().await.unwrap();
    let fingerprint = tree.fingerprint();

    fs::remove_file(&path).unwrap();
    monitor.force_update();
    assert_eq!(monitor.poll_now(), 0);

    assert!(rx.try_recv().is_err());
    assert_eq!(tree.fingerprint(), fingerprint);
    assert_eq!(tree.get().section("a").first_value("x").get_i32(0, 0), 1);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_subscribe() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "shared.ini", "[a]\n");

    let monitor = Arc::new(quiet_monitor());
    let tree = Arc::new(ConfigTree::open(&path));
    let initial_calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let monitor = Arc::clone(&monitor);
            let tree = Arc::clone(&tree);
            let initial_calls = Arc::clone(&initial_calls);
            std::thread::spawn(move || {
                (0..10)
                    .map(|_| {
                        let initial_calls = Arc::clone(&initial_calls);
                        monitor.subscribe(&tree, move |_, count| {
                            if count == 0 {
                                initial_calls.fetch_add(1, Ordering::SeqCst);
                            }
                        })
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 80);
    assert_eq!(initial_calls.load(Ordering::SeqCst), 80);
    assert_eq!(monitor.subscriber_count(&tree), 80);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_is_prompt() {
    let monitor = quiet_monitor();
    let result = timeout(Duration::from_secs(2), monitor.shutdown()).await;
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_shutdown_times_out_behind_blocking_callback() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "slow.ini", "[a]\nx = 1\n");

    let monitor = MonitorService::builder()
        .poll_interval(Duration::from_secs(3600))
        .shutdown_timeout(Duration::from_millis(100))
        .start();
    let tree = Arc::new(ConfigTree::open(&path));

    let (started_tx, mut started_rx) = mpsc::unbounded_channel();
    monitor.subscribe(&tree, move |_, count| {
        if count > 0 {
            let _ = started_tx.send(());
            std::thread::sleep(Duration::from_millis(1500));
        }
    });

    rewrite(&path, "[a]\nx = 2\n", BASE_MTIME + 1);
    monitor.force_update();

    timeout(Duration::from_secs(5), started_rx.recv())
        .await
        .unwrap()
        .unwrap();

    let result = monitor.shutdown().await;
    assert!(matches!(result, Err(ConfigError::ShutdownTimeout(_))));
}

#[tokio::test]
async fn test_settings_drive_builder() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("monitor.toml");
    fs::write(&settings_path, "poll_interval_secs = 7\nshutdown_timeout_secs = 1\n").unwrap();

    let settings = MonitorSettings::load(Some(&settings_path), None).unwrap();
    let monitor = MonitorService::builder().with_settings(&settings).start();
    assert_eq!(monitor.poll_interval(), Duration::from_secs(7));

    monitor.set_poll_interval_secs(2);
    assert_eq!(monitor.poll_interval(), Duration::from_secs(2));

    monitor.shutdown().await.unwrap();
}

#[cfg(feature = "metrics")]
#[tokio::test]
async fn test_metrics_integration() {
    use opentelemetry::global;

    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "metrics.ini", "[a]\nx = 1\n");

    let monitor = MonitorService::builder()
        .poll_interval(Duration::from_secs(3600))
        .with_metrics(global::meter("test"))
        .start();
    let tree = Arc::new(ConfigTree::open(&path));
    monitor.subscribe(&tree, |_, _| {});

    set_mtime(&path, BASE_MTIME + 1);
    monitor.poll_now();
    assert_eq!(monitor.change_count(&tree), Some(1));

    monitor.shutdown().await.unwrap();
}
