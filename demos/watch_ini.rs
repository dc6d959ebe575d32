//! Example watching an INI file and printing each change.
//!
//! This example shows how to:
//! - Start a polling monitor from `MonitorSettings`
//! - Subscribe to a file and read values from the current snapshot
//! - Shut the monitor down cleanly on Ctrl-C
//!
//! Run with: cargo run --example watch_ini -- [path/to/file.ini]
//!
//! While running, edit the file to see change notifications. Set
//! `WATCH_INI_POLL_INTERVAL_SECS=1` for faster polling and
//! `RUST_LOG=hotswap_ini=debug` for poll-loop logging.

use hotswap_ini::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SAMPLE: &str = "\
; sample configuration written by the watch_ini example
[Server]
port  = 8080
hosts = a.example, b.example   # comma separated

[Feature Flags]
new_ui = false
";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hotswap_ini=info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("watch_ini.ini"));

    if !path.exists() {
        std::fs::write(&path, SAMPLE)?;
        println!("Wrote sample config to {}", path.display());
    }

    let settings = MonitorSettings::load(None, Some("WATCH_INI"))?;
    let monitor = MonitorService::builder().with_settings(&settings).start();

    let tree = Arc::new(ConfigTree::open(&path));
    println!("{tree}");

    monitor.subscribe(&tree, |tree, count| {
        let state = tree.get();
        let server = state.section("server");
        println!(
            "[change #{count}] fingerprint {} | port {} | hosts {:?} | new_ui {}",
            state.fingerprint(),
            server.first_value("port").get_u32(0, 8080),
            server.first_value("hosts").values(),
            state.section("feature flags").first_value("new_ui").get_bool(0, false),
        );
    });

    println!("Watching {} (Ctrl-C to stop)", path.display());
    tokio::signal::ctrl_c().await?;

    monitor.shutdown().await?;
    println!("Monitor stopped");
    Ok(())
}
