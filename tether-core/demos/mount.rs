//! Mounts a tiny view over reactive data, then writes to it.
//!
//! Run with `RUST_LOG=tether_core=debug` to see captures and notifications.

use serde_json::json;
use tether_core::reactive::{observe, ActiveSubscriber, Watcher};
use tracing_subscriber::EnvFilter;

fn main() -> tether_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data = observe(&json!({ "test": "I am test." })).unwrap_or_default();

    // The watcher is pinned on construction; the render below is its
    // evaluation pass.
    let view = Watcher::new();
    println!("render~ {}", data.get("test").unwrap_or_default());
    ActiveSubscriber::clear();

    data.set("test", "hello,world")?;

    println!(
        "after write: {} (view ran {} time(s))",
        data.get("test").unwrap_or_default(),
        view.update_count()
    );
    Ok(())
}
