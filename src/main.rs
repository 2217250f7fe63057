//! backcache console.
//!
//! Reads cache commands from stdin and publishes them on the global event bus.

use std::io;

use tracing::info;
use tracing_subscriber::EnvFilter;

use backcache::config::Config;
use backcache::console::Console;
use backcache::events::EventBus;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("backcache=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    info!("Starting backcache console...");

    let config = Config::from_env();
    info!("Configuration loaded successfully");
    info!("Storage type: {}", config.storage_type);

    let mut console = Console::new(&config, EventBus::global());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    console.run(stdin.lock(), &mut stdout)?;

    info!("Console closed");
    Ok(())
}
