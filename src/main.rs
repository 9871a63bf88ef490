//! circuit-guard daemon.
//!
//! ```text
//!   config.toml ──▶ loader ──▶ registry ◀── watcher (hot reload)
//!                                 │
//!                                 ├──▶ admin API (status, reset, force-open)
//!                                 └──▶ metrics exporter
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use circuit_guard::admin::{self, AdminState};
use circuit_guard::config::watcher::ConfigWatcher;
use circuit_guard::config::{load_config, GuardConfig};
use circuit_guard::lifecycle::{signals, startup, Shutdown};
use circuit_guard::observability::{logging, metrics};
use circuit_guard::SystemClock;

#[derive(Parser)]
#[command(name = "circuit-guard")]
#[command(about = "Circuit breaker registry with an operator API", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "CIRCUIT_GUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "circuit-guard starting");

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let registry = startup::build_registry(&config, Arc::new(SystemClock))?;
    let shutdown = Shutdown::new();

    // Keep the watcher alive for the lifetime of the process.
    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let watcher = watcher.run()?;
            let registry = registry.clone();
            let mut stop = shutdown.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        Some(new_config) = updates.recv() => {
                            startup::apply_reload(&registry, &new_config);
                        }
                        _ = stop.recv() => break,
                    }
                }
            });
            Some(watcher)
        }
        _ => None,
    };

    let server = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(registry.clone(), &config.admin.api_key);
        Some(tokio::spawn(admin::serve(listener, state, shutdown.subscribe())))
    } else {
        tracing::info!("Admin API disabled");
        None
    };

    signals::shutdown_on_signal(shutdown.clone()).await;

    if let Some(server) = server {
        server.await??;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
