use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use throttler::config::{LoggingConfig, ThrottlerConfig};
use throttler::{Throttle, ThrottleRegistry};

/// Push a burst of concurrent tasks through a named throttle.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a YAML configuration file
    config: Option<PathBuf>,

    /// Name of the throttle to drive
    #[arg(long, default_value = "default")]
    name: String,

    /// Number of concurrent calls
    #[arg(long, default_value_t = 20)]
    calls: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ThrottlerConfig::from_file(path)?,
        None => ThrottlerConfig::default(),
    };
    init_tracing(&config.logging);

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let registry = ThrottleRegistry::from_config(&config)?;
    let limiter = registry.get_or_default(&args.name);
    info!(
        name = %args.name,
        rate_limit = limiter.rate_limit(),
        period = ?limiter.period(),
        calls = args.calls,
        "Driving throttle"
    );

    let throttle: Arc<dyn Throttle> = limiter;
    tokio::select! {
        _ = drive(throttle, args.calls) => {
            info!("All calls admitted");
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, abandoning waiting calls");
        }
    }

    Ok(())
}

/// Run `calls` concurrent tasks, each bracketed by acquire/release.
async fn drive(throttle: Arc<dyn Throttle>, calls: usize) {
    let start = Instant::now();

    let tasks = (0..calls).map(|call| {
        let throttle = Arc::clone(&throttle);
        async move {
            throttle.acquire().await;
            info!(
                call = call,
                offset_ms = start.elapsed().as_millis() as u64,
                "Admitted"
            );
            throttle.release();
        }
    });

    futures::future::join_all(tasks).await;
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
