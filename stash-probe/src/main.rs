use shared::config::Config;
use shared::Key;
use stash::{ExpiringRecord, Initialised};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const PROBE_KEY: &str = "stash-probe";
const PROBE_TTL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    info!(
        "Initialising cache (use_remote: {}, address: '{}')",
        config.use_remote, config.remote_addr
    );

    let Initialised { cache, ready } =
        storage_engine::initialise(&config.remote_addr, config.use_remote).await?;

    if ready {
        info!("Cache ready on {} backend", cache.kind());
    } else {
        warn!("Requested backend unavailable, running on {} backend", cache.kind());
    }

    // Round trip through the active backend; the record expires on its own
    let record = ExpiringRecord::new(PROBE_KEY, "PONG", PROBE_TTL)?;
    let key = Key::new(PROBE_KEY)?;
    cache.store_expiring_record(record).await?;

    match cache.read_cache(&key).await {
        Ok(read) => info!("Probe record read back (found: {}, value: {:?})", read.found, read.value),
        Err(e) => {
            error!("Probe record could not be read back: {}", e);
            return Err(e.into());
        }
    }

    let deleted = cache.delete_from_cache(&key).await?;
    info!("Probe record removed (existed: {})", deleted.existed);

    Ok(())
}
