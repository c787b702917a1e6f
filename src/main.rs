use tracing_subscriber::EnvFilter;
use watchdog_registry::{config, server};

#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file = config::load_env_files();
    let config = config::Config::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match env_file {
        Some(path) => tracing::info!(path = %path.display(), "Loaded environment variables"),
        None => tracing::info!("No .env file found, using environment variables and defaults"),
    }

    server::start(config).await?;
    Ok(())
}
