//! Parlor — multi-room real-time chat server.
//!
//! Main entry point that wires all crates together and starts the server.

use tracing_subscriber::{EnvFilter, fmt};

use parlor_auth::password::PasswordHasher;
use parlor_cache::PresenceCache;
use parlor_core::config::AppConfig;
use parlor_core::error::AppError;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("PARLOR_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Connect the store (fatal on failure), the cache (tolerated), and serve.
async fn run(config: AppConfig) -> Result<(), AppError> {
    let pool = parlor_database::connect(&config.database).await?;

    parlor_database::migration::run_migrations(&pool).await?;

    let hasher = PasswordHasher::new();
    parlor_database::bootstrap::ensure_default_data(&pool, |password| {
        hasher.hash_password(password)
    })
    .await?;

    // Redis is optional; the cache degrades to a no-op when unreachable.
    let cache = PresenceCache::connect(&config.cache).await;

    parlor_api::run_server(config, pool, cache).await
}
