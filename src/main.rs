#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use anyhow::Result;
use axum::Extension;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::api::JwtKeys;
use crate::api::router;
use crate::config::Config;
use crate::config::env_var_or_else;
use crate::config::load_dotenv;
use crate::storage::Backend;
use crate::storage::Storage;
use crate::users::ensure_initial_user;

mod api;
mod config;
mod contacts;
mod graceful_shutdown;
mod leads;
mod meetings;
mod password;
mod policy;
mod storage;
#[cfg(test)]
mod tests;
mod users;

const DEFAULT_RUST_LOG: &str = "meetings=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    setup_tracing();

    let config = Config::from_env()?;

    let app = setup_app(
        storage::Config::DetectConfig(config.database_url),
        &config.jwt_secret,
    )
    .await?;

    let listener = TcpListener::bind(config.address).await?;
    tracing::info!("Listening on {}", config.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown::handler())
        .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` if any of its dependencies fail to load:
/// - Database connection or migrations
/// - Initial user setup
pub async fn setup_app(storage_config: storage::Config, jwt_secret: &str) -> Result<Router> {
    let jwt_keys = JwtKeys::new(jwt_secret.as_bytes());

    let app = match storage::setup(storage_config).await? {
        Backend::Memory(memory) => create_router(memory, jwt_keys).await?,
        Backend::Postgres(postgres) => create_router(postgres, jwt_keys).await?,
    };

    Ok(app)
}

/// Create the router for a storage backend
async fn create_router<S: Storage>(storage: S, jwt_keys: JwtKeys) -> Result<Router> {
    ensure_initial_user(&storage).await?;

    Ok(Router::new()
        .nest("/api", router::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(storage))
        .layer(Extension(jwt_keys)))
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(env_var_or_else("RUST_LOG", || {
            DEFAULT_RUST_LOG.to_string()
        })))
        .with(fmt::layer())
        .init();
}
