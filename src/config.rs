//! Configuration from the environment
//!
//! Values can also come from a `.env` file, see [`load_dotenv`]. Empty variables are treated as
//! unset.

use std::env::var;
use std::net::SocketAddr;

use anyhow::Result;

use crate::password::generate;

/// Default address to listen on
const DEFAULT_ADDRESS: &str = "0.0.0.0:6000";

/// Service configuration
#[derive(Debug)]
pub struct Config {
    /// Address to bind the HTTP listener to
    pub address: SocketAddr,

    /// Postgres connection string, the memory storage is used without it
    pub database_url: Option<String>,

    /// Secret to sign access tokens with
    pub jwt_secret: String,
}

impl Config {
    /// Read the configuration from the environment
    ///
    /// # Errors
    ///
    /// Will return `Err` when `ADDRESS` or `PORT` can not be parsed
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            address: address()?,
            database_url: env_var("DATABASE_URL"),
            jwt_secret: jwt_secret(),
        })
    }
}

/// Load a `.env` file when there is one
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Get the value of an ENV var, only when it is set and not empty
pub fn env_var(var_name: &str) -> Option<String> {
    var(var_name).ok().filter(|value| !value.is_empty())
}

/// Get the value of an ENV var, or a default
pub fn env_var_or_else(var_name: &str, or_else: impl FnOnce() -> String) -> String {
    env_var(var_name).unwrap_or_else(or_else)
}

/// Secret for the access tokens, generated for this process when not configured
pub fn jwt_secret() -> String {
    env_var_or_else("JWT_SECRET", || {
        let jwt_secret = generate();
        tracing::info!("`JWT_SECRET` is not set, generating temporary one: {jwt_secret}");
        jwt_secret
    })
}

fn address() -> Result<SocketAddr> {
    let mut address = env_var_or_else("ADDRESS", || DEFAULT_ADDRESS.to_string())
        .parse::<SocketAddr>()?;

    // optional override of just the port
    if let Some(port) = env_var("PORT") {
        address.set_port(port.parse::<u16>()?);
    }

    Ok(address)
}
