// till/server/src/config.rs

use crate::errors::{AppError, Result}; // Use AppError specific Result
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  // Payment provider credentials; injected into the gateway at startup,
  // never set globally.
  pub stripe_secret_key: String,
  pub stripe_webhook_secret: String,

  /// Currency newly created orders are denominated in.
  pub currency: String,

  /// Apply pending migrations on startup.
  pub run_migrations: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;

    let stripe_secret_key = get_env("STRIPE_SECRET_KEY")?;
    let stripe_webhook_secret = get_env("STRIPE_WEBHOOK_SECRET")?;

    let currency = get_env("ORDER_CURRENCY").unwrap_or_else(|_| "usd".to_string());

    let run_migrations = get_env("RUN_MIGRATIONS")
      .unwrap_or_else(|_| "true".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid RUN_MIGRATIONS value: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      stripe_secret_key,
      stripe_webhook_secret,
      currency,
      run_migrations,
    })
  }
}
