// till/server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer}; // Renamed web to actix_data
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;
use till_core::{
  OrderStore, PaymentGateway, PgOrderStore, PgTemplateCatalog, PurchaseWorkflow, StripeGateway,
  TemplateCatalog,
};
use till_server::config::AppConfig;
use till_server::state::AppState;
use till_server::web;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing

// Main function
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  // Initialize tracing subscriber for logging
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO) // Default level
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE) // Log when spans close, showing duration
    .init();

  tracing::info!("Starting till server...");

  // Load application configuration
  let app_config = Arc::new(AppConfig::from_env().context("Failed to load application configuration")?);

  // Initialize Database Pool
  let db_pool = PgPool::connect(&app_config.database_url)
    .await
    .context("Failed to connect to the database")?;
  tracing::info!("Successfully connected to the database.");

  if app_config.run_migrations {
    sqlx::migrate!("./migrations")
      .run(&db_pool)
      .await
      .context("Failed to run database migrations")?;
    tracing::info!("Database migrations are up to date.");
  }

  // Wire the domain: Postgres-backed ports behind the purchase workflow, and
  // a Stripe gateway with constructor-injected credentials.
  let orders: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(db_pool.clone()));
  let catalog: Arc<dyn TemplateCatalog> = Arc::new(PgTemplateCatalog::new(db_pool));
  let workflow = Arc::new(PurchaseWorkflow::new(orders, catalog));
  let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(
    app_config.stripe_secret_key.clone(),
    app_config.stripe_webhook_secret.clone(),
  ));

  // Create AppState
  let app_state = AppState {
    workflow,
    gateway,
    config: app_config.clone(),
  };

  // Configure and Start Actix Web Server
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {server_address}"))?
  .run()
  .await
  .context("Server run failed")?;

  Ok(())
}
