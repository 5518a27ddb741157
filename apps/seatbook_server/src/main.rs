// apps/seatbook_server/src/main.rs

mod config;
mod db;
mod errors;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::db::{PgCatalog, PgOrderStore};
use crate::services::gateway_client::HttpCheckoutGateway;
use crate::services::proof_storage::FsProofStore;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use seatbook::BookingEngine;
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
  tracing::error!(error = %err, "{}", context);
  io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting seatbook server...");

  let app_config = Arc::new(AppConfig::from_env().map_err(|e| startup_error("Failed to load configuration", e))?);

  let db_pool = PgPoolOptions::new()
    .max_connections(10)
    .connect(&app_config.database_url)
    .await
    .map_err(|e| startup_error("Failed to connect to the database", e))?;
  tracing::info!("Successfully connected to the database.");

  if app_config.run_migrations {
    sqlx::migrate!("./migrations")
      .run(&db_pool)
      .await
      .map_err(|e| startup_error("Failed to run migrations", e))?;
    tracing::info!("Database migrations applied.");
  }

  let gateway = HttpCheckoutGateway::new(
    app_config.gateway_base_url.clone(),
    app_config.gateway_api_key.clone(),
    app_config.gateway_timeout,
  )
  .map_err(|e| startup_error("Failed to build the gateway client", e))?;
  let proofs = FsProofStore::open(app_config.proof_upload_dir.clone())
    .await
    .map_err(|e| startup_error("Failed to prepare the proof directory", e))?;

  let catalog = Arc::new(PgCatalog::new(db_pool.clone()));
  let engine = BookingEngine::new(
    catalog.clone(),
    Arc::new(PgOrderStore::new(db_pool)),
    Arc::new(gateway),
    Arc::new(proofs),
    app_config.engine_config(),
  );

  let app_state = AppState {
    engine: Arc::new(engine),
    catalog,
  };

  // Leave headroom so oversized proofs reach the engine's own size check.
  let upload_limit = app_config.proof_max_bytes + 64 * 1024;
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .app_data(actix_data::PayloadConfig::new(upload_limit))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
