// apps/seatbook_server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use seatbook::{EngineConfig, ProofPolicy};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub app_base_url: String,

  pub gateway_base_url: String,
  pub gateway_api_key: String,
  pub gateway_timeout: Duration,
  pub callback_secret: String,
  pub payment_currency: String,

  pub proof_upload_dir: PathBuf,
  pub proof_max_bytes: usize,

  pub processing_expiry_hours: Option<i64>,
  pub reject_inactive_events: bool,
  pub run_migrations: bool,
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let get_or = |var_name: &str, default: &str| get_env(var_name).unwrap_or_else(|_| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var::<u16>("SERVER_PORT", &get_or("SERVER_PORT", "8080"))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let gateway_base_url = get_or("GATEWAY_BASE_URL", "https://api.stripe.com");
    let gateway_api_key = get_or("GATEWAY_API_KEY", "");
    let gateway_timeout = Duration::from_secs(parse_var("GATEWAY_TIMEOUT_SECS", &get_or("GATEWAY_TIMEOUT_SECS", "10"))?);
    let callback_secret = get_env("CALLBACK_SECRET")?;
    if callback_secret.len() < 16 {
      return Err(AppError::Config("CALLBACK_SECRET must be at least 16 bytes".to_string()));
    }
    let payment_currency = get_or("PAYMENT_CURRENCY", "myr").to_lowercase();

    let proof_upload_dir = PathBuf::from(get_or("PROOF_UPLOAD_DIR", "uploads/proofs"));
    let proof_max_bytes = parse_var(
      "PROOF_MAX_BYTES",
      &get_or("PROOF_MAX_BYTES", &seatbook::proof::DEFAULT_MAX_PROOF_BYTES.to_string()),
    )?;

    let processing_expiry_hours = match get_env("PROCESSING_EXPIRY_HOURS") {
      Ok(raw) => Some(parse_var::<i64>("PROCESSING_EXPIRY_HOURS", &raw)?),
      Err(_) => None,
    };
    let reject_inactive_events = parse_var("REJECT_INACTIVE_EVENTS", &get_or("REJECT_INACTIVE_EVENTS", "false"))?;
    let run_migrations = parse_var("RUN_MIGRATIONS", &get_or("RUN_MIGRATIONS", "true"))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      gateway_base_url,
      gateway_api_key,
      gateway_timeout,
      callback_secret,
      payment_currency,
      proof_upload_dir,
      proof_max_bytes,
      processing_expiry_hours,
      reject_inactive_events,
      run_migrations,
    })
  }

  /// The engine settings derived from this configuration.
  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      currency: self.payment_currency.clone(),
      gateway_timeout: self.gateway_timeout,
      callback_base_url: format!("{}/api/v1", self.app_base_url.trim_end_matches('/')),
      callback_secret: self.callback_secret.clone(),
      proof: ProofPolicy {
        max_bytes: self.proof_max_bytes,
        ..ProofPolicy::default()
      },
      processing_expiry: self.processing_expiry_hours.map(chrono::Duration::hours),
      reject_inactive_events: self.reject_inactive_events,
    }
  }
}
