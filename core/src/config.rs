// seatbook/src/config.rs
use crate::proof::ProofPolicy;
use chrono::Duration as ChronoDuration;
use std::time::Duration;

/// Tunables for a `BookingEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// ISO currency code sent to the gateway, lower-case.
  pub currency: String,
  /// Upper bound on one `create_checkout_session` call.
  pub gateway_timeout: Duration,
  /// Base of the success/cancel URLs handed to the gateway, without a trailing slash.
  pub callback_base_url: String,
  pub callback_secret: String,
  pub proof: ProofPolicy,
  /// Age after which a manual order still in `processing` is reported as stale.
  /// `None` disables the report.
  pub processing_expiry: Option<ChronoDuration>,
  /// Refuse bookings for events that are not `active`.
  pub reject_inactive_events: bool,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      currency: "myr".to_string(),
      gateway_timeout: Duration::from_secs(10),
      callback_base_url: "http://127.0.0.1:8080/api/v1".to_string(),
      callback_secret: "change-me".to_string(),
      proof: ProofPolicy::default(),
      processing_expiry: None,
      reject_inactive_events: false,
    }
  }
}

impl EngineConfig {
  pub fn success_url(&self, order_id: uuid::Uuid, token: &str) -> String {
    format!(
      "{}/payments/gateway/{}/success?token={}",
      self.callback_base_url.trim_end_matches('/'),
      order_id,
      token
    )
  }

  pub fn cancel_url(&self, order_id: uuid::Uuid, token: &str) -> String {
    format!(
      "{}/payments/gateway/{}/cancel?token={}",
      self.callback_base_url.trim_end_matches('/'),
      order_id,
      token
    )
  }
}
