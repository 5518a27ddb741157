// seatbook/src/gateway.rs

//! Port to the redirect-based checkout gateway, plus the signed tokens that bind
//! a gateway callback to the order and the outcome it was issued for.

use crate::catalog::{Event, MealOption};
use crate::error::GatewayError;
use crate::order::Order;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
  pub name: String,
  pub description: Option<String>,
  /// Price in minor currency units (cents).
  pub unit_amount: i64,
  pub quantity: u32,
  pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
  pub order_id: Uuid,
  pub line_items: Vec<LineItem>,
  pub success_url: String,
  pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
  pub session_id: String,
  pub redirect_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError>;
}

/// Converts a decimal amount to minor units, rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
  (amount * Decimal::ONE_HUNDRED)
    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    .to_i64()
}

/// The order's snapshotted fee and admin fee as two separate lines.
pub fn line_items_for(order: &Order, event: &Event, meal: &MealOption, currency: &str) -> Option<Vec<LineItem>> {
  Some(vec![
    LineItem {
      name: format!("{} - {}", event.title, meal.name),
      description: Some(format!("Event on {}", event.starts_at.format("%B %d, %Y"))),
      unit_amount: to_minor_units(order.amount)?,
      quantity: 1,
      currency: currency.to_string(),
    },
    LineItem {
      name: "Admin Fee".to_string(),
      description: None,
      unit_amount: to_minor_units(order.admin_fee)?,
      quantity: 1,
      currency: currency.to_string(),
    },
  ])
}

/// Which of the two redirect URLs a callback token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackOutcome {
  Success,
  Cancel,
}

impl CallbackOutcome {
  pub fn as_str(self) -> &'static str {
    match self {
      CallbackOutcome::Success => "success",
      CallbackOutcome::Cancel => "cancel",
    }
  }
}

impl std::fmt::Display for CallbackOutcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Issues and checks the token carried by gateway callback URLs. The success
/// and cancel URLs of one order carry different tokens.
#[derive(Clone)]
pub struct CallbackSigner {
  secret: Vec<u8>,
}

impl std::fmt::Debug for CallbackSigner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CallbackSigner").finish_non_exhaustive()
  }
}

impl CallbackSigner {
  pub fn new(secret: impl AsRef<[u8]>) -> Self {
    Self {
      secret: secret.as_ref().to_vec(),
    }
  }

  fn mac_for(&self, order_id: Uuid, outcome: CallbackOutcome) -> HmacSha256 {
    let mut mac = match HmacSha256::new_from_slice(&self.secret) {
      Ok(mac) => mac,
      Err(_) => unreachable!("HMAC-SHA256 takes keys of any length"),
    };
    mac.update(b"gateway-callback\n");
    mac.update(outcome.as_str().as_bytes());
    mac.update(b"\n");
    mac.update(order_id.to_string().as_bytes());
    mac
  }

  pub fn sign(&self, order_id: Uuid, outcome: CallbackOutcome) -> String {
    URL_SAFE_NO_PAD.encode(self.mac_for(order_id, outcome).finalize().into_bytes())
  }

  /// Constant-time check of `token` against the one issued for `order_id` and `outcome`.
  pub fn verify(&self, order_id: Uuid, outcome: CallbackOutcome, token: &str) -> bool {
    match URL_SAFE_NO_PAD.decode(token) {
      Ok(bytes) => self.mac_for(order_id, outcome).verify_slice(&bytes).is_ok(),
      Err(_) => false,
    }
  }
}
