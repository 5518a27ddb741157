// seatbook/src/reference.rs

//! Payment reference formats. References are informational only; nothing parses them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Correlation token stored on a gateway order when it is created.
pub fn gateway_correlation() -> String {
  Uuid::new_v4().to_string()
}

/// `GW-` followed by ten upper-case hex characters.
pub fn gateway_confirmation() -> String {
  let hex = Uuid::new_v4().simple().to_string();
  format!("GW-{}", hex[..10].to_ascii_uppercase())
}

/// Issued when an administrator approves an order that carries no reference.
pub fn admin_approval(manual: bool, at: DateTime<Utc>) -> String {
  let prefix = if manual { "MANUAL" } else { "ADMIN" };
  format!("{}-{}", prefix, at.format("%Y%m%d%H%M%S"))
}
