// seatbook/src/order.rs

//! The order record and its status state machine.
//!
//! ```text
//! pending    --gateway success / admin approve--> paid
//! pending    --gateway cancel / gateway error---> failed
//! processing --admin approve--------------------> paid
//! processing --admin reject---------------------> failed
//! ```
//! `paid` and `failed` are terminal. `cancelled` is set only by event-level
//! cancellation outside this crate and is never a transition target here.

use crate::catalog::{Event, MealOption};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Paid,
  Failed,
  Cancelled,
}

/// What applying a target status to a current status amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// The status changes.
  Applied,
  /// Already in the target status; nothing to write.
  Unchanged,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Paid,
    OrderStatus::Failed,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Processing => "processing",
      OrderStatus::Paid => "paid",
      OrderStatus::Failed => "failed",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Paid | OrderStatus::Failed)
  }

  /// True if the state machine has an edge from `self` to `target`.
  pub fn can_transition_to(self, target: OrderStatus) -> bool {
    use OrderStatus::*;
    match (self, target) {
      (Pending, Paid | Failed) => true,
      (Processing, Paid | Failed) => true,
      (Pending | Processing, Pending | Processing | Cancelled) => false,
      (Paid | Failed | Cancelled, _) => false,
    }
  }

  /// Plans a move to `target`. Re-applying the current status is a no-op so
  /// redelivered callbacks stay harmless; every other move off an edge is `None`.
  pub fn plan(self, target: OrderStatus) -> Option<Transition> {
    if self == target {
      Some(Transition::Unchanged)
    } else if self.can_transition_to(target) {
      Some(Transition::Applied)
    } else {
      None
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
  type Err = UnknownStatus;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| UnknownStatus(s.to_string()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  /// Redirect-based checkout gateway.
  Gateway,
  /// Uploaded proof of an out-of-band payment, reviewed by an administrator.
  Manual,
}

impl PaymentMethod {
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentMethod::Gateway => "gateway",
      PaymentMethod::Manual => "manual",
    }
  }

  /// The status a freshly created order starts in.
  pub fn initial_status(self) -> OrderStatus {
    match self {
      PaymentMethod::Gateway => OrderStatus::Pending,
      PaymentMethod::Manual => OrderStatus::Processing,
    }
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentMethod {
  type Err = UnknownStatus;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "gateway" => Ok(PaymentMethod::Gateway),
      "manual" => Ok(PaymentMethod::Manual),
      other => Err(UnknownStatus(other.to_string())),
    }
  }
}

/// A booking of one seat at one event.
///
/// `amount` and `admin_fee` are copied from the event when the order is created
/// and never follow later edits to the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub event_id: Uuid,
  pub meal_option_id: Uuid,
  pub amount: Decimal,
  pub admin_fee: Decimal,
  /// `None` only for rows written before the method was recorded.
  pub payment_method: Option<PaymentMethod>,
  pub payment_reference: Option<String>,
  pub proof_reference: Option<String>,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}

impl Order {
  /// Builds a new order for `user_id`, snapshotting the event's fees.
  ///
  /// The caller is responsible for having checked that `meal` belongs to `event`.
  pub fn snapshot(user_id: Uuid, event: &Event, meal: &MealOption, method: PaymentMethod, now: DateTime<Utc>) -> Self {
    let payment_reference = match method {
      PaymentMethod::Gateway => Some(crate::reference::gateway_correlation()),
      PaymentMethod::Manual => None,
    };

    Order {
      id: Uuid::new_v4(),
      user_id,
      event_id: event.id,
      meal_option_id: meal.id,
      amount: event.fee,
      admin_fee: event.admin_fee,
      payment_method: Some(method),
      payment_reference,
      proof_reference: None,
      status: method.initial_status(),
      created_at: now,
    }
  }

  /// Total payable, always recomputed from the snapshot fields.
  pub fn total(&self) -> Decimal {
    self.amount + self.admin_fee
  }

  pub fn is_manual(&self) -> bool {
    self.payment_method == Some(PaymentMethod::Manual)
  }

  pub fn is_owned_by(&self, user_id: Uuid) -> bool {
    self.user_id == user_id
  }

  /// A manual order still waiting for review whose proof never got stored.
  pub fn is_missing_proof(&self) -> bool {
    self.is_manual() && self.status == OrderStatus::Processing && self.proof_reference.is_none()
  }
}

/// A single status change, applied by an `OrderStore` as a compare-and-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
  pub order_id: Uuid,
  pub expected: OrderStatus,
  pub target: OrderStatus,
  /// Replaces the payment reference when set.
  pub payment_reference: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use super::OrderStatus::*;

  #[test]
  fn only_forward_edges_are_allowed() {
    let allowed = [(Pending, Paid), (Pending, Failed), (Processing, Paid), (Processing, Failed)];
    for from in OrderStatus::ALL {
      for to in OrderStatus::ALL {
        assert_eq!(
          from.can_transition_to(to),
          allowed.contains(&(from, to)),
          "{from} -> {to}"
        );
      }
    }
  }

  #[test]
  fn terminal_states_never_move() {
    for from in [Paid, Failed] {
      assert!(from.is_terminal());
      for to in OrderStatus::ALL.into_iter().filter(|s| *s != from) {
        assert_eq!(from.plan(to), None, "{from} -> {to}");
      }
    }
  }

  #[test]
  fn reapplying_current_status_is_unchanged() {
    assert_eq!(Paid.plan(Paid), Some(Transition::Unchanged));
    assert_eq!(Pending.plan(Paid), Some(Transition::Applied));
    assert_eq!(Paid.plan(Pending), None);
    assert_eq!(Failed.plan(Paid), None);
  }

  #[test]
  fn cancelled_is_not_a_transition_target() {
    assert!(!Pending.can_transition_to(Cancelled));
    assert!(!Processing.can_transition_to(Cancelled));
  }

  #[test]
  fn unknown_status_text_is_rejected() {
    assert_eq!("processing".parse::<OrderStatus>(), Ok(Processing));
    assert!("refunded".parse::<OrderStatus>().is_err());
  }

  #[test]
  fn initial_status_follows_method() {
    assert_eq!(PaymentMethod::Gateway.initial_status(), Pending);
    assert_eq!(PaymentMethod::Manual.initial_status(), Processing);
  }
}
