// seatbook/src/store/mod.rs

//! Persistence port for orders.
//!
//! Implementations own the concurrency control behind the one-paid-seat rule:
//! `insert_guarded` and any `apply` that targets `paid` must check and write in a
//! single atomic unit, and `apply` must be a compare-and-set on the current status.

pub mod memory;

pub use memory::{InMemoryCatalog, InMemoryOrderStore};

use crate::error::StoreError;
use crate::order::{Order, OrderStatus, PaymentMethod, StatusChange};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Inserts `order` unless the same user already holds a paid order for the
  /// same event, in which case `StoreError::DuplicatePaid` is returned and
  /// nothing is written.
  async fn insert_guarded(&self, order: Order) -> Result<Order, StoreError>;

  async fn get(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

  async fn has_paid(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError>;

  /// Applies `change` only if the order is still in `change.expected`.
  /// Either the whole change commits or nothing does.
  async fn apply(&self, change: StatusChange) -> Result<Order, StoreError>;

  /// Records the proof reference on an order that is still `processing`.
  async fn attach_proof(&self, order_id: Uuid, reference: String) -> Result<Order, StoreError>;

  /// Orders matching `query`, newest first.
  async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError>;
}

/// Filter for `OrderStore::list`. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
  pub user_id: Option<Uuid>,
  pub event_id: Option<Uuid>,
  pub status: Option<OrderStatus>,
  pub payment_method: Option<PaymentMethod>,
}

impl OrderQuery {
  pub fn all() -> Self {
    Self::default()
  }

  pub fn for_user(user_id: Uuid) -> Self {
    Self {
      user_id: Some(user_id),
      ..Self::default()
    }
  }

  pub fn for_event(event_id: Uuid) -> Self {
    Self {
      event_id: Some(event_id),
      ..Self::default()
    }
  }

  /// Manual orders waiting for an administrator.
  pub fn awaiting_review() -> Self {
    Self {
      status: Some(OrderStatus::Processing),
      payment_method: Some(PaymentMethod::Manual),
      ..Self::default()
    }
  }

  pub fn matches(&self, order: &Order) -> bool {
    self.user_id.map_or(true, |id| order.user_id == id)
      && self.event_id.map_or(true, |id| order.event_id == id)
      && self.status.map_or(true, |s| order.status == s)
      && self.payment_method.map_or(true, |m| order.payment_method == Some(m))
  }
}
