// seatbook/src/reconcile.rs

//! Administrative decisions on orders.
//!
//! Only holders of an `AdminCapability` may move a manual order out of
//! `processing`, or override a pending gateway order to `paid`.

use crate::catalog::CatalogStore;
use crate::engine::BookingEngine;
use crate::error::{BookingError, BookingResult};
use crate::order::{Order, OrderStatus, StatusChange};
use crate::reference;
use crate::report::ReportScope;
use crate::store::OrderQuery;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Proof that the caller is an administrator. Obtained only through `verify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCapability {
  admin_id: Uuid,
}

impl AdminCapability {
  #[instrument(name = "AdminCapability::verify", skip(catalog), err(Display))]
  pub async fn verify(catalog: &dyn CatalogStore, user_id: Uuid) -> BookingResult<Self> {
    match catalog.customer(user_id).await? {
      Some(customer) if customer.is_admin => Ok(Self { admin_id: user_id }),
      _ => {
        warn!(%user_id, "Administrative access refused.");
        Err(BookingError::Forbidden(format!("user {} is not an administrator", user_id)))
      }
    }
  }

  pub fn admin_id(&self) -> Uuid {
    self.admin_id
  }
}

impl BookingEngine {
  /// Marks a `pending` or `processing` order as `paid`, issuing a payment
  /// reference if it has none.
  ///
  /// Fails with `AlreadyBooked`, leaving the order untouched, when the same user
  /// already holds another paid order for the event.
  #[instrument(name = "BookingEngine::approve", skip(self, cap), fields(admin_id = %cap.admin_id()), err(Display))]
  pub async fn approve(&self, cap: &AdminCapability, order_id: Uuid) -> BookingResult<Order> {
    let order = self.load(order_id).await?;
    if !matches!(order.status, OrderStatus::Pending | OrderStatus::Processing) {
      warn!(%order_id, status = %order.status, "Approval refused.");
      return Err(BookingError::InvalidTransition {
        order_id,
        from: order.status,
        to: OrderStatus::Paid,
      });
    }

    let payment_reference = match order.payment_reference {
      Some(_) => None,
      None => Some(reference::admin_approval(order.is_manual(), Utc::now())),
    };
    let approved = self
      .state()
      .orders
      .apply(StatusChange {
        order_id,
        expected: order.status,
        target: OrderStatus::Paid,
        payment_reference,
      })
      .await?;

    info!(
      %order_id,
      from = %order.status,
      payment_reference = ?approved.payment_reference,
      "Order approved."
    );
    Ok(approved)
  }

  /// Marks a manual order under review as `failed`.
  #[instrument(name = "BookingEngine::reject", skip(self, cap), fields(admin_id = %cap.admin_id()), err(Display))]
  pub async fn reject(&self, cap: &AdminCapability, order_id: Uuid) -> BookingResult<Order> {
    let order = self.load(order_id).await?;
    if order.status != OrderStatus::Processing || !order.is_manual() {
      warn!(%order_id, status = %order.status, method = ?order.payment_method, "Rejection refused.");
      return Err(BookingError::InvalidTransition {
        order_id,
        from: order.status,
        to: OrderStatus::Failed,
      });
    }

    let rejected = self
      .state()
      .orders
      .apply(StatusChange {
        order_id,
        expected: OrderStatus::Processing,
        target: OrderStatus::Failed,
        payment_reference: None,
      })
      .await?;
    info!(%order_id, "Order rejected.");
    Ok(rejected)
  }

  /// Manual orders waiting for a decision, newest first.
  pub async fn pending_manual_reviews(&self, _cap: &AdminCapability) -> BookingResult<Vec<Order>> {
    Ok(self.state().orders.list(&OrderQuery::awaiting_review()).await?)
  }

  /// Manual orders under review whose proof was never stored.
  pub async fn orders_missing_proof(&self, cap: &AdminCapability) -> BookingResult<Vec<Order>> {
    let mut orders = self.pending_manual_reviews(cap).await?;
    orders.retain(Order::is_missing_proof);
    Ok(orders)
  }

  /// Manual orders that have waited longer than `processing_expiry`. Always
  /// empty when no expiry is configured. Nothing is transitioned.
  pub async fn stale_processing(&self, cap: &AdminCapability, now: DateTime<Utc>) -> BookingResult<Vec<Order>> {
    let Some(limit) = self.config().processing_expiry else {
      return Ok(Vec::new());
    };
    let mut orders = self.pending_manual_reviews(cap).await?;
    orders.retain(|order| now - order.created_at > limit);
    Ok(orders)
  }

  /// Every order, or every order for one event, newest first.
  pub async fn list_orders(&self, _cap: &AdminCapability, scope: ReportScope) -> BookingResult<Vec<Order>> {
    let query = match scope {
      ReportScope::AllEvents => OrderQuery::all(),
      ReportScope::Event(event_id) => OrderQuery::for_event(event_id),
    };
    Ok(self.state().orders.list(&query).await?)
  }
}
