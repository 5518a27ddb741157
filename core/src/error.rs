// seatbook/src/error.rs
use crate::flow::FlowError;
use crate::order::OrderStatus;
use anyhow::Error as AnyhowError;
use thiserror::Error;
use uuid::Uuid;

/// Every way a booking, callback, review or export can fail.
#[derive(Debug, Error)]
pub enum BookingError {
  /// The meal option belongs to a different event.
  #[error("Meal option {meal_option_id} does not belong to event {event_id}")]
  CrossReference { meal_option_id: Uuid, event_id: Uuid },

  /// The user already holds a paid seat at this event.
  #[error("User {user_id} has already booked event {event_id}")]
  AlreadyBooked { user_id: Uuid, event_id: Uuid },

  #[error("Invalid proof of payment: {reason}")]
  InvalidProof { reason: String },

  /// The checkout gateway failed or timed out; the order was marked failed.
  #[error("Payment gateway unavailable for order {order_id}: {message}")]
  GatewayUnavailable { order_id: Uuid, message: String },

  #[error("Order {order_id} cannot move from {from} to {to}")]
  InvalidTransition {
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
  },

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: Uuid },

  /// The order exists in `processing` but its proof could not be stored.
  /// Recoverable through `BookingEngine::resubmit_proof`.
  #[error("Order {order_id} was created but its proof of payment was not stored: {source}")]
  ProofNotPersisted {
    order_id: Uuid,
    #[source]
    source: AnyhowError,
  },

  #[error("Gateway callback for order {order_id} carried a missing or invalid token")]
  CallbackRejected { order_id: Uuid },

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Event {event_id} is not open for booking (status: {status})")]
  EventNotOpen { event_id: Uuid, status: String },

  #[error("Storage failure: {0}")]
  Storage(#[source] AnyhowError),

  #[error("Export failed: {0}")]
  Export(#[source] AnyhowError),

  #[error("Flow error: {0}")]
  Flow(#[from] FlowError),
}

impl BookingError {
  pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
    BookingError::NotFound { entity, id }
  }

  pub(crate) fn invalid_proof(reason: impl Into<String>) -> Self {
    BookingError::InvalidProof { reason: reason.into() }
  }

  /// True for errors the caller can fix by sending a different request.
  pub fn is_client_error(&self) -> bool {
    matches!(
      self,
      BookingError::CrossReference { .. }
        | BookingError::AlreadyBooked { .. }
        | BookingError::InvalidProof { .. }
        | BookingError::NotFound { .. }
        | BookingError::CallbackRejected { .. }
        | BookingError::Forbidden(_)
        | BookingError::EventNotOpen { .. }
    )
  }
}

/// Failures reported by `OrderStore` / `CatalogStore` implementations.
#[derive(Debug, Error)]
pub enum StoreError {
  /// Committing would leave two paid orders for one (user, event).
  #[error("A paid order already exists for user {user_id} at event {event_id}")]
  DuplicatePaid { user_id: Uuid, event_id: Uuid },

  /// Compare-and-set lost: the order was not in the expected status, so the
  /// move to `target` was not made.
  #[error("Order {order_id} is {actual}, expected {expected} before moving to {target}")]
  StatusConflict {
    order_id: Uuid,
    expected: OrderStatus,
    actual: OrderStatus,
    target: OrderStatus,
  },

  #[error("Order not found: {0}")]
  NotFound(Uuid),

  #[error(transparent)]
  Backend(#[from] AnyhowError),
}

impl From<StoreError> for BookingError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::DuplicatePaid { user_id, event_id } => BookingError::AlreadyBooked { user_id, event_id },
      // The order moved underneath the caller; report the attempted move from where it really is.
      StoreError::StatusConflict {
        order_id,
        actual,
        target,
        ..
      } => BookingError::InvalidTransition {
        order_id,
        from: actual,
        to: target,
      },
      StoreError::NotFound(id) => BookingError::not_found("Order", id),
      StoreError::Backend(source) => BookingError::Storage(source),
    }
  }
}

/// Failures reported by `PaymentGateway` implementations.
#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("gateway call timed out")]
  Timeout,

  #[error("gateway transport error: {0}")]
  Transport(String),

  #[error("gateway rejected the session (status {status}): {body}")]
  Rejected { status: u16, body: String },
}

pub type BookingResult<T, E = BookingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_conflict_reports_the_attempted_move() {
    let order_id = Uuid::new_v4();
    let err: BookingError = StoreError::StatusConflict {
      order_id,
      expected: OrderStatus::Pending,
      actual: OrderStatus::Paid,
      target: OrderStatus::Failed,
    }
    .into();

    assert!(matches!(
      err,
      BookingError::InvalidTransition {
        from: OrderStatus::Paid,
        to: OrderStatus::Failed,
        ..
      }
    ));
    assert!(err.to_string().contains("paid"), "{err}");
    assert!(!err.to_string().contains("pending"), "{err}");
  }
}
