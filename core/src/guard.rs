// seatbook/src/guard.rs

//! "Does this user already hold a paid seat at this event?"
//!
//! `is_booked` is the early, cheap answer used to reject a request before any
//! payment interaction starts. It is advisory: the authoritative check is the
//! one `OrderStore::insert_guarded` repeats atomically with the insert, and the
//! one `OrderStore::apply` repeats when an order is about to become paid.

use crate::error::{BookingError, BookingResult, StoreError};
use crate::order::Order;
use crate::store::OrderStore;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct BookingGuard {
  orders: Arc<dyn OrderStore>,
}

impl BookingGuard {
  pub fn new(orders: Arc<dyn OrderStore>) -> Self {
    Self { orders }
  }

  #[instrument(name = "BookingGuard::is_booked", skip(self))]
  pub async fn is_booked(&self, user_id: Uuid, event_id: Uuid) -> BookingResult<bool> {
    self.orders.has_paid(user_id, event_id).await.map_err(BookingError::from)
  }

  /// Fails with `AlreadyBooked` when the user already holds a paid seat.
  pub async fn ensure_clear(&self, user_id: Uuid, event_id: Uuid) -> BookingResult<()> {
    if self.is_booked(user_id, event_id).await? {
      warn!(%user_id, %event_id, "Booking rejected: user already holds a paid seat.");
      return Err(BookingError::AlreadyBooked { user_id, event_id });
    }
    Ok(())
  }

  /// Inserts `order`, re-checking the guard in the same atomic unit as the write.
  pub async fn admit(&self, order: Order) -> BookingResult<Order> {
    let (user_id, event_id) = (order.user_id, order.event_id);
    self.orders.insert_guarded(order).await.map_err(|e| match e {
      StoreError::DuplicatePaid { .. } => {
        warn!(%user_id, %event_id, "Booking rejected at insert: a paid seat was committed concurrently.");
        BookingError::AlreadyBooked { user_id, event_id }
      }
      other => BookingError::from(other),
    })
  }
}
