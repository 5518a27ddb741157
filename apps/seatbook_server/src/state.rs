// apps/seatbook_server/src/state.rs
use seatbook::{BookingEngine, CatalogStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub engine: Arc<BookingEngine>,
  /// Used by handlers to verify administrators.
  pub catalog: Arc<dyn CatalogStore>,
}
