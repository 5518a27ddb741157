// seatbook/src/state.rs
use crate::catalog::CatalogStore;
use crate::config::EngineConfig;
use crate::gateway::{CallbackSigner, PaymentGateway};
use crate::guard::BookingGuard;
use crate::proof::ProofStore;
use crate::store::OrderStore;
use std::sync::Arc;

/// Everything a booking operation needs, cheap to clone into flow contexts.
#[derive(Clone)]
pub struct EngineState {
  pub catalog: Arc<dyn CatalogStore>,
  pub orders: Arc<dyn OrderStore>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub proofs: Arc<dyn ProofStore>,
  pub guard: BookingGuard,
  pub signer: CallbackSigner,
  pub config: Arc<EngineConfig>,
}

impl EngineState {
  pub fn new(
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    proofs: Arc<dyn ProofStore>,
    config: EngineConfig,
  ) -> Self {
    Self {
      guard: BookingGuard::new(orders.clone()),
      signer: CallbackSigner::new(&config.callback_secret),
      catalog,
      orders,
      gateway,
      proofs,
      config: Arc::new(config),
    }
  }
}
