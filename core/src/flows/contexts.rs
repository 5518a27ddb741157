// seatbook/src/flows/contexts.rs

//! Data threaded through the booking flows. Handlers receive these wrapped in
//! `FlowContext`.

use crate::catalog::{Event, MealOption};
use crate::order::{Order, PaymentMethod};
use crate::proof::{ProofUpload, ValidatedProof};
use crate::state::EngineState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who wants which seat. The user id comes from the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
  pub user_id: Uuid,
  pub event_id: Uuid,
  pub meal_option_id: Uuid,
}

/// Filled in step by step by the steps both flows share.
#[derive(Debug, Clone)]
pub struct BookingDraft {
  pub request: BookingRequest,
  pub event: Option<Event>,
  pub meal: Option<MealOption>,
  pub order: Option<Order>,
}

impl BookingDraft {
  pub fn new(request: BookingRequest) -> Self {
    Self {
      request,
      event: None,
      meal: None,
      order: None,
    }
  }
}

/// Implemented by every flow context that goes through the shared booking steps.
pub trait BookingCtx: Send + Sync + 'static {
  const METHOD: PaymentMethod;

  fn state(&self) -> &EngineState;
  fn draft(&self) -> &BookingDraft;
  fn draft_mut(&mut self) -> &mut BookingDraft;
}

#[derive(Clone)]
pub struct GatewayCtxData {
  pub state: EngineState,
  pub draft: BookingDraft,
  pub session_id: Option<String>,
  pub redirect_url: Option<String>,
}

impl GatewayCtxData {
  pub fn new(state: EngineState, request: BookingRequest) -> Self {
    Self {
      state,
      draft: BookingDraft::new(request),
      session_id: None,
      redirect_url: None,
    }
  }
}

impl BookingCtx for GatewayCtxData {
  const METHOD: PaymentMethod = PaymentMethod::Gateway;

  fn state(&self) -> &EngineState {
    &self.state
  }

  fn draft(&self) -> &BookingDraft {
    &self.draft
  }

  fn draft_mut(&mut self) -> &mut BookingDraft {
    &mut self.draft
  }
}

#[derive(Clone)]
pub struct ManualCtxData {
  pub state: EngineState,
  pub draft: BookingDraft,
  /// Taken by `validate_proof`.
  pub upload: Option<ProofUpload>,
  /// Taken by `persist_proof`.
  pub proof: Option<ValidatedProof>,
}

impl ManualCtxData {
  pub fn new(state: EngineState, request: BookingRequest, upload: ProofUpload) -> Self {
    Self {
      state,
      draft: BookingDraft::new(request),
      upload: Some(upload),
      proof: None,
    }
  }
}

impl BookingCtx for ManualCtxData {
  const METHOD: PaymentMethod = PaymentMethod::Manual;

  fn state(&self) -> &EngineState {
    &self.state
  }

  fn draft(&self) -> &BookingDraft {
    &self.draft
  }

  fn draft_mut(&mut self) -> &mut BookingDraft {
    &mut self.draft
  }
}
