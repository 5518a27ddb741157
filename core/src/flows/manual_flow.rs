// seatbook/src/flows/manual_flow.rs
use super::common_steps::{self, incomplete, store_proof};
use super::contexts::ManualCtxData;
use crate::error::{BookingError, BookingResult};
use crate::flow::{Flow, FlowContext, StepControl};
use tracing::{info, warn};

pub const MANUAL_FLOW: &str = "manual_booking";

/// Guard, validate the proof, create a `processing` order, then store the proof
/// under a name derived from the order id.
///
/// The proof is validated before the order exists, so a bad upload never leaves
/// an order behind. Storing it happens after, and its failure leaves the order
/// in `processing` without a proof (`ProofNotPersisted`).
pub fn manual_booking_flow() -> Flow<ManualCtxData, BookingError> {
  let mut flow = Flow::new(
    MANUAL_FLOW,
    &[
      ("resolve_catalog", false, None),
      ("check_booking_guard", false, None),
      ("validate_proof", false, None),
      ("create_order", false, None),
      ("persist_proof", false, None),
    ],
  );

  flow.on_step("resolve_catalog", common_steps::resolve_catalog::<ManualCtxData>);
  flow.on_step("check_booking_guard", common_steps::check_booking_guard::<ManualCtxData>);
  flow.on_step("validate_proof", validate_proof);
  flow.on_step("create_order", common_steps::create_order::<ManualCtxData>);
  flow.on_step("persist_proof", persist_proof);
  flow.after_step("persist_proof", |ctx: FlowContext<ManualCtxData>| async move {
    if let Some(order) = &ctx.read().draft.order {
      info!(order_id = %order.id, user_id = %order.user_id, "Manual order awaiting review.");
    }
    Ok::<_, BookingError>(StepControl::Continue)
  });

  flow
}

async fn validate_proof(ctx: FlowContext<ManualCtxData>) -> BookingResult<StepControl> {
  let mut guard = ctx.write();
  let upload = guard.upload.take().ok_or_else(|| incomplete(MANUAL_FLOW, "a proof upload"))?;
  match guard.state.config.proof.validate(upload) {
    Ok(proof) => {
      guard.proof = Some(proof);
      Ok(StepControl::Continue)
    }
    Err(e) => {
      warn!(user_id = %guard.draft.request.user_id, error = %e, "Proof of payment rejected.");
      Err(e)
    }
  }
}

async fn persist_proof(ctx: FlowContext<ManualCtxData>) -> BookingResult<StepControl> {
  let (state, order_id, proof) = {
    let mut guard = ctx.write();
    (guard.state.clone(), guard.draft.order.as_ref().map(|o| o.id), guard.proof.take())
  };
  let (order_id, proof) = match (order_id, proof) {
    (Some(order_id), Some(proof)) => (order_id, proof),
    _ => return Err(incomplete(MANUAL_FLOW, "a created order with a validated proof")),
  };

  let order = store_proof(&state, order_id, proof).await?;

  ctx.write().draft.order = Some(order);
  Ok(StepControl::Continue)
}
