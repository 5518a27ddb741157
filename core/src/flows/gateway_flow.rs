// seatbook/src/flows/gateway_flow.rs
use super::common_steps::{self, fail_pending, incomplete};
use super::contexts::GatewayCtxData;
use crate::error::{BookingError, BookingResult, GatewayError};
use crate::flow::{Flow, FlowContext, StepControl};
use crate::gateway::{line_items_for, CallbackOutcome, CheckoutRequest, CheckoutSession};
use tracing::{error, info};

pub const GATEWAY_FLOW: &str = "gateway_booking";

/// Guard, create a `pending` order, then open a checkout session for it.
pub fn gateway_booking_flow() -> Flow<GatewayCtxData, BookingError> {
  let mut flow = Flow::new(
    GATEWAY_FLOW,
    &[
      ("resolve_catalog", false, None),
      ("check_booking_guard", false, None),
      ("create_order", false, None),
      ("open_checkout_session", false, None),
    ],
  );

  flow.on_step("resolve_catalog", common_steps::resolve_catalog::<GatewayCtxData>);
  flow.on_step("check_booking_guard", common_steps::check_booking_guard::<GatewayCtxData>);
  flow.on_step("create_order", common_steps::create_order::<GatewayCtxData>);
  flow.on_step("open_checkout_session", open_checkout_session);

  flow
}

/// Any failure here is terminal for the order: it is marked `failed` and the
/// caller gets `GatewayUnavailable`. There is no retry. If the order cannot be
/// marked `failed` either, the message says so.
async fn open_checkout_session(ctx: FlowContext<GatewayCtxData>) -> BookingResult<StepControl> {
  let (state, order, event, meal) = {
    let guard = ctx.read();
    (
      guard.state.clone(),
      guard.draft.order.clone(),
      guard.draft.event.clone(),
      guard.draft.meal.clone(),
    )
  };
  let (order, event, meal) = match (order, event, meal) {
    (Some(order), Some(event), Some(meal)) => (order, event, meal),
    _ => return Err(incomplete(GATEWAY_FLOW, "a created order")),
  };

  let config = &state.config;
  let outcome: Result<CheckoutSession, String> = match line_items_for(&order, &event, &meal, &config.currency) {
    None => Err(format!("total {} does not fit in minor currency units", order.total())),
    Some(line_items) => {
      let request = CheckoutRequest {
        order_id: order.id,
        line_items,
        success_url: config.success_url(order.id, &state.signer.sign(order.id, CallbackOutcome::Success)),
        cancel_url: config.cancel_url(order.id, &state.signer.sign(order.id, CallbackOutcome::Cancel)),
      };
      match tokio::time::timeout(config.gateway_timeout, state.gateway.create_checkout_session(request)).await {
        Ok(Ok(session)) => Ok(session),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_elapsed) => Err(GatewayError::Timeout.to_string()),
      }
    }
  };

  match outcome {
    Ok(session) => {
      info!(order_id = %order.id, session_id = %session.session_id, "Checkout session opened.");
      let mut guard = ctx.write();
      guard.session_id = Some(session.session_id);
      guard.redirect_url = Some(session.redirect_url);
      Ok(StepControl::Continue)
    }
    Err(message) => {
      error!(order_id = %order.id, error = %message, "Checkout session failed; failing the order.");
      let message = match fail_pending(&state, order.id).await {
        Ok(()) => message,
        Err(e) => format!("{}; the order is still pending because it could not be marked failed: {}", message, e),
      };
      Err(BookingError::GatewayUnavailable {
        order_id: order.id,
        message,
      })
    }
  }
}
