// seatbook/src/flows/common_steps.rs

//! Steps shared by the gateway and manual booking flows, and the operations
//! behind them that the engine also calls directly.

use super::contexts::{BookingCtx, BookingRequest};
use crate::catalog::{Event, EventStatus, MealOption};
use crate::error::{BookingError, BookingResult, StoreError};
use crate::flow::{FlowContext, FlowError, StepControl};
use crate::order::{Order, OrderStatus, PaymentMethod, StatusChange};
use crate::proof::{proof_reference_name, ValidatedProof};
use crate::state::EngineState;
use chrono::Utc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub(crate) fn incomplete(flow: &str, missing: &'static str) -> BookingError {
  BookingError::Flow(FlowError::Incomplete {
    flow: flow.to_string(),
    missing,
  })
}

/// Loads the event and meal option and checks they belong together.
#[instrument(name = "resolve_booking", skip_all, fields(user_id = %request.user_id, event_id = %request.event_id))]
pub(crate) async fn resolve_booking(
  state: &EngineState,
  request: &BookingRequest,
) -> BookingResult<(Event, MealOption)> {
  let event = state
    .catalog
    .event(request.event_id)
    .await?
    .ok_or_else(|| BookingError::not_found("Event", request.event_id))?;
  let meal = state
    .catalog
    .meal_option(request.meal_option_id)
    .await?
    .ok_or_else(|| BookingError::not_found("MealOption", request.meal_option_id))?;

  if !meal.belongs_to(&event) {
    warn!(meal_option_id = %meal.id, "Meal option belongs to another event.");
    return Err(BookingError::CrossReference {
      meal_option_id: meal.id,
      event_id: event.id,
    });
  }
  if state.config.reject_inactive_events && event.status != EventStatus::Active {
    warn!(status = %event.status, "Event is not open for booking.");
    return Err(BookingError::EventNotOpen {
      event_id: event.id,
      status: event.status.to_string(),
    });
  }
  Ok((event, meal))
}

/// Snapshots a new order and inserts it behind the booking guard.
pub(crate) async fn admit_order(
  state: &EngineState,
  user_id: Uuid,
  event: &Event,
  meal: &MealOption,
  method: PaymentMethod,
) -> BookingResult<Order> {
  let order = state
    .guard
    .admit(Order::snapshot(user_id, event, meal, method, Utc::now()))
    .await?;
  info!(
    order_id = %order.id,
    %user_id,
    event_id = %event.id,
    %method,
    status = %order.status,
    total = %order.total(),
    "Order created."
  );
  Ok(order)
}

/// Stores `proof` and records its reference on the order.
///
/// Failures after the order exists come back as `ProofNotPersisted` so the
/// caller can tell the user their order is waiting for a proof.
pub(crate) async fn store_proof(state: &EngineState, order_id: Uuid, proof: ValidatedProof) -> BookingResult<Order> {
  let name = proof_reference_name(order_id, Utc::now(), &proof.extension);
  let reference = match state.proofs.store(&proof.bytes, &name).await {
    Ok(reference) => reference,
    Err(source) => {
      error!(%order_id, error = %source, "Proof of payment could not be stored.");
      return Err(BookingError::ProofNotPersisted { order_id, source });
    }
  };

  match state.orders.attach_proof(order_id, reference.clone()).await {
    Ok(order) => {
      info!(%order_id, proof_reference = %reference, "Proof of payment recorded.");
      Ok(order)
    }
    Err(StoreError::Backend(source)) => {
      error!(%order_id, error = %source, "Stored proof could not be recorded on the order.");
      Err(BookingError::ProofNotPersisted { order_id, source })
    }
    Err(other) => Err(other.into()),
  }
}

/// Moves a pending gateway order to `failed`. An error means the order is
/// still `pending` and the caller has to report that alongside its own failure.
pub(crate) async fn fail_pending(state: &EngineState, order_id: Uuid) -> BookingResult<()> {
  let change = StatusChange {
    order_id,
    expected: OrderStatus::Pending,
    target: OrderStatus::Failed,
    payment_reference: None,
  };
  match state.orders.apply(change).await {
    Ok(_) => {
      info!(%order_id, "Order marked failed.");
      Ok(())
    }
    Err(e) => {
      error!(%order_id, error = %e, "Order could not be marked failed.");
      Err(e.into())
    }
  }
}

pub async fn resolve_catalog<T: BookingCtx>(ctx: FlowContext<T>) -> BookingResult<StepControl> {
  let (state, request) = {
    let guard = ctx.read();
    (guard.state().clone(), guard.draft().request)
  };

  let (event, meal) = resolve_booking(&state, &request).await?;

  {
    let mut guard = ctx.write();
    let draft = guard.draft_mut();
    draft.event = Some(event);
    draft.meal = Some(meal);
  }
  Ok(StepControl::Continue)
}

pub async fn check_booking_guard<T: BookingCtx>(ctx: FlowContext<T>) -> BookingResult<StepControl> {
  let (state, request) = {
    let guard = ctx.read();
    (guard.state().clone(), guard.draft().request)
  };

  state.guard.ensure_clear(request.user_id, request.event_id).await?;
  Ok(StepControl::Continue)
}

pub async fn create_order<T: BookingCtx>(ctx: FlowContext<T>) -> BookingResult<StepControl> {
  let (state, request, event, meal) = {
    let guard = ctx.read();
    let draft = guard.draft();
    (guard.state().clone(), draft.request, draft.event.clone(), draft.meal.clone())
  };
  let (event, meal) = match (event, meal) {
    (Some(event), Some(meal)) => (event, meal),
    _ => return Err(incomplete(T::METHOD.as_str(), "a resolved event and meal option")),
  };

  let order = admit_order(&state, request.user_id, &event, &meal, T::METHOD).await?;

  ctx.write().draft_mut().order = Some(order);
  Ok(StepControl::Continue)
}
