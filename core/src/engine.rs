// seatbook/src/engine.rs

//! `BookingEngine`: the entry point for customers and gateway callbacks.
//! Administrative operations live in `reconcile` and `report`.

use crate::catalog::CatalogStore;
use crate::config::EngineConfig;
use crate::error::{BookingError, BookingResult, StoreError};
use crate::flow::{Flow, FlowContext};
use crate::flows::common_steps::{self, fail_pending, incomplete};
use crate::flows::gateway_flow::GATEWAY_FLOW;
use crate::flows::manual_flow::MANUAL_FLOW;
use crate::flows::{gateway_booking_flow, manual_booking_flow, BookingRequest, GatewayCtxData, ManualCtxData};
use crate::gateway::{CallbackOutcome, PaymentGateway};
use crate::order::{Order, OrderStatus, PaymentMethod, StatusChange, Transition};
use crate::proof::{ProofStore, ProofUpload};
use crate::reference;
use crate::state::EngineState;
use crate::store::{OrderQuery, OrderStore};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// What a booking would cost, computed without creating an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
  pub fee: Decimal,
  pub admin_fee: Decimal,
  pub total: Decimal,
}

/// A pending gateway order and where to send the customer to pay for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayCheckout {
  pub order: Order,
  pub session_id: String,
  pub redirect_url: String,
}

pub struct BookingEngine {
  state: EngineState,
  gateway_flow: Flow<GatewayCtxData, BookingError>,
  manual_flow: Flow<ManualCtxData, BookingError>,
}

impl BookingEngine {
  pub fn new(
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    proofs: Arc<dyn ProofStore>,
    config: EngineConfig,
  ) -> Self {
    Self::from_state(EngineState::new(catalog, orders, gateway, proofs, config))
  }

  pub fn from_state(state: EngineState) -> Self {
    Self {
      state,
      gateway_flow: gateway_booking_flow(),
      manual_flow: manual_booking_flow(),
    }
  }

  pub fn state(&self) -> &EngineState {
    &self.state
  }

  pub fn config(&self) -> &EngineConfig {
    &self.state.config
  }

  /// Creates an order in the method's initial status after checking the meal
  /// belongs to the event and the user holds no paid seat there.
  #[instrument(name = "BookingEngine::create_order", skip(self), fields(user_id = %request.user_id, event_id = %request.event_id), err(Display))]
  pub async fn create_order(&self, request: BookingRequest, method: PaymentMethod) -> BookingResult<Order> {
    let (event, meal) = common_steps::resolve_booking(&self.state, &request).await?;
    self.state.guard.ensure_clear(request.user_id, request.event_id).await?;
    common_steps::admit_order(&self.state, request.user_id, &event, &meal, method).await
  }

  /// Moves an order along the state machine. Re-applying its current status
  /// returns it unchanged.
  #[instrument(name = "BookingEngine::transition", skip(self), err(Display))]
  pub async fn transition(&self, order_id: Uuid, target: OrderStatus) -> BookingResult<Order> {
    let order = self.load(order_id).await?;
    match order.status.plan(target) {
      Some(Transition::Unchanged) => Ok(order),
      Some(Transition::Applied) => {
        let updated = self
          .state
          .orders
          .apply(StatusChange {
            order_id,
            expected: order.status,
            target,
            payment_reference: None,
          })
          .await?;
        info!(%order_id, from = %order.status, to = %target, "Order status changed.");
        Ok(updated)
      }
      None => {
        warn!(%order_id, from = %order.status, to = %target, "Transition refused.");
        Err(BookingError::InvalidTransition {
          order_id,
          from: order.status,
          to: target,
        })
      }
    }
  }

  #[instrument(name = "BookingEngine::quote", skip(self), fields(user_id = %request.user_id, event_id = %request.event_id), err(Display))]
  pub async fn quote(&self, request: BookingRequest) -> BookingResult<Quote> {
    let (event, _meal) = common_steps::resolve_booking(&self.state, &request).await?;
    self.state.guard.ensure_clear(request.user_id, request.event_id).await?;
    Ok(Quote {
      fee: event.fee,
      admin_fee: event.admin_fee,
      total: event.fee + event.admin_fee,
    })
  }

  #[instrument(name = "BookingEngine::book_with_gateway", skip(self), fields(user_id = %request.user_id, event_id = %request.event_id), err(Display))]
  pub async fn book_with_gateway(&self, request: BookingRequest) -> BookingResult<GatewayCheckout> {
    let ctx = FlowContext::new(GatewayCtxData::new(self.state.clone(), request));
    self.gateway_flow.run(ctx.clone()).await?;

    let guard = ctx.read();
    match (&guard.draft.order, &guard.session_id, &guard.redirect_url) {
      (Some(order), Some(session_id), Some(redirect_url)) => Ok(GatewayCheckout {
        order: order.clone(),
        session_id: session_id.clone(),
        redirect_url: redirect_url.clone(),
      }),
      _ => Err(incomplete(GATEWAY_FLOW, "a checkout session")),
    }
  }

  /// Handles the gateway's success callback. Safe to receive more than once.
  ///
  /// If another order for the same seat was paid first, this order is marked
  /// `failed` and `AlreadyBooked` is returned, or the storage error if it could
  /// not be marked.
  #[instrument(name = "BookingEngine::confirm_gateway_payment", skip(self, token), err(Display))]
  pub async fn confirm_gateway_payment(&self, order_id: Uuid, token: Option<&str>) -> BookingResult<Order> {
    let order = self.load_for_callback(order_id, CallbackOutcome::Success, token).await?;

    match order.status.plan(OrderStatus::Paid) {
      Some(Transition::Unchanged) => {
        info!(%order_id, "Success callback for an order already paid; nothing to do.");
        return Ok(order);
      }
      Some(Transition::Applied) if order.status == OrderStatus::Pending => {}
      _ => {
        warn!(%order_id, status = %order.status, "Success callback refused.");
        return Err(BookingError::InvalidTransition {
          order_id,
          from: order.status,
          to: OrderStatus::Paid,
        });
      }
    }

    let change = StatusChange {
      order_id,
      expected: OrderStatus::Pending,
      target: OrderStatus::Paid,
      payment_reference: Some(reference::gateway_confirmation()),
    };
    match self.state.orders.apply(change).await {
      Ok(paid) => {
        info!(%order_id, payment_reference = ?paid.payment_reference, "Gateway payment confirmed.");
        Ok(paid)
      }
      Err(StoreError::DuplicatePaid { user_id, event_id }) => {
        warn!(%order_id, %user_id, %event_id, "Another order for this seat was paid first; failing this one.");
        fail_pending(&self.state, order_id).await?;
        Err(BookingError::AlreadyBooked { user_id, event_id })
      }
      Err(StoreError::StatusConflict {
        actual: OrderStatus::Paid,
        ..
      }) => {
        info!(%order_id, "Concurrent success callback already paid the order.");
        self.load(order_id).await
      }
      Err(other) => Err(other.into()),
    }
  }

  /// Handles the gateway's cancel callback. Safe to receive more than once.
  #[instrument(name = "BookingEngine::cancel_gateway_payment", skip(self, token), err(Display))]
  pub async fn cancel_gateway_payment(&self, order_id: Uuid, token: Option<&str>) -> BookingResult<Order> {
    let order = self.load_for_callback(order_id, CallbackOutcome::Cancel, token).await?;

    match order.status.plan(OrderStatus::Failed) {
      Some(Transition::Unchanged) => return Ok(order),
      Some(Transition::Applied) if order.status == OrderStatus::Pending => {}
      _ => {
        warn!(%order_id, status = %order.status, "Cancel callback refused.");
        return Err(BookingError::InvalidTransition {
          order_id,
          from: order.status,
          to: OrderStatus::Failed,
        });
      }
    }

    let change = StatusChange {
      order_id,
      expected: OrderStatus::Pending,
      target: OrderStatus::Failed,
      payment_reference: None,
    };
    match self.state.orders.apply(change).await {
      Ok(failed) => {
        info!(%order_id, "Gateway payment cancelled.");
        Ok(failed)
      }
      Err(StoreError::StatusConflict {
        actual: OrderStatus::Failed,
        ..
      }) => self.load(order_id).await,
      Err(other) => Err(other.into()),
    }
  }

  #[instrument(name = "BookingEngine::book_with_proof", skip(self, upload), fields(user_id = %request.user_id, event_id = %request.event_id), err(Display))]
  pub async fn book_with_proof(&self, request: BookingRequest, upload: ProofUpload) -> BookingResult<Order> {
    let ctx = FlowContext::new(ManualCtxData::new(self.state.clone(), request, upload));
    self.manual_flow.run(ctx.clone()).await?;

    let order = ctx.read().draft.order.clone();
    order.ok_or_else(|| incomplete(MANUAL_FLOW, "an order"))
  }

  /// Stores a proof for the caller's manual order that is still waiting for one.
  #[instrument(name = "BookingEngine::resubmit_proof", skip(self, upload), err(Display))]
  pub async fn resubmit_proof(&self, user_id: Uuid, order_id: Uuid, upload: ProofUpload) -> BookingResult<Order> {
    let order = self.order_for_user(user_id, order_id).await?;
    if !order.is_missing_proof() {
      warn!(%order_id, status = %order.status, "Order is not waiting for a proof of payment.");
      return Err(BookingError::invalid_proof(format!(
        "order {} is not waiting for a proof of payment",
        order_id
      )));
    }

    let proof = self.state.config.proof.validate(upload)?;
    common_steps::store_proof(&self.state, order_id, proof).await
  }

  /// The user's orders, newest first.
  pub async fn orders_for_user(&self, user_id: Uuid) -> BookingResult<Vec<Order>> {
    Ok(self.state.orders.list(&OrderQuery::for_user(user_id)).await?)
  }

  pub async fn order_for_user(&self, user_id: Uuid, order_id: Uuid) -> BookingResult<Order> {
    let order = self.load(order_id).await?;
    if !order.is_owned_by(user_id) {
      warn!(%order_id, %user_id, "Order requested by someone other than its owner.");
      return Err(BookingError::Forbidden(format!("order {} belongs to another user", order_id)));
    }
    Ok(order)
  }

  pub(crate) async fn load(&self, order_id: Uuid) -> BookingResult<Order> {
    self
      .state
      .orders
      .get(order_id)
      .await?
      .ok_or_else(|| BookingError::not_found("Order", order_id))
  }

  /// Checks the callback token before anything else, then loads the gateway order.
  /// A token issued for the other outcome is rejected like a forged one.
  async fn load_for_callback(
    &self,
    order_id: Uuid,
    outcome: CallbackOutcome,
    token: Option<&str>,
  ) -> BookingResult<Order> {
    let verified = token.is_some_and(|token| self.state.signer.verify(order_id, outcome, token));
    if !verified {
      warn!(%order_id, %outcome, token_present = token.is_some(), "Gateway callback rejected.");
      return Err(BookingError::CallbackRejected { order_id });
    }

    let order = self.load(order_id).await?;
    if order.payment_method != Some(PaymentMethod::Gateway) {
      warn!(%order_id, "Gateway callback for an order not paid through the gateway.");
      return Err(BookingError::CallbackRejected { order_id });
    }
    Ok(order)
  }
}
