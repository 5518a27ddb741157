// apps/seatbook_server/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use seatbook::{BookingRequest, ProofUpload};

#[derive(Deserialize, Debug)]
pub struct SeatSelection {
  pub event_id: Uuid,
  pub meal_option_id: Uuid,
}

impl SeatSelection {
  fn for_user(&self, user: &AuthenticatedUser) -> BookingRequest {
    BookingRequest {
      user_id: user.user_id,
      event_id: self.event_id,
      meal_option_id: self.meal_option_id,
    }
  }
}

#[derive(Deserialize, Debug)]
pub struct ManualCheckoutQuery {
  pub event_id: Uuid,
  pub meal_option_id: Uuid,
  pub filename: String,
}

#[instrument(name = "handler::quote", skip(app_state, selection), fields(user_id = %auth_user.user_id))]
pub async fn quote_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  selection: web::Query<SeatSelection>,
) -> Result<HttpResponse, AppError> {
  let quote = app_state.engine.quote(selection.for_user(&auth_user)).await?;
  Ok(HttpResponse::Ok().json(quote))
}

#[instrument(
  name = "handler::gateway_checkout",
  skip(app_state, selection),
  fields(user_id = %auth_user.user_id, event_id = %selection.event_id)
)]
pub async fn gateway_checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  selection: web::Json<SeatSelection>,
) -> Result<HttpResponse, AppError> {
  let checkout = app_state.engine.book_with_gateway(selection.for_user(&auth_user)).await?;
  info!(order_id = %checkout.order.id, "Redirecting customer to the checkout gateway.");

  Ok(HttpResponse::Created().json(json!({
    "orderId": checkout.order.id,
    "sessionId": checkout.session_id,
    "redirectUrl": checkout.redirect_url,
    "order": checkout.order,
  })))
}

/// The request body is the raw image; its original name travels in `filename`.
#[instrument(
  name = "handler::manual_checkout",
  skip(app_state, query, body),
  fields(user_id = %auth_user.user_id, event_id = %query.event_id, size = body.len())
)]
pub async fn manual_checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<ManualCheckoutQuery>,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let query = query.into_inner();
  let request = BookingRequest {
    user_id: auth_user.user_id,
    event_id: query.event_id,
    meal_option_id: query.meal_option_id,
  };
  let order = app_state
    .engine
    .book_with_proof(request, ProofUpload::new(query.filename, body.to_vec()))
    .await?;

  info!(order_id = %order.id, "Manual payment submitted for review.");
  Ok(HttpResponse::Created().json(order))
}
