// apps/seatbook_server/src/web/handlers/callback_handlers.rs

//! Landing points for the gateway's success and cancel redirects.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct CallbackQuery {
  pub token: Option<String>,
}

#[instrument(name = "handler::gateway_success", skip(app_state, query))]
pub async fn gateway_success_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
  query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .engine
    .confirm_gateway_payment(order_id.into_inner(), query.token.as_deref())
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Payment successful! Your booking is confirmed.",
    "order": order,
  })))
}

#[instrument(name = "handler::gateway_cancel", skip(app_state, query))]
pub async fn gateway_cancel_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
  query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .engine
    .cancel_gateway_payment(order_id.into_inner(), query.token.as_deref())
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Payment was cancelled.",
    "order": order,
  })))
}
