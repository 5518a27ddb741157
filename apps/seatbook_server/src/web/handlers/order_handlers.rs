// apps/seatbook_server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use seatbook::ProofUpload;

#[derive(Deserialize, Debug)]
pub struct ProofQuery {
  pub filename: String,
}

#[instrument(name = "handler::my_orders", skip(app_state), fields(user_id = %auth_user.user_id))]
pub async fn list_my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.engine.orders_for_user(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::my_order", skip(app_state), fields(user_id = %auth_user.user_id))]
pub async fn get_my_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .engine
    .order_for_user(auth_user.user_id, order_id.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(
  name = "handler::resubmit_proof",
  skip(app_state, query, body),
  fields(user_id = %auth_user.user_id, size = body.len())
)]
pub async fn resubmit_proof_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  order_id: web::Path<Uuid>,
  query: web::Query<ProofQuery>,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let upload = ProofUpload::new(query.into_inner().filename, body.to_vec());
  let order = app_state
    .engine
    .resubmit_proof(auth_user.user_id, order_id.into_inner(), upload)
    .await?;

  info!(order_id = %order.id, "Proof of payment resubmitted.");
  Ok(HttpResponse::Ok().json(order))
}
