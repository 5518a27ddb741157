// apps/seatbook_server/src/web/handlers/admin_handlers.rs

//! Reconciliation and reporting for administrators.

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::workbook::render_xlsx;
use crate::state::AppState;
use crate::web::extractors::AdminUser;
use seatbook::{ReportScope, Workbook};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Deserialize, Debug)]
pub struct EventFilter {
  pub event_id: Option<Uuid>,
}

impl EventFilter {
  fn scope(&self) -> ReportScope {
    self.event_id.map_or(ReportScope::AllEvents, ReportScope::Event)
  }
}

fn attachment(file_name: String) -> ContentDisposition {
  ContentDisposition {
    disposition: DispositionType::Attachment,
    parameters: vec![DispositionParam::Filename(file_name)],
  }
}

#[instrument(name = "handler::admin_orders", skip(app_state, admin))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  filter: web::Query<EventFilter>,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.engine.list_orders(&admin.cap, filter.scope()).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::admin_reviews", skip_all)]
pub async fn pending_reviews_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.engine.pending_manual_reviews(&admin.cap).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::admin_orphaned", skip_all)]
pub async fn orphaned_reviews_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.engine.orders_missing_proof(&admin.cap).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::admin_stale", skip_all)]
pub async fn stale_reviews_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.engine.stale_processing(&admin.cap, Utc::now()).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::admin_approve", skip(app_state, admin), fields(admin_id = %admin.cap.admin_id()))]
pub async fn approve_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.engine.approve(&admin.cap, order_id.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::admin_reject", skip(app_state, admin), fields(admin_id = %admin.cap.admin_id()))]
pub async fn reject_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.engine.reject(&admin.cap, order_id.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

/// CSV for one event when `event_id` is given, otherwise the all-events workbook.
#[instrument(name = "handler::admin_export", skip(app_state, admin))]
pub async fn export_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  filter: web::Query<EventFilter>,
) -> Result<HttpResponse, AppError> {
  match filter.event_id {
    Some(event_id) => {
      let export = app_state.engine.export_event_csv(&admin.cap, event_id).await?;
      Ok(
        HttpResponse::Ok()
          .content_type("text/csv; charset=utf-8")
          .insert_header(attachment(export.file_name))
          .body(export.bytes),
      )
    }
    None => {
      let workbook = app_state.engine.export_workbook(&admin.cap).await?;
      let bytes = web::block(move || render_xlsx(&workbook))
        .await
        .map_err(|e| AppError::Internal(format!("workbook rendering was interrupted: {}", e)))??;
      info!(size = bytes.len(), "Workbook rendered.");
      Ok(
        HttpResponse::Ok()
          .content_type(XLSX_CONTENT_TYPE)
          .insert_header(attachment(Workbook::FILE_NAME.to_string()))
          .body(bytes),
      )
    }
  }
}
