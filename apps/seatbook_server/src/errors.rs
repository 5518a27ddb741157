// apps/seatbook_server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use seatbook::BookingError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error(transparent)]
  Booking(#[from] BookingError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    AppError::Internal(format!("{:#}", err))
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Booking(err) => booking_status(err),
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Request rejected");
    }

    match self {
      AppError::Sqlx(_) => HttpResponse::build(status).json(json!({"error": "Database operation failed"})),
      AppError::Config(m) => HttpResponse::build(status).json(json!({"error": "Configuration issue", "detail": m})),
      AppError::Booking(BookingError::ProofNotPersisted { order_id, .. }) => HttpResponse::build(status).json(json!({
        "error": "Order was created but the proof of payment could not be stored. Please upload it again.",
        "orderId": order_id,
        "resubmit": format!("/api/v1/orders/{}/proof", order_id),
      })),
      AppError::Booking(BookingError::Storage(_)) => {
        HttpResponse::build(status).json(json!({"error": "Storage operation failed"}))
      }
      other => HttpResponse::build(status).json(json!({"error": other.to_string()})),
    }
  }
}

fn booking_status(err: &BookingError) -> StatusCode {
  match err {
    BookingError::CrossReference { .. } | BookingError::InvalidProof { .. } | BookingError::EventNotOpen { .. } => {
      StatusCode::BAD_REQUEST
    }
    BookingError::Forbidden(_) | BookingError::CallbackRejected { .. } => StatusCode::FORBIDDEN,
    BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
    BookingError::AlreadyBooked { .. } | BookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
    BookingError::GatewayUnavailable { .. } => StatusCode::BAD_GATEWAY,
    // The order exists; the client still has to resend the proof.
    BookingError::ProofNotPersisted { .. } => StatusCode::ACCEPTED,
    BookingError::Storage(_) | BookingError::Export(_) | BookingError::Flow(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
