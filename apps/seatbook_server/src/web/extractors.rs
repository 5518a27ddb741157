// apps/seatbook_server/src/web/extractors.rs

use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use seatbook::AdminCapability;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// The caller's identity, verified upstream and forwarded in `X-User-ID`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

fn user_from_headers(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  req
    .headers()
    .get(USER_ID_HEADER)
    .and_then(|value| value.to_str().ok())
    .and_then(|raw| Uuid::parse_str(raw).ok())
    .map(|user_id| AuthenticatedUser { user_id })
    .ok_or_else(|| {
      warn!("Missing or invalid {} header.", USER_ID_HEADER);
      AppError::Auth(format!("Missing or invalid {} header.", USER_ID_HEADER))
    })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    ready(user_from_headers(req))
  }
}

/// An authenticated caller holding the administrator capability.
pub struct AdminUser {
  pub cap: AdminCapability,
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let user = user_from_headers(req);
    let state = req.app_data::<web::Data<AppState>>().cloned();
    Box::pin(async move {
      let user = user?;
      let state = state.ok_or_else(|| AppError::Internal("application state is not configured".to_string()))?;
      let cap = AdminCapability::verify(state.catalog.as_ref(), user.user_id).await?;
      Ok(AdminUser { cap })
    })
  }
}
