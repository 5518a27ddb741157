// apps/seatbook_server/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{admin_handlers, callback_handlers, checkout_handlers, order_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      // Checkout
      .service(
        web::scope("/checkout")
          .route("/quote", web::get().to(checkout_handlers::quote_handler))
          .route("/gateway", web::post().to(checkout_handlers::gateway_checkout_handler))
          .route("/manual", web::post().to(checkout_handlers::manual_checkout_handler)),
      )
      // Gateway redirects; authorised by the signed token, not by X-User-ID.
      .service(
        web::scope("/payments/gateway/{order_id}")
          .route("/success", web::get().to(callback_handlers::gateway_success_handler))
          .route("/cancel", web::get().to(callback_handlers::gateway_cancel_handler)),
      )
      // The caller's own orders
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_my_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_my_order_handler))
          .route("/{order_id}/proof", web::post().to(order_handlers::resubmit_proof_handler)),
      )
      // Reconciliation and reports
      .service(
        web::scope("/admin")
          .route("/orders", web::get().to(admin_handlers::list_orders_handler))
          .route("/orders/{order_id}/approve", web::post().to(admin_handlers::approve_handler))
          .route("/orders/{order_id}/reject", web::post().to(admin_handlers::reject_handler))
          .route("/reviews", web::get().to(admin_handlers::pending_reviews_handler))
          .route("/reviews/orphaned", web::get().to(admin_handlers::orphaned_reviews_handler))
          .route("/reviews/stale", web::get().to(admin_handlers::stale_reviews_handler))
          .route("/export", web::get().to(admin_handlers::export_handler)),
      ),
  );
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::state::AppState;
  use actix_web::http::StatusCode;
  use actix_web::{test, App};
  use async_trait::async_trait;
  use chrono::{TimeZone, Utc};
  use rust_decimal_macros::dec;
  use seatbook::{
    BookingEngine, CallbackOutcome, CheckoutRequest, CheckoutSession, Customer, Event, EventStatus, GatewayError,
    InMemoryCatalog, InMemoryOrderStore, InMemoryProofStore, MealOption, Order, OrderStatus, PaymentGateway,
  };
  use std::sync::Arc;
  use std::time::Duration;
  use uuid::Uuid;

  struct InstantGateway;

  #[async_trait]
  impl PaymentGateway for InstantGateway {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
      Ok(CheckoutSession {
        session_id: format!("cs_test_{}", request.order_id.simple()),
        redirect_url: format!("https://checkout.test/pay/{}", request.order_id),
      })
    }
  }

  struct Fixture {
    state: AppState,
    customer: Uuid,
    admin: Uuid,
    event_id: Uuid,
    meal_option_id: Uuid,
  }

  fn test_config() -> AppConfig {
    AppConfig {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      database_url: String::new(),
      app_base_url: "https://seats.test".to_string(),
      gateway_base_url: "https://checkout.test".to_string(),
      gateway_api_key: String::new(),
      gateway_timeout: Duration::from_secs(5),
      callback_secret: "route-test-callback-secret".to_string(),
      payment_currency: "myr".to_string(),
      proof_upload_dir: std::env::temp_dir(),
      proof_max_bytes: seatbook::proof::DEFAULT_MAX_PROOF_BYTES,
      processing_expiry_hours: None,
      reject_inactive_events: false,
      run_migrations: false,
    }
  }

  fn fixture() -> Fixture {
    let catalog = Arc::new(InMemoryCatalog::new());
    let event = Event {
      id: Uuid::new_v4(),
      title: "Charity Dinner".to_string(),
      starts_at: Utc.with_ymd_and_hms(2026, 3, 7, 19, 0, 0).unwrap(),
      fee: dec!(50),
      admin_fee: dec!(1),
      status: EventStatus::Active,
    };
    let meal = MealOption {
      id: Uuid::new_v4(),
      event_id: event.id,
      name: "Chicken Rice".to_string(),
    };
    let customer = Customer {
      id: Uuid::new_v4(),
      name: "Aisyah".to_string(),
      phone: "+60 12-345 6789".to_string(),
      email: None,
      is_admin: false,
    };
    let admin = Customer {
      id: Uuid::new_v4(),
      name: "Admin".to_string(),
      is_admin: true,
      ..customer.clone()
    };
    let fixture_ids = (customer.id, admin.id, event.id, meal.id);
    catalog.insert_event(event);
    catalog.insert_meal_option(meal);
    catalog.insert_customer(customer);
    catalog.insert_customer(admin);

    let config = test_config();
    let engine = BookingEngine::new(
      catalog.clone(),
      Arc::new(InMemoryOrderStore::new()),
      Arc::new(InstantGateway),
      Arc::new(InMemoryProofStore::new()),
      config.engine_config(),
    );
    Fixture {
      state: AppState {
        engine: Arc::new(engine),
        catalog,
      },
      customer: fixture_ids.0,
      admin: fixture_ids.1,
      event_id: fixture_ids.2,
      meal_option_id: fixture_ids.3,
    }
  }

  fn as_user(req: test::TestRequest, user_id: Uuid) -> test::TestRequest {
    req.insert_header(("X-User-ID", user_id.to_string()))
  }

  macro_rules! app {
    ($fixture:expr) => {
      test::init_service(
        App::new()
          .app_data(web::Data::new($fixture.state.clone()))
          .configure(configure_app_routes),
      )
      .await
    };
  }

  #[actix_web::test]
  async fn health_check_is_ok() {
    let f = fixture();
    let app = app!(f);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[actix_web::test]
  async fn checkout_without_identity_is_unauthorized() {
    let f = fixture();
    let app = app!(f);

    let req = test::TestRequest::post()
      .uri("/api/v1/checkout/gateway")
      .set_json(serde_json::json!({"event_id": f.event_id, "meal_option_id": f.meal_option_id}))
      .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[actix_web::test]
  async fn manual_checkout_then_admin_approval() {
    let f = fixture();
    let app = app!(f);

    let uri = format!(
      "/api/v1/checkout/manual?event_id={}&meal_option_id={}&filename=receipt.png",
      f.event_id, f.meal_option_id
    );
    let req = as_user(test::TestRequest::post().uri(&uri), f.customer)
      .set_payload(vec![0x89, b'P', b'N', b'G'])
      .to_request();
    let order: Order = test::call_and_read_body_json(&app, req).await;
    assert_eq!(order.status, OrderStatus::Processing);

    let approve_uri = format!("/api/v1/admin/orders/{}/approve", order.id);
    let req = as_user(test::TestRequest::post().uri(&approve_uri), f.customer).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = as_user(test::TestRequest::post().uri(&approve_uri), f.admin).to_request();
    let approved: Order = test::call_and_read_body_json(&app, req).await;
    assert_eq!(approved.status, OrderStatus::Paid);

    let req = as_user(test::TestRequest::post().uri(&uri), f.customer)
      .set_payload(vec![0x89, b'P', b'N', b'G'])
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[actix_web::test]
  async fn gateway_callback_requires_the_issued_token() {
    let f = fixture();
    let app = app!(f);

    let req = as_user(test::TestRequest::post().uri("/api/v1/checkout/gateway"), f.customer)
      .set_json(serde_json::json!({"event_id": f.event_id, "meal_option_id": f.meal_option_id}))
      .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let order_id: Uuid = serde_json::from_value(body["orderId"].clone()).unwrap();

    let forged = format!("/api/v1/payments/gateway/{}/success?token=forged", order_id);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&forged).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let cancel_token = f.state.engine.state().signer.sign(order_id, CallbackOutcome::Cancel);
    let swapped = format!("/api/v1/payments/gateway/{}/success?token={}", order_id, cancel_token);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&swapped).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let token = f.state.engine.state().signer.sign(order_id, CallbackOutcome::Success);
    let signed = format!("/api/v1/payments/gateway/{}/success?token={}", order_id, token);
    let body: serde_json::Value =
      test::call_and_read_body_json(&app, test::TestRequest::get().uri(&signed).to_request()).await;
    assert_eq!(body["order"]["status"], "paid");
  }

  #[actix_web::test]
  async fn event_export_is_a_csv_attachment() {
    let f = fixture();
    let app = app!(f);

    let uri = format!("/api/v1/admin/export?event_id={}", f.event_id);
    let resp = test::call_service(&app, as_user(test::TestRequest::get().uri(&uri), f.admin).to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers().get("content-disposition").unwrap().to_str().unwrap().to_string();
    assert!(disposition.contains(&format!("orders_report_event_{}.csv", f.event_id)), "{disposition}");
    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"Order ID,Date,Customer"));
  }
}
