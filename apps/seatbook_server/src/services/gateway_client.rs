// apps/seatbook_server/src/services/gateway_client.rs

//! HTTP client for a Stripe-compatible hosted checkout API.

use async_trait::async_trait;
use reqwest::Client;
use seatbook::{CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Deserialize)]
struct SessionResponse {
  id: String,
  url: String,
}

pub struct HttpCheckoutGateway {
  http_client: Client,
  base_url: String,
  api_key: String,
}

impl HttpCheckoutGateway {
  pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
    let http_client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      http_client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      api_key: api_key.into(),
    })
  }
}

/// Flattens a checkout request into the bracketed form fields the API expects.
fn session_form(request: &CheckoutRequest) -> Vec<(String, String)> {
  let mut form = vec![
    ("mode".to_string(), "payment".to_string()),
    ("payment_method_types[0]".to_string(), "card".to_string()),
    ("client_reference_id".to_string(), request.order_id.to_string()),
    ("success_url".to_string(), request.success_url.clone()),
    ("cancel_url".to_string(), request.cancel_url.clone()),
  ];
  for (i, item) in request.line_items.iter().enumerate() {
    let key = |field: &str| format!("line_items[{}]{}", i, field);
    form.push((key("[quantity]"), item.quantity.to_string()));
    form.push((key("[price_data][currency]"), item.currency.clone()));
    form.push((key("[price_data][unit_amount]"), item.unit_amount.to_string()));
    form.push((key("[price_data][product_data][name]"), item.name.clone()));
    if let Some(description) = &item.description {
      form.push((key("[price_data][product_data][description]"), description.clone()));
    }
  }
  form
}

#[async_trait]
impl PaymentGateway for HttpCheckoutGateway {
  #[instrument(name = "gateway::create_checkout_session", skip_all, fields(order_id = %request.order_id))]
  async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
    let response = self
      .http_client
      .post(format!("{}/v1/checkout/sessions", self.base_url))
      .bearer_auth(&self.api_key)
      .form(&session_form(&request))
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          GatewayError::Timeout
        } else {
          GatewayError::Transport(e.to_string())
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!(status = status.as_u16(), "Checkout session refused.");
      return Err(GatewayError::Rejected {
        status: status.as_u16(),
        body,
      });
    }

    let session: SessionResponse = response
      .json()
      .await
      .map_err(|e| GatewayError::Transport(format!("unreadable session response: {}", e)))?;
    info!(session_id = %session.id, "Checkout session created.");
    Ok(CheckoutSession {
      session_id: session.id,
      redirect_url: session.url,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use seatbook::LineItem;
  use uuid::Uuid;

  #[test]
  fn form_carries_every_line_item() {
    let request = CheckoutRequest {
      order_id: Uuid::nil(),
      line_items: vec![
        LineItem {
          name: "Charity Dinner - Chicken Rice".to_string(),
          description: Some("Event on March 07, 2026".to_string()),
          unit_amount: 5000,
          quantity: 1,
          currency: "myr".to_string(),
        },
        LineItem {
          name: "Admin Fee".to_string(),
          description: None,
          unit_amount: 100,
          quantity: 1,
          currency: "myr".to_string(),
        },
      ],
      success_url: "https://seats.test/ok".to_string(),
      cancel_url: "https://seats.test/cancel".to_string(),
    };

    let form = session_form(&request);
    let value = |key: &str| form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

    assert_eq!(value("mode"), Some("payment"));
    assert_eq!(value("line_items[0][price_data][unit_amount]"), Some("5000"));
    assert_eq!(value("line_items[1][price_data][product_data][name]"), Some("Admin Fee"));
    assert_eq!(value("line_items[1][price_data][product_data][description]"), None);
    assert_eq!(value("success_url"), Some("https://seats.test/ok"));
  }
}
