// seatbook/src/catalog.rs

//! Read-only views of the catalog (events, meal options) and the customer
//! directory. Both are owned elsewhere; the engine only reads them.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
  Active,
  Cancelled,
  Completed,
}

impl EventStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      EventStatus::Active => "active",
      EventStatus::Cancelled => "cancelled",
      EventStatus::Completed => "completed",
    }
  }
}

impl fmt::Display for EventStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub id: Uuid,
  pub title: String,
  pub starts_at: DateTime<Utc>,
  pub fee: Decimal,
  /// Defaults to 1.00 upstream.
  pub admin_fee: Decimal,
  pub status: EventStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealOption {
  pub id: Uuid,
  pub event_id: Uuid,
  pub name: String,
}

impl MealOption {
  pub fn belongs_to(&self, event: &Event) -> bool {
    self.event_id == event.id
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
  pub id: Uuid,
  pub name: String,
  pub phone: String,
  pub email: Option<String>,
  pub is_admin: bool,
}

/// Catalog and customer lookups.
#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

  async fn meal_option(&self, id: Uuid) -> Result<Option<MealOption>, StoreError>;

  async fn customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError>;

  /// All events, most recent start first.
  async fn events(&self) -> Result<Vec<Event>, StoreError>;
}
