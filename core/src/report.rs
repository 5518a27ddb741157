// seatbook/src/report.rs

//! Read-only order reports: one flat CSV per event, or a workbook with one
//! sheet per event. Rendering the workbook to a file format is left to the caller.

use crate::catalog::{Customer, Event, MealOption};
use crate::engine::BookingEngine;
use crate::error::{BookingError, BookingResult};
use crate::order::{Order, OrderStatus, PaymentMethod};
use crate::reconcile::AdminCapability;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};
use uuid::Uuid;

pub const CSV_HEADER: [&str; 12] = [
  "Order ID",
  "Date",
  "Customer",
  "Telephone",
  "Event",
  "Meal Option",
  "Amount",
  "Admin Fee",
  "Total",
  "Status",
  "Payment Method",
  "Proof",
];

pub const SHEET_HEADER: [&str; 11] = [
  "Order ID",
  "Date",
  "Customer Name",
  "Customer Tel",
  "Meal",
  "Amount",
  "Admin Fee",
  "Total",
  "Status",
  "Payment Method",
  "Proof",
];

/// Longest sheet name produced by `SheetNamer`.
pub const MAX_SHEET_NAME_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportScope {
  AllEvents,
  Event(Uuid),
}

/// One order joined with its customer, event and meal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderReportRow {
  pub order_id: Uuid,
  pub event_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub customer_name: String,
  pub customer_phone: String,
  pub event_title: String,
  pub meal_name: String,
  pub amount: Decimal,
  pub admin_fee: Decimal,
  pub total: Decimal,
  pub status: OrderStatus,
  pub payment_method: Option<PaymentMethod>,
  pub proof_reference: Option<String>,
}

impl OrderReportRow {
  pub fn date_display(&self) -> String {
    self.created_at.format("%Y-%m-%d %H:%M").to_string()
  }

  pub fn payment_method_display(&self) -> &'static str {
    self.payment_method.map_or("N/A", PaymentMethod::as_str)
  }

  pub fn proof_display(&self) -> &str {
    self.proof_reference.as_deref().unwrap_or("")
  }

  pub fn csv_record(&self) -> [String; 12] {
    [
      self.order_id.to_string(),
      self.date_display(),
      self.customer_name.clone(),
      self.customer_phone.clone(),
      self.event_title.clone(),
      self.meal_name.clone(),
      self.amount.to_string(),
      self.admin_fee.to_string(),
      self.total.to_string(),
      self.status.to_string(),
      self.payment_method_display().to_string(),
      self.proof_display().to_string(),
    ]
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
  pub file_name: String,
  pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
  pub event_id: Uuid,
  pub name: String,
  pub rows: Vec<OrderReportRow>,
}

/// All events, most recent start first, one sheet each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workbook {
  pub sheets: Vec<Sheet>,
}

impl Workbook {
  pub const FILE_NAME: &'static str = "orders_report_all_events.xlsx";
}

/// Keeps letters, digits, space, underscore and hyphen, then truncates.
pub fn sanitize_sheet_name(title: &str) -> String {
  title
    .chars()
    .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
    .take(MAX_SHEET_NAME_CHARS)
    .collect()
}

/// Hands out sheet names that are sanitized, non-empty and unique within one
/// workbook. Spreadsheet tools compare sheet names case-insensitively.
#[derive(Debug, Default)]
pub struct SheetNamer {
  used: HashSet<String>,
}

impl SheetNamer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn name_for(&mut self, title: &str, event_id: Uuid) -> String {
    let mut base = sanitize_sheet_name(title);
    if base.trim().is_empty() {
      base = format!("Event {}", &event_id.simple().to_string()[..8]);
    }

    let mut candidate = base.clone();
    let mut n = 2;
    while self.used.contains(&candidate.to_lowercase()) {
      let suffix = format!(" ({})", n);
      let keep = MAX_SHEET_NAME_CHARS - suffix.chars().count();
      candidate = base.chars().take(keep).collect::<String>() + &suffix;
      n += 1;
    }
    self.used.insert(candidate.to_lowercase());
    candidate
  }
}

struct ReportJoin {
  events: HashMap<Uuid, Event>,
  meals: HashMap<Uuid, Option<MealOption>>,
  customers: HashMap<Uuid, Option<Customer>>,
}

impl BookingEngine {
  /// Orders in `scope` joined for reporting, newest first.
  #[instrument(name = "BookingEngine::report_rows", skip(self, cap), err(Display))]
  pub async fn report_rows(&self, cap: &AdminCapability, scope: ReportScope) -> BookingResult<Vec<OrderReportRow>> {
    let orders = self.list_orders(cap, scope).await?;
    let mut join = ReportJoin {
      events: HashMap::new(),
      meals: HashMap::new(),
      customers: HashMap::new(),
    };
    for event in self.state().catalog.events().await? {
      join.events.insert(event.id, event);
    }

    let mut rows = Vec::with_capacity(orders.len());
    for order in orders {
      rows.push(self.join_row(&mut join, order).await?);
    }
    Ok(rows)
  }

  /// The flat CSV report for one event.
  #[instrument(name = "BookingEngine::export_event_csv", skip(self, cap), err(Display))]
  pub async fn export_event_csv(&self, cap: &AdminCapability, event_id: Uuid) -> BookingResult<CsvExport> {
    if self.state().catalog.event(event_id).await?.is_none() {
      return Err(BookingError::not_found("Event", event_id));
    }
    let rows = self.report_rows(cap, ReportScope::Event(event_id)).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
      .write_record(CSV_HEADER)
      .map_err(|e| BookingError::Export(e.into()))?;
    for row in &rows {
      writer
        .write_record(row.csv_record())
        .map_err(|e| BookingError::Export(e.into()))?;
    }
    let bytes = writer
      .into_inner()
      .map_err(|e| BookingError::Export(anyhow::anyhow!("flushing CSV output: {}", e.error())))?;

    info!(%event_id, rows = rows.len(), "Event CSV exported.");
    Ok(CsvExport {
      file_name: format!("orders_report_event_{}.csv", event_id),
      bytes,
    })
  }

  /// One sheet per event, including events without orders.
  #[instrument(name = "BookingEngine::export_workbook", skip(self, cap), err(Display))]
  pub async fn export_workbook(&self, cap: &AdminCapability) -> BookingResult<Workbook> {
    let events = self.state().catalog.events().await?;
    let mut by_event: HashMap<Uuid, Vec<OrderReportRow>> = HashMap::new();
    for row in self.report_rows(cap, ReportScope::AllEvents).await? {
      by_event.entry(row.event_id).or_default().push(row);
    }

    let mut namer = SheetNamer::new();
    let sheets: Vec<Sheet> = events
      .iter()
      .map(|event| Sheet {
        event_id: event.id,
        name: namer.name_for(&event.title, event.id),
        rows: by_event.remove(&event.id).unwrap_or_default(),
      })
      .collect();

    info!(sheets = sheets.len(), "Workbook exported.");
    Ok(Workbook { sheets })
  }

  async fn join_row(&self, join: &mut ReportJoin, order: Order) -> BookingResult<OrderReportRow> {
    let catalog = &self.state().catalog;
    if !join.customers.contains_key(&order.user_id) {
      let customer = catalog.customer(order.user_id).await?;
      join.customers.insert(order.user_id, customer);
    }
    if !join.meals.contains_key(&order.meal_option_id) {
      let meal = catalog.meal_option(order.meal_option_id).await?;
      join.meals.insert(order.meal_option_id, meal);
    }

    let customer = join.customers.get(&order.user_id).and_then(Option::as_ref);
    let meal = join.meals.get(&order.meal_option_id).and_then(Option::as_ref);
    let event = join.events.get(&order.event_id);

    Ok(OrderReportRow {
      order_id: order.id,
      event_id: order.event_id,
      created_at: order.created_at,
      customer_name: customer.map(|c| c.name.clone()).unwrap_or_default(),
      customer_phone: customer.map(|c| c.phone.clone()).unwrap_or_default(),
      event_title: event.map(|e| e.title.clone()).unwrap_or_default(),
      meal_name: meal.map(|m| m.name.clone()).unwrap_or_default(),
      amount: order.amount,
      admin_fee: order.admin_fee,
      total: order.total(),
      status: order.status,
      payment_method: order.payment_method,
      proof_reference: order.proof_reference,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sheet_names_drop_forbidden_characters() {
    assert_eq!(sanitize_sheet_name("Gala: 2026/27 *Final*?"), "Gala 202627 Final");
    assert_eq!(sanitize_sheet_name("Year-End_Dinner"), "Year-End_Dinner");
  }

  #[test]
  fn sheet_names_are_truncated_to_thirty_characters() {
    let name = sanitize_sheet_name("An Exceptionally Long Charity Dinner Title For Testing");
    assert_eq!(name.chars().count(), MAX_SHEET_NAME_CHARS);
    assert_eq!(name, "An Exceptionally Long Charity ");
  }

  #[test]
  fn repeated_and_empty_titles_get_distinct_names() {
    let mut namer = SheetNamer::new();
    let id = Uuid::nil();
    assert_eq!(namer.name_for("Dinner", id), "Dinner");
    assert_eq!(namer.name_for("dinner", id), "dinner (2)");
    assert_eq!(namer.name_for("Dinner!", id), "Dinner (3)");
    assert_eq!(namer.name_for("???", id), "Event 00000000");

    let long = "A".repeat(40);
    assert_eq!(namer.name_for(&long, id), "A".repeat(30));
    let second = namer.name_for(&long, id);
    assert_eq!(second, format!("{} (2)", "A".repeat(26)));
    assert_eq!(second.chars().count(), MAX_SHEET_NAME_CHARS);
  }
}
