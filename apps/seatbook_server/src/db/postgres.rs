// apps/seatbook_server/src/db/postgres.rs

//! Postgres-backed `OrderStore` and `CatalogStore`.
//!
//! The one-paid-seat rule is held twice: writes that could produce a paid order
//! serialize on a transaction-scoped advisory lock keyed on (user, event), and
//! the partial unique index `orders_one_paid_seat` rejects anything that slips past.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use seatbook::{
  CatalogStore, Customer, Event, EventStatus, MealOption, Order, OrderQuery, OrderStatus, OrderStore, PaymentMethod,
  StatusChange, StoreError,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

macro_rules! order_columns {
  () => {
    "id, user_id, event_id, meal_option_id, amount, admin_fee, payment_method, payment_reference, proof_reference, status, created_at"
  };
}

#[derive(Debug, FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Uuid,
  event_id: Uuid,
  meal_option_id: Uuid,
  amount: Decimal,
  admin_fee: Decimal,
  payment_method: Option<String>,
  payment_reference: Option<String>,
  proof_reference: Option<String>,
  status: String,
  created_at: DateTime<Utc>,
}

impl OrderRow {
  fn into_order(self) -> Result<Order, StoreError> {
    let payment_method = self
      .payment_method
      .as_deref()
      .map(str::parse::<PaymentMethod>)
      .transpose()
      .map_err(|e| StoreError::Backend(e.into()))?;
    let status = self
      .status
      .parse::<OrderStatus>()
      .map_err(|e| StoreError::Backend(e.into()))?;

    Ok(Order {
      id: self.id,
      user_id: self.user_id,
      event_id: self.event_id,
      meal_option_id: self.meal_option_id,
      amount: self.amount,
      admin_fee: self.admin_fee,
      payment_method,
      payment_reference: self.payment_reference,
      proof_reference: self.proof_reference,
      status,
      created_at: self.created_at,
    })
  }
}

fn backend(err: sqlx::Error) -> StoreError {
  StoreError::Backend(err.into())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
  err.as_database_error().is_some_and(|db_err| db_err.is_unique_violation())
}

/// Maps a write error, turning a hit on `orders_one_paid_seat` into `DuplicatePaid`.
fn write_error(err: sqlx::Error, user_id: Uuid, event_id: Uuid) -> StoreError {
  if is_unique_violation(&err) {
    warn!(%user_id, %event_id, "Paid-seat index rejected a write.");
    return StoreError::DuplicatePaid { user_id, event_id };
  }
  backend(err)
}

#[derive(Clone)]
pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Serializes every writer touching the paid seat of (user, event) until the
  /// transaction ends.
  async fn lock_seat(tx: &mut Transaction<'_, Postgres>, user_id: Uuid, event_id: Uuid) -> Result<(), StoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
      .bind(format!("seat:{}:{}", user_id, event_id))
      .execute(&mut **tx)
      .await
      .map_err(backend)?;
    Ok(())
  }

  async fn paid_exists(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    event_id: Uuid,
    except: Option<Uuid>,
  ) -> Result<bool, StoreError> {
    sqlx::query_scalar::<_, bool>(
      "SELECT EXISTS (SELECT 1 FROM orders WHERE user_id = $1 AND event_id = $2 AND status = 'paid' \
       AND ($3::uuid IS NULL OR id <> $3))",
    )
    .bind(user_id)
    .bind(event_id)
    .bind(except)
    .fetch_one(&mut **tx)
    .await
    .map_err(backend)
  }
}

#[async_trait]
impl OrderStore for PgOrderStore {
  #[instrument(name = "PgOrderStore::insert_guarded", skip_all, fields(order_id = %order.id))]
  async fn insert_guarded(&self, order: Order) -> Result<Order, StoreError> {
    let mut tx = self.pool.begin().await.map_err(backend)?;
    Self::lock_seat(&mut tx, order.user_id, order.event_id).await?;
    if Self::paid_exists(&mut tx, order.user_id, order.event_id, None).await? {
      return Err(StoreError::DuplicatePaid {
        user_id: order.user_id,
        event_id: order.event_id,
      });
    }

    sqlx::query(concat!(
      "INSERT INTO orders (",
      order_columns!(),
      ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
    ))
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.event_id)
    .bind(order.meal_option_id)
    .bind(order.amount)
    .bind(order.admin_fee)
    .bind(order.payment_method.map(PaymentMethod::as_str))
    .bind(order.payment_reference.as_deref())
    .bind(order.proof_reference.as_deref())
    .bind(order.status.as_str())
    .bind(order.created_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| write_error(e, order.user_id, order.event_id))?;

    tx.commit().await.map_err(backend)?;
    debug!("Order row inserted.");
    Ok(order)
  }

  async fn get(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    sqlx::query_as::<_, OrderRow>(concat!("SELECT ", order_columns!(), " FROM orders WHERE id = $1"))
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?
      .map(OrderRow::into_order)
      .transpose()
  }

  async fn has_paid(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
    sqlx::query_scalar::<_, bool>(
      "SELECT EXISTS (SELECT 1 FROM orders WHERE user_id = $1 AND event_id = $2 AND status = 'paid')",
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_one(&self.pool)
    .await
    .map_err(backend)
  }

  #[instrument(
    name = "PgOrderStore::apply",
    skip_all,
    fields(order_id = %change.order_id, expected = %change.expected, target = %change.target)
  )]
  async fn apply(&self, change: StatusChange) -> Result<Order, StoreError> {
    let mut tx = self.pool.begin().await.map_err(backend)?;

    let current = sqlx::query_as::<_, OrderRow>(concat!(
      "SELECT ",
      order_columns!(),
      " FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(change.order_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(backend)?
    .ok_or(StoreError::NotFound(change.order_id))?
    .into_order()?;

    if current.status != change.expected {
      return Err(StoreError::StatusConflict {
        order_id: change.order_id,
        expected: change.expected,
        actual: current.status,
        target: change.target,
      });
    }
    if change.target == OrderStatus::Paid {
      Self::lock_seat(&mut tx, current.user_id, current.event_id).await?;
      if Self::paid_exists(&mut tx, current.user_id, current.event_id, Some(current.id)).await? {
        return Err(StoreError::DuplicatePaid {
          user_id: current.user_id,
          event_id: current.event_id,
        });
      }
    }

    let updated = sqlx::query_as::<_, OrderRow>(concat!(
      "UPDATE orders SET status = $2, payment_reference = COALESCE($3, payment_reference) WHERE id = $1 RETURNING ",
      order_columns!()
    ))
    .bind(change.order_id)
    .bind(change.target.as_str())
    .bind(change.payment_reference.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| write_error(e, current.user_id, current.event_id))?
    .into_order()?;

    tx.commit().await.map_err(backend)?;
    Ok(updated)
  }

  async fn attach_proof(&self, order_id: Uuid, reference: String) -> Result<Order, StoreError> {
    let updated = sqlx::query_as::<_, OrderRow>(concat!(
      "UPDATE orders SET proof_reference = $2 WHERE id = $1 AND status = 'processing' RETURNING ",
      order_columns!()
    ))
    .bind(order_id)
    .bind(&reference)
    .fetch_optional(&self.pool)
    .await
    .map_err(backend)?;

    match updated {
      Some(row) => row.into_order(),
      None => match self.get(order_id).await? {
        Some(current) => Err(StoreError::StatusConflict {
          order_id,
          expected: OrderStatus::Processing,
          actual: current.status,
          target: OrderStatus::Processing,
        }),
        None => Err(StoreError::NotFound(order_id)),
      },
    }
  }

  async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
    let rows = sqlx::query_as::<_, OrderRow>(concat!(
      "SELECT ",
      order_columns!(),
      " FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) AND ($2::uuid IS NULL OR event_id = $2) \
       AND ($3::text IS NULL OR status = $3) AND ($4::text IS NULL OR payment_method = $4) \
       ORDER BY created_at DESC"
    ))
    .bind(query.user_id)
    .bind(query.event_id)
    .bind(query.status.map(OrderStatus::as_str))
    .bind(query.payment_method.map(PaymentMethod::as_str))
    .fetch_all(&self.pool)
    .await
    .map_err(backend)?;

    rows.into_iter().map(OrderRow::into_order).collect()
  }
}

#[derive(Debug, FromRow)]
struct EventRow {
  id: Uuid,
  title: String,
  starts_at: DateTime<Utc>,
  fee: Decimal,
  admin_fee: Decimal,
  status: String,
}

fn parse_event_status(raw: &str) -> Result<EventStatus, StoreError> {
  match raw {
    "active" => Ok(EventStatus::Active),
    "cancelled" => Ok(EventStatus::Cancelled),
    "completed" => Ok(EventStatus::Completed),
    other => Err(StoreError::Backend(anyhow::anyhow!("unknown event status '{}'", other))),
  }
}

impl EventRow {
  fn into_event(self) -> Result<Event, StoreError> {
    Ok(Event {
      status: parse_event_status(&self.status)?,
      id: self.id,
      title: self.title,
      starts_at: self.starts_at,
      fee: self.fee,
      admin_fee: self.admin_fee,
    })
  }
}

#[derive(Debug, FromRow)]
struct CustomerRow {
  id: Uuid,
  name: String,
  phone: String,
  email: Option<String>,
  is_admin: bool,
}

#[derive(Clone)]
pub struct PgCatalog {
  pool: PgPool,
}

impl PgCatalog {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl CatalogStore for PgCatalog {
  async fn event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
    sqlx::query_as::<_, EventRow>("SELECT id, title, starts_at, fee, admin_fee, status FROM events WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?
      .map(EventRow::into_event)
      .transpose()
  }

  async fn meal_option(&self, id: Uuid) -> Result<Option<MealOption>, StoreError> {
    let row: Option<(Uuid, Uuid, String)> = sqlx::query_as("SELECT id, event_id, name FROM meal_options WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?;
    Ok(row.map(|(id, event_id, name)| MealOption { id, event_id, name }))
  }

  async fn customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
    let row = sqlx::query_as::<_, CustomerRow>("SELECT id, name, phone, email, is_admin FROM customers WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?;
    Ok(row.map(|row| Customer {
      id: row.id,
      name: row.name,
      phone: row.phone,
      email: row.email,
      is_admin: row.is_admin,
    }))
  }

  async fn events(&self) -> Result<Vec<Event>, StoreError> {
    sqlx::query_as::<_, EventRow>(
      "SELECT id, title, starts_at, fee, admin_fee, status FROM events ORDER BY starts_at DESC",
    )
    .fetch_all(&self.pool)
    .await
    .map_err(backend)?
    .into_iter()
    .map(EventRow::into_event)
    .collect()
  }
}
