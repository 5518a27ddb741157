// seatbook/src/store/memory.rs

//! In-process implementations of `OrderStore` and `CatalogStore`.
//!
//! Every write runs inside one `parking_lot` critical section, which is what makes
//! the guarded insert and the paid transition atomic here.

use super::{OrderQuery, OrderStore};
use crate::catalog::{CatalogStore, Customer, Event, MealOption};
use crate::error::StoreError;
use crate::order::{Order, OrderStatus, StatusChange};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
  orders: Mutex<HashMap<Uuid, Order>>,
  fail_writes: AtomicBool,
}

impl InMemoryOrderStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Makes every subsequent write fail with a backend error (writes nothing).
  pub fn fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }

  pub fn len(&self) -> usize {
    self.orders.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.orders.lock().is_empty()
  }

  fn check_writable(&self) -> Result<(), StoreError> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(StoreError::Backend(anyhow::anyhow!("order store is rejecting writes")));
    }
    Ok(())
  }
}

fn paid_exists(orders: &HashMap<Uuid, Order>, user_id: Uuid, event_id: Uuid, except: Option<Uuid>) -> bool {
  orders.values().any(|o| {
    o.user_id == user_id && o.event_id == event_id && o.status == OrderStatus::Paid && Some(o.id) != except
  })
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
  async fn insert_guarded(&self, order: Order) -> Result<Order, StoreError> {
    let mut orders = self.orders.lock();
    if paid_exists(&orders, order.user_id, order.event_id, None) {
      return Err(StoreError::DuplicatePaid {
        user_id: order.user_id,
        event_id: order.event_id,
      });
    }
    self.check_writable()?;
    orders.insert(order.id, order.clone());
    Ok(order)
  }

  async fn get(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    Ok(self.orders.lock().get(&order_id).cloned())
  }

  async fn has_paid(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
    Ok(paid_exists(&self.orders.lock(), user_id, event_id, None))
  }

  async fn apply(&self, change: StatusChange) -> Result<Order, StoreError> {
    let mut orders = self.orders.lock();
    let current = orders.get(&change.order_id).ok_or(StoreError::NotFound(change.order_id))?;

    if current.status != change.expected {
      return Err(StoreError::StatusConflict {
        order_id: change.order_id,
        expected: change.expected,
        actual: current.status,
        target: change.target,
      });
    }
    if change.target == OrderStatus::Paid && paid_exists(&orders, current.user_id, current.event_id, Some(current.id)) {
      return Err(StoreError::DuplicatePaid {
        user_id: current.user_id,
        event_id: current.event_id,
      });
    }
    self.check_writable()?;

    let mut updated = current.clone();
    updated.status = change.target;
    if let Some(reference) = change.payment_reference {
      updated.payment_reference = Some(reference);
    }
    orders.insert(updated.id, updated.clone());
    Ok(updated)
  }

  async fn attach_proof(&self, order_id: Uuid, reference: String) -> Result<Order, StoreError> {
    let mut orders = self.orders.lock();
    let current = orders.get(&order_id).ok_or(StoreError::NotFound(order_id))?;
    if current.status != OrderStatus::Processing {
      return Err(StoreError::StatusConflict {
        order_id,
        expected: OrderStatus::Processing,
        actual: current.status,
        target: OrderStatus::Processing,
      });
    }
    self.check_writable()?;

    let mut updated = current.clone();
    updated.proof_reference = Some(reference);
    orders.insert(order_id, updated.clone());
    Ok(updated)
  }

  async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
    let mut found: Vec<Order> = self.orders.lock().values().filter(|o| query.matches(o)).cloned().collect();
    found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(found)
  }
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
  events: RwLock<HashMap<Uuid, Event>>,
  meal_options: RwLock<HashMap<Uuid, MealOption>>,
  customers: RwLock<HashMap<Uuid, Customer>>,
}

impl InMemoryCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_event(&self, event: Event) {
    self.events.write().insert(event.id, event);
  }

  pub fn insert_meal_option(&self, meal: MealOption) {
    self.meal_options.write().insert(meal.id, meal);
  }

  pub fn insert_customer(&self, customer: Customer) {
    self.customers.write().insert(customer.id, customer);
  }

  /// Edits an event's fees the way the catalog owner would.
  pub fn set_event_fees(&self, event_id: Uuid, fee: Decimal, admin_fee: Decimal) {
    if let Some(event) = self.events.write().get_mut(&event_id) {
      event.fee = fee;
      event.admin_fee = admin_fee;
    }
  }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
  async fn event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
    Ok(self.events.read().get(&id).cloned())
  }

  async fn meal_option(&self, id: Uuid) -> Result<Option<MealOption>, StoreError> {
    Ok(self.meal_options.read().get(&id).cloned())
  }

  async fn customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
    Ok(self.customers.read().get(&id).cloned())
  }

  async fn events(&self) -> Result<Vec<Event>, StoreError> {
    let mut events: Vec<Event> = self.events.read().values().cloned().collect();
    events.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
    Ok(events)
  }
}
