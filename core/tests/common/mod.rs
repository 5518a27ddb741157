// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use seatbook::flow::StepHandler;
use seatbook::{
  AdminCapability, BookingEngine, BookingRequest, CallbackOutcome, CheckoutRequest, CheckoutSession, Customer,
  EngineConfig, Event, EventStatus, FlowContext, FlowError, GatewayError, InMemoryCatalog, InMemoryOrderStore,
  InMemoryProofStore, MealOption, Order, OrderQuery, OrderStore, PaymentGateway, ProofUpload, StatusChange,
  StepControl, StoreError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

// --- Tracing (once per test binary) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Flow runner fixtures ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow error: {0}")]
  Flow(#[from] FlowError),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

pub fn create_simple_handler(step_name: &'static str, message_to_append: &'static str) -> StepHandler<TestContext, TestError> {
  Box::new(move |ctx: FlowContext<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(StepControl::Stop);
      }
      Ok(StepControl::Continue)
    })
  })
}

pub fn create_failing_handler(step_name: &'static str, error_message: &'static str) -> StepHandler<TestContext, TestError> {
  Box::new(move |ctx: FlowContext<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

// --- Payment gateway double ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
  Succeed,
  Reject,
  /// Never answers; only the engine's timeout ends the call.
  Hang,
}

pub struct MockGateway {
  mode: Mutex<GatewayMode>,
  pub requests: Mutex<Vec<CheckoutRequest>>,
  pub calls: AtomicUsize,
}

impl MockGateway {
  pub fn new(mode: GatewayMode) -> Self {
    Self {
      mode: Mutex::new(mode),
      requests: Mutex::new(Vec::new()),
      calls: AtomicUsize::new(0),
    }
  }

  pub fn set_mode(&self, mode: GatewayMode) {
    *self.mode.lock() = mode;
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn last_request(&self) -> Option<CheckoutRequest> {
    self.requests.lock().last().cloned()
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.requests.lock().push(request.clone());
    let mode = *self.mode.lock();
    match mode {
      GatewayMode::Succeed => Ok(CheckoutSession {
        session_id: format!("cs_test_{}", request.order_id.simple()),
        redirect_url: format!("https://checkout.test/pay/{}", request.order_id),
      }),
      GatewayMode::Reject => Err(GatewayError::Rejected {
        status: 502,
        body: "upstream unavailable".to_string(),
      }),
      GatewayMode::Hang => std::future::pending::<Result<CheckoutSession, GatewayError>>().await,
    }
  }
}

// --- Order store double ---
/// Wraps the in-memory store so a test can commit a status change just before
/// the engine's next `apply`, or make `apply` fail on its own.
pub struct ScriptedStore {
  pub inner: Arc<InMemoryOrderStore>,
  before_next_apply: Mutex<Option<StatusChange>>,
  fail_applies: Mutex<bool>,
}

impl ScriptedStore {
  pub fn new(inner: Arc<InMemoryOrderStore>) -> Self {
    Self {
      inner,
      before_next_apply: Mutex::new(None),
      fail_applies: Mutex::new(false),
    }
  }

  pub fn commit_before_next_apply(&self, change: StatusChange) {
    *self.before_next_apply.lock() = Some(change);
  }

  pub fn fail_applies(&self, fail: bool) {
    *self.fail_applies.lock() = fail;
  }
}

#[async_trait]
impl OrderStore for ScriptedStore {
  async fn insert_guarded(&self, order: Order) -> Result<Order, StoreError> {
    self.inner.insert_guarded(order).await
  }

  async fn get(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    self.inner.get(order_id).await
  }

  async fn has_paid(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
    self.inner.has_paid(user_id, event_id).await
  }

  async fn apply(&self, change: StatusChange) -> Result<Order, StoreError> {
    if *self.fail_applies.lock() {
      return Err(StoreError::Backend(anyhow::anyhow!("order store is read-only")));
    }
    let queued = self.before_next_apply.lock().take();
    if let Some(earlier) = queued {
      self.inner.apply(earlier).await?;
    }
    self.inner.apply(change).await
  }

  async fn attach_proof(&self, order_id: Uuid, reference: String) -> Result<Order, StoreError> {
    self.inner.attach_proof(order_id, reference).await
  }

  async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
    self.inner.list(query).await
  }
}

// --- Engine harness ---
pub const TEST_SECRET: &str = "test-callback-secret";

pub struct Harness {
  pub engine: Arc<BookingEngine>,
  pub catalog: Arc<InMemoryCatalog>,
  pub orders: Arc<InMemoryOrderStore>,
  pub gateway: Arc<MockGateway>,
  pub proofs: Arc<InMemoryProofStore>,
  pub event: Event,
  pub meal: MealOption,
  pub customer: Customer,
  pub admin: Customer,
}

pub fn test_config() -> EngineConfig {
  EngineConfig {
    gateway_timeout: Duration::from_millis(100),
    callback_base_url: "https://seats.test/api/v1".to_string(),
    callback_secret: TEST_SECRET.to_string(),
    ..EngineConfig::default()
  }
}

pub fn harness() -> Harness {
  harness_with(test_config())
}

pub fn harness_with(config: EngineConfig) -> Harness {
  setup_tracing();
  let catalog = Arc::new(InMemoryCatalog::new());
  let orders = Arc::new(InMemoryOrderStore::new());
  let gateway = Arc::new(MockGateway::new(GatewayMode::Succeed));
  let proofs = Arc::new(InMemoryProofStore::new());

  let event = event_fixture("Charity Dinner", 7, EventStatus::Active);
  let meal = meal_fixture(&event, "Chicken Rice");
  let customer = customer_fixture("Aisyah", false);
  let admin = customer_fixture("Admin", true);
  catalog.insert_event(event.clone());
  catalog.insert_meal_option(meal.clone());
  catalog.insert_customer(customer.clone());
  catalog.insert_customer(admin.clone());

  let engine = Arc::new(BookingEngine::new(
    catalog.clone(),
    orders.clone(),
    gateway.clone(),
    proofs.clone(),
    config,
  ));

  Harness {
    engine,
    catalog,
    orders,
    gateway,
    proofs,
    event,
    meal,
    customer,
    admin,
  }
}

/// Fee 50, admin fee 1, starting `day` days into March 2026.
pub fn event_fixture(title: &str, day: u32, status: EventStatus) -> Event {
  Event {
    id: Uuid::new_v4(),
    title: title.to_string(),
    starts_at: Utc.with_ymd_and_hms(2026, 3, day, 19, 0, 0).unwrap(),
    fee: dec!(50),
    admin_fee: dec!(1),
    status,
  }
}

pub fn meal_fixture(event: &Event, name: &str) -> MealOption {
  MealOption {
    id: Uuid::new_v4(),
    event_id: event.id,
    name: name.to_string(),
  }
}

pub fn customer_fixture(name: &str, is_admin: bool) -> Customer {
  Customer {
    id: Uuid::new_v4(),
    name: name.to_string(),
    phone: "+60 12-345 6789".to_string(),
    email: Some(format!("{}@example.test", name.to_lowercase())),
    is_admin,
  }
}

impl Harness {
  /// A second engine over the same catalog, orders and gateway, whose order
  /// writes go through a `ScriptedStore`.
  pub fn scripted_engine(&self) -> (BookingEngine, Arc<ScriptedStore>) {
    let store = Arc::new(ScriptedStore::new(self.orders.clone()));
    let engine = BookingEngine::new(
      self.catalog.clone(),
      store.clone(),
      self.gateway.clone(),
      self.proofs.clone(),
      test_config(),
    );
    (engine, store)
  }

  pub fn request_for(&self, user_id: Uuid) -> BookingRequest {
    BookingRequest {
      user_id,
      event_id: self.event.id,
      meal_option_id: self.meal.id,
    }
  }

  pub fn request(&self) -> BookingRequest {
    self.request_for(self.customer.id)
  }

  pub fn add_customer(&self, name: &str) -> Customer {
    let customer = customer_fixture(name, false);
    self.catalog.insert_customer(customer.clone());
    customer
  }

  /// The token the gateway would carry back on the success redirect.
  pub fn token_for(&self, order_id: Uuid) -> String {
    self.engine.state().signer.sign(order_id, CallbackOutcome::Success)
  }

  pub fn cancel_token_for(&self, order_id: Uuid) -> String {
    self.engine.state().signer.sign(order_id, CallbackOutcome::Cancel)
  }

  pub async fn admin_cap(&self) -> AdminCapability {
    AdminCapability::verify(self.catalog.as_ref(), self.admin.id)
      .await
      .expect("fixture admin is an administrator")
  }
}

pub fn png_upload() -> ProofUpload {
  ProofUpload::new("transfer-receipt.png", vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])
}

pub fn hours(n: i64) -> ChronoDuration {
  ChronoDuration::hours(n)
}
