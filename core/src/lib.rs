// seatbook/src/lib.rs

//! Seatbook: order lifecycle and payment reconciliation for event bookings.
//!
//! An order is created by one of two payment paths and driven to a terminal
//! status:
//!  - The gateway path creates a `pending` order, opens a checkout session and
//!    settles on the gateway's signed success or cancel callback.
//!  - The manual path validates an uploaded proof of payment, creates a
//!    `processing` order, stores the proof and waits for an administrator.
//!
//! Across both, a user holds at most one `paid` order per event. The check
//! lives in the `OrderStore` implementations so that it holds under
//! concurrent requests.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod flow;
pub mod flows;
pub mod gateway;
pub mod guard;
pub mod order;
pub mod proof;
pub mod reconcile;
pub mod reference;
pub mod report;
pub mod state;
pub mod store;

pub use crate::catalog::{CatalogStore, Customer, Event, EventStatus, MealOption};
pub use crate::config::EngineConfig;
pub use crate::engine::{BookingEngine, GatewayCheckout, Quote};
pub use crate::error::{BookingError, BookingResult, GatewayError, StoreError};
pub use crate::flow::{Flow, FlowContext, FlowError, FlowOutcome, StepControl};
pub use crate::flows::BookingRequest;
pub use crate::gateway::{CallbackOutcome, CallbackSigner, CheckoutRequest, CheckoutSession, LineItem, PaymentGateway};
pub use crate::guard::BookingGuard;
pub use crate::order::{Order, OrderStatus, PaymentMethod, StatusChange, Transition};
pub use crate::proof::{InMemoryProofStore, ProofPolicy, ProofStore, ProofUpload};
pub use crate::reconcile::AdminCapability;
pub use crate::report::{CsvExport, OrderReportRow, ReportScope, Sheet, SheetNamer, Workbook};
pub use crate::state::EngineState;
pub use crate::store::{InMemoryCatalog, InMemoryOrderStore, OrderQuery, OrderStore};
