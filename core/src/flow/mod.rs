// seatbook/src/flow/mod.rs

//! A small step runner for multi-step booking flows.
//!
//! A `Flow<TData, Err>` is an ordered list of named steps. Each step carries `on`
//! handlers (the work) and optional `after` handlers (follow-up on the same
//! context). Handlers receive a clone of the shared `FlowContext<TData>` and
//! return a `StepControl` telling the runner whether to carry on.

pub mod context;
pub mod control;
pub mod definition;
pub mod execution;
pub mod step;

pub use context::FlowContext;
pub use control::{FlowOutcome, StepControl};
pub use definition::{Flow, StepHandler};
pub use step::{SkipCondition, StepDef};

use thiserror::Error;

/// Failures raised by the runner itself rather than by step handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Flow '{flow}' completed without producing {missing}")]
  Incomplete { flow: String, missing: &'static str },
}
