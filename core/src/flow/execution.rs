// seatbook/src/flow/execution.rs

//! `Flow::run()`: walks the steps in order and drives their handlers.

use super::control::{FlowOutcome, StepControl};
use super::definition::{Flow, StepHandler};
use super::{FlowContext, FlowError};
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx`.
  ///
  /// Returns `Stopped` as soon as a handler asks to stop, and the handler's
  /// error unchanged as soon as one fails.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(flow = %self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: FlowContext<TData>) -> Result<FlowOutcome, Err> {
    event!(Level::DEBUG, "Flow starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = span!(Level::DEBUG, "flow_step", step_name = step_name, step_index = step_idx);

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(&ctx) {
          event!(Level::DEBUG, step_name = step_name, "Step skipped by condition.");
          continue;
        }
      }

      let on_handlers = self.on.get(step_name).filter(|v| !v.is_empty());
      let after_handlers = self.after.get(step_name).filter(|v| !v.is_empty());

      if on_handlers.is_none() && after_handlers.is_none() {
        if step_def.optional {
          event!(Level::DEBUG, step_name = step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step_name = step_name, "Non-optional step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      for handlers in [on_handlers, after_handlers].into_iter().flatten() {
        let control = run_phase(handlers, &ctx).instrument(step_span.clone()).await?;
        if control == StepControl::Stop {
          event!(Level::INFO, step_name = step_name, "Flow stopped by a handler.");
          return Ok(FlowOutcome::Stopped);
        }
      }
    }

    event!(Level::DEBUG, "Flow completed.");
    Ok(FlowOutcome::Completed)
  }
}

async fn run_phase<TData, Err>(
  handlers: &[StepHandler<TData, Err>],
  ctx: &FlowContext<TData>,
) -> Result<StepControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for handler in handlers {
    match handler(ctx.clone()).await {
      Ok(StepControl::Continue) => {}
      Ok(StepControl::Stop) => return Ok(StepControl::Stop),
      Err(e) => {
        event!(Level::WARN, error = %e, "Step handler failed.");
        return Err(e);
      }
    }
  }
  Ok(StepControl::Continue)
}
