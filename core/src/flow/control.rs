// seatbook/src/flow/control.rs

/// Returned by a step handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  Continue,
  /// Halt the flow; no further handlers or steps run.
  Stop,
}

/// Outcome of a complete flow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every step that was not skipped ran to completion.
  Completed,
  /// A handler returned `StepControl::Stop`.
  Stopped,
}
