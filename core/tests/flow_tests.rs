// tests/flow_tests.rs
mod common;

use common::*;
use seatbook::flow::SkipCondition;
use seatbook::{Flow, FlowContext, FlowError, FlowOutcome, StepControl};
use std::sync::Arc;

#[tokio::test]
async fn test_flow_runs_steps_in_order() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(
    "ordered",
    &[("step1", false, None), ("step2", false, None), ("step3", false, None)],
  );
  flow.on_step("step1", create_simple_handler("step1", " S1"));
  flow.on_step("step2", create_simple_handler("step2", " S2"));
  flow.on_step("step3", create_simple_handler("step3", " S3"));

  let ctx = FlowContext::new(TestContext::default());
  let result = flow.run(ctx.clone()).await;

  assert_eq!(result, Ok(FlowOutcome::Completed));
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
async fn test_flow_stops_when_a_handler_says_stop() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(
    "stopping",
    &[("stepA", false, None), ("stopStep", false, None), ("stepC", false, None)],
  );
  flow.on_step("stepA", create_simple_handler("stepA", "A"));
  flow.on_step("stopStep", create_simple_handler("stopStep", "S"));
  flow.on_step("stepC", create_simple_handler("stepC", "C"));

  let ctx = FlowContext::new(TestContext {
    should_stop_at: Some("stopStep".to_string()),
    ..TestContext::default()
  });
  let result = flow.run(ctx.clone()).await;

  assert_eq!(result, Ok(FlowOutcome::Stopped));
  assert_eq!(ctx.read().steps_executed, vec!["stepA", "stopStep"]);
}

#[tokio::test]
async fn test_flow_propagates_handler_error_unchanged() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(
    "failing",
    &[("good_step", false, None), ("bad_step", false, None), ("never_step", false, None)],
  );
  flow.on_step("good_step", create_simple_handler("good_step", "Good"));
  flow.on_step("bad_step", create_failing_handler("bad_step", "I am a bad step!"));
  flow.on_step("never_step", create_simple_handler("never_step", "Never"));

  let ctx = FlowContext::new(TestContext::default());
  let result = flow.run(ctx.clone()).await;

  assert_eq!(result, Err(TestError::Handler("I am a bad step!".to_string())));
  assert_eq!(ctx.read().steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
async fn test_flow_reports_missing_handler_for_required_step() {
  setup_tracing();
  let flow = Flow::<TestContext, TestError>::new("incomplete", &[("missing", false, None)]);

  let result = flow.run(FlowContext::new(TestContext::default())).await;

  assert_eq!(
    result,
    Err(TestError::Flow(FlowError::HandlerMissing {
      step_name: "missing".to_string()
    }))
  );
}

#[tokio::test]
async fn test_optional_step_without_handlers_is_skipped() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(
    "optional",
    &[("first", false, None), ("maybe", true, None), ("last", false, None)],
  );
  flow.on_step("first", create_simple_handler("first", "F"));
  flow.on_step("last", create_simple_handler("last", "L"));

  let ctx = FlowContext::new(TestContext::default());
  assert_eq!(flow.run(ctx.clone()).await, Ok(FlowOutcome::Completed));
  assert_eq!(ctx.read().message, "FL");
}

#[tokio::test]
async fn test_skip_condition_skips_step() {
  setup_tracing();
  let skip_when_counted: SkipCondition<TestContext> = Arc::new(|ctx: &FlowContext<TestContext>| ctx.read().counter > 0);
  let mut flow = Flow::<TestContext, TestError>::new(
    "conditional",
    &[("count", false, None), ("guarded", false, Some(skip_when_counted)), ("tail", false, None)],
  );
  flow.on_step("count", create_simple_handler("count", "1"));
  flow.on_step("guarded", create_failing_handler("guarded", "should have been skipped"));
  flow.on_step("tail", create_simple_handler("tail", "2"));

  let ctx = FlowContext::new(TestContext::default());
  assert_eq!(flow.run(ctx.clone()).await, Ok(FlowOutcome::Completed));
  assert_eq!(ctx.read().steps_executed, vec!["count", "tail"]);
}

#[tokio::test]
async fn test_after_handlers_run_after_on_handlers() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new("phased", &[("work", false, None)]);
  flow.after_step("work", create_simple_handler("after", "B"));
  flow.on_step("work", create_simple_handler("on", "A"));
  flow.on_step("work", |ctx: FlowContext<TestContext>| async move {
    ctx.write().message.push('a');
    Ok::<_, TestError>(StepControl::Continue)
  });

  let ctx = FlowContext::new(TestContext::default());
  assert_eq!(flow.run(ctx.clone()).await, Ok(FlowOutcome::Completed));
  assert_eq!(ctx.read().message, "AaB");
}

#[test]
#[should_panic(expected = "not declared")]
fn test_registering_handler_for_unknown_step_panics() {
  let mut flow = Flow::<TestContext, TestError>::new("typo", &[("real", false, None)]);
  flow.on_step("rael", create_simple_handler("rael", "x"));
}

#[test]
fn test_flow_exposes_declared_steps() {
  let flow = Flow::<TestContext, TestError>::new("named", &[("a", false, None), ("b", true, None)]);
  assert_eq!(flow.name(), "named");
  assert_eq!(flow.step_names(), vec!["a", "b"]);
}
