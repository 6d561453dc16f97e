//! Tests for the single-node lifecycle, retries and fallbacks.
mod common;
use common::*;
use nagare::prelude::*;
use std::time::Duration;

#[test]
fn test_standalone_lifecycle_writes_context() {
    let mut node = SetNumberNode { number: 7 };
    let mut ctx = Context::new();
    let params = Params::from([("multiplier", 2i64)]);

    let action = Runnable::run(&mut node, &mut ctx, &params).unwrap();

    assert_eq!(ctx.get_as::<i64>("currentValue").unwrap(), 14);
    assert_eq!(action, None);
}

#[test]
fn test_post_action_is_returned() {
    let mut node = SetNumberNode { number: 7 };
    let mut ctx = Context::new();
    let params = Params::from([("multiplier", 3i64)]);

    let action = Runnable::run(&mut node, &mut ctx, &params).unwrap();
    assert_eq!(action.as_deref(), Some("over_20"));
}

#[test]
fn test_prep_failure_propagates_context_error() {
    let mut node = AddNumberNode { number: 1 };
    let mut ctx = Context::new();

    let err = Runnable::run(&mut node, &mut ctx, &Params::new()).unwrap_err();
    assert!(matches!(
        err,
        FlowError::Context(ContextError::MissingKey { ref key }) if key == "currentValue"
    ));
    assert!(ctx.is_empty());
}

#[test]
fn test_retry_succeeds_on_third_attempt() {
    let mut node = FlakyNode::new(2, 3);
    let mut ctx = Context::new();

    Runnable::run(&mut node, &mut ctx, &Params::new()).unwrap();

    assert_eq!(node.exec_calls, 3);
    assert_eq!(node.waits, vec![Duration::from_millis(5); 2]);
    assert!(node.fallback_errors.is_empty());
    assert_eq!(ctx.get_as::<String>("flaky_result").unwrap(), "ok");
}

#[test]
fn test_no_wait_on_first_success() {
    let mut node = FlakyNode::new(0, 5);
    Runnable::run(&mut node, &mut Context::new(), &Params::new()).unwrap();

    assert_eq!(node.exec_calls, 1);
    assert!(node.waits.is_empty());
}

#[test]
fn test_exhaustion_invokes_fallback_with_last_error() {
    let mut node = FlakyNode::new(10, 2).recovering_with("fallback_value");
    let mut ctx = Context::new();

    Runnable::run(&mut node, &mut ctx, &Params::new()).unwrap();

    assert_eq!(node.exec_calls, 2);
    // No wait after the final attempt
    assert_eq!(node.waits.len(), 1);
    assert_eq!(node.fallback_errors, vec!["Execution failed: failure #2"]);
    assert_eq!(ctx.get_as::<String>("flaky_result").unwrap(), "fallback_value");
}

#[test]
fn test_single_attempt_goes_straight_to_fallback() {
    let mut node = FlakyNode::new(1, 1).recovering_with("recovered");
    Runnable::run(&mut node, &mut Context::new(), &Params::new()).unwrap();

    assert_eq!(node.exec_calls, 1);
    assert!(node.waits.is_empty());
    assert_eq!(node.fallback_errors.len(), 1);
}

#[test]
fn test_default_fallback_reports_retries_exhausted() {
    let mut node = FailingNode;
    let err = Runnable::run(&mut node, &mut Context::new(), &Params::new()).unwrap_err();

    match err {
        FlowError::RetriesExhausted {
            attempts, source, ..
        } => {
            assert_eq!(attempts, 1);
            assert!(matches!(*source, FlowError::Execution(ref m) if m == "boom"));
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }
}

#[test]
fn test_custom_fallback_without_recovery_passes_exhaustion_through() {
    let mut node = FlakyNode::new(10, 3);
    let err = Runnable::run(&mut node, &mut Context::new(), &Params::new()).unwrap_err();

    assert!(matches!(
        err,
        FlowError::RetriesExhausted { ref node, attempts: 3, .. } if node == "flaky"
    ));
    assert_eq!(node.exec_calls, 3);
}

#[test]
fn test_failing_fallback_is_fatal() {
    let mut node = FlakyNode::new(10, 2).failing_fallback("no recovery possible");
    let mut ctx = Context::new();

    let err = Runnable::run(&mut node, &mut ctx, &Params::new()).unwrap_err();

    match err {
        FlowError::FallbackFailed {
            node,
            original,
            source,
        } => {
            assert_eq!(node, "flaky");
            assert_eq!(original, "Execution failed: failure #2");
            assert_eq!(source.to_string(), "Execution failed: no recovery possible");
        }
        other => panic!("Expected FallbackFailed, got {:?}", other),
    }
    // post never ran
    assert!(!ctx.contains_key("flaky_result"));
}

#[test]
fn test_default_name_is_type_name() {
    let node = FailingNode;
    assert!(Runnable::name(&node).ends_with("FailingNode"));

    let flaky = FlakyNode::new(0, 1);
    assert_eq!(Runnable::name(&flaky), "flaky");
}
