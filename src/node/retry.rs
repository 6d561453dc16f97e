//! Bounded retry with an inter-attempt delay and a fallback hook.

use super::Node;
use crate::error::FlowError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Attempt budget and delay applied to a node's execute phase.
///
/// Both values are validated when the policy is built, so a policy in hand is
/// always usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RetryPolicyConfig", into = "RetryPolicyConfig")]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

/// The unvalidated, serialized form of a `RetryPolicy`,
/// e.g. `{"max_attempts": 3, "wait_millis": 100}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    pub max_attempts: u32,
    #[serde(default)]
    pub wait_millis: i64,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` calls, separated by `delay`.
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, FlowError> {
        if max_attempts < 1 {
            return Err(FlowError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    /// Creates a policy from a millisecond delay, rejecting negative values.
    pub fn from_millis(max_attempts: u32, wait_millis: i64) -> Result<Self, FlowError> {
        if wait_millis < 0 {
            return Err(FlowError::InvalidConfig(format!(
                "wait_millis cannot be negative, got {}",
                wait_millis
            )));
        }
        Self::new(max_attempts, Duration::from_millis(wait_millis as u64))
    }

    /// Parses and validates a policy from JSON.
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        serde_json::from_str(json)
            .map_err(|e| FlowError::InvalidConfig(format!("Failed to parse retry policy: {}", e)))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

impl TryFrom<RetryPolicyConfig> for RetryPolicy {
    type Error = FlowError;

    fn try_from(raw: RetryPolicyConfig) -> Result<Self, Self::Error> {
        Self::from_millis(raw.max_attempts, raw.wait_millis)
    }
}

impl From<RetryPolicy> for RetryPolicyConfig {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            wait_millis: policy.delay.as_millis().min(i64::MAX as u128) as i64,
        }
    }
}

/// Calls `op` until it succeeds or the attempt budget is spent, calling `wait`
/// between consecutive attempts. Returns the last failure on exhaustion.
pub(crate) fn attempt<N: ?Sized, T>(
    target: &mut N,
    policy: RetryPolicy,
    mut op: impl FnMut(&mut N) -> Result<T, FlowError>,
    mut wait: impl FnMut(&mut N, Duration),
) -> Result<T, FlowError> {
    let mut attempt = 1;
    loop {
        match op(target) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts => {
                debug!(attempt, max_attempts = policy.max_attempts, error = %e, "Attempt failed, retrying");
                wait(target, policy.delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Maps the outcome of a fallback hook. A `RetriesExhausted` error (what the
/// default fallbacks raise) passes through; any other failure becomes
/// `FallbackFailed`, carrying the message of the failure that triggered it.
pub(crate) fn recover<T>(
    node: &str,
    original: String,
    outcome: Result<T, FlowError>,
) -> Result<T, FlowError> {
    match outcome {
        Ok(value) => Ok(value),
        Err(e @ FlowError::RetriesExhausted { .. }) => Err(e),
        Err(e) => Err(FlowError::FallbackFailed {
            node: node.to_string(),
            original,
            source: Box::new(e),
        }),
    }
}

/// The default execute-with-policy of a `Node`.
pub(crate) fn execute<N: Node + ?Sized>(node: &mut N, prep: &N::Prep) -> Result<N::Exec, FlowError> {
    let policy = node.retry_policy();
    match attempt(node, policy, |n| n.exec(prep), |n, delay| n.wait(delay)) {
        Ok(value) => Ok(value),
        Err(last) => {
            let name = Node::name(node).to_string();
            debug!(node = %name, error = %last, "All attempts failed, running fallback");
            let original = last.to_string();
            let outcome = node.exec_fallback(prep, last);
            recover(&name, original, outcome)
        }
    }
}
