use super::{Action, Node, RetryPolicy, retry};
use crate::error::FlowError;
use crate::value::{Context, Params};
use std::time::Duration;
use tracing::debug;

/// A node whose execute phase processes an ordered collection of items.
///
/// Every item gets its own retry budget and its own fallback: an item that keeps
/// failing does not use up the attempts of the next one. Results keep the input
/// order. A failing item fallback is fatal to the whole batch.
///
/// Every `BatchNode` is a [`Node`] through a blanket implementation. That
/// implementation runs the per-item loop as its execute-with-policy hook, so its
/// whole-batch `exec` and `exec_fallback` cannot be overridden and return
/// [`FlowError::SealedMethodMisuse`] when called directly.
pub trait BatchNode {
    type Item;
    type Output;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Attempt budget and delay applied to each item.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    fn wait(&mut self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    fn prep(&mut self, _ctx: &Context, _params: &Params) -> Result<Vec<Self::Item>, FlowError> {
        Ok(Vec::new())
    }

    fn exec_item(&mut self, item: &Self::Item) -> Result<Self::Output, FlowError>;

    fn exec_item_fallback(
        &mut self,
        _item: &Self::Item,
        error: FlowError,
    ) -> Result<Self::Output, FlowError> {
        Err(FlowError::retries_exhausted(
            BatchNode::name(self),
            BatchNode::retry_policy(self).max_attempts(),
            error,
        ))
    }

    fn post(
        &mut self,
        _ctx: &mut Context,
        _items: Vec<Self::Item>,
        _results: Vec<Self::Output>,
    ) -> Result<Option<Action>, FlowError> {
        Ok(None)
    }
}

impl<B: BatchNode> Node for B {
    type Prep = Vec<B::Item>;
    type Exec = Vec<B::Output>;

    fn name(&self) -> &str {
        BatchNode::name(self)
    }

    fn retry_policy(&self) -> RetryPolicy {
        BatchNode::retry_policy(self)
    }

    fn wait(&mut self, delay: Duration) {
        BatchNode::wait(self, delay)
    }

    fn prep(&mut self, ctx: &Context, params: &Params) -> Result<Self::Prep, FlowError> {
        BatchNode::prep(self, ctx, params)
    }

    fn exec(&mut self, _prep: &Self::Prep) -> Result<Self::Exec, FlowError> {
        Err(FlowError::SealedMethodMisuse {
            node: BatchNode::name(self).to_string(),
            method: "exec",
        })
    }

    fn exec_fallback(
        &mut self,
        _prep: &Self::Prep,
        _error: FlowError,
    ) -> Result<Self::Exec, FlowError> {
        Err(FlowError::SealedMethodMisuse {
            node: BatchNode::name(self).to_string(),
            method: "exec_fallback",
        })
    }

    fn post(
        &mut self,
        ctx: &mut Context,
        prep: Self::Prep,
        exec: Self::Exec,
    ) -> Result<Option<Action>, FlowError> {
        BatchNode::post(self, ctx, prep, exec)
    }

    fn exec_with_policy(&mut self, items: &Self::Prep) -> Result<Self::Exec, FlowError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let policy = BatchNode::retry_policy(self);
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let outcome = retry::attempt(
                self,
                policy,
                |b| b.exec_item(item),
                |b, delay| BatchNode::wait(b, delay),
            );
            let result = match outcome {
                Ok(value) => value,
                Err(last) => {
                    let name = BatchNode::name(self).to_string();
                    debug!(node = %name, index, error = %last, "Item attempts exhausted, running item fallback");
                    let original = last.to_string();
                    let fallback = self.exec_item_fallback(item, last);
                    retry::recover(&name, original, fallback)?
                }
            };
            results.push(result);
        }
        Ok(results)
    }
}
