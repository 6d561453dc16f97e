use super::{Diagnostic, Flow};
use crate::error::FlowError;
use crate::node::{Action, Runnable};
use crate::value::{Context, Params};
use std::any::Any;
use tracing::debug;

/// The hooks of a [`BatchFlow`]: which parameter sets to run, and how to
/// aggregate once all of them ran.
pub trait BatchPlan {
    /// Produces the parameter sets the sub-graph runs against, in order.
    fn prep_batch(&mut self, ctx: &Context, params: &Params) -> Result<Vec<Params>, FlowError>;

    /// Aggregates after every parameter set ran. Its action is the batch flow's action.
    fn post_batch(
        &mut self,
        ctx: &mut Context,
        batches: Vec<Params>,
    ) -> Result<Option<Action>, FlowError>;
}

/// A flow that walks its sub-graph once per parameter set produced by its plan.
///
/// All passes share one context, run strictly in order, and the action of each
/// pass is discarded. `post_batch` replaces the flow's post phase and is called
/// even when the plan produced no parameter sets. The inner flow's
/// [`FlowHooks`](super::FlowHooks) are not run.
pub struct BatchFlow<P> {
    flow: Flow,
    plan: P,
}

impl<P: BatchPlan> BatchFlow<P> {
    pub fn new(flow: Flow, plan: P) -> Self {
        Self { flow, plan }
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn flow_mut(&mut self) -> &mut Flow {
        &mut self.flow
    }

    pub fn plan(&self) -> &P {
        &self.plan
    }

    pub fn plan_mut(&mut self) -> &mut P {
        &mut self.plan
    }

    /// Runs every batch against `ctx`, using the inner flow's params as the base.
    pub fn run(&mut self, ctx: &mut Context) -> Result<Option<Action>, FlowError> {
        let base = self.flow.params().clone();
        self.run_batches(ctx, &base)
    }

    fn run_batches(&mut self, ctx: &mut Context, base: &Params) -> Result<Option<Action>, FlowError> {
        let batches = self.plan.prep_batch(ctx, base)?;
        if batches.is_empty() {
            let flow = self.flow.name().to_string();
            self.flow.graph_mut().report(Diagnostic::EmptyBatch { flow });
        }

        for (index, batch) in batches.iter().enumerate() {
            debug!(flow = %self.flow.name(), index, total = batches.len(), "Running batch");
            self.flow.orchestrate_with(ctx, base, batch)?;
        }

        self.plan.post_batch(ctx, batches)
    }
}

impl<P: BatchPlan + 'static> Runnable for BatchFlow<P> {
    fn name(&self) -> &str {
        self.flow.name()
    }

    fn run(&mut self, ctx: &mut Context, params: &Params) -> Result<Option<Action>, FlowError> {
        self.run_batches(ctx, params)
    }

    fn drain_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.flow.graph_mut().take_diagnostics()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
