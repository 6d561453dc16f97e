use crate::error::FlowError;
use crate::node::{Action, Runnable};
use crate::value::{Context, Params};
use std::any::Any;
use tracing::debug;

pub mod batch;
pub mod diagnostic;
pub mod graph;
pub mod hooks;

pub use batch::{BatchFlow, BatchPlan};
pub use diagnostic::Diagnostic;
pub use graph::{DIAGNOSTIC_CAPACITY, Graph, NodeId};
pub use hooks::{FlowHooks, PassThrough};

/// A node that owns a sub-graph and runs it to completion.
///
/// Running a flow walks the graph from its start node: each node gets the
/// flow's effective params, runs its lifecycle, and the action it returns
/// selects the next node. The walk ends when a node has no edge for its action,
/// and that action, passed through the flow's [`FlowHooks`], becomes the
/// flow's own action. A `Flow` is itself [`Runnable`], so it can be nested
/// inside another flow's graph.
///
/// # Example
///
/// ```rust
/// use nagare::prelude::*;
///
/// struct Greet;
///
/// impl Node for Greet {
///     type Prep = ();
///     type Exec = String;
///
///     fn exec(&mut self, _prep: &()) -> Result<String, FlowError> {
///         Ok("hello".to_string())
///     }
///
///     fn post(&mut self, ctx: &mut Context, _prep: (), greeting: String) -> Result<Option<Action>, FlowError> {
///         ctx.insert("greeting", greeting);
///         Ok(Some("greeted".to_string()))
///     }
/// }
///
/// let mut flow = Flow::new().with_name("greeter");
/// let greet = flow.add(Greet);
/// flow.set_start(greet).unwrap();
///
/// let mut ctx = Context::new();
/// let action = flow.run(&mut ctx).unwrap();
/// assert_eq!(action.as_deref(), Some("greeted"));
/// assert_eq!(ctx.get_as::<String>("greeting").unwrap(), "hello");
/// ```
pub struct Flow {
    name: String,
    graph: Graph,
    start: Option<NodeId>,
    params: Params,
    step_limit: Option<usize>,
    hooks: Box<dyn FlowHooks>,
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}

impl Flow {
    pub fn new() -> Self {
        Self {
            name: "Flow".to_string(),
            graph: Graph::new(),
            start: None,
            params: Params::new(),
            step_limit: None,
            hooks: Box::new(PassThrough),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Caps the number of node runs in one orchestration pass. Unbounded by
    /// default, so cyclic graphs may run forever.
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Replaces the prep and post phases run around the walk.
    pub fn with_hooks(mut self, hooks: impl FlowHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn add<N: Runnable>(&mut self, node: N) -> NodeId {
        self.graph.add(node)
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<NodeId, FlowError> {
        self.graph.connect(from, to)
    }

    pub fn connect_on(
        &mut self,
        from: NodeId,
        action: &str,
        to: NodeId,
    ) -> Result<NodeId, FlowError> {
        self.graph.connect_on(from, action, to)
    }

    pub fn set_start(&mut self, id: NodeId) -> Result<NodeId, FlowError> {
        if !self.graph.contains(id) {
            return Err(FlowError::InvalidGraph(format!(
                "Start node {} is not part of the graph of flow {}",
                id, self.name
            )));
        }
        self.start = Some(id);
        Ok(id)
    }

    pub fn start(&self) -> Option<NodeId> {
        self.start
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn node<T: Runnable>(&self, id: NodeId) -> Option<&T> {
        self.graph.node(id)
    }

    /// Warnings recorded on this flow's graph, including those moved up from
    /// nested flows once they finished running.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.graph.diagnostics()
    }

    /// Runs the flow against `ctx` with its own params and returns its action.
    pub fn run(&mut self, ctx: &mut Context) -> Result<Option<Action>, FlowError> {
        let base = self.params.clone();
        self.run_with(ctx, &base)
    }

    fn run_with(&mut self, ctx: &mut Context, base: &Params) -> Result<Option<Action>, FlowError> {
        self.hooks.prep(ctx, base)?;
        let action = self.orchestrate_with(ctx, base, &Params::new())?;
        self.hooks.post(ctx, action)
    }

    /// Walks the graph once with the flow's params overlaid by `extra`.
    pub fn orchestrate(
        &mut self,
        ctx: &mut Context,
        extra: &Params,
    ) -> Result<Option<Action>, FlowError> {
        let base = self.params.clone();
        self.orchestrate_with(ctx, &base, extra)
    }

    pub(crate) fn orchestrate_with(
        &mut self,
        ctx: &mut Context,
        base: &Params,
        extra: &Params,
    ) -> Result<Option<Action>, FlowError> {
        let Some(start) = self.start else {
            self.graph.report(Diagnostic::MissingStart {
                flow: self.name.clone(),
            });
            return Ok(None);
        };

        // Fixed for the whole pass.
        let effective = base.overlay(extra);

        let mut current = Some(start);
        let mut last_action = None;
        let mut steps = 0;
        while let Some(id) = current {
            if let Some(limit) = self.step_limit {
                if steps >= limit {
                    return Err(FlowError::StepLimitExceeded { limit });
                }
            }
            steps += 1;

            debug!(flow = %self.name, node = %id, step = steps, "Running node");
            last_action = self.graph.run_node(id, ctx, &effective)?;
            current = self.graph.successor(id, last_action.as_deref());
        }

        Ok(last_action)
    }
}

impl Runnable for Flow {
    fn name(&self) -> &str {
        &self.name
    }

    /// Runs the flow as a node of an enclosing graph; `params` are the ones the
    /// enclosing orchestrator assigned, and serve as this flow's own params.
    fn run(&mut self, ctx: &mut Context, params: &Params) -> Result<Option<Action>, FlowError> {
        self.run_with(ctx, params)
    }

    fn drain_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.graph.take_diagnostics()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
