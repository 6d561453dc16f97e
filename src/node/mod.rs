use crate::error::FlowError;
use crate::flow::Diagnostic;
use crate::value::{Context, Params};
use std::any::Any;
use std::time::Duration;

pub mod batch;
pub mod retry;

pub use batch::BatchNode;
pub use retry::{RetryPolicy, RetryPolicyConfig};

/// The label a node's post phase returns to select its successor.
pub type Action = String;

/// The reserved label of the default edge. Returning `None` or this label from
/// `post` follows the default edge.
pub const DEFAULT_ACTION: &str = "";

/// The strongly-typed lifecycle of a unit of work.
///
/// A run goes through three phases:
///
/// 1. `prep` reads from the shared context and the node's params and builds the
///    input of the execute phase.
/// 2. `exec` holds the node's primary logic. The engine calls it through
///    `exec_with_policy`, which retries it according to `retry_policy` and hands
///    the last failure to `exec_fallback` once every attempt failed.
/// 3. `post` may write to the context and returns the action used to pick the
///    next node.
///
/// Only `exec` is mandatory. Every `Node` is also a [`Runnable`], so it can be
/// stored in a [`Graph`](crate::flow::Graph).
///
/// # Example
///
/// ```rust
/// use nagare::prelude::*;
///
/// struct Double;
///
/// impl Node for Double {
///     type Prep = i64;
///     type Exec = i64;
///
///     fn prep(&mut self, ctx: &Context, _params: &Params) -> Result<i64, FlowError> {
///         Ok(ctx.get_as::<i64>("value")?)
///     }
///
///     fn exec(&mut self, value: &i64) -> Result<i64, FlowError> {
///         Ok(value * 2)
///     }
///
///     fn post(&mut self, ctx: &mut Context, _prep: i64, doubled: i64) -> Result<Option<Action>, FlowError> {
///         ctx.insert("value", doubled);
///         Ok(None)
///     }
/// }
///
/// let mut ctx = Context::from([("value", 21)]);
/// Runnable::run(&mut Double, &mut ctx, &Params::new()).unwrap();
/// assert_eq!(ctx.get_as::<i64>("value").unwrap(), 42);
/// ```
pub trait Node {
    type Prep: Default;
    type Exec;

    /// A name used in diagnostics and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Attempt budget and inter-attempt delay for the execute phase.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Blocks between two consecutive failed attempts.
    fn wait(&mut self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    fn prep(&mut self, _ctx: &Context, _params: &Params) -> Result<Self::Prep, FlowError> {
        Ok(Self::Prep::default())
    }

    fn exec(&mut self, prep: &Self::Prep) -> Result<Self::Exec, FlowError>;

    /// Called once with the last failure after every attempt of `exec` failed.
    fn exec_fallback(
        &mut self,
        _prep: &Self::Prep,
        error: FlowError,
    ) -> Result<Self::Exec, FlowError> {
        Err(FlowError::retries_exhausted(
            Node::name(self),
            self.retry_policy().max_attempts(),
            error,
        ))
    }

    fn post(
        &mut self,
        _ctx: &mut Context,
        _prep: Self::Prep,
        _exec: Self::Exec,
    ) -> Result<Option<Action>, FlowError> {
        Ok(None)
    }

    /// The execute phase as the engine runs it: `exec` wrapped in the retry and
    /// fallback policy. Specializations such as [`BatchNode`] replace this hook
    /// instead of `exec`.
    fn exec_with_policy(&mut self, prep: &Self::Prep) -> Result<Self::Exec, FlowError> {
        retry::execute(self, prep)
    }
}

/// The type-erased capability the graph stores: run the full lifecycle against
/// a context and produce an action.
pub trait Runnable: Any {
    fn name(&self) -> &str;

    /// Runs the lifecycle once with the given params, ignoring any successors.
    fn run(&mut self, ctx: &mut Context, params: &Params) -> Result<Option<Action>, FlowError>;

    /// Hands over diagnostics recorded inside this runnable, leaving none behind.
    /// Plain nodes record none.
    fn drain_diagnostics(&mut self) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<N: Node + 'static> Runnable for N {
    fn name(&self) -> &str {
        Node::name(self)
    }

    fn run(&mut self, ctx: &mut Context, params: &Params) -> Result<Option<Action>, FlowError> {
        let prep = self.prep(ctx, params)?;
        let exec = self.exec_with_policy(&prep)?;
        self.post(ctx, prep, exec)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
