use crate::error::FlowError;
use crate::node::Action;
use crate::value::{Context, Params};

/// The prep and post phases of a [`Flow`](super::Flow).
///
/// A flow's execute phase is always its walk over the graph. These hooks run
/// around it: `prep` before the walk starts, and `post` once it ended, receiving
/// the terminal action. Whatever `post` returns becomes the flow's own action,
/// so a nested flow can rename or swallow the label that routes its parent.
///
/// Both hooks run whenever the flow runs as a whole (`Flow::run`, or as a node
/// of an enclosing graph). `Flow::orchestrate` and batch flows walk the graph
/// without them.
pub trait FlowHooks {
    fn prep(&mut self, _ctx: &Context, _params: &Params) -> Result<(), FlowError> {
        Ok(())
    }

    fn post(
        &mut self,
        _ctx: &mut Context,
        action: Option<Action>,
    ) -> Result<Option<Action>, FlowError> {
        Ok(action)
    }
}

/// Hooks that leave the terminal action untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl FlowHooks for PassThrough {}
