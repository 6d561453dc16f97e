use super::diagnostic::Diagnostic;
use crate::error::FlowError;
use crate::node::{Action, DEFAULT_ACTION, Runnable};
use crate::value::{Context, Params};
use ahash::AHashMap;
use itertools::Itertools;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// Number of diagnostics a graph keeps before dropping the oldest.
pub const DIAGNOSTIC_CAPACITY: usize = 256;

static NEXT_GRAPH_ID: AtomicUsize = AtomicUsize::new(0);

/// A stable handle to a node stored in a [`Graph`].
///
/// A handle is only valid for the graph that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    graph: usize,
    index: usize,
}

impl NodeId {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

struct Slot {
    node: Box<dyn Runnable>,
    params: Params,
    successors: AHashMap<String, NodeId>,
}

/// An arena of nodes and the action-labeled edges between them.
///
/// Nodes are addressed by [`NodeId`]; several nodes may point at the same
/// successor and cycles are allowed. Edges are keyed by action label, with
/// [`DEFAULT_ACTION`] reserved for the default edge.
///
/// Warnings are logged and also kept in a bounded list of the latest
/// [`DIAGNOSTIC_CAPACITY`] entries.
pub struct Graph {
    id: usize,
    slots: Vec<Slot>,
    diagnostics: Vec<Diagnostic>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Moves a node into the graph and returns its handle.
    pub fn add<N: Runnable>(&mut self, node: N) -> NodeId {
        let id = NodeId {
            graph: self.id,
            index: self.slots.len(),
        };
        self.slots.push(Slot {
            node: Box::new(node),
            params: Params::new(),
            successors: AHashMap::new(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `id` was issued by this graph.
    pub fn contains(&self, id: NodeId) -> bool {
        id.graph == self.id && id.index < self.slots.len()
    }

    /// Registers `to` as the default successor of `from`. Returns `to` so calls
    /// can be chained along a path.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<NodeId, FlowError> {
        self.connect_on(from, DEFAULT_ACTION, to)
    }

    /// Registers `to` as the successor of `from` for `action`. An existing edge
    /// under the same label is replaced and reported as a diagnostic.
    pub fn connect_on(
        &mut self,
        from: NodeId,
        action: &str,
        to: NodeId,
    ) -> Result<NodeId, FlowError> {
        if !self.contains(to) {
            return Err(FlowError::InvalidGraph(format!(
                "Successor node {} is not part of this graph",
                to
            )));
        }
        let slot = self.slot_mut(from)?;
        if slot.successors.insert(action.to_string(), to).is_some() {
            let node = slot.node.name().to_string();
            self.report(Diagnostic::EdgeOverwritten {
                node,
                action: action.to_string(),
            });
        }
        Ok(to)
    }

    /// Looks up the successor of `id` for `action`. `None` selects the default
    /// edge; an explicit action never falls back to it.
    pub fn successor(&mut self, id: NodeId, action: Option<&str>) -> Option<NodeId> {
        let slot = self.slot(id)?;
        let key = action.unwrap_or(DEFAULT_ACTION);
        if let Some(next) = slot.successors.get(key) {
            return Some(*next);
        }
        if !slot.successors.is_empty() {
            let diagnostic = Diagnostic::UnmatchedAction {
                node: slot.node.name().to_string(),
                action: action.map(str::to_string),
                available: slot.successors.keys().sorted().cloned().collect(),
            };
            self.report(diagnostic);
        }
        None
    }

    pub fn has_successors(&self, id: NodeId) -> bool {
        self.slot(id).is_some_and(|slot| !slot.successors.is_empty())
    }

    /// Action labels registered on `id`, sorted.
    pub fn actions(&self, id: NodeId) -> Vec<&str> {
        self.slot(id)
            .map(|slot| slot.successors.keys().map(String::as_str).sorted().collect())
            .unwrap_or_default()
    }

    /// The params most recently assigned to `id`.
    pub fn params(&self, id: NodeId) -> Option<&Params> {
        self.slot(id).map(|slot| &slot.params)
    }

    pub fn set_params(&mut self, id: NodeId, params: Params) -> Result<(), FlowError> {
        self.slot_mut(id)?.params = params;
        Ok(())
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.slot(id).map(|slot| slot.node.name())
    }

    /// Borrows the node behind `id` as its concrete type.
    pub fn node<T: Runnable>(&self, id: NodeId) -> Option<&T> {
        self.slot(id)
            .and_then(|slot| slot.node.as_any().downcast_ref::<T>())
    }

    pub fn node_mut<T: Runnable>(&mut self, id: NodeId) -> Option<&mut T> {
        self.slot_mut(id)
            .ok()
            .and_then(|slot| slot.node.as_any_mut().downcast_mut::<T>())
    }

    /// Runs a single node with its current params, without following edges.
    pub fn run_standalone(
        &mut self,
        id: NodeId,
        ctx: &mut Context,
    ) -> Result<Option<Action>, FlowError> {
        let slot = self.slot_mut(id)?;
        let has_successors = !slot.successors.is_empty();
        let node = slot.node.name().to_string();
        if has_successors {
            self.report(Diagnostic::SuccessorsIgnored { node });
        }
        let Slot { node, params, .. } = self.slot_mut(id)?;
        let outcome = node.run(ctx, params);
        let nested = node.drain_diagnostics();
        self.absorb(nested);
        outcome
    }

    /// Assigns `params` to `id` and runs its lifecycle. Diagnostics raised
    /// inside a nested flow are moved onto this graph.
    pub(crate) fn run_node(
        &mut self,
        id: NodeId,
        ctx: &mut Context,
        params: &Params,
    ) -> Result<Option<Action>, FlowError> {
        let slot = self.slot_mut(id)?;
        slot.params = params.clone();
        let Slot { node, params, .. } = slot;
        let outcome = node.run(ctx, params);
        let nested = node.drain_diagnostics();
        self.absorb(nested);
        outcome
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.record(diagnostic);
    }

    /// Keeps diagnostics that were already logged by a nested graph.
    fn absorb(&mut self, nested: Vec<Diagnostic>) {
        for diagnostic in nested {
            self.record(diagnostic);
        }
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        if self.diagnostics.len() >= DIAGNOSTIC_CAPACITY {
            self.diagnostics.remove(0);
        }
        self.diagnostics.push(diagnostic);
    }

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        if id.graph != self.id {
            return None;
        }
        self.slots.get(id.index)
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot, FlowError> {
        if id.graph != self.id {
            return Err(FlowError::InvalidGraph(format!(
                "Node {} belongs to another graph",
                id
            )));
        }
        self.slots.get_mut(id.index).ok_or_else(|| {
            FlowError::InvalidGraph(format!("Node {} is not part of this graph", id))
        })
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (index, slot) in self.slots.iter().enumerate() {
            let edges = slot
                .successors
                .iter()
                .sorted_by(|a, b| a.0.cmp(b.0))
                .map(|(action, to)| format!("{} -> {}", action, to))
                .join(", ");
            list.entry(&format_args!("#{} {} [{}]", index, slot.node.name(), edges));
        }
        list.finish()
    }
}
