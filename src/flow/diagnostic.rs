use itertools::Itertools;
use std::fmt;

/// A non-fatal warning raised while building or walking a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A second edge was registered under an existing action label.
    EdgeOverwritten { node: String, action: String },
    /// A node with successors was run on its own; its successors were not followed.
    SuccessorsIgnored { node: String },
    /// The action returned by a node matches none of its registered edges.
    UnmatchedAction {
        node: String,
        action: Option<String>,
        available: Vec<String>,
    },
    /// A flow was run without a start node.
    MissingStart { flow: String },
    /// A batch flow's plan produced no parameter sets.
    EmptyBatch { flow: String },
}

/// Renders an action label, naming the reserved default label explicitly.
pub(crate) fn display_action(action: &str) -> String {
    if action.is_empty() {
        "<default>".to_string()
    } else {
        format!("'{}'", action)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::EdgeOverwritten { node, action } => write!(
                f,
                "Overwriting successor for action {} in node {}",
                display_action(action),
                node
            ),
            Diagnostic::SuccessorsIgnored { node } => write!(
                f,
                "Node {} has successors, but was run standalone. Successors won't be executed; use a Flow",
                node
            ),
            Diagnostic::UnmatchedAction {
                node,
                action,
                available,
            } => write!(
                f,
                "Flow ends: action {} not found in successors [{}] of node {}",
                action.as_deref().map_or("<default>".to_string(), display_action),
                available.iter().map(|a| display_action(a)).join(", "),
                node
            ),
            Diagnostic::MissingStart { flow } => {
                write!(f, "Flow {} started with no start node", flow)
            }
            Diagnostic::EmptyBatch { flow } => {
                write!(f, "Batch flow {} produced an empty parameter list", flow)
            }
        }
    }
}
