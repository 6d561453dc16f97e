//! Prelude module for convenient imports
//!
//! This module re-exports the types and traits needed to write nodes and
//! compose flows, so a single glob import covers the common case.
//!
//! # Example
//!
//! ```rust
//! use nagare::prelude::*;
//!
//! let mut flow = Flow::new().with_params(Params::from([("multiplier", 3)]));
//! let mut ctx = Context::new();
//!
//! // An empty flow finishes immediately and reports the missing start node.
//! assert_eq!(flow.run(&mut ctx).unwrap(), None);
//! assert_eq!(flow.diagnostics().len(), 1);
//! ```

// Lifecycle traits
pub use crate::node::{Action, BatchNode, DEFAULT_ACTION, Node, RetryPolicy, Runnable};

// Orchestration
pub use crate::flow::{
    BatchFlow, BatchPlan, Diagnostic, Flow, FlowHooks, Graph, NodeId, PassThrough,
};

// Dynamic values
pub use crate::value::{Context, FromValue, Params, Value, ValueKind, ValueMap};

// Error types
pub use crate::error::{ContextError, FlowError};
