//! # Nagare - Action-Labeled Dataflow Engine
//!
//! **Nagare** runs small, embeddable pipelines built from discrete units of work.
//! Nodes are composed into a directed graph whose edges are labeled with
//! actions; a flow walks the graph, running each node's lifecycle and picking
//! the next node by the action that node returned.
//!
//! ## Core Concepts
//!
//! 1.  **Node**: A unit of work with a three-phase lifecycle: `prep` reads the
//!     shared context, `exec` does the work (with bounded retries and a
//!     fallback), and `post` writes results back and returns an action.
//! 2.  **BatchNode**: A node whose execute phase processes a list of items, each
//!     with its own retry budget and fallback.
//! 3.  **Flow**: A node that owns a graph and runs it from its start node until
//!     no edge matches the last action. Flows nest inside other flows.
//! 4.  **BatchFlow**: A flow that walks its graph once per parameter set.
//!
//! Everything runs synchronously on the calling thread. The only suspension
//! point is the delay between two failed attempts of a node.
//!
//! ## Quick Start
//!
//! ```rust
//! use nagare::prelude::*;
//!
//! /// Writes `base * multiplier` to the context, branching when it exceeds 20.
//! struct SetNumber(i64);
//!
//! impl Node for SetNumber {
//!     type Prep = i64;
//!     type Exec = i64;
//!
//!     fn prep(&mut self, _ctx: &Context, params: &Params) -> Result<i64, FlowError> {
//!         Ok(params.get_or("multiplier", 1))
//!     }
//!
//!     fn exec(&mut self, multiplier: &i64) -> Result<i64, FlowError> {
//!         Ok(self.0 * multiplier)
//!     }
//!
//!     fn post(&mut self, ctx: &mut Context, _prep: i64, value: i64) -> Result<Option<Action>, FlowError> {
//!         ctx.insert("current", value);
//!         Ok((value > 20).then(|| "over_20".to_string()))
//!     }
//! }
//!
//! /// Records which branch ran.
//! struct Mark(&'static str);
//!
//! impl Node for Mark {
//!     type Prep = ();
//!     type Exec = ();
//!
//!     fn exec(&mut self, _prep: &()) -> Result<(), FlowError> {
//!         Ok(())
//!     }
//!
//!     fn post(&mut self, ctx: &mut Context, _prep: (), _exec: ()) -> Result<Option<Action>, FlowError> {
//!         ctx.insert("branch", self.0);
//!         Ok(None)
//!     }
//! }
//!
//! fn main() -> Result<(), FlowError> {
//!     let mut flow = Flow::new().with_params(Params::from([("multiplier", 3)]));
//!     let set = flow.add(SetNumber(10));
//!     let small = flow.add(Mark("small"));
//!     let large = flow.add(Mark("large"));
//!     flow.connect(set, small)?;
//!     flow.connect_on(set, "over_20", large)?;
//!     flow.set_start(set)?;
//!
//!     let mut ctx = Context::new();
//!     flow.run(&mut ctx)?;
//!
//!     assert_eq!(ctx.get_as::<i64>("current")?, 30);
//!     assert_eq!(ctx.get_as::<String>("branch")?, "large");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod flow;
pub mod node;
pub mod prelude;
pub mod value;
