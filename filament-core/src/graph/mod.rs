//! Wire Graph
//!
//! This module holds the ownership graph between wires and the batch planner
//! that decides which wires of a run-set actually execute.
//!
//! # Overview
//!
//! Wires form a forest: a wire created while another wire's body is running
//! becomes its child. The graph is stored as an arena keyed by [`WireId`],
//! with child ids on the parent and a parent id on the child.
//!
//! Dependency edges (wire to signal, wire to store path) are not part of this
//! graph. They are kept by the [`Runtime`](crate::reactive::Runtime) next to
//! the sources they point at, and each node only remembers which sources it
//! read during its latest run so it can unlink itself.
//!
//! [`WireId`]: crate::reactive::WireId

mod node;
mod scheduler;

pub use node::WireState;
pub(crate) use node::WireNode;
pub(crate) use scheduler::WireGraph;
