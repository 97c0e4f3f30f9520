//! Reactive Primitives
//!
//! This module implements the reactive core: signals, wires and the runtime
//! that connects them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a container for a single value. Wires that read it through
//! their [`Token`] are subscribed to it; setting a different value re-runs
//! them.
//!
//! ## Wires
//!
//! A [`Wire`] is a computation whose dependencies are the signals and store
//! cursors it read during its latest run. Wires can own child wires, which
//! are disposed whenever the parent re-runs.
//!
//! ## Computed signals
//!
//! A [`Computed`] mirrors a wire's result into a signal, so derived values can
//! be consumed like plain state.
//!
//! # Implementation Notes
//!
//! Dependency tracking is explicit: a body only subscribes to what it reads
//! through the token it was handed. There is no global "current computation".
//! Each [`Runtime`] is an isolated, single-threaded arena.

mod computed;
mod context;
mod id;
mod runtime;
mod signal;
mod wire;

pub use computed::Computed;
pub use context::{Token, WireContext};
pub use id::{SignalId, StoreId, TaskId, WireId};
pub use runtime::Runtime;
pub use signal::Signal;
pub use wire::Wire;

pub(crate) use wire::Runnable;
