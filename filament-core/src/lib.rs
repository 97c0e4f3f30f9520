//! Filament Core
//!
//! This crate provides the reactive core of the Filament UI framework. It
//! implements:
//!
//! - Signals: single mutable values with subscriber tracking
//! - Wires: derived computations that re-run when what they read changes
//! - Stores: nested values with path-precise change notification
//! - A synchronous scheduler that runs each affected wire once per write
//!
//! Rendering is not part of this crate. A renderer consumes the core through
//! wire runs, wire tasks and store change streams.
//!
//! # Architecture
//!
//! - `reactive`: the runtime, signals, wires and computed signals
//! - `graph`: wire ownership, wire states and batch planning
//! - `store`: paths, stores, cursors, drafts and store changes
//! - `config`: runtime limits
//! - `error`: the crate-wide error type
//!
//! # Example
//!
//! ```
//! use filament_core::{create_signal, create_store, create_wire, produce};
//! use filament_core::Runtime;
//! use serde_json::json;
//!
//! let rt = Runtime::new();
//! let name = create_signal(&rt, "world".to_string());
//! let store = create_store(&rt, json!({"todos": ["write docs"]})).unwrap();
//!
//! let (n, todos) = (name.clone(), store.field("todos"));
//! let summary = create_wire(&rt, move |t, _| {
//!     let count = t.read(&todos)?.as_array().map_or(0, Vec::len);
//!     Ok(format!("hello {}, {} todo(s)", t.get(&n)?, count))
//! });
//! assert_eq!(summary.run().unwrap(), "hello world, 1 todo(s)");
//!
//! produce(&store.field("todos"), |draft| draft.push("test")).unwrap();
//! assert_eq!(summary.value().unwrap(), "hello world, 2 todo(s)");
//! # rt.teardown();
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod store;

use serde::Serialize;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use graph::WireState;
pub use reactive::{
    Computed, Runtime, Signal, SignalId, StoreId, TaskId, Token, Wire, WireContext, WireId,
};
pub use store::{
    apply_store_change, produce, reify, reify_as, Cursor, Draft, Path, Reify, Store, StoreChange,
};

/// Create a signal. Same as [`Signal::new`].
pub fn create_signal<T>(runtime: &Runtime, value: T) -> Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    Signal::new(runtime, value)
}

/// Create a top-level wire. Same as [`Wire::new`].
pub fn create_wire<T, F>(runtime: &Runtime, body: F) -> Wire<T>
where
    T: Clone + PartialEq + 'static,
    F: Fn(&Token, &WireContext<'_, T>) -> Result<T> + 'static,
{
    Wire::new(runtime, body)
}

/// Create a store from a serializable value and return its root cursor.
pub fn create_store<T: Serialize>(runtime: &Runtime, value: T) -> Result<Cursor> {
    Ok(Store::from_serialize(runtime, &value)?.root())
}
