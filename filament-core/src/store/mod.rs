//! Reactive Stores
//!
//! A store wraps a nested `serde_json::Value` and tracks reads and writes by
//! path, so a wire that read `friends/0/id` is only re-run by writes that
//! affect that value.
//!
//! - [`Path`] and [`EncodedPath`] address values inside a store.
//! - [`Store`] owns the value, the per-wire read paths and the store tasks.
//! - [`Cursor`] is an immutable path into a store, resolved on every read.
//! - [`Draft`], obtained through [`produce`], is the only way to mutate.
//! - [`StoreChange`] describes one mutation; [`apply_store_change`] replays it.

mod api;
mod change;
mod draft;
mod manager;
mod path;
mod readers;

pub use api::{apply_store_change, produce, reify, reify_as, Reify};
pub use change::{ChangeData, ChangeOp, IndexShift, Relocation, StoreChange};
pub use draft::Draft;
pub use manager::{Cursor, Store};
pub use path::{EncodedPath, Path};

pub(crate) use readers::StoreReaders;
