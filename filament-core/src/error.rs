//! Error types shared by the reactive core and the store layer.

use thiserror::Error;

use crate::reactive::{StoreId, WireId};
use crate::store::Path;

/// Errors produced while reading, writing or propagating reactive state.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A cursor path no longer resolves against the live store value.
    #[error("path `{path}` does not resolve in {store}")]
    PathNotFound { store: StoreId, path: Path },

    /// The value at a path has the wrong shape for the requested operation.
    #[error("value at `{path}` is not {expected}")]
    TypeMismatch { path: Path, expected: &'static str },

    /// An array index lies beyond the end of the array.
    #[error("index {index} is out of bounds for array of length {len} at `{path}`")]
    IndexOutOfBounds { path: Path, index: usize, len: usize },

    /// A key used on an array is not a valid index.
    #[error("key `{key}` is not a valid array index at `{path}`")]
    InvalidKey { path: Path, key: String },

    /// The wire has been removed from the arena.
    #[error("{0} has been disposed")]
    WireDisposed(WireId),

    /// A wire tried to run while it was already running.
    #[error("{0} was asked to run while it is already running")]
    ReentrantRun(WireId),

    /// A wire kept invalidating itself from inside its own run.
    #[error("{wire} did not settle after {rounds} consecutive re-runs")]
    NonConvergent { wire: WireId, rounds: usize },

    /// Writes from inside wire bodies or tasks nested batches too deeply.
    #[error("re-entrant scheduling exceeded {limit} nested batches")]
    BatchDepthExceeded { limit: usize },

    /// A wire was found in its own ownership chain.
    #[error("{0} appears in its own ownership chain")]
    OwnershipCycle(WireId),

    /// A wire read a signal or store owned by another runtime.
    #[error("{wire} read {read}, which belongs to another runtime")]
    ForeignRuntime { wire: WireId, read: String },

    /// A replayed store change is malformed.
    #[error("malformed store change: {0}")]
    InvalidChange(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Encode(#[from] rmp_serde::encode::Error),

    #[error(transparent)]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
