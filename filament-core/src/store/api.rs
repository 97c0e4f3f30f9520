//! Cursor API
//!
//! Free functions for working with store cursors: [`reify`] materializes a
//! cursor, [`produce`] is the write path, and [`apply_store_change`] replays a
//! recorded change onto another store.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::change::{ChangeOp, StoreChange};
use super::draft::Draft;
use super::manager::Cursor;
use crate::error::{ReactiveError, Result};

/// Something that can be turned into a plain value.
pub trait Reify {
    fn reify(&self) -> Result<Value>;
}

impl Reify for Cursor {
    fn reify(&self) -> Result<Value> {
        self.get()
    }
}

/// Plain values are not backed by a store and reify to themselves.
impl Reify for Value {
    fn reify(&self) -> Result<Value> {
        Ok(self.clone())
    }
}

/// Resolve to the current value. Never subscribes.
pub fn reify(source: &impl Reify) -> Result<Value> {
    source.reify()
}

/// Resolve and deserialize into `T`.
pub fn reify_as<T: DeserializeOwned>(source: &impl Reify) -> Result<T> {
    Ok(serde_json::from_value(source.reify()?)?)
}

/// Mutate the store behind `cursor`.
///
/// The cursor must resolve; otherwise `PathNotFound` is returned and `f` is
/// not called. Every mutation made through the draft is dispatched as it
/// happens. If `f` fails halfway, earlier mutations stay applied.
pub fn produce<R>(cursor: &Cursor, f: impl FnOnce(&Draft<'_>) -> Result<R>) -> Result<R> {
    if !cursor.store().contains(cursor.path()) {
        return Err(ReactiveError::PathNotFound {
            store: cursor.store().id(),
            path: cursor.path().clone(),
        });
    }
    f(&Draft::new(cursor))
}

/// Replay a change recorded on one store onto the store behind `target`.
///
/// The change path is taken relative to `target`. Applying every change of a
/// store, in emission order, to a second store that started from the same
/// value makes both equal.
pub fn apply_store_change(target: &Cursor, change: &StoreChange) -> Result<()> {
    let Some(data) = &change.data else {
        return match change.path.split_last() {
            Some((key, parent)) => produce(&target.at(&parent), |draft| {
                draft.set(key, change.value.clone())
            }),
            None => produce(target, |draft| draft.assign(change.value.clone())),
        };
    };

    let at = target.at(&change.path);
    match data.name {
        ChangeOp::Push => produce(&at, |draft| draft.extend(data.args.iter().cloned())),
        ChangeOp::Pop => produce(&at, |draft| draft.pop().map(drop)),
        ChangeOp::Splice => {
            let start = splice_arg(&data.args, 0)?.unwrap_or(0);
            let delete_count = splice_arg(&data.args, 1)?.unwrap_or(usize::MAX);
            let items: Vec<Value> = data.args.iter().skip(2).cloned().collect();
            produce(&at, |draft| draft.splice(start, delete_count, items).map(drop))
        }
        ChangeOp::Delete => {
            let (key, parent) = change.path.split_last().ok_or_else(|| {
                ReactiveError::InvalidChange("delete change without a key".into())
            })?;
            produce(&target.at(&parent), |draft| draft.delete(key).map(drop))
        }
    }
}

fn splice_arg(args: &[Value], position: usize) -> Result<Option<usize>> {
    let Some(arg) = args.get(position) else {
        return Ok(None);
    };
    arg.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| {
            ReactiveError::InvalidChange(format!(
                "splice argument {position} must be a non-negative integer, got {arg}"
            ))
        })
}
