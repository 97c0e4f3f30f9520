//! Drafts
//!
//! A [`Draft`] is the mutation handle handed out by
//! [`produce`](super::produce). Each method applies one mutation to the live
//! store value and dispatches the matching [`StoreChange`] before returning,
//! so wires and tasks have already reacted when the call completes.
//!
//! Array operations are limited to `push`, `pop` and `splice`; `insert`,
//! `remove` and `extend` are shorthands for them. Writes that leave the value
//! unchanged emit nothing.

use serde_json::{json, Value};

use super::change::{ChangeOp, IndexShift, StoreChange};
use super::manager::{Cursor, Store};
use super::path::{parse_index, Path};
use crate::error::{ReactiveError, Result};

/// Mutable view of one path of a store.
pub struct Draft<'a> {
    store: &'a Store,
    path: Path,
}

impl<'a> Draft<'a> {
    pub(crate) fn new(cursor: &'a Cursor) -> Self {
        Self {
            store: cursor.store(),
            path: cursor.path().clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current value at this path.
    pub fn get(&self) -> Result<Value> {
        self.store.resolve(&self.path)
    }

    /// Draft of an object key below this one.
    pub fn field(&self, key: impl Into<String>) -> Draft<'a> {
        Draft {
            store: self.store,
            path: self.path.child(key),
        }
    }

    /// Draft of an array index below this one.
    pub fn index(&self, index: usize) -> Draft<'a> {
        Draft {
            store: self.store,
            path: self.path.index(index),
        }
    }

    /// Assign `value` to `key` of the object or array at this path.
    ///
    /// On arrays the key must be an index no greater than the length;
    /// assigning at the length appends.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        let path = &self.path;

        let changed = self.store.update(path, |target| match target {
            Value::Object(map) => {
                if map.get(&key) == Some(&value) {
                    return Ok(false);
                }
                map.insert(key.clone(), value.clone());
                Ok(true)
            }
            Value::Array(items) => {
                let index = parse_index(&key).ok_or_else(|| ReactiveError::InvalidKey {
                    path: path.clone(),
                    key: key.clone(),
                })?;
                let len = items.len();
                match items.get_mut(index) {
                    Some(slot) if *slot == value => Ok(false),
                    Some(slot) => {
                        *slot = value.clone();
                        Ok(true)
                    }
                    None if index == len => {
                        items.push(value.clone());
                        Ok(true)
                    }
                    None => Err(ReactiveError::IndexOutOfBounds {
                        path: path.clone(),
                        index,
                        len,
                    }),
                }
            }
            _ => Err(ReactiveError::TypeMismatch {
                path: path.clone(),
                expected: "an object or an array",
            }),
        })?;

        if changed {
            self.store
                .dispatch(StoreChange::assign(path.child(key), value), None)?;
        }
        Ok(())
    }

    /// Replace the value at this path. At the root this replaces the whole
    /// store value.
    pub fn assign(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self.path.split_last() {
            Some((key, parent)) => Draft {
                store: self.store,
                path: parent,
            }
            .set(key, value),
            None => {
                let changed = self.store.update(&self.path, |root| {
                    if *root == value {
                        return Ok(false);
                    }
                    *root = value.clone();
                    Ok(true)
                })?;
                if changed {
                    self.store
                        .dispatch(StoreChange::assign(Path::root(), value), None)?;
                }
                Ok(())
            }
        }
    }

    /// Remove `key` from the object at this path. Returns the removed value,
    /// or `None` if the key was absent (in which case nothing is emitted).
    pub fn delete(&self, key: &str) -> Result<Option<Value>> {
        let path = &self.path;
        let removed = self.store.update(path, |target| match target {
            Value::Object(map) => Ok(map.remove(key)),
            _ => Err(ReactiveError::TypeMismatch {
                path: path.clone(),
                expected: "an object",
            }),
        })?;

        if removed.is_some() {
            self.store
                .dispatch(StoreChange::delete(path.child(key)), None)?;
        }
        Ok(removed)
    }

    /// Append one item to the array at this path.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        self.extend([value.into()])
    }

    /// Append items to the array at this path as a single `push` change.
    pub fn extend(&self, items: impl IntoIterator<Item = Value>) -> Result<()> {
        let items: Vec<Value> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(());
        }

        let (shift, after) = self.with_array(|array| {
            let shift = IndexShift {
                start: array.len(),
                removed: 0,
                inserted: items.len(),
                len: array.len(),
            };
            array.extend(items.iter().cloned());
            Ok(shift)
        })?;
        self.emit(ChangeOp::Push, items, after, shift)
    }

    /// Remove and return the last item of the array at this path. An empty
    /// array is left alone and nothing is emitted.
    pub fn pop(&self) -> Result<Option<Value>> {
        let ((popped, shift), after) = self.with_array(|array| {
            let len = array.len();
            let popped = array.pop();
            let shift = IndexShift {
                start: len.saturating_sub(1),
                removed: usize::from(popped.is_some()),
                inserted: 0,
                len,
            };
            Ok((popped, shift))
        })?;

        if popped.is_some() {
            self.emit(ChangeOp::Pop, Vec::new(), after, shift)?;
        }
        Ok(popped)
    }

    /// Remove `delete_count` items starting at `start` and insert `items` in
    /// their place. Both bounds are clamped to the array. Returns the removed
    /// items.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: Vec<Value>,
    ) -> Result<Vec<Value>> {
        let ((removed, shift), after) = self.with_array(|array| {
            let len = array.len();
            let start = start.min(len);
            let delete_count = delete_count.min(len - start);
            let shift = IndexShift {
                start,
                removed: delete_count,
                inserted: items.len(),
                len,
            };
            let removed: Vec<Value> = array
                .splice(start..start + delete_count, items.iter().cloned())
                .collect();
            Ok((removed, shift))
        })?;

        if shift.removed == 0 && shift.inserted == 0 {
            return Ok(removed);
        }

        let mut args = Vec::with_capacity(items.len() + 2);
        args.push(json!(shift.start));
        args.push(json!(shift.removed));
        args.extend(items);
        self.emit(ChangeOp::Splice, args, after, shift)?;
        Ok(removed)
    }

    /// Insert one item at `index`, which may equal the length.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let len = self.array_len()?;
        if index > len {
            return Err(ReactiveError::IndexOutOfBounds {
                path: self.path.clone(),
                index,
                len,
            });
        }
        self.splice(index, 0, vec![value.into()]).map(drop)
    }

    /// Remove and return the item at `index`.
    pub fn remove(&self, index: usize) -> Result<Value> {
        let len = self.array_len()?;
        if index >= len {
            return Err(ReactiveError::IndexOutOfBounds {
                path: self.path.clone(),
                index,
                len,
            });
        }
        let mut removed = self.splice(index, 1, Vec::new())?;
        removed.pop().ok_or_else(|| ReactiveError::IndexOutOfBounds {
            path: self.path.clone(),
            index,
            len,
        })
    }

    fn array_len(&self) -> Result<usize> {
        let value = self.get()?;
        value
            .as_array()
            .map(Vec::len)
            .ok_or_else(|| ReactiveError::TypeMismatch {
                path: self.path.clone(),
                expected: "an array",
            })
    }

    /// Run `f` on the array at this path and return its result together with
    /// the array as it is afterwards.
    fn with_array<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> Result<R>) -> Result<(R, Value)> {
        let path = &self.path;
        self.store.update(path, |target| match target {
            Value::Array(array) => {
                let result = f(array)?;
                Ok((result, Value::Array(array.clone())))
            }
            _ => Err(ReactiveError::TypeMismatch {
                path: path.clone(),
                expected: "an array",
            }),
        })
    }

    fn emit(&self, op: ChangeOp, args: Vec<Value>, after: Value, shift: IndexShift) -> Result<()> {
        let change = StoreChange::structural(self.path.clone(), op, args, after);
        self.store.dispatch(change, Some(shift))
    }
}
