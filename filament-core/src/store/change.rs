//! Store Changes
//!
//! Every mutation of a store is described by exactly one [`StoreChange`]. The
//! same record drives subscriber matching inside the store, is handed to store
//! tasks, and can be replayed onto another store with
//! [`apply_store_change`](crate::store::apply_store_change). Replaying every
//! change of one store, in order, onto an independent store with the same
//! initial value leaves both equal.
//!
//! # Wire format
//!
//! ```json
//! {"path": ["list"], "data": {"name": "push", "args": [44]}, "value": [44]}
//! {"path": ["a"], "value": 4}
//! ```
//!
//! `data` is absent for plain assignments. For structural operations `value`
//! holds the array after the operation. Besides JSON, changes can be encoded
//! as MessagePack for forwarding between processes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::path::{parse_index, Path};
use crate::error::Result;

/// Name of a recorded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// Items appended to an array. Args are the items.
    Push,

    /// Last item removed from an array. No args.
    Pop,

    /// `[start, delete_count, ...items]`, with `start` and `delete_count`
    /// already clamped to the array.
    Splice,

    /// An object key removed. The change path names the removed key.
    Delete,
}

impl ChangeOp {
    /// Whether the operation shifts array indices.
    pub fn is_structural(self) -> bool {
        matches!(self, ChangeOp::Push | ChangeOp::Pop | ChangeOp::Splice)
    }
}

/// Operation details of a non-assignment change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeData {
    pub name: ChangeOp,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// One mutation of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreChange {
    /// For assignments and deletions, the path of the written key. For array
    /// operations, the path of the array.
    pub path: Path,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ChangeData>,

    #[serde(default)]
    pub value: Value,
}

impl StoreChange {
    /// A plain assignment of `value` at `path`.
    pub fn assign(path: Path, value: Value) -> Self {
        Self {
            path,
            data: None,
            value,
        }
    }

    /// An array operation on the array at `path`, which now holds `value`.
    pub fn structural(path: Path, name: ChangeOp, args: Vec<Value>, value: Value) -> Self {
        Self {
            path,
            data: Some(ChangeData { name, args }),
            value,
        }
    }

    /// Removal of the object key at `path`.
    pub fn delete(path: Path) -> Self {
        Self {
            path,
            data: Some(ChangeData {
                name: ChangeOp::Delete,
                args: Vec::new(),
            }),
            value: Value::Null,
        }
    }

    pub fn op(&self) -> Option<ChangeOp> {
        self.data.as_ref().map(|data| data.name)
    }

    pub fn is_structural(&self) -> bool {
        self.op().is_some_and(ChangeOp::is_structural)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as MessagePack with named fields.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// How an array operation moved the indices of one array.
///
/// Indices before `start` keep their position. The `removed` items starting at
/// `start` are gone. The remaining items of the old array move by
/// `inserted - removed`. `len` is the array length before the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexShift {
    pub start: usize,
    pub removed: usize,
    pub inserted: usize,
    pub len: usize,
}

/// Where a recorded path ends up after an [`IndexShift`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    /// Not under the array, or its element did not move.
    Unchanged,

    /// The element moved; the path now points at its new index.
    Moved(Path),

    /// The element was removed.
    Removed,

    /// The path pointed past the end of the array and now resolves.
    Filled,
}

impl IndexShift {
    /// Length of the array after the operation. Inconsistent shifts
    /// saturate instead of overflowing.
    pub fn new_len(&self) -> usize {
        self.len
            .saturating_sub(self.removed)
            .saturating_add(self.inserted)
    }

    /// Relocate `path` given that this shift happened to the array at `array`.
    pub fn relocate(&self, array: &Path, path: &Path) -> Relocation {
        if path.len() <= array.len() || !array.is_prefix_of(path) {
            return Relocation::Unchanged;
        }
        let Some(index) = parse_index(&path.segments()[array.len()]) else {
            return Relocation::Unchanged;
        };

        if index < self.start {
            Relocation::Unchanged
        } else if index < self.start.saturating_add(self.removed) {
            Relocation::Removed
        } else if index < self.len {
            let moved = (index - self.removed).saturating_add(self.inserted);
            if moved == index {
                return Relocation::Unchanged;
            }
            let mut segments = path.segments().to_vec();
            segments[array.len()] = moved.to_string();
            Relocation::Moved(Path::from_segments(segments))
        } else if index < self.new_len() {
            Relocation::Filled
        } else {
            Relocation::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(segments: &[&str]) -> Path {
        Path::from_segments(segments.iter().copied())
    }

    #[test]
    fn json_shape() {
        let push = StoreChange::structural(path(&["list"]), ChangeOp::Push, vec![json!(44)], json!([44]));
        assert_eq!(
            serde_json::to_value(&push).unwrap(),
            json!({"path": ["list"], "data": {"name": "push", "args": [44]}, "value": [44]})
        );

        let assign = StoreChange::assign(path(&["a"]), json!(4));
        assert_eq!(
            serde_json::to_value(&assign).unwrap(),
            json!({"path": ["a"], "value": 4})
        );
    }

    #[test]
    fn parse_from_json() {
        let change = StoreChange::from_json(r#"{"path": ["a", "b"], "value": {"c": 1}}"#).unwrap();
        assert_eq!(change.path, path(&["a", "b"]));
        assert!(change.data.is_none());
        assert!(!change.is_structural());

        let change = StoreChange::from_json(r#"{"path": [], "data": {"name": "pop"}}"#).unwrap();
        assert_eq!(change.op(), Some(ChangeOp::Pop));
        assert!(change.is_structural());
        assert_eq!(change.value, Value::Null);

        assert!(StoreChange::from_json(r#"{"path": [], "data": {"name": "sort"}}"#).is_err());
    }

    #[test]
    fn msgpack_preserves_changes() {
        let change = StoreChange::structural(
            path(&["list"]),
            ChangeOp::Splice,
            vec![json!(1), json!(2), json!("x")],
            json!([1, "x", 4]),
        );
        let bytes = change.to_msgpack().unwrap();
        assert_eq!(StoreChange::from_msgpack(&bytes).unwrap(), change);
    }

    #[test]
    fn delete_is_not_structural() {
        let change = StoreChange::delete(path(&["a"]));
        assert_eq!(change.op(), Some(ChangeOp::Delete));
        assert!(!change.is_structural());
    }

    #[test]
    fn splice_relocation() {
        // splice(1, 2) on a five element array
        let shift = IndexShift {
            start: 1,
            removed: 2,
            inserted: 0,
            len: 5,
        };
        let list = path(&["list"]);

        assert_eq!(shift.relocate(&list, &path(&["list", "0"])), Relocation::Unchanged);
        assert_eq!(shift.relocate(&list, &path(&["list", "1"])), Relocation::Removed);
        assert_eq!(shift.relocate(&list, &path(&["list", "2", "id"])), Relocation::Removed);
        assert_eq!(
            shift.relocate(&list, &path(&["list", "3"])),
            Relocation::Moved(path(&["list", "1"]))
        );
        assert_eq!(
            shift.relocate(&list, &path(&["list", "4", "id"])),
            Relocation::Moved(path(&["list", "2", "id"]))
        );
        assert_eq!(shift.relocate(&list, &path(&["list", "7"])), Relocation::Unchanged);
    }

    #[test]
    fn paths_outside_the_array_are_untouched() {
        let shift = IndexShift {
            start: 0,
            removed: 1,
            inserted: 0,
            len: 3,
        };
        let list = path(&["list"]);

        assert_eq!(shift.relocate(&list, &path(&["list"])), Relocation::Unchanged);
        assert_eq!(shift.relocate(&list, &Path::root()), Relocation::Unchanged);
        assert_eq!(shift.relocate(&list, &path(&["other", "0"])), Relocation::Unchanged);
        assert_eq!(shift.relocate(&list, &path(&["list", "length"])), Relocation::Unchanged);
    }

    #[test]
    fn push_fills_reads_past_the_end() {
        let shift = IndexShift {
            start: 3,
            removed: 0,
            inserted: 2,
            len: 3,
        };
        let list = path(&["list"]);

        assert_eq!(shift.relocate(&list, &path(&["list", "2"])), Relocation::Unchanged);
        assert_eq!(shift.relocate(&list, &path(&["list", "3"])), Relocation::Filled);
        assert_eq!(shift.relocate(&list, &path(&["list", "4"])), Relocation::Filled);
        assert_eq!(shift.relocate(&list, &path(&["list", "5"])), Relocation::Unchanged);
    }

    #[test]
    fn inconsistent_shifts_do_not_overflow() {
        let shift = IndexShift {
            start: 0,
            removed: 5,
            inserted: 0,
            len: 2,
        };
        let list = path(&["list"]);

        assert_eq!(shift.new_len(), 0);
        assert_eq!(shift.relocate(&list, &path(&["list", "1"])), Relocation::Removed);
        assert_eq!(shift.relocate(&list, &path(&["list", "7"])), Relocation::Unchanged);

        let shift = IndexShift {
            start: usize::MAX,
            removed: usize::MAX,
            inserted: usize::MAX,
            len: 1,
        };
        assert_eq!(shift.new_len(), usize::MAX);
        assert_eq!(shift.relocate(&list, &path(&["list", "0"])), Relocation::Unchanged);
    }

    #[test]
    fn insertion_moves_later_items_up() {
        // splice(1, 0, a, b) on a three element array
        let shift = IndexShift {
            start: 1,
            removed: 0,
            inserted: 2,
            len: 3,
        };
        let list = path(&["list"]);

        assert_eq!(
            shift.relocate(&list, &path(&["list", "1"])),
            Relocation::Moved(path(&["list", "3"]))
        );
        assert_eq!(shift.new_len(), 5);
    }
}
