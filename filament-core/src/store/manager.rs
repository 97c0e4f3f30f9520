//! Store Manager
//!
//! A [`Store`] owns a `serde_json::Value` tree. It is never mutated directly:
//! every write goes through a [`Draft`](super::Draft), which applies the
//! mutation to the live value and then dispatches exactly one
//! [`StoreChange`] before returning.
//!
//! # Dispatch
//!
//! 1. For array operations, recorded read paths and task paths under the array
//!    are relocated to follow their elements.
//! 2. Wires whose read paths match the change are run as one batch.
//! 3. Store tasks whose path is a prefix of the changed path are called with
//!    the change, in registration order.
//!
//! Readers never see a half-applied change: the value is updated before any
//! wire runs, and a [`Cursor`] always resolves against the live value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use super::change::{IndexShift, Relocation, StoreChange};
use super::path::Path;
use crate::error::{ReactiveError, Result};
use crate::reactive::{Runtime, StoreId, TaskId, WireId};

type Observer = Rc<dyn Fn(&StoreChange) -> Result<()>>;

struct StoreTask {
    path: Path,
    observer: Observer,
}

struct StoreManager {
    id: StoreId,
    runtime: Runtime,
    value: RefCell<Value>,
    tasks: RefCell<IndexMap<TaskId, StoreTask>>,
}

impl Drop for StoreManager {
    fn drop(&mut self) {
        self.runtime.release_store(self.id);
    }
}

/// Handle to a reactive store. Clones share the same value.
#[derive(Clone)]
pub struct Store {
    manager: Rc<StoreManager>,
}

impl Store {
    pub fn new(runtime: &Runtime, value: Value) -> Self {
        Self {
            manager: Rc::new(StoreManager {
                id: runtime.register_store(),
                runtime: runtime.clone(),
                value: RefCell::new(value),
                tasks: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Create a store from any serializable value.
    pub fn from_serialize<T: Serialize + ?Sized>(runtime: &Runtime, value: &T) -> Result<Self> {
        Ok(Self::new(runtime, serde_json::to_value(value)?))
    }

    pub fn id(&self) -> StoreId {
        self.manager.id
    }

    pub fn runtime(&self) -> &Runtime {
        &self.manager.runtime
    }

    /// Whether two handles point at the same store.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.manager, &other.manager)
    }

    /// Cursor at the store root.
    pub fn root(&self) -> Cursor {
        self.cursor(Path::root())
    }

    pub fn cursor(&self, path: Path) -> Cursor {
        Cursor {
            store: self.clone(),
            path,
        }
    }

    /// Clone of the whole current value.
    pub fn snapshot(&self) -> Value {
        self.manager.value.borrow().clone()
    }

    /// Whether `path` currently resolves.
    pub fn contains(&self, path: &Path) -> bool {
        path.resolve(&self.manager.value.borrow()).is_some()
    }

    /// Register a coarse listener called with every change at or below
    /// `path`.
    ///
    /// Task paths that point into an array follow their element when the
    /// array is spliced.
    pub fn add_task<F>(&self, path: Path, observer: F) -> TaskId
    where
        F: Fn(&StoreChange) -> Result<()> + 'static,
    {
        let id = self.manager.runtime.issue_task_id();
        self.manager.tasks.borrow_mut().insert(
            id,
            StoreTask {
                path,
                observer: Rc::new(observer),
            },
        );
        id
    }

    pub fn remove_task(&self, task: TaskId) -> bool {
        self.manager.tasks.borrow_mut().shift_remove(&task).is_some()
    }

    /// Current path of a registered task.
    pub fn task_path(&self, task: TaskId) -> Option<Path> {
        self.manager
            .tasks
            .borrow()
            .get(&task)
            .map(|task| task.path.clone())
    }

    /// Number of wires subscribed to this store.
    pub fn subscriber_count(&self) -> usize {
        let id = self.manager.id;
        self.manager
            .runtime
            .with_store_readers(id, |readers| readers.len())
    }

    pub fn has_subscriber(&self, wire: WireId) -> bool {
        let id = self.manager.id;
        self.manager
            .runtime
            .with_store_readers(id, |readers| readers.contains(wire))
    }

    /// Paths `wire` read from this store during its latest run, after any
    /// relocation.
    pub fn tracked_paths(&self, wire: WireId) -> Result<Vec<Path>> {
        let id = self.manager.id;
        self.manager
            .runtime
            .with_store_readers(id, |readers| readers.paths_of(wire))
    }

    pub(crate) fn resolve(&self, path: &Path) -> Result<Value> {
        path.resolve(&self.manager.value.borrow())
            .cloned()
            .ok_or_else(|| ReactiveError::PathNotFound {
                store: self.manager.id,
                path: path.clone(),
            })
    }

    /// Apply `f` to the live value at `path`. The value stays borrowed for
    /// the duration of `f`, so `f` must not touch the store.
    pub(crate) fn update<R>(
        &self,
        path: &Path,
        f: impl FnOnce(&mut Value) -> Result<R>,
    ) -> Result<R> {
        let mut root = self.manager.value.borrow_mut();
        let target = path
            .resolve_mut(&mut root)
            .ok_or_else(|| ReactiveError::PathNotFound {
                store: self.manager.id,
                path: path.clone(),
            })?;
        f(target)
    }

    /// Propagate a change that has already been applied to the value.
    pub(crate) fn dispatch(&self, change: StoreChange, shift: Option<IndexShift>) -> Result<()> {
        let manager = &self.manager;
        let to_run = manager.runtime.with_store_readers(manager.id, |readers| {
            readers.apply_change(&change.path, change.is_structural(), shift.as_ref())
        })?;

        if let Some(shift) = &shift {
            self.relocate_tasks(&change.path, shift);
        }

        trace!(
            store = %manager.id,
            path = %change.path,
            op = ?change.op(),
            wires = to_run.len(),
            "store changed"
        );
        manager.runtime.run_wires(&to_run)?;

        let observers: Vec<Observer> = manager
            .tasks
            .borrow()
            .values()
            .filter(|task| task.path.is_prefix_of(&change.path))
            .map(|task| Rc::clone(&task.observer))
            .collect();
        for observer in observers {
            observer(&change)?;
        }
        Ok(())
    }

    fn relocate_tasks(&self, array: &Path, shift: &IndexShift) {
        for (id, task) in self.manager.tasks.borrow_mut().iter_mut() {
            match shift.relocate(array, &task.path) {
                Relocation::Moved(path) => task.path = path,
                Relocation::Removed => {
                    debug!(task = %id, path = %task.path, "task element removed, path kept");
                }
                Relocation::Unchanged | Relocation::Filled => {}
            }
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.manager.id)
            .field("value", &self.manager.value.borrow())
            .field("tasks", &self.manager.tasks.borrow().len())
            .finish()
    }
}

/// A path into a store. Cursors never cache values; every read resolves
/// against the live store.
#[derive(Clone)]
pub struct Cursor {
    store: Store,
    path: Path,
}

impl Cursor {
    /// Cursor at an object key below this one.
    pub fn field(&self, key: impl Into<String>) -> Cursor {
        self.store.cursor(self.path.child(key))
    }

    /// Cursor at an array index below this one.
    pub fn index(&self, index: usize) -> Cursor {
        self.store.cursor(self.path.index(index))
    }

    /// Cursor at a relative path below this one.
    pub fn at(&self, path: &Path) -> Cursor {
        self.store.cursor(self.path.join(path))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve without subscribing.
    pub fn get(&self) -> Result<Value> {
        self.store.resolve(&self.path)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("store", &self.store.id())
            .field("path", &self.path)
            .finish()
    }
}
