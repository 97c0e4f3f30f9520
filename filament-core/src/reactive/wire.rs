//! Wires
//!
//! A wire is a reactive computation. Its body reads signals and store cursors
//! through a [`Token`], and every read becomes a dependency. When any
//! dependency changes, the wire is run again and its result is compared with
//! the previous one; if the result changed, the wire's tasks are fired with
//! the new value.
//!
//! # Example
//!
//! ```
//! use filament_core::{Runtime, Signal, Wire};
//!
//! let runtime = Runtime::new();
//! let count = Signal::new(&runtime, 2);
//!
//! let read = count.clone();
//! let doubled = Wire::new(&runtime, move |t, _| Ok(t.get(&read)? * 2));
//! assert_eq!(doubled.run().unwrap(), 4);
//!
//! count.set(5).unwrap();
//! assert_eq!(doubled.value(), Some(10));
//! # runtime.teardown();
//! ```
//!
//! Wires created from inside another wire's body (through
//! [`WireContext::wire`]) are owned by it and are disposed each time the
//! parent runs again.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::context::{Token, WireContext};
use super::runtime::Runtime;
use super::signal::Signal;
use super::{TaskId, WireId};
use crate::error::{ReactiveError, Result};
use crate::graph::WireState;
use crate::store::Cursor;

/// Type-erased view of a wire used by the runtime.
pub(crate) trait Runnable {
    /// Execute the body once. Returns whether the result differs from the
    /// previous one.
    fn run(&self, token: &Token) -> Result<bool>;

    /// Call every task with the current value.
    fn fire_tasks(&self) -> Result<()>;
}

type Body<T> = Box<dyn Fn(&Token, &WireContext<'_, T>) -> Result<T>>;
type Task<T> = Rc<dyn Fn(&T) -> Result<()>>;

struct WireCell<T> {
    body: Body<T>,
    value: RefCell<Option<T>>,
    tasks: RefCell<IndexMap<TaskId, Task<T>>>,
    run_count: Cell<usize>,
}

impl<T: Clone + PartialEq + 'static> Runnable for WireCell<T> {
    fn run(&self, token: &Token) -> Result<bool> {
        let previous = self.value.borrow().clone();
        let cx = WireContext::new(token, previous);
        let next = (self.body)(token, &cx)?;
        self.run_count.set(self.run_count.get() + 1);

        let changed = cx.previous_value() != Some(&next);
        *self.value.borrow_mut() = Some(next);
        Ok(changed)
    }

    fn fire_tasks(&self) -> Result<()> {
        let Some(value) = self.value.borrow().clone() else {
            return Ok(());
        };
        // Snapshot so tasks may add or remove tasks while firing.
        let tasks: Vec<Task<T>> = self.tasks.borrow().values().cloned().collect();
        for task in tasks {
            task(&value)?;
        }
        Ok(())
    }
}

/// Handle to a wire.
///
/// Dropping the handle does not dispose the wire; it keeps reacting until
/// [`dispose`](Self::dispose) is called, its parent re-runs, or the runtime is
/// torn down.
pub struct Wire<T> {
    id: WireId,
    runtime: Runtime,
    cell: Rc<WireCell<T>>,
}

impl<T> Wire<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a top-level wire. The body does not run until [`run`](Self::run)
    /// is called.
    pub fn new<F>(runtime: &Runtime, body: F) -> Self
    where
        F: Fn(&Token, &WireContext<'_, T>) -> Result<T> + 'static,
    {
        Self::build(runtime, None, body)
    }

    pub(crate) fn build<F>(runtime: &Runtime, upper: Option<WireId>, body: F) -> Self
    where
        F: Fn(&Token, &WireContext<'_, T>) -> Result<T> + 'static,
    {
        let cell = Rc::new(WireCell {
            body: Box::new(body),
            value: RefCell::new(None),
            tasks: RefCell::new(IndexMap::new()),
            run_count: Cell::new(0),
        });
        let id = runtime.register_wire(cell.clone(), upper);
        Self {
            id,
            runtime: runtime.clone(),
            cell,
        }
    }

    /// A wire that mirrors a signal.
    pub fn from_signal(signal: &Signal<T>) -> Self {
        let signal = signal.clone();
        let runtime = signal.runtime().clone();
        Self::new(&runtime, move |t, _| t.get(&signal))
    }

    pub fn id(&self) -> WireId {
        self.id
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Run the body now and return its result.
    ///
    /// This is how a wire is started. Tasks are not fired by an explicit run;
    /// they fire only when a dependency change makes the result differ.
    /// Running a paused wire works and leaves it paused.
    pub fn run(&self) -> Result<T> {
        self.runtime.run_wire(self.id)?;
        self.value().ok_or(ReactiveError::WireDisposed(self.id))
    }

    /// Result of the latest run.
    pub fn value(&self) -> Option<T> {
        self.cell.value.borrow().clone()
    }

    /// Number of times the body has completed.
    pub fn run_count(&self) -> usize {
        self.cell.run_count.get()
    }

    /// Current scheduling state, or `None` once disposed.
    pub fn state(&self) -> Option<WireState> {
        self.runtime.state_of(self.id)
    }

    /// Register a task fired with every changed result.
    pub fn add_task<F>(&self, task: F) -> TaskId
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        let id = self.runtime.issue_task_id();
        self.cell.tasks.borrow_mut().insert(id, Rc::new(task));
        id
    }

    /// Remove a task. Returns whether it was registered.
    pub fn remove_task(&self, task: TaskId) -> bool {
        self.cell.tasks.borrow_mut().shift_remove(&task).is_some()
    }

    pub fn task_count(&self) -> usize {
        self.cell.tasks.borrow().len()
    }

    /// Unsubscribe from every dependency and dispose children. The wire is
    /// left in `NeedsRun` and reacts again after its next run.
    pub fn reset(&self) {
        self.runtime.reset_wire(self.id);
    }

    /// Stop reacting. Invalidations are remembered, not executed. Children
    /// are paused too.
    pub fn pause(&self) {
        self.runtime.pause_wire(self.id);
    }

    /// Undo [`pause`](Self::pause). Returns whether the wire or any of its
    /// children missed a run; the caller decides whether to [`run`](Self::run).
    pub fn resume(&self) -> bool {
        self.runtime.resume_wire(self.id)
    }

    /// Reset the wire and remove it from the runtime. Tasks are dropped.
    pub fn dispose(&self) {
        self.runtime.dispose_wire(self.id);
        self.cell.tasks.borrow_mut().clear();
    }

    pub fn is_disposed(&self) -> bool {
        !self.runtime.contains_wire(self.id)
    }

    /// The wire whose run created this one.
    pub fn parent(&self) -> Option<WireId> {
        self.runtime.parent_of(self.id)
    }

    /// Wires created during the latest run of this one.
    pub fn children(&self) -> Vec<WireId> {
        self.runtime.children_of(self.id)
    }
}

impl Wire<Value> {
    /// A wire that mirrors the value at a store cursor.
    pub fn from_cursor(cursor: &Cursor) -> Self {
        let cursor = cursor.clone();
        let runtime = cursor.store().runtime().clone();
        Self::new(&runtime, move |t, _| t.read(&cursor))
    }
}

impl<T> Clone for Wire<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            runtime: self.runtime.clone(),
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Wire<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wire")
            .field("id", &self.id)
            .field("value", &self.cell.value.borrow())
            .field("run_count", &self.cell.run_count.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
