//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, stores and
//! wires. It owns the wire arena and both subscription registries, and it
//! executes run-sets when a source changes.
//!
//! # How It Works
//!
//! 1. Signals, stores and wires are created against a runtime, which issues
//!    their ids.
//!
//! 2. When a wire body reads a source through its [`Token`], the runtime
//!    records a two-way link: the source's subscriber set gains the wire and
//!    the wire's node remembers the source.
//!
//! 3. When a source changes, it hands its matching subscribers to
//!    [`Runtime::run_wires`], which prunes the set (see
//!    [`graph`](crate::graph)) and runs the survivors once each, in insertion
//!    order. A wire whose new value differs from the previous one fires its
//!    tasks.
//!
//! 4. Before every run a wire's children are disposed and its dependency
//!    sets are cleared, so the run rebuilds both from scratch.
//!
//! # Re-entrancy
//!
//! Everything is synchronous and single-threaded. A write issued from inside
//! a wire body or a task starts a nested batch with its own snapshot of
//! subscribers. Nesting depth is bounded by
//! [`RuntimeConfig::max_batch_depth`]; a wire invalidated during its own run
//! is re-run afterwards, at most [`RuntimeConfig::max_rerun_rounds`] times.
//!
//! An error from a wire body or task aborts the remainder of the batch it
//! occurred in and is returned from the write that started it. Wires that
//! already ran keep their new values; the ones that were skipped are left in
//! `NeedsRun`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use tracing::{debug, trace, warn};

use super::context::{RunGuard, Token};
use super::wire::Runnable;
use super::{SignalId, StoreId, TaskId, WireId};
use crate::config::RuntimeConfig;
use crate::error::{ReactiveError, Result};
use crate::graph::{WireGraph, WireNode, WireState};
use crate::store::{Path, StoreReaders};

/// Handle to a reactive runtime. Clones share the same state.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

struct RuntimeInner {
    config: RuntimeConfig,
    next_id: Cell<u64>,
    graph: RefCell<WireGraph>,
    signals: RefCell<HashMap<SignalId, IndexSet<WireId>>>,
    stores: RefCell<HashMap<StoreId, StoreReaders>>,
    depth: Cell<usize>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with an explicit configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                next_id: Cell::new(0),
                graph: RefCell::new(WireGraph::new()),
                signals: RefCell::new(HashMap::new()),
                stores: RefCell::new(HashMap::new()),
                depth: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Number of wires currently in the arena.
    pub fn wire_count(&self) -> usize {
        self.inner.graph.borrow().len()
    }

    /// Whether two handles point at the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Drop every wire and every subscription.
    ///
    /// Signals and stores stay usable; they simply have no subscribers
    /// afterwards. Wire handles created before the teardown report themselves
    /// as disposed. Wire bodies usually capture the signals they read, which
    /// keeps the runtime alive through a reference cycle; tearing down breaks
    /// it.
    pub fn teardown(&self) {
        let nodes = self.inner.graph.borrow_mut().drain();
        for subscribers in self.inner.signals.borrow_mut().values_mut() {
            subscribers.clear();
        }
        for readers in self.inner.stores.borrow_mut().values_mut() {
            readers.clear();
        }
        self.inner.depth.set(0);
        debug!(wires = nodes.len(), "runtime torn down");
        drop(nodes);
    }

    pub(crate) fn issue_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    pub(crate) fn with_graph<R>(&self, f: impl FnOnce(&mut WireGraph) -> R) -> R {
        f(&mut self.inner.graph.borrow_mut())
    }

    /// Like [`with_graph`](Self::with_graph), but does nothing if the arena
    /// is already borrowed. Used from `Drop` impls.
    pub(crate) fn try_with_graph(&self, f: impl FnOnce(&mut WireGraph)) {
        if let Ok(mut graph) = self.inner.graph.try_borrow_mut() {
            f(&mut graph);
        }
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    pub(crate) fn register_wire(&self, body: Rc<dyn Runnable>, upper: Option<WireId>) -> WireId {
        let id = WireId::from_raw(self.issue_id());
        self.with_graph(|graph| graph.insert(id, WireNode::new(body, upper)));
        trace!(wire = %id, parent = ?upper.map(|p| p.raw()), "wire registered");
        id
    }

    pub(crate) fn register_signal(&self) -> SignalId {
        let id = SignalId::from_raw(self.issue_id());
        self.inner.signals.borrow_mut().insert(id, IndexSet::new());
        id
    }

    pub(crate) fn release_signal(&self, id: SignalId) {
        if let Ok(mut signals) = self.inner.signals.try_borrow_mut() {
            signals.remove(&id);
        }
    }

    pub(crate) fn register_store(&self) -> StoreId {
        let id = StoreId::from_raw(self.issue_id());
        self.inner
            .stores
            .borrow_mut()
            .insert(id, StoreReaders::default());
        id
    }

    pub(crate) fn release_store(&self, id: StoreId) {
        if let Ok(mut stores) = self.inner.stores.try_borrow_mut() {
            stores.remove(&id);
        }
    }

    pub(crate) fn issue_task_id(&self) -> TaskId {
        TaskId::from_raw(self.issue_id())
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    /// Link a wire and a signal in both directions.
    pub(crate) fn subscribe_signal(&self, signal: SignalId, wire: WireId) {
        let tracked = self.with_graph(|graph| match graph.get_mut(wire) {
            Some(node) => {
                node.track_signal(signal);
                true
            }
            None => false,
        });
        if tracked {
            self.inner
                .signals
                .borrow_mut()
                .entry(signal)
                .or_default()
                .insert(wire);
        }
    }

    /// Snapshot of a signal's subscribers, in subscription order.
    pub(crate) fn signal_subscribers(&self, signal: SignalId) -> IndexSet<WireId> {
        self.inner
            .signals
            .borrow()
            .get(&signal)
            .cloned()
            .unwrap_or_default()
    }

    /// Link a wire and a store path in both directions.
    pub(crate) fn track_store_path(&self, store: StoreId, wire: WireId, path: &Path) {
        let tracked = self.with_graph(|graph| match graph.get_mut(wire) {
            Some(node) => {
                node.track_store(store);
                true
            }
            None => false,
        });
        if tracked {
            self.with_store_readers(store, |readers| readers.track(wire, path));
        }
    }

    pub(crate) fn with_store_readers<R>(
        &self,
        store: StoreId,
        f: impl FnOnce(&mut StoreReaders) -> R,
    ) -> R {
        let mut stores = self.inner.stores.borrow_mut();
        f(stores.entry(store).or_default())
    }

    /// Unlink a wire from every source it read and dispose its children.
    ///
    /// Children are handled first, depth-first, so no child is left pointing
    /// at a parent whose links are already gone.
    fn detach(&self, wire: WireId) {
        let Some(children) = self.with_graph(|graph| graph.get_mut(wire).map(WireNode::take_children))
        else {
            return;
        };
        for child in children {
            self.detach(child);
            let removed = self.with_graph(|graph| graph.remove(child));
            trace!(wire = %child, "child wire disposed");
            drop(removed);
        }

        let (signals, stores) = self
            .with_graph(|graph| graph.get_mut(wire).map(WireNode::take_dependencies))
            .unwrap_or_default();
        {
            let mut registry = self.inner.signals.borrow_mut();
            for signal in &signals {
                if let Some(subscribers) = registry.get_mut(signal) {
                    subscribers.shift_remove(&wire);
                }
            }
        }
        {
            let mut registry = self.inner.stores.borrow_mut();
            for store in &stores {
                if let Some(readers) = registry.get_mut(store) {
                    readers.untrack(wire);
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    /// Run one batch of invalidated wires.
    pub fn run_wires(&self, candidates: &IndexSet<WireId>) -> Result<()> {
        if candidates.is_empty() {
            return Ok(());
        }
        let _depth = BatchDepth::enter(self)?;

        let batch = self.with_graph(|graph| graph.plan_batch(candidates))?;
        debug!(
            candidates = candidates.len(),
            planned = batch.len(),
            depth = self.inner.depth.get(),
            "running batch"
        );

        let mut pending = batch.into_iter();
        while let Some(wire) = pending.next() {
            // An earlier wire of this batch may have paused or disposed it.
            if !self.still_runnable(wire) {
                continue;
            }
            let outcome = match self.run_wire(wire) {
                Ok(true) => self.fire_tasks(wire),
                Ok(false) => Ok(()),
                Err(err) => Err(err),
            };
            if let Err(err) = outcome {
                self.abandon(pending);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Mark the wires a failed batch did not get to as needing a run.
    fn abandon(&self, skipped: impl Iterator<Item = WireId>) {
        let count = self.with_graph(|graph| {
            let mut count = 0;
            for wire in skipped {
                if let Some(node) = graph.get_mut(wire) {
                    node.invalidate();
                    count += 1;
                }
            }
            count
        });
        if count > 0 {
            debug!(skipped = count, "batch aborted");
        }
    }

    fn still_runnable(&self, wire: WireId) -> bool {
        self.with_graph(|graph| match graph.get_mut(wire) {
            None => false,
            Some(node) => {
                let state = node.state();
                if state.is_paused() || state.is_running() {
                    node.invalidate();
                    false
                } else {
                    true
                }
            }
        })
    }

    /// Run a wire's body with a fresh token. Returns whether its value
    /// changed. Tasks are not fired.
    pub(crate) fn run_wire(&self, wire: WireId) -> Result<bool> {
        let mut changed = false;
        let mut rounds = 0;
        loop {
            let guard = RunGuard::enter(self, wire)?;
            self.detach(wire);

            trace!(wire = %wire, round = rounds, "running wire");
            let token = Token::new(self.clone(), wire);
            changed |= guard.body().run(&token)?;

            match guard.finish() {
                Some(state) if state.needs_run() && !state.is_paused() => {}
                _ => return Ok(changed),
            }

            rounds += 1;
            if rounds >= self.inner.config.max_rerun_rounds {
                return Err(ReactiveError::NonConvergent { wire, rounds });
            }
            trace!(wire = %wire, "wire invalidated during its own run");
        }
    }

    pub(crate) fn fire_tasks(&self, wire: WireId) -> Result<()> {
        let body = self.with_graph(|graph| graph.get(wire).map(WireNode::body));
        match body {
            Some(body) => body.fire_tasks(),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Unsubscribe a wire everywhere, dispose its children and put it back
    /// into `NeedsRun`. The wire stays in the arena and can run again.
    pub fn reset_wire(&self, wire: WireId) {
        self.detach(wire);
        self.with_graph(|graph| {
            if let Some(node) = graph.get_mut(wire) {
                node.set_state(WireState::NeedsRun);
            }
        });
    }

    /// Reset a wire and remove it from the arena.
    pub fn dispose_wire(&self, wire: WireId) {
        self.detach(wire);
        let removed = self.with_graph(|graph| graph.remove(wire));
        if removed.is_some() {
            trace!(wire = %wire, "wire disposed");
        }
    }

    /// Pause a wire and all of its descendants.
    pub fn pause_wire(&self, wire: WireId) {
        for child in self.children_of(wire) {
            self.pause_wire(child);
        }
        self.with_graph(|graph| {
            if let Some(node) = graph.get_mut(wire) {
                if node.state().is_running() {
                    warn!(wire = %wire, "cannot pause a wire while it is running");
                } else {
                    node.set_state(node.state().pause());
                }
            }
        });
    }

    /// Resume a wire and all of its descendants. Returns whether any of them
    /// missed a run while paused.
    pub fn resume_wire(&self, wire: WireId) -> bool {
        let mut missed = false;
        for child in self.children_of(wire) {
            missed |= self.resume_wire(child);
        }
        self.with_graph(|graph| {
            if let Some(node) = graph.get_mut(wire) {
                node.set_state(node.state().resume());
                missed |= node.state().needs_run();
            }
        });
        missed
    }

    pub(crate) fn children_of(&self, wire: WireId) -> Vec<WireId> {
        self.with_graph(|graph| {
            graph
                .get(wire)
                .map(|node| node.lower().iter().copied().collect())
                .unwrap_or_default()
        })
    }

    pub(crate) fn parent_of(&self, wire: WireId) -> Option<WireId> {
        self.with_graph(|graph| graph.get(wire).and_then(WireNode::upper))
    }

    pub(crate) fn state_of(&self, wire: WireId) -> Option<WireState> {
        self.with_graph(|graph| graph.get(wire).map(WireNode::state))
    }

    pub(crate) fn contains_wire(&self, wire: WireId) -> bool {
        self.with_graph(|graph| graph.contains(wire))
    }

    /// Sources a wire read during its latest run.
    pub fn dependencies_of(&self, wire: WireId) -> (Vec<SignalId>, Vec<StoreId>) {
        self.with_graph(|graph| {
            graph
                .get(wire)
                .map(|node| {
                    (
                        node.signals().iter().copied().collect(),
                        node.stores().iter().copied().collect(),
                    )
                })
                .unwrap_or_default()
        })
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("wire_count", &self.wire_count())
            .field("signal_count", &self.inner.signals.borrow().len())
            .field("store_count", &self.inner.stores.borrow().len())
            .finish()
    }
}

/// Counts nested batches for the lifetime of one `run_wires` call.
struct BatchDepth<'a> {
    runtime: &'a Runtime,
}

impl<'a> BatchDepth<'a> {
    fn enter(runtime: &'a Runtime) -> Result<Self> {
        let limit = runtime.inner.config.max_batch_depth;
        let depth = runtime.inner.depth.get() + 1;
        if depth > limit {
            return Err(ReactiveError::BatchDepthExceeded { limit });
        }
        runtime.inner.depth.set(depth);
        Ok(Self { runtime })
    }
}

impl Drop for BatchDepth<'_> {
    fn drop(&mut self) {
        let depth = &self.runtime.inner.depth;
        depth.set(depth.get().saturating_sub(1));
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
