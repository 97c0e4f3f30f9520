//! Reactive Context
//!
//! Every run of a wire receives a fresh [`Token`]. Reading a signal or a store
//! cursor through the token returns the current value and records the read as
//! a dependency of the running wire. Since the token is rebuilt for each run
//! and the wire's dependency sets are cleared right before it, dependencies
//! always reflect exactly the reads of the latest run.
//!
//! The body also gets a [`WireContext`], which carries the previous result and
//! the factory for child wires.
//!
//! # Implementation
//!
//! There is no ambient "current wire" stored in a thread-local. The token
//! names its wire explicitly.
//! The runtime side of a run is bracketed by a [`RunGuard`] that restores the
//! wire's state if the body fails or panics.

use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::runtime::Runtime;
use super::signal::Signal;
use super::wire::{Runnable, Wire};
use super::WireId;
use crate::error::{ReactiveError, Result};
use crate::graph::WireState;
use crate::store::Cursor;

/// Subscription token handed to a wire body.
pub struct Token {
    runtime: Runtime,
    wire: WireId,
}

impl Token {
    pub(crate) fn new(runtime: Runtime, wire: WireId) -> Self {
        Self { runtime, wire }
    }

    /// The wire this token subscribes.
    pub fn wire(&self) -> WireId {
        self.wire
    }

    /// The runtime the wire belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Read a signal and subscribe the wire to it.
    ///
    /// The signal must belong to the wire's runtime.
    pub fn get<T>(&self, signal: &Signal<T>) -> Result<T>
    where
        T: Clone + PartialEq + 'static,
    {
        if !signal.runtime().ptr_eq(&self.runtime) {
            return Err(ReactiveError::ForeignRuntime {
                wire: self.wire,
                read: signal.id().to_string(),
            });
        }
        self.runtime.subscribe_signal(signal.id(), self.wire);
        Ok(signal.get())
    }

    /// Resolve a store cursor and subscribe the wire to its path.
    ///
    /// The subscription is recorded even when the path does not resolve, so a
    /// later write that creates the path still re-runs the wire. The store
    /// must belong to the wire's runtime.
    pub fn read(&self, cursor: &Cursor) -> Result<Value> {
        let store = cursor.store();
        if !store.runtime().ptr_eq(&self.runtime) {
            return Err(ReactiveError::ForeignRuntime {
                wire: self.wire,
                read: store.id().to_string(),
            });
        }
        self.runtime
            .track_store_path(store.id(), self.wire, cursor.path());
        store.resolve(cursor.path())
    }

    /// Like [`read`](Self::read), deserializing the value into `T`.
    pub fn read_as<T: DeserializeOwned>(&self, cursor: &Cursor) -> Result<T> {
        Ok(serde_json::from_value(self.read(cursor)?)?)
    }
}

/// Per-run context passed to a wire body next to its [`Token`].
pub struct WireContext<'a, T> {
    token: &'a Token,
    previous: Option<T>,
}

impl<'a, T> WireContext<'a, T> {
    pub(crate) fn new(token: &'a Token, previous: Option<T>) -> Self {
        Self { token, previous }
    }

    /// Result of the previous run, if any.
    pub fn previous_value(&self) -> Option<&T> {
        self.previous.as_ref()
    }

    /// Create a child wire owned by the running wire.
    ///
    /// Children are disposed whenever their parent re-runs, resets or is
    /// disposed.
    pub fn wire<U, F>(&self, body: F) -> Wire<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&Token, &WireContext<'_, U>) -> Result<U> + 'static,
    {
        Wire::build(self.token.runtime(), Some(self.token.wire()), body)
    }
}

/// Keeps a wire in the running state for the duration of one body call.
///
/// Dropping the guard without calling [`finish`](Self::finish) (an error or a
/// panic in the body) puts the wire back into `NeedsRun`.
pub(crate) struct RunGuard<'a> {
    runtime: &'a Runtime,
    wire: WireId,
    body: Rc<dyn Runnable>,
    finished: bool,
}

impl<'a> RunGuard<'a> {
    pub(crate) fn enter(runtime: &'a Runtime, wire: WireId) -> Result<Self> {
        runtime.with_graph(|graph| {
            let node = graph
                .get_mut(wire)
                .ok_or(ReactiveError::WireDisposed(wire))?;
            let state = node.state();
            if state.is_running() {
                return Err(ReactiveError::ReentrantRun(wire));
            }
            node.begin_run();
            Ok(Self {
                runtime,
                wire,
                body: node.body(),
                finished: false,
            })
        })
    }

    pub(crate) fn body(&self) -> Rc<dyn Runnable> {
        Rc::clone(&self.body)
    }

    /// End the run successfully. Returns the state the wire settled in, or
    /// `None` if the wire was disposed during its own run.
    pub(crate) fn finish(mut self) -> Option<WireState> {
        self.finished = true;
        let wire = self.wire;
        self.runtime.with_graph(|graph| {
            graph.get_mut(wire).map(|node| {
                node.complete_run();
                node.state()
            })
        })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let wire = self.wire;
        self.runtime.try_with_graph(|graph| {
            if let Some(node) = graph.get_mut(wire) {
                node.abort_run();
            }
        });
    }
}
