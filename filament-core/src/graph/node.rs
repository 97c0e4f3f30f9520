//! Graph Nodes
//!
//! This module defines the per-wire record stored in the wire arena, and the
//! state machine that decides whether a wire runs when it is invalidated.

use std::rc::Rc;

use indexmap::IndexSet;

use crate::reactive::{Runnable, SignalId, StoreId, WireId};

/// Scheduling state of a wire.
///
/// A wire starts in `NeedsRun`. There is no terminal state: a wire can be
/// reset and run again until it is disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireState {
    /// Up to date with its dependencies.
    Idle,

    /// Invalidated (or never run). The next batch that includes it runs it.
    #[default]
    NeedsRun,

    /// Paused and up to date. Invalidations are recorded but not executed.
    Paused,

    /// Paused and invalidated at least once since it was paused.
    PausedNeedsRun,

    /// Currently executing its body. `stale` records an invalidation that
    /// arrived during the run.
    Running { stale: bool },
}

impl WireState {
    /// Whether writes are currently being deferred for this wire.
    pub fn is_paused(self) -> bool {
        matches!(self, WireState::Paused | WireState::PausedNeedsRun)
    }

    /// Whether the body is executing right now.
    pub fn is_running(self) -> bool {
        matches!(self, WireState::Running { .. })
    }

    /// Whether a run was requested that has not happened yet.
    pub fn needs_run(self) -> bool {
        matches!(
            self,
            WireState::NeedsRun | WireState::PausedNeedsRun | WireState::Running { stale: true }
        )
    }

    /// Record that a dependency changed.
    pub fn invalidate(self) -> Self {
        match self {
            WireState::Idle | WireState::NeedsRun => WireState::NeedsRun,
            WireState::Paused | WireState::PausedNeedsRun => WireState::PausedNeedsRun,
            WireState::Running { .. } => WireState::Running { stale: true },
        }
    }

    /// Stop executing invalidations. A running wire cannot be paused.
    pub fn pause(self) -> Self {
        match self {
            WireState::Idle => WireState::Paused,
            WireState::NeedsRun => WireState::PausedNeedsRun,
            other => other,
        }
    }

    /// Undo [`pause`](Self::pause), keeping any missed invalidation.
    pub fn resume(self) -> Self {
        match self {
            WireState::Paused => WireState::Idle,
            WireState::PausedNeedsRun => WireState::NeedsRun,
            other => other,
        }
    }

    /// Enter the running state.
    pub fn start_run(self) -> Self {
        WireState::Running { stale: false }
    }

    /// Leave the running state after the body returned successfully.
    pub fn finish_run(self) -> Self {
        match self {
            WireState::Running { stale: false } => WireState::Idle,
            WireState::Running { stale: true } => WireState::NeedsRun,
            other => other,
        }
    }

    /// Leave the running state after the body failed.
    pub fn abort_run(self) -> Self {
        match self {
            WireState::Running { .. } => WireState::NeedsRun,
            other => other,
        }
    }
}

/// A wire's entry in the arena.
///
/// The typed part of the wire (body, value, tasks) lives behind `body`; the
/// node keeps everything the scheduler needs without knowing the value type.
pub(crate) struct WireNode {
    state: WireState,

    /// Set while a paused wire is being run by hand.
    paused_run: bool,

    /// The wire whose run created this one.
    upper: Option<WireId>,

    /// Wires created during the latest run of this one, in creation order.
    lower: IndexSet<WireId>,

    /// Signals read during the latest run.
    signals: IndexSet<SignalId>,

    /// Stores read during the latest run.
    stores: IndexSet<StoreId>,

    body: Rc<dyn Runnable>,
}

impl WireNode {
    pub(crate) fn new(body: Rc<dyn Runnable>, upper: Option<WireId>) -> Self {
        Self {
            state: WireState::default(),
            paused_run: false,
            upper,
            lower: IndexSet::new(),
            signals: IndexSet::new(),
            stores: IndexSet::new(),
            body,
        }
    }

    pub(crate) fn state(&self) -> WireState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: WireState) {
        self.state = state;
    }

    pub(crate) fn invalidate(&mut self) {
        self.state = self.state.invalidate();
    }

    pub(crate) fn begin_run(&mut self) {
        self.paused_run = self.state.is_paused();
        self.state = self.state.start_run();
    }

    /// Apply the end of a successful run. A wire that was run while paused
    /// (a forced catch-up) stays paused.
    pub(crate) fn complete_run(&mut self) {
        self.state = self.state.finish_run();
        self.end_run();
    }

    pub(crate) fn abort_run(&mut self) {
        self.state = self.state.abort_run();
        self.end_run();
    }

    fn end_run(&mut self) {
        if std::mem::take(&mut self.paused_run) {
            self.state = self.state.pause();
        }
    }

    /// Whether a wire created under this one starts out paused.
    pub(crate) fn pauses_children(&self) -> bool {
        self.state.is_paused() || (self.state.is_running() && self.paused_run)
    }

    pub(crate) fn upper(&self) -> Option<WireId> {
        self.upper
    }

    pub(crate) fn lower(&self) -> &IndexSet<WireId> {
        &self.lower
    }

    pub(crate) fn adopt(&mut self, child: WireId) {
        self.lower.insert(child);
    }

    pub(crate) fn disown(&mut self, child: WireId) {
        self.lower.shift_remove(&child);
    }

    pub(crate) fn take_children(&mut self) -> IndexSet<WireId> {
        std::mem::take(&mut self.lower)
    }

    pub(crate) fn track_signal(&mut self, signal: SignalId) {
        self.signals.insert(signal);
    }

    pub(crate) fn track_store(&mut self, store: StoreId) {
        self.stores.insert(store);
    }

    pub(crate) fn signals(&self) -> &IndexSet<SignalId> {
        &self.signals
    }

    pub(crate) fn stores(&self) -> &IndexSet<StoreId> {
        &self.stores
    }

    /// Drop the dependency sets, returning them so the caller can unlink the
    /// wire from each source.
    pub(crate) fn take_dependencies(&mut self) -> (IndexSet<SignalId>, IndexSet<StoreId>) {
        (
            std::mem::take(&mut self.signals),
            std::mem::take(&mut self.stores),
        )
    }

    pub(crate) fn body(&self) -> Rc<dyn Runnable> {
        Rc::clone(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::reactive::Token;

    const ALL: [WireState; 6] = [
        WireState::Idle,
        WireState::NeedsRun,
        WireState::Paused,
        WireState::PausedNeedsRun,
        WireState::Running { stale: false },
        WireState::Running { stale: true },
    ];

    #[test]
    fn starts_needing_a_run() {
        assert_eq!(WireState::default(), WireState::NeedsRun);
    }

    #[test]
    fn invalidate_transitions() {
        assert_eq!(WireState::Idle.invalidate(), WireState::NeedsRun);
        assert_eq!(WireState::NeedsRun.invalidate(), WireState::NeedsRun);
        assert_eq!(WireState::Paused.invalidate(), WireState::PausedNeedsRun);
        assert_eq!(WireState::PausedNeedsRun.invalidate(), WireState::PausedNeedsRun);
        assert_eq!(
            WireState::Running { stale: false }.invalidate(),
            WireState::Running { stale: true }
        );
    }

    #[test]
    fn pause_then_resume_keeps_missed_runs() {
        for state in ALL {
            let round_trip = state.pause().resume();
            if state.is_running() {
                assert_eq!(round_trip, state);
            } else {
                assert_eq!(round_trip.needs_run(), state.needs_run(), "{state:?}");
                assert!(!round_trip.is_paused());
            }
        }
    }

    #[test]
    fn paused_wire_records_invalidation() {
        let state = WireState::Idle.pause().invalidate();
        assert!(state.is_paused());
        assert!(state.needs_run());
        assert_eq!(state.resume(), WireState::NeedsRun);
    }

    #[test]
    fn run_lifecycle() {
        let running = WireState::NeedsRun.start_run();
        assert!(running.is_running());
        assert_eq!(running.finish_run(), WireState::Idle);
        assert_eq!(running.invalidate().finish_run(), WireState::NeedsRun);
        assert_eq!(running.abort_run(), WireState::NeedsRun);
    }

    #[test]
    fn forced_run_of_a_paused_node_stays_paused() {
        struct Inert;

        impl Runnable for Inert {
            fn run(&self, _token: &Token) -> Result<bool> {
                Ok(false)
            }

            fn fire_tasks(&self) -> Result<()> {
                Ok(())
            }
        }

        let mut node = WireNode::new(Rc::new(Inert), None);
        node.set_state(WireState::PausedNeedsRun);
        node.begin_run();
        assert!(node.state().is_running());
        assert!(node.pauses_children());

        node.complete_run();
        assert_eq!(node.state(), WireState::Paused);
        assert!(node.pauses_children());

        node.set_state(WireState::Idle);
        node.begin_run();
        assert!(!node.pauses_children());
        node.abort_run();
        assert_eq!(node.state(), WireState::NeedsRun);
    }

    #[test]
    fn finish_and_abort_only_affect_running_states() {
        for state in ALL.into_iter().filter(|s| !s.is_running()) {
            assert_eq!(state.finish_run(), state);
            assert_eq!(state.abort_run(), state);
        }
    }
}
