//! Wire Arena and Batch Planning
//!
//! The arena owns one [`WireNode`] per live wire, indexed by id. Parent/child
//! ownership is stored as ids in both directions (`upper` on the child,
//! `lower` on the parent), never as pointers, so disposal order and cycle
//! checks are plain walks over the map.
//!
//! # Batch planning
//!
//! A write hands the scheduler a candidate run-set. Planning prunes it in one
//! pass, in the set's insertion order:
//!
//! 1. Paused wires are removed and marked as needing a run, so they can catch
//!    up when resumed.
//! 2. Wires that are already running are removed and marked stale; the run
//!    in progress re-runs them once it returns.
//! 3. A wire whose ancestor is still in the set is removed, because running the
//!    ancestor disposes and rebuilds its children anyway.
//!
//! What remains is executed in insertion order. There is no topological
//! sorting.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;

use super::node::WireNode;
use crate::error::{ReactiveError, Result};
use crate::reactive::WireId;

/// All live wires of one runtime.
#[derive(Default)]
pub(crate) struct WireGraph {
    nodes: HashMap<WireId, WireNode>,
}

impl WireGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a node. A child of a paused wire starts out paused, including a
    /// child created while its paused parent is being run by hand.
    pub(crate) fn insert(&mut self, id: WireId, mut node: WireNode) {
        if let Some(parent) = node.upper().and_then(|upper| self.nodes.get_mut(&upper)) {
            parent.adopt(id);
            if parent.pauses_children() {
                node.set_state(node.state().pause());
            }
        }
        self.nodes.insert(id, node);
    }

    /// Remove a node and unlink it from its parent.
    pub(crate) fn remove(&mut self, id: WireId) -> Option<WireNode> {
        let node = self.nodes.remove(&id)?;
        if let Some(parent) = node.upper() {
            if let Some(parent) = self.nodes.get_mut(&parent) {
                parent.disown(id);
            }
        }
        Some(node)
    }

    pub(crate) fn get(&self, id: WireId) -> Option<&WireNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: WireId) -> Option<&mut WireNode> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn contains(&self, id: WireId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Take every node out of the arena.
    pub(crate) fn drain(&mut self) -> Vec<WireNode> {
        self.nodes.drain().map(|(_, node)| node).collect()
    }

    /// Whether any ancestor of `id` is a member of `set`.
    ///
    /// Fails with [`ReactiveError::OwnershipCycle`] if the walk revisits a
    /// wire.
    pub(crate) fn has_ancestor_in(&self, id: WireId, set: &IndexSet<WireId>) -> Result<bool> {
        let mut seen = HashSet::new();
        seen.insert(id);
        let mut current = self.nodes.get(&id).and_then(WireNode::upper);
        while let Some(ancestor) = current {
            if !seen.insert(ancestor) {
                return Err(ReactiveError::OwnershipCycle(id));
            }
            if set.contains(&ancestor) {
                return Ok(true);
            }
            current = self.nodes.get(&ancestor).and_then(WireNode::upper);
        }
        Ok(false)
    }

    /// Prune a candidate run-set into the wires that should execute now.
    pub(crate) fn plan_batch(&mut self, candidates: &IndexSet<WireId>) -> Result<IndexSet<WireId>> {
        let mut to_run = candidates.clone();

        for &id in candidates {
            let Some(node) = self.nodes.get_mut(&id) else {
                to_run.shift_remove(&id);
                continue;
            };

            let state = node.state();
            if state.is_paused() || state.is_running() {
                node.invalidate();
                to_run.shift_remove(&id);
                continue;
            }

            if self.has_ancestor_in(id, &to_run)? {
                to_run.shift_remove(&id);
            }
        }

        Ok(to_run)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
