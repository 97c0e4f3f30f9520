//! Per-store read bookkeeping.
//!
//! For every wire subscribed to a store this records the encoded paths the
//! wire read during its latest run. A change is matched against these paths
//! to decide which wires re-run:
//!
//! - Assignments and deletions match a wire when the changed path and one of
//!   its read paths are on the same branch (either is a prefix of the other).
//! - Array operations match a wire that read the array itself or one of its
//!   ancestors. Reads of individual elements are relocated instead: they keep
//!   following their element, and only re-run if their element was removed or
//!   they were reading past the end of an array that grew.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::change::{IndexShift, Relocation};
use super::path::{EncodedPath, Path};
use crate::error::Result;
use crate::reactive::WireId;

#[derive(Debug, Default)]
pub(crate) struct StoreReaders {
    by_wire: IndexMap<WireId, IndexSet<EncodedPath>>,
}

impl StoreReaders {
    pub(crate) fn track(&mut self, wire: WireId, path: &Path) {
        self.by_wire.entry(wire).or_default().insert(path.encode());
    }

    pub(crate) fn untrack(&mut self, wire: WireId) {
        self.by_wire.shift_remove(&wire);
    }

    pub(crate) fn contains(&self, wire: WireId) -> bool {
        self.by_wire.contains_key(&wire)
    }

    pub(crate) fn len(&self) -> usize {
        self.by_wire.len()
    }

    pub(crate) fn paths_of(&self, wire: WireId) -> Result<Vec<Path>> {
        self.by_wire
            .get(&wire)
            .map(|paths| paths.iter().map(EncodedPath::decode).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    pub(crate) fn clear(&mut self) {
        self.by_wire.clear();
    }

    /// Relocate recorded paths after an array operation and collect the wires
    /// the change invalidates, in subscription order.
    pub(crate) fn apply_change(
        &mut self,
        changed: &Path,
        structural: bool,
        shift: Option<&IndexShift>,
    ) -> Result<IndexSet<WireId>> {
        let mut to_run = IndexSet::new();

        for (wire, encoded) in self.by_wire.iter_mut() {
            let mut matched = false;
            let mut relocated = IndexSet::with_capacity(encoded.len());

            for key in encoded.iter() {
                let path = key.decode()?;

                matched |= if structural {
                    path.is_prefix_of(changed)
                } else {
                    changed.is_prefix_of(&path) || path.is_prefix_of(changed)
                };

                match shift.map(|shift| shift.relocate(changed, &path)) {
                    None | Some(Relocation::Unchanged) => {
                        relocated.insert(key.clone());
                    }
                    Some(Relocation::Moved(moved)) => {
                        relocated.insert(moved.encode());
                    }
                    Some(Relocation::Removed) => {
                        debug!(wire = %wire, path = %path, "read path removed by array change");
                        matched = true;
                    }
                    Some(Relocation::Filled) => {
                        relocated.insert(key.clone());
                        matched = true;
                    }
                }
            }

            *encoded = relocated;
            if matched {
                to_run.insert(*wire);
            }
        }

        Ok(to_run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Path {
        Path::from_segments(segments.iter().copied())
    }

    fn wire(raw: u64) -> WireId {
        WireId::from_raw(raw)
    }

    fn set(ids: &[WireId]) -> IndexSet<WireId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn tracking_deduplicates_paths() {
        let mut readers = StoreReaders::default();
        readers.track(wire(1), &path(&["a"]));
        readers.track(wire(1), &path(&["a"]));
        readers.track(wire(1), &Path::root());

        assert_eq!(readers.len(), 1);
        assert_eq!(
            readers.paths_of(wire(1)).unwrap(),
            vec![path(&["a"]), Path::root()]
        );

        readers.untrack(wire(1));
        assert!(!readers.contains(wire(1)));
        assert!(readers.paths_of(wire(1)).unwrap().is_empty());
    }

    #[test]
    fn assignment_matches_both_directions() {
        let mut readers = StoreReaders::default();
        readers.track(wire(1), &path(&["a", "b"]));
        readers.track(wire(2), &path(&["a", "b", "c"]));
        readers.track(wire(3), &path(&["a", "x"]));
        readers.track(wire(4), &Path::root());

        let matched = readers
            .apply_change(&path(&["a", "b"]), false, None)
            .unwrap();
        assert_eq!(matched, set(&[wire(1), wire(2), wire(4)]));
    }

    #[test]
    fn structural_change_skips_element_readers() {
        let mut readers = StoreReaders::default();
        readers.track(wire(1), &path(&["friends", "0", "id"]));
        readers.track(wire(2), &path(&["friends"]));
        readers.track(wire(3), &Path::root());

        let shift = IndexShift {
            start: 1,
            removed: 0,
            inserted: 1,
            len: 1,
        };
        let matched = readers
            .apply_change(&path(&["friends"]), true, Some(&shift))
            .unwrap();
        assert_eq!(matched, set(&[wire(2), wire(3)]));
        assert_eq!(
            readers.paths_of(wire(1)).unwrap(),
            vec![path(&["friends", "0", "id"])]
        );
    }

    #[test]
    fn splice_relocates_and_invalidates_removed_reads() {
        let mut readers = StoreReaders::default();
        readers.track(wire(1), &path(&["list", "3"]));
        readers.track(wire(2), &path(&["list", "2"]));

        let shift = IndexShift {
            start: 1,
            removed: 2,
            inserted: 0,
            len: 5,
        };
        let matched = readers
            .apply_change(&path(&["list"]), true, Some(&shift))
            .unwrap();

        assert_eq!(matched, set(&[wire(2)]));
        assert_eq!(readers.paths_of(wire(1)).unwrap(), vec![path(&["list", "1"])]);
        assert!(readers.paths_of(wire(2)).unwrap().is_empty());

        let matched = readers
            .apply_change(&path(&["list", "1"]), false, None)
            .unwrap();
        assert_eq!(matched, set(&[wire(1)]));
    }
}
