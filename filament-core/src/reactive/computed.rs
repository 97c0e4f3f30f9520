//! Computed Signals
//!
//! A computed signal is a wire whose result is mirrored into a plain
//! [`Signal`]. Other wires read it through the token like any signal and are
//! only re-run when the derived value actually changes, since the mirror is a
//! wire task and tasks fire on changed results only.

use std::fmt;

use super::context::{Token, WireContext};
use super::runtime::Runtime;
use super::signal::Signal;
use super::wire::Wire;
use super::TaskId;
use crate::error::Result;

/// A derived value exposed as a signal.
pub struct Computed<T> {
    wire: Wire<T>,
    signal: Signal<T>,
    task: TaskId,
}

impl<T> Computed<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create the backing wire, run it once and start mirroring.
    pub fn new<F>(runtime: &Runtime, body: F) -> Result<Self>
    where
        F: Fn(&Token, &WireContext<'_, T>) -> Result<T> + 'static,
    {
        Self::from_wire(Wire::new(runtime, body))
    }

    /// Mirror an existing wire. The wire is run once to seed the signal.
    pub fn from_wire(wire: Wire<T>) -> Result<Self> {
        let initial = wire.run()?;
        let signal = Signal::new(wire.runtime(), initial);

        let mirror = signal.clone();
        let task = wire.add_task(move |value| mirror.set(value.clone()));
        Ok(Self { wire, signal, task })
    }

    /// Current derived value, untracked.
    pub fn get(&self) -> T {
        self.signal.get()
    }

    /// The mirrored signal. Read it through a token to depend on the value.
    pub fn signal(&self) -> &Signal<T> {
        &self.signal
    }

    pub fn wire(&self) -> &Wire<T> {
        &self.wire
    }

    /// Stop mirroring and dispose the backing wire. The signal keeps its last
    /// value.
    pub fn dispose(&self) {
        self.wire.remove_task(self.task);
        self.wire.dispose();
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("wire", &self.wire)
            .field("signal", &self.signal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_computed_basic() {
        let runtime = Runtime::new();
        let count = Signal::new(&runtime, 3);

        let read = count.clone();
        let doubled = Computed::new(&runtime, move |t, _| Ok(t.get(&read)? * 2)).unwrap();
        assert_eq!(doubled.get(), 6);

        count.set(4).unwrap();
        assert_eq!(doubled.get(), 8);
        runtime.teardown();
    }

    #[test]
    fn downstream_runs_only_when_derived_value_changes() {
        let runtime = Runtime::new();
        let n = Signal::new(&runtime, 1);

        let read = n.clone();
        let is_even = Computed::new(&runtime, move |t, _| Ok(t.get(&read)? % 2 == 0)).unwrap();

        let runs = Rc::new(Cell::new(0));
        let (flag, counter) = (is_even.signal().clone(), runs.clone());
        let label = Wire::new(&runtime, move |t, _| {
            counter.set(counter.get() + 1);
            Ok(if t.get(&flag)? { "even" } else { "odd" })
        });
        label.run().unwrap();

        n.set(3).unwrap();
        assert_eq!(runs.get(), 1);

        n.set(6).unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(label.value(), Some("even"));
        runtime.teardown();
    }

    #[test]
    fn dispose_stops_mirroring() {
        let runtime = Runtime::new();
        let n = Signal::new(&runtime, 1);

        let read = n.clone();
        let plus_one = Computed::new(&runtime, move |t, _| Ok(t.get(&read)? + 1)).unwrap();
        plus_one.dispose();

        n.set(10).unwrap();
        assert_eq!(plus_one.get(), 2);
        assert!(plus_one.wire().is_disposed());
        assert_eq!(n.subscriber_count(), 0);
    }
}
