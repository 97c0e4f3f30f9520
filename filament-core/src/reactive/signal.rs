//! Signal Implementation
//!
//! A signal is the simplest reactive source: a single value that wires can
//! subscribe to.
//!
//! # How Signals Work
//!
//! 1. When a wire reads a signal through its token, the signal's subscriber
//!    set gains the wire.
//!
//! 2. [`Signal::set`] compares the new value with the current one. Equal
//!    values are a no-op.
//!
//! 3. Otherwise the value is replaced and the subscribers are handed to the
//!    runtime as one batch.
//!
//! Reading a signal outside a wire (through [`Signal::get`]) never subscribes
//! anything.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::runtime::Runtime;
use super::{SignalId, WireId};
use crate::error::Result;

struct SignalInner<T> {
    id: SignalId,
    runtime: Runtime,
    value: RefCell<T>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        self.runtime.release_signal(self.id);
    }
}

/// A reactive value. Clones share the same value and subscriber set.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: runtime.register_signal(),
                runtime: runtime.clone(),
                value: RefCell::new(value),
            }),
        }
    }

    pub fn id(&self) -> SignalId {
        self.inner.id
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Get the current value without subscribing.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value and run every subscribed wire.
    ///
    /// Setting a value equal to the current one does nothing. Errors raised by
    /// wire bodies or tasks are returned here; the new value is kept.
    pub fn set(&self, value: T) -> Result<()> {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return Ok(());
            }
            *current = value;
        }

        let subscribers = self.inner.runtime.signal_subscribers(self.inner.id);
        trace!(signal = %self.inner.id, subscribers = subscribers.len(), "signal changed");
        self.inner.runtime.run_wires(&subscribers)
    }

    /// Compute a new value from the current one and [`set`](Self::set) it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<()> {
        let next = self.with(f);
        self.set(next)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.runtime.signal_subscribers(self.inner.id).len()
    }

    pub fn has_subscriber(&self, wire: WireId) -> bool {
        self.inner
            .runtime
            .signal_subscribers(self.inner.id)
            .contains(&wire)
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::reactive::Wire;

    #[test]
    fn test_signal_basic() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 42);
        assert_eq!(signal.get(), 42);

        signal.set(100).unwrap();
        assert_eq!(signal.get(), 100);
    }

    #[test]
    fn test_signal_update() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, vec![1, 2]);

        signal.update(|v| [v.as_slice(), &[3]].concat()).unwrap();
        assert_eq!(signal.with(Vec::len), 3);
    }

    #[test]
    fn test_signal_clone_shares_state() {
        let runtime = Runtime::new();
        let a = Signal::new(&runtime, 1);
        let b = a.clone();

        b.set(2).unwrap();
        assert_eq!(a.get(), 2);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn equal_values_do_not_run_subscribers() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);
        let runs = Rc::new(Cell::new(0));

        let (read, counter) = (signal.clone(), runs.clone());
        let wire = Wire::new(&runtime, move |t, _| {
            counter.set(counter.get() + 1);
            t.get(&read)
        });
        wire.run().unwrap();

        signal.set(1).unwrap();
        assert_eq!(runs.get(), 1);
        signal.set(2).unwrap();
        assert_eq!(runs.get(), 2);
        runtime.teardown();
    }

    #[test]
    fn plain_reads_do_not_subscribe() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);

        let read = signal.clone();
        let wire = Wire::new(&runtime, move |_, _| Ok(read.get()));
        wire.run().unwrap();

        assert_eq!(signal.subscriber_count(), 0);
        signal.set(2).unwrap();
        assert_eq!(wire.value(), Some(1));
        runtime.teardown();
    }
}
