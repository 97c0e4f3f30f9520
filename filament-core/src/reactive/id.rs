//! Identifier types for the reactive system.
//!
//! Every signal, wire, store and registered task gets an identifier issued by
//! the [`Runtime`](super::Runtime) that owns it. Identifiers come from one
//! monotonic counter per runtime.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub(crate) fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw ID value.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Signal`](super::Signal).
    SignalId,
    "signal"
);

define_id!(
    /// Identifier of a [`Wire`](super::Wire).
    ///
    /// Wires are the only subscribers in the system, so this doubles as the
    /// subscriber id stored in signal and store subscription sets.
    WireId,
    "wire"
);

define_id!(
    /// Identifier of a [`Store`](crate::store::Store).
    StoreId,
    "store"
);

define_id!(
    /// Identifier of a task registered on a wire or a store.
    TaskId,
    "task"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_kind() {
        assert_eq!(WireId::from_raw(3).to_string(), "wire#3");
        assert_eq!(StoreId::from_raw(0).to_string(), "store#0");
    }

    #[test]
    fn ids_compare_by_raw_value() {
        let a = SignalId::from_raw(1);
        let b = SignalId::from_raw(2);
        assert!(a < b);
        assert_eq!(a, SignalId::from_raw(a.raw()));
    }
}
