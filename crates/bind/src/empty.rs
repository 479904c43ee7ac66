//! Classification of handler results that must not produce a response body.
//!
//! The kind of check is chosen once per response type when the handler is compiled;
//! evaluating it per request is a single call.

use crate::response::Reply;
use std::fmt;

/// How values of a response type are recognised as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emptiness {
    /// Marker types, every value is empty.
    Marker,
    /// Nullable values, empty when absent.
    Nil,
    /// Strings, empty when they have no characters.
    Zero,
    /// Everything else, including numbers, structs, sequences and maps.
    Never,
}

/// The per-route predicate deciding whether a result suppresses the body.
pub struct EmptyCheck<O> {
    check: fn(&O) -> bool,
}

impl<O: Reply> EmptyCheck<O> {
    pub fn new() -> Self {
        let check: fn(&O) -> bool = match O::EMPTINESS {
            Emptiness::Marker => |_| true,
            Emptiness::Nil | Emptiness::Zero => O::is_empty_value,
            Emptiness::Never => |_| false,
        };
        Self { check }
    }

    #[inline]
    pub fn is_empty(&self, value: &O) -> bool {
        (self.check)(value)
    }
}

impl<O: Reply> Default for EmptyCheck<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> fmt::Debug for EmptyCheck<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmptyCheck").field("type", &std::any::type_name::<O>()).finish()
    }
}
