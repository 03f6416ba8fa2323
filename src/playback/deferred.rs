//! Deferred computation
//!
//! Holds the inputs of a computation and runs it the first time the result is
//! read. Later reads return the cached value.

use once_cell::unsync::OnceCell;
use std::fmt;

pub struct Deferred<I, T> {
    input: I,
    compute: fn(&I) -> T,
    value: OnceCell<T>,
}

impl<I, T> Deferred<I, T> {
    pub fn new(input: I, compute: fn(&I) -> T) -> Self {
        Self {
            input,
            compute,
            value: OnceCell::new(),
        }
    }

    /// Compute on first call, return the cached value afterwards.
    pub fn get(&self) -> &T {
        self.value.get_or_init(|| (self.compute)(&self.input))
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn is_computed(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<I: fmt::Debug, T: fmt::Debug> fmt::Debug for Deferred<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("input", &self.input)
            .field("value", &self.value.get())
            .finish()
    }
}
