//! Typestate markers for builders.
//!
//! A builder field starts out as [`Unset`] and becomes [`Set`] once provided;
//! `build` is only implemented for the fully [`Set`] state, so a missing
//! required part is a compile error rather than a runtime one.

use std::marker::PhantomData;

/// A required builder field that has not been provided yet.
pub struct Unset<T> {
    _value: PhantomData<T>,
}

impl<T> Default for Unset<T> {
    fn default() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<T> Unset<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A builder field holding its value.
#[derive(Clone)]
pub struct Set<T> {
    value: T,
}

impl<T> Set<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn as_ref_inner(&self) -> &T {
        &self.value
    }
}
