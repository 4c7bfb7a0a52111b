//! Compute-on-demand memoization for derived matrix data
//!
//! Transforms and cameras derive matrices from a handful of scalar
//! attributes. [`Cached`] holds the last derived value until the owner calls
//! [`Cached::invalidate`], so getters can stay `&self` while setters only
//! have to mark the value stale.

use std::cell::Cell;

/// A lazily recomputed value.
///
/// The slot is empty after [`invalidate`](Cached::invalidate) and is filled
/// by the next [`get_or_compute`](Cached::get_or_compute).
#[derive(Debug, Clone)]
pub struct Cached<T: Copy> {
    slot: Cell<Option<T>>,
}

impl<T: Copy> Cached<T> {
    /// Creates an empty (stale) cache.
    pub fn empty() -> Self {
        Self {
            slot: Cell::new(None),
        }
    }

    /// Returns the cached value, running `compute` first if the cache is stale.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> T {
        match self.slot.get() {
            Some(value) => value,
            None => {
                let value = compute();
                self.slot.set(Some(value));
                value
            }
        }
    }

    /// Marks the cached value stale.
    pub fn invalidate(&mut self) {
        self.slot.set(None);
    }

    pub fn is_valid(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T: Copy> Default for Cached<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_computes_once_until_invalidated() {
        let mut cached = Cached::<u32>::empty();
        let mut calls = 0;

        assert!(!cached.is_valid());
        assert_eq!(cached.get_or_compute(|| { calls += 1; 7 }), 7);
        assert_eq!(cached.get_or_compute(|| { calls += 1; 9 }), 7);
        assert_eq!(calls, 1);
        assert!(cached.is_valid());

        cached.invalidate();
        assert!(!cached.is_valid());
        assert_eq!(cached.get_or_compute(|| { calls += 1; 9 }), 9);
        assert_eq!(calls, 2);
    }
}
