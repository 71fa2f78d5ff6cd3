//! # Fixed-capacity FIFO of the most recent items.
//!
//! [`BoundedCache`] keeps at most `capacity` items; pushing beyond that
//! evicts from the front (oldest first). It is the hub's catch-up history.
//!
//! ## Rules
//! - Capacity is fixed at construction; `0` is coerced to [`MIN_CAPACITY`].
//! - Iteration is oldest → newest and read-only.
//! - Eviction is the only removal.

use std::collections::VecDeque;

/// Capacity used when a cache is built with capacity `0`.
pub const MIN_CAPACITY: usize = 10;

/// Bounded oldest-first history.
#[derive(Debug, Clone)]
pub struct BoundedCache<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedCache<T> {
    /// Creates an empty cache holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 { MIN_CAPACITY } else { capacity };
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `item`, evicting the oldest items while over capacity.
    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    /// Visits every item, oldest first.
    pub fn for_each<F: FnMut(&T)>(&self, visit: F) {
        self.items.iter().for_each(visit);
    }

    /// Iterator over items, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Number of cached items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of items kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
