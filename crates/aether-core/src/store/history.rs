// ── Bounded history ──
//
// Insertion-ordered ring with a fixed capacity. Oldest entries are evicted
// first; the length never exceeds the capacity.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `item`, returning the evicted oldest entry if at capacity.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Oldest to newest.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn never_exceeds_capacity() {
        let mut history = BoundedHistory::new(3);
        for i in 0..10 {
            history.push(i);
            assert!(history.to_vec().len() <= 3);
        }
        assert_eq!(history.to_vec(), vec![7, 8, 9]);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut history = BoundedHistory::new(2);
        assert_eq!(history.push("a"), None);
        assert_eq!(history.push("b"), None);
        assert_eq!(history.push("c"), Some("a"));
        assert_eq!(history.to_vec(), vec!["b", "c"]);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut history = BoundedHistory::new(0);
        history.push(1);
        history.push(2);
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.to_vec(), vec![2]);
    }
}
