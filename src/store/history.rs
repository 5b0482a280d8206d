//! Bounded stacks for undo, redo, bookmarks and the change log.

use std::collections::VecDeque;

/// Default number of entries kept per stack.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A stack that evicts its oldest entry once it holds `limit` items.
#[derive(Debug, Clone)]
pub struct BoundedStack<T> {
    limit: usize,
    items: VecDeque<T>,
}

impl<T> Default for BoundedStack<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl<T> BoundedStack<T> {
    pub fn new(limit: usize) -> Self {
        BoundedStack {
            limit: limit.max(1),
            items: VecDeque::new(),
        }
    }

    /// Push onto the top, returning the evicted oldest entry if the stack
    /// was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        self.items.push_back(item);
        if self.items.len() > self.limit {
            self.items.pop_front()
        } else {
            None
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the limit, evicting from the bottom if needed.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        while self.items.len() > self.limit {
            self.items.pop_front();
        }
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest() {
        let mut s = BoundedStack::new(3);
        for i in 0..3 {
            assert_eq!(s.push(i), None);
        }
        assert_eq!(s.push(3), Some(0));
        assert_eq!(s.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn pops_newest() {
        let mut s = BoundedStack::default();
        s.push("a");
        s.push("b");
        assert_eq!(s.pop(), Some("b"));
        assert_eq!(s.len(), 1);
        assert_eq!(s.limit(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn shrinking_limit_trims_bottom() {
        let mut s = BoundedStack::new(5);
        for i in 0..5 {
            s.push(i);
        }
        s.set_limit(2);
        assert_eq!(s.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
    }
}
