use std::collections::VecDeque;

/// Most-recent-first history with an optional bound. Once full, pushing a
/// new value drops the oldest one.
#[derive(Debug, Clone, PartialEq)]
pub struct History<T> {
    values: VecDeque<T>,
    bound: Option<usize>,
}

impl<T> History<T> {
    pub fn new(bound: Option<usize>) -> Self {
        Self {
            values: VecDeque::new(),
            bound,
        }
    }

    pub fn push(&mut self, value: T) {
        self.values.push_front(value);
        if let Some(bound) = self.bound {
            self.values.truncate(bound);
        }
    }

    /// `depth` 0 is the most recent value.
    pub fn get(&self, depth: usize) -> Option<&T> {
        self.values.get(depth)
    }

    pub fn latest(&self) -> Option<&T> {
        self.values.front()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn bound(&self) -> Option<usize> {
        self.bound
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }
}
