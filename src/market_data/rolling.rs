use std::collections::VecDeque;

/// Fixed-capacity ordered buffer.
///
/// `push_back` evicts from the front and `push_front` evicts from the back,
/// so a series can be kept oldest-first or newest-first with the same type.
/// The length never exceeds the capacity.
#[derive(Debug, Clone)]
pub struct RollingSeries<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingSeries<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append at the back; returns how many items were evicted from the front.
    pub fn push_back(&mut self, item: T) -> usize {
        self.items.push_back(item);
        let mut evicted = 0;
        while self.items.len() > self.capacity {
            self.items.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Insert at the front; returns how many items were evicted from the back.
    pub fn push_front(&mut self, item: T) -> usize {
        self.items.push_front(item);
        let mut evicted = 0;
        while self.items.len() > self.capacity {
            self.items.pop_back();
            evicted += 1;
        }
        evicted
    }

    pub fn first(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the contents, keeping only the last `capacity` items.
    pub fn replace_from<I: IntoIterator<Item = T>>(&mut self, items: I) {
        self.items.clear();
        for item in items {
            self.push_back(item);
        }
    }
}

impl<T: Clone> RollingSeries<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
