//! Reviewer session cursor.
//!
//! The cursor is caller-owned navigation state over a list the selector
//! produced. It never touches the dataset, and it is clamped whenever the
//! list it indexes shrinks.

/// Bounded, non-wrapping position in a pending list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCursor {
    index: usize,
}

impl SessionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Item under the cursor, if the list is non-empty.
    pub fn current<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        items.get(self.index)
    }

    /// Move forward, stopping at the last item.
    pub fn forward(&mut self, len: usize) -> bool {
        if self.index + 1 < len {
            self.index += 1;
            return true;
        }
        false
    }

    /// Move backward, stopping at the first item.
    pub fn back(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            return true;
        }
        false
    }

    /// Pull the cursor back inside a list of `len` items.
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.index = 0;
        } else if self.index >= len {
            self.index = len - 1;
        }
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}
