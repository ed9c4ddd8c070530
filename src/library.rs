//! The pose library built during capture.

use crate::{constants::MAX_POSES, normalizer::NormalizedShape};

/// Captured reference shapes, one per slot, filled in order
#[derive(Debug, Clone, Default)]
pub struct PoseLibrary {
    shapes: Vec<NormalizedShape>,
}

impl PoseLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a shape at the next free slot, returning that slot
    ///
    /// Returns `None` and drops the shape when every slot is taken.
    pub fn push(&mut self, shape: NormalizedShape) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        self.shapes.push(shape);
        Some(self.shapes.len() - 1)
    }

    /// Remove the most recent shape, returning the slot it freed
    pub fn pop(&mut self) -> Option<usize> {
        self.shapes.pop().map(|_| self.shapes.len())
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.shapes.len() >= MAX_POSES
    }

    #[must_use]
    pub fn shapes(&self) -> &[NormalizedShape] {
        &self.shapes
    }

    /// Hand the shapes over, leaving the library empty
    pub fn take_shapes(&mut self) -> Vec<NormalizedShape> {
        std::mem::take(&mut self.shapes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_fills_slots_in_order() {
        let mut library = PoseLibrary::new();
        for expected in 0..MAX_POSES {
            assert_eq!(library.push(NormalizedShape::default()), Some(expected));
        }
        assert!(library.is_full());
        assert_eq!(library.push(NormalizedShape::default()), None);
        assert_eq!(library.len(), MAX_POSES);
    }

    #[test]
    fn test_pop_returns_freed_slot() {
        let mut library = PoseLibrary::new();
        library.push(NormalizedShape::default());
        library.push(NormalizedShape::default());
        assert_eq!(library.pop(), Some(1));
        assert_eq!(library.pop(), Some(0));
        assert_eq!(library.pop(), None);
        assert!(library.is_empty());
    }

    #[test]
    fn test_take_shapes_empties_library() {
        let mut library = PoseLibrary::new();
        library.push(NormalizedShape::default());
        assert_eq!(library.shapes(), &[NormalizedShape::default()]);
        let shapes = library.take_shapes();
        assert_eq!(shapes.len(), 1);
        assert!(library.is_empty());
    }
}
