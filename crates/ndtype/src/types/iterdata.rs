// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Iteration state for generic nested iteration.
//!
//! Level 0 is the outermost dimension, the last level the innermost.

/// One dimension of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterLevel {
    pub size: usize,
    pub stride: usize,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterData {
    levels: Vec<IterLevel>,
}

impl IterData {
    pub fn new(levels: Vec<IterLevel>) -> Self {
        Self { levels }
    }

    pub fn ndim(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[IterLevel] {
        &self.levels
    }

    /// Byte offset of the current position.
    pub fn offset(&self) -> usize {
        self.levels.iter().map(|l| l.index * l.stride).sum()
    }

    /// Advances `level` by one and resets every level nested inside it to index 0.
    ///
    /// Returns false once `level` has stepped past its last index.
    pub fn increment(&mut self, level: usize) -> bool {
        let Some(current) = self.levels.get_mut(level) else {
            return false;
        };
        current.index += 1;
        let in_range = current.index < current.size;
        for inner in self.levels.iter_mut().skip(level + 1) {
            inner.index = 0;
        }
        in_range
    }

    /// Resets `level` and every level inside it to index 0.
    pub fn reset(&mut self, level: usize) {
        for l in self.levels.iter_mut().skip(level) {
            l.index = 0;
        }
    }

    /// Odometer step over all levels. Returns false after the last position.
    pub fn advance(&mut self) -> bool {
        for level in (0..self.levels.len()).rev() {
            if self.increment(level) {
                return true;
            }
        }
        false
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> IterData {
        IterData::new(vec![
            IterLevel {
                size: 2,
                stride: 12,
                index: 0,
            },
            IterLevel {
                size: 3,
                stride: 4,
                index: 0,
            },
        ])
    }

    #[test]
    fn test_increment_resets_inner_levels() {
        let mut it = grid();
        assert!(it.increment(1));
        assert!(it.increment(1));
        assert_eq!(it.offset(), 8);
        assert!(it.increment(0));
        assert_eq!(it.levels()[1].index, 0);
        assert_eq!(it.offset(), 12);
    }

    #[test]
    fn test_advance_visits_every_position() {
        let mut it = grid();
        let mut offsets = vec![it.offset()];
        while it.advance() {
            offsets.push(it.offset());
        }
        assert_eq!(offsets, vec![0, 4, 8, 12, 16, 20]);
    }

    #[test]
    fn test_reset() {
        let mut it = grid();
        it.increment(0);
        it.increment(1);
        it.reset(0);
        assert_eq!(it.offset(), 0);
    }
}
