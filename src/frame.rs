//! Per-key color buffer

use crate::color::RgbColor;

/// One color per key index, in layout order.
///
/// Access is index-checked; out-of-range reads return `None` and writes
/// return `false` rather than panicking, so watcher threads can never bring
/// down the render loop with a stale index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyColorFrame {
    colors: Vec<RgbColor>,
}

impl KeyColorFrame {
    /// Create a frame of `len` black entries
    pub fn new(len: usize) -> Self {
        Self {
            colors: vec![RgbColor::BLACK; len],
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Resize to `len` entries; contents are replaced with black
    pub fn resize(&mut self, len: usize) {
        self.colors.clear();
        self.colors.resize(len, RgbColor::BLACK);
    }

    pub fn fill(&mut self, color: RgbColor) {
        for entry in &mut self.colors {
            *entry = color;
        }
    }

    pub fn color(&self, index: usize) -> Option<RgbColor> {
        self.colors.get(index).copied()
    }

    pub fn set_color(&mut self, index: usize, color: RgbColor) -> bool {
        match self.colors.get_mut(index) {
            Some(entry) => {
                *entry = color;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[RgbColor] {
        &self.colors
    }
}
