//! # Column Cursors
//!
//! Each column of the generated layout keeps its own vertical cursor. A
//! section asks its column how many of its boxes fit before the bottom
//! margin; whatever does not fit is dropped, there is no second page.

/// Tracks where we are in one column during generation.
#[derive(Debug, Clone)]
pub(crate) struct ColumnCursor {
    pub x: f64,
    pub width: f64,
    pub y: f64,
    bottom: f64,
}

impl ColumnCursor {
    pub fn new(x: f64, width: f64, top: f64, bottom: f64) -> Self {
        Self {
            x,
            width,
            y: top,
            bottom,
        }
    }

    pub fn remaining_height(&self) -> f64 {
        (self.bottom - self.y).max(0.0)
    }

    /// Whether a box of height `h` placed at the cursor stays inside the
    /// bottom margin.
    pub fn fits(&self, h: f64) -> bool {
        self.y + h <= self.bottom + 1e-9
    }

    pub fn advance(&mut self, h: f64) {
        self.y += h;
    }
}

/// How many of `heights` fit in `remaining`, each followed by `gap`.
///
/// The gap after the last placed box does not need to fit.
pub(crate) fn fit_count(remaining: f64, heights: &[f64], gap: f64) -> usize {
    let mut running = 0.0;
    let mut count = 0;
    for &h in heights {
        if running + h > remaining + 1e-9 {
            break;
        }
        running += h + gap;
        count += 1;
    }
    count
}
