//! Guillotine-cut geometry: fit tests and free-rectangle splitting.

use crate::types::{Item, Unused, Used};

/// Which residual keeps the full remaining dimension after a cut.
///
/// Neither orientation dominates the other for all subsequent items, so the
/// solver tries both as separate candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// The right residual spans the full free-rect height; the top residual
    /// is only as wide as the placed item.
    Vertical,
    /// The top residual spans the full free-rect width; the right residual
    /// is only as tall as the placed item.
    Horizontal,
}

/// Result of cutting one item out of a free rectangle: the placement plus
/// up to two residual free rectangles that, together with the item and the
/// kerf gaps, exactly tile the original rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cut {
    pub used: Used,
    pub right: Option<Unused>,
    pub top: Option<Unused>,
}

impl Cut {
    pub fn leftovers(&self) -> impl Iterator<Item = Unused> {
        [self.right, self.top].into_iter().flatten()
    }
}

/// Effective item dimensions under the requested orientation.
fn oriented(item: &Item, rotate: bool) -> (f64, f64) {
    if rotate {
        (item.height, item.width)
    } else {
        (item.width, item.height)
    }
}

/// Does `item` fit into `free` in the requested orientation? Rotation is
/// refused outright for items that may not rotate.
pub fn fits(item: &Item, free: &Unused, rotate: bool) -> bool {
    if rotate && !item.can_rotate {
        return false;
    }
    let (w, h) = oriented(item, rotate);
    w <= free.width && h <= free.height
}

/// Cuts `item` (index `item_idx` in the params) out of `free`, anchored at
/// the rectangle's lower-left corner. Returns `None` when the item does not
/// fit. Residuals narrower than the kerf are consumed entirely by the cut
/// and not produced.
pub fn cut(
    item_idx: usize,
    item: &Item,
    free: &Unused,
    rotate: bool,
    split: Split,
    cut_width: f64,
) -> Option<Cut> {
    if !fits(item, free, rotate) {
        return None;
    }
    let (item_w, item_h) = oriented(item, rotate);

    let used = Used {
        panel: free.panel,
        item: item_idx,
        x: free.x,
        y: free.y,
        rotate,
    };

    let right_w = free.width - item_w - cut_width;
    let right = (right_w > 0.0).then(|| Unused {
        panel: free.panel,
        width: right_w,
        height: match split {
            Split::Vertical => free.height,
            Split::Horizontal => item_h,
        },
        x: free.x + item_w + cut_width,
        y: free.y,
        initial: false,
    });

    let top_h = free.height - item_h - cut_width;
    let top = (top_h > 0.0).then(|| Unused {
        panel: free.panel,
        width: match split {
            Split::Vertical => item_w,
            Split::Horizontal => free.width,
        },
        height: top_h,
        x: free.x,
        y: free.y + item_h + cut_width,
        initial: false,
    });

    Some(Cut { used, right, top })
}
