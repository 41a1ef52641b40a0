//! Tile indexing and collision geometry.

mod collision;
mod index;

pub use collision::CollisionGrid;
pub use index::*;

use macroquad::prelude::*;

/// Strict overlap test: rectangles that only share an edge do not overlap
/// (unlike `Rect::overlaps`).
#[inline]
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.w && b.x < a.x + a.w && a.y < b.y + b.h && b.y < a.y + a.h
}
