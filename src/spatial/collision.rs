//! Collision geometry derived from a map.

use super::rects_overlap;
use crate::map_data::{MapData, MapObject};
use macroquad::prelude::*;
use std::collections::HashMap;

struct SolidObject {
    /// Index into the scene's live object list.
    object: usize,
    rect: Rect,
}

/// Per-cell solidity of a map plus the solid object rectangles bucketed by
/// the cells they cover.
///
/// Object entries only remember *where* an object is. Whether it currently
/// blocks is read from the caller's live object list on every query, so a
/// door that is toggled invisible stops blocking immediately.
pub struct CollisionGrid {
    cols: usize,
    rows: usize,
    tile_w: f32,
    tile_h: f32,
    solid: Vec<bool>,
    objects: Vec<SolidObject>,
    buckets: HashMap<(i32, i32), Vec<usize>>,
}

/// Inclusive cell range covered by `[min, min + len)` along one axis.
#[inline]
fn cell_span(min: f32, len: f32, size: f32) -> (i32, i32) {
    let start = (min / size).floor() as i32;
    let end = if len > 0.0 {
        ((min + len) / size).ceil() as i32 - 1
    } else {
        start
    };
    (start, end.max(start))
}

impl CollisionGrid {
    /// Scans collidable tile layers and the `solid` entries of `objects`.
    ///
    /// `objects` is the list later passed to the query methods; entries are
    /// referenced by index.
    pub fn build(map: &MapData, objects: &[MapObject]) -> Self {
        let cols = map.width as usize;
        let rows = map.height as usize;
        let mut solid = vec![false; cols * rows];

        for layer in map.tile_layers.iter().filter(|l| l.is_collidable()) {
            for row in 0..layer.height.min(rows) {
                for col in 0..layer.width.min(cols) {
                    if !layer.tile(col, row).is_empty() {
                        solid[row * cols + col] = true;
                    }
                }
            }
        }

        let mut grid = CollisionGrid {
            cols,
            rows,
            tile_w: map.tile_w.max(1) as f32,
            tile_h: map.tile_h.max(1) as f32,
            solid,
            objects: Vec::new(),
            buckets: HashMap::new(),
        };

        for (index, obj) in objects.iter().enumerate() {
            if obj.is_solid() {
                grid.add_object(index, obj.rect());
            }
        }

        log::debug!(
            "collision grid {}x{}: {} solid cells, {} solid objects",
            cols,
            rows,
            grid.solid.iter().filter(|s| **s).count(),
            grid.objects.len()
        );
        grid
    }

    fn add_object(&mut self, object: usize, rect: Rect) {
        let slot = self.objects.len();
        self.objects.push(SolidObject { object, rect });
        let (c0, c1) = cell_span(rect.x, rect.w, self.tile_w);
        let (r0, r1) = cell_span(rect.y, rect.h, self.tile_h);
        for r in r0..=r1 {
            for c in c0..=c1 {
                self.buckets.entry((c, r)).or_default().push(slot);
            }
        }
    }

    /// Columns and rows.
    pub fn size_in_cells(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Cell size in pixels.
    pub fn tile_size(&self) -> Vec2 {
        vec2(self.tile_w, self.tile_h)
    }

    /// Solidity of the tile cell itself. Cells outside the map are open.
    pub fn is_cell_solid(&self, col: i32, row: i32) -> bool {
        if col < 0 || row < 0 || col as usize >= self.cols || row as usize >= self.rows {
            return false;
        }
        self.solid[row as usize * self.cols + col as usize]
    }

    /// Whether the world point is inside a solid cell or a live solid object.
    pub fn is_solid_at(&self, x: f32, y: f32, objects: &[MapObject]) -> bool {
        let col = (x / self.tile_w).floor() as i32;
        let row = (y / self.tile_h).floor() as i32;
        if self.is_cell_solid(col, row) {
            return true;
        }
        self.blocking_object_in_cell(col, row, objects, |r| {
            x >= r.x && x < r.x + r.w && y >= r.y && y < r.y + r.h
        })
    }

    /// True when `rect` overlaps a solid tile cell or a currently visible
    /// solid object.
    pub fn is_rect_blocked(&self, rect: Rect, objects: &[MapObject]) -> bool {
        let (c0, c1) = cell_span(rect.x, rect.w, self.tile_w);
        let (r0, r1) = cell_span(rect.y, rect.h, self.tile_h);

        for r in r0..=r1 {
            for c in c0..=c1 {
                if self.is_cell_solid(c, r) {
                    return true;
                }
            }
        }
        for r in r0..=r1 {
            for c in c0..=c1 {
                if self.blocking_object_in_cell(c, r, objects, |o| rects_overlap(&rect, o)) {
                    return true;
                }
            }
        }
        false
    }

    fn blocking_object_in_cell(
        &self,
        col: i32,
        row: i32,
        objects: &[MapObject],
        hit: impl Fn(&Rect) -> bool,
    ) -> bool {
        let Some(slots) = self.buckets.get(&(col, row)) else {
            return false;
        };
        slots.iter().any(|&slot| {
            let entry = &self.objects[slot];
            let live = objects.get(entry.object).map_or(false, |o| o.visible);
            live && hit(&entry.rect)
        })
    }

    /// World rectangles of every solid cell, for the debug overlay.
    pub fn solid_cell_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.solid.iter().enumerate().filter(|(_, s)| **s).map(move |(i, _)| {
            let col = (i % self.cols) as f32;
            let row = (i / self.cols) as f32;
            Rect::new(col * self.tile_w, row * self.tile_h, self.tile_w, self.tile_h)
        })
    }

    /// Rectangles of the solid objects that currently block.
    pub fn live_object_rects<'a>(&'a self, objects: &'a [MapObject]) -> impl Iterator<Item = Rect> + 'a {
        self.objects
            .iter()
            .filter(move |e| objects.get(e.object).map_or(false, |o| o.visible))
            .map(|e| e.rect)
    }
}
