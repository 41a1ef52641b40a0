//! Chunk culling against the camera rectangle.

use crate::spatial::{ChunkCoord, GlobalChunk, GlobalIndex, TileRec, LayerIdx, CHUNK_SIZE};
use macroquad::prelude::*;

const CULL_MARGIN_CHUNKS: i32 = 1;

/// A chunk selected for drawing.
pub struct ChunkView<'g> {
    /// Grid coordinate.
    pub coord: ChunkCoord,
    chunk: &'g GlobalChunk,
}

impl<'g> ChunkView<'g> {
    /// World position of the chunk's top-left corner.
    pub fn origin(&self) -> Vec2 {
        vec2((self.coord.x * CHUNK_SIZE) as f32, (self.coord.y * CHUNK_SIZE) as f32)
    }

    /// Tiles of `layer` in this chunk.
    pub fn tiles(&self, layer: LayerIdx) -> &'g [TileRec] {
        self.chunk.layers.get(&layer).map_or(&[], Vec::as_slice)
    }
}

/// Chunks overlapping `view`, padded by one chunk on every side, sorted by
/// row then column so drawing order is stable between frames.
pub fn query_visible_rect(g: &GlobalIndex, view: Rect) -> Vec<ChunkView<'_>> {
    let cx_min = (view.x.floor() as i32).div_euclid(CHUNK_SIZE) - CULL_MARGIN_CHUNKS;
    let cy_min = (view.y.floor() as i32).div_euclid(CHUNK_SIZE) - CULL_MARGIN_CHUNKS;
    let cx_max = ((view.x + view.w).ceil() as i32).div_euclid(CHUNK_SIZE) + CULL_MARGIN_CHUNKS;
    let cy_max = ((view.y + view.h).ceil() as i32).div_euclid(CHUNK_SIZE) + CULL_MARGIN_CHUNKS;

    let mut chunks: Vec<ChunkView<'_>> = g
        .buckets
        .iter()
        .filter(|(c, _)| c.x >= cx_min && c.x <= cx_max && c.y >= cy_min && c.y <= cy_max)
        .map(|(&coord, chunk)| ChunkView { coord, chunk })
        .collect();
    chunks.sort_by_key(|c| (c.coord.y, c.coord.x));
    chunks
}
