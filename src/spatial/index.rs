//! Tile id encoding, tileset lookup and the chunked render index.

use crate::map_data::{MapData, Tileset};
use macroquad::prelude::*;
use std::collections::HashMap;

/// Side of a render chunk in pixels.
pub const CHUNK_SIZE: i32 = 256;

/// Encoded cell value: tile gid in the low 29 bits, flip flags above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileId(pub u32);

/// Position of a tile layer in `MapData::tile_layers`.
pub type LayerIdx = u16;

/// Chunk grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

/// Horizontal flip flag.
pub const FLIP_H: u32 = 0x8000_0000; // bit 31
/// Vertical flip flag.
pub const FLIP_V: u32 = 0x4000_0000; // bit 30
/// Diagonal (anti-diagonal transpose) flag.
pub const FLIP_D: u32 = 0x2000_0000; // bit 29
/// Bits left after removing the flip flags.
pub const GID_MASK: u32 = 0x1FFF_FFFF; // keep lower 29 bits (bit 28 is free)

impl TileId {
    /// Value as stored.
    #[inline] pub fn raw(self) -> u32 { self.0 }
    /// Gid without flip flags.
    #[inline] pub fn clean(self) -> u32 { self.0 & GID_MASK }
    /// Gid 0 means no tile.
    #[inline] pub fn is_empty(self) -> bool { self.clean() == 0 }
    /// Mirrored left to right.
    #[inline] pub fn flip_h(self) -> bool { (self.0 & FLIP_H) != 0 }
    /// Mirrored top to bottom.
    #[inline] pub fn flip_v(self) -> bool { (self.0 & FLIP_V) != 0 }
    /// Transposed.
    #[inline] pub fn flip_d(self) -> bool { (self.0 & FLIP_D) != 0 }
}

/// Index of the tileset owning `id`: the one with the greatest `first_gid`
/// not exceeding the flag-stripped gid. `tilesets` must be sorted by `first_gid`.
pub fn resolve_tileset(tilesets: &[Tileset], id: TileId) -> Option<usize> {
    let gid = id.clean();
    if gid == 0 {
        return None;
    }
    let owners = tilesets.partition_point(|t| t.first_gid <= gid);
    owners.checked_sub(1)
}

/// Chunk containing world point `p`.
#[inline]
pub fn world_to_chunk(p: Vec2) -> ChunkCoord {
    ChunkCoord {
        x: (p.x.floor() as i32).div_euclid(CHUNK_SIZE),
        y: (p.y.floor() as i32).div_euclid(CHUNK_SIZE),
    }
}

/// Offset of `p` inside its chunk.
#[inline]
pub fn rel(p: Vec2) -> Vec2 {
    vec2(
        (p.x.floor() as i32).rem_euclid(CHUNK_SIZE) as f32,
        (p.y.floor() as i32).rem_euclid(CHUNK_SIZE) as f32,
    )
}

/// One tile placed in a chunk.
#[derive(Debug, Clone)]
pub struct TileRec {
    /// Encoded cell value.
    pub id: TileId,
    /// Top-left relative to the chunk origin.
    pub rel_pos: Vec2,
}

/// Tiles of one chunk, per layer.
#[derive(Default)]
pub struct GlobalChunk {
    /// Tiles keyed by layer.
    pub layers: HashMap<LayerIdx, Vec<TileRec>>,
}

/// Render-side bucketing of every drawn tile into fixed-size world chunks.
#[derive(Default)]
pub struct GlobalIndex {
    /// Non-empty chunks.
    pub buckets: HashMap<ChunkCoord, GlobalChunk>,
    tile_count: usize,
}

impl GlobalIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes the non-empty cells of every visible tile layer, keyed by
    /// the layer's position in `map.tile_layers`.
    pub fn from_map(map: &MapData) -> Self {
        let mut index = GlobalIndex::new();
        let tw = map.tile_w as f32;
        let th = map.tile_h as f32;

        for (lz, layer) in map.tile_layers.iter().enumerate() {
            if !layer.visible {
                continue;
            }
            for (idx, id) in layer.cells.iter().enumerate() {
                if id.is_empty() {
                    continue;
                }
                let col = idx % layer.width;
                let row = idx / layer.width;
                let world = vec2(col as f32 * tw, row as f32 * th) + layer.offset;
                index.add_tile(*id, lz as LayerIdx, world);
            }
        }
        index
    }

    /// Adds a tile whose top-left is at `world`.
    pub fn add_tile(&mut self, id: TileId, layer: LayerIdx, world: Vec2) {
        let cc = world_to_chunk(world);
        self.buckets
            .entry(cc)
            .or_default()
            .layers
            .entry(layer)
            .or_default()
            .push(TileRec {
                id,
                rel_pos: rel(world),
            });
        self.tile_count += 1;
    }

    /// Tiles indexed.
    pub fn tile_count(&self) -> usize {
        self.tile_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_data::Properties;

    fn tileset(first_gid: u32) -> Tileset {
        Tileset {
            first_gid,
            name: format!("ts{first_gid}"),
            tile_count: 10,
            columns: 5,
            tile_w: 16,
            tile_h: 16,
            spacing: 0,
            margin: 0,
            image: String::new(),
            properties: Properties::new(),
        }
    }

    #[test]
    fn strips_exactly_the_three_flip_bits() {
        let id = TileId(FLIP_H | FLIP_V | FLIP_D | 0x1000_0007);
        assert_eq!(id.clean(), 0x1000_0007);
        assert!(id.flip_h() && id.flip_v() && id.flip_d());

        let plain = TileId(42);
        assert_eq!(plain.clean(), 42);
        assert!(!plain.flip_h() && !plain.flip_v() && !plain.flip_d());
    }

    #[test]
    fn resolves_to_greatest_first_gid_not_above_raw() {
        let sets = vec![tileset(1), tileset(11), tileset(50)];
        assert_eq!(resolve_tileset(&sets, TileId(1)), Some(0));
        assert_eq!(resolve_tileset(&sets, TileId(10)), Some(0));
        assert_eq!(resolve_tileset(&sets, TileId(11)), Some(1));
        assert_eq!(resolve_tileset(&sets, TileId(49 | FLIP_H)), Some(1));
        assert_eq!(resolve_tileset(&sets, TileId(50 | FLIP_D)), Some(2));
        assert_eq!(resolve_tileset(&sets, TileId(9000)), Some(2));
    }

    #[test]
    fn gid_below_every_tileset_is_unresolved() {
        let sets = vec![tileset(5)];
        assert_eq!(resolve_tileset(&sets, TileId(4)), None);
        assert_eq!(resolve_tileset(&sets, TileId(FLIP_V)), None);
        assert_eq!(resolve_tileset(&[], TileId(1)), None);
    }

    #[test]
    fn negative_positions_land_in_negative_chunks() {
        let p = vec2(-1.0, 300.0);
        assert_eq!(world_to_chunk(p), ChunkCoord { x: -1, y: 1 });
        assert_eq!(rel(p), vec2(255.0, 44.0));
    }
}
