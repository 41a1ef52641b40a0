//! Rendering on top of macroquad.

pub mod cull;
pub mod draw;

pub use cull::{query_visible_rect, ChunkView};
pub use draw::{
    draw_collision_overlay, draw_entity, draw_projectile, tile_orientation, MapRenderer, TileOrientation,
};
