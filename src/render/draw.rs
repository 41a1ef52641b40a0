//! Macroquad drawing of maps, entities and debug overlays.

use super::cull::query_visible_rect;
use crate::entity::Entity;
use crate::map_data::{MapData, MapObject};
use crate::projectile::Projectile;
use crate::scene::{Scene, ENEMY_KIND, PLAYER_SPAWN_KIND};
use crate::spatial::{LayerIdx, TileId};
use anyhow::Context;
use macroquad::prelude::*;
use std::f32::consts::FRAC_PI_2;
use std::path::Path;

/// Draw transform encoded by a cell's flip bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileOrientation {
    /// Radians, clockwise.
    pub rotation: f32,
    /// Mirror horizontally before rotating.
    pub flip_x: bool,
    /// Mirror vertically before rotating.
    pub flip_y: bool,
}

/// The diagonal bit is a transpose, drawn as a quarter turn clockwise of
/// the vertically flipped tile.
pub fn tile_orientation(id: TileId) -> TileOrientation {
    if id.flip_d() {
        TileOrientation {
            rotation: FRAC_PI_2,
            flip_x: id.flip_v(),
            flip_y: !id.flip_h(),
        }
    } else {
        TileOrientation {
            rotation: 0.0,
            flip_x: id.flip_h(),
            flip_y: id.flip_v(),
        }
    }
}

/// Tileset textures of one map, in the same order as `MapData::tilesets`.
pub struct MapRenderer {
    textures: Vec<Texture2D>,
}

impl MapRenderer {
    /// Loads every tileset image, resolved against `base_dir`.
    pub async fn load(map: &MapData, base_dir: &Path) -> anyhow::Result<Self> {
        let mut textures = Vec::with_capacity(map.tilesets.len());
        for ts in &map.tilesets {
            let img_path = base_dir.join(&ts.image);
            let path_str = img_path
                .to_str()
                .with_context(|| format!("Non UTF-8 texture path {}", img_path.display()))?;
            let tex = load_texture(path_str)
                .await
                .with_context(|| format!("Loading texture {}", ts.image))?;
            tex.set_filter(FilterMode::Nearest);
            textures.push(tex);
        }
        Ok(Self { textures })
    }

    fn draw_tile(&self, map: &MapData, id: TileId, x: f32, y: f32, size: Option<Vec2>, tint: Color) {
        let Some((idx, ts, local)) = map.tileset_for(id) else {
            return;
        };
        let Some(tex) = self.textures.get(idx) else {
            return;
        };
        let o = tile_orientation(id);
        draw_texture_ex(
            tex,
            x,
            y,
            tint,
            DrawTextureParams {
                source: Some(ts.source_rect(local)),
                dest_size: size,
                rotation: o.rotation,
                flip_x: o.flip_x,
                flip_y: o.flip_y,
                ..Default::default()
            },
        );
    }

    /// Tile layers in order, each one across every visible chunk before the
    /// next layer starts.
    pub fn draw_tiles(&self, scene: &Scene, view: Rect) {
        let map = scene.map();
        let chunks = query_visible_rect(scene.index(), view);
        for (lz, layer) in map.tile_layers.iter().enumerate() {
            if !layer.visible {
                continue;
            }
            let tint = Color::new(1.0, 1.0, 1.0, layer.opacity);
            for chunk in &chunks {
                let origin = chunk.origin();
                for rec in chunk.tiles(lz as LayerIdx) {
                    let p = origin + rec.rel_pos;
                    self.draw_tile(map, rec.id, p.x, p.y, None, tint);
                }
            }
        }
    }

    /// Tile objects that are currently visible. Markers are not drawn.
    pub fn draw_objects(&self, scene: &Scene, view: Rect) {
        let map = scene.map();
        for obj in scene.objects().iter().filter(|o| is_drawn(o)) {
            let Some(gid) = obj.gid else {
                continue;
            };
            let r = obj.rect();
            if !r.overlaps(&view) {
                continue;
            }
            self.draw_tile(map, gid, r.x, r.y, Some(r.size()), WHITE);
        }
    }
}

fn is_drawn(obj: &MapObject) -> bool {
    obj.visible && obj.kind != PLAYER_SPAWN_KIND && obj.kind != ENEMY_KIND
}

/// Current animation frame from `sheet`, or a plain box without one.
pub fn draw_entity(entity: &Entity, sheet: Option<&Texture2D>, fallback: Color) {
    let r = entity.visual_rect();
    match (sheet, entity.anim.current_frame()) {
        (Some(tex), Some(frame)) => draw_texture_ex(
            tex,
            r.x,
            r.y,
            WHITE,
            DrawTextureParams {
                source: Some(frame.region),
                dest_size: Some(r.size()),
                ..Default::default()
            },
        ),
        _ => draw_rectangle(r.x, r.y, r.w, r.h, fallback),
    }
    draw_health_bar(entity, r);
}

fn draw_health_bar(entity: &Entity, r: Rect) {
    if entity.anim.is_dead() || entity.health.current() == entity.health.max() {
        return;
    }
    let frac = entity.health.current() as f32 / entity.health.max() as f32;
    draw_rectangle(r.x, r.y - 5.0, r.w, 3.0, DARKGRAY);
    draw_rectangle(r.x, r.y - 5.0, r.w * frac, 3.0, RED);
}

/// Filled hit square.
pub fn draw_projectile(p: &Projectile) {
    let r = p.rect();
    draw_rectangle(r.x, r.y, r.w, r.h, YELLOW);
}

/// Outlines solid cells, live solid objects and the player's hitbox.
pub fn draw_collision_overlay(scene: &Scene, player: &Entity, margin: f32) {
    for r in scene.grid().solid_cell_rects() {
        draw_rectangle_lines(r.x, r.y, r.w, r.h, 1.0, RED);
    }
    for r in scene.grid().live_object_rects(scene.objects()) {
        draw_rectangle_lines(r.x, r.y, r.w, r.h, 1.0, ORANGE);
    }
    let hb = player.hitbox(margin);
    draw_rectangle_lines(hb.x, hb.y, hb.w, hb.h, 1.0, GREEN);
}
