//! Per-axis movement against collision geometry.

use crate::entity::Entity;
use crate::map_data::MapObject;
use crate::spatial::CollisionGrid;
use macroquad::prelude::*;

/// Pixel displacement for one frame. Running scales the whole vector before
/// it is split into axes.
pub fn frame_displacement(intent: Vec2, speed: f32, dt: f32, running: bool, run_multiplier: f32) -> Vec2 {
    let boost = if running { run_multiplier } else { 1.0 };
    intent * speed * dt * boost
}

#[inline]
fn translated(r: Rect, d: Vec2) -> Rect {
    Rect::new(r.x + d.x, r.y + d.y, r.w, r.h)
}

/// Moves `hitbox` by `delta`, X first then Y, each axis tested on its own.
/// A blocked axis contributes nothing; the other one still applies, which
/// makes diagonal movement slide along walls.
///
/// Long moves are cut into steps no longer than `max_step` so a fast
/// entity cannot skip over a thin wall.
pub fn resolve_axes(hitbox: Rect, delta: Vec2, max_step: f32, blocked: impl Fn(Rect) -> bool) -> Vec2 {
    let longest = delta.x.abs().max(delta.y.abs());
    let steps = if max_step > 0.0 {
        (longest / max_step).ceil().max(1.0) as usize
    } else {
        1
    };
    let step = delta / steps as f32;

    let mut applied = Vec2::ZERO;
    let (mut free_x, mut free_y) = (step.x != 0.0, step.y != 0.0);
    for _ in 0..steps {
        let here = translated(hitbox, applied);
        if free_x {
            if blocked(translated(here, vec2(step.x, 0.0))) {
                free_x = false;
            } else {
                applied.x += step.x;
            }
        }
        let here = translated(hitbox, applied);
        if free_y {
            if blocked(translated(here, vec2(0.0, step.y))) {
                free_y = false;
            } else {
                applied.y += step.y;
            }
        }
        if !free_x && !free_y {
            break;
        }
    }
    applied
}

/// Applies one frame of `entity.intent` against the scene's collision.
/// Facing follows the intent even when the move itself is blocked.
pub fn move_entity(
    entity: &mut Entity,
    speed: f32,
    dt: f32,
    run_multiplier: f32,
    margin: f32,
    grid: &CollisionGrid,
    objects: &[MapObject],
) -> Vec2 {
    if !entity.is_alive() || entity.intent == Vec2::ZERO {
        return Vec2::ZERO;
    }
    entity.anim.face(entity.intent);

    let delta = frame_displacement(entity.intent, speed, dt, entity.running, run_multiplier);
    let max_step = grid.tile_size().min_element() / 2.0;
    let applied = resolve_axes(entity.hitbox(margin), delta, max_step, |r| {
        grid.is_rect_blocked(r, objects)
    });
    entity.pos += applied;
    applied
}
