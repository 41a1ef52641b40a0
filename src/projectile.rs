//! Straight-line projectiles with a fixed range.

use crate::entity::{DamageOutcome, Entity, EntityId};
use crate::map_data::MapObject;
use crate::spatial::{rects_overlap, CollisionGrid};
use macroquad::prelude::*;

/// Flight parameters shared by every projectile of one kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpec {
    /// Pixels per second.
    pub speed: f32,
    /// Pixels travelled before it despawns on its own.
    pub range: f32,
    /// Side of the square hit rectangle.
    pub size: f32,
    /// Damage on hit.
    pub damage: i32,
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    /// Shooter; never hit by its own projectile.
    pub owner: EntityId,
    /// Launch point.
    pub origin: Vec2,
    /// Unit vector.
    pub dir: Vec2,
    /// Center.
    pub pos: Vec2,
    /// Distance flown so far.
    pub traveled: f32,
    /// Flight parameters.
    pub spec: ProjectileSpec,
}

impl Projectile {
    /// Hit square around the center.
    pub fn rect(&self) -> Rect {
        let half = self.spec.size / 2.0;
        Rect::new(self.pos.x - half, self.pos.y - half, self.spec.size, self.spec.size)
    }
}

/// Why a projectile left the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Despawn {
    /// Flew its full range.
    Expired,
    /// Struck solid geometry.
    Wall,
    /// Struck an entity.
    Hit {
        /// Entity struck.
        target: EntityId,
        /// Effect of the damage.
        outcome: DamageOutcome,
    },
}

/// A projectile that despawned this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileEvent {
    /// Shooter.
    pub owner: EntityId,
    /// Why it despawned.
    pub reason: Despawn,
}

/// Every projectile in the active scene.
#[derive(Debug, Default)]
pub struct ProjectileManager {
    active: Vec<Projectile>,
}

impl ProjectileManager {
    /// No projectiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Launches from `origin` along `dir`. A zero direction is ignored.
    pub fn spawn(&mut self, owner: EntityId, origin: Vec2, dir: Vec2, spec: ProjectileSpec) -> bool {
        let Some(dir) = dir.try_normalize() else {
            return false;
        };
        self.active.push(Projectile {
            owner,
            origin,
            dir,
            pos: origin,
            traveled: 0.0,
            spec,
        });
        true
    }

    /// Projectiles still flying.
    pub fn active(&self) -> &[Projectile] {
        &self.active
    }

    /// Number in flight.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Nothing in flight.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Dropped on scene transitions.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Advances every projectile by `dt` seconds. Flight is cut into steps no
    /// longer than half a tile and never past the range limit, so a wall or
    /// target met on the way wins over expiry.
    pub fn update(
        &mut self,
        dt: f32,
        grid: &CollisionGrid,
        objects: &[MapObject],
        targets: &mut [Entity],
        margin: f32,
    ) -> Vec<ProjectileEvent> {
        let max_step = (grid.tile_size().min_element() / 2.0).max(1.0);
        let mut events = Vec::new();
        self.active.retain_mut(|p| {
            let reason = fly(p, dt, max_step, grid, objects, targets, margin);
            if let Some(reason) = reason {
                log::debug!("projectile from {:?} despawned: {:?}", p.owner, reason);
                events.push(ProjectileEvent {
                    owner: p.owner,
                    reason,
                });
            }
            reason.is_none()
        });
        events
    }
}

fn fly(
    p: &mut Projectile,
    dt: f32,
    max_step: f32,
    grid: &CollisionGrid,
    objects: &[MapObject],
    targets: &mut [Entity],
    margin: f32,
) -> Option<Despawn> {
    let mut budget = (p.spec.speed * dt).min(p.spec.range - p.traveled).max(0.0);
    while budget > 0.0 {
        let step = budget.min(max_step);
        budget -= step;
        p.pos += p.dir * step;
        p.traveled += step;

        let rect = p.rect();
        if grid.is_rect_blocked(rect, objects) {
            return Some(Despawn::Wall);
        }
        let victim = targets
            .iter_mut()
            .find(|t| t.id != p.owner && t.is_alive() && rects_overlap(&rect, &t.hitbox(margin)));
        if let Some(t) = victim {
            let outcome = t.take_damage(p.spec.damage);
            return Some(Despawn::Hit { target: t.id, outcome });
        }
    }
    (p.traveled >= p.spec.range).then_some(Despawn::Expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationSet;
    use crate::entity::EntityKind;
    use crate::map_data::{MapData, Properties, TileLayer};
    use crate::spatial::TileId;
    use std::rc::Rc;

    const ARROW: ProjectileSpec = ProjectileSpec {
        speed: 100.0,
        range: 240.0,
        size: 4.0,
        damage: 15,
    };

    /// 20x3 map of 16px tiles with a wall column at `wall_col` (if any).
    fn grid(wall_col: Option<usize>) -> CollisionGrid {
        let (w, h) = (20usize, 3usize);
        let mut cells = vec![TileId(0); w * h];
        if let Some(c) = wall_col {
            for r in 0..h {
                cells[r * w + c] = TileId(1);
            }
        }
        let map = MapData {
            width: w as u32,
            height: h as u32,
            tile_w: 16,
            tile_h: 16,
            properties: Properties::new(),
            tilesets: Vec::new(),
            tile_layers: vec![TileLayer {
                name: "Walls".into(),
                z: 0,
                width: w,
                height: h,
                visible: true,
                opacity: 1.0,
                offset: Vec2::ZERO,
                properties: Properties::new(),
                cells,
            }],
            object_layers: Vec::new(),
        };
        CollisionGrid::build(&map, &[])
    }

    fn enemy(id: u32, x: f32) -> Entity {
        Entity::new(EntityId(id), EntityKind::Enemy, vec2(x, 24.0), vec2(16.0, 16.0), 30, Rc::new(AnimationSet::new()))
    }

    #[test]
    fn expires_exactly_at_range() {
        let g = grid(None);
        let mut pm = ProjectileManager::new();
        pm.spawn(EntityId::PLAYER, vec2(2.0, 24.0), vec2(1.0, 0.0), ARROW);

        // 2.4s of flight covers exactly 240px
        for _ in 0..2 {
            assert!(pm.update(1.0, &g, &[], &mut [], 0.0).is_empty());
        }
        let events = pm.update(0.4, &g, &[], &mut [], 0.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reason, Despawn::Expired);
        assert!(pm.is_empty());
    }

    #[test]
    fn never_flies_past_range_on_a_long_tick() {
        let g = grid(None);
        let mut pm = ProjectileManager::new();
        pm.spawn(EntityId::PLAYER, vec2(2.0, 24.0), vec2(1.0, 0.0), ARROW);
        pm.update(2.3, &g, &[], &mut [], 0.0);
        let p = &pm.active()[0];
        assert!((p.traveled - 230.0).abs() < 1e-3);
        let events = pm.update(5.0, &g, &[], &mut [], 0.0);
        assert_eq!(events[0].reason, Despawn::Expired);
    }

    #[test]
    fn wall_mid_flight_wins_over_range() {
        let g = grid(Some(6));
        let mut pm = ProjectileManager::new();
        pm.spawn(EntityId::PLAYER, vec2(2.0, 24.0), vec2(1.0, 0.0), ARROW);
        let events = pm.update(10.0, &g, &[], &mut [], 0.0);
        assert_eq!(events[0].reason, Despawn::Wall);
        // wall starts at x = 96; the arrow's front edge is within one step of it
        assert!(pm.is_empty());
    }

    #[test]
    fn hits_first_target_only_and_skips_owner() {
        let g = grid(None);
        let mut pm = ProjectileManager::new();
        let mut targets = vec![enemy(0, 10.0), enemy(1, 60.0), enemy(2, 80.0)];
        // owner id 0 stands on the spawn point
        pm.spawn(EntityId(0), vec2(10.0, 24.0), vec2(1.0, 0.0), ARROW);
        let events = pm.update(1.0, &g, &[], &mut targets, 0.0);
        assert_eq!(
            events[0].reason,
            Despawn::Hit {
                target: EntityId(1),
                outcome: DamageOutcome::Hurt
            }
        );
        assert_eq!(targets[0].health.current(), 30);
        assert_eq!(targets[1].health.current(), 15);
        assert_eq!(targets[2].health.current(), 30);
    }

    #[test]
    fn dead_targets_are_not_obstacles() {
        let g = grid(None);
        let mut pm = ProjectileManager::new();
        let mut targets = vec![enemy(1, 40.0), enemy(2, 80.0)];
        targets[0].take_damage(100);
        pm.spawn(EntityId::PLAYER, vec2(2.0, 24.0), vec2(1.0, 0.0), ARROW);
        let events = pm.update(1.0, &g, &[], &mut targets, 0.0);
        assert!(matches!(events[0].reason, Despawn::Hit { target: EntityId(2), .. }));
    }

    #[test]
    fn zero_direction_is_rejected() {
        let mut pm = ProjectileManager::new();
        assert!(!pm.spawn(EntityId::PLAYER, Vec2::ZERO, Vec2::ZERO, ARROW));
        assert!(pm.is_empty());
    }
}
