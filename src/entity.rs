//! Players and enemies.

use crate::animation::{AnimationController, AnimationSet, MotionIntent};
use macroquad::prelude::*;
use std::rc::Rc;

/// Stable identity of an entity within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Reserved for the player.
    pub const PLAYER: EntityId = EntityId(0);
}

/// Which side an entity is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Controlled by input.
    Player,
    /// Controlled by the combat resolver.
    Enemy,
}

/// Result of [`Health::apply_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Health dropped but stayed above zero.
    Hurt,
    /// This hit took health to zero.
    Killed,
    /// Target was already dead.
    Ignored,
}

/// Health always stays within `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    current: i32,
    max: i32,
}

impl Health {
    /// Full health. `max` is at least 1.
    pub fn new(max: i32) -> Self {
        let max = max.max(1);
        Health { current: max, max }
    }

    /// Remaining health.
    pub fn current(&self) -> i32 {
        self.current
    }

    /// Upper bound.
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Health reached zero.
    pub fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Negative amounts count as zero. Only the hit that reaches zero reports `Killed`.
    pub fn apply_damage(&mut self, amount: i32) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::Ignored;
        }
        self.current = (self.current - amount.max(0)).clamp(0, self.max);
        if self.current == 0 {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Hurt
        }
    }

    /// Healing never revives.
    pub fn heal(&mut self, amount: i32) {
        if !self.is_dead() {
            self.current = (self.current + amount.max(0)).clamp(0, self.max);
        }
    }
}

/// Player or enemy: body, health and animation.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Identity.
    pub id: EntityId,
    /// Player or enemy.
    pub kind: EntityKind,
    /// Center of the sprite in world pixels.
    pub pos: Vec2,
    /// Visual (sprite) size.
    pub size: Vec2,
    /// Desired direction this frame, each axis in `[-1, 1]`.
    pub intent: Vec2,
    /// Run modifier held this frame.
    pub running: bool,
    /// Clamped health.
    pub health: Health,
    /// Animation state.
    pub anim: AnimationController,
    /// Set once this entity has been struck by the current swing.
    pub hit_this_swing: bool,
    /// Seconds until this entity may deal damage again.
    pub cooldown: f32,
}

impl Entity {
    /// Idle entity centered on `pos`.
    pub fn new(id: EntityId, kind: EntityKind, pos: Vec2, size: Vec2, max_health: i32, anims: Rc<AnimationSet>) -> Self {
        Entity {
            id,
            kind,
            pos,
            size,
            intent: Vec2::ZERO,
            running: false,
            health: Health::new(max_health),
            anim: AnimationController::new(anims),
            hit_this_swing: false,
            cooldown: 0.0,
        }
    }

    /// Sprite rectangle around the center.
    pub fn visual_rect(&self) -> Rect {
        Rect::new(
            self.pos.x - self.size.x / 2.0,
            self.pos.y - self.size.y / 2.0,
            self.size.x,
            self.size.y,
        )
    }

    /// Visual bounds shrunk by `margin` on every side.
    pub fn hitbox(&self, margin: f32) -> Rect {
        let w = (self.size.x - 2.0 * margin).max(0.0);
        let h = (self.size.y - 2.0 * margin).max(0.0);
        Rect::new(self.pos.x - w / 2.0, self.pos.y - h / 2.0, w, h)
    }

    /// Alive entities collide and can be targeted. A dying entity is neither,
    /// even while its death clip still plays.
    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// Ready to be removed from its scene.
    pub fn is_gone(&self) -> bool {
        !self.is_alive() && self.anim.death_finished()
    }

    /// Intent handed to the animation controller.
    pub fn motion_intent(&self) -> MotionIntent {
        MotionIntent {
            moving: self.intent != Vec2::ZERO,
            running: self.running,
        }
    }

    /// Center-to-center distance.
    pub fn distance_to(&self, other: &Entity) -> f32 {
        self.pos.distance(other.pos)
    }

    /// Applies damage and drives the matching animation. Only enemies play
    /// the hurt clip.
    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        let outcome = self.health.apply_damage(amount);
        match outcome {
            DamageOutcome::Killed => {
                self.anim.kill();
                self.intent = Vec2::ZERO;
            }
            DamageOutcome::Hurt if self.kind == EntityKind::Enemy => {
                self.anim.hurt();
            }
            _ => {}
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Action;

    fn enemy() -> Entity {
        Entity::new(EntityId(3), EntityKind::Enemy, vec2(100.0, 100.0), vec2(24.0, 32.0), 20, Rc::new(AnimationSet::new()))
    }

    #[test]
    fn health_clamps_both_ways() {
        let mut h = Health::new(10);
        h.heal(50);
        assert_eq!(h.current(), 10);
        assert_eq!(h.apply_damage(-5), DamageOutcome::Hurt);
        assert_eq!(h.current(), 10);
        assert_eq!(h.apply_damage(25), DamageOutcome::Killed);
        assert_eq!(h.current(), 0);
        assert_eq!(h.apply_damage(1), DamageOutcome::Ignored);
        h.heal(5);
        assert_eq!(h.current(), 0);
    }

    #[test]
    fn exact_lethal_damage_kills_once() {
        let mut e = enemy();
        assert_eq!(e.take_damage(10), DamageOutcome::Hurt);
        assert_eq!(e.anim.action(), Action::Hurt);
        assert_eq!(e.take_damage(10), DamageOutcome::Killed);
        assert_eq!(e.take_damage(10), DamageOutcome::Ignored);
        assert!(!e.is_alive());
        assert_eq!(e.anim.action(), Action::Death);
    }

    #[test]
    fn hitbox_is_shrunk_on_all_sides() {
        let e = enemy();
        assert_eq!(e.visual_rect(), Rect::new(88.0, 84.0, 24.0, 32.0));
        assert_eq!(e.hitbox(4.0), Rect::new(92.0, 88.0, 16.0, 24.0));
        assert_eq!(e.hitbox(100.0).w, 0.0);
    }

    #[test]
    fn dead_entity_is_gone_after_death_clip() {
        let mut e = enemy();
        e.take_damage(100);
        assert!(!e.is_gone());
        let intent = e.motion_intent();
        e.anim.update(0.016, intent);
        assert!(e.is_gone());
    }
}
