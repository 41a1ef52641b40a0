//! Distance-based melee for the player and fixed-radius aggro for enemies.

use crate::animation::Action;
use crate::config::GameConfig;
use crate::entity::{DamageOutcome, Entity, EntityId};
use macroquad::prelude::*;

/// Numbers the resolver works with. Usually taken from [`GameConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatRules {
    /// Center-to-center reach of the player swing.
    pub melee_range: f32,
    /// Damage of one player swing.
    pub melee_damage: i32,
    /// Enemies attack instead of chasing inside this distance.
    pub enemy_attack_range: f32,
    /// Damage of one enemy hit.
    pub enemy_damage: i32,
    /// Seconds between two hits of the same enemy.
    pub enemy_cooldown: f32,
    /// Enemies ignore a player further away.
    pub aggro_radius: f32,
}

impl From<&GameConfig> for CombatRules {
    fn from(cfg: &GameConfig) -> Self {
        CombatRules {
            melee_range: cfg.melee_range,
            melee_damage: cfg.melee_damage,
            enemy_attack_range: cfg.enemy_attack_range,
            enemy_damage: cfg.enemy_damage,
            enemy_cooldown: cfg.enemy_cooldown,
            aggro_radius: cfg.aggro_radius,
        }
    }
}

/// One damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Who dealt it.
    pub attacker: EntityId,
    /// Who took it.
    pub target: EntityId,
    /// Effect on the target.
    pub outcome: DamageOutcome,
}

/// Melee hit tests and enemy behaviour, run once per frame.
#[derive(Debug, Clone)]
pub struct CombatResolver {
    rules: CombatRules,
}

impl CombatResolver {
    /// Resolver applying `rules`.
    pub fn new(rules: CombatRules) -> Self {
        CombatResolver { rules }
    }

    /// Rules in use.
    pub fn rules(&self) -> &CombatRules {
        &self.rules
    }

    /// Starts a swing if the attacker is free to act. Clears every target's
    /// per-swing flag so each can be struck once by this swing.
    pub fn begin_swing(&self, attacker: &mut Entity, targets: &mut [Entity]) -> bool {
        if !attacker.is_alive() || !attacker.anim.trigger(Action::Attack) {
            return false;
        }
        for t in targets.iter_mut() {
            t.hit_this_swing = false;
        }
        true
    }

    /// Damages every live target within reach that this swing has not hit
    /// yet. Safe to call on every tick of the hit window.
    pub fn resolve_melee(&self, attacker: &Entity, targets: &mut [Entity]) -> Vec<Hit> {
        let mut hits = Vec::new();
        for t in targets.iter_mut() {
            if !t.is_alive() || t.hit_this_swing || t.id == attacker.id {
                continue;
            }
            if attacker.distance_to(t) > self.rules.melee_range {
                continue;
            }
            t.hit_this_swing = true;
            let outcome = t.take_damage(self.rules.melee_damage);
            log::debug!(
                "melee {:?} -> {:?}: {:?} (hp {}/{})",
                attacker.id,
                t.id,
                outcome,
                t.health.current(),
                t.health.max()
            );
            hits.push(Hit {
                attacker: attacker.id,
                target: t.id,
                outcome,
            });
        }
        hits
    }

    /// Points each enemy at the player while the player is inside its aggro
    /// radius and out of striking distance.
    pub fn steer_enemies(&self, enemies: &mut [Entity], player: &Entity) {
        for e in enemies.iter_mut() {
            e.intent = Vec2::ZERO;
            if !e.is_alive() || !player.is_alive() {
                continue;
            }
            let to_player = player.pos - e.pos;
            let dist = to_player.length();
            if dist <= self.rules.aggro_radius && dist > self.rules.enemy_attack_range {
                e.intent = to_player / dist;
            }
        }
    }

    /// Ticks every enemy's cooldown and lets the ready ones in range strike.
    pub fn enemy_attacks(&self, dt: f32, enemies: &mut [Entity], player: &mut Entity) -> Vec<Hit> {
        let mut hits = Vec::new();
        for e in enemies.iter_mut() {
            e.cooldown = (e.cooldown - dt).max(0.0);
            if !e.is_alive() || !player.is_alive() || e.cooldown > 0.0 {
                continue;
            }
            if e.distance_to(player) > self.rules.enemy_attack_range {
                continue;
            }
            e.cooldown = self.rules.enemy_cooldown;
            e.anim.face(player.pos - e.pos);
            e.anim.trigger(Action::Attack);
            let outcome = player.take_damage(self.rules.enemy_damage);
            log::debug!("enemy {:?} hit player: {:?} (hp {})", e.id, outcome, player.health.current());
            hits.push(Hit {
                attacker: e.id,
                target: player.id,
                outcome,
            });
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationSet, Clip, Facing, Frame};
    use crate::entity::EntityKind;
    use std::rc::Rc;

    fn rules() -> CombatRules {
        CombatRules {
            melee_range: 40.0,
            melee_damage: 10,
            enemy_attack_range: 28.0,
            enemy_damage: 5,
            enemy_cooldown: 1.0,
            aggro_radius: 160.0,
        }
    }

    fn anims() -> Rc<AnimationSet> {
        let mut set = AnimationSet::new();
        let frames = (0..4)
            .map(|_| Frame {
                region: Rect::new(0.0, 0.0, 16.0, 16.0),
                duration: 0.1,
            })
            .collect();
        set.insert(Action::Attack, Facing::East, Clip::new(frames, false));
        Rc::new(set)
    }

    fn player() -> Entity {
        Entity::new(EntityId::PLAYER, EntityKind::Player, vec2(100.0, 100.0), vec2(24.0, 32.0), 100, anims())
    }

    fn enemy(id: u32, x: f32) -> Entity {
        Entity::new(EntityId(id), EntityKind::Enemy, vec2(x, 100.0), vec2(24.0, 24.0), 30, Rc::new(AnimationSet::new()))
    }

    #[test]
    fn swing_hits_each_target_once_across_ticks() {
        let c = CombatResolver::new(rules());
        let mut p = player();
        let mut enemies = vec![enemy(1, 120.0), enemy(2, 80.0), enemy(3, 300.0)];

        assert!(c.begin_swing(&mut p, &mut enemies));
        let mut total = 0;
        for _ in 0..5 {
            total += c.resolve_melee(&p, &mut enemies).len();
        }
        assert_eq!(total, 2);
        assert_eq!(enemies[0].health.current(), 20);
        assert_eq!(enemies[1].health.current(), 20);
        assert_eq!(enemies[2].health.current(), 30);
    }

    #[test]
    fn next_swing_can_hit_again() {
        let c = CombatResolver::new(rules());
        let mut p = player();
        let mut enemies = vec![enemy(1, 120.0)];
        c.begin_swing(&mut p, &mut enemies);
        c.resolve_melee(&p, &mut enemies);
        // still mid-swing: a new swing is refused and flags stay set
        assert!(!c.begin_swing(&mut p, &mut enemies));
        assert!(c.resolve_melee(&p, &mut enemies).is_empty());

        p.anim.update(1.0, Default::default());
        assert!(c.begin_swing(&mut p, &mut enemies));
        assert_eq!(c.resolve_melee(&p, &mut enemies).len(), 1);
        assert_eq!(enemies[0].health.current(), 10);
    }

    #[test]
    fn range_is_inclusive_center_to_center() {
        let c = CombatResolver::new(rules());
        let mut p = player();
        let mut enemies = vec![enemy(1, 140.0), enemy(2, 140.5)];
        c.begin_swing(&mut p, &mut enemies);
        let hits = c.resolve_melee(&p, &mut enemies);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, EntityId(1));
    }

    #[test]
    fn lethal_hit_kills_once_and_removes_from_targeting() {
        let c = CombatResolver::new(CombatRules { melee_damage: 30, ..rules() });
        let mut p = player();
        let mut enemies = vec![enemy(1, 110.0)];
        c.begin_swing(&mut p, &mut enemies);
        let hits = c.resolve_melee(&p, &mut enemies);
        assert_eq!(hits[0].outcome, DamageOutcome::Killed);
        assert!(!enemies[0].is_alive());

        enemies[0].hit_this_swing = false;
        assert!(c.resolve_melee(&p, &mut enemies).is_empty());
    }

    #[test]
    fn enemy_respects_its_cooldown() {
        let c = CombatResolver::new(rules());
        let mut p = player();
        let mut enemies = vec![enemy(1, 120.0)];

        assert_eq!(c.enemy_attacks(0.1, &mut enemies, &mut p).len(), 1);
        assert_eq!(p.health.current(), 95);
        for _ in 0..8 {
            assert!(c.enemy_attacks(0.1, &mut enemies, &mut p).is_empty());
        }
        assert_eq!(c.enemy_attacks(0.25, &mut enemies, &mut p).len(), 1);
        assert_eq!(p.health.current(), 90);
    }

    #[test]
    fn enemy_out_of_range_deals_nothing() {
        let c = CombatResolver::new(rules());
        let mut p = player();
        let mut enemies = vec![enemy(1, 129.0)];
        assert!(c.enemy_attacks(5.0, &mut enemies, &mut p).is_empty());
        assert_eq!(p.health.current(), 100);
    }

    #[test]
    fn enemies_chase_only_inside_aggro_radius() {
        let c = CombatResolver::new(rules());
        let p = player();
        let mut enemies = vec![enemy(1, 200.0), enemy(2, 400.0), enemy(3, 110.0)];
        c.steer_enemies(&mut enemies, &p);
        assert_eq!(enemies[0].intent, vec2(-1.0, 0.0));
        assert_eq!(enemies[1].intent, Vec2::ZERO);
        // already within striking distance
        assert_eq!(enemies[2].intent, Vec2::ZERO);
    }
}
