//! The fixed-order frame update tying every system together.

use crate::animation::{Action, AnimEvent, AnimationSet};
use crate::camera::Camera;
use crate::combat::{CombatResolver, CombatRules, Hit};
use crate::config::GameConfig;
use crate::entity::{DamageOutcome, EntityId};
use crate::error::SceneError;
use crate::movement::move_entity;
use crate::projectile::{ProjectileEvent, ProjectileManager, ProjectileSpec};
use crate::scene::{DebugCommand, SceneManager};
use macroquad::prelude::*;
use std::rc::Rc;

/// Player input sampled once per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    /// Each axis in `[-1, 1]`.
    pub direction: Vec2,
    /// Run modifier held.
    pub run: bool,
    /// Melee pressed this frame.
    pub attack: bool,
    /// Shot pressed this frame.
    pub shoot: bool,
    /// Interact key pressed this frame.
    pub interact: bool,
    /// Inventory key held.
    pub show_inventory: bool,
}

/// What happened during one [`World::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Damage dealt, by anyone.
    pub hits: Vec<Hit>,
    /// Projectiles that despawned.
    pub projectiles: Vec<ProjectileEvent>,
    /// Object toggled by interaction.
    pub toggled: Option<usize>,
    /// Items collected.
    pub picked_up: usize,
    /// Scene entered through a portal.
    pub entered: Option<String>,
}

/// Scenes, camera and projectiles advanced together one frame at a time.
pub struct World {
    /// Scenes and the player.
    pub scenes: SceneManager,
    /// Follows the player.
    pub camera: Camera,
    /// Arrows in the active scene.
    pub projectiles: ProjectileManager,
    combat: CombatResolver,
    arrow: ProjectileSpec,
    margin: f32,
    /// Draw collision outlines.
    pub show_collision: bool,
}

impl World {
    /// No active scene until [`World::start`].
    pub fn new(config: GameConfig, player_anims: Rc<AnimationSet>, enemy_anims: Rc<AnimationSet>) -> Self {
        let combat = CombatResolver::new(CombatRules::from(&config));
        let arrow = ProjectileSpec {
            speed: config.arrow_speed,
            range: config.arrow_range,
            size: config.arrow_size,
            damage: config.arrow_damage,
        };
        World {
            camera: Camera::new(config.viewport(), Vec2::ZERO),
            margin: config.collision_margin,
            scenes: SceneManager::new(config, player_anims, enemy_anims),
            projectiles: ProjectileManager::new(),
            combat,
            arrow,
            show_collision: false,
        }
    }

    /// Tuning in use.
    pub fn config(&self) -> &GameConfig {
        self.scenes.config()
    }

    /// Current hitbox margin in pixels.
    pub fn collision_margin(&self) -> f32 {
        self.margin
    }

    /// Enters the first scene with the player on its spawn point.
    pub fn start(&mut self, scene: &str) -> Result<(), SceneError> {
        self.scenes.teleport_to(scene)?;
        self.on_scene_changed();
        Ok(())
    }

    /// Resizes the camera and recenters it on the player.
    pub fn set_viewport(&mut self, viewport: Vec2) {
        let map_size = self.scenes.active().map_or(Vec2::ZERO, |s| s.map().pixel_size());
        self.camera.set_bounds(viewport, map_size);
        self.camera.update(self.scenes.player.pos);
    }

    fn on_scene_changed(&mut self) {
        self.projectiles.clear();
        let viewport = self.config().viewport();
        self.set_viewport(viewport);
    }

    /// Runs a developer command. Failed scene changes leave everything as it was.
    pub fn debug(&mut self, cmd: DebugCommand) -> Result<(), SceneError> {
        match cmd {
            DebugCommand::TeleportTo(id) => {
                self.scenes.teleport_to(&id)?;
                self.on_scene_changed();
            }
            DebugCommand::SwitchTo(id) => {
                self.scenes.switch_to(&id)?;
                self.on_scene_changed();
            }
            DebugCommand::ToggleCollisionOverlay => {
                self.show_collision = !self.show_collision;
                log::info!("collision overlay {}", if self.show_collision { "on" } else { "off" });
            }
            DebugCommand::AdjustCollisionMargin(delta) => {
                self.margin = (self.margin + delta as f32).max(0.0);
                log::info!("collision margin = {}", self.margin);
            }
        }
        Ok(())
    }

    /// One frame: input, movement, camera, animation, combat and
    /// projectiles, then pickups and portals. Without an active scene
    /// nothing happens. A dead player no longer interacts, picks up items
    /// or uses portals.
    pub fn update(&mut self, dt: f32, input: &FrameInput) -> FrameReport {
        let mut report = FrameReport::default();
        let cfg = self.scenes.config().clone();
        let margin = self.margin;

        {
            let Some((scene, player, inventory)) = self.scenes.split_active() else {
                return report;
            };
            inventory.visible = input.show_inventory;

            // input
            if player.is_alive() {
                player.intent = input.direction.clamp(Vec2::splat(-1.0), Vec2::splat(1.0));
                player.running = input.run;
                if input.attack {
                    self.combat.begin_swing(player, &mut scene.enemies);
                }
                if input.shoot {
                    player.anim.trigger(Action::Shot);
                }
            }
            self.combat.steer_enemies(&mut scene.enemies, player);

            // movement
            let (grid, objects, enemies) = scene.parts_mut();
            move_entity(player, cfg.walk_speed, dt, cfg.run_multiplier, margin, grid, objects);
            for e in enemies.iter_mut() {
                move_entity(e, cfg.enemy_speed, dt, 1.0, margin, grid, objects);
            }

            // camera
            self.camera.update(player.pos);

            // animation
            let intent = player.motion_intent();
            let player_event = player.anim.update(dt, intent);
            for e in enemies.iter_mut() {
                let intent = e.motion_intent();
                e.anim.update(dt, intent);
            }

            // combat
            if player.anim.in_hit_window() || player_event == Some(AnimEvent::Finished(Action::Attack)) {
                report.hits.extend(self.combat.resolve_melee(player, enemies));
            }
            if player_event == Some(AnimEvent::Finished(Action::Shot)) && player.is_alive() {
                let dir = player.anim.facing().vector();
                self.projectiles.spawn(player.id, player.pos, dir, self.arrow);
            }
            report.hits.extend(self.combat.enemy_attacks(dt, enemies, player));
            report.projectiles = self.projectiles.update(dt, grid, objects, enemies, margin);
            if report
                .hits
                .iter()
                .any(|h| h.target == EntityId::PLAYER && h.outcome == DamageOutcome::Killed)
            {
                log::info!("player died");
            }
        }

        // scene
        if let Some(scene) = self.scenes.active_mut() {
            scene.remove_gone_enemies();
        }
        if !self.scenes.player.is_alive() {
            return report;
        }
        if input.interact {
            report.toggled = self.scenes.interact(&cfg.interact_key);
        }
        report.picked_up = self.scenes.collect_items();
        match self.scenes.check_portals() {
            Some(Ok(())) => {
                report.entered = self.scenes.active_id().map(str::to_owned);
                self.on_scene_changed();
            }
            Some(Err(e)) => log::warn!("portal ignored: {e}"),
            None => {}
        }
        report
    }
}
