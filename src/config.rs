//! Gameplay tuning loaded from JSON.

use anyhow::Context;
use macroquad::prelude::*;
use serde::Deserialize;
use std::path::Path;

/// Gameplay tuning. Every field has a default so a config file only needs
/// to name what it changes.
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Walking speed in pixels per second.
    #[serde(default = "walk_speed")]
    pub walk_speed: f32,
    /// Applied to the displacement while the run modifier is held.
    #[serde(default = "run_multiplier")]
    pub run_multiplier: f32,
    /// Pixels shaved off every side of a sprite to get its hitbox.
    #[serde(default = "collision_margin")]
    pub collision_margin: f32,
    /// Player sprite size in pixels.
    #[serde(default = "player_size")]
    pub player_size: [f32; 2],
    /// Player starting and maximum health.
    #[serde(default = "player_health")]
    pub player_health: i32,

    /// Enemy sprite size in pixels.
    #[serde(default = "enemy_size")]
    pub enemy_size: [f32; 2],
    /// Health of enemies without a `health` property.
    #[serde(default = "enemy_health")]
    pub enemy_health: i32,
    /// Enemy chase speed in pixels per second.
    #[serde(default = "enemy_speed")]
    pub enemy_speed: f32,
    /// Enemies only chase a player closer than this.
    #[serde(default = "aggro_radius")]
    pub aggro_radius: f32,
    /// Center distance at which enemies strike.
    #[serde(default = "enemy_attack_range")]
    pub enemy_attack_range: f32,
    /// Damage of one enemy hit.
    #[serde(default = "enemy_damage")]
    pub enemy_damage: i32,
    /// Seconds between two enemy hits.
    #[serde(default = "enemy_cooldown")]
    pub enemy_cooldown: f32,

    /// Center-to-center reach of the player's melee swing.
    #[serde(default = "melee_range")]
    pub melee_range: f32,
    /// Damage of one player swing.
    #[serde(default = "melee_damage")]
    pub melee_damage: i32,

    /// Arrow speed in pixels per second.
    #[serde(default = "arrow_speed")]
    pub arrow_speed: f32,
    /// `ARROW_RANGE`: pixels an arrow may travel before it despawns.
    #[serde(default = "arrow_range")]
    pub arrow_range: f32,
    /// Side of the arrow hit square.
    #[serde(default = "arrow_size")]
    pub arrow_size: f32,
    /// Damage of one arrow.
    #[serde(default = "arrow_damage")]
    pub arrow_damage: i32,

    /// Used for interactive objects without a `radius` property.
    #[serde(default = "interact_radius")]
    pub interact_radius: f32,
    /// Key name that toggles interactive objects.
    #[serde(default = "interact_key")]
    pub interact_key: String,

    /// Player center when a scene has no `player_spawn` object.
    #[serde(default = "default_spawn")]
    pub default_spawn: [f32; 2],
    /// Visible area in pixels.
    #[serde(default = "viewport")]
    pub viewport: [f32; 2],
}

fn walk_speed() -> f32 {
    120.0
}
fn run_multiplier() -> f32 {
    2.0
}
fn collision_margin() -> f32 {
    4.0
}
fn player_size() -> [f32; 2] {
    [24.0, 32.0]
}
fn player_health() -> i32 {
    100
}
fn enemy_size() -> [f32; 2] {
    [24.0, 24.0]
}
fn enemy_health() -> i32 {
    30
}
fn enemy_speed() -> f32 {
    60.0
}
fn aggro_radius() -> f32 {
    160.0
}
fn enemy_attack_range() -> f32 {
    28.0
}
fn enemy_damage() -> i32 {
    5
}
fn enemy_cooldown() -> f32 {
    1.0
}
fn melee_range() -> f32 {
    40.0
}
fn melee_damage() -> i32 {
    10
}
fn arrow_speed() -> f32 {
    360.0
}
fn arrow_range() -> f32 {
    240.0
}
fn arrow_size() -> f32 {
    4.0
}
fn arrow_damage() -> i32 {
    15
}
fn interact_radius() -> f32 {
    60.0
}
fn interact_key() -> String {
    "e".to_owned()
}
fn default_spawn() -> [f32; 2] {
    [265.0, 425.0]
}
fn viewport() -> [f32; 2] {
    [600.0, 600.0]
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            walk_speed: walk_speed(),
            run_multiplier: run_multiplier(),
            collision_margin: collision_margin(),
            player_size: player_size(),
            player_health: player_health(),
            enemy_size: enemy_size(),
            enemy_health: enemy_health(),
            enemy_speed: enemy_speed(),
            aggro_radius: aggro_radius(),
            enemy_attack_range: enemy_attack_range(),
            enemy_damage: enemy_damage(),
            enemy_cooldown: enemy_cooldown(),
            melee_range: melee_range(),
            melee_damage: melee_damage(),
            arrow_speed: arrow_speed(),
            arrow_range: arrow_range(),
            arrow_size: arrow_size(),
            arrow_damage: arrow_damage(),
            interact_radius: interact_radius(),
            interact_key: interact_key(),
            default_spawn: default_spawn(),
            viewport: viewport(),
        }
    }
}

impl GameConfig {
    /// Parses a config document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Parsing game config")
    }

    /// Reads and parses a config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config file {}", path.display()))?;
        Self::from_json_str(&txt).with_context(|| format!("In config file {}", path.display()))
    }

    /// [`GameConfig::player_size`] as a vector.
    pub fn player_size(&self) -> Vec2 {
        Vec2::from(self.player_size)
    }

    /// [`GameConfig::enemy_size`] as a vector.
    pub fn enemy_size(&self) -> Vec2 {
        Vec2::from(self.enemy_size)
    }

    /// [`GameConfig::default_spawn`] as a vector.
    pub fn default_spawn(&self) -> Vec2 {
        Vec2::from(self.default_spawn)
    }

    /// [`GameConfig::viewport`] as a vector.
    pub fn viewport(&self) -> Vec2 {
        Vec2::from(self.viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_unnamed_fields() {
        let cfg = GameConfig::from_json_str(r#"{"collision_margin": 2, "arrow_range": 100}"#)
            .expect("config");
        assert_eq!(cfg.collision_margin, 2.0);
        assert_eq!(cfg.arrow_range, 100.0);
        assert_eq!(cfg.run_multiplier, 2.0);
        assert_eq!(cfg.interact_key, "e");
    }

    #[test]
    fn default_matches_empty_document() {
        let cfg = GameConfig::default();
        let empty = GameConfig::from_json_str("{}").expect("config");
        assert_eq!(cfg.walk_speed, empty.walk_speed);
        assert_eq!(cfg.viewport, empty.viewport);
        assert_eq!(cfg.default_spawn(), vec2(265.0, 425.0));
    }

    #[test]
    fn wrong_types_are_reported() {
        assert!(GameConfig::from_json_str(r#"{"walk_speed": "fast"}"#).is_err());
    }
}
