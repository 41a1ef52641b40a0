//! Scenes built from loaded maps, and the manager that owns the active one.
//!
//! A scene bundles a map with everything derived from it: the live object
//! list (doors flip `visible` here), the collision grid, the render index,
//! enemies, portals and pickups. Built scenes are cached, so door state,
//! collected items and surviving enemies are still there on return.

use crate::animation::AnimationSet;
use crate::config::GameConfig;
use crate::entity::{Entity, EntityId, EntityKind};
use crate::error::{PortalError, SceneError};
use crate::inventory::Inventory;
use crate::loader::json_loader;
use crate::map_data::{MapData, MapObject, PropertyValue};
use crate::spatial::{rects_overlap, CollisionGrid, GlobalIndex};
use macroquad::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

/// Object type marking where teleports place the player.
pub const PLAYER_SPAWN_KIND: &str = "player_spawn";
/// Object type marking an enemy spawn.
pub const ENEMY_KIND: &str = "enemy";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonPortal {
    target_scene: String,
    #[serde(default)]
    spawn_x: Option<f32>,
    #[serde(default)]
    spawn_y: Option<f32>,
}

/// Scene exit anchored on a map object.
#[derive(Debug, Clone, PartialEq)]
pub struct Portal {
    /// Index of the anchor in the scene's object list.
    pub object: usize,
    /// Scene entered through this portal.
    pub target_scene: String,
    /// Player center after the transition. A missing coordinate keeps the
    /// player's current one.
    pub spawn_x: Option<f32>,
    /// See `spawn_x`.
    pub spawn_y: Option<f32>,
}

impl Portal {
    /// Reads the `portal` property of `obj`. `Ok(None)` when there is none.
    pub fn from_object(index: usize, obj: &MapObject) -> Result<Option<Portal>, PortalError> {
        let invalid = |reason: String| PortalError::InvalidProperty {
            object_id: obj.id,
            reason,
        };
        let raw = match obj.properties.get("portal") {
            None => return Ok(None),
            Some(PropertyValue::String(s)) => s,
            Some(other) => return Err(invalid(format!("expected a JSON string, got {other:?}"))),
        };
        let parsed: JsonPortal = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
        if parsed.target_scene.is_empty() {
            return Err(invalid("empty targetScene".to_owned()));
        }
        Ok(Some(Portal {
            object: index,
            target_scene: parsed.target_scene,
            spawn_x: parsed.spawn_x,
            spawn_y: parsed.spawn_y,
        }))
    }

    /// Open while the anchor is invisible. Read live every call.
    pub fn is_active(&self, objects: &[MapObject]) -> bool {
        objects.get(self.object).is_some_and(|o| !o.visible)
    }

    /// Player center after using this portal from `current`.
    pub fn spawn_point(&self, current: Vec2) -> Vec2 {
        vec2(self.spawn_x.unwrap_or(current.x), self.spawn_y.unwrap_or(current.y))
    }
}

/// An item lying in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    /// Index of the item object in the scene's object list.
    pub object: usize,
    /// Value of the `item_type` property.
    pub item: String,
    /// Already in the inventory.
    pub collected: bool,
}

/// Portal activation found by [`Scene::triggered_portal`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Scene to enter.
    pub target_scene: String,
    /// Player center there.
    pub spawn: Vec2,
}

/// A map plus its live state: objects, collision, enemies, portals and pickups.
pub struct Scene {
    id: String,
    map: MapData,
    objects: Vec<MapObject>,
    grid: CollisionGrid,
    index: GlobalIndex,
    /// Enemies still in the scene, dying ones included.
    pub enemies: Vec<Entity>,
    portals: Vec<Portal>,
    pickups: Vec<Pickup>,
    spawn: Vec2,
}

impl Scene {
    /// Derives the live scene state from a loaded map. Invalid portals are
    /// logged and left out; the rest of the scene is unaffected.
    pub fn build(
        id: &str,
        map: MapData,
        config: &GameConfig,
        enemy_anims: &Rc<AnimationSet>,
        next_entity: &mut u32,
    ) -> Scene {
        let objects: Vec<MapObject> = map.objects().cloned().collect();
        let grid = CollisionGrid::build(&map, &objects);
        let index = GlobalIndex::from_map(&map);

        let mut portals = Vec::new();
        let mut pickups = Vec::new();
        let mut enemies = Vec::new();
        let mut spawn = None;
        for (i, obj) in objects.iter().enumerate() {
            match Portal::from_object(i, obj) {
                Ok(Some(p)) => portals.push(p),
                Ok(None) => {}
                Err(e) => log::warn!("scene '{id}': {e}; portal ignored"),
            }
            if let Some(item) = obj.properties.get_string("item_type") {
                pickups.push(Pickup {
                    object: i,
                    item: item.to_owned(),
                    collected: false,
                });
            }
            match obj.kind.as_str() {
                PLAYER_SPAWN_KIND if spawn.is_none() => spawn = Some(obj.rect().center()),
                ENEMY_KIND => {
                    let health = obj.properties.get_i32("health").unwrap_or(config.enemy_health);
                    enemies.push(Entity::new(
                        EntityId(*next_entity),
                        EntityKind::Enemy,
                        obj.rect().center(),
                        config.enemy_size(),
                        health,
                        Rc::clone(enemy_anims),
                    ));
                    *next_entity += 1;
                }
                _ => {}
            }
        }

        log::info!(
            "built scene '{id}': {}x{} tiles, {} objects, {} enemies, {} portals, {} pickups",
            map.width,
            map.height,
            objects.len(),
            enemies.len(),
            portals.len(),
            pickups.len()
        );

        Scene {
            id: id.to_owned(),
            spawn: spawn.unwrap_or_else(|| config.default_spawn()),
            map,
            objects,
            grid,
            index,
            enemies,
            portals,
            pickups,
        }
    }

    /// Scene id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Map as loaded.
    pub fn map(&self) -> &MapData {
        &self.map
    }

    /// Live objects; door visibility changes here.
    pub fn objects(&self) -> &[MapObject] {
        &self.objects
    }

    /// Collision geometry.
    pub fn grid(&self) -> &CollisionGrid {
        &self.grid
    }

    /// Render index.
    pub fn index(&self) -> &GlobalIndex {
        &self.index
    }

    /// Valid portals.
    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    /// Pickups, collected ones included.
    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// Where teleports put the player.
    pub fn spawn(&self) -> Vec2 {
        self.spawn
    }

    /// Read-only geometry next to the mutable enemy list.
    pub fn parts_mut(&mut self) -> (&CollisionGrid, &[MapObject], &mut Vec<Entity>) {
        (&self.grid, &self.objects, &mut self.enemies)
    }

    /// Whether `rect` touches a solid cell or a live solid object.
    pub fn is_rect_blocked(&self, rect: Rect) -> bool {
        self.grid.is_rect_blocked(rect, &self.objects)
    }

    /// Shows or hides object `index`. `false` when there is no such object.
    pub fn set_object_visible(&mut self, index: usize, visible: bool) -> bool {
        match self.objects.get_mut(index) {
            Some(o) => {
                o.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Toggles the first interactive object in reach of `center`.
    ///
    /// An object is in reach when `center` lies within its `radius` property
    /// (default `default_radius`) of the object's center. Objects carrying a
    /// `toggleKey` only answer to that key. Returns the toggled index.
    pub fn interact(&mut self, center: Vec2, key: &str, default_radius: f32) -> Option<usize> {
        let found = self.objects.iter().position(|o| {
            if !o.is_interactive() {
                return false;
            }
            if let Some(k) = o.properties.get_string("toggleKey") {
                if !k.eq_ignore_ascii_case(key) {
                    return false;
                }
            }
            let radius = o.properties.f32_or("radius", default_radius);
            o.rect().center().distance(center) <= radius
        })?;
        let obj = &mut self.objects[found];
        obj.visible = !obj.visible;
        log::info!(
            "toggled '{}' ({}) -> {}",
            obj.name,
            obj.id,
            if obj.visible { "shown" } else { "hidden" }
        );
        Some(found)
    }

    /// First open portal whose anchor overlaps `player_rect`.
    pub fn triggered_portal(&self, player_rect: Rect, player_center: Vec2) -> Option<Transition> {
        self.portals
            .iter()
            .find(|p| {
                p.is_active(&self.objects)
                    && self
                        .objects
                        .get(p.object)
                        .is_some_and(|o| rects_overlap(&player_rect, &o.rect()))
            })
            .map(|p| Transition {
                target_scene: p.target_scene.clone(),
                spawn: p.spawn_point(player_center),
            })
    }

    /// Marks every uncollected pickup overlapping `rect` as collected and
    /// returns their item names.
    pub fn collect_pickups(&mut self, rect: Rect) -> Vec<String> {
        let objects = &self.objects;
        self.pickups
            .iter_mut()
            .filter(|p| !p.collected)
            .filter(|p| objects.get(p.object).is_some_and(|o| rects_overlap(&rect, &o.rect())))
            .map(|p| {
                p.collected = true;
                p.item.clone()
            })
            .collect()
    }

    /// Drops enemies whose death clip has finished.
    pub fn remove_gone_enemies(&mut self) -> usize {
        let before = self.enemies.len();
        self.enemies.retain(|e| !e.is_gone());
        before - self.enemies.len()
    }
}

/// Developer shortcuts exposed to the input layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugCommand {
    /// Go to a scene and stand on its spawn point.
    TeleportTo(String),
    /// Go to a scene without moving the player.
    SwitchTo(String),
    /// Show or hide collision outlines.
    ToggleCollisionOverlay,
    /// Grow or shrink the hitbox margin, never below zero.
    AdjustCollisionMargin(i32),
}

/// Owns every known scene and the player who walks between them.
pub struct SceneManager {
    config: GameConfig,
    /// Loaded but not yet built.
    pending: HashMap<String, MapData>,
    built: HashMap<String, Scene>,
    active: Option<String>,
    /// The player, carried across scenes.
    pub player: Entity,
    /// Items carried across scenes.
    pub inventory: Inventory,
    enemy_anims: Rc<AnimationSet>,
    next_entity: u32,
}

impl SceneManager {
    /// No scenes yet. The player starts at the default spawn.
    pub fn new(config: GameConfig, player_anims: Rc<AnimationSet>, enemy_anims: Rc<AnimationSet>) -> Self {
        let player = Entity::new(
            EntityId::PLAYER,
            EntityKind::Player,
            config.default_spawn(),
            config.player_size(),
            config.player_health,
            player_anims,
        );
        SceneManager {
            config,
            pending: HashMap::new(),
            built: HashMap::new(),
            active: None,
            player,
            inventory: Inventory::new(),
            enemy_anims,
            next_entity: EntityId::PLAYER.0 + 1,
        }
    }

    /// Tuning in use.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Makes `map` available under `id`, replacing any earlier version.
    /// The active scene is rebuilt in place and the player stays put.
    pub fn register(&mut self, id: impl Into<String>, map: MapData) {
        let id = id.into();
        if self.active.as_deref() == Some(id.as_str()) {
            let scene = Scene::build(&id, map, &self.config, &self.enemy_anims, &mut self.next_entity);
            log::info!("rebuilt active scene '{id}'");
            self.built.insert(id, scene);
            return;
        }
        self.built.remove(&id);
        self.pending.insert(id, map);
    }

    /// Loads and registers one map file. On failure the scene stays
    /// unavailable and the error is returned to the caller.
    pub fn load_scene_file(&mut self, id: &str, path: impl AsRef<Path>) -> Result<(), SceneError> {
        match json_loader::load_map_file(path.as_ref()) {
            Ok((map, _)) => {
                log::info!("loaded scene '{id}' from {}", path.as_ref().display());
                self.register(id, map);
                Ok(())
            }
            Err(source) => {
                log::warn!("scene '{id}' unavailable: {source}");
                Err(SceneError::Map {
                    scene: id.to_owned(),
                    source,
                })
            }
        }
    }

    /// Parses and registers a map document.
    pub fn load_scene_str(&mut self, id: &str, json: &str) -> Result<(), SceneError> {
        let map = json_loader::load_map_str(json).map_err(|source| {
            log::warn!("scene '{id}' unavailable: {source}");
            SceneError::Map {
                scene: id.to_owned(),
                source,
            }
        })?;
        self.register(id, map);
        Ok(())
    }

    /// Whether `id` is loaded, built or not.
    pub fn has_scene(&self, id: &str) -> bool {
        self.built.contains_key(id) || self.pending.contains_key(id)
    }

    /// Every known scene id, sorted.
    pub fn scene_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.built.keys().chain(self.pending.keys()).map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Id of the scene the player is in.
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The scene the player is in.
    pub fn active(&self) -> Option<&Scene> {
        self.active.as_ref().and_then(|id| self.built.get(id))
    }

    /// Mutable access to the scene the player is in.
    pub fn active_mut(&mut self) -> Option<&mut Scene> {
        self.active.as_ref().and_then(|id| self.built.get_mut(id))
    }

    /// Active scene, player and inventory borrowed together.
    pub fn split_active(&mut self) -> Option<(&mut Scene, &mut Entity, &mut Inventory)> {
        let scene = self.active.as_ref().and_then(|id| self.built.get_mut(id))?;
        Some((scene, &mut self.player, &mut self.inventory))
    }

    /// Builds `id` on first use. The only fallible step of a transition.
    fn ensure_built(&mut self, id: &str) -> Result<(), SceneError> {
        if self.built.contains_key(id) {
            return Ok(());
        }
        let Some(map) = self.pending.remove(id) else {
            log::warn!("scene not found: {id}");
            return Err(SceneError::NotFound(id.to_owned()));
        };
        let scene = Scene::build(id, map, &self.config, &self.enemy_anims, &mut self.next_entity);
        self.built.insert(id.to_owned(), scene);
        Ok(())
    }

    /// Makes `id` active and moves the player to `spawn` (or leaves them
    /// where they are). Nothing changes when the scene does not exist.
    fn enter(&mut self, id: &str, spawn: Option<Vec2>) -> Result<(), SceneError> {
        self.ensure_built(id)?;
        self.active = Some(id.to_owned());
        if let Some(pos) = spawn {
            self.player.pos = pos;
        }
        self.player.intent = Vec2::ZERO;
        log::info!("entered scene '{id}' at ({}, {})", self.player.pos.x, self.player.pos.y);
        Ok(())
    }

    /// Portal-style transition: target scene, player centered on `spawn`.
    pub fn transition(&mut self, id: &str, spawn: Vec2) -> Result<(), SceneError> {
        self.enter(id, Some(spawn))
    }

    /// Switches scenes, ignoring every portal and door, and places the
    /// player on the target's spawn point.
    pub fn teleport_to(&mut self, id: &str) -> Result<(), SceneError> {
        self.ensure_built(id)?;
        let spawn = self.built.get(id).map(Scene::spawn);
        self.enter(id, spawn)
    }

    /// Switches scenes and keeps the player's position.
    pub fn switch_to(&mut self, id: &str) -> Result<(), SceneError> {
        self.enter(id, None)
    }

    /// Checks the active scene's portals against the player and performs the
    /// first transition found. A portal into a missing scene is reported and
    /// the player stays put.
    pub fn check_portals(&mut self) -> Option<Result<(), SceneError>> {
        let scene = self.active()?;
        let t = scene.triggered_portal(self.player.visual_rect(), self.player.pos)?;
        Some(self.transition(&t.target_scene, t.spawn))
    }

    /// Door toggling for the interact key.
    pub fn interact(&mut self, key: &str) -> Option<usize> {
        if !key.eq_ignore_ascii_case(&self.config.interact_key) {
            return None;
        }
        let center = self.player.pos;
        let radius = self.config.interact_radius;
        self.active_mut()?.interact(center, key, radius)
    }

    /// Collects pickups under the player into the inventory.
    pub fn collect_items(&mut self) -> usize {
        let Some((scene, player, inventory)) = self.split_active() else {
            return 0;
        };
        let items = scene.collect_pickups(player.visual_rect());
        let n = items.len();
        for item in items {
            inventory.add(item);
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_data::{ObjectLayer, Properties};

    fn object(id: u32, rect: Rect, props: &[(&str, PropertyValue)]) -> MapObject {
        let mut properties = Properties::new();
        for (k, v) in props {
            properties.insert(*k, v.clone());
        }
        MapObject {
            id,
            name: format!("obj{id}"),
            kind: String::new(),
            x: rect.x,
            y: rect.y,
            width: rect.w,
            height: rect.h,
            rotation: 0.0,
            visible: true,
            gid: None,
            properties,
        }
    }

    fn map(objects: Vec<MapObject>) -> MapData {
        MapData {
            width: 20,
            height: 20,
            tile_w: 16,
            tile_h: 16,
            properties: Properties::new(),
            tilesets: Vec::new(),
            tile_layers: Vec::new(),
            object_layers: vec![ObjectLayer {
                name: "Objects".into(),
                z: 0,
                visible: true,
                properties: Properties::new(),
                objects,
            }],
        }
    }

    fn build(objects: Vec<MapObject>) -> Scene {
        let mut next = 1;
        Scene::build("test", map(objects), &GameConfig::default(), &Rc::new(AnimationSet::new()), &mut next)
    }

    fn portal_prop(json: &str) -> (&'static str, PropertyValue) {
        ("portal", PropertyValue::String(json.to_owned()))
    }

    #[test]
    fn parses_portal_payload() {
        let obj = object(7, Rect::new(0.0, 0.0, 16.0, 16.0), &[portal_prop(
            r#"{"targetScene":"house","spawnX":40,"spawnY":50.5}"#,
        )]);
        let p = Portal::from_object(3, &obj).expect("valid").expect("present");
        assert_eq!(p.object, 3);
        assert_eq!(p.target_scene, "house");
        assert_eq!(p.spawn_point(Vec2::ZERO), vec2(40.0, 50.5));
    }

    #[test]
    fn malformed_portal_is_an_error_not_a_panic() {
        for bad in [r#"{"spawnX":1}"#, "not json", r#"{"targetScene":""}"#] {
            let obj = object(9, Rect::new(0.0, 0.0, 16.0, 16.0), &[portal_prop(bad)]);
            assert!(matches!(
                Portal::from_object(0, &obj),
                Err(PortalError::InvalidProperty { object_id: 9, .. })
            ));
        }
        let obj = object(9, Rect::new(0.0, 0.0, 16.0, 16.0), &[("portal", PropertyValue::Bool(true))]);
        assert!(Portal::from_object(0, &obj).is_err());
    }

    #[test]
    fn invalid_portal_leaves_scene_usable() {
        let scene = build(vec![
            object(1, Rect::new(0.0, 0.0, 16.0, 16.0), &[portal_prop("{")]),
            object(2, Rect::new(32.0, 0.0, 16.0, 16.0), &[portal_prop(r#"{"targetScene":"b"}"#)]),
        ]);
        assert_eq!(scene.portals().len(), 1);
        assert_eq!(scene.portals()[0].object, 1);
    }

    #[test]
    fn missing_spawn_coordinate_keeps_current() {
        let obj = object(1, Rect::new(0.0, 0.0, 16.0, 16.0), &[portal_prop(r#"{"targetScene":"b","spawnY":9}"#)]);
        let p = Portal::from_object(0, &obj).expect("valid").expect("present");
        assert_eq!(p.spawn_point(vec2(3.0, 4.0)), vec2(3.0, 9.0));
    }

    #[test]
    fn interact_toggles_only_the_first_object_in_reach() {
        let interactive = ("interactive", PropertyValue::Bool(true));
        let mut scene = build(vec![
            object(1, Rect::new(200.0, 200.0, 16.0, 16.0), &[interactive.clone()]),
            object(2, Rect::new(40.0, 40.0, 16.0, 16.0), &[interactive.clone()]),
            object(3, Rect::new(44.0, 40.0, 16.0, 16.0), &[interactive.clone()]),
        ]);
        assert_eq!(scene.interact(vec2(48.0, 48.0), "e", 60.0), Some(1));
        assert!(!scene.objects()[1].visible);
        assert!(scene.objects()[2].visible);
        assert!(scene.objects()[0].visible);
    }

    #[test]
    fn interact_honours_radius_and_toggle_key() {
        let mut scene = build(vec![
            object(1, Rect::new(0.0, 0.0, 16.0, 16.0), &[
                ("interactive", PropertyValue::Bool(true)),
                ("toggleKey", PropertyValue::String("F".into())),
            ]),
            object(2, Rect::new(100.0, 0.0, 16.0, 16.0), &[
                ("interactive", PropertyValue::Bool(true)),
                ("radius", PropertyValue::I64(10)),
            ]),
        ]);
        assert_eq!(scene.interact(vec2(8.0, 8.0), "e", 60.0), None);
        assert_eq!(scene.interact(vec2(8.0, 8.0), "f", 60.0), Some(0));
        // 20px away from a door with a 10px radius
        assert_eq!(scene.interact(vec2(128.0, 8.0), "e", 60.0), None);
        assert_eq!(scene.interact(vec2(115.0, 8.0), "e", 60.0), Some(1));
    }

    #[test]
    fn pickups_are_collected_once() {
        let mut scene = build(vec![object(1, Rect::new(50.0, 50.0, 16.0, 16.0), &[(
            "item_type",
            PropertyValue::String("sword".into()),
        )])]);
        assert!(scene.collect_pickups(Rect::new(0.0, 0.0, 20.0, 20.0)).is_empty());
        assert_eq!(scene.collect_pickups(Rect::new(45.0, 45.0, 20.0, 20.0)), vec!["sword".to_owned()]);
        assert!(scene.collect_pickups(Rect::new(45.0, 45.0, 20.0, 20.0)).is_empty());
        assert!(scene.pickups()[0].collected);
    }

    #[test]
    fn spawn_markers_and_enemies() {
        let mut spawn = object(1, Rect::new(100.0, 100.0, 20.0, 20.0), &[]);
        spawn.kind = PLAYER_SPAWN_KIND.into();
        let mut grunt = object(2, Rect::new(200.0, 40.0, 16.0, 16.0), &[]);
        grunt.kind = ENEMY_KIND.into();
        let mut brute = object(3, Rect::new(240.0, 40.0, 16.0, 16.0), &[("health", PropertyValue::I64(80))]);
        brute.kind = ENEMY_KIND.into();

        let scene = build(vec![spawn, grunt, brute]);
        assert_eq!(scene.spawn(), vec2(110.0, 110.0));
        assert_eq!(scene.enemies.len(), 2);
        assert_eq!(scene.enemies[0].pos, vec2(208.0, 48.0));
        assert_eq!(scene.enemies[0].health.max(), GameConfig::default().enemy_health);
        assert_eq!(scene.enemies[1].health.max(), 80);
        assert_ne!(scene.enemies[0].id, scene.enemies[1].id);
    }

    #[test]
    fn scene_without_marker_uses_configured_spawn() {
        let scene = build(Vec::new());
        assert_eq!(scene.spawn(), vec2(265.0, 425.0));
    }
}
