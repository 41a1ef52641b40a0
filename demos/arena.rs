use anyhow::Context;
use macroquad::prelude::*;
use macroquad_tiled_world::render::{draw_collision_overlay, draw_entity, draw_projectile, MapRenderer};
use macroquad_tiled_world::{load_map_file, AnimationSet, DebugCommand, FrameInput, GameConfig, World};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

const SCENES: [&str; 3] = ["world", "house", "dungeon"];

fn window_conf() -> Conf {
    Conf {
        window_title: "Arena".into(),
        window_width: 600,
        window_height: 600,
        ..Default::default()
    }
}

fn load_anims(path: &str) -> Rc<AnimationSet> {
    let set = std::fs::read_to_string(path)
        .context("reading animation descriptor")
        .and_then(|txt| AnimationSet::from_json_str(&txt).context("parsing animation descriptor"));
    match set {
        Ok(set) => Rc::new(set),
        Err(e) => {
            log::warn!("{path}: {e:#}; drawing placeholders");
            Rc::new(AnimationSet::new())
        }
    }
}

fn read_input(cfg: &GameConfig) -> FrameInput {
    let axis = |neg: &[KeyCode], pos: &[KeyCode]| {
        let n = neg.iter().any(|k| is_key_down(*k)) as i32;
        let p = pos.iter().any(|k| is_key_down(*k)) as i32;
        (p - n) as f32
    };
    let interact_key = match cfg.interact_key.as_str() {
        "f" => KeyCode::F,
        "q" => KeyCode::Q,
        _ => KeyCode::E,
    };
    FrameInput {
        direction: vec2(
            axis(&[KeyCode::A, KeyCode::Left], &[KeyCode::D, KeyCode::Right]),
            axis(&[KeyCode::W, KeyCode::Up], &[KeyCode::S, KeyCode::Down]),
        ),
        run: is_key_down(KeyCode::LeftShift),
        attack: is_key_pressed(KeyCode::Space),
        shoot: is_key_pressed(KeyCode::X),
        interact: is_key_pressed(interact_key),
        show_inventory: is_key_down(KeyCode::R),
    }
}

fn debug_command() -> Option<DebugCommand> {
    let teleports = [KeyCode::F1, KeyCode::F2, KeyCode::F3];
    let switches = [KeyCode::Key1, KeyCode::Key2, KeyCode::Key3];
    for (i, id) in SCENES.iter().enumerate() {
        if is_key_pressed(teleports[i]) {
            return Some(DebugCommand::TeleportTo((*id).to_owned()));
        }
        if is_key_pressed(switches[i]) {
            return Some(DebugCommand::SwitchTo((*id).to_owned()));
        }
    }
    if is_key_pressed(KeyCode::C) {
        return Some(DebugCommand::ToggleCollisionOverlay);
    }
    if is_key_pressed(KeyCode::Equal) {
        return Some(DebugCommand::AdjustCollisionMargin(1));
    }
    if is_key_pressed(KeyCode::Minus) {
        return Some(DebugCommand::AdjustCollisionMargin(-1));
    }
    None
}

#[macroquad::main(window_conf)]
async fn main() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
    if let Err(e) = run().await {
        log::error!("{e:#}");
    }
}

async fn run() -> anyhow::Result<()> {
    let config = if Path::new("assets/config.json").exists() {
        GameConfig::load("assets/config.json")?
    } else {
        GameConfig::default()
    };

    let mut world = World::new(
        config,
        load_anims("assets/player_anims.json"),
        load_anims("assets/enemy_anims.json"),
    );

    let mut renderers = HashMap::new();
    for id in SCENES {
        let path = format!("assets/{id}.json");
        // a broken scene is skipped; the rest stay playable
        let (map, dir) = match load_map_file(&path) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!("scene '{id}' unavailable: {e}");
                continue;
            }
        };
        renderers.insert(id, MapRenderer::load(&map, &dir).await?);
        world.scenes.register(id, map);
    }
    world
        .start(SCENES[0])
        .with_context(|| format!("starting scene '{}'", SCENES[0]))?;

    let player_sheet = load_texture("assets/player.png").await.ok();
    let enemy_sheet = load_texture("assets/enemy.png").await.ok();

    loop {
        let dt = get_frame_time();
        if let Some(cmd) = debug_command() {
            if let Err(e) = world.debug(cmd) {
                log::warn!("{e}");
            }
        }
        let input = read_input(world.config());
        world.update(dt, &input);

        clear_background(BLACK);
        let view = world.camera.visible_rect();
        set_camera(&world.camera.to_camera2d());
        if let Some(scene) = world.scenes.active() {
            if let Some(r) = renderers.get(scene.id()) {
                r.draw_tiles(scene, view);
                r.draw_objects(scene, view);
            }
            for e in &scene.enemies {
                draw_entity(e, enemy_sheet.as_ref(), MAROON);
            }
            draw_entity(&world.scenes.player, player_sheet.as_ref(), SKYBLUE);
            for p in world.projectiles.active() {
                draw_projectile(p);
            }
            if world.show_collision {
                draw_collision_overlay(scene, &world.scenes.player, world.collision_margin());
            }
        }
        set_default_camera();

        let player = &world.scenes.player;
        draw_text(
            &format!(
                "scene: {}  hp: {}/{}  margin: {}",
                world.scenes.active_id().unwrap_or("-"),
                player.health.current(),
                player.health.max(),
                world.collision_margin()
            ),
            10.0,
            20.0,
            20.0,
            WHITE,
        );
        if world.scenes.inventory.visible {
            let inv = &world.scenes.inventory;
            for i in 0..inv.slot_count() {
                let x = 10.0 + i as f32 * 44.0;
                draw_rectangle_lines(x, 40.0, 40.0, 40.0, 2.0, WHITE);
                if let Some(item) = inv.items().get(i) {
                    let label: String = item.chars().take(4).collect();
                    draw_text(&label, x + 4.0, 64.0, 16.0, YELLOW);
                }
            }
        }

        next_frame().await;
    }
}
