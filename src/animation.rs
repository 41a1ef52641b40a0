//! Per-entity animation state machine.
//!
//! Locomotion states (`Idle`, `Walk`, `Run`) follow movement intent every
//! frame. Every other state plays its clip to the end and ignores new
//! triggers meanwhile; a trigger that arrives while busy is dropped, never
//! queued. `Death` never leaves.

use macroquad::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::rc::Rc;

/// What an entity is doing; selects the clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Standing still.
    Idle,
    /// Moving at walking speed.
    Walk,
    /// Moving with the run modifier held.
    Run,
    /// Melee swing. Plays to the end.
    Attack,
    /// Ranged shot. The arrow leaves when the clip ends.
    Shot,
    /// Flinch after taking damage.
    Hurt,
    /// Terminal.
    Death,
}

impl Action {
    /// Locomotion states give way to any trigger.
    pub fn is_interruptible(self) -> bool {
        matches!(self, Action::Idle | Action::Walk | Action::Run)
    }

    /// Only `Death`.
    pub fn is_terminal(self) -> bool {
        self == Action::Death
    }
}

/// Cardinal direction a sprite faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Up the screen.
    North,
    /// Down the screen.
    South,
    /// Right.
    East,
    /// Left.
    West,
}

impl Facing {
    /// Unit vector in screen coordinates (y down).
    pub fn vector(self) -> Vec2 {
        match self {
            Facing::North => vec2(0.0, -1.0),
            Facing::South => vec2(0.0, 1.0),
            Facing::East => vec2(1.0, 0.0),
            Facing::West => vec2(-1.0, 0.0),
        }
    }

    /// `East` or `West`.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Facing::East | Facing::West)
    }

    /// Dominant axis of `dir`; ties go to the horizontal axis.
    pub fn from_vector(dir: Vec2) -> Option<Facing> {
        if dir.x == 0.0 && dir.y == 0.0 {
            return None;
        }
        Some(if dir.x.abs() >= dir.y.abs() {
            if dir.x > 0.0 { Facing::East } else { Facing::West }
        } else if dir.y > 0.0 {
            Facing::South
        } else {
            Facing::North
        })
    }
}

/// One image of a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Region of the sprite sheet.
    pub region: Rect,
    /// Seconds.
    pub duration: f32,
}

const MIN_FRAME_SECS: f32 = 0.001;

/// Ordered frames for one action and facing.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    /// Played in order.
    pub frames: Vec<Frame>,
    /// Restarts instead of finishing.
    pub looping: bool,
    /// Frame at which an attack starts landing hits.
    pub hit_frame: usize,
}

impl Clip {
    /// Frame durations are floored to 1ms so a clip always advances.
    pub fn new(mut frames: Vec<Frame>, looping: bool) -> Self {
        for f in &mut frames {
            f.duration = f.duration.max(MIN_FRAME_SECS);
        }
        let hit_frame = frames.len() / 2;
        Clip {
            frames,
            looping,
            hit_frame,
        }
    }

    /// Clamped to the last frame.
    pub fn with_hit_frame(mut self, hit_frame: usize) -> Self {
        self.hit_frame = hit_frame.min(self.frames.len().saturating_sub(1));
        self
    }

    /// Seconds for one pass through every frame.
    pub fn duration(&self) -> f32 {
        self.frames.iter().map(|f| f.duration).sum()
    }
}

#[derive(Deserialize)]
struct JsonDescriptor {
    clips: Vec<JsonClip>,
}

#[derive(Deserialize)]
struct JsonClip {
    action: Action,
    facing: Facing,
    #[serde(default)]
    looping: bool,
    #[serde(default)]
    hit_frame: Option<usize>,
    frames: Vec<JsonFrame>,
}

#[derive(Deserialize)]
struct JsonFrame {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    #[serde(default = "default_frame_ms")]
    duration_ms: f32,
}

fn default_frame_ms() -> f32 {
    100.0
}

/// Every clip an entity type owns, keyed by action and facing.
#[derive(Debug, Clone, Default)]
pub struct AnimationSet {
    clips: HashMap<(Action, Facing), Clip>,
}

impl AnimationSet {
    /// Empty set; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an animation descriptor:
    /// `{"clips":[{"action":"walk","facing":"east","looping":true,
    ///   "frames":[{"x":0,"y":0,"w":32,"h":32,"duration_ms":100}]}]}`
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let desc: JsonDescriptor = serde_json::from_str(json)?;
        let mut set = AnimationSet::new();
        for c in desc.clips {
            let frames = c
                .frames
                .into_iter()
                .map(|f| Frame {
                    region: Rect::new(f.x, f.y, f.w, f.h),
                    duration: f.duration_ms / 1000.0,
                })
                .collect();
            let mut clip = Clip::new(frames, c.looping);
            if let Some(hit) = c.hit_frame {
                clip = clip.with_hit_frame(hit);
            }
            set.insert(c.action, c.facing, clip);
        }
        Ok(set)
    }

    /// Adds or replaces the clip for `action` facing `facing`.
    pub fn insert(&mut self, action: Action, facing: Facing, clip: Clip) {
        self.clips.insert((action, facing), clip);
    }

    /// North/south clips fall back to the left/right variant of the last
    /// horizontal facing.
    pub fn clip(&self, action: Action, facing: Facing, horizontal: Facing) -> Option<&Clip> {
        self.clips
            .get(&(action, facing))
            .or_else(|| self.clips.get(&(action, horizontal)))
    }

    /// Number of clips.
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// No clips at all.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// What the entity wants to do with its legs this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionIntent {
    /// Non-zero movement intent.
    pub moving: bool,
    /// Run modifier held.
    pub running: bool,
}

impl MotionIntent {
    fn locomotion(self) -> Action {
        match (self.moving, self.running) {
            (false, _) => Action::Idle,
            (true, false) => Action::Walk,
            (true, true) => Action::Run,
        }
    }
}

/// Reported by [`AnimationController::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimEvent {
    /// A non-looping clip played its last frame.
    Finished(Action),
}

/// Current action, facing and frame of one entity.
#[derive(Debug, Clone)]
pub struct AnimationController {
    set: Rc<AnimationSet>,
    action: Action,
    facing: Facing,
    last_horizontal: Facing,
    frame: usize,
    frame_time: f32,
    clip_time: f32,
    death_done: bool,
}

impl AnimationController {
    /// Starts idle, facing east.
    pub fn new(set: Rc<AnimationSet>) -> Self {
        AnimationController {
            set,
            action: Action::Idle,
            facing: Facing::East,
            last_horizontal: Facing::East,
            frame: 0,
            frame_time: 0.0,
            clip_time: 0.0,
            death_done: false,
        }
    }

    /// Action currently playing.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Last facing set by [`AnimationController::face`].
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Last of `East`/`West`; picks the sprite for vertical movement.
    pub fn last_horizontal(&self) -> Facing {
        self.last_horizontal
    }

    /// Index into the current clip.
    pub fn frame_index(&self) -> usize {
        self.frame
    }

    /// Seconds since the current clip started.
    pub fn clip_time(&self) -> f32 {
        self.clip_time
    }

    /// A new trigger would be accepted.
    pub fn is_interruptible(&self) -> bool {
        self.action.is_interruptible()
    }

    /// Death was entered. Stays true.
    pub fn is_dead(&self) -> bool {
        self.action.is_terminal()
    }

    /// The death clip has played out; the owner can be removed.
    pub fn death_finished(&self) -> bool {
        self.death_done
    }

    fn clip(&self) -> Option<&Clip> {
        self.set.clip(self.action, self.facing, self.last_horizontal)
    }

    /// `None` when the set has no clip for the current action.
    pub fn current_frame(&self) -> Option<&Frame> {
        self.clip().and_then(|c| c.frames.get(self.frame))
    }

    /// Turns towards `dir`. Ignored while a committed action plays, so an
    /// attack keeps its facing. Vertical movement leaves the last horizontal
    /// facing alone.
    pub fn face(&mut self, dir: Vec2) {
        if !self.is_interruptible() {
            return;
        }
        if let Some(f) = Facing::from_vector(dir) {
            self.facing = f;
        }
        if dir.x > 0.0 {
            self.last_horizontal = Facing::East;
        } else if dir.x < 0.0 {
            self.last_horizontal = Facing::West;
        }
    }

    fn enter(&mut self, action: Action) {
        self.action = action;
        self.frame = 0;
        self.frame_time = 0.0;
        self.clip_time = 0.0;
    }

    /// Requests `Attack` or `Shot`. Returns false (and drops the request)
    /// while another committed action is playing.
    pub fn trigger(&mut self, action: Action) -> bool {
        if !matches!(action, Action::Attack | Action::Shot) || !self.is_interruptible() {
            return false;
        }
        self.enter(action);
        true
    }

    /// Plays the hurt clip. Damage is not input, so this cuts into anything
    /// but death.
    pub fn hurt(&mut self) -> bool {
        if self.is_dead() {
            return false;
        }
        self.enter(Action::Hurt);
        true
    }

    /// Enters the terminal state. Returns true only the first time.
    pub fn kill(&mut self) -> bool {
        if self.is_dead() {
            return false;
        }
        self.enter(Action::Death);
        true
    }

    /// Advances by `dt` seconds.
    pub fn update(&mut self, dt: f32, intent: MotionIntent) -> Option<AnimEvent> {
        if self.is_interruptible() {
            let wanted = intent.locomotion();
            if wanted != self.action {
                self.enter(wanted);
            }
        }
        if self.death_done {
            return None;
        }

        self.clip_time += dt;
        let completed = match self.clip() {
            Some(clip) if !clip.frames.is_empty() => {
                let (frame, time, done) = advance(clip, self.frame, self.frame_time + dt);
                self.frame = frame;
                self.frame_time = time;
                done
            }
            // no clip: committed actions finish at once
            _ => !self.is_interruptible(),
        };

        if !completed {
            return None;
        }
        let finished = self.action;
        if finished.is_terminal() {
            self.death_done = true;
        } else {
            self.enter(intent.locomotion());
        }
        Some(AnimEvent::Finished(finished))
    }

    /// True while an attack clip is at or past its hit frame.
    pub fn in_hit_window(&self) -> bool {
        if self.action != Action::Attack {
            return false;
        }
        match self.clip() {
            Some(clip) => self.frame >= clip.hit_frame,
            None => true,
        }
    }
}

/// Returns the new frame, time spent in it, and whether a non-looping clip ended.
fn advance(clip: &Clip, mut frame: usize, mut time: f32) -> (usize, f32, bool) {
    let last = clip.frames.len() - 1;
    frame = frame.min(last);
    loop {
        let dur = clip.frames[frame].duration.max(MIN_FRAME_SECS);
        if time < dur {
            return (frame, time, false);
        }
        time -= dur;
        if frame < last {
            frame += 1;
        } else if clip.looping {
            frame = 0;
        } else {
            return (last, 0.0, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(n: usize, secs: f32, looping: bool) -> Clip {
        Clip::new(
            (0..n)
                .map(|i| Frame {
                    region: Rect::new(i as f32 * 16.0, 0.0, 16.0, 16.0),
                    duration: secs,
                })
                .collect(),
            looping,
        )
    }

    fn set() -> Rc<AnimationSet> {
        let mut set = AnimationSet::new();
        for f in [Facing::East, Facing::West] {
            set.insert(Action::Idle, f, clip(2, 0.2, true));
            set.insert(Action::Walk, f, clip(4, 0.1, true));
            set.insert(Action::Run, f, clip(4, 0.05, true));
            set.insert(Action::Attack, f, clip(4, 0.1, false));
            set.insert(Action::Shot, f, clip(3, 0.1, false));
            set.insert(Action::Hurt, f, clip(2, 0.1, false));
            set.insert(Action::Death, f, clip(3, 0.1, false));
        }
        Rc::new(set)
    }

    const WALK: MotionIntent = MotionIntent { moving: true, running: false };
    const RUN: MotionIntent = MotionIntent { moving: true, running: true };
    const STILL: MotionIntent = MotionIntent { moving: false, running: false };

    #[test]
    fn locomotion_follows_intent_every_frame() {
        let mut a = AnimationController::new(set());
        a.update(0.01, WALK);
        assert_eq!(a.action(), Action::Walk);
        a.update(0.01, RUN);
        assert_eq!(a.action(), Action::Run);
        a.update(0.01, STILL);
        assert_eq!(a.action(), Action::Idle);
    }

    #[test]
    fn looping_clip_wraps() {
        let mut a = AnimationController::new(set());
        a.update(0.0, WALK);
        a.update(0.35, WALK);
        assert_eq!(a.frame_index(), 3);
        a.update(0.1, WALK);
        assert_eq!(a.frame_index(), 0);
    }

    #[test]
    fn attack_ignores_movement_until_clip_ends() {
        let mut a = AnimationController::new(set());
        assert!(a.trigger(Action::Attack));
        assert_eq!(a.update(0.15, RUN), None);
        assert_eq!(a.action(), Action::Attack);
        assert!(!a.trigger(Action::Shot));
        assert_eq!(a.update(0.3, RUN), Some(AnimEvent::Finished(Action::Attack)));
        assert_eq!(a.action(), Action::Run);
    }

    #[test]
    fn shot_retrigger_while_busy_is_dropped() {
        let mut a = AnimationController::new(set());
        assert!(a.trigger(Action::Shot));
        a.update(0.1, STILL);
        assert!(!a.trigger(Action::Shot));
        let mut finished = 0;
        for _ in 0..10 {
            if let Some(AnimEvent::Finished(Action::Shot)) = a.update(0.1, STILL) {
                finished += 1;
            }
        }
        assert_eq!(finished, 1);
        assert_eq!(a.action(), Action::Idle);
    }

    #[test]
    fn attack_locks_facing() {
        let mut a = AnimationController::new(set());
        a.face(vec2(-1.0, 0.0));
        assert_eq!(a.facing(), Facing::West);
        a.trigger(Action::Attack);
        a.face(vec2(1.0, 0.0));
        assert_eq!(a.facing(), Facing::West);
    }

    #[test]
    fn vertical_movement_keeps_last_horizontal() {
        let mut a = AnimationController::new(set());
        a.face(vec2(-1.0, 0.0));
        a.face(vec2(0.0, 1.0));
        assert_eq!(a.facing(), Facing::South);
        assert_eq!(a.last_horizontal(), Facing::West);
        // south clip falls back to the west variant
        a.update(0.0, WALK);
        assert_eq!(a.current_frame().map(|f| f.region.x), Some(0.0));
        assert!(a.clip().is_some());
    }

    #[test]
    fn hit_window_opens_at_hit_frame() {
        let mut a = AnimationController::new(set());
        a.trigger(Action::Attack);
        a.update(0.05, STILL);
        assert!(!a.in_hit_window());
        a.update(0.1, STILL);
        assert!(!a.in_hit_window());
        a.update(0.1, STILL);
        assert!(a.in_hit_window());
    }

    #[test]
    fn death_is_terminal_and_reports_once() {
        let mut a = AnimationController::new(set());
        assert!(a.kill());
        assert!(!a.kill());
        assert!(!a.trigger(Action::Attack));
        assert!(!a.hurt());
        let mut events = Vec::new();
        for _ in 0..10 {
            events.extend(a.update(0.1, WALK));
        }
        assert_eq!(events, vec![AnimEvent::Finished(Action::Death)]);
        assert!(a.death_finished());
        assert_eq!(a.action(), Action::Death);
    }

    #[test]
    fn missing_clip_finishes_committed_action_immediately() {
        let mut a = AnimationController::new(Rc::new(AnimationSet::new()));
        assert!(a.trigger(Action::Shot));
        assert_eq!(a.update(0.016, STILL), Some(AnimEvent::Finished(Action::Shot)));
        assert_eq!(a.update(0.016, WALK), None);
        assert_eq!(a.action(), Action::Walk);
    }

    #[test]
    fn parses_descriptor() {
        let json = r#"{"clips":[
          {"action":"attack","facing":"north","hit_frame":1,
           "frames":[{"x":0,"y":0,"w":32,"h":32,"duration_ms":50},
                     {"x":32,"y":0,"w":32,"h":32}]}
        ]}"#;
        let set = AnimationSet::from_json_str(json).expect("descriptor");
        let c = set.clip(Action::Attack, Facing::North, Facing::East).expect("clip");
        assert_eq!(c.hit_frame, 1);
        assert!(!c.looping);
        assert!((c.duration() - 0.15).abs() < 1e-6);
    }
}
