//! Scene update loop
//!
//! Per-frame orchestration, in a fixed order:
//!
//! 1. Player pre-update (input, respawn timers, animation state machine)
//! 2. Fixed-step physics advance, then transform resync
//! 3. Animator frame advance (fade-out completion marks owners)
//! 4. Contact-event drain (accumulated during step 2)
//! 5. Destruction sweep (callback, then body, then component slots)
//! 6. Game-rule evaluation (round scoring, win, draw)
//!
//! The ordering is load-bearing: contacts collected by the physics step
//! mutate entity lifetimes only after the step returns, and the sweep
//! releases component slots only after behavior callbacks have run.

use macroquad::prelude::{Color, Vec2};
use rand::seq::SliceRandom;

use crate::arena::Arena;
use crate::input::PlayerInput;

use super::behavior::{Behavior, BehaviorEvent};
use super::components::{Animator, ComponentStore, Sprite, TextureId, COMPONENT_SLOTS};
use super::dense_map::DenseMapError;
use super::entity::{EntityId, EntityRecord};
use super::event::{AudioCue, DeathEvent, Events, RespawnEvent, ScoreEvent, ShotEvent};
use super::physics::{PhysicsWorld, FIXED_DT};
use super::player::{Player, PlayerAnim};

/// Seats at the table.
pub const MAX_PLAYERS: usize = 4;
/// Horizontal run speed, m/s.
const MOVE_SPEED: f32 = 5.0;
/// Jump launch speed, m/s.
const JUMP_SPEED: f32 = 9.5;
/// Player collision size in pixels.
const PLAYER_SIZE: Vec2 = Vec2::new(28.0, 56.0);
/// Bottle prop size in pixels.
const BOTTLE_SIZE: Vec2 = Vec2::new(12.0, 18.0);
/// Muzzle offset from the player center, pixels.
const MUZZLE_OFFSET: Vec2 = Vec2::new(18.0, -6.0);
/// Frames per player animation row.
const PLAYER_ANIM_FRAMES: u16 = 4;
/// Seconds per player animation frame.
const PLAYER_ANIM_DELAY: f32 = 0.12;
/// Longest stall we integrate in one frame before dropping time.
const MAX_FRAME_DELTA: f32 = 0.25;
/// One outfit color per seat.
const SEAT_COLORS: [Color; MAX_PLAYERS] = [
    Color::new(0.90, 0.55, 0.30, 1.0),
    Color::new(0.45, 0.65, 0.90, 1.0),
    Color::new(0.55, 0.85, 0.50, 1.0),
    Color::new(0.85, 0.50, 0.75, 1.0),
];

/// What the rules step decided this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Running,
    /// One cowboy left standing; a point was just awarded.
    RoundOver { survivor: usize },
    /// Everyone dry, nothing decided; all seats respawned.
    Draw,
    /// The match is decided.
    GameOver { winner: usize },
}

/// Everything the draw layer needs for one visible entity.
#[derive(Debug, Clone, Copy)]
pub struct RenderInstance {
    pub position: Vec2,
    pub rotation: f32,
    pub texture: TextureId,
    pub size: Vec2,
    pub color: Color,
    pub facing_left: bool,
    pub frame: u16,
    pub max_frames: u16,
    pub state: u16,
    pub states: u16,
    /// Seat index when the entity embodies a player.
    pub seat: Option<usize>,
}

pub struct Scene {
    pub registry: super::registry::Registry,
    pub store: ComponentStore,
    pub physics: PhysicsWorld,
    pub players: Vec<Player>,
    pub events: Events,
    arena: Arena,
    /// Ray length in pixels (the screen diagonal).
    bullet_range: f32,
    accumulator: f32,
    /// A point was already awarded for the round in progress.
    round_scored: bool,
    game_over: Option<usize>,
}

impl Scene {
    /// Stage a match: platforms and props become bodies and records,
    /// and `player_count` seats (clamped to 2..=4) are filled.
    pub fn new(arena: Arena, player_count: usize, bullet_range: f32) -> Result<Self, DenseMapError> {
        let mut scene = Self {
            registry: super::registry::Registry::new()?,
            store: ComponentStore::new(COMPONENT_SLOTS),
            physics: PhysicsWorld::new(),
            players: (0..MAX_PLAYERS)
                .map(|_| Player::new(arena.start_lives, arena.start_bullets))
                .collect(),
            events: Events::new(),
            arena,
            bullet_range,
            accumulator: 0.0,
            round_scored: false,
            game_over: None,
        };

        for (i, platform) in scene.arena.platforms.clone().iter().enumerate() {
            let id = EntityId::new("ground", i as u16);
            let pos = Vec2::new(platform.x, platform.y);
            let size = Vec2::new(platform.w, platform.h);
            let body = scene.physics.add_platform_body(id, pos, size);
            let mut record = EntityRecord::at(pos);
            record.body = Some(body);
            record.sprite = scene.store.attach_sprite(Sprite::new(TextureId::Planks, size));
            scene.registry.add(id, record);
        }

        for (i, &(x, y)) in scene.arena.props.clone().iter().enumerate() {
            let id = EntityId::new("bottle", i as u16);
            let pos = Vec2::new(x, y);
            let body = scene.physics.add_fragile_body(id, pos, BOTTLE_SIZE);
            let mut record = EntityRecord::at(pos);
            record.body = Some(body);
            record.sprite = scene.store.attach_sprite(Sprite::new(TextureId::Bottle, BOTTLE_SIZE));
            scene.registry.add(id, record);
        }

        let seats = player_count.clamp(2, MAX_PLAYERS);
        for slot in 0..seats {
            scene.players[slot].active = true;
            let spawn = scene.arena.spawn_points[slot % scene.arena.spawn_points.len()];
            scene.spawn_player_entity(slot, Vec2::new(spawn.0, spawn.1));
            let bullets = scene.arena.start_bullets;
            scene.players[slot].respawn(bullets);
        }

        Ok(scene)
    }

    /// Run one frame.
    pub fn tick(&mut self, dt: f32, inputs: &[PlayerInput]) -> Verdict {
        self.players_pre_update(inputs);

        // Fixed-step advance; a long stall drops time instead of
        // spiraling.
        self.accumulator = (self.accumulator + dt).min(MAX_FRAME_DELTA);
        while self.accumulator >= FIXED_DT {
            self.physics.step();
            self.accumulator -= FIXED_DT;
        }
        self.sync_transforms();

        self.advance_animators(dt);
        self.drain_contacts();
        self.sweep();
        self.evaluate_rules()
    }

    // =========================================================================
    // Step 1: players
    // =========================================================================

    fn players_pre_update(&mut self, inputs: &[PlayerInput]) {
        let default_input = PlayerInput::default();
        for slot in 0..self.players.len() {
            if !self.players[slot].active {
                continue;
            }
            let input = *inputs.get(slot).unwrap_or(&default_input);

            // Dead seats count down to their respawn.
            if !self.players[slot].alive && self.players[slot].respawn_timer > 0 {
                self.players[slot].respawn_timer -= 1;
                if self.players[slot].respawn_timer == 0 {
                    self.respawn_player(slot);
                }
            }

            let Some(id) = self.players[slot].entity else { continue };
            let Some(body) = self.registry.get(&id).and_then(|r| r.body) else { continue };

            if self.players[slot].alive {
                self.physics.drive_horizontal(body, input.move_axis * MOVE_SPEED);
                if input.move_axis.abs() > 0.01 {
                    self.players[slot].facing_left = input.move_axis < 0.0;
                }
                let vel = self.physics.linvel(body);
                if input.jump_pressed && vel.y.abs() < 0.1 {
                    self.physics.jump(body, JUMP_SPEED);
                }
                if input.fire_pressed {
                    self.fire(slot, input.aim);
                }
            }

            // Animation state machine runs for every embodied seat so a
            // corpse can settle from Hit into Dead.
            let vel = self.physics.linvel(body);
            let hit_done = self.physics.at_rest(body);
            self.players[slot].advance_anim(vel, hit_done);

            // Push the seat's state into its components.
            let anim_row = self.players[slot].anim.sheet_row();
            let facing_left = self.players[slot].facing_left;
            if let Some(record) = self.registry.get(&id) {
                if let Some(anim_slot) = record.animator {
                    if let Some(animator) = self.store.animators.get_mut(anim_slot) {
                        animator.set_state(anim_row);
                    }
                }
                if let Some(sprite_slot) = record.sprite {
                    if let Some(sprite) = self.store.sprites.get_mut(sprite_slot) {
                        sprite.facing_left = facing_left;
                    }
                }
            }
        }
    }

    /// Pull the trigger for `slot`. An empty chamber just clicks.
    pub fn fire(&mut self, slot: usize, aim: Vec2) {
        if !self.players[slot].alive {
            return;
        }
        if self.players[slot].bullets == 0 {
            self.events.audio.send(AudioCue::EMPTY);
            return;
        }
        let Some(id) = self.players[slot].entity else { return };
        let Some(record) = self.registry.get(&id) else { return };

        let facing = if self.players[slot].facing_left { -1.0 } else { 1.0 };
        let origin = record.position + Vec2::new(MUZZLE_OFFSET.x * facing, MUZZLE_OFFSET.y);
        let dir = if aim.length_squared() > f32::EPSILON {
            aim.normalize()
        } else {
            Vec2::new(facing, 0.0)
        };
        let body = record.body;

        self.players[slot].bullets -= 1;
        self.players[slot].strike_pose();

        let Some(hit) = self.physics.fire_ray(origin, dir, self.bullet_range, body) else {
            return;
        };

        self.spawn_bullet_trail(slot, origin, dir, hit.distance);
        self.spawn_muzzle_flash(origin);
        self.events.shots.send(ShotEvent { shooter: slot, origin, target: hit.entity });
        self.events.audio.send(AudioCue::SHOT);

        if let Some(target) = hit.entity {
            self.dispatch(target, BehaviorEvent::Hit { shooter: slot });
        }
    }

    /// Deliver a behavior notification to an entity. Dispatch is a tag
    /// switch over the closed behavior set.
    pub fn dispatch(&mut self, target: EntityId, event: BehaviorEvent) {
        let Some(record) = self.registry.get(&target) else { return };
        match (record.behavior, event) {
            (Behavior::Gunslinger { slot }, BehaviorEvent::Hit { shooter }) => {
                if self.players[slot].take_hit() {
                    self.events.deaths.send(DeathEvent { seat: slot, killer: Some(shooter) });
                    self.events.audio.send(AudioCue::DEATH);
                }
            }
            (Behavior::Bullet { .. }, _) | (Behavior::None, _) => {}
        }
    }

    // =========================================================================
    // Steps 2-5: physics sync, animators, contacts, sweep
    // =========================================================================

    fn sync_transforms(&mut self) {
        for (_, record) in self.registry.iter_mut() {
            if let Some(body) = record.body {
                if let Some((pos, rot)) = self.physics.body_transform(body) {
                    record.position = pos;
                    record.rotation = rot;
                }
            }
        }
    }

    fn advance_animators(&mut self, dt: f32) {
        for (_, record) in self.registry.iter_mut() {
            let Some(anim_slot) = record.animator else { continue };
            let Some(animator) = self.store.animators.get_mut(anim_slot) else { continue };
            if animator.advance(dt) {
                // A fade-out ran its course; the owner goes this frame.
                record.mark_destroy();
            }
            let alpha = animator.fade_alpha();
            if let Some(sprite_slot) = record.sprite {
                if let Some(sprite) = self.store.sprites.get_mut(sprite_slot) {
                    sprite.color.a = alpha;
                }
            }
        }
    }

    fn drain_contacts(&mut self) {
        for id in self.physics.drain_hits() {
            // Only entities still alive in the registry match; stale
            // ids from this step's events are dropped on the floor.
            if self.registry.contains(&id) {
                self.registry.mark_destroy(&id);
            }
        }
    }

    fn sweep(&mut self) {
        for id in self.registry.collect_marked() {
            // Behavior destruction callback first - it may still read
            // the entity's components.
            if let Some(record) = self.registry.get(&id) {
                match record.behavior {
                    Behavior::Gunslinger { slot } => self.players[slot].entity = None,
                    Behavior::Bullet { .. } | Behavior::None => {}
                }
            }
            if let Some(record) = self.registry.remove(&id) {
                if let Some(body) = record.body {
                    self.physics.remove_body(body);
                }
                if let Some(slot) = record.sprite {
                    self.store.sprites.free(slot);
                }
                if let Some(slot) = record.animator {
                    self.store.animators.free(slot);
                }
            }
        }
    }

    // =========================================================================
    // Step 6: rules
    // =========================================================================

    fn evaluate_rules(&mut self) -> Verdict {
        if let Some(winner) = self.game_over {
            return Verdict::GameOver { winner };
        }
        let active: Vec<usize> = (0..self.players.len())
            .filter(|&s| self.players[s].active)
            .collect();
        if active.len() < 2 {
            return Verdict::Running;
        }
        let alive: Vec<usize> = active
            .iter()
            .copied()
            .filter(|&s| self.players[s].alive)
            .collect();

        if alive.len() >= 2 {
            self.round_scored = false;
        }

        if alive.len() == 1 && !self.round_scored {
            self.round_scored = true;
            let survivor = alive[0];
            self.players[survivor].points += 1;
            let points = self.players[survivor].points;
            self.events.scores.send(ScoreEvent { seat: survivor, points });
            self.events.audio.send(AudioCue::SCORE);
            if points >= self.arena.win_points {
                self.game_over = Some(survivor);
                return Verdict::GameOver { winner: survivor };
            }
            return Verdict::RoundOver { survivor };
        }

        // Nobody can decide the round with every chamber empty.
        if alive.len() >= 2 && active.iter().all(|&s| self.players[s].bullets == 0) {
            for &slot in &active {
                self.respawn_player(slot);
            }
            return Verdict::Draw;
        }

        Verdict::Running
    }

    // =========================================================================
    // Spawning
    // =========================================================================

    fn spawn_player_entity(&mut self, slot: usize, pos: Vec2) {
        let id = EntityId::new("gunman", slot as u16);
        let body = self.physics.add_player_body(id, pos, PLAYER_SIZE);
        let mut record = EntityRecord::at(pos);
        record.body = Some(body);
        record.sprite = self
            .store
            .attach_sprite(Sprite::tinted(TextureId::Gunslinger, PLAYER_SIZE, SEAT_COLORS[slot]));
        record.animator = self.store.attach_animator(Animator::looping(
            PlayerAnim::Idle.sheet_row(),
            PlayerAnim::ROWS,
            PLAYER_ANIM_FRAMES,
            PLAYER_ANIM_DELAY,
        ));
        record.behavior = Behavior::Gunslinger { slot };
        self.registry.add(id, record);
        self.players[slot].entity = Some(id);
    }

    /// Bring a seat back: reload, grant immunity, drop at a spawn point.
    pub fn respawn_player(&mut self, slot: usize) {
        let bullets = self.arena.start_bullets;
        let pos = self.pick_spawn();
        self.players[slot].respawn(bullets);
        match self.players[slot].entity {
            Some(id) => {
                if let Some(body) = self.registry.get(&id).and_then(|r| r.body) {
                    self.physics.teleport(body, pos);
                }
            }
            None => self.spawn_player_entity(slot, pos),
        }
        self.events.respawns.send(RespawnEvent { seat: slot, position: pos });
        self.events.audio.send(AudioCue::RESPAWN);
    }

    fn pick_spawn(&self) -> Vec2 {
        let mut rng = rand::thread_rng();
        let &(x, y) = self
            .arena
            .spawn_points
            .choose(&mut rng)
            .expect("validated arenas have at least one spawn point");
        Vec2::new(x, y)
    }

    /// Visual trail for a fired round: a thin quad from the muzzle to
    /// the hit point that fades out and destroys itself.
    pub fn spawn_bullet_trail(&mut self, owner: usize, origin: Vec2, dir: Vec2, length: f32) -> EntityId {
        let id = self.registry.next_transient("bullet");
        let mut record = EntityRecord::at(origin + dir * (length / 2.0));
        record.rotation = dir.y.atan2(dir.x);
        record.sprite = self
            .store
            .attach_sprite(Sprite::new(TextureId::Bullet, Vec2::new(length, 3.0)));
        record.animator = self.store.attach_animator(Animator::fade_out(6, 0.03));
        record.behavior = Behavior::Bullet { owner };
        self.registry.add(id, record);
        id
    }

    fn spawn_muzzle_flash(&mut self, pos: Vec2) {
        let id = self.registry.next_transient("flash");
        let mut record = EntityRecord::at(pos);
        record.sprite = self
            .store
            .attach_sprite(Sprite::new(TextureId::MuzzleFlash, Vec2::new(16.0, 16.0)));
        record.animator = self.store.attach_animator(Animator::fade_out(5, 0.02));
        self.registry.add(id, record);
    }

    // =========================================================================
    // Draw extraction
    // =========================================================================

    /// Where the camera should look for a seat, if it is embodied.
    pub fn player_position(&self, slot: usize) -> Option<Vec2> {
        let id = self.players.get(slot)?.entity?;
        self.registry.get(&id).map(|r| r.position)
    }

    /// Snapshot of every visible entity for the draw layer.
    pub fn render_instances(&self) -> Vec<RenderInstance> {
        let mut out = Vec::with_capacity(self.registry.len());
        for (_, record) in self.registry.iter() {
            let Some(sprite_slot) = record.sprite else { continue };
            let Some(sprite) = self.store.sprites.get(sprite_slot) else { continue };
            let (frame, max_frames, state, states) = record
                .animator
                .and_then(|slot| self.store.animators.get(slot))
                .map(|a| (a.frame, a.max_frames, a.state, a.states))
                .unwrap_or((0, 1, 0, 1));
            out.push(RenderInstance {
                position: record.position,
                rotation: record.rotation,
                texture: sprite.texture,
                size: sprite.size,
                color: sprite.color,
                facing_left: sprite.facing_left,
                frame,
                max_frames,
                state,
                states,
                seat: record.behavior.gunslinger_slot(),
            });
        }
        out
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn bullet_range(&self) -> f32 {
        self.bullet_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    fn test_scene(seats: usize) -> Scene {
        let mut scene = Scene::new(Arena::default(), seats, 2000.0).unwrap();
        // Strip spawn immunity so hits land immediately in tests.
        for player in &mut scene.players {
            player.respawning = 0;
        }
        scene
    }

    #[test]
    fn test_survivor_scores_exactly_once() {
        let mut scene = test_scene(4);
        for slot in 0..3 {
            assert!(scene.players[slot].take_hit());
        }
        let verdict = scene.tick(FIXED_DT, &[]);
        assert_eq!(verdict, Verdict::RoundOver { survivor: 3 });
        assert_eq!(scene.players[3].points, 1);

        // The following frame does not award again.
        let verdict = scene.tick(FIXED_DT, &[]);
        assert_eq!(verdict, Verdict::Running);
        assert_eq!(scene.players[3].points, 1);
    }

    #[test]
    fn test_win_threshold_ends_match() {
        let mut scene = test_scene(2);
        scene.players[0].points = scene.arena().win_points - 1;
        scene.players[1].take_hit();
        let verdict = scene.tick(FIXED_DT, &[]);
        assert_eq!(verdict, Verdict::GameOver { winner: 0 });
        // Decided stays decided.
        assert_eq!(scene.tick(FIXED_DT, &[]), Verdict::GameOver { winner: 0 });
    }

    #[test]
    fn test_marked_entity_gone_next_frame() {
        let mut scene = test_scene(2);
        let sprites_before = scene.store.sprites.len();
        let id = scene.spawn_bullet_trail(0, Vec2::new(100.0, 100.0), Vec2::new(1.0, 0.0), 300.0);
        assert!(scene.registry.contains(&id));

        scene.registry.mark_destroy(&id);
        scene.tick(FIXED_DT, &[]);

        assert!(!scene.registry.contains(&id));
        // Its component slots are allocatable again.
        assert_eq!(scene.store.sprites.len(), sprites_before);
    }

    #[test]
    fn test_fade_out_destroys_trail() {
        let mut scene = test_scene(2);
        let id = scene.spawn_bullet_trail(0, Vec2::new(100.0, 100.0), Vec2::new(1.0, 0.0), 300.0);
        // 6 frames at 0.03s: gone in well under a second of ticks.
        for _ in 0..60 {
            scene.tick(FIXED_DT, &[]);
        }
        assert!(!scene.registry.contains(&id));
    }

    #[test]
    fn test_respawn_immunity_swallows_dispatch() {
        let mut scene = test_scene(2);
        scene.players[1].respawning = 30;
        let target = scene.players[1].entity.unwrap();
        scene.dispatch(target, BehaviorEvent::Hit { shooter: 0 });
        assert!(scene.players[1].alive);
        assert!(scene.events.deaths.is_empty());

        scene.players[1].respawning = 0;
        scene.dispatch(target, BehaviorEvent::Hit { shooter: 0 });
        assert!(!scene.players[1].alive);
        assert_eq!(scene.events.deaths.len(), 1);
    }

    #[test]
    fn test_empty_chamber_clicks() {
        let mut scene = test_scene(2);
        scene.players[0].bullets = 0;
        scene.fire(0, Vec2::new(1.0, 0.0));
        let cues: Vec<_> = scene.events.audio.iter().copied().collect();
        assert_eq!(cues, vec![AudioCue::EMPTY]);
        assert!(scene.events.shots.is_empty());
    }

    #[test]
    fn test_fire_consumes_ammo_and_spawns_trail() {
        let mut scene = test_scene(2);
        let before = scene.registry.len();
        let ammo = scene.players[0].bullets;
        scene.fire(0, Vec2::new(1.0, 0.0));
        assert_eq!(scene.players[0].bullets, ammo - 1);
        // Trail and muzzle flash both joined the registry.
        assert_eq!(scene.registry.len(), before + 2);
        assert_eq!(scene.events.shots.len(), 1);
    }

    #[test]
    fn test_all_dry_is_a_draw() {
        let mut scene = test_scene(2);
        scene.players[0].bullets = 0;
        scene.players[1].bullets = 0;
        let verdict = scene.tick(FIXED_DT, &[]);
        assert_eq!(verdict, Verdict::Draw);
        // Everyone reloaded and immune.
        assert_eq!(scene.players[0].bullets, scene.arena().start_bullets);
        assert!(scene.players[0].respawning > 0);
        assert!(scene.players[1].alive);
    }

    #[test]
    fn test_ray_kill_through_dispatch() {
        let mut scene = test_scene(2);
        // Stand the shooter and the target on the same height, well
        // clear of scenery, and shoot straight right.
        let shooter_body = scene
            .registry
            .get(&scene.players[0].entity.unwrap())
            .and_then(|r| r.body)
            .unwrap();
        let target_body = scene
            .registry
            .get(&scene.players[1].entity.unwrap())
            .and_then(|r| r.body)
            .unwrap();
        scene.physics.teleport(shooter_body, Vec2::new(100.0, 100.0));
        scene.physics.teleport(target_body, Vec2::new(400.0, 100.0));
        // One substep so the colliders follow their teleported bodies.
        scene.physics.step();
        scene.sync_transforms();

        scene.players[0].facing_left = false;
        scene.fire(0, Vec2::new(1.0, 0.0));
        assert!(!scene.players[1].alive, "ray hit clears the alive flag");
    }
}
