//! Player roster state and the animation state machine
//!
//! One `Player` per seat. The animation state machine is driven by the
//! body's velocity each frame, plus the alive flag for the hit/death
//! path. Respawning grants a short immunity window during which hit
//! notifications are ignored.

use macroquad::prelude::Vec2;

use super::entity::EntityId;

/// |vertical velocity| above this reads as airborne (m/s).
pub const VERTICAL_THRESHOLD: f32 = 0.8;
/// |horizontal velocity| above this reads as running (m/s).
pub const HORIZONTAL_THRESHOLD: f32 = 0.3;
/// Ticks of post-respawn immunity.
pub const IMMUNITY_TICKS: u32 = 90;
/// Ticks between death and respawn.
pub const RESPAWN_DELAY_TICKS: u32 = 120;
/// Ticks the shooting pose is held after a trigger pull.
pub const SHOOT_POSE_TICKS: u32 = 12;

/// Animation states, one row each in the player sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAnim {
    Idle,
    Running,
    InAir,
    ShootIdle,
    ShootRun,
    Hit,
    Dead,
}

impl PlayerAnim {
    /// Sheet row for the draw layer.
    pub fn sheet_row(self) -> u16 {
        match self {
            PlayerAnim::Idle => 0,
            PlayerAnim::Running => 1,
            PlayerAnim::InAir => 2,
            PlayerAnim::ShootIdle => 3,
            PlayerAnim::ShootRun => 4,
            PlayerAnim::Hit => 5,
            PlayerAnim::Dead => 6,
        }
    }

    /// Total rows in the player sheet.
    pub const ROWS: u16 = 7;
}

/// Per-seat match state.
pub struct Player {
    /// Seat is taken this match.
    pub active: bool,
    pub alive: bool,
    pub lives: u32,
    pub points: u32,
    /// Rounds left in the revolver.
    pub bullets: u32,
    pub anim: PlayerAnim,
    /// Immunity ticks remaining after a respawn.
    pub respawning: u32,
    /// Countdown until an eliminated player returns.
    pub respawn_timer: u32,
    pub facing_left: bool,
    /// The registry entity currently embodying this seat.
    pub entity: Option<EntityId>,
    /// Vertical threshold was exceeded; cleared when velocity settles.
    airborne_latch: bool,
    shoot_pose: u32,
}

impl Player {
    pub fn new(lives: u32, bullets: u32) -> Self {
        Self {
            active: false,
            alive: false,
            lives,
            points: 0,
            bullets,
            anim: PlayerAnim::Idle,
            respawning: 0,
            respawn_timer: 0,
            facing_left: false,
            entity: None,
            airborne_latch: false,
            shoot_pose: 0,
        }
    }

    /// A bullet connected. Returns true if the hit landed (the player
    /// dies); false if the immunity window swallowed it.
    pub fn take_hit(&mut self) -> bool {
        if self.respawning > 0 {
            return false;
        }
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.lives = self.lives.saturating_sub(1);
        self.respawn_timer = RESPAWN_DELAY_TICKS;
        true
    }

    /// Reset for a fresh life: airborne, alive, immune, reloaded.
    pub fn respawn(&mut self, bullets: u32) {
        self.alive = true;
        self.anim = PlayerAnim::InAir;
        self.respawning = IMMUNITY_TICKS;
        self.respawn_timer = 0;
        self.bullets = bullets;
        self.airborne_latch = true;
        self.shoot_pose = 0;
    }

    /// Hold the shooting pose for a few ticks after a trigger pull.
    pub fn strike_pose(&mut self) {
        self.shoot_pose = SHOOT_POSE_TICKS;
    }

    /// Step the state machine from the body's current velocity.
    /// `hit_done` reports that the hit animation finished a play-through
    /// or the body came to rest.
    pub fn advance_anim(&mut self, vel: Vec2, hit_done: bool) {
        self.respawning = self.respawning.saturating_sub(1);
        self.shoot_pose = self.shoot_pose.saturating_sub(1);

        if !self.alive {
            match self.anim {
                PlayerAnim::Hit => {
                    if hit_done {
                        self.anim = PlayerAnim::Dead;
                    }
                }
                PlayerAnim::Dead => {}
                _ => self.anim = PlayerAnim::Hit,
            }
            return;
        }

        let vertical = vel.y.abs();
        let horizontal = vel.x.abs();
        let running = horizontal > HORIZONTAL_THRESHOLD;

        if vertical > VERTICAL_THRESHOLD {
            self.airborne_latch = true;
            self.anim = PlayerAnim::InAir;
        } else if self.airborne_latch {
            // Velocity returned below the threshold after exceeding it.
            self.airborne_latch = false;
            self.anim = if running { PlayerAnim::Running } else { PlayerAnim::Idle };
        } else {
            self.anim = if running { PlayerAnim::Running } else { PlayerAnim::Idle };
        }

        if self.shoot_pose > 0 && matches!(self.anim, PlayerAnim::Idle | PlayerAnim::Running) {
            self.anim = if running { PlayerAnim::ShootRun } else { PlayerAnim::ShootIdle };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_player() -> Player {
        let mut p = Player::new(3, 6);
        p.active = true;
        p.respawn(6);
        p.respawning = 0;
        p.airborne_latch = false;
        p.anim = PlayerAnim::Idle;
        p
    }

    #[test]
    fn test_idle_to_in_air_on_vertical_velocity() {
        let mut p = fresh_player();
        p.advance_anim(Vec2::new(0.0, -3.0), false);
        assert_eq!(p.anim, PlayerAnim::InAir);
    }

    #[test]
    fn test_idle_to_running_on_horizontal_velocity() {
        let mut p = fresh_player();
        p.advance_anim(Vec2::new(2.0, 0.0), false);
        assert_eq!(p.anim, PlayerAnim::Running);
    }

    #[test]
    fn test_in_air_settles_to_idle_or_running() {
        let mut p = fresh_player();
        p.advance_anim(Vec2::new(0.0, 5.0), false);
        assert_eq!(p.anim, PlayerAnim::InAir);
        p.advance_anim(Vec2::new(0.1, 0.0), false);
        assert_eq!(p.anim, PlayerAnim::Idle);

        p.advance_anim(Vec2::new(0.0, 5.0), false);
        p.advance_anim(Vec2::new(2.0, 0.0), false);
        assert_eq!(p.anim, PlayerAnim::Running);
    }

    #[test]
    fn test_death_enters_hit_then_dead() {
        let mut p = fresh_player();
        assert!(p.take_hit());
        p.advance_anim(Vec2::new(0.5, 0.5), false);
        assert_eq!(p.anim, PlayerAnim::Hit);
        p.advance_anim(Vec2::ZERO, false);
        assert_eq!(p.anim, PlayerAnim::Hit, "holds until the hit anim completes");
        p.advance_anim(Vec2::ZERO, true);
        assert_eq!(p.anim, PlayerAnim::Dead);
        // Terminal until respawn.
        p.advance_anim(Vec2::new(9.0, 9.0), true);
        assert_eq!(p.anim, PlayerAnim::Dead);
    }

    #[test]
    fn test_respawn_resets_to_in_air() {
        let mut p = fresh_player();
        p.take_hit();
        p.respawn(6);
        assert!(p.alive);
        assert_eq!(p.anim, PlayerAnim::InAir);
        assert_eq!(p.respawning, IMMUNITY_TICKS);
        assert_eq!(p.bullets, 6);
    }

    #[test]
    fn test_respawn_immunity_swallows_hits() {
        let mut p = fresh_player();
        p.respawning = 10;
        assert!(!p.take_hit());
        assert!(p.alive, "immune player survives the hit event");
        p.respawning = 0;
        assert!(p.take_hit());
        assert!(!p.alive);
    }

    #[test]
    fn test_shoot_pose_overlays_idle_and_run() {
        let mut p = fresh_player();
        p.strike_pose();
        p.advance_anim(Vec2::ZERO, false);
        assert_eq!(p.anim, PlayerAnim::ShootIdle);
        p.advance_anim(Vec2::new(2.0, 0.0), false);
        assert_eq!(p.anim, PlayerAnim::ShootRun);
    }
}
