//! Application state and match flow
//!
//! The scene decides rounds; the app decides what the match does about
//! it: banners, the game-over slow-motion sequence, camera focus, and
//! the rematch. All state here is presentation-adjacent - the scene
//! never reads it.

use crate::game::Verdict;

/// Frames a round/draw banner stays up.
const BANNER_FRAMES: u32 = 90;
/// During game over the scene ticks once every this many frames.
const SLOWMO_DIVISOR: u32 = 4;

/// Match phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Playing,
    /// A point was just scored; brief banner, play continues.
    RoundBanner { survivor: usize, frames_left: u32 },
    /// Everyone ran dry; brief banner, play continues.
    DrawBanner { frames_left: u32 },
    /// Match decided: slow motion, camera on the winner.
    GameOver { winner: usize },
}

pub struct App {
    pub phase: Phase,
    frame_counter: u32,
}

impl App {
    pub fn new() -> Self {
        Self {
            phase: Phase::Playing,
            frame_counter: 0,
        }
    }

    /// Fold this frame's scene verdict into the match phase.
    pub fn apply(&mut self, verdict: Verdict) {
        self.phase = match (self.phase, verdict) {
            (_, Verdict::GameOver { winner }) => Phase::GameOver { winner },
            (Phase::GameOver { winner }, _) => Phase::GameOver { winner },
            (_, Verdict::RoundOver { survivor }) => Phase::RoundBanner {
                survivor,
                frames_left: BANNER_FRAMES,
            },
            (_, Verdict::Draw) => Phase::DrawBanner { frames_left: BANNER_FRAMES },
            (Phase::RoundBanner { survivor, frames_left }, Verdict::Running) if frames_left > 0 => {
                Phase::RoundBanner { survivor, frames_left: frames_left - 1 }
            }
            (Phase::DrawBanner { frames_left }, Verdict::Running) if frames_left > 0 => {
                Phase::DrawBanner { frames_left: frames_left - 1 }
            }
            (_, Verdict::Running) => Phase::Playing,
        };
        self.frame_counter = self.frame_counter.wrapping_add(1);
    }

    /// Whether the scene should advance this frame. Game over runs in
    /// slow motion; everything else runs every frame.
    pub fn should_tick(&self) -> bool {
        match self.phase {
            Phase::GameOver { .. } => self.frame_counter % SLOWMO_DIVISOR == 0,
            _ => true,
        }
    }

    /// Seat the camera should chase, if the phase pins one.
    pub fn focus_seat(&self) -> Option<usize> {
        match self.phase {
            Phase::GameOver { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::GameOver { .. })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_over_is_sticky() {
        let mut app = App::new();
        app.apply(Verdict::GameOver { winner: 2 });
        app.apply(Verdict::Running);
        app.apply(Verdict::RoundOver { survivor: 0 });
        assert_eq!(app.phase, Phase::GameOver { winner: 2 });
        assert_eq!(app.focus_seat(), Some(2));
    }

    #[test]
    fn test_round_banner_counts_down() {
        let mut app = App::new();
        app.apply(Verdict::RoundOver { survivor: 1 });
        assert!(matches!(app.phase, Phase::RoundBanner { survivor: 1, .. }));
        for _ in 0..BANNER_FRAMES + 1 {
            app.apply(Verdict::Running);
        }
        assert_eq!(app.phase, Phase::Playing);
    }

    #[test]
    fn test_slow_motion_only_during_game_over() {
        let mut app = App::new();
        assert!(app.should_tick());
        app.apply(Verdict::GameOver { winner: 0 });
        let ticks: u32 = (0..60)
            .map(|_| {
                let t = app.should_tick() as u32;
                app.apply(Verdict::Running);
                t
            })
            .sum();
        assert!(ticks <= 60 / SLOWMO_DIVISOR + 1, "ticked {} of 60", ticks);
    }
}
