//! Render-facing components
//!
//! Sprites and animators live in fixed slabs sized once per scene;
//! entity records hold slot ids into them. Components are plain data -
//! the scene update loop is the only thing that mutates them.

use macroquad::prelude::{Color, Vec2, WHITE};

use super::slab::{FixedSlab, SlotId};

/// Slots per component slab. Sized for the largest arena plus a busy
/// firefight of trails and flashes.
pub const COMPONENT_SLOTS: usize = 500;

/// Which sprite sheet an entity samples from. The draw layer maps these
/// to loaded textures; unknown/missing textures fall back to flat quads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureId {
    Gunslinger,
    Bullet,
    MuzzleFlash,
    Planks,
    Bottle,
}

/// Visual component: what to draw at the owning entity's transform.
#[derive(Debug, Clone, Copy)]
pub struct Sprite {
    pub texture: TextureId,
    /// Quad size in pixels.
    pub size: Vec2,
    /// Tint; alpha carries fade-out.
    pub color: Color,
    pub facing_left: bool,
}

impl Sprite {
    pub fn new(texture: TextureId, size: Vec2) -> Self {
        Self {
            texture,
            size,
            color: WHITE,
            facing_left: false,
        }
    }

    pub fn tinted(texture: TextureId, size: Vec2, color: Color) -> Self {
        Self {
            texture,
            size,
            color,
            facing_left: false,
        }
    }
}

/// Silhouette tint: RGB scaled, alpha passed through.
pub fn silhouette(color: Color, factor: f32) -> Color {
    Color::new(color.r * factor, color.g * factor, color.b * factor, color.a)
}

/// How an animation terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimMode {
    /// Wrap to frame 0 forever.
    Loop,
    /// Play once and hold the last frame.
    Once,
    /// Play once; completion destroys the owning entity, and alpha
    /// fades with the frames remaining.
    FadeOut,
}

/// Frame-stepping component. Frames advance on a fixed delay cadence,
/// independent of the physics step.
#[derive(Debug, Clone, Copy)]
pub struct Animator {
    pub mode: AnimMode,
    /// Current frame within the state's row.
    pub frame: u16,
    /// Frames in the current row.
    pub max_frames: u16,
    /// Row in the sprite sheet (animation state).
    pub state: u16,
    /// Total rows in the sheet.
    pub states: u16,
    /// Seconds per frame.
    pub delay: f32,
    elapsed: f32,
    finished: bool,
}

impl Animator {
    pub fn looping(state: u16, states: u16, max_frames: u16, delay: f32) -> Self {
        Self {
            mode: AnimMode::Loop,
            frame: 0,
            max_frames,
            state,
            states,
            delay,
            elapsed: 0.0,
            finished: false,
        }
    }

    pub fn fade_out(max_frames: u16, delay: f32) -> Self {
        Self {
            mode: AnimMode::FadeOut,
            frame: 0,
            max_frames,
            state: 0,
            states: 1,
            delay,
            elapsed: 0.0,
            finished: false,
        }
    }

    /// Advance by `dt`. Returns true the moment a fade-out completes
    /// its play-through - the caller marks the owner for destruction.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.finished || self.max_frames == 0 {
            return false;
        }
        self.elapsed += dt;
        while self.elapsed >= self.delay {
            self.elapsed -= self.delay;
            if self.frame + 1 >= self.max_frames {
                match self.mode {
                    AnimMode::Loop => self.frame = 0,
                    AnimMode::Once => {
                        self.finished = true;
                        return false;
                    }
                    AnimMode::FadeOut => {
                        self.finished = true;
                        return true;
                    }
                }
            } else {
                self.frame += 1;
            }
        }
        false
    }

    /// Switch rows, restarting the frame counter. No-op if already in
    /// the requested state.
    pub fn set_state(&mut self, state: u16) {
        if state != self.state {
            self.state = state;
            self.frame = 0;
            self.elapsed = 0.0;
            self.finished = false;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Alpha for fade-outs: proportional to frames remaining.
    pub fn fade_alpha(&self) -> f32 {
        match self.mode {
            AnimMode::FadeOut => {
                (self.max_frames.saturating_sub(self.frame)) as f32 / self.max_frames.max(1) as f32
            }
            _ => 1.0,
        }
    }
}

/// The scene's component slabs.
pub struct ComponentStore {
    pub sprites: FixedSlab<Sprite>,
    pub animators: FixedSlab<Animator>,
}

impl ComponentStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            sprites: FixedSlab::new(capacity),
            animators: FixedSlab::new(capacity),
        }
    }

    /// Allocate a sprite slot, logging on exhaustion. A `None` here
    /// means the entity draws nothing; the game keeps running.
    pub fn attach_sprite(&mut self, sprite: Sprite) -> Option<SlotId> {
        let slot = self.sprites.allocate(sprite);
        if slot.is_none() {
            println!("sprite slab exhausted ({} slots), skipping attach", self.sprites.capacity());
        }
        slot
    }

    pub fn attach_animator(&mut self, animator: Animator) -> Option<SlotId> {
        let slot = self.animators.allocate(animator);
        if slot.is_none() {
            println!("animator slab exhausted ({} slots), skipping attach", self.animators.capacity());
        }
        slot
    }
}
