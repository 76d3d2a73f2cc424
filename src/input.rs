//! Input handling
//!
//! Polls keyboard (macroquad) and gamepads (gilrs on native) into
//! frame-local per-seat snapshots. The scene only ever sees snapshots:
//! it never touches hardware, and a snapshot is immutable for the frame.
//!
//! Seat 0 is the keyboard; gamepads fill the remaining seats in
//! connection order.

use macroquad::prelude::*;

use crate::game::scene::MAX_PLAYERS;

/// Analog stick deadzone (0.0-1.0).
const STICK_DEADZONE: f32 = 0.15;

/// One seat's input for one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerInput {
    /// Horizontal movement, -1.0 (left) to 1.0 (right).
    pub move_axis: f32,
    /// Aim direction; zero means "shoot where you face".
    pub aim: Vec2,
    /// Jump was pressed this frame.
    pub jump_pressed: bool,
    /// Trigger was pulled this frame.
    pub fire_pressed: bool,
    /// Start/menu was pressed this frame.
    pub start_pressed: bool,
}

pub struct InputState {
    #[cfg(not(target_arch = "wasm32"))]
    gilrs: Option<gilrs::Gilrs>,
    /// Previous button state per pad seat, for edge detection.
    #[cfg(not(target_arch = "wasm32"))]
    prev_pad: [PadButtons; MAX_PLAYERS],
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy, Default)]
struct PadButtons {
    jump: bool,
    fire: bool,
    start: bool,
}

impl InputState {
    pub fn new() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let gilrs = match gilrs::Gilrs::new() {
            Ok(g) => Some(g),
            Err(e) => {
                eprintln!("gamepad support unavailable: {}", e);
                None
            }
        };
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            gilrs,
            #[cfg(not(target_arch = "wasm32"))]
            prev_pad: [PadButtons::default(); MAX_PLAYERS],
        }
    }

    /// Snapshot every seat for this frame.
    pub fn poll(&mut self) -> [PlayerInput; MAX_PLAYERS] {
        let mut inputs = [PlayerInput::default(); MAX_PLAYERS];
        inputs[0] = Self::poll_keyboard();
        self.poll_gamepads(&mut inputs);
        inputs
    }

    fn poll_keyboard() -> PlayerInput {
        let mut input = PlayerInput::default();
        if is_key_down(KeyCode::A) || is_key_down(KeyCode::Left) {
            input.move_axis -= 1.0;
        }
        if is_key_down(KeyCode::D) || is_key_down(KeyCode::Right) {
            input.move_axis += 1.0;
        }
        let mut aim = Vec2::ZERO;
        if is_key_down(KeyCode::Up) {
            aim.y -= 1.0;
        }
        if is_key_down(KeyCode::Down) {
            aim.y += 1.0;
        }
        if aim != Vec2::ZERO && input.move_axis.abs() > 0.01 {
            aim.x = input.move_axis.signum();
        }
        input.aim = aim;
        input.jump_pressed = is_key_pressed(KeyCode::W) || is_key_pressed(KeyCode::Space);
        input.fire_pressed = is_key_pressed(KeyCode::J) || is_key_pressed(KeyCode::Enter);
        input.start_pressed = is_key_pressed(KeyCode::Escape);
        input
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn poll_gamepads(&mut self, inputs: &mut [PlayerInput; MAX_PLAYERS]) {
        use gilrs::{Axis, Button};

        let Some(gilrs) = self.gilrs.as_mut() else { return };
        // Drain the event queue so gamepad state is current.
        while gilrs.next_event().is_some() {}

        for (seat, (_id, pad)) in gilrs.gamepads().enumerate() {
            let slot = seat + 1;
            if slot >= MAX_PLAYERS {
                break;
            }
            let stick_x = pad.value(Axis::LeftStickX);
            let stick_y = pad.value(Axis::LeftStickY);
            let stick = apply_deadzone(stick_x, stick_y);

            let buttons = PadButtons {
                jump: pad.is_pressed(Button::South),
                fire: pad.is_pressed(Button::RightTrigger2) || pad.is_pressed(Button::West),
                start: pad.is_pressed(Button::Start),
            };
            let prev = self.prev_pad[slot];

            inputs[slot] = PlayerInput {
                move_axis: stick.x,
                // Pad y is up-positive; screen y grows downward.
                aim: Vec2::new(stick.x, -stick.y),
                jump_pressed: buttons.jump && !prev.jump,
                fire_pressed: buttons.fire && !prev.fire,
                start_pressed: buttons.start && !prev.start,
            };
            self.prev_pad[slot] = buttons;
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn poll_gamepads(&mut self, _inputs: &mut [PlayerInput; MAX_PLAYERS]) {}
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

/// Radial deadzone with linear rescaling.
#[cfg(not(target_arch = "wasm32"))]
fn apply_deadzone(x: f32, y: f32) -> Vec2 {
    let len = (x * x + y * y).sqrt();
    if len < STICK_DEADZONE {
        return Vec2::ZERO;
    }
    let scale = (len - STICK_DEADZONE) / (1.0 - STICK_DEADZONE) / len;
    Vec2::new(x * scale, y * scale)
}
