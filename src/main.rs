//! HIGH NOON: a western-themed 2D arena shooter
//!
//! Up to four cowboys, one platform arena, hitscan revolvers. Last
//! gunslinger standing takes the round; first to the win threshold
//! takes the match. Physics rides on rapier2d, everything on screen
//! rides on macroquad.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod app;
mod arena;
mod audio;
mod game;
mod input;
mod render;

use macroquad::prelude::*;
use std::path::Path;

use app::App;
use arena::{load_arena, Arena};
use audio::AudioBank;
use game::Scene;
use input::InputState;
use render::TextureBank;

/// Seats filled at startup.
const PLAYER_COUNT: usize = 2;
/// Target frame time, seconds.
const TARGET_FRAME_TIME: f64 = 1.0 / 60.0;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("HIGH NOON v{}", VERSION),
        window_width: 1280,
        window_height: 720,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

/// Arena from disk, or the built-in saloon with a diagnostic.
fn load_or_default_arena() -> Arena {
    let path = Path::new("assets/arena.ron");
    match load_arena(path) {
        Ok(arena) => arena,
        Err(e) => {
            println!("arena load failed ({}), using built-in '{}'", e, Arena::default().name);
            Arena::default()
        }
    }
}

fn stage_match(arena: &Arena) -> Scene {
    let diagonal = (screen_width().powi(2) + screen_height().powi(2)).sqrt();
    Scene::new(arena.clone(), PLAYER_COUNT, diagonal)
        .expect("scene capacities are compile-time constants")
}

#[macroquad::main(window_conf)]
async fn main() {
    // Initialize crash logging FIRST (before any other code)
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    let arena = load_or_default_arena();
    let audio = AudioBank::load().await;
    let textures = TextureBank::load().await;
    let mut input = InputState::new();

    let mut scene = stage_match(&arena);
    let mut app = App::new();

    loop {
        let frame_start = get_time();
        let inputs = input.poll();

        // Rematch from the game-over screen.
        if app.is_over() && inputs.iter().any(|i| i.start_pressed) {
            scene = stage_match(&arena);
            app = App::new();
        }

        if app.should_tick() {
            let verdict = scene.tick(get_frame_time(), &inputs);
            app.apply(verdict);
            for cue in scene.events.audio.drain() {
                audio.play(cue.0);
            }
            scene.events.clear_all();
        }

        render::draw(&scene, &app, &textures);

        // Frame cap: sleep for the bulk, spin for precision. No vsync
        // assumption.
        let elapsed = get_time() - frame_start;
        let remaining = TARGET_FRAME_TIME - elapsed;
        if remaining > 0.0 {
            #[cfg(not(target_arch = "wasm32"))]
            {
                let spin_margin = 0.002; // 2ms
                while get_time() - frame_start + spin_margin < TARGET_FRAME_TIME {
                    std::thread::sleep(std::time::Duration::from_millis(1));
                }
                while get_time() - frame_start < TARGET_FRAME_TIME {
                    std::hint::spin_loop();
                }
            }
            #[cfg(target_arch = "wasm32")]
            {
                while get_time() - frame_start < TARGET_FRAME_TIME {
                    // Busy wait - browser handles frame pacing.
                }
            }
        }

        next_frame().await;
    }
}
