//! Draw layer
//!
//! Consumes the scene's render instances and puts pixels on screen via
//! macroquad. Nothing here feeds back into the simulation: the scene
//! exposes transforms, colors, and sprite-sheet cells, and this module
//! spends them.
//!
//! Textures are optional. A missing sheet logs once at load and the
//! entity draws as a flat tinted quad, so the game stays playable with
//! no assets on disk.

use macroquad::prelude::*;
use std::collections::HashMap;

use crate::app::{App, Phase};
use crate::game::components::{silhouette, TextureId};
use crate::game::Scene;

/// Dimming factor for non-winners during the game-over sequence.
const LOSER_DIM: f32 = 0.35;
/// Camera zoom while the winner takes the spotlight.
const FOCUS_ZOOM: f32 = 1.6;

/// Flat colors used when a sheet is missing.
fn fallback_color(texture: TextureId) -> Color {
    match texture {
        TextureId::Gunslinger => Color::new(0.85, 0.65, 0.45, 1.0),
        TextureId::Bullet => Color::new(1.0, 0.95, 0.6, 1.0),
        TextureId::MuzzleFlash => Color::new(1.0, 0.85, 0.3, 1.0),
        TextureId::Planks => Color::new(0.45, 0.32, 0.22, 1.0),
        TextureId::Bottle => Color::new(0.4, 0.7, 0.5, 1.0),
    }
}

fn sheet_path(texture: TextureId) -> &'static str {
    match texture {
        TextureId::Gunslinger => "assets/textures/gunslinger.png",
        TextureId::Bullet => "assets/textures/bullet.png",
        TextureId::MuzzleFlash => "assets/textures/muzzle_flash.png",
        TextureId::Planks => "assets/textures/planks.png",
        TextureId::Bottle => "assets/textures/bottle.png",
    }
}

pub struct TextureBank {
    sheets: HashMap<TextureId, Texture2D>,
}

impl TextureBank {
    /// Try to load every sheet. Missing files are logged and skipped.
    pub async fn load() -> Self {
        let mut sheets = HashMap::new();
        for id in [
            TextureId::Gunslinger,
            TextureId::Bullet,
            TextureId::MuzzleFlash,
            TextureId::Planks,
            TextureId::Bottle,
        ] {
            match load_texture(sheet_path(id)).await {
                Ok(texture) => {
                    texture.set_filter(FilterMode::Nearest);
                    sheets.insert(id, texture);
                }
                Err(e) => println!("no sheet at {}: {}, drawing flat quads", sheet_path(id), e),
            }
        }
        Self { sheets }
    }

    pub fn empty() -> Self {
        Self { sheets: HashMap::new() }
    }
}

/// Draw one frame: arena, entities, HUD, phase banner.
pub fn draw(scene: &Scene, app: &App, bank: &TextureBank) {
    clear_background(Color::new(0.13, 0.10, 0.09, 1.0));

    let center = Vec2::new(screen_width() / 2.0, screen_height() / 2.0);
    // Camera: identity during play; zoomed onto the winner at the end.
    let (zoom, look_at) = match app.focus_seat().and_then(|s| scene.player_position(s)) {
        Some(pos) => (FOCUS_ZOOM, pos),
        None => (1.0, center),
    };
    let to_screen = |world: Vec2| (world - look_at) * zoom + center;

    let winner = app.focus_seat();
    for inst in scene.render_instances() {
        let pos = to_screen(inst.position);
        let size = inst.size * zoom;
        let mut color = inst.color;
        // Everyone but the winner fades to a silhouette at the end.
        if let Some(w) = winner {
            if inst.seat.is_some() && inst.seat != Some(w) {
                color = silhouette(color, LOSER_DIM);
            }
        }

        match bank.sheets.get(&inst.texture) {
            Some(texture) => {
                let cell_w = texture.width() / inst.max_frames.max(1) as f32;
                let cell_h = texture.height() / inst.states.max(1) as f32;
                let source = Rect::new(
                    inst.frame as f32 * cell_w,
                    inst.state as f32 * cell_h,
                    cell_w,
                    cell_h,
                );
                draw_texture_ex(
                    texture,
                    pos.x - size.x / 2.0,
                    pos.y - size.y / 2.0,
                    color,
                    DrawTextureParams {
                        dest_size: Some(size),
                        source: Some(source),
                        rotation: inst.rotation,
                        flip_x: inst.facing_left,
                        ..Default::default()
                    },
                );
            }
            None => {
                let base = fallback_color(inst.texture);
                let tinted = Color::new(
                    base.r * color.r,
                    base.g * color.g,
                    base.b * color.b,
                    base.a * color.a,
                );
                draw_rectangle_ex(
                    pos.x,
                    pos.y,
                    size.x,
                    size.y,
                    DrawRectangleParams {
                        offset: Vec2::new(0.5, 0.5),
                        rotation: inst.rotation,
                        color: tinted,
                    },
                );
            }
        }
    }

    draw_hud(scene);
    draw_banner(app);
}

fn draw_hud(scene: &Scene) {
    for (slot, player) in scene.players.iter().enumerate() {
        if !player.active {
            continue;
        }
        let x = 20.0 + slot as f32 * 300.0;
        let status = if player.alive { "" } else { "  (down)" };
        let line = format!(
            "P{}  pts {}  lives {}  ammo {}{}",
            slot + 1,
            player.points,
            player.lives,
            player.bullets,
            status
        );
        draw_text(&line, x, 28.0, 24.0, WHITE);
    }
}

fn draw_banner(app: &App) {
    let text = match app.phase {
        Phase::Playing => return,
        Phase::RoundBanner { survivor, .. } => format!("P{} takes the round!", survivor + 1),
        Phase::DrawBanner { .. } => "All chambers empty - draw!".to_string(),
        Phase::GameOver { winner } => format!("P{} wins the shootout! [Esc] rematch", winner + 1),
    };
    let size = 48.0;
    let dims = measure_text(&text, None, size as u16, 1.0);
    draw_text(
        &text,
        (screen_width() - dims.width) / 2.0,
        screen_height() / 3.0,
        size,
        Color::new(1.0, 0.9, 0.6, 1.0),
    );
}
