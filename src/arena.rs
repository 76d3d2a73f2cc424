//! Arena definition and loading
//!
//! Uses RON (Rusty Object Notation) for human-readable arena files.
//! An arena is static data: platform segments, spawn points, bottle
//! props, and the match rules. Loading validates against hard limits so
//! a bad file can't wedge the process; the caller falls back to the
//! built-in arena on any error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Validation limits for arena files.
pub mod limits {
    /// Maximum platform segments.
    pub const MAX_PLATFORMS: usize = 256;
    /// Maximum spawn points.
    pub const MAX_SPAWNS: usize = 16;
    /// Maximum bottle props.
    pub const MAX_PROPS: usize = 64;
    /// Maximum coordinate magnitude in pixels.
    pub const MAX_COORD: f32 = 100_000.0;
}

/// Error type for arena loading.
#[derive(Debug)]
pub enum ArenaError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    ValidationError(String),
}

impl From<std::io::Error> for ArenaError {
    fn from(e: std::io::Error) -> Self {
        ArenaError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ArenaError {
    fn from(e: ron::error::SpannedError) -> Self {
        ArenaError::ParseError(e)
    }
}

impl std::fmt::Display for ArenaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArenaError::IoError(e) => write!(f, "IO error: {}", e),
            ArenaError::ParseError(e) => write!(f, "Parse error: {}", e),
            ArenaError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for ArenaError {}

/// A static platform segment, centered at (x, y), in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Platform {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Everything the scene needs to stage a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena {
    pub name: String,
    pub platforms: Vec<Platform>,
    /// Player spawn positions, in pixels.
    pub spawn_points: Vec<(f32, f32)>,
    /// Bottle prop positions, in pixels.
    pub props: Vec<(f32, f32)>,
    /// Points needed to win the match.
    pub win_points: u32,
    pub start_lives: u32,
    /// Rounds in a fresh revolver.
    pub start_bullets: u32,
}

impl Default for Arena {
    /// The built-in saloon arena, used when no file loads.
    fn default() -> Self {
        Self {
            name: "saloon".to_string(),
            platforms: vec![
                Platform { x: 640.0, y: 660.0, w: 1280.0, h: 40.0 },
                Platform { x: 320.0, y: 470.0, w: 280.0, h: 24.0 },
                Platform { x: 960.0, y: 470.0, w: 280.0, h: 24.0 },
                Platform { x: 640.0, y: 300.0, w: 240.0, h: 24.0 },
            ],
            spawn_points: vec![
                (120.0, 560.0),
                (1160.0, 560.0),
                (320.0, 380.0),
                (960.0, 380.0),
            ],
            props: vec![(560.0, 250.0), (720.0, 250.0)],
            win_points: 5,
            start_lives: 10,
            start_bullets: 6,
        }
    }
}

fn is_valid_float(f: f32) -> bool {
    f.is_finite() && f.abs() <= limits::MAX_COORD
}

/// Validate an arena against the hard limits.
pub fn validate_arena(arena: &Arena) -> Result<(), ArenaError> {
    if arena.platforms.is_empty() || arena.platforms.len() > limits::MAX_PLATFORMS {
        return Err(ArenaError::ValidationError(format!(
            "platform count {} out of range 1..={}",
            arena.platforms.len(),
            limits::MAX_PLATFORMS
        )));
    }
    if arena.spawn_points.is_empty() || arena.spawn_points.len() > limits::MAX_SPAWNS {
        return Err(ArenaError::ValidationError(format!(
            "spawn count {} out of range 1..={}",
            arena.spawn_points.len(),
            limits::MAX_SPAWNS
        )));
    }
    if arena.props.len() > limits::MAX_PROPS {
        return Err(ArenaError::ValidationError(format!(
            "prop count {} exceeds {}",
            arena.props.len(),
            limits::MAX_PROPS
        )));
    }
    for (i, p) in arena.platforms.iter().enumerate() {
        if !is_valid_float(p.x) || !is_valid_float(p.y) || !is_valid_float(p.w) || !is_valid_float(p.h) {
            return Err(ArenaError::ValidationError(format!("platform[{}]: invalid coordinate", i)));
        }
        if p.w <= 0.0 || p.h <= 0.0 {
            return Err(ArenaError::ValidationError(format!("platform[{}]: non-positive size", i)));
        }
    }
    for (i, (x, y)) in arena.spawn_points.iter().enumerate() {
        if !is_valid_float(*x) || !is_valid_float(*y) {
            return Err(ArenaError::ValidationError(format!("spawn[{}]: invalid coordinate", i)));
        }
    }
    for (i, (x, y)) in arena.props.iter().enumerate() {
        if !is_valid_float(*x) || !is_valid_float(*y) {
            return Err(ArenaError::ValidationError(format!("prop[{}]: invalid coordinate", i)));
        }
    }
    if arena.win_points == 0 {
        return Err(ArenaError::ValidationError("win_points must be at least 1".to_string()));
    }
    if arena.start_bullets == 0 {
        return Err(ArenaError::ValidationError("start_bullets must be at least 1".to_string()));
    }
    Ok(())
}

/// Load and validate an arena file.
pub fn load_arena(path: &Path) -> Result<Arena, ArenaError> {
    let text = fs::read_to_string(path)?;
    let arena: Arena = ron::from_str(&text)?;
    validate_arena(&arena)?;
    Ok(arena)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_arena_validates() {
        validate_arena(&Arena::default()).unwrap();
    }

    #[test]
    fn test_round_trip_through_ron_file() {
        let arena = Arena::default();
        let text = ron::to_string(&arena).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        let loaded = load_arena(file.path()).unwrap();
        assert_eq!(loaded.name, arena.name);
        assert_eq!(loaded.platforms.len(), arena.platforms.len());
        assert_eq!(loaded.win_points, arena.win_points);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_arena(Path::new("/nonexistent/arena.ron")).unwrap_err();
        assert!(matches!(err, ArenaError::IoError(_)));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not ron at all {{{").unwrap();
        let err = load_arena(file.path()).unwrap_err();
        assert!(matches!(err, ArenaError::ParseError(_)));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut arena = Arena::default();
        arena.win_points = 0;
        assert!(matches!(
            validate_arena(&arena),
            Err(ArenaError::ValidationError(_))
        ));

        let mut arena = Arena::default();
        arena.platforms[0].w = -5.0;
        assert!(validate_arena(&arena).is_err());

        let mut arena = Arena::default();
        arena.spawn_points.clear();
        assert!(validate_arena(&arena).is_err());

        let mut arena = Arena::default();
        arena.platforms[0].x = f32::NAN;
        assert!(validate_arena(&arena).is_err());
    }
}
