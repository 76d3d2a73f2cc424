//! Event system
//!
//! Events decouple the update loop from its observers. Gameplay pushes
//! events as they happen; the frame's tail end drains them - audio cues
//! to the sound bank, everything else to whoever cares. Queues are
//! cleared every frame whether or not anyone listened.

use macroquad::prelude::Vec2;

use super::entity::EntityId;

/// A queue for events of a single type, collected during the frame and
/// drained at specific points.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: Vec<T>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn send(&mut self, event: T) {
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.events.iter()
    }

    /// Drain all events (returns iterator and clears the queue).
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Container for all game events.
pub struct Events {
    /// A shot was fired (hit or miss).
    pub shots: EventQueue<ShotEvent>,
    /// A player died.
    pub deaths: EventQueue<DeathEvent>,
    /// A round was decided and a point awarded.
    pub scores: EventQueue<ScoreEvent>,
    /// A player returned to the arena.
    pub respawns: EventQueue<RespawnEvent>,
    /// Named audio cues for the sound bank.
    pub audio: EventQueue<AudioCue>,
}

impl Events {
    pub fn new() -> Self {
        Self {
            shots: EventQueue::new(),
            deaths: EventQueue::new(),
            scores: EventQueue::new(),
            respawns: EventQueue::new(),
            audio: EventQueue::new(),
        }
    }

    /// Clear all queues. Call at end of frame.
    pub fn clear_all(&mut self) {
        self.shots.clear();
        self.deaths.clear();
        self.scores.clear();
        self.respawns.clear();
        self.audio.clear();
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Event Types
// =============================================================================

/// A trigger was pulled.
#[derive(Debug, Clone, Copy)]
pub struct ShotEvent {
    pub shooter: usize,
    pub origin: Vec2,
    /// What the round connected with, if anything.
    pub target: Option<EntityId>,
}

/// A player lost a life.
#[derive(Debug, Clone, Copy)]
pub struct DeathEvent {
    pub seat: usize,
    pub killer: Option<usize>,
}

/// A round survivor was awarded a point.
#[derive(Debug, Clone, Copy)]
pub struct ScoreEvent {
    pub seat: usize,
    pub points: u32,
}

/// A player re-entered the arena.
#[derive(Debug, Clone, Copy)]
pub struct RespawnEvent {
    pub seat: usize,
    pub position: Vec2,
}

/// Named sound to fire at the audio collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioCue(pub &'static str);

impl AudioCue {
    pub const SHOT: AudioCue = AudioCue("shot");
    pub const EMPTY: AudioCue = AudioCue("empty");
    pub const DEATH: AudioCue = AudioCue("death");
    pub const RESPAWN: AudioCue = AudioCue("respawn");
    pub const SCORE: AudioCue = AudioCue("score");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_queue_drain() {
        let mut queue: EventQueue<i32> = EventQueue::new();
        queue.send(1);
        queue.send(2);
        assert_eq!(queue.len(), 2);
        let collected: Vec<_> = queue.drain().collect();
        assert_eq!(collected, vec![1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_all() {
        let mut events = Events::new();
        events.audio.send(AudioCue::SHOT);
        events.deaths.send(DeathEvent { seat: 0, killer: None });
        events.clear_all();
        assert!(events.audio.is_empty());
        assert!(events.deaths.is_empty());
    }
}
