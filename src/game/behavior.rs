//! Entity behaviors
//!
//! A closed set of per-entity behaviors dispatched by tag switch. The
//! scene matches on the variant at hit-dispatch and destruction time;
//! contact matching is keyed by `EntityId`, never by object address, so
//! relocating records is always safe.

/// Optional behavior attached to an entity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    /// Scenery: platforms, props, visual-only entities.
    #[default]
    None,
    /// A player-controlled cowboy; `slot` is the roster seat.
    Gunslinger { slot: usize },
    /// A fired round's visual trail; `owner` is the shooter's seat.
    Bullet { owner: usize },
}

impl Behavior {
    /// Roster seat if this entity is a player.
    pub fn gunslinger_slot(&self) -> Option<usize> {
        match self {
            Behavior::Gunslinger { slot } => Some(*slot),
            _ => None,
        }
    }
}

/// Notifications delivered to an entity's behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorEvent {
    /// Struck by a bullet; `shooter` is the firing seat.
    Hit { shooter: usize },
}
