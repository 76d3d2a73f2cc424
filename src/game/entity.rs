//! Entity identity and records
//!
//! An `EntityId` is a compact key: a short textual tag plus a numeric
//! index, totally ordered so the registry's sorted map can binary-search
//! it. Records are lightweight: a transform, a flag byte, and weak
//! references into the physics world and the component slabs. None of
//! the referenced storage is owned here; the scene's sweep ordering is
//! what keeps the weak references honest.

use macroquad::prelude::Vec2;
use rapier2d::prelude::RigidBodyHandle;
use std::fmt;

use super::behavior::Behavior;
use super::slab::SlotId;

/// Bytes in an id tag. Shorter tags are zero-padded.
pub const TAG_LEN: usize = 6;

/// Compact, totally ordered entity key.
///
/// Ordering is lexicographic on the tag bytes, then numeric on the
/// index, which is exactly the derived field order below.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    tag: [u8; TAG_LEN],
    index: u16,
}

impl EntityId {
    /// Build an id from a tag (truncated to [`TAG_LEN`] bytes) and an
    /// index.
    pub fn new(tag: &str, index: u16) -> Self {
        let mut buf = [0u8; TAG_LEN];
        for (dst, src) in buf.iter_mut().zip(tag.bytes()) {
            *dst = src;
        }
        Self { tag: buf, index }
    }

    pub fn tag(&self) -> &str {
        let end = self.tag.iter().position(|&b| b == 0).unwrap_or(TAG_LEN);
        std::str::from_utf8(&self.tag[..end]).unwrap_or("??")
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    /// Pack into a `u128` for a physics body's user data. Zero is
    /// reserved for "no entity" (rapier's default user data), so packed
    /// ids carry a sentinel bit above the payload.
    pub fn pack(&self) -> u128 {
        let mut raw: u128 = 1;
        for b in self.tag {
            raw = (raw << 8) | b as u128;
        }
        (raw << 16) | self.index as u128
    }

    /// Inverse of [`EntityId::pack`]. Returns `None` for the reserved
    /// zero value.
    pub fn unpack(raw: u128) -> Option<Self> {
        if raw == 0 {
            return None;
        }
        let index = (raw & 0xFFFF) as u16;
        let mut rest = raw >> 16;
        let mut tag = [0u8; TAG_LEN];
        for slot in tag.iter_mut().rev() {
            *slot = (rest & 0xFF) as u8;
            rest >>= 8;
        }
        Some(Self { tag, index })
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tag(), self.index)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Entity flag bit: marked for destruction, swept at end of frame.
pub const FLAG_DESTROY: u8 = 1 << 0;

/// Per-entity record stored in the registry.
pub struct EntityRecord {
    /// World position in pixels.
    pub position: Vec2,
    /// Rotation in radians.
    pub rotation: f32,
    /// Flag bitmask; bit 0 marks pending destruction.
    pub flags: u8,
    /// Weak reference to a body owned by the physics world.
    pub body: Option<RigidBodyHandle>,
    /// Weak reference to a sprite slot owned by the sprite slab.
    pub sprite: Option<SlotId>,
    /// Weak reference to an animator slot owned by the animator slab.
    pub animator: Option<SlotId>,
    /// Entity-specific logic tag.
    pub behavior: Behavior,
}

impl EntityRecord {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
            flags: 0,
            body: None,
            sprite: None,
            animator: None,
            behavior: Behavior::None,
        }
    }

    pub fn mark_destroy(&mut self) {
        self.flags |= FLAG_DESTROY;
    }

    pub fn is_marked_destroy(&self) -> bool {
        self.flags & FLAG_DESTROY != 0
    }
}

impl Default for EntityRecord {
    fn default() -> Self {
        Self::at(Vec2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_tag_then_index() {
        let a = EntityId::new("bullet", 5);
        let b = EntityId::new("gunman", 0);
        let c = EntityId::new("gunman", 1);
        assert!(a < b, "tag compares first");
        assert!(b < c, "index breaks tag ties");
    }

    #[test]
    fn test_tag_truncation() {
        let id = EntityId::new("gunslinger", 0);
        assert_eq!(id.tag(), "gunsli");
    }

    #[test]
    fn test_pack_round_trip() {
        for (tag, index) in [("gunman", 0u16), ("bullet", 65535), ("a", 7), ("", 0)] {
            let id = EntityId::new(tag, index);
            let raw = id.pack();
            assert_ne!(raw, 0);
            assert_eq!(EntityId::unpack(raw), Some(id));
        }
        assert_eq!(EntityId::unpack(0), None);
    }

    #[test]
    fn test_destroy_flag() {
        let mut record = EntityRecord::default();
        assert!(!record.is_marked_destroy());
        record.mark_destroy();
        assert!(record.is_marked_destroy());
    }
}
