//! Game Core Module
//!
//! The entity/component backbone and the per-frame update protocol.
//!
//! Key concepts:
//! - DenseMap: sorted contiguous key/value storage, binary-searched
//! - FixedSlab: fixed-capacity component pool with stable slots
//! - Registry: DenseMap of EntityId -> EntityRecord, swept per frame
//! - Scene: the six-step update loop tying it all to rapier
//!
//! Design philosophy:
//! - Lookups and iteration are the hot path; mutation pays the shifts
//! - Weak references everywhere, one owner per storage
//! - Compile-time known components, no runtime type registration

// Allow unused code - the container APIs are wider than what the
// current gameplay reaches outside of tests.
#![allow(dead_code)]

pub mod behavior;
pub mod components;
pub mod dense_map;
pub mod entity;
pub mod event;
pub mod physics;
pub mod player;
pub mod registry;
pub mod scene;
pub mod slab;

// Re-export main types
pub use dense_map::DenseMap;
pub use entity::EntityId;
pub use registry::Registry;
pub use scene::{RenderInstance, Scene, Verdict};
