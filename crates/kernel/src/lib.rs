//! World Kernel: authoritative, persistent world state for islands and plants.
//!
//! # Invariants
//! - Each plant's adjacency is a rooted tree whose ids all name plant nodes
//!   of that plant.
//! - Node depth equals edge distance from the plant root.
//! - Only buds carry a charge.
//! - Worlds are values: cloning is O(1) and edits never leak into other clones.

pub mod entity;
pub mod plant;
pub mod validate;
pub mod world;

pub use entity::{Entity, Island, NodeKind, PlantNode};
pub use plant::Plant;
pub use validate::InvariantViolation;
pub use world::{RemovedSubtree, World, WorldError, WorldEvent};
