//! Developer Tooling: read-only world and plant inspection.
//!
//! # Invariants
//! - Tools never mutate the world they inspect.

pub mod inspector;

pub use inspector::{PlantOutline, PlantSummary, WorldInspector, WorldSummary};
