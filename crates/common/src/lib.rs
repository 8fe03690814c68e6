//! Shared types and utilities for arbor crates.

pub mod geom;
pub mod types;

pub use types::{Id, IdGen, WorldId};
