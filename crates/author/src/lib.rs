//! In-world authoring: plant topology edits and undo/redo.
//!
//! # Invariants
//! - Every action takes a world by reference and returns a new one; the
//!   input is never modified, including on rejection.
//! - Preconditions are checked before any mutation.
//! - Actions preserve every check in `World::validate`.

pub mod actions;
pub mod config;
pub mod editor;
pub mod subtree;

pub use actions::{ActionError, Topology};
pub use config::{ConfigError, GrowthConfig, MIN_GRAFT_DISTANCE};
pub use editor::{EditError, Editor};
pub use subtree::CarriedSubtree;
