use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// String identifier of an entity or plant, shaped `"{prefix}-{n}"`.
///
/// Backed by `Arc<str>` so copies into persistent maps stay cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Arc<str>);

impl Id {
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the final `-`, or the whole id when there is none.
    pub fn prefix(&self) -> &str {
        self.0.rsplit_once('-').map_or(&self.0, |(p, _)| p)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Id {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Id {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Id {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Identity of a world lineage. Every world derived from the same
/// `World::new` call shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub Uuid);

impl WorldId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id source. One counter is shared by every prefix.
///
/// Owned by value (normally inside a world) rather than held globally,
/// so replaying the same edits from the same seed yields the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting at `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self { next: seed }
    }

    /// Produce `"{prefix}-{n}"` and advance the counter.
    pub fn next(&mut self, prefix: &str) -> Id {
        let n = self.next;
        self.next += 1;
        Id::new(format!("{prefix}-{n}"))
    }

    /// Counter value the next id will use.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Rewind or fast-forward the counter. Test and replay only.
    pub fn reset(&mut self, seed: u64) {
        self.next = seed;
    }
}
