use arbor_common::Id;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spatial region anchoring plants, with its own local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Island {
    pub id: Id,
    pub cluster_id: Id,
    /// Origin of the island frame in world space.
    pub position: Vec2,
    /// Outline polygon in island-local coordinates.
    pub shape: Vec<Vec2>,
    pub radius: f32,
    pub depth: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Internal, growth-capable node. Can branch or take a graft.
    Stem,
    /// Terminal node holding a charge. Can sprout into a stem.
    Bud,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stem => f.write_str("stem"),
            Self::Bud => f.write_str("bud"),
        }
    }
}

/// One node of a plant tree. Position is island-local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantNode {
    pub id: Id,
    pub plant_id: Id,
    pub kind: NodeKind,
    pub position: Vec2,
    /// Facing in radians.
    pub angle: f32,
    /// Edges from the plant root.
    pub depth: u32,
    /// 0..=1, buds only.
    pub charge: Option<f32>,
}

impl PlantNode {
    pub fn is_bud(&self) -> bool {
        self.kind == NodeKind::Bud
    }

    pub fn is_stem(&self) -> bool {
        self.kind == NodeKind::Stem
    }
}

/// Anything stored in `World::entities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    Island(Island),
    PlantNode(PlantNode),
}

impl Entity {
    pub fn id(&self) -> &Id {
        match self {
            Self::Island(island) => &island.id,
            Self::PlantNode(node) => &node.id,
        }
    }

    pub fn as_node(&self) -> Option<&PlantNode> {
        match self {
            Self::PlantNode(node) => Some(node),
            Self::Island(_) => None,
        }
    }

    pub fn as_island(&self) -> Option<&Island> {
        match self {
            Self::Island(island) => Some(island),
            Self::PlantNode(_) => None,
        }
    }
}
