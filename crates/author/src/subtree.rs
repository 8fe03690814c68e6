use arbor_common::{Id, WorldId};
use arbor_kernel::{PlantNode, RemovedSubtree};
use glam::Vec2;
use std::collections::BTreeMap;

/// A closure cut out of a plant, held outside any world until grafted.
///
/// Node ids inside are the ids the nodes had before the cut. They are only
/// keys for the subtree's own adjacency: a graft gives every node a fresh
/// id, so the old ids never come back to life.
///
/// Positions are in the world frame (island-local position plus the
/// island origin passed to the cut).
#[derive(Debug, Clone, PartialEq)]
pub struct CarriedSubtree {
    lineage: WorldId,
    source_plant: Id,
    root_id: Id,
    nodes: Vec<PlantNode>,
    adjacency: BTreeMap<Id, Vec<Id>>,
}

impl CarriedSubtree {
    pub(crate) fn from_removed(lineage: WorldId, removed: RemovedSubtree, island_pos: Vec2) -> Self {
        let root_id = removed.root().id.clone();
        let nodes = removed
            .nodes
            .into_iter()
            .map(|mut node| {
                node.position += island_pos;
                node
            })
            .collect();
        Self {
            lineage,
            source_plant: removed.plant_id,
            root_id,
            nodes,
            adjacency: removed.children,
        }
    }

    /// Lineage of the world this subtree was cut from.
    pub fn lineage(&self) -> WorldId {
        self.lineage
    }

    pub fn source_plant(&self) -> &Id {
        &self.source_plant
    }

    /// Pre-cut id of the subtree root.
    pub fn root_id(&self) -> &Id {
        &self.root_id
    }

    pub fn root(&self) -> &PlantNode {
        &self.nodes[0]
    }

    /// Snapshot of the detached nodes, pre-order, root first.
    pub fn nodes(&self) -> &[PlantNode] {
        &self.nodes
    }

    pub fn node(&self, id: &Id) -> Option<&PlantNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn adjacency(&self) -> &BTreeMap<Id, Vec<Id>> {
        &self.adjacency
    }

    pub fn children(&self, id: &Id) -> &[Id] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a subtree produced by a cut.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Position of `node` relative to the subtree root.
    pub fn offset_of(&self, node: &PlantNode) -> Vec2 {
        node.position - self.root().position
    }
}
