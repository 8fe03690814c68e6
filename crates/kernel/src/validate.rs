//! Whole-world structural checks.
//!
//! Edits keep these invariants by construction; `validate` exists for
//! tests, for worlds loaded from outside, and for debugging tools.

use crate::entity::{Entity, NodeKind};
use crate::plant::Plant;
use crate::world::World;
use arbor_common::Id;
use std::collections::BTreeSet;

/// The first broken invariant found.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("plant {plant}: island {island} is missing")]
    MissingIsland { plant: Id, island: Id },
    #[error("plant {plant}: root {root} is not a plant node of this plant")]
    BadRoot { plant: Id, root: Id },
    #[error("plant {plant}: root {root} has a parent")]
    RootHasParent { plant: Id, root: Id },
    #[error("plant {plant}: {node} is not a plant node of this plant")]
    ForeignNode { plant: Id, node: Id },
    #[error("plant {plant}: {node} is reachable more than once")]
    DuplicateChild { plant: Id, node: Id },
    #[error("plant {plant}: parent index says {node} hangs from {indexed:?}, adjacency says {actual}")]
    ParentMismatch {
        plant: Id,
        node: Id,
        indexed: Option<Id>,
        actual: Id,
    },
    #[error("plant {plant}: {node} is not reachable from the root")]
    Unreachable { plant: Id, node: Id },
    #[error("node {node}: depth {found}, expected {expected}")]
    DepthMismatch { node: Id, expected: u32, found: u32 },
    #[error("node {node}: only buds carry charge")]
    ChargedStem { node: Id },
    #[error("node {node}: position or angle is not finite")]
    NonFinitePlacement { node: Id },
    #[error("node {node}: charge {charge} outside 0..=1")]
    ChargeOutOfRange { node: Id, charge: f32 },
}

impl World {
    /// Check every plant: rooted tree shape, parent index agreement,
    /// depth bookkeeping, node ownership, finite placement and bud-only
    /// charge.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        for plant in self.plants().values() {
            self.validate_plant(plant)?;
        }
        // Nodes that claim a plant but are not in its adjacency.
        for entity in self.entities().values() {
            if let Entity::PlantNode(node) = entity {
                let listed = self
                    .plant(&node.plant_id)
                    .is_some_and(|p| p.contains(&node.id));
                if !listed {
                    return Err(InvariantViolation::Unreachable {
                        plant: node.plant_id.clone(),
                        node: node.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_plant(&self, plant: &Plant) -> Result<(), InvariantViolation> {
        let pid = plant.id().clone();
        if self.island(plant.island_id()).is_none() {
            return Err(InvariantViolation::MissingIsland {
                plant: pid,
                island: plant.island_id().clone(),
            });
        }
        let root = plant.root_id();
        match self.node(root) {
            Some(n) if n.plant_id == pid && n.depth == 0 => {}
            _ => {
                return Err(InvariantViolation::BadRoot {
                    plant: pid,
                    root: root.clone(),
                });
            }
        }
        if plant.parent(root).is_some() {
            return Err(InvariantViolation::RootHasParent {
                plant: pid,
                root: root.clone(),
            });
        }

        let mut seen: BTreeSet<&Id> = BTreeSet::new();
        seen.insert(root);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id).filter(|n| n.plant_id == pid) else {
                return Err(InvariantViolation::ForeignNode {
                    plant: pid,
                    node: id.clone(),
                });
            };
            check_charge(node.kind, node.charge, id)?;
            if !(node.position.is_finite() && node.angle.is_finite()) {
                return Err(InvariantViolation::NonFinitePlacement { node: id.clone() });
            }
            for child in plant.children(id) {
                if !seen.insert(child) {
                    return Err(InvariantViolation::DuplicateChild {
                        plant: pid,
                        node: child.clone(),
                    });
                }
                if plant.parent(child) != Some(id) {
                    return Err(InvariantViolation::ParentMismatch {
                        plant: pid,
                        node: child.clone(),
                        indexed: plant.parent(child).cloned(),
                        actual: id.clone(),
                    });
                }
                let found = self.node(child).map_or(u32::MAX, |n| n.depth);
                if found != node.depth + 1 {
                    return Err(InvariantViolation::DepthMismatch {
                        node: child.clone(),
                        expected: node.depth + 1,
                        found,
                    });
                }
                stack.push(child);
            }
        }

        let orphan = plant
            .node_ids()
            .chain(plant.parent_index().keys())
            .find(|id| !seen.contains(id));
        if let Some(node) = orphan {
            return Err(InvariantViolation::Unreachable {
                plant: pid,
                node: node.clone(),
            });
        }
        Ok(())
    }
}

fn check_charge(kind: NodeKind, charge: Option<f32>, id: &Id) -> Result<(), InvariantViolation> {
    match (kind, charge) {
        (NodeKind::Stem, Some(_)) => Err(InvariantViolation::ChargedStem { node: id.clone() }),
        (NodeKind::Bud, Some(c)) if !(0.0..=1.0).contains(&c) => {
            Err(InvariantViolation::ChargeOutOfRange {
                node: id.clone(),
                charge: c,
            })
        }
        _ => Ok(()),
    }
}
