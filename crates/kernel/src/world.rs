use crate::entity::{Entity, Island, NodeKind, PlantNode};
use crate::plant::Plant;
use arbor_common::{Id, IdGen, WorldId};
use glam::Vec2;
use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event record produced by every mutation to the world.
///
/// Downstream collaborators (audio, effects) read these instead of diffing
/// worlds. The log is a persistent vector, so clones share it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    IslandSpawned {
        id: Id,
    },
    PlantSpawned {
        id: Id,
        island_id: Id,
        root_id: Id,
    },
    /// A node was placed under `parent_id`.
    NodeAttached {
        id: Id,
        plant_id: Id,
        parent_id: Id,
        kind: NodeKind,
    },
    KindChanged {
        id: Id,
        old: NodeKind,
        new: NodeKind,
    },
    /// A node and all of its descendants were removed. `removed` is pre-order.
    SubtreeRemoved {
        root_id: Id,
        plant_id: Id,
        removed: Vec<Id>,
    },
}

/// Errors from low-level world operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("entity {0} not found")]
    EntityNotFound(Id),
    #[error("entity {0} is not a plant node")]
    NotAPlantNode(Id),
    #[error("entity {0} is not an island")]
    NotAnIsland(Id),
    #[error("plant {0} not found")]
    PlantNotFound(Id),
    #[error("node {0} is the root of its plant")]
    RootNode(Id),
    #[error("id {0} is already in use")]
    DuplicateId(Id),
}

/// A closure taken out of a plant by [`World::remove_subtree`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedSubtree {
    pub plant_id: Id,
    /// Node the closure root hung from.
    pub parent_id: Id,
    /// Removed nodes, pre-order; `nodes[0]` is the closure root.
    pub nodes: Vec<PlantNode>,
    /// Adjacency restricted to the removed ids.
    pub children: BTreeMap<Id, Vec<Id>>,
}

impl RemovedSubtree {
    pub fn root(&self) -> &PlantNode {
        &self.nodes[0]
    }
}

/// The authoritative world state.
///
/// A `World` is a value. Entities and plants live in persistent ordered
/// maps: `clone()` is O(1), and a mutation on one clone copies only the
/// map paths it touches. Editing code clones the world it was handed,
/// mutates the clone and returns it, leaving every older snapshot intact.
///
/// Ordered maps keep iteration deterministic across platforms.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct World {
    lineage: WorldId,
    seed: u64,
    ids: IdGen,
    entities: OrdMap<Id, Entity>,
    plants: OrdMap<Id, Plant>,
    #[serde(skip)]
    events: Vector<WorldEvent>,
}

impl World {
    /// Create an empty world with seed 0 and a new lineage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty world with a specific generation seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Lineage shared by every world derived from this one.
    pub fn lineage(&self) -> WorldId {
        self.lineage
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The world's id source.
    pub fn ids(&self) -> &IdGen {
        &self.ids
    }

    /// Reset the id counter. Test and replay only; [`World::fresh_id`]
    /// still never hands out a live id.
    pub fn reset_ids(&mut self, seed: u64) {
        self.ids.reset(seed);
    }

    /// Next id from this world's counter that names no live entity or plant.
    pub fn fresh_id(&mut self, prefix: &str) -> Id {
        loop {
            let id = self.ids.next(prefix);
            if !self.entities.contains_key(&id) && !self.plants.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of plant nodes across all plants.
    pub fn node_count(&self) -> usize {
        self.plants.values().map(Plant::len).sum()
    }

    pub fn entities(&self) -> &OrdMap<Id, Entity> {
        &self.entities
    }

    pub fn plants(&self) -> &OrdMap<Id, Plant> {
        &self.plants
    }

    pub fn events(&self) -> &Vector<WorldEvent> {
        &self.events
    }

    /// Take the event log, leaving it empty.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events).into_iter().collect()
    }

    pub fn get(&self, id: &Id) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn node(&self, id: &Id) -> Option<&PlantNode> {
        self.get(id).and_then(Entity::as_node)
    }

    pub fn island(&self, id: &Id) -> Option<&Island> {
        self.get(id).and_then(Entity::as_island)
    }

    pub fn plant(&self, id: &Id) -> Option<&Plant> {
        self.plants.get(id)
    }

    /// The plant owning node `id`.
    pub fn plant_of(&self, id: &Id) -> Option<&Plant> {
        self.node(id).and_then(|n| self.plant(&n.plant_id))
    }

    /// Ordered children of node `id`.
    pub fn children(&self, id: &Id) -> &[Id] {
        self.plant_of(id).map(|p| p.children(id)).unwrap_or(&[])
    }

    pub fn parent(&self, id: &Id) -> Option<&Id> {
        self.plant_of(id).and_then(|p| p.parent(id))
    }

    /// Node `id` and all its descendants, pre-order.
    pub fn closure(&self, id: &Id) -> Vec<Id> {
        self.plant_of(id).map(|p| p.closure(id)).unwrap_or_default()
    }

    /// Nodes of a plant in id order.
    pub fn nodes_of<'a>(&'a self, plant_id: &Id) -> impl Iterator<Item = &'a PlantNode> + 'a {
        self.plant(plant_id)
            .into_iter()
            .flat_map(Plant::node_ids)
            .filter_map(|id| self.node(id))
    }

    /// Look up a plant node, distinguishing "absent" from "not a node".
    pub fn require_node(&self, id: &Id) -> Result<&PlantNode, WorldError> {
        match self.get(id) {
            None => Err(WorldError::EntityNotFound(id.clone())),
            Some(Entity::Island(_)) => Err(WorldError::NotAPlantNode(id.clone())),
            Some(Entity::PlantNode(node)) => Ok(node),
        }
    }

    /// Add an island and return its id.
    pub fn spawn_island(
        &mut self,
        cluster_id: Id,
        position: Vec2,
        shape: Vec<Vec2>,
        radius: f32,
        depth: f32,
    ) -> Id {
        let id = self.fresh_id("island");
        self.entities.insert(
            id.clone(),
            Entity::Island(Island {
                id: id.clone(),
                cluster_id,
                position,
                shape,
                radius,
                depth,
            }),
        );
        self.events
            .push_back(WorldEvent::IslandSpawned { id: id.clone() });
        id
    }

    /// Start a plant on `island_id` with a single root stem at depth 0.
    /// Returns the plant id.
    pub fn spawn_plant(
        &mut self,
        island_id: &Id,
        position: Vec2,
        angle: f32,
    ) -> Result<Id, WorldError> {
        match self.get(island_id) {
            None => return Err(WorldError::EntityNotFound(island_id.clone())),
            Some(Entity::PlantNode(_)) => return Err(WorldError::NotAnIsland(island_id.clone())),
            Some(Entity::Island(_)) => {}
        }
        let plant_id = self.fresh_id("plant");
        let root_id = self.fresh_id("node");
        self.entities.insert(
            root_id.clone(),
            Entity::PlantNode(PlantNode {
                id: root_id.clone(),
                plant_id: plant_id.clone(),
                kind: NodeKind::Stem,
                position,
                angle,
                depth: 0,
                charge: None,
            }),
        );
        self.plants.insert(
            plant_id.clone(),
            Plant::new(plant_id.clone(), island_id.clone(), root_id.clone()),
        );
        self.events.push_back(WorldEvent::PlantSpawned {
            id: plant_id.clone(),
            island_id: island_id.clone(),
            root_id,
        });
        Ok(plant_id)
    }

    /// Create a node under `parent` with a fresh id. Returns the new id.
    pub fn grow_child(
        &mut self,
        parent: &Id,
        kind: NodeKind,
        position: Vec2,
        angle: f32,
        charge: Option<f32>,
    ) -> Result<Id, WorldError> {
        self.require_node(parent)?;
        let id = self.fresh_id("node");
        self.attach(
            parent,
            PlantNode {
                id: id.clone(),
                plant_id: Id::from(""),
                kind,
                position,
                angle,
                depth: 0,
                charge,
            },
        )?;
        Ok(id)
    }

    /// Append `node` as the last child of `parent`, keeping its id.
    ///
    /// `plant_id` and `depth` are overwritten from the parent; a stem's
    /// charge is dropped.
    pub fn attach(&mut self, parent: &Id, mut node: PlantNode) -> Result<(), WorldError> {
        let parent_node = self.require_node(parent)?;
        if self.entities.contains_key(&node.id) || self.plants.contains_key(&node.id) {
            return Err(WorldError::DuplicateId(node.id));
        }
        let plant_id = parent_node.plant_id.clone();
        node.plant_id = plant_id.clone();
        node.depth = parent_node.depth + 1;
        if node.kind == NodeKind::Stem {
            node.charge = None;
        }
        let plant = self
            .plants
            .get_mut(&plant_id)
            .ok_or_else(|| WorldError::PlantNotFound(plant_id.clone()))?;
        plant.link(parent, node.id.clone());

        tracing::trace!(id = %node.id, %parent, plant = %plant_id, "node attached");
        self.events.push_back(WorldEvent::NodeAttached {
            id: node.id.clone(),
            plant_id,
            parent_id: parent.clone(),
            kind: node.kind,
        });
        self.entities
            .insert(node.id.clone(), Entity::PlantNode(node));
        Ok(())
    }

    /// Change a node's kind. Becoming a stem drops the charge; becoming a bud
    /// starts at zero charge if there was none. Returns the previous kind.
    pub fn set_kind(&mut self, id: &Id, kind: NodeKind) -> Result<NodeKind, WorldError> {
        let mut node = self.require_node(id)?.clone();
        let old = node.kind;
        if old == kind {
            return Ok(old);
        }
        node.kind = kind;
        node.charge = match kind {
            NodeKind::Stem => None,
            NodeKind::Bud => Some(node.charge.unwrap_or(0.0)),
        };
        self.entities.insert(id.clone(), Entity::PlantNode(node));
        self.events.push_back(WorldEvent::KindChanged {
            id: id.clone(),
            old,
            new: kind,
        });
        Ok(old)
    }

    /// Remove node `id` and every descendant from entities and adjacency.
    ///
    /// The closure is computed before anything is removed. Plant roots are
    /// refused.
    pub fn remove_subtree(&mut self, id: &Id) -> Result<RemovedSubtree, WorldError> {
        let plant_id = self.require_node(id)?.plant_id.clone();
        let plant = self
            .plants
            .get(&plant_id)
            .ok_or_else(|| WorldError::PlantNotFound(plant_id.clone()))?;
        if plant.is_root(id) {
            return Err(WorldError::RootNode(id.clone()));
        }
        let parent_id = plant
            .parent(id)
            .cloned()
            .ok_or_else(|| WorldError::EntityNotFound(id.clone()))?;
        let closure = plant.closure(id);
        let children: BTreeMap<Id, Vec<Id>> = closure
            .iter()
            .map(|c| (c.clone(), plant.children(c).to_vec()))
            .collect();

        if let Some(plant) = self.plants.get_mut(&plant_id) {
            plant.unlink_closure(&closure);
        }
        let nodes: Vec<PlantNode> = closure
            .iter()
            .filter_map(|c| match self.entities.remove(c) {
                Some(Entity::PlantNode(node)) => Some(node),
                _ => None,
            })
            .collect();

        tracing::trace!(%id, plant = %plant_id, removed = nodes.len(), "subtree removed");
        self.events.push_back(WorldEvent::SubtreeRemoved {
            root_id: id.clone(),
            plant_id: plant_id.clone(),
            removed: closure,
        });
        Ok(RemovedSubtree {
            plant_id,
            parent_id,
            nodes,
            children,
        })
    }

    /// Deterministic hash of the structural state, independent of lineage
    /// and of the event log. Uses canonical (ordered map) iteration.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.seed.to_le_bytes());
        for (id, entity) in &self.entities {
            mix(&mut h, id.as_str().as_bytes());
            match entity {
                Entity::Island(island) => {
                    mix(&mut h, island.cluster_id.as_str().as_bytes());
                    mix(&mut h, &island.position.x.to_le_bytes());
                    mix(&mut h, &island.position.y.to_le_bytes());
                }
                Entity::PlantNode(node) => {
                    mix(&mut h, node.plant_id.as_str().as_bytes());
                    mix(&mut h, &[node.kind as u8]);
                    mix(&mut h, &node.position.x.to_le_bytes());
                    mix(&mut h, &node.position.y.to_le_bytes());
                    mix(&mut h, &node.angle.to_le_bytes());
                    mix(&mut h, &node.depth.to_le_bytes());
                }
            }
        }
        for (id, plant) in &self.plants {
            mix(&mut h, id.as_str().as_bytes());
            for (parent, kids) in plant.adjacency() {
                mix(&mut h, parent.as_str().as_bytes());
                for kid in kids {
                    mix(&mut h, kid.as_str().as_bytes());
                }
            }
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// island + plant with a root stem and one bud. Returns (world, root, bud).
    fn seedling() -> (World, Id, Id) {
        let mut w = World::with_seed(3);
        let island = w.spawn_island(Id::from("cluster-a"), Vec2::ZERO, Vec::new(), 50.0, 0.0);
        let plant = w.spawn_plant(&island, Vec2::ZERO, 0.0).unwrap();
        let root = w.plant(&plant).unwrap().root_id().clone();
        let bud = w
            .grow_child(&root, NodeKind::Bud, Vec2::new(0.0, 10.0), 0.0, Some(1.0))
            .unwrap();
        (w, root, bud)
    }

    #[test]
    fn world_starts_empty() {
        let w = World::new();
        assert_eq!(w.entity_count(), 0);
        assert_eq!(w.node_count(), 0);
        assert!(w.plants().is_empty());
    }

    #[test]
    fn spawn_plant_creates_root_stem() {
        let (w, root, bud) = seedling();
        let root_node = w.node(&root).unwrap();
        assert_eq!(root_node.kind, NodeKind::Stem);
        assert_eq!(root_node.depth, 0);
        assert_eq!(w.node(&bud).unwrap().depth, 1);
        assert_eq!(w.children(&root), &[bud.clone()]);
        assert_eq!(w.parent(&bud), Some(&root));
        assert_eq!(w.entity_count(), 3);
        assert_eq!(w.node_count(), 2);
    }

    #[test]
    fn spawn_plant_requires_island() {
        let (mut w, root, _) = seedling();
        assert_eq!(
            w.spawn_plant(&root, Vec2::ZERO, 0.0),
            Err(WorldError::NotAnIsland(root))
        );
        let missing = Id::from("island-99");
        assert_eq!(
            w.spawn_plant(&missing, Vec2::ZERO, 0.0),
            Err(WorldError::EntityNotFound(missing))
        );
    }

    #[test]
    fn attach_rejects_live_ids() {
        let (mut w, root, bud) = seedling();
        let dup = w.node(&bud).unwrap().clone();
        assert_eq!(w.attach(&root, dup), Err(WorldError::DuplicateId(bud)));
    }

    #[test]
    fn fresh_id_skips_live_ids_after_reset() {
        let (mut w, _, _) = seedling();
        w.reset_ids(0);
        let id = w.fresh_id("node");
        assert!(w.get(&id).is_none());
        assert!(w.plant(&id).is_none());
    }

    #[test]
    fn set_kind_manages_charge() {
        let (mut w, _, bud) = seedling();
        assert_eq!(w.set_kind(&bud, NodeKind::Stem), Ok(NodeKind::Bud));
        assert_eq!(w.node(&bud).unwrap().charge, None);
        w.set_kind(&bud, NodeKind::Bud).unwrap();
        assert_eq!(w.node(&bud).unwrap().charge, Some(0.0));
    }

    #[test]
    fn remove_subtree_refuses_root() {
        let (mut w, root, _) = seedling();
        let before = w.clone();
        assert_eq!(w.remove_subtree(&root), Err(WorldError::RootNode(root)));
        assert_eq!(w, before);
    }

    #[test]
    fn remove_subtree_takes_closure() {
        let (mut w, root, bud) = seedling();
        w.set_kind(&bud, NodeKind::Stem).unwrap();
        let leaf = w
            .grow_child(&bud, NodeKind::Bud, Vec2::new(0.0, 20.0), 0.0, Some(0.5))
            .unwrap();
        let removed = w.remove_subtree(&bud).unwrap();
        assert_eq!(removed.parent_id, root);
        assert_eq!(removed.root().id, bud);
        assert_eq!(removed.nodes.len(), 2);
        assert_eq!(removed.children[&bud], vec![leaf.clone()]);
        assert!(w.get(&bud).is_none());
        assert!(w.get(&leaf).is_none());
        assert!(w.children(&root).is_empty());
    }

    #[test]
    fn clones_are_isolated() {
        let (w, root, _) = seedling();
        let mut edited = w.clone();
        edited
            .grow_child(&root, NodeKind::Bud, Vec2::X, 0.0, Some(0.0))
            .unwrap();
        assert_eq!(w.children(&root).len(), 1);
        assert_eq!(edited.children(&root).len(), 2);
        assert_eq!(w.lineage(), edited.lineage());
    }

    #[test]
    fn events_are_recorded() {
        let (mut w, _, bud) = seedling();
        // island + plant + bud
        assert_eq!(w.events().len(), 3);
        w.remove_subtree(&bud).unwrap();
        let events = w.drain_events();
        assert!(matches!(events.last(), Some(WorldEvent::SubtreeRemoved { .. })));
        assert!(w.events().is_empty());
    }

    #[test]
    fn state_hash_deterministic() {
        let (w1, _, _) = seedling();
        let (w2, _, _) = seedling();
        assert_ne!(w1.lineage(), w2.lineage());
        assert_eq!(w1.state_hash(), w2.state_hash());
    }

    #[test]
    fn json_round_trip_keeps_structure() {
        let (w, root, bud) = seedling();
        let json = serde_json::to_string(&w).unwrap();
        let back: World = serde_json::from_str(&json).unwrap();
        assert_eq!(back.state_hash(), w.state_hash());
        assert_eq!(back.children(&root), &[bud]);
        assert!(back.events().is_empty());
    }
}
