use crate::config::{ConfigError, GrowthConfig};
use crate::subtree::CarriedSubtree;
use arbor_common::{Id, WorldId, geom};
use arbor_kernel::{NodeKind, PlantNode, World, WorldError};
use glam::Vec2;
use std::collections::BTreeMap;

/// Why an action refused to run. The input world is unchanged in every case.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("node {0} not found")]
    NodeNotFound(Id),
    #[error("entity {0} is not a plant node")]
    NotAPlantNode(Id),
    #[error("node {id} is a {found}, expected a {expected}")]
    WrongKind {
        id: Id,
        expected: NodeKind,
        found: NodeKind,
    },
    #[error("node {0} is the root of its plant")]
    RootNode(Id),
    #[error("subtree was cut from world {subtree}, not {world}")]
    ForeignSubtree { subtree: WorldId, world: WorldId },
    #[error(transparent)]
    World(#[from] WorldError),
}

/// The plant topology actions: sprout, prune, branch, cut and graft.
///
/// Each action is a pure function of the world it is given. It clones the
/// world (O(1), persistent maps), edits the clone, and returns it. Callers
/// that want the "world or nothing" shape can use `.ok()`.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    config: GrowthConfig,
}

impl Topology {
    pub fn new(config: GrowthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GrowthConfig {
        &self.config
    }

    /// Turn a bud into a stem and grow `sprout_count` buds from it, fanned
    /// around the bud's angle.
    pub fn sprout_bud(&self, world: &World, node_id: &Id) -> Result<World, ActionError> {
        self.sprout(world, node_id)
            .inspect_err(|e| tracing::debug!(node = %node_id, error = %e, "sprout rejected"))
    }

    fn sprout(&self, world: &World, node_id: &Id) -> Result<World, ActionError> {
        let node = require_kind(world, node_id, NodeKind::Bud)?;
        let (origin, base) = (node.position, node.angle);

        let mut next = world.clone();
        next.set_kind(node_id, NodeKind::Stem)?;
        let angles = geom::fan(base, self.config.sprout_count, self.config.sprout_spread);
        for angle in &angles {
            self.grow_bud(&mut next, node_id, origin, *angle)?;
        }
        tracing::debug!(node = %node_id, buds = angles.len(), "bud sprouted");
        Ok(next)
    }

    /// Remove a non-root node and everything below it.
    pub fn prune_node(&self, world: &World, node_id: &Id) -> Result<World, ActionError> {
        self.prune(world, node_id)
            .inspect_err(|e| tracing::debug!(node = %node_id, error = %e, "prune rejected"))
    }

    fn prune(&self, world: &World, node_id: &Id) -> Result<World, ActionError> {
        require_non_root(world, node_id)?;
        let mut next = world.clone();
        let removed = next.remove_subtree(node_id)?;
        tracing::debug!(node = %node_id, removed = removed.nodes.len(), "node pruned");
        Ok(next)
    }

    /// Add one bud to a stem. Successive branches alternate sides.
    pub fn branch_from_node(&self, world: &World, node_id: &Id) -> Result<World, ActionError> {
        self.branch(world, node_id)
            .inspect_err(|e| tracing::debug!(node = %node_id, error = %e, "branch rejected"))
    }

    fn branch(&self, world: &World, node_id: &Id) -> Result<World, ActionError> {
        let node = require_kind(world, node_id, NodeKind::Stem)?;
        let side = if world.children(node_id).len() % 2 == 0 {
            1.0
        } else {
            -1.0
        };
        let angle = node.angle + side * self.config.branch_angle;
        let origin = node.position;

        let mut next = world.clone();
        let bud = self.grow_bud(&mut next, node_id, origin, angle)?;
        tracing::debug!(node = %node_id, %bud, "branch grown");
        Ok(next)
    }

    /// Detach a non-root node's closure into a [`CarriedSubtree`].
    ///
    /// `island_pos` is the origin of the node's island; carried positions are
    /// island-local positions shifted by it.
    pub fn cut_subtree(
        &self,
        world: &World,
        node_id: &Id,
        island_pos: Vec2,
    ) -> Result<(World, CarriedSubtree), ActionError> {
        self.cut(world, node_id, island_pos)
            .inspect_err(|e| tracing::debug!(node = %node_id, error = %e, "cut rejected"))
    }

    fn cut(
        &self,
        world: &World,
        node_id: &Id,
        island_pos: Vec2,
    ) -> Result<(World, CarriedSubtree), ActionError> {
        require_non_root(world, node_id)?;
        let mut next = world.clone();
        let removed = next.remove_subtree(node_id)?;
        let subtree = CarriedSubtree::from_removed(world.lineage(), removed, island_pos);
        tracing::debug!(node = %node_id, carried = subtree.len(), "subtree cut");
        Ok((next, subtree))
    }

    /// Attach a copy of `subtree` under the stem `target_id`.
    ///
    /// Every carried node gets a fresh id and joins the target's plant. The
    /// subtree itself is left as is; dropping it after a successful graft
    /// is up to the caller.
    pub fn graft_subtree(
        &self,
        world: &World,
        target_id: &Id,
        subtree: &CarriedSubtree,
    ) -> Result<World, ActionError> {
        self.graft_subtree_mapped(world, target_id, subtree)
            .map(|(next, _)| next)
    }

    /// [`Topology::graft_subtree`], also returning the old → new id map.
    pub fn graft_subtree_mapped(
        &self,
        world: &World,
        target_id: &Id,
        subtree: &CarriedSubtree,
    ) -> Result<(World, BTreeMap<Id, Id>), ActionError> {
        self.graft(world, target_id, subtree)
            .inspect_err(|e| tracing::debug!(target = %target_id, error = %e, "graft rejected"))
    }

    fn graft(
        &self,
        world: &World,
        target_id: &Id,
        subtree: &CarriedSubtree,
    ) -> Result<(World, BTreeMap<Id, Id>), ActionError> {
        let target = require_kind(world, target_id, NodeKind::Stem)?;
        if subtree.lineage() != world.lineage() {
            return Err(ActionError::ForeignSubtree {
                subtree: subtree.lineage(),
                world: world.lineage(),
            });
        }
        // The grafted root lands `graft_offset` out along the target's angle,
        // and the rest keep their offsets from it.
        let anchor = geom::offset_along(target.position, target.angle, self.config.graft_offset);
        let plant_id = target.plant_id.clone();
        let base_depth = target.depth + 1;
        let root_depth = subtree.root().depth;
        let by_id: BTreeMap<&Id, &PlantNode> = subtree.nodes().iter().map(|n| (&n.id, n)).collect();

        let mut next = world.clone();
        let mut remap = BTreeMap::new();
        let mut stack = vec![(subtree.root_id().clone(), target_id.clone())];
        while let Some((old_id, parent)) = stack.pop() {
            let Some(old) = by_id.get(&old_id) else {
                continue;
            };
            let new_id = next.fresh_id("node");
            next.attach(
                &parent,
                PlantNode {
                    id: new_id.clone(),
                    plant_id: plant_id.clone(),
                    kind: old.kind,
                    position: anchor + subtree.offset_of(old),
                    angle: old.angle,
                    depth: base_depth + old.depth.saturating_sub(root_depth),
                    charge: old.charge,
                },
            )?;
            for child in subtree.children(&old_id).iter().rev() {
                stack.push((child.clone(), new_id.clone()));
            }
            remap.insert(old_id, new_id);
        }

        tracing::debug!(
            target = %target_id,
            grafted = remap.len(),
            root = ?remap.get(subtree.root_id()),
            "subtree grafted"
        );
        Ok((next, remap))
    }

    fn grow_bud(
        &self,
        world: &mut World,
        parent: &Id,
        origin: Vec2,
        angle: f32,
    ) -> Result<Id, WorldError> {
        world.grow_child(
            parent,
            NodeKind::Bud,
            geom::offset_along(origin, angle, self.config.segment_length),
            angle,
            Some(self.config.bud_charge),
        )
    }
}

fn require_node<'w>(world: &'w World, id: &Id) -> Result<&'w PlantNode, ActionError> {
    world.require_node(id).map_err(|e| match e {
        WorldError::EntityNotFound(id) => ActionError::NodeNotFound(id),
        WorldError::NotAPlantNode(id) => ActionError::NotAPlantNode(id),
        other => ActionError::World(other),
    })
}

fn require_kind<'w>(
    world: &'w World,
    id: &Id,
    expected: NodeKind,
) -> Result<&'w PlantNode, ActionError> {
    let node = require_node(world, id)?;
    if node.kind != expected {
        return Err(ActionError::WrongKind {
            id: id.clone(),
            expected,
            found: node.kind,
        });
    }
    Ok(node)
}

fn require_non_root<'w>(world: &'w World, id: &Id) -> Result<&'w PlantNode, ActionError> {
    let node = require_node(world, id)?;
    let plant = world
        .plant(&node.plant_id)
        .ok_or_else(|| WorldError::PlantNotFound(node.plant_id.clone()))?;
    if plant.is_root(id) {
        return Err(ActionError::RootNode(id.clone()));
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_GRAFT_DISTANCE;

    /// One island at (100, 50) holding root(stem) -> bud(charge 1.0).
    fn scenario_a() -> (World, Id, Id) {
        let mut w = World::with_seed(1);
        let island = w.spawn_island(Id::from("cluster-0"), Vec2::new(100.0, 50.0), Vec::new(), 60.0, 0.0);
        let plant = w.spawn_plant(&island, Vec2::ZERO, std::f32::consts::FRAC_PI_2).unwrap();
        let root = w.plant(&plant).unwrap().root_id().clone();
        let bud = w
            .grow_child(&root, NodeKind::Bud, Vec2::new(0.0, 18.0), std::f32::consts::FRAC_PI_2, Some(1.0))
            .unwrap();
        (w, root, bud)
    }

    #[test]
    fn sprout_turns_bud_into_stem_with_children() {
        let (w, _, bud) = scenario_a();
        let topo = Topology::default();
        let next = topo.sprout_bud(&w, &bud).unwrap();

        let node = next.node(&bud).unwrap();
        assert_eq!(node.kind, NodeKind::Stem);
        assert_eq!(node.charge, None);
        assert_eq!(node.depth, 1);
        let kids = next.children(&bud);
        assert_eq!(kids.len(), topo.config().sprout_count);
        for kid in kids {
            let child = next.node(kid).unwrap();
            assert!(child.is_bud());
            assert_eq!(child.depth, 2);
            assert!(next.children(kid).is_empty());
            assert!(child.position.distance(node.position) > 0.0);
        }
        assert_eq!(next.validate(), Ok(()));
        // input untouched
        assert_eq!(w.node(&bud).unwrap().kind, NodeKind::Bud);
        assert!(w.children(&bud).is_empty());
    }

    #[test]
    fn sprout_rejects_stems_and_unknown_ids() {
        let (w, root, _) = scenario_a();
        let topo = Topology::default();
        assert_eq!(
            topo.sprout_bud(&w, &root),
            Err(ActionError::WrongKind {
                id: root.clone(),
                expected: NodeKind::Bud,
                found: NodeKind::Stem,
            })
        );
        let missing = Id::from("node-404");
        assert_eq!(
            topo.sprout_bud(&w, &missing),
            Err(ActionError::NodeNotFound(missing))
        );
    }

    #[test]
    fn actions_reject_islands() {
        let (w, _, _) = scenario_a();
        let island = w
            .entities()
            .values()
            .find_map(|e| e.as_island().map(|i| i.id.clone()))
            .unwrap();
        let topo = Topology::default();
        assert_eq!(
            topo.prune_node(&w, &island),
            Err(ActionError::NotAPlantNode(island.clone()))
        );
        assert_eq!(
            topo.branch_from_node(&w, &island),
            Err(ActionError::NotAPlantNode(island))
        );
    }

    #[test]
    fn sprout_count_follows_config() {
        let (w, _, bud) = scenario_a();
        let topo = Topology::new(GrowthConfig {
            sprout_count: 3,
            ..GrowthConfig::default()
        })
        .unwrap();
        let next = topo.sprout_bud(&w, &bud).unwrap();
        assert_eq!(next.children(&bud).len(), 3);
    }

    #[test]
    fn prune_root_is_rejected() {
        let (w, root, _) = scenario_a();
        assert_eq!(
            Topology::default().prune_node(&w, &root),
            Err(ActionError::RootNode(root))
        );
    }

    #[test]
    fn prune_removes_closure() {
        let (w, root, bud) = scenario_a();
        let topo = Topology::default();
        let grown = topo.sprout_bud(&w, &bud).unwrap();
        let closure = grown.closure(&bud);
        assert_eq!(closure.len(), 3);

        let pruned = topo.prune_node(&grown, &bud).unwrap();
        for id in &closure {
            assert!(pruned.get(id).is_none());
        }
        assert!(pruned.children(&root).is_empty());
        assert_eq!(pruned.node_count(), 1);
        assert_eq!(pruned.validate(), Ok(()));
    }

    #[test]
    fn branch_adds_exactly_one_bud_alternating_sides() {
        let (w, root, _) = scenario_a();
        let topo = Topology::default();
        let once = topo.branch_from_node(&w, &root).unwrap();
        let twice = topo.branch_from_node(&once, &root).unwrap();

        assert_eq!(once.children(&root).len(), 2);
        assert_eq!(twice.children(&root).len(), 3);
        let root_angle = w.node(&root).unwrap().angle;
        let a1 = once.node(&once.children(&root)[1]).unwrap();
        let a2 = twice.node(&twice.children(&root)[2]).unwrap();
        assert!(a1.is_bud() && a2.is_bud());
        assert_eq!(a1.depth, 1);
        assert!((a1.angle - root_angle) * (a2.angle - root_angle) < 0.0);
        assert_eq!(twice.validate(), Ok(()));
    }

    #[test]
    fn branch_rejects_buds() {
        let (w, _, bud) = scenario_a();
        assert!(matches!(
            Topology::default().branch_from_node(&w, &bud),
            Err(ActionError::WrongKind { expected: NodeKind::Stem, .. })
        ));
    }

    #[test]
    fn cut_records_world_frame_positions() {
        let (w, _, bud) = scenario_a();
        let island_pos = Vec2::new(100.0, 50.0);
        let (next, subtree) = Topology::default().cut_subtree(&w, &bud, island_pos).unwrap();
        assert_eq!(subtree.root_id(), &bud);
        assert_eq!(subtree.len(), 1);
        assert_eq!(subtree.root().position, w.node(&bud).unwrap().position + island_pos);
        assert_eq!(subtree.lineage(), w.lineage());
        assert!(next.get(&bud).is_none());
    }

    #[test]
    fn cut_root_is_rejected() {
        let (w, root, _) = scenario_a();
        assert_eq!(
            Topology::default().cut_subtree(&w, &root, Vec2::ZERO),
            Err(ActionError::RootNode(root))
        );
    }

    #[test]
    fn graft_lands_away_from_target() {
        let (w, root, bud) = scenario_a();
        let topo = Topology::default();
        let (cut, subtree) = topo.cut_subtree(&w, &bud, Vec2::ZERO).unwrap();
        let (grafted, remap) = topo.graft_subtree_mapped(&cut, &root, &subtree).unwrap();

        let new_root = grafted.node(&remap[&bud]).unwrap();
        let target = grafted.node(&root).unwrap();
        assert!(new_root.position.distance(target.position) > MIN_GRAFT_DISTANCE);
        assert_eq!(new_root.charge, Some(1.0));
        assert_eq!(grafted.children(&root), &[remap[&bud].clone()]);
    }

    #[test]
    fn graft_rejects_bud_target_and_foreign_subtree() {
        let (w, _, bud) = scenario_a();
        let topo = Topology::default();
        let sprouted = topo.sprout_bud(&w, &bud).unwrap();
        let leaf = sprouted.children(&bud)[0].clone();
        let (cut, subtree) = topo.cut_subtree(&sprouted, &leaf, Vec2::ZERO).unwrap();

        let target_bud = cut.children(&bud)[0].clone();
        assert!(matches!(
            topo.graft_subtree(&cut, &target_bud, &subtree),
            Err(ActionError::WrongKind { .. })
        ));

        let (other, _, _) = scenario_a();
        let other_root = other
            .plants()
            .values()
            .next()
            .map(|p| p.root_id().clone())
            .unwrap();
        assert!(matches!(
            topo.graft_subtree(&other, &other_root, &subtree),
            Err(ActionError::ForeignSubtree { .. })
        ));
        assert_eq!(other.node_count(), 2);
    }

    #[test]
    fn same_subtree_grafts_twice_with_distinct_ids() {
        let (w, root, bud) = scenario_a();
        let topo = Topology::default();
        let (cut, subtree) = topo.cut_subtree(&w, &bud, Vec2::ZERO).unwrap();
        let (once, first) = topo.graft_subtree_mapped(&cut, &root, &subtree).unwrap();
        let (twice, second) = topo.graft_subtree_mapped(&once, &root, &subtree).unwrap();
        assert_ne!(first[&bud], second[&bud]);
        assert_eq!(twice.children(&root).len(), 2);
        assert_eq!(twice.validate(), Ok(()));
    }

    #[test]
    fn equal_inputs_give_equal_outputs() {
        let (w, _, bud) = scenario_a();
        let topo = Topology::default();
        let a = topo.sprout_bud(&w, &bud).unwrap();
        let b = topo.sprout_bud(&w, &bud).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.state_hash(), b.state_hash());
    }
}
