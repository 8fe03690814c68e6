//! Property tests for topology actions.
//!
//! Validates, over random edit sequences:
//! - Every accepted edit yields a world that passes `World::validate`.
//! - No edit, accepted or rejected, changes the world it was given.
//! - Cut followed by graft keeps the entity count and mints only new ids.
//! - Roots can never be pruned or cut.

use arbor_author::Topology;
use arbor_common::Id;
use arbor_kernel::{NodeKind, World};
use glam::Vec2;
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Op {
    Sprout(usize),
    Prune(usize),
    Branch(usize),
    CutGraft(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<usize>().prop_map(Op::Sprout),
        1 => any::<usize>().prop_map(Op::Prune),
        3 => any::<usize>().prop_map(Op::Branch),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::CutGraft(a, b)),
    ]
}

fn seedling() -> World {
    let mut w = World::with_seed(5);
    let island = w.spawn_island(Id::from("cluster-0"), Vec2::new(3.0, 4.0), Vec::new(), 50.0, 0.0);
    let plant = w.spawn_plant(&island, Vec2::ZERO, 1.0).unwrap();
    let root = w.plant(&plant).unwrap().root_id().clone();
    w.grow_child(&root, NodeKind::Bud, Vec2::new(0.0, 10.0), 1.0, Some(1.0))
        .unwrap();
    w
}

/// Node ids in the world, in id order.
fn node_ids(w: &World) -> Vec<Id> {
    w.entities()
        .iter()
        .filter(|(_, e)| e.as_node().is_some())
        .map(|(id, _)| id.clone())
        .collect()
}

fn pick(ids: &[Id], i: usize) -> Id {
    ids[i % ids.len()].clone()
}

fn apply(topo: &Topology, w: &World, op: &Op) -> Option<World> {
    let ids = node_ids(w);
    match *op {
        Op::Sprout(i) => topo.sprout_bud(w, &pick(&ids, i)).ok(),
        Op::Prune(i) => topo.prune_node(w, &pick(&ids, i)).ok(),
        Op::Branch(i) => topo.branch_from_node(w, &pick(&ids, i)).ok(),
        Op::CutGraft(a, b) => {
            let (cut, subtree) = topo.cut_subtree(w, &pick(&ids, a), Vec2::ZERO).ok()?;
            let remaining = node_ids(&cut);
            topo.graft_subtree(&cut, &pick(&remaining, b), &subtree).ok()
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn edits_preserve_invariants(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let topo = Topology::default();
        let mut world = seedling();
        for op in &ops {
            let before = world.clone();
            let next = apply(&topo, &world, op);
            prop_assert_eq!(&world, &before);
            if let Some(next) = next {
                prop_assert_eq!(next.validate(), Ok(()));
                world = next;
            }
        }
    }

    #[test]
    fn cut_then_graft_conserves_nodes(
        ops in prop::collection::vec(op_strategy(), 0..20),
        cut_at in any::<usize>(),
        graft_at in any::<usize>(),
    ) {
        let topo = Topology::default();
        let mut world = seedling();
        for op in &ops {
            if let Some(next) = apply(&topo, &world, op) {
                world = next;
            }
        }
        let ids = node_ids(&world);
        let Ok((cut, subtree)) = topo.cut_subtree(&world, &pick(&ids, cut_at), Vec2::ZERO) else {
            return Ok(());
        };
        let closure = world.closure(subtree.root_id());
        prop_assert_eq!(subtree.len(), closure.len());

        let stems: Vec<Id> = node_ids(&cut)
            .into_iter()
            .filter(|id| cut.node(id).is_some_and(|n| n.is_stem()))
            .collect();
        let target = pick(&stems, graft_at);
        let pre_graft: BTreeSet<Id> = cut.entities().keys().cloned().collect();
        let (grafted, remap) = topo.graft_subtree_mapped(&cut, &target, &subtree).unwrap();

        prop_assert_eq!(grafted.entity_count(), world.entity_count());
        prop_assert_eq!(remap.len(), closure.len());
        for new_id in remap.values() {
            prop_assert!(!pre_graft.contains(new_id));
        }
        prop_assert_eq!(grafted.validate(), Ok(()));
    }

    #[test]
    fn roots_are_never_pruned_or_cut(ops in prop::collection::vec(op_strategy(), 0..20)) {
        let topo = Topology::default();
        let mut world = seedling();
        for op in &ops {
            if let Some(next) = apply(&topo, &world, op) {
                world = next;
            }
        }
        for plant in world.plants().values() {
            prop_assert!(topo.prune_node(&world, plant.root_id()).is_err());
            prop_assert!(topo.cut_subtree(&world, plant.root_id(), Vec2::ZERO).is_err());
        }
    }
}
