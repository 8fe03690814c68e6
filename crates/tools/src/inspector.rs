use arbor_common::Id;
use arbor_kernel::{Entity, NodeKind, World};
use std::fmt;

/// World inspector for developer tooling.
///
/// Provides read-only queries against the world state for debugging and
/// the CLI.
pub struct WorldInspector;

impl WorldInspector {
    /// Produce a summary of the world state.
    pub fn summary(world: &World) -> WorldSummary {
        let mut summary = WorldSummary {
            seed: world.seed(),
            islands: 0,
            plants: world.plants().len(),
            stems: 0,
            buds: 0,
            pending_events: world.events().len(),
        };
        for entity in world.entities().values() {
            match entity {
                Entity::Island(_) => summary.islands += 1,
                Entity::PlantNode(n) if n.kind == NodeKind::Stem => summary.stems += 1,
                Entity::PlantNode(_) => summary.buds += 1,
            }
        }
        summary
    }

    pub fn plant_summary(world: &World, plant_id: &Id) -> Option<PlantSummary> {
        let plant = world.plant(plant_id)?;
        let mut summary = PlantSummary {
            id: plant_id.clone(),
            island_id: plant.island_id().clone(),
            root_id: plant.root_id().clone(),
            nodes: plant.len(),
            stems: 0,
            buds: 0,
            max_depth: 0,
        };
        for node in world.nodes_of(plant_id) {
            match node.kind {
                NodeKind::Stem => summary.stems += 1,
                NodeKind::Bud => summary.buds += 1,
            }
            summary.max_depth = summary.max_depth.max(node.depth);
        }
        Some(summary)
    }

    /// Indented outline of a plant, one node per line, children in order.
    pub fn outline<'a>(world: &'a World, plant_id: &Id) -> Option<PlantOutline<'a>> {
        world.plant(plant_id)?;
        Some(PlantOutline {
            world,
            plant_id: plant_id.clone(),
        })
    }
}

/// Display adapter returned by [`WorldInspector::outline`].
pub struct PlantOutline<'a> {
    world: &'a World,
    plant_id: Id,
}

impl fmt::Display for PlantOutline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(plant) = self.world.plant(&self.plant_id) else {
            return Ok(());
        };
        for id in plant.closure(plant.root_id()) {
            let Some(node) = self.world.node(&id) else {
                continue;
            };
            let indent = "  ".repeat(node.depth as usize);
            write!(f, "{indent}{} {id}", node.kind)?;
            if let Some(c) = node.charge {
                write!(f, " charge={c:.2}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Summary of world state for the inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldSummary {
    pub seed: u64,
    pub islands: usize,
    pub plants: usize,
    pub stems: usize,
    pub buds: usize,
    pub pending_events: usize,
}

impl fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "World: seed={} islands={} plants={} stems={} buds={} pending_events={}",
            self.seed, self.islands, self.plants, self.stems, self.buds, self.pending_events
        )
    }
}

/// Counts for one plant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantSummary {
    pub id: Id,
    pub island_id: Id,
    pub root_id: Id,
    pub nodes: usize,
    pub stems: usize,
    pub buds: usize,
    pub max_depth: u32,
}

impl fmt::Display for PlantSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plant [{}] on {} root={} nodes={} stems={} buds={} depth={}",
            self.id, self.island_id, self.root_id, self.nodes, self.stems, self.buds, self.max_depth
        )
    }
}
