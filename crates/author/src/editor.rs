use crate::actions::{ActionError, Topology};
use crate::subtree::CarriedSubtree;
use arbor_common::Id;
use arbor_kernel::{World, WorldEvent};
use glam::Vec2;

/// Errors from editor operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("a subtree is already being carried")]
    AlreadyCarrying,
    #[error("no subtree is being carried")]
    NothingCarried,
}

/// What the player is looking at: the world plus whatever is in hand.
#[derive(Debug, Clone, PartialEq)]
struct EditState {
    world: World,
    carried: Option<CarriedSubtree>,
}

/// Editor with undo/redo over topology actions.
///
/// Holds the current world and the carried subtree between a cut and its
/// graft. History entries are whole states; worlds share structure, so
/// keeping many of them is cheap.
///
/// Each committed world has its event log moved into the editor, so
/// history entries never carry events. Callers collect them with
/// [`Editor::drain_events`].
pub struct Editor {
    topology: Topology,
    current: EditState,
    undo_stack: Vec<EditState>,
    redo_stack: Vec<EditState>,
    events: Vec<WorldEvent>,
}

impl Editor {
    /// Create an editor over `world` with the default growth config.
    pub fn new(world: World) -> Self {
        Self::with_topology(world, Topology::default())
    }

    pub fn with_topology(mut world: World, topology: Topology) -> Self {
        let events = world.drain_events();
        Self {
            topology,
            current: EditState {
                world,
                carried: None,
            },
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            events,
        }
    }

    pub fn world(&self) -> &World {
        &self.current.world
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The subtree in hand, if a cut is waiting for its graft.
    pub fn carried(&self) -> Option<&CarriedSubtree> {
        self.current.carried.as_ref()
    }

    pub fn is_carrying(&self) -> bool {
        self.current.carried.is_some()
    }

    pub fn sprout(&mut self, id: &Id) -> Result<(), EditError> {
        let _span = tracing::info_span!("edit", op = "sprout", %id).entered();
        let world = self.topology.sprout_bud(self.world(), id)?;
        self.commit_world(world);
        Ok(())
    }

    pub fn prune(&mut self, id: &Id) -> Result<(), EditError> {
        let _span = tracing::info_span!("edit", op = "prune", %id).entered();
        let world = self.topology.prune_node(self.world(), id)?;
        self.commit_world(world);
        Ok(())
    }

    pub fn branch(&mut self, id: &Id) -> Result<(), EditError> {
        let _span = tracing::info_span!("edit", op = "branch", %id).entered();
        let world = self.topology.branch_from_node(self.world(), id)?;
        self.commit_world(world);
        Ok(())
    }

    /// Cut `id` and pick the subtree up. The island origin is looked up
    /// from the node's plant.
    pub fn cut(&mut self, id: &Id) -> Result<(), EditError> {
        let _span = tracing::info_span!("edit", op = "cut", %id).entered();
        if self.is_carrying() {
            return Err(EditError::AlreadyCarrying);
        }
        let island_pos = self
            .world()
            .plant_of(id)
            .and_then(|p| self.world().island(p.island_id()))
            .map_or(Vec2::ZERO, |island| island.position);
        let (world, subtree) = self.topology.cut_subtree(self.world(), id, island_pos)?;
        self.commit(EditState {
            world,
            carried: Some(subtree),
        });
        Ok(())
    }

    /// Graft the carried subtree under `target`. The subtree is only used
    /// up when the graft succeeds.
    pub fn graft(&mut self, target: &Id) -> Result<(), EditError> {
        let _span = tracing::info_span!("edit", op = "graft", %target).entered();
        let subtree = self.carried().ok_or(EditError::NothingCarried)?;
        let world = self.topology.graft_subtree(self.world(), target, subtree)?;
        self.commit(EditState {
            world,
            carried: None,
        });
        Ok(())
    }

    /// Undo the last edit. Returns true if an operation was undone.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        let undone = std::mem::replace(&mut self.current, previous);
        self.redo_stack.push(undone);
        true
    }

    /// Redo the last undone edit. Returns true if an operation was redone.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let replaced = std::mem::replace(&mut self.current, next);
        self.undo_stack.push(replaced);
        true
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Events from every committed edit since the last drain, oldest
    /// first. Undo and redo add nothing.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Give up the editor, keeping the current world.
    pub fn into_world(self) -> World {
        self.current.world
    }

    fn commit_world(&mut self, world: World) {
        let carried = self.current.carried.clone();
        self.commit(EditState { world, carried });
    }

    fn commit(&mut self, mut next: EditState) {
        self.events.extend(next.world.drain_events());
        let previous = std::mem::replace(&mut self.current, next);
        self.undo_stack.push(previous);
        self.redo_stack.clear();
    }
}
