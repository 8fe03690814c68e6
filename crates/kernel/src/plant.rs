use arbor_common::Id;
use im::OrdMap;
use serde::{Deserialize, Serialize};

/// One rooted tree of plant nodes, anchored to an island.
///
/// `children` holds the ordered child list of every node (leaves map to an
/// empty list). `parents` is the inverse index, so each non-root node has
/// exactly one entry there and parent lookup needs no scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    id: Id,
    island_id: Id,
    root_id: Id,
    children: OrdMap<Id, Vec<Id>>,
    parents: OrdMap<Id, Id>,
}

impl Plant {
    /// A plant holding only its root.
    pub(crate) fn new(id: Id, island_id: Id, root_id: Id) -> Self {
        let mut children = OrdMap::new();
        children.insert(root_id.clone(), Vec::new());
        Self {
            id,
            island_id,
            root_id,
            children,
            parents: OrdMap::new(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn island_id(&self) -> &Id {
        &self.island_id
    }

    pub fn root_id(&self) -> &Id {
        &self.root_id
    }

    pub fn is_root(&self, id: &Id) -> bool {
        &self.root_id == id
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.children.contains_key(id)
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Ordered children of `id`; empty for leaves and unknown ids.
    pub fn children(&self, id: &Id) -> &[Id] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent(&self, id: &Id) -> Option<&Id> {
        self.parents.get(id)
    }

    /// The full adjacency map, in id order.
    pub fn adjacency(&self) -> &OrdMap<Id, Vec<Id>> {
        &self.children
    }

    pub(crate) fn parent_index(&self) -> &OrdMap<Id, Id> {
        &self.parents
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &Id> {
        self.children.keys()
    }

    /// `id` followed by all of its descendants, pre-order, children in
    /// list order. Empty when `id` is not in this plant.
    pub fn closure(&self, id: &Id) -> Vec<Id> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            stack.extend(self.children(&next).iter().rev().cloned());
            out.push(next);
        }
        out
    }

    /// Append `child` under `parent`. The caller guarantees `parent` is in
    /// the tree and `child` is not.
    pub(crate) fn link(&mut self, parent: &Id, child: Id) {
        if let Some(list) = self.children.get_mut(parent) {
            list.push(child.clone());
        }
        self.parents.insert(child.clone(), parent.clone());
        self.children.insert(child, Vec::new());
    }

    /// Remove `ids` (a closure rooted at `ids[0]`) from the tree and unhook
    /// the closure root from its parent's child list.
    pub(crate) fn unlink_closure(&mut self, ids: &[Id]) {
        let Some(top) = ids.first() else {
            return;
        };
        if let Some(parent) = self.parents.get(top).cloned() {
            if let Some(list) = self.children.get_mut(&parent) {
                list.retain(|c| c != top);
            }
        }
        for id in ids {
            self.children.remove(id);
            self.parents.remove(id);
        }
    }
}
