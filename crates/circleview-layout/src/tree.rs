use crate::shape::NodeShape;
use circleview_core::{NodeData, NodeKind, ReferenceShape, TreeError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node of the containment hierarchy.
///
/// `children` lists every child known to the tree, in stable draw order.
/// `current_children` is the derived subset that survives the active filter
/// and is not hidden by folding; it is the only child list the layout passes
/// ever look at. A node whose `current_children` is empty is *currently a
/// leaf* regardless of its original children.
#[derive(Debug, Clone)]
pub struct Node {
    pub full_name: String,
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeIndex>,
    pub folded: bool,
    pub(crate) visible: bool,
    children: Vec<NodeIndex>,
    current_children: Vec<NodeIndex>,
    pub shape: NodeShape,
}

impl Node {
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    pub fn current_children(&self) -> &[NodeIndex] {
        &self.current_children
    }

    pub fn is_currently_leaf(&self) -> bool {
        self.current_children.is_empty()
    }

    /// A leaf of the original tree, before folding or filtering.
    pub fn is_original_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The containment tree, stored arena-style: nodes own their children by
/// index, shapes read their reference geometry through the arena, and no
/// node holds a pointer back into the tree.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    node_map: HashMap<String, NodeIndex>,
    root: NodeIndex,
    filter: Option<HashSet<String>>,
}

impl Tree {
    /// Build a tree from a nested descriptor. The descriptor's child order
    /// is preserved; duplicate full names are rejected.
    pub fn build(data: &NodeData) -> Result<Self, TreeError> {
        let mut tree = Self {
            nodes: Vec::with_capacity(data.node_count()),
            node_map: HashMap::with_capacity(data.node_count()),
            root: NodeIndex(0),
            filter: None,
        };
        tree.insert(data, None)?;
        tree.refresh_current_children();
        Ok(tree)
    }

    fn insert(&mut self, data: &NodeData, parent: Option<NodeIndex>) -> Result<NodeIndex, TreeError> {
        if self.node_map.contains_key(&data.full_name) {
            return Err(TreeError::DuplicateNode(data.full_name.clone()));
        }

        let idx = NodeIndex(self.nodes.len());
        let shape = if parent.is_none() {
            NodeShape::new_root_rect()
        } else {
            NodeShape::new_circle()
        };
        self.nodes.push(Node {
            full_name: data.full_name.clone(),
            name: data.name.clone(),
            kind: data.kind,
            parent,
            folded: false,
            visible: false,
            children: Vec::with_capacity(data.children.len()),
            current_children: Vec::new(),
            shape,
        });
        self.node_map.insert(data.full_name.clone(), idx);

        for child in &data.children {
            let child_idx = self.insert(child, Some(idx))?;
            self.nodes[idx.0].children.push(child_idx);
        }
        Ok(idx)
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    pub fn index_of(&self, full_name: &str) -> Result<NodeIndex, TreeError> {
        self.node_map
            .get(full_name)
            .copied()
            .ok_or_else(|| TreeError::UnknownNode(full_name.to_string()))
    }

    pub fn get(&self, full_name: &str) -> Option<&Node> {
        self.node_map.get(full_name).map(|&idx| &self.nodes[idx.0])
    }

    /// Fold or unfold an inner node. Returns whether anything changed; the
    /// root ignores fold requests.
    pub fn set_folded(&mut self, idx: NodeIndex, folded: bool) -> bool {
        if idx == self.root {
            tracing::warn!("the root node cannot be folded, ignoring request");
            return false;
        }
        if self[idx].folded == folded {
            return false;
        }
        self[idx].folded = folded;
        self.refresh_current_children();
        true
    }

    pub fn fold_all(&mut self) {
        self.set_all_folded(true);
    }

    pub fn unfold_all(&mut self) {
        self.set_all_folded(false);
    }

    fn set_all_folded(&mut self, folded: bool) {
        let root = self.root;
        for idx in 0..self.nodes.len() {
            let node = &mut self.nodes[idx];
            if NodeIndex(idx) != root && !node.children.is_empty() {
                node.folded = folded;
            }
        }
        self.refresh_current_children();
    }

    /// Install the filter collaborator's latest snapshot: the set of full
    /// names that remain visible, or `None` for "everything". Entries naming
    /// unknown nodes are skipped.
    pub fn set_filter(&mut self, visible: Option<HashSet<String>>) {
        if let Some(names) = &visible {
            for name in names {
                if !self.node_map.contains_key(name) {
                    tracing::warn!("filter snapshot names unknown node '{}', skipping it", name);
                }
            }
        }
        self.filter = visible;
        self.refresh_current_children();
    }

    /// Recompute every node's current children from (original children,
    /// fold flag, filter snapshot). Called synchronously before each
    /// relayout; the layout passes treat the result as immutable.
    pub fn refresh_current_children(&mut self) {
        for idx in 0..self.nodes.len() {
            let current = if self.nodes[idx].folded {
                Vec::new()
            } else {
                self.nodes[idx]
                    .children
                    .iter()
                    .copied()
                    .filter(|&child| self.passes_filter(child))
                    .collect()
            };
            self.nodes[idx].current_children = current;
        }
    }

    fn passes_filter(&self, idx: NodeIndex) -> bool {
        match &self.filter {
            None => true,
            Some(names) => names.contains(&self.nodes[idx.0].full_name),
        }
    }

    /// Current descendants of `idx` in breadth-first order, `idx` excluded.
    pub fn current_descendants(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut result = Vec::new();
        let mut queue: VecDeque<NodeIndex> = self[idx].current_children.iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            result.push(next);
            queue.extend(self[next].current_children.iter().copied());
        }
        result
    }

    /// All nodes participating in the current layout: the root plus its
    /// current descendants.
    pub fn currently_visible(&self) -> Vec<NodeIndex> {
        let mut result = vec![self.root];
        result.extend(self.current_descendants(self.root));
        result
    }

    /// Ancestors of `idx`, nearest first, root last.
    pub fn ancestors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut result = Vec::new();
        let mut current = self[idx].parent;
        while let Some(parent) = current {
            result.push(parent);
            current = self[parent].parent;
        }
        result
    }

    /// The geometry `idx`'s relative position is composed against.
    pub fn reference_shape(&self, idx: NodeIndex) -> ReferenceShape {
        match self[idx].parent {
            None => ReferenceShape::Zero,
            Some(parent) => self[parent].shape.absolute.as_reference(),
        }
    }

    /// Re-derive absolute centers below `idx` from the relative positions,
    /// level by level. Must run whenever an ancestor moved or resized.
    pub fn compose_absolute_positions_below(&mut self, idx: NodeIndex) {
        let mut queue = VecDeque::from([idx]);
        while let Some(parent) = queue.pop_front() {
            let parent_center = self[parent].shape.absolute_center();
            let children: Vec<NodeIndex> = self[parent].current_children.clone();
            for child in children {
                let absolute = parent_center + self[child].shape.relative_position;
                self[child].shape.absolute.set_center(absolute);
                queue.push_back(child);
            }
        }
    }
}

impl Index<NodeIndex> for Tree {
    type Output = Node;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl IndexMut<NodeIndex> for Tree {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}
