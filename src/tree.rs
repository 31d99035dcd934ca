//! Arena-backed ordered trees
//!
//! A `Context` is a rooted ordered tree of named nodes, stored as an arena
//! of `TreeNode`s addressed by `NodeId` (a plain index). Parents are
//! optional ids and child lists are `Vec<NodeId>`, which keeps sibling
//! reordering free of aliasing hazards: swapping two children only touches
//! the parent's child list.
//!
//! Nodes carry opaque metadata (`NodeData`) that the matcher copies but
//! never inspects beyond the name.

use std::collections::HashMap;

use uuid::Uuid;

/// Unique identifier for a node within one `Context`'s arena
pub type NodeId = usize;

/// Metadata attached to a tree node.
///
/// Only `name` is ever interpreted by the matcher (for conflict resolution
/// and display); the rest is provenance carried through deep copies.
#[derive(Clone, Debug)]
pub struct NodeData {
    /// Globally stable identity, preserved across deep copies
    pub id: Uuid,
    /// Human-readable symbol name
    pub name: String,
    /// Atomic concepts assigned by the linguistic layer (opaque here)
    pub concepts: Vec<String>,
    /// Label formula from the linguistic layer (opaque here)
    pub label_formula: String,
    /// Node formula from the linguistic layer (opaque here)
    pub node_formula: String,
    /// Provenance string (opaque here)
    pub provenance: String,
    /// Whether the linguistic preprocessing has run for this node
    pub is_preprocessed: bool,
    /// Whether the node belongs to a source context
    pub source: bool,
}

impl NodeData {
    /// Create metadata with the given name and a fresh v7 UUID.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            concepts: Vec::new(),
            label_formula: String::new(),
            node_formula: String::new(),
            provenance: String::new(),
            is_preprocessed: false,
            source: false,
        }
    }
}

/// A node in the arena
#[derive(Clone, Debug)]
pub struct TreeNode {
    /// Parent node (None for the root)
    pub parent: Option<NodeId>,
    /// Ordered children
    pub children: Vec<NodeId>,
    /// Attached metadata
    pub data: NodeData,
}

/// A rooted ordered tree
#[derive(Clone, Debug, Default)]
pub struct Context {
    nodes: Vec<TreeNode>,
    root: Option<NodeId>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the root node. The context must not already have a root.
    pub fn create_root(&mut self, data: NodeData) -> NodeId {
        assert!(self.root.is_none(), "context already has a root");
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            parent: None,
            children: Vec::new(),
            data,
        });
        self.root = Some(id);
        id
    }

    /// Create a new child of `parent`, appended to its child list.
    pub fn create_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// The root node, if any
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Total number of nodes in the tree
    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    /// All node ids in creation order (pre-order for trees built through
    /// the factories). Deterministic and visits every node, including
    /// nodes without any matrix entry.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len()
    }

    /// Ordered children of a node
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    /// The `index`-th child of a node
    pub fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[node].children.get(index).copied()
    }

    /// Parent of a node (None for the root)
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    /// Whether the node has no children
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes[node].children.is_empty()
    }

    /// Number of ancestors of a node; the root has 0.
    pub fn ancestor_count(&self, node: NodeId) -> usize {
        let mut count = 0;
        let mut current = self.nodes[node].parent;
        while let Some(p) = current {
            count += 1;
            current = self.nodes[p].parent;
        }
        count
    }

    /// Node name
    pub fn name(&self, node: NodeId) -> &str {
        &self.nodes[node].data.name
    }

    /// Node metadata
    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node].data
    }

    /// Mutable node metadata
    pub fn data_mut(&mut self, node: NodeId) -> &mut NodeData {
        &mut self.nodes[node].data
    }

    /// First node whose trimmed name equals `name` (creation order).
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.node_ids()
            .find(|&n| self.nodes[n].data.name.trim() == name.trim())
    }

    /// Insert `child` into `parent`'s child list at `index`, reparenting it.
    pub fn add_child_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.insert(index, child);
    }

    /// Remove `child` from `parent`'s child list. Returns false when the
    /// node was not a child of `parent`. The node itself stays in the arena.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let children = &mut self.nodes[parent].children;
        match children.iter().position(|&c| c == child) {
            Some(pos) => {
                children.remove(pos);
                self.nodes[child].parent = None;
                true
            }
            None => false,
        }
    }

    /// Deep-copy the tree into a fresh arena.
    ///
    /// Returns the copy together with the `original → copy` side table,
    /// built in the same pass. All metadata is copied verbatim (including
    /// the stable `id`), links are fresh.
    pub fn deep_copy(&self) -> (Context, HashMap<NodeId, NodeId>) {
        let mut copy = Context::new();
        let mut copy_map = HashMap::new();
        if let Some(root) = self.root {
            let copy_root = copy.create_root(self.nodes[root].data.clone());
            copy_map.insert(root, copy_root);
            self.copy_children(root, copy_root, &mut copy, &mut copy_map);
        }
        (copy, copy_map)
    }

    fn copy_children(
        &self,
        from: NodeId,
        to: NodeId,
        copy: &mut Context,
        copy_map: &mut HashMap<NodeId, NodeId>,
    ) {
        for &child in &self.nodes[from].children {
            let to_child = copy.create_child(to, self.nodes[child].data.clone());
            copy_map.insert(child, to_child);
            self.copy_children(child, to_child, copy, copy_map);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Context, NodeId, NodeId, NodeId, NodeId) {
        let mut ctx = Context::new();
        let f = ctx.create_root(NodeData::named("f"));
        let a = ctx.create_child(f, NodeData::named("a"));
        let b = ctx.create_child(f, NodeData::named("b"));
        let c = ctx.create_child(b, NodeData::named("c"));
        (ctx, f, a, b, c)
    }

    #[test]
    fn ancestor_counts() {
        let (ctx, f, a, b, c) = sample();
        assert_eq!(ctx.ancestor_count(f), 0);
        assert_eq!(ctx.ancestor_count(a), 1);
        assert_eq!(ctx.ancestor_count(b), 1);
        assert_eq!(ctx.ancestor_count(c), 2);
    }

    #[test]
    fn leaves_and_children() {
        let (ctx, f, a, b, c) = sample();
        assert!(!ctx.is_leaf(f));
        assert!(ctx.is_leaf(a));
        assert!(!ctx.is_leaf(b));
        assert!(ctx.is_leaf(c));
        assert_eq!(ctx.children(f), &[a, b]);
        assert_eq!(ctx.child_at(f, 1), Some(b));
        assert_eq!(ctx.child_at(f, 2), None);
    }

    #[test]
    fn remove_and_reinsert_child() {
        let (mut ctx, f, a, b, _c) = sample();
        assert!(ctx.remove_child(f, a));
        assert_eq!(ctx.children(f), &[b]);
        assert_eq!(ctx.parent(a), None);
        ctx.add_child_at(f, 1, a);
        assert_eq!(ctx.children(f), &[b, a]);
        assert_eq!(ctx.parent(a), Some(f));
        // removing a non-child is a no-op
        assert!(!ctx.remove_child(b, a));
    }

    #[test]
    fn deep_copy_is_isomorphic() {
        let (ctx, f, a, b, c) = sample();
        let (copy, map) = ctx.deep_copy();
        assert_eq!(copy.nodes_count(), ctx.nodes_count());
        for node in [f, a, b, c] {
            let copied = map[&node];
            assert_eq!(copy.name(copied), ctx.name(node));
            assert_eq!(copy.data(copied).id, ctx.data(node).id);
            assert_eq!(copy.ancestor_count(copied), ctx.ancestor_count(node));
            assert_eq!(
                copy.children(copied).len(),
                ctx.children(node).len()
            );
        }
        // links are fresh: mutating the copy leaves the original intact
        let mut copy = copy;
        let cf = map[&f];
        let ca = map[&a];
        copy.remove_child(cf, ca);
        assert_eq!(ctx.children(f).len(), 2);
    }

    #[test]
    fn node_by_name_finds_first() {
        let (ctx, _f, a, _b, _c) = sample();
        assert_eq!(ctx.node_by_name("a"), Some(a));
        assert_eq!(ctx.node_by_name(" a "), Some(a));
        assert_eq!(ctx.node_by_name("zzz"), None);
    }
}
