//! Mappings between two contexts
//!
//! A `ContextMapping` is a sparse two-argument relation on
//! (source node, target node) pairs, carried together with the two trees it
//! relates and a similarity score slot. The matrix is keyed by node-id pairs
//! with a defaulting read: absent entries read as `Idk`, and writing `Idk`
//! deletes the entry.
//!
//! Candidate mappings (produced by an upstream element-level matcher) are
//! dense and unconstrained; the SPSM filter prunes them down to mappings
//! that are one-to-one and same-structure.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::relation::Relation;
use crate::tree::{Context, NodeId};

/// An immutable (source, target, relation) triple
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MappingElement {
    pub source: NodeId,
    pub target: NodeId,
    pub relation: Relation,
}

impl MappingElement {
    pub fn new(source: NodeId, target: NodeId, relation: Relation) -> Self {
        Self {
            source,
            target,
            relation,
        }
    }
}

/// The sparse relation store shared by candidate and filtered mappings.
///
/// Insertion-ordered so that iteration over surviving elements is
/// deterministic.
#[derive(Clone, Debug, Default)]
pub(crate) struct RelationMatrix {
    entries: IndexMap<(NodeId, NodeId), Relation>,
}

impl RelationMatrix {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Read a relation; absent entries read as `Idk`.
    pub(crate) fn get(&self, source: NodeId, target: NodeId) -> Relation {
        self.entries
            .get(&(source, target))
            .copied()
            .unwrap_or(Relation::Idk)
    }

    /// Store a relation; `Idk` deletes the entry.
    pub(crate) fn set(&mut self, source: NodeId, target: NodeId, relation: Relation) {
        if relation == Relation::Idk {
            self.entries.shift_remove(&(source, target));
        } else {
            self.entries.insert((source, target), relation);
        }
    }

    /// Number of non-`Idk` entries
    pub(crate) fn size(&self) -> usize {
        self.entries.len()
    }

    /// All non-`Idk` entries in insertion order
    pub(crate) fn elements(&self) -> impl Iterator<Item = MappingElement> + '_ {
        self.entries
            .iter()
            .map(|(&(source, target), &relation)| MappingElement {
                source,
                target,
                relation,
            })
    }
}

/// A mapping between two contexts: the relation matrix plus the trees it
/// ranges over and the similarity attached by the filter.
#[derive(Clone, Debug)]
pub struct ContextMapping {
    source: Rc<Context>,
    target: Rc<Context>,
    matrix: RelationMatrix,
    similarity: f64,
}

impl ContextMapping {
    /// Create an empty mapping over the given contexts
    pub fn new(source: Rc<Context>, target: Rc<Context>) -> Self {
        Self {
            source,
            target,
            matrix: RelationMatrix::new(),
            similarity: 0.0,
        }
    }

    pub(crate) fn from_parts(
        source: Rc<Context>,
        target: Rc<Context>,
        matrix: RelationMatrix,
        similarity: f64,
    ) -> Self {
        Self {
            source,
            target,
            matrix,
            similarity,
        }
    }

    pub(crate) fn into_parts(self) -> (Rc<Context>, Rc<Context>, RelationMatrix) {
        (self.source, self.target, self.matrix)
    }

    /// The source tree
    pub fn source_context(&self) -> &Context {
        &self.source
    }

    /// The target tree
    pub fn target_context(&self) -> &Context {
        &self.target
    }

    /// Shared handle to the source tree
    pub fn source_rc(&self) -> Rc<Context> {
        Rc::clone(&self.source)
    }

    /// Shared handle to the target tree
    pub fn target_rc(&self) -> Rc<Context> {
        Rc::clone(&self.target)
    }

    /// Read the relation for a node pair; absent entries read as `Idk`.
    pub fn get_relation(&self, source: NodeId, target: NodeId) -> Relation {
        self.matrix.get(source, target)
    }

    /// Store a relation for a node pair; `Idk` deletes the entry.
    pub fn set_relation(&mut self, source: NodeId, target: NodeId, relation: Relation) {
        self.matrix.set(source, target, relation);
    }

    /// Insert a mapping element
    pub fn add(&mut self, element: MappingElement) {
        self.matrix
            .set(element.source, element.target, element.relation);
    }

    /// Number of non-`Idk` entries
    pub fn size(&self) -> usize {
        self.matrix.size()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.size() == 0
    }

    /// All non-`Idk` entries in insertion order
    pub fn elements(&self) -> impl Iterator<Item = MappingElement> + '_ {
        self.matrix.elements()
    }

    /// Every node of the source tree, in deterministic order. Includes
    /// nodes with only `Idk` entries; the filter relies on full row scans.
    pub fn source_nodes(&self) -> impl Iterator<Item = NodeId> {
        self.source.node_ids()
    }

    /// Every node of the target tree, in deterministic order.
    pub fn target_nodes(&self) -> impl Iterator<Item = NodeId> {
        self.target.node_ids()
    }

    /// Attach a similarity score
    pub fn set_similarity(&mut self, similarity: f64) {
        self.similarity = similarity;
    }

    /// The attached similarity score
    pub fn similarity(&self) -> f64 {
        self.similarity
    }
}
