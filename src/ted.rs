//! Tree edit distance
//!
//! Ordered-tree edit distance in the Zhang–Shasha style, computed over the
//! arena representation. Node equality is delegated to a pluggable
//! `NodeComparator` so the similarity scorer can define equality through a
//! filtered mapping: two nodes are equal iff the mapping relates them with
//! `Equivalence`; every other pair counts as a substitution.
//!
//! Insert, delete, and substitute weights are configurable. The asymmetric
//! scorer passes an insert weight of 0 so target-only nodes are free.

use crate::mapping::ContextMapping;
use crate::relation::Relation;
use crate::tree::{Context, NodeId};

/// Edit scripts longer than this are reported as the limit itself.
pub const DEFAULT_PATH_LENGTH_LIMIT: usize = 4096;

/// Default weight of inserting a target-only node
pub const DEFAULT_WEIGHT_INSERT: f64 = 1.0;

/// Default weight of deleting a source-only node
pub const DEFAULT_WEIGHT_DELETE: f64 = 1.0;

/// Default weight of substituting a source node by a target node
pub const DEFAULT_WEIGHT_SUBSTITUTE: f64 = 1.0;

/// Decides whether a source node and a target node count as equal
pub trait NodeComparator {
    fn are_equal(&self, source: NodeId, target: NodeId) -> bool;
}

/// Equality through a filtered mapping: equal iff related by `Equivalence`.
pub struct MatchedTreeNodeComparator<'a> {
    mapping: &'a ContextMapping,
}

impl<'a> MatchedTreeNodeComparator<'a> {
    pub fn new(mapping: &'a ContextMapping) -> Self {
        Self { mapping }
    }
}

impl NodeComparator for MatchedTreeNodeComparator<'_> {
    fn are_equal(&self, source: NodeId, target: NodeId) -> bool {
        self.mapping.get_relation(source, target) == Relation::Equivalence
    }
}

/// Converts the accumulated edit cost into the reported distance
pub trait DistanceConversion {
    fn convert(&self, distance: f64) -> f64;
}

/// Reports the edit cost relative to the worst case, i.e. unchanged: every
/// operation already carries its worst-case unit weight.
pub struct WorstCaseDistanceConversion;

impl DistanceConversion for WorstCaseDistanceConversion {
    fn convert(&self, distance: f64) -> f64 {
        distance
    }
}

/// Tree edit distance calculator
///
/// Construct, `calculate()`, then read `tree_edit_distance()`.
pub struct TreeEditDistance<'a, C, D> {
    source: &'a Context,
    target: &'a Context,
    comparator: C,
    conversion: D,
    path_length_limit: usize,
    w_insert: f64,
    w_delete: f64,
    w_substitute: f64,
    distance: Option<f64>,
}

impl<'a, C: NodeComparator, D: DistanceConversion> TreeEditDistance<'a, C, D> {
    /// Calculator with default weights and path length limit
    pub fn new(source: &'a Context, target: &'a Context, comparator: C, conversion: D) -> Self {
        Self::with_weights(
            source,
            target,
            comparator,
            conversion,
            DEFAULT_PATH_LENGTH_LIMIT,
            DEFAULT_WEIGHT_INSERT,
            DEFAULT_WEIGHT_DELETE,
            DEFAULT_WEIGHT_SUBSTITUTE,
        )
    }

    /// Calculator with explicit weights and path length limit
    #[allow(clippy::too_many_arguments)]
    pub fn with_weights(
        source: &'a Context,
        target: &'a Context,
        comparator: C,
        conversion: D,
        path_length_limit: usize,
        w_insert: f64,
        w_delete: f64,
        w_substitute: f64,
    ) -> Self {
        Self {
            source,
            target,
            comparator,
            conversion,
            path_length_limit,
            w_insert,
            w_delete,
            w_substitute,
            distance: None,
        }
    }

    /// Compute the distance. Idempotent.
    pub fn calculate(&mut self) {
        let raw = self.tree_distance();
        let capped = raw.min(self.path_length_limit as f64);
        self.distance = Some(self.conversion.convert(capped));
    }

    /// The computed distance; 0 before `calculate()` has run.
    pub fn tree_edit_distance(&self) -> f64 {
        self.distance.unwrap_or(0.0)
    }

    fn tree_distance(&self) -> f64 {
        let src = PostOrder::of(self.source);
        let tgt = PostOrder::of(self.target);

        match (src.nodes.is_empty(), tgt.nodes.is_empty()) {
            (true, true) => return 0.0,
            (true, false) => return tgt.nodes.len() as f64 * self.w_insert,
            (false, true) => return src.nodes.len() as f64 * self.w_delete,
            (false, false) => {}
        }

        let m = src.nodes.len();
        let n = tgt.nodes.len();
        let mut treedist = vec![vec![0.0f64; n]; m];

        for &i in &src.keyroots {
            for &j in &tgt.keyroots {
                self.keyroot_distance(i, j, &src, &tgt, &mut treedist);
            }
        }

        treedist[m - 1][n - 1]
    }

    /// Fill `treedist[i][j]` (and the subtree pairs it dominates) by the
    /// forest DP rooted at the keyroot pair (i, j). Indices are postorder
    /// positions.
    fn keyroot_distance(
        &self,
        i: usize,
        j: usize,
        src: &PostOrder,
        tgt: &PostOrder,
        treedist: &mut [Vec<f64>],
    ) {
        let li = src.lld[i];
        let lj = tgt.lld[j];
        let rows = i - li + 2;
        let cols = j - lj + 2;

        // forestdist over the postorder slices [li..=i] x [lj..=j];
        // index 0 is the empty forest
        let mut fd = vec![vec![0.0f64; cols]; rows];
        for di in 1..rows {
            fd[di][0] = fd[di - 1][0] + self.w_delete;
        }
        for dj in 1..cols {
            fd[0][dj] = fd[0][dj - 1] + self.w_insert;
        }

        for di in 1..rows {
            for dj in 1..cols {
                let x = li + di - 1;
                let y = lj + dj - 1;
                let delete = fd[di - 1][dj] + self.w_delete;
                let insert = fd[di][dj - 1] + self.w_insert;
                if src.lld[x] == li && tgt.lld[y] == lj {
                    // both forests are whole subtrees
                    let substitute = fd[di - 1][dj - 1] + self.substitution_cost(src, tgt, x, y);
                    let best = delete.min(insert).min(substitute);
                    fd[di][dj] = best;
                    treedist[x][y] = best;
                } else {
                    let across = fd[src.lld[x] - li][tgt.lld[y] - lj] + treedist[x][y];
                    fd[di][dj] = delete.min(insert).min(across);
                }
            }
        }
    }

    fn substitution_cost(&self, src: &PostOrder, tgt: &PostOrder, x: usize, y: usize) -> f64 {
        if self.comparator.are_equal(src.nodes[x], tgt.nodes[y]) {
            0.0
        } else {
            self.w_substitute
        }
    }
}

/// Postorder view of a context: node ids in postorder, leftmost leaf
/// descendants, and LR keyroots, all as postorder positions.
struct PostOrder {
    nodes: Vec<NodeId>,
    lld: Vec<usize>,
    keyroots: Vec<usize>,
}

impl PostOrder {
    fn of(ctx: &Context) -> Self {
        let mut nodes = Vec::with_capacity(ctx.nodes_count());
        if let Some(root) = ctx.root() {
            visit(ctx, root, &mut nodes);
        }

        let position: std::collections::HashMap<NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(pos, &node)| (node, pos))
            .collect();

        // leftmost leaf descendant: own position for leaves, first child's
        // lld for internal nodes
        let mut lld = vec![0usize; nodes.len()];
        for (pos, &node) in nodes.iter().enumerate() {
            lld[pos] = match ctx.children(node).first() {
                Some(&first_child) => lld[position[&first_child]],
                None => pos,
            };
        }

        // keyroots: the root and every node with a left sibling
        let mut keyroots = Vec::new();
        for (pos, &node) in nodes.iter().enumerate() {
            let is_keyroot = match ctx.parent(node) {
                None => true,
                Some(parent) => ctx.children(parent).first() != Some(&node),
            };
            if is_keyroot {
                keyroots.push(pos);
            }
        }

        Self {
            nodes,
            lld,
            keyroots,
        }
    }
}

fn visit(ctx: &Context, node: NodeId, out: &mut Vec<NodeId>) {
    for &child in ctx.children(node) {
        visit(ctx, child, out);
    }
    out.push(node);
}
