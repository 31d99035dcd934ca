//! The structure-preserving mapping filter
//!
//! Prunes a dense candidate relation matrix down to a mapping that obeys
//! two structural properties:
//!
//! - one-to-one correspondences: each source node keeps at most one
//!   surviving relation, and so does each target node;
//! - leaf nodes are matched to leaf nodes and internal nodes to internal
//!   nodes (a leaf stands for a parameter, an internal node for a
//!   function; a parameter must not be confused with a function).
//!
//! The pass is greedy, depth-first, and left-to-right: siblings are
//! scanned under the relation precedence order `=`, `>`, `<`, and a
//! matched pair's children are filtered recursively. Alongside the
//! filtered mapping over the original trees, the filter maintains deep
//! copies of both trees whose sibling order is permuted so that matched
//! siblings end up positionally aligned; the mapping over the reordered
//! copies is the one returned, with its similarity attached.
//!
//! The candidate matrix is consumed: rows and columns are cleared in place
//! as winners are chosen.

use std::rc::Rc;

use crate::mapping::{ContextMapping, MappingElement, RelationMatrix};
use crate::relation::Relation;
use crate::score;
use crate::tree::{Context, NodeId};

/// Error raised when the candidate matrix or the trees are structurally
/// inconsistent (e.g. a sibling swap on a node whose parent cannot be
/// determined).
#[derive(Debug)]
pub struct MappingFilterError {
    message: String,
    cause: Option<Box<dyn std::error::Error>>,
}

impl MappingFilterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: Box<dyn std::error::Error>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause),
        }
    }
}

impl std::fmt::Display for MappingFilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MappingFilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref()
    }
}

/// Which similarity weighting the filter attaches to its output
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Scoring {
    /// `1 − ed / max(|source|, |target|)`, both trees penalised alike
    #[default]
    Symmetric,
    /// `1 − ed / |source|`, target-only nodes free (query vs. reference)
    Asymmetric,
}

/// Guard used when pruning weaker entries from a source row in
/// `set_strongest_mapping`.
///
/// Two variants of the row-pruning loop exist. `Target` skips the entry
/// whose target is the chosen target, so only genuine rivals are cleared.
/// `Source` compares each row entry's target id against the *source*
/// node's id instead; across two distinct trees that comparison almost
/// never holds, so the chosen entry's row mates are pruned without an
/// exemption. Both behaviors are available behind this switch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RowPruneGuard {
    /// Skip the chosen target when pruning the row (default)
    #[default]
    Target,
    /// Compare row entries against the source id instead
    Source,
}

/// The SPSM filter
#[derive(Copy, Clone, Debug, Default)]
pub struct SpsmFilter {
    scoring: Scoring,
    row_prune_guard: RowPruneGuard,
}

/// Relations that let a node pair participate in the alignment, strongest
/// first. Disjointness never aligns.
const RELATION_LIST: [Relation; 3] = [
    Relation::Equivalence,
    Relation::MoreGeneral,
    Relation::LessGeneral,
];

impl SpsmFilter {
    /// Filter with symmetric scoring and the default row-prune guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with asymmetric (query vs. reference) scoring
    pub fn asymmetric() -> Self {
        Self {
            scoring: Scoring::Asymmetric,
            ..Self::default()
        }
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_row_prune_guard(mut self, guard: RowPruneGuard) -> Self {
        self.row_prune_guard = guard;
        self
    }

    /// Run the filter.
    ///
    /// Consumes the candidate mapping: the matrix is cleared in place as
    /// winners are chosen, so there is nothing meaningful left to return
    /// to the caller. The result is the filtered mapping over the
    /// *reordered* copies of the two trees, with the similarity attached.
    /// An empty candidate is returned unchanged; a root pair that is not
    /// related by `=`, `>` or `<` yields an empty mapping.
    pub fn filter(
        &self,
        candidate: ContextMapping,
    ) -> Result<ContextMapping, MappingFilterError> {
        if candidate.size() == 0 {
            return Ok(candidate);
        }

        let (source, target, cand) = candidate.into_parts();
        let (rsource, source_copy_map) = source.deep_copy();
        let (rtarget, target_copy_map) = target.deep_copy();

        // mirror of the candidate matrix over the copies
        let mut unordered_cand = RelationMatrix::new();
        for element in cand.elements() {
            unordered_cand.set(
                source_copy_map[&element.source],
                target_copy_map[&element.target],
                element.relation,
            );
        }

        let mut pass = FilterPass {
            source: source.as_ref(),
            target: target.as_ref(),
            rsource,
            rtarget,
            cand,
            unordered_cand,
            spsm: RelationMatrix::new(),
            unordered_spsm: RelationMatrix::new(),
            src_idx: Vec::new(),
            tgt_idx: Vec::new(),
            guard: self.row_prune_guard,
        };

        if let (Some(source_root), Some(target_root)) = (source.root(), target.root()) {
            let root_relation = pass.cand.get(source_root, target_root);
            if RELATION_LIST.contains(&root_relation) {
                let rs_root = source_copy_map[&source_root];
                let rt_root = target_copy_map[&target_root];

                set_strongest_mapping(
                    pass.source,
                    pass.target,
                    source_root,
                    target_root,
                    &mut pass.cand,
                    &mut pass.spsm,
                    pass.guard,
                );
                set_strongest_mapping(
                    &pass.rsource,
                    &pass.rtarget,
                    rs_root,
                    rt_root,
                    &mut pass.unordered_cand,
                    &mut pass.unordered_spsm,
                    pass.guard,
                );

                pass.filter_children(source_root, target_root, rs_root, rt_root)?;
            }
        }

        let FilterPass {
            rsource,
            rtarget,
            spsm,
            unordered_spsm,
            ..
        } = pass;

        let spsm_mapping =
            ContextMapping::from_parts(Rc::clone(&source), Rc::clone(&target), spsm, 0.0);
        let mut unordered_mapping = ContextMapping::from_parts(
            Rc::new(rsource),
            Rc::new(rtarget),
            unordered_spsm,
            0.0,
        );

        let ordered_similarity = self.similarity(&spsm_mapping);
        let unordered_similarity = self.similarity(&unordered_mapping);
        unordered_mapping.set_similarity(unordered_similarity);
        tracing::info!("similarity: {}", unordered_similarity);
        tracing::info!("ordered similarity: {}", ordered_similarity);

        Ok(unordered_mapping)
    }

    fn similarity(&self, mapping: &ContextMapping) -> f64 {
        match self.scoring {
            Scoring::Symmetric => score::symmetric_similarity(mapping),
            Scoring::Asymmetric => score::asymmetric_similarity(mapping),
        }
    }
}

/// Working state of one filter run.
///
/// `src_idx` / `tgt_idx` are per-depth cursors into the sibling lists
/// currently being filtered; an entry is pushed when descending into a
/// parent's children and popped on the way out, so each depth owns its own
/// cursor.
struct FilterPass<'a> {
    source: &'a Context,
    target: &'a Context,
    rsource: Context,
    rtarget: Context,
    cand: RelationMatrix,
    unordered_cand: RelationMatrix,
    spsm: RelationMatrix,
    unordered_spsm: RelationMatrix,
    src_idx: Vec<usize>,
    tgt_idx: Vec<usize>,
    guard: RowPruneGuard,
}

impl FilterPass<'_> {
    /// Filter the mappings of the children of an already-matched pair.
    fn filter_children(
        &mut self,
        source_parent: NodeId,
        target_parent: NodeId,
        rs_parent: NodeId,
        rt_parent: NodeId,
    ) -> Result<(), MappingFilterError> {
        let source_children: Vec<NodeId> = self.source.children(source_parent).to_vec();
        let target_children: Vec<NodeId> = self.target.children(target_parent).to_vec();

        let s_depth = self.source.ancestor_count(source_parent);
        let t_depth = self.target.ancestor_count(target_parent);
        self.src_idx.insert(s_depth, 0);
        self.tgt_idx.insert(t_depth, 0);

        if !source_children.is_empty() && !target_children.is_empty() {
            self.filter_siblings(source_children, target_children, rs_parent, rt_parent)?;
        }

        self.src_idx.remove(s_depth);
        self.tgt_idx.remove(t_depth);
        Ok(())
    }

    /// Align two sibling lists left-to-right, strongest relation first.
    ///
    /// A source sibling with no alignable relation among the remaining
    /// targets is swapped past the shrinking working window and retried
    /// with the next candidate at its position. Its descendants are
    /// dropped: mappings are only considered below an already-matched
    /// parent, so with source A(B(C)) and target B(A(C)) the two C nodes
    /// stay unmapped even when the candidate matrix relates them.
    fn filter_siblings(
        &mut self,
        mut source: Vec<NodeId>,
        mut target: Vec<NodeId>,
        rs_parent: NodeId,
        rt_parent: NodeId,
    ) -> Result<(), MappingFilterError> {
        let s_depth = self.source.ancestor_count(source[0]) - 1;
        let t_depth = self.target.ancestor_count(target[0]) - 1;

        let mut src_size = source.len();
        let tgt_size = target.len();

        while self.src_idx[s_depth] < src_size && self.tgt_idx[t_depth] < tgt_size {
            let mut found_related = false;

            for &relation in &RELATION_LIST {
                let si = self.src_idx[s_depth];
                let ti = self.tgt_idx[t_depth];

                if self.cand.get(source[si], target[ti]) == relation {
                    set_strongest_mapping(
                        self.source,
                        self.target,
                        source[si],
                        target[ti],
                        &mut self.cand,
                        &mut self.spsm,
                        self.guard,
                    );

                    let rs = self.reordered_source_child(rs_parent, si)?;
                    let rt = self.reordered_target_child(rt_parent, ti)?;
                    set_strongest_mapping(
                        &self.rsource,
                        &self.rtarget,
                        rs,
                        rt,
                        &mut self.unordered_cand,
                        &mut self.unordered_spsm,
                        self.guard,
                    );

                    self.filter_children(source[si], target[ti], rs, rt)?;

                    self.src_idx[s_depth] += 1;
                    self.tgt_idx[t_depth] += 1;
                    found_related = true;
                    break;
                }

                // look for the next related node further right among the
                // target siblings
                let related =
                    self.related_index(&source, &target, rs_parent, rt_parent, relation)?;
                if let Some(found) = related {
                    // the threshold compares against the source cursor,
                    // not the target cursor the scan started from; the two
                    // cursors advance in lockstep, so the comparison is
                    // equivalent in every reachable state
                    if found > self.src_idx[s_depth] {
                        let ti = self.tgt_idx[t_depth];
                        target.swap(ti, found);
                        let first = self.reordered_target_child(rt_parent, 0)?;
                        swap_reordered_siblings(&mut self.rtarget, first, ti, found)?;

                        let si = self.src_idx[s_depth];
                        // the reordered pair is picked with the target
                        // cursor on both sides; equal to the source cursor
                        // in every reachable state (see above)
                        let rs = self.reordered_source_child(rs_parent, ti)?;
                        let rt = self.reordered_target_child(rt_parent, ti)?;
                        self.filter_children(source[si], target[ti], rs, rt)?;

                        self.src_idx[s_depth] += 1;
                        self.tgt_idx[t_depth] += 1;
                        found_related = true;
                        break;
                    }
                }
            }

            if !found_related {
                // no alignable target for this source sibling: push it past
                // the working window and retry the position
                let si = self.src_idx[s_depth];
                source.swap(si, src_size - 1);
                let first = self.reordered_source_child(rs_parent, 0)?;
                swap_reordered_siblings(&mut self.rsource, first, si, src_size - 1)?;
                src_size -= 1;
            }
        }

        Ok(())
    }

    /// Scan the target siblings right of the cursor for the first node
    /// related to the current source sibling by `relation`. A hit also
    /// installs the pair as strongest (on originals and copies); a miss
    /// falls back to a whole-row strongest-relation computation for the
    /// source sibling.
    fn related_index(
        &mut self,
        source: &[NodeId],
        target: &[NodeId],
        rs_parent: NodeId,
        rt_parent: NodeId,
        relation: Relation,
    ) -> Result<Option<usize>, MappingFilterError> {
        let s_depth = self.source.ancestor_count(source[0]) - 1;
        let t_depth = self.target.ancestor_count(target[0]) - 1;
        let si = self.src_idx[s_depth];
        let ti = self.tgt_idx[t_depth];

        let source_node = source[si];

        for (i, &target_node) in target.iter().enumerate().skip(ti + 1) {
            if self.cand.get(source_node, target_node) == relation {
                set_strongest_mapping(
                    self.source,
                    self.target,
                    source_node,
                    target_node,
                    &mut self.cand,
                    &mut self.spsm,
                    self.guard,
                );

                let rs = self.reordered_source_child(rs_parent, si)?;
                let rt = self.reordered_target_child(rt_parent, i)?;
                set_strongest_mapping(
                    &self.rsource,
                    &self.rtarget,
                    rs,
                    rt,
                    &mut self.unordered_cand,
                    &mut self.unordered_spsm,
                    self.guard,
                );

                return Ok(Some(i));
            }
        }

        // no correspondence among the remaining siblings; clean up the
        // source row instead
        compute_strongest_mapping_for_source(
            self.source,
            self.target,
            source_node,
            &mut self.cand,
            &mut self.spsm,
        );
        let rs = self.reordered_source_child(rs_parent, si)?;
        compute_strongest_mapping_for_source(
            &self.rsource,
            &self.rtarget,
            rs,
            &mut self.unordered_cand,
            &mut self.unordered_spsm,
        );

        Ok(None)
    }

    fn reordered_source_child(
        &self,
        parent: NodeId,
        index: usize,
    ) -> Result<NodeId, MappingFilterError> {
        self.rsource.child_at(parent, index).ok_or_else(|| {
            MappingFilterError::new(format!(
                "reordered source child {} missing under node {}",
                index, parent
            ))
        })
    }

    fn reordered_target_child(
        &self,
        parent: NodeId,
        index: usize,
    ) -> Result<NodeId, MappingFilterError> {
        self.rtarget.child_at(parent, index).ok_or_else(|| {
            MappingFilterError::new(format!(
                "reordered target child {} missing under node {}",
                index, parent
            ))
        })
    }
}

/// Swap two siblings of a reordered copy by mutating the parent's child
/// list: remove both, then reinsert in exchanged positions.
fn swap_reordered_siblings(
    ctx: &mut Context,
    first_child: NodeId,
    a: usize,
    b: usize,
) -> Result<(), MappingFilterError> {
    if a == b {
        return Ok(());
    }

    let parent = ctx.parent(first_child).ok_or_else(|| {
        MappingFilterError::new("cannot determine the parent for a sibling swap")
    })?;
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let lo_node = ctx
        .child_at(parent, lo)
        .ok_or_else(|| MappingFilterError::new(format!("no child at {} to swap", lo)))?;
    let hi_node = ctx
        .child_at(parent, hi)
        .ok_or_else(|| MappingFilterError::new(format!("no child at {} to swap", hi)))?;

    ctx.remove_child(parent, hi_node);
    ctx.remove_child(parent, lo_node);
    ctx.add_child_at(parent, lo, hi_node);
    ctx.add_child_at(parent, hi, lo_node);
    Ok(())
}

/// Both nodes are leaves, or both are internal: a parameter must only map
/// to a parameter and a function to a function.
fn is_same_structure(
    source_ctx: &Context,
    source: NodeId,
    target_ctx: &Context,
    target: NodeId,
) -> bool {
    source_ctx.is_leaf(source) == target_ctx.is_leaf(target)
}

/// Install `(source, target)` as the strongest mapping for this pair.
///
/// When the pair is structure-preserving, its relation is copied into the
/// output, weaker rivals in the source row are cleared, and the target
/// column is cleared unconditionally. Otherwise the whole source row is
/// searched for the strongest structure-preserving relation instead.
fn set_strongest_mapping(
    source_ctx: &Context,
    target_ctx: &Context,
    source: NodeId,
    target: NodeId,
    candidate: &mut RelationMatrix,
    out: &mut RelationMatrix,
    guard: RowPruneGuard,
) {
    if is_same_structure(source_ctx, source, target_ctx, target) {
        let chosen = candidate.get(source, target);
        out.set(source, target, chosen);

        // clear the weaker entries in the source row
        for node in target_ctx.node_ids() {
            let keep = match guard {
                RowPruneGuard::Target => target == node,
                RowPruneGuard::Source => source == node,
            };
            if !keep
                && candidate.get(source, node) != Relation::Idk
                && chosen.is_precedent(candidate.get(source, node))
            {
                candidate.set(source, node, Relation::Idk);
            }
        }

        // clear the target column
        for node in source_ctx.node_ids() {
            if source != node {
                candidate.set(node, target, Relation::Idk);
            }
        }
    } else {
        compute_strongest_mapping_for_source(source_ctx, target_ctx, source, candidate, out);
    }
}

/// Pick the strongest structure-preserving relation in `source`'s row,
/// clear everything weaker, resolve ties by name, and emit the winner.
fn compute_strongest_mapping_for_source(
    source_ctx: &Context,
    target_ctx: &Context,
    source: NodeId,
    candidate: &mut RelationMatrix,
    out: &mut RelationMatrix,
) {
    let mut strongest: Vec<MappingElement> = Vec::new();
    let mut strongest_target: Option<NodeId> = None;

    // scan the row for the strongest relation, deleting every relation
    // that is not structure-preserving on the way
    for j in target_ctx.node_ids() {
        if is_same_structure(source_ctx, source, target_ctx, j) {
            let relation = candidate.get(source, j);
            if strongest.is_empty()
                && relation != Relation::Idk
                && !exists_stronger_in_column(source_ctx, source, j, candidate)
            {
                strongest_target = Some(j);
                strongest.push(MappingElement::new(source, j, relation));
            } else if relation != Relation::Idk && !strongest.is_empty() {
                let precedence = strongest[0].relation.compare_precedence(relation);
                if precedence == -1
                    && !exists_stronger_in_column(source_ctx, source, j, candidate)
                {
                    // the new relation is more precedent and nothing
                    // stronger claims that target
                    strongest_target = Some(j);
                    strongest[0] = MappingElement::new(source, j, relation);
                }
            }
        } else {
            candidate.set(source, j, Relation::Idk);
        }
    }

    let winner_target = match strongest_target {
        Some(t) if strongest[0].relation != Relation::Idk => t,
        _ => return,
    };

    // erase the weaker relations in the row; equally precedent
    // structure-preserving entries join the tie
    for j in target_ctx.node_ids() {
        if j != winner_target && candidate.get(source, j) != Relation::Idk {
            match strongest[0].relation.compare_precedence(candidate.get(source, j)) {
                1 => candidate.set(source, j, Relation::Idk),
                0 => {
                    if is_same_structure(source_ctx, source, target_ctx, j) {
                        strongest.push(MappingElement::new(
                            source,
                            j,
                            candidate.get(source, j),
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    if strongest.len() > 1 {
        resolve_strongest_mapping_conflicts(source_ctx, target_ctx, source, &strongest, candidate, out);
    } else {
        // clear the winner's column
        for i in source_ctx.node_ids() {
            if i != source {
                candidate.set(i, winner_target, Relation::Idk);
            }
        }

        if strongest[0].relation != Relation::Idk {
            out.set(strongest[0].source, strongest[0].target, strongest[0].relation);
            delete_remaining_relations_from_matrix(
                source_ctx,
                target_ctx,
                strongest[0],
                candidate,
            );
        }
    }
}

/// More than one equally strong target: prefer the one whose name equals
/// the source's (trimmed, case-insensitive), else the first.
fn resolve_strongest_mapping_conflicts(
    source_ctx: &Context,
    target_ctx: &Context,
    source: NodeId,
    strongest: &[MappingElement],
    candidate: &mut RelationMatrix,
    out: &mut RelationMatrix,
) {
    let source_name = source_ctx.name(source).trim();

    if tracing::enabled!(tracing::Level::DEBUG) {
        let contenders: Vec<&str> = strongest
            .iter()
            .map(|e| target_ctx.name(e.target))
            .collect();
        tracing::debug!(
            "more than one strongest relation for {}: {:?}",
            source_name,
            contenders
        );
    }

    let winner_index = strongest
        .iter()
        .position(|e| {
            target_ctx
                .name(e.target)
                .trim()
                .eq_ignore_ascii_case(source_name)
        })
        .unwrap_or(0);

    let winner = strongest[winner_index];
    if winner.relation != Relation::Idk {
        out.set(winner.source, winner.target, winner.relation);
        delete_remaining_relations_from_matrix(source_ctx, target_ctx, winner, candidate);
    }
}

/// Once a winner is chosen, clear its column and row in the candidate
/// matrix.
fn delete_remaining_relations_from_matrix(
    source_ctx: &Context,
    target_ctx: &Context,
    element: MappingElement,
    candidate: &mut RelationMatrix,
) {
    for i in source_ctx.node_ids() {
        if i != element.source {
            candidate.set(i, element.target, Relation::Idk);
        }
    }
    for j in target_ctx.node_ids() {
        if j != element.target {
            candidate.set(element.source, j, Relation::Idk);
        }
    }
}

/// Whether some other source claims `target` with a relation strictly more
/// precedent than the one `source` holds.
fn exists_stronger_in_column(
    source_ctx: &Context,
    source: NodeId,
    target: NodeId,
    candidate: &RelationMatrix,
) -> bool {
    let current = candidate.get(source, target);
    source_ctx.node_ids().any(|i| {
        i != source
            && candidate.get(i, target) != Relation::Idk
            && candidate.get(i, target).is_precedent(current)
    })
}
