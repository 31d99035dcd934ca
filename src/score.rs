//! Similarity scoring over filtered mappings
//!
//! Turns a tree edit distance into a similarity in [0, 1]. Two weightings:
//! symmetric (both trees penalised alike) and asymmetric (the source is a
//! query schema, the target a reference that may legitimately be larger, so
//! target-only nodes are free).

use crate::mapping::ContextMapping;
use crate::ted::{
    MatchedTreeNodeComparator, TreeEditDistance, WorstCaseDistanceConversion,
    DEFAULT_PATH_LENGTH_LIMIT, DEFAULT_WEIGHT_DELETE, DEFAULT_WEIGHT_SUBSTITUTE,
};

/// `1 − ed / max(|source|, |target|)` with default weights.
pub fn symmetric_similarity(mapping: &ContextMapping) -> f64 {
    let comparator = MatchedTreeNodeComparator::new(mapping);
    let mut ted = TreeEditDistance::new(
        mapping.source_context(),
        mapping.target_context(),
        comparator,
        WorstCaseDistanceConversion,
    );
    ted.calculate();
    let ed = ted.tree_edit_distance();

    let largest = mapping
        .source_context()
        .nodes_count()
        .max(mapping.target_context().nodes_count());
    normalise(ed, largest)
}

/// `1 − ed / |source|` with insert weight 0: nodes present only in the
/// reference tree do not count against the query.
pub fn asymmetric_similarity(mapping: &ContextMapping) -> f64 {
    let comparator = MatchedTreeNodeComparator::new(mapping);
    let mut ted = TreeEditDistance::with_weights(
        mapping.source_context(),
        mapping.target_context(),
        comparator,
        WorstCaseDistanceConversion,
        DEFAULT_PATH_LENGTH_LIMIT,
        0.0,
        DEFAULT_WEIGHT_DELETE,
        DEFAULT_WEIGHT_SUBSTITUTE,
    );
    ted.calculate();
    let ed = ted.tree_edit_distance();

    normalise(ed, mapping.source_context().nodes_count())
}

fn normalise(ed: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        // two empty correspondences match perfectly
        return 1.0;
    }
    (1.0 - ed / denominator as f64).clamp(0.0, 1.0)
}
