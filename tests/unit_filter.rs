//! Unit tests for the SPSM filter: the end-to-end matching scenarios

use std::rc::Rc;

use spsm::pretty::fn_signature;
use spsm::{parse_signature, ContextMapping, Relation, SpsmFilter, SpsmTreeMatcher};

/// Build a candidate mapping from two signature strings and a list of
/// (source name, target name, relation symbol) entries.
fn candidate(source: &str, target: &str, entries: &[(&str, &str, char)]) -> ContextMapping {
    let source = Rc::new(parse_signature(source).expect("source parse failed"));
    let target = Rc::new(parse_signature(target).expect("target parse failed"));
    let mut mapping = ContextMapping::new(Rc::clone(&source), Rc::clone(&target));
    for &(s, t, symbol) in entries {
        let s = source.node_by_name(s).expect("unknown source name");
        let t = target.node_by_name(t).expect("unknown target name");
        mapping.set_relation(s, t, Relation::from_symbol(symbol));
    }
    mapping
}

/// Surviving pairs as (source name, target name, relation symbol), sorted.
fn pairs(mapping: &ContextMapping) -> Vec<(String, String, char)> {
    let mut out: Vec<_> = mapping
        .elements()
        .map(|e| {
            (
                mapping.source_context().name(e.source).to_string(),
                mapping.target_context().name(e.target).to_string(),
                e.relation.symbol(),
            )
        })
        .collect();
    out.sort();
    out
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {} but got {}",
        expected,
        actual
    );
}

#[test]
fn identical_trees_match_perfectly() {
    let cand = candidate(
        "f(a,b)",
        "f(a,b)",
        &[("f", "f", '='), ("a", "a", '='), ("b", "b", '=')],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");

    assert_eq!(
        pairs(&filtered),
        vec![
            ("a".into(), "a".into(), '='),
            ("b".into(), "b".into(), '='),
            ("f".into(), "f".into(), '='),
        ]
    );
    assert_close(filtered.similarity(), 1.0);
}

#[test]
fn crossed_siblings_are_reordered() {
    let cand = candidate(
        "f(a,b)",
        "f(b,a)",
        &[("f", "f", '='), ("a", "a", '='), ("b", "b", '=')],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");

    assert_eq!(pairs(&filtered).len(), 3);
    // the target copy is permuted so siblings align positionally
    assert_eq!(fn_signature(filtered.target_context()), "f(a,b)");
    assert_eq!(fn_signature(filtered.source_context()), "f(a,b)");
    assert_close(filtered.similarity(), 1.0);
}

#[test]
fn unmatched_source_sibling_is_dropped() {
    let cand = candidate(
        "f(a,b,c)",
        "f(a,b)",
        &[("f", "f", '='), ("a", "a", '='), ("b", "b", '=')],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");

    assert_eq!(
        pairs(&filtered),
        vec![
            ("a".into(), "a".into(), '='),
            ("b".into(), "b".into(), '='),
            ("f".into(), "f".into(), '='),
        ]
    );
    // one deletion against the larger tree: 1 - 1/4
    assert_close(filtered.similarity(), 0.75);
}

#[test]
fn unrelated_roots_produce_an_empty_mapping() {
    let cand = candidate("f(a)", "g(a)", &[("a", "a", '=')]);
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");

    assert!(filtered.is_empty());
    // nothing matched: every node substitutes, 1 - 2/2
    assert_close(filtered.similarity(), 0.0);
}

#[test]
fn disjoint_roots_fail_the_gate() {
    let cand = candidate(
        "f(a,b)",
        "f(a,b)",
        &[("f", "f", '!'), ("a", "a", '='), ("b", "b", '=')],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");
    assert!(filtered.is_empty());
}

#[test]
fn weaker_cross_relations_are_pruned() {
    let cand = candidate(
        "f(a,b)",
        "f(a,b)",
        &[
            ("f", "f", '='),
            ("a", "a", '='),
            ("b", "b", '='),
            ("a", "b", '>'),
            ("b", "a", '>'),
        ],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");

    assert_eq!(
        pairs(&filtered),
        vec![
            ("a".into(), "a".into(), '='),
            ("b".into(), "b".into(), '='),
            ("f".into(), "f".into(), '='),
        ]
    );
    assert_close(filtered.similarity(), 1.0);
}

#[test]
fn asymmetric_scoring_ignores_extra_target_nodes() {
    let cand = candidate(
        "f(a,b)",
        "f(a,b,c)",
        &[("f", "f", '='), ("a", "a", '='), ("b", "b", '=')],
    );
    let filtered = SpsmFilter::asymmetric().filter(cand).expect("filter failed");

    assert_eq!(pairs(&filtered).len(), 3);
    assert_close(filtered.similarity(), 1.0);
}

#[test]
fn asymmetric_scoring_ignores_an_unrelated_target_subtree() {
    let related = [("f", "f", '='), ("a", "a", '='), ("b", "b", '=')];
    let narrow = SpsmFilter::asymmetric()
        .filter(candidate("f(a,b)", "f(a,b)", &related))
        .expect("filter failed");
    let wide = SpsmFilter::asymmetric()
        .filter(candidate("f(a,b)", "f(a,b,g(x,y))", &related))
        .expect("filter failed");

    assert_eq!(pairs(&narrow), pairs(&wide));
    assert_close(narrow.similarity(), 1.0);
    assert_close(wide.similarity(), 1.0);
}

#[test]
fn forward_search_swaps_past_unmatchable_target() {
    let cand = candidate(
        "f(a,b)",
        "f(x,b)",
        &[("f", "f", '='), ("b", "b", '=')],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");

    assert_eq!(
        pairs(&filtered),
        vec![
            ("b".into(), "b".into(), '='),
            ("f".into(), "f".into(), '='),
        ]
    );
    // unmatched a was pushed past the window, b swapped into alignment
    assert_eq!(fn_signature(filtered.source_context()), "f(b,a)");
    assert_eq!(fn_signature(filtered.target_context()), "f(b,x)");
    // one substitution among three nodes
    assert_close(filtered.similarity(), 1.0 - 1.0 / 3.0);
}

#[test]
fn descendants_of_unmatched_parents_are_dropped() {
    // the two c nodes are equivalent in the candidate, but their parents
    // do not match at the root level, so the mapping stays empty
    let cand = candidate(
        "a(b(c))",
        "b(a(c))",
        &[("a", "a", '='), ("b", "b", '='), ("c", "c", '=')],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");
    assert!(filtered.is_empty());
}

#[test]
fn more_general_roots_pass_the_gate() {
    let cand = candidate(
        "vehicle(wheel)",
        "car(wheel)",
        &[("vehicle", "car", '>'), ("wheel", "wheel", '=')],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");

    assert_eq!(
        pairs(&filtered),
        vec![
            ("vehicle".into(), "car".into(), '>'),
            ("wheel".into(), "wheel".into(), '='),
        ]
    );
}

#[test]
fn leaves_never_map_to_functions() {
    // b is a leaf in the source but a function in the target; the
    // equivalence must not survive
    let cand = candidate(
        "f(a,b)",
        "f(a,b(x))",
        &[("f", "f", '='), ("a", "a", '='), ("b", "b", '=')],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");

    assert_eq!(
        pairs(&filtered),
        vec![
            ("a".into(), "a".into(), '='),
            ("f".into(), "f".into(), '='),
        ]
    );
}

#[test]
fn ties_resolve_by_name() {
    // source leaf a relates equally to target leaves x and a; the
    // name-equal target wins
    let cand = candidate(
        "f(a)",
        "f(x,a)",
        &[("f", "f", '='), ("a", "x", '>'), ("a", "a", '>')],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");

    let result = pairs(&filtered);
    assert!(result.contains(&("a".into(), "a".into(), '>')), "{:?}", result);
    assert!(!result.contains(&("a".into(), "x".into(), '>')));
}

#[test]
fn empty_candidate_is_returned_unchanged() {
    let cand = candidate("f(a)", "f(a)", &[]);
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");
    assert!(filtered.is_empty());
    assert_close(filtered.similarity(), 0.0);
}

#[test]
fn refiltering_a_filtered_mapping_keeps_the_pairs() {
    let cand = candidate(
        "f(a,b)",
        "f(b,a)",
        &[("f", "f", '='), ("a", "a", '='), ("b", "b", '=')],
    );
    let filtered = SpsmFilter::new().filter(cand).expect("filter failed");
    let first_pairs = pairs(&filtered);

    let mut again = ContextMapping::new(filtered.source_rc(), filtered.target_rc());
    for element in filtered.elements() {
        again.set_relation(element.source, element.target, element.relation);
    }
    let refiltered = SpsmFilter::new().filter(again).expect("filter failed");

    assert_eq!(pairs(&refiltered), first_pairs);
}

#[test]
fn matcher_reports_the_similarity() {
    let cand = candidate(
        "f(a,b)",
        "f(a,b)",
        &[("f", "f", '='), ("a", "a", '='), ("b", "b", '=')],
    );
    let matcher = SpsmTreeMatcher::new(SpsmFilter::new());
    let matched = matcher.tree_match(cand).expect("match failed");
    assert_close(matched.similarity(), 1.0);
}
