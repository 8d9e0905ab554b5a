//! Node similarity and distance measurement.
//!
//! Similarity is a Jaccard index over a node's content set; the semantic
//! distance combines depth difference, content dissimilarity, and attribute
//! divergence into a single figure the approximate matching phase can
//! minimize. Word-level Jaccard similarity also backs the merge/split and
//! hierarchy-change collapses in the operation detector.

use rustc_hash::FxHashSet;

use crate::constants::{ATTR_WEIGHT, DEPTH_WEIGHT, SIMILARITY_WEIGHT};
use crate::options::{MatchOptions, TextContent};
use crate::tree::{NodeId, Tree};

/// Builds the content set of a node: label, value, each attribute rendered
/// as `key=value`, and each labeled child's label.
pub fn content_set(tree: &Tree, id: NodeId) -> FxHashSet<String> {
    let mut set = FxHashSet::default();
    if let Some(label) = tree.label(id) {
        set.insert(label.to_string());
    }
    if let Some(value) = tree.value(id) {
        if !value.is_empty() {
            set.insert(value.to_string());
        }
    }
    for (k, v) in tree.attributes(id) {
        set.insert(format!("{}={}", k, v));
    }
    for &child in tree.children(id) {
        if let Some(label) = tree.label(child) {
            set.insert(label.to_string());
        }
    }
    set
}

/// Jaccard similarity of two nodes' content sets, in `[0.0, 1.0]`.
///
/// Two empty sets yield 0.0, not 1.0: featureless nodes must not look like
/// perfect matches.
pub fn similarity(tree1: &Tree, a: NodeId, tree2: &Tree, b: NodeId) -> f64 {
    let set_a = content_set(tree1, a);
    let set_b = content_set(tree2, b);
    jaccard_sets(&set_a, &set_b)
}

/// Fraction of the union of attribute keys whose values differ, counting a
/// key missing on one side as a difference. Zero when neither node has
/// attributes.
pub fn attribute_difference_ratio(tree1: &Tree, a: NodeId, tree2: &Tree, b: NodeId) -> f64 {
    let attrs_a = tree1.attributes(a);
    let attrs_b = tree2.attributes(b);

    let mut keys: FxHashSet<&str> = FxHashSet::default();
    for (k, _) in attrs_a {
        keys.insert(k);
    }
    for (k, _) in attrs_b {
        keys.insert(k);
    }
    if keys.is_empty() {
        return 0.0;
    }

    let differing = keys
        .iter()
        .filter(|&&k| {
            let va = attrs_a.iter().find(|(ak, _)| ak == k).map(|(_, v)| v);
            let vb = attrs_b.iter().find(|(bk, _)| bk == k).map(|(_, v)| v);
            va != vb
        })
        .count();
    differing as f64 / keys.len() as f64
}

/// Weighted semantic distance between two nodes, `>= 0`.
///
/// `0.3 × |depth difference| + 0.5 × (1 − similarity) + 0.2 × attribute
/// difference ratio`.
pub fn semantic_distance(tree1: &Tree, a: NodeId, tree2: &Tree, b: NodeId) -> f64 {
    let depth_diff = (tree1.depth(a) as f64 - tree2.depth(b) as f64).abs();
    DEPTH_WEIGHT * depth_diff
        + SIMILARITY_WEIGHT * (1.0 - similarity(tree1, a, tree2, b))
        + ATTR_WEIGHT * attribute_difference_ratio(tree1, a, tree2, b)
}

/// Jaccard similarity over whitespace-split, lowercased word sets.
///
/// Two empty word sets yield 0.0, not 1.0, so empty content never drives a
/// merge or split collapse.
pub fn jaccard_words(a: &str, b: &str) -> f64 {
    let words_a: FxHashSet<String> = a.split_whitespace().map(|w| w.to_lowercase()).collect();
    let words_b: FxHashSet<String> = b.split_whitespace().map(|w| w.to_lowercase()).collect();
    jaccard_sets(&words_a, &words_b)
}

fn jaccard_sets(a: &FxHashSet<String>, b: &FxHashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Collapses whitespace runs to single spaces and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Decides whether two node values are textually equivalent.
///
/// Both empty or absent values are equivalent; exactly one empty is not.
/// Inside a whitespace-sensitive context values compare verbatim. Otherwise
/// the `text_content` option picks raw or whitespace-normalized comparison.
pub fn texts_equivalent(
    tree1: &Tree,
    a: NodeId,
    tree2: &Tree,
    b: NodeId,
    options: &MatchOptions,
) -> bool {
    let va = tree1.value(a).unwrap_or("");
    let vb = tree2.value(b).unwrap_or("");
    if va.is_empty() && vb.is_empty() {
        return true;
    }
    if va.is_empty() != vb.is_empty() {
        return false;
    }
    if options.in_sensitive_context(tree1, a) || options.in_sensitive_context(tree2, b) {
        return va == vb;
    }
    match options.text_content {
        TextContent::Strict => va == vb,
        TextContent::Normalize => normalize_whitespace(va) == normalize_whitespace(vb),
    }
}
