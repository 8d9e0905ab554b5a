//! Design constants used throughout the diff engine.

/// Coefficient of the depth-difference term in the semantic distance.
pub const DEPTH_WEIGHT: f64 = 0.3;

/// Coefficient of the content-dissimilarity term in the semantic distance.
pub const SIMILARITY_WEIGHT: f64 = 0.5;

/// Coefficient of the attribute-difference term in the semantic distance.
pub const ATTR_WEIGHT: f64 = 0.2;

/// Maximum semantic distance at which the approximate phase will pair nodes.
pub const MAX_MATCH_DISTANCE: f64 = 1.0;

/// Minimum word similarity for collapsing deletes and an update into a merge,
/// or a delete and inserts into a split.
pub const MERGE_SPLIT_SIMILARITY: f64 = 0.80;

/// Minimum word similarity for collapsing a delete/insert pair into a
/// hierarchy upgrade or downgrade.
pub const HIERARCHY_SIMILARITY: f64 = 0.90;

/// Labels whose subtrees are whitespace-sensitive by default.
pub const DEFAULT_SENSITIVE_LABELS: &[&str] = &["pre", "code", "textarea", "script", "style"];

/// Path component used for leaves that carry no label.
pub const TEXT_COMPONENT: &str = "#text";
