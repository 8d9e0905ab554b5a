//! Attribute map comparison.
//!
//! Attribute lists preserve insertion order in the tree model; this module
//! decides whether that order is part of a node's identity (`Strict`) or
//! normalized away (`Ignore`).

use crate::options::AttributeOrder;

/// Order-sensitive or order-insensitive equality and bucketing over
/// attribute lists.
#[derive(Debug, Clone, Copy)]
pub struct AttributeComparator {
    mode: AttributeOrder,
}

impl AttributeComparator {
    /// Creates a comparator for the given mode.
    pub fn new(mode: AttributeOrder) -> Self {
        AttributeComparator { mode }
    }

    /// Compares two attribute lists under this comparator's mode.
    pub fn equals(&self, a: &[(String, String)], b: &[(String, String)]) -> bool {
        match self.mode {
            AttributeOrder::Strict => a == b,
            AttributeOrder::Ignore => Self::equals_ignoring_order(a, b),
        }
    }

    /// Returns a normalized rendering usable as a hash-bucket key.
    ///
    /// In `Ignore` mode pairs are sorted by key first, so two lists that
    /// differ only in insertion order produce the same key.
    pub fn comparison_key(&self, attributes: &[(String, String)]) -> String {
        let mut pairs: Vec<&(String, String)> = attributes.iter().collect();
        if self.mode == AttributeOrder::Ignore {
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
        }
        let rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        rendered.join(",")
    }

    /// Order-insensitive equality: same key set, same value per key.
    pub fn equals_ignoring_order(a: &[(String, String)], b: &[(String, String)]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.iter()
            .all(|(k, v)| b.iter().any(|(bk, bv)| bk == k && bv == v))
    }

    /// Returns true if both lists carry exactly the same key set.
    pub fn same_key_set(a: &[(String, String)], b: &[(String, String)]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.iter().all(|(k, _)| b.iter().any(|(bk, _)| bk == k))
    }

    /// Renders the key order of a list, for attribute-order change reporting.
    pub fn key_order(attributes: &[(String, String)]) -> String {
        let keys: Vec<&str> = attributes.iter().map(|(k, _)| k.as_str()).collect();
        keys.join(",")
    }
}
