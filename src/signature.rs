//! Path-derived node identity.
//!
//! A signature is the `/`-joined list of path components from the root down
//! to a node. Two nodes with equal signatures sit at identical positions in
//! identically labeled (and, for the attribute-aware variant, identically
//! attributed) paths, which is what makes hash-bucket exact matching sound.
//!
//! Equality and hashing go through an MD5 digest of the path string; the
//! string itself is retained for display.

use std::fmt;
use std::hash::{Hash, Hasher};

use md5::{Digest, Md5};

use crate::attrs::AttributeComparator;
use crate::constants::TEXT_COMPONENT;
use crate::options::{AttributeOrder, MatchOptions};
use crate::tree::{NodeId, Tree};

/// A deterministic, hashable node identity string.
#[derive(Debug, Clone)]
pub struct Signature {
    text: String,
    digest: [u8; 16],
}

impl Signature {
    /// Creates a signature from its path string.
    pub fn new(text: String) -> Self {
        let digest = Md5::digest(text.as_bytes()).into();
        Signature { text, digest }
    }

    /// Returns the path string.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the MD5 digest of the path string.
    pub fn digest(&self) -> [u8; 16] {
        self.digest
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.digest);
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Computes the signature of a node.
///
/// With `attribute_aware` set, each labeled component carries its attributes
/// sorted by key, so insertion order never leaks into the identity. Inside a
/// whitespace-sensitive context (the node's label, or any ancestor's label,
/// is in the configured sensitive set) the component also carries the node's
/// literal value, keeping literally-differing preformatted content out of
/// the same exact-match bucket.
pub(crate) fn compute(
    tree: &Tree,
    id: NodeId,
    attribute_aware: bool,
    options: &MatchOptions,
) -> Signature {
    let mut path: Vec<NodeId> = tree.ancestors(id).collect();
    path.reverse();
    path.push(id);

    let mut text = String::new();
    let mut sensitive = false;
    for n in path {
        if let Some(label) = tree.label(n) {
            if options.whitespace_sensitive_elements.contains(label) {
                sensitive = true;
            }
        }
        text.push('/');
        push_component(tree, n, attribute_aware, sensitive, &mut text);
    }
    Signature::new(text)
}

fn push_component(
    tree: &Tree,
    id: NodeId,
    attribute_aware: bool,
    sensitive: bool,
    out: &mut String,
) {
    match tree.label(id) {
        Some(label) => out.push_str(label),
        None => out.push_str(TEXT_COMPONENT),
    }

    let attributes = tree.attributes(id);
    if attribute_aware && !attributes.is_empty() {
        // Sorted by key via the order-insensitive comparator, so insertion
        // order never leaks into the identity.
        let rendered = AttributeComparator::new(AttributeOrder::Ignore).comparison_key(attributes);
        out.push('{');
        out.push_str(&rendered);
        out.push('}');
    }

    if sensitive {
        if let Some(value) = tree.value(id) {
            out.push_str(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeData;

    fn options() -> MatchOptions {
        MatchOptions::default()
    }

    #[test]
    fn test_path_components() {
        let mut tree = Tree::new(NodeData::element("a"));
        let b = tree.add_child(tree.root(), NodeData::element("b"));
        let t = tree.add_child(b, NodeData::text("hi"));

        assert_eq!(compute(&tree, tree.root(), true, &options()).text(), "/a");
        assert_eq!(compute(&tree, b, true, &options()).text(), "/a/b");
        assert_eq!(compute(&tree, t, true, &options()).text(), "/a/b/#text");
    }

    #[test]
    fn test_attribute_order_insensitive() {
        let mut t1 = Tree::new(NodeData::element("a"));
        let n1 = t1.add_child(
            t1.root(),
            NodeData::element("b")
                .with_attribute("z", "1")
                .with_attribute("a", "2"),
        );
        let mut t2 = Tree::new(NodeData::element("a"));
        let n2 = t2.add_child(
            t2.root(),
            NodeData::element("b")
                .with_attribute("a", "2")
                .with_attribute("z", "1"),
        );

        let s1 = compute(&t1, n1, true, &options());
        let s2 = compute(&t2, n2, true, &options());
        assert_eq!(s1, s2);
        assert_eq!(s1.text(), "/a/b{a=2,z=1}");
    }

    #[test]
    fn test_attribute_insensitive_variant() {
        let mut tree = Tree::new(NodeData::element("a"));
        let n = tree.add_child(tree.root(), NodeData::element("b").with_attribute("k", "v"));

        assert_eq!(compute(&tree, n, true, &options()).text(), "/a/b{k=v}");
        assert_eq!(compute(&tree, n, false, &options()).text(), "/a/b");
    }

    #[test]
    fn test_sensitive_context_carries_value() {
        let mut tree = Tree::new(NodeData::element("pre"));
        let t = tree.add_child(tree.root(), NodeData::text("  two  spaces"));
        let sig = compute(&tree, t, true, &options());
        assert_eq!(sig.text(), "/pre/#text  two  spaces");

        // Outside a sensitive context the value stays out of the signature.
        let mut plain = Tree::new(NodeData::element("p"));
        let t = plain.add_child(plain.root(), NodeData::text("  two  spaces"));
        assert_eq!(compute(&plain, t, true, &options()).text(), "/p/#text");
    }

    #[test]
    fn test_equality_is_reflexive_and_digest_based() {
        let a = Signature::new("/a/b".to_string());
        let b = Signature::new("/a/b".to_string());
        let c = Signature::new("/a/c".to_string());
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(format!("{}", a), "/a/b");
    }

    #[test]
    fn test_cached_signature_matches_computed() {
        let mut tree = Tree::new(NodeData::element("a"));
        let b = tree.add_child(tree.root(), NodeData::element("b"));
        let opts = options();
        let cached = tree.signature(b, &opts);
        let fresh = compute(&tree, b, true, &opts);
        assert_eq!(*cached, fresh);
        // Second call serves the memoized entry.
        let again = tree.signature(b, &opts);
        assert_eq!(*again, fresh);
    }
}
