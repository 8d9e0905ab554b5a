//! Match options threaded into the matcher and the operation detector.
//!
//! Options are always an explicit value passed at construction time; nothing
//! in the crate reads ambient or process-wide configuration.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashSet, FxHasher};

use crate::constants::DEFAULT_SENSITIVE_LABELS;
use crate::tree::{NodeId, Tree};

/// Whether attribute iteration order is a detectable difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeOrder {
    /// Attribute maps are compared including insertion order.
    Strict,
    /// Attribute keys are sorted before comparison.
    #[default]
    Ignore,
}

/// Whitespace sensitivity of text comparison outside sensitive contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextContent {
    /// Raw values are compared verbatim.
    Strict,
    /// Whitespace runs collapse to one space and ends are trimmed.
    #[default]
    Normalize,
}

/// Configuration for a single comparison.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Whether attribute order differences are reported.
    pub attribute_order: AttributeOrder,
    /// How text values are compared outside whitespace-sensitive contexts.
    pub text_content: TextContent,
    /// Labels whose subtrees are whitespace-sensitive.
    pub whitespace_sensitive_elements: FxHashSet<String>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            attribute_order: AttributeOrder::default(),
            text_content: TextContent::default(),
            whitespace_sensitive_elements: DEFAULT_SENSITIVE_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl MatchOptions {
    /// Creates options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attribute order mode.
    pub fn with_attribute_order(mut self, mode: AttributeOrder) -> Self {
        self.attribute_order = mode;
        self
    }

    /// Sets the text content mode.
    pub fn with_text_content(mut self, mode: TextContent) -> Self {
        self.text_content = mode;
        self
    }

    /// Replaces the whitespace-sensitive label set.
    pub fn with_sensitive_elements<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitespace_sensitive_elements = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the node sits in a whitespace-sensitive context:
    /// its own label, or any ancestor's label, is in the sensitive set.
    pub fn in_sensitive_context(&self, tree: &Tree, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(label) = tree.label(node) {
                if self.whitespace_sensitive_elements.contains(label) {
                    return true;
                }
            }
            current = tree.parent(node);
        }
        false
    }

    /// A stable fingerprint of the option fields that affect signatures.
    ///
    /// Signature caches are stamped with this value so a tree diffed twice
    /// under different options never serves stale signatures.
    pub(crate) fn signature_stamp(&self) -> u64 {
        let mut hasher = FxHasher::default();
        let mut labels: Vec<&String> = self.whitespace_sensitive_elements.iter().collect();
        labels.sort();
        for label in labels {
            label.hash(&mut hasher);
        }
        hasher.finish()
    }
}
