//! Node payloads stored in the tree arena.

/// The closed set of node kinds, resolved at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A labeled element; may carry a scalar value and attributes.
    Element,
    /// An unlabeled text leaf.
    Text,
}

/// The payload of one node: label, value, attributes, and an optional
/// external stable identifier.
///
/// Attributes preserve insertion order so that order-sensitive comparison
/// stays possible; lookups go through [`NodeData::attribute`].
#[derive(Debug, Clone)]
pub struct NodeData {
    label: Option<String>,
    value: Option<String>,
    attributes: Vec<(String, String)>,
    xid: Option<String>,
    kind: NodeKind,
}

impl NodeData {
    /// Creates an element node with the given label.
    pub fn element(label: impl Into<String>) -> Self {
        NodeData {
            label: Some(label.into()),
            value: None,
            attributes: Vec::new(),
            xid: None,
            kind: NodeKind::Element,
        }
    }

    /// Creates an unlabeled text node with the given value.
    pub fn text(value: impl Into<String>) -> Self {
        NodeData {
            label: None,
            value: Some(value.into()),
            attributes: Vec::new(),
            xid: None,
            kind: NodeKind::Text,
        }
    }

    /// Sets the scalar value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Appends one attribute, preserving insertion order.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Replaces the attribute list.
    pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Sets the external stable identifier.
    pub fn with_xid(mut self, xid: impl Into<String>) -> Self {
        self.xid = Some(xid.into());
        self
    }

    /// Returns the label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the scalar value, if any.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns the attributes in insertion order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Looks up an attribute value by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the external stable identifier, if any.
    pub fn xid(&self) -> Option<&str> {
        self.xid.as_deref()
    }

    /// Returns the node kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub(crate) fn set_value(&mut self, value: Option<String>) {
        self.value = value;
    }

    pub(crate) fn set_attributes(&mut self, attributes: Vec<(String, String)>) {
        self.attributes = attributes;
    }
}
