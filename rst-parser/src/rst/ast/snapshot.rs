//! AST snapshot - a normalized representation of the tree.
//!
//! The snapshot captures node types, labels, attributes, and children in a
//! plain serializable form. Serializers and the structural-equality
//! assertions consume this instead of walking the arena themselves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rst::ast::node::{AttrValue, NodeId, NodeKind};
use crate::rst::ast::Document;

/// A snapshot of an AST node in a normalized, serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstSnapshot {
    /// The type of node (e.g. "paragraph", "section").
    pub node_type: String,
    /// Text content for text nodes, the first name otherwise (may be empty).
    pub label: String,
    /// Attributes, names and ids flattened to strings.
    pub attributes: BTreeMap<String, String>,
    /// Child nodes in tree order.
    pub children: Vec<AstSnapshot>,
}

impl AstSnapshot {
    /// Snapshot the subtree rooted at `id`.
    pub fn from_node(document: &Document, id: NodeId) -> Self {
        let node = document.node(id);
        let label = match &node.kind {
            NodeKind::Text(text) => text.clone(),
            _ => node.names.first().cloned().unwrap_or_default(),
        };
        let mut attributes = BTreeMap::new();
        for (key, value) in &node.attrs {
            attributes.insert(key.clone(), render_attr(value));
        }
        if !node.names.is_empty() {
            attributes.insert("names".to_string(), node.names.join(" "));
        }
        if !node.dup_names.is_empty() {
            attributes.insert("dupnames".to_string(), node.dup_names.join(" "));
        }
        if !node.ids.is_empty() {
            attributes.insert("ids".to_string(), node.ids.join(" "));
        }
        Self {
            node_type: node.kind.name().to_string(),
            label,
            attributes,
            children: node
                .children
                .iter()
                .map(|&child| Self::from_node(document, child))
                .collect(),
        }
    }

    /// Snapshot a whole document.
    pub fn from_document(document: &Document) -> Self {
        Self::from_node(document, document.root())
    }
}

fn render_attr(value: &AttrValue) -> String {
    match value {
        AttrValue::Str(s) => s.clone(),
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Int(i) => i.to_string(),
        AttrValue::StrList(items) => items.join(" "),
        AttrValue::IntPairs(pairs) => pairs
            .iter()
            .map(|(a, b)| {
                if a == b {
                    a.to_string()
                } else {
                    format!("{}-{}", a, b)
                }
            })
            .collect::<Vec<_>>()
            .join(","),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rst::options::ParserOptions;
    use std::rc::Rc;

    #[test]
    fn test_snapshot_structure() {
        let options = ParserOptions::new();
        let mut doc = Document::new(Rc::from("test.rst"), &options);
        let root = doc.root();
        let para = doc.new_node(NodeKind::Paragraph, "hello world");
        let text = doc.new_text("hello world");
        doc.append(para, text);
        doc.append(root, para);

        let snapshot = AstSnapshot::from_document(&doc);
        assert_eq!(snapshot.node_type, "document");
        assert_eq!(snapshot.children.len(), 1);
        assert_eq!(snapshot.children[0].node_type, "paragraph");
        assert_eq!(snapshot.children[0].children[0].label, "hello world");
    }
}
