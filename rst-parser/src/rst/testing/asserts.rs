//! Fluent assertions over parsed documents.

use crate::rst::ast::{AttrValue, Document, NodeId};
use crate::rst::options::ParserOptions;
use crate::rst::parse;

/// Parse with default options, panicking on parser errors.
pub fn parse_fixture(source: &str) -> Document {
    parse("test.rst", source, &ParserOptions::new()).expect("parse failed")
}

/// Entry point: assert on the document root.
pub fn assert_doc(document: &Document) -> NodeAssert<'_> {
    NodeAssert {
        document,
        node: document.root(),
        path: "document".to_string(),
    }
}

/// Assertion cursor over one node.
pub struct NodeAssert<'a> {
    document: &'a Document,
    node: NodeId,
    path: String,
}

impl<'a> NodeAssert<'a> {
    pub fn id(&self) -> NodeId {
        self.node
    }

    pub fn is_kind(&self, expected: &str) -> &Self {
        let actual = self.document.node(self.node).kind.name();
        assert_eq!(
            actual, expected,
            "{}: expected a {} node, found {}",
            self.path, expected, actual
        );
        self
    }

    pub fn child_count(&self, expected: usize) -> &Self {
        let actual = self.document.node(self.node).children.len();
        assert_eq!(
            actual,
            expected,
            "{}: expected {} children, found {} ({:?})",
            self.path,
            expected,
            actual,
            self.document
                .node(self.node)
                .children
                .iter()
                .map(|&c| self.document.node(c).kind.name())
                .collect::<Vec<_>>()
        );
        self
    }

    pub fn child(&self, index: usize, f: impl FnOnce(NodeAssert<'_>)) -> &Self {
        let children = &self.document.node(self.node).children;
        let child = *children.get(index).unwrap_or_else(|| {
            panic!(
                "{}: no child at index {} (only {})",
                self.path,
                index,
                children.len()
            )
        });
        f(NodeAssert {
            document: self.document,
            node: child,
            path: format!(
                "{} > {}[{}]",
                self.path,
                self.document.node(child).kind.name(),
                index
            ),
        });
        self
    }

    /// The first child of the given kind, skipping system messages and
    /// whatever else sits in between.
    pub fn find_child(&self, kind: &str, f: impl FnOnce(NodeAssert<'_>)) -> &Self {
        let child = self
            .document
            .node(self.node)
            .children
            .iter()
            .copied()
            .find(|&c| self.document.node(c).kind.name() == kind)
            .unwrap_or_else(|| panic!("{}: no {} child", self.path, kind));
        f(NodeAssert {
            document: self.document,
            node: child,
            path: format!("{} > {}", self.path, kind),
        });
        self
    }

    pub fn text(&self, expected: &str) -> &Self {
        let actual = self.document.text_of(self.node);
        assert_eq!(actual, expected, "{}: text mismatch", self.path);
        self
    }

    pub fn text_contains(&self, expected: &str) -> &Self {
        let actual = self.document.text_of(self.node);
        assert!(
            actual.contains(expected),
            "{}: expected text to contain {:?}, got {:?}",
            self.path,
            expected,
            actual
        );
        self
    }

    pub fn attr(&self, key: &str, expected: &AttrValue) -> &Self {
        let actual = self.document.node(self.node).attr(key);
        assert_eq!(
            actual,
            Some(expected),
            "{}: attribute {:?} mismatch",
            self.path,
            key
        );
        self
    }

    pub fn attr_str(&self, key: &str, expected: &str) -> &Self {
        self.attr(key, &AttrValue::Str(expected.to_string()))
    }

    pub fn attr_int(&self, key: &str, expected: i64) -> &Self {
        self.attr(key, &AttrValue::Int(expected))
    }

    pub fn attr_flag(&self, key: &str) -> &Self {
        self.attr(key, &AttrValue::Bool(true))
    }

    pub fn no_attr(&self, key: &str) -> &Self {
        assert!(
            self.document.node(self.node).attr(key).is_none(),
            "{}: unexpected attribute {:?}",
            self.path,
            key
        );
        self
    }

    pub fn has_name(&self, expected: &str) -> &Self {
        let names = &self.document.node(self.node).names;
        assert!(
            names.iter().any(|n| n == expected),
            "{}: expected name {:?} in {:?}",
            self.path,
            expected,
            names
        );
        self
    }
}
