//! Node types.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

/// Arena index of a node within its [`Document`](super::Document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The node kind. One tagged variant per element; category markers from the
/// original hierarchy are predicates here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    // Structural.
    Document,
    Section,
    Title,
    Transition,
    // Block body.
    Paragraph,
    BulletList,
    EnumeratedList,
    ListItem,
    DefinitionList,
    DefinitionListItem,
    Term,
    Classifier,
    Definition,
    // Metadata blocks.
    FieldList,
    Field,
    FieldName,
    FieldBody,
    // Command-line option lists.
    OptionList,
    OptionListItem,
    OptionGroup,
    Option,
    OptionString,
    OptionArgument,
    Description,
    // Other block elements.
    LiteralBlock,
    DoctestBlock,
    LineBlock,
    Line,
    BlockQuote,
    Attribution,
    Comment,
    SubstitutionDefinition,
    Target,
    Footnote,
    Citation,
    Label,
    Table,
    Caption,
    Entry,
    // Inline.
    Text(String),
    Emphasis,
    Strong,
    Literal,
    Reference,
    FootnoteReference,
    CitationReference,
    SubstitutionReference,
    // Extended elements emitted by directive and role handlers.
    Directive,
    DirectiveArgument,
    Role,
    RefRole,
    Code,
    TargetIdentifier,
    // Diagnostics anchored in the tree.
    SystemMessage,
}

impl NodeKind {
    /// Display name matching the element vocabulary.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Section => "section",
            NodeKind::Title => "title",
            NodeKind::Transition => "transition",
            NodeKind::Paragraph => "paragraph",
            NodeKind::BulletList => "bullet_list",
            NodeKind::EnumeratedList => "enumerated_list",
            NodeKind::ListItem => "list_item",
            NodeKind::DefinitionList => "definition_list",
            NodeKind::DefinitionListItem => "definition_list_item",
            NodeKind::Term => "term",
            NodeKind::Classifier => "classifier",
            NodeKind::Definition => "definition",
            NodeKind::FieldList => "field_list",
            NodeKind::Field => "field",
            NodeKind::FieldName => "field_name",
            NodeKind::FieldBody => "field_body",
            NodeKind::OptionList => "option_list",
            NodeKind::OptionListItem => "option_list_item",
            NodeKind::OptionGroup => "option_group",
            NodeKind::Option => "option",
            NodeKind::OptionString => "option_string",
            NodeKind::OptionArgument => "option_argument",
            NodeKind::Description => "description",
            NodeKind::LiteralBlock => "literal_block",
            NodeKind::DoctestBlock => "doctest_block",
            NodeKind::LineBlock => "line_block",
            NodeKind::Line => "line",
            NodeKind::BlockQuote => "block_quote",
            NodeKind::Attribution => "attribution",
            NodeKind::Comment => "comment",
            NodeKind::SubstitutionDefinition => "substitution_definition",
            NodeKind::Target => "target",
            NodeKind::Footnote => "footnote",
            NodeKind::Citation => "citation",
            NodeKind::Label => "label",
            NodeKind::Table => "table",
            NodeKind::Caption => "caption",
            NodeKind::Entry => "entry",
            NodeKind::Text(_) => "text",
            NodeKind::Emphasis => "emphasis",
            NodeKind::Strong => "strong",
            NodeKind::Literal => "literal",
            NodeKind::Reference => "reference",
            NodeKind::FootnoteReference => "footnote_reference",
            NodeKind::CitationReference => "citation_reference",
            NodeKind::SubstitutionReference => "substitution_reference",
            NodeKind::Directive => "directive",
            NodeKind::DirectiveArgument => "directive_argument",
            NodeKind::Role => "role",
            NodeKind::RefRole => "ref_role",
            NodeKind::Code => "code",
            NodeKind::TargetIdentifier => "target_identifier",
            NodeKind::SystemMessage => "system_message",
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text(_)
                | NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Literal
                | NodeKind::Reference
                | NodeKind::FootnoteReference
                | NodeKind::CitationReference
                | NodeKind::SubstitutionReference
                | NodeKind::Role
                | NodeKind::RefRole
        )
    }

    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            NodeKind::Document | NodeKind::Section | NodeKind::Transition
        )
    }

    pub fn is_titular(&self) -> bool {
        matches!(self, NodeKind::Title | NodeKind::Caption)
    }

    pub fn is_body(&self) -> bool {
        !self.is_inline() && !self.is_structural() && !self.is_titular()
    }
}

/// Typed attribute values. A closed set; anything else is a modeling error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AttrValue {
    Str(String),
    Bool(bool),
    Int(i64),
    StrList(Vec<String>),
    /// Inclusive line ranges, e.g. `emphasize-lines: 1,3-5`.
    IntPairs(Vec<(i64, i64)>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

pub type AttrMap = BTreeMap<String, AttrValue>;

/// One node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Source id of the line this node came from.
    pub source: Option<Rc<str>>,
    /// 1-based line number within that source.
    pub line: Option<usize>,
    /// The raw text this node was parsed from.
    pub rawsource: String,
    pub names: Vec<String>,
    pub dup_names: Vec<String>,
    pub ids: Vec<String>,
    pub attrs: AttrMap,
}

impl Node {
    pub fn new(kind: NodeKind, rawsource: &str) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            source: None,
            line: None,
            rawsource: rawsource.to_string(),
            names: Vec::new(),
            dup_names: Vec::new(),
            ids: Vec::new(),
            attrs: AttrMap::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn str_attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(AttrValue::as_str)
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.attrs.get(key), Some(AttrValue::Bool(true)))
    }

    /// Move `name` from `names` to `dup_names`.
    pub fn dupname(&mut self, name: &str) {
        if let Some(pos) = self.names.iter().position(|n| n == name) {
            let name = self.names.remove(pos);
            self.dup_names.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_predicates() {
        assert!(NodeKind::Emphasis.is_inline());
        assert!(NodeKind::Section.is_structural());
        assert!(NodeKind::Title.is_titular());
        assert!(NodeKind::Paragraph.is_body());
        assert!(!NodeKind::Paragraph.is_inline());
    }

    #[test]
    fn test_dupname_moves_name() {
        let mut node = Node::new(NodeKind::Target, "");
        node.names.push("alpha".to_string());
        node.names.push("beta".to_string());
        node.dupname("alpha");
        assert_eq!(node.names, vec!["beta"]);
        assert_eq!(node.dup_names, vec!["alpha"]);
    }
}
