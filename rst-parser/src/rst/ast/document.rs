//! The document: node arena plus cross-reference bookkeeping.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::rst::ast::ids::make_id;
use crate::rst::ast::node::{AttrValue, Node, NodeId, NodeKind};
use crate::rst::diagnostics::{system_message, Diagnostic, MessageArgs, Reporter, Severity};
use crate::rst::options::ParserOptions;

/// The root of a parse: owns every node and the reference bookkeeping.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    /// Source id of the document itself.
    pub source: Rc<str>,
    /// Unique id to element.
    pub id_to_element: BTreeMap<String, NodeId>,
    /// Name to chosen id; `None` marks names invalidated by duplicates.
    pub name_ids: BTreeMap<String, Option<String>>,
    /// Name to explicitness (true = explicit target).
    pub name_types: BTreeMap<String, bool>,
    /// Refname to referring nodes.
    pub ref_names: BTreeMap<String, Vec<NodeId>>,
    pub citation_refs: BTreeMap<String, Vec<NodeId>>,
    pub footnote_refs: BTreeMap<String, Vec<NodeId>>,
    pub footnotes: Vec<NodeId>,
    pub citations: Vec<NodeId>,
    pub autofootnotes: Vec<NodeId>,
    pub autofootnote_refs: Vec<NodeId>,
    pub symbol_footnotes: Vec<NodeId>,
    pub symbol_footnote_refs: Vec<NodeId>,
    pub anonymous_targets: Vec<NodeId>,
    pub anonymous_refs: Vec<NodeId>,
    pub indirect_targets: Vec<NodeId>,
    /// Substitution name to definition node.
    pub substitution_defs: BTreeMap<String, NodeId>,
    /// Case-folded substitution name to case-sensitive name.
    pub substitution_names: BTreeMap<String, String>,
    /// Cursor used to stamp provenance on diagnostics.
    pub current_source: Option<Rc<str>>,
    pub current_line: Option<usize>,
    /// Diagnostics collected by the reporter, attached after the parse.
    pub diagnostics: Vec<Diagnostic>,
    id_prefix: String,
    auto_id_prefix: String,
    auto_id_counter: u64,
}

impl Document {
    pub fn new(source: Rc<str>, options: &ParserOptions) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            source: Rc::clone(&source),
            id_to_element: BTreeMap::new(),
            name_ids: BTreeMap::new(),
            name_types: BTreeMap::new(),
            ref_names: BTreeMap::new(),
            citation_refs: BTreeMap::new(),
            footnote_refs: BTreeMap::new(),
            footnotes: Vec::new(),
            citations: Vec::new(),
            autofootnotes: Vec::new(),
            autofootnote_refs: Vec::new(),
            symbol_footnotes: Vec::new(),
            symbol_footnote_refs: Vec::new(),
            anonymous_targets: Vec::new(),
            anonymous_refs: Vec::new(),
            indirect_targets: Vec::new(),
            substitution_defs: BTreeMap::new(),
            substitution_names: BTreeMap::new(),
            current_source: Some(Rc::clone(&source)),
            current_line: None,
            diagnostics: Vec::new(),
            id_prefix: options.id_prefix.clone(),
            auto_id_prefix: options.auto_id_prefix.clone(),
            auto_id_counter: 1,
        };
        let root = doc.new_node(NodeKind::Document, "");
        doc.node_mut(root).source = Some(source);
        doc
    }

    /// The root node; always the first allocation.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    // -- arena ------------------------------------------------------------

    pub fn new_node(&mut self, kind: NodeKind, rawsource: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind, rawsource));
        id
    }

    pub fn new_text(&mut self, text: &str) -> NodeId {
        self.new_node(NodeKind::Text(text.to_string()), text)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Attach `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child.index()].parent.is_none());
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    pub fn append_all(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self.append(parent, child);
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).children.clone()
    }

    /// Detach `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()]
            .children
            .retain(|&c| c != child);
        self.nodes[child.index()].parent = None;
    }

    /// Detach all children of `id`, returning them. Used when a directive's
    /// output replaces a substitution definition's parsed content.
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[id.index()].children);
        for &child in &children {
            self.nodes[child.index()].parent = None;
        }
        children
    }

    /// Concatenated text of the node's subtree.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        if let NodeKind::Text(text) = &node.kind {
            out.push_str(text);
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    /// Depth-first walk of the subtree rooted at `id`, including `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let node = self.node(next);
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn set_source_info(&mut self, id: NodeId, source: Option<Rc<str>>, line: Option<usize>) {
        let node = self.node_mut(id);
        node.source = source;
        node.line = line;
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: AttrValue) {
        self.node_mut(id).attrs.insert(key.to_string(), value);
    }

    // -- ids and names ----------------------------------------------------

    /// Ensure `node` has an id and register it in `id_to_element`.
    ///
    /// An existing id is validated for uniqueness; otherwise each name is
    /// tried through `make_id`, falling back to the synthetic counter.
    pub fn set_element_id(&mut self, node: NodeId, reporter: &mut Reporter) -> String {
        for existing in self.node(node).ids.clone() {
            match self.id_to_element.get(&existing) {
                Some(&owner) if owner != node => {
                    let line = self.node(node).line;
                    system_message(
                        self,
                        reporter,
                        Severity::Severe,
                        &format!("Duplicate ID: \"{}\".", existing),
                        MessageArgs {
                            line,
                            ..Default::default()
                        },
                    );
                }
                _ => {
                    self.id_to_element.insert(existing.clone(), node);
                }
            }
        }
        if let Some(id) = self.node(node).ids.last().cloned() {
            return id;
        }
        let names = self.node(node).names.clone();
        let mut chosen = None;
        for name in names {
            let id = format!("{}{}", self.id_prefix, make_id(&name));
            if id.len() > self.id_prefix.len() && !self.id_to_element.contains_key(&id) {
                chosen = Some(id);
                break;
            }
        }
        let id = chosen.unwrap_or_else(|| loop {
            let candidate = format!(
                "{}{}{}",
                self.id_prefix, self.auto_id_prefix, self.auto_id_counter
            );
            self.auto_id_counter += 1;
            if !self.id_to_element.contains_key(&candidate) {
                break candidate;
            }
        });
        self.node_mut(node).ids.push(id.clone());
        self.id_to_element.insert(id.clone(), node);
        id
    }

    /// Register each of the node's names against `id`, applying the
    /// duplicate-name resolution rules.
    pub fn set_name_id_map(
        &mut self,
        node: NodeId,
        id: &str,
        msg_parent: Option<NodeId>,
        explicit: bool,
        reporter: &mut Reporter,
    ) {
        for name in self.node(node).names.clone() {
            if self.name_ids.contains_key(&name) {
                self.set_duplicate_name_id(node, id, &name, msg_parent, explicit, reporter);
            } else {
                self.name_ids.insert(name.clone(), Some(id.to_string()));
                self.name_types.insert(name, explicit);
            }
        }
    }

    fn set_duplicate_name_id(
        &mut self,
        node: NodeId,
        id: &str,
        name: &str,
        msg_parent: Option<NodeId>,
        explicit: bool,
        reporter: &mut Reporter,
    ) {
        let old_id = self.name_ids.get(name).cloned().unwrap_or(None);
        let old_explicit = self.name_types.get(name).copied().unwrap_or(false);
        self.name_types
            .insert(name.to_string(), old_explicit || explicit);
        if explicit {
            if old_explicit {
                // Two explicit targets with the same name: an error, unless
                // both carry the identical refuri (then the prior wins with
                // just an info).
                let mut level = Severity::Error;
                if let Some(old_id) = &old_id {
                    let old_node = self.id_to_element[old_id];
                    let same_refuri = match (
                        self.node(node).str_attr("refuri"),
                        self.node(old_node).str_attr("refuri"),
                    ) {
                        (Some(new), Some(old)) => {
                            new == old && !self.node(old_node).names.is_empty()
                        }
                        _ => false,
                    };
                    if same_refuri {
                        level = Severity::Info;
                    } else {
                        self.node_mut(old_node).dupname(name);
                        self.name_ids.insert(name.to_string(), None);
                    }
                } else {
                    self.name_ids.insert(name.to_string(), None);
                }
                let line = self.node(node).line;
                let msg = system_message(
                    self,
                    reporter,
                    level,
                    &format!("Duplicate explicit target name: \"{}\".", name),
                    MessageArgs {
                        line,
                        backrefs: vec![id.to_string()],
                        ..Default::default()
                    },
                );
                if let Some(parent) = msg_parent {
                    self.append(parent, msg);
                }
                self.node_mut(node).dupname(name);
            } else if let Some(old_id) = &old_id {
                // Explicit wins over implicit: demote the prior holder.
                self.name_ids
                    .insert(name.to_string(), Some(id.to_string()));
                let old_node = self.id_to_element[old_id];
                self.node_mut(old_node).dupname(name);
            } else {
                self.name_ids
                    .insert(name.to_string(), Some(id.to_string()));
                let line = self.node(node).line;
                let msg = system_message(
                    self,
                    reporter,
                    Severity::Warning,
                    &format!("Duplicate implicit target name: \"{}\".", name),
                    MessageArgs {
                        line,
                        backrefs: vec![id.to_string()],
                        ..Default::default()
                    },
                );
                if let Some(parent) = msg_parent {
                    self.append(parent, msg);
                }
            }
        } else {
            if old_id.is_some() && !old_explicit {
                self.name_ids.insert(name.to_string(), None);
                let old_node = self.id_to_element[old_id.as_deref().unwrap()];
                self.node_mut(old_node).dupname(name);
            }
            self.node_mut(node).dupname(name);
            let line = self.node(node).line;
            let msg = system_message(
                self,
                reporter,
                Severity::Info,
                &format!("Duplicate implicit target name: \"{}\".", name),
                MessageArgs {
                    line,
                    backrefs: vec![id.to_string()],
                    ..Default::default()
                },
            );
            if let Some(parent) = msg_parent {
                self.append(parent, msg);
            }
        }
    }

    // -- target and reference notes ---------------------------------------

    pub fn note_implicit_target(
        &mut self,
        target: NodeId,
        msg_parent: Option<NodeId>,
        reporter: &mut Reporter,
    ) {
        let id = self.set_element_id(target, reporter);
        self.set_name_id_map(target, &id, msg_parent, false, reporter);
    }

    pub fn note_explicit_target(
        &mut self,
        target: NodeId,
        msg_parent: Option<NodeId>,
        reporter: &mut Reporter,
    ) {
        let id = self.set_element_id(target, reporter);
        self.set_name_id_map(target, &id, msg_parent, true, reporter);
    }

    pub fn note_refname(&mut self, node: NodeId) {
        if let Some(refname) = self.node(node).str_attr("refname").map(str::to_string) {
            self.ref_names.entry(refname).or_default().push(node);
        }
    }

    pub fn note_footnote(&mut self, node: NodeId, reporter: &mut Reporter) {
        self.footnotes.push(node);
        self.set_element_id(node, reporter);
    }

    pub fn note_autofootnote(&mut self, node: NodeId, reporter: &mut Reporter) {
        self.autofootnotes.push(node);
        self.set_element_id(node, reporter);
    }

    pub fn note_symbol_footnote(&mut self, node: NodeId, reporter: &mut Reporter) {
        self.symbol_footnotes.push(node);
        self.set_element_id(node, reporter);
    }

    pub fn note_citation(&mut self, node: NodeId, reporter: &mut Reporter) {
        self.citations.push(node);
        self.set_element_id(node, reporter);
    }

    pub fn note_footnote_ref(&mut self, node: NodeId, reporter: &mut Reporter) {
        self.set_element_id(node, reporter);
        if let Some(refname) = self.node(node).str_attr("refname").map(str::to_string) {
            self.footnote_refs.entry(refname).or_default().push(node);
        }
        self.note_refname(node);
    }

    pub fn note_autofootnote_ref(&mut self, node: NodeId, reporter: &mut Reporter) {
        self.set_element_id(node, reporter);
        self.autofootnote_refs.push(node);
    }

    pub fn note_symbol_footnote_ref(&mut self, node: NodeId, reporter: &mut Reporter) {
        self.set_element_id(node, reporter);
        self.symbol_footnote_refs.push(node);
    }

    pub fn note_citation_ref(&mut self, node: NodeId, reporter: &mut Reporter) {
        self.set_element_id(node, reporter);
        if let Some(refname) = self.node(node).str_attr("refname").map(str::to_string) {
            self.citation_refs.entry(refname).or_default().push(node);
        }
        self.note_refname(node);
    }

    pub fn note_anonymous_target(&mut self, node: NodeId) {
        self.anonymous_targets.push(node);
    }

    pub fn note_anonymous_ref(&mut self, node: NodeId) {
        self.anonymous_refs.push(node);
    }

    pub fn note_indirect_target(&mut self, node: NodeId, reporter: &mut Reporter) {
        self.indirect_targets.push(node);
        let names = self.node(node).names.clone();
        if !names.is_empty() {
            let id = self.node(node).ids.last().cloned().unwrap_or_default();
            self.set_name_id_map(node, &id, None, false, reporter);
        }
    }

    pub fn note_substitution_def(
        &mut self,
        node: NodeId,
        def_name: &str,
        msg_parent: Option<NodeId>,
        reporter: &mut Reporter,
    ) {
        let name = crate::rst::ast::ids::whitespace_normalize_name(def_name);
        if let Some(&old) = self.substitution_defs.get(&name) {
            let line = self.node(node).line;
            let msg = system_message(
                self,
                reporter,
                Severity::Error,
                &format!("Duplicate substitution definition name: \"{}\".", name),
                MessageArgs {
                    line,
                    ..Default::default()
                },
            );
            if let Some(parent) = msg_parent {
                self.append(parent, msg);
            }
            self.node_mut(old).dupname(&name);
        }
        self.substitution_defs.insert(name.clone(), node);
        self.substitution_names.insert(
            crate::rst::ast::ids::fully_normalize_name(&name),
            name.clone(),
        );
        if !self.node(node).names.contains(&name) {
            self.node_mut(node).names.push(name);
        }
    }

    pub fn note_substitution_ref(&mut self, node: NodeId, refname: &str) {
        let normalized = crate::rst::ast::ids::whitespace_normalize_name(refname);
        self.node_mut(node)
            .attrs
            .insert("refname".to_string(), AttrValue::Str(normalized));
    }
}
