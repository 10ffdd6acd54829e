//! The inline markup tokenizer.
//!
//! Works on a null-escaped string (see [`escape`](super::escape)). A scan
//! finds candidate start-strings in source order; a per-kind handler
//! verifies the start is not quoted, searches for the matching end-string,
//! builds the inline node, and records document bookkeeping. On failure the
//! start-string stays literal text and a warning is recorded. Text between
//! constructs is scanned again for standalone URIs and email addresses.
//!
//! Boundary context (the "start must follow whitespace or punctuation"
//! rule) is checked in code against the character before and after a
//! candidate, with a closed table of opening/closing punctuation pairs
//! deciding whether a start-string is quoted.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rst::ast::{
    fully_normalize_name, whitespace_normalize_name, AttrValue, Document, NodeId, NodeKind,
};
use crate::rst::diagnostics::{system_message, MessageArgs, Reporter, Severity};
use crate::rst::directives::RoleContext;
use crate::rst::inlines::escape::{escape_to_null, split_escaped_whitespace, unescape};
use crate::rst::inlines::uri;
use crate::rst::options::ParserOptions;
use std::rc::Rc;

/// Reference names: word characters without leading/trailing separators.
const SIMPLENAME: &str = r"(?:[^\W_])+(?:[-._+:](?:[^\W_])+)*";

static FOOTNOTE_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\A\[(?P<label>[0-9]+|\#(?:{name})?|\*|{name})\]_",
        name = SIMPLENAME
    ))
    .expect("static pattern")
});

static SIMPLEREF_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\A(?P<refname>{})(?P<refend>__?)",
        SIMPLENAME
    ))
    .expect("static pattern")
});

static INTERPRETED_SUFFIX_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\A(?::(?P<role>{}):)?(?P<refend>__?)?",
        SIMPLENAME
    ))
    .expect("static pattern")
});

static EMBEDDED_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\s+|\A)<(?P<target>(?:[^<>]|\x00[<>])+)>\z").expect("static pattern")
});

static ROLE_PREFIX_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\A:(?P<name>{}):`", SIMPLENAME)).expect("static pattern")
});

fn is_start_boundary(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '-' | '/'
                | ':'
                | '('
                | '['
                | '{'
                | '<'
                | '"'
                | '\''
                | '\u{00ab}'
                | '\u{2039}'
                | '\u{201c}'
                | '\u{2018}'
                | '\u{201e}'
                | '\u{201a}'
                | '\u{2010}'
                | '\u{2011}'
                | '\u{2012}'
                | '\u{2013}'
                | '\u{2014}'
                | '\u{2015}'
                | '\u{00a1}'
                | '\u{00bf}'
        )
}

fn is_end_boundary(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '-' | '/'
                | ':'
                | '.'
                | ','
                | ';'
                | '!'
                | '?'
                | '\\'
                | ')'
                | ']'
                | '}'
                | '>'
                | '"'
                | '\''
                | '\u{00bb}'
                | '\u{203a}'
                | '\u{201d}'
                | '\u{2019}'
                | '\u{2010}'
                | '\u{2011}'
                | '\u{2012}'
                | '\u{2013}'
                | '\u{2014}'
                | '\u{2015}'
                | '\u{2026}'
        )
}

/// Closers pairing with `opener`; empty when `opener` opens nothing.
fn closers_for(opener: char) -> &'static str {
    match opener {
        '(' => ")",
        '[' => "]",
        '{' => "}",
        '<' => ">",
        '"' => "\"",
        '\'' => "'",
        '\u{00ab}' => "\u{00bb}",
        '\u{2039}' => "\u{203a}",
        '\u{201c}' => "\u{201d}",
        '\u{2018}' => "\u{2019}",
        '\u{201e}' => "\u{201c}\u{201d}",
        '\u{201a}' => "\u{2018}\u{2019}",
        _ => "",
    }
}

fn prev_char(s: &str, i: usize) -> Option<char> {
    s[..i].chars().next_back()
}

fn char_at(s: &str, i: usize) -> Option<char> {
    s[i..].chars().next()
}

#[derive(Debug, Clone, PartialEq)]
enum StartKind {
    Strong,
    Emphasis,
    Literal,
    Target,
    SubstitutionRef,
    Interpreted {
        role: Option<String>,
    },
    FootnoteRef {
        whole_end: usize,
        label: String,
    },
    SimpleRef {
        whole_end: usize,
        refname: String,
        anonymous: bool,
    },
}

#[derive(Debug, Clone)]
struct StartMatch {
    /// Where the construct begins (role prefix included).
    start: usize,
    /// Byte offset of the start-string.
    marker_start: usize,
    /// Byte offset just past the start-string.
    marker_end: usize,
    kind: StartKind,
}

#[derive(Debug)]
struct EndMatch {
    /// Byte offset where the content ends.
    content_end: usize,
    /// Byte offset just past the end-string and any reference suffix.
    after: usize,
    /// The end-string as matched, suffix included.
    endstring: String,
}

/// The inline tokenizer. One per parse; holds the option-dependent
/// behavior, while the document and reporter are threaded through `parse`.
#[derive(Debug)]
pub struct Inliner {
    character_level: bool,
    trim_footnote_space: bool,
    registry: Rc<crate::rst::directives::DirectiveRegistry>,
}

impl Inliner {
    pub fn new(options: &ParserOptions) -> Self {
        Self {
            character_level: options.character_level_inline_markup,
            trim_footnote_space: options.trim_footnote_reference_space,
            registry: Rc::clone(&options.registry),
        }
    }

    /// Tokenize `text`, returning `(inline nodes, system messages)`.
    ///
    /// `parent` anchors duplicate-target messages for inline targets.
    pub fn parse(
        &self,
        text: &str,
        lineno: usize,
        document: &mut Document,
        reporter: &mut Reporter,
        parent: NodeId,
    ) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut remaining = escape_to_null(text);
        let mut processed: Vec<NodeId> = Vec::new();
        let mut unprocessed: Vec<String> = Vec::new();
        let mut messages: Vec<NodeId> = Vec::new();
        while !remaining.is_empty() {
            let Some(start) = self.find_start(&remaining) else {
                break;
            };
            let (before, nodes, rest, msgs) =
                self.dispatch(&start, &remaining, lineno, document, reporter, parent);
            unprocessed.push(before);
            messages.extend(msgs);
            if !nodes.is_empty() {
                let leading = unprocessed.concat();
                processed.extend(self.implicit_inline(&leading, document));
                processed.extend(nodes);
                unprocessed.clear();
            }
            remaining = rest;
        }
        let mut tail = unprocessed.concat();
        tail.push_str(&remaining);
        if !tail.is_empty() {
            processed.extend(self.implicit_inline(&tail, document));
        }
        (processed, messages)
    }

    // -- start scanning ---------------------------------------------------

    fn find_start(&self, s: &str) -> Option<StartMatch> {
        let mut escaped = false;
        for (i, c) in s.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if c == '\u{0}' {
                escaped = true;
                continue;
            }
            let prev = prev_char(s, i).filter(|&p| p != '\u{0}');
            let at_boundary = self.character_level
                || i == 0
                || prev.map(is_start_boundary).unwrap_or(false);
            if !at_boundary {
                continue;
            }
            let rest = &s[i..];
            if rest.starts_with("**") {
                if self.start_ok(s, i, i + 2) {
                    return Some(self.simple_start(i, 2, StartKind::Strong));
                }
            } else if rest.starts_with("``") {
                if self.start_ok(s, i, i + 2) {
                    return Some(self.simple_start(i, 2, StartKind::Literal));
                }
            } else if rest.starts_with("_`") {
                if self.start_ok(s, i, i + 2) {
                    return Some(self.simple_start(i, 2, StartKind::Target));
                }
            } else if rest.starts_with('*') {
                if self.start_ok(s, i, i + 1) {
                    return Some(self.simple_start(i, 1, StartKind::Emphasis));
                }
            } else if rest.starts_with('|') && !rest.starts_with("||") {
                if self.start_ok(s, i, i + 1) {
                    return Some(self.simple_start(i, 1, StartKind::SubstitutionRef));
                }
            } else if rest.starts_with('`') {
                if self.start_ok(s, i, i + 1) {
                    return Some(StartMatch {
                        start: i,
                        marker_start: i,
                        marker_end: i + 1,
                        kind: StartKind::Interpreted { role: None },
                    });
                }
            } else if rest.starts_with('[') {
                if let Some(caps) = FOOTNOTE_AT.captures(rest) {
                    let whole = caps.get(0).expect("whole match");
                    let end = i + whole.end();
                    if self.suffix_ok(s, end) {
                        return Some(StartMatch {
                            start: i,
                            marker_start: i,
                            marker_end: i + 1,
                            kind: StartKind::FootnoteRef {
                                whole_end: end,
                                label: caps["label"].to_string(),
                            },
                        });
                    }
                }
            } else if c == ':' {
                // A role prefix: `:name:` immediately followed by a
                // backquote that opens interpreted text.
                if let Some(caps) = ROLE_PREFIX_AT.captures(rest) {
                    let backquote = i + caps.get(0).expect("whole").end() - 1;
                    if !s[backquote + 1..].starts_with('`')
                        && self.start_ok(s, backquote, backquote + 1)
                    {
                        return Some(StartMatch {
                            start: i,
                            marker_start: backquote,
                            marker_end: backquote + 1,
                            kind: StartKind::Interpreted {
                                role: Some(caps["name"].to_string()),
                            },
                        });
                    }
                }
            } else if c.is_alphanumeric() && c != '_' {
                if let Some(caps) = SIMPLEREF_AT.captures(rest) {
                    let whole = caps.get(0).expect("whole match");
                    let end = i + whole.end();
                    if self.suffix_ok(s, end) {
                        return Some(StartMatch {
                            start: i,
                            marker_start: i,
                            marker_end: end,
                            kind: StartKind::SimpleRef {
                                whole_end: end,
                                refname: caps["refname"].to_string(),
                                anonymous: &caps["refend"] == "__",
                            },
                        });
                    }
                }
            }
        }
        None
    }

    fn simple_start(&self, i: usize, width: usize, kind: StartKind) -> StartMatch {
        StartMatch {
            start: i,
            marker_start: i,
            marker_end: i + width,
            kind,
        }
    }

    /// Non-whitespace must follow a start-string; a literal `*` between
    /// spaces is just an asterisk.
    fn start_ok(&self, s: &str, _marker_start: usize, marker_end: usize) -> bool {
        match char_at(s, marker_end) {
            Some(c) => !matches!(c, ' ' | '\n'),
            None => false,
        }
    }

    /// End-string suffix condition for whole constructs.
    fn suffix_ok(&self, s: &str, end: usize) -> bool {
        if self.character_level {
            return true;
        }
        match char_at(s, end) {
            None => true,
            Some(c) => is_end_boundary(c),
        }
    }

    /// A start-string wrapped in matching punctuation pairs is quoted and
    /// carries no markup meaning. A start-string at end-of-string counts as
    /// quoted too.
    fn quoted_start(&self, s: &str, start: &StartMatch) -> bool {
        if start.marker_end >= s.len() {
            return true;
        }
        let Some(prev) = prev_char(s, start.marker_start) else {
            return false;
        };
        let closers = closers_for(prev);
        if closers.is_empty() {
            return false;
        }
        char_at(s, start.marker_end)
            .map(|next| closers.contains(next))
            .unwrap_or(false)
    }

    // -- end scanning -----------------------------------------------------

    /// Search for `end_str` after `from`, honoring the non-whitespace-before
    /// and end-boundary-after rules. `nul_ok_before` relaxes the escape
    /// sentinel check (backslashes have no power inside literals).
    /// `ref_suffix` additionally swallows a trailing `_`/`__`.
    fn find_end(
        &self,
        s: &str,
        from: usize,
        end_str: &str,
        nul_ok_before: bool,
        ref_suffix: bool,
    ) -> Option<EndMatch> {
        let mut search = from;
        while let Some(found) = s[search..].find(end_str) {
            let p = search + found;
            if p == from {
                // Empty content: no end-string as far as the construct is
                // concerned.
                return None;
            }
            let before = prev_char(s, p);
            let before_ok = match before {
                Some(c) => {
                    !matches!(c, ' ' | '\n') && (nul_ok_before || c != '\u{0}')
                }
                None => false,
            };
            if before_ok {
                let mut after = p + end_str.len();
                let mut endstring = end_str.to_string();
                if ref_suffix {
                    let mut underscores = 0;
                    while underscores < 2 && s[after..].starts_with('_') {
                        after += 1;
                        underscores += 1;
                        endstring.push('_');
                    }
                }
                if self.suffix_ok(s, after) {
                    return Some(EndMatch {
                        content_end: p,
                        after,
                        endstring,
                    });
                }
            }
            search = p + 1;
            while !s.is_char_boundary(search) {
                search += 1;
            }
        }
        None
    }

    // -- dispatch ---------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &self,
        start: &StartMatch,
        s: &str,
        lineno: usize,
        document: &mut Document,
        reporter: &mut Reporter,
        parent: NodeId,
    ) -> (String, Vec<NodeId>, String, Vec<NodeId>) {
        match &start.kind {
            StartKind::Strong => self.inline_obj(
                start, s, "**", NodeKind::Strong, false, false, "strong", lineno, document,
                reporter,
            ),
            StartKind::Emphasis => self.inline_obj(
                start, s, "*", NodeKind::Emphasis, false, false, "emphasis", lineno, document,
                reporter,
            ),
            StartKind::Literal => self.inline_obj(
                start, s, "``", NodeKind::Literal, true, true, "literal", lineno, document,
                reporter,
            ),
            StartKind::Target => self.inline_internal_target(start, s, lineno, document, reporter, parent),
            StartKind::SubstitutionRef => {
                self.substitution_reference(start, s, lineno, document, reporter)
            }
            StartKind::Interpreted { role } => self.interpreted_or_phrase_ref(
                start,
                role.clone(),
                s,
                lineno,
                document,
                reporter,
            ),
            StartKind::FootnoteRef { whole_end, label } => {
                self.footnote_reference(start, *whole_end, label, s, document, reporter)
            }
            StartKind::SimpleRef {
                whole_end,
                refname,
                anonymous,
            } => self.simple_reference(start, *whole_end, refname, *anonymous, s, document),
        }
    }

    /// Shared handler for symmetric constructs (strong, emphasis, literal,
    /// and the node-building part of targets and substitution references).
    #[allow(clippy::too_many_arguments)]
    fn inline_obj(
        &self,
        start: &StartMatch,
        s: &str,
        end_str: &str,
        kind: NodeKind,
        nul_ok_before: bool,
        restore_backslashes: bool,
        display_name: &str,
        lineno: usize,
        document: &mut Document,
        reporter: &mut Reporter,
    ) -> (String, Vec<NodeId>, String, Vec<NodeId>) {
        let (before, nodes, rest, msgs, _end) = self.inline_obj_with_end(
            start,
            s,
            end_str,
            kind,
            nul_ok_before,
            restore_backslashes,
            false,
            display_name,
            lineno,
            document,
            reporter,
        );
        (before, nodes, rest, msgs)
    }

    #[allow(clippy::too_many_arguments)]
    fn inline_obj_with_end(
        &self,
        start: &StartMatch,
        s: &str,
        end_str: &str,
        kind: NodeKind,
        nul_ok_before: bool,
        restore_backslashes: bool,
        ref_suffix: bool,
        display_name: &str,
        lineno: usize,
        document: &mut Document,
        reporter: &mut Reporter,
    ) -> (String, Vec<NodeId>, String, Vec<NodeId>, String) {
        if self.quoted_start(s, start) {
            return (
                s[..start.marker_end].to_string(),
                Vec::new(),
                s[start.marker_end..].to_string(),
                Vec::new(),
                String::new(),
            );
        }
        match self.find_end(s, start.marker_end, end_str, nul_ok_before, ref_suffix) {
            Some(end) => {
                let content = &s[start.marker_end..end.content_end];
                let rawsource = unescape(&s[start.marker_start..end.after], true);
                let node = document.new_node(kind, &rawsource);
                let text = document.new_text(&unescape(content, restore_backslashes));
                document.append(node, text);
                (
                    s[..start.marker_start].to_string(),
                    vec![node],
                    s[end.after..].to_string(),
                    Vec::new(),
                    end.endstring,
                )
            }
            None => {
                let msg = system_message(
                    document,
                    reporter,
                    Severity::Warning,
                    &format!(
                        "Inline {} start-string without end-string.",
                        display_name
                    ),
                    MessageArgs {
                        line: Some(lineno),
                        ..Default::default()
                    },
                );
                (
                    s[..start.marker_end].to_string(),
                    Vec::new(),
                    s[start.marker_end..].to_string(),
                    vec![msg],
                    String::new(),
                )
            }
        }
    }

    fn inline_internal_target(
        &self,
        start: &StartMatch,
        s: &str,
        lineno: usize,
        document: &mut Document,
        reporter: &mut Reporter,
        parent: NodeId,
    ) -> (String, Vec<NodeId>, String, Vec<NodeId>) {
        let (before, nodes, rest, msgs, _end) = self.inline_obj_with_end(
            start,
            s,
            "`",
            NodeKind::Target,
            false,
            false,
            false,
            "internal target",
            lineno,
            document,
            reporter,
        );
        if let [target] = nodes[..] {
            let name = fully_normalize_name(&document.text_of(target));
            document.node_mut(target).names.push(name);
            document.note_explicit_target(target, Some(parent), reporter);
        }
        (before, nodes, rest, msgs)
    }

    fn substitution_reference(
        &self,
        start: &StartMatch,
        s: &str,
        lineno: usize,
        document: &mut Document,
        reporter: &mut Reporter,
    ) -> (String, Vec<NodeId>, String, Vec<NodeId>) {
        let (before, mut nodes, rest, msgs, endstring) = self.inline_obj_with_end(
            start,
            s,
            "|",
            NodeKind::SubstitutionReference,
            false,
            false,
            true,
            "substitution reference",
            lineno,
            document,
            reporter,
        );
        if let [subref] = nodes[..] {
            let subref_text = document.text_of(subref);
            document.note_substitution_ref(subref, &subref_text);
            if endstring.ends_with('_') {
                let rawsource = format!("|{}{}", subref_text, endstring);
                let reference = document.new_node(NodeKind::Reference, &rawsource);
                if endstring.ends_with("__") {
                    document.set_attr(reference, "anonymous", AttrValue::Bool(true));
                    document.note_anonymous_ref(reference);
                } else {
                    document.set_attr(
                        reference,
                        "refname",
                        AttrValue::Str(fully_normalize_name(&subref_text)),
                    );
                    document.note_refname(reference);
                }
                document.append(reference, subref);
                nodes = vec![reference];
            }
        }
        (before, nodes, rest, msgs)
    }

    #[allow(clippy::too_many_arguments)]
    fn interpreted_or_phrase_ref(
        &self,
        start: &StartMatch,
        prefix_role: Option<String>,
        s: &str,
        lineno: usize,
        document: &mut Document,
        reporter: &mut Reporter,
    ) -> (String, Vec<NodeId>, String, Vec<NodeId>) {
        if prefix_role.is_none() && self.quoted_start(s, start) {
            return (
                s[..start.marker_end].to_string(),
                Vec::new(),
                s[start.marker_end..].to_string(),
                Vec::new(),
            );
        }
        let Some((end, suffix_role, refend)) = self.find_interpreted_end(s, start.marker_end)
        else {
            let msg = system_message(
                document,
                reporter,
                Severity::Warning,
                "Inline interpreted text or phrase reference start-string without end-string.",
                MessageArgs {
                    line: Some(lineno),
                    ..Default::default()
                },
            );
            return (
                s[..start.marker_end].to_string(),
                Vec::new(),
                s[start.marker_end..].to_string(),
                vec![msg],
            );
        };
        let mut role = prefix_role.clone();
        let mut position = "prefix";
        if let Some(suffix) = suffix_role {
            if role.is_some() {
                let msg = system_message(
                    document,
                    reporter,
                    Severity::Warning,
                    "Multiple roles in interpreted text (both prefix and suffix present; \
                     only one allowed).",
                    MessageArgs {
                        line: Some(lineno),
                        ..Default::default()
                    },
                );
                return (
                    s[..end.after].to_string(),
                    Vec::new(),
                    s[end.after..].to_string(),
                    vec![msg],
                );
            }
            role = Some(suffix);
            position = "suffix";
        }
        let escaped_content = &s[start.marker_end..end.content_end];
        if !refend.is_empty() {
            if role.is_some() {
                let msg = system_message(
                    document,
                    reporter,
                    Severity::Warning,
                    &format!(
                        "Mismatch: both interpreted text role {} and reference suffix.",
                        position
                    ),
                    MessageArgs {
                        line: Some(lineno),
                        ..Default::default()
                    },
                );
                return (
                    s[..end.after].to_string(),
                    Vec::new(),
                    s[end.after..].to_string(),
                    vec![msg],
                );
            }
            let rawsource = unescape(&s[start.marker_start..end.after], true);
            return self.phrase_ref(
                s[..start.marker_start].to_string(),
                s[end.after..].to_string(),
                &rawsource,
                escaped_content,
                refend == "__",
                document,
                reporter,
            );
        }
        let rawsource = unescape(&s[start.start..end.after], true);
        let (nodes, msgs) = self.interpreted(
            &rawsource,
            escaped_content,
            role.as_deref(),
            lineno,
            document,
            reporter,
        );
        (
            s[..start.start].to_string(),
            nodes,
            s[end.after..].to_string(),
            msgs,
        )
    }

    /// Find the closing backquote of interpreted text plus its optional
    /// `:role:` suffix and `_`/`__` reference suffix.
    fn find_interpreted_end(
        &self,
        s: &str,
        from: usize,
    ) -> Option<(EndMatch, Option<String>, String)> {
        let mut search = from;
        while let Some(found) = s[search..].find('`') {
            let p = search + found;
            if p == from {
                return None;
            }
            let before_ok = prev_char(s, p)
                .map(|c| !matches!(c, ' ' | '\n' | '\u{0}'))
                .unwrap_or(false);
            if before_ok {
                let caps = INTERPRETED_SUFFIX_AT
                    .captures(&s[p + 1..])
                    .expect("suffix pattern always matches");
                let suffix_role = caps.name("role").map(|m| m.as_str().to_string());
                let refend = caps
                    .name("refend")
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                let after = p + 1 + caps.get(0).expect("whole").end();
                if self.suffix_ok(s, after) {
                    return Some((
                        EndMatch {
                            content_end: p,
                            after,
                            endstring: format!("`{}", &s[p + 1..after]),
                        },
                        suffix_role,
                        refend,
                    ));
                }
            }
            search = p + 1;
        }
        None
    }

    /// Interpreted text: resolve the role and hand off to its handler.
    fn interpreted(
        &self,
        rawsource: &str,
        escaped_content: &str,
        role: Option<&str>,
        lineno: usize,
        document: &mut Document,
        reporter: &mut Reporter,
    ) -> (Vec<NodeId>, Vec<NodeId>) {
        let role_name = role.unwrap_or("");
        match self.registry.lookup_role(role_name) {
            Some(handler) => {
                let mut ctx = RoleContext {
                    role_name: role_name.to_string(),
                    rawsource: rawsource.to_string(),
                    text: unescape(escaped_content, false),
                    lineno,
                    document,
                    reporter,
                };
                handler(&mut ctx)
            }
            None => {
                let msg = system_message(
                    document,
                    reporter,
                    Severity::Error,
                    &format!(
                        "Unknown interpreted text role \"{}\".",
                        role_name
                    ),
                    MessageArgs {
                        line: Some(lineno),
                        ..Default::default()
                    },
                );
                let literal = document.new_text(&unescape(escaped_content, false));
                (vec![literal], vec![msg])
            }
        }
    }

    /// Phrase reference, possibly with an embedded `<URI>` or `<alias_>`.
    #[allow(clippy::too_many_arguments)]
    fn phrase_ref(
        &self,
        before: String,
        after: String,
        rawsource: &str,
        escaped: &str,
        anonymous: bool,
        document: &mut Document,
        reporter: &mut Reporter,
    ) -> (String, Vec<NodeId>, String, Vec<NodeId>) {
        let embedded = EMBEDDED_LINK.captures(escaped);
        let mut target: Option<NodeId> = None;
        let mut alias_is_name = false;
        let mut alias = String::new();
        let mut text;
        match &embedded {
            Some(caps) => {
                let whole = caps.get(0).expect("whole match");
                let target_escaped = caps.name("target").expect("target group").as_str();
                text = unescape(&escaped[..whole.start()], false);
                let raw_alias = unescape(target_escaped, true);
                let underscore_escaped = raw_alias.ends_with("\\_");
                let alias_plain = unescape(target_escaped, false);
                let looks_like_uri = uri::URI_CANDIDATE
                    .find(&alias_plain)
                    .map(|m| m.start() == 0)
                    .unwrap_or(false);
                let t = document.new_node(NodeKind::Target, &unescape(whole.as_str(), true));
                if alias_plain.ends_with('_') && !underscore_escaped && !looks_like_uri {
                    alias_is_name = true;
                    alias = fully_normalize_name(&alias_plain[..alias_plain.len() - 1]);
                    document.set_attr(t, "refname", AttrValue::Str(alias.clone()));
                } else {
                    let parts = split_escaped_whitespace(target_escaped);
                    alias = parts
                        .iter()
                        .map(|part| {
                            unescape(part, false)
                                .split_whitespace()
                                .collect::<String>()
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    alias = uri::adjust_uri(&alias);
                    document.set_attr(t, "refuri", AttrValue::Str(alias.clone()));
                }
                target = Some(t);
                if text.is_empty() {
                    text = alias.clone();
                }
            }
            None => {
                text = unescape(escaped, false);
            }
        }
        let refname = fully_normalize_name(&text);
        let reference = document.new_node(NodeKind::Reference, rawsource);
        document.set_attr(
            reference,
            "name",
            AttrValue::Str(whitespace_normalize_name(&text)),
        );
        let text_node = document.new_text(&text);
        document.append(reference, text_node);
        let mut node_list = vec![reference];
        if anonymous {
            if let Some(t) = target {
                if alias_is_name {
                    document.set_attr(reference, "refname", AttrValue::Str(alias));
                    document.note_refname(reference);
                } else {
                    document.set_attr(reference, "refuri", AttrValue::Str(alias));
                }
                // The embedded target itself is dropped for anonymous refs.
                let _ = t;
            } else {
                document.set_attr(reference, "anonymous", AttrValue::Bool(true));
                document.note_anonymous_ref(reference);
            }
        } else if let Some(t) = target {
            if alias_is_name {
                document.set_attr(reference, "refname", AttrValue::Str(alias));
                document.node_mut(t).names.push(refname);
                document.note_indirect_target(t, reporter);
                document.note_refname(reference);
            } else {
                document.set_attr(reference, "refuri", AttrValue::Str(alias));
                document.node_mut(t).names.push(refname);
                document.note_explicit_target(t, None, reporter);
            }
            node_list.push(t);
        } else {
            document.set_attr(reference, "refname", AttrValue::Str(refname));
            document.note_refname(reference);
        }
        (before, node_list, after, Vec::new())
    }

    fn footnote_reference(
        &self,
        start: &StartMatch,
        whole_end: usize,
        label: &str,
        s: &str,
        document: &mut Document,
        reporter: &mut Reporter,
    ) -> (String, Vec<NodeId>, String, Vec<NodeId>) {
        let mut before = s[..start.start].to_string();
        let rest = s[whole_end..].to_string();
        let refname = fully_normalize_name(label);
        let rawsource = format!("[{}]_", label);
        let node;
        if !label.starts_with('#')
            && label != "*"
            && !label.chars().all(|c| c.is_ascii_digit())
        {
            // A citation reference.
            node = document.new_node(NodeKind::CitationReference, &rawsource);
            let text = document.new_text(label);
            document.append(node, text);
            document.set_attr(node, "refname", AttrValue::Str(refname));
            document.note_citation_ref(node, reporter);
        } else {
            node = document.new_node(NodeKind::FootnoteReference, &rawsource);
            let mut refname = refname;
            if let Some(stripped) = refname.strip_prefix('#') {
                refname = stripped.to_string();
                document.set_attr(node, "auto", AttrValue::Str("1".to_string()));
                document.note_autofootnote_ref(node, reporter);
            } else if refname == "*" {
                refname = String::new();
                document.set_attr(node, "auto", AttrValue::Str("*".to_string()));
                document.note_symbol_footnote_ref(node, reporter);
            } else {
                let text = document.new_text(label);
                document.append(node, text);
            }
            if !refname.is_empty() {
                document.set_attr(node, "refname", AttrValue::Str(refname));
                document.note_footnote_ref(node, reporter);
            }
            if self.trim_footnote_space {
                before = before.trim_end().to_string();
            }
        }
        (before, vec![node], rest, Vec::new())
    }

    fn simple_reference(
        &self,
        start: &StartMatch,
        whole_end: usize,
        refname: &str,
        anonymous: bool,
        s: &str,
        document: &mut Document,
    ) -> (String, Vec<NodeId>, String, Vec<NodeId>) {
        let normalized = fully_normalize_name(refname);
        let node = document.new_node(NodeKind::Reference, &s[start.start..whole_end]);
        document.set_attr(
            node,
            "name",
            AttrValue::Str(whitespace_normalize_name(refname)),
        );
        let text = document.new_text(refname);
        document.append(node, text);
        if anonymous {
            document.set_attr(node, "anonymous", AttrValue::Bool(true));
            document.note_anonymous_ref(node);
        } else {
            document.set_attr(node, "refname", AttrValue::Str(normalized));
            document.note_refname(node);
        }
        (
            s[..start.start].to_string(),
            vec![node],
            s[whole_end..].to_string(),
            Vec::new(),
        )
    }

    // -- implicit inline --------------------------------------------------

    /// Turn standalone URIs and emails in plain text into references.
    pub fn implicit_inline(&self, text: &str, document: &mut Document) -> Vec<NodeId> {
        if text.is_empty() {
            return Vec::new();
        }
        for caps in uri::URI_CANDIDATE.captures_iter(text) {
            let whole = caps.get(0).expect("whole match");
            if !self.implicit_boundary_before(text, whole.start()) {
                continue;
            }
            if !uri::is_known_scheme(&caps["scheme"]) {
                continue;
            }
            let trimmed = uri::trim_uri_trailer(whole.as_str());
            if trimmed.len() <= caps["scheme"].len() + 1 {
                continue;
            }
            let end = whole.start() + trimmed.len();
            let mut nodes = self.implicit_inline(&text[..whole.start()], document);
            let display = unescape(trimmed, false);
            let reference = document.new_node(NodeKind::Reference, &unescape(trimmed, true));
            document.set_attr(reference, "refuri", AttrValue::Str(display.clone()));
            let text_node = document.new_text(&display);
            document.append(reference, text_node);
            nodes.push(reference);
            nodes.extend(self.implicit_inline(&text[end..], document));
            return nodes;
        }
        for m in uri::EMAIL_CANDIDATE.find_iter(text) {
            if !self.implicit_boundary_before(text, m.start()) {
                continue;
            }
            let trimmed = uri::trim_uri_trailer(m.as_str());
            if trimmed.is_empty() || !trimmed.contains('@') || trimmed.ends_with('@') {
                continue;
            }
            let end = m.start() + trimmed.len();
            let mut nodes = self.implicit_inline(&text[..m.start()], document);
            let display = unescape(trimmed, false);
            let reference = document.new_node(NodeKind::Reference, &unescape(trimmed, true));
            document.set_attr(
                reference,
                "refuri",
                AttrValue::Str(format!("mailto:{}", display)),
            );
            let text_node = document.new_text(&display);
            document.append(reference, text_node);
            nodes.push(reference);
            nodes.extend(self.implicit_inline(&text[end..], document));
            return nodes;
        }
        vec![document.new_text(&unescape(text, false))]
    }

    fn implicit_boundary_before(&self, text: &str, start: usize) -> bool {
        match prev_char(text, start) {
            None => true,
            Some(c) => c.is_whitespace() || matches!(c, '(' | '[' | '{' | '<' | '"' | '\'' | ':'),
        }
    }
}
