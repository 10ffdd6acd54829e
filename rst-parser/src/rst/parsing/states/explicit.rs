//! Explicit markup constructs: `..`-introduced footnotes, citations,
//! hyperlink targets, substitution definitions, and directives, plus
//! comments as the fallback.
//!
//! Construct resolution is ordered; a construct whose detail syntax turns
//! out malformed reports a warning and the block is kept as a comment.

use regex::Captures;
use std::rc::Rc;

use crate::rst::ast::{
    fully_normalize_name, whitespace_normalize_name, AttrValue, NodeId, NodeKind,
};
use crate::rst::diagnostics::Severity;
use crate::rst::directives::runtime;
use crate::rst::inlines::uri::adjust_uri;
use crate::rst::inlines::{escape_to_null, split_escaped_whitespace, unescape};
use crate::rst::parsing::machine::{Memo, StateData, StateMachine};
use crate::rst::parsing::patterns;
use crate::rst::parsing::states::body::message;
use crate::rst::parsing::states::StateKind;
use crate::rst::parsing::{Signal, TxResult};

pub(crate) enum ConstructError {
    /// Malformed detail syntax; reported and the block becomes a comment.
    Markup(String),
    Signal(Signal),
}

impl From<crate::rst::ParserError> for ConstructError {
    fn from(error: crate::rst::ParserError) -> Self {
        ConstructError::Signal(Signal::Fatal(error))
    }
}

type ConstructResult = Result<(Vec<NodeId>, bool), ConstructError>;

/// Try each explicit construct in order; fall back to a comment.
pub fn explicit_construct(
    machine: &mut StateMachine,
    line: &str,
    memo: &mut Memo,
) -> Result<(Vec<NodeId>, bool), Signal> {
    let result = if let Some(caps) = patterns::FOOTNOTE.captures(line) {
        footnote(machine, line, &caps, memo)
    } else if let Some(caps) = patterns::CITATION.captures(line) {
        citation(machine, line, &caps, memo)
    } else if let Some(caps) = hyperlink_candidate(line) {
        hyperlink_target(machine, line, &caps, memo)
    } else if let Some(caps) = substitution_candidate(line) {
        substitution_def(machine, line, &caps, memo)
    } else if let Some(caps) = patterns::DIRECTIVE.captures(line) {
        directive_construct(machine, line, &caps, memo, None)
    } else {
        return Ok(comment(machine, line, memo));
    };
    match result {
        Ok(done) => Ok(done),
        Err(ConstructError::Markup(error_text)) => {
            let lineno = machine.abs_line_number();
            let warning = message(memo, Severity::Warning, &error_text, Some(lineno), None);
            let (mut nodes, blank_finish) = comment(machine, line, memo);
            nodes.push(warning);
            Ok((nodes, blank_finish))
        }
        Err(ConstructError::Signal(signal)) => Err(signal),
    }
}

fn hyperlink_candidate(line: &str) -> Option<Captures<'_>> {
    let caps = patterns::HYPERLINK_TARGET.captures(line)?;
    let end = caps.get(0).expect("match").end();
    match line[end..].chars().next() {
        Some(c) if c != ' ' => Some(caps),
        _ => None,
    }
}

fn substitution_candidate(line: &str) -> Option<Captures<'_>> {
    let caps = patterns::SUBSTITUTION_DEF.captures(line)?;
    let end = caps.get(0).expect("match").end();
    match line[end..].chars().next() {
        Some(c) if c != ' ' => Some(caps),
        _ => None,
    }
}

// -- comments --------------------------------------------------------------

pub(crate) fn comment(
    machine: &mut StateMachine,
    line: &str,
    memo: &mut Memo,
) -> (Vec<NodeId>, bool) {
    let match_end = patterns::EXPLICIT_MARKUP
        .captures(line)
        .and_then(|caps| caps.get(0))
        .map(|m| m.end())
        .unwrap_or(line.len().min(2));
    if line[match_end..].trim().is_empty() && machine.is_next_line_blank() {
        // An empty comment; also the explicit-markup list divider.
        let node = memo.document.new_node(NodeKind::Comment, "");
        return (vec![node], true);
    }
    let (indented, _indent, _offset, blank_finish) =
        machine.get_first_known_indented(match_end, false, true, true);
    while !indented.is_empty() && indented.is_blank(indented.len() - 1) {
        let _ = indented.trim_end(1);
    }
    let text = indented.join("\n");
    let node = memo.document.new_node(NodeKind::Comment, &text);
    let text_node = memo.document.new_text(&text);
    memo.document.append(node, text_node);
    (vec![node], blank_finish)
}

// -- footnotes and citations ----------------------------------------------

fn footnote(
    machine: &mut StateMachine,
    _line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> ConstructResult {
    let (source, srcline) = machine.get_source_and_line(None);
    let (indented, _indent, offset, blank_finish) =
        machine.get_first_known_indented(caps.get(0).expect("match").end(), false, true, true);
    let label = caps["label"].to_string();
    let mut name = fully_normalize_name(&label);
    let footnote = memo
        .document
        .new_node(NodeKind::Footnote, &indented.join("\n"));
    memo.document.set_source_info(footnote, source, srcline);
    if name.starts_with('#') {
        name = name[1..].to_string();
        memo.document
            .set_attr(footnote, "auto", AttrValue::Str("1".to_string()));
        if !name.is_empty() {
            memo.document.node_mut(footnote).names.push(name.clone());
        }
        let Memo {
            document, reporter, ..
        } = memo;
        document.note_autofootnote(footnote, reporter);
    } else if name == "*" {
        name.clear();
        memo.document
            .set_attr(footnote, "auto", AttrValue::Str("*".to_string()));
        let Memo {
            document, reporter, ..
        } = memo;
        document.note_symbol_footnote(footnote, reporter);
    } else {
        let label_node = memo.document.new_node(NodeKind::Label, &label);
        let text = memo.document.new_text(&label);
        memo.document.append(label_node, text);
        memo.document.append(footnote, label_node);
        memo.document.node_mut(footnote).names.push(name.clone());
        let Memo {
            document, reporter, ..
        } = memo;
        document.note_footnote(footnote, reporter);
    }
    {
        let Memo {
            document, reporter, ..
        } = memo;
        if name.is_empty() {
            document.set_element_id(footnote, reporter);
        } else {
            document.note_explicit_target(footnote, Some(footnote), reporter);
        }
    }
    if !indented.is_empty() {
        machine
            .nested_parse(indented, offset, footnote, false, memo)
            .map_err(ConstructError::from)?;
    }
    Ok((vec![footnote], blank_finish))
}

fn citation(
    machine: &mut StateMachine,
    _line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> ConstructResult {
    let (source, srcline) = machine.get_source_and_line(None);
    let (indented, _indent, offset, blank_finish) =
        machine.get_first_known_indented(caps.get(0).expect("match").end(), false, true, true);
    let label = caps["label"].to_string();
    let name = fully_normalize_name(&label);
    let citation = memo
        .document
        .new_node(NodeKind::Citation, &indented.join("\n"));
    memo.document.set_source_info(citation, source, srcline);
    let label_node = memo.document.new_node(NodeKind::Label, &label);
    let text = memo.document.new_text(&label);
    memo.document.append(label_node, text);
    memo.document.append(citation, label_node);
    memo.document.node_mut(citation).names.push(name);
    {
        let Memo {
            document, reporter, ..
        } = memo;
        document.note_citation(citation, reporter);
        document.note_explicit_target(citation, Some(citation), reporter);
    }
    if !indented.is_empty() {
        machine
            .nested_parse(indented, offset, citation, false, memo)
            .map_err(ConstructError::from)?;
    }
    Ok((vec![citation], blank_finish))
}

// -- hyperlink targets -----------------------------------------------------

/// The target marker's name part.
enum TargetMarker {
    Anonymous,
    Named(String),
}

/// Scan the escaped target text for the `name:` marker. Returns the marker
/// and the byte offset just past the colon and its following spaces.
fn parse_target_marker(escaped: &str) -> Option<(TargetMarker, usize)> {
    // Anonymous: a single underscore before the colon.
    if let Some(rest) = escaped.strip_prefix('_') {
        if rest.starts_with(':') {
            let after = consume_colon_whitespace(escaped, 1)?;
            return Some((TargetMarker::Anonymous, after));
        }
    }
    if let Some(rest) = escaped.strip_prefix('`') {
        // Quoted name: everything to the closing backquote.
        let close = rest.find('`')?;
        let name = &rest[..close];
        if name.is_empty() || name.starts_with(' ') || name.ends_with(' ') {
            return None;
        }
        let after = consume_colon_whitespace(escaped, 1 + close + 1)?;
        return Some((TargetMarker::Named(name.to_string()), after));
    }
    if escaped.starts_with([' ', '_', ':']) {
        return None;
    }
    // Unquoted name: the first unescaped colon followed by whitespace or
    // end of line, not doubled.
    let bytes: Vec<char> = escaped.chars().collect();
    let mut byte_pos = 0;
    for (i, &c) in bytes.iter().enumerate() {
        if c == ':' {
            let prev = if i > 0 { Some(bytes[i - 1]) } else { None };
            let next = bytes.get(i + 1).copied();
            let escaped_colon = prev == Some('\u{0}');
            let doubled = prev == Some(':') && bytes.get(i.wrapping_sub(2)).copied() != Some('\u{0}');
            let terminates = matches!(next, None | Some(' '));
            if !escaped_colon && !doubled && terminates && i > 0 {
                let name = &escaped[..byte_pos];
                let after = consume_colon_whitespace(escaped, byte_pos)?;
                return Some((TargetMarker::Named(name.to_string()), after));
            }
        }
        byte_pos += c.len_utf8();
    }
    None
}

fn consume_colon_whitespace(escaped: &str, colon_at: usize) -> Option<usize> {
    if !escaped[colon_at..].starts_with(':') {
        return None;
    }
    let mut end = colon_at + 1;
    for c in escaped[end..].chars() {
        if c == ' ' {
            end += 1;
        } else {
            break;
        }
    }
    Some(end)
}

fn hyperlink_target(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> ConstructResult {
    let lineno = machine.abs_line_number();
    let match_end = caps.get(0).expect("match").end();
    let (block, _indent, _offset, blank_finish) =
        machine.get_first_known_indented(match_end, true, false, true);
    let blocktext = format!("{}{}", &line[..match_end], block.join("\n"));
    let escaped_lines: Vec<String> = block
        .texts()
        .iter()
        .map(|text| escape_to_null(text))
        .collect();
    // The marker may span lines; grow the scanned prefix until it parses.
    let mut scanned = escaped_lines
        .first()
        .cloned()
        .unwrap_or_default()
        .trim_end()
        .to_string();
    let mut index = 0;
    let (marker, after) = loop {
        if let Some(found) = parse_target_marker(&scanned) {
            break found;
        }
        index += 1;
        match escaped_lines.get(index) {
            Some(next) => {
                scanned.push(' ');
                scanned.push_str(next.trim());
            }
            None => {
                return Err(ConstructError::Markup(
                    "malformed hyperlink target.".to_string(),
                ))
            }
        }
    };
    // The reference is the marker line's tail plus any remaining lines.
    let mut reference_lines: Vec<String> = vec![scanned[after..].trim().to_string()];
    reference_lines.extend(
        escaped_lines
            .iter()
            .skip(index + 1)
            .map(|text| text.trim().to_string()),
    );
    reference_lines.retain(|text| !text.is_empty());
    let name = match marker {
        TargetMarker::Anonymous => None,
        TargetMarker::Named(name) => Some(fully_normalize_name(&unescape(&name, false))),
    };
    let target = make_target(machine, memo, &reference_lines, &blocktext, lineno, name);
    Ok((vec![target], blank_finish))
}

/// Build a target node from its reference block: indirect (`other_`),
/// external (a URI), or internal (empty).
fn make_target(
    machine: &mut StateMachine,
    memo: &mut Memo,
    reference_lines: &[String],
    blocktext: &str,
    lineno: usize,
    name: Option<String>,
) -> NodeId {
    let target = memo.document.new_node(NodeKind::Target, blocktext);
    let (source, srcline) = machine.get_source_and_line(Some(lineno));
    memo.document.set_source_info(target, source, srcline);
    let last_nonblank = reference_lines.iter().rev().find(|l| !l.trim().is_empty());
    let mut indirect: Option<String> = None;
    if last_nonblank.map(|l| l.trim_end().ends_with('_')).unwrap_or(false) {
        let reference = whitespace_normalize_name(
            &reference_lines
                .iter()
                .map(|l| l.trim().to_string())
                .collect::<Vec<_>>()
                .join(" "),
        );
        if let Some(caps) = patterns::REFERENCE_TARGET.captures(&reference) {
            let refname = caps
                .name("simple")
                .or_else(|| caps.name("phrase"))
                .expect("one alternative matched");
            indirect = Some(unescape(refname.as_str(), false));
        }
    }
    if let Some(refname) = indirect {
        memo.document.set_attr(
            target,
            "refname",
            AttrValue::Str(fully_normalize_name(&refname)),
        );
        if let Some(name) = name {
            memo.document.node_mut(target).names.push(name);
            let parent = machine.node;
            let Memo {
                document, reporter, ..
            } = memo;
            document.note_explicit_target(target, Some(parent), reporter);
        } else {
            memo.document.set_attr(target, "anonymous", AttrValue::Bool(true));
            memo.document.note_anonymous_target(target);
        }
        let Memo {
            document, reporter, ..
        } = memo;
        document.note_indirect_target(target, reporter);
        return target;
    }
    let ref_parts = split_escaped_whitespace(&reference_lines.join(" "));
    let reference = ref_parts
        .iter()
        .map(|part| unescape(part, false).split_whitespace().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    if !reference.is_empty() {
        memo.document.set_attr(
            target,
            "refuri",
            AttrValue::Str(adjust_uri(&reference)),
        );
    }
    match name {
        Some(name) => {
            memo.document.node_mut(target).names.push(name);
            let parent = machine.node;
            let Memo {
                document, reporter, ..
            } = memo;
            document.note_explicit_target(target, Some(parent), reporter);
        }
        None => {
            memo.document.set_attr(target, "anonymous", AttrValue::Bool(true));
            memo.document.note_anonymous_target(target);
        }
    }
    target
}

/// `__ target` shorthand for anonymous targets.
pub(crate) fn anonymous_target(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> Result<(Vec<NodeId>, bool), Signal> {
    let lineno = machine.abs_line_number();
    let match_end = caps.get(0).expect("match").end();
    let (block, _indent, _offset, blank_finish) =
        machine.get_first_known_indented(match_end, true, true, true);
    let blocktext = format!("{}{}", &line[..match_end], block.join("\n"));
    let reference_lines: Vec<String> = block
        .texts()
        .iter()
        .map(|text| escape_to_null(text.trim()))
        .filter(|text| !text.is_empty())
        .collect();
    let target = make_target(machine, memo, &reference_lines, &blocktext, lineno, None);
    Ok((vec![target], blank_finish))
}

// -- substitution definitions ----------------------------------------------

/// Find the closing `|` of a substitution marker in escaped text.
/// Returns `(name, offset past the marker and its spaces)`.
fn parse_substitution_marker(escaped: &str) -> Option<(String, usize)> {
    let mut byte_pos = 0;
    let mut prev: Option<char> = None;
    for c in escaped.chars() {
        if c == '|' && byte_pos > 0 {
            let before_ok = !matches!(prev, Some(' ') | Some('\u{0}'));
            let mut end = byte_pos + 1;
            let mut next_ok = true;
            match escaped[end..].chars().next() {
                None => {}
                Some(' ') => {
                    while escaped[end..].starts_with(' ') {
                        end += 1;
                    }
                }
                Some(_) => next_ok = false,
            }
            if before_ok && next_ok {
                return Some((escaped[..byte_pos].to_string(), end));
            }
        }
        prev = Some(c);
        byte_pos += c.len_utf8();
    }
    None
}

fn substitution_def(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> ConstructResult {
    let (source, srcline) = machine.get_source_and_line(None);
    let match_end = caps.get(0).expect("match").end();
    let (block, _indent, mut offset, blank_finish) =
        machine.get_first_known_indented(match_end, false, false, true);
    let blocktext = format!("{}{}", &line[..match_end], block.join("\n"));
    block.disconnect();
    let mut scanned = escape_to_null(block.text(0).unwrap_or_default().trim_end());
    let mut index = 0;
    let (subname_escaped, after) = loop {
        if let Some(found) = parse_substitution_marker(&scanned) {
            break found;
        }
        index += 1;
        if index >= block.len() {
            return Err(ConstructError::Markup(
                "malformed substitution definition.".to_string(),
            ));
        }
        scanned.push(' ');
        scanned.push_str(&escape_to_null(
            block.text(index).expect("checked index").trim(),
        ));
    };
    // Drop the marker lines, keep the tail of the last one.
    for _ in 0..index {
        let _ = block.trim_start(1);
        offset += 1;
    }
    let tail = unescape(&scanned[after..], true);
    if block
        .set_text(0, tail.trim().to_string())
        .is_err()
    {
        return Err(ConstructError::Markup(
            "malformed substitution definition.".to_string(),
        ));
    }
    if block.text(0).map(|t| t.is_empty()).unwrap_or(false) {
        let _ = block.trim_start(1);
        offset += 1;
    }
    while !block.is_empty() && block.is_blank(0) {
        let _ = block.trim_start(1);
        offset += 1;
    }
    let subname = unescape(&subname_escaped, false);
    let node = memo
        .document
        .new_node(NodeKind::SubstitutionDefinition, &blocktext);
    memo.document.set_source_info(node, source, srcline);
    if block.is_empty() {
        let msg = message(
            memo,
            Severity::Warning,
            &format!("Substitution definition \"{}\" missing contents.", subname),
            Some(srcline.unwrap_or(0)),
            Some(blocktext),
        );
        return Ok((vec![msg], blank_finish));
    }
    memo.document
        .node_mut(node)
        .names
        .push(whitespace_normalize_name(&subname));
    let (_new_offset, blank_finish) = machine
        .nested_list_parse(
            block,
            offset,
            node,
            StateKind::SubstitutionDef,
            blank_finish,
            false,
            StateData::default(),
            memo,
        )
        .map_err(ConstructError::from)?;
    // Block-level children migrate out; only inline content defines the
    // substitution.
    let parent = machine.node;
    for child in memo.document.children(node) {
        let inline = match &memo.document.node(child).kind {
            NodeKind::Text(_) => true,
            kind => kind.is_inline(),
        };
        if !inline {
            memo.document.remove_child(node, child);
            memo.document.append(parent, child);
        }
    }
    for descendant in memo.document.descendants(node) {
        let n = memo.document.node(descendant);
        let illegal = !n.ids.is_empty()
            || (n.kind == NodeKind::Reference && n.flag("anonymous"))
            || (n.kind == NodeKind::FootnoteReference && n.attr("auto").is_some());
        if illegal && descendant != node {
            let msg = message(
                memo,
                Severity::Error,
                &format!(
                    "Substitution definition contains illegal element <{}>:",
                    memo.document.node(descendant).kind.name()
                ),
                Some(srcline.unwrap_or(0)),
                Some(memo.document.node(node).rawsource.clone()),
            );
            return Ok((vec![msg], blank_finish));
        }
    }
    if memo.document.node(node).children.is_empty() {
        let msg = message(
            memo,
            Severity::Warning,
            &format!("Substitution definition \"{}\" empty or invalid.", subname),
            Some(srcline.unwrap_or(0)),
            Some(memo.document.node(node).rawsource.clone()),
        );
        return Ok((vec![msg], blank_finish));
    }
    {
        let Memo {
            document, reporter, ..
        } = memo;
        document.note_substitution_def(node, &subname, Some(parent), reporter);
    }
    Ok((vec![node], blank_finish))
}

// -- directives ------------------------------------------------------------

pub(crate) fn directive_construct(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
    substitution_name: Option<String>,
) -> ConstructResult {
    let type_name = caps["name"].to_string();
    let registry = Rc::clone(&memo.options.registry);
    match registry.lookup_directive(&type_name) {
        Some(spec) => {
            runtime::run_directive(machine, memo, spec, &type_name, caps, line, substitution_name)
        }
        None => unknown_directive(machine, &type_name, memo),
    }
}

fn unknown_directive(
    machine: &mut StateMachine,
    type_name: &str,
    memo: &mut Memo,
) -> ConstructResult {
    let lineno = machine.abs_line_number();
    let (indented, _indent, _offset, blank_finish) =
        machine.get_first_known_indented(0, false, false, false);
    let text = indented.join("\n");
    let error = message(
        memo,
        Severity::Error,
        &format!("Unknown directive type \"{}\".", type_name),
        Some(lineno),
        Some(text),
    );
    Ok((vec![error], blank_finish))
}

// -- SubstitutionDef state handlers ---------------------------------------

/// The embedded directive that defines a substitution's content.
pub fn embedded_directive(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let substitution_name = memo.document.node(machine.node).names.first().cloned();
    let result = directive_construct(machine, line, caps, memo, substitution_name);
    let (nodes, blank_finish) = match result {
        Ok(done) => done,
        Err(ConstructError::Markup(error_text)) => {
            let lineno = machine.abs_line_number();
            let msg = message(memo, Severity::Error, &error_text, Some(lineno), None);
            (vec![msg], machine.is_next_line_blank())
        }
        Err(ConstructError::Signal(signal)) => return Err(signal),
    };
    let parent = machine.node;
    memo.document.append_all(parent, &nodes);
    if !machine.at_eof() {
        machine.blank_finish = blank_finish;
    }
    Err(Signal::Eof)
}

/// Anything else inside a substitution definition ends it.
pub fn substitution_text(machine: &mut StateMachine) -> TxResult {
    if !machine.at_eof() {
        machine.blank_finish = machine.is_next_line_blank();
    }
    Err(Signal::Eof)
}
