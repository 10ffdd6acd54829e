//! Text state handlers: the three meanings of a text block.
//!
//! A text line's fate depends on what follows: a blank line makes it a
//! paragraph, an indented block makes it a definition list item, an
//! underline makes it a section title. Paragraphs ending in `::` arm a
//! literal block.

use crate::rst::ast::{fully_normalize_name, NodeId, NodeKind};
use crate::rst::diagnostics::Severity;
use crate::rst::inlines::unescape;
use crate::rst::parsing::machine::{Memo, StateData, StateMachine, TitleStyle};
use crate::rst::parsing::states::body::{inline_text, message, unindent_warning};
use crate::rst::parsing::states::StateKind;
use crate::rst::parsing::{Context, Signal, TxResult};
use crate::rst::util::unicode::column_width;

fn fatal(error: crate::rst::ParserError) -> Signal {
    Signal::Fatal(error)
}

/// Build a paragraph from `lines`. Returns the nodes and whether a literal
/// block follows (the paragraph ended with `::`).
pub(crate) fn paragraph(
    machine: &mut StateMachine,
    memo: &mut Memo,
    lines: &[String],
    lineno: usize,
) -> (Vec<NodeId>, bool) {
    let data = lines.join("\n");
    let data = data.trim_end();
    let mut literal_next = false;
    let text = if ends_with_unescaped_colons(data) {
        literal_next = true;
        if data.len() == 2 {
            // A lone `::` vanishes entirely.
            return (Vec::new(), true);
        }
        let before = &data[..data.len() - 2];
        if before.ends_with([' ', '\n']) {
            before.trim_end().to_string()
        } else {
            // `word::` keeps one colon.
            data[..data.len() - 1].to_string()
        }
    } else {
        data.to_string()
    };
    let parent = machine.node;
    let (text_nodes, messages) = inline_text(memo, &text, lineno, parent);
    let node = memo.document.new_node(NodeKind::Paragraph, data);
    let (source, srcline) = machine.get_source_and_line(Some(lineno));
    memo.document.set_source_info(node, source, srcline);
    memo.document.append_all(node, &text_nodes);
    let mut nodes = vec![node];
    nodes.extend(messages);
    (nodes, literal_next)
}

/// `data` ends with `::` that is not backslash-escaped.
fn ends_with_unescaped_colons(data: &str) -> bool {
    if !data.ends_with("::") {
        return false;
    }
    let before = &data[..data.len() - 2];
    let backslashes = before.chars().rev().take_while(|&c| c == '\\').count();
    backslashes % 2 == 0
}

/// Blank line: the context is a complete paragraph.
pub fn blank(machine: &mut StateMachine, context: &mut Context, memo: &mut Memo) -> TxResult {
    let lineno = machine.abs_line_number().saturating_sub(1);
    let (nodes, literal_next) = paragraph(machine, memo, context, lineno);
    let parent = machine.node;
    memo.document.append_all(parent, &nodes);
    context.clear();
    if literal_next {
        let nodes = literal_block(machine, memo)?;
        memo.document.append_all(parent, &nodes);
    }
    Ok(StateKind::Body)
}

pub fn eof(machine: &mut StateMachine, context: &mut Context, memo: &mut Memo) -> Result<(), Signal> {
    if !context.is_empty() {
        let lineno = machine.abs_line_number().saturating_sub(1);
        let (nodes, literal_next) = paragraph(machine, memo, context, lineno);
        let parent = machine.node;
        memo.document.append_all(parent, &nodes);
        context.clear();
        if literal_next {
            let nodes = literal_block(machine, memo)?;
            memo.document.append_all(parent, &nodes);
        }
    }
    Ok(())
}

/// Extract an indented literal block after `::`.
pub(crate) fn literal_block(
    machine: &mut StateMachine,
    memo: &mut Memo,
) -> Result<Vec<NodeId>, Signal> {
    let (indented, _indent, offset, blank_finish) = machine.get_indented(false, true);
    while !indented.is_empty() && indented.is_blank(indented.len() - 1) {
        let _ = indented.trim_end(1);
    }
    if indented.is_empty() {
        return quoted_literal_block(machine, memo);
    }
    let data = indented.join("\n");
    let node = memo.document.new_node(NodeKind::LiteralBlock, &data);
    let (source, srcline) = machine.get_source_and_line(Some(offset + 1));
    memo.document.set_source_info(node, source, srcline);
    let text = memo.document.new_text(&data);
    memo.document.append(node, text);
    let mut nodes = vec![node];
    if !blank_finish {
        nodes.push(unindent_warning(machine, memo, "Literal block"));
    }
    Ok(nodes)
}

/// No indented block followed the `::`: try an adjacent quoted block.
fn quoted_literal_block(
    machine: &mut StateMachine,
    memo: &mut Memo,
) -> Result<Vec<NodeId>, Signal> {
    let abs_offset = machine.abs_line_offset();
    let offset = machine.line_offset().max(0) as usize;
    let holder = memo.document.new_node(NodeKind::Paragraph, "");
    let rest = machine.input().slice(offset, machine.input().len());
    let mut nested = StateMachine::new(StateKind::QuotedLiteralBlock, false);
    nested
        .run(rest, abs_offset, holder, memo)
        .map_err(fatal)?;
    let new_offset = nested.abs_line_offset();
    machine.goto_line(new_offset);
    Ok(memo.document.take_children(holder))
}

/// Indented block after a one-line text: a definition list item.
pub fn indent(machine: &mut StateMachine, context: &mut Context, memo: &mut Memo) -> TxResult {
    let list = memo.document.new_node(NodeKind::DefinitionList, "");
    let (item, blank_finish) = definition_list_item(machine, context, memo)?;
    memo.document.append(list, item);
    let parent = machine.node;
    memo.document.append(parent, list);
    context.clear();
    let offset = (machine.line_offset() + 1).max(0) as usize;
    let rest = machine.input().slice(offset, machine.input().len());
    let (new_offset, blank_finish2) = machine
        .nested_list_parse(
            rest,
            machine.abs_line_offset() + 1,
            list,
            StateKind::DefinitionList,
            blank_finish,
            false,
            StateData::default(),
            memo,
        )
        .map_err(fatal)?;
    machine.goto_line(new_offset);
    if !blank_finish2 {
        let warning = unindent_warning(machine, memo, "Definition list");
        memo.document.append(parent, warning);
    }
    Ok(StateKind::Body)
}

/// Definition state: the indented block completes the pending term.
pub fn definition_indent(
    machine: &mut StateMachine,
    context: &mut Context,
    memo: &mut Memo,
) -> TxResult {
    let (item, blank_finish) = definition_list_item(machine, context, memo)?;
    let parent = machine.node;
    memo.document.append(parent, item);
    context.clear();
    machine.blank_finish = blank_finish;
    Ok(StateKind::DefinitionList)
}

pub(crate) fn definition_list_item(
    machine: &mut StateMachine,
    term_lines: &[String],
    memo: &mut Memo,
) -> Result<(NodeId, bool), Signal> {
    let (indented, _indent, line_offset, blank_finish) = machine.get_indented(false, true);
    let lineno = machine.abs_line_number().saturating_sub(1);
    let rawsource = format!("{}\n{}", term_lines.join("\n"), indented.join("\n"));
    let item = memo
        .document
        .new_node(NodeKind::DefinitionListItem, &rawsource);
    let (source, srcline) = machine.get_source_and_line(Some(lineno));
    memo.document.set_source_info(item, source, srcline);
    let (term_nodes, messages) = term(machine, memo, term_lines, lineno);
    memo.document.append_all(item, &term_nodes);
    let definition = memo.document.new_node(NodeKind::Definition, "");
    memo.document.append(item, definition);
    memo.document.append_all(definition, &messages);
    if term_lines
        .first()
        .map(|t| t.trim_end().ends_with("::"))
        .unwrap_or(false)
    {
        let info = message(
            memo,
            Severity::Info,
            "Blank line missing before literal block (after the \"::\")? \
             Interpreted as a definition list item.",
            Some(lineno + 1),
            None,
        );
        memo.document.append(definition, info);
    }
    machine
        .nested_parse(indented, line_offset, definition, false, memo)
        .map_err(fatal)?;
    Ok((item, blank_finish))
}

/// Split a term line into the term and its ` : `-separated classifiers.
fn term(
    machine: &mut StateMachine,
    memo: &mut Memo,
    lines: &[String],
    lineno: usize,
) -> (Vec<NodeId>, Vec<NodeId>) {
    let text = lines.first().cloned().unwrap_or_default();
    let parent = machine.node;
    let (text_nodes, messages) = inline_text(memo, &text, lineno, parent);
    let term_node = memo.document.new_node(NodeKind::Term, &text);
    let (source, srcline) = machine.get_source_and_line(Some(lineno));
    memo.document.set_source_info(term_node, source, srcline);
    let mut node_list = vec![term_node];
    for inline in text_nodes {
        let is_text = matches!(memo.document.node(inline).kind, NodeKind::Text(_));
        if is_text {
            let content = memo.document.text_of(inline);
            let parts = split_classifiers(&content);
            if parts.len() == 1 {
                let last = *node_list.last().expect("non-empty");
                memo.document.append(last, inline);
            } else {
                let first_text = parts[0].trim_end().to_string();
                let text_node = memo.document.new_text(&first_text);
                let last = *node_list.last().expect("non-empty");
                memo.document.append(last, text_node);
                for part in &parts[1..] {
                    let classifier = memo
                        .document
                        .new_node(NodeKind::Classifier, &unescape(part, true));
                    let text_node = memo.document.new_text(part);
                    memo.document.append(classifier, text_node);
                    node_list.push(classifier);
                }
            }
        } else {
            let last = *node_list.last().expect("non-empty");
            memo.document.append(last, inline);
        }
    }
    (node_list, messages)
}

/// Split on ` : ` classifier delimiters.
fn split_classifiers(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text;
    loop {
        match find_classifier_delimiter(rest) {
            Some((start, end)) => {
                parts.push(rest[..start].to_string());
                rest = &rest[end..];
            }
            None => {
                parts.push(rest.to_string());
                return parts;
            }
        }
    }
}

fn find_classifier_delimiter(text: &str) -> Option<(usize, usize)> {
    let mut search = 0;
    while let Some(found) = text[search..].find(" : ") {
        let start = search + found;
        // Swallow surrounding space runs.
        let mut left = start;
        while left > 0 && text.as_bytes()[left - 1] == b' ' {
            left -= 1;
        }
        let mut right = start + 3;
        while text.as_bytes().get(right) == Some(&b' ') {
            right += 1;
        }
        if left > 0 && right < text.len() {
            return Some((left, right));
        }
        search = start + 1;
    }
    None
}

/// Text continuation: collect the whole block as one paragraph.
pub fn text(machine: &mut StateMachine, context: &mut Context, memo: &mut Memo) -> TxResult {
    let startline = machine.abs_line_number().saturating_sub(1);
    let mut msg = None;
    let block = match machine.get_text_block(true) {
        Ok(block) => block,
        Err(err) => {
            let error = message(
                memo,
                Severity::Error,
                "Unexpected indentation.",
                Some(err.lineno),
                None,
            );
            msg = Some(error);
            err.block
        }
    };
    let mut lines = context.clone();
    lines.extend(block.texts());
    let (nodes, literal_next) = paragraph(machine, memo, &lines, startline);
    let parent = machine.node;
    memo.document.append_all(parent, &nodes);
    if let Some(msg) = msg {
        memo.document.append(parent, msg);
    }
    context.clear();
    if literal_next {
        let _ = machine.next_line(1);
        let nodes = literal_block(machine, memo)?;
        memo.document.append_all(parent, &nodes);
    }
    Ok(StateKind::Body)
}

// -- section titles --------------------------------------------------------

/// Underline after a one-line text block: a section title.
pub fn underline(
    machine: &mut StateMachine,
    line: &str,
    context: &mut Context,
    memo: &mut Memo,
) -> TxResult {
    let trimmed = line.trim_end();
    let mut chars = trimmed.chars();
    let first = chars.next().expect("underline pattern matched");
    if chars.any(|c| c != first) {
        // Mixed punctuation: paragraph text after all.
        return text(machine, context, memo);
    }
    let lineno = machine.abs_line_number();
    let title = context.first().cloned().unwrap_or_default();
    let title = title.trim_end();
    let mut messages = Vec::new();
    if column_width(title) > trimmed.len() {
        if trimmed.len() < 4 {
            if machine.match_titles {
                let msg = message(
                    memo,
                    Severity::Info,
                    "Possible title underline, too short for the title.\n\
                     Treating it as ordinary text because it's so short.",
                    Some(lineno),
                    None,
                );
                let parent = machine.node;
                memo.document.append(parent, msg);
            }
            return Err(Signal::TransitionCorrection("text"));
        }
        let blocktext = format!("{}\n{}", context.first().cloned().unwrap_or_default(), line);
        let msg = message(
            memo,
            Severity::Warning,
            "Title underline too short.",
            Some(lineno),
            Some(blocktext),
        );
        messages.push(msg);
    }
    if !machine.match_titles {
        let blocktext = format!("{}\n{}", context.first().cloned().unwrap_or_default(), line);
        let msg = message(
            memo,
            Severity::Severe,
            "Unexpected section title.",
            Some(lineno),
            Some(blocktext),
        );
        let parent = machine.node;
        memo.document.append(parent, msg);
        context.clear();
        return Ok(StateKind::Body);
    }
    let source = format!("{}\n{}", title, trimmed);
    let style = TitleStyle {
        over: None,
        under: first,
    };
    context.clear();
    section(machine, memo, title.trim_start(), &source, style, lineno - 1, messages)?;
    Ok(StateKind::Body)
}

/// Check for a valid subsection and create one if it checks out.
#[allow(clippy::too_many_arguments)]
pub(crate) fn section(
    machine: &mut StateMachine,
    memo: &mut Memo,
    title: &str,
    source: &str,
    style: TitleStyle,
    lineno: usize,
    messages: Vec<NodeId>,
) -> Result<(), Signal> {
    if check_subsection(machine, memo, source, style, lineno)? {
        new_subsection(machine, memo, title, lineno, style, messages)?;
    }
    Ok(())
}

/// Verify `style` fits the title hierarchy. A known style at the same or a
/// higher level backs the cursor up and bubbles out so the enclosing
/// machine re-evaluates the title.
fn check_subsection(
    machine: &mut StateMachine,
    memo: &mut Memo,
    source: &str,
    style: TitleStyle,
    lineno: usize,
) -> Result<bool, Signal> {
    let level = memo
        .title_styles
        .iter()
        .position(|&s| s == style)
        .map(|i| i + 1);
    let my_level = memo.section_level;
    match level {
        None => {
            if memo.title_styles.len() == memo.section_level {
                // New subsection level.
                memo.title_styles.push(style);
                Ok(true)
            } else {
                let msg = title_inconsistent(memo, source, lineno);
                let parent = machine.node;
                memo.document.append(parent, msg);
                Ok(false)
            }
        }
        Some(level) if level <= my_level => {
            // Sibling or supersection: let the parent re-evaluate.
            memo.section_level = level;
            if style.over.is_some() {
                memo.section_bubble_up_kludge = true;
            }
            let back = if style.over.is_some() { 3 } else { 2 };
            machine.previous_line(back);
            Err(Signal::Eof)
        }
        Some(level) if level == my_level + 1 => Ok(true),
        Some(_) => {
            let msg = title_inconsistent(memo, source, lineno);
            let parent = machine.node;
            memo.document.append(parent, msg);
            Ok(false)
        }
    }
}

fn title_inconsistent(memo: &mut Memo, source: &str, lineno: usize) -> NodeId {
    message(
        memo,
        Severity::Severe,
        "Title level inconsistent:",
        Some(lineno),
        Some(source.to_string()),
    )
}

fn new_subsection(
    machine: &mut StateMachine,
    memo: &mut Memo,
    title: &str,
    lineno: usize,
    _style: TitleStyle,
    messages: Vec<NodeId>,
) -> Result<(), Signal> {
    let my_level = memo.section_level;
    memo.section_level += 1;
    let section_node = memo.document.new_node(NodeKind::Section, "");
    let (source, srcline) = machine.get_source_and_line(Some(lineno));
    memo.document.set_source_info(section_node, source, srcline);
    let parent = machine.node;
    memo.document.append(parent, section_node);
    let (text_nodes, title_messages) = inline_text(memo, title, lineno, section_node);
    let title_node = memo.document.new_node(NodeKind::Title, title);
    memo.document.append_all(title_node, &text_nodes);
    let name = fully_normalize_name(&memo.document.text_of(title_node));
    memo.document.node_mut(section_node).names.push(name);
    {
        let Memo {
            document, reporter, ..
        } = memo;
        document.note_implicit_target(section_node, Some(section_node), reporter);
    }
    memo.document.append(section_node, title_node);
    memo.document.append_all(section_node, &messages);
    memo.document.append_all(section_node, &title_messages);
    let offset = (machine.line_offset() + 1).max(0) as usize;
    let abs_offset = machine.abs_line_offset() + 1;
    let rest = machine.input().slice(offset, machine.input().len());
    let new_offset = machine
        .nested_parse(rest, abs_offset, section_node, true, memo)
        .map_err(fatal)?;
    machine.goto_line(new_offset);
    if memo.section_level <= my_level {
        // The nested machine met a same- or higher-level title; this
        // machine cannot handle it either.
        return Err(Signal::Eof);
    }
    memo.section_level = my_level;
    Ok(())
}

// -- quoted literal blocks -------------------------------------------------

/// First (or consistent subsequent) quoted line.
pub fn quoted(
    machine: &mut StateMachine,
    line: &str,
    context: &mut Context,
    memo: &mut Memo,
) -> TxResult {
    let first = line.chars().next().expect("pattern matched");
    match machine.data.quote_char {
        None => {
            machine.data.quote_char = Some(first);
            machine.data.initial_lineno = machine.abs_line_number();
            context.push(line.to_string());
            Ok(StateKind::QuotedLiteralBlock)
        }
        Some(quote) if first == quote => {
            context.push(line.to_string());
            Ok(StateKind::QuotedLiteralBlock)
        }
        Some(_) => quoted_text(machine, context, memo),
    }
}

pub fn quoted_indent(
    machine: &mut StateMachine,
    context: &mut Context,
    memo: &mut Memo,
) -> TxResult {
    debug_assert!(!context.is_empty(), "indent without an initial quote");
    let lineno = machine.abs_line_number();
    let msg = message(
        memo,
        Severity::Error,
        "Unexpected indentation.",
        Some(lineno),
        None,
    );
    machine.data.messages.push(msg);
    machine.previous_line(1);
    Err(Signal::Eof)
}

pub fn quoted_text(
    machine: &mut StateMachine,
    context: &mut Context,
    memo: &mut Memo,
) -> TxResult {
    if !context.is_empty() {
        let lineno = machine.abs_line_number();
        let msg = message(
            memo,
            Severity::Error,
            "Inconsistent literal block quoting.",
            Some(lineno),
            None,
        );
        machine.data.messages.push(msg);
    }
    machine.previous_line(1);
    Err(Signal::Eof)
}

pub fn quoted_eof(
    machine: &mut StateMachine,
    context: &mut Context,
    memo: &mut Memo,
) -> Result<(), Signal> {
    if context.is_empty() {
        let lineno = machine.abs_line_number();
        let msg = message(
            memo,
            Severity::Warning,
            "Literal block expected; none found.",
            Some(lineno),
            None,
        );
        let parent = machine.node;
        memo.document.append(parent, msg);
        machine.previous_line(1);
    } else {
        let text = context.join("\n");
        let node = memo.document.new_node(NodeKind::LiteralBlock, &text);
        let (source, srcline) =
            machine.get_source_and_line(Some(machine.data.initial_lineno));
        memo.document.set_source_info(node, source, srcline);
        let text_node = memo.document.new_text(&text);
        memo.document.append(node, text_node);
        let parent = machine.node;
        memo.document.append(parent, node);
        context.clear();
    }
    let parent = machine.node;
    let messages = std::mem::take(&mut machine.data.messages);
    memo.document.append_all(parent, &messages);
    Ok(())
}
