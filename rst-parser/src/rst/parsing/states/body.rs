//! Body state handlers: the workhorse block recognizers.

use regex::Captures;

use crate::rst::ast::{AttrValue, NodeId, NodeKind};
use crate::rst::diagnostics::{system_message, MessageArgs, Severity};
use crate::rst::lines::LineStore;
use crate::rst::parsing::machine::{Memo, StateData, StateMachine};
use crate::rst::parsing::patterns;
use crate::rst::parsing::states::{
    explicit, EnumContext, EnumFormat, EnumSequence, StateKind,
};
use crate::rst::parsing::{Signal, TxResult};
use crate::rst::util::roman;

/// Run the inline tokenizer over `text`.
pub(crate) fn inline_text(
    memo: &mut Memo,
    text: &str,
    lineno: usize,
    parent: NodeId,
) -> (Vec<NodeId>, Vec<NodeId>) {
    let Memo {
        inliner,
        document,
        reporter,
        ..
    } = memo;
    inliner.parse(text, lineno, document, reporter, parent)
}

/// Shorthand for a tree-anchored diagnostic.
pub(crate) fn message(
    memo: &mut Memo,
    severity: Severity,
    text: &str,
    line: Option<usize>,
    literal: Option<String>,
) -> NodeId {
    let Memo {
        document, reporter, ..
    } = memo;
    system_message(
        document,
        reporter,
        severity,
        text,
        MessageArgs {
            line,
            literal,
            ..Default::default()
        },
    )
}

/// `"<name> ends without a blank line; unexpected unindent."`
pub(crate) fn unindent_warning(
    machine: &StateMachine,
    memo: &mut Memo,
    construct: &str,
) -> NodeId {
    let line = machine.abs_line_number() + 1;
    message(
        memo,
        Severity::Warning,
        &format!(
            "{} ends without a blank line; unexpected unindent.",
            construct
        ),
        Some(line),
        None,
    )
}

fn fatal(error: crate::rst::ParserError) -> Signal {
    Signal::Fatal(error)
}

// -- block quotes ----------------------------------------------------------

/// An indented block with no marker opens a block quote.
pub fn indent(machine: &mut StateMachine, memo: &mut Memo) -> TxResult {
    let (indented, _indent, line_offset, blank_finish) = machine.get_indented(false, true);
    let parent = machine.node;
    let elements = block_quote(machine, memo, indented, line_offset)?;
    memo.document.append_all(parent, &elements);
    if !blank_finish {
        let warning = unindent_warning(machine, memo, "Block quote");
        memo.document.append(parent, warning);
    }
    Ok(machine.current_state)
}

/// Split a quote body on attribution lines and parse each segment.
pub(crate) fn block_quote(
    machine: &mut StateMachine,
    memo: &mut Memo,
    mut indented: LineStore,
    mut line_offset: usize,
) -> Result<Vec<NodeId>, Signal> {
    let mut elements = Vec::new();
    while !indented.is_empty() {
        let quote = memo
            .document
            .new_node(NodeKind::BlockQuote, &indented.join("\n"));
        let (source, line) = machine.get_source_and_line(Some(line_offset + 1));
        memo.document.set_source_info(quote, source, line);
        let split = split_attribution(&indented);
        match split {
            Some((body_end, attribution_start, attribution_end, text_start, text_indent)) => {
                let body = indented.slice(0, body_end);
                body.disconnect();
                machine
                    .nested_parse(body, line_offset, quote, false, memo)
                    .map_err(fatal)?;
                elements.push(quote);
                let a_lines = indented.slice(attribution_start, attribution_end);
                a_lines.disconnect();
                a_lines.trim_left(text_start, 0, 1);
                a_lines.trim_left(text_indent, 1, a_lines.len());
                let attribution_lineno = line_offset + attribution_start + 1;
                let (attribution, messages) =
                    parse_attribution(machine, memo, &a_lines, attribution_lineno);
                memo.document.append(quote, attribution);
                elements.extend(messages);
                let rest = indented.slice(attribution_end, indented.len());
                rest.disconnect();
                line_offset += attribution_end;
                indented = rest;
                while !indented.is_empty() && indented.is_blank(0) {
                    let _ = indented.trim_start(1);
                    line_offset += 1;
                }
            }
            None => {
                machine
                    .nested_parse(indented.clone(), line_offset, quote, false, memo)
                    .map_err(fatal)?;
                elements.push(quote);
                break;
            }
        }
    }
    Ok(elements)
}

/// Find a blank-line-preceded attribution (`-- author`) inside a quote.
/// Returns `(body_end, attr_start, attr_end, text_start_col, cont_indent)`.
fn split_attribution(indented: &LineStore) -> Option<(usize, usize, usize, usize, usize)> {
    let mut blank: Option<usize> = None;
    let mut nonblank_seen = false;
    for i in 0..indented.len() {
        let line = indented.text(i).ok()?;
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            if nonblank_seen && blank == Some(i.wrapping_sub(1)) {
                if let Some(caps) = patterns::ATTRIBUTION.captures(trimmed) {
                    let dash = caps.name("dash").expect("dash group");
                    let sp = caps.name("sp").expect("sp group");
                    let first = caps.name("first").expect("first group");
                    // `---` and longer runs are transitions, not
                    // attributions.
                    if !(sp.as_str().is_empty() && first.as_str() == "-") {
                        if let Some((end, indent)) = check_attribution(indented, i) {
                            let text_start = trimmed[..first.start()].chars().count();
                            return Some((i, i, end, text_start, indent));
                        }
                    }
                }
            }
            nonblank_seen = true;
        } else {
            blank = Some(i);
        }
    }
    None
}

/// Attribution continuation lines must share one indent; a blank line or
/// the end of the quote closes the attribution.
fn check_attribution(indented: &LineStore, start: usize) -> Option<(usize, usize)> {
    let mut indent: Option<usize> = None;
    let mut i = start + 1;
    while i < indented.len() {
        let line = indented.text(i).ok()?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        let line_indent = line.len() - line.trim_start().len();
        match indent {
            None => indent = Some(line_indent),
            Some(expected) if line_indent != expected => return None,
            _ => {}
        }
        i += 1;
    }
    Some((i, indent.unwrap_or(0)))
}

fn parse_attribution(
    machine: &StateMachine,
    memo: &mut Memo,
    lines: &LineStore,
    lineno: usize,
) -> (NodeId, Vec<NodeId>) {
    let text = lines.join("\n");
    let text = text.trim_end();
    let (nodes, messages) = inline_text(memo, text, lineno, machine.node);
    let attribution = memo.document.new_node(NodeKind::Attribution, text);
    let (source, line) = machine.get_source_and_line(Some(lineno));
    memo.document.set_source_info(attribution, source, line);
    memo.document.append_all(attribution, &nodes);
    (attribution, messages)
}

// -- bullet lists ----------------------------------------------------------

pub fn bullet(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let list = memo.document.new_node(NodeKind::BulletList, "");
    let (source, lineno) = machine.get_source_and_line(None);
    memo.document.set_source_info(list, source, lineno);
    let bullet_char = line.chars().next().expect("matched bullet");
    memo.document.set_attr(
        list,
        "bullet",
        AttrValue::Str(bullet_char.to_string()),
    );
    memo.document.append(machine.node, list);
    let (item, blank_finish) =
        list_item(machine, memo, caps.get(0).expect("match").end())?;
    memo.document.append(list, item);
    let offset = (machine.line_offset() + 1).max(0) as usize;
    let rest = machine.input().slice(offset, machine.input().len());
    let (new_offset, blank_finish) = machine
        .nested_list_parse(
            rest,
            machine.abs_line_offset() + 1,
            list,
            StateKind::BulletList,
            blank_finish,
            false,
            StateData {
                bullet: bullet_char,
                ..Default::default()
            },
            memo,
        )
        .map_err(fatal)?;
    machine.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(machine, memo, "Bullet list");
        let parent = machine.node;
        memo.document.append(parent, warning);
    }
    Ok(StateKind::Body)
}

/// BulletList state: another item of the same list, or out.
pub fn bullet_item(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    if line.chars().next() != Some(machine.data.bullet) {
        // Different bullet: a new list.
        return Err(super::invalid_input(machine));
    }
    let (item, blank_finish) =
        list_item(machine, memo, caps.get(0).expect("match").end())?;
    let parent = machine.node;
    memo.document.append(parent, item);
    machine.blank_finish = blank_finish;
    Ok(StateKind::BulletList)
}

/// Carve a list item's content, marker width already known.
pub(crate) fn list_item(
    machine: &mut StateMachine,
    memo: &mut Memo,
    indent: usize,
) -> Result<(NodeId, bool), Signal> {
    let line = machine.line().unwrap_or_default();
    let (indented, line_offset, blank_finish) = if line.len() > indent {
        let (block, offset, blank_finish) = machine.get_known_indented(indent, false, true);
        (block, offset, blank_finish)
    } else {
        let (block, _indent, offset, blank_finish) =
            machine.get_first_known_indented(indent, false, true, true);
        (block, offset, blank_finish)
    };
    let item = memo
        .document
        .new_node(NodeKind::ListItem, &indented.join("\n"));
    if !indented.is_empty() {
        machine
            .nested_parse(indented, line_offset, item, false, memo)
            .map_err(fatal)?;
    }
    Ok((item, blank_finish))
}

// -- enumerated lists ------------------------------------------------------

fn enum_text<'t>(caps: &Captures<'t>) -> (EnumFormat, &'t str) {
    if let Some(text) = caps.name("ptext") {
        (EnumFormat::Parens, text.as_str())
    } else if let Some(text) = caps.name("rtext") {
        (EnumFormat::Rparen, text.as_str())
    } else {
        (
            EnumFormat::Period,
            caps.name("dtext").expect("one format matched").as_str(),
        )
    }
}

fn sequence_matches(sequence: EnumSequence, text: &str) -> bool {
    match sequence {
        EnumSequence::Arabic => text.chars().all(|c| c.is_ascii_digit()),
        EnumSequence::LowerAlpha => {
            text.len() == 1 && text.chars().all(|c| c.is_ascii_lowercase())
        }
        EnumSequence::UpperAlpha => {
            text.len() == 1 && text.chars().all(|c| c.is_ascii_uppercase())
        }
        EnumSequence::LowerRoman => text.chars().all(|c| "ivxlcdm".contains(c)),
        EnumSequence::UpperRoman => text.chars().all(|c| "IVXLCDM".contains(c)),
    }
}

fn sequence_ordinal(sequence: EnumSequence, text: &str) -> Option<u32> {
    match sequence {
        EnumSequence::Arabic => text.parse().ok(),
        EnumSequence::LowerAlpha => text
            .chars()
            .next()
            .map(|c| c as u32 - 'a' as u32 + 1),
        EnumSequence::UpperAlpha => text
            .chars()
            .next()
            .map(|c| c as u32 - 'A' as u32 + 1),
        EnumSequence::LowerRoman => roman::parse_roman(&text.to_uppercase()).ok(),
        EnumSequence::UpperRoman => roman::parse_roman(text).ok(),
    }
}

const SEQUENCES: &[EnumSequence] = &[
    EnumSequence::Arabic,
    EnumSequence::LowerAlpha,
    EnumSequence::UpperAlpha,
    EnumSequence::LowerRoman,
    EnumSequence::UpperRoman,
];

/// Decompose a matched enumerator. Returns `(format, sequence, text,
/// ordinal)`; `sequence` is `None` for the `#` auto-enumerator, `ordinal`
/// is `None` when the text does not convert (bad roman numeral).
fn parse_enumerator(
    caps: &Captures<'_>,
    expected: Option<EnumSequence>,
) -> (EnumFormat, Option<EnumSequence>, String, Option<u32>) {
    let (format, text) = enum_text(caps);
    if text == "#" {
        return (format, None, text.to_string(), Some(1));
    }
    let mut sequence = match expected {
        Some(expected) if sequence_matches(expected, text) => Some(expected),
        _ => None,
    };
    if sequence.is_none() {
        sequence = match text {
            "i" => Some(EnumSequence::LowerRoman),
            "I" => Some(EnumSequence::UpperRoman),
            _ => SEQUENCES
                .iter()
                .copied()
                .find(|&seq| sequence_matches(seq, text)),
        };
    }
    let sequence = sequence.expect("enumerator pattern implies a sequence");
    let ordinal = sequence_ordinal(sequence, text);
    (format, Some(sequence), text.to_string(), ordinal)
}

/// Write the enumerator for `ordinal` back out, plus its auto variant.
fn make_enumerator(
    ordinal: u32,
    sequence: Option<EnumSequence>,
    format: EnumFormat,
) -> Option<(String, String)> {
    let text = match sequence {
        None => "#".to_string(),
        Some(EnumSequence::Arabic) => ordinal.to_string(),
        Some(EnumSequence::LowerAlpha) | Some(EnumSequence::UpperAlpha) => {
            if ordinal > 26 {
                return None;
            }
            let c = (b'a' + (ordinal - 1) as u8) as char;
            if sequence == Some(EnumSequence::UpperAlpha) {
                c.to_ascii_uppercase().to_string()
            } else {
                c.to_string()
            }
        }
        Some(EnumSequence::LowerRoman) => roman::to_roman(ordinal).ok()?.to_lowercase(),
        Some(EnumSequence::UpperRoman) => roman::to_roman(ordinal).ok()?,
    };
    let next = format!("{}{}{} ", format.prefix(), text, format.suffix());
    let auto = format!("{}#{} ", format.prefix(), format.suffix());
    Some((next, auto))
}

/// Verify the match is really a list item: the next line must be blank,
/// indented, or the next enumerator (or its auto variant).
fn is_enumerated_list_item(
    machine: &mut StateMachine,
    ordinal: Option<u32>,
    sequence: Option<EnumSequence>,
    format: EnumFormat,
) -> bool {
    let Some(ordinal) = ordinal else {
        return false;
    };
    let next_line = match machine.next_line(1) {
        Ok(()) => {
            let text = machine.line().unwrap_or_default();
            machine.previous_line(1);
            text
        }
        Err(_) => {
            machine.previous_line(1);
            return true;
        }
    };
    if next_line.is_empty() || next_line.starts_with(' ') {
        return true;
    }
    match make_enumerator(ordinal + 1, sequence, format) {
        Some((next, auto)) => next_line.starts_with(&next) || next_line.starts_with(&auto),
        None => false,
    }
}

pub fn enumerator(
    machine: &mut StateMachine,
    _line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let (format, sequence, text, ordinal) = parse_enumerator(caps, None);
    if !is_enumerated_list_item(machine, ordinal, sequence, format) {
        return Err(Signal::TransitionCorrection("text"));
    }
    let ordinal = ordinal.expect("checked above");
    let list = memo.document.new_node(NodeKind::EnumeratedList, "");
    let (source, lineno) = machine.get_source_and_line(None);
    memo.document.set_source_info(list, source, lineno);
    memo.document.append(machine.node, list);
    let enumtype = sequence.map(EnumSequence::name).unwrap_or("arabic");
    memo.document
        .set_attr(list, "enumtype", AttrValue::Str(enumtype.to_string()));
    memo.document
        .set_attr(list, "prefix", AttrValue::Str(format.prefix().to_string()));
    memo.document
        .set_attr(list, "suffix", AttrValue::Str(format.suffix().to_string()));
    if ordinal != 1 {
        memo.document
            .set_attr(list, "start", AttrValue::Int(ordinal as i64));
        let lineno = machine.abs_line_number();
        let msg = message(
            memo,
            Severity::Info,
            &format!(
                "Enumerated list start value not ordinal-1: \"{}\" (ordinal {})",
                text, ordinal
            ),
            Some(lineno),
            None,
        );
        let parent = machine.node;
        memo.document.append(parent, msg);
    }
    let (item, blank_finish) =
        list_item(machine, memo, caps.get(0).expect("match").end())?;
    memo.document.append(list, item);
    let offset = (machine.line_offset() + 1).max(0) as usize;
    let rest = machine.input().slice(offset, machine.input().len());
    let (new_offset, blank_finish) = machine
        .nested_list_parse(
            rest,
            machine.abs_line_offset() + 1,
            list,
            StateKind::EnumeratedList,
            blank_finish,
            false,
            StateData {
                enum_ctx: Some(EnumContext {
                    format,
                    sequence: sequence.unwrap_or(EnumSequence::Arabic),
                    last_ordinal: ordinal,
                    auto: sequence.is_none(),
                }),
                ..Default::default()
            },
            memo,
        )
        .map_err(fatal)?;
    machine.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(machine, memo, "Enumerated list");
        let parent = machine.node;
        memo.document.append(parent, warning);
    }
    Ok(StateKind::Body)
}

/// EnumeratedList state: the next item must extend the ordinal sequence.
pub fn enumerator_item(
    machine: &mut StateMachine,
    _line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let ctx = machine.data.enum_ctx.expect("enumerated list context");
    let (format, sequence, _text, ordinal) = parse_enumerator(caps, Some(ctx.sequence));
    let is_auto = sequence.is_none();
    let breaks_sequence = !is_auto
        && (sequence != Some(ctx.sequence)
            || ctx.auto
            || ordinal != Some(ctx.last_ordinal + 1));
    if format != ctx.format
        || breaks_sequence
        || !is_enumerated_list_item(machine, ordinal, sequence, format)
    {
        return Err(super::invalid_input(machine));
    }
    if is_auto {
        if let Some(ctx) = machine.data.enum_ctx.as_mut() {
            ctx.auto = true;
        }
    }
    let (item, blank_finish) =
        list_item(machine, memo, caps.get(0).expect("match").end())?;
    let parent = machine.node;
    memo.document.append(parent, item);
    machine.blank_finish = blank_finish;
    if let (Some(ctx), Some(ordinal)) = (machine.data.enum_ctx.as_mut(), ordinal) {
        ctx.last_ordinal = ordinal;
    }
    Ok(StateKind::EnumeratedList)
}

// -- field lists -----------------------------------------------------------

/// Reject names the loose field pattern lets through.
fn valid_field_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with([' ', ':'])
        && !name.ends_with(' ')
}

pub fn field_marker(
    machine: &mut StateMachine,
    _line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    if !valid_field_name(&caps["name"]) {
        return Err(Signal::TransitionCorrection("text"));
    }
    let field_list = memo.document.new_node(NodeKind::FieldList, "");
    let (source, lineno) = machine.get_source_and_line(None);
    memo.document.set_source_info(field_list, source, lineno);
    memo.document.append(machine.node, field_list);
    let (field_node, blank_finish) = field(machine, caps, memo, false)?;
    memo.document.append(field_list, field_node);
    let offset = (machine.line_offset() + 1).max(0) as usize;
    let rest = machine.input().slice(offset, machine.input().len());
    let (new_offset, blank_finish) = machine
        .nested_list_parse(
            rest,
            machine.abs_line_offset() + 1,
            field_list,
            StateKind::FieldList,
            blank_finish,
            false,
            StateData::default(),
            memo,
        )
        .map_err(fatal)?;
    machine.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(machine, memo, "Field list");
        let parent = machine.node;
        memo.document.append(parent, warning);
    }
    Ok(StateKind::Body)
}

/// FieldList state: one more field.
pub fn field_item(
    machine: &mut StateMachine,
    _line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    if !valid_field_name(&caps["name"]) {
        return Err(super::invalid_input(machine));
    }
    let (field_node, blank_finish) = field(machine, caps, memo, false)?;
    let parent = machine.node;
    memo.document.append(parent, field_node);
    machine.blank_finish = blank_finish;
    Ok(StateKind::FieldList)
}

/// ExtensionOptions state: fields with plain-text bodies.
pub fn extension_option_item(
    machine: &mut StateMachine,
    _line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    if !valid_field_name(&caps["name"]) {
        return Err(super::invalid_input(machine));
    }
    let (field_node, blank_finish) = field(machine, caps, memo, true)?;
    let parent = machine.node;
    memo.document.append(parent, field_node);
    machine.blank_finish = blank_finish;
    Ok(StateKind::ExtensionOptions)
}

pub(crate) fn field(
    machine: &mut StateMachine,
    caps: &Captures<'_>,
    memo: &mut Memo,
    simple_body: bool,
) -> Result<(NodeId, bool), Signal> {
    let name = caps["name"].to_string();
    let lineno = machine.abs_line_number();
    let (source, srcline) = machine.get_source_and_line(None);
    let (indented, _indent, line_offset, blank_finish) =
        machine.get_first_known_indented(caps.get(0).expect("match").end(), false, true, true);
    let field_node = memo.document.new_node(NodeKind::Field, "");
    memo.document.set_source_info(field_node, source, srcline);
    let field_name = memo.document.new_node(NodeKind::FieldName, &name);
    memo.document.append(field_node, field_name);
    let parent = machine.node;
    if simple_body {
        let text = memo.document.new_text(&name);
        memo.document.append(field_name, text);
    } else {
        let (name_nodes, name_messages) = inline_text(memo, &name, lineno, parent);
        memo.document.append_all(field_name, &name_nodes);
        let field_body = memo
            .document
            .new_node(NodeKind::FieldBody, &indented.join("\n"));
        memo.document.append_all(field_body, &name_messages);
        memo.document.append(field_node, field_body);
        if !indented.is_empty() {
            machine
                .nested_parse(indented, line_offset, field_body, false, memo)
                .map_err(fatal)?;
        }
        return Ok((field_node, blank_finish));
    }
    // Extension options: the body is one or more plain paragraphs,
    // uninterpreted.
    let field_body = memo
        .document
        .new_node(NodeKind::FieldBody, &indented.join("\n"));
    memo.document.append(field_node, field_body);
    let mut lines: Vec<String> = Vec::new();
    let mut texts = indented.texts();
    texts.push(String::new());
    for text in texts {
        if !text.trim().is_empty() {
            lines.push(text);
        } else if !lines.is_empty() {
            let paragraph_text = lines.join("\n");
            let paragraph = memo
                .document
                .new_node(NodeKind::Paragraph, &paragraph_text);
            let text_node = memo.document.new_text(&paragraph_text);
            memo.document.append(paragraph, text_node);
            memo.document.append(field_body, paragraph);
            lines = Vec::new();
        }
    }
    Ok((field_node, blank_finish))
}

// -- option lists ----------------------------------------------------------

pub fn option_marker(
    machine: &mut StateMachine,
    _line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let (source, lineno) = machine.get_source_and_line(None);
    let option_list = memo.document.new_node(NodeKind::OptionList, "");
    memo.document.set_source_info(option_list, source, lineno);
    let (item, blank_finish) = match option_list_item(machine, caps, memo) {
        Ok(result) => result,
        Err(OptionItemError::Markup(error_text)) => {
            // Shouldn't happen with the marker pattern, but play it safe:
            // report and treat the block as a quote.
            let msg = message(
                memo,
                Severity::Error,
                &format!("Invalid option list marker: {}", error_text),
                None,
                None,
            );
            let parent = machine.node;
            memo.document.append(parent, msg);
            let (indented, _indent, line_offset, blank_finish) = machine
                .get_first_known_indented(
                    caps.get(0).expect("match").end(),
                    false,
                    true,
                    true,
                );
            let elements = block_quote(machine, memo, indented, line_offset)?;
            memo.document.append_all(parent, &elements);
            if !blank_finish {
                let warning = unindent_warning(machine, memo, "Option list");
                memo.document.append(parent, warning);
            }
            return Ok(StateKind::Body);
        }
        Err(OptionItemError::Signal(signal)) => return Err(signal),
    };
    memo.document.append(machine.node, option_list);
    memo.document.append(option_list, item);
    let offset = (machine.line_offset() + 1).max(0) as usize;
    let rest = machine.input().slice(offset, machine.input().len());
    let (new_offset, blank_finish) = machine
        .nested_list_parse(
            rest,
            machine.abs_line_offset() + 1,
            option_list,
            StateKind::OptionList,
            blank_finish,
            false,
            StateData::default(),
            memo,
        )
        .map_err(fatal)?;
    machine.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(machine, memo, "Option list");
        let parent = machine.node;
        memo.document.append(parent, warning);
    }
    Ok(StateKind::Body)
}

/// OptionList state: one more option entry.
pub fn option_item(
    machine: &mut StateMachine,
    _line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let (item, blank_finish) = match option_list_item(machine, caps, memo) {
        Ok(result) => result,
        Err(OptionItemError::Markup(_)) => return Err(super::invalid_input(machine)),
        Err(OptionItemError::Signal(signal)) => return Err(signal),
    };
    let parent = machine.node;
    memo.document.append(parent, item);
    machine.blank_finish = blank_finish;
    Ok(StateKind::OptionList)
}

enum OptionItemError {
    Markup(String),
    Signal(Signal),
}

fn option_list_item(
    machine: &mut StateMachine,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> Result<(NodeId, bool), OptionItemError> {
    let offset = machine.abs_line_offset();
    let whole = caps.get(0).expect("match");
    let options = parse_option_marker(memo, whole.as_str()).map_err(OptionItemError::Markup)?;
    let (indented, _indent, line_offset, blank_finish) =
        machine.get_first_known_indented(whole.end(), false, true, true);
    if indented.is_empty() {
        // Not an option list item after all.
        machine.goto_line(offset);
        return Err(OptionItemError::Signal(Signal::TransitionCorrection(
            "text",
        )));
    }
    let option_group = memo.document.new_node(NodeKind::OptionGroup, "");
    memo.document.append_all(option_group, &options);
    let description = memo
        .document
        .new_node(NodeKind::Description, &indented.join("\n"));
    let item = memo.document.new_node(NodeKind::OptionListItem, "");
    memo.document.append(item, option_group);
    memo.document.append(item, description);
    machine
        .nested_parse(indented, line_offset, description, false, memo)
        .map_err(|error| OptionItemError::Signal(fatal(error)))?;
    Ok((item, blank_finish))
}

/// Split an option marker into one `Option` node per option, each with one
/// or two tokens. The whitespace split can misread `-o <val1 val2>` forms
/// with nested brackets; the angle-bracket rejoin below covers the plain
/// case only.
fn parse_option_marker(
    memo: &mut Memo,
    marker: &str,
) -> Result<Vec<NodeId>, String> {
    let mut options = Vec::new();
    for option_string in marker.trim_end().split(", ") {
        let mut tokens: Vec<String> =
            option_string.split_whitespace().map(str::to_string).collect();
        let mut delimiter = " ";
        if tokens.is_empty() {
            continue;
        }
        let first_token = tokens[0].clone();
        if let Some((name, value)) = first_token.split_once('=') {
            tokens.splice(0..1, [name.to_string(), value.to_string()]);
            delimiter = "=";
        } else if tokens[0].len() > 2
            && ((tokens[0].starts_with('-') && !tokens[0].starts_with("--"))
                || tokens[0].starts_with('+'))
        {
            let (opt, arg) = (tokens[0][..2].to_string(), tokens[0][2..].to_string());
            tokens.splice(0..1, [opt, arg]);
            delimiter = "";
        }
        if tokens.len() > 1
            && tokens[1].starts_with('<')
            && tokens.last().expect("non-empty").ends_with('>')
        {
            let joined = tokens[1..].join(" ");
            tokens.truncate(1);
            tokens.push(joined);
        }
        if tokens.len() <= 2 {
            let option = memo.document.new_node(NodeKind::Option, option_string);
            let option_string_node = memo
                .document
                .new_node(NodeKind::OptionString, &tokens[0]);
            let text = memo.document.new_text(&tokens[0]);
            memo.document.append(option_string_node, text);
            memo.document.append(option, option_string_node);
            if tokens.len() > 1 {
                let argument = memo
                    .document
                    .new_node(NodeKind::OptionArgument, &tokens[1]);
                memo.document.set_attr(
                    argument,
                    "delimiter",
                    AttrValue::Str(delimiter.to_string()),
                );
                let text = memo.document.new_text(&tokens[1]);
                memo.document.append(argument, text);
                memo.document.append(option, argument);
            }
            options.push(option);
        } else {
            return Err(format!(
                "wrong number of option tokens (={}), should be 1 or 2: \"{}\"",
                tokens.len(),
                option_string
            ));
        }
    }
    Ok(options)
}

// -- doctest blocks --------------------------------------------------------

pub fn doctest(machine: &mut StateMachine, memo: &mut Memo) -> TxResult {
    let block = machine
        .get_text_block(false)
        .expect("doctest blocks are never flush-left checked");
    let data = block.join("\n");
    let node = memo.document.new_node(NodeKind::DoctestBlock, &data);
    let text = memo.document.new_text(&data);
    memo.document.append(node, text);
    let parent = machine.node;
    memo.document.append(parent, node);
    Ok(StateKind::Body)
}

// -- line blocks -----------------------------------------------------------

pub fn line_block(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let block = memo.document.new_node(NodeKind::LineBlock, "");
    let parent = machine.node;
    memo.document.append(parent, block);
    let lineno = machine.abs_line_number();
    let (line_node, messages, blank_finish) =
        line_block_line(machine, memo, line, caps, lineno)?;
    memo.document.append(block, line_node);
    memo.document.append_all(parent, &messages);
    let mut blank_finish = blank_finish;
    if !blank_finish {
        let offset = (machine.line_offset() + 1).max(0) as usize;
        let rest = machine.input().slice(offset, machine.input().len());
        let (new_offset, finished) = machine
            .nested_list_parse(
                rest,
                machine.abs_line_offset() + 1,
                block,
                StateKind::LineBlock,
                false,
                false,
                StateData::default(),
                memo,
            )
            .map_err(fatal)?;
        machine.goto_line(new_offset);
        blank_finish = finished;
    }
    if !blank_finish {
        let msg = message(
            memo,
            Severity::Warning,
            "Line block ends without a blank line.",
            Some(lineno + 1),
            None,
        );
        memo.document.append(parent, msg);
    }
    if !memo.document.node(block).children.is_empty() {
        let first = memo.document.node(block).children[0];
        if memo.document.node(first).attr("indent").is_none() {
            memo.document.set_attr(first, "indent", AttrValue::Int(0));
        }
        nest_line_block_lines(memo, block);
    }
    Ok(StateKind::Body)
}

/// LineBlock state: one more `|` line.
pub fn line_block_item(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let lineno = machine.abs_line_number();
    let (line_node, messages, blank_finish) =
        line_block_line(machine, memo, line, caps, lineno)?;
    let block = machine.node;
    memo.document.append(block, line_node);
    if let Some(grandparent) = memo.document.node(block).parent {
        memo.document.append_all(grandparent, &messages);
    }
    machine.blank_finish = blank_finish;
    Ok(StateKind::LineBlock)
}

fn line_block_line(
    machine: &mut StateMachine,
    memo: &mut Memo,
    line: &str,
    caps: &Captures<'_>,
    lineno: usize,
) -> Result<(NodeId, Vec<NodeId>, bool), Signal> {
    let whole = caps.get(0).expect("match");
    let (indented, _indent, _offset, blank_finish) =
        machine.get_first_known_indented(whole.end(), true, true, true);
    let text = indented.join("\n");
    let parent = machine.node;
    let (text_nodes, messages) = inline_text(memo, &text, lineno, parent);
    let line_node = memo.document.new_node(NodeKind::Line, &text);
    memo.document.append_all(line_node, &text_nodes);
    if line.trim_end() != "|" {
        // Indent relative to the `|` marker: the spaces after it, minus the
        // one separating space.
        let spaces = caps.get(1).map(|m| m.as_str().len()).unwrap_or(1);
        memo.document
            .set_attr(line_node, "indent", AttrValue::Int(spaces as i64 - 1));
    }
    Ok((line_node, messages, blank_finish))
}

/// Recursively group line-block lines by indentation.
fn nest_line_block_lines(memo: &mut Memo, block: NodeId) {
    let children = memo.document.children(block);
    for i in 1..children.len() {
        if memo.document.node(children[i]).attr("indent").is_none() {
            let prev = memo
                .document
                .node(children[i - 1])
                .attr("indent")
                .and_then(AttrValue::as_int)
                .unwrap_or(0);
            memo.document
                .set_attr(children[i], "indent", AttrValue::Int(prev));
        }
    }
    nest_line_block_segment(memo, block);
}

fn nest_line_block_segment(memo: &mut Memo, block: NodeId) {
    let children = memo.document.children(block);
    let indents: Vec<i64> = children
        .iter()
        .map(|&child| {
            memo.document
                .node(child)
                .attr("indent")
                .and_then(AttrValue::as_int)
                .unwrap_or(0)
        })
        .collect();
    let Some(&least) = indents.iter().min() else {
        return;
    };
    let mut new_items: Vec<NodeId> = Vec::new();
    let mut nested: Vec<NodeId> = Vec::new();
    let old_children = memo.document.take_children(block);
    for (child, indent) in old_children.into_iter().zip(indents) {
        if indent > least {
            nested.push(child);
        } else {
            if !nested.is_empty() {
                let inner = memo.document.new_node(NodeKind::LineBlock, "");
                memo.document.append_all(inner, &nested);
                nest_line_block_segment(memo, inner);
                new_items.push(inner);
                nested = Vec::new();
            }
            new_items.push(child);
        }
    }
    if !nested.is_empty() {
        let inner = memo.document.new_node(NodeKind::LineBlock, "");
        memo.document.append_all(inner, &nested);
        nest_line_block_segment(memo, inner);
        new_items.push(inner);
    }
    memo.document.append_all(block, &new_items);
}

// -- explicit markup -------------------------------------------------------

pub fn explicit_markup(
    machine: &mut StateMachine,
    line: &str,
    _caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let (nodes, blank_finish) = explicit::explicit_construct(machine, line, memo)?;
    let parent = machine.node;
    memo.document.append_all(parent, &nodes);
    explicit_list(machine, blank_finish, memo)?;
    Ok(StateKind::Body)
}

/// Explicit state: further explicit markup.
pub fn explicit_item(
    machine: &mut StateMachine,
    line: &str,
    _caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let (nodes, blank_finish) = explicit::explicit_construct(machine, line, memo)?;
    let parent = machine.node;
    memo.document.append_all(parent, &nodes);
    machine.blank_finish = blank_finish;
    Ok(StateKind::Explicit)
}

pub fn anonymous(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let (nodes, blank_finish) = explicit::anonymous_target(machine, line, caps, memo)?;
    let parent = machine.node;
    memo.document.append_all(parent, &nodes);
    explicit_list(machine, blank_finish, memo)?;
    Ok(StateKind::Body)
}

/// Explicit state: another anonymous target.
pub fn anonymous_item(
    machine: &mut StateMachine,
    line: &str,
    caps: &Captures<'_>,
    memo: &mut Memo,
) -> TxResult {
    let (nodes, blank_finish) = explicit::anonymous_target(machine, line, caps, memo)?;
    let parent = machine.node;
    memo.document.append_all(parent, &nodes);
    machine.blank_finish = blank_finish;
    Ok(StateKind::Explicit)
}

/// Parse subsequent explicit markup constructs as one run.
fn explicit_list(
    machine: &mut StateMachine,
    blank_finish: bool,
    memo: &mut Memo,
) -> Result<(), Signal> {
    let offset = (machine.line_offset() + 1).max(0) as usize;
    let rest = machine.input().slice(offset, machine.input().len());
    let match_titles = machine.match_titles;
    let (new_offset, blank_finish) = machine
        .nested_list_parse(
            rest,
            machine.abs_line_offset() + 1,
            machine.node,
            StateKind::Explicit,
            blank_finish,
            match_titles,
            StateData::default(),
            memo,
        )
        .map_err(fatal)?;
    machine.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(machine, memo, "Explicit markup");
        let parent = machine.node;
        memo.document.append(parent, warning);
    }
    Ok(())
}

// -- title overlines and transitions --------------------------------------

pub fn line(
    machine: &mut StateMachine,
    line: &str,
    context: &mut Vec<String>,
    memo: &mut Memo,
) -> TxResult {
    let trimmed = line.trim_end();
    let mut chars = trimmed.chars();
    let first = chars.next().expect("line pattern matched");
    if chars.any(|c| c != first) {
        // Mixed punctuation: ordinary text.
        return Err(Signal::TransitionCorrection("text"));
    }
    if machine.match_titles {
        context.clear();
        context.push(line.to_string());
        return Ok(StateKind::Line);
    }
    if trimmed == "::" {
        return Err(Signal::TransitionCorrection("text"));
    }
    if trimmed.len() < 4 {
        let lineno = machine.abs_line_number();
        let msg = message(
            memo,
            Severity::Info,
            "Unexpected possible title overline or transition.\n\
             Treating it as ordinary text because it's so short.",
            Some(lineno),
            None,
        );
        let parent = machine.node;
        memo.document.append(parent, msg);
        return Err(Signal::TransitionCorrection("text"));
    }
    let lineno = machine.abs_line_number();
    let msg = message(
        memo,
        Severity::Severe,
        "Unexpected section title or transition.",
        Some(lineno),
        Some(line.to_string()),
    );
    let parent = machine.node;
    memo.document.append(parent, msg);
    Ok(StateKind::Body)
}
