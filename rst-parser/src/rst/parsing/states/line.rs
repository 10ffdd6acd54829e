//! Line state: the second line of an overlined title, or a transition
//! marker.

use crate::rst::ast::NodeKind;
use crate::rst::diagnostics::Severity;
use crate::rst::parsing::machine::{Memo, StateMachine, TitleStyle};
use crate::rst::parsing::states::body::message;
use crate::rst::parsing::states::{text, StateKind};
use crate::rst::parsing::{Context, Signal, TxResult};
use crate::rst::util::unicode::column_width;

/// Transition marker at end of section or document.
pub fn eof(machine: &mut StateMachine, context: &mut Context, memo: &mut Memo) -> Result<(), Signal> {
    let marker = context.first().cloned().unwrap_or_default();
    let marker = marker.trim().to_string();
    if memo.section_bubble_up_kludge {
        memo.section_bubble_up_kludge = false;
    } else if marker.len() < 4 {
        return Err(state_correction(machine, context, 0));
    }
    if machine.data.eofcheck {
        let lineno = machine.abs_line_number().saturating_sub(1);
        let transition = memo.document.new_node(NodeKind::Transition, &marker);
        let (source, srcline) = machine.get_source_and_line(Some(lineno));
        memo.document.set_source_info(transition, source, srcline);
        let parent = machine.node;
        memo.document.append(parent, transition);
    }
    machine.data.eofcheck = true;
    context.clear();
    Ok(())
}

/// Blank line after the marker: a transition.
pub fn blank(machine: &mut StateMachine, context: &mut Context, memo: &mut Memo) -> TxResult {
    let marker = context.first().cloned().unwrap_or_default();
    let marker = marker.trim().to_string();
    if marker.len() < 4 {
        return Err(state_correction(machine, context, 0));
    }
    let lineno = machine.abs_line_number().saturating_sub(1);
    let transition = memo.document.new_node(NodeKind::Transition, &marker);
    let (source, srcline) = machine.get_source_and_line(Some(lineno));
    memo.document.set_source_info(transition, source, srcline);
    let parent = machine.node;
    memo.document.append(parent, transition);
    context.clear();
    Ok(StateKind::Body)
}

/// Text after the marker: a potential over- and underlined title.
pub fn text(
    machine: &mut StateMachine,
    line: &str,
    context: &mut Context,
    memo: &mut Memo,
) -> TxResult {
    let lineno = machine.abs_line_number().saturating_sub(1);
    let overline = context.first().cloned().unwrap_or_default();
    let title = line.to_string();
    let underline = match machine.next_line(1) {
        Ok(()) => machine.line().unwrap_or_default(),
        Err(_) => {
            let blocktext = format!("{}\n{}", overline, title);
            if overline.trim_end().len() < 4 {
                return short_overline(machine, context, memo, &blocktext, lineno, 2);
            }
            let msg = message(
                memo,
                Severity::Severe,
                "Incomplete section title.",
                Some(lineno),
                Some(blocktext),
            );
            let parent = machine.node;
            memo.document.append(parent, msg);
            context.clear();
            return Ok(StateKind::Body);
        }
    };
    let source = format!("{}\n{}\n{}", overline, title, underline);
    let overline = overline.trim_end().to_string();
    let underline = underline.trim_end().to_string();
    if !is_uniform_marker(&underline) {
        let blocktext = format!("{}\n{}\n{}", overline, title, underline);
        if overline.len() < 4 {
            return short_overline(machine, context, memo, &blocktext, lineno, 2);
        }
        let msg = message(
            memo,
            Severity::Severe,
            "Missing matching underline for section title overline.",
            Some(lineno),
            Some(blocktext),
        );
        let parent = machine.node;
        memo.document.append(parent, msg);
        context.clear();
        return Ok(StateKind::Body);
    }
    if overline != underline {
        let blocktext = format!("{}\n{}\n{}", overline, title, underline);
        if overline.len() < 4 {
            return short_overline(machine, context, memo, &blocktext, lineno, 2);
        }
        let msg = message(
            memo,
            Severity::Severe,
            "Title overline & underline mismatch.",
            Some(lineno),
            Some(blocktext),
        );
        let parent = machine.node;
        memo.document.append(parent, msg);
        context.clear();
        return Ok(StateKind::Body);
    }
    let title = title.trim_end().to_string();
    let mut messages = Vec::new();
    if column_width(&title) > overline.len() {
        let blocktext = format!("{}\n{}\n{}", overline, title, underline);
        if overline.len() < 4 {
            return short_overline(machine, context, memo, &blocktext, lineno, 2);
        }
        let msg = message(
            memo,
            Severity::Warning,
            "Title overline too short.",
            Some(lineno),
            Some(blocktext),
        );
        messages.push(msg);
    }
    let style = TitleStyle {
        over: overline.chars().next(),
        under: underline.chars().next().expect("uniform marker"),
    };
    machine.data.eofcheck = false;
    text::section(
        machine,
        memo,
        title.trim_start(),
        &source,
        style,
        lineno + 1,
        messages,
    )?;
    machine.data.eofcheck = true;
    context.clear();
    Ok(StateKind::Body)
}

/// A second marker line right away: invalid.
pub fn underline(
    machine: &mut StateMachine,
    line: &str,
    context: &mut Context,
    memo: &mut Memo,
) -> TxResult {
    let overline = context.first().cloned().unwrap_or_default();
    let blocktext = format!("{}\n{}", overline, line);
    let lineno = machine.abs_line_number().saturating_sub(1);
    if overline.trim_end().len() < 4 {
        return short_overline(machine, context, memo, &blocktext, lineno, 1);
    }
    let msg = message(
        memo,
        Severity::Error,
        "Invalid section title or transition marker.",
        Some(lineno),
        Some(blocktext),
    );
    let parent = machine.node;
    memo.document.append(parent, msg);
    context.clear();
    Ok(StateKind::Body)
}

fn is_uniform_marker(line: &str) -> bool {
    let mut chars = line.chars();
    match chars.next() {
        Some(first) if first.is_ascii_punctuation() => chars.all(|c| c == first),
        _ => false,
    }
}

fn short_overline(
    machine: &mut StateMachine,
    context: &mut Context,
    memo: &mut Memo,
    blocktext: &str,
    lineno: usize,
    lines: isize,
) -> TxResult {
    let msg = message(
        memo,
        Severity::Info,
        "Possible incomplete section title.\n\
         Treating the overline as ordinary text because it's so short.",
        Some(lineno),
        Some(blocktext.to_string()),
    );
    let parent = machine.node;
    memo.document.append(parent, msg);
    Err(state_correction(machine, context, lines))
}

/// Back up and re-read the marker as ordinary text.
fn state_correction(
    machine: &mut StateMachine,
    context: &mut Context,
    lines: isize,
) -> Signal {
    machine.previous_line(lines);
    context.clear();
    Signal::StateCorrection(StateKind::Body, Some("text"))
}
