//! The directive runtime.
//!
//! Parses a matched directive's header into arguments, options, and a
//! content block, validates the options against the directive's spec, and
//! invokes the handler. Option blocks are parsed as a field list with the
//! dedicated extension-options state: single-word names, empty or
//! one-paragraph bodies, no duplicates, no unknowns.

use std::collections::BTreeMap;

use regex::Captures;

use crate::rst::ast::{AttrValue, NodeId, NodeKind};
use crate::rst::diagnostics::{system_message, MessageArgs, Severity};
use crate::rst::directives::registry::{DirectiveContext, DirectiveSpec};
use crate::rst::lines::LineStore;
use crate::rst::parsing::machine::{Memo, StateData, StateMachine};
use crate::rst::parsing::patterns;
use crate::rst::parsing::states::explicit::ConstructError;
use crate::rst::parsing::states::StateKind;

type ConstructResult = Result<(Vec<NodeId>, bool), ConstructError>;

/// Drive one directive: header parsing, option validation, handler call.
pub(crate) fn run_directive(
    machine: &mut StateMachine,
    memo: &mut Memo,
    spec: &DirectiveSpec,
    type_name: &str,
    caps: &Captures<'_>,
    _line: &str,
    substitution_name: Option<String>,
) -> ConstructResult {
    let lineno = machine.abs_line_number();
    let initial_line_offset = machine.line_offset().max(0) as usize;
    let (indented, _indent, line_offset, blank_finish) = machine.get_first_known_indented(
        caps.get(0).expect("match").end(),
        false,
        true,
        false,
    );
    let block_end = (machine.line_offset() + 1).max(0) as usize;
    let block_text = machine
        .input()
        .slice(initial_line_offset, block_end)
        .join("\n");
    let parsed = parse_directive_block(
        machine,
        memo,
        indented,
        line_offset,
        spec,
        substitution_name,
    );
    let (arguments, options, content, content_offset) = match parsed {
        Ok(parsed) => parsed,
        Err(BlockError::Markup(detail)) => {
            let error = system_message(
                &mut memo.document,
                &mut memo.reporter,
                Severity::Error,
                &format!("Error in \"{}\" directive:\n{}.", type_name, detail),
                MessageArgs {
                    line: Some(lineno),
                    literal: Some(block_text),
                    ..Default::default()
                },
            );
            return Ok((vec![error], blank_finish));
        }
        Err(BlockError::Construct(error)) => return Err(error),
    };
    let mut ctx = DirectiveContext {
        name: type_name.to_string(),
        arguments,
        options,
        content,
        lineno,
        content_offset,
        block_text: block_text.clone(),
        machine: &mut *machine,
        memo: &mut *memo,
    };
    let result = (spec.run)(&mut ctx);
    drop(ctx);
    let nodes = match result {
        Ok(nodes) => nodes,
        Err(error) => {
            let msg = system_message(
                &mut memo.document,
                &mut memo.reporter,
                error.level,
                &error.message,
                MessageArgs {
                    line: Some(lineno),
                    literal: Some(block_text),
                    ..Default::default()
                },
            );
            vec![msg]
        }
    };
    let blank_finish = blank_finish || machine.is_next_line_blank();
    Ok((nodes, blank_finish))
}

enum BlockError {
    Markup(String),
    Construct(ConstructError),
}

type ParsedBlock = (
    Vec<String>,
    BTreeMap<String, AttrValue>,
    LineStore,
    usize,
);

fn parse_directive_block(
    machine: &mut StateMachine,
    memo: &mut Memo,
    indented: LineStore,
    mut line_offset: usize,
    spec: &DirectiveSpec,
    substitution_name: Option<String>,
) -> Result<ParsedBlock, BlockError> {
    indented.disconnect();
    if !indented.is_empty() && indented.is_blank(0) {
        let _ = indented.trim_start(1);
        line_offset += 1;
    }
    while !indented.is_empty() && indented.is_blank(indented.len() - 1) {
        let _ = indented.trim_end(1);
    }
    let takes_args =
        spec.required_args > 0 || spec.optional_args > 0 || !spec.option_spec.is_empty();
    let (mut arg_block, mut content, mut content_offset);
    let mut first_blank = indented.len();
    if !indented.is_empty() && takes_args {
        for i in 0..indented.len() {
            if indented.is_blank(i) {
                first_blank = i;
                break;
            }
        }
        arg_block = indented.slice(0, first_blank);
        arg_block.disconnect();
        content = indented.slice((first_blank + 1).min(indented.len()), indented.len());
        content.disconnect();
        content_offset = line_offset + first_blank + 1;
    } else {
        arg_block = LineStore::empty();
        content = indented.clone();
        content_offset = line_offset;
    }
    let mut options = BTreeMap::new();
    if let Some(name) = substitution_name {
        options.insert("alt".to_string(), AttrValue::Str(name));
    }
    if !spec.option_spec.is_empty() {
        arg_block = parse_directive_options(machine, memo, spec, arg_block, &mut options)?;
    }
    if !arg_block.is_empty() && spec.required_args == 0 && spec.optional_args == 0 {
        // No arguments possible: the "argument block" was content.
        content = indented.slice(0, indented.len());
        content.disconnect();
        let _ = first_blank;
        content_offset = line_offset;
        arg_block = LineStore::empty();
    }
    while !content.is_empty() && content.is_blank(0) {
        let _ = content.trim_start(1);
        content_offset += 1;
    }
    let arguments = if spec.required_args > 0 || spec.optional_args > 0 {
        parse_directive_arguments(spec, &arg_block)?
    } else {
        Vec::new()
    };
    if !content.is_empty() && !spec.has_content {
        return Err(BlockError::Markup("no content permitted".to_string()));
    }
    Ok((arguments, options, content, content_offset))
}

/// Peel field-marker lines off the end of the argument block and parse
/// them as extension options.
fn parse_directive_options(
    machine: &mut StateMachine,
    memo: &mut Memo,
    spec: &DirectiveSpec,
    arg_block: LineStore,
    options: &mut BTreeMap<String, AttrValue>,
) -> Result<LineStore, BlockError> {
    let mut split_at = arg_block.len();
    for i in 0..arg_block.len() {
        let line = arg_block.text(i).unwrap_or_default();
        if patterns::FIELD_MARKER.is_match(&line) {
            split_at = i;
            break;
        }
    }
    if split_at == arg_block.len() {
        return Ok(arg_block);
    }
    let opt_block = arg_block.slice(split_at, arg_block.len());
    opt_block.disconnect();
    let remaining = arg_block.slice(0, split_at);
    remaining.disconnect();
    let data = parse_extension_options(machine, memo, spec, opt_block)
        .map_err(BlockError::Markup)?;
    options.extend(data);
    Ok(remaining)
}

fn parse_extension_options(
    machine: &mut StateMachine,
    memo: &mut Memo,
    spec: &DirectiveSpec,
    datalines: LineStore,
) -> Result<BTreeMap<String, AttrValue>, String> {
    let total = datalines.len();
    let field_list = memo.document.new_node(NodeKind::FieldList, "");
    let (new_offset, blank_finish) = machine
        .nested_list_parse(
            datalines,
            0,
            field_list,
            StateKind::ExtensionOptions,
            true,
            false,
            StateData::default(),
            memo,
        )
        .map_err(|error| format!("invalid option block ({})", error))?;
    if new_offset != total {
        return Err("invalid option block".to_string());
    }
    if !blank_finish {
        return Err("option data incompletely parsed".to_string());
    }
    let mut parsed: BTreeMap<String, AttrValue> = BTreeMap::new();
    for field in memo.document.children(field_list) {
        let children = memo.document.children(field);
        let name_node = children.first().copied();
        let body_node = children.get(1).copied();
        let raw_name = name_node
            .map(|node| memo.document.text_of(node))
            .unwrap_or_default();
        if raw_name.split_whitespace().count() != 1 {
            return Err(
                "extension option field name may not contain multiple words".to_string()
            );
        }
        let name = raw_name.trim().to_lowercase();
        let value = match body_node {
            None => None,
            Some(body) => {
                let paragraphs = memo.document.children(body);
                match paragraphs.len() {
                    0 => None,
                    1 => Some(memo.document.text_of(paragraphs[0])),
                    _ => {
                        return Err(format!(
                            "extension option field body may contain\n\
                             a single paragraph only (option \"{}\")",
                            name
                        ))
                    }
                }
            }
        };
        let validator = spec
            .validator_for(&name)
            .ok_or_else(|| format!("unknown option: \"{}\"", name))?;
        if parsed.contains_key(&name) {
            return Err(format!("duplicate option \"{}\"", name));
        }
        let converted = validator(value.as_deref()).map_err(|error| {
            format!(
                "invalid option value: (option: \"{}\"; value: {:?})\n{}",
                name,
                value.clone().unwrap_or_default(),
                error
            )
        })?;
        parsed.insert(name, converted);
    }
    Ok(parsed)
}

fn parse_directive_arguments(
    spec: &DirectiveSpec,
    arg_block: &LineStore,
) -> Result<Vec<String>, BlockError> {
    let arg_text = arg_block.join("\n");
    let mut arguments: Vec<String> = arg_text.split_whitespace().map(str::to_string).collect();
    if arguments.len() < spec.required_args {
        return Err(BlockError::Markup(format!(
            "{} argument(s) required, {} supplied",
            spec.required_args,
            arguments.len()
        )));
    }
    let maximum = spec.required_args + spec.optional_args;
    if arguments.len() > maximum {
        if spec.final_arg_whitespace {
            arguments = split_limit(&arg_text, maximum);
        } else {
            return Err(BlockError::Markup(format!(
                "maximum {} argument(s) allowed, {} supplied",
                maximum,
                arguments.len()
            )));
        }
    }
    Ok(arguments)
}

/// Whitespace split into at most `limit` tokens; the final token keeps its
/// internal whitespace.
fn split_limit(text: &str, limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = text.trim_start();
    while out.len() + 1 < limit {
        match rest.find(char::is_whitespace) {
            Some(pos) => {
                out.push(rest[..pos].to_string());
                rest = rest[pos..].trim_start();
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        out.push(rest.trim_end().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_limit() {
        assert_eq!(
            split_limit("one two three four", 2),
            vec!["one", "two three four"]
        );
        assert_eq!(split_limit("single", 2), vec!["single"]);
    }
}
