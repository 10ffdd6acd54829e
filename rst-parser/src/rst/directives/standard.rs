//! The standard directive set.
//!
//! `code-block` (and its `code` alias) produce `Code` nodes; `unicode` and
//! `replace` feed substitution definitions; `image` and the admonition
//! family produce generic `Directive` nodes whose content is parsed by a
//! nested machine.

use crate::rst::ast::{AttrValue, NodeId, NodeKind};
use crate::rst::directives::options;
use crate::rst::directives::registry::{
    DirectiveContext, DirectiveError, DirectiveSpec, RegistryBuilder,
};
use crate::rst::util::unicode::parse_code_point;

fn spec(
    required_args: usize,
    optional_args: usize,
    final_arg_whitespace: bool,
    has_content: bool,
    option_spec: Vec<(&'static str, crate::rst::directives::OptionValidator)>,
    run: crate::rst::directives::DirectiveFn,
) -> DirectiveSpec {
    DirectiveSpec {
        required_args,
        optional_args,
        final_arg_whitespace,
        has_content,
        option_spec,
        run,
    }
}

pub fn register(builder: &mut RegistryBuilder) {
    let code_block = spec(
        0,
        1,
        false,
        true,
        vec![
            ("linenos", options::flag),
            ("emphasize-lines", options::line_ranges),
            ("caption", options::unchanged_required),
            ("copyable", options::flag),
            ("lineno-start", options::nonnegative_int),
        ],
        code_block,
    );
    builder.directive("std", "code-block", code_block.clone());
    builder.directive("std", "code", code_block);
    builder.directive(
        "std",
        "unicode",
        spec(
            1,
            0,
            true,
            false,
            vec![
                ("ltrim", options::flag),
                ("rtrim", options::flag),
                ("trim", options::flag),
            ],
            unicode,
        ),
    );
    builder.directive("std", "replace", spec(0, 0, false, true, Vec::new(), replace));
    builder.directive(
        "std",
        "image",
        spec(
            1,
            0,
            false,
            false,
            vec![
                ("alt", options::unchanged),
                ("width", options::unchanged),
                ("height", options::unchanged),
                ("scale", options::nonnegative_int),
            ],
            generic_directive,
        ),
    );
    for name in ["note", "warning", "tip", "important"] {
        builder.directive(
            "std",
            name,
            spec(0, 0, false, true, Vec::new(), generic_directive),
        );
    }
}

/// `code-block`: a literal `Code` node with highlighting attributes.
fn code_block(ctx: &mut DirectiveContext<'_>) -> Result<Vec<NodeId>, DirectiveError> {
    let value = ctx.content.join("\n");
    let node = ctx
        .memo
        .document
        .new_node(NodeKind::Code, &ctx.block_text);
    if let Some(language) = ctx.arguments.first() {
        ctx.memo
            .document
            .set_attr(node, "lang", AttrValue::Str(language.clone()));
    }
    if ctx.options.contains_key("linenos") {
        ctx.memo
            .document
            .set_attr(node, "linenos", AttrValue::Bool(true));
    }
    if let Some(ranges) = ctx.options.get("emphasize-lines").cloned() {
        ctx.memo
            .document
            .set_attr(node, "emphasize_lines", ranges);
    }
    if let Some(caption) = ctx.options.get("caption").cloned() {
        ctx.memo.document.set_attr(node, "caption", caption);
    }
    if ctx.options.contains_key("copyable") {
        ctx.memo
            .document
            .set_attr(node, "copyable", AttrValue::Bool(true));
    }
    if let Some(start) = ctx.options.get("lineno-start").cloned() {
        ctx.memo.document.set_attr(node, "lineno_start", start);
    }
    let text = ctx.memo.document.new_text(&value);
    ctx.memo.document.append(node, text);
    Ok(vec![node])
}

/// `unicode`: convert code points into substitution text. Tokens after a
/// `..` are a comment.
fn unicode(ctx: &mut DirectiveContext<'_>) -> Result<Vec<NodeId>, DirectiveError> {
    let argument = ctx.arguments.first().cloned().unwrap_or_default();
    let codes = argument
        .split(".. ")
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    let mut nodes = Vec::new();
    for code in codes.split_whitespace() {
        if code == ".." {
            break;
        }
        let decoded = parse_code_point(code).map_err(|error| {
            DirectiveError::error(format!("Invalid character code: {}\n{}", code, error))
        })?;
        let text = ctx.memo.document.new_text(&decoded.to_string());
        nodes.push(text);
    }
    // Trim options mark the enclosing substitution definition.
    let host = ctx.machine.node;
    if ctx.options.contains_key("ltrim") || ctx.options.contains_key("trim") {
        ctx.memo.document.set_attr(host, "ltrim", AttrValue::Bool(true));
    }
    if ctx.options.contains_key("rtrim") || ctx.options.contains_key("trim") {
        ctx.memo.document.set_attr(host, "rtrim", AttrValue::Bool(true));
    }
    Ok(nodes)
}

/// `replace`: the content is a single paragraph whose inline children
/// become the substitution text.
fn replace(ctx: &mut DirectiveContext<'_>) -> Result<Vec<NodeId>, DirectiveError> {
    if ctx.content.is_empty() {
        return Err(DirectiveError::error(
            "The \"replace\" directive is empty; content required.",
        ));
    }
    let holder = ctx.memo.document.new_node(NodeKind::Paragraph, "");
    ctx.nested_parse(holder)
        .map_err(|error| DirectiveError::severe(error.to_string()))?;
    let children = ctx.memo.document.children(holder);
    match children[..] {
        [paragraph]
            if ctx.memo.document.node(paragraph).kind == NodeKind::Paragraph =>
        {
            Ok(ctx.memo.document.take_children(paragraph))
        }
        _ => Err(DirectiveError::error(
            "Error in \"replace\" directive: may contain a single paragraph only.",
        )),
    }
}

/// Fallback shape shared by `image` and the admonitions: a `Directive`
/// node carrying the name, any argument, the options, and parsed content.
fn generic_directive(ctx: &mut DirectiveContext<'_>) -> Result<Vec<NodeId>, DirectiveError> {
    let node = ctx
        .memo
        .document
        .new_node(NodeKind::Directive, &ctx.block_text);
    ctx.memo
        .document
        .set_attr(node, "name", AttrValue::Str(ctx.name.clone()));
    for (key, value) in &ctx.options {
        ctx.memo.document.set_attr(node, key, value.clone());
    }
    if let Some(argument) = ctx.arguments.first().cloned() {
        let arg_node = ctx
            .memo
            .document
            .new_node(NodeKind::DirectiveArgument, &argument);
        let text = ctx.memo.document.new_text(&argument);
        ctx.memo.document.append(arg_node, text);
        ctx.memo.document.append(node, arg_node);
    }
    if !ctx.content.is_empty() {
        ctx.nested_parse(node)
            .map_err(|error| DirectiveError::severe(error.to_string()))?;
    }
    Ok(vec![node])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rst::directives::DirectiveRegistry;

    #[test]
    fn test_standard_set_registered() {
        let registry = DirectiveRegistry::standard();
        for name in ["code-block", "code", "unicode", "replace", "image", "note"] {
            assert!(
                registry.lookup_directive(name).is_some(),
                "missing {}",
                name
            );
        }
        assert!(registry.lookup_role("ref").is_some());
        assert!(registry.lookup_role("").is_some());
    }
}
