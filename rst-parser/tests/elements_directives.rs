//! Directive runtime coverage: argument parsing, option validation,
//! content handling, and registry dispatch.

use std::rc::Rc;

use rst_parser::rst::ast::NodeKind;
use rst_parser::rst::directives::{
    options, DirectiveContext, DirectiveError, DirectiveRegistry, DirectiveSpec,
};
use rst_parser::rst::testing::{assert_doc, parse_fixture};
use rst_parser::{parse, NodeId, ParserOptions};

fn echo_directive(ctx: &mut DirectiveContext<'_>) -> Result<Vec<NodeId>, DirectiveError> {
    let node = ctx
        .memo
        .document
        .new_node(NodeKind::Directive, &ctx.block_text);
    ctx.memo.document.set_attr(
        node,
        "name",
        rst_parser::AttrValue::Str(ctx.name.clone()),
    );
    ctx.memo.document.set_attr(
        node,
        "args",
        rst_parser::AttrValue::StrList(ctx.arguments.clone()),
    );
    Ok(vec![node])
}

fn registry_with(name: &str, spec: DirectiveSpec) -> Rc<DirectiveRegistry> {
    let mut builder = DirectiveRegistry::builder();
    builder.directive("std", name, spec);
    Rc::new(builder.build())
}

fn options_with(name: &str, spec: DirectiveSpec) -> ParserOptions {
    ParserOptions::new().with_registry(registry_with(name, spec))
}

fn custom_spec(required: usize, optional: usize, final_ws: bool) -> DirectiveSpec {
    DirectiveSpec {
        required_args: required,
        optional_args: optional,
        final_arg_whitespace: final_ws,
        has_content: false,
        option_spec: Vec::new(),
        run: echo_directive,
    }
}

#[test]
fn test_missing_required_argument() {
    let opts = options_with("custom", custom_spec(1, 0, false));
    let doc = parse("test.rst", ".. custom::\n", &opts).unwrap();
    assert_doc(&doc).child(0, |msg| {
        msg.is_kind("system_message")
            .text_contains("Error in \"custom\" directive:")
            .text_contains("1 argument(s) required, 0 supplied");
    });
}

#[test]
fn test_too_many_arguments() {
    let opts = options_with("custom", custom_spec(1, 0, false));
    let doc = parse("test.rst", ".. custom:: a b\n", &opts).unwrap();
    assert_doc(&doc).child(0, |msg| {
        msg.is_kind("system_message")
            .text_contains("maximum 1 argument(s) allowed, 2 supplied");
    });
}

#[test]
fn test_final_argument_whitespace_joins() {
    let opts = options_with("custom", custom_spec(1, 0, true));
    let doc = parse("test.rst", ".. custom:: several words here\n", &opts).unwrap();
    assert_doc(&doc).child(0, |directive| {
        directive.is_kind("directive").attr(
            "args",
            &rst_parser::AttrValue::StrList(vec!["several words here".to_string()]),
        );
    });
}

#[test]
fn test_unknown_option_reported() {
    let doc = parse_fixture(".. code-block:: python\n   :nosuch: value\n\n   body\n");
    assert_doc(&doc).child(0, |msg| {
        msg.is_kind("system_message")
            .text_contains("Error in \"code-block\" directive:")
            .text_contains("unknown option: \"nosuch\"");
    });
}

#[test]
fn test_duplicate_option_reported() {
    let doc = parse_fixture(".. code-block:: python\n   :linenos:\n   :linenos:\n\n   body\n");
    assert_doc(&doc).child(0, |msg| {
        msg.is_kind("system_message")
            .text_contains("duplicate option \"linenos\"");
    });
}

#[test]
fn test_invalid_option_value_reported() {
    let doc = parse_fixture(".. code-block:: python\n   :emphasize-lines: 5-2\n\n   body\n");
    assert_doc(&doc).child(0, |msg| {
        msg.is_kind("system_message")
            .text_contains("invalid option value")
            .text_contains("emphasize-lines");
    });
}

#[test]
fn test_content_rejected_without_has_content() {
    let opts = options_with("custom", custom_spec(0, 1, false));
    let doc = parse("test.rst", ".. custom:: arg\n\n   stray content\n", &opts).unwrap();
    assert_doc(&doc).child(0, |msg| {
        msg.is_kind("system_message").text_contains("no content permitted");
    });
}

#[test]
fn test_directive_error_becomes_system_message() {
    fn failing(_: &mut DirectiveContext<'_>) -> Result<Vec<NodeId>, DirectiveError> {
        Err(DirectiveError::error("the handler declined"))
    }
    let spec = DirectiveSpec {
        required_args: 0,
        optional_args: 0,
        final_arg_whitespace: false,
        has_content: true,
        option_spec: Vec::new(),
        run: failing,
    };
    let opts = options_with("failing", spec);
    let doc = parse("test.rst", ".. failing::\n\n   content\n", &opts).unwrap();
    assert_doc(&doc).child(0, |msg| {
        msg.is_kind("system_message")
            .text_contains("the handler declined")
            // The literal-block copy of the directive source rides along.
            .find_child("literal_block", |literal| {
                literal.text_contains(".. failing::");
            });
    });
}

#[test]
fn test_admonition_parses_content() {
    let doc = parse_fixture(".. note::\n\n   Some *emphasized* content.\n");
    assert_doc(&doc).child(0, |directive| {
        directive
            .is_kind("directive")
            .attr_str("name", "note")
            .find_child("paragraph", |para| {
                para.text("Some emphasized content.").find_child("emphasis", |em| {
                    em.text("emphasized");
                });
            });
    });
}

#[test]
fn test_image_directive() {
    let doc = parse_fixture(".. image:: pictures/example.png\n   :alt: An example\n");
    assert_doc(&doc).child(0, |directive| {
        directive
            .is_kind("directive")
            .attr_str("name", "image")
            .attr_str("alt", "An example")
            .child(0, |arg| {
                arg.is_kind("directive_argument").text("pictures/example.png");
            });
    });
}

#[test]
fn test_domain_qualified_directive() {
    let doc = parse_fixture(".. std:note::\n\n   body\n");
    assert_doc(&doc).child(0, |directive| {
        directive.is_kind("directive").attr_str("name", "std:note");
    });
}

#[test]
fn test_default_domain_resolution() {
    // A directive registered under a project domain resolves unqualified
    // when the registry declares that domain as the default.
    let mut builder = DirectiveRegistry::builder();
    builder.default_domain("landing");
    builder.directive(
        "landing",
        "intro",
        DirectiveSpec {
            required_args: 0,
            optional_args: 0,
            final_arg_whitespace: false,
            has_content: true,
            option_spec: vec![("depth", options::nonnegative_int)],
            run: echo_directive,
        },
    );
    let opts = ParserOptions::new().with_registry(Rc::new(builder.build()));
    let doc = parse("test.rst", ".. intro::\n\n   x\n", &opts).unwrap();
    assert_doc(&doc).child(0, |directive| {
        directive.is_kind("directive").attr_str("name", "intro");
    });
}

#[test]
fn test_code_block_caption_and_lineno_start() {
    let doc = parse_fixture(
        ".. code-block:: sh\n   :caption: Run it\n   :lineno-start: 10\n\n   ls -la\n",
    );
    assert_doc(&doc).child(0, |code| {
        code.is_kind("code")
            .attr_str("lang", "sh")
            .attr_str("caption", "Run it")
            .attr_int("lineno_start", 10)
            .text("ls -la");
    });
}
