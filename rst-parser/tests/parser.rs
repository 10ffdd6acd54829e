//! End-to-end parser scenarios.

use rst_parser::rst::ast::{AstSnapshot, AttrValue};
use rst_parser::rst::testing::{assert_doc, parse_fixture};
use rst_parser::rst::util::unicode::{column_width, parse_code_point};
use rst_parser::{parse, ParserOptions, Severity};

#[test]
fn test_landing_page_document() {
    let source = "\
:template: product-landing
:hidefeedback: header
:noprevnext:

================
What is MongoDB?
================

.. |arrow| unicode:: U+27A4

This is a test. |arrow| Use the **Select your language** drop-down menu in the list.

* - Introduction

      An introduction to things.
    - Developers
    - Administrators
    - Reference
";
    let doc = parse_fixture(source);
    assert_doc(&doc)
        .child_count(2)
        .child(0, |field_list| {
            field_list.is_kind("field_list").child_count(3);
            field_list.child(0, |field| {
                field
                    .child(0, |name| {
                        name.is_kind("field_name").text("template");
                    })
                    .child(1, |body| {
                        body.is_kind("field_body").text_contains("product-landing");
                    });
            });
            field_list.child(1, |field| {
                field.child(0, |name| {
                    name.text("hidefeedback");
                });
            });
            field_list.child(2, |field| {
                field.child(0, |name| {
                    name.text("noprevnext");
                });
            });
        })
        .child(1, |section| {
            section
                .is_kind("section")
                .has_name("what is mongodb?")
                .child(0, |title| {
                    title.is_kind("title").text("What is MongoDB?");
                })
                .find_child("substitution_definition", |subst| {
                    subst.has_name("arrow").text("\u{27A4}");
                })
                .find_child("paragraph", |para| {
                    para.child_count(5)
                        .child(0, |t| {
                            t.is_kind("text").text("This is a test. ");
                        })
                        .child(1, |subref| {
                            subref
                                .is_kind("substitution_reference")
                                .attr_str("refname", "arrow")
                                .text("arrow");
                        })
                        .child(2, |t| {
                            t.is_kind("text").text(" Use the ");
                        })
                        .child(3, |strong| {
                            strong.is_kind("strong").text("Select your language");
                        })
                        .child(4, |t| {
                            t.is_kind("text").text(" drop-down menu in the list.");
                        });
                })
                .find_child("bullet_list", |outer| {
                    outer.attr_str("bullet", "*").child_count(1).child(0, |item| {
                        item.is_kind("list_item").child(0, |inner| {
                            inner
                                .is_kind("bullet_list")
                                .attr_str("bullet", "-")
                                .child_count(4)
                                .child(0, |li| {
                                    li.child(0, |p| {
                                        p.is_kind("paragraph").text("Introduction");
                                    })
                                    .child(1, |p| {
                                        p.is_kind("paragraph")
                                            .text("An introduction to things.");
                                    });
                                })
                                .child(1, |li| {
                                    li.text_contains("Developers");
                                })
                                .child(2, |li| {
                                    li.text_contains("Administrators");
                                })
                                .child(3, |li| {
                                    li.text_contains("Reference");
                                });
                        });
                    });
                });
        });
    assert_eq!(
        doc.name_ids.get("what is mongodb?"),
        Some(&Some("what-is-mongodb".to_string()))
    );
}

#[test]
fn test_column_width_combining_marks() {
    assert_eq!(column_width("A t\u{306}ab\u{306}le\u{306}"), 7);
}

#[test]
fn test_unicode_code_conversion() {
    assert_eq!(parse_code_point("U+27A4").unwrap(), '\u{27A4}');
    assert_eq!(parse_code_point("0x2192").unwrap(), '\u{2192}');
    assert_eq!(parse_code_point("129448").unwrap(), '\u{1F9A8}');
    assert_eq!(parse_code_point("&#x262E;").unwrap(), '\u{262E}');
    assert!(parse_code_point("U+FFFFFFFFFFFFFFF").is_err());
    assert!(parse_code_point("99z").is_err());
    assert!(parse_code_point("").is_err());
}

#[test]
fn test_enumerated_list_start_not_one() {
    let doc = parse_fixture("3. first\n4. second\n");
    assert_doc(&doc)
        .child(0, |list| {
            list.is_kind("enumerated_list")
                .attr_str("enumtype", "arabic")
                .attr_str("prefix", "")
                .attr_str("suffix", ".")
                .attr_int("start", 3)
                .child_count(2)
                .child(0, |item| {
                    item.is_kind("list_item").text("first");
                })
                .child(1, |item| {
                    item.is_kind("list_item").text("second");
                });
        })
        .child(1, |msg| {
            msg.is_kind("system_message")
                .text_contains("Enumerated list start value not ordinal-1");
        });
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Info
            && d.message.contains("start value not ordinal-1")));
}

#[test]
fn test_code_block_directive_with_options() {
    let source = "\
.. code-block:: python
   :linenos:
   :emphasize-lines: 1-2

   print(1)
   print(2)
";
    let doc = parse_fixture(source);
    assert_doc(&doc).child_count(1).child(0, |code| {
        code.is_kind("code")
            .attr_str("lang", "python")
            .attr_flag("linenos")
            .attr("emphasize_lines", &AttrValue::IntPairs(vec![(1, 2)]))
            .text("print(1)\nprint(2)");
    });
}

#[test]
fn test_unterminated_emphasis_stays_literal() {
    let doc = parse_fixture("this is *unfinished\n");
    assert_doc(&doc)
        .child_count(2)
        .child(0, |para| {
            para.is_kind("paragraph").text("this is *unfinished");
        })
        .child(1, |msg| {
            msg.is_kind("system_message")
                .text_contains("Inline emphasis start-string without end-string.");
        });
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning));
}

#[test]
fn test_determinism() {
    let source = "\
Title
=====

A paragraph with *emphasis* and a target_.

.. _target: https://example.com

1. one
2. two
";
    let first = parse_fixture(source);
    let second = parse_fixture(source);
    assert_eq!(
        AstSnapshot::from_document(&first),
        AstSnapshot::from_document(&second)
    );
}

#[test]
fn test_id_uniqueness_covers_tree() {
    let source = "\
Alpha
=====

.. _target-one: https://example.com/1

Beta
====

.. [1] footnote body
";
    let doc = parse_fixture(source);
    let mut stack = vec![doc.root()];
    while let Some(node) = stack.pop() {
        for id in &doc.node(node).ids {
            assert_eq!(
                doc.id_to_element.get(id),
                Some(&node),
                "id {:?} must map to its element",
                id
            );
        }
        stack.extend(doc.node(node).children.iter().copied());
    }
}

#[test]
fn test_report_level_filters_diagnostics() {
    let mut options = ParserOptions::new();
    options.report_level = 3;
    let doc = parse("test.rst", "3. first\n4. second\n", &options).unwrap();
    // The info diagnostic still lands in the tree but not in the list.
    assert!(doc.diagnostics.is_empty());
}

#[test]
fn test_halt_level_aborts() {
    let mut options = ParserOptions::new();
    options.halt_level = 2;
    let result = parse("test.rst", "this is *unfinished\n", &options);
    assert!(result.is_err());
}
