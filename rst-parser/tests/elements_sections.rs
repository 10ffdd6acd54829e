//! Sections, transitions, block quotes, literal and doctest blocks.

use rst_parser::rst::testing::{assert_doc, parse_fixture};
use rst_parser::Severity;

#[test]
fn test_underlined_title() {
    let doc = parse_fixture("Title\n=====\n\nBody text.\n");
    assert_doc(&doc).child_count(1).child(0, |section| {
        section
            .is_kind("section")
            .has_name("title")
            .child(0, |title| {
                title.is_kind("title").text("Title");
            })
            .child(1, |para| {
                para.is_kind("paragraph").text("Body text.");
            });
    });
    assert_eq!(doc.id_to_element.len(), 1);
    assert!(doc.id_to_element.contains_key("title"));
}

#[test]
fn test_overlined_title() {
    let doc = parse_fixture("=====\nTitle\n=====\n\nBody.\n");
    assert_doc(&doc).child(0, |section| {
        section.is_kind("section").child(0, |title| {
            title.is_kind("title").text("Title");
        });
    });
}

#[test]
fn test_section_nesting_and_siblings() {
    let source = "\
One
===

in one

Two
---

in two

Three
=====

in three
";
    let doc = parse_fixture(source);
    assert_doc(&doc)
        .child_count(2)
        .child(0, |one| {
            one.is_kind("section")
                .has_name("one")
                .child(0, |t| {
                    t.is_kind("title").text("One");
                })
                .child(1, |p| {
                    p.is_kind("paragraph").text("in one");
                })
                .child(2, |two| {
                    two.is_kind("section").has_name("two").child(0, |t| {
                        t.is_kind("title").text("Two");
                    });
                });
        })
        .child(1, |three| {
            three.is_kind("section").has_name("three");
        });
}

#[test]
fn test_title_underline_too_short_warns() {
    let doc = parse_fixture("A long title\n====\n\ntext\n");
    assert_doc(&doc).child(0, |section| {
        section.is_kind("section").child(0, |t| {
            t.is_kind("title").text("A long title");
        });
    });
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning
            && d.message.contains("Title underline too short")));
}

#[test]
fn test_very_short_underline_is_text() {
    let doc = parse_fixture("A long title\n==\n\n");
    assert_doc(&doc).find_child("paragraph", |para| {
        para.text_contains("A long title");
    });
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| d.message.contains("too short")));
}

#[test]
fn test_transition() {
    let doc = parse_fixture("before\n\n----\n\nafter\n");
    assert_doc(&doc)
        .child_count(3)
        .child(0, |p| {
            p.is_kind("paragraph").text("before");
        })
        .child(1, |t| {
            t.is_kind("transition");
        })
        .child(2, |p| {
            p.is_kind("paragraph").text("after");
        });
}

#[test]
fn test_transition_at_end_of_input() {
    let doc = parse_fixture("before\n\n----");
    assert_doc(&doc).child_count(2).child(1, |t| {
        t.is_kind("transition");
    });
}

#[test]
fn test_block_quote() {
    let doc = parse_fixture("context\n\n   quoted text\n");
    assert_doc(&doc)
        .child(0, |p| {
            p.is_kind("paragraph").text("context");
        })
        .child(1, |quote| {
            quote.is_kind("block_quote").child(0, |p| {
                p.is_kind("paragraph").text("quoted text");
            });
        });
}

#[test]
fn test_block_quote_attribution() {
    let doc = parse_fixture("context\n\n   quoted text\n\n   -- Someone\n");
    assert_doc(&doc).child(1, |quote| {
        quote
            .is_kind("block_quote")
            .child(0, |p| {
                p.is_kind("paragraph").text("quoted text");
            })
            .child(1, |attribution| {
                attribution.is_kind("attribution").text("Someone");
            });
    });
}

#[test]
fn test_literal_block_after_double_colon() {
    let doc = parse_fixture("Paragraph::\n\n   literal line\n     indented more\n\nafter\n");
    assert_doc(&doc)
        .child(0, |p| {
            p.is_kind("paragraph").text("Paragraph:");
        })
        .child(1, |literal| {
            literal
                .is_kind("literal_block")
                .text("literal line\n  indented more");
        })
        .child(2, |p| {
            p.is_kind("paragraph").text("after");
        });
}

#[test]
fn test_bare_double_colon_vanishes() {
    let doc = parse_fixture("::\n\n   literal\n");
    assert_doc(&doc).child_count(1).child(0, |literal| {
        literal.is_kind("literal_block").text("literal");
    });
}

#[test]
fn test_expanded_double_colon_keeps_text() {
    let doc = parse_fixture("Paragraph ::\n\n   literal\n");
    assert_doc(&doc)
        .child(0, |p| {
            p.is_kind("paragraph").text("Paragraph");
        })
        .child(1, |literal| {
            literal.is_kind("literal_block").text("literal");
        });
}

#[test]
fn test_quoted_literal_block() {
    let doc = parse_fixture("Paragraph::\n\n> quoted\n> lines\n\nafter\n");
    assert_doc(&doc)
        .child(0, |p| {
            p.is_kind("paragraph").text("Paragraph:");
        })
        .child(1, |literal| {
            literal.is_kind("literal_block").text("> quoted\n> lines");
        })
        .child(2, |p| {
            p.is_kind("paragraph").text("after");
        });
}

#[test]
fn test_doctest_block() {
    let doc = parse_fixture(">>> print(1)\n1\n\n");
    assert_doc(&doc).child_count(1).child(0, |doctest| {
        doctest.is_kind("doctest_block").text(">>> print(1)\n1");
    });
}

#[test]
fn test_unexpected_indentation_in_paragraph() {
    let doc = parse_fixture("top line\ncontinuation\n   suddenly indented\n");
    assert_doc(&doc)
        .child(0, |p| {
            p.is_kind("paragraph").text("top line\ncontinuation");
        })
        .child(1, |msg| {
            msg.is_kind("system_message").text_contains("Unexpected indentation.");
        })
        .child(2, |quote| {
            quote.is_kind("block_quote").text_contains("suddenly indented");
        });
}

#[test]
fn test_one_liner_with_indent_is_definition_list() {
    let doc = parse_fixture("top line\n   indented right after\n");
    assert_doc(&doc).child(0, |list| {
        list.is_kind("definition_list").child(0, |item| {
            item.child(0, |term| {
                term.is_kind("term").text("top line");
            });
        });
    });
}
