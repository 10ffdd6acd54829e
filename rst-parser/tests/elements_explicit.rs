//! Explicit markup: footnotes, citations, targets, substitution
//! definitions, comments, and duplicate-name behavior.

use rst_parser::rst::testing::{assert_doc, parse_fixture};
use rst_parser::Severity;

#[test]
fn test_numbered_footnote() {
    let doc = parse_fixture(".. [1] The footnote body.\n");
    assert_doc(&doc).child(0, |footnote| {
        footnote
            .is_kind("footnote")
            .has_name("1")
            .child(0, |label| {
                label.is_kind("label").text("1");
            })
            .child(1, |para| {
                para.is_kind("paragraph").text("The footnote body.");
            });
    });
    assert_eq!(doc.footnotes.len(), 1);
}

#[test]
fn test_auto_numbered_footnote() {
    let doc = parse_fixture(".. [#] body\n");
    assert_doc(&doc).child(0, |footnote| {
        footnote.is_kind("footnote").attr_str("auto", "1");
    });
    assert_eq!(doc.autofootnotes.len(), 1);
}

#[test]
fn test_named_auto_footnote() {
    let doc = parse_fixture(".. [#note] body\n");
    assert_doc(&doc).child(0, |footnote| {
        footnote.is_kind("footnote").attr_str("auto", "1").has_name("note");
    });
    assert_eq!(doc.autofootnotes.len(), 1);
    assert!(doc.name_ids.contains_key("note"));
}

#[test]
fn test_symbol_footnote() {
    let doc = parse_fixture(".. [*] body\n");
    assert_doc(&doc).child(0, |footnote| {
        footnote.is_kind("footnote").attr_str("auto", "*");
    });
    assert_eq!(doc.symbol_footnotes.len(), 1);
}

#[test]
fn test_citation() {
    let doc = parse_fixture(".. [CIT2002] A citation.\n");
    assert_doc(&doc).child(0, |citation| {
        citation
            .is_kind("citation")
            .has_name("cit2002")
            .child(0, |label| {
                label.is_kind("label").text("CIT2002");
            });
    });
    assert_eq!(doc.citations.len(), 1);
}

#[test]
fn test_external_target() {
    let doc = parse_fixture(".. _example: https://example.com/\n");
    assert_doc(&doc).child(0, |target| {
        target
            .is_kind("target")
            .has_name("example")
            .attr_str("refuri", "https://example.com/");
    });
    assert_eq!(
        doc.name_ids.get("example").and_then(|id| id.clone()),
        Some("example".to_string())
    );
    assert_eq!(doc.name_types.get("example"), Some(&true));
}

#[test]
fn test_target_uri_continuation_lines() {
    let doc = parse_fixture(".. _long: https://example.com/\n   path/page\n");
    assert_doc(&doc).child(0, |target| {
        target.attr_str("refuri", "https://example.com/path/page");
    });
}

#[test]
fn test_internal_target() {
    let doc = parse_fixture(".. _internal:\n\nA paragraph.\n");
    assert_doc(&doc).child(0, |target| {
        target.is_kind("target").has_name("internal").no_attr("refuri");
    });
}

#[test]
fn test_indirect_target() {
    let doc = parse_fixture(".. _two: one_\n");
    assert_doc(&doc).child(0, |target| {
        target.is_kind("target").has_name("two").attr_str("refname", "one");
    });
    assert_eq!(doc.indirect_targets.len(), 1);
}

#[test]
fn test_anonymous_targets() {
    let doc = parse_fixture("__ https://example.com/\n\n.. __: https://example.org/\n");
    assert_doc(&doc)
        .child(0, |target| {
            target.is_kind("target").attr_str("refuri", "https://example.com/");
        })
        .child(1, |target| {
            target.is_kind("target").attr_str("refuri", "https://example.org/");
        });
    assert_eq!(doc.anonymous_targets.len(), 2);
}

#[test]
fn test_quoted_target_name() {
    let doc = parse_fixture(".. _`a name: with colon`: https://example.com/\n");
    assert_doc(&doc).child(0, |target| {
        target.has_name("a name: with colon");
    });
}

#[test]
fn test_comment() {
    let doc = parse_fixture(".. just a comment\n   with a second line\n");
    assert_doc(&doc).child_count(1).child(0, |comment| {
        comment
            .is_kind("comment")
            .text("just a comment\nwith a second line");
    });
}

#[test]
fn test_empty_comment() {
    let doc = parse_fixture("..\n\ntext\n");
    assert_doc(&doc)
        .child(0, |comment| {
            comment.is_kind("comment").text("");
        })
        .child(1, |para| {
            para.is_kind("paragraph").text("text");
        });
}

#[test]
fn test_substitution_definition_replace() {
    let doc = parse_fixture(".. |product| replace:: the *product* name\n");
    assert_doc(&doc).child(0, |subst| {
        subst
            .is_kind("substitution_definition")
            .has_name("product")
            .text("the product name")
            .find_child("emphasis", |em| {
                em.text("product");
            });
    });
    assert!(doc.substitution_defs.contains_key("product"));
}

#[test]
fn test_substitution_definition_unicode() {
    let doc = parse_fixture(".. |copy| unicode:: 0xA9\n");
    assert_doc(&doc).child(0, |subst| {
        subst.is_kind("substitution_definition").has_name("copy").text("\u{a9}");
    });
}

#[test]
fn test_substitution_missing_contents() {
    let doc = parse_fixture(".. |empty|\n");
    assert_doc(&doc).child(0, |msg| {
        msg.is_kind("system_message")
            .text_contains("missing contents");
    });
}

#[test]
fn test_duplicate_substitution_definition() {
    let doc = parse_fixture(
        ".. |dup| replace:: one\n\n.. |dup| replace:: two\n",
    );
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error
            && d.message.contains("Duplicate substitution definition name")));
}

#[test]
fn test_duplicate_explicit_targets_invalidate() {
    let doc = parse_fixture(
        ".. _dup: https://example.com/a\n.. _dup: https://example.com/b\n",
    );
    assert_eq!(doc.name_ids.get("dup"), Some(&None));
    assert_eq!(doc.name_types.get("dup"), Some(&true));
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error
            && d.message.contains("Duplicate explicit target name")));
}

#[test]
fn test_duplicate_targets_same_refuri_downgrade() {
    let doc = parse_fixture(
        ".. _same: https://example.com/\n\n.. _same: https://example.com/\n",
    );
    assert!(doc
        .diagnostics
        .iter()
        .all(|d| d.severity < Severity::Error));
    assert!(doc.name_ids.get("same").map(Option::is_some).unwrap_or(false));
}

#[test]
fn test_unknown_directive() {
    let doc = parse_fixture(".. bogus:: argument\n\n   content\n");
    assert_doc(&doc).child(0, |msg| {
        msg.is_kind("system_message")
            .text_contains("Unknown directive type \"bogus\".");
    });
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error));
}

#[test]
fn test_malformed_target_becomes_comment() {
    let doc = parse_fixture(".. _missing colon\n");
    assert_doc(&doc)
        .child(0, |comment| {
            comment.is_kind("comment");
        })
        .child(1, |msg| {
            msg.is_kind("system_message")
                .text_contains("malformed hyperlink target");
        });
}
