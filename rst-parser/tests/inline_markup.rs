//! Inline markup tokenizer coverage through the public parser surface.

use rst_parser::rst::testing::{assert_doc, parse_fixture};
use rst_parser::Severity;

#[test]
fn test_emphasis_strong_literal() {
    let doc = parse_fixture("mix *em* and **strong** and ``lit eral``\n");
    assert_doc(&doc).child(0, |para| {
        para.child_count(6)
            .child(0, |t| {
                t.is_kind("text").text("mix ");
            })
            .child(1, |em| {
                em.is_kind("emphasis").text("em");
            })
            .child(2, |t| {
                t.text(" and ");
            })
            .child(3, |strong| {
                strong.is_kind("strong").text("strong");
            })
            .child(4, |t| {
                t.text(" and ");
            })
            .child(5, |lit| {
                lit.is_kind("literal").text("lit eral");
            });
    });
}

#[test]
fn test_literal_keeps_backslashes() {
    let doc = parse_fixture("``a\\*b``\n");
    assert_doc(&doc).child(0, |para| {
        para.child(0, |lit| {
            lit.is_kind("literal").text("a\\*b");
        });
    });
}

#[test]
fn test_escaped_markup_is_plain_text() {
    let doc = parse_fixture("\\*not emphasis\\*\n");
    assert_doc(&doc).child(0, |para| {
        para.child_count(1).child(0, |t| {
            t.is_kind("text").text("*not emphasis*");
        });
    });
    assert!(parse_fixture("\\*not emphasis\\*\n").diagnostics.is_empty());
}

#[test]
fn test_quoted_start_is_not_markup() {
    let doc = parse_fixture("the '*' character\n");
    assert_doc(&doc).child(0, |para| {
        para.child_count(1).child(0, |t| {
            t.text("the '*' character");
        });
    });
    assert!(doc.diagnostics.is_empty());
}

#[test]
fn test_markup_needs_leading_boundary() {
    let doc = parse_fixture("in*word*asterisks\n");
    assert_doc(&doc).child(0, |para| {
        para.child_count(1).child(0, |t| {
            t.text("in*word*asterisks");
        });
    });
}

#[test]
fn test_inline_internal_target() {
    let doc = parse_fixture("about _`Target Name` here\n");
    let para = doc.node(doc.root()).children[0];
    let target = doc
        .node(para)
        .children
        .iter()
        .copied()
        .find(|&c| doc.node(c).kind.name() == "target")
        .expect("target node");
    assert!(doc.node(target).names.contains(&"target name".to_string()));
    assert!(doc.name_ids.contains_key("target name"));
    assert_eq!(doc.name_types.get("target name"), Some(&true));
}

#[test]
fn test_simple_reference() {
    let doc = parse_fixture("see docs_ for more\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |reference| {
            reference
                .is_kind("reference")
                .attr_str("refname", "docs")
                .text("docs");
        });
    });
    assert!(doc.ref_names.contains_key("docs"));
}

#[test]
fn test_anonymous_reference() {
    let doc = parse_fixture("see docs__ for more\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |reference| {
            reference.is_kind("reference").attr_flag("anonymous");
        });
    });
    assert_eq!(doc.anonymous_refs.len(), 1);
}

#[test]
fn test_phrase_reference() {
    let doc = parse_fixture("see `some phrase`_ here\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |reference| {
            reference
                .is_kind("reference")
                .attr_str("refname", "some phrase")
                .text("some phrase");
        });
    });
}

#[test]
fn test_phrase_reference_embedded_uri() {
    let doc = parse_fixture("see `Example <https://example.com/>`_ site\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |reference| {
            reference
                .is_kind("reference")
                .attr_str("refuri", "https://example.com/")
                .text("Example");
        })
        .child(2, |target| {
            target.is_kind("target").has_name("example");
        });
    });
}

#[test]
fn test_footnote_and_citation_references() {
    let doc = parse_fixture("numbered [1]_ auto [#]_ symbol [*]_ cited [CIT]_\n");
    let para = doc.node(doc.root()).children[0];
    let kinds: Vec<&str> = doc
        .node(para)
        .children
        .iter()
        .map(|&c| doc.node(c).kind.name())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "text",
            "footnote_reference",
            "text",
            "footnote_reference",
            "text",
            "footnote_reference",
            "text",
            "citation_reference",
        ]
    );
    assert_eq!(doc.autofootnote_refs.len(), 1);
    assert_eq!(doc.symbol_footnote_refs.len(), 1);
    assert!(doc.footnote_refs.contains_key("1"));
    assert!(doc.citation_refs.contains_key("cit"));
}

#[test]
fn test_substitution_reference_with_reference_suffix() {
    let doc = parse_fixture("go |name|_ now\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |reference| {
            reference
                .is_kind("reference")
                .attr_str("refname", "name")
                .child(0, |subref| {
                    subref.is_kind("substitution_reference").text("name");
                });
        });
    });
}

#[test]
fn test_standalone_uri() {
    let doc = parse_fixture("Visit https://example.com/page. Then rest.\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |reference| {
            reference
                .is_kind("reference")
                .attr_str("refuri", "https://example.com/page")
                .text("https://example.com/page");
        })
        .child(2, |t| {
            t.text(". Then rest.");
        });
    });
}

#[test]
fn test_standalone_email() {
    let doc = parse_fixture("write to someone@example.com today\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |reference| {
            reference
                .is_kind("reference")
                .attr_str("refuri", "mailto:someone@example.com")
                .text("someone@example.com");
        });
    });
}

#[test]
fn test_unknown_scheme_stays_text() {
    let doc = parse_fixture("try madeupscheme://nope here\n");
    assert_doc(&doc).child(0, |para| {
        para.child_count(1).child(0, |t| {
            t.text("try madeupscheme://nope here");
        });
    });
}

#[test]
fn test_ref_role() {
    let doc = parse_fixture("see :ref:`some-target` here\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |role| {
            role.is_kind("ref_role")
                .attr_str("name", "ref")
                .attr_str("target", "some-target")
                .text("some-target");
        });
    });
}

#[test]
fn test_ref_role_with_title() {
    let doc = parse_fixture("see :doc:`The Title </page/path>` here\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |role| {
            role.is_kind("ref_role")
                .attr_str("target", "/page/path")
                .text("The Title");
        });
    });
}

#[test]
fn test_suffix_role() {
    let doc = parse_fixture("see `some-target`:ref: here\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |role| {
            role.is_kind("ref_role").attr_str("target", "some-target");
        });
    });
}

#[test]
fn test_default_role() {
    let doc = parse_fixture("plain `interpreted text` here\n");
    assert_doc(&doc).child(0, |para| {
        para.child(1, |role| {
            role.is_kind("role").attr_str("name", "").text("interpreted text");
        });
    });
}

#[test]
fn test_unknown_role_reports_error() {
    let doc = parse_fixture("see :bogus:`text` here\n");
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error
            && d.message.contains("Unknown interpreted text role \"bogus\".")));
}

#[test]
fn test_conflicting_roles_warn() {
    let doc = parse_fixture(":ref:`text`:doc: oops\n");
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning
            && d.message.contains("Multiple roles in interpreted text")));
}

#[test]
fn test_unterminated_literal_warns() {
    let doc = parse_fixture("``unfinished\n");
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Inline literal start-string without end-string.")));
}
