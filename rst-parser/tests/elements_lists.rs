//! List element coverage: bullet, enumerated, field, option, definition,
//! and line-block lists.

use rst_parser::rst::testing::{assert_doc, parse_fixture};

#[test]
fn test_bullet_list_two_items() {
    let doc = parse_fixture("- one\n- two\n\nafter\n");
    assert_doc(&doc)
        .child_count(2)
        .child(0, |list| {
            list.is_kind("bullet_list")
                .attr_str("bullet", "-")
                .child_count(2)
                .child(0, |item| {
                    item.is_kind("list_item").text("one");
                })
                .child(1, |item| {
                    item.is_kind("list_item").text("two");
                });
        })
        .child(1, |para| {
            para.is_kind("paragraph").text("after");
        });
}

#[test]
fn test_bullet_change_starts_new_list() {
    let doc = parse_fixture("- a\n+ b\n");
    assert_doc(&doc)
        .child(0, |list| {
            list.is_kind("bullet_list").attr_str("bullet", "-").child_count(1);
        })
        .child(1, |msg| {
            msg.is_kind("system_message")
                .text_contains("Bullet list ends without a blank line");
        })
        .child(2, |list| {
            list.is_kind("bullet_list").attr_str("bullet", "+").child_count(1);
        });
}

#[test]
fn test_nested_bullet_list() {
    let doc = parse_fixture("- outer\n\n  - inner one\n  - inner two\n");
    assert_doc(&doc).child(0, |list| {
        list.is_kind("bullet_list").child_count(1).child(0, |item| {
            item.child(0, |para| {
                para.is_kind("paragraph").text("outer");
            })
            .child(1, |inner| {
                inner.is_kind("bullet_list").child_count(2);
            });
        });
    });
}

#[test]
fn test_enumerated_parens_loweralpha() {
    let doc = parse_fixture("(a) first\n(b) second\n");
    assert_doc(&doc).child(0, |list| {
        list.is_kind("enumerated_list")
            .attr_str("enumtype", "loweralpha")
            .attr_str("prefix", "(")
            .attr_str("suffix", ")")
            .child_count(2);
    });
}

#[test]
fn test_enumerated_single_i_is_roman() {
    let doc = parse_fixture("i. one\nii. two\niii. three\n");
    assert_doc(&doc).child(0, |list| {
        list.is_kind("enumerated_list")
            .attr_str("enumtype", "lowerroman")
            .child_count(3);
    });
}

#[test]
fn test_enumerated_auto() {
    let doc = parse_fixture("#. one\n#. two\n");
    assert_doc(&doc).child(0, |list| {
        list.is_kind("enumerated_list")
            .attr_str("enumtype", "arabic")
            .child_count(2);
    });
}

#[test]
fn test_enumerated_sequence_break_starts_new_list() {
    let doc = parse_fixture("1. one\n\n3. three\n");
    // "3." does not extend the sequence, so a second list begins, with the
    // start-value info attached after it.
    assert_doc(&doc)
        .child_count(3)
        .child(0, |list| {
            list.is_kind("enumerated_list").no_attr("start").child_count(1);
        })
        .child(1, |list| {
            list.is_kind("enumerated_list").attr_int("start", 3).child_count(1);
        })
        .child(2, |msg| {
            msg.is_kind("system_message")
                .text_contains("start value not ordinal-1");
        });
}

#[test]
fn test_enumerator_sequence_break_without_blank_is_text() {
    // Without a blank line the second enumerator disqualifies the first:
    // the whole block reads as one paragraph.
    let doc = parse_fixture("1. one\n3. three\n");
    assert_doc(&doc).child_count(1).child(0, |para| {
        para.is_kind("paragraph").text("1. one\n3. three");
    });
}

#[test]
fn test_enumerator_without_list_shape_is_text() {
    let doc = parse_fixture("1. word\nnot a list\n");
    assert_doc(&doc).child_count(1).child(0, |para| {
        para.is_kind("paragraph")
            .text_contains("1. word")
            .text_contains("not a list");
    });
}

#[test]
fn test_field_list() {
    let doc = parse_fixture(":first: value one\n:second: value two\n\n");
    assert_doc(&doc).child(0, |list| {
        list.is_kind("field_list")
            .child_count(2)
            .child(0, |field| {
                field
                    .is_kind("field")
                    .child(0, |name| {
                        name.is_kind("field_name").text("first");
                    })
                    .child(1, |body| {
                        body.is_kind("field_body").text_contains("value one");
                    });
            })
            .child(1, |field| {
                field.child(0, |name| {
                    name.text("second");
                });
            });
    });
}

#[test]
fn test_field_body_spans_lines() {
    let doc = parse_fixture(":name: first line\n   second line\n\n");
    assert_doc(&doc).child(0, |list| {
        list.child(0, |field| {
            field.child(1, |body| {
                body.find_child("paragraph", |para| {
                    para.text("first line\nsecond line");
                });
            });
        });
    });
}

#[test]
fn test_option_list() {
    let doc = parse_fixture("-o  write output\n--long=FILE  write to FILE\n\n");
    assert_doc(&doc).child(0, |list| {
        list.is_kind("option_list")
            .child_count(2)
            .child(0, |item| {
                item.is_kind("option_list_item")
                    .child(0, |group| {
                        group.is_kind("option_group").child(0, |option| {
                            option.child(0, |s| {
                                s.is_kind("option_string").text("-o");
                            });
                        });
                    })
                    .child(1, |description| {
                        description.is_kind("description").text_contains("write output");
                    });
            })
            .child(1, |item| {
                item.child(0, |group| {
                    group.child(0, |option| {
                        option
                            .child(0, |s| {
                                s.is_kind("option_string").text("--long");
                            })
                            .child(1, |arg| {
                                arg.is_kind("option_argument")
                                    .attr_str("delimiter", "=")
                                    .text("FILE");
                            });
                    });
                });
            });
    });
}

#[test]
fn test_option_without_description_is_text() {
    let doc = parse_fixture("-o\nnot indented\n");
    assert_doc(&doc).child_count(1).child(0, |para| {
        para.is_kind("paragraph").text_contains("-o");
    });
}

#[test]
fn test_definition_list() {
    let doc = parse_fixture("term\n  the definition\n\n");
    assert_doc(&doc).child(0, |list| {
        list.is_kind("definition_list").child(0, |item| {
            item.is_kind("definition_list_item")
                .child(0, |term| {
                    term.is_kind("term").text("term");
                })
                .child(1, |definition| {
                    definition
                        .is_kind("definition")
                        .find_child("paragraph", |para| {
                            para.text("the definition");
                        });
                });
        });
    });
}

#[test]
fn test_definition_list_classifier() {
    let doc = parse_fixture("term : classifier\n  definition body\n\n");
    assert_doc(&doc).child(0, |list| {
        list.child(0, |item| {
            item.child(0, |term| {
                term.is_kind("term").text("term");
            })
            .child(1, |classifier| {
                classifier.is_kind("classifier").text("classifier");
            })
            .child(2, |definition| {
                definition.is_kind("definition");
            });
        });
    });
}

#[test]
fn test_line_block() {
    let doc = parse_fixture("| line one\n| line two\n\n");
    assert_doc(&doc).child(0, |block| {
        block
            .is_kind("line_block")
            .child_count(2)
            .child(0, |line| {
                line.is_kind("line").text("line one");
            })
            .child(1, |line| {
                line.is_kind("line").text("line two");
            });
    });
}

#[test]
fn test_line_block_nesting_by_indent() {
    let doc = parse_fixture("| a\n|   b\n|   c\n| d\n\n");
    assert_doc(&doc).child(0, |block| {
        block
            .is_kind("line_block")
            .child_count(3)
            .child(0, |line| {
                line.is_kind("line").text("a");
            })
            .child(1, |nested| {
                nested
                    .is_kind("line_block")
                    .child_count(2)
                    .child(0, |line| {
                        line.text("b");
                    })
                    .child(1, |line| {
                        line.text("c");
                    });
            })
            .child(2, |line| {
                line.is_kind("line").text("d");
            });
    });
}
