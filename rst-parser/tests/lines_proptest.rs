//! Property-based tests for the line store, escaping, and parser
//! robustness.

use std::rc::Rc;

use proptest::prelude::*;
use rst_parser::rst::inlines::{escape_to_null, unescape};
use rst_parser::rst::lines::LineStore;
use rst_parser::{parse, ParserOptions};

/// Reference normalization mirroring the line store contract.
fn normalize_reference(text: &str, tab_width: usize) -> String {
    let tab = " ".repeat(tab_width.max(1));
    text.split('\n')
        .map(|line| {
            line.replace('\t', &tab)
                .replace(['\u{000b}', '\u{000c}'], " ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_line_splitting_round_trip(
        text in "[ -~\t\n]{0,200}",
        tab_width in 1usize..12,
    ) {
        let store = LineStore::from_source(&text, tab_width, true, Rc::from("prop.rst"));
        prop_assert_eq!(store.join("\n"), normalize_reference(&text, tab_width));
    }

    #[test]
    fn prop_escape_round_trip(text in "[^\u{0}]{0,120}") {
        let escaped = escape_to_null(&text);
        prop_assert_eq!(unescape(&escaped, true), text);
    }

    #[test]
    fn prop_indented_strip_yields_flush_block(
        bodies in prop::collection::vec(("[a-z]{1,8}", 1usize..8), 1..8),
    ) {
        // All lines indented: the block covers them all, the returned
        // indent is the minimum, and the stripped block is flush left.
        let text = bodies
            .iter()
            .map(|(word, indent)| format!("{}{}", " ".repeat(*indent), word))
            .collect::<Vec<_>>()
            .join("\n");
        let min_indent = bodies.iter().map(|(_, indent)| *indent).min().unwrap();
        let store = LineStore::from_source(&text, 8, true, Rc::from("prop.rst"));
        let result = store.get_indented(0, false, true, None, None);
        prop_assert_eq!(result.indent, min_indent);
        prop_assert_eq!(result.block.len(), bodies.len());
        let stripped_min = result
            .block
            .texts()
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.len() - line.trim_start().len())
            .min()
            .unwrap();
        prop_assert_eq!(stripped_min, 0);
    }

    #[test]
    fn prop_parse_never_crashes(text in "\\PC{0,300}") {
        let options = ParserOptions::new();
        let result = parse("fuzz.rst", &text, &options);
        prop_assert!(result.is_ok());
    }

    #[test]
    fn prop_parse_never_crashes_multiline(
        lines in prop::collection::vec("[ -~]{0,40}", 0..24),
    ) {
        let text = lines.join("\n");
        let options = ParserOptions::new();
        prop_assert!(parse("fuzz.rst", &text, &options).is_ok());
    }
}

#[test]
fn test_info_one_past_end_contract() {
    let store = LineStore::from_source("a\nb", 8, true, Rc::from("prop.rst"));
    let (source, offset) = store.info(2).unwrap();
    assert_eq!(&*source, "prop.rst");
    assert_eq!(offset, None);
    assert!(store.info(3).is_err());
}
