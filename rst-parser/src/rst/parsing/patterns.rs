//! Transition pattern definitions.
//!
//! Patterns are start-anchored and tried in the declaration order of each
//! state's transition table. Constructs the regex engine cannot express
//! directly (same-character runs, "colon not followed by space") are
//! matched loosely here and verified imperatively by their handlers.

use once_cell::sync::Lazy;
use regex::Regex;

/// Reference names (same vocabulary as the inline tokenizer).
pub const SIMPLENAME: &str = r"(?:[^\W_])+(?:[-._+:](?:[^\W_])+)*";

fn build(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern")
}

pub static BLANK: Lazy<Regex> = Lazy::new(|| build(r"^ *$"));

pub static INDENT: Lazy<Regex> = Lazy::new(|| build(r"^ +"));

pub static BULLET: Lazy<Regex> =
    Lazy::new(|| build(r"^[-+*\x{2022}\x{2023}\x{2043}]( +|$)"));

const ENUM_TEXT: &str = r"[0-9]+|[a-z]|[A-Z]|#|[ivxlcdm]+|[IVXLCDM]+";

/// Enumerators in `(i)`, `i)`, and `i.` formats. The format is identified
/// by which named group matched.
pub static ENUMERATOR: Lazy<Regex> = Lazy::new(|| {
    build(&format!(
        r"^(?:(?P<parens>\((?P<ptext>{t})\))|(?P<rparen>(?P<rtext>{t})\))|(?P<period>(?P<dtext>{t})\.))( +|$)",
        t = ENUM_TEXT
    ))
});

/// Field markers. The terminating colon is the first one followed by
/// whitespace or end of line; the handler validates the name.
pub static FIELD_MARKER: Lazy<Regex> =
    Lazy::new(|| build(r"^:(?P<name>(?:\\.|[^\\\n])+?):( +|$)"));

const OPTION: &str =
    r"(?:--?|\+|/)[A-Za-z0-9][A-Za-z0-9_-]*(?:[ =](?:[A-Za-z][A-Za-z0-9_-]*|<[^<>]*>))?";

pub static OPTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    build(&format!(
        r"^(?P<options>{opt}(?:, {opt})*)(  +| ?$)",
        opt = OPTION
    ))
});

pub static DOCTEST: Lazy<Regex> = Lazy::new(|| build(r"^>>>( +|$)"));

pub static LINE_BLOCK: Lazy<Regex> = Lazy::new(|| build(r"^\|( +|$)"));

pub static EXPLICIT_MARKUP: Lazy<Regex> = Lazy::new(|| build(r"^\.\.( +|$)"));

pub static ANONYMOUS: Lazy<Regex> = Lazy::new(|| build(r"^__( +|$)"));

/// A run of non-alphanumeric 7-bit characters. The handler verifies the
/// run repeats a single character (the regex engine has no backreferences).
pub static LINE: Lazy<Regex> = Lazy::new(|| build(r"^([!-/:-@\[-`{-~])[!-/:-@\[-`{-~]* *$"));

pub static TEXT: Lazy<Regex> = Lazy::new(|| build(r"^"));

/// Same shape as [`LINE`]; Text state underlines.
pub static UNDERLINE: Lazy<Regex> = Lazy::new(|| build(r"^([!-/:-@\[-`{-~])[!-/:-@\[-`{-~]* *$"));

/// A single non-alphanumeric 7-bit character opens a quoted literal block.
pub static INITIAL_QUOTED: Lazy<Regex> = Lazy::new(|| build(r"^[!-/:-@\[-`{-~]"));

// -- explicit markup constructs ------------------------------------------

pub static FOOTNOTE: Lazy<Regex> = Lazy::new(|| {
    build(&format!(
        r"^\.\. +\[(?P<label>[0-9]+|\#(?:{name})?|\*)\]( +|$)",
        name = SIMPLENAME
    ))
});

pub static CITATION: Lazy<Regex> = Lazy::new(|| {
    build(&format!(r"^\.\. +\[(?P<label>{})\]( +|$)", SIMPLENAME))
});

/// Hyperlink target start; the handler checks the character after the `_`.
pub static HYPERLINK_TARGET: Lazy<Regex> = Lazy::new(|| build(r"^\.\. +_"));

/// Substitution definition start; the handler checks the character after
/// the `|`.
pub static SUBSTITUTION_DEF: Lazy<Regex> = Lazy::new(|| build(r"^\.\. +\|"));

pub static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    build(&format!(
        r"^\.\. +(?P<name>{}(?::{})?) ?::( +|$)",
        SIMPLENAME, SIMPLENAME
    ))
});

/// An embedded directive inside a substitution definition.
pub static EMBEDDED_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    build(&format!(
        r"^(?P<name>{}(?::{})?) ?::( +|$)",
        SIMPLENAME, SIMPLENAME
    ))
});

/// Block quote attributions: `-- author`. The handler verifies the dashes
/// are not a longer run and that text follows.
pub static ATTRIBUTION: Lazy<Regex> =
    Lazy::new(|| build(r"^(?P<dash>--?|\x{2014})(?P<sp> *)(?P<first>[^ \n])"));

/// A reference used as an indirect target: `name_` or `` `phrase`_ ``.
pub static REFERENCE_TARGET: Lazy<Regex> = Lazy::new(|| {
    build(&format!(
        r"^(?:(?P<simple>{})|`(?P<phrase>[^`]+)`)_$",
        SIMPLENAME
    ))
});

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("* item", true)]
    #[case("- item", true)]
    #[case("*", true)]
    #[case("*item", false)]
    fn test_bullet(#[case] line: &str, #[case] matches: bool) {
        assert_eq!(BULLET.is_match(line), matches);
    }

    #[rstest]
    #[case("3. first", "period", "3")]
    #[case("(i) item", "parens", "i")]
    #[case("IV) item", "rparen", "IV")]
    #[case("#. item", "period", "#")]
    fn test_enumerator(#[case] line: &str, #[case] format: &str, #[case] text: &str) {
        let caps = ENUMERATOR.captures(line).unwrap();
        assert!(caps.name(format).is_some());
        let got = caps
            .name("ptext")
            .or_else(|| caps.name("rtext"))
            .or_else(|| caps.name("dtext"))
            .unwrap();
        assert_eq!(got.as_str(), text);
    }

    #[test]
    fn test_enumerator_rejects_plain_text() {
        assert!(!ENUMERATOR.is_match("word"));
        assert!(!ENUMERATOR.is_match("a.b"));
    }

    #[rstest]
    #[case(":field: value", "field")]
    #[case(":some field name: v", "some field name")]
    #[case(":empty:", "empty")]
    fn test_field_marker(#[case] line: &str, #[case] name: &str) {
        let caps = FIELD_MARKER.captures(line).unwrap();
        assert_eq!(&caps["name"], name);
    }

    #[rstest]
    #[case("-o", true)]
    #[case("--long  description", true)]
    #[case("-o FILE, --output FILE  write there", true)]
    #[case("/V", true)]
    #[case("- not an option", false)]
    fn test_option_marker(#[case] line: &str, #[case] matches: bool) {
        assert_eq!(OPTION_MARKER.is_match(line), matches);
    }

    #[test]
    fn test_directive_marker() {
        let caps = DIRECTIVE.captures(".. code-block:: python").unwrap();
        assert_eq!(&caps["name"], "code-block");
        let caps = DIRECTIVE.captures(".. mongodb:note::").unwrap();
        assert_eq!(&caps["name"], "mongodb:note");
    }

    #[test]
    fn test_line_run() {
        assert!(LINE.is_match("===="));
        assert!(LINE.is_match("-"));
        assert!(!LINE.is_match("== =="));
    }
}
