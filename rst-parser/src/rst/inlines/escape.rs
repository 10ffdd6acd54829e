//! Backslash escape handling via NUL substitution.

/// Replace every backslash escape `\X` with `NUL X`. A trailing lone
/// backslash becomes a bare NUL.
pub fn escape_to_null(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push('\u{0}');
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Undo [`escape_to_null`].
///
/// With `restore_backslashes` every NUL becomes a backslash again. Without
/// it, escaped whitespace disappears entirely and other sentinels are
/// dropped, yielding the display text.
pub fn unescape(text: &str, restore_backslashes: bool) -> String {
    if restore_backslashes {
        return text.replace('\u{0}', "\\");
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{0}' {
            if matches!(chars.peek(), Some(' ') | Some('\n')) {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Split on escaped whitespace (`NUL space` / `NUL newline`) sequences.
/// Used for URIs broken across lines with backslash continuations.
pub fn split_escaped_whitespace(text: &str) -> Vec<String> {
    text.split("\u{0} ")
        .flat_map(|part| part.split("\u{0}\n"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_escape_to_null() {
        assert_eq!(escape_to_null(r"a\*b"), "a\u{0}*b");
        assert_eq!(escape_to_null(r"end\"), "end\u{0}");
        assert_eq!(escape_to_null(r"\\"), "\u{0}\\");
    }

    #[test]
    fn test_unescape_drops_escaped_whitespace() {
        assert_eq!(unescape("uri\u{0} part", false), "uripart");
        assert_eq!(unescape("a\u{0}*b", false), "a*b");
    }

    #[test]
    fn test_split_escaped_whitespace() {
        assert_eq!(
            split_escaped_whitespace("one\u{0} two\u{0}\nthree"),
            vec!["one", "two", "three"]
        );
    }

    proptest! {
        #[test]
        fn prop_escape_round_trip(text in "[^\u{0}]{0,64}") {
            let escaped = escape_to_null(&text);
            prop_assert_eq!(unescape(&escaped, true), text);
        }
    }
}
