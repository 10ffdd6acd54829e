//! Unicode helpers: display column width and code-point parsing.
//!
//! `column_width` backs the title-underline length checks: combining marks
//! take no column, East Asian wide and fullwidth characters take two. The
//! tables are the classic terminal-width ranges, trimmed to the blocks that
//! occur in documentation sources.

use std::fmt;

/// Inclusive ranges of zero-width (combining) code points.
const COMBINING: &[(u32, u32)] = &[
    (0x0300, 0x036F),
    (0x0483, 0x0489),
    (0x0591, 0x05BD),
    (0x05BF, 0x05BF),
    (0x05C1, 0x05C2),
    (0x05C4, 0x05C5),
    (0x05C7, 0x05C7),
    (0x0610, 0x061A),
    (0x064B, 0x065F),
    (0x0670, 0x0670),
    (0x06D6, 0x06DC),
    (0x06DF, 0x06E4),
    (0x06E7, 0x06E8),
    (0x06EA, 0x06ED),
    (0x0711, 0x0711),
    (0x0730, 0x074A),
    (0x07A6, 0x07B0),
    (0x07EB, 0x07F3),
    (0x0816, 0x0819),
    (0x081B, 0x0823),
    (0x0825, 0x0827),
    (0x0829, 0x082D),
    (0x0859, 0x085B),
    (0x08E3, 0x0902),
    (0x093A, 0x093A),
    (0x093C, 0x093C),
    (0x0941, 0x0948),
    (0x094D, 0x094D),
    (0x0951, 0x0957),
    (0x0962, 0x0963),
    (0x0E31, 0x0E31),
    (0x0E34, 0x0E3A),
    (0x0E47, 0x0E4E),
    (0x0EB1, 0x0EB1),
    (0x0EB4, 0x0EBC),
    (0x0EC8, 0x0ECD),
    (0x0F18, 0x0F19),
    (0x0F35, 0x0F35),
    (0x0F37, 0x0F37),
    (0x0F39, 0x0F39),
    (0x0F71, 0x0F7E),
    (0x0F80, 0x0F84),
    (0x0F86, 0x0F87),
    (0x135D, 0x135F),
    (0x1AB0, 0x1AFF),
    (0x1DC0, 0x1DFF),
    (0x20D0, 0x20F0),
    (0x2CEF, 0x2CF1),
    (0x2DE0, 0x2DFF),
    (0xA66F, 0xA672),
    (0xA674, 0xA67D),
    (0xA69E, 0xA69F),
    (0xFB1E, 0xFB1E),
    (0xFE00, 0xFE0F),
    (0xFE20, 0xFE2F),
    (0x101FD, 0x101FD),
    (0x1D165, 0x1D169),
    (0x1D16D, 0x1D172),
    (0x1D17B, 0x1D182),
    (0x1D185, 0x1D18B),
    (0x1D1AA, 0x1D1AD),
    (0xE0100, 0xE01EF),
];

/// Inclusive ranges of double-width code points (East Asian wide and
/// fullwidth).
const WIDE: &[(u32, u32)] = &[
    (0x1100, 0x115F),
    (0x2E80, 0x303E),
    (0x3041, 0x33FF),
    (0x3400, 0x4DBF),
    (0x4E00, 0x9FFF),
    (0xA000, 0xA4CF),
    (0xA960, 0xA97F),
    (0xAC00, 0xD7A3),
    (0xF900, 0xFAFF),
    (0xFE30, 0xFE4F),
    (0xFF00, 0xFF60),
    (0xFFE0, 0xFFE6),
    (0x1F300, 0x1F64F),
    (0x1F900, 0x1F9FF),
    (0x20000, 0x2FFFD),
    (0x30000, 0x3FFFD),
];

fn in_table(table: &[(u32, u32)], c: char) -> bool {
    let cp = c as u32;
    table
        .binary_search_by(|&(lo, hi)| {
            if cp < lo {
                std::cmp::Ordering::Greater
            } else if cp > hi {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

/// Display columns occupied by one character.
pub fn char_width(c: char) -> usize {
    if in_table(COMBINING, c) {
        0
    } else if in_table(WIDE, c) {
        2
    } else {
        1
    }
}

/// Display columns occupied by `text`. Combining marks do not add width.
pub fn column_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Errors from [`parse_code_point`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodePointError {
    Empty,
    Malformed(String),
    OutOfRange(String),
}

impl fmt::Display for CodePointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodePointError::Empty => write!(f, "empty code point"),
            CodePointError::Malformed(text) => {
                write!(f, "{:?} is not a valid code point expression", text)
            }
            CodePointError::OutOfRange(text) => {
                write!(f, "code point {:?} is not a valid character", text)
            }
        }
    }
}

impl std::error::Error for CodePointError {}

/// Parse a numeric character code.
///
/// Accepted spellings: decimal digits, `0x`/`x`/`\x`/`U+`/`u`/`\u` hex
/// prefixes, and XML-style `&#x...;` references.
pub fn parse_code_point(text: &str) -> Result<char, CodePointError> {
    if text.is_empty() {
        return Err(CodePointError::Empty);
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        let value: u32 = text
            .parse()
            .map_err(|_| CodePointError::OutOfRange(text.to_string()))?;
        return char::from_u32(value).ok_or_else(|| CodePointError::OutOfRange(text.to_string()));
    }
    let lower = text.to_ascii_lowercase();
    let hex = if let Some(rest) = lower
        .strip_prefix("&#x")
        .and_then(|rest| rest.strip_suffix(';'))
    {
        rest
    } else if let Some(rest) = lower.strip_prefix("0x") {
        rest
    } else if let Some(rest) = lower.strip_prefix("\\x") {
        rest
    } else if let Some(rest) = lower.strip_prefix("\\u") {
        rest
    } else if let Some(rest) = lower.strip_prefix("u+") {
        rest
    } else if let Some(rest) = lower.strip_prefix('u') {
        rest
    } else if let Some(rest) = lower.strip_prefix('x') {
        rest
    } else {
        return Err(CodePointError::Malformed(text.to_string()));
    };
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CodePointError::Malformed(text.to_string()));
    }
    let value =
        u32::from_str_radix(hex, 16).map_err(|_| CodePointError::OutOfRange(text.to_string()))?;
    char::from_u32(value).ok_or_else(|| CodePointError::OutOfRange(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_width_combining() {
        assert_eq!(column_width("A t\u{306}ab\u{306}le\u{306}"), 7);
        assert_eq!(column_width("plain"), 5);
    }

    #[test]
    fn test_column_width_wide() {
        assert_eq!(column_width("\u{4F60}\u{597D}"), 4);
    }

    #[test]
    fn test_code_point_spellings() {
        assert_eq!(parse_code_point("U+27A4").unwrap(), '\u{27A4}');
        assert_eq!(parse_code_point("0x2192").unwrap(), '\u{2192}');
        assert_eq!(parse_code_point("129448").unwrap(), '\u{1F9A8}');
        assert_eq!(parse_code_point("&#x262E;").unwrap(), '\u{262E}');
    }

    #[test]
    fn test_code_point_errors() {
        assert!(parse_code_point("U+FFFFFFFFFFFFFFF").is_err());
        assert!(parse_code_point("99z").is_err());
        assert!(parse_code_point("").is_err());
    }
}
