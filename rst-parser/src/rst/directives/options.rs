//! Option validators.
//!
//! Each directive option names a validator that converts the raw field
//! value into a typed attribute or explains why it cannot. A `None` input
//! means the option was given without any value.

use crate::rst::ast::AttrValue;

/// No argument allowed; presence alone sets the flag.
pub fn flag(value: Option<&str>) -> Result<AttrValue, String> {
    match value {
        None => Ok(AttrValue::Bool(true)),
        Some(text) if text.trim().is_empty() => Ok(AttrValue::Bool(true)),
        Some(text) => Err(format!("no argument is allowed; \"{}\" supplied", text)),
    }
}

/// Any value, whitespace-trimmed; missing becomes the empty string.
pub fn unchanged(value: Option<&str>) -> Result<AttrValue, String> {
    Ok(AttrValue::Str(value.unwrap_or("").trim().to_string()))
}

/// Any value, but it must be present and non-blank.
pub fn unchanged_required(value: Option<&str>) -> Result<AttrValue, String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(AttrValue::Str(text.trim().to_string())),
        _ => Err("argument required but none supplied".to_string()),
    }
}

pub fn nonnegative_int(value: Option<&str>) -> Result<AttrValue, String> {
    let text = value.ok_or_else(|| "argument required but none supplied".to_string())?;
    let parsed: i64 = text
        .trim()
        .parse()
        .map_err(|_| format!("invalid integer value: \"{}\"", text.trim()))?;
    if parsed < 0 {
        return Err(format!("negative value; must be positive or zero: {}", parsed));
    }
    Ok(AttrValue::Int(parsed))
}

pub fn positive_int(value: Option<&str>) -> Result<AttrValue, String> {
    match nonnegative_int(value)? {
        AttrValue::Int(0) => Err("must be positive: 0".to_string()),
        other => Ok(other),
    }
}

/// Comma-separated line numbers and inclusive ranges: `1,3-5`.
pub fn line_ranges(value: Option<&str>) -> Result<AttrValue, String> {
    let text = value.ok_or_else(|| "argument required but none supplied".to_string())?;
    let mut pairs = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(format!("empty range in \"{}\"", text.trim()));
        }
        let (lo, hi) = match part.split_once('-') {
            Some((lo, hi)) => (lo.trim(), hi.trim()),
            None => (part, part),
        };
        let lo: i64 = lo
            .parse()
            .map_err(|_| format!("invalid line number: \"{}\"", part))?;
        let hi: i64 = hi
            .parse()
            .map_err(|_| format!("invalid line number: \"{}\"", part))?;
        if lo < 1 || hi < lo {
            return Err(format!("invalid line range: \"{}\"", part));
        }
        pairs.push((lo, hi));
    }
    if pairs.is_empty() {
        return Err("at least one line number required".to_string());
    }
    Ok(AttrValue::IntPairs(pairs))
}

/// One word out of a fixed set (lowercased for comparison).
pub fn choice(value: Option<&str>, choices: &[&str]) -> Result<AttrValue, String> {
    let text = value
        .ok_or_else(|| "argument required but none supplied".to_string())?
        .trim()
        .to_lowercase();
    if choices.contains(&text.as_str()) {
        Ok(AttrValue::Str(text))
    } else {
        Err(format!(
            "\"{}\" unknown; choose from {}",
            text,
            choices.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_flag() {
        assert_eq!(flag(None).unwrap(), AttrValue::Bool(true));
        assert!(flag(Some("unexpected")).is_err());
    }

    #[rstest]
    #[case("1-2", vec![(1, 2)])]
    #[case("3", vec![(3, 3)])]
    #[case("1, 3-5, 9", vec![(1, 1), (3, 5), (9, 9)])]
    fn test_line_ranges(#[case] input: &str, #[case] expected: Vec<(i64, i64)>) {
        assert_eq!(
            line_ranges(Some(input)).unwrap(),
            AttrValue::IntPairs(expected)
        );
    }

    #[rstest]
    #[case("5-2")]
    #[case("0")]
    #[case("a-b")]
    #[case("")]
    fn test_line_ranges_rejects(#[case] input: &str) {
        assert!(line_ranges(Some(input)).is_err());
    }

    #[test]
    fn test_ints() {
        assert_eq!(nonnegative_int(Some("0")).unwrap(), AttrValue::Int(0));
        assert!(nonnegative_int(Some("-3")).is_err());
        assert!(nonnegative_int(None).is_err());
        assert!(positive_int(Some("0")).is_err());
        assert_eq!(positive_int(Some("7")).unwrap(), AttrValue::Int(7));
    }
}
