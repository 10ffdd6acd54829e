//! Identifier and reference-name normalization.

/// Fold a character with diacritics (or a latin digraph) to its ASCII
/// spelling. Covers the latin repertoire that shows up in documentation
/// titles; anything unfolded and non-ASCII is dropped by `make_id`.
fn fold_latin(c: char) -> Option<&'static str> {
    Some(match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'ĥ' | 'ħ' => "h",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'ĵ' => "j",
        'ķ' => "k",
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'ñ' | 'ń' | 'ņ' | 'ň' | 'ŋ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'ś' | 'ŝ' | 'ş' | 'š' => "s",
        'ţ' | 'ť' | 'ŧ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'ŵ' => "w",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        'þ' => "th",
        _ => return None,
    })
}

/// Convert `text` into an identifier: lowercase, fold latin letters to
/// ASCII, collapse whitespace, replace non-`[a-z0-9]` runs with `-`, and
/// trim leading digits/hyphens and trailing hyphens.
pub fn make_id(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut folded = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if c.is_ascii() {
            folded.push(c);
        } else if let Some(ascii) = fold_latin(c) {
            folded.push_str(ascii);
        }
        // Unfoldable non-ASCII is dropped.
    }
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut id = String::with_capacity(collapsed.len());
    let mut pending_dash = false;
    for c in collapsed.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !id.is_empty() {
                id.push('-');
            }
            pending_dash = false;
            id.push(c);
        } else {
            pending_dash = true;
        }
    }
    // Trim leading digits and hyphens, trailing hyphens.
    let start = id
        .find(|c: char| c.is_ascii_lowercase())
        .unwrap_or(id.len());
    id[start..].trim_end_matches('-').to_string()
}

/// Collapse runs of any whitespace to single spaces and trim.
pub fn fully_normalize_name(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Collapse whitespace without case folding; substitution names are
/// case-sensitive.
pub fn whitespace_normalize_name(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("What is MongoDB?", "what-is-mongodb")]
    #[case("  Spaced   out  title ", "spaced-out-title")]
    #[case("1. Numbered heading", "numbered-heading")]
    #[case("--- leading punctuation", "leading-punctuation")]
    #[case("trailing dots...", "trailing-dots")]
    #[case("Café Führung", "cafe-fuhrung")]
    #[case("Ærøskøbing", "aeroskobing")]
    #[case("漢字 only", "only")]
    fn test_make_id(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(make_id(input), expected);
    }

    #[test]
    fn test_make_id_all_stripped() {
        assert_eq!(make_id("123"), "");
        assert_eq!(make_id("!!!"), "");
    }

    #[test]
    fn test_fully_normalize_name() {
        assert_eq!(fully_normalize_name("  Some\t Name \n here "), "some name here");
    }

    #[test]
    fn test_whitespace_normalize_keeps_case() {
        assert_eq!(whitespace_normalize_name(" Arrow  Key "), "Arrow Key");
    }
}
