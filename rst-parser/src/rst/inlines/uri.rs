//! Standalone URI and email recognition.
//!
//! After explicit markup is carved out of a text run, the leftover text is
//! scanned for bare URIs and email addresses, which become reference nodes.
//! A URI only counts when its scheme is in the known-scheme registry;
//! otherwise the candidate is abandoned and stays plain text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Schemes recognized for standalone URIs.
const URI_SCHEMES: &[&str] = &[
    "acap", "chrome", "cvs", "data", "dav", "dict", "dns", "file", "ftp", "geo", "git", "gopher",
    "http", "https", "imap", "ipp", "irc", "ircs", "ldap", "ldaps", "magnet", "mailto", "mid",
    "mms", "mongodb", "news", "nfs", "nntp", "pop", "prospero", "redis", "rsync", "rtsp", "sftp",
    "shttp", "sip", "sips", "smb", "sms", "snmp", "ssh", "svn", "tel", "telnet", "tftp", "urn",
    "vnc", "wais", "ws", "wss", "xmpp",
];

pub fn is_known_scheme(scheme: &str) -> bool {
    let lower = scheme.to_ascii_lowercase();
    URI_SCHEMES.binary_search(&lower.as_str()).is_ok()
}

/// Candidate absolute URI: a scheme, a colon, and a non-blank tail. The
/// tail may contain NUL-escaped characters; boundary and scheme validation
/// happen in code.
pub static URI_CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<scheme>[A-Za-z][A-Za-z0-9.+-]*):(?P<tail>[^\s<>]+)").expect("static pattern")
});

/// Candidate email address.
pub static EMAIL_CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[-_.!~*'{|}/\#?\^`&=+$%A-Za-z0-9\x00]+@[A-Za-z0-9](?:[A-Za-z0-9.\-]*[A-Za-z0-9])?",
    )
    .expect("static pattern")
});

/// Trailing characters that a standalone URI never consumes.
pub fn trim_uri_trailer(candidate: &str) -> &str {
    candidate.trim_end_matches(|c: char| {
        matches!(
            c,
            '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']' | '}' | '>' | '"' | '\'' | '\u{2019}'
                | '\u{201d}'
        )
    })
}

/// Prefix bare email addresses with `mailto:`; leave anything else alone.
pub fn adjust_uri(uri: &str) -> String {
    if uri.contains(':')
        && URI_CANDIDATE
            .find(uri)
            .map(|m| m.start() == 0 && m.end() == uri.len())
            .unwrap_or(false)
    {
        uri.to_string()
    } else if EMAIL_CANDIDATE
        .find(uri)
        .map(|m| m.start() == 0 && m.end() == uri.len())
        .unwrap_or(false)
    {
        format!("mailto:{}", uri)
    } else {
        uri.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_registry() {
        assert!(is_known_scheme("https"));
        assert!(is_known_scheme("MongoDB"));
        assert!(!is_known_scheme("madeup"));
    }

    #[test]
    fn test_trailing_punctuation() {
        assert_eq!(trim_uri_trailer("https://example.com/x."), "https://example.com/x");
        assert_eq!(trim_uri_trailer("https://example.com/)."), "https://example.com/");
    }

    #[test]
    fn test_adjust_uri() {
        assert_eq!(adjust_uri("user@example.com"), "mailto:user@example.com");
        assert_eq!(adjust_uri("https://example.com"), "https://example.com");
    }
}
