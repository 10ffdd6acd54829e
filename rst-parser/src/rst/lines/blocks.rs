//! Contiguous and indented block extraction.
//!
//! The two algorithms every block state leans on: `get_text_block` carves
//! the maximal run of non-blank lines, `get_indented` carves an indented
//! block and computes the common indentation. Both return child views, so
//! provenance flows through untouched.

use std::fmt;
use std::rc::Rc;

use super::store::LineStore;

/// A text block ran into unexpected indentation while `flush_left` was
/// required. Carries the partial block and the offending line's provenance.
#[derive(Debug)]
pub struct UnexpectedIndentation {
    pub block: LineStore,
    pub source: Rc<str>,
    /// 1-based line number of the indented line.
    pub lineno: usize,
}

impl fmt::Display for UnexpectedIndentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unexpected indentation at {}:{}",
            self.source, self.lineno
        )
    }
}

impl std::error::Error for UnexpectedIndentation {}

/// Result of [`LineStore::get_indented`].
#[derive(Debug)]
pub struct IndentedBlock {
    pub block: LineStore,
    /// The indentation removed (or that would be removed) from the block.
    pub indent: usize,
    /// True iff the block ended at EOF or on a blank line.
    pub blank_finish: bool,
}

impl LineStore {
    /// The maximal contiguous run of non-blank lines starting at `start`.
    ///
    /// With `flush_left`, a line starting with a space aborts the run and
    /// reports the partial block.
    pub fn get_text_block(
        &self,
        start: usize,
        flush_left: bool,
    ) -> Result<LineStore, UnexpectedIndentation> {
        let len = self.len();
        let mut end = start;
        while end < len {
            let text = self.text(end).expect("index within checked bounds");
            if text.trim().is_empty() {
                break;
            }
            if flush_left && text.starts_with(' ') {
                let (source, offset) = self.info(end).expect("index within checked bounds");
                return Err(UnexpectedIndentation {
                    block: self.slice(start, end),
                    source,
                    lineno: offset.unwrap_or(0) + 1,
                });
            }
            end += 1;
        }
        Ok(self.slice(start, end))
    }

    /// Extract an indented block starting at `start`.
    ///
    /// A non-blank line terminates the block when it has no leading space
    /// or, when `block_indent` is given, when any of its first
    /// `block_indent` columns is non-space. With `until_blank`, a blank line
    /// terminates too. `indent` is the minimum leading-space count among the
    /// indented lines unless `block_indent` fixes it. With `strip_indent`
    /// the indentation is removed in place (`first_indent` covers the first
    /// line when its indent is known separately).
    pub fn get_indented(
        &self,
        start: usize,
        until_blank: bool,
        strip_indent: bool,
        block_indent: Option<usize>,
        first_indent: Option<usize>,
    ) -> IndentedBlock {
        let mut indent = block_indent;
        let first_indent = match (block_indent, first_indent) {
            (Some(block), None) => Some(block),
            (_, first) => first,
        };
        let mut end = start;
        if first_indent.is_some() && end < self.len() {
            end += 1;
        }
        let len = self.len();
        let mut blank_finish = true;
        while end < len {
            let line = self.text(end).expect("index within checked bounds");
            let stripped = line.trim_start();
            let insufficient = match block_indent {
                Some(block) => {
                    !line.is_empty()
                        && (!line.starts_with(' ')
                            || line.chars().take(block).any(|c| c != ' '))
                }
                None => !line.is_empty() && !line.starts_with(' '),
            };
            if insufficient {
                // Block ends here; blank lines immediately before it close
                // the block cleanly.
                blank_finish = end > start && self.is_blank(end - 1);
                break;
            }
            if stripped.is_empty() {
                if until_blank {
                    blank_finish = true;
                    break;
                }
            } else if block_indent.is_none() {
                let line_indent = line.len() - stripped.len();
                indent = Some(match indent {
                    Some(current) => current.min(line_indent),
                    None => line_indent,
                });
            }
            end += 1;
        }
        let block = self.slice(start, end);
        if let Some(first) = first_indent {
            if !block.is_empty() {
                let text = block.text(0).expect("non-empty block");
                let cut = text
                    .char_indices()
                    .nth(first)
                    .map(|(i, _)| i)
                    .unwrap_or(text.len());
                block
                    .set_text(0, text[cut..].to_string())
                    .expect("non-empty block");
            }
        }
        let indent = indent.unwrap_or(0);
        if indent > 0 && strip_indent {
            let skip_first = usize::from(first_indent.is_some());
            block.trim_left(indent, skip_first, block.len());
        }
        IndentedBlock {
            block,
            indent,
            blank_finish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(text: &str) -> LineStore {
        LineStore::from_source(text, 8, true, Rc::from("test.rst"))
    }

    #[test]
    fn test_text_block_stops_at_blank() {
        let s = store("one\ntwo\n\nthree");
        let block = s.get_text_block(0, false).unwrap();
        assert_eq!(block.texts(), vec!["one", "two"]);
    }

    #[test]
    fn test_text_block_flush_left() {
        let s = store("one\n  two\nthree");
        let err = s.get_text_block(0, true).unwrap_err();
        assert_eq!(err.block.texts(), vec!["one"]);
        assert_eq!(err.lineno, 2);
    }

    #[test]
    fn test_indented_minimum_indent() {
        let s = store("    one\n      two\n\n    three\nout");
        let IndentedBlock {
            block,
            indent,
            blank_finish,
        } = s.get_indented(0, false, true, None, None);
        assert_eq!(indent, 4);
        assert_eq!(block.texts(), vec!["one", "  two", "", "three"]);
        assert!(!blank_finish);
    }

    #[test]
    fn test_indented_blank_finish_at_eof() {
        let s = store("  a\n  b");
        let result = s.get_indented(0, false, true, None, None);
        assert!(result.blank_finish);
        assert_eq!(result.block.texts(), vec!["a", "b"]);
    }

    #[test]
    fn test_indented_until_blank() {
        let s = store("  a\n\n  b");
        let result = s.get_indented(0, true, true, None, None);
        assert_eq!(result.block.texts(), vec!["a"]);
        assert!(result.blank_finish);
    }

    #[test]
    fn test_known_block_indent() {
        let s = store("   a\n      b\n  out");
        let result = s.get_indented(0, false, true, Some(3), None);
        assert_eq!(result.block.texts(), vec!["a", "   b"]);
        assert_eq!(result.indent, 3);
    }

    #[test]
    fn test_first_known_indent() {
        // ".. " prefix already consumed conceptually: first line starts at
        // column 3, the rest share their own indentation.
        let s = store(".. comment text\n   more\n   even more\nout");
        let result = s.get_indented(0, false, true, None, Some(3));
        assert_eq!(result.block.texts(), vec!["comment text", "more", "even more"]);
    }
}
