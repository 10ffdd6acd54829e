//! The line store.
//!
//! A `LineStore` is an ordered sequence of normalized lines, each carrying
//! its source id and original line offset. Stores are handles: cloning one
//! yields another view of the same buffer, and `slice` produces a child
//! store whose destructive edits (`pop`, `remove_range`) propagate to the
//! parent at the mapped indices until the child is `disconnect`ed.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// One normalized source line plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub source: Rc<str>,
    /// 0-based line index in the original source.
    pub offset: usize,
}

/// Errors from line store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineStoreError {
    /// Index past the end of the store.
    OutOfRange { index: usize, len: usize },
    /// Trim larger than the store.
    BadTrim { requested: usize, len: usize },
}

impl fmt::Display for LineStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineStoreError::OutOfRange { index, len } => {
                write!(f, "line index {} out of range (length {})", index, len)
            }
            LineStoreError::BadTrim { requested, len } => {
                write!(f, "cannot trim {} lines from a store of {}", requested, len)
            }
        }
    }
}

impl std::error::Error for LineStoreError {}

struct Inner {
    lines: Vec<Line>,
    /// Parent view and the index of this view's first line within it.
    parent: Option<(LineStore, usize)>,
}

/// An ordered sequence of [`Line`]s with slice views and parent write-back.
#[derive(Clone)]
pub struct LineStore {
    inner: Rc<RefCell<Inner>>,
}

impl LineStore {
    /// Normalize `text` into a store.
    ///
    /// Splits on `\n`, replaces each tab with `tab_width` spaces, right-trims
    /// every line, and when `convert_whitespace` is set replaces vertical
    /// tabs and form feeds with ordinary spaces.
    pub fn from_source(
        text: &str,
        tab_width: usize,
        convert_whitespace: bool,
        source: Rc<str>,
    ) -> Self {
        let expanded_tab = " ".repeat(tab_width.max(1));
        let lines = text
            .split('\n')
            .enumerate()
            .map(|(offset, raw)| {
                let mut line = raw.replace('\t', &expanded_tab);
                if convert_whitespace {
                    line = line.replace(['\u{000b}', '\u{000c}'], " ");
                }
                Line {
                    text: line.trim_end().to_string(),
                    source: Rc::clone(&source),
                    offset,
                }
            })
            .collect();
        Self::from_lines(lines)
    }

    pub fn from_lines(lines: Vec<Line>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                lines,
                parent: None,
            })),
        }
    }

    pub fn empty() -> Self {
        Self::from_lines(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().lines.is_empty()
    }

    /// The text of line `i`.
    pub fn text(&self, i: usize) -> Result<String, LineStoreError> {
        let inner = self.inner.borrow();
        inner
            .lines
            .get(i)
            .map(|line| line.text.clone())
            .ok_or(LineStoreError::OutOfRange {
                index: i,
                len: inner.lines.len(),
            })
    }

    pub fn line(&self, i: usize) -> Result<Line, LineStoreError> {
        let inner = self.inner.borrow();
        inner
            .lines
            .get(i)
            .cloned()
            .ok_or(LineStoreError::OutOfRange {
                index: i,
                len: inner.lines.len(),
            })
    }

    /// Provenance of line `i`. One past the end is answered with the last
    /// line's source and an empty offset, so EOF diagnostics still point at
    /// the right file.
    pub fn info(&self, i: usize) -> Result<(Rc<str>, Option<usize>), LineStoreError> {
        let inner = self.inner.borrow();
        match inner.lines.get(i) {
            Some(line) => Ok((Rc::clone(&line.source), Some(line.offset))),
            None => {
                if i == inner.lines.len() {
                    if let Some(last) = inner.lines.last() {
                        return Ok((Rc::clone(&last.source), None));
                    }
                }
                Err(LineStoreError::OutOfRange {
                    index: i,
                    len: inner.lines.len(),
                })
            }
        }
    }

    pub fn source(&self, i: usize) -> Result<Rc<str>, LineStoreError> {
        self.info(i).map(|(source, _)| source)
    }

    pub fn offset(&self, i: usize) -> Result<Option<usize>, LineStoreError> {
        self.info(i).map(|(_, offset)| offset)
    }

    /// All line texts, in order.
    pub fn texts(&self) -> Vec<String> {
        self.inner
            .borrow()
            .lines
            .iter()
            .map(|line| line.text.clone())
            .collect()
    }

    /// `(source, offset, text)` triples, in order.
    pub fn xitems(&self) -> Vec<(Rc<str>, usize, String)> {
        self.inner
            .borrow()
            .lines
            .iter()
            .map(|line| (Rc::clone(&line.source), line.offset, line.text.clone()))
            .collect()
    }

    pub fn join(&self, sep: &str) -> String {
        self.texts().join(sep)
    }

    /// Child view over `[start, end)`. The child owns a copy of the lines
    /// and remembers its offset in `self` for destructive write-back.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let inner = self.inner.borrow();
        let end = end.min(inner.lines.len());
        let start = start.min(end);
        let lines = inner.lines[start..end].to_vec();
        Self {
            inner: Rc::new(RefCell::new(Inner {
                lines,
                parent: Some((self.clone(), start)),
            })),
        }
    }

    /// Drop the parent link; later edits stay local.
    pub fn disconnect(&self) {
        self.inner.borrow_mut().parent = None;
    }

    /// Remove `n` lines from the start without parent propagation. The
    /// view's offset within its parent shifts so later write-backs still map
    /// correctly.
    pub fn trim_start(&self, n: usize) -> Result<(), LineStoreError> {
        let mut inner = self.inner.borrow_mut();
        if n > inner.lines.len() {
            return Err(LineStoreError::BadTrim {
                requested: n,
                len: inner.lines.len(),
            });
        }
        inner.lines.drain(..n);
        if let Some((_, parent_offset)) = inner.parent.as_mut() {
            *parent_offset += n;
        }
        Ok(())
    }

    /// Remove `n` lines from the end without parent propagation.
    pub fn trim_end(&self, n: usize) -> Result<(), LineStoreError> {
        let mut inner = self.inner.borrow_mut();
        if n > inner.lines.len() {
            return Err(LineStoreError::BadTrim {
                requested: n,
                len: inner.lines.len(),
            });
        }
        let keep = inner.lines.len() - n;
        inner.lines.truncate(keep);
        Ok(())
    }

    /// Remove line `i`, writing the removal back through the parent chain.
    pub fn pop(&self, i: usize) -> Result<Line, LineStoreError> {
        self.remove_range(i, 1).map(|mut lines| lines.remove(0))
    }

    /// Remove `n` lines starting at `start`, with parent write-back.
    pub fn remove_range(&self, start: usize, n: usize) -> Result<Vec<Line>, LineStoreError> {
        let (removed, parent) = {
            let mut inner = self.inner.borrow_mut();
            let len = inner.lines.len();
            if start + n > len {
                return Err(LineStoreError::OutOfRange {
                    index: start + n,
                    len,
                });
            }
            let removed: Vec<Line> = inner.lines.drain(start..start + n).collect();
            (removed, inner.parent.clone())
        };
        if let Some((parent, parent_offset)) = parent {
            parent.remove_range(parent_offset + start, n)?;
        }
        Ok(removed)
    }

    /// Strip `width` leading columns from each line in `[start, end)`.
    /// Local to this view; shorter lines lose what they have.
    pub fn trim_left(&self, width: usize, start: usize, end: usize) {
        let mut inner = self.inner.borrow_mut();
        let end = end.min(inner.lines.len());
        for line in &mut inner.lines[start.min(end)..end] {
            let cut = line
                .text
                .char_indices()
                .nth(width)
                .map(|(i, _)| i)
                .unwrap_or(line.text.len());
            line.text.drain(..cut);
        }
    }

    /// Replace the text of line `i` (provenance kept).
    pub fn set_text(&self, i: usize, text: String) -> Result<(), LineStoreError> {
        let mut inner = self.inner.borrow_mut();
        let len = inner.lines.len();
        match inner.lines.get_mut(i) {
            Some(line) => {
                line.text = text;
                Ok(())
            }
            None => Err(LineStoreError::OutOfRange { index: i, len }),
        }
    }

    pub fn push(&self, line: Line) {
        self.inner.borrow_mut().lines.push(line);
    }

    pub fn extend(&self, lines: Vec<Line>) {
        self.inner.borrow_mut().lines.extend(lines);
    }

    pub fn is_blank(&self, i: usize) -> bool {
        self.inner
            .borrow()
            .lines
            .get(i)
            .map(|line| line.text.trim().is_empty())
            .unwrap_or(true)
    }
}

impl fmt::Debug for LineStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineStore")
            .field("lines", &self.texts())
            .field("has_parent", &self.inner.borrow().parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(text: &str) -> LineStore {
        LineStore::from_source(text, 8, true, Rc::from("test.rst"))
    }

    #[test]
    fn test_from_source_normalizes() {
        let s = store("plain\n\tindented   \nvert\u{000b}tab");
        assert_eq!(
            s.texts(),
            vec!["plain", "        indented", "vert tab"]
        );
    }

    #[test]
    fn test_info_one_past_end() {
        let s = store("a\nb");
        let (source, offset) = s.info(2).unwrap();
        assert_eq!(&*source, "test.rst");
        assert_eq!(offset, None);
        assert!(s.info(3).is_err());
    }

    #[test]
    fn test_info_empty_store() {
        let s = LineStore::empty();
        assert!(s.info(0).is_err());
    }

    #[test]
    fn test_slice_keeps_provenance() {
        let s = store("a\nb\nc\nd");
        let child = s.slice(1, 3);
        assert_eq!(child.texts(), vec!["b", "c"]);
        assert_eq!(child.offset(0).unwrap(), Some(1));
        assert_eq!(child.offset(1).unwrap(), Some(2));
    }

    #[test]
    fn test_pop_propagates_to_parent() {
        let s = store("a\nb\nc\nd");
        let child = s.slice(1, 3);
        let removed = child.pop(0).unwrap();
        assert_eq!(removed.text, "b");
        assert_eq!(child.texts(), vec!["c"]);
        assert_eq!(s.texts(), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_disconnect_stops_propagation() {
        let s = store("a\nb\nc");
        let child = s.slice(0, 2);
        child.disconnect();
        child.pop(1).unwrap();
        assert_eq!(s.texts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_trim_start_shifts_parent_offset() {
        let s = store("a\nb\nc\nd");
        let child = s.slice(0, 4);
        child.trim_start(2).unwrap();
        assert_eq!(child.texts(), vec!["c", "d"]);
        // Write-back after the trim maps to the shifted position.
        child.pop(0).unwrap();
        assert_eq!(s.texts(), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_trim_too_large() {
        let s = store("a");
        assert_eq!(
            s.trim_start(2),
            Err(LineStoreError::BadTrim { requested: 2, len: 1 })
        );
        assert_eq!(
            s.trim_end(5),
            Err(LineStoreError::BadTrim { requested: 5, len: 1 })
        );
    }

    #[test]
    fn test_trim_left() {
        let s = store("    one\n      two\nthree");
        s.trim_left(4, 0, 2);
        assert_eq!(s.texts(), vec!["one", "  two", "three"]);
    }
}
