//! The state machine: line cursor, run loop, nested machines.

use std::rc::Rc;

use crate::rst::ast::{Document, NodeId};
use crate::rst::diagnostics::Reporter;
use crate::rst::inlines::Inliner;
use crate::rst::lines::{IndentedBlock, LineStore, UnexpectedIndentation};
use crate::rst::options::ParserOptions;
use crate::rst::parsing::states::{self, EnumContext, StateKind};
use crate::rst::parsing::{Context, Signal};
use crate::rst::ParserError;

/// A section title style: underline only, or overline + underline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleStyle {
    pub over: Option<char>,
    pub under: char,
}

/// Shared parse state: the document under construction plus everything the
/// block states and nested machines need. Passed `&mut` through every
/// handler so no global state exists.
pub struct Memo {
    pub document: Document,
    pub reporter: Reporter,
    pub inliner: Inliner,
    pub title_styles: Vec<TitleStyle>,
    pub section_level: usize,
    pub section_bubble_up_kludge: bool,
    pub options: ParserOptions,
}

/// Observer callback: receives the current (source, offset) after every
/// cursor move.
pub type ObserverFn = Box<dyn FnMut(Option<&str>, Option<usize>)>;

/// Per-run data consumed by specialized states.
#[derive(Debug)]
pub struct StateData {
    /// The bullet character a BulletList accepts.
    pub bullet: char,
    /// Enumerated list sequence context.
    pub enum_ctx: Option<EnumContext>,
    /// Quote character of a quoted literal block, once seen.
    pub quote_char: Option<char>,
    /// First line of the quoted literal block.
    pub initial_lineno: usize,
    /// Messages a state accumulates for its eof handler.
    pub messages: Vec<NodeId>,
    /// Cleared around section creation so a bubbled-up EOF does not read
    /// the pending marker as a transition.
    pub eofcheck: bool,
}

impl Default for StateData {
    fn default() -> Self {
        Self {
            bullet: '\u{0}',
            enum_ctx: None,
            quote_char: None,
            initial_lineno: 0,
            messages: Vec::new(),
            eofcheck: true,
        }
    }
}

/// The line-driven deterministic engine.
pub struct StateMachine {
    input: LineStore,
    input_offset: usize,
    /// Index of the current line within `input`; -1 before the first line.
    line_offset: isize,
    pub(crate) current_state: StateKind,
    initial_state: StateKind,
    pub match_titles: bool,
    /// Insertion point for nodes produced by the current state.
    pub node: NodeId,
    /// Whether the last consumed block ended on a blank line or EOF.
    pub blank_finish: bool,
    pub(crate) data: StateData,
    observers: Vec<ObserverFn>,
    /// 1-slot reuse pool for nested machines.
    nested_pool: Option<Box<StateMachine>>,
}

impl StateMachine {
    pub fn new(initial_state: StateKind, match_titles: bool) -> Self {
        Self {
            input: LineStore::empty(),
            input_offset: 0,
            line_offset: -1,
            current_state: initial_state,
            initial_state,
            match_titles,
            node: NodeId(0),
            blank_finish: true,
            data: StateData::default(),
            observers: Vec::new(),
            nested_pool: None,
        }
    }

    pub fn add_observer(&mut self, observer: ObserverFn) {
        self.observers.push(observer);
    }

    fn notify_observers(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let info = if self.line_offset >= 0 {
            self.input.info(self.line_offset as usize).ok()
        } else {
            None
        };
        for observer in &mut self.observers {
            match &info {
                Some((source, offset)) => observer(Some(source), *offset),
                None => observer(None, None),
            }
        }
    }

    // -- cursor -----------------------------------------------------------

    /// The current line's text; `None` before the first or past the last.
    pub fn line(&self) -> Option<String> {
        if self.line_offset < 0 {
            return None;
        }
        self.input.text(self.line_offset as usize).ok()
    }

    pub fn line_offset(&self) -> isize {
        self.line_offset
    }

    pub fn input(&self) -> &LineStore {
        &self.input
    }

    /// Advance `n` lines. Moving past the end parks the cursor there and
    /// signals EOF.
    pub fn next_line(&mut self, n: isize) -> Result<(), Signal> {
        self.line_offset += n;
        let ok = self.line_offset >= 0 && (self.line_offset as usize) < self.input.len();
        self.notify_observers();
        if ok {
            Ok(())
        } else {
            Err(Signal::Eof)
        }
    }

    pub fn previous_line(&mut self, n: isize) {
        self.line_offset -= n;
        if self.line_offset < -1 {
            self.line_offset = -1;
        }
        self.notify_observers();
    }

    /// Jump to an absolute (document-wide) line offset.
    pub fn goto_line(&mut self, abs_offset: usize) {
        self.line_offset = abs_offset as isize - self.input_offset as isize;
        self.notify_observers();
    }

    pub fn at_eof(&self) -> bool {
        self.line_offset >= 0 && self.line_offset as usize >= self.input.len().saturating_sub(1)
    }

    pub fn is_next_line_blank(&self) -> bool {
        let next = self.line_offset + 1;
        if next < 0 || next as usize >= self.input.len() {
            return true;
        }
        self.input.is_blank(next as usize)
    }

    /// Absolute offset (0-based) of the current line.
    pub fn abs_line_offset(&self) -> usize {
        (self.line_offset + self.input_offset as isize).max(0) as usize
    }

    /// Absolute 1-based number of the current line.
    pub fn abs_line_number(&self) -> usize {
        (self.line_offset + self.input_offset as isize + 1).max(0) as usize
    }

    /// Provenance of the current line (or of absolute line `lineno`).
    pub fn get_source_and_line(
        &self,
        lineno: Option<usize>,
    ) -> (Option<Rc<str>>, Option<usize>) {
        let index = match lineno {
            Some(abs) => abs as isize - 1 - self.input_offset as isize,
            None => self.line_offset,
        };
        if index < 0 {
            return (None, None);
        }
        match self.input.info(index as usize) {
            Ok((source, offset)) => (Some(source), offset.map(|o| o + 1)),
            Err(_) => (None, None),
        }
    }

    // -- block extraction -------------------------------------------------

    /// The contiguous text block starting at the current line; the cursor
    /// lands on its last line. On unexpected indentation the cursor still
    /// advances over the partial block.
    pub fn get_text_block(
        &mut self,
        flush_left: bool,
    ) -> Result<LineStore, UnexpectedIndentation> {
        let start = self.line_offset.max(0) as usize;
        match self.input.get_text_block(start, flush_left) {
            Ok(block) => {
                if !block.is_empty() {
                    let _ = self.next_line(block.len() as isize - 1);
                }
                Ok(block)
            }
            Err(err) => {
                if !err.block.is_empty() {
                    let _ = self.next_line(err.block.len() as isize - 1);
                }
                Err(err)
            }
        }
    }

    /// An indented block starting at the current line, leading blank lines
    /// stripped. Returns `(block, indent, abs offset of first kept line,
    /// blank_finish)`.
    pub fn get_indented(
        &mut self,
        until_blank: bool,
        strip_indent: bool,
    ) -> (LineStore, usize, usize, bool) {
        let mut offset = self.abs_line_offset();
        let start = self.line_offset.max(0) as usize;
        let IndentedBlock {
            block,
            indent,
            blank_finish,
        } = self
            .input
            .get_indented(start, until_blank, strip_indent, None, None);
        if !block.is_empty() {
            let _ = self.next_line(block.len() as isize - 1);
        }
        while !block.is_empty() && block.is_blank(0) {
            let _ = block.trim_start(1);
            offset += 1;
        }
        (block, indent, offset, blank_finish)
    }

    /// An indented block whose indent is known for every line.
    pub fn get_known_indented(
        &mut self,
        indent: usize,
        until_blank: bool,
        strip_indent: bool,
    ) -> (LineStore, usize, bool) {
        let mut offset = self.abs_line_offset();
        let start = self.line_offset.max(0) as usize;
        let IndentedBlock {
            block,
            blank_finish,
            ..
        } = self
            .input
            .get_indented(start, until_blank, strip_indent, Some(indent), None);
        if !block.is_empty() {
            let _ = self.next_line(block.len() as isize - 1);
        }
        while !block.is_empty() && block.is_blank(0) {
            let _ = block.trim_start(1);
            offset += 1;
        }
        (block, offset, blank_finish)
    }

    /// An indented block where only the first line's indent is known (the
    /// width of a marker such as `.. `). `strip_top` drops leading blank
    /// lines after the first.
    pub fn get_first_known_indented(
        &mut self,
        indent: usize,
        until_blank: bool,
        strip_indent: bool,
        strip_top: bool,
    ) -> (LineStore, usize, usize, bool) {
        let mut offset = self.abs_line_offset();
        let start = self.line_offset.max(0) as usize;
        let IndentedBlock {
            block,
            indent: found,
            blank_finish,
        } = self
            .input
            .get_indented(start, until_blank, strip_indent, None, Some(indent));
        if !block.is_empty() {
            let _ = self.next_line(block.len() as isize - 1);
        }
        if strip_top {
            while !block.is_empty() && block.is_blank(0) {
                let _ = block.trim_start(1);
                offset += 1;
            }
        }
        (block, found, offset, blank_finish)
    }

    // -- run loop ---------------------------------------------------------

    /// Drive the machine over `input`, appending nodes under `node`.
    pub fn run(
        &mut self,
        input: LineStore,
        input_offset: usize,
        node: NodeId,
        memo: &mut Memo,
    ) -> Result<(), ParserError> {
        self.input = input;
        self.input_offset = input_offset;
        self.line_offset = -1;
        self.node = node;
        self.current_state = self.initial_state;
        let mut context: Context = Vec::new();
        let mut restrict: Option<&'static str> = None;
        loop {
            if let Some(diag) = memo.reporter.halted() {
                return Err(ParserError::Halted(diag.clone()));
            }
            let step = match self.next_line(1) {
                Ok(()) => self.check_line(&mut context, restrict.take(), memo),
                Err(signal) => Err(signal),
            };
            // An EOF here ends the run, unless the state's eof handler
            // itself issues a correction (short transition markers do).
            let step = match step {
                Err(Signal::Eof) => match states::eof(self, &mut context, memo) {
                    Ok(()) => break,
                    Err(signal) => Err(signal),
                },
                other => other,
            };
            match step {
                Ok(next) => self.current_state = next,
                Err(Signal::TransitionCorrection(name)) => {
                    self.previous_line(1);
                    restrict = Some(name);
                }
                Err(Signal::StateCorrection(state, name)) => {
                    self.previous_line(1);
                    self.current_state = state;
                    restrict = name;
                }
                Err(Signal::Fatal(error)) => return Err(error),
                Err(Signal::Eof) => {
                    return Err(ParserError::Internal(
                        "eof signalled from an eof handler".to_string(),
                    ))
                }
            }
        }
        if let Some(diag) = memo.reporter.halted() {
            return Err(ParserError::Halted(diag.clone()));
        }
        Ok(())
    }

    fn check_line(
        &mut self,
        context: &mut Context,
        restrict: Option<&'static str>,
        memo: &mut Memo,
    ) -> Result<StateKind, Signal> {
        let line = self.line().unwrap_or_default();
        {
            let (source, lineno) = self.get_source_and_line(None);
            memo.document.current_source = source.or_else(|| Some(Rc::clone(&memo.document.source)));
            memo.document.current_line = lineno;
        }
        let table = states::transitions(self.current_state);
        for def in table {
            if let Some(only) = restrict {
                if def.name != only {
                    continue;
                }
            }
            if let Some(caps) = def.pattern.captures(&line) {
                return states::dispatch(self, def, &line, &caps, context, memo);
            }
        }
        Err(Signal::Fatal(ParserError::Internal(format!(
            "no transition pattern match in state {:?} for line {:?}",
            self.current_state, line
        ))))
    }

    // -- nested machines --------------------------------------------------

    /// Parse `block` with a nested machine rooted at `node`. Returns the
    /// nested machine's final absolute line offset.
    pub fn nested_parse(
        &mut self,
        block: LineStore,
        input_offset: usize,
        node: NodeId,
        match_titles: bool,
        memo: &mut Memo,
    ) -> Result<usize, ParserError> {
        // The default configuration reuses a pooled machine.
        let mut nested = match self.nested_pool.take() {
            Some(mut machine) if !match_titles => {
                machine.initial_state = StateKind::Body;
                machine.current_state = StateKind::Body;
                machine.match_titles = false;
                machine
            }
            other => {
                self.nested_pool = other;
                Box::new(StateMachine::new(StateKind::Body, match_titles))
            }
        };
        nested.data = StateData::default();
        nested.blank_finish = true;
        let result = nested.run(block, input_offset, node, memo);
        let new_offset = nested.abs_line_offset();
        if !nested.match_titles {
            nested.input = LineStore::empty();
            self.nested_pool = Some(nested);
        }
        result?;
        Ok(new_offset)
    }

    /// Parse `block` with a specialized state (list continuations and the
    /// like). Returns `(final absolute offset, blank_finish)`.
    #[allow(clippy::too_many_arguments)]
    pub fn nested_list_parse(
        &mut self,
        block: LineStore,
        input_offset: usize,
        node: NodeId,
        initial_state: StateKind,
        blank_finish: bool,
        match_titles: bool,
        data: StateData,
        memo: &mut Memo,
    ) -> Result<(usize, bool), ParserError> {
        let mut nested = Box::new(StateMachine::new(initial_state, match_titles));
        nested.blank_finish = blank_finish;
        nested.data = data;
        let result = nested.run(block, input_offset, node, memo);
        let new_offset = nested.abs_line_offset();
        let blank_finish = nested.blank_finish;
        result?;
        Ok((new_offset, blank_finish))
    }
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("state", &self.current_state)
            .field("line_offset", &self.line_offset)
            .field("input_offset", &self.input_offset)
            .field("match_titles", &self.match_titles)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn machine_over(text: &str) -> StateMachine {
        let mut machine = StateMachine::new(StateKind::Body, true);
        machine.input = LineStore::from_source(text, 8, true, Rc::from("test.rst"));
        machine
    }

    #[test]
    fn test_cursor_movement() {
        let mut machine = machine_over("a\nb\nc");
        assert!(machine.line().is_none());
        machine.next_line(1).unwrap();
        assert_eq!(machine.line().as_deref(), Some("a"));
        assert_eq!(machine.abs_line_number(), 1);
        machine.next_line(2).unwrap();
        assert_eq!(machine.line().as_deref(), Some("c"));
        assert!(machine.at_eof());
        assert!(matches!(machine.next_line(1), Err(Signal::Eof)));
    }

    #[test]
    fn test_observers_see_provenance() {
        let seen: Rc<RefCell<Vec<Option<usize>>>> = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let mut machine = machine_over("a\nb");
        machine.add_observer(Box::new(move |_, offset| {
            log.borrow_mut().push(offset);
        }));
        machine.next_line(1).unwrap();
        machine.next_line(1).unwrap();
        machine.previous_line(1);
        assert_eq!(&*seen.borrow(), &[Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn test_get_indented_strips_leading_blanks() {
        let mut machine = machine_over("  one\n\n  two\nout");
        machine.next_line(1).unwrap();
        let (block, indent, offset, blank_finish) = machine.get_indented(false, true);
        assert_eq!(indent, 2);
        assert_eq!(offset, 0);
        assert_eq!(block.texts(), vec!["one", "", "two"]);
        assert!(!blank_finish);
        // Cursor sits on the block's last line.
        assert_eq!(machine.line().as_deref(), Some("  two"));
    }

    #[test]
    fn test_get_first_known_indented() {
        let mut machine = machine_over(".. a comment\n   continued");
        machine.next_line(1).unwrap();
        let (block, _indent, offset, blank_finish) =
            machine.get_first_known_indented(3, false, true, true);
        assert_eq!(block.texts(), vec!["a comment", "continued"]);
        assert_eq!(offset, 0);
        assert!(blank_finish);
    }
}
