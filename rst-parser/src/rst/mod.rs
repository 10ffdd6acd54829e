//! Main module for the reStructuredText parser.

pub mod ast;
pub mod diagnostics;
pub mod directives;
pub mod inlines;
pub mod lines;
pub mod options;
pub mod parsing;
pub mod testing;
pub mod util;

use std::rc::Rc;

use crate::rst::ast::{Document, NodeKind};
use crate::rst::diagnostics::Reporter;
use crate::rst::inlines::Inliner;
use crate::rst::lines::LineStore;
use crate::rst::options::ParserOptions;
use crate::rst::parsing::{Memo, StateKind, StateMachine};

/// Errors that abort a parse. Syntax problems never take this path; they are
/// reported as system messages in the tree and the parse runs to completion.
#[derive(Debug, Clone)]
pub enum ParserError {
    /// A diagnostic reached the configured halt level.
    Halted(diagnostics::Diagnostic),
    /// An unreachable branch was hit. This is a bug in the parser, not
    /// malformed input.
    Internal(String),
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserError::Halted(diag) => {
                write!(f, "parsing halted: {}", diag)
            }
            ParserError::Internal(msg) => write!(f, "internal parser error: {}", msg),
        }
    }
}

impl std::error::Error for ParserError {}

/// Parse `text` into a [`Document`].
///
/// `source_id` labels every line's provenance and ends up on the nodes and
/// diagnostics produced from those lines.
pub fn parse(source_id: &str, text: &str, options: &ParserOptions) -> Result<Document, ParserError> {
    let source: Rc<str> = Rc::from(source_id);
    let store = LineStore::from_source(text, options.tab_width, true, Rc::clone(&source));
    let document = Document::new(Rc::clone(&source), options);
    let root = document.root();
    let mut memo = Memo {
        document,
        reporter: Reporter::new(options.report_level, options.halt_level),
        inliner: Inliner::new(options),
        title_styles: Vec::new(),
        section_level: 0,
        section_bubble_up_kludge: false,
        options: options.clone(),
    };
    let mut machine = StateMachine::new(StateKind::Body, true);
    machine.run(store, 0, root, &mut memo)?;
    let Memo {
        mut document,
        reporter,
        ..
    } = memo;
    document.diagnostics = reporter.into_diagnostics();
    debug_assert_eq!(document.node(root).kind, NodeKind::Document);
    Ok(document)
}
