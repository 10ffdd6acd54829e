//! Diagnostic collection.
//!
//! All user-facing conditions flow through the [`Reporter`]: each one becomes
//! a [`Diagnostic`] in a parallel list and, where the caller asks for it, a
//! `SystemMessage` node anchored in the tree near the offending location.
//! Parsing continues after any diagnostic unless its severity reaches the
//! configured halt level.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::rst::ast::{AttrValue, Document, NodeId, NodeKind};

/// Diagnostic severity levels, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info = 1,
    Warning = 2,
    Error = 3,
    Severe = 4,
}

impl Severity {
    pub fn level(self) -> u8 {
        self as u8
    }

    /// The system-message `type` attribute spelling.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Severe => "SEVERE",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Severe => write!(f, "severe"),
        }
    }
}

/// A structured diagnostic, independent of its tree anchoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub source: Option<String>,
    pub line: Option<usize>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let (Some(source), Some(line)) = (&self.source, self.line) {
            write!(f, " ({}:{})", source, line)?;
        }
        Ok(())
    }
}

/// Collects diagnostics and tracks the halt condition.
#[derive(Debug)]
pub struct Reporter {
    report_level: u8,
    halt_level: u8,
    diagnostics: Vec<Diagnostic>,
    halted: Option<Diagnostic>,
}

impl Reporter {
    pub fn new(report_level: u8, halt_level: u8) -> Self {
        Self {
            report_level,
            halt_level,
            diagnostics: Vec::new(),
            halted: None,
        }
    }

    /// Record a diagnostic. Severities below the report level are dropped
    /// from the list; the tree node is the caller's business either way.
    pub fn report(&mut self, diag: Diagnostic) {
        if diag.severity.level() >= self.halt_level && self.halted.is_none() {
            self.halted = Some(diag.clone());
        }
        if diag.severity.level() >= self.report_level {
            self.diagnostics.push(diag);
        }
    }

    pub fn halted(&self) -> Option<&Diagnostic> {
        self.halted.as_ref()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Options for building a system message node.
#[derive(Debug, Default)]
pub struct MessageArgs {
    pub source: Option<Rc<str>>,
    pub line: Option<usize>,
    /// Raw source text attached as a literal block child.
    pub literal: Option<String>,
    /// Ids of nodes this message refers back to.
    pub backrefs: Vec<String>,
}

/// Build a `SystemMessage` node and record the matching diagnostic.
///
/// The node carries a paragraph with the message text, an optional literal
/// block with the offending source, and `level`/`type`/`line` attributes.
pub fn system_message(
    document: &mut Document,
    reporter: &mut Reporter,
    severity: Severity,
    message: &str,
    args: MessageArgs,
) -> NodeId {
    let source = args.source.clone().or_else(|| {
        document
            .current_source
            .as_ref()
            .map(Rc::clone)
    });
    reporter.report(Diagnostic {
        severity,
        message: message.to_string(),
        source: source.as_deref().map(str::to_string),
        line: args.line.or(document.current_line),
    });
    let msg = document.new_node(NodeKind::SystemMessage, message);
    let line = args.line.or(document.current_line);
    {
        let node = document.node_mut(msg);
        node.source = source;
        node.line = line;
        node.attrs
            .insert("level".to_string(), AttrValue::Int(severity.level() as i64));
        node.attrs.insert(
            "type".to_string(),
            AttrValue::Str(severity.label().to_string()),
        );
        if !args.backrefs.is_empty() {
            node.attrs
                .insert("backrefs".to_string(), AttrValue::StrList(args.backrefs));
        }
    }
    let para = document.new_node(NodeKind::Paragraph, message);
    let text = document.new_text(message);
    document.append(para, text);
    document.append(msg, para);
    if let Some(block_text) = args.literal {
        let literal = document.new_node(NodeKind::LiteralBlock, &block_text);
        let text = document.new_text(&block_text);
        document.append(literal, text);
        document.append(msg, literal);
    }
    msg
}
