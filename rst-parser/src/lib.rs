//! # rst-parser
//!
//! A parser for the reStructuredText dialect used by the documentation
//! toolchain. Input is UTF-8 source text; output is a [`Document`] holding
//! the abstract syntax tree, structured diagnostics, and the cross-reference
//! target bookkeeping the post-processing passes consume.
//!
//! File Layout
//!
//! The parser is line-oriented: a recursive state machine drives block
//! recognition, indented sub-blocks recurse through nested machines, and
//! terminal text is handed to the inline tokenizer. The layout follows that
//! flow:
//!
//! src/rst
//!   ├── lines        Line buffer with provenance and indented-block extraction
//!   ├── parsing      State machine, transition patterns, block states
//!   ├── inlines      Inline markup tokenizer and escape handling
//!   ├── directives   Directive/role registry and the directive runtime
//!   ├── ast          Node arena, document bookkeeping, identifiers
//!   └── testing      Assertion helpers for the test suites
//!
//! For testing guidelines see the [testing module](rst::testing). Parser
//! tests assert deep structure through the assertion builder rather than
//! node counts alone.

pub mod rst;

pub use rst::ast::{AttrValue, Document, Node, NodeId, NodeKind};
pub use rst::diagnostics::{Diagnostic, Severity};
pub use rst::options::ParserOptions;
pub use rst::{parse, ParserError};
