//! Testing support.
//!
//! The integration suites assert deep structure through [`assert_doc`], a
//! fluent builder over a parsed document. Verify content and structure,
//! not just counts; system messages count as ordinary children, so tests
//! over malformed input state where the message lands.

pub mod asserts;

pub use asserts::{assert_doc, parse_fixture, NodeAssert};
