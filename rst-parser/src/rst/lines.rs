//! Line buffer with provenance.
//!
//! Source text is normalized into [`Line`]s up front (tab expansion,
//! trailing-whitespace trim, optional exotic-whitespace conversion); from
//! then on every stage of the parser works on a [`LineStore`]. A store can
//! hand out child views over a sub-range that remember where they came from,
//! so removals made while parsing a nested block write back into the parent
//! buffer.

pub mod blocks;
pub mod store;

pub use blocks::{IndentedBlock, UnexpectedIndentation};
pub use store::{Line, LineStore, LineStoreError};
