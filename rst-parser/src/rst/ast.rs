//! The abstract syntax tree.
//!
//! Nodes live in an arena owned by the [`Document`]; parent and child links
//! are [`NodeId`] indices, which keeps the back-links the post-processing
//! passes rely on without reference cycles. The document also carries the
//! cross-reference bookkeeping (ids, names, reference targets, footnotes,
//! citations, substitutions) that later passes resolve against.

pub mod document;
pub mod ids;
pub mod node;
pub mod snapshot;

pub use document::Document;
pub use ids::{fully_normalize_name, make_id, whitespace_normalize_name};
pub use node::{AttrValue, Node, NodeId, NodeKind};
pub use snapshot::AstSnapshot;
