//! Small conversion utilities shared by the block states and directives.

pub mod roman;
pub mod unicode;

pub use roman::{parse_roman, to_roman, RomanError};
pub use unicode::{column_width, parse_code_point, CodePointError};
