//! Parser configuration.
//!
//! One `ParserOptions` value configures a parse. The directive and role
//! registries ride along here so extension lookup is a property of the
//! configuration, not of global state; the registry itself is immutable and
//! cheap to share between parses.

use std::rc::Rc;

use crate::rst::directives::DirectiveRegistry;

/// Recognized configuration options for a parse.
#[derive(Clone)]
pub struct ParserOptions {
    /// Width of a tab expansion, in spaces.
    pub tab_width: usize,
    /// Right-trim whitespace before an inline footnote reference.
    pub trim_footnote_reference_space: bool,
    /// Prefix attached to generated ids.
    pub id_prefix: String,
    /// Prefix for synthetic ids generated when no name yields one.
    pub auto_id_prefix: String,
    /// Minimum severity surfaced in the diagnostics list (1=info .. 4=severe).
    pub report_level: u8,
    /// Severity that aborts further parsing (5 = never).
    pub halt_level: u8,
    /// Inline markup boundaries are character-relative instead of
    /// whitespace/punctuation relative.
    pub character_level_inline_markup: bool,
    /// Directive and role lookup.
    pub registry: Rc<DirectiveRegistry>,
}

impl ParserOptions {
    pub fn new() -> Self {
        Self {
            tab_width: 8,
            trim_footnote_reference_space: false,
            id_prefix: String::new(),
            auto_id_prefix: "id".to_string(),
            report_level: 1,
            halt_level: 5,
            character_level_inline_markup: false,
            registry: Rc::new(DirectiveRegistry::standard()),
        }
    }

    /// Builder-style override used throughout the test suites.
    pub fn with_registry(mut self, registry: Rc<DirectiveRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParserOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserOptions")
            .field("tab_width", &self.tab_width)
            .field(
                "trim_footnote_reference_space",
                &self.trim_footnote_reference_space,
            )
            .field("id_prefix", &self.id_prefix)
            .field("auto_id_prefix", &self.auto_id_prefix)
            .field("report_level", &self.report_level)
            .field("halt_level", &self.halt_level)
            .field(
                "character_level_inline_markup",
                &self.character_level_inline_markup,
            )
            .finish_non_exhaustive()
    }
}
