//! Block states and transition dispatch.
//!
//! Every state is a variant of [`StateKind`] with an ordered transition
//! table; [`dispatch`] routes a matched transition to its handler. The
//! specialized list states accept only the construct they track and return
//! control to the enclosing machine (an `Eof` signal) for anything else.

pub mod body;
pub mod explicit;
pub mod line;
pub mod text;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::rst::parsing::machine::{Memo, StateMachine};
use crate::rst::parsing::patterns;
use crate::rst::parsing::{Context, Signal, TxResult};

/// The available states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Body,
    BulletList,
    DefinitionList,
    EnumeratedList,
    FieldList,
    OptionList,
    LineBlock,
    ExtensionOptions,
    Explicit,
    Text,
    Definition,
    Line,
    SubstitutionDef,
    QuotedLiteralBlock,
}

impl StateKind {
    /// States sharing the Body transition table.
    fn is_body_family(self) -> bool {
        matches!(
            self,
            StateKind::Body
                | StateKind::BulletList
                | StateKind::DefinitionList
                | StateKind::EnumeratedList
                | StateKind::FieldList
                | StateKind::OptionList
                | StateKind::LineBlock
                | StateKind::ExtensionOptions
                | StateKind::Explicit
        )
    }
}

/// One transition: a name, a start-anchored pattern, and the default next
/// state when the handler does not redirect.
pub struct TransitionDef {
    pub name: &'static str,
    pub pattern: &'static Lazy<Regex>,
    pub next: StateKind,
}

static BODY_TABLE: &[TransitionDef] = &[
    TransitionDef {
        name: "blank",
        pattern: &patterns::BLANK,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "indent",
        pattern: &patterns::INDENT,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "bullet",
        pattern: &patterns::BULLET,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "enumerator",
        pattern: &patterns::ENUMERATOR,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "field_marker",
        pattern: &patterns::FIELD_MARKER,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "option_marker",
        pattern: &patterns::OPTION_MARKER,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "doctest",
        pattern: &patterns::DOCTEST,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "line_block",
        pattern: &patterns::LINE_BLOCK,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "explicit_markup",
        pattern: &patterns::EXPLICIT_MARKUP,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "anonymous",
        pattern: &patterns::ANONYMOUS,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "line",
        pattern: &patterns::LINE,
        next: StateKind::Body,
    },
    TransitionDef {
        name: "text",
        pattern: &patterns::TEXT,
        next: StateKind::Text,
    },
];

static TEXT_TABLE: &[TransitionDef] = &[
    TransitionDef {
        name: "blank",
        pattern: &patterns::BLANK,
        next: StateKind::Text,
    },
    TransitionDef {
        name: "indent",
        pattern: &patterns::INDENT,
        next: StateKind::Text,
    },
    TransitionDef {
        name: "underline",
        pattern: &patterns::UNDERLINE,
        next: StateKind::Text,
    },
    TransitionDef {
        name: "text",
        pattern: &patterns::TEXT,
        next: StateKind::Text,
    },
];

static SUBSTITUTION_DEF_TABLE: &[TransitionDef] = &[
    TransitionDef {
        name: "blank",
        pattern: &patterns::BLANK,
        next: StateKind::SubstitutionDef,
    },
    TransitionDef {
        name: "indent",
        pattern: &patterns::INDENT,
        next: StateKind::SubstitutionDef,
    },
    TransitionDef {
        name: "embedded_directive",
        pattern: &patterns::EMBEDDED_DIRECTIVE,
        next: StateKind::SubstitutionDef,
    },
    TransitionDef {
        name: "text",
        pattern: &patterns::TEXT,
        next: StateKind::SubstitutionDef,
    },
];

static QUOTED_LITERAL_TABLE: &[TransitionDef] = &[
    TransitionDef {
        name: "blank",
        pattern: &patterns::BLANK,
        next: StateKind::QuotedLiteralBlock,
    },
    TransitionDef {
        name: "indent",
        pattern: &patterns::INDENT,
        next: StateKind::QuotedLiteralBlock,
    },
    TransitionDef {
        name: "initial_quoted",
        pattern: &patterns::INITIAL_QUOTED,
        next: StateKind::QuotedLiteralBlock,
    },
    TransitionDef {
        name: "text",
        pattern: &patterns::TEXT,
        next: StateKind::QuotedLiteralBlock,
    },
];

/// The ordered transition table of `state`.
pub fn transitions(state: StateKind) -> &'static [TransitionDef] {
    match state {
        s if s.is_body_family() => BODY_TABLE,
        StateKind::Text | StateKind::Definition | StateKind::Line => TEXT_TABLE,
        StateKind::SubstitutionDef => SUBSTITUTION_DEF_TABLE,
        StateKind::QuotedLiteralBlock => QUOTED_LITERAL_TABLE,
        _ => unreachable!("state covered by body family"),
    }
}

/// Enumerator format: `(i)`, `i)`, or `i.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFormat {
    Parens,
    Rparen,
    Period,
}

impl EnumFormat {
    pub fn prefix(self) -> &'static str {
        match self {
            EnumFormat::Parens => "(",
            EnumFormat::Rparen | EnumFormat::Period => "",
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            EnumFormat::Parens | EnumFormat::Rparen => ")",
            EnumFormat::Period => ".",
        }
    }
}

/// Enumerator sequence kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSequence {
    Arabic,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl EnumSequence {
    pub fn name(self) -> &'static str {
        match self {
            EnumSequence::Arabic => "arabic",
            EnumSequence::LowerAlpha => "loweralpha",
            EnumSequence::UpperAlpha => "upperalpha",
            EnumSequence::LowerRoman => "lowerroman",
            EnumSequence::UpperRoman => "upperroman",
        }
    }
}

/// Per-list context carried by an EnumeratedList state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumContext {
    pub format: EnumFormat,
    pub sequence: EnumSequence,
    pub last_ordinal: u32,
    /// The list has seen a `#` auto-enumerator.
    pub auto: bool,
}

/// Route a matched transition to its handler.
pub fn dispatch(
    machine: &mut StateMachine,
    def: &TransitionDef,
    line: &str,
    caps: &Captures<'_>,
    context: &mut Context,
    memo: &mut Memo,
) -> TxResult {
    let state = machine.current_state;
    let next = def.next;
    match (state, def.name) {
        // -- shared no-ops -------------------------------------------------
        (StateKind::LineBlock, "blank") => Err(invalid_input(machine)),
        (s, "blank") if s.is_body_family() => Ok(s),
        (StateKind::SubstitutionDef, "blank") => Ok(state),

        // -- Body ----------------------------------------------------------
        (StateKind::Body, "indent") | (StateKind::SubstitutionDef, "indent") => {
            body::indent(machine, memo)
        }
        (StateKind::Body, "bullet") => body::bullet(machine, line, caps, memo),
        (StateKind::Body, "enumerator") => body::enumerator(machine, line, caps, memo),
        (StateKind::Body, "field_marker") => body::field_marker(machine, line, caps, memo),
        (StateKind::Body, "option_marker") => body::option_marker(machine, line, caps, memo),
        (s, "doctest") if s == StateKind::Body || s == StateKind::SubstitutionDef => {
            body::doctest(machine, memo)
        }
        (StateKind::Body, "line_block") => body::line_block(machine, line, caps, memo),
        (StateKind::Body, "explicit_markup") => body::explicit_markup(machine, line, caps, memo),
        (StateKind::Body, "anonymous") => body::anonymous(machine, line, caps, memo),
        (StateKind::Body, "line") => body::line(machine, line, context, memo),
        (StateKind::Body, "text") => {
            context.clear();
            context.push(line.to_string());
            Ok(next)
        }

        // -- specialized body states ----------------------------------------
        (StateKind::BulletList, "bullet") => body::bullet_item(machine, line, caps, memo),
        (StateKind::EnumeratedList, "enumerator") => {
            body::enumerator_item(machine, line, caps, memo)
        }
        (StateKind::FieldList, "field_marker") => body::field_item(machine, line, caps, memo),
        (StateKind::ExtensionOptions, "field_marker") => {
            body::extension_option_item(machine, line, caps, memo)
        }
        (StateKind::OptionList, "option_marker") => {
            body::option_item(machine, line, caps, memo)
        }
        (StateKind::LineBlock, "line_block") => body::line_block_item(machine, line, caps, memo),
        (StateKind::Explicit, "explicit_markup") => {
            body::explicit_item(machine, line, caps, memo)
        }
        (StateKind::Explicit, "anonymous") => body::anonymous_item(machine, line, caps, memo),
        (StateKind::DefinitionList, "text") => {
            context.clear();
            context.push(line.to_string());
            Ok(StateKind::Definition)
        }

        // -- substitution definitions ---------------------------------------
        (StateKind::SubstitutionDef, "embedded_directive") => {
            explicit::embedded_directive(machine, line, caps, memo)
        }
        (StateKind::SubstitutionDef, "text") => explicit::substitution_text(machine),

        // -- text family ----------------------------------------------------
        (StateKind::Text, "blank") => text::blank(machine, context, memo),
        (StateKind::Text, "indent") => text::indent(machine, context, memo),
        (StateKind::Text, "underline") => text::underline(machine, line, context, memo),
        (StateKind::Text, "text") => text::text(machine, context, memo),
        (StateKind::Definition, "indent") => text::definition_indent(machine, context, memo),
        (StateKind::Line, "blank") => line::blank(machine, context, memo),
        (StateKind::Line, "text") | (StateKind::Line, "indent") => {
            line::text(machine, line, context, memo)
        }
        (StateKind::Line, "underline") => line::underline(machine, line, context, memo),

        // -- quoted literal blocks ------------------------------------------
        (StateKind::QuotedLiteralBlock, "blank") => {
            if context.is_empty() {
                Ok(state)
            } else {
                Err(Signal::Eof)
            }
        }
        (StateKind::QuotedLiteralBlock, "indent") => text::quoted_indent(machine, context, memo),
        (StateKind::QuotedLiteralBlock, "initial_quoted") => {
            text::quoted(machine, line, context, memo)
        }
        (StateKind::QuotedLiteralBlock, "text") => {
            text::quoted_text(machine, context, memo)
        }

        // Anything else is a specialized state rejecting foreign input.
        _ => {
            if state.is_body_family() {
                // Back up so the enclosing machine reassesses this line.
                machine.previous_line(1);
            }
            Err(Signal::Eof)
        }
    }
}

/// A specialized body state met input it does not accept: back the cursor
/// up and return control to the enclosing machine.
pub(crate) fn invalid_input(machine: &mut StateMachine) -> Signal {
    machine.previous_line(1);
    Signal::Eof
}

/// Route end-of-input to the state's eof handler.
pub fn eof(machine: &mut StateMachine, context: &mut Context, memo: &mut Memo) -> Result<(), Signal> {
    match machine.current_state {
        StateKind::Text => text::eof(machine, context, memo),
        StateKind::Definition => {
            // Not a definition after all; let the parent reassess.
            machine.previous_line(2);
            Ok(())
        }
        StateKind::Line => line::eof(machine, context, memo),
        StateKind::QuotedLiteralBlock => text::quoted_eof(machine, context, memo),
        _ => Ok(()),
    }
}
