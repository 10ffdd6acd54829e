//! Directives and roles.
//!
//! Directives are the extensible block construct (`.. name:: ...`), roles
//! the extensible inline construct (`:name:\`text\``). Both resolve through
//! the domain-qualified [`DirectiveRegistry`]; the runtime parses a
//! directive's header (arguments, options, content) and validates options
//! against the directive's spec before its handler runs.

pub mod options;
pub mod registry;
pub mod roles;
pub mod runtime;
pub mod standard;

pub use registry::{
    DirectiveContext, DirectiveError, DirectiveFn, DirectiveRegistry, DirectiveSpec,
    OptionValidator, RegistryBuilder, RoleContext, RoleFn,
};
