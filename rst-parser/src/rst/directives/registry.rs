//! The directive and role registry.
//!
//! A registry maps domain names to directive specs and role handlers. It is
//! built once through [`RegistryBuilder`], immutable afterwards, and cheap
//! to share across parses. Unqualified lookups walk the default domain
//! resolution order; `domain:name` lookups go straight to their domain.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

use crate::rst::ast::{AttrValue, Document, NodeId};
use crate::rst::diagnostics::{Reporter, Severity};
use crate::rst::lines::LineStore;
use crate::rst::parsing::{Memo, StateMachine};

/// Converts and validates one option value. `None` marks an option given
/// without a value.
pub type OptionValidator = fn(Option<&str>) -> Result<AttrValue, String>;

/// A recoverable error signalled by a directive handler. The runtime turns
/// it into a system message carrying the directive's source text.
#[derive(Debug, Clone)]
pub struct DirectiveError {
    pub level: Severity,
    pub message: String,
}

impl DirectiveError {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Severity::Error,
            message: message.into(),
        }
    }

    pub fn severe(message: impl Into<String>) -> Self {
        Self {
            level: Severity::Severe,
            message: message.into(),
        }
    }
}

impl fmt::Display for DirectiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

impl std::error::Error for DirectiveError {}

/// Everything a directive handler gets to work with.
pub struct DirectiveContext<'a> {
    /// The directive name as written (unqualified part).
    pub name: String,
    pub arguments: Vec<String>,
    pub options: BTreeMap<String, AttrValue>,
    /// The content block, indentation stripped.
    pub content: LineStore,
    /// 1-based line number of the directive marker.
    pub lineno: usize,
    /// Absolute line offset of the first content line.
    pub content_offset: usize,
    /// The entire directive text as matched.
    pub block_text: String,
    pub machine: &'a mut StateMachine,
    pub memo: &'a mut Memo,
}

impl<'a> DirectiveContext<'a> {
    /// Parse the content block into `node` with a nested state machine.
    pub fn nested_parse(&mut self, node: NodeId) -> Result<(), crate::rst::ParserError> {
        let content = self.content.clone();
        let offset = self.content_offset;
        self.machine
            .nested_parse(content, offset, node, false, self.memo)
            .map(|_| ())
    }
}

pub type DirectiveFn = fn(&mut DirectiveContext<'_>) -> Result<Vec<NodeId>, DirectiveError>;

/// A directive's argument/option/content contract plus its handler.
#[derive(Clone)]
pub struct DirectiveSpec {
    pub required_args: usize,
    pub optional_args: usize,
    /// Join surplus tokens into the final argument instead of rejecting.
    pub final_arg_whitespace: bool,
    pub has_content: bool,
    pub option_spec: Vec<(&'static str, OptionValidator)>,
    pub run: DirectiveFn,
}

impl DirectiveSpec {
    pub fn validator_for(&self, option: &str) -> Option<OptionValidator> {
        self.option_spec
            .iter()
            .find(|(name, _)| *name == option)
            .map(|(_, validator)| *validator)
    }
}

impl fmt::Debug for DirectiveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveSpec")
            .field("required_args", &self.required_args)
            .field("optional_args", &self.optional_args)
            .field("final_arg_whitespace", &self.final_arg_whitespace)
            .field("has_content", &self.has_content)
            .field(
                "options",
                &self
                    .option_spec
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Everything a role handler gets to work with.
pub struct RoleContext<'a> {
    pub role_name: String,
    /// The construct as written, e.g. ``:ref:`target```.
    pub rawsource: String,
    /// The unescaped text between the backquotes.
    pub text: String,
    pub lineno: usize,
    pub document: &'a mut Document,
    pub reporter: &'a mut Reporter,
}

pub type RoleFn = fn(&mut RoleContext<'_>) -> (Vec<NodeId>, Vec<NodeId>);

#[derive(Default)]
struct Domain {
    directives: HashMap<String, DirectiveSpec>,
    roles: HashMap<String, RoleFn>,
}

/// Immutable domain-qualified lookup of directives and roles.
pub struct DirectiveRegistry {
    domains: HashMap<String, Domain>,
    /// Domains tried, in order, for unqualified names.
    resolution_order: Vec<String>,
}

impl DirectiveRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The registry with the standard directive and role set.
    pub fn standard() -> Self {
        let mut builder = RegistryBuilder::new();
        super::standard::register(&mut builder);
        super::roles::register(&mut builder);
        builder.build()
    }

    pub fn lookup_directive(&self, name: &str) -> Option<&DirectiveSpec> {
        if let Some((domain, bare)) = split_qualified(name) {
            return self
                .domains
                .get(domain)
                .and_then(|d| d.directives.get(bare));
        }
        for domain in &self.resolution_order {
            if let Some(spec) = self
                .domains
                .get(domain)
                .and_then(|d| d.directives.get(name))
            {
                return Some(spec);
            }
        }
        None
    }

    pub fn lookup_role(&self, name: &str) -> Option<RoleFn> {
        if let Some((domain, bare)) = split_qualified(name) {
            return self
                .domains
                .get(domain)
                .and_then(|d| d.roles.get(bare))
                .copied();
        }
        for domain in &self.resolution_order {
            if let Some(&role) = self.domains.get(domain).and_then(|d| d.roles.get(name)) {
                return Some(role);
            }
        }
        None
    }
}

impl fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveRegistry")
            .field("domains", &self.domains.keys().collect::<Vec<_>>())
            .field("resolution_order", &self.resolution_order)
            .finish()
    }
}

/// `domain:name`, where the domain part must not itself look like a role
/// marker. A lone leading or trailing colon is not a qualification.
fn split_qualified(name: &str) -> Option<(&str, &str)> {
    let (domain, bare) = name.split_once(':')?;
    if domain.is_empty() || bare.is_empty() || bare.contains(':') {
        return None;
    }
    Some((domain, bare))
}

/// Builds a [`DirectiveRegistry`].
pub struct RegistryBuilder {
    domains: HashMap<String, Domain>,
    project_domain: Option<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            domains: HashMap::new(),
            project_domain: None,
        }
    }

    /// A project default domain, consulted before the built-in order.
    pub fn default_domain(&mut self, domain: &str) -> &mut Self {
        self.project_domain = Some(domain.to_string());
        self
    }

    pub fn directive(&mut self, domain: &str, name: &str, spec: DirectiveSpec) -> &mut Self {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .directives
            .insert(name.to_string(), spec);
        self
    }

    pub fn role(&mut self, domain: &str, name: &str, role: RoleFn) -> &mut Self {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .roles
            .insert(name.to_string(), role);
        self
    }

    pub fn build(self) -> DirectiveRegistry {
        let mut resolution_order = Vec::new();
        if let Some(project) = self.project_domain {
            resolution_order.push(project);
        }
        for builtin in ["mongodb", "std", ""] {
            if !resolution_order.iter().any(|d| d == builtin) {
                resolution_order.push(builtin.to_string());
            }
        }
        DirectiveRegistry {
            domains: self.domains,
            resolution_order,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_lookup() {
        let registry = DirectiveRegistry::standard();
        assert!(registry.lookup_directive("std:code-block").is_some());
        assert!(registry.lookup_directive("nosuch:code-block").is_none());
    }

    #[test]
    fn test_resolution_order() {
        let registry = DirectiveRegistry::standard();
        assert!(registry.lookup_directive("code-block").is_some());
        assert!(registry.lookup_directive("definitely-not-registered").is_none());
    }

    #[test]
    fn test_project_domain_first() {
        fn noop(_: &mut DirectiveContext<'_>) -> Result<Vec<NodeId>, DirectiveError> {
            Ok(Vec::new())
        }
        let mut builder = DirectiveRegistry::builder();
        builder.default_domain("landing");
        builder.directive(
            "landing",
            "intro",
            DirectiveSpec {
                required_args: 0,
                optional_args: 0,
                final_arg_whitespace: false,
                has_content: true,
                option_spec: Vec::new(),
                run: noop,
            },
        );
        let registry = builder.build();
        assert!(registry.lookup_directive("intro").is_some());
        assert!(registry.lookup_directive("landing:intro").is_some());
    }
}
