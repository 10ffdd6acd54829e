//! Standard role handlers.
//!
//! Roles turn interpreted text into inline nodes. The cross-referencing
//! roles (`doc`, `ref`, `term`) emit `RefRole` nodes the reference
//! resolution pass links up; plain text roles emit a `Role` node carrying
//! the role name. The default role (no `:name:` given) is a plain role
//! with an empty name.
//!
//! A role's text may embed an explicit title: ``:ref:`Title <target>```.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rst::ast::{fully_normalize_name, AttrValue, NodeId, NodeKind};
use crate::rst::directives::registry::{RegistryBuilder, RoleContext};

static EMBEDDED_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<title>.+?)\s*<(?P<target>[^<>]+)>$").expect("static pattern"));

/// Split `Title <target>` text; plain text is its own target.
fn title_and_target(text: &str) -> (String, String, bool) {
    match EMBEDDED_TARGET.captures(text.trim()) {
        Some(caps) => (
            caps["title"].trim().to_string(),
            caps["target"].trim().to_string(),
            true,
        ),
        None => (text.trim().to_string(), text.trim().to_string(), false),
    }
}

/// Generic text role: a `Role` node wrapping the literal text.
pub fn text_role(ctx: &mut RoleContext<'_>) -> (Vec<NodeId>, Vec<NodeId>) {
    let node = ctx.document.new_node(NodeKind::Role, &ctx.rawsource);
    ctx.document
        .set_attr(node, "name", AttrValue::Str(ctx.role_name.clone()));
    let text = ctx.document.new_text(&ctx.text);
    ctx.document.append(node, text);
    (vec![node], Vec::new())
}

/// Cross-reference role: a `RefRole` node with a normalized target.
pub fn ref_role(ctx: &mut RoleContext<'_>) -> (Vec<NodeId>, Vec<NodeId>) {
    let (title, target, explicit_title) = title_and_target(&ctx.text);
    let node = ctx.document.new_node(NodeKind::RefRole, &ctx.rawsource);
    ctx.document
        .set_attr(node, "name", AttrValue::Str(ctx.role_name.clone()));
    ctx.document.set_attr(
        node,
        "target",
        AttrValue::Str(fully_normalize_name(&target)),
    );
    if explicit_title {
        ctx.document
            .set_attr(node, "flag", AttrValue::Str("~".to_string()));
    }
    let text = ctx.document.new_text(&title);
    ctx.document.append(node, text);
    (vec![node], Vec::new())
}

/// Literal text role (`:literal:` and the samp-alikes).
pub fn literal_role(ctx: &mut RoleContext<'_>) -> (Vec<NodeId>, Vec<NodeId>) {
    let node = ctx.document.new_node(NodeKind::Literal, &ctx.rawsource);
    let text = ctx.document.new_text(&ctx.text);
    ctx.document.append(node, text);
    (vec![node], Vec::new())
}

pub fn register(builder: &mut RegistryBuilder) {
    // The default role: interpreted text with no name.
    builder.role("", "", text_role);
    builder.role("std", "doc", ref_role);
    builder.role("std", "ref", ref_role);
    builder.role("std", "term", ref_role);
    builder.role("std", "option", literal_role);
    builder.role("std", "literal", literal_role);
    builder.role("std", "guilabel", text_role);
    builder.role("std", "manual", text_role);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_target() {
        assert_eq!(
            title_and_target("Read This <some-target>"),
            ("Read This".to_string(), "some-target".to_string(), true)
        );
        assert_eq!(
            title_and_target("bare-target"),
            ("bare-target".to_string(), "bare-target".to_string(), false)
        );
    }
}
