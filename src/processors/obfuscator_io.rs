//! obfuscator.io preprocessor (§4.G).
//!
//! obfuscator.io's "self-defending"/debug-protection scaffolding plants
//! literal marker strings (`"newState"`, `"removeCookie"`) inside
//! functions whose only purpose is to detect tampering and misbehave.
//! Neutralizing them ahead of the main pass keeps later rules from
//! wasting cycles reasoning about code that's dead weight by
//! construction. Also pulls in the augmented-array preprocessor, since
//! obfuscator.io commonly layers both.

use crate::arborist::Arborist;
use crate::ast::{Ast, LiteralValue, NodeId, NodeKind};
use crate::processors::{augmented_array, Bundle};
use crate::rules::{Rule, Safety};

const BYPASS_BODY: &str = "function () {return \"bypassed!\"}";

pub fn bundle() -> Bundle {
    let mut preprocessors = vec![Rule {
        name: "neutralize_debug_trap_markers",
        safety: Safety::Safe,
        match_fn: match_marker_literal,
        transform_fn: transform_marker_literal,
    }];
    preprocessors.extend(augmented_array::bundle().preprocessors);
    Bundle { name: "obfuscator.io", preprocessors, postprocessors: Vec::new() }
}

fn is_marker(lit: &LiteralValue) -> bool {
    matches!(lit, LiteralValue::Str(s) if s == "newState" || s == "removeCookie")
}

fn match_marker_literal(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("Literal")
        .iter()
        .copied()
        .filter(|id| ast.get(*id).as_literal().is_some_and(is_marker))
        .collect()
}

/// For `"newState"`, the enclosing FunctionExpression is replaced; for
/// `"removeCookie"`, the parent Property's value is replaced — the two
/// shapes obfuscator.io actually emits the marker under.
fn transform_marker_literal(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let is_new_state = matches!(ast.get(node).as_literal(), Some(LiteralValue::Str(s)) if s == "newState");

    if is_new_state {
        if let Some(func) = ast
            .get(node)
            .lineage
            .iter()
            .rev()
            .find(|id| matches!(&ast.get(**id).kind, NodeKind::FunctionExpression { .. }))
        {
            arborist.replace_node_with_text(*func, BYPASS_BODY.to_string());
        }
        return;
    }

    if let Some(parent) = ast.get(node).parent {
        if let NodeKind::Property { value, .. } = &ast.get(parent).kind {
            arborist.replace_node_with_text(*value, BYPASS_BODY.to_string());
        }
    }
}
