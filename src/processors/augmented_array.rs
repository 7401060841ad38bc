//! augmented-array preprocessor (§4.G).
//!
//! Resolves IIFEs of the form `(function(arr, n){ while(n--)
//! arr.push(arr.shift()) })(A, k)`: locates `A`'s declaration,
//! replicates the rotation in the sandbox, and replaces `A`'s
//! initializer with the permuted array literal so every later index
//! into `A` in the main pass sees the already-rotated order.

use crate::arborist::Arborist;
use crate::ast::{Ast, LiteralValue, NodeId, NodeKind};
use crate::processors::Bundle;
use crate::rules::{Rule, Safety};
use crate::sandbox;

pub fn bundle() -> Bundle {
    Bundle {
        name: "augmented-array",
        preprocessors: vec![Rule {
            name: "resolve_array_rotation_iife",
            safety: Safety::Safe,
            match_fn: match_rotation_iife,
            transform_fn: transform_rotation_iife,
        }],
        postprocessors: Vec::new(),
    }
}

/// `(function(arr, n){ while(n--) arr.push(arr.shift()) })(A, k)`
/// where `A` resolves to a `var`/`let`/`const` array literal.
fn rotation_target(ast: &Ast, call: NodeId) -> Option<(NodeId, NodeId)> {
    let NodeKind::CallExpression { callee, arguments } = &ast.get(call).kind else { return None };
    if arguments.len() != 2 {
        return None;
    }
    let func = *callee;
    if !matches!(&ast.get(func).kind, NodeKind::FunctionExpression { .. }) {
        return None;
    }
    let body = match &ast.get(func).kind {
        NodeKind::FunctionExpression { body, .. } => *body,
        _ => return None,
    };
    let NodeKind::BlockStatement { body: stmts } = &ast.get(body).kind else { return None };
    if stmts.len() != 1 {
        return None;
    }
    if !matches!(&ast.get(stmts[0]).kind, NodeKind::WhileStatement { .. }) {
        return None;
    }

    let array_arg = arguments[0];
    let decl = ast.get(array_arg).decl_node?;
    let parent = ast.get(decl).parent?;
    let NodeKind::VariableDeclarator { init: Some(init), .. } = &ast.get(parent).kind else { return None };
    if !matches!(&ast.get(*init).kind, NodeKind::ArrayExpression { .. }) {
        return None;
    }
    Some((*init, array_arg))
}

fn match_rotation_iife(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression").iter().copied().filter(|id| rotation_target(ast, *id).is_some()).collect()
}

fn transform_rotation_iife(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some((array_init, _)) = rotation_target(ast, node) else { return };
    let NodeKind::CallExpression { arguments, .. } = &ast.get(node).kind else { return };
    let array_text = crate::frontend::render::render_node(ast, array_init);
    let rotations_text = crate::frontend::render::render_node(ast, arguments[1]);
    let fragment = format!(
        "var __a = {};\n(function(arr, n){{ while (n--) arr.push(arr.shift()); }})(__a, {});\nJSON.stringify(__a);",
        array_text, rotations_text
    );
    if let Some(LiteralValue::Str(json)) = sandbox::eval_in_vm(&fragment) {
        arborist.replace_node_with_text(array_init, json);
    }
    arborist.mark_node(node);
}
