//! function-to-array preprocessor (§4.G).
//!
//! Resolves functions whose sole behavior is returning a specific
//! array literal — a common string-table wrapper shape — by replacing
//! every call to the function with the array literal directly, so
//! later rules see the table instead of an opaque call.

use crate::arborist::Arborist;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::processors::Bundle;
use crate::rules::{Rule, Safety};

pub fn bundle() -> Bundle {
    Bundle {
        name: "function-to-array",
        preprocessors: vec![Rule {
            name: "resolve_array_returning_function",
            safety: Safety::Safe,
            match_fn: match_array_returning_call,
            transform_fn: transform_array_returning_call,
        }],
        postprocessors: Vec::new(),
    }
}

fn array_return_value(ast: &Ast, func: NodeId) -> Option<NodeId> {
    let body = match &ast.get(func).kind {
        NodeKind::FunctionDeclaration { body, .. } | NodeKind::FunctionExpression { body, .. } => *body,
        _ => return None,
    };
    let NodeKind::BlockStatement { body: stmts } = &ast.get(body).kind else { return None };
    if stmts.len() != 1 {
        return None;
    }
    let NodeKind::ReturnStatement { argument } = &ast.get(stmts[0]).kind else { return None };
    let value = (*argument)?;
    matches!(&ast.get(value).kind, NodeKind::ArrayExpression { .. }).then_some(value)
}

fn match_array_returning_call(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::CallExpression { callee, arguments } = &ast.get(*id).kind else { return false };
            if !arguments.is_empty() {
                return false;
            }
            let Some(decl) = ast.get(*callee).decl_node else { return false };
            let Some(func_decl) = ast.get(decl).parent else { return false };
            array_return_value(ast, func_decl).is_some()
        })
        .collect()
}

fn transform_array_returning_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::CallExpression { callee, .. } = &ast.get(node).kind else { return };
    let Some(decl) = ast.get(*callee).decl_node else { return };
    let Some(func_decl) = ast.get(decl).parent else { return };
    let Some(value) = array_return_value(ast, func_decl) else { return };
    arborist.replace_node_with_text(node, crate::frontend::render::render_node(ast, value));
}
