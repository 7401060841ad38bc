//! caesar-plus preprocessor (§4.G).
//!
//! This family wraps its whole payload in a single top-level
//! `(function(){ ... })();` IIFE before the string-shift cipher calls
//! proper. Preprocessing unwraps that outer layer by hoisting the
//! IIFE's body to the program's top level, so every later rule
//! operates on the real statements instead of reasoning through an
//! extra call frame. Postprocessing then sweeps whatever the main pass
//! left stranded inside that unwrapped scope.

use crate::arborist::Arborist;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::processors::Bundle;
use crate::rules::flow::rules as flow_rules;
use crate::rules::{Rule, Safety};

pub fn bundle() -> Bundle {
    let postprocessors =
        flow_rules().into_iter().filter(|r| r.name == "dead_code_removal").collect();
    Bundle {
        name: "caesar-plus",
        preprocessors: vec![Rule {
            name: "unwrap_top_level_iife",
            safety: Safety::Safe,
            match_fn: match_top_level_iife,
            transform_fn: transform_top_level_iife,
        }],
        postprocessors,
    }
}

/// The single top-level statement is `(function(){ ... })();` with no
/// parameters and no call arguments.
fn wrapped_body(ast: &Ast, stmt: NodeId) -> Option<NodeId> {
    let NodeKind::Program { body } = &ast.get(ast.root).kind else { return None };
    if body.len() != 1 || body[0] != stmt {
        return None;
    }
    let NodeKind::ExpressionStatement { expression } = &ast.get(stmt).kind else { return None };
    let NodeKind::CallExpression { callee, arguments } = &ast.get(*expression).kind else { return None };
    if !arguments.is_empty() {
        return None;
    }
    let NodeKind::FunctionExpression { params, body, .. } = &ast.get(*callee).kind else { return None };
    if !params.is_empty() {
        return None;
    }
    Some(*body)
}

fn match_top_level_iife(ast: &Ast) -> Vec<NodeId> {
    let NodeKind::Program { body } = &ast.get(ast.root).kind else { return Vec::new() };
    body.iter().copied().filter(|id| wrapped_body(ast, *id).is_some()).collect()
}

fn transform_top_level_iife(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(block) = wrapped_body(ast, node) else { return };
    let NodeKind::BlockStatement { body: stmts } = &ast.get(block).kind else { return };
    let hoisted = stmts
        .iter()
        .map(|s| crate::frontend::render::render_node(ast, *s))
        .collect::<Vec<_>>()
        .join("\n");
    arborist.replace_node_with_text(node, hoisted);
}
