//! Rewrite rules (§4.E).
//!
//! Every rule is a `Rule` record: a pure `match_fn` that returns
//! candidates in source order without mutating anything, and a
//! `transform_fn` that stages one rewrite per candidate on the
//! Arborist. Rules are split into **safe** (pure AST-level reasoning)
//! and **unsafe** (anything that calls into the sandboxed evaluator or
//! otherwise depends on runtime semantics) families; `safe_rules()`/
//! `unsafe_rules()` concatenate the per-family modules in a fixed
//! order matching this file's declaration order.

pub mod control_flow;
pub mod evaluator;
pub mod flow;
pub mod functions;
pub mod literals;

use crate::arborist::Arborist;
use crate::ast::{Ast, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Safety {
    Safe,
    Unsafe,
}

pub struct Rule {
    pub name: &'static str,
    pub safety: Safety,
    pub match_fn: fn(&Ast) -> Vec<NodeId>,
    pub transform_fn: fn(&Ast, &mut Arborist, NodeId),
}

impl Rule {
    /// Runs this rule once over `ast`, staging every match on
    /// `arborist`. Returns the number of matches staged, so the driver
    /// can decide whether this rule made progress this pass.
    pub fn apply(&self, ast: &Ast, arborist: &mut Arborist) -> usize {
        let candidates = (self.match_fn)(ast);
        for candidate in &candidates {
            (self.transform_fn)(ast, arborist, *candidate);
        }
        candidates.len()
    }
}

pub fn safe_rules() -> Vec<Rule> {
    let mut rules = Vec::new();
    rules.extend(literals::rules());
    rules.extend(flow::rules());
    rules.extend(functions::rules());
    rules.extend(control_flow::rules());
    rules
}

pub fn unsafe_rules() -> Vec<Rule> {
    evaluator::rules()
}

/// True if `identifier` is never the target of a write anywhere in the
/// tree — an assignment left side, a declarator, or an update
/// expression operand (§4.E "references_modified" helper referenced by
/// several flow rules).
pub(crate) fn references_modified(ast: &Ast, decl: NodeId) -> bool {
    use crate::ast::NodeKind;
    for reference in ast.get(decl).references.iter().chain(std::iter::once(&decl)) {
        let Some(parent) = ast.get(*reference).parent else { continue };
        let is_write = match &ast.get(parent).kind {
            NodeKind::AssignmentExpression { left, .. } => *left == *reference,
            NodeKind::UpdateExpression { argument, .. } => *argument == *reference,
            NodeKind::VariableDeclarator { id, .. } => *id == *reference && *reference != decl,
            _ => false,
        };
        if is_write {
            return true;
        }
    }
    false
}
