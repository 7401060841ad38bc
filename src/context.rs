//! Context extractor (§4.D).
//!
//! Produces a self-contained slice of top-level statements sufficient
//! to evaluate expressions involving a given node in the sandbox —
//! the node's own statement, plus whatever else it transitively reads
//! from or writes to, in source order.

use std::collections::BTreeSet;

use crate::ast::{Ast, NodeId, NodeKind};

/// `declaration_with_context` from spec.md §4.D.
///
/// Starts from the innermost enclosing top-level (Program-body)
/// statement of `node`, then closes under two relations: "references a
/// declaration whose own top-level statement isn't in the set yet" and
/// "is assigned to by a statement not in the set yet". Stops once a
/// fixed point is reached, then emits the set in source order.
pub fn declaration_with_context(ast: &Ast, node: NodeId, include_call_siblings: bool) -> Vec<NodeId> {
    let Some(seed) = enclosing_top_level_statement(ast, node) else {
        return Vec::new();
    };

    let mut set: BTreeSet<u32> = BTreeSet::new();
    set.insert(seed.0);

    loop {
        let before = set.len();
        let current: Vec<NodeId> = set.iter().map(|&i| NodeId(i)).collect();

        for stmt in &current {
            for ident in identifiers_in(ast, *stmt) {
                if let Some(decl) = ast.get(ident).decl_node {
                    if decl != ident {
                        if let Some(decl_stmt) = enclosing_top_level_statement(ast, decl) {
                            if !include_call_siblings && decl_stmt == seed {
                                continue;
                            }
                            set.insert(decl_stmt.0);
                        }
                    }
                    // Close under every statement that assigns to this declaration.
                    for reference in ast.get(decl).references.iter().chain(std::iter::once(&decl)) {
                        if let Some(assign_stmt) = assignment_statement_for(ast, *reference) {
                            set.insert(assign_stmt.0);
                        }
                    }
                }
            }
        }

        if set.len() == before {
            break;
        }
    }

    if !include_call_siblings {
        set.remove(&seed.0);
        let mut ordered: Vec<NodeId> = set.into_iter().map(NodeId).collect();
        ordered.push(seed);
        ordered.sort_by_key(|id| ast.get(*id).range.start);
        ordered
    } else {
        let mut ordered: Vec<NodeId> = set.into_iter().map(NodeId).collect();
        ordered.sort_by_key(|id| ast.get(*id).range.start);
        ordered
    }
}

/// Walks `node`'s lineage to the statement that's a direct child of
/// `Program`.
fn enclosing_top_level_statement(ast: &Ast, node: NodeId) -> Option<NodeId> {
    let program_body = match &ast.get(ast.root).kind {
        NodeKind::Program { body } => body.clone(),
        _ => return None,
    };
    if program_body.contains(&node) {
        return Some(node);
    }
    ast.get(node).lineage.iter().rev().find(|id| program_body.contains(id)).copied()
}

fn identifiers_in(ast: &Ast, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_identifiers(ast, root, &mut out);
    out
}

fn collect_identifiers(ast: &Ast, id: NodeId, out: &mut Vec<NodeId>) {
    if ast.get(id).is_identifier() {
        out.push(id);
    }
    for child in ast.children(id) {
        collect_identifiers(ast, child, out);
    }
}

/// If `ident` is the write target of an assignment or declarator
/// initializer, returns that assignment's enclosing top-level
/// statement.
fn assignment_statement_for(ast: &Ast, ident: NodeId) -> Option<NodeId> {
    let parent = ast.get(ident).parent?;
    let is_write = match &ast.get(parent).kind {
        NodeKind::AssignmentExpression { left, .. } => *left == ident,
        NodeKind::VariableDeclarator { id, .. } => *id == ident,
        NodeKind::UpdateExpression { argument, .. } => *argument == ident,
        _ => false,
    };
    if !is_write {
        return None;
    }
    enclosing_top_level_statement(ast, ident)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::TreeSitterFrontend;

    #[test]
    fn pulls_in_the_declaration_statement_of_a_referenced_identifier() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse_source("let a = 1;\nlet b = a + 2;\nconsole.log(b);").unwrap();

        let call = ast.of_kind("CallExpression")[0];
        let ctx = declaration_with_context(&ast, call, false);
        assert!(ctx.len() >= 2);
    }

    #[test]
    fn returns_empty_for_an_unresolvable_node() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse_source("").unwrap();
        let ctx = declaration_with_context(&ast, ast.root, false);
        assert!(ctx.is_empty());
    }
}
