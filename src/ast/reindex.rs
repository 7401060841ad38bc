//! Rebuilds scope, declaration, reference, lineage and type-map
//! metadata over an existing node arena (§3 "Lifecycle": "scope/ref
//! graphs rebuilt after each commit").
//!
//! Two passes, mirroring how every mainstream scope resolver works:
//! first walk the tree assigning each node to a scope and recording
//! every declaration introduced in that scope, then walk it again
//! resolving each non-declaring identifier against the scope chain
//! built in pass one (a name can be used before its declaration is
//! reached in source order, e.g. function hoisting, so the passes
//! can't be merged).

use super::node::{NodeId, NodeKind};
use super::scope::{ScopeId, ScopeKind, ScopeTree};
use super::{Ast, TypeMap};

pub fn reindex(ast: &mut Ast) {
    let mut scopes = ScopeTree::new();
    let root = ast.root;
    let program_scope = scopes.create(ScopeKind::Program, None, root);

    // Pass 1: assign scopes, collect declared names, compute lineage.
    let mut scope_of: Vec<ScopeId> = vec![program_scope; ast.len()];
    let mut lineage_of: Vec<Vec<NodeId>> = vec![Vec::new(); ast.len()];
    assign_scopes(ast, root, program_scope, Vec::new(), &mut scopes, &mut scope_of, &mut lineage_of);

    // Pass 2: resolve every identifier to a declaration (or none).
    let mut decl_of: Vec<Option<NodeId>> = vec![None; ast.len()];
    for id in all_ids(ast) {
        if let NodeKind::Identifier { name } = &ast.get(id).kind {
            if is_declaration_site(ast, id) {
                decl_of[id.index()] = Some(id);
            } else {
                decl_of[id.index()] = scopes.resolve(scope_of[id.index()], name);
            }
        }
    }

    let mut references: Vec<Vec<NodeId>> = vec![Vec::new(); ast.len()];
    for id in all_ids(ast) {
        if ast.get(id).is_identifier() && !is_declaration_site(ast, id) {
            if let Some(decl) = decl_of[id.index()] {
                references[decl.index()].push(id);
            }
        }
    }

    for node in ast.nodes_mut().iter_mut() {
        let idx = node.id.index();
        node.scope = scope_of[idx];
        node.lineage = std::mem::take(&mut lineage_of[idx]);
        if node.is_identifier() {
            node.decl_node = decl_of[idx];
            node.references = std::mem::take(&mut references[idx]);
        }
    }

    ast.scopes = scopes;
    ast.type_map = TypeMap::build(ast.nodes());
}

fn all_ids(ast: &Ast) -> Vec<NodeId> {
    (0..ast.len() as u32).map(NodeId).collect()
}

/// A node kind that introduces a new scope when it's visited.
fn scope_introduced_by(kind: &NodeKind) -> Option<ScopeKind> {
    match kind {
        NodeKind::FunctionDeclaration { .. }
        | NodeKind::FunctionExpression { .. }
        | NodeKind::ArrowFunctionExpression { .. } => Some(ScopeKind::Function),
        NodeKind::BlockStatement { .. } => Some(ScopeKind::Block),
        _ => None,
    }
}

fn is_declaration_site(ast: &Ast, id: NodeId) -> bool {
    let Some(parent) = ast.get(id).parent else {
        return false;
    };
    match &ast.get(parent).kind {
        NodeKind::VariableDeclarator { id: decl_id, .. } => *decl_id == id,
        NodeKind::FunctionDeclaration { id: Some(fid), params, .. }
        | NodeKind::FunctionExpression { id: Some(fid), params, .. } => *fid == id || params.contains(&id),
        NodeKind::FunctionDeclaration { params, .. } | NodeKind::FunctionExpression { params, .. } => {
            params.contains(&id)
        }
        NodeKind::ArrowFunctionExpression { params, .. } => params.contains(&id),
        NodeKind::ClassDeclaration { id: Some(cid), .. } => *cid == id,
        _ => false,
    }
}

fn declare_in(scopes: &mut ScopeTree, scope: ScopeId, ast: &Ast, id: NodeId) {
    if let NodeKind::Identifier { name } = &ast.get(id).kind {
        scopes.get_mut(scope).declare(name.clone(), id);
    }
}

/// Walks `id`'s subtree, assigning `scope_of`/`lineage_of` and
/// declaring every binding it introduces into the right scope.
/// `var`/function declarations hoist to the nearest enclosing
/// function-or-program scope; `let`/`const` stay block-scoped.
fn assign_scopes(
    ast: &Ast,
    id: NodeId,
    scope: ScopeId,
    lineage: Vec<NodeId>,
    scopes: &mut ScopeTree,
    scope_of: &mut [ScopeId],
    lineage_of: &mut [Vec<NodeId>],
) {
    scope_of[id.index()] = scope;
    lineage_of[id.index()] = lineage.clone();

    let node = ast.get(id);
    let child_scope = if let Some(kind) = scope_introduced_by(&node.kind) {
        scopes.create(kind, Some(scope), id)
    } else {
        scope
    };

    // Declare bindings this node introduces, in the scope they belong to.
    match &node.kind {
        NodeKind::VariableDeclarator { id: decl_id, .. } => {
            let hoisted_target = hoist_target(ast, id, scope, scopes);
            declare_in(scopes, hoisted_target, ast, *decl_id);
        }
        NodeKind::FunctionDeclaration { id: Some(fid), .. } => {
            // Hoisted: visible in the enclosing scope, like `var`.
            declare_in(scopes, scope, ast, *fid);
        }
        NodeKind::FunctionExpression { id: Some(fid), .. } => {
            // A named function expression's own name is visible only
            // inside its own body, not to the enclosing scope.
            declare_in(scopes, child_scope, ast, *fid);
        }
        NodeKind::ClassDeclaration { id: Some(cid), .. } => {
            declare_in(scopes, scope, ast, *cid);
        }
        _ => {}
    }
    if let NodeKind::FunctionDeclaration { params, .. }
    | NodeKind::FunctionExpression { params, .. }
    | NodeKind::ArrowFunctionExpression { params, .. } = &node.kind
    {
        for p in params {
            declare_in(scopes, child_scope, ast, *p);
        }
    }

    let mut child_lineage = lineage;
    child_lineage.push(id);

    for child in node.kind.children() {
        assign_scopes(ast, child, child_scope, child_lineage.clone(), scopes, scope_of, lineage_of);
    }
}

/// `var` declarations (and function declarations) hoist to the
/// nearest enclosing function-or-program scope rather than staying in
/// the innermost block, matching JS semantics (§9 getter/proxy note
/// aside, this is plain hoisting, not a safety-relevant choice).
fn hoist_target(ast: &Ast, declarator: NodeId, innermost: ScopeId, scopes: &ScopeTree) -> ScopeId {
    let Some(decl_stmt) = ast.get(declarator).parent else {
        return innermost;
    };
    let is_var = matches!(&ast.get(decl_stmt).kind, NodeKind::VariableDeclaration { kind, .. } if matches!(kind, super::VarKind::Var));
    if !is_var {
        return innermost;
    }
    let mut current = innermost;
    loop {
        let scope = scopes.get(current);
        if matches!(scope.kind, ScopeKind::Function | ScopeKind::Program) {
            return current;
        }
        match scope.parent {
            Some(p) => current = p,
            None => return current,
        }
    }
}
