//! Safe rules: variable flow (§4.E).

use crate::arborist::Arborist;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::rules::{references_modified, Rule, Safety};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "constant_propagation",
            safety: Safety::Safe,
            match_fn: match_constant_propagation,
            transform_fn: transform_constant_propagation,
        },
        Rule {
            name: "resolve_constant_array_index",
            safety: Safety::Safe,
            match_fn: match_constant_array_index,
            transform_fn: transform_constant_array_index,
        },
        Rule {
            name: "proxy_variables",
            safety: Safety::Safe,
            match_fn: match_proxy_variable,
            transform_fn: transform_proxy_variable,
        },
        Rule {
            name: "proxy_member_chains",
            safety: Safety::Safe,
            match_fn: match_proxy_member_chain,
            transform_fn: transform_proxy_member_chain,
        },
        Rule {
            name: "fixed_value_after_declare",
            safety: Safety::Safe,
            match_fn: match_fixed_value_after_declare,
            transform_fn: transform_fixed_value_after_declare,
        },
        Rule {
            name: "direct_assignment_property_resolution",
            safety: Safety::Safe,
            match_fn: match_direct_assignment_property,
            transform_fn: transform_direct_assignment_property,
        },
        Rule {
            name: "dead_code_removal",
            safety: Safety::Safe,
            match_fn: match_dead_declaration,
            transform_fn: transform_dead_declaration,
        },
    ]
}

/// `A[3]` where `A` resolves to an array-literal declaration that's
/// never reassigned and the index is a non-negative integer literal
/// within bounds — the augmented-array family's core access pattern
/// (§4.G), but general enough to fire on any literal table lookup.
fn array_element_at(ast: &Ast, member: NodeId) -> Option<NodeId> {
    let NodeKind::MemberExpression { object, property, computed } = &ast.get(member).kind else {
        return None;
    };
    if !computed {
        return None;
    }
    let index = ast.get(*property).as_literal().and_then(|lit| lit.as_number())?;
    if index.fract() != 0.0 || index < 0.0 {
        return None;
    }
    let decl = ast.get(*object).decl_node?;
    if references_modified(ast, decl) {
        return None;
    }
    let parent = ast.get(decl).parent?;
    let NodeKind::VariableDeclarator { id, init: Some(init) } = &ast.get(parent).kind else { return None };
    if *id != decl {
        return None;
    }
    let NodeKind::ArrayExpression { elements } = &ast.get(*init).kind else { return None };
    elements.get(index as usize).copied().flatten()
}

fn match_constant_array_index(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("MemberExpression").iter().copied().filter(|id| array_element_at(ast, *id).is_some()).collect()
}

fn transform_constant_array_index(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(element) = array_element_at(ast, node) else { return };
    arborist.replace_node_with_text(node, crate::frontend::render::render_node(ast, element));
}

/// Identifiers (reads, not the declaration itself) whose declaration
/// initializes to a Literal and is never subsequently written, and
/// that aren't an ObjectExpression property key (§4.E exclusion).
fn match_constant_propagation(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("Identifier")
        .iter()
        .copied()
        .filter(|id| {
            let node = ast.get(*id);
            let Some(decl) = node.decl_node else { return false };
            if decl == *id {
                return false;
            }
            if is_object_key(ast, *id) {
                return false;
            }
            literal_init_of(ast, decl).is_some() && !references_modified(ast, decl)
        })
        .collect()
}

fn is_object_key(ast: &Ast, id: NodeId) -> bool {
    let Some(parent) = ast.get(id).parent else { return false };
    matches!(&ast.get(parent).kind, NodeKind::Property { key, shorthand: false, .. } if *key == id)
}

fn literal_init_of(ast: &Ast, decl: NodeId) -> Option<NodeId> {
    let parent = ast.get(decl).parent?;
    match &ast.get(parent).kind {
        NodeKind::VariableDeclarator { id, init } if *id == decl => {
            let init = (*init)?;
            ast.get(init).as_literal().map(|_| init)
        }
        _ => None,
    }
}

fn transform_constant_propagation(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(decl) = ast.get(node).decl_node else { return };
    let Some(init) = literal_init_of(ast, decl) else { return };
    arborist.replace_node_with_text(node, crate::frontend::render::render_node(ast, init));
}

/// `const b = a;` where `a` is a plain identifier and neither is
/// subsequently written. Excludes declarators inside a For/While/DoWhile
/// head (§4.E guard against breaking loop-carried state).
fn match_proxy_variable(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("VariableDeclarator")
        .iter()
        .copied()
        .filter(|id| proxy_source(ast, *id).is_some())
        .collect()
}

fn proxy_source(ast: &Ast, declarator: NodeId) -> Option<NodeId> {
    let NodeKind::VariableDeclarator { id: b_id, init } = &ast.get(declarator).kind else { return None };
    let a_id = (*init)?;
    if !ast.get(a_id).is_identifier() {
        return None;
    }
    let a_decl = ast.get(a_id).decl_node?;
    // Guard against circular proxies: `a`'s own declaration can't be `b`.
    if a_decl == *b_id {
        return None;
    }
    if references_modified(ast, *b_id) || references_modified(ast, a_decl) {
        return None;
    }
    if in_loop_head(ast, declarator) {
        return None;
    }
    Some(a_decl)
}

fn in_loop_head(ast: &Ast, id: NodeId) -> bool {
    ast.get(id).lineage.iter().any(|ancestor| {
        matches!(
            &ast.get(*ancestor).kind,
            NodeKind::ForStatement { init: Some(n), .. } if *n == id
        )
    })
}

fn transform_proxy_variable(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(a_decl) = proxy_source(ast, node) else { return };
    let NodeKind::VariableDeclarator { id: b_id, .. } = &ast.get(node).kind else { return };
    let a_name = crate::frontend::render::render_node(ast, a_decl);

    if ast.get(*b_id).references.is_empty() {
        arborist.mark_node(node);
        return;
    }
    for usage in &ast.get(*b_id).references {
        arborist.replace_node_with_text(*usage, a_name.clone());
    }
}

/// Same shape as `proxy_variables` but the initializer is a
/// MemberExpression (`const b = ns.a;`) rather than a bare identifier —
/// every read of `b` is replaced with a clone of the member expression
/// text instead of an identifier name.
fn proxy_member_source(ast: &Ast, declarator: NodeId) -> Option<NodeId> {
    let NodeKind::VariableDeclarator { id: b_id, init } = &ast.get(declarator).kind else { return None };
    let init = (*init)?;
    if !matches!(&ast.get(init).kind, NodeKind::MemberExpression { .. }) {
        return None;
    }
    if references_modified(ast, *b_id) {
        return None;
    }
    if in_loop_head(ast, declarator) {
        return None;
    }
    Some(init)
}

fn match_proxy_member_chain(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("VariableDeclarator").iter().copied().filter(|id| proxy_member_source(ast, *id).is_some()).collect()
}

fn transform_proxy_member_chain(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(init) = proxy_member_source(ast, node) else { return };
    let NodeKind::VariableDeclarator { id: b_id, .. } = &ast.get(node).kind else { return };
    let init_text = crate::frontend::render::render_node(ast, init);

    if ast.get(*b_id).references.is_empty() {
        arborist.mark_node(node);
        return;
    }
    for usage in &ast.get(*b_id).references {
        arborist.replace_node_with_text(*usage, init_text.clone());
    }
}

/// `let a; … a = L; … a` where exactly one assignment writes a Literal
/// and `a` is never the `left` of a for-loop nor read under a
/// `ConditionalExpression` within 3 ancestors — replace every read
/// (excluding the write itself) with `L`.
fn single_literal_write(ast: &Ast, decl: NodeId) -> Option<&crate::ast::LiteralValue> {
    let mut writes = Vec::new();
    for reference in ast.get(decl).references.iter().chain(std::iter::once(&decl)) {
        let Some(parent) = ast.get(*reference).parent else { continue };
        if let NodeKind::AssignmentExpression { operator, left, right } = &ast.get(parent).kind {
            if operator == "=" && *left == *reference {
                writes.push(*right);
            }
        }
    }
    if writes.len() != 1 {
        return None;
    }
    ast.get(writes[0]).as_literal()
}

fn near_conditional(ast: &Ast, id: NodeId) -> bool {
    ast.get(id).lineage.iter().rev().take(3).any(|a| matches!(&ast.get(*a).kind, NodeKind::ConditionalExpression { .. }))
}

fn is_for_loop_left(ast: &Ast, id: NodeId) -> bool {
    let Some(parent) = ast.get(id).parent else { return false };
    matches!(&ast.get(parent).kind, NodeKind::ForInStatement { left, .. } | NodeKind::ForOfStatement { left, .. } if *left == id)
}

fn match_fixed_value_after_declare(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("Identifier")
        .iter()
        .copied()
        .filter(|id| {
            let node = ast.get(*id);
            let Some(decl) = node.decl_node else { return false };
            if decl == *id {
                return false;
            }
            let Some(parent) = node.parent else { return false };
            // Exclude the write itself from candidates.
            if matches!(&ast.get(parent).kind, NodeKind::AssignmentExpression { left, .. } if *left == *id) {
                return false;
            }
            if is_for_loop_left(ast, *id) || near_conditional(ast, *id) {
                return false;
            }
            single_literal_write(ast, decl).is_some()
        })
        .collect()
}

fn transform_fixed_value_after_declare(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(decl) = ast.get(node).decl_node else { return };
    let Some(value) = single_literal_write(ast, decl) else { return };
    arborist.replace_node_with_text(node, value.to_string());
}

/// `obj.p = L` where every other `obj.p` access in the same scope is a
/// read (no other assignments/updates anywhere, computed or not) —
/// replace every such read with `L`.
fn direct_assignment_value<'a>(ast: &'a Ast, member: NodeId) -> Option<&'a crate::ast::LiteralValue> {
    let NodeKind::MemberExpression { object, property, .. } = &ast.get(member).kind else { return None };
    let obj_name = ast.get(*object).identifier_name()?;
    let prop_name = property_name(ast, member)?;

    let mut literal_write = None;
    for candidate in ast.of_kind("MemberExpression") {
        if same_property_access(ast, *candidate, obj_name, &prop_name).is_none() {
            continue;
        }
        let Some(parent) = ast.get(*candidate).parent else { continue };
        match &ast.get(parent).kind {
            NodeKind::AssignmentExpression { operator, left, right } if *left == *candidate => {
                if operator != "=" {
                    return None;
                }
                let lit = ast.get(*right).as_literal()?;
                if literal_write.replace((*candidate, lit)).is_some() {
                    return None;
                }
            }
            NodeKind::UpdateExpression { argument, .. } if *argument == *candidate => return None,
            _ => {}
        }
    }
    literal_write.map(|(_, lit)| lit)
}

fn property_name(ast: &Ast, member: NodeId) -> Option<String> {
    let NodeKind::MemberExpression { property, computed, .. } = &ast.get(member).kind else { return None };
    if *computed {
        ast.get(*property).as_literal().and_then(|l| l.as_str()).map(String::from)
    } else {
        ast.get(*property).identifier_name().map(String::from)
    }
}

fn same_property_access(ast: &Ast, candidate: NodeId, obj_name: &str, prop_name: &str) -> Option<()> {
    let NodeKind::MemberExpression { object, .. } = &ast.get(candidate).kind else { return None };
    (ast.get(*object).identifier_name()? == obj_name && property_name(ast, candidate)?.as_str() == prop_name)
        .then_some(())
}

fn match_direct_assignment_property(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("MemberExpression")
        .iter()
        .copied()
        .filter(|id| {
            let Some(parent) = ast.get(*id).parent else { return false };
            let is_read = !matches!(
                &ast.get(parent).kind,
                NodeKind::AssignmentExpression { left, .. } if *left == *id
            ) && !matches!(&ast.get(parent).kind, NodeKind::UpdateExpression { argument, .. } if *argument == *id);
            is_read && direct_assignment_value(ast, *id).is_some()
        })
        .collect()
}

fn transform_direct_assignment_property(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(value) = direct_assignment_value(ast, node) else { return };
    arborist.replace_node_with_text(node, value.to_string());
}

/// Declarations at non-root scope with zero references (§4.E dead-code
/// removal; top-level declarations are skipped since they may be
/// implicitly exported).
fn match_dead_declaration(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("VariableDeclarator")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::VariableDeclarator { id: name_id, .. } = &ast.get(*id).kind else { return false };
            let node = ast.get(*name_id);
            node.scope != crate::ast::ScopeId::root() && node.references.is_empty()
        })
        .collect()
}

fn transform_dead_declaration(_ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    arborist.mark_node(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arborist::Arborist;
    use crate::frontend::{SourceEmitter, SourceParser, TreeSitterFrontend};

    #[test]
    fn resolves_a_literal_index_into_an_untouched_array() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var A = [10, 20, 30, 40]; log(A[2]);").unwrap();
        let matches = match_constant_array_index(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_constant_array_index(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("log(30)"));
    }

    #[test]
    fn skips_array_index_when_the_array_is_reassigned() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var A = [10, 20]; A = other(); log(A[0]);").unwrap();
        assert!(match_constant_array_index(&ast).is_empty());
    }

    #[test]
    fn replaces_reads_of_a_member_proxy_with_the_chain() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("const b = ns.a; log(b);").unwrap();
        let matches = match_proxy_member_chain(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_proxy_member_chain(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("log(ns.a)"));
    }

    #[test]
    fn replaces_reads_after_the_single_literal_write() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("let a; foo(); a = 5; log(a);").unwrap();
        let matches = match_fixed_value_after_declare(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_fixed_value_after_declare(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("log(5)"));
    }

    #[test]
    fn resolves_reads_of_a_singly_assigned_property() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("obj.p = 7; log(obj.p);").unwrap();
        let matches = match_direct_assignment_property(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_direct_assignment_property(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("log(7)"));
    }
}
