//! Safe rules: control-flow simplification (§4.E).

use crate::arborist::Arborist;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::rules::{Rule, Safety};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "simplify_if_empty_branches",
            safety: Safety::Safe,
            match_fn: match_if_empty_branches,
            transform_fn: transform_if_empty_branches,
        },
        Rule {
            name: "resolve_deterministic_ifs",
            safety: Safety::Safe,
            match_fn: match_deterministic_if,
            transform_fn: transform_deterministic_if,
        },
        Rule {
            name: "logical_expression_statement_to_if",
            safety: Safety::Safe,
            match_fn: match_logical_expression_statement,
            transform_fn: transform_logical_expression_statement,
        },
        Rule {
            name: "linearize_literal_driven_switch",
            safety: Safety::Safe,
            match_fn: match_linearizable_switch,
            transform_fn: transform_linearizable_switch,
        },
        Rule {
            name: "normalize_empty_statements",
            safety: Safety::Safe,
            match_fn: match_stray_empty_statement,
            transform_fn: transform_stray_empty_statement,
        },
        Rule {
            name: "remove_redundant_block",
            safety: Safety::Safe,
            match_fn: match_redundant_block,
            transform_fn: transform_redundant_block,
        },
        Rule {
            name: "sequence_expression_statement_split",
            safety: Safety::Safe,
            match_fn: match_sequence_expression_statement,
            transform_fn: transform_sequence_expression_statement,
        },
        Rule {
            name: "extract_leading_sequence_side_effects",
            safety: Safety::Safe,
            match_fn: match_leading_sequence_side_effects,
            transform_fn: transform_leading_sequence_side_effects,
        },
        Rule {
            name: "resolve_redundant_logical_in_if",
            safety: Safety::Safe,
            match_fn: match_redundant_logical_if,
            transform_fn: transform_redundant_logical_if,
        },
        Rule {
            name: "simplify_call_apply_to_direct",
            safety: Safety::Safe,
            match_fn: match_call_or_apply,
            transform_fn: transform_call_or_apply,
        },
        Rule {
            name: "separate_chained_declarators",
            safety: Safety::Safe,
            match_fn: match_chained_declarators,
            transform_fn: transform_chained_declarators,
        },
    ]
}

/// Per-invocation bound on how many cases a single switch-linearization
/// walk may visit, so a cyclic state machine can't hang the rule
/// (spec's "50-iteration" guidance for case-chain walks).
const SWITCH_LINEARIZATION_LIMIT: usize = 50;

/// A switch whose discriminant is an identifier declared with a
/// Literal initializer, so the case it first enters can be resolved
/// statically.
fn switch_entry_value(ast: &Ast, switch: NodeId) -> Option<crate::ast::LiteralValue> {
    let NodeKind::SwitchStatement { discriminant, .. } = &ast.get(switch).kind else { return None };
    if !ast.get(*discriminant).is_identifier() {
        return None;
    }
    let decl = ast.get(*discriminant).decl_node?;
    let parent = ast.get(decl).parent?;
    let NodeKind::VariableDeclarator { id, init } = &ast.get(parent).kind else { return None };
    if *id != decl {
        return None;
    }
    let init = (*init)?;
    ast.get(init).as_literal().cloned()
}

fn match_linearizable_switch(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("SwitchStatement")
        .iter()
        .copied()
        .filter(|id| switch_entry_value(ast, *id).is_some())
        .collect()
}

/// Walks the case chain starting from `entry`, following any literal
/// reassignment of the discriminant made inside a visited case's body,
/// and returns the statements (minus the trailing `break` and the
/// discriminant-reassignment itself) that a static trace would
/// actually execute, in order.
fn linearize(ast: &Ast, switch: NodeId, discriminant_decl: NodeId, mut current: crate::ast::LiteralValue) -> Vec<NodeId> {
    let NodeKind::SwitchStatement { cases, .. } = &ast.get(switch).kind else { return Vec::new() };
    let mut emitted = Vec::new();
    let mut visited = std::collections::HashSet::new();

    loop {
        if visited.len() >= SWITCH_LINEARIZATION_LIMIT {
            break;
        }
        let Some(case) = cases.iter().find(|c| {
            let NodeKind::SwitchCase { test, .. } = &ast.get(**c).kind else { return false };
            test.and_then(|t| ast.get(t).as_literal()).is_some_and(|lit| *lit == current)
        }) else {
            break;
        };
        if !visited.insert(*case) {
            break;
        }
        let NodeKind::SwitchCase { consequent, .. } = &ast.get(*case).kind else { break };

        let mut next_value = None;
        for stmt in consequent {
            if matches!(&ast.get(*stmt).kind, NodeKind::BreakStatement { .. }) {
                break;
            }
            if let Some(value) = discriminant_reassignment(ast, *stmt, discriminant_decl) {
                next_value = Some(value);
                continue;
            }
            emitted.push(*stmt);
        }

        match next_value {
            Some(value) => current = value,
            None => break,
        }
    }

    emitted
}

fn discriminant_reassignment(ast: &Ast, stmt: NodeId, discriminant_decl: NodeId) -> Option<crate::ast::LiteralValue> {
    let NodeKind::ExpressionStatement { expression } = &ast.get(stmt).kind else { return None };
    let NodeKind::AssignmentExpression { operator, left, right } = &ast.get(*expression).kind else {
        return None;
    };
    if operator != "=" || ast.get(*left).decl_node != Some(discriminant_decl) {
        return None;
    }
    ast.get(*right).as_literal().cloned()
}

fn transform_linearizable_switch(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(entry) = switch_entry_value(ast, node) else { return };
    let NodeKind::SwitchStatement { discriminant, .. } = &ast.get(node).kind else { return };
    let Some(decl) = ast.get(*discriminant).decl_node else { return };

    let statements = linearize(ast, node, decl, entry);
    let body = statements
        .into_iter()
        .map(|s| crate::frontend::render::render_node(ast, s))
        .collect::<Vec<_>>()
        .join(" ");
    arborist.replace_node_with_text(node, format!("{{ {} }}", body));
}

fn is_empty_body(ast: &Ast, id: NodeId) -> bool {
    matches!(&ast.get(id).kind, NodeKind::BlockStatement { body } if body.is_empty())
        || matches!(&ast.get(id).kind, NodeKind::EmptyStatement)
}

/// `if(t){}else{}` → `t;`; `if(t){}else A` → `if(!t) A`; `if(t) A else
/// {}` → `if(t) A`.
fn match_if_empty_branches(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("IfStatement")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::IfStatement { consequent, alternate, .. } = &ast.get(*id).kind else {
                return false;
            };
            is_empty_body(ast, *consequent) || alternate.is_some_and(|a| is_empty_body(ast, a))
        })
        .collect()
}

fn transform_if_empty_branches(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::IfStatement { test, consequent, alternate } = &ast.get(node).kind else { return };
    let test_text = crate::frontend::render::render_node(ast, *test);
    let cons_empty = is_empty_body(ast, *consequent);
    match alternate {
        Some(alt) if cons_empty && is_empty_body(ast, *alt) => {
            arborist.replace_node_with_text(node, format!("{};", test_text));
        }
        Some(alt) if cons_empty => {
            let alt_text = crate::frontend::render::render_node(ast, *alt);
            arborist.replace_node_with_text(node, format!("if (!({})) {}", test_text, alt_text));
        }
        Some(alt) if is_empty_body(ast, *alt) => {
            let cons_text = crate::frontend::render::render_node(ast, *consequent);
            arborist.replace_node_with_text(node, format!("if ({}) {}", test_text, cons_text));
        }
        None if cons_empty => {
            arborist.replace_node_with_text(node, format!("{};", test_text));
        }
        _ => {}
    }
}

fn static_truthiness(ast: &Ast, test: NodeId) -> Option<bool> {
    if let Some(lit) = ast.get(test).as_literal() {
        return Some(lit.is_truthy());
    }
    if let NodeKind::UnaryExpression { operator, argument } = &ast.get(test).kind {
        if operator == "!" {
            return static_truthiness(ast, *argument).map(|t| !t);
        }
    }
    None
}

/// `if(LiteralOrUnaryOfLiteral) A else B` → whichever branch the value
/// selects; both branches gone ⇒ delete entirely.
fn match_deterministic_if(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("IfStatement")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::IfStatement { test, .. } = &ast.get(*id).kind else { return false };
            static_truthiness(ast, *test).is_some()
        })
        .collect()
}

fn transform_deterministic_if(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::IfStatement { test, consequent, alternate } = &ast.get(node).kind else { return };
    let Some(truthy) = static_truthiness(ast, *test) else { return };
    let chosen = if truthy { Some(*consequent) } else { *alternate };
    match chosen {
        Some(branch) => {
            arborist.replace_node_with_text(node, crate::frontend::render::render_node(ast, branch));
        }
        None => arborist.mark_node(node),
    }
}

/// `a && b();` / `a || b();` expression statements become `if(a)
/// b();` / `if(!a) b();`.
fn match_logical_expression_statement(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("ExpressionStatement")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::ExpressionStatement { expression } = &ast.get(*id).kind else { return false };
            matches!(
                &ast.get(*expression).kind,
                NodeKind::LogicalExpression { operator, .. } if operator == "&&" || operator == "||"
            )
        })
        .collect()
}

fn transform_logical_expression_statement(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::ExpressionStatement { expression } = &ast.get(node).kind else { return };
    let NodeKind::LogicalExpression { operator, left, right } = &ast.get(*expression).kind else { return };
    let left_text = crate::frontend::render::render_node(ast, *left);
    let right_text = crate::frontend::render::render_node(ast, *right);
    let text = if operator == "&&" {
        format!("if ({}) {};", left_text, right_text)
    } else {
        format!("if (!({})) {};", left_text, right_text)
    };
    arborist.replace_node_with_text(node, text);
}

/// A stray `;` that's an *item* of a `BlockStatement`/`Program` body
/// list, as opposed to the sole direct body of an `if`/`for`/`while`/
/// `do` (§4.E "outside control-flow-statement bodies" — those must
/// stay an `EmptyStatement`, per the Arborist's own deletion rule).
fn is_stray_empty_statement(ast: &Ast, id: NodeId) -> bool {
    if !matches!(&ast.get(id).kind, NodeKind::EmptyStatement) {
        return false;
    }
    let Some(parent) = ast.get(id).parent else { return false };
    matches!(&ast.get(parent).kind, NodeKind::BlockStatement { .. } | NodeKind::Program { .. })
}

fn match_stray_empty_statement(ast: &Ast) -> Vec<NodeId> {
    (0..ast.len() as u32).map(NodeId).filter(|id| is_stray_empty_statement(ast, *id)).collect()
}

fn transform_stray_empty_statement(_ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    arborist.mark_node(node);
}

/// A `BlockStatement` nested directly inside `Program` or another
/// `BlockStatement` — not the single required body of a control-flow
/// statement — flattened by splicing its own statements in place.
fn match_redundant_block(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("BlockStatement")
        .iter()
        .copied()
        .filter(|id| {
            let Some(parent) = ast.get(*id).parent else { return false };
            matches!(&ast.get(parent).kind, NodeKind::BlockStatement { .. } | NodeKind::Program { .. })
        })
        .collect()
}

fn transform_redundant_block(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::BlockStatement { body } = &ast.get(node).kind else { return };
    let text = body.iter().map(|s| crate::frontend::render::render_node(ast, *s)).collect::<Vec<_>>().join(" ");
    arborist.replace_node_with_text(node, text);
}

/// `a, b, c;` as a lone `ExpressionStatement` → `a; b; c;`.
fn match_sequence_expression_statement(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("ExpressionStatement")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::ExpressionStatement { expression } = &ast.get(*id).kind else { return false };
            matches!(&ast.get(*expression).kind, NodeKind::SequenceExpression { .. })
        })
        .collect()
}

fn transform_sequence_expression_statement(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::ExpressionStatement { expression } = &ast.get(node).kind else { return };
    let NodeKind::SequenceExpression { expressions } = &ast.get(*expression).kind else { return };
    let text = expressions
        .iter()
        .map(|e| format!("{};", crate::frontend::render::render_node(ast, *e)))
        .collect::<Vec<_>>()
        .join(" ");
    arborist.replace_node_with_text(node, text);
}

/// `return (a, b, c);` → `a; b; return c;`; `if ((a, b, c)) X` →
/// `a; b; if (c) X`. Both hoist every expression but the last out as
/// its own statement ahead of the original construct.
fn leading_sequence_plan(ast: &Ast, stmt: NodeId) -> Option<(Vec<NodeId>, NodeId, NodeId)> {
    match &ast.get(stmt).kind {
        NodeKind::ReturnStatement { argument } => {
            let seq = (*argument)?;
            let NodeKind::SequenceExpression { expressions } = &ast.get(seq).kind else { return None };
            let (last, leading) = expressions.split_last()?;
            Some((leading.to_vec(), *last, seq))
        }
        NodeKind::IfStatement { test, .. } => {
            let NodeKind::SequenceExpression { expressions } = &ast.get(*test).kind else { return None };
            let (last, leading) = expressions.split_last()?;
            Some((leading.to_vec(), *last, *test))
        }
        _ => None,
    }
}

fn match_leading_sequence_side_effects(ast: &Ast) -> Vec<NodeId> {
    let mut candidates = ast.of_kind("ReturnStatement").to_vec();
    candidates.extend(ast.of_kind("IfStatement"));
    candidates.retain(|id| leading_sequence_plan(ast, *id).is_some());
    candidates
}

fn transform_leading_sequence_side_effects(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some((leading, last, _seq)) = leading_sequence_plan(ast, node) else { return };
    let prelude: String =
        leading.iter().map(|e| format!("{}; ", crate::frontend::render::render_node(ast, *e))).collect();
    let rest = match &ast.get(node).kind {
        NodeKind::ReturnStatement { .. } => {
            format!("return {};", crate::frontend::render::render_node(ast, last))
        }
        NodeKind::IfStatement { consequent, alternate, .. } => {
            let cons = crate::frontend::render::render_node(ast, *consequent);
            match alternate {
                Some(alt) => {
                    format!("if ({}) {} else {}", crate::frontend::render::render_node(ast, last), cons, crate::frontend::render::render_node(ast, *alt))
                }
                None => format!("if ({}) {}", crate::frontend::render::render_node(ast, last), cons),
            }
        }
        _ => return,
    };
    arborist.replace_node_with_text(node, format!("{{ {}{} }}", prelude, rest));
}

/// One operand of `&&`/`||` is a Literal/Array/Object/Function/Regex —
/// deterministically truthy or falsy — so the standard short-circuit
/// truth table collapses the whole test (`if(truthy && x)` → `if(x)`,
/// `if(truthy || x)` → `if(truthy)`, `if(falsy && x)` → `if(falsy)`,
/// `if(falsy || x)` → `if(x)`). Only fires when the logical expression
/// is directly an `if`'s test.
fn static_operand_truthiness(ast: &Ast, id: NodeId) -> Option<bool> {
    match &ast.get(id).kind {
        NodeKind::Literal(v) => Some(v.is_truthy()),
        NodeKind::ArrayExpression { .. } | NodeKind::ObjectExpression { .. } | NodeKind::FunctionExpression { .. } => {
            Some(true)
        }
        _ => None,
    }
}

fn redundant_logical_reduction(ast: &Ast, test: NodeId) -> Option<NodeId> {
    let NodeKind::LogicalExpression { operator, left, right } = &ast.get(test).kind else { return None };
    let truthy = static_operand_truthiness(ast, *left)?;
    match (operator.as_str(), truthy) {
        ("&&", true) | ("||", false) => Some(*right),
        ("&&", false) | ("||", true) => Some(*left),
        _ => None,
    }
}

fn match_redundant_logical_if(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("IfStatement")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::IfStatement { test, .. } = &ast.get(*id).kind else { return false };
            redundant_logical_reduction(ast, *test).is_some()
        })
        .collect()
}

fn transform_redundant_logical_if(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::IfStatement { test, .. } = &ast.get(node).kind else { return };
    let Some(reduced) = redundant_logical_reduction(ast, *test) else { return };
    arborist.replace_node_with_text(*test, crate::frontend::render::render_node(ast, reduced));
}

/// `X.call(this, a, b, …)` / `X.apply(this, [a, b])` → `X(a, b, …)`.
/// Skipped when `X` is the bare `Function` identifier or a
/// `FunctionExpression` (§4.E: calling `.call`/`.apply` on those is
/// itself the point, not an obfuscation artifact to simplify away).
fn direct_call_plan(ast: &Ast, call: NodeId) -> Option<(NodeId, Vec<NodeId>)> {
    let NodeKind::CallExpression { callee, arguments } = &ast.get(call).kind else { return None };
    let NodeKind::MemberExpression { object, property, computed: false } = &ast.get(*callee).kind else {
        return None;
    };
    if matches!(&ast.get(*object).kind, NodeKind::FunctionExpression { .. }) {
        return None;
    }
    if matches!(&ast.get(*object).kind, NodeKind::Identifier { name } if name == "Function") {
        return None;
    }
    let method = ast.get(*property).identifier_name()?;
    if arguments.is_empty() || !matches!(&ast.get(arguments[0]).kind, NodeKind::ThisExpression) {
        return None;
    }
    match method {
        "call" => Some((*object, arguments[1..].to_vec())),
        "apply" => {
            if arguments.len() != 2 {
                return None;
            }
            let NodeKind::ArrayExpression { elements } = &ast.get(arguments[1]).kind else { return None };
            Some((*object, elements.iter().filter_map(|e| *e).collect()))
        }
        _ => None,
    }
}

fn match_call_or_apply(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression").iter().copied().filter(|id| direct_call_plan(ast, *id).is_some()).collect()
}

fn transform_call_or_apply(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some((callee, args)) = direct_call_plan(ast, node) else { return };
    let args_text = args.iter().map(|a| crate::frontend::render::render_node(ast, *a)).collect::<Vec<_>>().join(", ");
    let text = format!("{}({})", crate::frontend::render::render_node(ast, callee), args_text);
    arborist.replace_node_with_text(node, text);
}

/// `let a = 1, b = 2;` → `let a = 1; let b = 2;`, skipped inside a
/// `for(...)` head where the chained form is load-bearing.
fn match_chained_declarators(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("VariableDeclaration")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::VariableDeclaration { declarations, .. } = &ast.get(*id).kind else { return false };
            declarations.len() > 1 && !in_for_head(ast, *id)
        })
        .collect()
}

fn in_for_head(ast: &Ast, id: NodeId) -> bool {
    let Some(parent) = ast.get(id).parent else { return false };
    matches!(&ast.get(parent).kind, NodeKind::ForStatement { init: Some(n), .. } if *n == id)
}

fn transform_chained_declarators(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::VariableDeclaration { kind, declarations } = &ast.get(node).kind else { return };
    let text = declarations
        .iter()
        .map(|d| format!("{} {};", kind.as_str(), crate::frontend::render::render_node(ast, *d)))
        .collect::<Vec<_>>()
        .join(" ");
    arborist.replace_node_with_text(node, text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arborist::Arborist;
    use crate::frontend::{SourceEmitter, SourceParser, TreeSitterFrontend};

    #[test]
    fn linearizes_a_state_machine_switch() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend
            .parse("var s=0; switch(s){ case 0: a(); s=1; break; case 1: b(); break; }")
            .unwrap();
        let switch = ast.of_kind("SwitchStatement")[0];
        let mut arborist = Arborist::new();
        transform_linearizable_switch(&ast, &mut arborist, switch);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("a()") && rendered.contains("b()"));
        assert!(!rendered.contains("switch"));
    }

    #[test]
    fn resolves_true_branch_of_a_literal_if() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("if (true) do_a(); else do_b();").unwrap();
        let matches = match_deterministic_if(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_deterministic_if(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("do_a()"));
        assert!(!rendered.contains("do_b()"));
    }

    #[test]
    fn removes_a_stray_empty_statement_from_a_block() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("{ a(); ; b(); }").unwrap();
        let matches = match_stray_empty_statement(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_stray_empty_statement(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("a()") && rendered.contains("b()"));
    }

    #[test]
    fn flattens_a_nested_block_into_its_enclosing_block() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("{ { a(); b(); } }").unwrap();
        let matches = match_redundant_block(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_redundant_block(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("a()") && rendered.contains("b()"));
    }

    #[test]
    fn splits_a_sequence_expression_statement_into_separate_statements() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("a(), b(), c();").unwrap();
        let matches = match_sequence_expression_statement(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_sequence_expression_statement(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("a();") && rendered.contains("b();") && rendered.contains("c();"));
    }

    #[test]
    fn hoists_leading_side_effects_out_of_a_return_sequence() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("function f() { return (a(), b(), c()); }").unwrap();
        let matches = match_leading_sequence_side_effects(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_leading_sequence_side_effects(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("a();") && rendered.contains("b();") && rendered.contains("return c()"));
    }

    #[test]
    fn collapses_a_logical_test_with_a_statically_truthy_left_operand() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("if (1 && x) y();").unwrap();
        let matches = match_redundant_logical_if(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_redundant_logical_if(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("if (x)"));
    }

    #[test]
    fn rewrites_a_call_with_this_into_a_direct_call() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("f.call(this, 1, 2);").unwrap();
        let matches = match_call_or_apply(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_call_or_apply(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("f(1, 2)"));
    }

    #[test]
    fn splits_chained_declarators_into_separate_declarations() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("let a = 1, b = 2;").unwrap();
        let matches = match_chained_declarators(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_chained_declarators(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("let a = 1;") && rendered.contains("let b = 2;"));
    }

    #[test]
    fn leaves_chained_declarators_in_a_for_head_alone() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("for (let i = 0, j = 1; i < j; i++) {}").unwrap();
        assert!(match_chained_declarators(&ast).is_empty());
    }
}
