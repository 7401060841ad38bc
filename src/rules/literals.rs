//! Safe rules: literal and string algebra (§4.E).

use regex::Regex;

use crate::arborist::Arborist;
use crate::ast::{Ast, LiteralValue, NodeId, NodeKind};
use crate::rules::{Rule, Safety};
use crate::sandbox::globals::base64_decode_bytes;

pub fn rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "fold_binary_literal_expressions",
            safety: Safety::Safe,
            match_fn: match_foldable_binary,
            transform_fn: transform_fold_binary,
        },
        Rule {
            name: "template_literal_to_string",
            safety: Safety::Safe,
            match_fn: match_static_template_literal,
            transform_fn: transform_template_literal,
        },
        Rule {
            name: "normalize_computed_access",
            safety: Safety::Safe,
            match_fn: match_computed_access,
            transform_fn: transform_computed_access,
        },
        Rule {
            name: "decode_base64_call",
            safety: Safety::Safe,
            match_fn: match_atob_call,
            transform_fn: transform_atob_call,
        },
    ]
}

fn fold(op: &str, l: f64, r: f64) -> Option<f64> {
    match op {
        "+" => Some(l + r),
        "-" => Some(l - r),
        "*" => Some(l * r),
        "/" => Some(l / r),
        _ => None,
    }
}

fn match_foldable_binary(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("BinaryExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::BinaryExpression { operator, left, right } = &ast.get(*id).kind else {
                return false;
            };
            let (Some(LiteralValue::Number(l)), Some(LiteralValue::Number(r))) =
                (ast.get(*left).as_literal(), ast.get(*right).as_literal())
            else {
                return false;
            };
            fold(operator, *l, *r).is_some()
        })
        .collect()
}

fn transform_fold_binary(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::BinaryExpression { operator, left, right } = &ast.get(node).kind else { return };
    let (Some(LiteralValue::Number(l)), Some(LiteralValue::Number(r))) =
        (ast.get(*left).as_literal(), ast.get(*right).as_literal())
    else {
        return;
    };
    if let Some(result) = fold(operator, *l, *r) {
        arborist.replace_node_with_text(node, LiteralValue::Number(result).to_string());
    }
}

fn match_static_template_literal(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("TemplateLiteral")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::TemplateLiteral { expressions, .. } = &ast.get(*id).kind else { return false };
            expressions.iter().all(|e| ast.get(*e).as_literal().is_some())
        })
        .collect()
}

fn transform_template_literal(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::TemplateLiteral { quasis, expressions } = &ast.get(node).kind else { return };
    let mut combined = String::new();
    for (i, q) in quasis.iter().enumerate() {
        combined.push_str(q);
        if let Some(e) = expressions.get(i) {
            if let Some(lit) = ast.get(*e).as_literal() {
                combined.push_str(&literal_as_raw_string(lit));
            }
        }
    }
    arborist.replace_node_with_text(node, LiteralValue::Str(combined).to_string());
}

fn literal_as_raw_string(lit: &LiteralValue) -> String {
    match lit {
        LiteralValue::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn identifier_pattern() -> Regex {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("static regex is valid")
}

fn match_computed_access(ast: &Ast) -> Vec<NodeId> {
    let pattern = identifier_pattern();
    ast.of_kind("MemberExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::MemberExpression { property, computed, .. } = &ast.get(*id).kind else {
                return false;
            };
            *computed
                && matches!(
                    ast.get(*property).as_literal(),
                    Some(LiteralValue::Str(s)) if pattern.is_match(s)
                )
        })
        .collect()
}

fn transform_computed_access(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::MemberExpression { object, property, .. } = &ast.get(node).kind else { return };
    let Some(LiteralValue::Str(name)) = ast.get(*property).as_literal() else { return };
    let text = format!("{}.{}", crate::frontend::render::render_node(ast, *object), name);
    arborist.replace_node_with_text(node, text);
}

fn match_atob_call(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::CallExpression { callee, arguments } = &ast.get(*id).kind else { return false };
            if arguments.len() != 1 {
                return false;
            }
            let is_unbound_atob = matches!(
                &ast.get(*callee).kind,
                NodeKind::Identifier { name } if name == "atob"
            ) && ast.get(*callee).decl_node.is_none();
            is_unbound_atob && matches!(ast.get(arguments[0]).as_literal(), Some(LiteralValue::Str(_)))
        })
        .collect()
}

fn transform_atob_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::CallExpression { arguments, .. } = &ast.get(node).kind else { return };
    let Some(LiteralValue::Str(encoded)) = ast.get(arguments[0]).as_literal() else { return };
    let Some(bytes) = base64_decode_bytes(encoded) else { return };
    let decoded: String = bytes.into_iter().map(|b| b as char).collect();
    arborist.replace_node_with_text(node, LiteralValue::Str(decoded).to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arborist::Arborist;
    use crate::frontend::{SourceEmitter, SourceParser, TreeSitterFrontend};

    fn run_once(source: &str) -> String {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse(source).unwrap();
        let mut arborist = Arborist::new();
        for rule in rules() {
            rule.apply(&ast, &mut arborist);
        }
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        frontend.emit(&new_ast)
    }

    #[test]
    fn folds_numeric_binary_literals() {
        assert!(run_once("var x = 2 + 3;").contains('5'));
    }

    #[test]
    fn decodes_an_atob_call_on_a_string_literal() {
        let out = run_once("const encoded = atob('cGFzc3dvcmQ9aGFja01lOTQh');");
        assert!(out.contains("password=hackMe94!"), "got: {out}");
    }

    #[test]
    fn normalizes_identifier_shaped_computed_access() {
        let out = run_once(r#"var v = obj["name"];"#);
        assert!(out.contains("obj.name"), "got: {out}");
    }

    #[test]
    fn leaves_non_identifier_shaped_computed_access_alone() {
        let out = run_once(r#"var v = obj["not-an-id"];"#);
        assert!(out.contains(r#"obj["not-an-id"]"#), "got: {out}");
    }
}
