//! Renders an [`Ast`] back to JS source text — the "codegen" half of
//! the external collaborator spec.md leaves unspecified.
//!
//! Every node keeps the exact byte slice it was parsed from in
//! [`Node::src`]; the Arborist reuses that slice verbatim for any
//! subtree a commit didn't touch, and clears it on every ancestor of a
//! splice point so rendering falls through to the recursive
//! pretty-printer below for exactly the nodes that changed. A rule
//! building a synthetic replacement node (e.g. a new `Literal`) never
//! sets `src`, so it's always pretty-printed.

use crate::ast::{Ast, MethodKind, NodeId, NodeKind};

pub fn render(ast: &Ast) -> String {
    render_node(ast, ast.root)
}

pub fn render_node(ast: &Ast, id: NodeId) -> String {
    let node = ast.get(id);
    if !node.src.is_empty() {
        return node.src.clone();
    }
    render_kind(ast, &node.kind)
}

fn join(ast: &Ast, ids: &[NodeId], sep: &str) -> String {
    ids.iter().map(|id| render_node(ast, *id)).collect::<Vec<_>>().join(sep)
}

fn render_kind(ast: &Ast, kind: &NodeKind) -> String {
    match kind {
        NodeKind::Program { body } => join_statements(ast, body),
        NodeKind::Literal(v) => v.to_string(),
        NodeKind::Identifier { name } => name.clone(),
        NodeKind::ThisExpression => "this".to_string(),
        NodeKind::MemberExpression { object, property, computed } => {
            if *computed {
                format!("{}[{}]", render_node(ast, *object), render_node(ast, *property))
            } else {
                format!("{}.{}", render_node(ast, *object), render_node(ast, *property))
            }
        }
        NodeKind::CallExpression { callee, arguments } => {
            format!("{}({})", render_node(ast, *callee), join(ast, arguments, ", "))
        }
        NodeKind::NewExpression { callee, arguments } => {
            format!("new {}({})", render_node(ast, *callee), join(ast, arguments, ", "))
        }
        NodeKind::FunctionDeclaration { id, params, body } | NodeKind::FunctionExpression { id, params, body } => {
            let name = id.map(|n| format!(" {}", render_node(ast, n))).unwrap_or_default();
            format!("function{}({}) {}", name, join(ast, params, ", "), render_node(ast, *body))
        }
        NodeKind::ArrowFunctionExpression { params, body, expression_body } => {
            let body_text = render_node(ast, *body);
            if *expression_body {
                format!("({}) => ({})", join(ast, params, ", "), body_text)
            } else {
                format!("({}) => {}", join(ast, params, ", "), body_text)
            }
        }
        NodeKind::VariableDeclaration { kind, declarations } => {
            format!("{} {};", kind.as_str(), join(ast, declarations, ", "))
        }
        NodeKind::VariableDeclarator { id, init } => match init {
            Some(i) => format!("{} = {}", render_node(ast, *id), render_node(ast, *i)),
            None => render_node(ast, *id),
        },
        NodeKind::AssignmentExpression { operator, left, right } => {
            format!("{} {} {}", render_node(ast, *left), operator, render_node(ast, *right))
        }
        NodeKind::BinaryExpression { operator, left, right }
        | NodeKind::LogicalExpression { operator, left, right } => {
            format!("({} {} {})", render_node(ast, *left), operator, render_node(ast, *right))
        }
        NodeKind::UnaryExpression { operator, argument } => {
            let space = if operator.chars().next().is_some_and(|c| c.is_alphabetic()) { " " } else { "" };
            format!("{}{}{}", operator, space, render_node(ast, *argument))
        }
        NodeKind::UpdateExpression { operator, argument, prefix } => {
            if *prefix {
                format!("{}{}", operator, render_node(ast, *argument))
            } else {
                format!("{}{}", render_node(ast, *argument), operator)
            }
        }
        NodeKind::ConditionalExpression { test, consequent, alternate } => {
            format!(
                "({} ? {} : {})",
                render_node(ast, *test),
                render_node(ast, *consequent),
                render_node(ast, *alternate)
            )
        }
        NodeKind::SequenceExpression { expressions } => {
            format!("({})", join(ast, expressions, ", "))
        }
        NodeKind::TemplateLiteral { quasis, expressions } => {
            let mut out = String::from("`");
            for (i, q) in quasis.iter().enumerate() {
                out.push_str(q);
                if let Some(e) = expressions.get(i) {
                    out.push_str("${");
                    out.push_str(&render_node(ast, *e));
                    out.push('}');
                }
            }
            out.push('`');
            out
        }
        NodeKind::BlockStatement { body } => {
            format!("{{\n{}\n}}", indent(&join_statements(ast, body)))
        }
        NodeKind::ExpressionStatement { expression } => {
            format!("{};", render_node(ast, *expression))
        }
        NodeKind::IfStatement { test, consequent, alternate } => {
            let mut out = format!("if ({}) {}", render_node(ast, *test), render_node(ast, *consequent));
            if let Some(a) = alternate {
                out.push_str(&format!(" else {}", render_node(ast, *a)));
            }
            out
        }
        NodeKind::ForStatement { init, test, update, body } => {
            format!(
                "for ({}; {}; {}) {}",
                init.map(|n| render_node(ast, n)).unwrap_or_default(),
                test.map(|n| render_node(ast, n)).unwrap_or_default(),
                update.map(|n| render_node(ast, n)).unwrap_or_default(),
                render_node(ast, *body)
            )
        }
        NodeKind::ForInStatement { left, right, body } => {
            format!("for ({} in {}) {}", render_node(ast, *left), render_node(ast, *right), render_node(ast, *body))
        }
        NodeKind::ForOfStatement { left, right, body } => {
            format!("for ({} of {}) {}", render_node(ast, *left), render_node(ast, *right), render_node(ast, *body))
        }
        NodeKind::WhileStatement { test, body } => {
            format!("while ({}) {}", render_node(ast, *test), render_node(ast, *body))
        }
        NodeKind::DoWhileStatement { test, body } => {
            format!("do {} while ({});", render_node(ast, *body), render_node(ast, *test))
        }
        NodeKind::SwitchStatement { discriminant, cases } => {
            format!("switch ({}) {{\n{}\n}}", render_node(ast, *discriminant), indent(&join(ast, cases, "\n")))
        }
        NodeKind::SwitchCase { test, consequent } => match test {
            Some(t) => format!("case {}:\n{}", render_node(ast, *t), indent(&join_statements(ast, consequent))),
            None => format!("default:\n{}", indent(&join_statements(ast, consequent))),
        },
        NodeKind::ReturnStatement { argument } => match argument {
            Some(a) => format!("return {};", render_node(ast, *a)),
            None => "return;".to_string(),
        },
        NodeKind::BreakStatement { label } => match label {
            Some(l) => format!("break {};", l),
            None => "break;".to_string(),
        },
        NodeKind::EmptyStatement => ";".to_string(),
        NodeKind::ArrayExpression { elements } => {
            let items: Vec<String> = elements
                .iter()
                .map(|e| e.map(|id| render_node(ast, id)).unwrap_or_default())
                .collect();
            format!("[{}]", items.join(", "))
        }
        NodeKind::ObjectExpression { properties } => {
            format!("{{ {} }}", join(ast, properties, ", "))
        }
        NodeKind::Property { key, value, computed, shorthand } => {
            if *shorthand {
                render_node(ast, *key)
            } else if *computed {
                format!("[{}]: {}", render_node(ast, *key), render_node(ast, *value))
            } else {
                format!("{}: {}", render_node(ast, *key), render_node(ast, *value))
            }
        }
        NodeKind::MethodDefinition { key, value, computed, kind } => {
            let prefix = match kind {
                MethodKind::Get => "get ",
                MethodKind::Set => "set ",
                MethodKind::Method | MethodKind::Constructor => "",
            };
            let key_text = if *computed { format!("[{}]", render_node(ast, *key)) } else { render_node(ast, *key) };
            let (params, body) = match &ast.get(*value).kind {
                NodeKind::FunctionExpression { params, body, .. } => (params.clone(), *body),
                _ => (Vec::new(), *value),
            };
            format!("{}{}({}) {}", prefix, key_text, join(ast, &params, ", "), render_node(ast, body))
        }
        NodeKind::ClassDeclaration { id, body } => {
            let name = id.map(|n| format!(" {}", render_node(ast, n))).unwrap_or_default();
            format!("class{} {{\n{}\n}}", name, indent(&join(ast, body, "\n")))
        }
        NodeKind::Unknown { .. } => String::new(),
    }
}

fn join_statements(ast: &Ast, ids: &[NodeId]) -> String {
    ids.iter().map(|id| render_node(ast, *id)).collect::<Vec<_>>().join("\n")
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("  {}", l)).collect::<Vec<_>>().join("\n")
}
