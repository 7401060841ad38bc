//! Safe rules: function unwrapping (§4.E).

use crate::arborist::Arborist;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::rules::{Rule, Safety};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "function_shell_replacement",
            safety: Safety::Safe,
            match_fn: match_function_shell_call,
            transform_fn: transform_function_shell_call,
        },
        Rule {
            name: "iife_shell_value",
            safety: Safety::Safe,
            match_fn: match_iife_shell,
            transform_fn: transform_iife_shell,
        },
        Rule {
            name: "unwrap_simple_operation_wrapper",
            safety: Safety::Safe,
            match_fn: match_simple_operation_wrapper_call,
            transform_fn: transform_simple_operation_wrapper_call,
        },
        Rule {
            name: "call_returns_identifier_unwrap",
            safety: Safety::Safe,
            match_fn: match_call_returns_identifier,
            transform_fn: transform_call_returns_identifier,
        },
        Rule {
            name: "proxy_call_function",
            safety: Safety::Safe,
            match_fn: match_proxy_call_function,
            transform_fn: transform_proxy_call_function,
        },
        Rule {
            name: "apply_this_arguments_shell",
            safety: Safety::Safe,
            match_fn: match_apply_arguments_shell,
            transform_fn: transform_apply_arguments_shell,
        },
        Rule {
            name: "iife_unwrap_multi_statement",
            safety: Safety::Safe,
            match_fn: match_multi_statement_iife,
            transform_fn: transform_multi_statement_iife,
        },
        Rule {
            name: "resolve_function_constructor_literal",
            safety: Safety::Safe,
            match_fn: match_function_constructor_call,
            transform_fn: transform_function_constructor_call,
        },
        Rule {
            name: "resolve_new_function_literal_call",
            safety: Safety::Safe,
            match_fn: match_new_function_literal_call,
            transform_fn: transform_new_function_literal_call,
        },
    ]
}

/// A function body that is exactly one `return <Literal-or-Identifier>;`
/// statement.
fn shell_return_value(ast: &Ast, func: NodeId) -> Option<NodeId> {
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
    let is_literal_or_identifier =
        ast.get(value).as_literal().is_some() || ast.get(value).is_identifier();
    is_literal_or_identifier.then_some(value)
}

/// `function f(){ return L_or_Id; }` — every *call* to `f` is replaced
/// with the returned value; other references to `f` stay intact.
fn match_function_shell_call(ast: &Ast) -> Vec<NodeId> {
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
            matches!(&ast.get(func_decl).kind, NodeKind::FunctionDeclaration { .. })
                && shell_return_value(ast, func_decl).is_some()
        })
        .collect()
}

fn transform_function_shell_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::CallExpression { callee, .. } = &ast.get(node).kind else { return };
    let Some(decl) = ast.get(*callee).decl_node else { return };
    let Some(func_decl) = ast.get(decl).parent else { return };
    let Some(value) = shell_return_value(ast, func_decl) else { return };
    arborist.replace_node_with_text(node, crate::frontend::render::render_node(ast, value));
}

/// `(function(){ return L_or_Id; })()` with zero arguments.
fn iife_return_value(ast: &Ast, call: NodeId) -> Option<NodeId> {
    let NodeKind::CallExpression { callee, arguments } = &ast.get(call).kind else { return None };
    if !arguments.is_empty() {
        return None;
    }
    if !matches!(&ast.get(*callee).kind, NodeKind::FunctionExpression { .. }) {
        return None;
    }
    shell_return_value(ast, *callee)
}

fn match_iife_shell(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression").iter().copied().filter(|id| iife_return_value(ast, *id).is_some()).collect()
}

fn transform_iife_shell(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    if let Some(value) = iife_return_value(ast, node) {
        arborist.replace_node_with_text(node, crate::frontend::render::render_node(ast, value));
    }
}

/// `function op(a,b){ return a <binop> b; }` (body is exactly that
/// return) — every call `op(x,y)` becomes `x <binop> y`, operand
/// counts enforced.
fn binary_operation_shell(ast: &Ast, func: NodeId) -> Option<(NodeId, NodeId, String)> {
    let (params, body) = match &ast.get(func).kind {
        NodeKind::FunctionDeclaration { params, body, .. } | NodeKind::FunctionExpression { params, body, .. } => {
            (params.clone(), *body)
        }
        _ => return None,
    };
    if params.len() != 2 {
        return None;
    }
    let NodeKind::BlockStatement { body: stmts } = &ast.get(body).kind else { return None };
    if stmts.len() != 1 {
        return None;
    }
    let NodeKind::ReturnStatement { argument } = &ast.get(stmts[0]).kind else { return None };
    let expr = (*argument)?;
    let NodeKind::BinaryExpression { operator, left, right } = &ast.get(expr).kind else { return None };
    let left_name = ast.get(*left).identifier_name()?;
    let right_name = ast.get(*right).identifier_name()?;
    let param0 = ast.get(params[0]).identifier_name()?;
    let param1 = ast.get(params[1]).identifier_name()?;
    if left_name != param0 || right_name != param1 {
        return None;
    }
    Some((params[0], params[1], operator.clone()))
}

fn match_simple_operation_wrapper_call(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::CallExpression { callee, arguments } = &ast.get(*id).kind else { return false };
            if arguments.len() != 2 {
                return false;
            }
            let Some(decl) = ast.get(*callee).decl_node else { return false };
            let Some(func_decl) = ast.get(decl).parent else { return false };
            binary_operation_shell(ast, func_decl).is_some()
        })
        .collect()
}

fn transform_simple_operation_wrapper_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::CallExpression { callee, arguments } = &ast.get(node).kind else { return };
    let Some(decl) = ast.get(*callee).decl_node else { return };
    let Some(func_decl) = ast.get(decl).parent else { return };
    let Some((_, _, operator)) = binary_operation_shell(ast, func_decl) else { return };
    let text = format!(
        "({} {} {})",
        crate::frontend::render::render_node(ast, arguments[0]),
        operator,
        crate::frontend::render::render_node(ast, arguments[1])
    );
    arborist.replace_node_with_text(node, text);
}

/// A function (declaration, expression, or expression-bodied arrow)
/// whose entire body is `return <bare identifier>;` — as opposed to
/// [`shell_return_value`], which also accepts a Literal. Kept separate
/// because callers with arguments still need those arguments forwarded
/// (§4.E "call-returns-identifier unwrap").
fn returned_identifier_name(ast: &Ast, func: NodeId) -> Option<&str> {
    let value = match &ast.get(func).kind {
        NodeKind::FunctionDeclaration { body, .. } | NodeKind::FunctionExpression { body, .. } => {
            let NodeKind::BlockStatement { body: stmts } = &ast.get(*body).kind else { return None };
            if stmts.len() != 1 {
                return None;
            }
            let NodeKind::ReturnStatement { argument } = &ast.get(stmts[0]).kind else { return None };
            (*argument)?
        }
        NodeKind::ArrowFunctionExpression { body, expression_body: true, .. } => *body,
        _ => return None,
    };
    ast.get(value).identifier_name()
}

/// `function f(){ return g; }; f(args)` → `g(args)`; also `const f =
/// () => g;`. Only the callee is rewritten — arguments pass through
/// untouched, unlike the zero-arg-only `function_shell_replacement`.
fn match_call_returns_identifier(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::CallExpression { callee, .. } = &ast.get(*id).kind else { return false };
            let Some(decl) = ast.get(*callee).decl_node else { return false };
            let Some(func_decl) = ast.get(decl).parent else { return false };
            returned_identifier_name(ast, func_decl).is_some()
        })
        .collect()
}

fn transform_call_returns_identifier(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::CallExpression { callee, .. } = &ast.get(node).kind else { return };
    let Some(decl) = ast.get(*callee).decl_node else { return };
    let Some(func_decl) = ast.get(decl).parent else { return };
    let Some(name) = returned_identifier_name(ast, func_decl) else { return };
    arborist.replace_node_with_text(*callee, name.to_string());
}

/// `function outer(a,b){ return inner(a,b); }` with parameters passed
/// straight through in order and count — every *use* of `outer`
/// (not only calls) is replaced with `inner`.
fn proxy_call_target(ast: &Ast, func: NodeId) -> Option<&str> {
    let (params, body) = match &ast.get(func).kind {
        NodeKind::FunctionDeclaration { params, body, .. } | NodeKind::FunctionExpression { params, body, .. } => {
            (params, *body)
        }
        _ => return None,
    };
    let NodeKind::BlockStatement { body: stmts } = &ast.get(body).kind else { return None };
    if stmts.len() != 1 {
        return None;
    }
    let NodeKind::ReturnStatement { argument } = &ast.get(stmts[0]).kind else { return None };
    let call = (*argument)?;
    let NodeKind::CallExpression { callee, arguments } = &ast.get(call).kind else { return None };
    if arguments.len() != params.len() {
        return None;
    }
    for (arg, param) in arguments.iter().zip(params.iter()) {
        if ast.get(*arg).identifier_name() != ast.get(*param).identifier_name() {
            return None;
        }
    }
    ast.get(*callee).identifier_name()
}

fn match_proxy_call_function(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("FunctionDeclaration")
        .iter()
        .filter_map(|func| {
            let NodeKind::FunctionDeclaration { id: Some(id), .. } = &ast.get(*func).kind else { return None };
            proxy_call_target(ast, *func)?;
            Some(ast.get(*id).references.clone())
        })
        .flatten()
        .collect()
}

fn transform_proxy_call_function(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(decl) = ast.get(node).decl_node else { return };
    let Some(func) = ast.get(decl).parent else { return };
    let Some(target) = proxy_call_target(ast, func) else { return };
    arborist.replace_node_with_text(node, target.to_string());
}

/// `function outer(p){ return (function inner(){…}).apply(this,
/// arguments); }` — every use of `outer` is replaced with `inner`.
fn apply_shell_target(ast: &Ast, func: NodeId) -> Option<NodeId> {
    let body = match &ast.get(func).kind {
        NodeKind::FunctionDeclaration { body, .. } | NodeKind::FunctionExpression { body, .. } => *body,
        _ => return None,
    };
    let NodeKind::BlockStatement { body: stmts } = &ast.get(body).kind else { return None };
    if stmts.len() != 1 {
        return None;
    }
    let NodeKind::ReturnStatement { argument } = &ast.get(stmts[0]).kind else { return None };
    let call = (*argument)?;
    let NodeKind::CallExpression { callee, arguments } = &ast.get(call).kind else { return None };
    if arguments.len() != 2 {
        return None;
    }
    if !matches!(&ast.get(arguments[0]).kind, NodeKind::ThisExpression) {
        return None;
    }
    if ast.get(arguments[1]).identifier_name() != Some("arguments") {
        return None;
    }
    let NodeKind::MemberExpression { object, property, computed: false } = &ast.get(*callee).kind else {
        return None;
    };
    if ast.get(*property).identifier_name() != Some("apply") {
        return None;
    }
    matches!(&ast.get(*object).kind, NodeKind::FunctionExpression { .. }).then_some(*object)
}

fn match_apply_arguments_shell(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("FunctionDeclaration")
        .iter()
        .filter_map(|func| {
            let NodeKind::FunctionDeclaration { id: Some(id), .. } = &ast.get(*func).kind else { return None };
            apply_shell_target(ast, *func)?;
            Some(ast.get(*id).references.clone())
        })
        .flatten()
        .collect()
}

fn transform_apply_arguments_shell(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(decl) = ast.get(node).decl_node else { return };
    let Some(func) = ast.get(decl).parent else { return };
    let Some(inner) = apply_shell_target(ast, func) else { return };
    let NodeKind::FunctionExpression { id: inner_id, .. } = &ast.get(inner).kind else { return };
    let name = match inner_id {
        Some(inner_id) => ast.get(*inner_id).identifier_name().unwrap_or_default().to_string(),
        None => crate::frontend::render::render_node(ast, inner),
    };
    arborist.replace_node_with_text(node, name);
}

/// `const v = (function(){ stmt; …; return X; })();` — flattens the
/// IIFE's leading statements into the enclosing block ahead of `const
/// v = X;`, rather than requiring the body be a single `return`
/// (§4.E "IIFE unwrapping", the multi-statement case
/// `function_shell_replacement`/`iife_shell_value` don't cover).
fn multi_statement_iife_plan(ast: &Ast, declarator: NodeId) -> Option<(Vec<NodeId>, NodeId)> {
    let NodeKind::VariableDeclarator { init, .. } = &ast.get(declarator).kind else { return None };
    let call = (*init)?;
    let NodeKind::CallExpression { callee, arguments } = &ast.get(call).kind else { return None };
    if !arguments.is_empty() {
        return None;
    }
    let body = match &ast.get(*callee).kind {
        NodeKind::FunctionExpression { body, .. } => *body,
        NodeKind::ArrowFunctionExpression { body, expression_body: false, .. } => *body,
        _ => return None,
    };
    let NodeKind::BlockStatement { body: stmts } = &ast.get(body).kind else { return None };
    if stmts.len() < 2 {
        return None;
    }
    let (last, leading) = stmts.split_last()?;
    let NodeKind::ReturnStatement { argument } = &ast.get(*last).kind else { return None };
    let value = (*argument)?;
    Some((leading.to_vec(), value))
}

fn match_multi_statement_iife(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("VariableDeclaration")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::VariableDeclaration { declarations, .. } = &ast.get(*id).kind else { return false };
            declarations.len() == 1 && multi_statement_iife_plan(ast, declarations[0]).is_some()
        })
        .collect()
}

fn transform_multi_statement_iife(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::VariableDeclaration { kind, declarations } = &ast.get(node).kind else { return };
    let Some((leading, value)) = multi_statement_iife_plan(ast, declarations[0]) else { return };
    let NodeKind::VariableDeclarator { id, .. } = &ast.get(declarations[0]).kind else { return };

    let mut text = String::new();
    for stmt in leading {
        text.push_str(&crate::frontend::render::render_node(ast, stmt));
        text.push(' ');
    }
    text.push_str(&format!(
        "{} {} = {};",
        kind.as_str(),
        crate::frontend::render::render_node(ast, *id),
        crate::frontend::render::render_node(ast, value)
    ));
    arborist.replace_node_with_text(node, text);
}

/// `Function("a","b","body")` (the constructor called without `new`,
/// callee unbound) where every argument is a string Literal — builds a
/// `FunctionExpression` with those parameter names and that body.
fn match_function_constructor_call(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::CallExpression { callee, arguments } = &ast.get(*id).kind else { return false };
            if arguments.is_empty() {
                return false;
            }
            let is_unbound_function = matches!(
                &ast.get(*callee).kind,
                NodeKind::Identifier { name } if name == "Function"
            ) && ast.get(*callee).decl_node.is_none();
            is_unbound_function
                && arguments.iter().all(|a| matches!(ast.get(*a).as_literal(), Some(crate::ast::LiteralValue::Str(_))))
        })
        .collect()
}

fn transform_function_constructor_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::CallExpression { arguments, .. } = &ast.get(node).kind else { return };
    let Some((body_arg, param_args)) = arguments.split_last() else { return };
    let Some(crate::ast::LiteralValue::Str(body)) = ast.get(*body_arg).as_literal() else { return };
    let params: Vec<String> = param_args
        .iter()
        .filter_map(|a| match ast.get(*a).as_literal() {
            Some(crate::ast::LiteralValue::Str(s)) => Some(s.clone()),
            _ => None,
        })
        .collect();
    if params.len() != param_args.len() {
        return;
    }
    let text = format!("function({}) {{ {} }}", params.join(", "), body);
    arborist.replace_node_with_text(node, text);
}

/// `new Function("body")()` — a `new Function(...)` construction
/// invoked immediately, with a single string-Literal argument. Unlike
/// [`match_function_constructor_call`], which only builds a
/// `FunctionExpression` from the bare constructor call, this one
/// inlines the body directly: when the call is its own
/// `ExpressionStatement` the body's statements replace it wholesale,
/// otherwise the call becomes an IIFE wrapping the body so later
/// passes (`iife_shell_value`, `iife_unwrap_multi_statement`) can keep
/// unwrapping it.
fn new_function_literal_body(ast: &Ast, call: NodeId) -> Option<&str> {
    let NodeKind::CallExpression { callee, arguments } = &ast.get(call).kind else { return None };
    if !arguments.is_empty() {
        return None;
    }
    let NodeKind::NewExpression { callee: ctor, arguments: ctor_args } = &ast.get(*callee).kind else { return None };
    if ctor_args.len() != 1 {
        return None;
    }
    let is_unbound_function =
        matches!(&ast.get(*ctor).kind, NodeKind::Identifier { name } if name == "Function") && ast.get(*ctor).decl_node.is_none();
    if !is_unbound_function {
        return None;
    }
    match ast.get(ctor_args[0]).as_literal() {
        Some(crate::ast::LiteralValue::Str(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn match_new_function_literal_call(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression").iter().copied().filter(|id| new_function_literal_body(ast, *id).is_some()).collect()
}

fn transform_new_function_literal_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(body) = new_function_literal_body(ast, node) else { return };
    let body = body.to_string();
    let target_statement = ast.get(node).parent.filter(|p| matches!(&ast.get(*p).kind, NodeKind::ExpressionStatement { .. }));
    match target_statement {
        Some(stmt) => arborist.replace_node_with_text(stmt, body),
        None => arborist.replace_node_with_text(node, format!("(function() {{ {} }})()", body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arborist::Arborist;
    use crate::frontend::{SourceEmitter, SourceParser, TreeSitterFrontend};

    #[test]
    fn unwraps_a_zero_arg_iife_shell() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("(function(){ return 42; })();").unwrap();
        let matches = match_iife_shell(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_iife_shell(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("42"));
    }

    #[test]
    fn unwraps_a_named_add_wrapper() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("function add(a,b){ return a + b; } var x = add(1, 2);").unwrap();
        let matches = match_simple_operation_wrapper_call(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_simple_operation_wrapper_call(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("(1 + 2)"));
    }

    #[test]
    fn forwards_arguments_through_a_call_returns_identifier_wrapper() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("function f(){ return g; } f(1, 2);").unwrap();
        let matches = match_call_returns_identifier(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_call_returns_identifier(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("g(1, 2)"));
    }

    #[test]
    fn replaces_a_proxy_call_function_with_its_target() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("function outer(a,b){ return inner(a,b); } outer(1,2);").unwrap();
        let matches = match_proxy_call_function(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_proxy_call_function(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("inner(1, 2)"));
    }

    #[test]
    fn flattens_a_multi_statement_iife_into_its_enclosing_block() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("const v = (function(){ side(); return 9; })();").unwrap();
        let matches = match_multi_statement_iife(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_multi_statement_iife(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("side()") && rendered.contains("v = 9"));
    }

    #[test]
    fn builds_a_function_expression_from_constructor_arguments() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var f = Function('a', 'b', 'return a + b;');").unwrap();
        let matches = match_function_constructor_call(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_function_constructor_call(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("function(a, b)") && rendered.contains("return a + b;"));
    }

    #[test]
    fn inlines_an_invoked_new_function_literal_as_a_statement() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("new Function('console.log(1);')();").unwrap();
        let matches = match_new_function_literal_call(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_new_function_literal_call(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("console.log(1)") && !rendered.contains("new Function"));
    }

    #[test]
    fn wraps_an_invoked_new_function_literal_used_as_a_value_in_an_iife() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var x = new Function('return 9;')();").unwrap();
        let matches = match_new_function_literal_call(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_new_function_literal_call(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("function()") && rendered.contains("return 9;"));
    }
}
