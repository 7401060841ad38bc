//! Unsafe rules: anything that calls the sandboxed evaluator or
//! otherwise depends on runtime semantics (§4.E).

use std::cell::RefCell;

use crate::arborist::Arborist;
use crate::ast::{Ast, LiteralValue, NodeId, NodeKind};
use crate::cache::{CacheEntry, ScriptCache};
use crate::context::declaration_with_context;
use crate::rules::{Rule, Safety};
use crate::sandbox;

thread_local! {
    /// One cache per thread, matching the engine's single-threaded,
    /// cooperative concurrency model (§5) — there's never a second
    /// thread to share it with or race against.
    static EVAL_CACHE: RefCell<ScriptCache> = RefCell::new(ScriptCache::new());
}

fn eval_cached(rule_name: &str, fragment: &str) -> Option<LiteralValue> {
    let key = ScriptCache::key(rule_name, fragment);
    if let Some(hit) = EVAL_CACHE.with(|c| c.borrow().get(&key).cloned()) {
        return match hit {
            CacheEntry::Literal(v) => Some(v),
            CacheEntry::BadValue => None,
        };
    }
    let result = sandbox::eval_in_vm(fragment);
    let entry = match &result {
        Some(v) => CacheEntry::Literal(v.clone()),
        None => CacheEntry::BadValue,
    };
    EVAL_CACHE.with(|c| c.borrow_mut().insert(key, entry));
    result
}

pub fn rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "eval_expression_via_sandbox_context",
            safety: Safety::Unsafe,
            match_fn: match_evaluable_expression,
            transform_fn: transform_evaluable_expression,
        },
        Rule {
            name: "replace_eval_literal",
            safety: Safety::Unsafe,
            match_fn: match_eval_literal_call,
            transform_fn: transform_eval_literal_call,
        },
        Rule {
            name: "resolve_eval_nonliteral_argument",
            safety: Safety::Unsafe,
            match_fn: match_eval_nonliteral_call,
            transform_fn: transform_eval_nonliteral_call,
        },
        Rule {
            name: "resolve_deterministic_conditional",
            safety: Safety::Unsafe,
            match_fn: match_deterministic_conditional,
            transform_fn: transform_deterministic_conditional,
        },
        Rule {
            name: "resolve_member_access_on_literals",
            safety: Safety::Unsafe,
            match_fn: match_literal_member_access,
            transform_fn: transform_literal_member_access,
        },
        Rule {
            name: "resolve_allowlisted_builtin_call",
            safety: Safety::Unsafe,
            match_fn: match_builtin_call,
            transform_fn: transform_builtin_call,
        },
        Rule {
            name: "normalize_redundant_not",
            safety: Safety::Unsafe,
            match_fn: match_redundant_not,
            transform_fn: transform_redundant_not,
        },
        Rule {
            name: "resolve_local_calls",
            safety: Safety::Unsafe,
            match_fn: match_local_call,
            transform_fn: transform_local_call,
        },
        Rule {
            name: "resolve_context_member_access",
            safety: Safety::Unsafe,
            match_fn: match_context_member_access,
            transform_fn: transform_context_member_access,
        },
        Rule {
            name: "resolve_augmented_function_wrapped_arrays",
            safety: Safety::Unsafe,
            match_fn: match_augmented_function_call,
            transform_fn: transform_augmented_function_call,
        },
        Rule {
            name: "resolve_injected_prototype_methods",
            safety: Safety::Unsafe,
            match_fn: match_prototype_method_call,
            transform_fn: transform_prototype_method_call,
        },
    ]
}

/// Hard deny-list (§4.E) — never evaluated regardless of how
/// literal-looking the arguments are.
const BUILTIN_DENY_LIST: &[&str] =
    &["Function", "eval", "Array", "Object", "fetch", "XMLHttpRequest", "Promise", "console", "performance", "$"];

/// Callees on the global skip-list (§4.E "resolve local calls") —
/// evaluating a call rooted at one of these risks depending on host
/// state the sandbox can't faithfully reproduce.
const LOCAL_CALL_CALLEE_SKIP_LIST: &[&str] = &[
    "window", "this", "self", "document", "module", "$", "jQuery", "navigator", "typeof", "new", "Date", "Math",
    "Promise", "Error", "fetch", "XMLHttpRequest", "performance", "globalThis",
];

/// Property names on the skip-list — resolving a call to one of these
/// either depends on mutable host state (`push`, `sort`, …) or on a
/// value irrelevant to the sandbox (`getTime`, `now`, …).
const LOCAL_CALL_PROPERTY_SKIP_LIST: &[&str] = &[
    "test", "exec", "match", "length", "freeze", "call", "apply", "create", "getTime", "now", "getMilliseconds",
    "push", "forEach", "pop", "insert", "add", "set", "delete", "shift", "unshift", "splice", "sort", "reverse",
    "fill", "copyWithin",
];

/// Binary/call expressions whose operands aren't already plain
/// literals (the safe literal-folding rule would have handled that
/// case already) and that aren't one of the already-covered shapes —
/// the general fallback: render the node plus its declaration context
/// and ask the sandbox what it evaluates to.
fn is_candidate_kind(ast: &Ast, id: NodeId) -> bool {
    match &ast.get(id).kind {
        NodeKind::BinaryExpression { left, right, .. } => {
            ast.get(*left).as_literal().is_none() || ast.get(*right).as_literal().is_none()
        }
        NodeKind::UnaryExpression { .. } => true,
        _ => false,
    }
}

/// This same candidate set also covers minimal-alphabet (JSFuck-style)
/// expressions — `+[]`, `![]+[]`, `+!+[]`, … all fall out of the same
/// "Binary/Unary whose operand isn't a plain literal" shape. The only
/// extra guard they need is skipping any expression that reaches a
/// `this` — resolving that statically would silently drop the receiver.
fn match_evaluable_expression(ast: &Ast) -> Vec<NodeId> {
    let mut candidates = ast.of_kind("BinaryExpression").to_vec();
    candidates.extend(ast.of_kind("UnaryExpression"));
    candidates.retain(|id| is_candidate_kind(ast, *id) && !contains_this(ast, *id));
    candidates.sort_by_key(|id| ast.get(*id).range.start);
    candidates
}

fn transform_evaluable_expression(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let context_stmts = declaration_with_context(ast, node, false);
    let prelude: String = context_stmts
        .iter()
        .filter(|stmt| **stmt != node)
        .map(|stmt| crate::frontend::render::render_node(ast, *stmt))
        .collect::<Vec<_>>()
        .join("\n");
    let expr_text = crate::frontend::render::render_node(ast, node);
    let fragment = if prelude.is_empty() { expr_text } else { format!("{}\n({})", prelude, expr_text) };

    if let Some(value) = eval_cached("eval_expression_via_sandbox_context", &fragment) {
        if !matches!(value, LiteralValue::Undefined) || is_undefined_safe_context(ast, node) {
            arborist.replace_node_with_text(node, value.to_string());
        }
    }
}

/// `undefined` is only a safe substitution when the surrounding
/// statement isn't depending on distinguishing "no result" from an
/// explicit `undefined` literal (kept conservative: always allow, this
/// engine doesn't model that distinction finely).
fn is_undefined_safe_context(_ast: &Ast, _node: NodeId) -> bool {
    true
}

/// `eval("literal code")` — splices the decoded source in directly.
/// `eval` used as a callee, e.g. `eval("expr")(args)`, is handled by
/// the same match since the CallExpression candidate is `eval(...)`
/// itself regardless of what wraps it.
fn match_eval_literal_call(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::CallExpression { callee, arguments } = &ast.get(*id).kind else { return false };
            if arguments.len() != 1 {
                return false;
            }
            let is_unbound_eval =
                matches!(&ast.get(*callee).kind, NodeKind::Identifier { name } if name == "eval")
                    && ast.get(*callee).decl_node.is_none();
            is_unbound_eval && matches!(ast.get(arguments[0]).as_literal(), Some(LiteralValue::Str(_)))
        })
        .collect()
}

fn transform_eval_literal_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::CallExpression { arguments, .. } = &ast.get(node).kind else { return };
    let Some(LiteralValue::Str(code)) = ast.get(arguments[0]).as_literal() else { return };
    arborist.replace_node_with_text(node, code.clone());
}

/// `eval(expr)` where `expr` isn't a plain string Literal (that case is
/// `replace_eval_literal`'s) — evaluates `expr` in its declaration
/// context and, when the result is a string, splices it back in as
/// source text the same way `replace_eval_literal` does, trusting the
/// next commit's reparse rather than parsing mid-rule. A light-touch
/// newline insertion after `)`/`}` not followed by `/` keeps two
/// spliced statements from running into each other without an ASI
/// boundary; if the result isn't a string the call is left alone.
fn match_eval_nonliteral_call(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::CallExpression { callee, arguments } = &ast.get(*id).kind else { return false };
            if arguments.len() != 1 {
                return false;
            }
            let is_unbound_eval =
                matches!(&ast.get(*callee).kind, NodeKind::Identifier { name } if name == "eval")
                    && ast.get(*callee).decl_node.is_none();
            is_unbound_eval && ast.get(arguments[0]).as_literal().is_none()
        })
        .collect()
}

fn insert_asi_guards(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if (c == ')' || c == '}') && chars.peek() != Some(&'/') {
            out.push('\n');
        }
    }
    out
}

fn transform_eval_nonliteral_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::CallExpression { arguments, .. } = &ast.get(node).kind else { return };
    let argument = arguments[0];
    let context_stmts = declaration_with_context(ast, argument, false);
    let prelude: String = context_stmts
        .iter()
        .filter(|stmt| **stmt != argument)
        .map(|stmt| crate::frontend::render::render_node(ast, *stmt))
        .collect::<Vec<_>>()
        .join("\n");
    let expr_text = crate::frontend::render::render_node(ast, argument);
    let fragment = if prelude.is_empty() { expr_text } else { format!("{}\n({})", prelude, expr_text) };

    let Some(LiteralValue::Str(code)) = eval_cached("resolve_eval_nonliteral_argument", &fragment) else {
        return;
    };
    arborist.replace_node_with_text(node, insert_asi_guards(&code));
}

/// `'a' ? x : y` with a Literal test — resolves to whichever branch
/// the value's JS truthiness selects.
fn match_deterministic_conditional(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("ConditionalExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::ConditionalExpression { test, .. } = &ast.get(*id).kind else { return false };
            ast.get(*test).as_literal().is_some()
        })
        .collect()
}

fn transform_deterministic_conditional(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let NodeKind::ConditionalExpression { test, consequent, alternate } = &ast.get(node).kind else { return };
    let Some(lit) = ast.get(*test).as_literal() else { return };
    let chosen = if lit.is_truthy() { *consequent } else { *alternate };
    arborist.replace_node_with_text(node, crate::frontend::render::render_node(ast, chosen));
}

/// `"abc"[0]`, `[1,2,3][1]`, `"hi".length` — member access directly on
/// a literal string or array-of-literals, resolved via the sandbox.
/// Skipped when the result would be used as a call callee or under an
/// `UpdateExpression` (§4.E: resolving those statically would silently
/// drop the receiver `this` binding or a mutation).
fn is_callee_or_update_target(ast: &Ast, id: NodeId) -> bool {
    let Some(parent) = ast.get(id).parent else { return false };
    matches!(&ast.get(parent).kind, NodeKind::CallExpression { callee, .. } if *callee == id)
        || matches!(&ast.get(parent).kind, NodeKind::UpdateExpression { argument, .. } if *argument == id)
}

fn literal_array_elements_are_literal(ast: &Ast, array: NodeId) -> bool {
    let NodeKind::ArrayExpression { elements } = &ast.get(array).kind else { return false };
    elements.iter().all(|e| e.is_none_or(|e| ast.get(e).as_literal().is_some()))
}

fn match_literal_member_access(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("MemberExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::MemberExpression { object, .. } = &ast.get(*id).kind else { return false };
            if is_callee_or_update_target(ast, *id) {
                return false;
            }
            matches!(ast.get(*object).as_literal(), Some(LiteralValue::Str(_)))
                || (matches!(&ast.get(*object).kind, NodeKind::ArrayExpression { .. })
                    && literal_array_elements_are_literal(ast, *object))
        })
        .collect()
}

fn transform_literal_member_access(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let fragment = crate::frontend::render::render_node(ast, node);
    if let Some(value) = eval_cached("resolve_member_access_on_literals", &fragment) {
        if !matches!(value, LiteralValue::Str(ref s) if s.is_empty())
            && !matches!(value, LiteralValue::Undefined | LiteralValue::Null)
        {
            arborist.replace_node_with_text(node, value.to_string());
        }
    }
}

/// Calls to an allow-listed (i.e. not deny-listed) global identifier
/// or `Global.method` whose arguments are all Literals. `atob`/`btoa`
/// resolve via the known-safe implementation directly; everything
/// else goes through the sandbox.
fn builtin_callee_name(ast: &Ast, call: NodeId) -> Option<String> {
    let NodeKind::CallExpression { callee, arguments } = &ast.get(call).kind else { return None };
    if !arguments.iter().all(|a| ast.get(*a).as_literal().is_some()) {
        return None;
    }
    let root_name = match &ast.get(*callee).kind {
        NodeKind::Identifier { name } => name.clone(),
        NodeKind::MemberExpression { object, computed: false, .. } => ast.get(*object).identifier_name()?.to_string(),
        _ => return None,
    };
    if BUILTIN_DENY_LIST.contains(&root_name.as_str()) {
        return None;
    }
    Some(root_name)
}

fn match_builtin_call(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression")
        .iter()
        .copied()
        .filter(|id| match builtin_callee_name(ast, *id) {
            // atob already resolves statically and more cheaply via decode_base64_call.
            Some(name) => name != "atob",
            None => false,
        })
        .collect()
}

fn transform_builtin_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    if builtin_callee_name(ast, node).is_none() {
        return;
    }
    let fragment = crate::frontend::render::render_node(ast, node);
    if let Some(value) = eval_cached("resolve_allowlisted_builtin_call", &fragment) {
        arborist.replace_node_with_text(node, value.to_string());
    }
}

/// `!x` where `x` is a Literal/Array/Object/TemplateLiteral with no
/// dynamic parts/`undefined` identifier/nested Unary — evaluates the
/// negation via the sandbox and replaces the whole expression.
fn is_redundant_not_operand(ast: &Ast, id: NodeId) -> bool {
    match &ast.get(id).kind {
        NodeKind::Literal(_) | NodeKind::ArrayExpression { .. } | NodeKind::ObjectExpression { .. } => true,
        NodeKind::TemplateLiteral { expressions, .. } => expressions.iter().all(|e| ast.get(*e).as_literal().is_some()),
        NodeKind::Identifier { name } => name == "undefined" && ast.get(id).decl_node.is_none(),
        NodeKind::UnaryExpression { .. } => true,
        _ => false,
    }
}

fn match_redundant_not(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("UnaryExpression")
        .iter()
        .copied()
        .filter(|id| {
            let NodeKind::UnaryExpression { operator, argument } = &ast.get(*id).kind else { return false };
            operator == "!" && is_redundant_not_operand(ast, *argument)
        })
        .collect()
}

fn transform_redundant_not(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let fragment = crate::frontend::render::render_node(ast, node);
    if let Some(value) = eval_cached("normalize_redundant_not", &fragment) {
        arborist.replace_node_with_text(node, value.to_string());
    }
}

/// `f(args)` where `f` is declared locally — resolves via a sandbox
/// seeded with `declaration_with_context(f's declaration)`. Skips
/// arguments containing `this`, skip-listed callees/properties, and
/// any string result that looks like a stringified function (the
/// common `.toString` anti-debugging trap).
fn contains_this(ast: &Ast, id: NodeId) -> bool {
    if matches!(&ast.get(id).kind, NodeKind::ThisExpression) {
        return true;
    }
    ast.children(id).iter().any(|c| contains_this(ast, *c))
}

fn callee_root_and_property(ast: &Ast, callee: NodeId) -> (Option<String>, Option<String>) {
    match &ast.get(callee).kind {
        NodeKind::Identifier { name } => (Some(name.clone()), None),
        NodeKind::MemberExpression { object, property, computed: false } => {
            (ast.get(*object).identifier_name().map(String::from), ast.get(*property).identifier_name().map(String::from))
        }
        _ => (None, None),
    }
}

fn local_call_candidate(ast: &Ast, call: NodeId) -> Option<NodeId> {
    let NodeKind::CallExpression { callee, arguments } = &ast.get(call).kind else { return None };
    if arguments.iter().any(|a| contains_this(ast, *a)) {
        return None;
    }
    let (root, property) = callee_root_and_property(ast, *callee);
    if let Some(root) = &root {
        if LOCAL_CALL_CALLEE_SKIP_LIST.contains(&root.as_str()) {
            return None;
        }
    }
    if let Some(property) = &property {
        if LOCAL_CALL_PROPERTY_SKIP_LIST.contains(&property.as_str()) {
            return None;
        }
    }
    // Only resolve when the callee ultimately traces to a local declaration.
    let head = root_identifier(ast, *callee)?;
    let decl = ast.get(head).decl_node?;
    if decl == head {
        return None;
    }
    let decl_parent = ast.get(decl).parent?;
    matches!(
        &ast.get(decl_parent).kind,
        NodeKind::VariableDeclarator { .. } | NodeKind::FunctionDeclaration { .. }
    )
    .then_some(decl)
}

fn root_identifier(ast: &Ast, expr: NodeId) -> Option<NodeId> {
    match &ast.get(expr).kind {
        NodeKind::Identifier { .. } => Some(expr),
        NodeKind::MemberExpression { object, .. } => root_identifier(ast, *object),
        _ => None,
    }
}

fn match_local_call(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression").iter().copied().filter(|id| local_call_candidate(ast, *id).is_some()).collect()
}

fn transform_local_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(decl) = local_call_candidate(ast, node) else { return };
    let context_stmts = declaration_with_context(ast, decl, false);
    let prelude: String =
        context_stmts.iter().map(|stmt| crate::frontend::render::render_node(ast, *stmt)).collect::<Vec<_>>().join("\n");
    let call_text = crate::frontend::render::render_node(ast, node);
    let fragment = if prelude.is_empty() { call_text } else { format!("{}\n({})", prelude, call_text) };

    let Some(value) = eval_cached("resolve_local_calls", &fragment) else { return };
    if let LiteralValue::Str(s) = &value {
        if s.trim_start().starts_with("function") {
            return;
        }
    }
    arborist.replace_node_with_text(node, value.to_string());
}

/// `ns.a.b`, `arr[1].x` — member chains rooted at a locally declared
/// object/array (not itself a literal, which `resolve_member_access_on_literals`
/// already handles). Resolved the same way as `resolve_local_calls`: seed
/// the sandbox with the root's declaration context and evaluate the whole
/// chain, rejecting results that look empty or host-dependent.
fn context_member_candidate(ast: &Ast, member: NodeId) -> Option<NodeId> {
    if is_callee_or_update_target(ast, member) {
        return None;
    }
    let NodeKind::MemberExpression { object, property, computed } = &ast.get(member).kind else { return None };
    if !computed {
        if let Some(name) = ast.get(*property).identifier_name() {
            if LOCAL_CALL_PROPERTY_SKIP_LIST.contains(&name) {
                return None;
            }
        }
    }
    if ast.get(*object).as_literal().is_some() {
        return None;
    }
    let head = root_identifier(ast, *object)?;
    if contains_this(ast, member) {
        return None;
    }
    let decl = ast.get(head).decl_node?;
    if decl == head {
        return None;
    }
    let decl_parent = ast.get(decl).parent?;
    matches!(&ast.get(decl_parent).kind, NodeKind::VariableDeclarator { .. }).then_some(decl)
}

fn match_context_member_access(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("MemberExpression").iter().copied().filter(|id| context_member_candidate(ast, *id).is_some()).collect()
}

fn transform_context_member_access(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some(decl) = context_member_candidate(ast, node) else { return };
    let context_stmts = declaration_with_context(ast, decl, false);
    let prelude: String =
        context_stmts.iter().map(|stmt| crate::frontend::render::render_node(ast, *stmt)).collect::<Vec<_>>().join("\n");
    let expr_text = crate::frontend::render::render_node(ast, node);
    let fragment = if prelude.is_empty() { expr_text } else { format!("{}\n({})", prelude, expr_text) };

    let Some(value) = eval_cached("resolve_context_member_access", &fragment) else { return };
    if matches!(value, LiteralValue::Str(ref s) if s.is_empty()) || matches!(value, LiteralValue::Undefined | LiteralValue::Null)
    {
        return;
    }
    arborist.replace_node_with_text(node, value.to_string());
}

/// A top-level `(function(arr, n){ while (n--) arr.push(arr.shift()); })(A, k)`
/// call that rotates array `array_name` — the same shape the
/// augmented-array preprocessor resolves eagerly, matched again here
/// so it can be folded directly into a call-site evaluation when that
/// preprocessor never ran (e.g. the family wasn't detected).
fn rotation_iife_for_array(ast: &Ast, array_name: &str) -> Option<NodeId> {
    let NodeKind::Program { body } = &ast.get(ast.root).kind else { return None };
    body.iter().copied().find(|stmt| {
        let NodeKind::ExpressionStatement { expression } = &ast.get(*stmt).kind else { return false };
        let NodeKind::CallExpression { callee, arguments } = &ast.get(*expression).kind else { return false };
        if arguments.len() != 2 || !matches!(&ast.get(*callee).kind, NodeKind::FunctionExpression { .. }) {
            return false;
        }
        let NodeKind::FunctionExpression { body: fn_body, .. } = &ast.get(*callee).kind else { return false };
        let NodeKind::BlockStatement { body: stmts } = &ast.get(*fn_body).kind else { return false };
        stmts.len() == 1
            && matches!(&ast.get(stmts[0]).kind, NodeKind::WhileStatement { .. })
            && ast.get(arguments[0]).identifier_name() == Some(array_name)
    })
}

/// A `FunctionDeclaration` whose body contains `name = function(...)
/// {...};` — it overwrites its own binding the first time it runs, a
/// common obfuscator.io trick to skip the dispatch logic on later
/// calls — and that otherwise references an externally declared array
/// literal. Returns the array's declaring statement and the IIFE that
/// permutes it, so the caller can seed a sandbox with all three
/// (§4.E "Resolve augmented-function-wrapped arrays").
fn self_overwriting_array_function(ast: &Ast, func: NodeId) -> Option<(NodeId, NodeId)> {
    let NodeKind::FunctionDeclaration { id: Some(id), body, .. } = &ast.get(func).kind else { return None };
    let overwrites_self = ast.get(*id).references.iter().any(|reference| {
        let Some(parent) = ast.get(*reference).parent else { return false };
        matches!(&ast.get(parent).kind, NodeKind::AssignmentExpression { left, right, .. }
            if *left == *reference && matches!(&ast.get(*right).kind, NodeKind::FunctionExpression { .. }))
    });
    if !overwrites_self {
        return None;
    }

    let mut array_decl_stmt = None;
    for ident in body_identifiers(ast, *body) {
        let Some(decl) = ast.get(ident).decl_node else { continue };
        if decl == ident {
            continue;
        }
        let Some(declarator) = ast.get(decl).parent else { continue };
        let NodeKind::VariableDeclarator { init: Some(init), .. } = &ast.get(declarator).kind else { continue };
        if !matches!(&ast.get(*init).kind, NodeKind::ArrayExpression { .. }) {
            continue;
        }
        let Some(decl_stmt) = ast.get(declarator).parent else { continue };
        if !matches!(&ast.get(decl_stmt).kind, NodeKind::VariableDeclaration { .. }) {
            continue;
        }
        let array_name = ast.get(decl).identifier_name()?;
        if let Some(iife) = rotation_iife_for_array(ast, array_name) {
            array_decl_stmt = Some((decl_stmt, iife));
            break;
        }
    }
    array_decl_stmt
}

fn body_identifiers(ast: &Ast, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    fn walk(ast: &Ast, id: NodeId, out: &mut Vec<NodeId>) {
        if ast.get(id).is_identifier() {
            out.push(id);
        }
        for child in ast.children(id) {
            walk(ast, child, out);
        }
    }
    walk(ast, root, &mut out);
    out
}

fn augmented_function_call_candidate(ast: &Ast, call: NodeId) -> Option<(NodeId, NodeId, NodeId)> {
    let NodeKind::CallExpression { callee, .. } = &ast.get(call).kind else { return None };
    let decl = ast.get(*callee).decl_node?;
    if decl == *callee {
        return None;
    }
    let func = ast.get(decl).parent?;
    if !matches!(&ast.get(func).kind, NodeKind::FunctionDeclaration { .. }) {
        return None;
    }
    let (array_decl_stmt, iife_stmt) = self_overwriting_array_function(ast, func)?;
    Some((func, array_decl_stmt, iife_stmt))
}

fn match_augmented_function_call(ast: &Ast) -> Vec<NodeId> {
    ast.of_kind("CallExpression").iter().copied().filter(|id| augmented_function_call_candidate(ast, *id).is_some()).collect()
}

fn transform_augmented_function_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let Some((func, array_decl_stmt, iife_stmt)) = augmented_function_call_candidate(ast, node) else { return };
    let fragment = format!(
        "{}\n{}\n{}\n({});",
        crate::frontend::render::render_node(ast, array_decl_stmt),
        crate::frontend::render::render_node(ast, iife_stmt),
        crate::frontend::render::render_node(ast, func),
        crate::frontend::render::render_node(ast, node),
    );
    let Some(value) = eval_cached("resolve_augmented_function_wrapped_arrays", &fragment) else { return };
    if matches!(value, LiteralValue::Str(ref s) if s.is_empty()) || matches!(value, LiteralValue::Undefined | LiteralValue::Null) {
        return;
    }
    arborist.replace_node_with_text(node, value.to_string());
}

/// `X.prototype.m = fnOrId;` at top level, where `X` traces to a local
/// declaration — the "inject a method onto a constructor I also
/// declared" obfuscation shape. Returns `(property_name,
/// assignment_statement, X's_declaration_identifier)` for every such
/// assignment found.
fn prototype_assignment_candidates(ast: &Ast) -> Vec<(String, NodeId, NodeId)> {
    let NodeKind::Program { body } = &ast.get(ast.root).kind else { return Vec::new() };
    body.iter()
        .filter_map(|stmt| {
            let NodeKind::ExpressionStatement { expression } = &ast.get(*stmt).kind else { return None };
            let NodeKind::AssignmentExpression { left, .. } = &ast.get(*expression).kind else { return None };
            let NodeKind::MemberExpression { object: proto_access, property: method_name, computed: false } =
                &ast.get(*left).kind
            else {
                return None;
            };
            let NodeKind::MemberExpression { object: ctor, property: proto_prop, computed: false } =
                &ast.get(*proto_access).kind
            else {
                return None;
            };
            if ast.get(*proto_prop).identifier_name() != Some("prototype") {
                return None;
            }
            let ctor_decl = ast.get(*ctor).decl_node?;
            if ctor_decl == *ctor {
                return None;
            }
            let name = ast.get(*method_name).identifier_name()?.to_string();
            Some((name, *stmt, ctor_decl))
        })
        .collect()
}

/// Returns `(assignment_statement, receiver's_declaration)` — the
/// receiver's own declaration seeds `declaration_with_context` (which
/// transitively pulls in the constructor declaration too, since the
/// receiver's initializer references it), while the assignment
/// statement itself has to be added explicitly since it only ever
/// writes a member expression, never a plain identifier `context.rs`'s
/// closure tracks.
fn prototype_method_call_target(ast: &Ast, call: NodeId, candidates: &[(String, NodeId, NodeId)]) -> Option<(NodeId, NodeId)> {
    let NodeKind::CallExpression { callee, arguments } = &ast.get(call).kind else { return None };
    if arguments.iter().any(|a| contains_this(ast, *a)) {
        return None;
    }
    let NodeKind::MemberExpression { object, property, computed: false } = &ast.get(*callee).kind else { return None };
    if contains_this(ast, *object) {
        return None;
    }
    let name = ast.get(*property).identifier_name()?;
    if LOCAL_CALL_PROPERTY_SKIP_LIST.contains(&name) {
        return None;
    }
    let candidate = candidates.iter().find(|c| c.0 == name)?;
    let receiver_decl = ast.get(root_identifier(ast, *object)?).decl_node?;
    Some((candidate.1, receiver_decl))
}

fn match_prototype_method_call(ast: &Ast) -> Vec<NodeId> {
    let candidates = prototype_assignment_candidates(ast);
    if candidates.is_empty() {
        return Vec::new();
    }
    ast.of_kind("CallExpression")
        .iter()
        .copied()
        .filter(|id| prototype_method_call_target(ast, *id, &candidates).is_some())
        .collect()
}

fn transform_prototype_method_call(ast: &Ast, arborist: &mut Arborist, node: NodeId) {
    let candidates = prototype_assignment_candidates(ast);
    let Some((assignment_stmt, receiver_decl)) = prototype_method_call_target(ast, node, &candidates) else { return };

    let mut context_stmts = declaration_with_context(ast, receiver_decl, false);
    if !context_stmts.contains(&assignment_stmt) {
        context_stmts.push(assignment_stmt);
        context_stmts.sort_by_key(|stmt| ast.get(*stmt).range.start);
    }
    let prelude: String =
        context_stmts.iter().map(|stmt| crate::frontend::render::render_node(ast, *stmt)).collect::<Vec<_>>().join("\n");
    let call_text = crate::frontend::render::render_node(ast, node);
    let fragment = if prelude.is_empty() { call_text } else { format!("{}\n({})", prelude, call_text) };

    let Some(value) = eval_cached("resolve_injected_prototype_methods", &fragment) else { return };
    if let LiteralValue::Str(s) = &value {
        if s.trim_start().starts_with("function") {
            return;
        }
    }
    arborist.replace_node_with_text(node, value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{SourceEmitter, SourceParser, TreeSitterFrontend};

    #[test]
    fn splices_in_an_eval_of_a_string_literal() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse(r#"eval('console.log("hi")');"#).unwrap();
        let matches = match_eval_literal_call(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_eval_literal_call(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("console.log"));
        assert!(!rendered.contains("eval("));
    }

    #[test]
    fn resolves_a_runtime_binary_expression_via_the_sandbox() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var x = 2; log(x + 3);").unwrap();
        let matches = match_evaluable_expression(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_evaluable_expression(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("log(5)"));
    }

    #[test]
    fn does_not_flag_an_already_folded_binary_expression() {
        let ast_frontend = &mut TreeSitterFrontend::new().unwrap();
        let ast = ast_frontend.parse("log(2 + 3);").unwrap();
        assert!(match_evaluable_expression(&ast).is_empty());
    }

    #[test]
    fn resolves_a_deterministic_conditional() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var x = 'a' ? 1 : 2;").unwrap();
        let matches = match_deterministic_conditional(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_deterministic_conditional(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("x = 1"));
    }

    #[test]
    fn resolves_member_access_on_a_string_literal() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse(r#"var x = "hi".length;"#).unwrap();
        let matches = match_literal_member_access(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_literal_member_access(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("x = 2"));
    }

    #[test]
    fn skips_literal_member_access_used_as_a_call_callee() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse(r#"[1,2,3]["slice"](0);"#).unwrap();
        assert!(match_literal_member_access(&ast).is_empty());
    }

    #[test]
    fn resolves_an_allowlisted_builtin_call() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var x = String.fromCharCode(104, 105);").unwrap();
        let matches = match_builtin_call(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_builtin_call(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("'hi'"));
    }

    #[test]
    fn never_resolves_a_deny_listed_builtin() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("eval('1');").unwrap();
        assert!(match_builtin_call(&ast).is_empty());
    }

    #[test]
    fn resolves_a_call_to_a_locally_declared_function() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("function add(a, b) { return a + b; } var x = add(2, 3);").unwrap();
        let matches = match_local_call(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_local_call(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("x = 5"));
    }

    #[test]
    fn skips_a_local_call_whose_argument_contains_this() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("function f(a) { return a; } var x = f(this);").unwrap();
        assert!(match_local_call(&ast).is_empty());
    }

    #[test]
    fn normalizes_a_redundant_not_on_a_literal() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var x = !0;").unwrap();
        let matches = match_redundant_not(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_redundant_not(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("x = true"));
    }

    #[test]
    fn resolves_a_member_chain_rooted_at_a_local_array() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var ns = [1, 2, 3]; var x = ns[0] + ns[1];").unwrap();
        let matches = match_context_member_access(&ast);
        assert_eq!(matches.len(), 2);
        let mut arborist = Arborist::new();
        for m in matches {
            transform_context_member_access(&ast, &mut arborist, m);
        }
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains('1') && rendered.contains('2'), "got: {rendered}");
    }

    #[test]
    fn does_not_resolve_a_minimal_alphabet_expression_referencing_this() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var x = +this;").unwrap();
        assert!(match_evaluable_expression(&ast).is_empty());
    }

    #[test]
    fn resolves_a_call_to_a_self_overwriting_function_wrapping_a_rotated_array() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend
            .parse(
                "var A = [1, 2, 3];\n\
                 (function(arr, n) { while (n--) arr.push(arr.shift()); })(A, 1);\n\
                 function f(i) { f = function(i) { return A[i]; }; return A[i]; }\n\
                 var x = f(0);",
            )
            .unwrap();
        let matches = match_augmented_function_call(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_augmented_function_call(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("x = 2"));
    }

    #[test]
    fn does_not_flag_an_ordinary_function_as_augmented() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("function f(i) { return i + 1; } var x = f(0);").unwrap();
        assert!(match_augmented_function_call(&ast).is_empty());
    }

    #[test]
    fn resolves_a_call_to_an_injected_prototype_method() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend
            .parse(
                "function Box(v) { this.v = v; }\n\
                 Box.prototype.twice = function() { return this.v * 2; };\n\
                 var b = new Box(21);\n\
                 var x = b.twice();",
            )
            .unwrap();
        let matches = match_prototype_method_call(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_prototype_method_call(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        assert!(frontend.emit(&new_ast).contains("x = 42"));
    }

    #[test]
    fn does_not_flag_a_call_with_no_matching_prototype_assignment() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse("var arr = [1, 2]; arr.slice(0);").unwrap();
        assert!(match_prototype_method_call(&ast).is_empty());
    }

    #[test]
    fn splices_in_an_eval_of_a_non_literal_string_expression() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse(r#"var code = 'console.log("hi")'; eval(code);"#).unwrap();
        let matches = match_eval_nonliteral_call(&ast);
        assert_eq!(matches.len(), 1);
        let mut arborist = Arborist::new();
        transform_eval_nonliteral_call(&ast, &mut arborist, matches[0]);
        let new_ast = arborist.commit(&ast, &mut frontend).unwrap();
        let rendered = frontend.emit(&new_ast);
        assert!(rendered.contains("console.log"));
        assert!(!rendered.contains("eval("));
    }

    #[test]
    fn does_not_flag_an_eval_of_a_plain_string_literal() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse(r#"eval('console.log("hi")');"#).unwrap();
        assert!(match_eval_nonliteral_call(&ast).is_empty());
    }
}
