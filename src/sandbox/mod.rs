//! Sandboxed evaluator (§4.C).
//!
//! Backed by `boa_engine`, a pure-Rust ECMAScript interpreter, rather
//! than the `deno_core`/V8 binding the broader example pack uses
//! elsewhere for embedding JS (see DESIGN.md) — boa needs no native
//! toolchain to build and registers nothing filesystem- or
//! network-shaped by default, so the sandbox boundary spec.md asks for
//! falls out of what's simply never wired in, instead of a deny-list
//! bolted onto a general-purpose runtime.
//!
//! A fragment is evaluated in a fresh [`boa_engine::Context`] (no
//! ambient state leaks between calls unless the caller explicitly
//! threads one through via [`fresh_sandbox`]/[`eval_with_context`]),
//! bounded by [`boa_engine::context::RuntimeLimits`] against the
//! runaway-loop and stack-exhaustion shapes obfuscated code likes to
//! throw at a naive evaluator. A result that can't be represented as
//! one of the engine's [`LiteralValue`]s — an object, a function, a
//! thrown exception, a budget trip — comes back as `None` ("BAD_VALUE",
//! §7): the caller treats it exactly like a rule that didn't match.

pub mod globals;

use boa_engine::{Context, JsValue, Source};

use crate::ast::LiteralValue;

/// Loop-iteration ceiling for a single evaluation (§4.C, §5). Generous
/// enough for any of the rule set's decoder loops, small enough that a
/// deliberately-unbounded obfuscated loop fails fast instead of
/// hanging the pass.
const LOOP_ITERATION_BUDGET: u64 = 1_000_000;
const RECURSION_BUDGET: usize = 512;

/// Builds a fresh, budget-limited sandbox with the deterministic
/// globals installed.
pub fn fresh_sandbox() -> Context {
    let mut context = Context::default();
    let limits = context.runtime_limits_mut();
    limits.set_loop_iteration_limit(LOOP_ITERATION_BUDGET);
    limits.set_recursion_limit(RECURSION_BUDGET);
    globals::install(&mut context);
    context
}

/// Evaluates `fragment` in a brand-new sandbox and converts the result
/// to a [`LiteralValue`], or `None` if it isn't representable
/// (BAD_VALUE).
pub fn eval_in_vm(fragment: &str) -> Option<LiteralValue> {
    let mut context = fresh_sandbox();
    eval_with_context(fragment, &mut context)
}

/// Evaluates `fragment` against a caller-provided sandbox, for rules
/// that need several fragments to share prior bindings within one
/// pass (§4.C "optional sandbox" parameter).
pub fn eval_with_context(fragment: &str, context: &mut Context) -> Option<LiteralValue> {
    let source = Source::from_bytes(fragment);
    match context.eval(source) {
        Ok(value) => js_value_to_literal(&value, context),
        Err(_) => None,
    }
}

fn js_value_to_literal(value: &JsValue, context: &mut Context) -> Option<LiteralValue> {
    if value.is_null() {
        return Some(LiteralValue::Null);
    }
    if value.is_undefined() {
        return Some(LiteralValue::Undefined);
    }
    if let Some(b) = value.as_boolean() {
        return Some(LiteralValue::Bool(b));
    }
    if let Some(n) = value.as_number() {
        return Some(LiteralValue::Number(n));
    }
    if let Some(s) = value.as_string() {
        return Some(LiteralValue::Str(s.to_std_string_escaped()));
    }
    // Objects, functions, symbols, bigints: not literal-representable.
    let _ = context;
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_simple_arithmetic() {
        assert_eq!(eval_in_vm("2 + 3 * 4"), Some(LiteralValue::Number(14.0)));
    }

    #[test]
    fn evaluates_string_concatenation() {
        assert_eq!(eval_in_vm("'a' + 'b'"), Some(LiteralValue::Str("ab".to_string())));
    }

    #[test]
    fn atob_decodes_base64() {
        assert_eq!(
            eval_in_vm("atob('aGVsbG8=')"),
            Some(LiteralValue::Str("hello".to_string()))
        );
    }

    #[test]
    fn object_results_are_bad_value() {
        assert_eq!(eval_in_vm("({a: 1})"), None);
    }

    #[test]
    fn runaway_loop_trips_the_budget_instead_of_hanging() {
        assert_eq!(eval_in_vm("let i = 0; while (true) { i++; } i"), None);
    }

    #[test]
    fn thrown_exceptions_are_bad_value() {
        assert_eq!(eval_in_vm("throw new Error('nope')"), None);
    }
}
