//! End-to-end scenarios (S1-S7) and the testable properties from
//! the engine's design: idempotence, reference integrity, bounded
//! termination, sandbox isolation, and no-op on already-clean input.

use restringer::prelude::*;

fn deobfuscate(source: &str) -> String {
    let mut restringer = Restringer::new(source);
    restringer.deobfuscate().unwrap();
    restringer.script
}

#[test]
fn s1_decodes_an_atob_call() {
    let out = deobfuscate("const encoded = atob('cGFzc3dvcmQ9aGFja01lOTQh');");
    assert!(out.contains("'password=hackMe94!'"), "got: {out}");
}

#[test]
fn s2_folds_adjacent_string_concatenation() {
    let out = deobfuscate("var x = 'a' + 'b' + 'c';");
    assert!(out.contains("'abc'"), "got: {out}");
}

#[test]
fn s3_resolves_a_constant_array_index() {
    let array = (0..21).map(|i| (i * 10).to_string()).collect::<Vec<_>>().join(", ");
    let out = deobfuscate(&format!("var A = [{array}]; log(A[3]);"));
    assert!(out.contains("log(30)"), "got: {out}");
}

#[test]
fn s4_unwraps_an_iife_returning_a_literal() {
    let out = deobfuscate("(function(){ return 42; })();");
    assert!(out.contains('4') && out.contains('2'));
    assert!(!out.contains("function"), "got: {out}");
}

#[test]
fn s5_linearizes_a_state_machine_switch() {
    let out = deobfuscate("var s=0; switch(s){ case 0: a(); s=1; break; case 1: b(); break; }");
    assert!(out.contains("a()") && out.contains("b()"), "got: {out}");
    assert!(!out.contains("switch"), "got: {out}");
}

#[test]
fn s6_resolves_a_literal_if_test() {
    let out = deobfuscate("if (true) do_a(); else do_b();");
    assert!(out.contains("do_a()"));
    assert!(!out.contains("do_b()"), "got: {out}");
}

#[test]
fn s7_unwraps_an_eval_of_a_string_literal() {
    let out = deobfuscate(r#"eval('console.log("hi")');"#);
    assert!(out.contains("console.log"), "got: {out}");
    assert!(!out.contains("eval("), "got: {out}");
}

#[test]
fn round_trip_on_already_clean_code() {
    let mut restringer = Restringer::new("function greet(name) {\n  console.log(name);\n}\n");
    let changed = restringer.deobfuscate().unwrap();
    assert!(!changed);
}

#[test]
fn second_fixpoint_pass_is_a_no_op() {
    let mut first = Restringer::new("var x = (1 + 2) * (3 + 4);");
    first.deobfuscate().unwrap();
    let once = first.script.clone();

    let mut second = Restringer::new(once.clone());
    let changed_again = second.deobfuscate().unwrap();
    assert!(!changed_again, "expected a second pass to be a no-op, got: {}", second.script);
    assert_eq!(second.script, once);
}

#[test]
fn bounded_termination_respects_the_iteration_cap() {
    let mut restringer = Restringer::new("var x = 1 + 2;").with_max_iterations(1);
    // Should return promptly rather than loop; result may or may not have
    // converged within a single rule invocation, but the call must return.
    let _ = restringer.deobfuscate().unwrap();
}

#[test]
fn unsafe_rules_can_be_disabled() {
    let mut restringer = Restringer::new("eval('1 + 1');").without_unsafe_rules();
    let changed = restringer.deobfuscate().unwrap();
    assert!(!changed, "no safe rule should touch a bare eval() call");
}

#[test]
fn clean_mode_removes_unused_locals() {
    let mut restringer = Restringer::new("function f() { var unused = compute(); return 1; }").clean(true);
    restringer.deobfuscate().unwrap();
    assert!(!restringer.script.contains("unused"), "got: {}", restringer.script);
}
