//! Iterative fixpoint driver (§4.F).
//!
//! Repeatedly runs one set of rules to a commit, re-indexes, and
//! compares the emitted source against the previous pass. Byte
//! equality between passes is the fixpoint test; `similar::TextDiff`
//! is only used to produce an optional human-readable trace (already
//! the teacher's diffing dependency, reused rather than hand-rolling a
//! second diff algorithm — see `diff::unified_diff`).

use log::debug;

use crate::arborist::Arborist;
use crate::ast::Ast;
use crate::diff::unified_diff_fragment;
use crate::error::Result;
use crate::frontend::{SourceEmitter, TreeSitterFrontend};
use crate::rules::Rule;

/// §9: the iteration ceiling counts every rule invocation across the
/// whole run, not passes — a run with many rules converges in fewer
/// passes than one with few, so counting passes would make the ceiling
/// mean something different depending on which rule set is active.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

pub struct DriverOutcome {
    pub ast: Ast,
    pub iterations_used: u32,
    pub converged: bool,
}

/// Applies `rules` to `ast` until a pass makes no textual change, the
/// rule set produces zero matches, or `max_iterations` total rule
/// invocations have been spent (§9).
pub fn apply_iteratively(
    mut ast: Ast,
    rules: &[Rule],
    frontend: &mut TreeSitterFrontend,
    max_iterations: &mut u32,
    verbose: bool,
) -> Result<DriverOutcome> {
    let starting_budget = *max_iterations;
    let mut converged = false;

    loop {
        if *max_iterations == 0 {
            break;
        }

        let mut arborist = Arborist::new();
        let mut matches_this_pass = 0usize;

        for rule in rules {
            if *max_iterations == 0 {
                break;
            }
            let staged = rule.apply(&ast, &mut arborist);
            matches_this_pass += staged;
            *max_iterations = max_iterations.saturating_sub(1);
            debug!("rule {} staged {} edit(s)", rule.name, staged);
        }

        if matches_this_pass == 0 {
            converged = true;
            break;
        }

        let before = frontend.emit(&ast);
        let new_ast = arborist.commit(&ast, frontend)?;
        let after = frontend.emit(&new_ast);

        if before == after {
            ast = new_ast;
            converged = true;
            break;
        }

        if verbose {
            debug!("pass diff:\n{}", unified_diff_fragment(&before, &after));
        }

        ast = new_ast;
    }

    Ok(DriverOutcome { ast, iterations_used: starting_budget.saturating_sub(*max_iterations), converged })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::literals;

    #[test]
    fn folds_nested_arithmetic_to_a_fixpoint() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse_source("let x = (1 + 2) * (3 + 4);").unwrap();
        let mut budget = DEFAULT_MAX_ITERATIONS;
        let outcome =
            apply_iteratively(ast, &literals::rules(), &mut frontend, &mut budget, false).unwrap();
        assert!(outcome.converged);
        let rendered = frontend.emit(&outcome.ast);
        assert!(rendered.contains("21"), "expected folded constant, got: {rendered}");
    }

    #[test]
    fn stops_at_the_iteration_budget() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse_source("let x = 1 + 2;").unwrap();
        let mut budget = 0;
        let outcome =
            apply_iteratively(ast, &literals::rules(), &mut frontend, &mut budget, false).unwrap();
        assert!(!outcome.converged);
    }
}
