//! Top-level deobfuscation schedule (§4.A, §4.K).
//!
//! `Restringer` is the engine's single public entry point: detect an
//! obfuscator family, run its preprocessors, alternate safe/unsafe
//! rule passes to a fixpoint, run the detected family's
//! postprocessors, and optionally sweep dead code a final time.

use crate::ast::Ast;
use crate::detect;
use crate::driver::{apply_iteratively, DEFAULT_MAX_ITERATIONS};
use crate::error::Result;
use crate::frontend::{SourceEmitter, SourceParser, TreeSitterFrontend};
use crate::rules::{safe_rules, unsafe_rules, Rule};

pub struct Restringer {
    pub script: String,
    /// Safe rules run on every alternation (§4.A default schedule).
    pub safe_methods: Vec<Rule>,
    /// Unsafe (sandbox-backed) rules, skipped unless explicitly enabled.
    pub unsafe_methods: Vec<Rule>,
    max_iterations: u32,
    enable_unsafe: bool,
    clean: bool,
}

impl Restringer {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            safe_methods: safe_rules(),
            unsafe_methods: unsafe_rules(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            enable_unsafe: true,
            clean: false,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Disables the unsafe (sandbox-evaluating) rule family — the
    /// engine degrades to pure AST-level rewriting only.
    pub fn without_unsafe_rules(mut self) -> Self {
        self.enable_unsafe = false;
        self
    }

    /// Runs an extra dead-code sweep over the result (CLI `-c/--clean`).
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Runs the full schedule and returns whether the output differs
    /// from the input.
    pub fn deobfuscate(&mut self) -> Result<bool> {
        let mut frontend = TreeSitterFrontend::new()?;
        let original = self.script.clone();
        let mut ast = frontend.parse(&self.script)?;
        let mut budget = self.max_iterations;

        if let Some(bundle) = detect::detect(&ast) {
            if !bundle.preprocessors.is_empty() {
                let outcome =
                    apply_iteratively(ast, &bundle.preprocessors, &mut frontend, &mut budget, false)?;
                ast = outcome.ast;
            }
            ast = self.run_main_loop(ast, &mut frontend, &mut budget)?;
            if !bundle.postprocessors.is_empty() {
                let outcome =
                    apply_iteratively(ast, &bundle.postprocessors, &mut frontend, &mut budget, false)?;
                ast = outcome.ast;
            }
        } else {
            ast = self.run_main_loop(ast, &mut frontend, &mut budget)?;
        }

        if self.clean {
            let dead_code: Vec<Rule> = self
                .safe_methods
                .iter()
                .filter(|r| r.name == "dead_code_removal")
                .map(|r| Rule { name: r.name, safety: r.safety, match_fn: r.match_fn, transform_fn: r.transform_fn })
                .collect();
            if !dead_code.is_empty() {
                let outcome = apply_iteratively(ast, &dead_code, &mut frontend, &mut budget, false)?;
                ast = outcome.ast;
            }
        }

        self.script = frontend.emit(&ast);
        Ok(self.script != original)
    }

    /// Alternates safe and unsafe passes until neither makes progress
    /// or the shared iteration budget runs out (§4.A: unsafe rules
    /// interleaved with safe cleanup, since a sandbox-resolved literal
    /// frequently unlocks a further safe fold/propagation).
    fn run_main_loop(&self, mut ast: Ast, frontend: &mut TreeSitterFrontend, budget: &mut u32) -> Result<Ast> {
        loop {
            if *budget == 0 {
                return Ok(ast);
            }
            let safe_outcome = apply_iteratively(ast, &self.safe_methods, frontend, budget, false)?;
            ast = safe_outcome.ast;

            if !self.enable_unsafe || *budget == 0 {
                return Ok(ast);
            }

            let unsafe_outcome = apply_iteratively(ast, &self.unsafe_methods, frontend, budget, false)?;
            let unsafe_made_progress = frontend.emit(&unsafe_outcome.ast) != frontend.emit(&safe_outcome.ast);
            ast = unsafe_outcome.ast;

            if !unsafe_made_progress {
                return Ok(ast);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_a_constant_expression_end_to_end() {
        let mut restringer = Restringer::new("var x = (1 + 2) * 3;");
        let changed = restringer.deobfuscate().unwrap();
        assert!(changed);
        assert!(restringer.script.contains('9'), "expected folded constant, got: {}", restringer.script);
    }

    #[test]
    fn leaves_already_simplified_code_unchanged() {
        let mut restringer = Restringer::new("var x = 9;");
        let changed = restringer.deobfuscate().unwrap();
        assert!(!changed);
    }

    #[test]
    fn unwraps_caesar_plus_style_top_level_iife() {
        let mut restringer = Restringer::new("(function(){ var x = 1 + 2; })();");
        restringer.deobfuscate().unwrap();
        assert!(!restringer.script.trim_start().starts_with("(function"));
    }
}
