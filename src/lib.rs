//! # restringer
//!
//! A JavaScript deobfuscation engine: parses obfuscated source into an
//! annotated AST, runs a library of safe (pure AST-level) and unsafe
//! (sandbox-evaluating) rewrite rules to a fixpoint, and renders the
//! result back to readable source.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use restringer::prelude::*;
//!
//! let mut restringer = Restringer::new("var _0x1 = 1 + 2; console.log(_0x1);");
//! let changed = restringer.deobfuscate()?;
//! println!("{}", restringer.script);
//! # Ok::<(), restringer::error::RestringerError>(())
//! ```
//!
//! ## Pipeline
//!
//! 1. [`detect`] scans the parsed source for a known obfuscator
//!    family's fingerprint and, if found, selects its [`processors::Bundle`].
//! 2. The bundle's preprocessors run to a fixpoint via [`driver::apply_iteratively`].
//! 3. Safe and unsafe [`rules`] alternate until neither makes progress.
//! 4. The bundle's postprocessors run, then an optional dead-code sweep.
//!
//! [`arborist::Arborist`] stages and commits edits; [`frontend`] is the
//! tree-sitter-backed parser/renderer seam; [`sandbox`] is the boa-backed
//! evaluator the unsafe rules call into; [`cache::ScriptCache`] memoizes
//! sandbox evaluations by rule name and source fragment.

pub mod arborist;
pub mod ast;
pub mod cache;
pub mod context;
pub mod detect;
pub mod diff;
pub mod driver;
pub mod error;
pub mod frontend;
pub mod orchestrator;
pub mod processors;
pub mod rules;
pub mod sandbox;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::arborist::Arborist;
    pub use crate::ast::Ast;
    pub use crate::error::{RestringerError, Result};
    pub use crate::orchestrator::Restringer;
    pub use crate::rules::{safe_rules, unsafe_rules, Rule, Safety};
}

pub use prelude::*;
