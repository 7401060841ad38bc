//! Fatal error type for the deobfuscation engine (§7).
//!
//! Only failures that abort the whole run belong here. A single rule
//! or sandbox evaluation failing mid-pass is not fatal — it resolves to
//! `None` (the `BAD_VALUE` sentinel) so the driver can keep iterating
//! ("worst case is no progress on this pass"); see `sandbox::eval_in_vm`
//! and the rule match/transform signatures for that path.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestringerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("tree-sitter query error: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RestringerError>;
