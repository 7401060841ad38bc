//! The parser/codegen seam spec.md treats as an external collaborator
//! (§1 "Out of scope: ... writing a full ECMAScript parser and code
//! generator"). This module supplies one concrete, reference
//! implementation of that collaborator backed by tree-sitter, so the
//! rest of the engine has something real to run against; any other
//! frontend (a different grammar, a hand-rolled parser) only needs to
//! implement [`SourceParser`]/[`SourceEmitter`].

mod lower;
pub(crate) mod render;

use tree_sitter::{InputEdit, Parser, Tree};

use crate::ast::Ast;
use crate::error::{RestringerError, Result};

/// Parses source text into the engine's annotated AST.
pub trait SourceParser {
    fn parse(&mut self, source: &str) -> Result<Ast>;
}

/// Renders an (possibly edited) AST back to source text.
pub trait SourceEmitter {
    fn emit(&self, ast: &Ast) -> String;
}

/// tree-sitter-backed frontend. Keeps the previous [`Tree`] around so
/// the Arborist can request an incremental reparse after a small
/// splice instead of paying for a full parse on every commit (§3
/// "commit+re-index is sufficient; full re-parse only on demand").
pub struct TreeSitterFrontend {
    parser: Parser,
    previous_tree: Option<Tree>,
}

impl TreeSitterFrontend {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())
            .map_err(|e| RestringerError::InvalidConfig(e.to_string()))?;
        Ok(Self { parser, previous_tree: None })
    }

    /// Re-parses `source`, reusing the previous tree plus its recorded
    /// edits when present. Callers that spliced text must call
    /// [`Tree::edit`] on the stashed tree (via [`Self::note_edit`])
    /// before calling this again, or the incremental reparse will
    /// disagree with the new text.
    pub fn parse_source(&mut self, source: &str) -> Result<Ast> {
        let tree = self
            .parser
            .parse(source, self.previous_tree.as_ref())
            .ok_or_else(|| RestringerError::Parse { message: "tree-sitter returned no tree".to_string() })?;
        let ast = lower::lower_source(source, &tree)?;
        self.previous_tree = Some(tree);
        Ok(ast)
    }

    /// Records a byte-range splice against the stashed tree ahead of
    /// the next incremental [`Self::parse_source`] call.
    pub fn note_edit(&mut self, edit: InputEdit) {
        if let Some(tree) = self.previous_tree.as_mut() {
            tree.edit(&edit);
        }
    }

    /// Drops the cached tree, forcing the next parse to start cold.
    /// Used when a commit touched enough of the source that an
    /// incremental reparse isn't worth the bookkeeping (§3's "full
    /// re-parse only on demand").
    pub fn invalidate(&mut self) {
        self.previous_tree = None;
    }
}

impl SourceParser for TreeSitterFrontend {
    fn parse(&mut self, source: &str) -> Result<Ast> {
        self.invalidate();
        self.parse_source(source)
    }
}

impl SourceEmitter for TreeSitterFrontend {
    fn emit(&self, ast: &Ast) -> String {
        render::render(ast)
    }
}
