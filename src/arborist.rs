//! Staging and commit layer for AST edits (§4.B).
//!
//! Rules never touch source text directly. They call [`Arborist::mark_node`]
//! to stage a marked-for-removal node or [`Arborist::replace_node`] to stage
//! a replacement, then the driver calls [`Arborist::commit`] once per pass
//! to splice every staged edit into the source in one pass and produce a
//! freshly indexed [`Ast`].
//!
//! Grounded on the teacher's `transform::ast::AstTransform::apply_operation`
//! (collect matches, sort by descending start byte, `String::replace_range`
//! back to front so earlier offsets stay valid) — the same splice order is
//! used here for staged node edits.

use std::collections::HashMap;

use crate::ast::{Ast, NodeId, NodeKind, Range};
use crate::error::Result;
use crate::frontend::render::render_node;
use crate::frontend::{SourceParser, TreeSitterFrontend};

/// One staged edit. Last write for a given [`NodeId`] wins (§4.B
/// "last-edit-wins").
#[derive(Debug, Clone)]
enum Edit {
    Remove,
    Replace(String),
}

/// Tracks staged edits against one [`Ast`] generation and commits them
/// into the next.
pub struct Arborist {
    edits: HashMap<NodeId, Edit>,
}

impl Arborist {
    pub fn new() -> Self {
        Self { edits: HashMap::new() }
    }

    /// Stages `node` for removal. If `node`'s removal would leave a
    /// control-flow body empty (the direct body of an `if`/`for`/
    /// `while`/`do`/function), the commit step substitutes an empty
    /// statement instead of leaving a dangling gap (§4.B edge case).
    pub fn mark_node(&mut self, node: NodeId) {
        self.edits.insert(node, Edit::Remove);
    }

    /// Stages `node` to be replaced by the rendered text of `replacement`.
    pub fn replace_node(&mut self, ast: &Ast, node: NodeId, replacement: NodeId) {
        let text = render_node(ast, replacement);
        self.edits.insert(node, Edit::Replace(text));
    }

    /// Stages `node` to be replaced by literal source text, for rules
    /// that already know the exact string they want spliced in rather
    /// than building a synthetic node for it.
    pub fn replace_node_with_text(&mut self, node: NodeId, text: String) {
        self.edits.insert(node, Edit::Replace(text));
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn pending_ranges(&self, ast: &Ast) -> Vec<Range> {
        self.edits.keys().map(|id| ast.get(*id).range).collect()
    }

    /// Splices every staged edit into `ast`'s source, back to front by
    /// byte offset, then asks `frontend` to re-parse and returns the
    /// new [`Ast`]. Clears the stage afterward.
    pub fn commit(&mut self, ast: &Ast, frontend: &mut TreeSitterFrontend) -> Result<Ast> {
        let new_source = self.splice(ast);
        let new_ast = frontend.parse(&new_source)?;
        self.edits.clear();
        Ok(new_ast)
    }

    fn splice(&self, ast: &Ast) -> String {
        let mut entries: Vec<(NodeId, &Edit)> = self.edits.iter().map(|(id, e)| (*id, e)).collect();
        entries.sort_by(|a, b| ast.get(b.0).range.start.cmp(&ast.get(a.0).range.start));

        let mut source = ast.source.clone();
        for (node_id, edit) in entries {
            let range = ast.get(node_id).range;
            let replacement = match edit {
                Edit::Remove => empty_replacement_for(ast, node_id),
                Edit::Replace(text) => text.clone(),
            };
            source.replace_range(range.start as usize..range.end as usize, &replacement);
        }
        source
    }
}

impl Default for Arborist {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks what an elided node becomes once spliced out: the direct body
/// of a control-flow construct can't just vanish (that would either
/// dangle a `{` or change an `if (x) ;` into something that silently
/// swallows the next statement), so it becomes an empty statement;
/// everything else becomes an empty string.
fn empty_replacement_for(ast: &Ast, node_id: NodeId) -> String {
    let Some(parent_id) = ast.get(node_id).parent else {
        return String::new();
    };
    let is_control_flow_body = match &ast.get(parent_id).kind {
        NodeKind::IfStatement { consequent, alternate, .. } => {
            *consequent == node_id || *alternate == Some(node_id)
        }
        NodeKind::ForStatement { body, .. }
        | NodeKind::ForInStatement { body, .. }
        | NodeKind::ForOfStatement { body, .. }
        | NodeKind::WhileStatement { body, .. }
        | NodeKind::DoWhileStatement { body, .. } => *body == node_id,
        _ => false,
    };
    if is_control_flow_body { ";".to_string() } else { String::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::TreeSitterFrontend;

    #[test]
    fn splice_removes_in_reverse_offset_order() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse_source("let a = 1; let b = 2; let c = 3;").unwrap();
        let decls = ast.of_kind("VariableDeclaration");
        assert_eq!(decls.len(), 3);

        let mut arborist = Arborist::new();
        arborist.mark_node(decls[0]);
        arborist.mark_node(decls[2]);
        let spliced = arborist.splice(&ast);
        assert_eq!(spliced.trim(), "let b = 2;");
    }

    #[test]
    fn removing_an_if_body_leaves_an_empty_statement() {
        let mut frontend = TreeSitterFrontend::new().unwrap();
        let ast = frontend.parse_source("if (x) { y(); }").unwrap();
        let blocks = ast.of_kind("BlockStatement");
        assert_eq!(blocks.len(), 1);

        let mut arborist = Arborist::new();
        arborist.mark_node(blocks[0]);
        let spliced = arborist.splice(&ast);
        assert_eq!(spliced.trim(), "if (x) ;");
    }
}
