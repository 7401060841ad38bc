//! The annotated AST model (§3, §4.A).
//!
//! An [`Ast`] owns an arena of [`Node`]s addressed by [`NodeId`], the
//! type-index described in spec.md §3, and the scope tree used to
//! resolve free identifiers during (re-)indexing. The engine only
//! *reads* an `Ast`; all mutation goes through
//! [`crate::arborist::Arborist`].

mod index;
pub mod literal;
pub mod node;
mod reindex;
pub mod scope;

pub use index::TypeMap;
pub use literal::LiteralValue;
pub use node::{MethodKind, Node, NodeId, NodeKind, ParentKey, Range, VarKind};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};

/// A fully annotated AST for one script, plus its precomputed indices.
///
/// Node equality is identity (`NodeId`), never structural, per §4.A.
pub struct Ast {
    /// The original source this tree was parsed from. The Arborist
    /// edits a copy of this buffer on commit and produces a *new*
    /// `Ast` rather than mutating this one in place.
    pub source: String,
    nodes: Vec<Node>,
    pub root: NodeId,
    pub type_map: TypeMap,
    pub scopes: ScopeTree,
}

impl Ast {
    /// Used by the frontend while lowering a parse tree: nodes must be
    /// pushed in final source order so the resulting type-index
    /// buckets come out ordered for free.
    pub(crate) fn from_parts(source: String, nodes: Vec<Node>, root: NodeId, scopes: ScopeTree) -> Self {
        let type_map = TypeMap::build(&nodes);
        Self { source, nodes, root, type_map, scopes }
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id).kind.children()
    }

    /// All nodes of one kind, in source order (§3's typeMap contract).
    pub fn of_kind(&self, kind_name: &'static str) -> &[NodeId] {
        self.type_map.of_kind(kind_name)
    }

    /// True if `candidate`'s range falls inside a range another
    /// candidate in `already_touched` covers — the staleness check
    /// every rule must apply before transforming a match (§4.E
    /// "shared rule invariants", §7 `StaleNode`).
    pub fn is_stale(&self, candidate: NodeId, already_touched: &[Range]) -> bool {
        let range = self.get(candidate).range;
        already_touched.iter().any(|touched| touched.overlaps(&range))
    }

    /// Re-derives scope/declaration/reference metadata on an
    /// already-built node arena without re-parsing. Used by the
    /// Arborist after a commit that only spliced a handful of nodes.
    pub(crate) fn reindex(&mut self) {
        reindex::reindex(self);
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}
