//! Lexical scope tree (§3's `Scope` record).
//!
//! Modeled after the teacher's `scope::binding::{Scope, ScopeId}` pair,
//! specialized from a cross-file binding tracker down to the
//! single-script reference graph this engine needs: declarations live
//! on the `Identifier` node itself (`Node::decl_node`/`references`),
//! the scope tree here only tracks nesting and declared names for
//! resolving a free identifier to its declaration during indexing.

use std::collections::HashMap;

use super::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn root() -> Self {
        Self(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    Function,
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// The statement/expression node that introduces this scope.
    pub containing_block: NodeId,
    /// Name -> declaring identifier NodeId, for names declared
    /// directly in this scope (not inherited from a parent).
    pub declared_names: HashMap<String, NodeId>,
}

impl Scope {
    pub fn declare(&mut self, name: impl Into<String>, decl: NodeId) {
        self.declared_names.insert(name.into(), decl);
    }
}

/// The scope forest for one [`Ast`](super::Ast), plus the lookup used
/// while indexing to resolve a read/write identifier to its
/// declaration in an enclosing scope.
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn create(&mut self, kind: ScopeKind, parent: Option<ScopeId>, containing_block: NodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            kind,
            parent,
            containing_block,
            declared_names: HashMap::new(),
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    /// Walks up the scope chain from `from`, returning the declaring
    /// identifier for `name` in the nearest enclosing scope, or `None`
    /// for a free/global name.
    pub fn resolve(&self, from: ScopeId, name: &str) -> Option<NodeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(decl) = scope.declared_names.get(name) {
                return Some(*decl);
            }
            current = scope.parent;
        }
        None
    }

    /// True if `ancestor` is `scope` or a (possibly transitive) parent
    /// of `scope`. Used by rules that must confirm two identifiers
    /// share the same enclosing scope lineage (e.g. fixed-value-after-declare).
    pub fn is_ancestor(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy() -> NodeId {
        NodeId(0)
    }

    #[test]
    fn resolve_walks_up_to_parent_scope() {
        let mut tree = ScopeTree::new();
        let root = tree.create(ScopeKind::Program, None, dummy());
        let child = tree.create(ScopeKind::Function, Some(root), dummy());
        tree.get_mut(root).declare("x", NodeId(1));

        assert_eq!(tree.resolve(child, "x"), Some(NodeId(1)));
        assert_eq!(tree.resolve(child, "y"), None);
    }

    #[test]
    fn shadowing_prefers_nearest_scope() {
        let mut tree = ScopeTree::new();
        let root = tree.create(ScopeKind::Program, None, dummy());
        let child = tree.create(ScopeKind::Function, Some(root), dummy());
        tree.get_mut(root).declare("x", NodeId(1));
        tree.get_mut(child).declare("x", NodeId(2));

        assert_eq!(tree.resolve(child, "x"), Some(NodeId(2)));
    }

    #[test]
    fn is_ancestor_reflexive_and_transitive() {
        let mut tree = ScopeTree::new();
        let root = tree.create(ScopeKind::Program, None, dummy());
        let mid = tree.create(ScopeKind::Function, Some(root), dummy());
        let leaf = tree.create(ScopeKind::Block, Some(mid), dummy());

        assert!(tree.is_ancestor(root, leaf));
        assert!(tree.is_ancestor(leaf, leaf));
        assert!(!tree.is_ancestor(leaf, root));
    }
}
