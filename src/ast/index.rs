//! The type-index ("typeMap", §3): per-kind buckets of nodes in
//! source order, so rules iterate candidates directly instead of
//! walking the whole tree on every pass.

use std::collections::HashMap;

use super::node::{Node, NodeId};

#[derive(Debug, Default)]
pub struct TypeMap {
    buckets: HashMap<&'static str, Vec<NodeId>>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(nodes: &[Node]) -> Self {
        let mut map = Self::new();
        // `nodes` is already in arena-allocation order, which the
        // lowering pass assigns depth-first in source order, so each
        // bucket comes out in source order for free.
        for node in nodes {
            map.buckets.entry(node.kind.kind_name()).or_default().push(node.id);
        }
        map
    }

    pub fn of_kind(&self, kind_name: &'static str) -> &[NodeId] {
        self.buckets.get(kind_name).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::literal::LiteralValue;
    use crate::ast::node::{NodeKind, ParentKey, Range};
    use crate::ast::scope::ScopeId;

    fn lit(id: u32, n: f64) -> Node {
        Node {
            id: NodeId(id),
            kind: NodeKind::Literal(LiteralValue::Number(n)),
            range: Range::new(0, 1),
            src: n.to_string(),
            parent: None,
            parent_key: ParentKey::Root,
            scope: ScopeId::root(),
            decl_node: None,
            references: Vec::new(),
            lineage: Vec::new(),
        }
    }

    #[test]
    fn buckets_by_kind_name() {
        let nodes = vec![lit(0, 1.0), lit(1, 2.0)];
        let map = TypeMap::build(&nodes);
        assert_eq!(map.of_kind("Literal"), &[NodeId(0), NodeId(1)]);
        assert!(map.of_kind("Identifier").is_empty());
    }
}
