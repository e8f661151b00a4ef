//! Scope tree: node identity to enclosing scope identities.
//!
//! Built once per module by a single walk. A node's chain lists the node
//! itself and every enclosing node, innermost first; scoped definitions are
//! visible at a reference exactly when the definition's scope id appears in
//! the reference's chain.

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{
    ir::{LambdaParam, NodeId, QuintDef, QuintEx, QuintModule, QuintType},
    visitor::{IrVisitor, walk_module},
};

type ScopeChain = SmallVec<[NodeId; 8]>;

/// Maps every node identity to its enclosing scope identities.
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: AHashMap<NodeId, ScopeChain>,
}

impl ScopeTree {
    /// Builds the tree for a module, including nested modules.
    #[must_use]
    pub fn from_module(module: &QuintModule) -> Self {
        let mut builder = ScopeTreeBuilder {
            tree: Self::default(),
            stack: Vec::new(),
        };
        walk_module(&mut builder, module);
        debug_assert!(builder.stack.is_empty(), "unbalanced scope stack");
        builder.tree
    }

    /// All enclosing scope ids of `id`, innermost first. Unknown ids have an
    /// empty chain.
    #[must_use]
    pub fn scopes_for(&self, id: NodeId) -> &[NodeId] {
        self.scopes.get(&id).map_or(&[], |chain| chain.as_slice())
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.scopes.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    fn record(&mut self, id: NodeId, stack: &[NodeId]) {
        let chain: ScopeChain = stack.iter().rev().copied().collect();
        self.scopes.insert(id, chain);
    }
}

struct ScopeTreeBuilder {
    tree: ScopeTree,
    stack: Vec<NodeId>,
}

impl ScopeTreeBuilder {
    fn push(&mut self, id: NodeId) {
        self.stack.push(id);
        self.tree.record(id, &self.stack);
    }

    fn pop(&mut self, id: NodeId) {
        let popped = self.stack.pop();
        debug_assert_eq!(popped, Some(id), "scope stack out of order");
    }
}

impl IrVisitor for ScopeTreeBuilder {
    fn enter_module(&mut self, module: &QuintModule) {
        self.push(module.id);
    }

    fn exit_module(&mut self, module: &QuintModule) {
        self.pop(module.id);
    }

    fn enter_def(&mut self, def: &QuintDef) {
        // Nested modules record themselves through enter_module.
        if !matches!(def, QuintDef::Module(_)) {
            self.push(def.id());
        }
    }

    fn exit_def(&mut self, def: &QuintDef) {
        if !matches!(def, QuintDef::Module(_)) {
            self.pop(def.id());
        }
    }

    fn enter_expr(&mut self, expr: &QuintEx) {
        self.push(expr.id());
    }

    fn exit_expr(&mut self, expr: &QuintEx) {
        self.pop(expr.id());
    }

    fn enter_lambda(&mut self, _id: NodeId, params: &[LambdaParam], _expr: &QuintEx) {
        // Parameters are not walked as expressions but still need chains:
        // their declaration scope is the lambda itself.
        for param in params {
            self.tree.record(param.id, &self.stack);
        }
    }

    fn enter_type(&mut self, ty: &QuintType) {
        self.push(ty.id());
    }

    fn exit_type(&mut self, ty: &QuintType) {
        self.pop(ty.id());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn chains_list_ancestors_innermost_first() {
        let module: QuintModule = serde_json::from_value(json!({
            "id": 1,
            "name": "m",
            "defs": [{
                "id": 2, "kind": "def", "name": "f", "qualifier": "def",
                "expr": {
                    "id": 3, "kind": "lambda",
                    "params": [{ "id": 4, "name": "x" }],
                    "expr": { "id": 5, "kind": "app", "opcode": "iadd", "args": [
                        { "id": 6, "kind": "name", "name": "x" },
                        { "id": 7, "kind": "int", "value": 1 }
                    ]}
                }
            }]
        }))
        .unwrap();

        let tree = ScopeTree::from_module(&module);
        assert_eq!(tree.scopes_for(6), &[6, 5, 3, 2, 1]);
        // The lambda parameter's innermost scope is the lambda.
        assert_eq!(tree.scopes_for(4), &[3, 2, 1]);
        // Every expression identity appears in the tree.
        for id in [3u64, 5, 6, 7] {
            assert!(tree.contains(id));
        }
        assert!(tree.scopes_for(99).is_empty());
    }
}
