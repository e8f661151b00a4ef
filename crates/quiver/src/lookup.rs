//! Definition tables: name to value- and type-definitions, per module.
//!
//! Module-level definitions are unscoped (visible everywhere in their
//! module); `let`-bound operators and lambda parameters carry the identity
//! of the binding node as their scope. Resolution is a bounded linear search
//! over the candidates for a name.

use std::rc::Rc;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{
    ir::{LambdaParam, NodeId, OpDef, QuintDef, QuintEx, QuintModule},
    visitor::{IrVisitor, walk_module},
};

/// What kind of declaration produced a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum DefinitionKind {
    Op,
    Var,
    Const,
    Assume,
    Param,
    Type,
}

/// A single name definition.
#[derive(Debug, Clone)]
pub struct Definition {
    pub identifier: Rc<str>,
    pub kind: DefinitionKind,
    /// Binding node the definition is scoped to; `None` means module-global.
    pub scope: Option<NodeId>,
    /// Identity of the declaration site.
    pub reference: NodeId,
}

impl Definition {
    /// Scope test: visible at a node whose enclosing scopes are `scopes`.
    #[must_use]
    pub fn is_visible(&self, scopes: &[NodeId]) -> bool {
        match self.scope {
            None => true,
            Some(scope) => scopes.contains(&scope),
        }
    }
}

/// Value- and type-definition tables of one module.
#[derive(Debug, Default)]
pub struct LookupTable {
    value_defs: AHashMap<Rc<str>, SmallVec<[Definition; 1]>>,
    type_defs: AHashMap<Rc<str>, SmallVec<[Definition; 1]>>,
}

impl LookupTable {
    pub fn value_candidates(&self, name: &str) -> &[Definition] {
        self.value_defs.get(name).map_or(&[], |defs| defs.as_slice())
    }

    pub fn type_candidates(&self, name: &str) -> &[Definition] {
        self.type_defs.get(name).map_or(&[], |defs| defs.as_slice())
    }

    /// Resolves a value name at a reference with the given enclosing scopes.
    pub fn resolve_value(&self, name: &str, scopes: &[NodeId]) -> Option<&Definition> {
        self.value_candidates(name).iter().find(|def| def.is_visible(scopes))
    }

    /// Resolves a type name; type definitions are module-global today, so
    /// the scope test always passes.
    pub fn resolve_type(&self, name: &str, scopes: &[NodeId]) -> Option<&Definition> {
        self.type_candidates(name).iter().find(|def| def.is_visible(scopes))
    }

    fn add_value(&mut self, def: Definition) {
        self.value_defs.entry(Rc::clone(&def.identifier)).or_default().push(def);
    }

    fn add_type(&mut self, def: Definition) {
        self.type_defs.entry(Rc::clone(&def.identifier)).or_default().push(def);
    }
}

/// Definition tables for a module tree, keyed by module name.
#[derive(Debug, Default)]
pub struct LookupTables {
    modules: AHashMap<Rc<str>, LookupTable>,
}

impl LookupTables {
    /// Collects definitions for a module and all nested modules.
    #[must_use]
    pub fn from_module(module: &QuintModule) -> Self {
        let mut builder = TableBuilder {
            tables: Self::default(),
            module_stack: Vec::new(),
            let_bound: ahash::AHashSet::new(),
        };
        walk_module(&mut builder, module);
        builder.tables
    }

    #[must_use]
    pub fn for_module(&self, name: &str) -> Option<&LookupTable> {
        self.modules.get(name)
    }
}

struct TableBuilder {
    tables: LookupTables,
    module_stack: Vec<Rc<str>>,
    /// Operator definitions already added with a `let` scope.
    let_bound: ahash::AHashSet<NodeId>,
}

impl TableBuilder {
    fn current(&mut self) -> &mut LookupTable {
        let name = self.module_stack.last().expect("definition outside any module");
        self.tables.modules.entry(Rc::clone(name)).or_default()
    }

    fn add_value(&mut self, name: &str, kind: DefinitionKind, scope: Option<NodeId>, reference: NodeId) {
        let def = Definition {
            identifier: Rc::from(name),
            kind,
            scope,
            reference,
        };
        self.current().add_value(def);
    }
}

impl IrVisitor for TableBuilder {
    fn enter_module(&mut self, module: &QuintModule) {
        let name: Rc<str> = Rc::from(module.name.as_str());
        self.tables.modules.entry(Rc::clone(&name)).or_default();
        self.module_stack.push(name);
    }

    fn exit_module(&mut self, _module: &QuintModule) {
        self.module_stack.pop();
    }

    fn enter_def(&mut self, def: &QuintDef) {
        match def {
            // Operator definitions are handled in enter_op_def so that
            // let-bound operators take the same path as top-level ones.
            QuintDef::Def(_) => {}
            QuintDef::Var { id, name, .. } => self.add_value(name, DefinitionKind::Var, None, *id),
            QuintDef::Const { id, name, .. } => self.add_value(name, DefinitionKind::Const, None, *id),
            QuintDef::Assume { id, name, .. } => self.add_value(name, DefinitionKind::Assume, None, *id),
            QuintDef::TypeDef { id, name, .. } => {
                let type_def = Definition {
                    identifier: Rc::from(name.as_str()),
                    kind: DefinitionKind::Type,
                    scope: None,
                    reference: *id,
                };
                self.current().add_type(type_def);
            }
            QuintDef::Import { .. } | QuintDef::Instance { .. } | QuintDef::Module(_) => {}
        }
    }

    fn enter_op_def(&mut self, def: &OpDef) {
        if !self.let_bound.contains(&def.id) {
            self.add_value(&def.name, DefinitionKind::Op, None, def.id);
        }
    }

    fn enter_let(&mut self, id: NodeId, opdef: &OpDef, _expr: &QuintEx) {
        // Bound operators are scoped to the whole let expression; mark the
        // opdef so enter_op_def does not also add a module-global entry.
        self.let_bound.insert(opdef.id);
        self.add_value(&opdef.name, DefinitionKind::Op, Some(id), opdef.id);
    }

    fn enter_lambda(&mut self, id: NodeId, params: &[LambdaParam], _expr: &QuintEx) {
        for param in params {
            self.add_value(&param.name, DefinitionKind::Param, Some(id), param.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn collects_scoped_and_unscoped_definitions() {
        let module: QuintModule = serde_json::from_value(json!({
            "id": 1,
            "name": "m",
            "defs": [
                { "id": 2, "kind": "var", "name": "n", "type": { "kind": "int" } },
                { "id": 10, "kind": "typedef", "name": "Temp", "type": { "kind": "int" } },
                {
                    "id": 3, "kind": "def", "name": "f", "qualifier": "def",
                    "expr": {
                        "id": 4, "kind": "lambda",
                        "params": [{ "id": 5, "name": "x" }],
                        "expr": {
                            "id": 6, "kind": "let",
                            "opdef": { "id": 7, "name": "y", "qualifier": "val",
                                       "expr": { "id": 8, "kind": "int", "value": 2 } },
                            "expr": { "id": 9, "kind": "name", "name": "y" }
                        }
                    }
                }
            ]
        }))
        .unwrap();

        let tables = LookupTables::from_module(&module);
        let table = tables.for_module("m").unwrap();

        let var = table.resolve_value("n", &[1]).unwrap();
        assert_eq!(var.kind, DefinitionKind::Var);
        assert_eq!(var.scope, None);

        // The parameter is visible only where the lambda id is in scope.
        assert!(table.resolve_value("x", &[6, 4, 3, 1]).is_some());
        assert!(table.resolve_value("x", &[1]).is_none());

        // The let-bound operator is scoped to the let expression.
        let y = table.resolve_value("y", &[9, 6, 4, 3, 1]).unwrap();
        assert_eq!(y.scope, Some(6));
        assert!(table.resolve_value("y", &[1]).is_none());

        assert!(table.resolve_type("Temp", &[1]).is_some());
        assert!(table.resolve_type("Missing", &[1]).is_none());
    }
}
