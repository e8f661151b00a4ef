//! Name resolution: every reference must resolve in some enclosing scope.
//!
//! A single visitor pass over the module; errors are aggregated rather than
//! stopping at the first failure. Built-in opcodes and the prelude value
//! names are exempt — they are provided by the compiler context, not by
//! user definitions.

use serde::Serialize;

use crate::{
    ir::{NodeId, OpDef, QuintDef, QuintEx, QuintModule},
    lookup::LookupTables,
    ops,
    scoping::ScopeTree,
    visitor::{IrVisitor, walk_module},
};

/// Which table a failed lookup was against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NameErrorKind {
    Value,
    Type,
}

/// A reference that did not resolve to any visible definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameError {
    pub kind: NameErrorKind,
    /// The name that failed to resolve.
    pub name: String,
    /// Name of the enclosing definition, for error attribution.
    pub definition_name: String,
    /// Name of the enclosing module.
    pub module_name: String,
    /// Identity of the referencing node.
    pub reference_id: NodeId,
}

/// Verifies that every name reference in `module` resolves.
///
/// Returns all failures; an empty error list is reported as `Ok`.
pub fn resolve(module: &QuintModule, tables: &LookupTables, scope_tree: &ScopeTree) -> Result<(), Vec<NameError>> {
    let mut resolver = Resolver {
        tables,
        scope_tree,
        module_stack: Vec::new(),
        def_stack: Vec::new(),
        errors: Vec::new(),
    };
    walk_module(&mut resolver, module);
    if resolver.errors.is_empty() {
        Ok(())
    } else {
        Err(resolver.errors)
    }
}

struct Resolver<'a> {
    tables: &'a LookupTables,
    scope_tree: &'a ScopeTree,
    module_stack: Vec<String>,
    def_stack: Vec<String>,
    errors: Vec<NameError>,
}

impl Resolver<'_> {
    fn record(&mut self, kind: NameErrorKind, name: &str, reference_id: NodeId) {
        self.errors.push(NameError {
            kind,
            name: name.to_owned(),
            definition_name: self.def_stack.last().cloned().unwrap_or_default(),
            module_name: self.module_stack.last().cloned().unwrap_or_default(),
            reference_id,
        });
    }

    fn check_value(&mut self, name: &str, reference_id: NodeId) {
        if ops::is_builtin_value(name) {
            return;
        }
        let scopes = self.scope_tree.scopes_for(reference_id);
        let resolved = self
            .module_stack
            .last()
            .and_then(|module| self.tables.for_module(module))
            .and_then(|table| table.resolve_value(name, scopes));
        if resolved.is_none() {
            self.record(NameErrorKind::Value, name, reference_id);
        }
    }
}

impl IrVisitor for Resolver<'_> {
    fn enter_module(&mut self, module: &QuintModule) {
        self.module_stack.push(module.name.clone());
    }

    fn exit_module(&mut self, _module: &QuintModule) {
        self.module_stack.pop();
    }

    fn enter_def(&mut self, def: &QuintDef) {
        // Operator definitions (including let-bound ones) are pushed by
        // enter_op_def; modules by enter_module.
        if !matches!(def, QuintDef::Def(_) | QuintDef::Module(_))
            && let Some(name) = def.declared_name()
        {
            self.def_stack.push(name.to_owned());
        }
    }

    fn exit_def(&mut self, def: &QuintDef) {
        if !matches!(def, QuintDef::Def(_) | QuintDef::Module(_)) && def.declared_name().is_some() {
            self.def_stack.pop();
        }
    }

    fn enter_op_def(&mut self, def: &OpDef) {
        self.def_stack.push(def.name.clone());
    }

    fn exit_op_def(&mut self, _def: &OpDef) {
        self.def_stack.pop();
    }

    fn enter_name(&mut self, id: NodeId, name: &str) {
        self.check_value(name, id);
    }

    fn enter_app(&mut self, id: NodeId, opcode: &str, _args: &[QuintEx]) {
        if !ops::is_builtin_opcode(opcode) {
            self.check_value(opcode, id);
        }
    }

    fn enter_const_type(&mut self, id: NodeId, name: &str) {
        let scopes = self.scope_tree.scopes_for(id);
        let resolved = self
            .module_stack
            .last()
            .and_then(|module| self.tables.for_module(module))
            .and_then(|table| table.resolve_type(name, scopes));
        if resolved.is_none() {
            self.record(NameErrorKind::Type, name, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn resolve_module(source: serde_json::Value) -> Result<(), Vec<NameError>> {
        let module: QuintModule = serde_json::from_value(source).unwrap();
        let tables = LookupTables::from_module(&module);
        let scope_tree = ScopeTree::from_module(&module);
        resolve(&module, &tables, &scope_tree)
    }

    #[test]
    fn undefined_name_reports_one_value_error() {
        let result = resolve_module(json!({
            "id": 1,
            "name": "M",
            "defs": [{
                "id": 2, "kind": "def", "name": "x", "qualifier": "val",
                "expr": { "id": 3, "kind": "app", "opcode": "iadd", "args": [
                    { "id": 4, "kind": "name", "name": "y" },
                    { "id": 5, "kind": "int", "value": 1 }
                ]}
            }]
        }));
        let errors = result.unwrap_err();
        assert_eq!(
            errors,
            vec![NameError {
                kind: NameErrorKind::Value,
                name: "y".to_owned(),
                definition_name: "x".to_owned(),
                module_name: "M".to_owned(),
                reference_id: 4,
            }]
        );
    }

    #[test]
    fn lambda_parameters_resolve_inside_their_body_only() {
        let ok = resolve_module(json!({
            "id": 1, "name": "M",
            "defs": [{
                "id": 2, "kind": "def", "name": "f", "qualifier": "def",
                "expr": {
                    "id": 3, "kind": "lambda", "params": [{ "id": 4, "name": "a" }],
                    "expr": { "id": 5, "kind": "name", "name": "a" }
                }
            }]
        }));
        assert!(ok.is_ok());

        let escaped = resolve_module(json!({
            "id": 1, "name": "M",
            "defs": [
                {
                    "id": 2, "kind": "def", "name": "f", "qualifier": "def",
                    "expr": {
                        "id": 3, "kind": "lambda", "params": [{ "id": 4, "name": "a" }],
                        "expr": { "id": 5, "kind": "name", "name": "a" }
                    }
                },
                { "id": 6, "kind": "def", "name": "g", "qualifier": "val",
                  "expr": { "id": 7, "kind": "name", "name": "a" } }
            ]
        }));
        let errors = escaped.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "a");
        assert_eq!(errors[0].definition_name, "g");
    }

    #[test]
    fn builtin_opcodes_and_prelude_names_are_exempt() {
        let result = resolve_module(json!({
            "id": 1, "name": "M",
            "defs": [{
                "id": 2, "kind": "def", "name": "small", "qualifier": "val",
                "expr": { "id": 3, "kind": "app", "opcode": "contains", "args": [
                    { "id": 4, "kind": "name", "name": "Nat" },
                    { "id": 5, "kind": "int", "value": 3 }
                ]}
            }]
        }));
        assert!(result.is_ok());
    }

    #[test]
    fn unknown_user_operator_in_application() {
        let result = resolve_module(json!({
            "id": 1, "name": "M",
            "defs": [{
                "id": 2, "kind": "def", "name": "x", "qualifier": "val",
                "expr": { "id": 3, "kind": "app", "opcode": "mystery", "args": [] }
            }]
        }));
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "mystery");
        assert_eq!(errors[0].reference_id, 3);
    }

    #[test]
    fn unresolved_type_reference() {
        let result = resolve_module(json!({
            "id": 1, "name": "M",
            "defs": [
                { "id": 2, "kind": "var", "name": "n", "type": { "id": 3, "kind": "const", "name": "Missing" } }
            ]
        }));
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, NameErrorKind::Type);
        assert_eq!(errors[0].definition_name, "n");
    }
}
