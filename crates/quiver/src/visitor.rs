//! Depth-first IR walk with enter/exit hooks.
//!
//! Children are visited in source order; nested modules are walked in place
//! so visitors can track the module stack through `enter_module`/`exit_module`.
//! Every hook has a no-op default, so visitors implement only what they need.

use crate::ir::{LambdaParam, NodeId, OpDef, QuintDef, QuintEx, QuintModule, QuintType};

/// Visitor over modules, definitions, expressions, and types.
///
/// For every node the generic hook (`enter_def`, `enter_expr`, `enter_type`)
/// fires before the variant-specific hook, and the variant-specific exit hook
/// fires before the generic one.
pub trait IrVisitor {
    fn enter_module(&mut self, _module: &QuintModule) {}
    fn exit_module(&mut self, _module: &QuintModule) {}

    fn enter_def(&mut self, _def: &QuintDef) {}
    fn exit_def(&mut self, _def: &QuintDef) {}

    fn enter_op_def(&mut self, _def: &OpDef) {}
    fn exit_op_def(&mut self, _def: &OpDef) {}

    fn enter_var(&mut self, _id: NodeId, _name: &str) {}
    fn enter_const(&mut self, _id: NodeId, _name: &str) {}
    fn enter_assume(&mut self, _id: NodeId, _name: &str) {}
    fn enter_type_def(&mut self, _id: NodeId, _name: &str) {}
    fn enter_import(&mut self, _id: NodeId, _name: &str) {}
    fn enter_instance(&mut self, _id: NodeId, _name: &str, _proto_name: &str) {}

    fn enter_expr(&mut self, _expr: &QuintEx) {}
    fn exit_expr(&mut self, _expr: &QuintEx) {}

    fn enter_name(&mut self, _id: NodeId, _name: &str) {}
    fn enter_app(&mut self, _id: NodeId, _opcode: &str, _args: &[QuintEx]) {}
    fn exit_app(&mut self, _id: NodeId, _opcode: &str, _args: &[QuintEx]) {}
    fn enter_lambda(&mut self, _id: NodeId, _params: &[LambdaParam], _expr: &QuintEx) {}
    fn exit_lambda(&mut self, _id: NodeId, _params: &[LambdaParam], _expr: &QuintEx) {}
    fn enter_let(&mut self, _id: NodeId, _opdef: &OpDef, _expr: &QuintEx) {}
    fn exit_let(&mut self, _id: NodeId, _opdef: &OpDef, _expr: &QuintEx) {}

    fn enter_type(&mut self, _ty: &QuintType) {}
    fn exit_type(&mut self, _ty: &QuintType) {}
    fn enter_const_type(&mut self, _id: NodeId, _name: &str) {}
    fn enter_var_type(&mut self, _id: NodeId, _name: &str) {}
}

pub fn walk_module(visitor: &mut impl IrVisitor, module: &QuintModule) {
    visitor.enter_module(module);
    for def in &module.defs {
        walk_def(visitor, def);
    }
    visitor.exit_module(module);
}

pub fn walk_def(visitor: &mut impl IrVisitor, def: &QuintDef) {
    visitor.enter_def(def);
    match def {
        QuintDef::Def(op_def) => walk_op_def(visitor, op_def),
        QuintDef::Var { id, name, var_type } => {
            visitor.enter_var(*id, name);
            if let Some(ty) = var_type {
                walk_type(visitor, ty);
            }
        }
        QuintDef::Const { id, name, const_type } => {
            visitor.enter_const(*id, name);
            if let Some(ty) = const_type {
                walk_type(visitor, ty);
            }
        }
        QuintDef::Assume { id, name, assumption } => {
            visitor.enter_assume(*id, name);
            walk_expr(visitor, assumption);
        }
        QuintDef::TypeDef { id, name, type_def } => {
            visitor.enter_type_def(*id, name);
            if let Some(ty) = type_def {
                walk_type(visitor, ty);
            }
        }
        QuintDef::Import { id, name, .. } => visitor.enter_import(*id, name),
        QuintDef::Instance {
            id,
            name,
            proto_name,
            overrides,
        } => {
            visitor.enter_instance(*id, name, proto_name);
            for (_, expr) in overrides {
                walk_expr(visitor, expr);
            }
        }
        QuintDef::Module(nested) => walk_module(visitor, nested),
    }
    visitor.exit_def(def);
}

pub fn walk_op_def(visitor: &mut impl IrVisitor, def: &OpDef) {
    visitor.enter_op_def(def);
    if let Some(ty) = &def.type_annotation {
        walk_type(visitor, ty);
    }
    walk_expr(visitor, &def.expr);
    visitor.exit_op_def(def);
}

pub fn walk_expr(visitor: &mut impl IrVisitor, expr: &QuintEx) {
    visitor.enter_expr(expr);
    match expr {
        QuintEx::Bool { .. } | QuintEx::Int { .. } | QuintEx::Str { .. } => {}
        QuintEx::Name { id, name } => visitor.enter_name(*id, name),
        QuintEx::App { id, opcode, args } => {
            visitor.enter_app(*id, opcode, args);
            for arg in args {
                walk_expr(visitor, arg);
            }
            visitor.exit_app(*id, opcode, args);
        }
        QuintEx::Lambda { id, params, expr: body } => {
            visitor.enter_lambda(*id, params, body);
            walk_expr(visitor, body);
            visitor.exit_lambda(*id, params, body);
        }
        QuintEx::Let { id, opdef, expr: body } => {
            visitor.enter_let(*id, opdef, body);
            walk_op_def(visitor, opdef);
            walk_expr(visitor, body);
            visitor.exit_let(*id, opdef, body);
        }
    }
    visitor.exit_expr(expr);
}

pub fn walk_type(visitor: &mut impl IrVisitor, ty: &QuintType) {
    visitor.enter_type(ty);
    match ty {
        QuintType::Bool { .. } | QuintType::Int { .. } | QuintType::Str { .. } => {}
        QuintType::Const { id, name } => visitor.enter_const_type(*id, name),
        QuintType::Var { id, name } => visitor.enter_var_type(*id, name),
        QuintType::Set { elem, .. } | QuintType::List { elem, .. } => walk_type(visitor, elem),
        QuintType::Fun { arg, res, .. } => {
            walk_type(visitor, arg);
            walk_type(visitor, res);
        }
        QuintType::Oper { args, res, .. } => {
            for arg in args {
                walk_type(visitor, arg);
            }
            walk_type(visitor, res);
        }
        QuintType::Tup { elems, .. } => {
            for elem in elems {
                walk_type(visitor, elem);
            }
        }
        QuintType::Rec { fields, .. } => {
            for field in fields {
                walk_type(visitor, &field.field_type);
            }
        }
        QuintType::Union { records, .. } => {
            for record in records {
                for field in &record.fields {
                    walk_type(visitor, &field.field_type);
                }
            }
        }
    }
    visitor.exit_type(ty);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct CollectingVisitor {
        names: Vec<String>,
        modules: Vec<String>,
        depth: usize,
        max_depth: usize,
    }

    impl IrVisitor for CollectingVisitor {
        fn enter_module(&mut self, module: &QuintModule) {
            self.modules.push(module.name.clone());
        }

        fn enter_expr(&mut self, _expr: &QuintEx) {
            self.depth += 1;
            self.max_depth = self.max_depth.max(self.depth);
        }

        fn exit_expr(&mut self, _expr: &QuintEx) {
            self.depth -= 1;
        }

        fn enter_name(&mut self, _id: NodeId, name: &str) {
            self.names.push(name.to_owned());
        }
    }

    #[test]
    fn walk_visits_nested_modules_and_names_in_source_order() {
        let module: QuintModule = serde_json::from_value(json!({
            "id": 1,
            "name": "outer",
            "defs": [
                {
                    "id": 2, "kind": "def", "name": "a", "qualifier": "val",
                    "expr": { "id": 3, "kind": "app", "opcode": "iadd", "args": [
                        { "id": 4, "kind": "name", "name": "x" },
                        { "id": 5, "kind": "name", "name": "y" }
                    ]}
                },
                {
                    "id": 6, "kind": "module", "name": "inner", "defs": [
                        { "id": 7, "kind": "def", "name": "b", "qualifier": "val",
                          "expr": { "id": 8, "kind": "name", "name": "z" } }
                    ]
                }
            ]
        }))
        .unwrap();

        let mut visitor = CollectingVisitor::default();
        walk_module(&mut visitor, &module);
        assert_eq!(visitor.names, vec!["x", "y", "z"]);
        assert_eq!(visitor.modules, vec!["outer", "inner"]);
        assert_eq!(visitor.depth, 0);
        assert_eq!(visitor.max_depth, 2);
    }
}
