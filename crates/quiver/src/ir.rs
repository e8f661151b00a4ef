//! Intermediate representation of parsed modules.
//!
//! The concrete grammar and parser live in an external tool; this crate
//! consumes the already-parsed tree through the serde shapes below (JSON in
//! practice, with `kind` discriminants). Every node carries an integer
//! identity unique within a parse; identities index the scope tree and
//! attribute errors back to source locations in the embedding layer.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Identity of an IR node, unique within a parse.
pub type NodeId = u64;

/// An expression of the specification language.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuintEx {
    /// Boolean literal.
    Bool { id: NodeId, value: bool },
    /// Arbitrary-precision integer literal.
    Int {
        id: NodeId,
        #[serde(with = "int_literal")]
        value: BigInt,
    },
    /// String literal.
    Str { id: NodeId, value: String },
    /// Reference to a definition, variable, or parameter.
    Name { id: NodeId, name: String },
    /// Operator application: a built-in opcode or a user-defined operator
    /// referenced by name.
    App {
        id: NodeId,
        opcode: String,
        args: Vec<QuintEx>,
    },
    /// Anonymous operator.
    Lambda {
        id: NodeId,
        params: Vec<LambdaParam>,
        expr: Box<QuintEx>,
    },
    /// Operator definition scoped to a body expression.
    Let {
        id: NodeId,
        opdef: Box<OpDef>,
        expr: Box<QuintEx>,
    },
}

impl QuintEx {
    #[must_use]
    pub fn id(&self) -> NodeId {
        match self {
            Self::Bool { id, .. }
            | Self::Int { id, .. }
            | Self::Str { id, .. }
            | Self::Name { id, .. }
            | Self::App { id, .. }
            | Self::Lambda { id, .. }
            | Self::Let { id, .. } => *id,
        }
    }
}

/// Formal parameter of a lambda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaParam {
    pub id: NodeId,
    pub name: String,
}

/// Operator qualifier, fixing how a definition may interact with state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString, strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OpQualifier {
    /// State-dependent value, no parameters.
    Val,
    /// Parameterized operator, no state mutation.
    Def,
    /// Statically state-independent value.
    PureVal,
    /// Statically state-independent operator.
    PureDef,
    /// May write next-state registers.
    Action,
    /// Sequential composition of actions.
    Run,
    /// Temporal-logic operator; rejected by the evaluation core.
    Temporal,
}

/// A named operator definition, at module level or bound by `let`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpDef {
    pub id: NodeId,
    pub name: String,
    pub qualifier: OpQualifier,
    pub expr: QuintEx,
    #[serde(rename = "typeAnnotation", default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<QuintType>,
}

/// A top-level (or nested-module) definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuintDef {
    /// Operator definition of any qualifier.
    Def(OpDef),
    /// State variable declaration.
    Var {
        id: NodeId,
        name: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        var_type: Option<QuintType>,
    },
    /// Constant declaration, instantiated by the embedding environment.
    Const {
        id: NodeId,
        name: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        const_type: Option<QuintType>,
    },
    /// Named assumption over constants.
    Assume {
        id: NodeId,
        name: String,
        assumption: QuintEx,
    },
    /// Type alias definition.
    TypeDef {
        id: NodeId,
        name: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        type_def: Option<QuintType>,
    },
    /// Module import.
    Import {
        id: NodeId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    /// Module instantiation with constant overrides.
    Instance {
        id: NodeId,
        name: String,
        #[serde(rename = "protoName")]
        proto_name: String,
        #[serde(default)]
        overrides: Vec<(String, QuintEx)>,
    },
    /// Nested module definition.
    Module(QuintModule),
}

impl QuintDef {
    #[must_use]
    pub fn id(&self) -> NodeId {
        match self {
            Self::Def(def) => def.id,
            Self::Var { id, .. }
            | Self::Const { id, .. }
            | Self::Assume { id, .. }
            | Self::TypeDef { id, .. }
            | Self::Import { id, .. }
            | Self::Instance { id, .. } => *id,
            Self::Module(module) => module.id,
        }
    }

    /// The name the definition introduces, if any.
    #[must_use]
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            Self::Def(def) => Some(&def.name),
            Self::Var { name, .. }
            | Self::Const { name, .. }
            | Self::Assume { name, .. }
            | Self::TypeDef { name, .. }
            | Self::Instance { name, .. } => Some(name),
            Self::Import { .. } => None,
            Self::Module(module) => Some(&module.name),
        }
    }
}

/// A record field in a record or union type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFieldType {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "fieldType")]
    pub field_type: QuintType,
}

/// One variant of a union-of-records type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnionRecordType {
    #[serde(rename = "tagValue")]
    pub tag_value: String,
    pub fields: Vec<RecordFieldType>,
}

/// A type expression. Types are checked upstream; the evaluation core only
/// walks them for scope bookkeeping and name resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuintType {
    Bool {
        #[serde(default)]
        id: NodeId,
    },
    Int {
        #[serde(default)]
        id: NodeId,
    },
    Str {
        #[serde(default)]
        id: NodeId,
    },
    /// Reference to a named (user-defined) type.
    Const {
        #[serde(default)]
        id: NodeId,
        name: String,
    },
    /// Type variable.
    Var {
        #[serde(default)]
        id: NodeId,
        name: String,
    },
    Set {
        #[serde(default)]
        id: NodeId,
        elem: Box<QuintType>,
    },
    List {
        #[serde(default)]
        id: NodeId,
        elem: Box<QuintType>,
    },
    Fun {
        #[serde(default)]
        id: NodeId,
        arg: Box<QuintType>,
        res: Box<QuintType>,
    },
    Oper {
        #[serde(default)]
        id: NodeId,
        args: Vec<QuintType>,
        res: Box<QuintType>,
    },
    Tup {
        #[serde(default)]
        id: NodeId,
        elems: Vec<QuintType>,
    },
    Rec {
        #[serde(default)]
        id: NodeId,
        fields: Vec<RecordFieldType>,
    },
    Union {
        #[serde(default)]
        id: NodeId,
        tag: String,
        records: Vec<UnionRecordType>,
    },
}

impl QuintType {
    #[must_use]
    pub fn id(&self) -> NodeId {
        match self {
            Self::Bool { id }
            | Self::Int { id }
            | Self::Str { id }
            | Self::Const { id, .. }
            | Self::Var { id, .. }
            | Self::Set { id, .. }
            | Self::List { id, .. }
            | Self::Fun { id, .. }
            | Self::Oper { id, .. }
            | Self::Tup { id, .. }
            | Self::Rec { id, .. }
            | Self::Union { id, .. } => *id,
        }
    }
}

/// A module: a name and an ordered list of definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuintModule {
    pub id: NodeId,
    pub name: String,
    pub defs: Vec<QuintDef>,
}

impl QuintModule {
    /// Loads a module from its JSON serialization.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }
}

/// Serde adapter keeping integer literals as plain JSON numbers when they
/// fit and decimal strings when they do not.
mod int_literal {
    use std::fmt;

    use num_bigint::BigInt;
    use num_traits::ToPrimitive;
    use serde::{Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        match value.to_i64() {
            Some(small) => serializer.serialize_i64(small),
            None => serializer.serialize_str(&value.to_string()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        struct IntVisitor;

        impl de::Visitor<'_> for IntVisitor {
            type Value = BigInt;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an integer or a decimal string")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<BigInt, E> {
                Ok(BigInt::from(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<BigInt, E> {
                Ok(BigInt::from(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<BigInt, E> {
                value.parse().map_err(|_| E::custom(format!("invalid integer literal: {value}")))
            }
        }

        deserializer.deserialize_any(IntVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn module_round_trips_through_json() {
        let source = json!({
            "id": 1,
            "name": "counter",
            "defs": [
                { "id": 2, "kind": "var", "name": "n", "type": { "kind": "int" } },
                {
                    "id": 3,
                    "kind": "def",
                    "name": "init",
                    "qualifier": "action",
                    "expr": {
                        "id": 4,
                        "kind": "app",
                        "opcode": "assign",
                        "args": [
                            { "id": 5, "kind": "name", "name": "n" },
                            { "id": 6, "kind": "int", "value": 1 }
                        ]
                    }
                }
            ]
        });
        let module = QuintModule::from_json(&source.to_string()).unwrap();
        assert_eq!(module.name, "counter");
        assert_eq!(module.defs.len(), 2);
        let QuintDef::Def(op) = &module.defs[1] else {
            panic!("expected an operator definition");
        };
        assert_eq!(op.qualifier, OpQualifier::Action);
        assert_eq!(op.expr.id(), 4);
    }

    #[test]
    fn big_literals_deserialize_from_strings() {
        let source = json!({ "id": 1, "kind": "int", "value": "123456789012345678901234567890" });
        let expr: QuintEx = serde_json::from_value(source).unwrap();
        let QuintEx::Int { value, .. } = expr else {
            panic!("expected an int literal");
        };
        assert_eq!(value.to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn qualifier_strings() {
        assert_eq!(OpQualifier::PureDef.to_string(), "puredef");
        assert_eq!("action".parse::<OpQualifier>().unwrap(), OpQualifier::Action);
    }
}
