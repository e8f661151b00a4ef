//! Shared helpers for building IR modules as JSON, the same shape the
//! external parser produces.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use quiver::{CompiledModule, LookupTables, QuintModule, ScopeTree, Value, compile, resolve};
use serde_json::{Value as Json, json};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn fresh_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

pub fn bool_lit(value: bool) -> Json {
    json!({ "id": fresh_id(), "kind": "bool", "value": value })
}

pub fn int(value: i64) -> Json {
    json!({ "id": fresh_id(), "kind": "int", "value": value })
}

pub fn str_lit(value: &str) -> Json {
    json!({ "id": fresh_id(), "kind": "str", "value": value })
}

pub fn name(name: &str) -> Json {
    json!({ "id": fresh_id(), "kind": "name", "name": name })
}

pub fn app(opcode: &str, args: Vec<Json>) -> Json {
    json!({ "id": fresh_id(), "kind": "app", "opcode": opcode, "args": args })
}

pub fn lambda(params: &[&str], body: Json) -> Json {
    let params: Vec<Json> = params
        .iter()
        .map(|param| json!({ "id": fresh_id(), "name": param }))
        .collect();
    json!({ "id": fresh_id(), "kind": "lambda", "params": params, "expr": body })
}

pub fn let_in(name: &str, bound: Json, body: Json) -> Json {
    json!({
        "id": fresh_id(),
        "kind": "let",
        "opdef": { "id": fresh_id(), "name": name, "qualifier": "val", "expr": bound },
        "expr": body
    })
}

pub fn def(name: &str, qualifier: &str, expr: Json) -> Json {
    json!({ "id": fresh_id(), "kind": "def", "name": name, "qualifier": qualifier, "expr": expr })
}

pub fn var_decl(name: &str) -> Json {
    json!({ "id": fresh_id(), "kind": "var", "name": name, "type": { "kind": "int" } })
}

pub fn module(name: &str, defs: Vec<Json>) -> QuintModule {
    serde_json::from_value(json!({ "id": fresh_id(), "name": name, "defs": defs })).expect("valid module JSON")
}

/// Resolves and compiles, asserting both passes are clean.
pub fn prepare(module: &QuintModule) -> CompiledModule {
    let tables = LookupTables::from_module(module);
    let scope_tree = ScopeTree::from_module(module);
    if let Err(errors) = resolve(module, &tables, &scope_tree) {
        panic!("resolution failed: {errors:?}");
    }
    let compiled = compile(module, &HashMap::new());
    assert!(
        compiled.compile_errors.is_empty(),
        "compile errors: {:?}",
        compiled.compile_errors
    );
    compiled
}

/// Extracts the integer field `field` from a record value.
pub fn record_int(record: &Value, field: &str) -> i64 {
    use num_traits::ToPrimitive;
    record
        .as_record()
        .expect("expected a record")
        .get(field)
        .unwrap_or_else(|| panic!("record has no field {field}"))
        .as_int()
        .expect("expected an int field")
        .to_i64()
        .expect("field fits i64")
}

/// Looks up the integer value of `key` in a map value.
pub fn map_int(map: &Value, key: &str) -> i64 {
    use num_traits::ToPrimitive;
    map.as_map()
        .expect("expected a map")
        .get(&Value::str(key))
        .unwrap_or_else(|| panic!("map has no key {key}"))
        .as_int()
        .expect("expected an int value")
        .to_i64()
        .expect("value fits i64")
}
