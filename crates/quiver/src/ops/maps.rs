//! Map constructors and access. Keys are stored in normal form so lookups
//! agree with structural equality.

use std::rc::Rc;

use indexmap::IndexMap;

use super::{binary, tag, ternary, unary};
use crate::{
    errors::{RuntimeError, RuntimeErrorKind},
    eval::Computable,
    ir::NodeId,
    value::{SetValue, Value},
};

fn pair_of(value: &Value) -> Result<(Value, Value), RuntimeError> {
    let elements = value.as_tuple()?;
    if elements.len() != 2 {
        return Err(RuntimeError::internal(format!(
            "map entries must be pairs, got a {}-tuple",
            elements.len()
        )));
    }
    Ok((elements[0].clone(), elements[1].clone()))
}

/// `Map(p1, …, pn)` over key/value pairs; a repeated key keeps the last
/// value.
pub(crate) fn map_ctor(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    Computable::from_fn(move |ctx| {
        let mut entries = IndexMap::with_capacity(args.len());
        for arg in &args {
            let (key, value) = pair_of(&arg.eval(ctx)?)?;
            entries.insert(key.normal_form(), value);
        }
        Ok(Value::map(entries))
    })
}

/// `setToMap(s)`: a set of pairs becomes a map.
pub(crate) fn set_to_map(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, move |set, _| {
        let mut entries = IndexMap::new();
        for element in set.as_set()?.elements().map_err(tag(id))? {
            let (key, value) = pair_of(&element)?;
            entries.insert(key.normal_form(), value);
        }
        Ok(Value::map(entries))
    })
}

/// `setOfMaps(D, R)`: all total maps from `D` to `R`, kept lazy.
pub(crate) fn set_of_maps(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, |domain, range, _| {
        Ok(Value::Set(SetValue::MapSet(
            Rc::new(domain.as_set()?.clone()),
            Rc::new(range.as_set()?.clone()),
        )))
    })
}

fn missing_key(map: &Value, key: &Value, id: NodeId) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::MissingKey, format!("map {map} has no key {key}")).with_ref(id)
}

pub(crate) fn get(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |map, key, _| {
        let normalized = key.normal_form();
        map.as_map()?
            .get(&normalized)
            .cloned()
            .ok_or_else(|| missing_key(&map, &key, id))
    })
}

/// `set(m, k, v)`: update of an existing key only.
pub(crate) fn set_key(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    ternary(args, move |map, key, value, _| {
        let normalized = key.normal_form();
        let entries = map.as_map()?;
        if !entries.contains_key(&normalized) {
            return Err(missing_key(&map, &key, id));
        }
        let mut updated = entries.clone();
        updated.insert(normalized, value);
        Ok(Value::map(updated))
    })
}

/// `setBy(m, k, f)`: update an existing key by applying `f` to its value.
pub(crate) fn set_by(id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let update = args.remove(2);
    let key_arg = args.remove(1);
    let map_arg = args.remove(0);
    Computable::from_fn(move |ctx| {
        let map = map_arg.eval(ctx)?;
        let key = key_arg.eval(ctx)?;
        let normalized = key.normal_form();
        let entries = map.as_map()?;
        let old = entries
            .get(&normalized)
            .cloned()
            .ok_or_else(|| missing_key(&map, &key, id))?;
        let new = update.call(vec![old], ctx)?;
        let mut updated = entries.clone();
        updated.insert(normalized, new);
        Ok(Value::map(updated))
    })
}

/// `put(m, k, v)`: insert or overwrite.
pub(crate) fn put(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    ternary(args, |map, key, value, _| {
        let mut updated = map.as_map()?.clone();
        updated.insert(key.normal_form(), value);
        Ok(Value::map(updated))
    })
}

pub(crate) fn keys(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, |map, _| {
        Ok(Value::set_of(map.as_map()?.keys().cloned().collect()))
    })
}
