//! Higher-order operators: folds, quantifiers, map/filter.
//!
//! The callable operand arrives as a computable (a compiled lambda or a
//! named operator) and is invoked once per element in the collection's
//! stable enumeration order.

use std::rc::Rc;

use indexmap::IndexMap;

use super::tag;
use crate::{
    errors::{EvalResult, RuntimeError},
    eval::Computable,
    ir::NodeId,
    value::Value,
};

/// Elements of a set (enumeration order) or list (positional order).
fn elements_of(collection: &Value, id: NodeId) -> EvalResult<Vec<Value>> {
    match collection {
        Value::Set(set) => set.elements().map_err(tag(id)),
        Value::List(elements) => Ok(elements.to_vec()),
        other => Err(RuntimeError::internal(format!(
            "expected a set or a list, found a {}",
            other.kind_name()
        ))),
    }
}

/// `fold`/`foldl`: left-to-right with callable `(accumulator, element)`.
pub(crate) fn fold_forward(id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let combine = args.remove(2);
    let init = args.remove(1);
    let collection = args.remove(0);
    Computable::from_fn(move |ctx| {
        let elements = elements_of(&collection.eval(ctx)?, id)?;
        let mut accumulator = init.eval(ctx)?;
        for element in elements {
            accumulator = combine.call(vec![accumulator, element], ctx)?;
        }
        Ok(accumulator)
    })
}

/// `foldr`: reverses the sequence first; callable `(element, accumulator)`.
pub(crate) fn fold_reverse(id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let combine = args.remove(2);
    let init = args.remove(1);
    let collection = args.remove(0);
    Computable::from_fn(move |ctx| {
        let elements = elements_of(&collection.eval(ctx)?, id)?;
        let mut accumulator = init.eval(ctx)?;
        for element in elements.into_iter().rev() {
            accumulator = combine.call(vec![element, accumulator], ctx)?;
        }
        Ok(accumulator)
    })
}

/// `exists`: short-circuits on the first witness.
pub(crate) fn exists(id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let predicate = args.remove(1);
    let set = args.remove(0);
    Computable::from_fn(move |ctx| {
        for element in set.eval(ctx)?.as_set()?.elements().map_err(tag(id))? {
            if predicate.call(vec![element], ctx)?.as_bool()? {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    })
}

/// `forall`: short-circuits on the first counterexample.
pub(crate) fn forall(id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let predicate = args.remove(1);
    let set = args.remove(0);
    Computable::from_fn(move |ctx| {
        for element in set.eval(ctx)?.as_set()?.elements().map_err(tag(id))? {
            if !predicate.call(vec![element], ctx)?.as_bool()? {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    })
}

pub(crate) fn map_set(id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let mapper = args.remove(1);
    let set = args.remove(0);
    Computable::from_fn(move |ctx| {
        let elements = set.eval(ctx)?.as_set()?.elements().map_err(tag(id))?;
        let mut mapped = Vec::with_capacity(elements.len());
        for element in elements {
            mapped.push(mapper.call(vec![element], ctx)?);
        }
        Ok(Value::set_of(mapped))
    })
}

pub(crate) fn filter_set(id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let predicate = args.remove(1);
    let set = args.remove(0);
    Computable::from_fn(move |ctx| {
        let elements = set.eval(ctx)?.as_set()?.elements().map_err(tag(id))?;
        let mut kept = Vec::with_capacity(elements.len());
        for element in elements {
            if predicate.call(vec![element.clone()], ctx)?.as_bool()? {
                kept.push(element);
            }
        }
        Ok(Value::set_of(kept))
    })
}

/// `select`: the list variant of `filter`, preserving positional order.
pub(crate) fn select_list(_id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let predicate = args.remove(1);
    let list = args.remove(0);
    Computable::from_fn(move |ctx| {
        let value = list.eval(ctx)?;
        let elements = value.as_list()?;
        let mut kept = Vec::with_capacity(elements.len());
        for element in elements {
            if predicate.call(vec![element.clone()], ctx)?.as_bool()? {
                kept.push(element.clone());
            }
        }
        Ok(Value::list(kept))
    })
}

/// `mapBy(s, f)`: the map from each set element to `f(element)`.
pub(crate) fn map_by(id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let mapper = args.remove(1);
    let set = args.remove(0);
    Computable::from_fn(move |ctx| {
        let elements = set.eval(ctx)?.as_set()?.elements().map_err(tag(id))?;
        let mut entries = IndexMap::with_capacity(elements.len());
        for element in elements {
            let value = mapper.call(vec![element.clone()], ctx)?;
            entries.insert(element.normal_form(), value);
        }
        Ok(Value::map(entries))
    })
}
