//! Tuple and list constructors and accessors.

use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::{binary, eval_all, ternary, unary};
use crate::{
    errors::{RuntimeError, RuntimeErrorKind},
    eval::Computable,
    ir::NodeId,
    value::{SetValue, Value},
};

pub(crate) fn tuple_ctor(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    Computable::from_fn(move |ctx| Ok(Value::tuple(eval_all(&args, ctx)?)))
}

/// `item(t, i)`: 1-based tuple access. The index is statically checked
/// upstream, so a bad index is reported as an out-of-bounds error.
pub(crate) fn item(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |tuple, index, _| {
        let elements = tuple.as_tuple()?;
        let position = index
            .as_int()?
            .to_usize()
            .filter(|i| (1..=elements.len()).contains(i))
            .ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::OutOfBounds,
                    format!("tuple index {index} out of bounds for a {}-tuple", elements.len()),
                )
                .with_ref(id)
            })?;
        Ok(elements[position - 1].clone())
    })
}

pub(crate) fn list_ctor(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    Computable::from_fn(move |ctx| Ok(Value::list(eval_all(&args, ctx)?)))
}

/// `range(a, b)`: the list of integers in `[a, b)`; fails when `a > b`.
pub(crate) fn range(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |low, high, _| {
        let low = low.as_int()?;
        let high = high.as_int()?;
        if low > high {
            return Err(RuntimeError::new(
                RuntimeErrorKind::InvalidRange,
                format!("range({low}, {high}) requires {low} <= {high}"),
            )
            .with_ref(id));
        }
        let mut elements = Vec::new();
        let mut current = low.clone();
        while current < *high {
            elements.push(Value::Int(current.clone()));
            current += 1;
        }
        Ok(Value::list(elements))
    })
}

fn list_index(index: &Value, len: usize, id: NodeId) -> Result<usize, RuntimeError> {
    index.as_int()?.to_usize().filter(|i| *i < len).ok_or_else(|| {
        RuntimeError::new(
            RuntimeErrorKind::OutOfBounds,
            format!("list index {index} out of bounds for a list of {len} elements"),
        )
        .with_ref(id)
    })
}

/// `nth(l, i)`: 0-based list access.
pub(crate) fn nth(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |list, index, _| {
        let elements = list.as_list()?;
        let position = list_index(&index, elements.len(), id)?;
        Ok(elements[position].clone())
    })
}

/// Persistent point update.
pub(crate) fn replace_at(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    ternary(args, move |list, index, value, _| {
        let elements = list.as_list()?;
        let position = list_index(&index, elements.len(), id)?;
        let mut updated = elements.to_vec();
        updated[position] = value;
        Ok(Value::list(updated))
    })
}

pub(crate) fn head(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, move |list, _| {
        list.as_list()?
            .first()
            .cloned()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::EmptyList, "head of an empty list").with_ref(id))
    })
}

pub(crate) fn tail(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, move |list, _| {
        let elements = list.as_list()?;
        if elements.is_empty() {
            return Err(RuntimeError::new(RuntimeErrorKind::EmptyList, "tail of an empty list").with_ref(id));
        }
        Ok(Value::list(elements[1..].to_vec()))
    })
}

/// `slice(l, s, e)` requires `0 <= s <= e <= length(l)`.
pub(crate) fn slice(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    ternary(args, move |list, start, end, _| {
        let elements = list.as_list()?;
        let bad_slice = || {
            RuntimeError::new(
                RuntimeErrorKind::InvalidSlice,
                format!("slice({start}, {end}) out of bounds for a list of {} elements", elements.len()),
            )
            .with_ref(id)
        };
        let start = start.as_int()?.to_usize().ok_or_else(bad_slice)?;
        let end = end.as_int()?.to_usize().ok_or_else(bad_slice)?;
        if start > end || end > elements.len() {
            return Err(bad_slice());
        }
        Ok(Value::list(elements[start..end].to_vec()))
    })
}

pub(crate) fn length(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, |list, _| Ok(Value::int(list.as_list()?.len())))
}

pub(crate) fn append(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, |list, element, _| {
        let mut elements = list.as_list()?.to_vec();
        elements.push(element);
        Ok(Value::list(elements))
    })
}

pub(crate) fn concat(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, |left, right, _| {
        let mut elements = left.as_list()?.to_vec();
        elements.extend_from_slice(right.as_list()?);
        Ok(Value::list(elements))
    })
}

/// `indices(l)`: the set of valid 0-based indices.
pub(crate) fn indices(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, |list, _| {
        let len = list.as_list()?.len();
        Ok(Value::Set(SetValue::Interval(BigInt::from(0), BigInt::from(len) - 1)))
    })
}
