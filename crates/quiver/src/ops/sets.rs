//! Set constructors and set-theoretic operators.

use std::rc::Rc;

use super::{binary, eval_all, tag, unary};
use crate::{
    eval::Computable,
    ir::NodeId,
    value::{SetValue, Value},
};

pub(crate) fn set_ctor(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    Computable::from_fn(move |ctx| Ok(Value::set_of(eval_all(&args, ctx)?)))
}

pub(crate) fn powerset(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, |base, _| {
        Ok(Value::Set(SetValue::Powerset(Rc::new(base.as_set()?.clone()))))
    })
}

/// `tuples(S1, …, Sn)`: the cross product set, kept lazy.
pub(crate) fn cross_product(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    Computable::from_fn(move |ctx| {
        let mut components = Vec::with_capacity(args.len());
        for arg in &args {
            components.push(arg.eval(ctx)?.as_set()?.clone());
        }
        Ok(Value::Set(SetValue::CrossProduct(Rc::new(components))))
    })
}

pub(crate) fn contains(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |set, element, _| {
        Ok(Value::Bool(set.as_set()?.contains(&element).map_err(tag(id))?))
    })
}

/// `in(x, S)`: membership with the operands flipped.
pub(crate) fn element_of(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |element, set, _| {
        Ok(Value::Bool(set.as_set()?.contains(&element).map_err(tag(id))?))
    })
}

pub(crate) fn subseteq(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |a, b, _| {
        Ok(Value::Bool(a.as_set()?.is_subset(b.as_set()?).map_err(tag(id))?))
    })
}

pub(crate) fn union(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |a, b, _| {
        Ok(Value::Set(a.as_set()?.union(b.as_set()?).map_err(tag(id))?))
    })
}

pub(crate) fn intersect(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |a, b, _| {
        Ok(Value::Set(a.as_set()?.intersect(b.as_set()?).map_err(tag(id))?))
    })
}

pub(crate) fn exclude(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |a, b, _| {
        Ok(Value::Set(a.as_set()?.subtract(b.as_set()?).map_err(tag(id))?))
    })
}

pub(crate) fn size(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, move |set, _| {
        Ok(Value::Int(set.as_set()?.cardinality().map_err(tag(id))?))
    })
}

/// Every constructible set in this core is finite; only the `Int`/`Nat`
/// markers are not, and those cannot be built, only named.
pub(crate) fn is_finite(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, |set, _| {
        set.as_set()?;
        Ok(Value::Bool(true))
    })
}

/// `to(a, b)`: the integer interval `[a, b]`, empty when `b < a`.
pub(crate) fn interval(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, |low, high, _| {
        Ok(Value::Set(SetValue::Interval(low.as_int()?.clone(), high.as_int()?.clone())))
    })
}
