//! Boolean operators, equality, and conditionals.

use std::rc::Rc;

use super::{binary, unary};
use crate::{
    eval::Computable,
    value::Value,
};

pub(crate) fn eq(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, |a, b, _| Ok(Value::Bool(a == b)))
}

pub(crate) fn neq(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, |a, b, _| Ok(Value::Bool(a != b)))
}

pub(crate) fn not(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, |a, _| Ok(Value::Bool(!a.as_bool()?)))
}

pub(crate) fn iff(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, |a, b, _| Ok(Value::Bool(a.as_bool()? == b.as_bool()?)))
}

/// `implies` evaluates its conclusion only when the premise holds.
pub(crate) fn implies(mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let conclusion = args.remove(1);
    let premise = args.remove(0);
    Computable::from_fn(move |ctx| {
        if premise.eval(ctx)?.as_bool()? {
            Ok(Value::Bool(conclusion.eval(ctx)?.as_bool()?))
        } else {
            Ok(Value::Bool(true))
        }
    })
}

/// `ite(c, t, e)`: the untaken branch is never evaluated.
pub(crate) fn ite(mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let otherwise = args.remove(2);
    let then = args.remove(1);
    let condition = args.remove(0);
    Computable::from_fn(move |ctx| {
        if condition.eval(ctx)?.as_bool()? {
            then.eval(ctx)
        } else {
            otherwise.eval(ctx)
        }
    })
}

/// Short-circuit conjunction over a brace-list.
///
/// Stops at the first `false`. A failing operand is coerced to `false`
/// after its error is logged, so the conjunction itself never fails.
pub(crate) fn and(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    Computable::from_fn(move |ctx| {
        for arg in &args {
            match arg.eval(ctx) {
                Ok(value) => {
                    if !value.as_bool()? {
                        return Ok(Value::Bool(false));
                    }
                }
                Err(error) => {
                    ctx.record(error);
                    return Ok(Value::Bool(false));
                }
            }
        }
        Ok(Value::Bool(true))
    })
}

/// Short-circuit disjunction over a brace-list.
///
/// Stops at the first `true`; a failing operand counts as `false` and
/// evaluation continues with the remaining operands.
pub(crate) fn or(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    Computable::from_fn(move |ctx| {
        for arg in &args {
            match arg.eval(ctx) {
                Ok(value) => {
                    if value.as_bool()? {
                        return Ok(Value::Bool(true));
                    }
                }
                Err(error) => ctx.record(error),
            }
        }
        Ok(Value::Bool(false))
    })
}
