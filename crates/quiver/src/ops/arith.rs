//! Integer arithmetic and comparison on arbitrary-precision integers.

use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{Pow, Signed, ToPrimitive, Zero};

use super::{binary, tag, unary};
use crate::{
    errors::{RuntimeError, RuntimeErrorKind},
    eval::Computable,
    ir::NodeId,
    value::Value,
};

pub(crate) fn negate(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, |a, _| Ok(Value::Int(-a.as_int()?.clone())))
}

pub(crate) fn binary_op(opcode: &str, id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let op: fn(&BigInt, &BigInt) -> Result<BigInt, RuntimeError> = match opcode {
        "iadd" => |a, b| Ok(a + b),
        "isub" => |a, b| Ok(a - b),
        "imul" => |a, b| Ok(a * b),
        "idiv" => |a, b| {
            if b.is_zero() {
                Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, "cannot divide by zero"))
            } else {
                Ok(a / b)
            }
        },
        "imod" => |a, b| {
            if b.is_zero() {
                Err(RuntimeError::new(RuntimeErrorKind::ModuloByZero, "cannot take a remainder modulo zero"))
            } else {
                Ok(a % b)
            }
        },
        "ipow" => power,
        _ => unreachable!("not an arithmetic opcode: {opcode}"),
    };
    binary(args, move |a, b, _| {
        Ok(Value::Int(op(a.as_int()?, b.as_int()?).map_err(tag(id))?))
    })
}

fn power(base: &BigInt, exponent: &BigInt) -> Result<BigInt, RuntimeError> {
    if exponent.is_negative() {
        return Err(RuntimeError::new(
            RuntimeErrorKind::PowerUndefined,
            "integer power with a negative exponent",
        ));
    }
    if base.is_zero() && exponent.is_zero() {
        return Err(RuntimeError::new(RuntimeErrorKind::PowerUndefined, "0^0 is undefined"));
    }
    let exponent = exponent
        .to_u32()
        .ok_or_else(|| RuntimeError::internal("power exponent is too large"))?;
    Ok(Pow::pow(base, exponent))
}

pub(crate) fn comparison(opcode: &str, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let compare: fn(&BigInt, &BigInt) -> bool = match opcode {
        "igt" => |a, b| a > b,
        "ilt" => |a, b| a < b,
        "igte" => |a, b| a >= b,
        "ilte" => |a, b| a <= b,
        _ => unreachable!("not a comparison opcode: {opcode}"),
    };
    binary(args, move |a, b, _| Ok(Value::Bool(compare(a.as_int()?, b.as_int()?))))
}
