//! Record construction, access, and functional update.

use std::rc::Rc;

use indexmap::IndexMap;

use super::{binary, ternary, unary};
use crate::{
    errors::{CompileError, CompileErrorKind, RuntimeError, RuntimeErrorKind},
    eval::Computable,
    ir::NodeId,
    value::Value,
};

/// `Rec(k1, v1, …, kn, vn)`: keys are evaluated and then used literally.
pub(crate) fn rec_ctor(id: NodeId, args: Vec<Rc<Computable>>) -> Result<Rc<Computable>, CompileError> {
    if args.len() % 2 != 0 {
        return Err(CompileError::new(
            CompileErrorKind::ArityMismatch,
            format!("record constructor expects field/value pairs, got {} arguments", args.len()),
        )
        .with_ref(id));
    }
    Ok(Computable::from_fn(move |ctx| {
        let mut fields: IndexMap<Rc<str>, Value> = IndexMap::with_capacity(args.len() / 2);
        for pair in args.chunks(2) {
            let name = pair[0].eval(ctx)?;
            let value = pair[1].eval(ctx)?;
            fields.insert(Rc::from(name.as_str()?), value);
        }
        Ok(Value::Record(Rc::new(fields)))
    }))
}

fn missing_field(record: &Value, name: &str, id: NodeId) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::MissingField,
        format!("record {record} has no field {name}"),
    )
    .with_ref(id)
}

pub(crate) fn field(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    binary(args, move |record, name, _| {
        let name = name.as_str()?;
        record
            .as_record()?
            .get(name)
            .cloned()
            .ok_or_else(|| missing_field(&record, name, id))
    })
}

/// `with(r, n, v)`: functional update of an existing field.
pub(crate) fn with_field(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    ternary(args, move |record, name, value, _| {
        let name = name.as_str()?;
        let fields = record.as_record()?;
        if !fields.contains_key(name) {
            return Err(missing_field(&record, name, id));
        }
        let mut updated = fields.clone();
        updated.insert(Rc::from(name), value);
        Ok(Value::Record(Rc::new(updated)))
    })
}

pub(crate) fn field_names(args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, |record, _| {
        let names = record
            .as_record()?
            .keys()
            .map(|name| Value::Str(Rc::clone(name)))
            .collect();
        Ok(Value::set_of(names))
    })
}
