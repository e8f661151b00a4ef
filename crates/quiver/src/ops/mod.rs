//! Built-in opcode constructors.
//!
//! Each opcode compiles to a specific computable construction; the
//! submodules are grouped by operand family. Constructors receive their
//! operands as already-compiled computables and close over them — no
//! evaluation happens here.

pub(crate) mod actions;
pub(crate) mod arith;
pub(crate) mod folds;
pub(crate) mod lists;
pub(crate) mod logic;
pub(crate) mod maps;
pub(crate) mod records;
pub(crate) mod sets;
pub(crate) mod testing;

use std::rc::Rc;

use crate::{
    compiler::CompileShared,
    errors::{CompileError, CompileErrorKind, EvalResult, RuntimeError},
    eval::{Computable, EvalCtx},
    ir::{NodeId, QuintEx},
    value::Value,
};

/// How many operands an opcode accepts.
enum Arity {
    Exact(usize),
    AtLeast(usize),
}

/// Arity table; doubles as the registry of recognized opcodes.
fn builtin_arity(opcode: &str) -> Option<Arity> {
    use Arity::{AtLeast, Exact};
    Some(match opcode {
        "next" | "not" | "iuminus" | "head" | "tail" | "length" | "indices" | "fieldNames" | "powerset" | "size"
        | "isFinite" | "setToMap" | "keys" | "oneOf" | "assert" | "fail" => Exact(1),
        "assign" | "eq" | "neq" | "iff" | "implies" | "iadd" | "isub" | "imul" | "idiv" | "imod" | "ipow" | "igt"
        | "ilt" | "igte" | "ilte" | "item" | "range" | "nth" | "append" | "concat" | "field" | "contains" | "in"
        | "subseteq" | "union" | "intersect" | "exclude" | "to" | "setOfMaps" | "get" | "exists" | "forall" | "map"
        | "filter" | "select" | "mapBy" | "repeated" => Exact(2),
        "ite" | "replaceAt" | "slice" | "with" | "set" | "setBy" | "put" | "fold" | "foldl" | "foldr" => Exact(3),
        "_test" => Exact(5),
        "and" | "or" | "Tup" | "List" | "Rec" | "Set" | "Map" => AtLeast(0),
        "actionAll" | "actionAny" | "tuples" => AtLeast(1),
        "then" => AtLeast(2),
        _ => return None,
    })
}

/// Whether an application opcode is provided by the evaluator.
pub(crate) fn is_builtin_opcode(opcode: &str) -> bool {
    builtin_arity(opcode).is_some()
}

/// Names pre-populated in every compiled context.
pub(crate) fn is_builtin_value(name: &str) -> bool {
    matches!(name, "Bool" | "Int" | "Nat" | "_lastTrace")
}

/// Builds the computable for a built-in opcode application.
pub(crate) fn compile_builtin(
    shared: &CompileShared,
    id: NodeId,
    opcode: &str,
    args: Vec<Rc<Computable>>,
    arg_irs: &[QuintEx],
) -> Result<Rc<Computable>, CompileError> {
    check_arity(opcode, args.len(), id)?;
    let computable = match opcode {
        // State access
        "next" => actions::next(shared, id, arg_irs)?,
        "assign" => actions::assign(shared, id, args, arg_irs)?,

        // Booleans and control flow
        "eq" => logic::eq(args),
        "neq" => logic::neq(args),
        "ite" => logic::ite(args),
        "not" => logic::not(args),
        "iff" => logic::iff(args),
        "implies" => logic::implies(args),
        "and" => logic::and(args),
        "or" => logic::or(args),

        // Action combinators
        "actionAll" => actions::action_all(shared, id, args),
        "actionAny" => actions::action_any(shared, id, args),
        "then" => actions::then(shared, id, args),
        "repeated" => actions::repeated(shared, id, args),

        // Integer arithmetic
        "iuminus" => arith::negate(args),
        "iadd" | "isub" | "imul" | "idiv" | "imod" | "ipow" => arith::binary_op(opcode, id, args),
        "igt" | "ilt" | "igte" | "ilte" => arith::comparison(opcode, args),

        // Tuples
        "Tup" => lists::tuple_ctor(args),
        "item" => lists::item(id, args),
        "tuples" => sets::cross_product(args),

        // Lists
        "List" => lists::list_ctor(args),
        "range" => lists::range(id, args),
        "nth" => lists::nth(id, args),
        "replaceAt" => lists::replace_at(id, args),
        "head" => lists::head(id, args),
        "tail" => lists::tail(id, args),
        "slice" => lists::slice(id, args),
        "length" => lists::length(args),
        "append" => lists::append(args),
        "concat" => lists::concat(args),
        "indices" => lists::indices(args),

        // Records
        "Rec" => records::rec_ctor(id, args)?,
        "field" => records::field(id, args),
        "with" => records::with_field(id, args),
        "fieldNames" => records::field_names(args),

        // Sets
        "Set" => sets::set_ctor(args),
        "powerset" => sets::powerset(args),
        "contains" => sets::contains(id, args),
        "in" => sets::element_of(id, args),
        "subseteq" => sets::subseteq(id, args),
        "union" => sets::union(id, args),
        "intersect" => sets::intersect(id, args),
        "exclude" => sets::exclude(id, args),
        "size" => sets::size(id, args),
        "isFinite" => sets::is_finite(args),
        "to" => sets::interval(args),

        // Maps
        "Map" => maps::map_ctor(args),
        "setToMap" => maps::set_to_map(id, args),
        "setOfMaps" => maps::set_of_maps(args),
        "get" => maps::get(id, args),
        "set" => maps::set_key(id, args),
        "setBy" => maps::set_by(id, args),
        "put" => maps::put(args),
        "keys" => maps::keys(args),

        // Higher-order operators
        "fold" | "foldl" => folds::fold_forward(id, args),
        "foldr" => folds::fold_reverse(id, args),
        "exists" => folds::exists(id, args),
        "forall" => folds::forall(id, args),
        "map" => folds::map_set(id, args),
        "filter" => folds::filter_set(id, args),
        "select" => folds::select_list(id, args),
        "mapBy" => folds::map_by(id, args),

        // Simulation and testing
        "oneOf" => testing::one_of(id, args),
        "assert" => testing::assert_op(id, args),
        "fail" => testing::fail_op(id, args),
        "_test" => testing::test_op(shared, id, args),

        _ => {
            return Err(
                CompileError::new(CompileErrorKind::UnknownOpcode, format!("unknown operator {opcode}")).with_ref(id),
            );
        }
    };
    Ok(computable)
}

fn check_arity(opcode: &str, actual: usize, id: NodeId) -> Result<(), CompileError> {
    let arity = builtin_arity(opcode)
        .ok_or_else(|| CompileError::new(CompileErrorKind::UnknownOpcode, format!("unknown operator {opcode}")))?;
    let ok = match arity {
        Arity::Exact(expected) => actual == expected,
        Arity::AtLeast(minimum) => actual >= minimum,
    };
    if ok {
        Ok(())
    } else {
        let expected = match arity {
            Arity::Exact(expected) => expected.to_string(),
            Arity::AtLeast(minimum) => format!("at least {minimum}"),
        };
        Err(CompileError::new(
            CompileErrorKind::ArityMismatch,
            format!("operator {opcode} expects {expected} arguments, got {actual}"),
        )
        .with_ref(id))
    }
}

/// Tags a runtime error with the application site.
pub(crate) fn tag(id: NodeId) -> impl Fn(RuntimeError) -> RuntimeError + Copy {
    move |error| error.with_ref(id)
}

// Small constructors closing over a fixed number of strict operands.

pub(crate) fn unary(
    mut args: Vec<Rc<Computable>>,
    eval: impl Fn(Value, &mut EvalCtx) -> EvalResult<Value> + 'static,
) -> Rc<Computable> {
    let a = args.remove(0);
    Computable::from_fn(move |ctx| {
        let value = a.eval(ctx)?;
        eval(value, ctx)
    })
}

pub(crate) fn binary(
    mut args: Vec<Rc<Computable>>,
    eval: impl Fn(Value, Value, &mut EvalCtx) -> EvalResult<Value> + 'static,
) -> Rc<Computable> {
    let b = args.remove(1);
    let a = args.remove(0);
    Computable::from_fn(move |ctx| {
        let left = a.eval(ctx)?;
        let right = b.eval(ctx)?;
        eval(left, right, ctx)
    })
}

pub(crate) fn ternary(
    mut args: Vec<Rc<Computable>>,
    eval: impl Fn(Value, Value, Value, &mut EvalCtx) -> EvalResult<Value> + 'static,
) -> Rc<Computable> {
    let c = args.remove(2);
    let b = args.remove(1);
    let a = args.remove(0);
    Computable::from_fn(move |ctx| {
        let first = a.eval(ctx)?;
        let second = b.eval(ctx)?;
        let third = c.eval(ctx)?;
        eval(first, second, third, ctx)
    })
}

/// Strictly evaluates every operand.
pub(crate) fn eval_all(args: &[Rc<Computable>], ctx: &mut EvalCtx) -> EvalResult<Vec<Value>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(arg.eval(ctx)?);
    }
    Ok(values)
}
