//! Action combinators: next-state access, assignment, `all`/`any`
//! composition, and sequential runs.
//!
//! Actions speculate by writing next-state registers; the combinators
//! snapshot and restore those registers so a failed branch leaves no trace.

use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{
    compiler::{CompileShared, ContextKind, lookup_context},
    errors::{CompileError, CompileErrorKind, EvalResult, RuntimeError},
    eval::{Computable, EvalCtx},
    ir::{NodeId, QuintEx},
    register::RegisterRef,
    value::Value,
};

/// Extracts the variable name from the first operand of `next`/`assign`.
fn var_name(arg_irs: &[QuintEx], id: NodeId, opcode: &str) -> Result<String, CompileError> {
    match arg_irs.first() {
        Some(QuintEx::Name { name, .. }) => Ok(name.clone()),
        _ => Err(CompileError::new(
            CompileErrorKind::UnboundName,
            format!("{opcode} expects a variable name as its first argument"),
        )
        .with_ref(id)),
    }
}

/// Resolves the next-state register of `name` against the finished context.
fn resolve_next_register(
    shared: &CompileShared,
    name: &str,
    ctx_err: &str,
) -> Result<RegisterRef, RuntimeError> {
    let computable = lookup_context(&shared.context.borrow(), &[ContextKind::NextVar], name)
        .ok_or_else(|| RuntimeError::internal(format!("{ctx_err}: {name} is not a variable")))?;
    match computable.as_ref() {
        Computable::Register(register) => Ok(Rc::clone(register)),
        _ => Err(RuntimeError::internal(format!("{ctx_err}: {name} is not a register"))),
    }
}

/// `next(x)`: read the next-state register of `x`.
pub(crate) fn next(shared: &CompileShared, id: NodeId, arg_irs: &[QuintEx]) -> Result<Rc<Computable>, CompileError> {
    let name = var_name(arg_irs, id, "next")?;
    if let Some(register) = shared.next_var_register(&name) {
        return Ok(Rc::new(Computable::Register(register)));
    }
    // The variable may be declared later in the module.
    let shared = shared.clone();
    Ok(Computable::from_fn(move |_| {
        resolve_next_register(&shared, &name, "cannot read next state")?.read()
    }))
}

/// `assign(x, e)`: evaluate `e`, store it into `x`'s next-state register,
/// return `true`.
pub(crate) fn assign(
    shared: &CompileShared,
    id: NodeId,
    mut args: Vec<Rc<Computable>>,
    arg_irs: &[QuintEx],
) -> Result<Rc<Computable>, CompileError> {
    let name = var_name(arg_irs, id, "assign")?;
    let value = args.remove(1);
    // args[0] compiled the variable name as a current-state read; the
    // assignment targets the next-state register instead.
    let known_register = shared.next_var_register(&name);
    let shared = shared.clone();
    Ok(Computable::from_fn(move |ctx| {
        let assigned = value.eval(ctx)?;
        let register = match &known_register {
            Some(register) => Rc::clone(register),
            None => resolve_next_register(&shared, &name, "cannot assign")?,
        };
        register.write(assigned);
        Ok(Value::Bool(true))
    }))
}

fn enabled(result: EvalResult<Value>, ctx: &mut EvalCtx, id: NodeId) -> EvalResult<bool> {
    match result {
        Ok(value) => value.as_bool(),
        Err(error) => {
            ctx.record(error.with_ref(id));
            Ok(false)
        }
    }
}

/// `actionAll { A … }`: all actions must succeed; any failure restores the
/// next-state registers taken before the first action.
pub(crate) fn action_all(shared: &CompileShared, id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let state = Rc::clone(&shared.state);
    Computable::from_fn(move |ctx| {
        let saved = state.snapshot_next();
        for action in &args {
            if !enabled(action.eval(ctx), ctx, id)? {
                state.recover_next(&saved);
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    })
}

/// `actionAny { A … }`: evaluate every action from the same pre-state,
/// collect the next-state snapshots of the successes, and commit one chosen
/// uniformly at random.
pub(crate) fn action_any(shared: &CompileShared, id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let state = Rc::clone(&shared.state);
    Computable::from_fn(move |ctx| {
        let saved = state.snapshot_next();
        let mut successes = Vec::new();
        for action in &args {
            state.recover_next(&saved);
            if enabled(action.eval(ctx), ctx, id)? {
                successes.push(state.snapshot_next());
            }
        }
        if successes.is_empty() {
            state.recover_next(&saved);
            return Ok(Value::Bool(false));
        }
        let choice = ctx
            .rng
            .next_index(&BigInt::from(successes.len()))
            .to_usize()
            .expect("choice index fits usize");
        state.recover_next(&successes[choice]);
        Ok(Value::Bool(true))
    })
}

/// `then(A, B, …)`: like `actionAll`, but the state is shifted between
/// consecutive actions so each sees its predecessor's effects as the
/// current state.
pub(crate) fn then(shared: &CompileShared, id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let state = Rc::clone(&shared.state);
    Computable::from_fn(move |ctx| {
        let saved = state.snapshot_all();
        for (position, action) in args.iter().enumerate() {
            if position > 0 {
                state.shift();
            }
            if !enabled(action.eval(ctx), ctx, id)? {
                state.recover_all(&saved);
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    })
}

/// `repeated(A, n)`: `then(A, …, A)` with `n` copies.
pub(crate) fn repeated(shared: &CompileShared, id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let state = Rc::clone(&shared.state);
    let count = args.remove(1);
    let action = args.remove(0);
    Computable::from_fn(move |ctx| {
        let times = count
            .eval(ctx)?
            .as_int()?
            .to_u64()
            .ok_or_else(|| RuntimeError::internal("repetition count out of range").with_ref(id))?;
        let saved = state.snapshot_all();
        for iteration in 0..times {
            if iteration > 0 {
                state.shift();
            }
            if !enabled(action.eval(ctx), ctx, id)? {
                state.recover_all(&saved);
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    })
}
