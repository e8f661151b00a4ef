//! Simulation-facing operators: random choice, assertions, and `_test`.

use std::rc::Rc;

use num_traits::Zero;

use super::{tag, unary};
use crate::{
    compiler::CompileShared,
    errors::{RuntimeError, RuntimeErrorKind},
    eval::{Computable, EvalCtx},
    ir::NodeId,
    simulator,
    value::Value,
};

/// `oneOf(S)`: a uniformly random element of `S`; fails on an empty set.
pub(crate) fn one_of(id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let set = args.remove(0);
    Computable::from_fn(move |ctx| {
        let value = set.eval(ctx)?;
        let set = value.as_set()?;
        let card = set.cardinality().map_err(tag(id))?;
        if card.is_zero() {
            return Err(
                RuntimeError::new(RuntimeErrorKind::EmptySet, "cannot pick from an empty set").with_ref(id),
            );
        }
        let index = ctx.rng.next_index(&card);
        set.pick_by_index(&index).map_err(tag(id))
    })
}

/// `assert(c)`: returns `c` when it holds, fails otherwise.
pub(crate) fn assert_op(id: NodeId, args: Vec<Rc<Computable>>) -> Rc<Computable> {
    unary(args, move |condition, _| {
        if condition.as_bool()? {
            Ok(Value::Bool(true))
        } else {
            Err(RuntimeError::new(RuntimeErrorKind::AssertionFailed, "assertion failed").with_ref(id))
        }
    })
}

/// `fail(A)`: inverts the truth value of `A`; a failing action counts as
/// `false` and makes `fail` succeed. Used by negative tests.
pub(crate) fn fail_op(id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let action = args.remove(0);
    Computable::from_fn(move |ctx| match action.eval(ctx) {
        Ok(value) => Ok(Value::Bool(!value.as_bool()?)),
        Err(error) => {
            ctx.record(error.with_ref(id));
            Ok(Value::Bool(true))
        }
    })
}

/// `_test(nruns, nsteps, init, step, inv)`: drive the randomized simulator.
///
/// The last three operands evaluate to the names of callables in the
/// compiled context, looked up when the test runs so that definition order
/// in the module does not matter.
pub(crate) fn test_op(shared: &CompileShared, id: NodeId, mut args: Vec<Rc<Computable>>) -> Rc<Computable> {
    let inv_arg = args.remove(4);
    let step_arg = args.remove(3);
    let init_arg = args.remove(2);
    let nsteps_arg = args.remove(1);
    let nruns_arg = args.remove(0);
    let shared = shared.clone();
    Computable::from_fn(move |ctx| {
        let nruns = eval_count(&nruns_arg, ctx, id)?;
        let nsteps = eval_count(&nsteps_arg, ctx, id)?;
        let init = init_arg.eval(ctx)?.as_str()?.to_owned();
        let step = step_arg.eval(ctx)?.as_str()?.to_owned();
        let inv = inv_arg.eval(ctx)?.as_str()?.to_owned();
        let report = simulator::run_simulation(ctx, &shared, nruns, nsteps, &init, &step, &inv)?;
        Ok(Value::Bool(report.ok))
    })
}

fn eval_count(arg: &Rc<Computable>, ctx: &mut EvalCtx, id: NodeId) -> Result<u64, RuntimeError> {
    use num_traits::ToPrimitive;
    arg.eval(ctx)?
        .as_int()?
        .to_u64()
        .ok_or_else(|| RuntimeError::internal("test bound out of range").with_ref(id))
}
