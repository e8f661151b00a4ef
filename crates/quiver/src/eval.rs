//! The lazy computable graph.
//!
//! Compilation lowers every expression to a [`Computable`]: a thunk that
//! produces an optional value on demand. The graph is closed — computables
//! own their operand computables through `Rc` — so a user-defined operator
//! can be invoked many times during a simulation without re-traversing the
//! IR. No evaluation happens while the graph is being built.

use std::{fmt, rc::Rc};

use crate::{
    errors::{EvalResult, RuntimeError},
    limits::DepthGuard,
    register::RegisterRef,
    rng::Rng,
    tracer::{NoopTracer, SimTracer},
    value::Value,
};

/// Closure type for functional computables.
pub type EvalFn = Rc<dyn Fn(&mut EvalCtx) -> EvalResult<Value>>;

/// A lazy thunk producing an optional value.
pub enum Computable {
    /// A fixed value.
    Const(Value),
    /// The current content of a register; fails while the slot is unset.
    Register(RegisterRef),
    /// Computes on demand from captured operand computables.
    Fun(EvalFn),
    /// A computable paired with its parameter registers.
    Callable(Rc<Callable>),
    /// Resolves to another computable at evaluation time.
    ///
    /// Compilation is a single pass, so a reference to a definition that
    /// appears later in the module cannot be linked directly; it resolves
    /// against the finished context instead.
    Lazy(Rc<dyn Fn() -> EvalResult<Rc<Computable>>>),
}

impl fmt::Debug for Computable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(value) => f.debug_tuple("Const").field(value).finish(),
            Self::Register(register) => f.debug_tuple("Register").field(&register.name).finish(),
            Self::Fun(_) => f.write_str("Fun(..)"),
            Self::Callable(callable) => f.debug_tuple("Callable").field(&callable.name).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl Computable {
    pub fn constant(value: Value) -> Rc<Self> {
        Rc::new(Self::Const(value))
    }

    pub fn from_fn(eval: impl Fn(&mut EvalCtx) -> EvalResult<Value> + 'static) -> Rc<Self> {
        Rc::new(Self::Fun(Rc::new(eval)))
    }

    /// Evaluates the thunk.
    ///
    /// Parameterized callables cannot be evaluated directly; they must be
    /// invoked through [`Computable::call`].
    pub fn eval(&self, ctx: &mut EvalCtx) -> EvalResult<Value> {
        match self {
            Self::Const(value) => Ok(value.clone()),
            Self::Register(register) => register.read(),
            Self::Fun(eval) => eval(ctx),
            Self::Callable(callable) => callable.invoke(Vec::new(), ctx),
            Self::Lazy(resolve) => resolve()?.eval(ctx),
        }
    }

    /// Invokes the thunk as an operator with the given arguments.
    pub fn call(&self, args: Vec<Value>, ctx: &mut EvalCtx) -> EvalResult<Value> {
        match self {
            Self::Callable(callable) => callable.invoke(args, ctx),
            Self::Lazy(resolve) => resolve()?.call(args, ctx),
            _ if args.is_empty() => self.eval(ctx),
            _ => Err(RuntimeError::internal("applied arguments to a non-operator")),
        }
    }
}

/// A compiled operator: body computable plus parameter registers.
///
/// Invocation stores the arguments into the registers and evaluates the
/// body. The registers' previous contents are restored afterwards so that
/// re-entrant invocations (recursion through the context) see their own
/// arguments.
pub struct Callable {
    pub name: Rc<str>,
    pub params: Vec<RegisterRef>,
    pub body: Rc<Computable>,
}

impl Callable {
    pub fn new(name: impl AsRef<str>, params: Vec<RegisterRef>, body: Rc<Computable>) -> Rc<Computable> {
        Rc::new(Computable::Callable(Rc::new(Self {
            name: Rc::from(name.as_ref()),
            params,
            body,
        })))
    }

    pub fn invoke(&self, args: Vec<Value>, ctx: &mut EvalCtx) -> EvalResult<Value> {
        if args.len() != self.params.len() {
            return Err(RuntimeError::internal(format!(
                "operator {} expects {} arguments, got {}",
                self.name,
                self.params.len(),
                args.len()
            )));
        }
        ctx.depth.enter()?;
        let saved: Vec<Option<Value>> = self.params.iter().map(|param| param.peek()).collect();
        for (param, arg) in self.params.iter().zip(args) {
            param.write(arg);
        }
        let result = self.body.eval(ctx);
        for (param, old) in self.params.iter().zip(saved) {
            param.restore(old);
        }
        ctx.depth.exit();
        result
    }
}

/// Mutable state threaded through every evaluation: the seeded generator,
/// the recursion guard, the runtime error log, and the simulator tracer.
pub struct EvalCtx {
    pub rng: Rng,
    pub depth: DepthGuard,
    errors: Vec<RuntimeError>,
    pub tracer: Box<dyn SimTracer>,
}

impl EvalCtx {
    #[must_use]
    pub fn new(rng: Rng) -> Self {
        Self {
            rng,
            depth: DepthGuard::default(),
            errors: Vec::new(),
            tracer: Box::new(NoopTracer),
        }
    }

    /// Appends a runtime error to the log without failing evaluation; used
    /// by combinators that coerce a failed operand to `false`.
    pub fn record(&mut self, error: RuntimeError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn errors(&self) -> &[RuntimeError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<RuntimeError> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::{Register, RegisterKind};

    fn ctx() -> EvalCtx {
        EvalCtx::new(Rng::new(0))
    }

    #[test]
    fn constant_and_register_eval() {
        let mut ctx = ctx();
        assert_eq!(Computable::constant(Value::int(3)).eval(&mut ctx).unwrap(), Value::int(3));

        let register = Register::new("x", RegisterKind::Arg, 1);
        let computable = Rc::new(Computable::Register(Rc::clone(&register)));
        assert!(computable.eval(&mut ctx).is_err());
        register.write(Value::Bool(true));
        assert_eq!(computable.eval(&mut ctx).unwrap(), Value::Bool(true));
    }

    #[test]
    fn callable_restores_parameter_registers() {
        let mut ctx = ctx();
        let param = Register::new("a", RegisterKind::Arg, 1);
        let body = Rc::new(Computable::Register(Rc::clone(&param)));
        let callable = Callable::new("id", vec![Rc::clone(&param)], body);

        param.write(Value::int(10));
        assert_eq!(callable.call(vec![Value::int(5)], &mut ctx).unwrap(), Value::int(5));
        // The outer binding survives the invocation.
        assert_eq!(param.read().unwrap(), Value::int(10));
    }

    #[test]
    fn arity_is_checked_at_invocation() {
        let mut ctx = ctx();
        let callable = Callable::new("nullary", Vec::new(), Computable::constant(Value::Bool(true)));
        assert!(callable.call(vec![Value::int(1)], &mut ctx).is_err());
    }
}
