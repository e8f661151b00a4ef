//! Lowers IR into the computable graph.
//!
//! The compiler is a visitor with a compilation stack: leaves push
//! computables, inner nodes pop their operands and push a combined
//! computable. Nothing is evaluated during the walk. The result is a
//! context mapping `(kind, name)` pairs to computables, plus the register
//! banks the simulator drives.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use ahash::AHashMap;

use crate::{
    errors::{CompileError, CompileErrorKind, EvalResult, RuntimeError},
    eval::{Callable, Computable, EvalCtx},
    ir::{LambdaParam, NodeId, OpDef, OpQualifier, QuintDef, QuintEx, QuintModule},
    ops,
    register::{self, Register, RegisterKind, RegisterRef},
    rng::Rng,
    value::{InfiniteKind, SetValue, Value},
    visitor::{IrVisitor, walk_module},
};

/// Namespace of a context entry. Name lookup tries kinds in the priority
/// order of [`NAME_LOOKUP`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ContextKind {
    Shadow,
    Val,
    Var,
    NextVar,
    Arg,
    Callable,
}

pub(crate) type ContextKey = (ContextKind, Rc<str>);

/// The compiled namespace: `(kind, name)` to computable.
pub(crate) type Context = AHashMap<ContextKey, Rc<Computable>>;

/// Priority order for name expressions.
pub(crate) const NAME_LOOKUP: &[ContextKind] = &[
    ContextKind::Shadow,
    ContextKind::Val,
    ContextKind::Var,
    ContextKind::Arg,
    ContextKind::Callable,
];

/// Priority order for operator applications.
pub(crate) const OPERATOR_LOOKUP: &[ContextKind] = &[ContextKind::Callable, ContextKind::Arg, ContextKind::Val];

pub(crate) fn lookup_context(context: &Context, kinds: &[ContextKind], name: &str) -> Option<Rc<Computable>> {
    let key: Rc<str> = Rc::from(name);
    kinds
        .iter()
        .find_map(|kind| context.get(&(*kind, Rc::clone(&key))).cloned())
}

/// A deferred name: resolves against the finished context at evaluation
/// time, covering references to definitions that appear later in the module.
pub(crate) fn lazy_lookup(
    context: &Rc<RefCell<Context>>,
    kinds: &'static [ContextKind],
    name: &str,
) -> Rc<Computable> {
    let context = Rc::clone(context);
    let name: Rc<str> = Rc::from(name);
    Rc::new(Computable::Lazy(Rc::new(move || {
        lookup_context(&context.borrow(), kinds, &name)
            .ok_or_else(|| RuntimeError::internal(format!("name {name} is not defined")))
    })))
}

/// Saved register columns of the machine state.
#[derive(Debug, Clone)]
pub(crate) struct StateSnapshot {
    vars: Vec<Option<Value>>,
    next_vars: Vec<Option<Value>>,
}

/// The mutable machine state shared between action computables and the
/// simulator: current-state registers, next-state registers, and the trace
/// shadow register.
///
/// Action computables capture this through `Rc` at compile time, before all
/// variables are necessarily declared, so the banks live behind `RefCell`s.
#[derive(Debug)]
pub(crate) struct StateRegs {
    pub vars: RefCell<Vec<RegisterRef>>,
    pub next_vars: RefCell<Vec<RegisterRef>>,
    /// Shadow register holding the trace of the current run as a list of
    /// state records.
    pub trace: RegisterRef,
}

impl StateRegs {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(Vec::new()),
            next_vars: RefCell::new(Vec::new()),
            trace: Register::new("_lastTrace", RegisterKind::Shadow, 0),
        })
    }

    /// Copies next-state into current-state, clears next-state, and appends
    /// the resulting state record to the trace.
    ///
    /// The next-state column moves wholesale: a variable not assigned during
    /// the step becomes unset and reads of it fail with the unset-variable
    /// diagnostic.
    pub fn shift(&self) {
        {
            let vars = self.vars.borrow();
            let next_vars = self.next_vars.borrow();
            for (var, next) in vars.iter().zip(next_vars.iter()) {
                var.restore(next.peek());
                next.clear();
            }
        }
        self.record_state();
    }

    /// Appends a record of the currently-set variables to the trace.
    fn record_state(&self) {
        let record = Value::record(
            self.vars
                .borrow()
                .iter()
                .filter_map(|var| var.peek().map(|value| (Rc::clone(&var.name), value))),
        );
        let mut entries = match self.trace.peek() {
            Some(Value::List(list)) => (*list).clone(),
            _ => Vec::new(),
        };
        entries.push(record);
        self.trace.write(Value::list(entries));
    }

    pub fn reset_trace(&self) {
        self.trace.write(Value::list(Vec::new()));
    }

    pub fn snapshot_next(&self) -> Vec<Option<Value>> {
        register::snapshot(&self.next_vars.borrow())
    }

    pub fn recover_next(&self, saved: &[Option<Value>]) {
        register::recover(&self.next_vars.borrow(), saved);
    }

    pub fn snapshot_all(&self) -> StateSnapshot {
        StateSnapshot {
            vars: register::snapshot(&self.vars.borrow()),
            next_vars: register::snapshot(&self.next_vars.borrow()),
        }
    }

    pub fn recover_all(&self, saved: &StateSnapshot) {
        register::recover(&self.vars.borrow(), &saved.vars);
        register::recover(&self.next_vars.borrow(), &saved.next_vars);
    }
}

/// Everything the opcode constructors close over.
#[derive(Clone)]
pub(crate) struct CompileShared {
    pub context: Rc<RefCell<Context>>,
    pub state: Rc<StateRegs>,
}

impl CompileShared {
    fn new() -> Self {
        let state = StateRegs::new();
        let mut context = Context::default();
        // The built-in environment.
        context.insert(
            (ContextKind::Val, Rc::from("Bool")),
            Computable::constant(Value::set_of(vec![Value::Bool(false), Value::Bool(true)])),
        );
        context.insert(
            (ContextKind::Val, Rc::from("Int")),
            Computable::constant(Value::Set(SetValue::Infinite(InfiniteKind::Int))),
        );
        context.insert(
            (ContextKind::Val, Rc::from("Nat")),
            Computable::constant(Value::Set(SetValue::Infinite(InfiniteKind::Nat))),
        );
        context.insert(
            (ContextKind::Shadow, Rc::from("_lastTrace")),
            Rc::new(Computable::Register(Rc::clone(&state.trace))),
        );
        Self {
            context: Rc::new(RefCell::new(context)),
            state,
        }
    }

    /// Finds the next-state register of a variable, if already declared.
    pub fn next_var_register(&self, name: &str) -> Option<RegisterRef> {
        let key: ContextKey = (ContextKind::NextVar, Rc::from(name));
        match self.context.borrow().get(&key).map(Rc::as_ref) {
            Some(Computable::Register(register)) => Some(Rc::clone(register)),
            _ => None,
        }
    }
}

/// Result of lowering a module.
pub struct CompiledModule {
    pub(crate) shared: CompileShared,
    pub compile_errors: Vec<CompileError>,
    /// Runtime errors raised while checking assumptions at compile
    /// completion.
    pub runtime_errors: Vec<RuntimeError>,
}

impl CompiledModule {
    /// Looks up a named operator the way applications do.
    pub(crate) fn lookup_operator(&self, name: &str) -> Option<Rc<Computable>> {
        lookup_context(&self.shared.context.borrow(), OPERATOR_LOOKUP, name)
    }

    /// Evaluates a named value or nullary operator under a fresh context
    /// with the given seed.
    pub fn eval_operator(&self, name: &str, seed: u64) -> EvalResult<Value> {
        let computable = self
            .lookup_operator(name)
            .ok_or_else(|| RuntimeError::internal(format!("no operator named {name}")))?;
        let mut ctx = EvalCtx::new(Rng::new(seed));
        computable.eval(&mut ctx)
    }

    /// Declared state variables, in declaration order.
    #[must_use]
    pub fn var_names(&self) -> Vec<String> {
        self.shared
            .state
            .vars
            .borrow()
            .iter()
            .map(|var| var.name.to_string())
            .collect()
    }

    /// Simulator bookkeeping registers; currently just `_lastTrace`.
    #[must_use]
    pub fn shadow_var_names(&self) -> Vec<String> {
        vec![self.shared.state.trace.name.to_string()]
    }

    /// The `_lastTrace` shadow value, if a run has executed.
    #[must_use]
    pub fn last_trace(&self) -> Option<Value> {
        self.shared.state.trace.peek()
    }
}

/// Lowers a module. Constants are instantiated from the caller-supplied
/// environment; compilation itself never fails, it accumulates errors.
#[must_use]
pub fn compile(module: &QuintModule, constants: &HashMap<String, Value>) -> CompiledModule {
    let mut compiler = Compiler {
        shared: CompileShared::new(),
        constants,
        stack: Vec::new(),
        errors: Vec::new(),
        scope_frames: Vec::new(),
        lambda_params: Vec::new(),
        assumptions: Vec::new(),
    };
    walk_module(&mut compiler, module);
    debug_assert!(compiler.stack.is_empty(), "unbalanced compilation stack");

    let Compiler {
        shared,
        mut errors,
        assumptions,
        ..
    } = compiler;

    // Assumptions are checked once the whole context exists; they are
    // state-independent, so a fixed seed is fine.
    let mut runtime_errors = Vec::new();
    let mut ctx = EvalCtx::new(Rng::new(0));
    for (name, id, assumption) in assumptions {
        match assumption.eval(&mut ctx) {
            Ok(Value::Bool(true)) => {}
            Ok(Value::Bool(false)) => {
                errors.push(
                    CompileError::new(CompileErrorKind::FailedAssumption, format!("assumption {name} does not hold"))
                        .with_ref(id),
                );
            }
            Ok(other) => {
                runtime_errors.push(RuntimeError::internal(format!(
                    "assumption {name} evaluated to a {}",
                    other.kind_name()
                )));
            }
            Err(error) => runtime_errors.push(error.with_ref(id)),
        }
    }
    runtime_errors.extend(ctx.take_errors());

    CompiledModule {
        shared,
        compile_errors: errors,
        runtime_errors,
    }
}

struct Compiler<'c> {
    shared: CompileShared,
    constants: &'c HashMap<String, Value>,
    /// The compilation stack of computables.
    stack: Vec<Rc<Computable>>,
    errors: Vec<CompileError>,
    /// Displaced context bindings per open `let`/lambda scope, restored on
    /// exit so shadowing unwinds correctly.
    scope_frames: Vec<Vec<(ContextKey, Option<Rc<Computable>>)>>,
    /// Parameter registers of the lambdas currently being compiled.
    lambda_params: Vec<Vec<RegisterRef>>,
    assumptions: Vec<(String, NodeId, Rc<Computable>)>,
}

impl Compiler<'_> {
    fn bind(&mut self, kind: ContextKind, name: &str, computable: Rc<Computable>) {
        let key: ContextKey = (kind, Rc::from(name));
        let displaced = self.shared.context.borrow_mut().insert(key.clone(), computable);
        if let Some(frame) = self.scope_frames.last_mut() {
            frame.push((key, displaced));
        }
    }

    fn pop_frame(&mut self) {
        let Some(frame) = self.scope_frames.pop() else {
            return;
        };
        let mut context = self.shared.context.borrow_mut();
        for (key, displaced) in frame.into_iter().rev() {
            match displaced {
                Some(previous) => context.insert(key, previous),
                None => context.remove(&key),
            };
        }
    }

    fn error(&mut self, error: CompileError) {
        self.errors.push(error);
    }

    /// Pops one compiled operand, reporting a stack underflow as a bug.
    fn pop1(&mut self, id: NodeId) -> Rc<Computable> {
        self.stack.pop().unwrap_or_else(|| {
            self.errors
                .push(CompileError::new(CompileErrorKind::MalformedLambda, "compilation stack underflow").with_ref(id));
            error_placeholder()
        })
    }

    fn pop_n(&mut self, count: usize, id: NodeId) -> Vec<Rc<Computable>> {
        let mut popped = Vec::with_capacity(count);
        for _ in 0..count {
            popped.push(self.pop1(id));
        }
        popped.reverse();
        popped
    }

    /// Compiles an application of a user-defined operator (or a reference
    /// passed through an `arg` register).
    fn user_app(&mut self, id: NodeId, name: &str, args: Vec<Rc<Computable>>) {
        let resolved = lookup_context(&self.shared.context.borrow(), OPERATOR_LOOKUP, name);
        if let Some(target) = &resolved
            && let Computable::Callable(callable) = target.as_ref()
            && callable.params.len() != args.len()
        {
            self.error(
                CompileError::new(
                    CompileErrorKind::ArityMismatch,
                    format!(
                        "operator {name} expects {} arguments, got {}",
                        callable.params.len(),
                        args.len()
                    ),
                )
                .with_ref(id),
            );
            self.stack.push(error_placeholder());
            return;
        }
        let target = resolved.unwrap_or_else(|| lazy_lookup(&self.shared.context, OPERATOR_LOOKUP, name));
        self.stack.push(Computable::from_fn(move |ctx| {
            let mut values = Vec::with_capacity(args.len());
            for arg in &args {
                values.push(arg.eval(ctx)?);
            }
            target.call(values, ctx)
        }));
    }
}

fn error_placeholder() -> Rc<Computable> {
    Computable::from_fn(|_| Err(RuntimeError::internal("expression did not compile")))
}

impl IrVisitor for Compiler<'_> {
    fn enter_var(&mut self, id: NodeId, name: &str) {
        let current = Register::new(name, RegisterKind::Var, id);
        let next = Register::new(name, RegisterKind::NextVar, id);
        self.shared.state.vars.borrow_mut().push(Rc::clone(&current));
        self.shared.state.next_vars.borrow_mut().push(Rc::clone(&next));
        self.bind(ContextKind::Var, name, Rc::new(Computable::Register(current)));
        self.bind(ContextKind::NextVar, name, Rc::new(Computable::Register(next)));
    }

    fn enter_const(&mut self, id: NodeId, name: &str) {
        match self.constants.get(name) {
            Some(value) => {
                let constant = Computable::constant(value.clone());
                self.bind(ContextKind::Val, name, constant);
            }
            None => self.error(
                CompileError::new(
                    CompileErrorKind::MissingConstant,
                    format!("no value provided for constant {name}"),
                )
                .with_ref(id),
            ),
        }
    }

    fn exit_def(&mut self, def: &QuintDef) {
        match def {
            QuintDef::Assume { id, name, .. } => {
                let assumption = self.pop1(*id);
                self.assumptions.push((name.clone(), *id, assumption));
            }
            QuintDef::Instance { id, name, overrides, .. } => {
                // Override expressions were walked and pushed; discard them.
                for _ in overrides {
                    self.pop1(*id);
                }
                self.error(
                    CompileError::new(
                        CompileErrorKind::UnsupportedDef,
                        format!("instance {name} must be flattened before compilation"),
                    )
                    .with_ref(*id),
                );
            }
            _ => {}
        }
    }

    fn exit_op_def(&mut self, def: &OpDef) {
        let body = self.pop1(def.id);
        if def.qualifier == OpQualifier::Temporal {
            self.error(
                CompileError::new(
                    CompileErrorKind::TemporalUnsupported,
                    format!("cannot evaluate temporal operator {}", def.name),
                )
                .with_ref(def.id),
            );
            return;
        }
        if matches!(body.as_ref(), Computable::Callable(_)) {
            self.bind(ContextKind::Callable, &def.name, body);
        } else {
            let wrapped = Callable::new(&def.name, Vec::new(), body);
            self.bind(ContextKind::Val, &def.name, wrapped);
        }
    }

    fn exit_expr(&mut self, expr: &QuintEx) {
        match expr {
            QuintEx::Bool { value, .. } => self.stack.push(Computable::constant(Value::Bool(*value))),
            QuintEx::Int { value, .. } => self.stack.push(Computable::constant(Value::Int(value.clone()))),
            QuintEx::Str { value, .. } => self.stack.push(Computable::constant(Value::str(value))),
            _ => {}
        }
    }

    fn enter_name(&mut self, _id: NodeId, name: &str) {
        let resolved = lookup_context(&self.shared.context.borrow(), NAME_LOOKUP, name);
        let computable = resolved.unwrap_or_else(|| lazy_lookup(&self.shared.context, NAME_LOOKUP, name));
        self.stack.push(computable);
    }

    fn exit_app(&mut self, id: NodeId, opcode: &str, args: &[QuintEx]) {
        let operands = self.pop_n(args.len(), id);
        if ops::is_builtin_opcode(opcode) {
            match ops::compile_builtin(&self.shared, id, opcode, operands, args) {
                Ok(computable) => self.stack.push(computable),
                Err(error) => {
                    self.error(error);
                    self.stack.push(error_placeholder());
                }
            }
        } else {
            self.user_app(id, opcode, operands);
        }
    }

    fn enter_lambda(&mut self, _id: NodeId, params: &[LambdaParam], _expr: &QuintEx) {
        self.scope_frames.push(Vec::new());
        let mut registers = Vec::with_capacity(params.len());
        for param in params {
            let register = Register::new(&param.name, RegisterKind::Arg, param.id);
            self.bind(ContextKind::Arg, &param.name, Rc::new(Computable::Register(Rc::clone(&register))));
            registers.push(register);
        }
        self.lambda_params.push(registers);
    }

    fn exit_lambda(&mut self, id: NodeId, _params: &[LambdaParam], _expr: &QuintEx) {
        let body = self.pop1(id);
        let Some(registers) = self.lambda_params.pop() else {
            self.error(
                CompileError::new(CompileErrorKind::MalformedLambda, "lambda parameters were not registered")
                    .with_ref(id),
            );
            self.stack.push(error_placeholder());
            return;
        };
        self.pop_frame();
        self.stack.push(Callable::new("<lambda>", registers, body));
    }

    fn enter_let(&mut self, _id: NodeId, _opdef: &OpDef, _expr: &QuintEx) {
        self.scope_frames.push(Vec::new());
    }

    fn exit_let(&mut self, _id: NodeId, _opdef: &OpDef, _expr: &QuintEx) {
        // The let's value is its body computable, already on the stack; the
        // binding goes out of scope here.
        self.pop_frame();
    }
}
