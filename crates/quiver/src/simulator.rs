//! Randomized simulation over a compiled module.
//!
//! The driver behind the `_test` opcode and the public [`Simulator`]
//! facade. A simulation is a seeded sequence: the same seed over the same
//! compiled module reproduces the same traces and verdict, which is how a
//! failing search is replayed.

use serde_json::json;

use crate::{
    compiler::{CompileShared, CompiledModule, OPERATOR_LOOKUP, lookup_context},
    errors::{EvalResult, RuntimeError},
    eval::EvalCtx,
    rng::Rng,
    tracer::SimTracer,
    value::Value,
};

/// Internal verdict of one `_test` invocation.
pub(crate) struct SimReport {
    pub ok: bool,
    pub violated: Option<String>,
}

/// Runs the simulation algorithm against the live register banks.
///
/// The callables are looked up by name against the finished context. All
/// state variables are restored from an outer snapshot afterwards; the
/// trace shadow register keeps the last executed run.
pub(crate) fn run_simulation(
    ctx: &mut EvalCtx,
    shared: &CompileShared,
    nruns: u64,
    nsteps: u64,
    init: &str,
    step: &str,
    inv: &str,
) -> EvalResult<SimReport> {
    let lookup = |name: &str| {
        lookup_context(&shared.context.borrow(), OPERATOR_LOOKUP, name)
            .ok_or_else(|| RuntimeError::internal(format!("no operator named {name}")))
    };
    let init_op = lookup(init)?;
    let step_op = lookup(step)?;
    let inv_op = lookup(inv)?;

    let state = &shared.state;
    let outer = state.snapshot_all();
    let mut ok = true;
    let mut violated = None;

    'runs: for run in 0..nruns {
        let run = usize::try_from(run).unwrap_or(usize::MAX);
        ctx.tracer.run_started(run);
        state.recover_all(&outer);
        state.reset_trace();

        match init_op.eval(ctx) {
            Err(error) => {
                ctx.record(error);
                ctx.tracer.run_dropped(run);
                continue 'runs;
            }
            Ok(value) => {
                if !value.as_bool()? {
                    ctx.tracer.run_dropped(run);
                    continue 'runs;
                }
            }
        }
        state.shift();

        match inv_op.eval(ctx) {
            Err(error) => {
                ctx.record(error);
                ok = false;
                break 'runs;
            }
            Ok(value) => {
                if !value.as_bool()? {
                    ok = false;
                    violated = Some(inv.to_owned());
                    ctx.tracer.violation_found(run, inv);
                    break 'runs;
                }
            }
        }

        for step_index in 0..nsteps {
            let step_index = usize::try_from(step_index).unwrap_or(usize::MAX);
            // A disabled or failing step drops the run; it is not an error.
            match step_op.eval(ctx) {
                Err(error) => {
                    ctx.record(error);
                    ctx.tracer.run_dropped(run);
                    continue 'runs;
                }
                Ok(value) => {
                    if !value.as_bool()? {
                        ctx.tracer.run_dropped(run);
                        continue 'runs;
                    }
                }
            }
            state.shift();
            ctx.tracer.step_completed(run, step_index);

            match inv_op.eval(ctx) {
                Err(error) => {
                    ctx.record(error);
                    ok = false;
                    break 'runs;
                }
                Ok(value) => {
                    if !value.as_bool()? {
                        ok = false;
                        violated = Some(inv.to_owned());
                        ctx.tracer.violation_found(run, inv);
                        break 'runs;
                    }
                }
            }
        }
    }

    state.recover_all(&outer);
    Ok(SimReport { ok, violated })
}

/// The result of a simulation, replayable from the recorded seed.
#[derive(Debug)]
pub struct SimOutcome {
    /// `true` iff no invariant violation (and no evaluation error) was
    /// found.
    pub verdict: bool,
    /// The seed that produced this outcome.
    pub seed: u64,
    /// Name of the violated invariant, when the verdict is a violation.
    pub violated_invariant: Option<String>,
    /// The last executed trace: one state record per shift.
    pub trace: Vec<Value>,
    /// Runtime errors logged during the search.
    pub runtime_errors: Vec<RuntimeError>,
}

impl SimOutcome {
    /// The trace as interchange JSON: a list of records keyed by variable
    /// name.
    #[must_use]
    pub fn trace_json(&self) -> serde_json::Value {
        json!(self.trace.iter().map(Value::to_json).collect::<Vec<_>>())
    }
}

/// Executes compiled modules: randomized searches and direct runs.
pub struct Simulator<'m> {
    module: &'m CompiledModule,
    ctx: EvalCtx,
}

impl<'m> Simulator<'m> {
    /// A simulator seeded from OS entropy; the seed is still recorded.
    #[must_use]
    pub fn new(module: &'m CompiledModule) -> Self {
        Self {
            module,
            ctx: EvalCtx::new(Rng::from_entropy()),
        }
    }

    /// A simulator with an explicit seed, for replaying a search.
    #[must_use]
    pub fn with_seed(module: &'m CompiledModule, seed: u64) -> Self {
        Self {
            module,
            ctx: EvalCtx::new(Rng::new(seed)),
        }
    }

    pub fn set_tracer(&mut self, tracer: Box<dyn SimTracer>) {
        self.ctx.tracer = tracer;
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.ctx.rng.seed()
    }

    /// Searches for an invariant violation: `nruns` random runs of
    /// `nsteps` steps each.
    pub fn run(&mut self, nruns: u64, nsteps: u64, init: &str, step: &str, inv: &str) -> SimOutcome {
        let seed = self.ctx.rng.seed();
        let result = run_simulation(&mut self.ctx, &self.module.shared, nruns, nsteps, init, step, inv);
        let (verdict, violated_invariant) = match result {
            Ok(report) => (report.ok, report.violated),
            Err(error) => {
                self.ctx.record(error);
                (false, None)
            }
        };
        SimOutcome {
            verdict,
            seed,
            violated_invariant,
            trace: self.trace(),
            runtime_errors: self.ctx.take_errors(),
        }
    }

    /// Executes a `run`-qualified callable directly, with a final shift so
    /// the last action's effects land in the current state and the trace.
    ///
    /// Unlike [`Simulator::run`], the register banks are left as the run
    /// produced them, so callers can inspect the final state.
    pub fn run_by_name(&mut self, name: &str) -> EvalResult<bool> {
        let operator = self
            .module
            .lookup_operator(name)
            .ok_or_else(|| RuntimeError::internal(format!("no operator named {name}")))?;
        self.module.shared.state.reset_trace();
        let result = operator.eval(&mut self.ctx)?.as_bool()?;
        if result {
            self.module.shared.state.shift();
        }
        Ok(result)
    }

    /// Evaluates a named value or nullary operator under the current state.
    pub fn eval_operator(&mut self, name: &str) -> EvalResult<Value> {
        let operator = self
            .module
            .lookup_operator(name)
            .ok_or_else(|| RuntimeError::internal(format!("no operator named {name}")))?;
        operator.eval(&mut self.ctx)
    }

    /// Copies next-state into current-state and clears next-state, as the
    /// driver does between steps.
    pub fn shift(&mut self) {
        self.module.shared.state.shift();
    }

    /// The trace of the last executed run.
    #[must_use]
    pub fn trace(&self) -> Vec<Value> {
        match self.module.shared.state.trace.peek() {
            Some(Value::List(entries)) => (*entries).clone(),
            _ => Vec::new(),
        }
    }

    /// Current-state value of a variable, if set.
    #[must_use]
    pub fn var_value(&self, name: &str) -> Option<Value> {
        self.module
            .shared
            .state
            .vars
            .borrow()
            .iter()
            .find(|register| &*register.name == name)
            .and_then(|register| register.peek())
    }

    /// Next-state value of a variable, if set.
    #[must_use]
    pub fn next_var_value(&self, name: &str) -> Option<Value> {
        self.module
            .shared
            .state
            .next_vars
            .borrow()
            .iter()
            .find(|register| &*register.name == name)
            .and_then(|register| register.peek())
    }

    /// Runtime errors logged so far.
    #[must_use]
    pub fn errors(&self) -> &[RuntimeError] {
        self.ctx.errors()
    }
}
