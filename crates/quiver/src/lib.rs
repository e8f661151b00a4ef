#![doc = include_str!("../../../README.md")]
#![expect(clippy::must_use_candidate, reason = "annotating every getter adds noise without safety")]

mod compiler;
mod errors;
mod eval;
mod ir;
mod limits;
mod lookup;
mod ops;
mod register;
mod resolver;
mod rng;
mod scoping;
mod simulator;
mod tracer;
mod value;
mod visitor;

pub use crate::{
    compiler::{CompiledModule, ContextKind, compile},
    errors::{CompileError, CompileErrorKind, ErrorReport, EvalResult, RuntimeError, RuntimeErrorKind},
    eval::{Callable, Computable, EvalCtx},
    ir::{
        LambdaParam, NodeId, OpDef, OpQualifier, QuintDef, QuintEx, QuintModule, QuintType, RecordFieldType,
        UnionRecordType,
    },
    limits::{DEFAULT_MAX_RECURSION_DEPTH, DepthGuard},
    lookup::{Definition, DefinitionKind, LookupTable, LookupTables},
    register::{Register, RegisterKind, RegisterRef, recover, snapshot},
    resolver::{NameError, NameErrorKind, resolve},
    rng::Rng,
    scoping::ScopeTree,
    simulator::{SimOutcome, Simulator},
    tracer::{NoopTracer, RecordingTracer, SimTracer, StderrTracer},
    value::{InfiniteKind, SetValue, Value},
    visitor::{IrVisitor, walk_def, walk_expr, walk_module, walk_op_def, walk_type},
};
