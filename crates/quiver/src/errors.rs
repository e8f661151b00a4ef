//! Error taxonomies for the evaluation core.
//!
//! Two strictly separate families:
//! - [`CompileError`]: produced while lowering IR to the computable graph,
//!   never recoverable within a run.
//! - [`RuntimeError`]: produced while evaluating computables, recoverable by
//!   combinators that coerce failure (`and`, `or`, `actionAny`) and by the
//!   simulator, which may drop the run.
//!
//! Both render to the same `{ explanation, references }` report shape for the
//! embedding layer, which owns the mapping from node identities back to
//! source locations.

use std::fmt::{self, Display};

use serde::Serialize;
use smallvec::SmallVec;

use crate::ir::NodeId;

/// Result type alias for evaluation steps that can fail at runtime.
pub type EvalResult<T> = Result<T, RuntimeError>;

/// Classification of compile-time failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr, Serialize)]
pub enum CompileErrorKind {
    #[strum(serialize = "unknown opcode")]
    UnknownOpcode,
    #[strum(serialize = "arity mismatch")]
    ArityMismatch,
    #[strum(serialize = "unbound name")]
    UnboundName,
    #[strum(serialize = "malformed lambda")]
    MalformedLambda,
    #[strum(serialize = "uninstantiated constant")]
    MissingConstant,
    #[strum(serialize = "temporal operators are not supported")]
    TemporalUnsupported,
    #[strum(serialize = "failed assumption")]
    FailedAssumption,
    #[strum(serialize = "unsupported definition")]
    UnsupportedDef,
}

/// An error produced while lowering a module to its computable graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub explanation: String,
    /// Node identities the error is attributed to, most specific first.
    pub references: SmallVec<[NodeId; 2]>,
}

impl CompileError {
    pub(crate) fn new(kind: CompileErrorKind, explanation: impl Into<String>) -> Self {
        Self {
            kind,
            explanation: explanation.into(),
            references: SmallVec::new(),
        }
    }

    /// Attaches a node identity to the error.
    #[must_use]
    pub(crate) fn with_ref(mut self, id: NodeId) -> Self {
        self.references.push(id);
        self
    }

    /// Renders the error in the embedding-layer report shape.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            explanation: self.to_string(),
            references: self.references.to_vec(),
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.explanation)
    }
}

/// Classification of runtime failures.
///
/// The string representation is the user-facing message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr, Serialize)]
pub enum RuntimeErrorKind {
    #[strum(serialize = "variable is not set")]
    UnsetRegister,
    #[strum(serialize = "division by zero")]
    DivisionByZero,
    #[strum(serialize = "modulo by zero")]
    ModuloByZero,
    #[strum(serialize = "undefined power")]
    PowerUndefined,
    #[strum(serialize = "index out of bounds")]
    OutOfBounds,
    #[strum(serialize = "empty list")]
    EmptyList,
    #[strum(serialize = "invalid slice")]
    InvalidSlice,
    #[strum(serialize = "missing record field")]
    MissingField,
    #[strum(serialize = "missing map key")]
    MissingKey,
    #[strum(serialize = "assertion failed")]
    AssertionFailed,
    #[strum(serialize = "empty set")]
    EmptySet,
    #[strum(serialize = "invalid range")]
    InvalidRange,
    #[strum(serialize = "infinite set")]
    InfiniteSet,
    #[strum(serialize = "recursion limit exceeded")]
    RecursionLimit,
    /// Indicates a bug in the evaluator or in the upstream type checker,
    /// not in the user's specification.
    #[strum(serialize = "internal error")]
    Internal,
}

/// An error produced while evaluating a computable.
///
/// A runtime error turns the containing computable's result into "no value";
/// combinators either propagate it or coerce it to `false` after logging it
/// in the evaluation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub explanation: String,
    /// Node identities the error is attributed to, most specific first.
    pub references: SmallVec<[NodeId; 2]>,
}

impl RuntimeError {
    pub(crate) fn new(kind: RuntimeErrorKind, explanation: impl Into<String>) -> Self {
        Self {
            kind,
            explanation: explanation.into(),
            references: SmallVec::new(),
        }
    }

    /// Attaches a node identity to the error.
    #[must_use]
    pub(crate) fn with_ref(mut self, id: NodeId) -> Self {
        self.references.push(id);
        self
    }

    /// Shorthand for evaluator bugs and type-checker contract violations.
    pub(crate) fn internal(explanation: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::Internal, explanation)
    }

    /// Renders the error in the embedding-layer report shape.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            explanation: self.to_string(),
            references: self.references.to_vec(),
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.explanation)
    }
}

/// The `{ explanation, references }` shape consumed by embedders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub explanation: String,
    pub references: Vec<NodeId>,
}
