//! Observability hooks for the simulator.
//!
//! There is no global logger; embedders pass a tracer and receive events as
//! plain method calls. The default [`NoopTracer`] compiles away to nothing.

/// Receives simulator progress events.
///
/// All methods have no-op defaults so implementations subscribe only to
/// what they need.
pub trait SimTracer {
    /// A run is starting.
    fn run_started(&mut self, _run_index: usize) {}

    /// A step completed and state was shifted.
    fn step_completed(&mut self, _run_index: usize, _step_index: usize) {}

    /// A run was dropped because `init` or `step` was disabled or failed.
    fn run_dropped(&mut self, _run_index: usize) {}

    /// The invariant evaluated to `false`.
    fn violation_found(&mut self, _run_index: usize, _invariant: &str) {}
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl SimTracer for NoopTracer {}

/// Prints events to stderr; useful when debugging a specification.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrTracer;

impl SimTracer for StderrTracer {
    fn run_started(&mut self, run_index: usize) {
        eprintln!("run {run_index} started");
    }

    fn step_completed(&mut self, run_index: usize, step_index: usize) {
        eprintln!("run {run_index}: step {step_index} completed");
    }

    fn run_dropped(&mut self, run_index: usize) {
        eprintln!("run {run_index} dropped");
    }

    fn violation_found(&mut self, run_index: usize, invariant: &str) {
        eprintln!("run {run_index}: invariant {invariant} violated");
    }
}

/// Records events in memory; used by tests.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    pub events: Vec<String>,
}

impl SimTracer for RecordingTracer {
    fn run_started(&mut self, run_index: usize) {
        self.events.push(format!("run {run_index}"));
    }

    fn step_completed(&mut self, run_index: usize, step_index: usize) {
        self.events.push(format!("step {run_index}.{step_index}"));
    }

    fn run_dropped(&mut self, run_index: usize) {
        self.events.push(format!("dropped {run_index}"));
    }

    fn violation_found(&mut self, run_index: usize, invariant: &str) {
        self.events.push(format!("violation {run_index} {invariant}"));
    }
}
