//! Action semantics: assignment, `all`/`any` composition, and state
//! restoration across speculative branches.

mod common;

use common::{app, bool_lit, def, int, module, name, prepare, var_decl};
use pretty_assertions::assert_eq;
use quiver::{Simulator, Value};
use serde_json::Value as Json;

fn assign(var: &str, expr: Json) -> Json {
    app("assign", vec![name(var), expr])
}

#[test]
fn assignment_writes_next_state_only() {
    let module = module(
        "m",
        vec![
            var_decl("n"),
            def("setup", "action", assign("n", int(3))),
            def(
                "probe",
                "action",
                app("actionAll", vec![assign("n", int(5)), app("eq", vec![name("n"), name("n")])]),
            ),
        ],
    );
    let compiled = prepare(&module);
    let mut sim = Simulator::with_seed(&compiled, 0);

    assert!(sim.run_by_name("setup").unwrap());
    assert_eq!(sim.var_value("n"), Some(Value::int(3)));

    // The probe assigns 5 to the next state while reading 3 from the
    // current state.
    assert_eq!(sim.eval_operator("probe").unwrap(), Value::Bool(true));
    assert_eq!(sim.var_value("n"), Some(Value::int(3)));
    assert_eq!(sim.next_var_value("n"), Some(Value::int(5)));

    sim.shift();
    assert_eq!(sim.var_value("n"), Some(Value::int(5)));
    assert_eq!(sim.next_var_value("n"), None);
}

#[test]
fn next_reads_the_next_state_register() {
    let module = module(
        "m",
        vec![
            var_decl("n"),
            def(
                "probe",
                "action",
                app("actionAll", vec![assign("n", int(9)), app("eq", vec![app("next", vec![name("n")]), int(9)])]),
            ),
        ],
    );
    let compiled = prepare(&module);
    let mut sim = Simulator::with_seed(&compiled, 0);
    assert_eq!(sim.eval_operator("probe").unwrap(), Value::Bool(true));
}

#[test]
fn action_any_commits_the_surviving_branch() {
    let module = module(
        "m",
        vec![
            var_decl("n"),
            def("setup", "action", assign("n", int(0))),
            def(
                "probe",
                "action",
                app(
                    "actionAny",
                    vec![
                        app("actionAll", vec![assign("n", int(1)), bool_lit(false)]),
                        app("actionAll", vec![assign("n", int(2))]),
                    ],
                ),
            ),
        ],
    );
    let compiled = prepare(&module);
    let mut sim = Simulator::with_seed(&compiled, 0);

    assert!(sim.run_by_name("setup").unwrap());
    assert_eq!(sim.eval_operator("probe").unwrap(), Value::Bool(true));
    // Only the second branch survived; its write is the one committed.
    assert_eq!(sim.next_var_value("n"), Some(Value::int(2)));
}

#[test]
fn action_any_with_no_surviving_branch_restores_state() {
    let module = module(
        "m",
        vec![
            var_decl("n"),
            def(
                "probe",
                "action",
                app("actionAny", vec![app("actionAll", vec![assign("n", int(1)), bool_lit(false)])]),
            ),
        ],
    );
    let compiled = prepare(&module);
    let mut sim = Simulator::with_seed(&compiled, 0);
    assert_eq!(sim.eval_operator("probe").unwrap(), Value::Bool(false));
    assert_eq!(sim.next_var_value("n"), None);
}

#[test]
fn action_all_restores_on_failure() {
    let module = module(
        "m",
        vec![
            var_decl("n"),
            def(
                "failing",
                "action",
                app("actionAll", vec![assign("n", int(1)), app("assert", vec![bool_lit(false)])]),
            ),
        ],
    );
    let compiled = prepare(&module);
    let mut sim = Simulator::with_seed(&compiled, 0);

    // The failing operand is coerced to false; the speculative write to
    // the next state is rolled back.
    assert_eq!(sim.eval_operator("failing").unwrap(), Value::Bool(false));
    assert_eq!(sim.next_var_value("n"), None);
    assert!(!sim.errors().is_empty());
}

#[test]
fn fail_inverts_an_action() {
    let module = module(
        "m",
        vec![
            var_decl("n"),
            def("enabled", "action", assign("n", int(1))),
            def("negated", "action", app("fail", vec![app("enabled", vec![])])),
        ],
    );
    let compiled = prepare(&module);
    let mut sim = Simulator::with_seed(&compiled, 0);
    assert_eq!(sim.eval_operator("negated").unwrap(), Value::Bool(false));
}

#[test]
fn repeated_runs_an_action_n_times() {
    let module = module(
        "m",
        vec![
            var_decl("n"),
            def("setup", "action", assign("n", int(0))),
            def("increment", "action", assign("n", app("iadd", vec![name("n"), int(1)]))),
            def("five", "run", app("repeated", vec![app("increment", vec![]), int(5)])),
        ],
    );
    let compiled = prepare(&module);
    let mut sim = Simulator::with_seed(&compiled, 0);

    assert!(sim.run_by_name("setup").unwrap());
    assert!(sim.run_by_name("five").unwrap());
    assert_eq!(sim.var_value("n"), Some(Value::int(5)));
}
