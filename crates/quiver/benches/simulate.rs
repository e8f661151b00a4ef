//! Benchmarks a seeded simulator search over a small counter machine.

use std::collections::HashMap;

use criterion::{Criterion, criterion_group, criterion_main};
use quiver::{QuintModule, Simulator, compile};
use serde_json::json;

fn counter_module() -> QuintModule {
    // var n; init: n' = 0; step: n' = n + oneOf(1..6); inv: n >= 0
    let ir = json!({
        "id": 1, "name": "counter", "defs": [
            { "id": 2, "kind": "var", "name": "n", "type": { "kind": "int" } },
            { "id": 3, "kind": "def", "name": "init", "qualifier": "action",
              "expr": { "id": 4, "kind": "app", "opcode": "assign", "args": [
                  { "id": 5, "kind": "name", "name": "n" },
                  { "id": 6, "kind": "int", "value": 0 }
              ]}},
            { "id": 7, "kind": "def", "name": "step", "qualifier": "action",
              "expr": { "id": 8, "kind": "app", "opcode": "assign", "args": [
                  { "id": 9, "kind": "name", "name": "n" },
                  { "id": 10, "kind": "app", "opcode": "iadd", "args": [
                      { "id": 11, "kind": "name", "name": "n" },
                      { "id": 12, "kind": "app", "opcode": "oneOf", "args": [
                          { "id": 13, "kind": "app", "opcode": "to", "args": [
                              { "id": 14, "kind": "int", "value": 1 },
                              { "id": 15, "kind": "int", "value": 6 }
                          ]}
                      ]}
                  ]}
              ]}},
            { "id": 16, "kind": "def", "name": "inv", "qualifier": "val",
              "expr": { "id": 17, "kind": "app", "opcode": "igte", "args": [
                  { "id": 18, "kind": "name", "name": "n" },
                  { "id": 19, "kind": "int", "value": 0 }
              ]}}
        ]
    });
    serde_json::from_value(ir).expect("valid module")
}

fn bench_search(c: &mut Criterion) {
    let module = counter_module();
    let compiled = compile(&module, &HashMap::new());
    assert!(compiled.compile_errors.is_empty());

    c.bench_function("search_100_runs_50_steps", |b| {
        b.iter(|| {
            let mut sim = Simulator::with_seed(&compiled, 42);
            let outcome = sim.run(100, 50, "init", "step", "inv");
            assert!(outcome.verdict);
            outcome
        });
    });
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
