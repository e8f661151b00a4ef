//! A small auction machine exercising maps, records-of-state, parameterized
//! actions, and sequential runs together.

mod common;

use common::{app, def, int, lambda, map_int, module, name, prepare, str_lit, var_decl};
use pretty_assertions::assert_eq;
use quiver::{Simulator, Value};
use serde_json::Value as Json;

fn assign(var: &str, expr: Json) -> Json {
    app("assign", vec![name(var), expr])
}

fn str_var_decl(name: &str) -> Json {
    serde_json::json!({
        "id": common::fresh_id(), "kind": "var", "name": name, "type": { "kind": "str" }
    })
}

fn auction_module() -> quiver::QuintModule {
    let fix_init = app(
        "actionAll",
        vec![
            assign(
                "balances",
                app(
                    "Map",
                    vec![
                        app("Tup", vec![str_lit("alice"), int(21)]),
                        app("Tup", vec![str_lit("bob"), int(10)]),
                    ],
                ),
            ),
            assign("highestBidder", str_lit("")),
            assign("highestBid", int(0)),
            assign("pending", app("Map", vec![])),
        ],
    );

    // bid(bidder, amount): outbid the current leader, escrow the amount,
    // and queue a refund for the displaced leader.
    let bid = lambda(
        &["bidder", "amount"],
        app(
            "actionAll",
            vec![
                app("igt", vec![name("amount"), name("highestBid")]),
                assign(
                    "balances",
                    app(
                        "put",
                        vec![
                            name("balances"),
                            name("bidder"),
                            app("isub", vec![app("get", vec![name("balances"), name("bidder")]), name("amount")]),
                        ],
                    ),
                ),
                assign(
                    "pending",
                    app(
                        "ite",
                        vec![
                            app("eq", vec![name("highestBidder"), str_lit("")]),
                            name("pending"),
                            app("put", vec![name("pending"), name("highestBidder"), name("highestBid")]),
                        ],
                    ),
                ),
                assign("highestBidder", name("bidder")),
                assign("highestBid", name("amount")),
            ],
        ),
    );

    // withdraw(who): refund a displaced bid.
    let withdraw = lambda(
        &["who"],
        app(
            "actionAll",
            vec![
                app("in", vec![name("who"), app("keys", vec![name("pending")])]),
                assign(
                    "balances",
                    app(
                        "put",
                        vec![
                            name("balances"),
                            name("who"),
                            app("iadd", vec![app("get", vec![name("balances"), name("who")]), app("get", vec![name("pending"), name("who")])]),
                        ],
                    ),
                ),
                assign("pending", app("put", vec![name("pending"), name("who"), int(0)])),
                assign("highestBidder", name("highestBidder")),
                assign("highestBid", name("highestBid")),
            ],
        ),
    );

    let chain = app(
        "then",
        vec![
            app(
                "then",
                vec![
                    app("then", vec![app("fixInit", vec![]), app("bid", vec![str_lit("alice"), int(5)])]),
                    app("bid", vec![str_lit("bob"), int(6)]),
                ],
            ),
            app("withdraw", vec![str_lit("alice")]),
        ],
    );

    // A chain that tries to underbid the current leader.
    let bad_chain = app(
        "then",
        vec![
            app("then", vec![app("fixInit", vec![]), app("bid", vec![str_lit("alice"), int(5)])]),
            app("bid", vec![str_lit("bob"), int(3)]),
        ],
    );

    module(
        "auction",
        vec![
            var_decl("balances"),
            str_var_decl("highestBidder"),
            var_decl("highestBid"),
            var_decl("pending"),
            def("fixInit", "action", fix_init),
            def("bid", "action", bid),
            def("withdraw", "action", withdraw),
            def("auctionRun", "run", chain),
            def("badRun", "run", bad_chain),
        ],
    )
}

#[test]
fn withdraw_after_outbid_refunds_the_escrow() {
    let compiled = prepare(&auction_module());
    let mut sim = Simulator::with_seed(&compiled, 0);

    assert!(sim.run_by_name("auctionRun").unwrap());

    let balances = sim.var_value("balances").expect("balances assigned");
    assert_eq!(map_int(&balances, "alice"), 21);
    assert_eq!(map_int(&balances, "bob"), 4);
    assert_eq!(sim.var_value("highestBidder"), Some(Value::str("bob")));
    assert_eq!(sim.var_value("highestBid"), Some(Value::int(6)));
}

#[test]
fn underbidding_disables_the_run() {
    let compiled = prepare(&auction_module());
    let mut sim = Simulator::with_seed(&compiled, 0);

    // alice's bid of 5 leads; bob's bid of 3 is disabled, so the whole
    // chain reports false and restores the pre-chain state.
    assert!(!sim.run_by_name("badRun").unwrap());
    assert_eq!(sim.var_value("balances"), None);
    assert_eq!(sim.next_var_value("balances"), None);
}
