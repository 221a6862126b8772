use jonquil::{natives, Engine, ErrorValue, InitFlags, LiteralFormat, SnapshotTarget, Value};

fn eval(source: &str) -> Value {
    let mut engine = Engine::init(InitFlags::default());
    engine.eval(source).expect("evaluation should succeed")
}

fn eval_error(source: &str) -> ErrorValue {
    let mut engine = Engine::init(InitFlags::default());
    match engine.eval(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(err) => err,
    }
}

fn expect_number(value: &Value) -> f64 {
    value
        .as_number()
        .unwrap_or_else(|| panic!("expected number, found {}", value.type_of()))
}

fn expect_string(value: &Value) -> String {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected string, found {}", value.type_of()))
        .to_string()
}

fn expect_bool(value: &Value) -> bool {
    value
        .as_bool()
        .unwrap_or_else(|| panic!("expected boolean, found {}", value.type_of()))
}

#[test]
fn evaluates_basic_arithmetic() {
    let value = eval("1 + 2 * 3;");
    assert_eq!(expect_number(&value), 7.0);
}

#[test]
fn completion_value_is_last_expression() {
    let value = eval(
        r#"
        var x = 40;
        x + 2;
        "#,
    );
    assert_eq!(expect_number(&value), 42.0);
}

#[test]
fn concatenates_strings_over_addition() {
    let value = eval("'jon' + \"quil\";");
    assert_eq!(expect_string(&value), "jonquil");
    let value = eval("1 + '2';");
    assert_eq!(expect_string(&value), "12");
}

#[test]
fn integral_numbers_display_without_fraction() {
    assert_eq!(eval("1 + 1;").to_string(), "2");
    assert_eq!(eval("0.5;").to_string(), "0.5");
    assert_eq!(eval("1 / 0;").to_string(), "Infinity");
}

#[test]
fn while_loop_accumulates() {
    let value = eval(
        r#"
        var sum = 0;
        var i = 0;
        while (i < 5) {
            sum = sum + i;
            i = i + 1;
        }
        sum;
        "#,
    );
    assert_eq!(expect_number(&value), 10.0);
}

#[test]
fn for_loop_with_break_and_continue() {
    let value = eval(
        r#"
        var sum = 0;
        for (var i = 0; i < 10; i = i + 1) {
            if (i === 3) { continue; }
            if (i === 6) { break; }
            sum = sum + i;
        }
        sum;
        "#,
    );
    assert_eq!(expect_number(&value), 12.0);
}

#[test]
fn functions_close_over_their_scope() {
    let value = eval(
        r#"
        function adder(n) {
            return function (m) { return n + m; };
        }
        var add3 = adder(3);
        add3(4);
        "#,
    );
    assert_eq!(expect_number(&value), 7.0);
}

#[test]
fn function_without_return_yields_undefined() {
    let value = eval("function f() { 1 + 1; } f();");
    assert_eq!(value.type_of(), "undefined");
}

#[test]
fn conditional_and_logical_operators() {
    assert_eq!(expect_number(&eval("true ? 1 : 2;")), 1.0);
    assert_eq!(expect_string(&eval("false || 'fallback';")), "fallback");
    assert_eq!(expect_number(&eval("1 && 2;")), 2.0);
}

#[test]
fn loose_and_strict_equality_differ() {
    assert!(expect_bool(&eval("1 == '1';")));
    assert!(!expect_bool(&eval("1 === '1';")));
    assert!(expect_bool(&eval("null == undefined;")));
    assert!(!expect_bool(&eval("null === undefined;")));
}

#[test]
fn typeof_reports_kinds_and_tolerates_missing_names() {
    assert_eq!(expect_string(&eval("typeof 1;")), "number");
    assert_eq!(expect_string(&eval("typeof 'x';")), "string");
    assert_eq!(expect_string(&eval("typeof missing;")), "undefined");
}

#[test]
fn objects_and_arrays_support_member_and_index_access() {
    let value = eval(
        r#"
        var inventory = { apples: 3, bananas: 7 };
        inventory.bananas = inventory.bananas + 5;
        inventory.bananas;
        "#,
    );
    assert_eq!(expect_number(&value), 12.0);

    let value = eval(
        r#"
        var numbers = [1, 2, 3];
        numbers[1] = numbers[1] + 5;
        numbers[1] + numbers.length;
        "#,
    );
    assert_eq!(expect_number(&value), 10.0);

    let value = eval("[1, 2, 3][9];");
    assert_eq!(value.type_of(), "undefined");
}

#[test]
fn undefined_variable_is_a_reference_error() {
    let err = eval_error("missing;");
    assert_eq!(err.name(), Some("ReferenceError"));
}

#[test]
fn const_reassignment_is_a_type_error() {
    let err = eval_error("const x = 1; x = 2;");
    assert_eq!(err.name(), Some("TypeError"));
}

#[test]
fn syntax_errors_carry_position_markers() {
    let err = eval_error("var x = ;");
    assert_eq!(err.name(), Some("SyntaxError"));
    assert!(
        err.message().contains("[line: 1, column: 9]"),
        "unexpected message: {}",
        err.message()
    );
}

#[test]
fn syntax_error_position_tracks_lines() {
    let err = eval_error("var ok = 1;\nvar bad = ;");
    assert!(
        err.message().contains("[line: 2, column: 11]"),
        "unexpected message: {}",
        err.message()
    );
}

#[test]
fn return_outside_function_is_a_syntax_error() {
    let err = eval_error("return 1;");
    assert_eq!(err.name(), Some("SyntaxError"));
}

#[test]
fn promise_reactions_run_in_fifo_order() {
    let mut engine = Engine::init(InitFlags::default());
    engine
        .eval(
            r#"
            var order = "";
            Promise.resolve("a").then(function (v) { order = order + v; });
            Promise.resolve("b").then(function (v) { order = order + v; });
            "#,
        )
        .expect("setup should succeed");

    assert!(matches!(engine.run_pending_job(), Some(Ok(_))));
    assert!(matches!(engine.run_pending_job(), Some(Ok(_))));
    assert!(engine.run_pending_job().is_none());

    let order = engine.eval("order;").expect("readback should succeed");
    assert_eq!(expect_string(&order), "ab");
}

#[test]
fn reactions_may_enqueue_further_reactions() {
    let mut engine = Engine::init(InitFlags::default());
    engine
        .eval(
            r#"
            var hops = 0;
            Promise.resolve(0).then(function (v) {
                hops = hops + 1;
                Promise.resolve(0).then(function (w) { hops = hops + 1; });
            });
            "#,
        )
        .expect("setup should succeed");

    let mut ran = 0;
    while let Some(result) = engine.run_pending_job() {
        result.expect("job should succeed");
        ran += 1;
    }
    assert_eq!(ran, 2);
    let hops = engine.eval("hops;").expect("readback should succeed");
    assert_eq!(expect_number(&hops), 2.0);
}

#[test]
fn failing_reaction_surfaces_its_error() {
    let mut engine = Engine::init(InitFlags::default());
    engine
        .eval("Promise.resolve(1).then(function (v) { boom(); });")
        .expect("setup should succeed");

    match engine.run_pending_job() {
        Some(Err(err)) => assert_eq!(err.name(), Some("ReferenceError")),
        other => panic!("expected failing job, got {other:?}"),
    }
    assert!(engine.run_pending_job().is_none());
}

#[test]
fn registered_globals_are_callable() {
    fn answer(_args: &[Value]) -> Result<Value, ErrorValue> {
        Ok(Value::number(42.0))
    }
    let mut engine = Engine::init(InitFlags::default());
    engine.register_global("answer", answer);
    let value = engine.eval("answer();").expect("call should succeed");
    assert_eq!(expect_number(&value), 42.0);
}

#[test]
fn host_assert_primitive_is_fatal_on_failure() {
    let mut engine = Engine::init(InitFlags::default());
    natives::install(&mut engine);
    engine
        .eval("assert(1 + 1 === 2);")
        .expect("holding assertion should succeed");
    let err = engine
        .eval("assert(1 === 2);")
        .expect_err("failing assertion should error");
    assert!(err.is_fatal());
    assert_eq!(err.to_string(), "assertion failed");
}

#[cfg(feature = "snapshot")]
#[test]
fn snapshot_round_trips_in_memory() {
    let mut engine = Engine::init(InitFlags::default());
    let blob = engine
        .save_snapshot("6 * 7;", SnapshotTarget::Eval)
        .expect("save should succeed");
    let value = engine.exec_snapshot(&blob).expect("exec should succeed");
    assert_eq!(expect_number(&value), 42.0);

    let blob = engine
        .save_snapshot("1 + 1;", SnapshotTarget::Global)
        .expect("save should succeed");
    let value = engine.exec_snapshot(&blob).expect("exec should succeed");
    assert_eq!(value.type_of(), "undefined");
}

#[cfg(feature = "snapshot")]
#[test]
fn corrupt_snapshots_are_rejected() {
    let mut engine = Engine::init(InitFlags::default());
    assert!(engine.exec_snapshot(b"garbage").is_err());

    let mut blob = engine
        .save_snapshot("1;", SnapshotTarget::Eval)
        .expect("save should succeed");
    blob[4] = 0xff;
    let err = engine
        .exec_snapshot(&blob)
        .expect_err("version mismatch should error");
    assert!(err.message().contains("version"));
}

#[cfg(feature = "snapshot")]
#[test]
fn literal_table_deduplicates_in_order() {
    let engine = Engine::init(InitFlags::default());
    let bytes = engine
        .save_literals(
            r#"var greeting = "alpha"; print("alpha", "beta", 42);"#,
            LiteralFormat::List,
        )
        .expect("literal dump should succeed");
    assert_eq!(String::from_utf8(bytes).unwrap(), "alpha\nbeta\n42\n");
}

#[cfg(feature = "snapshot")]
#[test]
fn literal_table_c_format_is_source_shaped() {
    let engine = Engine::init(InitFlags::default());
    let bytes = engine
        .save_literals(r#"print("quoted \"text\"");"#, LiteralFormat::CSource)
        .expect("literal dump should succeed");
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("const char *literals[1] ="));
    assert!(text.contains("\"quoted \\\"text\\\"\""));
}
