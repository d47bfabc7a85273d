//! Executor semantics, driven through the full compile pipeline.

use std::sync::Arc;

use jam_compiler::{lexer::tokenize, link, lower, parse, program::Program, validate};
use jam_core::diag::MessageCode;
use jam_core::error::RuntimeError;
use jam_core::limits::{CancellationToken, ExecutionOptions};
use jam_core::signature::FunctionTable;
use jam_core::value::Value;
use jam_core::ExecutionContext;
use jam_runtime::{run_program, FunctionRegistry, ScriptFunction};

fn compile(source: &str) -> (Program, Vec<Arc<dyn ScriptFunction>>) {
    let tokens = tokenize(source).expect("lexes");
    let ast = parse(tokens).expect("parses");
    let diags = validate(&ast);
    assert!(diags.iter().all(|d| !d.is_error()), "validate: {diags:?}");
    let registry = FunctionRegistry::builtins();
    let table = FunctionTable::merge(registry.signatures(), vec![]);
    let (slots, link_diags) = link(&ast, &table);
    assert!(
        link_diags.iter().all(|d| !d.is_error()),
        "link: {link_diags:?}"
    );
    let program = lower(&ast, slots);
    let functions = program
        .slots
        .iter()
        .map(|slot| registry.get(&slot.name).expect("linked builtin exists"))
        .collect();
    (program, functions)
}

fn run_with_options(
    source: &str,
    data: Value,
    options: ExecutionOptions,
) -> (Result<Value, RuntimeError>, ExecutionContext) {
    let (program, functions) = compile(source);
    let mut ctx = ExecutionContext::new(options);
    let result = run_program(&program, &functions, data, &mut ctx);
    (result, ctx)
}

fn run(source: &str, data: Value) -> Result<Value, RuntimeError> {
    run_with_options(source, data, ExecutionOptions::default()).0
}

fn run_json(source: &str, json: &str) -> Result<Value, RuntimeError> {
    run(source, Value::parse_json(json).expect("valid json"))
}

fn json(text: &str) -> Value {
    Value::parse_json(text).expect("valid json")
}

#[test]
fn normal_completion_returns_data() {
    let result = run_json("var x = 1", r#"{"n": 41}"#).unwrap();
    assert_eq!(result, json(r#"{"n": 41}"#));
}

#[test]
fn property_update_mutates_data_in_place() {
    let result = run_json("data.n = data.n + 1", r#"{"n": 41}"#).unwrap();
    assert_eq!(result, json(r#"{"n": 42}"#));
}

#[test]
fn nested_write_paths() {
    let result = run_json(
        "data.user.tags[1] = \"x\"\ndata.user.age += 1",
        r#"{"user": {"tags": ["a", "b"], "age": 29}}"#,
    )
    .unwrap();
    assert_eq!(result, json(r#"{"user": {"tags": ["a", "x"], "age": 30}}"#));
}

#[test]
fn write_through_missing_intermediate_fails() {
    let err = run_json("data.a.b = 1", r#"{}"#).unwrap_err();
    assert_eq!(err.code, MessageCode::SetPropertyOnNonObject);
}

#[test]
fn negative_index_reads_wrap_but_writes_reject() {
    let result = run_json("data.last = data.items[-1]", r#"{"items": [1, 2, 3]}"#).unwrap();
    assert_eq!(
        result,
        json(r#"{"items": [1, 2, 3], "last": 3}"#)
    );
    let err = run_json("data.items[-1] = 9", r#"{"items": [1]}"#).unwrap_err();
    assert_eq!(err.code, MessageCode::NegativeIndex);
}

#[test]
fn shadowing_resolves_to_innermost_binding() {
    let result = run_json(
        "var x = 1\nif true { var x = 2\ndata.inner = x }\ndata.outer = x",
        r#"{}"#,
    )
    .unwrap();
    assert_eq!(result, json(r#"{"inner": 2, "outer": 1}"#));
}

#[test]
fn while_loop_with_break_and_continue() {
    let result = run_json(
        concat!(
            "var total = 0\n",
            "var i = 0\n",
            "while true {\n",
            "  i = i + 1\n",
            "  if i > 10 { break }\n",
            "  if i % 2 == 0 { continue }\n",
            "  total = total + i\n",
            "}\n",
            "data.total = total",
        ),
        r#"{}"#,
    )
    .unwrap();
    assert_eq!(result, json(r#"{"total": 25}"#));
}

#[test]
fn for_loop_ascending_and_descending() {
    let result = run_json(
        concat!(
            "for x from 1 to 5 step 1 ascending { data.up = Append(data.up, x) }\n",
            "for x from 5 to 1 descending { data.down = Append(data.down, x) }",
        ),
        r#"{"up": [], "down": []}"#,
    )
    .unwrap();
    assert_eq!(
        result,
        json(r#"{"up": [1, 2, 3, 4, 5], "down": [5, 4, 3, 2, 1]}"#)
    );
}

#[test]
fn for_step_must_be_positive_integer() {
    for step in ["0", "-1", "1.5"] {
        let err = run_json(
            &format!("for x from 1 to 5 step {step} {{ }}"),
            r#"{}"#,
        )
        .unwrap_err();
        assert_eq!(err.code, MessageCode::NonNegativeIntegerRequired, "{step}");
    }
}

#[test]
fn for_bounds_must_be_numeric() {
    let err = run_json("for x from \"a\" to 5 { }", r#"{}"#).unwrap_err();
    assert_eq!(err.code, MessageCode::LoopBoundNotNumeric);
}

#[test]
fn continue_in_for_still_advances_the_counter() {
    let result = run_json(
        concat!(
            "for x from 1 to 6 {\n",
            "  if x % 2 == 0 { continue }\n",
            "  data.odds = Append(data.odds, x)\n",
            "}",
        ),
        r#"{"odds": []}"#,
    )
    .unwrap();
    assert_eq!(result, json(r#"{"odds": [1, 3, 5]}"#));
}

#[test]
fn foreach_over_arrays_objects_and_strings() {
    let result = run_json(
        concat!(
            "foreach item in data.items { data.sum += item }\n",
            "foreach pair in data.obj { data.keys = Append(data.keys, pair.key) }\n",
            "foreach ch in \"ab\" { data.chars = Append(data.chars, ch) }",
        ),
        r#"{"items": [1, 2, 3], "obj": {"b": 1, "a": 2}, "sum": 0, "keys": [], "chars": []}"#,
    )
    .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(object.get("sum"), Some(&Value::Number(6.0)));
    assert_eq!(object.get("keys"), Some(&json(r#"["b", "a"]"#)));
    assert_eq!(object.get("chars"), Some(&json(r#"["a", "b"]"#)));
}

#[test]
fn foreach_over_non_iterable_fails() {
    let err = run_json("foreach x in 42 { }", r#"{}"#).unwrap_err();
    assert_eq!(err.code, MessageCode::NotIterable);
}

#[test]
fn switch_takes_first_deep_equal_case_without_fallthrough() {
    let source = concat!(
        "switch data.value {\n",
        "  case [1, 2] { data.hit = \"array\" }\n",
        "  case \"x\", \"y\" { data.hit = \"letter\" }\n",
        "  default { data.hit = \"none\" }\n",
        "}",
    );
    let result = run_json(source, r#"{"value": [1, 2]}"#).unwrap();
    assert_eq!(result.as_object().unwrap().get("hit"), Some(&json("\"array\"")));
    let result = run_json(source, r#"{"value": "y"}"#).unwrap();
    assert_eq!(result.as_object().unwrap().get("hit"), Some(&json("\"letter\"")));
    let result = run_json(source, r#"{"value": 9}"#).unwrap();
    assert_eq!(result.as_object().unwrap().get("hit"), Some(&json("\"none\"")));
}

#[test]
fn logical_operators_return_the_deciding_operand() {
    let result = run_json(
        "data.a = null or \"fallback\"\ndata.b = 0 and \"never\"\ndata.c = 1 and \"second\"",
        r#"{}"#,
    )
    .unwrap();
    assert_eq!(
        result,
        json(r#"{"a": "fallback", "b": 0, "c": "second"}"#)
    );
}

#[test]
fn type_hint_violation_names_the_variable() {
    let err = run_json("var x: number = \"hi\"", r#"{}"#).unwrap_err();
    assert_eq!(err.code, MessageCode::InvalidType);
    assert_eq!(err.args, vec!["x", "Number", "String"]);
    assert_eq!(err.span.map(|s| s.line), Some(1));
}

#[test]
fn type_hint_checked_on_later_assignments() {
    let err = run_json("var x: number = 1\nx = \"two\"", r#"{}"#).unwrap_err();
    assert_eq!(err.code, MessageCode::InvalidType);
    assert_eq!(err.span.map(|s| s.line), Some(2));
}

#[test]
fn uninitialized_hinted_variable_holds_null() {
    let result = run_json("var x: number\ndata.value = x", r#"{}"#).unwrap();
    assert_eq!(result, json(r#"{"value": null}"#));
}

#[test]
fn division_by_zero_carries_statement_location() {
    let err = run_json("\nvar x = 10 / 0", r#"{}"#).unwrap_err();
    assert_eq!(err.code, MessageCode::DivisionByZero);
    let span = err.span.expect("span attached");
    assert_eq!(span.line, 2);
    assert_eq!(span.column, 1);
}

#[test]
fn return_with_expression_yields_that_value() {
    let (result, ctx) = run_with_options(
        "return \"done early\"\ndata.unreached = true",
        json(r#"{"n": 1}"#),
        ExecutionOptions::default(),
    );
    assert_eq!(result.unwrap(), Value::String("done early".into()));
    assert_eq!(ctx.completion_message(), Some("done early"));
}

#[test]
fn bare_return_yields_current_data() {
    let (result, ctx) = run_with_options(
        "data.n = 2\nreturn\ndata.n = 3",
        json(r#"{"n": 1}"#),
        ExecutionOptions::default(),
    );
    assert_eq!(result.unwrap(), json(r#"{"n": 2}"#));
    assert_eq!(ctx.completion_message(), None);
}

#[test]
fn fail_raises_script_failure_with_message() {
    let (result, ctx) = run_with_options(
        "fail \"bad input\"",
        json(r#"{}"#),
        ExecutionOptions::default(),
    );
    let err = result.unwrap_err();
    assert_eq!(err.code, MessageCode::ScriptFailure);
    assert_eq!(err.args, vec!["bad input"]);
    assert_eq!(ctx.completion_message(), Some("bad input"));
}

#[test]
fn lambdas_capture_enclosing_bindings_by_reference() {
    let result = run_json(
        concat!(
            "var factor = 10\n",
            "data.out = Map(data.items, (x) => x * factor)",
        ),
        r#"{"items": [1, 2, 3], "out": null}"#,
    )
    .unwrap();
    assert_eq!(
        result.as_object().unwrap().get("out"),
        Some(&json(r#"[10, 20, 30]"#))
    );
}

#[test]
fn combinators_compose() {
    let result = run_json(
        concat!(
            "var evens = Where(data.items, (x) => x % 2 == 0)\n",
            "data.sum = Reduce(evens, (acc, x) => acc + x, 0)\n",
            "data.any = Any(data.items, (x) => x > 4)\n",
            "data.sorted = SortBy(data.people, (p) => p.age)",
        ),
        r#"{"items": [1, 2, 3, 4, 5], "people": [{"age": 40}, {"age": 20}]}"#,
    )
    .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(object.get("sum"), Some(&Value::Number(6.0)));
    assert_eq!(object.get("any"), Some(&Value::Bool(true)));
    assert_eq!(
        object.get("sorted"),
        Some(&json(r#"[{"age": 20}, {"age": 40}]"#))
    );
}

#[test]
fn statement_limit_terminates_every_loop_form() {
    for source in [
        "while true { }",
        "for x from 1 to 1000000 { }",
        "foreach x in Range(0, 100000) { }",
    ] {
        let (result, _) = run_with_options(
            source,
            json(r#"{}"#),
            ExecutionOptions::default().with_max_statements(100),
        );
        let err = result.unwrap_err();
        assert_eq!(err.code, MessageCode::StatementLimitExceeded, "{source}");
    }
}

#[test]
fn statement_limit_counts_exactly() {
    let (result, ctx) = run_with_options(
        "while true { }",
        json(r#"{}"#),
        ExecutionOptions::default().with_max_statements(100),
    );
    assert_eq!(
        result.unwrap_err().code,
        MessageCode::StatementLimitExceeded
    );
    // The breaching account is the 101st; exactly 100 were granted.
    assert_eq!(ctx.statements(), 101);
}

#[test]
fn loop_iteration_limit_is_cumulative_across_loops() {
    let (result, _) = run_with_options(
        "for a from 0 to 10 { }\nfor b from 0 to 10 { }",
        json(r#"{}"#),
        ExecutionOptions::default().with_max_loop_iterations(15),
    );
    assert_eq!(
        result.unwrap_err().code,
        MessageCode::LoopIterationLimitExceeded
    );
}

#[test]
fn call_depth_limit_applies_to_lambda_invocations() {
    let (result, _) = run_with_options(
        "data.out = Map(data.items, (x) => x + 1)",
        json(r#"{"items": [1], "out": null}"#),
        ExecutionOptions::default().with_max_call_depth(1),
    );
    assert_eq!(
        result.unwrap_err().code,
        MessageCode::CallDepthLimitExceeded
    );
}

#[test]
fn unlimited_options_allow_deep_work() {
    let (result, _) = run_with_options(
        "for x from 1 to 5000 { data.n += 1 }",
        json(r#"{"n": 0}"#),
        ExecutionOptions::default(),
    );
    assert_eq!(result.unwrap(), json(r#"{"n": 5000}"#));
}

#[test]
fn cancellation_before_first_statement() {
    let (program, functions) = compile("data.n = 1");
    let token = CancellationToken::new();
    token.cancel();
    let mut ctx = ExecutionContext::with_host_token(ExecutionOptions::default(), &token);
    let err = run_program(&program, &functions, json(r#"{"n": 0}"#), &mut ctx).unwrap_err();
    assert_eq!(err.code, MessageCode::CancelledByHost);
}

#[test]
fn builtin_argument_kinds_checked_against_signature() {
    let err = run_json("data.out = Append(1, 2)", r#"{}"#).unwrap_err();
    assert_eq!(err.code, MessageCode::InvalidArgumentType);
    assert_eq!(err.args[1], "Append");
}

#[test]
fn type_test_and_unary_operators() {
    let result = run_json(
        concat!(
            "data.a = data.n is number\n",
            "data.b = data.n is string\n",
            "data.c = not data.missing\n",
            "data.d = -data.n",
        ),
        r#"{"n": 5}"#,
    )
    .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(object.get("a"), Some(&Value::Bool(true)));
    assert_eq!(object.get("b"), Some(&Value::Bool(false)));
    assert_eq!(object.get("c"), Some(&Value::Bool(true)));
    assert_eq!(object.get("d"), Some(&Value::Number(-5.0)));
}

#[test]
fn increment_statement_sugar() {
    let result = run_json("data.n++\ndata.n++\ndata.m--", r#"{"n": 0, "m": 0}"#).unwrap();
    assert_eq!(result, json(r#"{"n": 2, "m": -1}"#));
}

#[test]
fn stdlib_utilities_round_trip() {
    let result = run_json(
        concat!(
            "data.clone = Clone(data.user)\n",
            "data.clone.name = \"changed\"\n",
            "data.equal = Equal(data.user, data.clone)\n",
            "data.json = ToJson(data.user)\n",
            "data.back = FromJson(data.json)",
        ),
        r#"{"user": {"name": "Alice"}}"#,
    )
    .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(object.get("equal"), Some(&Value::Bool(false)));
    assert_eq!(
        object.get("user"),
        Some(&json(r#"{"name": "Alice"}"#)),
        "clone mutation must not touch the original"
    );
    assert_eq!(object.get("back"), object.get("user"));
}

#[test]
fn diff_treats_two_nulls_as_equal() {
    let result = run_json(
        "data.diff = Diff(data.a, data.b)",
        r#"{"a": null, "b": null}"#,
    )
    .unwrap();
    assert_eq!(result.as_object().unwrap().get("diff"), Some(&Value::Null));
}
