//! End-to-end pipeline scenarios: literal script in, literal value out.

use std::sync::Arc;

use jam_core::diag::{MessageCode, Severity, TemplateProvider};
use jam_core::limits::{CancellationToken, ExecutionOptions};
use jam_core::signature::{FunctionSignature, ParameterType};
use jam_core::value::Value;
use jam_engine::{Engine, MemoryStatsSink, PipelineStage};
use jam_runtime::NativeFunction;

fn json(text: &str) -> Value {
    Value::parse_json(text).expect("valid json")
}

#[test]
fn scenario_return_property() {
    let report = Engine::new().run_json("return data.name", r#"{"name": "Alice"}"#);
    assert!(report.success, "{:?}", report.diagnostics);
    assert_eq!(report.value, Some(Value::String("Alice".into())));
    assert!(report.diagnostics.is_empty());
}

#[test]
fn scenario_increment_field() {
    let report = Engine::new().run_json("data.n = data.n + 1", r#"{"n": 41}"#);
    assert!(report.success);
    assert_eq!(report.value, Some(json(r#"{"n": 42}"#)));
}

#[test]
fn scenario_counted_for_loop_appends() {
    let report = Engine::new().run_json(
        "for x from 1 to 5 step 1 ascending { data.items = Append(data.items, x) }",
        r#"{"items": []}"#,
    );
    assert!(report.success, "{:?}", report.diagnostics);
    assert_eq!(report.value, Some(json(r#"{"items": [1, 2, 3, 4, 5]}"#)));
}

#[test]
fn scenario_division_by_zero_has_code_and_location() {
    let report = Engine::new().run_json("var x = 10 / 0", r#"{}"#);
    assert!(!report.success);
    assert_eq!(report.diagnostics.len(), 1);
    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.code, MessageCode::DivisionByZero);
    assert_eq!(diagnostic.code.as_str(), "JM5200");
    let span = diagnostic.span.expect("location attached");
    assert_eq!(span.line, 1);
    assert_eq!(span.column, 1);
}

#[test]
fn scenario_statement_limit_on_infinite_loop() {
    let engine =
        Engine::new().with_options(ExecutionOptions::default().with_max_statements(100));
    let report = engine.run_json("while true { }", r#"{}"#);
    assert!(!report.success);
    assert_eq!(report.diagnostics[0].code, MessageCode::StatementLimitExceeded);
    assert_eq!(report.diagnostics[0].code.as_str(), "JM5900");
}

#[test]
fn scenario_type_hint_violation() {
    let report = Engine::new().run_json("var x: number = \"hi\"", r#"{}"#);
    assert!(!report.success);
    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.code, MessageCode::InvalidType);
    assert_eq!(diagnostic.code.as_str(), "JM5100");
    assert_eq!(diagnostic.args, vec!["x", "Number", "String"]);
}

#[test]
fn successful_runs_carry_no_error_diagnostics() {
    // The unreachable trailing statement produces a warning, which is the
    // strongest severity a successful run may carry.
    let report = Engine::new().run_json(
        "data.evens = Where(data.items, (x) => x % 2 == 0)\nreturn\nvar dead = 1",
        r#"{"items": [1, 2, 3, 4]}"#,
    );
    assert!(report.success);
    assert!(!report.diagnostics.is_empty());
    assert!(report
        .diagnostics
        .iter()
        .all(|d| d.severity != Severity::Error));
    assert_eq!(
        report.value.unwrap().as_object().unwrap().get("evens"),
        Some(&json("[2, 4]"))
    );
}

#[test]
fn limits_off_matches_limits_on_for_scripts_within_budget() {
    let source = "for x from 1 to 50 { data.total += x }";
    let bounded = Engine::new().with_options(
        ExecutionOptions::default()
            .with_max_statements(10_000)
            .with_max_loop_iterations(10_000)
            .with_max_call_depth(8),
    );
    let unbounded = Engine::new();
    let a = bounded.run_json(source, r#"{"total": 0}"#);
    let b = unbounded.run_json(source, r#"{"total": 0}"#);
    assert!(a.success && b.success);
    assert_eq!(a.value, b.value);
}

#[test]
fn statement_limit_terminates_every_loop_form() {
    for source in [
        "while true { }",
        "for x from 1 to 100000000 { }",
        "foreach x in Range(0, 100000) { data.n = x }",
    ] {
        let engine =
            Engine::new().with_options(ExecutionOptions::default().with_max_statements(50));
        let report = engine.run_json(source, r#"{"n": 0}"#);
        assert!(!report.success, "{source}");
        assert_eq!(
            report.diagnostics.last().unwrap().code,
            MessageCode::StatementLimitExceeded,
            "{source}"
        );
    }
}

#[test]
fn cancelling_before_the_first_statement_yields_cancelled_by_host() {
    let engine = Engine::new();
    let script = engine.compile("data.n = data.n + 1").expect("compiles");
    let token = CancellationToken::new();
    token.cancel();
    let report = engine.execute_with_token(&script, json(r#"{"n": 1}"#), &token);
    assert!(!report.success);
    assert_eq!(report.diagnostics[0].code, MessageCode::CancelledByHost);
}

#[test]
fn host_function_extends_the_builtin_set() {
    let mut engine = Engine::new();
    engine.register_function(NativeFunction::new(
        FunctionSignature::new("Greet")
            .required("name", ParameterType::String)
            .returns(ParameterType::String),
        |inv| Ok(Value::String(format!("hello {}", inv.string(0)?))),
    ));
    let report = engine.run_json("data.msg = Greet(data.name)", r#"{"name": "jam"}"#);
    assert!(report.success, "{:?}", report.diagnostics);
    assert_eq!(
        report.value.unwrap().as_object().unwrap().get("msg"),
        Some(&Value::String("hello jam".into()))
    );
}

#[test]
fn host_override_of_builtin_warns_and_wins() {
    let mut engine = Engine::new();
    engine.register_function(NativeFunction::new(
        FunctionSignature::new("TypeOf")
            .required("value", ParameterType::Any)
            .returns(ParameterType::String),
        |_| Ok(Value::String("host".into())),
    ));
    let report = engine.run_json("data.t = TypeOf(1)", r#"{}"#);
    assert!(report.success);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.code == MessageCode::FunctionOverride && d.severity == Severity::Warning));
    assert_eq!(
        report.value.unwrap().as_object().unwrap().get("t"),
        Some(&Value::String("host".into()))
    );
}

#[test]
fn undefined_function_is_a_link_error() {
    let diagnostics = Engine::new().compile("data.x = Nope(1)").unwrap_err();
    assert_eq!(diagnostics[0].code, MessageCode::UndefinedFunction);
    assert_eq!(diagnostics[0].code.subsystem(), "linker");
}

#[test]
fn compile_errors_accumulate() {
    let diagnostics = Engine::new()
        .compile("var x = ]\nvar y = )")
        .unwrap_err();
    assert!(diagnostics.len() >= 2, "{diagnostics:?}");
}

#[test]
fn artifact_round_trips_and_relinks() {
    let engine = Engine::new();
    let bytes = engine
        .compile_to_artifact(
            "data.items = Append(data.items, 9)",
            Some("appender".into()),
        )
        .expect("artifact builds");

    // Loading re-runs linking against the current function table: with a
    // host override in place, the override warning appears on load.
    let mut override_engine = Engine::new();
    override_engine.register_function(NativeFunction::new(
        FunctionSignature::new("Append")
            .required("array", ParameterType::Array)
            .required("value", ParameterType::Any)
            .returns(ParameterType::Array),
        |inv| {
            let mut items = inv.array(0)?.clone();
            items.push(Value::String("host".into()));
            Ok(Value::Array(items))
        },
    ));
    let script = override_engine
        .compile_from_artifact(&bytes)
        .expect("artifact loads");
    assert!(script
        .warnings
        .iter()
        .any(|d| d.code == MessageCode::FunctionOverride));
    let report = override_engine.execute(&script, json(r#"{"items": []}"#));
    assert_eq!(
        report.value.unwrap().as_object().unwrap().get("items"),
        Some(&json(r#"["host"]"#))
    );

    // The stock engine executes the artifact with the builtin behavior.
    let script = engine.compile_from_artifact(&bytes).expect("artifact loads");
    let report = engine.execute(&script, json(r#"{"items": []}"#));
    assert_eq!(
        report.value.unwrap().as_object().unwrap().get("items"),
        Some(&json("[9]"))
    );
}

#[test]
fn corrupted_artifact_is_rejected() {
    let engine = Engine::new();
    let mut bytes = engine
        .compile_to_artifact("data.n = 1", None)
        .expect("artifact builds");
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert!(engine.compile_from_artifact(&bytes).is_err());
}

#[test]
fn stats_sink_sees_all_stages() {
    let sink = Arc::new(MemoryStatsSink::new());
    let engine = Engine::new().with_stats_sink(sink.clone());
    let report = engine.run_json("data.n = data.n + 1", r#"{"n": 1}"#);
    assert!(report.success);
    assert_eq!(
        sink.stages(),
        vec![
            PipelineStage::Parse,
            PipelineStage::Validate,
            PipelineStage::Link,
            PipelineStage::Compile,
            PipelineStage::Execute,
        ]
    );

    let sink = Arc::new(MemoryStatsSink::new());
    let engine = Engine::new().with_stats_sink(sink.clone());
    let bytes = engine.compile_to_artifact("data.n = 1", None).unwrap();
    let script = engine.compile_from_artifact(&bytes).unwrap();
    engine.execute(&script, json(r#"{"n": 0}"#));
    assert!(sink.stages().contains(&PipelineStage::Deserialize));
}

struct Spanish;

impl TemplateProvider for Spanish {
    fn template(&self, code: MessageCode) -> Option<String> {
        (code == MessageCode::DivisionByZero).then(|| "División por cero".to_string())
    }
}

#[test]
fn template_provider_localizes_with_english_fallback() {
    let engine = Engine::new().with_template_provider(Arc::new(Spanish));
    let report = engine.run_json("var x = 10 / 0\nvar y = 10 % 0", r#"{}"#);
    let diagnostic = &report.diagnostics[0];
    assert_eq!(engine.render(diagnostic), "División por cero");

    let report = engine.run_json("var y = 10 % 0", r#"{}"#);
    assert_eq!(engine.render(&report.diagnostics[0]), "Modulo by zero");
}

#[test]
fn fail_surfaces_script_failure_and_completion_message() {
    let report = Engine::new().run_json(
        "if data.n < 0 { fail \"negative input\" }\nreturn",
        r#"{"n": -1}"#,
    );
    assert!(!report.success);
    assert_eq!(report.diagnostics[0].code, MessageCode::ScriptFailure);
    assert_eq!(report.completion_message.as_deref(), Some("negative input"));
}

#[test]
fn invalid_input_json_reports_rather_than_panics() {
    let report = Engine::new().run_json("return", "{not json");
    assert!(!report.success);
    assert_eq!(report.diagnostics[0].code, MessageCode::InvalidJson);
}
