//! End-to-end runs through the engine entry point.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use whistle_data::Data;
use whistle_eval::{
    CancellationToken, Engine, EvalErrorKind, NativeFunction, PackageContext, ParamType,
    WhistleFunction, MERGE_MODES_EXPERIMENT,
};
use whistle_ir::{
    ArgumentDef, FieldMapping, FunctionCall, FunctionDefinition, MergeMode, PackageRef,
    ValueSource,
};

fn c(entries: &[(&str, Data)]) -> Data {
    Data::container_of(
        entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone())),
    )
}

#[test]
fn run_projects_arguments_into_output_fields() {
    // def projectName(name, suffix) { full: concat(name, suffix); kind: "project" }
    let def = FunctionDefinition::new("projectName")
        .with_args(vec![ArgumentDef::new("name"), ArgumentDef::new("suffix")])
        .with_mappings(vec![
            FieldMapping::field(
                "full",
                ValueSource::Call(FunctionCall::new(
                    PackageRef::named("strings"),
                    "concat",
                    vec![ValueSource::local("name"), ValueSource::local("suffix")],
                )),
            ),
            FieldMapping::field("kind", ValueSource::ConstString("project".to_string())),
        ]);

    let concat = NativeFunction::new(
        "strings",
        "concat",
        vec![ParamType::Any, ParamType::Any],
        |_, args| {
            let mut out = String::new();
            for arg in args {
                if let Some(s) = arg.as_str() {
                    out.push_str(s);
                }
            }
            Ok(Data::str(out))
        },
    );

    let engine = Engine::builder()
        .register_function("mappings", def)
        .register_callable("strings", Arc::new(concat))
        .main_function("mappings", "projectName")
        .build();

    let result = engine
        .run(&[Data::str("whistle"), Data::str("-runtime")])
        .unwrap();
    assert_eq!(
        result.output,
        c(&[
            ("full", Data::str("whistle-runtime")),
            ("kind", Data::str("project")),
        ])
    );
    assert_eq!(result.meta, Data::empty_container());
}

#[test]
fn arity_check_names_missing_and_excess_arguments() {
    let def = FunctionDefinition::new("needsOne")
        .with_args(vec![ArgumentDef::new("only")])
        .with_mappings(vec![FieldMapping::output(ValueSource::local("only"))]);
    let function = WhistleFunction::new(def, PackageContext::new("mappings"));

    let engine = Engine::builder().build();
    let ctx = engine.root_context("mappings", CancellationToken::new());

    let too_few = ctx.invoke_wrapped(&function, &[]).unwrap_err();
    match too_few.kind {
        EvalErrorKind::ArityMismatch {
            expected,
            got,
            missing,
            ..
        } => {
            assert_eq!((expected, got), (1, 0));
            assert_eq!(missing, vec!["only".to_string()]);
        }
        other => panic!("expected ArityMismatch, got {other:?}"),
    }

    let too_many = ctx
        .invoke_wrapped(&function, &[Data::num(1.0), Data::num(2.0)])
        .unwrap_err();
    assert_eq!(
        too_many.message,
        "needsOne expects 1 argument, got 2 (1 excess)"
    );
}

#[test]
fn required_modifier_skips_the_body_on_absent_arguments() {
    let recorded: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let record = {
        let recorded = recorded.clone();
        NativeFunction::new("probe", "record", vec![ParamType::Any], move |_, args| {
            recorded
                .lock()
                .push(args.first().and_then(Data::as_str).unwrap_or("?").to_string());
            Ok(Data::Null)
        })
    };

    // def guarded(required x) { $this: record("ran") }
    let def = FunctionDefinition::new("guarded")
        .with_args(vec![ArgumentDef::new("x").with_modifier("required")])
        .with_mappings(vec![FieldMapping::output(ValueSource::Call(
            FunctionCall::new(
                PackageRef::named("probe"),
                "record",
                vec![ValueSource::ConstString("ran".to_string())],
            ),
        ))]);

    let engine = Engine::builder()
        .register_function("mappings", def)
        .register_callable("probe", Arc::new(record))
        .main_function("mappings", "guarded")
        .build();

    // Absent argument: the body never runs and the call yields null.
    let skipped = engine.run(&[Data::Null]).unwrap();
    assert_eq!(skipped.output, Data::Null);
    assert!(recorded.lock().is_empty());

    // Present argument: the body runs.
    let ran = engine.run(&[Data::num(1.0)]).unwrap();
    assert_eq!(ran.output, Data::Null);
    assert_eq!(*recorded.lock(), vec!["ran".to_string()]);
}

#[test]
fn declared_options_are_scoped_to_the_function_body() {
    // The inner function declares the merge-modes experiment and uses an
    // explicit append; the outer function uses an explicit append without
    // declaring anything and must fail.
    let inner = FunctionDefinition::new("collector")
        .with_options(vec![MERGE_MODES_EXPERIMENT.to_string()])
        .with_mappings(vec![
            FieldMapping::output(ValueSource::ConstInt(1)).with_merge_mode(MergeMode::Append),
            FieldMapping::output(ValueSource::ConstInt(2)).with_merge_mode(MergeMode::Append),
        ]);
    let outer = FunctionDefinition::new("ungated").with_mappings(vec![
        FieldMapping::output(ValueSource::ConstInt(1)).with_merge_mode(MergeMode::Append),
    ]);

    let engine = Engine::builder()
        .register_function("mappings", inner)
        .register_function("mappings", outer)
        .main_function("mappings", "collector")
        .build();

    let result = engine.run(&[]).unwrap();
    assert_eq!(
        result.output,
        Data::array(vec![Data::num(1.0), Data::num(2.0)])
    );

    let mut ctx = engine.root_context("mappings", CancellationToken::new());
    let err = ctx
        .call_function(&PackageRef::named("mappings"), "ungated", &[])
        .unwrap_err();
    assert!(matches!(
        err.kind,
        EvalErrorKind::UnsupportedOperation { .. }
    ));
}

#[test]
fn undeclared_options_fail_as_unknown() {
    let def = FunctionDefinition::new("broken")
        .with_options(vec!["no_such_option".to_string()])
        .with_mappings(vec![]);
    let engine = Engine::builder()
        .register_function("mappings", def)
        .main_function("mappings", "broken")
        .build();
    let err = engine.run(&[]).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::UnknownOption { .. }));
}

#[test]
fn inheriting_functions_see_caller_variables() {
    // def outer() { var shared: "visible"; out: reader() }
    // def reader() inherit { $this: shared }
    let reader = FunctionDefinition::new("reader")
        .inheriting_parent_vars()
        .with_mappings(vec![FieldMapping::output(ValueSource::local("shared"))]);
    let outer = FunctionDefinition::new("outer").with_mappings(vec![
        FieldMapping::var("shared", "", ValueSource::ConstString("visible".to_string())),
        FieldMapping::field(
            "out",
            ValueSource::Call(FunctionCall::new(
                PackageRef::named("mappings"),
                "reader",
                vec![],
            )),
        ),
    ]);

    let engine = Engine::builder()
        .register_function("mappings", reader)
        .register_function("mappings", outer)
        .main_function("mappings", "outer")
        .build();

    let result = engine.run(&[]).unwrap();
    assert_eq!(result.output, c(&[("out", Data::str("visible"))]));
}

#[test]
fn callee_package_context_resolves_unqualified_sinks() {
    // The lib function's unqualified sink resolves through the callee's
    // own package visibility, not the caller's.
    let sink_calls: Arc<Mutex<Vec<Data>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let sink_calls = sink_calls.clone();
        NativeFunction::new("lib", "emit", vec![ParamType::Any], move |_, args| {
            sink_calls.lock().push(args[0].clone());
            Ok(Data::Null)
        })
    };

    let lib_fn = FunctionDefinition::new("viaSink").with_mappings(vec![FieldMapping {
        value: ValueSource::ConstString("payload".to_string()),
        target: Some(whistle_ir::MappingTarget::Custom {
            package: None,
            name: "emit".to_string(),
            args: vec![],
        }),
        iterate: false,
        merge_mode: None,
    }]);

    let main = FunctionDefinition::new("main").with_mappings(vec![FieldMapping::field(
        "done",
        ValueSource::Call(FunctionCall::new(
            PackageRef::named("lib"),
            "viaSink",
            vec![],
        )),
    )]);

    let engine = Engine::builder()
        .register_function("lib", lib_fn)
        .register_callable("lib", Arc::new(sink))
        .register_function("app", main)
        .main_function("app", "main")
        .build();

    engine.run(&[]).unwrap();
    assert_eq!(*sink_calls.lock(), vec![Data::str("payload")]);
}

#[test]
fn run_returns_accumulated_metadata() {
    let note = NativeFunction::new("diag", "note", vec![ParamType::Any], |ctx, args| {
        let existing = ctx
            .meta()
            .get_meta("notes")
            .unwrap_or_else(|| Data::array(vec![]));
        let merged = whistle_eval::merge::merge_values(
            existing,
            Data::array(vec![args.first().cloned().unwrap_or(Data::Null)]),
        );
        ctx.meta().set_meta("notes", merged);
        Ok(Data::Null)
    });

    let def = FunctionDefinition::new("main").with_mappings(vec![
        FieldMapping::output(ValueSource::Call(FunctionCall::new(
            PackageRef::named("diag"),
            "note",
            vec![ValueSource::ConstString("first".to_string())],
        ))),
        FieldMapping::output(ValueSource::Call(FunctionCall::new(
            PackageRef::named("diag"),
            "note",
            vec![ValueSource::ConstString("second".to_string())],
        ))),
    ]);

    let engine = Engine::builder()
        .register_function("mappings", def)
        .register_callable("diag", Arc::new(note))
        .main_function("mappings", "main")
        .build();

    let result = engine.run(&[]).unwrap();
    assert_eq!(result.output, Data::Null);
    assert_eq!(
        result.meta,
        c(&[(
            "notes",
            Data::array(vec![Data::str("first"), Data::str("second")]),
        )])
    );
}

#[test]
fn cancelled_token_stops_the_run_at_the_first_call_boundary() {
    let def = FunctionDefinition::new("main").with_mappings(vec![]);
    let engine = Engine::builder()
        .register_function("mappings", def)
        .main_function("mappings", "main")
        .build();

    let token = CancellationToken::new();
    token.cancel("shutting down");
    let err = engine.run_with_token(&[], token).unwrap_err();
    assert!(
        matches!(err.kind, EvalErrorKind::Cancelled { ref reason } if reason == "shutting down")
    );
}

#[test]
fn missing_main_function_is_an_error() {
    let engine = Engine::builder().build();
    let err = engine.run(&[]).unwrap_err();
    assert_eq!(err.message, "no main function designated");
}

#[test]
fn whole_output_return_defaults_to_null() {
    // A function whose mappings never touch the output returns null.
    let def = FunctionDefinition::new("noop").with_mappings(vec![FieldMapping::var(
        "scratch",
        "",
        ValueSource::ConstInt(1),
    )]);
    let engine = Engine::builder()
        .register_function("mappings", def)
        .main_function("mappings", "noop")
        .build();
    assert_eq!(engine.run(&[]).unwrap().output, Data::Null);
}
