//! Tests for commands: construction, parameter registration, positional
//! checks and external handlers.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rstest::rstest;

use clidispatch::domain::{
    Arity, Catalog, Command, CommandBuilder, DispatchError, ExecContext, ParamType, Parameter,
    ParameterSet, RunFlags, SlotKind, Unit, Value,
};
use clidispatch::infrastructure::traits::{CommandRunner, ExternalOutput};
use clidispatch::infrastructure::{CapturedOutput, Console};

/// Mock runner recording invocations and replaying a canned result.
struct MockRunner {
    known: Vec<PathBuf>,
    output: ExternalOutput,
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl MockRunner {
    fn new(known: &[&str], output: ExternalOutput) -> Self {
        Self {
            known: known.iter().map(PathBuf::from).collect(),
            output,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &Path, args: &[String]) -> io::Result<ExternalOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_path_buf(), args.to_vec()));
        Ok(self.output.clone())
    }

    fn resolve(&self, program: &Path) -> Option<PathBuf> {
        self.known.iter().find(|p| p.as_path() == program).cloned()
    }
}

/// Run a command outside the driver with a throwaway context.
fn run_command(command: &mut Command, positional: &[&str]) -> Result<Value, DispatchError> {
    let mut flags = RunFlags::default();
    let mut console = Console::new(io::empty(), CapturedOutput::new());
    let given = BTreeMap::new();
    let catalog = Catalog::default();
    let mut ctx = ExecContext::new(
        Unit::command(command.name()),
        &mut flags,
        &mut console,
        &given,
        &catalog,
        Duration::from_millis(10),
    );
    let positional: Vec<String> = positional.iter().map(|s| s.to_string()).collect();
    command.run(&mut ctx, &positional)
}

// ============================================================
// Construction
// ============================================================

#[test]
fn given_no_action_and_no_external_when_building_then_block_missing() {
    let err = Command::builder("empty").build().unwrap_err();
    assert!(matches!(err, DispatchError::BlockMissing(ref n) if n == "empty"));
}

#[test]
fn given_unresolvable_external_when_building_then_block_missing() {
    let runner = Arc::new(MockRunner::new(&[], ExternalOutput::default()));

    let err = Command::builder("deploy")
        .external("deploy-tool")
        .runner(runner)
        .build()
        .unwrap_err();

    assert!(matches!(err, DispatchError::BlockMissing(ref n) if n == "deploy"));
}

#[test]
fn given_alias_for_unregistered_parameter_when_registering_then_unknown_parameter() {
    let mut command = Command::new("build", |_| Ok(Value::Unit));
    command.register(Parameter::flag("release")).unwrap();

    assert!(command.register_aliases([("rel", "release")]).is_ok());
    let err = command.register_aliases([("x", "missing")]).unwrap_err();

    assert!(matches!(
        err,
        DispatchError::UnknownParameter { ref scope, ref name } if scope == "build" && name == "missing"
    ));
    assert_eq!(command.parameters().resolve("rel"), Some("release"));
}

#[test]
fn given_duplicate_parameter_when_registering_then_already_registered() {
    let mut command = Command::new("build", |_| Ok(Value::Unit));
    command.register(Parameter::flag("release")).unwrap();

    let err = command.register(Parameter::flag("release")).unwrap_err();

    assert!(matches!(err, DispatchError::AlreadyRegistered(_)));
}

// ============================================================
// Positional arguments
// ============================================================

#[test]
fn given_slots_when_asking_arity_and_usage_then_derived_from_declaration() {
    let command = Command::builder("cp")
        .arg("from")
        .optional_arg("to")
        .action(|_| Ok(Value::Unit))
        .build()
        .unwrap();
    assert_eq!(command.arity(), Some(Arity::Between(1, 2)));
    assert_eq!(command.usage(), "<from> [to]");
    assert_eq!(command.slots()[1].kind, SlotKind::Optional);

    let rest = Command::builder("cat")
        .arg("first")
        .rest_args("more")
        .action(|_| Ok(Value::Unit))
        .build()
        .unwrap();
    assert_eq!(rest.arity(), Some(Arity::AtLeast(1)));
    assert_eq!(rest.usage(), "<first> [more...]");

    assert_eq!(Command::new("any", |_| Ok(Value::Unit)).arity(), None);
}

#[rstest]
#[case::one(&["a"], Value::from("a|-"))]
#[case::two(&["a", "b"], Value::from("a|b"))]
fn given_optional_slot_when_running_then_binds_what_is_given(
    #[case] positional: &[&str],
    #[case] expected: Value,
) {
    let mut command = Command::builder("cp")
        .arg("from")
        .optional_arg("to")
        .action(|ctx| {
            let from = ctx.require("from")?.to_string();
            let to = ctx.arg("to").map(Value::to_string).unwrap_or_else(|| "-".into());
            Ok(Value::Str(format!("{from}|{to}")))
        })
        .build()
        .unwrap();

    assert_eq!(run_command(&mut command, positional).unwrap(), expected);
    assert!(command.is_active());
    command.reset();
    assert!(!command.is_active());
    assert!(command.arguments().is_empty());
}

#[test]
fn given_typed_slots_when_running_then_values_are_coerced() {
    let mut command = Command::builder("scale")
        .typed_arg("factor", ParamType::Float)
        .typed_rest_args("values", ParamType::Int)
        .action(|ctx| {
            let factor = ctx.require("factor")?.as_float().unwrap_or(1.0);
            let values = ctx.arg("values").and_then(Value::as_list).unwrap_or(&[]);
            let total: f64 = values.iter().filter_map(Value::as_float).sum();
            Ok(Value::Float(total * factor))
        })
        .build()
        .unwrap();

    assert_eq!(
        run_command(&mut command, &["0.5", "2", "4"]).unwrap(),
        Value::Float(3.0)
    );
    let err = run_command(&mut command, &["half", "2"]).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::TypeMismatch { position: 1, expected: ParamType::Float, .. }
    ));
}

#[rstest]
#[case::required_after_optional(Command::builder("mv").optional_arg("mode").arg("file"), "file")]
#[case::required_after_rest(Command::builder("cp").rest_args("srcs").arg("dest"), "dest")]
#[case::optional_after_rest(Command::builder("ls").rest_args("dirs").optional_arg("sort"), "sort")]
fn given_misordered_slots_when_building_then_slot_order_error(
    #[case] builder: CommandBuilder,
    #[case] misplaced: &str,
) {
    let err = builder.action(|_| Ok(Value::Unit)).build().unwrap_err();

    assert!(matches!(err, DispatchError::SlotOrder { ref slot, .. } if slot == misplaced));
}

#[test]
fn given_required_optional_rest_order_when_building_then_command_is_built() {
    let command = Command::builder("pack")
        .arg("name")
        .optional_arg("level")
        .rest_args("files")
        .action(|_| Ok(Value::Unit))
        .build()
        .unwrap();

    assert_eq!(command.usage(), "<name> [level] [files...]");
}

#[test]
fn given_unknown_local_marker_when_dispatching_args_then_unknown_parameter() {
    let mut command = Command::builder("run")
        .option(Parameter::flag("fast"))
        .action(|_| Ok(Value::Unit))
        .build()
        .unwrap();
    let mut globals = ParameterSet::new();

    let err = command
        .dispatch_args(vec!["--slow".to_string()], &mut globals)
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::UnknownParameter { ref scope, ref name } if scope == "run" && name == "--slow"
    ));
}

#[test]
fn given_global_marker_among_command_tokens_when_dispatching_args_then_falls_back() {
    let mut command = Command::builder("run")
        .option(Parameter::option("jobs", Arity::Exact(1)))
        .action(|_| Ok(Value::Unit))
        .build()
        .unwrap();
    let mut globals = ParameterSet::new();
    globals.register(Parameter::option("level", Arity::Exact(1))).unwrap();

    let plan = command
        .dispatch_args(
            ["--jobs", "2", "--level", "9", "file"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            &mut globals,
        )
        .unwrap();

    assert_eq!(plan.locals, vec!["jobs".to_string()]);
    assert_eq!(plan.globals, vec!["level".to_string()]);
    assert_eq!(plan.arguments, vec!["file".to_string()]);
    assert_eq!(globals.get("level").unwrap().args(), &["9".to_string()]);
}

// ============================================================
// External handlers
// ============================================================

#[test]
fn given_external_handler_when_running_then_program_gets_positional_args() {
    let runner = Arc::new(MockRunner::new(
        &["/usr/bin/tool"],
        ExternalOutput {
            status: Some(0),
            stdout: "done\n".into(),
            stderr: String::new(),
        },
    ));
    let mut command = Command::builder("tool")
        .external("/usr/bin/tool")
        .runner(runner.clone())
        .build()
        .unwrap();
    assert!(command.is_external());

    let value = run_command(&mut command, &["a", "b"]).unwrap();

    assert_eq!(value, Value::from("done"));
    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, PathBuf::from("/usr/bin/tool"));
    assert_eq!(calls[0].1, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn given_failing_external_handler_when_running_then_external_error_with_stderr() {
    let runner = Arc::new(MockRunner::new(
        &["tool"],
        ExternalOutput {
            status: Some(2),
            stdout: String::new(),
            stderr: "bad input\n".into(),
        },
    ));
    let mut command = Command::builder("tool")
        .external("tool")
        .runner(runner)
        .build()
        .unwrap();

    let err = run_command(&mut command, &[]).unwrap_err();

    assert!(matches!(
        err,
        DispatchError::External { ref command, ref message } if command == "tool" && message == "bad input"
    ));
}

#[cfg(unix)]
#[test]
fn given_real_program_when_running_external_command_then_captures_stdout() {
    let mut command = Command::external("echo", "echo").unwrap();

    let value = run_command(&mut command, &["hello"]).unwrap();

    assert_eq!(value, Value::from("hello"));
}
