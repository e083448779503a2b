//! Tests for the argument dispatcher: command selection, global scan and
//! hand-off to command-local dispatch.

use indexmap::IndexMap;
use rstest::{fixture, rstest};

use clidispatch::application::{DispatchPlan, Dispatcher};
use clidispatch::domain::{AliasTable, Arity, Command, DispatchError, Parameter, ParameterSet, Value};

struct Registry {
    commands: IndexMap<String, Command>,
    aliases: AliasTable,
    globals: ParameterSet,
}

impl Registry {
    fn dispatch(&mut self, default: Option<&str>, tokens: &[&str]) -> Result<DispatchPlan, DispatchError> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        Dispatcher::new(&mut self.commands, &self.aliases, &mut self.globals, default).dispatch(&tokens)
    }
}

#[fixture]
fn registry() -> Registry {
    let mut commands = IndexMap::new();
    let mut run = Command::builder("run")
        .alias("r")
        .option(Parameter::flag("fast"))
        .option(Parameter::option("jobs", Arity::Exact(1)))
        .rest_args("files")
        .action(|_| Ok(Value::Unit))
        .build()
        .unwrap();
    run.apply_aliases(true);
    commands.insert("run".to_string(), run);
    commands.insert("list".to_string(), Command::new("list", |_| Ok(Value::Unit)));

    let mut globals = ParameterSet::new();
    globals.register(Parameter::flag("debug")).unwrap();
    globals
        .register(Parameter::option("level", Arity::Exact(1)).alias("lvl"))
        .unwrap();
    globals
        .register(Parameter::option("include", Arity::AtLeast(1)))
        .unwrap();
    globals.apply_aliases(true);

    let mut aliases = AliasTable::default();
    aliases.rebuild(
        commands.values().map(|c| (c.name(), c.declared_aliases())),
        false,
    );

    Registry {
        commands,
        aliases,
        globals,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[rstest]
fn given_command_and_globals_when_dispatching_then_plan_splits_tokens(mut registry: Registry) {
    let plan = registry
        .dispatch(None, &["run", "--level", "3", "a.txt", "-d", "b.txt"])
        .unwrap();

    assert_eq!(plan.command, "run");
    assert_eq!(plan.globals, strings(&["level", "debug"]));
    assert!(plan.locals.is_empty());
    assert_eq!(plan.arguments, strings(&["a.txt", "b.txt"]));
    assert_eq!(registry.globals.get("level").unwrap().args(), &["3".to_string()]);
}

#[rstest]
fn given_command_alias_when_dispatching_then_canonical_name_selected(mut registry: Registry) {
    let plan = registry.dispatch(None, &["r", "x"]).unwrap();
    assert_eq!(plan.command, "run");
}

#[rstest]
fn given_local_option_when_dispatching_then_left_for_command(mut registry: Registry) {
    let plan = registry
        .dispatch(None, &["run", "--jobs", "4", "-f", "main.rs"])
        .unwrap();

    assert_eq!(plan.locals, strings(&["jobs", "fast"]));
    assert_eq!(plan.arguments, strings(&["main.rs"]));
    let run = &registry.commands["run"];
    assert_eq!(run.parameters().get("jobs").unwrap().args(), &["4".to_string()]);
}

#[rstest]
fn given_unbounded_option_when_dispatching_then_swallows_following_bare_tokens(
    mut registry: Registry,
) {
    let plan = registry
        .dispatch(None, &["list", "--include", "a", "b", "c"])
        .unwrap();

    assert_eq!(plan.globals, strings(&["include"]));
    assert!(plan.arguments.is_empty());
    assert_eq!(
        registry.globals.get("include").unwrap().args(),
        &strings(&["a", "b", "c"])[..]
    );
}

#[rstest]
fn given_declared_global_alias_when_dispatching_then_resolves(mut registry: Registry) {
    let plan = registry.dispatch(None, &["list", "--lvl", "2"]).unwrap();
    assert_eq!(plan.globals, strings(&["level"]));
}

#[rstest]
fn given_marker_first_and_default_when_dispatching_then_token_pushed_back(mut registry: Registry) {
    let plan = registry.dispatch(Some("list"), &["-d", "extra"]).unwrap();

    assert_eq!(plan.command, "list");
    assert_eq!(plan.globals, strings(&["debug"]));
    assert_eq!(plan.arguments, strings(&["extra"]));
}

#[rstest]
fn given_dashed_command_name_when_no_global_claims_it_then_selects_command(
    mut registry: Registry,
) {
    let plan = registry.dispatch(Some("list"), &["--run", "x"]).unwrap();
    assert_eq!(plan.command, "run");
    assert_eq!(plan.arguments, strings(&["x"]));
}

#[rstest]
fn given_marker_first_without_default_when_dispatching_then_no_default_command(
    mut registry: Registry,
) {
    let err = registry.dispatch(None, &["--debug"]).unwrap_err();
    assert!(matches!(err, DispatchError::NoDefaultCommand));
}

#[rstest]
fn given_empty_tokens_without_default_when_dispatching_then_no_default_command(
    mut registry: Registry,
) {
    let err = registry.dispatch(None, &[]).unwrap_err();
    assert!(matches!(err, DispatchError::NoDefaultCommand));
}

#[rstest]
#[case::single_dash(&["list", "-"])]
#[case::negative_number(&["list", "-5"])]
#[case::unknown_long(&["list", "--nope"])]
fn given_unresolved_marker_when_dispatching_then_unknown_option(
    mut registry: Registry,
    #[case] tokens: &[&str],
) {
    let err = registry.dispatch(None, tokens).unwrap_err();
    assert!(matches!(err, DispatchError::UnknownOption(_)), "got {err:?}");
}

#[rstest]
fn given_local_marker_of_other_command_when_dispatching_then_unknown_option(
    mut registry: Registry,
) {
    let err = registry.dispatch(None, &["list", "--fast"]).unwrap_err();
    assert!(matches!(err, DispatchError::UnknownOption(ref t) if t == "--fast"));
}

#[rstest]
fn given_repeated_global_when_dispatching_then_listed_once(mut registry: Registry) {
    let plan = registry
        .dispatch(None, &["list", "-d", "--debug", "-d"])
        .unwrap();
    assert_eq!(plan.globals, strings(&["debug"]));
}

#[rstest]
fn given_too_many_arguments_for_option_when_repeated_then_extra_becomes_positional(
    mut registry: Registry,
) {
    let plan = registry
        .dispatch(None, &["list", "--level", "1", "2"])
        .unwrap();
    assert_eq!(plan.arguments, strings(&["2"]));
}

#[rstest]
fn given_global_before_unknown_marker_when_dispatch_fails_then_global_is_still_seen(
    mut registry: Registry,
) {
    let tokens = strings(&["run", "-d", "--nope"]);
    let mut dispatcher = Dispatcher::new(
        &mut registry.commands,
        &registry.aliases,
        &mut registry.globals,
        None,
    );

    let err = dispatcher.dispatch(&tokens).unwrap_err();

    assert!(matches!(err, DispatchError::UnknownOption(ref t) if t == "--nope"));
    assert_eq!(dispatcher.seen_globals(), &["debug".to_string()]);
}
