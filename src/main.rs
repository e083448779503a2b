use std::thread;
use std::time::Duration;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use clidispatch::cli::ProgressOptions;
use clidispatch::config::AppConfig;
use clidispatch::{
    exitcode, AppResult, Application, Arity, Command, ParamType, Parameter, Value,
};

fn main() {
    setup_logging();

    let config = match AppConfig::load("clidispatch-demo", None) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(exitcode::FAILURE);
        }
    };

    let mut app = Application::new(config);
    if let Err(e) = build(&mut app) {
        eprintln!("Error: {}", e);
        std::process::exit(exitcode::FAILURE);
    }
    if let Err(e) = app.launch() {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn build(app: &mut Application) -> AppResult<()> {
    app.global(
        Parameter::option("name", Arity::Exact(1))
            .description("Name to greet instead of the world"),
    )?;

    app.default_command(
        Command::builder("greet")
            .description("Print a greeting")
            .alias("hello")
            .option(Parameter::flag("shout").description("Uppercase the greeting"))
            .action(|ctx| {
                let name = ctx
                    .param_args("name")
                    .and_then(|args| args.first())
                    .map(Value::to_string)
                    .unwrap_or_else(|| "world".to_string());
                let mut greeting = format!("Hello, {name}!");
                if ctx.given("shout") {
                    greeting = greeting.to_uppercase();
                }
                ctx.verbose_puts("greeting in verbose mode")?;
                ctx.puts(&greeting)?;
                Ok(Value::Str(greeting))
            })
            .build()?,
    )?;

    app.command(
        Command::builder("sum")
            .description("Add integers")
            .typed_rest_args("numbers", ParamType::Int)
            .action(|ctx| {
                let total: i64 = ctx.arguments().iter().filter_map(Value::as_int).sum();
                ctx.puts(&total.to_string())?;
                Ok(Value::Int(total))
            })
            .build()?,
    )?;

    app.command(
        Command::builder("progress")
            .description("Draw a progress bar")
            .typed_optional_arg("steps", ParamType::Int)
            .action(|ctx| {
                let steps = ctx.arg("steps").and_then(Value::as_int).unwrap_or(10).max(1) as u64;
                let mut bar = ctx.progress_bar(ProgressOptions {
                    maximum: steps,
                    ..ProgressOptions::default()
                })?;
                for _ in 0..steps {
                    thread::sleep(Duration::from_millis(50));
                    bar.advance(1)?;
                }
                Ok(Value::Unit)
            })
            .build()?,
    )?;

    app.command(
        Command::builder("wait")
            .description("Show a throbber while sleeping")
            .typed_optional_arg("seconds", ParamType::Float)
            .action(|ctx| {
                let seconds = ctx.arg("seconds").and_then(Value::as_float).unwrap_or(1.0);
                ctx.put("waiting ")?;
                ctx.throbber(|_| thread::sleep(Duration::from_secs_f64(seconds.max(0.0))));
                ctx.puts("done")?;
                Ok(Value::Unit)
            })
            .build()?,
    )?;

    app.command(
        Command::builder("ask")
            .description("Prompt for a value and echo it")
            .action(|ctx| {
                let answer = ctx.prompt_default("Your name", "anonymous")?;
                let answer = if answer.is_empty() { "anonymous".to_string() } else { answer };
                ctx.puts(&format!("Nice to meet you, {answer}"))?;
                Ok(Value::Str(answer))
            })
            .build()?,
    )?;

    app.command(
        Command::builder("config")
            .description("Show the effective configuration")
            .action(|ctx| {
                let name = ctx.catalog().app_name.clone();
                let config = AppConfig::load(&name, None)?;
                ctx.put(&config.to_toml()?)?;
                Ok(Value::Unit)
            })
            .build()?,
    )?;

    app.alias("add", "sum")?;
    Ok(())
}

/// Log level comes from `RUST_LOG`; warnings only by default.
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // Create a subscriber with formatted output directed to stderr
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();
    tracing::debug!("logging initialized");
}
