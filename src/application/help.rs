//! Built-in `help` command: lists commands, descriptions and global parameters

use itertools::Itertools;

use crate::cli::output;
use crate::domain::{Catalog, Command, CommandEntry, DispatchError, DispatchResult, ParameterEntry, Value};

pub const HELP_COMMAND: &str = "help";

pub fn command() -> DispatchResult<Command> {
    Command::builder(HELP_COMMAND)
        .description("Show help for the application or a single command")
        .optional_arg("command")
        .action(|ctx| {
            let text = match ctx.arg("command").and_then(Value::as_str) {
                Some(name) => {
                    let entry = ctx
                        .catalog()
                        .command(name)
                        .ok_or_else(|| DispatchError::UnknownCommand(name.to_string()))?;
                    render_command_help(entry)
                }
                None => render_help(ctx.catalog()),
            };
            ctx.put(&text)?;
            Ok(Value::Unit)
        })
        .build()
}

/// `[--debug|-d] [--level|-l ...]`
pub fn globals_summary(globals: &[ParameterEntry]) -> String {
    globals.iter().map(parameter_usage).join(" ")
}

fn parameter_usage(entry: &ParameterEntry) -> String {
    let names = std::iter::once(format!("--{}", entry.name))
        .chain(entry.aliases.iter().map(|a| marker(a)))
        .join("|");
    if entry.takes_arguments {
        format!("[{names} ...]")
    } else {
        format!("[{names}]")
    }
}

fn marker(name: &str) -> String {
    if name.chars().count() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    }
}

pub fn usage_line(catalog: &Catalog) -> String {
    let summary = globals_summary(&catalog.globals);
    if summary.is_empty() {
        format!("Usage: {} [command] [args]", catalog.app_name)
    } else {
        format!("Usage: {} {} [command] [args]", catalog.app_name, summary)
    }
}

pub fn render_help(catalog: &Catalog) -> String {
    let mut text = String::new();
    match &catalog.banner {
        Some(banner) => text.push_str(banner),
        None => text.push_str(&usage_line(catalog)),
    }
    text.push_str("\n\n");
    text.push_str(&format!("{}\n", output::heading("Commands:")));

    let width = catalog
        .commands
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0);
    for entry in &catalog.commands {
        let mut line = format!("  {:<width$}", output::name(&entry.name));
        if let Some(description) = &entry.description {
            line.push_str(&format!("  {description}"));
        }
        if !entry.aliases.is_empty() {
            line.push_str(&format!(" {}", output::detail(&format!("(aliases: {})", entry.aliases.join(", ")))));
        }
        if catalog.default_command.as_deref() == Some(entry.name.as_str()) {
            line.push_str(&format!(" {}", output::detail("[default]")));
        }
        text.push_str(line.trim_end());
        text.push('\n');
    }
    text
}

pub fn render_command_help(entry: &CommandEntry) -> String {
    let mut text = format!("{} {}", output::heading(&entry.name), entry.usage)
        .trim_end()
        .to_string();
    text.push('\n');
    if let Some(description) = &entry.description {
        text.push_str(&format!("    {description}\n"));
    }
    if !entry.options.is_empty() {
        text.push_str(&format!("\n{}\n", output::heading("Options:")));
        for option in &entry.options {
            text.push_str(&format!("  {}", parameter_usage(option)));
            if let Some(description) = &option.description {
                text.push_str(&format!("  {description}"));
            }
            text.push('\n');
        }
    }
    text
}
