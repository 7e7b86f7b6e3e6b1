mod cli;
mod dispatch;
mod output;
mod stdout_io;

use std::process::ExitCode;

use agendar_client::ClientError;
use clap::{Parser, error::ErrorKind};
use stdout_io::write_stdout_text;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "AGENDAR_LOG";

const ROOT_HELP: &str = "agendar - recurring agenda and commission engine

Usage:
  agendar <command>

Start here:
  agendar catalog professional add <name> --commission <percent>
  agendar fixed add --help
  agendar materialize

Run `agendar --help` for every command.
";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

/// Logs go to stderr so stdout stays parseable; `AGENDAR_LOG` takes
/// EnvFilter directives such as `agendar_client=debug`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_text(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let cli = match cli::Cli::try_parse() {
        Ok(value) => value,
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                if write_stdout_text(&err.to_string()).is_err() {
                    return Err(ExitCode::from(2));
                }
                return Ok(ExitCode::SUCCESS);
            }
            let clean_message = strip_clap_boilerplate(&err.to_string());
            let parse_error = ClientError::invalid_argument_for_command(
                &clean_message,
                command_path_from_args(&raw_args).as_deref(),
            );
            let mode = output::mode_from_raw_args(&raw_args);
            if output::print_failure(&parse_error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            return Err(ExitCode::from(1));
        }
    };
    let mode = output::mode_for_cli(&cli);

    match dispatch::dispatch(&cli) {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

/// Drops clap's trailing usage block so the recovery steps are the only
/// guidance printed.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

/// Subcommand path used in `--help` hints, e.g. `catalog service add`.
fn command_path_from_args(raw_args: &[String]) -> Option<String> {
    let mut words = Vec::new();
    let mut skip_value = false;
    for value in raw_args.iter().skip(1) {
        if skip_value {
            skip_value = false;
            continue;
        }
        if value == "--home" {
            skip_value = true;
            continue;
        }
        if value.starts_with('-') {
            break;
        }
        words.push(value.as_str());
    }

    let depth = match words.as_slice() {
        ["catalog", "professional" | "service" | "client", "add" | "list", ..] => 3,
        ["catalog", "professional" | "service" | "client", ..] => 2,
        [
            "fixed" | "expense" | "blackout" | "appointments" | "expenses",
            "add" | "list",
            ..,
        ] => 2,
        [
            "materialize" | "commission" | "preview" | "retire" | "fixed" | "expense"
            | "blackout" | "catalog" | "appointments" | "expenses",
            ..,
        ] => 1,
        _ => 0,
    };
    if depth == 0 {
        return None;
    }
    Some(words[..depth].join(" "))
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if is_internal_error(error) {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn is_internal_error(error: &ClientError) -> bool {
    error.code.starts_with("internal_") || error.is_storage()
}
