use crate::cli::Cli;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_cli(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}

/// Best-effort mode for failures raised before clap finished parsing.
pub fn mode_from_raw_args(raw_args: &[String]) -> OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return OutputMode::Json;
    }
    OutputMode::Text
}
