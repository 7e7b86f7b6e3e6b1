use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};

pub fn parse_iso_date(value: &str) -> Result<String, String> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err("date must use YYYY-MM-DD format".to_string());
    }
    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
        return Err("date must use valid calendar values".to_string());
    }
    Ok(value.to_string())
}

/// Extended help shown after `agendar fixed add --help` and
/// `agendar expense add --help`.
pub const RULE_AFTER_HELP: &str = "\
Recurrence:
  --every daily       every day (use --interval 2 for every other day)
  --every weekly      on the weekdays given by --on, e.g. --on mon,thu
  --every biweekly    every 15 days from --from
  --every monthly     on the day given by --on (1-31, or `last`)
  --every yearly      on the MM-DD given by --on (defaults to --from)

  Months without the requested day are skipped, except `last`,
  which always lands on the final day of the month.

Examples:
  agendar fixed add --client cli_1 --professional pro_1 --service svc_1 \\
    --time 09:00 --every weekly --on mon,thu --from 2025-03-03
  agendar expense add --description \"Studio rent\" --amount 2500 \\
    --every monthly --on last --from 2025-01-01
";

#[derive(Debug, Parser)]
#[command(
    name = "agendar",
    version,
    about = "recurring agenda and commission engine",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Use this directory instead of AGENDAR_HOME or ~/.agendar
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,
    /// Emit machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create appointments and expenses for the upcoming horizon
    Materialize {
        /// Only run when the configured run interval has elapsed
        #[arg(long)]
        if_due: bool,
    },
    /// Compute commission owed over a period
    #[command(group(
        ArgGroup::new("subject")
            .required(true)
            .args(["fixed", "professional"])
    ))]
    Commission {
        /// Fixed appointment id (e.g. fix_01J...)
        #[arg(long)]
        fixed: Option<String>,
        /// Professional id; sums every fixed appointment they own
        #[arg(long)]
        professional: Option<String>,
        /// First day of the period (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        from: String,
        /// Last day of the period (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        to: String,
    },
    /// Manage fixed (recurring) appointments
    #[command(arg_required_else_help = true)]
    Fixed {
        #[command(subcommand)]
        command: FixedCommand,
    },
    /// Manage recurring expenses
    #[command(arg_required_else_help = true)]
    Expense {
        #[command(subcommand)]
        command: ExpenseCommand,
    },
    /// Show the dates a definition fires on, without writing anything
    Preview {
        /// Fixed appointment or recurring expense id
        definition_id: String,
        #[arg(long, value_parser = parse_iso_date)]
        from: String,
        #[arg(long, value_parser = parse_iso_date)]
        to: String,
    },
    /// Stop a definition; deleted outright if it never produced rows
    Retire {
        /// Fixed appointment or recurring expense id
        definition_id: String,
        /// Last day the definition stays valid (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        on: String,
    },
    /// Manage professional unavailability
    #[command(arg_required_else_help = true)]
    Blackout {
        #[command(subcommand)]
        command: BlackoutCommand,
    },
    /// Manage professionals, services and clients
    #[command(arg_required_else_help = true)]
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Book or list concrete appointments
    #[command(arg_required_else_help = true)]
    Appointments {
        #[command(subcommand)]
        command: AppointmentsCommand,
    },
    /// List concrete expenses
    #[command(arg_required_else_help = true)]
    Expenses {
        #[command(subcommand)]
        command: ExpensesCommand,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RuleArgs {
    /// daily, weekly, biweekly, monthly or yearly
    #[arg(long, value_name = "KIND")]
    pub every: String,
    /// Step between occurrences (daily/weekly/monthly/yearly)
    #[arg(long)]
    pub interval: Option<i64>,
    /// Weekdays, day of month, `last`, or MM-DD depending on --every
    #[arg(long, value_name = "ANCHOR")]
    pub on: Option<String>,
    /// First valid day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_iso_date)]
    pub from: String,
    /// Last valid day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_iso_date)]
    pub until: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum FixedCommand {
    /// Register a recurring appointment
    #[command(after_long_help = RULE_AFTER_HELP)]
    Add {
        #[arg(long)]
        client: String,
        #[arg(long)]
        professional: String,
        #[arg(long)]
        service: String,
        /// Time of day (HH:MM)
        #[arg(long)]
        time: String,
        #[arg(long)]
        notes: Option<String>,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// List every fixed appointment, including retired ones
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ExpenseCommand {
    /// Register a recurring expense
    #[command(after_long_help = RULE_AFTER_HELP)]
    Add {
        #[arg(long)]
        description: String,
        /// Decimal amount, e.g. 2500.00
        #[arg(long)]
        amount: String,
        #[arg(long)]
        category: Option<String>,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// List every recurring expense, including retired ones
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum BlackoutCommand {
    /// Block a professional for whole days or part of each day
    Add {
        #[arg(long)]
        professional: String,
        #[arg(long, value_parser = parse_iso_date)]
        from: String,
        /// Defaults to --from
        #[arg(long, value_parser = parse_iso_date)]
        to: Option<String>,
        /// Start of a partial-day window (HH:MM)
        #[arg(long)]
        start: Option<String>,
        /// End of a partial-day window (HH:MM)
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// List blackout windows overlapping a range
    List {
        #[arg(long)]
        professional: String,
        #[arg(long, value_parser = parse_iso_date)]
        from: String,
        #[arg(long, value_parser = parse_iso_date)]
        to: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum CatalogCommand {
    #[command(arg_required_else_help = true)]
    Professional {
        #[command(subcommand)]
        command: ProfessionalCommand,
    },
    #[command(arg_required_else_help = true)]
    Service {
        #[command(subcommand)]
        command: ServiceCommand,
    },
    #[command(arg_required_else_help = true)]
    Client {
        #[command(subcommand)]
        command: ClientCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProfessionalCommand {
    Add {
        name: String,
        /// Commission percentage override (0-100)
        #[arg(long)]
        commission: Option<u32>,
    },
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ServiceCommand {
    Add {
        name: String,
        /// Decimal price, e.g. 100.00
        #[arg(long)]
        price: String,
        /// Duration in minutes
        #[arg(long)]
        duration: Option<i64>,
    },
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ClientCommand {
    Add {
        name: String,
        #[arg(long)]
        phone: Option<String>,
    },
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum AppointmentsCommand {
    /// Book a one-off appointment
    Add {
        #[arg(long)]
        client: String,
        #[arg(long)]
        professional: String,
        #[arg(long)]
        service: String,
        #[arg(long, value_parser = parse_iso_date)]
        date: String,
        /// Time of day (HH:MM)
        #[arg(long)]
        time: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List appointments dated inside a range
    List {
        #[arg(long, value_parser = parse_iso_date)]
        from: String,
        #[arg(long, value_parser = parse_iso_date)]
        to: String,
        #[arg(long)]
        professional: Option<String>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ExpensesCommand {
    /// List expenses dated inside a range
    List {
        #[arg(long, value_parser = parse_iso_date)]
        from: String,
        #[arg(long, value_parser = parse_iso_date)]
        to: String,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::{Commands, FixedCommand, parse_from};

    #[test]
    fn parse_command_paths() {
        let cases: [Vec<&str>; 16] = [
            vec!["agendar", "materialize"],
            vec!["agendar", "materialize", "--if-due", "--json"],
            vec![
                "agendar", "commission", "--fixed", "fix_1", "--from", "2025-01-01", "--to",
                "2025-01-31",
            ],
            vec![
                "agendar",
                "commission",
                "--professional",
                "pro_1",
                "--from",
                "2025-01-01",
                "--to",
                "2025-01-31",
            ],
            vec![
                "agendar", "fixed", "add", "--client", "cli_1", "--professional", "pro_1",
                "--service", "svc_1", "--time", "09:00", "--every", "weekly", "--on", "mon,thu",
                "--from", "2025-03-03",
            ],
            vec!["agendar", "fixed", "list"],
            vec![
                "agendar",
                "expense",
                "add",
                "--description",
                "Rent",
                "--amount",
                "2500",
                "--every",
                "monthly",
                "--on",
                "last",
                "--from",
                "2025-01-01",
            ],
            vec!["agendar", "expense", "list", "--json"],
            vec!["agendar", "preview", "fix_1", "--from", "2025-01-01", "--to", "2025-01-31"],
            vec!["agendar", "retire", "fix_1", "--on", "2025-01-31"],
            vec![
                "agendar", "blackout", "add", "--professional", "pro_1", "--from", "2025-02-10",
            ],
            vec![
                "agendar", "blackout", "list", "--professional", "pro_1", "--from", "2025-02-01",
                "--to", "2025-02-28",
            ],
            vec!["agendar", "catalog", "professional", "add", "Ana", "--commission", "20"],
            vec!["agendar", "catalog", "service", "add", "Haircut", "--price", "100.00"],
            vec!["agendar", "--home", "/tmp/agenda", "catalog", "client", "list"],
            vec!["agendar", "expenses", "list", "--from", "2025-01-01", "--to", "2025-01-31"],
        ];

        for case in cases {
            let parsed = parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse: {case:?}");
        }
    }

    #[test]
    fn global_flags_are_accepted_after_the_subcommand() {
        let parsed = parse_from(["agendar", "fixed", "list", "--json", "--home", "/tmp/a"]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            assert!(cli.json);
            assert!(cli.home.is_some());
            assert!(matches!(
                cli.command,
                Commands::Fixed {
                    command: FixedCommand::List
                }
            ));
        }
    }

    #[test]
    fn commission_requires_exactly_one_subject() {
        let neither = parse_from([
            "agendar", "commission", "--from", "2025-01-01", "--to", "2025-01-31",
        ]);
        assert!(neither.is_err());

        let both = parse_from([
            "agendar",
            "commission",
            "--fixed",
            "fix_1",
            "--professional",
            "pro_1",
            "--from",
            "2025-01-01",
            "--to",
            "2025-01-31",
        ]);
        assert!(both.is_err());
        if let Err(err) = both {
            assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        }
    }

    #[test]
    fn invalid_date_is_rejected() {
        let parsed = parse_from(["agendar", "retire", "fix_1", "--on", "2025-02-30"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn bare_group_shows_help() {
        let parsed = parse_from(["agendar", "fixed"]);
        assert!(parsed.is_err());
        if let Err(err) = parsed {
            assert_eq!(
                err.kind(),
                ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            );
        }
    }

    #[test]
    fn help_command_is_rejected() {
        let parsed = parse_from(["agendar", "help"]);
        assert!(parsed.is_err());
    }
}
