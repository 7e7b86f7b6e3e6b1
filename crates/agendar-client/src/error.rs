use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

const STORAGE_ERROR_CODES: [&str; 5] = [
    "store_init_permission_denied",
    "store_locked",
    "store_corrupt",
    "migration_failed",
    "store_init_failed",
];

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// True for failures raised by the persistence layer rather than by
    /// caller input.
    pub fn is_storage(&self) -> bool {
        STORAGE_ERROR_CODES.contains(&self.code.as_str())
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `agendar {cmd} --help` for usage."),
            None => "Run `agendar --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn invalid_rule(message: &str) -> Self {
        Self::new(
            "invalid_rule",
            &format!("Recurrence rule is invalid: {message}"),
            vec![
                "Use an interval of 1 or more.".to_string(),
                "Make sure `until` is on or after `from`.".to_string(),
                "Weekly rules need a weekday mask between 1 and 127 (bit 0 = Sunday)."
                    .to_string(),
                "Monthly rules need a day between 1 and 31, or -1 for the last day.".to_string(),
            ],
        )
    }

    pub fn invalid_blackout(message: &str) -> Self {
        Self::new(
            "invalid_blackout",
            &format!("Blackout window is invalid: {message}"),
            vec![
                "Make sure the end date is on or after the start date.".to_string(),
                "Partial-day blackouts need both times, with the end time after the start time."
                    .to_string(),
            ],
        )
    }

    pub fn missing_reference(kind: &str, id: &str) -> Self {
        Self::new(
            "missing_reference",
            &format!("Referenced {kind} `{id}` was not found."),
            vec![format!(
                "Run `agendar catalog {kind} list` to find a valid {kind} id."
            )],
        )
        .with_data(json!({
            "reference_kind": kind,
            "reference_id": id,
        }))
    }

    pub fn definition_not_found(id: &str) -> Self {
        Self::new(
            "definition_not_found",
            &format!("Recurring definition `{id}` was not found."),
            vec![
                "Run `agendar fixed list` or `agendar expense list` to find a valid id."
                    .to_string(),
            ],
        )
        .with_data(json!({
            "definition_id": id,
        }))
    }

    pub fn invalid_config(variable: &str, detail: &str) -> Self {
        Self::new(
            "invalid_config",
            &format!("Configuration value `{variable}` is invalid: {detail}"),
            vec![format!("Fix or unset `{variable}` and retry.")],
        )
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    /// A freshly generated id collided with an existing row.
    pub fn internal_id_collision(table: &str) -> Self {
        Self::new(
            "internal_id_collision",
            &format!("A generated id already exists in `{table}`; nothing was written."),
            vec!["Retry the command.".to_string()],
        )
        .with_data(json!({ "table": table }))
    }

    pub fn corrupt_value(path: &Path, column: &str, value: &str) -> Self {
        Self::store_corrupt(path).with_data(json!({
            "column": column,
            "value": value,
        }))
    }

    pub fn store_init_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_permission_denied",
            &format!("Cannot initialize agenda store at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `AGENDAR_HOME` to a writable directory."
            )],
        )
    }

    pub fn store_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_locked",
            &format!("Agenda database is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn store_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_corrupt",
            &format!("Agenda database appears corrupt at `{location}`."),
            vec![format!(
                "Replace `{location}` with a valid SQLite agenda file or restore from backup."
            )],
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Agenda migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn store_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_failed",
            &format!("Agenda store operation failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
