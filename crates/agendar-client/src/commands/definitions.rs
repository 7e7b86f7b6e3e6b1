use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior, params};
use tracing::info;

use crate::commands::common::{
    RuleInput, Workspace, build_rule, fixed_appointment_row, new_id, optional_text, parse_money,
    recurring_expense_row, required_text, unreadable,
};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{
    DefinitionListData, PreviewData, PreviewOccurrence, RetireData, RetireOutcome,
};
use crate::recurrence::date::{
    build_range, format_clock_time, format_iso_date, parse_clock_time_strict,
    parse_iso_date_strict,
};
use crate::recurrence::{BlackoutIndex, RecurrenceRule, occurrences_in_range};
use crate::schedule::store::now_timestamp;
use crate::schedule::types::DefinitionLoad;
use crate::schedule::{FixedAppointment, RecurringExpense, ScheduleStore};
use crate::state::map_sqlite_error;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct FixedAddOptions<'a> {
    pub client_id: String,
    pub professional_id: String,
    pub service_id: String,
    /// `HH:MM`.
    pub time: String,
    pub notes: Option<String>,
    pub rule: RuleInput,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct ExpenseAddOptions<'a> {
    pub description: String,
    pub category: Option<String>,
    pub amount: String,
    pub rule: RuleInput,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct PreviewOptions<'a> {
    pub definition_id: String,
    pub from: String,
    pub to: String,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct RetireOptions<'a> {
    pub definition_id: String,
    /// Last day the definition stays valid.
    pub on: String,
    pub home_override: Option<&'a Path>,
}

pub fn add_fixed_appointment(options: FixedAddOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "fixed add";
    let time_of_day = parse_clock_time_strict(&options.time, "time", command)?;
    let rule = build_rule(&options.rule, command)?;

    let workspace = Workspace::open(options.home_override)?;
    let store = workspace.store();
    if !store.professional_exists(&options.professional_id)? {
        return Err(ClientError::missing_reference(
            "professional",
            &options.professional_id,
        ));
    }
    if store.service_value(&options.service_id)?.is_none() {
        return Err(ClientError::missing_reference("service", &options.service_id));
    }
    if !store.client_exists(&options.client_id)? {
        return Err(ClientError::missing_reference("client", &options.client_id));
    }

    let definition = FixedAppointment {
        fixed_appointment_id: new_id("fix"),
        client_id: options.client_id,
        professional_id: options.professional_id,
        service_id: options.service_id,
        time_of_day,
        notes: optional_text(options.notes.as_deref()),
        rule,
        active: true,
    };
    let timestamp = now_timestamp();
    workspace
        .connection
        .execute(
            "INSERT INTO fixed_appointments (
                fixed_appointment_id,
                client_id,
                professional_id,
                service_id,
                time_of_day,
                notes,
                recurrence_kind,
                recurrence_interval,
                anchor_value,
                valid_from,
                valid_until,
                active,
                created_at,
                updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12, ?12)",
            params![
                &definition.fixed_appointment_id,
                &definition.client_id,
                &definition.professional_id,
                &definition.service_id,
                format_clock_time(&definition.time_of_day),
                &definition.notes,
                definition.rule.kind().as_str(),
                definition.rule.interval(),
                definition.rule.anchor_value(),
                format_iso_date(&definition.rule.valid_from()),
                definition.rule.valid_until().as_ref().map(format_iso_date),
                &timestamp
            ],
        )
        .map_err(|error| map_sqlite_error(workspace.db_path(), &error))?;

    success(command, fixed_appointment_row(&definition))
}

pub fn add_recurring_expense(options: ExpenseAddOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "expense add";
    let description = required_text(&options.description, "description", command)?;
    let amount = parse_money(&options.amount, "amount", command)?;
    let rule = build_rule(&options.rule, command)?;

    let workspace = Workspace::open(options.home_override)?;
    let definition = RecurringExpense {
        recurring_expense_id: new_id("rex"),
        description,
        category: optional_text(options.category.as_deref()),
        amount,
        rule,
        active: true,
    };
    let timestamp = now_timestamp();
    workspace
        .connection
        .execute(
            "INSERT INTO recurring_expenses (
                recurring_expense_id,
                description,
                category,
                amount,
                recurrence_kind,
                recurrence_interval,
                anchor_value,
                valid_from,
                valid_until,
                active,
                created_at,
                updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)",
            params![
                &definition.recurring_expense_id,
                &definition.description,
                &definition.category,
                definition.amount.to_string(),
                definition.rule.kind().as_str(),
                definition.rule.interval(),
                definition.rule.anchor_value(),
                format_iso_date(&definition.rule.valid_from()),
                definition.rule.valid_until().as_ref().map(format_iso_date),
                &timestamp
            ],
        )
        .map_err(|error| map_sqlite_error(workspace.db_path(), &error))?;

    success(command, recurring_expense_row(&definition))
}

pub fn list_fixed_appointments(home_override: Option<&Path>) -> ClientResult<SuccessEnvelope> {
    let workspace = Workspace::open(home_override)?;
    let loaded = workspace.store().all_fixed_appointments()?;
    success(
        "fixed list",
        list_data(loaded, fixed_appointment_row),
    )
}

pub fn list_recurring_expenses(home_override: Option<&Path>) -> ClientResult<SuccessEnvelope> {
    let workspace = Workspace::open(home_override)?;
    let loaded = workspace.store().all_recurring_expenses()?;
    success(
        "expense list",
        list_data(loaded, recurring_expense_row),
    )
}

fn list_data<T, R>(loaded: Vec<DefinitionLoad<T>>, to_row: fn(&T) -> R) -> DefinitionListData<R> {
    let mut rows = Vec::new();
    let mut unreadable_rows = Vec::new();
    for entry in loaded {
        match entry {
            Ok(definition) => rows.push(to_row(&definition)),
            Err(invalid) => unreadable_rows.push(unreadable(invalid)),
        }
    }
    DefinitionListData {
        count: rows.len(),
        rows,
        unreadable: unreadable_rows,
    }
}

/// Dates a definition would fire on in a range, without writing anything.
/// Appointment candidates are flagged when a blackout window covers them.
pub fn preview(options: PreviewOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "preview";
    let range = build_range(&options.from, &options.to, command)?;

    let workspace = Workspace::open(options.home_override)?;
    let store = workspace.store();

    let occurrences = if let Some(definition) = store.fixed_appointment(&options.definition_id)? {
        let blackouts = BlackoutIndex::new(store.blackout_windows(
            &definition.professional_id,
            range.start,
            range.end,
        )?);
        occurrences_in_range(&definition.rule, range.start, range.end)
            .map(|date| PreviewOccurrence {
                date: format_iso_date(&date),
                time: Some(format_clock_time(&definition.time_of_day)),
                blocked: blackouts.is_blocked(
                    &definition.professional_id,
                    date,
                    definition.time_of_day,
                ),
            })
            .collect::<Vec<PreviewOccurrence>>()
    } else if let Some(definition) = store.recurring_expense(&options.definition_id)? {
        occurrences_in_range(&definition.rule, range.start, range.end)
            .map(|date| PreviewOccurrence {
                date: format_iso_date(&date),
                time: None,
                blocked: false,
            })
            .collect::<Vec<PreviewOccurrence>>()
    } else {
        return Err(ClientError::definition_not_found(&options.definition_id));
    };

    success(
        command,
        PreviewData {
            definition_id: options.definition_id,
            from: format_iso_date(&range.start),
            to: format_iso_date(&range.end),
            count: occurrences.len(),
            occurrences,
        },
    )
}

/// Drops pending rows dated after the retirement date, then hard-deletes the
/// definition if nothing remains linked to it. Otherwise it is deactivated
/// and its validity ends on `on`, so history and accrual keep their meaning.
pub fn retire(options: RetireOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "retire";
    let on = parse_iso_date_strict(&options.on, "on", command)?;

    let mut workspace = Workspace::open(options.home_override)?;
    let target = {
        let store = workspace.store();
        if let Some(definition) = store.fixed_appointment(&options.definition_id)? {
            RetireTarget::fixed(definition.rule)
        } else if let Some(definition) = store.recurring_expense(&options.definition_id)? {
            RetireTarget::expense(definition.rule)
        } else {
            return Err(ClientError::definition_not_found(&options.definition_id));
        }
    };

    let db_path = workspace.db_path().to_path_buf();
    let data = retire_target(
        &mut workspace.connection,
        &db_path,
        &options.definition_id,
        &target,
        on,
    )?;
    success(command, data)
}

struct RetireTarget {
    rule: RecurrenceRule,
    definition_table: &'static str,
    definition_column: &'static str,
    occurrence_table: &'static str,
    /// Rows matching this filter have not happened yet and may be dropped.
    pending_filter: &'static str,
}

impl RetireTarget {
    fn fixed(rule: RecurrenceRule) -> Self {
        Self {
            rule,
            definition_table: "fixed_appointments",
            definition_column: "fixed_appointment_id",
            occurrence_table: "appointments",
            pending_filter: "status = 'scheduled'",
        }
    }

    fn expense(rule: RecurrenceRule) -> Self {
        Self {
            rule,
            definition_table: "recurring_expenses",
            definition_column: "recurring_expense_id",
            occurrence_table: "expenses",
            pending_filter: "paid = 0",
        }
    }
}

fn retire_target(
    connection: &mut Connection,
    db_path: &Path,
    definition_id: &str,
    target: &RetireTarget,
    on: NaiveDate,
) -> ClientResult<RetireData> {
    let ended = target.rule.ending_on(on);
    let valid_until = ended.valid_until().as_ref().map(format_iso_date);

    let transaction = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let removed = transaction
        .execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1 AND date > ?2 AND {}",
                target.occurrence_table, target.definition_column, target.pending_filter
            ),
            params![definition_id, &valid_until],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))? as i64;

    let linked = count_linked(&transaction, target, definition_id)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let data = if linked == 0 {
        transaction
            .execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1",
                    target.definition_table, target.definition_column
                ),
                [definition_id],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        RetireData {
            definition_id: definition_id.to_string(),
            outcome: RetireOutcome::Deleted,
            linked_occurrences: 0,
            removed_occurrences: removed,
            valid_until: None,
        }
    } else {
        transaction
            .execute(
                &format!(
                    "UPDATE {} SET active = 0, valid_until = ?2, updated_at = ?3 WHERE {} = ?1",
                    target.definition_table, target.definition_column
                ),
                params![definition_id, &valid_until, now_timestamp()],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        RetireData {
            definition_id: definition_id.to_string(),
            outcome: RetireOutcome::Deactivated,
            linked_occurrences: linked,
            removed_occurrences: removed,
            valid_until,
        }
    };

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    info!(
        definition_id,
        outcome = ?data.outcome,
        removed = data.removed_occurrences,
        "definition retired"
    );
    Ok(data)
}

fn count_linked(
    connection: &Connection,
    target: &RetireTarget,
    definition_id: &str,
) -> rusqlite::Result<i64> {
    connection.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1",
            target.occurrence_table, target.definition_column
        ),
        [definition_id],
        |row| row.get(0),
    )
}
