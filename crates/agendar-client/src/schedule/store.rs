use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::recurrence::date::{
    format_clock_time, format_iso_date, parse_stored_date, parse_stored_time,
};
use crate::recurrence::{BlackoutSpan, BlackoutWindow, RecurrenceKind, RecurrenceRule};
use crate::schedule::types::{
    DefinitionLoad, FixedAppointment, InsertOutcome, InvalidDefinition, NewAppointment,
    NewExpense, Professional, RecurringExpense, Service,
};
use crate::state::map_sqlite_error;
use crate::{ClientError, ClientResult};

/// Persistence operations the recurrence engines depend on.
pub trait ScheduleStore {
    fn active_fixed_appointments(&self) -> ClientResult<Vec<DefinitionLoad<FixedAppointment>>>;

    /// Every fixed appointment of a professional, including retired ones.
    fn fixed_appointments_for_professional(
        &self,
        professional_id: &str,
    ) -> ClientResult<Vec<DefinitionLoad<FixedAppointment>>>;

    fn fixed_appointment(&self, fixed_appointment_id: &str)
    -> ClientResult<Option<FixedAppointment>>;

    fn active_recurring_expenses(&self) -> ClientResult<Vec<DefinitionLoad<RecurringExpense>>>;

    fn appointment_exists(
        &self,
        fixed_appointment_id: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ClientResult<bool>;

    fn expense_exists(&self, recurring_expense_id: &str, date: NaiveDate) -> ClientResult<bool>;

    /// Insert-or-ignore keyed on (source, date, time).
    fn insert_appointment(&self, appointment: &NewAppointment) -> ClientResult<InsertOutcome>;

    /// Insert-or-ignore keyed on (source, date).
    fn insert_expense(&self, expense: &NewExpense) -> ClientResult<InsertOutcome>;

    /// Windows of `owner_id` overlapping `[from, to]`.
    fn blackout_windows(
        &self,
        owner_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ClientResult<Vec<BlackoutWindow>>;

    fn service(&self, service_id: &str) -> ClientResult<Option<Service>>;

    fn professional(&self, professional_id: &str) -> ClientResult<Option<Professional>>;

    fn client_exists(&self, client_id: &str) -> ClientResult<bool>;

    fn service_value(&self, service_id: &str) -> ClientResult<Option<Decimal>> {
        Ok(self.service(service_id)?.map(|service| service.price))
    }

    fn professional_exists(&self, professional_id: &str) -> ClientResult<bool> {
        Ok(self.professional(professional_id)?.is_some())
    }
}

const FIXED_APPOINTMENT_COLUMNS: &str = "fixed_appointment_id,
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
    active";

const RECURRING_EXPENSE_COLUMNS: &str = "recurring_expense_id,
    description,
    category,
    amount,
    recurrence_kind,
    recurrence_interval,
    anchor_value,
    valid_from,
    valid_until,
    active";

pub struct SqliteStore<'a> {
    connection: &'a Connection,
    db_path: &'a Path,
}

impl<'a> SqliteStore<'a> {
    pub fn new(connection: &'a Connection, db_path: &'a Path) -> Self {
        Self {
            connection,
            db_path,
        }
    }

    pub fn connection(&self) -> &Connection {
        self.connection
    }

    pub fn db_path(&self) -> &Path {
        self.db_path
    }

    pub fn all_fixed_appointments(&self) -> ClientResult<Vec<DefinitionLoad<FixedAppointment>>> {
        self.query_fixed_appointments(
            &format!(
                "SELECT {FIXED_APPOINTMENT_COLUMNS} FROM fixed_appointments
                 ORDER BY valid_from ASC, fixed_appointment_id ASC"
            ),
            [],
        )
    }

    pub fn all_recurring_expenses(&self) -> ClientResult<Vec<DefinitionLoad<RecurringExpense>>> {
        self.query_recurring_expenses(
            &format!(
                "SELECT {RECURRING_EXPENSE_COLUMNS} FROM recurring_expenses
                 ORDER BY valid_from ASC, recurring_expense_id ASC"
            ),
            [],
        )
    }

    pub fn recurring_expense(
        &self,
        recurring_expense_id: &str,
    ) -> ClientResult<Option<RecurringExpense>> {
        let loaded = self.query_recurring_expenses(
            &format!(
                "SELECT {RECURRING_EXPENSE_COLUMNS} FROM recurring_expenses
                 WHERE recurring_expense_id = ?1"
            ),
            [recurring_expense_id],
        )?;
        first_loaded(loaded)
    }

    fn query_fixed_appointments<P>(
        &self,
        sql: &str,
        parameters: P,
    ) -> ClientResult<Vec<DefinitionLoad<FixedAppointment>>>
    where
        P: rusqlite::Params,
    {
        let mut statement = self
            .connection
            .prepare(sql)
            .map_err(|error| self.storage_error(&error))?;
        let rows_iter = statement
            .query_map(parameters, read_fixed_appointment_row)
            .map_err(|error| self.storage_error(&error))?;

        let mut definitions = Vec::new();
        for row in rows_iter {
            let raw = row.map_err(|error| self.storage_error(&error))?;
            definitions.push(self.decode_fixed_appointment(raw));
        }
        Ok(definitions)
    }

    fn query_recurring_expenses<P>(
        &self,
        sql: &str,
        parameters: P,
    ) -> ClientResult<Vec<DefinitionLoad<RecurringExpense>>>
    where
        P: rusqlite::Params,
    {
        let mut statement = self
            .connection
            .prepare(sql)
            .map_err(|error| self.storage_error(&error))?;
        let rows_iter = statement
            .query_map(parameters, read_recurring_expense_row)
            .map_err(|error| self.storage_error(&error))?;

        let mut definitions = Vec::new();
        for row in rows_iter {
            let raw = row.map_err(|error| self.storage_error(&error))?;
            definitions.push(self.decode_recurring_expense(raw));
        }
        Ok(definitions)
    }

    fn decode_fixed_appointment(
        &self,
        raw: FixedAppointmentRow,
    ) -> DefinitionLoad<FixedAppointment> {
        let id = raw.fixed_appointment_id.clone();
        let decoded = (|| {
            let time_of_day = parse_stored_time(&raw.time_of_day).ok_or_else(|| {
                ClientError::corrupt_value(self.db_path, "time_of_day", &raw.time_of_day)
            })?;
            let rule = self.decode_rule(&raw.rule)?;
            Ok(FixedAppointment {
                fixed_appointment_id: raw.fixed_appointment_id,
                client_id: raw.client_id,
                professional_id: raw.professional_id,
                service_id: raw.service_id,
                time_of_day,
                notes: raw.notes,
                rule,
                active: raw.active,
            })
        })();
        decoded.map_err(|error| InvalidDefinition {
            definition_id: id,
            error,
        })
    }

    fn decode_recurring_expense(
        &self,
        raw: RecurringExpenseRow,
    ) -> DefinitionLoad<RecurringExpense> {
        let id = raw.recurring_expense_id.clone();
        let decoded = (|| {
            let amount = parse_amount(self.db_path, "amount", &raw.amount)?;
            let rule = self.decode_rule(&raw.rule)?;
            Ok(RecurringExpense {
                recurring_expense_id: raw.recurring_expense_id,
                description: raw.description,
                category: raw.category,
                amount,
                rule,
                active: raw.active,
            })
        })();
        decoded.map_err(|error| InvalidDefinition {
            definition_id: id,
            error,
        })
    }

    fn decode_rule(&self, columns: &RuleColumns) -> ClientResult<RecurrenceRule> {
        let kind = RecurrenceKind::parse(&columns.kind).ok_or_else(|| {
            ClientError::corrupt_value(self.db_path, "recurrence_kind", &columns.kind)
        })?;
        let valid_from = parse_stored_date(&columns.valid_from).ok_or_else(|| {
            ClientError::corrupt_value(self.db_path, "valid_from", &columns.valid_from)
        })?;
        let valid_until = match &columns.valid_until {
            Some(value) => Some(parse_stored_date(value).ok_or_else(|| {
                ClientError::corrupt_value(self.db_path, "valid_until", value)
            })?),
            None => None,
        };
        RecurrenceRule::new(
            kind,
            columns.interval,
            columns.anchor_value,
            valid_from,
            valid_until,
        )
    }

    fn exists(&self, sql: &str, parameters: impl rusqlite::Params) -> ClientResult<bool> {
        let found = self
            .connection
            .query_row(sql, parameters, |_row| Ok(true))
            .optional()
            .map_err(|error| self.storage_error(&error))?
            .unwrap_or(false);
        Ok(found)
    }

    fn storage_error(&self, error: &rusqlite::Error) -> ClientError {
        map_sqlite_error(self.db_path, error)
    }
}

impl ScheduleStore for SqliteStore<'_> {
    fn active_fixed_appointments(&self) -> ClientResult<Vec<DefinitionLoad<FixedAppointment>>> {
        self.query_fixed_appointments(
            &format!(
                "SELECT {FIXED_APPOINTMENT_COLUMNS} FROM fixed_appointments
                 WHERE active = 1
                 ORDER BY fixed_appointment_id ASC"
            ),
            [],
        )
    }

    fn fixed_appointments_for_professional(
        &self,
        professional_id: &str,
    ) -> ClientResult<Vec<DefinitionLoad<FixedAppointment>>> {
        self.query_fixed_appointments(
            &format!(
                "SELECT {FIXED_APPOINTMENT_COLUMNS} FROM fixed_appointments
                 WHERE professional_id = ?1
                 ORDER BY valid_from ASC, fixed_appointment_id ASC"
            ),
            [professional_id],
        )
    }

    fn fixed_appointment(
        &self,
        fixed_appointment_id: &str,
    ) -> ClientResult<Option<FixedAppointment>> {
        let loaded = self.query_fixed_appointments(
            &format!(
                "SELECT {FIXED_APPOINTMENT_COLUMNS} FROM fixed_appointments
                 WHERE fixed_appointment_id = ?1"
            ),
            [fixed_appointment_id],
        )?;
        first_loaded(loaded)
    }

    fn active_recurring_expenses(&self) -> ClientResult<Vec<DefinitionLoad<RecurringExpense>>> {
        self.query_recurring_expenses(
            &format!(
                "SELECT {RECURRING_EXPENSE_COLUMNS} FROM recurring_expenses
                 WHERE active = 1
                 ORDER BY recurring_expense_id ASC"
            ),
            [],
        )
    }

    fn appointment_exists(
        &self,
        fixed_appointment_id: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ClientResult<bool> {
        self.exists(
            "SELECT 1 FROM appointments
             WHERE fixed_appointment_id = ?1 AND date = ?2 AND time = ?3
             LIMIT 1",
            params![
                fixed_appointment_id,
                format_iso_date(&date),
                format_clock_time(&time)
            ],
        )
    }

    fn expense_exists(&self, recurring_expense_id: &str, date: NaiveDate) -> ClientResult<bool> {
        self.exists(
            "SELECT 1 FROM expenses
             WHERE recurring_expense_id = ?1 AND date = ?2
             LIMIT 1",
            params![recurring_expense_id, format_iso_date(&date)],
        )
    }

    fn insert_appointment(&self, appointment: &NewAppointment) -> ClientResult<InsertOutcome> {
        let appointment_id = format!("apt_{}", Ulid::new());
        let changed = self
            .connection
            .execute(
                "INSERT OR IGNORE INTO appointments (
                    appointment_id,
                    fixed_appointment_id,
                    client_id,
                    professional_id,
                    service_id,
                    date,
                    time,
                    notes,
                    status,
                    created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'scheduled', ?9)",
                params![
                    &appointment_id,
                    &appointment.fixed_appointment_id,
                    &appointment.client_id,
                    &appointment.professional_id,
                    &appointment.service_id,
                    format_iso_date(&appointment.date),
                    format_clock_time(&appointment.time),
                    &appointment.notes,
                    now_timestamp()
                ],
            )
            .map_err(|error| self.storage_error(&error))?;

        if changed == 0 {
            return Ok(InsertOutcome::Duplicate);
        }
        Ok(InsertOutcome::Inserted(appointment_id))
    }

    fn insert_expense(&self, expense: &NewExpense) -> ClientResult<InsertOutcome> {
        let expense_id = format!("exp_{}", Ulid::new());
        let changed = self
            .connection
            .execute(
                "INSERT OR IGNORE INTO expenses (
                    expense_id,
                    recurring_expense_id,
                    description,
                    category,
                    amount,
                    date,
                    paid,
                    created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                params![
                    &expense_id,
                    &expense.recurring_expense_id,
                    &expense.description,
                    &expense.category,
                    expense.amount.to_string(),
                    format_iso_date(&expense.date),
                    now_timestamp()
                ],
            )
            .map_err(|error| self.storage_error(&error))?;

        if changed == 0 {
            return Ok(InsertOutcome::Duplicate);
        }
        Ok(InsertOutcome::Inserted(expense_id))
    }

    fn blackout_windows(
        &self,
        owner_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ClientResult<Vec<BlackoutWindow>> {
        let mut statement = self
            .connection
            .prepare(
                "SELECT
                    blackout_id,
                    professional_id,
                    date_start,
                    date_end,
                    time_start,
                    time_end,
                    reason
                 FROM blackout_windows
                 WHERE professional_id = ?1
                   AND date_start <= ?3
                   AND date_end >= ?2
                 ORDER BY date_start ASC, blackout_id ASC",
            )
            .map_err(|error| self.storage_error(&error))?;

        let rows_iter = statement
            .query_map(
                params![owner_id, format_iso_date(&from), format_iso_date(&to)],
                read_blackout_row,
            )
            .map_err(|error| self.storage_error(&error))?;

        let mut windows = Vec::new();
        for row in rows_iter {
            let raw = row.map_err(|error| self.storage_error(&error))?;
            windows.push(decode_blackout_row(self.db_path, raw)?);
        }
        Ok(windows)
    }

    fn service(&self, service_id: &str) -> ClientResult<Option<Service>> {
        let row = self
            .connection
            .query_row(
                "SELECT service_id, name, price, duration_minutes
                 FROM services WHERE service_id = ?1",
                [service_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(|error| self.storage_error(&error))?;

        let Some((service_id, name, price, duration_minutes)) = row else {
            return Ok(None);
        };
        Ok(Some(Service {
            service_id,
            name,
            price: parse_amount(self.db_path, "price", &price)?,
            duration_minutes: duration_minutes.and_then(|value| u32::try_from(value).ok()),
        }))
    }

    fn professional(&self, professional_id: &str) -> ClientResult<Option<Professional>> {
        let row = self
            .connection
            .query_row(
                "SELECT professional_id, name, commission_percent
                 FROM professionals WHERE professional_id = ?1",
                [professional_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|error| self.storage_error(&error))?;

        let Some((professional_id, name, commission)) = row else {
            return Ok(None);
        };
        let commission_percent = match commission {
            Some(value) => Some(u32::try_from(value).map_err(|_| {
                ClientError::corrupt_value(self.db_path, "commission_percent", &value.to_string())
            })?),
            None => None,
        };
        Ok(Some(Professional {
            professional_id,
            name,
            commission_percent,
        }))
    }

    fn client_exists(&self, client_id: &str) -> ClientResult<bool> {
        self.exists(
            "SELECT 1 FROM clients WHERE client_id = ?1 LIMIT 1",
            [client_id],
        )
    }
}

struct RuleColumns {
    kind: String,
    interval: i64,
    anchor_value: Option<i64>,
    valid_from: String,
    valid_until: Option<String>,
}

struct FixedAppointmentRow {
    fixed_appointment_id: String,
    client_id: String,
    professional_id: String,
    service_id: String,
    time_of_day: String,
    notes: Option<String>,
    rule: RuleColumns,
    active: bool,
}

struct RecurringExpenseRow {
    recurring_expense_id: String,
    description: String,
    category: Option<String>,
    amount: String,
    rule: RuleColumns,
    active: bool,
}

struct BlackoutRow {
    blackout_id: String,
    professional_id: String,
    date_start: String,
    date_end: String,
    time_start: Option<String>,
    time_end: Option<String>,
    reason: Option<String>,
}

fn read_rule_columns(row: &Row<'_>, offset: usize) -> rusqlite::Result<RuleColumns> {
    Ok(RuleColumns {
        kind: row.get(offset)?,
        interval: row.get(offset + 1)?,
        anchor_value: row.get(offset + 2)?,
        valid_from: row.get(offset + 3)?,
        valid_until: row.get(offset + 4)?,
    })
}

fn read_fixed_appointment_row(row: &Row<'_>) -> rusqlite::Result<FixedAppointmentRow> {
    Ok(FixedAppointmentRow {
        fixed_appointment_id: row.get(0)?,
        client_id: row.get(1)?,
        professional_id: row.get(2)?,
        service_id: row.get(3)?,
        time_of_day: row.get(4)?,
        notes: row.get(5)?,
        rule: read_rule_columns(row, 6)?,
        active: row.get::<_, i64>(11)? != 0,
    })
}

fn read_recurring_expense_row(row: &Row<'_>) -> rusqlite::Result<RecurringExpenseRow> {
    Ok(RecurringExpenseRow {
        recurring_expense_id: row.get(0)?,
        description: row.get(1)?,
        category: row.get(2)?,
        amount: row.get(3)?,
        rule: read_rule_columns(row, 4)?,
        active: row.get::<_, i64>(9)? != 0,
    })
}

fn read_blackout_row(row: &Row<'_>) -> rusqlite::Result<BlackoutRow> {
    Ok(BlackoutRow {
        blackout_id: row.get(0)?,
        professional_id: row.get(1)?,
        date_start: row.get(2)?,
        date_end: row.get(3)?,
        time_start: row.get(4)?,
        time_end: row.get(5)?,
        reason: row.get(6)?,
    })
}

fn decode_blackout_row(db_path: &Path, raw: BlackoutRow) -> ClientResult<BlackoutWindow> {
    let date_start = parse_stored_date(&raw.date_start)
        .ok_or_else(|| ClientError::corrupt_value(db_path, "date_start", &raw.date_start))?;
    let date_end = parse_stored_date(&raw.date_end)
        .ok_or_else(|| ClientError::corrupt_value(db_path, "date_end", &raw.date_end))?;
    let time_start = decode_optional_time(db_path, "time_start", raw.time_start.as_deref())?;
    let time_end = decode_optional_time(db_path, "time_end", raw.time_end.as_deref())?;
    let span = BlackoutSpan::new(time_start, time_end)?;
    BlackoutWindow::new(
        &raw.blackout_id,
        &raw.professional_id,
        date_start,
        date_end,
        span,
        raw.reason,
    )
}

fn decode_optional_time(
    db_path: &Path,
    column: &str,
    value: Option<&str>,
) -> ClientResult<Option<NaiveTime>> {
    match value {
        Some(text) => parse_stored_time(text)
            .map(Some)
            .ok_or_else(|| ClientError::corrupt_value(db_path, column, text)),
        None => Ok(None),
    }
}

fn first_loaded<T>(loaded: Vec<DefinitionLoad<T>>) -> ClientResult<Option<T>> {
    match loaded.into_iter().next() {
        Some(Ok(definition)) => Ok(Some(definition)),
        Some(Err(invalid)) => Err(invalid.error),
        None => Ok(None),
    }
}

pub(crate) fn parse_amount(db_path: &Path, column: &str, value: &str) -> ClientResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| ClientError::corrupt_value(db_path, column, value))
}

pub(crate) fn now_timestamp() -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH);
    match now {
        Ok(duration) => format!("{}", duration.as_secs()),
        Err(_) => "0".to_string(),
    }
}
