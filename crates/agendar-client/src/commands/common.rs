use std::path::Path;
use std::str::FromStr;

use rusqlite::Connection;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::contracts::types::{
    FixedAppointmentRow, RecurringExpenseRow, RuleView, UnreadableDefinition,
};
use crate::recurrence::date::{format_clock_time, format_iso_date, parse_iso_date_strict};
use crate::recurrence::{Anchor, LAST_DAY_OF_MONTH, RecurrenceKind, RecurrenceRule, WeekdaySet};
use crate::schedule::types::InvalidDefinition;
use crate::schedule::{FixedAppointment, RecurringExpense, SqliteStore};
use crate::setup::{SetupContext, load_setup};
use crate::{ClientError, ClientResult};

/// Initialized store plus an open connection for one command invocation.
pub(crate) struct Workspace {
    pub setup: SetupContext,
    pub connection: Connection,
}

impl Workspace {
    pub(crate) fn open(home_override: Option<&Path>) -> ClientResult<Self> {
        let setup = load_setup(home_override)?;
        let connection = setup.connect()?;
        Ok(Self { setup, connection })
    }

    pub(crate) fn db_path(&self) -> &Path {
        &self.setup.db_path
    }

    pub(crate) fn store(&self) -> SqliteStore<'_> {
        SqliteStore::new(&self.connection, &self.setup.db_path)
    }
}

/// Raw recurrence arguments as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct RuleInput {
    pub kind: String,
    pub interval: Option<i64>,
    /// `mon,thu` or a mask for weekly, a day or `last` for monthly, `MMDD`
    /// or `MM-DD` for yearly.
    pub anchor: Option<String>,
    pub from: String,
    pub until: Option<String>,
}

pub(crate) fn build_rule(input: &RuleInput, command: &str) -> ClientResult<RecurrenceRule> {
    let kind = RecurrenceKind::parse(&input.kind).ok_or_else(|| {
        ClientError::invalid_argument_for_command(
            &format!(
                "Unknown recurrence `{}`; use daily, weekly, biweekly, monthly or yearly.",
                input.kind
            ),
            Some(command),
        )
    })?;
    let valid_from = parse_iso_date_strict(&input.from, "from", command)?;
    let valid_until = match input.until.as_deref() {
        Some(value) => Some(parse_iso_date_strict(value, "until", command)?),
        None => None,
    };
    let anchor_value = match input.anchor.as_deref() {
        Some(raw) => Some(parse_anchor(kind, raw)?),
        None => None,
    };

    RecurrenceRule::new(
        kind,
        input.interval.unwrap_or(1),
        anchor_value,
        valid_from,
        valid_until,
    )
}

fn parse_anchor(kind: RecurrenceKind, raw: &str) -> ClientResult<i64> {
    let trimmed = raw.trim();
    let parsed = match kind {
        RecurrenceKind::Weekly => trimmed.parse::<i64>().ok().or_else(|| {
            WeekdaySet::parse_list(trimmed).map(|days| i64::from(days.mask()))
        }),
        RecurrenceKind::Monthly => {
            if trimmed.eq_ignore_ascii_case("last") {
                Some(LAST_DAY_OF_MONTH)
            } else {
                trimmed.parse::<i64>().ok()
            }
        }
        RecurrenceKind::Yearly => trimmed.replace('-', "").parse::<i64>().ok(),
        RecurrenceKind::Daily | RecurrenceKind::Biweekly => trimmed.parse::<i64>().ok(),
    };
    parsed.ok_or_else(|| {
        ClientError::invalid_rule(&format!(
            "could not read `{trimmed}` as a {} anchor",
            kind.as_str()
        ))
    })
}

pub(crate) fn anchor_label(rule: &RecurrenceRule) -> Option<String> {
    match rule.anchor() {
        Anchor::None => None,
        Anchor::Weekdays(days) => Some(days.labels().join(",")),
        Anchor::DayOfMonth(day) => Some(format!("day {day}")),
        Anchor::LastDayOfMonth => Some("last day".to_string()),
        Anchor::MonthDay { month, day } => Some(format!("{month:02}-{day:02}")),
    }
}

pub(crate) fn rule_view(rule: &RecurrenceRule) -> RuleView {
    RuleView {
        kind: rule.kind().as_str().to_string(),
        interval: rule.interval(),
        anchor_value: rule.anchor_value(),
        anchor_label: anchor_label(rule),
        valid_from: format_iso_date(&rule.valid_from()),
        valid_until: rule.valid_until().as_ref().map(format_iso_date),
    }
}

pub(crate) fn fixed_appointment_row(definition: &FixedAppointment) -> FixedAppointmentRow {
    FixedAppointmentRow {
        fixed_appointment_id: definition.fixed_appointment_id.clone(),
        client_id: definition.client_id.clone(),
        professional_id: definition.professional_id.clone(),
        service_id: definition.service_id.clone(),
        time_of_day: format_clock_time(&definition.time_of_day),
        notes: definition.notes.clone(),
        rule: rule_view(&definition.rule),
        active: definition.active,
    }
}

pub(crate) fn recurring_expense_row(definition: &RecurringExpense) -> RecurringExpenseRow {
    RecurringExpenseRow {
        recurring_expense_id: definition.recurring_expense_id.clone(),
        description: definition.description.clone(),
        category: definition.category.clone(),
        amount: format!("{:.2}", definition.amount),
        rule: rule_view(&definition.rule),
        active: definition.active,
    }
}

pub(crate) fn unreadable(invalid: InvalidDefinition) -> UnreadableDefinition {
    UnreadableDefinition {
        definition_id: invalid.definition_id,
        code: invalid.error.code,
        message: invalid.error.message,
    }
}

/// Non-negative decimal amount such as `100`, `100.5` or `99.90`.
pub(crate) fn parse_money(value: &str, field_name: &str, command: &str) -> ClientResult<Decimal> {
    let parsed = Decimal::from_str(value.trim()).map_err(|_| {
        ClientError::invalid_argument_for_command(
            &format!("`{field_name}` must be a decimal amount such as 120.50."),
            Some(command),
        )
    })?;
    if parsed.is_sign_negative() {
        return Err(ClientError::invalid_argument_for_command(
            &format!("`{field_name}` cannot be negative."),
            Some(command),
        ));
    }
    Ok(parsed)
}

pub(crate) fn required_text(value: &str, field_name: &str, command: &str) -> ClientResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClientError::invalid_argument_for_command(
            &format!("`{field_name}` cannot be empty."),
            Some(command),
        ));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

pub(crate) fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Ulid::new())
}
