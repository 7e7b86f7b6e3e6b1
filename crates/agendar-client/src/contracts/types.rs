use serde::Serialize;

use crate::schedule::MaterializeSummary;

#[derive(Debug, Clone, Serialize)]
pub struct RowsData<T> {
    pub count: usize,
    pub rows: Vec<T>,
}

impl<T> RowsData<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            count: rows.len(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfessionalRow {
    pub professional_id: String,
    pub name: String,
    pub commission_percent: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceRow {
    pub service_id: String,
    pub name: String,
    pub price: String,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientRow {
    pub client_id: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleView {
    pub kind: String,
    pub interval: u32,
    pub anchor_value: Option<i64>,
    /// Human-readable anchor, e.g. `mon,thu` or `last day`.
    pub anchor_label: Option<String>,
    pub valid_from: String,
    pub valid_until: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixedAppointmentRow {
    pub fixed_appointment_id: String,
    pub client_id: String,
    pub professional_id: String,
    pub service_id: String,
    pub time_of_day: String,
    pub notes: Option<String>,
    pub rule: RuleView,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecurringExpenseRow {
    pub recurring_expense_id: String,
    pub description: String,
    pub category: Option<String>,
    pub amount: String,
    pub rule: RuleView,
    pub active: bool,
}

/// Listing that keeps going past definitions whose stored rows no longer
/// decode.
#[derive(Debug, Clone, Serialize)]
pub struct DefinitionListData<T> {
    pub count: usize,
    pub rows: Vec<T>,
    pub unreadable: Vec<UnreadableDefinition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnreadableDefinition {
    pub definition_id: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewOccurrence {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub blocked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewData {
    pub definition_id: String,
    pub from: String,
    pub to: String,
    pub count: usize,
    pub occurrences: Vec<PreviewOccurrence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetireOutcome {
    Deleted,
    Deactivated,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetireData {
    pub definition_id: String,
    pub outcome: RetireOutcome,
    /// Concrete rows still linked to the definition.
    pub linked_occurrences: i64,
    /// Pending rows dated after the retirement date that were dropped.
    pub removed_occurrences: i64,
    pub valid_until: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlackoutRow {
    pub blackout_id: String,
    pub professional_id: String,
    pub date_start: String,
    pub date_end: String,
    pub all_day: bool,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentRow {
    pub appointment_id: String,
    pub fixed_appointment_id: Option<String>,
    pub client_id: String,
    pub professional_id: String,
    pub service_id: String,
    pub date: String,
    pub time: String,
    pub notes: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseRow {
    pub expense_id: String,
    pub recurring_expense_id: Option<String>,
    pub description: String,
    pub category: Option<String>,
    pub amount: String,
    pub date: String,
    pub paid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterializeData {
    pub from: String,
    pub to: String,
    pub horizon_days: i64,
    /// False when `--if-due` found the previous run still fresh.
    pub ran: bool,
    pub last_materialized_at: Option<String>,
    pub next_due_at: Option<String>,
    pub appointments: MaterializeSummary,
    pub expenses: MaterializeSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionScope {
    FixedAppointment,
    Professional,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommissionLine {
    pub fixed_appointment_id: String,
    pub service_id: String,
    pub occurrences: i64,
    pub service_value: String,
    pub rate_percent: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommissionData {
    pub scope: CommissionScope,
    pub subject_id: String,
    pub from: String,
    pub to: String,
    pub rate_percent: String,
    pub total: String,
    pub lines: Vec<CommissionLine>,
}
