use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use crate::ClientError;
use crate::recurrence::RecurrenceRule;

/// Long-lived definition that owns a recurrence rule.
pub trait RecurringDefinition {
    fn definition_id(&self) -> &str;
    fn rule(&self) -> &RecurrenceRule;
    fn is_active(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedAppointment {
    pub fixed_appointment_id: String,
    pub client_id: String,
    pub professional_id: String,
    pub service_id: String,
    pub time_of_day: NaiveTime,
    pub notes: Option<String>,
    pub rule: RecurrenceRule,
    pub active: bool,
}

impl RecurringDefinition for FixedAppointment {
    fn definition_id(&self) -> &str {
        &self.fixed_appointment_id
    }

    fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringExpense {
    pub recurring_expense_id: String,
    pub description: String,
    pub category: Option<String>,
    pub amount: Decimal,
    pub rule: RecurrenceRule,
    pub active: bool,
}

impl RecurringDefinition for RecurringExpense {
    fn definition_id(&self) -> &str {
        &self.recurring_expense_id
    }

    fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// A stored definition that could not be decoded. Reported per definition so
/// one bad row never hides the others.
#[derive(Debug, Clone)]
pub struct InvalidDefinition {
    pub definition_id: String,
    pub error: ClientError,
}

pub type DefinitionLoad<T> = Result<T, InvalidDefinition>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub fixed_appointment_id: Option<String>,
    pub client_id: String,
    pub professional_id: String,
    pub service_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
}

impl NewAppointment {
    pub fn from_definition(definition: &FixedAppointment, date: NaiveDate) -> Self {
        Self {
            fixed_appointment_id: Some(definition.fixed_appointment_id.clone()),
            client_id: definition.client_id.clone(),
            professional_id: definition.professional_id.clone(),
            service_id: definition.service_id.clone(),
            date,
            time: definition.time_of_day,
            notes: definition.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub recurring_expense_id: Option<String>,
    pub description: String,
    pub category: Option<String>,
    pub amount: Decimal,
    pub date: NaiveDate,
}

impl NewExpense {
    pub fn from_definition(definition: &RecurringExpense, date: NaiveDate) -> Self {
        Self {
            recurring_expense_id: Some(definition.recurring_expense_id.clone()),
            description: definition.description.clone(),
            category: definition.category.clone(),
            amount: definition.amount,
            date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(String),
    /// A row for the same source and slot already exists; nothing was written.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Professional {
    pub professional_id: String,
    pub name: String,
    pub commission_percent: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub service_id: String,
    pub name: String,
    pub price: Decimal,
    pub duration_minutes: Option<u32>,
}
