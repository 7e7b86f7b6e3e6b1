//! In-memory [`ScheduleStore`] used by the engine unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use crate::recurrence::{BlackoutSpan, BlackoutWindow, RecurrenceKind, RecurrenceRule};
use crate::schedule::store::ScheduleStore;
use crate::schedule::types::{
    DefinitionLoad, FixedAppointment, InsertOutcome, NewAppointment, NewExpense, Professional,
    RecurringExpense, Service,
};
use crate::{ClientError, ClientResult};

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

pub(crate) fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

pub(crate) fn rule(
    kind: RecurrenceKind,
    interval: i64,
    anchor: Option<i64>,
    from: NaiveDate,
) -> RecurrenceRule {
    match RecurrenceRule::new(kind, interval, anchor, from, None) {
        Ok(value) => value,
        Err(error) => panic!("rule should be valid: {}", error.message),
    }
}

pub(crate) fn fixed_appointment(
    id: &str,
    kind: RecurrenceKind,
    interval: i64,
    anchor: Option<i64>,
    from: NaiveDate,
    time_of_day: NaiveTime,
) -> FixedAppointment {
    FixedAppointment {
        fixed_appointment_id: id.to_string(),
        client_id: "cli_bea".to_string(),
        professional_id: "pro_ana".to_string(),
        service_id: "svc_cut".to_string(),
        time_of_day,
        notes: None,
        rule: rule(kind, interval, anchor, from),
        active: true,
    }
}

pub(crate) fn recurring_expense(
    id: &str,
    kind: RecurrenceKind,
    anchor: Option<i64>,
    from: NaiveDate,
    amount: Decimal,
) -> RecurringExpense {
    RecurringExpense {
        recurring_expense_id: id.to_string(),
        description: format!("expense {id}"),
        category: None,
        amount,
        rule: rule(kind, 1, anchor, from),
        active: true,
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    professionals: Vec<Professional>,
    services: Vec<Service>,
    clients: Vec<String>,
    fixed: Vec<FixedAppointment>,
    expenses_defs: Vec<RecurringExpense>,
    blackouts: Vec<BlackoutWindow>,
    appointments: RefCell<Vec<NewAppointment>>,
    expenses: RefCell<Vec<NewExpense>>,
    failing_sources: HashSet<String>,
    hide_existing: Cell<bool>,
}

impl MemoryStore {
    pub(crate) fn with_catalog() -> Self {
        Self {
            professionals: vec![Professional {
                professional_id: "pro_ana".to_string(),
                name: "Ana".to_string(),
                commission_percent: None,
            }],
            services: vec![Service {
                service_id: "svc_cut".to_string(),
                name: "Haircut".to_string(),
                price: Decimal::new(10000, 2),
                duration_minutes: Some(30),
            }],
            clients: vec!["cli_bea".to_string()],
            ..Self::default()
        }
    }

    pub(crate) fn set_commission(&mut self, professional_id: &str, percent: Option<u32>) {
        for professional in &mut self.professionals {
            if professional.professional_id == professional_id {
                professional.commission_percent = percent;
            }
        }
    }

    pub(crate) fn add_fixed(&mut self, definition: FixedAppointment) {
        self.fixed.push(definition);
    }

    pub(crate) fn add_expense(&mut self, definition: RecurringExpense) {
        self.expenses_defs.push(definition);
    }

    pub(crate) fn add_blackout(
        &mut self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
        span: BlackoutSpan,
    ) {
        let id = format!("blk_{}", self.blackouts.len());
        match BlackoutWindow::new(&id, owner, start, end, span, None) {
            Ok(window) => self.blackouts.push(window),
            Err(error) => panic!("blackout should be valid: {}", error.message),
        }
    }

    /// Inserts for this source fail with a storage error.
    pub(crate) fn fail_inserts_for(&mut self, source_id: &str) {
        self.failing_sources.insert(source_id.to_string());
    }

    /// Existence checks report nothing, so only the insert-or-ignore step can
    /// catch duplicates.
    pub(crate) fn hide_existing_rows(&self) {
        self.hide_existing.set(true);
    }

    pub(crate) fn seed_appointment(&self, source_id: &str, on: NaiveDate, at: NaiveTime) {
        self.appointments.borrow_mut().push(NewAppointment {
            fixed_appointment_id: Some(source_id.to_string()),
            client_id: "cli_bea".to_string(),
            professional_id: "pro_ana".to_string(),
            service_id: "svc_cut".to_string(),
            date: on,
            time: at,
            notes: None,
        });
    }

    pub(crate) fn appointment_count(&self) -> usize {
        self.appointments.borrow().len()
    }

    pub(crate) fn appointment_dates(&self, source_id: &str) -> Vec<NaiveDate> {
        self.appointments
            .borrow()
            .iter()
            .filter(|row| row.fixed_appointment_id.as_deref() == Some(source_id))
            .map(|row| row.date)
            .collect()
    }

    pub(crate) fn expense_dates(&self, source_id: &str) -> Vec<NaiveDate> {
        self.expenses
            .borrow()
            .iter()
            .filter(|row| row.recurring_expense_id.as_deref() == Some(source_id))
            .map(|row| row.date)
            .collect()
    }

    fn check_failure(&self, source_id: Option<&str>) -> ClientResult<()> {
        if let Some(id) = source_id
            && self.failing_sources.contains(id)
        {
            return Err(ClientError::store_locked(Path::new(":memory:")));
        }
        Ok(())
    }
}

impl ScheduleStore for MemoryStore {
    fn active_fixed_appointments(&self) -> ClientResult<Vec<DefinitionLoad<FixedAppointment>>> {
        Ok(self
            .fixed
            .iter()
            .filter(|definition| definition.active)
            .cloned()
            .map(Ok)
            .collect())
    }

    fn fixed_appointments_for_professional(
        &self,
        professional_id: &str,
    ) -> ClientResult<Vec<DefinitionLoad<FixedAppointment>>> {
        Ok(self
            .fixed
            .iter()
            .filter(|definition| definition.professional_id == professional_id)
            .cloned()
            .map(Ok)
            .collect())
    }

    fn fixed_appointment(
        &self,
        fixed_appointment_id: &str,
    ) -> ClientResult<Option<FixedAppointment>> {
        Ok(self
            .fixed
            .iter()
            .find(|definition| definition.fixed_appointment_id == fixed_appointment_id)
            .cloned())
    }

    fn active_recurring_expenses(&self) -> ClientResult<Vec<DefinitionLoad<RecurringExpense>>> {
        Ok(self
            .expenses_defs
            .iter()
            .filter(|definition| definition.active)
            .cloned()
            .map(Ok)
            .collect())
    }

    fn appointment_exists(
        &self,
        fixed_appointment_id: &str,
        on: NaiveDate,
        at: NaiveTime,
    ) -> ClientResult<bool> {
        if self.hide_existing.get() {
            return Ok(false);
        }
        Ok(self.appointments.borrow().iter().any(|row| {
            row.fixed_appointment_id.as_deref() == Some(fixed_appointment_id)
                && row.date == on
                && row.time == at
        }))
    }

    fn expense_exists(&self, recurring_expense_id: &str, on: NaiveDate) -> ClientResult<bool> {
        if self.hide_existing.get() {
            return Ok(false);
        }
        Ok(self.expenses.borrow().iter().any(|row| {
            row.recurring_expense_id.as_deref() == Some(recurring_expense_id) && row.date == on
        }))
    }

    fn insert_appointment(&self, appointment: &NewAppointment) -> ClientResult<InsertOutcome> {
        self.check_failure(appointment.fixed_appointment_id.as_deref())?;
        let mut rows = self.appointments.borrow_mut();
        let taken = appointment.fixed_appointment_id.is_some()
            && rows.iter().any(|row| {
                row.fixed_appointment_id == appointment.fixed_appointment_id
                    && row.date == appointment.date
                    && row.time == appointment.time
            });
        if taken {
            return Ok(InsertOutcome::Duplicate);
        }
        rows.push(appointment.clone());
        Ok(InsertOutcome::Inserted(format!("apt_{}", rows.len())))
    }

    fn insert_expense(&self, expense: &NewExpense) -> ClientResult<InsertOutcome> {
        self.check_failure(expense.recurring_expense_id.as_deref())?;
        let mut rows = self.expenses.borrow_mut();
        let taken = expense.recurring_expense_id.is_some()
            && rows.iter().any(|row| {
                row.recurring_expense_id == expense.recurring_expense_id
                    && row.date == expense.date
            });
        if taken {
            return Ok(InsertOutcome::Duplicate);
        }
        rows.push(expense.clone());
        Ok(InsertOutcome::Inserted(format!("exp_{}", rows.len())))
    }

    fn blackout_windows(
        &self,
        owner_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ClientResult<Vec<BlackoutWindow>> {
        Ok(self
            .blackouts
            .iter()
            .filter(|window| {
                window.owner_id == owner_id && window.date_start <= to && window.date_end >= from
            })
            .cloned()
            .collect())
    }

    fn service(&self, service_id: &str) -> ClientResult<Option<Service>> {
        Ok(self
            .services
            .iter()
            .find(|service| service.service_id == service_id)
            .cloned())
    }

    fn professional(&self, professional_id: &str) -> ClientResult<Option<Professional>> {
        Ok(self
            .professionals
            .iter()
            .find(|professional| professional.professional_id == professional_id)
            .cloned())
    }

    fn client_exists(&self, client_id: &str) -> ClientResult<bool> {
        Ok(self.clients.iter().any(|client| client == client_id))
    }
}
