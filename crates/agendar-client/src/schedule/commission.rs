//! Commission owed on fixed appointments, computed by replaying the
//! recurrence over a period. Materialized rows are never consulted, so a
//! report over the past or the far future costs the same.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::EngineConfig;
use crate::recurrence::{DateRange, count_in_range};
use crate::schedule::store::ScheduleStore;
use crate::schedule::types::{FixedAppointment, Professional, RecurringDefinition};
use crate::{ClientError, ClientResult};

/// Unrounded `occurrences × service_value × rate_percent / 100` over
/// `[period_start, period_end]`.
pub fn accrue<D: RecurringDefinition>(
    definition: &D,
    period_start: NaiveDate,
    period_end: NaiveDate,
    service_value: Decimal,
    rate_percent: Decimal,
) -> Decimal {
    let occurrences = count_in_range(definition.rule(), period_start, period_end);
    Decimal::from(occurrences) * service_value * rate_percent / Decimal::ONE_HUNDRED
}

/// Two decimal places, halves rounded away from zero.
pub fn round_for_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", round_for_display(amount))
}

pub fn commission_rate(professional: &Professional, config: &EngineConfig) -> Decimal {
    Decimal::from(
        professional
            .commission_percent
            .unwrap_or(config.default_commission_percent),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualLine {
    pub fixed_appointment_id: String,
    pub service_id: String,
    pub occurrences: i64,
    pub service_value: Decimal,
    pub rate_percent: Decimal,
    /// Unrounded.
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfessionalAccrual {
    pub professional_id: String,
    pub rate_percent: Decimal,
    pub lines: Vec<AccrualLine>,
    /// Sum of the unrounded line amounts.
    pub total: Decimal,
}

pub fn accrue_fixed_appointment<S: ScheduleStore>(
    store: &S,
    fixed_appointment_id: &str,
    period: DateRange,
    config: &EngineConfig,
) -> ClientResult<AccrualLine> {
    let definition = store
        .fixed_appointment(fixed_appointment_id)?
        .ok_or_else(|| ClientError::definition_not_found(fixed_appointment_id))?;
    let professional = load_professional(store, &definition.professional_id)?;
    accrual_line(
        store,
        &definition,
        period,
        commission_rate(&professional, config),
    )
}

/// Sums every fixed appointment the professional owns, retired ones
/// included; retirement already bounds their validity.
pub fn accrue_professional<S: ScheduleStore>(
    store: &S,
    professional_id: &str,
    period: DateRange,
    config: &EngineConfig,
) -> ClientResult<ProfessionalAccrual> {
    let professional = load_professional(store, professional_id)?;
    let rate_percent = commission_rate(&professional, config);

    let mut lines = Vec::new();
    for loaded in store.fixed_appointments_for_professional(professional_id)? {
        let definition = loaded.map_err(|invalid| invalid.error)?;
        lines.push(accrual_line(store, &definition, period, rate_percent)?);
    }
    let total = lines.iter().map(|line| line.amount).sum();

    Ok(ProfessionalAccrual {
        professional_id: professional.professional_id,
        rate_percent,
        lines,
        total,
    })
}

fn accrual_line<S: ScheduleStore>(
    store: &S,
    definition: &FixedAppointment,
    period: DateRange,
    rate_percent: Decimal,
) -> ClientResult<AccrualLine> {
    let service_value = store
        .service_value(&definition.service_id)?
        .ok_or_else(|| ClientError::missing_reference("service", &definition.service_id))?;

    Ok(AccrualLine {
        fixed_appointment_id: definition.fixed_appointment_id.clone(),
        service_id: definition.service_id.clone(),
        occurrences: count_in_range(&definition.rule, period.start, period.end),
        service_value,
        rate_percent,
        amount: accrue(
            definition,
            period.start,
            period.end,
            service_value,
            rate_percent,
        ),
    })
}

fn load_professional<S: ScheduleStore>(
    store: &S,
    professional_id: &str,
) -> ClientResult<Professional> {
    store
        .professional(professional_id)?
        .ok_or_else(|| ClientError::missing_reference("professional", professional_id))
}
