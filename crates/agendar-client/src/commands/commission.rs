use std::path::Path;

use crate::commands::common::Workspace;
use crate::config::EngineConfig;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{CommissionData, CommissionLine, CommissionScope};
use crate::recurrence::date::{build_range, format_iso_date};
use crate::schedule::{AccrualLine, accrue_fixed_appointment, accrue_professional, format_money};
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct CommissionRunOptions<'a> {
    pub fixed_appointment_id: Option<String>,
    pub professional_id: Option<String>,
    pub from: String,
    pub to: String,
    pub config: EngineConfig,
    pub home_override: Option<&'a Path>,
}

/// Commission owed over a period, either for one fixed appointment or for
/// every fixed appointment of a professional.
pub fn run_with_options(options: CommissionRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "commission";
    let period = build_range(&options.from, &options.to, command)?;
    options.config.validate()?;

    let workspace = Workspace::open(options.home_override)?;
    let store = workspace.store();

    let data = match (options.fixed_appointment_id, options.professional_id) {
        (Some(fixed_appointment_id), None) => {
            let line =
                accrue_fixed_appointment(&store, &fixed_appointment_id, period, &options.config)?;
            CommissionData {
                scope: CommissionScope::FixedAppointment,
                subject_id: fixed_appointment_id,
                from: format_iso_date(&period.start),
                to: format_iso_date(&period.end),
                rate_percent: line.rate_percent.to_string(),
                total: format_money(line.amount),
                lines: vec![commission_line(&line)],
            }
        }
        (None, Some(professional_id)) => {
            let accrual = accrue_professional(&store, &professional_id, period, &options.config)?;
            CommissionData {
                scope: CommissionScope::Professional,
                subject_id: accrual.professional_id,
                from: format_iso_date(&period.start),
                to: format_iso_date(&period.end),
                rate_percent: accrual.rate_percent.to_string(),
                total: format_money(accrual.total),
                lines: accrual.lines.iter().map(commission_line).collect(),
            }
        }
        _ => {
            return Err(ClientError::invalid_argument_for_command(
                "Pass exactly one of `--fixed` or `--professional`.",
                Some(command),
            ));
        }
    };

    success(command, data)
}

fn commission_line(line: &AccrualLine) -> CommissionLine {
    CommissionLine {
        fixed_appointment_id: line.fixed_appointment_id.clone(),
        service_id: line.service_id.clone(),
        occurrences: line.occurrences,
        service_value: format_money(line.service_value),
        rate_percent: line.rate_percent.to_string(),
        amount: format_money(line.amount),
    }
}
