use std::path::Path;

use chrono::{Days, NaiveDate};
use tracing::info;

use crate::commands::common::Workspace;
use crate::config::{EngineConfig, HORIZON_DAYS_ENV_VAR};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::MaterializeData;
use crate::recurrence::date::{format_iso_date, parse_stored_date};
use crate::schedule::{
    MaterializeSummary, horizon_window, materialize_appointments, project_expenses,
};
use crate::setup::{read_meta, write_meta};
use crate::{ClientError, ClientResult};

pub const LAST_MATERIALIZED_META_KEY: &str = "last_materialized_at";

#[derive(Debug)]
pub struct MaterializeRunOptions<'a> {
    pub today: NaiveDate,
    /// Skip the run when the previous one is younger than the run interval.
    pub if_due: bool,
    pub config: EngineConfig,
    pub home_override: Option<&'a Path>,
}

pub fn run_with_options(options: MaterializeRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "materialize";
    options.config.validate()?;
    let window = horizon_window(options.today, &options.config).ok_or_else(|| {
        ClientError::invalid_config(HORIZON_DAYS_ENV_VAR, "horizon does not fit the calendar")
    })?;

    let workspace = Workspace::open(options.home_override)?;
    let db_path = workspace.db_path();
    let last_run = read_meta(&workspace.connection, db_path, LAST_MATERIALIZED_META_KEY)?
        .as_deref()
        .and_then(parse_stored_date);
    let next_due = last_run.and_then(|last| next_due_date(last, &options.config));

    if options.if_due
        && let Some(due) = next_due
        && options.today < due
    {
        info!(next_due_at = %due, "materialization not due yet");
        return success(
            command,
            MaterializeData {
                from: format_iso_date(&window.start),
                to: format_iso_date(&window.end),
                horizon_days: options.config.horizon_days,
                ran: false,
                last_materialized_at: last_run.as_ref().map(format_iso_date),
                next_due_at: Some(format_iso_date(&due)),
                appointments: MaterializeSummary::default(),
                expenses: MaterializeSummary::default(),
            },
        );
    }

    let store = workspace.store();
    let appointments = materialize_appointments(&store, window.start, window.end)?;
    let expenses = project_expenses(&store, window.start, window.end)?;

    write_meta(
        &workspace.connection,
        db_path,
        LAST_MATERIALIZED_META_KEY,
        &format_iso_date(&options.today),
    )?;

    success(
        command,
        MaterializeData {
            from: format_iso_date(&window.start),
            to: format_iso_date(&window.end),
            horizon_days: options.config.horizon_days,
            ran: true,
            last_materialized_at: Some(format_iso_date(&options.today)),
            next_due_at: next_due_date(options.today, &options.config)
                .as_ref()
                .map(format_iso_date),
            appointments,
            expenses,
        },
    )
}

fn next_due_date(last_run: NaiveDate, config: &EngineConfig) -> Option<NaiveDate> {
    let days = u64::try_from(config.run_interval_days).ok()?;
    last_run.checked_add_days(Days::new(days))
}
