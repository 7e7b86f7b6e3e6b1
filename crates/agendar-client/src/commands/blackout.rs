use std::path::Path;

use rusqlite::params;

use crate::commands::common::{Workspace, new_id, optional_text};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{BlackoutRow, RowsData};
use crate::recurrence::date::{
    build_range, format_clock_time, format_iso_date, parse_clock_time_strict,
    parse_iso_date_strict,
};
use crate::recurrence::{BlackoutSpan, BlackoutWindow};
use crate::schedule::ScheduleStore;
use crate::schedule::store::now_timestamp;
use crate::state::map_sqlite_error;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct BlackoutAddOptions<'a> {
    pub professional_id: String,
    pub from: String,
    /// Defaults to `from` for single-day windows.
    pub to: Option<String>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub reason: Option<String>,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct BlackoutListOptions<'a> {
    pub professional_id: String,
    pub from: String,
    pub to: String,
    pub home_override: Option<&'a Path>,
}

pub fn add(options: BlackoutAddOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "blackout add";
    let date_start = parse_iso_date_strict(&options.from, "from", command)?;
    let date_end = match options.to.as_deref() {
        Some(value) => parse_iso_date_strict(value, "to", command)?,
        None => date_start,
    };
    let time_start = match options.time_start.as_deref() {
        Some(value) => Some(parse_clock_time_strict(value, "start", command)?),
        None => None,
    };
    let time_end = match options.time_end.as_deref() {
        Some(value) => Some(parse_clock_time_strict(value, "end", command)?),
        None => None,
    };
    let span = BlackoutSpan::new(time_start, time_end)?;
    let window = BlackoutWindow::new(
        &new_id("blk"),
        &options.professional_id,
        date_start,
        date_end,
        span,
        optional_text(options.reason.as_deref()),
    )?;

    let workspace = Workspace::open(options.home_override)?;
    if !workspace.store().professional_exists(&window.owner_id)? {
        return Err(ClientError::missing_reference(
            "professional",
            &window.owner_id,
        ));
    }

    let row = blackout_row(&window);
    workspace
        .connection
        .execute(
            "INSERT INTO blackout_windows (
                blackout_id,
                professional_id,
                date_start,
                date_end,
                all_day,
                time_start,
                time_end,
                reason,
                created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &row.blackout_id,
                &row.professional_id,
                &row.date_start,
                &row.date_end,
                i64::from(row.all_day),
                &row.time_start,
                &row.time_end,
                &row.reason,
                now_timestamp()
            ],
        )
        .map_err(|error| map_sqlite_error(workspace.db_path(), &error))?;

    success(command, row)
}

pub fn list(options: BlackoutListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "blackout list";
    let range = build_range(&options.from, &options.to, command)?;

    let workspace = Workspace::open(options.home_override)?;
    let windows = workspace
        .store()
        .blackout_windows(&options.professional_id, range.start, range.end)?;
    let rows = windows.iter().map(blackout_row).collect::<Vec<BlackoutRow>>();
    success(command, RowsData::new(rows))
}

fn blackout_row(window: &BlackoutWindow) -> BlackoutRow {
    let (time_start, time_end) = match window.span {
        BlackoutSpan::AllDay => (None, None),
        BlackoutSpan::Between { start, end } => (
            Some(format_clock_time(&start)),
            Some(format_clock_time(&end)),
        ),
    };
    BlackoutRow {
        blackout_id: window.blackout_id.clone(),
        professional_id: window.owner_id.clone(),
        date_start: format_iso_date(&window.date_start),
        date_end: format_iso_date(&window.date_end),
        all_day: window.span.is_all_day(),
        time_start,
        time_end,
        reason: window.reason.clone(),
    }
}
