use std::path::Path;

use chrono::{NaiveTime, TimeDelta};
use serde_json::json;

use crate::commands::common::{Workspace, optional_text};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{AppointmentRow, RowsData};
use crate::recurrence::BlackoutIndex;
use crate::recurrence::date::{
    build_range, format_clock_time, format_iso_date, parse_clock_time_strict,
    parse_iso_date_strict,
};
use crate::schedule::{InsertOutcome, NewAppointment, ScheduleStore};
use crate::state::map_sqlite_error;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct ManualAppointmentOptions<'a> {
    pub client_id: String,
    pub professional_id: String,
    pub service_id: String,
    pub date: String,
    pub time: String,
    pub notes: Option<String>,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct AppointmentListOptions<'a> {
    pub from: String,
    pub to: String,
    pub professional_id: Option<String>,
    pub home_override: Option<&'a Path>,
}

/// Books a one-off appointment with no source definition.
pub fn add_manual(options: ManualAppointmentOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "appointments add";
    let date = parse_iso_date_strict(&options.date, "date", command)?;
    let time = parse_clock_time_strict(&options.time, "time", command)?;

    let workspace = Workspace::open(options.home_override)?;
    let store = workspace.store();
    if !store.professional_exists(&options.professional_id)? {
        return Err(ClientError::missing_reference(
            "professional",
            &options.professional_id,
        ));
    }
    let Some(service) = store.service(&options.service_id)? else {
        return Err(ClientError::missing_reference("service", &options.service_id));
    };
    if !store.client_exists(&options.client_id)? {
        return Err(ClientError::missing_reference("client", &options.client_id));
    }

    // The booking runs for the service duration; without one only the start
    // time is checked.
    let until = booking_end(time, service.duration_minutes);
    let blackouts =
        BlackoutIndex::new(store.blackout_windows(&options.professional_id, date, date)?);
    if let Some(window) =
        blackouts.window_overlapping(&options.professional_id, date, time, until)
    {
        return Err(ClientError::invalid_argument_with_recovery(
            "The professional is unavailable at that date and time.",
            vec![format!(
                "Run `agendar blackout list --professional {} --from {} --to {}` to see the blocked period.",
                options.professional_id,
                format_iso_date(&window.date_start),
                format_iso_date(&window.date_end)
            )],
        )
        .with_data(json!({
            "blackout_id": window.blackout_id,
        })));
    }

    let appointment = NewAppointment {
        fixed_appointment_id: None,
        client_id: options.client_id,
        professional_id: options.professional_id,
        service_id: options.service_id,
        date,
        time,
        notes: optional_text(options.notes.as_deref()),
    };
    let appointment_id = match store.insert_appointment(&appointment)? {
        InsertOutcome::Inserted(id) => id,
        InsertOutcome::Duplicate => {
            return Err(ClientError::internal_id_collision("appointments"));
        }
    };

    success(
        command,
        AppointmentRow {
            appointment_id,
            fixed_appointment_id: None,
            client_id: appointment.client_id,
            professional_id: appointment.professional_id,
            service_id: appointment.service_id,
            date: format_iso_date(&appointment.date),
            time: format_clock_time(&appointment.time),
            notes: appointment.notes,
            status: "scheduled".to_string(),
        },
    )
}

/// End of a booking that starts at `start`, capped at the last second of
/// the day.
fn booking_end(start: NaiveTime, duration_minutes: Option<u32>) -> NaiveTime {
    let Some(minutes) = duration_minutes else {
        return start;
    };
    let (end, wrapped) = start.overflowing_add_signed(TimeDelta::minutes(i64::from(minutes)));
    if wrapped != 0 {
        return NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(start);
    }
    end
}

pub fn list(options: AppointmentListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "appointments list";
    let range = build_range(&options.from, &options.to, command)?;

    let workspace = Workspace::open(options.home_override)?;
    let db_path = workspace.db_path();
    let mut statement = workspace
        .connection
        .prepare(
            "SELECT
                appointment_id,
                fixed_appointment_id,
                client_id,
                professional_id,
                service_id,
                date,
                time,
                notes,
                status
             FROM appointments
             WHERE date >= ?1
               AND date <= ?2
               AND (?3 IS NULL OR professional_id = ?3)
             ORDER BY date ASC, time ASC, appointment_id ASC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let rows_iter = statement
        .query_map(
            rusqlite::params![
                format_iso_date(&range.start),
                format_iso_date(&range.end),
                &options.professional_id
            ],
            |row| {
                Ok(AppointmentRow {
                    appointment_id: row.get(0)?,
                    fixed_appointment_id: row.get(1)?,
                    client_id: row.get(2)?,
                    professional_id: row.get(3)?,
                    service_id: row.get(4)?,
                    date: row.get(5)?,
                    time: row.get(6)?,
                    notes: row.get(7)?,
                    status: row.get(8)?,
                })
            },
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    success(command, RowsData::new(rows))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::booking_end;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
    }

    #[test]
    fn booking_end_adds_service_duration() {
        assert_eq!(booking_end(time(11, 30), Some(45)), time(12, 15));
        assert_eq!(booking_end(time(11, 30), None), time(11, 30));
    }

    #[test]
    fn booking_end_never_wraps_past_midnight() {
        assert_eq!(
            booking_end(time(23, 30), Some(90)),
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
        );
    }
}
