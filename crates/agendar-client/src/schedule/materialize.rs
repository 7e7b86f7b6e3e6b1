use chrono::{Days, NaiveDate};

use crate::config::EngineConfig;
use crate::recurrence::{BlackoutIndex, DateRange};
use crate::schedule::driver::{self, CandidateOutcome, MaterializeSummary, Materializer};
use crate::schedule::store::ScheduleStore;
use crate::schedule::types::{DefinitionLoad, FixedAppointment, InsertOutcome, NewAppointment};
use crate::{ClientError, ClientResult};

/// Rolling window starting at `today` and spanning the configured horizon.
pub fn horizon_window(today: NaiveDate, config: &EngineConfig) -> Option<DateRange> {
    let days = u64::try_from(config.horizon_days).ok()?;
    let end = today.checked_add_days(Days::new(days))?;
    DateRange::new(today, end)
}

/// Creates concrete appointments for every active fixed appointment in
/// `[horizon_start, horizon_end]`. Re-running over the same window creates
/// nothing new.
pub fn materialize_appointments<S: ScheduleStore>(
    store: &S,
    horizon_start: NaiveDate,
    horizon_end: NaiveDate,
) -> ClientResult<MaterializeSummary> {
    driver::run(
        &AppointmentMaterializer { store },
        DateRange::new(horizon_start, horizon_end),
    )
}

struct AppointmentMaterializer<'s, S> {
    store: &'s S,
}

impl<S: ScheduleStore> Materializer for AppointmentMaterializer<'_, S> {
    type Definition = FixedAppointment;
    type Context = BlackoutIndex;

    const LABEL: &'static str = "appointment";

    fn load(&self) -> ClientResult<Vec<DefinitionLoad<FixedAppointment>>> {
        self.store.active_fixed_appointments()
    }

    fn prepare(
        &self,
        definition: &FixedAppointment,
        window: DateRange,
    ) -> ClientResult<BlackoutIndex> {
        if !self.store.professional_exists(&definition.professional_id)? {
            return Err(ClientError::missing_reference(
                "professional",
                &definition.professional_id,
            ));
        }
        if self.store.service_value(&definition.service_id)?.is_none() {
            return Err(ClientError::missing_reference(
                "service",
                &definition.service_id,
            ));
        }
        if !self.store.client_exists(&definition.client_id)? {
            return Err(ClientError::missing_reference(
                "client",
                &definition.client_id,
            ));
        }

        let windows =
            self.store
                .blackout_windows(&definition.professional_id, window.start, window.end)?;
        Ok(BlackoutIndex::new(windows))
    }

    fn materialize_on(
        &self,
        definition: &FixedAppointment,
        blackouts: &BlackoutIndex,
        date: NaiveDate,
    ) -> ClientResult<CandidateOutcome> {
        if self.store.appointment_exists(
            &definition.fixed_appointment_id,
            date,
            definition.time_of_day,
        )? {
            return Ok(CandidateOutcome::Duplicate);
        }
        if blackouts.is_blocked(&definition.professional_id, date, definition.time_of_day) {
            return Ok(CandidateOutcome::Blocked);
        }

        let appointment = NewAppointment::from_definition(definition, date);
        match self.store.insert_appointment(&appointment)? {
            InsertOutcome::Inserted(_) => Ok(CandidateOutcome::Created),
            InsertOutcome::Duplicate => Ok(CandidateOutcome::Duplicate),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::{horizon_window, materialize_appointments};
    use crate::config::EngineConfig;
    use crate::recurrence::{BlackoutSpan, RecurrenceKind, WeekdaySet};
    use crate::schedule::testing::{MemoryStore, date, fixed_appointment, time};

    #[test]
    fn horizon_spans_configured_days_from_today() {
        let window = horizon_window(date(2025, 1, 1), &EngineConfig::default());
        assert_eq!(window.map(|range| range.start), Some(date(2025, 1, 1)));
        assert_eq!(window.map(|range| range.end), Some(date(2025, 2, 26)));
    }

    #[test]
    fn second_run_over_same_window_creates_nothing() {
        let mut store = MemoryStore::with_catalog();
        store.add_fixed(fixed_appointment(
            "fix_daily",
            RecurrenceKind::Daily,
            1,
            None,
            date(2025, 1, 1),
            time(9, 0),
        ));

        let first = materialize_appointments(&store, date(2025, 1, 1), date(2025, 1, 10));
        let second = materialize_appointments(&store, date(2025, 1, 1), date(2025, 1, 10));
        assert!(first.is_ok());
        assert!(second.is_ok());
        if let (Ok(first), Ok(second)) = (first, second) {
            assert_eq!(first.created, 10);
            assert_eq!(second.created, 0);
            assert_eq!(second.skipped_duplicate, 10);
        }
        assert_eq!(store.appointment_count(), 10);
    }

    #[test]
    fn all_day_blackout_skips_only_the_blocked_date() {
        let mut store = MemoryStore::with_catalog();
        let days = WeekdaySet::from_weekdays(&[Weekday::Mon]);
        store.add_fixed(fixed_appointment(
            "fix_monday",
            RecurrenceKind::Weekly,
            1,
            Some(i64::from(days.mask())),
            date(2025, 2, 3),
            time(10, 0),
        ));
        store.add_blackout("pro_ana", date(2025, 2, 10), date(2025, 2, 10), BlackoutSpan::AllDay);

        let summary = materialize_appointments(&store, date(2025, 2, 3), date(2025, 2, 17));
        assert!(summary.is_ok());
        if let Ok(summary) = summary {
            assert_eq!(summary.created, 2);
            assert_eq!(summary.skipped_blackout, 1);
            assert_eq!(summary.skipped, 1);
        }
        let dates = store.appointment_dates("fix_monday");
        assert!(!dates.contains(&date(2025, 2, 10)));
        assert!(dates.contains(&date(2025, 2, 3)));
        assert!(dates.contains(&date(2025, 2, 17)));
    }

    #[test]
    fn partial_blackout_only_blocks_times_inside_it() {
        let mut store = MemoryStore::with_catalog();
        store.add_fixed(fixed_appointment(
            "fix_morning",
            RecurrenceKind::Daily,
            1,
            None,
            date(2025, 3, 1),
            time(9, 0),
        ));
        store.add_fixed(fixed_appointment(
            "fix_lunch",
            RecurrenceKind::Daily,
            1,
            None,
            date(2025, 3, 1),
            time(12, 30),
        ));
        let lunch = BlackoutSpan::new(Some(time(12, 0)), Some(time(13, 0)));
        assert!(lunch.is_ok());
        if let Ok(span) = lunch {
            store.add_blackout("pro_ana", date(2025, 3, 1), date(2025, 3, 3), span);
        }

        let summary = materialize_appointments(&store, date(2025, 3, 1), date(2025, 3, 3));
        assert!(summary.is_ok());
        if let Ok(summary) = summary {
            assert_eq!(summary.created, 3);
            assert_eq!(summary.skipped_blackout, 3);
        }
    }

    #[test]
    fn missing_reference_is_isolated_to_its_definition() {
        let mut store = MemoryStore::with_catalog();
        let mut orphan = fixed_appointment(
            "fix_orphan",
            RecurrenceKind::Daily,
            1,
            None,
            date(2025, 1, 1),
            time(9, 0),
        );
        orphan.service_id = "svc_gone".to_string();
        store.add_fixed(orphan);
        store.add_fixed(fixed_appointment(
            "fix_ok",
            RecurrenceKind::Daily,
            1,
            None,
            date(2025, 1, 1),
            time(11, 0),
        ));

        let summary = materialize_appointments(&store, date(2025, 1, 1), date(2025, 1, 5));
        assert!(summary.is_ok());
        if let Ok(summary) = summary {
            assert_eq!(summary.created, 5);
        }
        assert!(store.appointment_dates("fix_orphan").is_empty());
    }

    #[test]
    fn lost_insert_race_counts_as_duplicate() {
        let mut store = MemoryStore::with_catalog();
        store.add_fixed(fixed_appointment(
            "fix_race",
            RecurrenceKind::Daily,
            1,
            None,
            date(2025, 1, 1),
            time(9, 0),
        ));
        store.hide_existing_rows();
        store.seed_appointment("fix_race", date(2025, 1, 2), time(9, 0));

        let summary = materialize_appointments(&store, date(2025, 1, 1), date(2025, 1, 3));
        assert!(summary.is_ok());
        if let Ok(summary) = summary {
            assert_eq!(summary.created, 2);
            assert_eq!(summary.skipped_duplicate, 1);
        }
    }

    #[test]
    fn windows_outside_validity_produce_nothing() {
        let mut store = MemoryStore::with_catalog();
        store.add_fixed(fixed_appointment(
            "fix_future",
            RecurrenceKind::Daily,
            1,
            None,
            date(2026, 1, 1),
            time(9, 0),
        ));
        let summary = materialize_appointments(&store, date(2025, 1, 1), date(2025, 1, 31));
        assert_eq!(summary.map(|value| value.created).ok(), Some(0));

        let reversed = materialize_appointments(&store, date(2026, 1, 10), date(2026, 1, 1));
        assert_eq!(reversed.map(|value| value.created).ok(), Some(0));
    }

    #[test]
    fn inactive_definitions_are_ignored() {
        let mut store = MemoryStore::with_catalog();
        let mut retired = fixed_appointment(
            "fix_retired",
            RecurrenceKind::Daily,
            1,
            None,
            date(2025, 1, 1),
            time(9, 0),
        );
        retired.active = false;
        store.add_fixed(retired);

        let summary = materialize_appointments(&store, date(2025, 1, 1), date(2025, 1, 5));
        assert_eq!(summary.map(|value| value.created).ok(), Some(0));
    }
}
