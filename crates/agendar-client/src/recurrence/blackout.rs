use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};

use crate::{ClientError, ClientResult};

/// Professional-specific period in which nothing may be materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlackoutWindow {
    pub blackout_id: String,
    pub owner_id: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub span: BlackoutSpan,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlackoutSpan {
    AllDay,
    /// Inclusive on both ends.
    Between { start: NaiveTime, end: NaiveTime },
}

impl BlackoutSpan {
    pub fn new(time_start: Option<NaiveTime>, time_end: Option<NaiveTime>) -> ClientResult<Self> {
        match (time_start, time_end) {
            (None, None) => Ok(Self::AllDay),
            (Some(start), Some(end)) if end >= start => Ok(Self::Between { start, end }),
            (Some(_), Some(_)) => Err(ClientError::invalid_blackout(
                "end time must be on or after start time",
            )),
            _ => Err(ClientError::invalid_blackout(
                "partial-day blackouts need both a start and an end time",
            )),
        }
    }

    pub fn is_all_day(self) -> bool {
        matches!(self, Self::AllDay)
    }

    pub fn covers(self, time: NaiveTime) -> bool {
        match self {
            Self::AllDay => true,
            Self::Between { start, end } => start <= time && time <= end,
        }
    }

    /// True when a booking occupying `[from, until)` touches the span. A
    /// zero-length booking (`from == until`) behaves like [`Self::covers`].
    pub fn overlaps(self, from: NaiveTime, until: NaiveTime) -> bool {
        match self {
            Self::AllDay => true,
            Self::Between { start, end } => from <= end && (until > start || from >= start),
        }
    }
}

impl BlackoutWindow {
    pub fn new(
        blackout_id: &str,
        owner_id: &str,
        date_start: NaiveDate,
        date_end: NaiveDate,
        span: BlackoutSpan,
        reason: Option<String>,
    ) -> ClientResult<Self> {
        if date_end < date_start {
            return Err(ClientError::invalid_blackout(
                "end date must be on or after start date",
            ));
        }
        Ok(Self {
            blackout_id: blackout_id.to_string(),
            owner_id: owner_id.to_string(),
            date_start,
            date_end,
            span,
            reason,
        })
    }

    pub fn covers_date(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }

    pub fn blocks(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.covers_date(date) && self.span.covers(time)
    }
}

/// Owner-keyed lookup over a set of blackout windows.
#[derive(Debug, Clone, Default)]
pub struct BlackoutIndex {
    by_owner: HashMap<String, Vec<BlackoutWindow>>,
}

impl BlackoutIndex {
    pub fn new(windows: impl IntoIterator<Item = BlackoutWindow>) -> Self {
        let mut by_owner: HashMap<String, Vec<BlackoutWindow>> = HashMap::new();
        for window in windows {
            by_owner
                .entry(window.owner_id.clone())
                .or_default()
                .push(window);
        }
        for windows in by_owner.values_mut() {
            windows.sort_by_key(|window| (window.date_start, window.date_end));
        }
        Self { by_owner }
    }

    pub fn is_blocked(&self, owner_id: &str, date: NaiveDate, time: NaiveTime) -> bool {
        self.blocking_window(owner_id, date, time).is_some()
    }

    /// Date-only check: true only when an all-day window covers the date.
    pub fn is_day_blocked(&self, owner_id: &str, date: NaiveDate) -> bool {
        self.windows_for(owner_id)
            .iter()
            .any(|window| window.covers_date(date) && window.span.is_all_day())
    }

    pub fn blocking_window(
        &self,
        owner_id: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Option<&BlackoutWindow> {
        self.windows_for(owner_id)
            .iter()
            .take_while(|window| window.date_start <= date)
            .find(|window| window.blocks(date, time))
    }

    /// First window of `owner_id` on `date` that touches a booking running
    /// from `from` until `until`.
    pub fn window_overlapping(
        &self,
        owner_id: &str,
        date: NaiveDate,
        from: NaiveTime,
        until: NaiveTime,
    ) -> Option<&BlackoutWindow> {
        self.windows_for(owner_id)
            .iter()
            .take_while(|window| window.date_start <= date)
            .find(|window| window.covers_date(date) && window.span.overlaps(from, until))
    }

    fn windows_for(&self, owner_id: &str) -> &[BlackoutWindow] {
        self.by_owner
            .get(owner_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{BlackoutIndex, BlackoutSpan, BlackoutWindow};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
    }

    fn window(
        id: &str,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
        span: BlackoutSpan,
    ) -> BlackoutWindow {
        match BlackoutWindow::new(id, owner, start, end, span, None) {
            Ok(value) => value,
            Err(error) => panic!("window should be valid: {}", error.message),
        }
    }

    #[test]
    fn all_day_window_blocks_every_time_on_covered_dates() {
        let index = BlackoutIndex::new([window(
            "blk_1",
            "pro_ana",
            date(2025, 2, 10),
            date(2025, 2, 10),
            BlackoutSpan::AllDay,
        )]);
        assert!(index.is_blocked("pro_ana", date(2025, 2, 10), time(0, 0)));
        assert!(index.is_blocked("pro_ana", date(2025, 2, 10), time(23, 59)));
        assert!(!index.is_blocked("pro_ana", date(2025, 2, 11), time(9, 0)));
        assert!(!index.is_blocked("pro_bia", date(2025, 2, 10), time(9, 0)));
        assert!(index.is_day_blocked("pro_ana", date(2025, 2, 10)));
    }

    #[test]
    fn partial_window_bounds_are_inclusive() {
        let span = BlackoutSpan::new(Some(time(12, 0)), Some(time(14, 0)));
        assert!(span.is_ok());
        if let Ok(value) = span {
            let index = BlackoutIndex::new([window(
                "blk_2",
                "pro_ana",
                date(2025, 3, 1),
                date(2025, 3, 3),
                value,
            )]);
            assert!(index.is_blocked("pro_ana", date(2025, 3, 2), time(12, 0)));
            assert!(index.is_blocked("pro_ana", date(2025, 3, 3), time(14, 0)));
            assert!(!index.is_blocked("pro_ana", date(2025, 3, 2), time(14, 1)));
            assert!(!index.is_blocked("pro_ana", date(2025, 3, 2), time(11, 59)));
            assert!(!index.is_day_blocked("pro_ana", date(2025, 3, 2)));
        }
    }

    #[test]
    fn any_matching_window_blocks_even_when_earlier_ones_do_not() {
        let lunch = BlackoutSpan::new(Some(time(12, 0)), Some(time(13, 0)));
        assert!(lunch.is_ok());
        if let Ok(span) = lunch {
            let index = BlackoutIndex::new([
                window("blk_a", "pro_ana", date(2025, 1, 1), date(2025, 12, 31), span),
                window(
                    "blk_b",
                    "pro_ana",
                    date(2025, 6, 1),
                    date(2025, 6, 30),
                    BlackoutSpan::AllDay,
                ),
            ]);
            let blocking = index.blocking_window("pro_ana", date(2025, 6, 15), time(9, 0));
            assert_eq!(blocking.map(|value| value.blackout_id.as_str()), Some("blk_b"));
        }
    }

    #[test]
    fn bookings_overlapping_a_partial_window_are_found() {
        let lunch = BlackoutSpan::new(Some(time(12, 0)), Some(time(13, 0)));
        assert!(lunch.is_ok());
        if let Ok(span) = lunch {
            let index = BlackoutIndex::new([window(
                "blk_lunch",
                "pro_ana",
                date(2025, 3, 1),
                date(2025, 3, 1),
                span,
            )]);
            let day = date(2025, 3, 1);
            assert!(
                index
                    .window_overlapping("pro_ana", day, time(11, 30), time(12, 30))
                    .is_some()
            );
            assert!(
                index
                    .window_overlapping("pro_ana", day, time(11, 0), time(12, 0))
                    .is_none()
            );
            assert!(
                index
                    .window_overlapping("pro_ana", day, time(13, 0), time(13, 0))
                    .is_some()
            );
            assert!(
                index
                    .window_overlapping("pro_ana", day, time(13, 1), time(14, 0))
                    .is_none()
            );
            assert!(
                index
                    .window_overlapping("pro_ana", date(2025, 3, 2), time(12, 0), time(12, 30))
                    .is_none()
            );
        }
    }

    #[test]
    fn invalid_windows_are_rejected() {
        let reversed = BlackoutWindow::new(
            "blk_x",
            "pro_ana",
            date(2025, 2, 10),
            date(2025, 2, 9),
            BlackoutSpan::AllDay,
            None,
        );
        assert!(reversed.is_err());
        assert!(BlackoutSpan::new(Some(time(15, 0)), Some(time(14, 0))).is_err());
        assert!(BlackoutSpan::new(Some(time(15, 0)), None).is_err());
        if let Err(error) = BlackoutSpan::new(None, Some(time(14, 0))) {
            assert_eq!(error.code, "invalid_blackout");
        }
    }
}
