//! Expansion of a [`RecurrenceRule`] into calendar dates.
//!
//! Matching is evaluated per day against the rule's anchor (`valid_from`), so
//! any range can be replayed without knowing what was generated before.

use chrono::{Datelike, Days, NaiveDate};

use crate::recurrence::date::{DateRange, is_last_day_of_month, is_leap_year, months_between};
use crate::recurrence::rule::{Anchor, RecurrenceKind, RecurrenceRule};

/// Day count of the fixed biweekly cadence.
pub const BIWEEKLY_CADENCE_DAYS: i64 = 15;

/// True when `rule` fires on `date`.
pub fn occurs(rule: &RecurrenceRule, date: NaiveDate) -> bool {
    if !rule.is_valid_on(date) {
        return false;
    }

    let elapsed_days = (date - rule.valid_from()).num_days();
    let interval = i64::from(rule.interval());

    match rule.kind() {
        RecurrenceKind::Daily => elapsed_days % interval == 0,
        RecurrenceKind::Weekly => {
            let Anchor::Weekdays(days) = rule.anchor() else {
                return false;
            };
            if !days.contains(date.weekday()) {
                return false;
            }
            interval == 1 || (elapsed_days / 7) % interval == 0
        }
        RecurrenceKind::Biweekly => elapsed_days % BIWEEKLY_CADENCE_DAYS == 0,
        RecurrenceKind::Monthly => {
            let day_matches = match rule.anchor() {
                Anchor::LastDayOfMonth => is_last_day_of_month(date),
                Anchor::DayOfMonth(day) => date.day() == day,
                _ => false,
            };
            day_matches && months_between(rule.valid_from(), date) % interval == 0
        }
        RecurrenceKind::Yearly => {
            let Anchor::MonthDay { month, day } = rule.anchor() else {
                return false;
            };
            let years = i64::from(date.year() - rule.valid_from().year());
            anniversary_matches(date, month, day) && years % interval == 0
        }
    }
}

/// Lazily enumerates the dates in `[range_start, range_end]` on which `rule`
/// fires. The range is clamped to the rule's validity window first; an empty
/// window yields an empty iterator.
pub fn occurrences_in_range(
    rule: &RecurrenceRule,
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> Occurrences {
    let window = DateRange::new(range_start, range_end)
        .and_then(|range| range.clamp_to(rule.valid_from(), rule.valid_until()));
    Occurrences {
        rule: rule.clone(),
        cursor: window.map(|range| range.start),
        end: window.map_or(range_end, |range| range.end),
    }
}

pub fn count_in_range(rule: &RecurrenceRule, range_start: NaiveDate, range_end: NaiveDate) -> i64 {
    let count = occurrences_in_range(rule, range_start, range_end).count();
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Iterator returned by [`occurrences_in_range`]. Cloning restarts from the
/// clone point.
#[derive(Debug, Clone)]
pub struct Occurrences {
    rule: RecurrenceRule,
    cursor: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.cursor {
            if current > self.end {
                self.cursor = None;
                break;
            }
            self.cursor = current.checked_add_days(Days::new(1));
            if occurs(&self.rule, current) {
                return Some(current);
            }
        }
        None
    }
}

fn anniversary_matches(date: NaiveDate, month: u32, day: u32) -> bool {
    if date.month() != month {
        return false;
    }
    if month == 2 && day == 29 && !is_leap_year(date.year()) {
        return date.day() == 28;
    }
    date.day() == day
}
