use chrono::{Datelike, NaiveDate};

use crate::recurrence::date::days_in_month;
use crate::recurrence::weekday::WeekdaySet;
use crate::{ClientError, ClientResult};

/// Sentinel monthly anchor meaning "last calendar day of the month".
pub const LAST_DAY_OF_MONTH: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    /// Fixed 15-day cadence. Not the same as `Weekly` with interval 2.
    Biweekly,
    Monthly,
    Yearly,
}

impl RecurrenceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "biweekly" => Some(Self::Biweekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// Decoded form of the stored anchor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    None,
    Weekdays(WeekdaySet),
    DayOfMonth(u32),
    LastDayOfMonth,
    MonthDay { month: u32, day: u32 },
}

/// A validated recurrence pattern. Construct through [`RecurrenceRule::new`];
/// every instance satisfies `interval >= 1` and `valid_until >= valid_from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    kind: RecurrenceKind,
    interval: u32,
    anchor_value: Option<i64>,
    anchor: Anchor,
    valid_from: NaiveDate,
    valid_until: Option<NaiveDate>,
}

impl RecurrenceRule {
    pub fn new(
        kind: RecurrenceKind,
        interval: i64,
        anchor_value: Option<i64>,
        valid_from: NaiveDate,
        valid_until: Option<NaiveDate>,
    ) -> ClientResult<Self> {
        if interval < 1 {
            return Err(ClientError::invalid_rule(&format!(
                "interval must be 1 or more (got {interval})"
            )));
        }
        let interval = u32::try_from(interval)
            .map_err(|_| ClientError::invalid_rule("interval is too large"))?;

        if let Some(until) = valid_until
            && until < valid_from
        {
            return Err(ClientError::invalid_rule(
                "`until` must be on or after `from`",
            ));
        }

        let anchor = decode_anchor(kind, anchor_value, valid_from)?;

        Ok(Self {
            kind,
            interval,
            anchor_value,
            anchor,
            valid_from,
            valid_until,
        })
    }

    pub fn weekly(
        days: WeekdaySet,
        interval: i64,
        valid_from: NaiveDate,
        valid_until: Option<NaiveDate>,
    ) -> ClientResult<Self> {
        Self::new(
            RecurrenceKind::Weekly,
            interval,
            Some(i64::from(days.mask())),
            valid_from,
            valid_until,
        )
    }

    pub fn kind(&self) -> RecurrenceKind {
        self.kind
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn anchor_value(&self) -> Option<i64> {
        self.anchor_value
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn valid_from(&self) -> NaiveDate {
        self.valid_from
    }

    pub fn valid_until(&self) -> Option<NaiveDate> {
        self.valid_until
    }

    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_until.is_none_or(|until| date <= until)
    }

    /// Ends the rule on `last_day`, never before `valid_from` and never later
    /// than an existing end date.
    pub fn ending_on(&self, last_day: NaiveDate) -> Self {
        let capped = match self.valid_until {
            Some(until) => until.min(last_day),
            None => last_day,
        };
        Self {
            valid_until: Some(capped.max(self.valid_from)),
            ..self.clone()
        }
    }
}

fn decode_anchor(
    kind: RecurrenceKind,
    anchor_value: Option<i64>,
    valid_from: NaiveDate,
) -> ClientResult<Anchor> {
    match kind {
        RecurrenceKind::Daily | RecurrenceKind::Biweekly => match anchor_value {
            None => Ok(Anchor::None),
            Some(value) => Err(ClientError::invalid_rule(&format!(
                "{} rules do not take an anchor value (got {value})",
                kind.as_str()
            ))),
        },
        RecurrenceKind::Weekly => {
            let Some(value) = anchor_value else {
                return Err(ClientError::invalid_rule(
                    "weekly rules need a weekday mask",
                ));
            };
            WeekdaySet::from_mask(value)
                .map(Anchor::Weekdays)
                .ok_or_else(|| {
                    ClientError::invalid_rule(&format!(
                        "weekday mask must be between 1 and 127 (got {value})"
                    ))
                })
        }
        RecurrenceKind::Monthly => match anchor_value {
            Some(LAST_DAY_OF_MONTH) => Ok(Anchor::LastDayOfMonth),
            Some(value) if (1..=31).contains(&value) => {
                Ok(Anchor::DayOfMonth(u32::try_from(value).unwrap_or(1)))
            }
            Some(value) => Err(ClientError::invalid_rule(&format!(
                "monthly day must be 1-31 or -1 (got {value})"
            ))),
            None => Err(ClientError::invalid_rule("monthly rules need a day of month")),
        },
        RecurrenceKind::Yearly => match anchor_value {
            None => Ok(Anchor::MonthDay {
                month: valid_from.month(),
                day: valid_from.day(),
            }),
            Some(value) => decode_month_day(value),
        },
    }
}

/// Yearly anchors are encoded as `MMDD`, e.g. `1225`.
fn decode_month_day(value: i64) -> ClientResult<Anchor> {
    let invalid = || {
        ClientError::invalid_rule(&format!(
            "yearly anchor must be a real MMDD month/day (got {value})"
        ))
    };
    let month = u32::try_from(value / 100).map_err(|_| invalid())?;
    let day = u32::try_from(value % 100).map_err(|_| invalid())?;
    if !(1..=12).contains(&month) || day < 1 || day > days_in_month(2000, month) {
        return Err(invalid());
    }
    Ok(Anchor::MonthDay { month, day })
}
