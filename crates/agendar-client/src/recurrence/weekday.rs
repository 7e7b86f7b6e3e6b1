use chrono::Weekday;

const ALL_DAYS_MASK: u8 = 0b0111_1111;

/// Sunday-first ordering used by the stored bitmask.
const BIT_ORDER: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Set of weekdays stored as a 7-bit mask: bit 0 = Sunday ... bit 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Accepts a stored anchor value. Empty or out-of-range masks are rejected.
    pub fn from_mask(mask: i64) -> Option<Self> {
        let narrowed = u8::try_from(mask).ok()?;
        if narrowed == 0 || narrowed & !ALL_DAYS_MASK != 0 {
            return None;
        }
        Some(Self(narrowed))
    }

    pub fn from_weekdays(days: &[Weekday]) -> Self {
        let mask = days.iter().fold(0_u8, |acc, day| acc | weekday_bit(*day));
        Self(mask)
    }

    pub const fn mask(self) -> u8 {
        self.0
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & weekday_bit(day) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        BIT_ORDER.into_iter().filter(move |day| self.contains(*day))
    }

    /// Parses a comma separated list such as `mon,thu` (English short or
    /// long names, case-insensitive).
    pub fn parse_list(value: &str) -> Option<Self> {
        let mut days = Vec::new();
        for token in value.split(',') {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                continue;
            }
            days.push(trimmed.parse::<Weekday>().ok()?);
        }
        let set = Self::from_weekdays(&days);
        if set.is_empty() {
            return None;
        }
        Some(set)
    }

    pub fn labels(self) -> Vec<&'static str> {
        self.iter().map(weekday_label).collect()
    }
}

pub fn weekday_bit(day: Weekday) -> u8 {
    1_u8 << day.num_days_from_sunday()
}

pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "sun",
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::{WeekdaySet, weekday_bit};

    #[test]
    fn bit_zero_is_sunday_and_bit_six_is_saturday() {
        assert_eq!(weekday_bit(Weekday::Sun), 0b0000_0001);
        assert_eq!(weekday_bit(Weekday::Mon), 0b0000_0010);
        assert_eq!(weekday_bit(Weekday::Thu), 0b0001_0000);
        assert_eq!(weekday_bit(Weekday::Sat), 0b0100_0000);
    }

    #[test]
    fn monday_and_thursday_mask_round_trips_through_weekdays() {
        let set = WeekdaySet::from_weekdays(&[Weekday::Mon, Weekday::Thu]);
        assert_eq!(set.mask(), 18);
        assert_eq!(WeekdaySet::from_mask(18), Some(set));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Weekday::Mon, Weekday::Thu]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn masks_outside_seven_bits_are_rejected() {
        assert!(WeekdaySet::from_mask(0).is_none());
        assert!(WeekdaySet::from_mask(128).is_none());
        assert!(WeekdaySet::from_mask(-1).is_none());
        assert!(WeekdaySet::from_mask(127).is_some());
    }

    #[test]
    fn parse_list_accepts_short_and_long_names() {
        let parsed = WeekdaySet::parse_list("Mon, thursday");
        assert_eq!(parsed.map(WeekdaySet::mask), Some(18));
        assert!(WeekdaySet::parse_list("funday").is_none());
        assert!(WeekdaySet::parse_list(" , ").is_none());
    }
}
