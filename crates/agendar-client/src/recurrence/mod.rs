pub mod blackout;
pub mod date;
pub mod occurrence;
pub mod rule;
pub mod weekday;

pub use blackout::{BlackoutIndex, BlackoutSpan, BlackoutWindow};
pub use date::DateRange;
pub use occurrence::{Occurrences, count_in_range, occurrences_in_range, occurs};
pub use rule::{Anchor, LAST_DAY_OF_MONTH, RecurrenceKind, RecurrenceRule};
pub use weekday::WeekdaySet;
