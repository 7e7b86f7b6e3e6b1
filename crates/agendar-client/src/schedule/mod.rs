pub mod commission;
mod driver;
pub mod expenses;
pub mod materialize;
pub mod store;
#[cfg(test)]
mod testing;
pub mod types;

pub use commission::{
    AccrualLine, ProfessionalAccrual, accrue, accrue_fixed_appointment, accrue_professional,
    format_money, round_for_display,
};
pub use driver::MaterializeSummary;
pub use expenses::project_expenses;
pub use materialize::{horizon_window, materialize_appointments};
pub use store::{ScheduleStore, SqliteStore};
pub use types::{
    FixedAppointment, InsertOutcome, NewAppointment, NewExpense, Professional, RecurringDefinition,
    RecurringExpense, Service,
};
