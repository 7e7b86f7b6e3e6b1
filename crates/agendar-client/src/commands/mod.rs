pub mod appointments;
pub mod blackout;
pub mod catalog;
pub mod commission;
pub(crate) mod common;
pub mod definitions;
pub mod expenses;
pub mod materialize;

pub use common::RuleInput;
