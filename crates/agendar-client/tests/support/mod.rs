pub mod agenda_testkit;
