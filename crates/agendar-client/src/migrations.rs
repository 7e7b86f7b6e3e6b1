use std::collections::HashMap;

use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

const BOOTSTRAP_SQL: &str = include_str!("migrations/0001_bootstrap.sql");
const OCCURRENCE_UNIQUENESS_SQL: &str = include_str!("migrations/0002_occurrence_uniqueness.sql");

pub const MIGRATION_COUNT: i64 = 2;

pub const REQUIRED_INDEX_NAMES: [&str; 6] = [
    "idx_appointments_professional_date",
    "idx_fixed_appointments_professional",
    "idx_blackout_windows_professional_dates",
    "idx_expenses_date",
    "idx_appointments_fixed_slot",
    "idx_expenses_recurring_date",
];

pub const REQUIRED_META_KEYS: [(&str, &str); 2] = [
    ("schema_version", "v1"),
    ("store_contract_version", "v1"),
];

pub fn run_pending(conn: &mut Connection) -> rusqlite_migration::Result<()> {
    let migrations = Migrations::new(vec![
        M::up(BOOTSTRAP_SQL),
        M::up(OCCURRENCE_UNIQUENESS_SQL),
    ]);
    migrations.to_latest(conn)
}

pub fn safe_repair_statement(statement_name: &str) -> Option<String> {
    parse_safe_repair_statements().remove(statement_name)
}

fn parse_safe_repair_statements() -> HashMap<String, String> {
    let mut blocks: HashMap<String, String> = HashMap::new();
    let mut active_name: Option<String> = None;
    let mut active_sql = String::new();

    for line in BOOTSTRAP_SQL.lines().chain(OCCURRENCE_UNIQUENESS_SQL.lines()) {
        let trimmed = line.trim();

        if let Some(name) = trimmed.strip_prefix("-- agendar:safe_repair:start:") {
            active_name = Some(name.to_string());
            active_sql.clear();
            continue;
        }

        if let Some(name) = trimmed.strip_prefix("-- agendar:safe_repair:end:") {
            if let Some(active) = &active_name
                && active == name
            {
                blocks.insert(name.to_string(), active_sql.trim().to_string());
            }
            active_name = None;
            active_sql.clear();
            continue;
        }

        if active_name.is_some() {
            active_sql.push_str(line);
            active_sql.push('\n');
        }
    }

    blocks
}
