use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};

use crate::migrations::{
    MIGRATION_COUNT, REQUIRED_INDEX_NAMES, REQUIRED_META_KEYS, run_pending, safe_repair_statement,
};
use crate::state::{
    agenda_db_path, ensure_agenda_directory, map_sqlite_error, open_connection,
    resolve_agenda_home,
};
use crate::{ClientError, ClientResult};

const INTERNAL_META_COLUMNS: [&str; 2] = ["key", "value"];
const PROFESSIONALS_COLUMNS: [&str; 3] = ["professional_id", "name", "commission_percent"];
const CLIENTS_COLUMNS: [&str; 2] = ["client_id", "name"];
const SERVICES_COLUMNS: [&str; 3] = ["service_id", "name", "price"];
const FIXED_APPOINTMENTS_COLUMNS: [&str; 12] = [
    "fixed_appointment_id",
    "client_id",
    "professional_id",
    "service_id",
    "time_of_day",
    "notes",
    "recurrence_kind",
    "recurrence_interval",
    "anchor_value",
    "valid_from",
    "valid_until",
    "active",
];
const APPOINTMENTS_COLUMNS: [&str; 9] = [
    "appointment_id",
    "fixed_appointment_id",
    "client_id",
    "professional_id",
    "service_id",
    "date",
    "time",
    "notes",
    "status",
];
const BLACKOUT_WINDOWS_COLUMNS: [&str; 7] = [
    "blackout_id",
    "professional_id",
    "date_start",
    "date_end",
    "all_day",
    "time_start",
    "time_end",
];
const RECURRING_EXPENSES_COLUMNS: [&str; 10] = [
    "recurring_expense_id",
    "description",
    "category",
    "amount",
    "recurrence_kind",
    "recurrence_interval",
    "anchor_value",
    "valid_from",
    "valid_until",
    "active",
];
const EXPENSES_COLUMNS: [&str; 6] = [
    "expense_id",
    "recurring_expense_id",
    "description",
    "amount",
    "date",
    "paid",
];

const REQUIRED_CORE_TABLES: [(&str, &[&str]); 9] = [
    ("internal_meta", &INTERNAL_META_COLUMNS),
    ("professionals", &PROFESSIONALS_COLUMNS),
    ("clients", &CLIENTS_COLUMNS),
    ("services", &SERVICES_COLUMNS),
    ("fixed_appointments", &FIXED_APPOINTMENTS_COLUMNS),
    ("appointments", &APPOINTMENTS_COLUMNS),
    ("blackout_windows", &BLACKOUT_WINDOWS_COLUMNS),
    ("recurring_expenses", &RECURRING_EXPENSES_COLUMNS),
    ("expenses", &EXPENSES_COLUMNS),
];

#[derive(Debug, Clone)]
pub struct SetupContext {
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub schema_version: String,
}

impl SetupContext {
    pub fn connect(&self) -> ClientResult<Connection> {
        open_connection(&self.db_path)
    }
}

pub fn ensure_initialized() -> ClientResult<SetupContext> {
    ensure_initialized_with_home_override(None)
}

pub fn ensure_initialized_at(home_override: &Path) -> ClientResult<SetupContext> {
    ensure_initialized_with_home_override(Some(home_override))
}

pub(crate) fn load_setup(home_override: Option<&Path>) -> ClientResult<SetupContext> {
    ensure_initialized_with_home_override(home_override)
}

fn ensure_initialized_with_home_override(
    home_override: Option<&Path>,
) -> ClientResult<SetupContext> {
    let agenda_home = resolve_agenda_home(home_override)?;
    ensure_agenda_directory(&agenda_home)?;

    let db_path = agenda_db_path(&agenda_home);
    let mut connection = open_connection(&db_path)?;

    run_pending(&mut connection).map_err(|error| map_migration_error(&db_path, &error))?;

    verify_core_tables(&connection, &db_path)?;
    repair_safe_objects(&connection, &db_path)?;
    verify_post_repair_objects(&connection, &db_path)?;

    let schema_version = read_schema_version(&connection, &db_path)?;

    Ok(SetupContext {
        home: agenda_home,
        db_path,
        schema_version,
    })
}

fn map_migration_error(db_path: &Path, error: &rusqlite_migration::Error) -> ClientError {
    match error {
        rusqlite_migration::Error::RusqliteError { query: _, err } => {
            let mapped = map_sqlite_error(db_path, err);
            if mapped.code == "store_locked"
                || mapped.code == "store_corrupt"
                || mapped.code == "store_init_permission_denied"
            {
                mapped
            } else {
                ClientError::migration_failed(db_path, &error.to_string())
            }
        }
        _ => ClientError::migration_failed(db_path, &error.to_string()),
    }
}

fn verify_core_tables(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    for (table_name, required_columns) in REQUIRED_CORE_TABLES {
        if !sqlite_object_exists(connection, "table", table_name, db_path)? {
            return Err(ClientError::store_corrupt(db_path));
        }

        let columns = table_columns(connection, table_name, db_path)?;
        for required_column in required_columns {
            if !columns.iter().any(|column| column == required_column) {
                return Err(ClientError::store_corrupt(db_path));
            }
        }
    }

    Ok(())
}

fn repair_safe_objects(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    // Meta repair is insert-only: missing keys are restored, drifted values
    // are rejected during verification.
    for (meta_key, default_value) in REQUIRED_META_KEYS {
        connection
            .execute(
                "INSERT OR IGNORE INTO internal_meta (key, value) VALUES (?1, ?2)",
                params![meta_key, default_value],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
    }

    for index_name in REQUIRED_INDEX_NAMES {
        if !sqlite_object_exists(connection, "index", index_name, db_path)? {
            tracing::warn!(index = index_name, "restoring missing agenda index");
            let sql = safe_repair_statement(index_name).ok_or_else(|| {
                ClientError::store_init_failed(db_path, "Missing canonical SQL for index repair.")
            })?;
            connection
                .execute_batch(&sql)
                .map_err(|error| map_sqlite_error(db_path, &error))?;
        }
    }

    Ok(())
}

fn verify_post_repair_objects(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    let user_version = connection
        .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    if user_version != MIGRATION_COUNT {
        return Err(ClientError::store_corrupt(db_path));
    }

    for (meta_key, expected_value) in REQUIRED_META_KEYS {
        let value = read_meta(connection, db_path, meta_key)?;

        let Some(actual) = value else {
            return Err(ClientError::store_corrupt(db_path));
        };
        if actual != expected_value {
            return Err(ClientError::store_corrupt(db_path));
        }
    }

    for index_name in REQUIRED_INDEX_NAMES {
        if !sqlite_object_exists(connection, "index", index_name, db_path)? {
            return Err(ClientError::store_corrupt(db_path));
        }
    }

    Ok(())
}

pub(crate) fn read_meta(
    connection: &Connection,
    db_path: &Path,
    key: &str,
) -> ClientResult<Option<String>> {
    connection
        .query_row(
            "SELECT value FROM internal_meta WHERE key = ?1 LIMIT 1",
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub(crate) fn write_meta(
    connection: &Connection,
    db_path: &Path,
    key: &str,
    value: &str,
) -> ClientResult<()> {
    connection
        .execute(
            "INSERT INTO internal_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(())
}

fn sqlite_object_exists(
    connection: &Connection,
    object_type: &str,
    object_name: &str,
    db_path: &Path,
) -> ClientResult<bool> {
    let exists = connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2 LIMIT 1",
            params![object_type, object_name],
            |_row| Ok(true),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?
        .unwrap_or(false);

    Ok(exists)
}

fn table_columns(
    connection: &Connection,
    table_name: &str,
    db_path: &Path,
) -> ClientResult<Vec<String>> {
    if !is_required_core_table(table_name) {
        return Err(ClientError::store_init_failed(
            db_path,
            "Refused PRAGMA table inspection for non-core table.",
        ));
    }

    // SAFETY: `table_name` is restricted to the compile-time allowlist in
    // REQUIRED_CORE_TABLES and never originates from user input.
    let sql = format!("PRAGMA table_info({table_name})");
    let mut statement = connection
        .prepare(&sql)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let column_iter = statement
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut columns: Vec<String> = Vec::new();
    for row in column_iter {
        let column = row.map_err(|error| map_sqlite_error(db_path, &error))?;
        columns.push(column);
    }

    Ok(columns)
}

fn is_required_core_table(table_name: &str) -> bool {
    REQUIRED_CORE_TABLES
        .iter()
        .any(|(required_name, _)| required_name == &table_name)
}

fn read_schema_version(connection: &Connection, db_path: &Path) -> ClientResult<String> {
    let value = read_meta(connection, db_path, "schema_version")?;
    Ok(value.unwrap_or_else(|| "v1".to_string()))
}
