#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use agendar_client::commands::catalog::{
    self, ClientAddOptions, ProfessionalAddOptions, ServiceAddOptions,
};
use agendar_client::commands::definitions::{self, ExpenseAddOptions, FixedAddOptions};
use agendar_client::commands::materialize::{self, MaterializeRunOptions};
use agendar_client::commands::RuleInput;
use agendar_client::{ClientResult, EngineConfig, SuccessEnvelope};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::Value;
use tempfile::{Builder, TempDir};

pub struct Catalog {
    pub professional_id: String,
    pub service_id: String,
    pub client_id: String,
}

pub fn temp_home(prefix: &str) -> std::io::Result<(TempDir, PathBuf)> {
    let dir = Builder::new().prefix(prefix).tempdir()?;
    let home = dir.path().join("agenda-home");
    fs::create_dir_all(&home)?;
    Ok((dir, home))
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap_or_default()
}

/// Short horizon so scenarios stay readable.
pub fn two_week_config() -> EngineConfig {
    EngineConfig {
        horizon_days: 14,
        run_interval_days: 7,
        default_commission_percent: 0,
    }
}

pub fn data(result: ClientResult<SuccessEnvelope>) -> Value {
    if let Err(error) = &result {
        panic!("command failed: {} ({})", error.message, error.code);
    }
    result.map(|envelope| envelope.data).unwrap_or(Value::Null)
}

pub fn error_code(result: ClientResult<SuccessEnvelope>) -> String {
    match result {
        Ok(envelope) => panic!("expected failure, got {}", envelope.data),
        Err(error) => error.code,
    }
}

pub fn id_of(value: &Value, field: &str) -> String {
    value[field].as_str().unwrap_or_default().to_string()
}

pub fn add_professional(home: &Path, name: &str, commission_percent: Option<u32>) -> String {
    let created = data(catalog::add_professional(ProfessionalAddOptions {
        name: name.to_string(),
        commission_percent,
        home_override: Some(home),
    }));
    id_of(&created, "professional_id")
}

pub fn add_service(home: &Path, name: &str, price: &str) -> String {
    let created = data(catalog::add_service(ServiceAddOptions {
        name: name.to_string(),
        price: price.to_string(),
        duration_minutes: Some(45),
        home_override: Some(home),
    }));
    id_of(&created, "service_id")
}

pub fn add_client(home: &Path, name: &str) -> String {
    let created = data(catalog::add_client(ClientAddOptions {
        name: name.to_string(),
        phone: Some("+55 11 90000-0000".to_string()),
        home_override: Some(home),
    }));
    id_of(&created, "client_id")
}

pub fn seed_catalog(home: &Path, commission_percent: Option<u32>) -> Catalog {
    Catalog {
        professional_id: add_professional(home, "Ana", commission_percent),
        service_id: add_service(home, "Haircut", "100.00"),
        client_id: add_client(home, "Bea"),
    }
}

pub fn rule(kind: &str, anchor: Option<&str>, from: &str, until: Option<&str>) -> RuleInput {
    RuleInput {
        kind: kind.to_string(),
        interval: None,
        anchor: anchor.map(str::to_string),
        from: from.to_string(),
        until: until.map(str::to_string),
    }
}

pub fn fixed_options<'a>(
    home: &'a Path,
    catalog: &Catalog,
    time: &str,
    rule: RuleInput,
) -> FixedAddOptions<'a> {
    FixedAddOptions {
        client_id: catalog.client_id.clone(),
        professional_id: catalog.professional_id.clone(),
        service_id: catalog.service_id.clone(),
        time: time.to_string(),
        notes: None,
        rule,
        home_override: Some(home),
    }
}

pub fn add_fixed(home: &Path, catalog: &Catalog, time: &str, rule: RuleInput) -> String {
    let created = data(definitions::add_fixed_appointment(fixed_options(
        home, catalog, time, rule,
    )));
    id_of(&created, "fixed_appointment_id")
}

pub fn add_recurring_expense(home: &Path, description: &str, amount: &str, rule: RuleInput) -> String {
    let created = data(definitions::add_recurring_expense(ExpenseAddOptions {
        description: description.to_string(),
        category: Some("rent".to_string()),
        amount: amount.to_string(),
        rule,
        home_override: Some(home),
    }));
    id_of(&created, "recurring_expense_id")
}

pub fn materialize_on(home: &Path, today: &str, if_due: bool) -> Value {
    data(materialize::run_with_options(MaterializeRunOptions {
        today: date(today),
        if_due,
        config: two_week_config(),
        home_override: Some(home),
    }))
}

pub fn open_db(home: &Path) -> Connection {
    match Connection::open(home.join("agenda.db")) {
        Ok(connection) => connection,
        Err(error) => panic!("agenda db should open: {error}"),
    }
}

pub fn count(home: &Path, sql: &str, id: &str) -> i64 {
    open_db(home)
        .query_row(sql, [id], |row| row.get::<_, i64>(0))
        .unwrap_or(-1)
}

pub fn appointment_dates(home: &Path, fixed_appointment_id: &str) -> Vec<String> {
    let connection = open_db(home);
    let statement = connection.prepare(
        "SELECT date FROM appointments WHERE fixed_appointment_id = ?1 ORDER BY date ASC",
    );
    let mut dates = Vec::new();
    if let Ok(mut stmt) = statement {
        let rows = stmt.query_map([fixed_appointment_id], |row| row.get::<_, String>(0));
        if let Ok(iter) = rows {
            dates.extend(iter.flatten());
        }
    }
    dates
}
