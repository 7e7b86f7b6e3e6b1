use std::path::Path;

use rusqlite::params;

use crate::commands::common::{
    Workspace, new_id, optional_text, parse_money, required_text,
};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{ClientRow, ProfessionalRow, RowsData, ServiceRow};
use crate::schedule::store::{now_timestamp, parse_amount};
use crate::state::map_sqlite_error;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct ProfessionalAddOptions<'a> {
    pub name: String,
    pub commission_percent: Option<u32>,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct ServiceAddOptions<'a> {
    pub name: String,
    pub price: String,
    pub duration_minutes: Option<i64>,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct ClientAddOptions<'a> {
    pub name: String,
    pub phone: Option<String>,
    pub home_override: Option<&'a Path>,
}

pub fn add_professional(options: ProfessionalAddOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "catalog professional add";
    let name = required_text(&options.name, "name", command)?;
    if let Some(percent) = options.commission_percent
        && percent > 100
    {
        return Err(ClientError::invalid_argument_for_command(
            "`commission` must be between 0 and 100.",
            Some(command),
        ));
    }

    let workspace = Workspace::open(options.home_override)?;
    let row = ProfessionalRow {
        professional_id: new_id("pro"),
        name,
        commission_percent: options.commission_percent,
    };
    workspace
        .connection
        .execute(
            "INSERT INTO professionals (professional_id, name, commission_percent, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                &row.professional_id,
                &row.name,
                row.commission_percent,
                now_timestamp()
            ],
        )
        .map_err(|error| map_sqlite_error(workspace.db_path(), &error))?;

    success(command, row)
}

pub fn add_service(options: ServiceAddOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "catalog service add";
    let name = required_text(&options.name, "name", command)?;
    let price = parse_money(&options.price, "price", command)?;
    if let Some(minutes) = options.duration_minutes
        && minutes <= 0
    {
        return Err(ClientError::invalid_argument_for_command(
            "`duration` must be a positive number of minutes.",
            Some(command),
        ));
    }

    let workspace = Workspace::open(options.home_override)?;
    let row = ServiceRow {
        service_id: new_id("svc"),
        name,
        price: format!("{price:.2}"),
        duration_minutes: options.duration_minutes,
    };
    workspace
        .connection
        .execute(
            "INSERT INTO services (service_id, name, price, duration_minutes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &row.service_id,
                &row.name,
                &row.price,
                row.duration_minutes,
                now_timestamp()
            ],
        )
        .map_err(|error| map_sqlite_error(workspace.db_path(), &error))?;

    success(command, row)
}

pub fn add_client(options: ClientAddOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "catalog client add";
    let name = required_text(&options.name, "name", command)?;

    let workspace = Workspace::open(options.home_override)?;
    let row = ClientRow {
        client_id: new_id("cli"),
        name,
        phone: optional_text(options.phone.as_deref()),
    };
    workspace
        .connection
        .execute(
            "INSERT INTO clients (client_id, name, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![&row.client_id, &row.name, &row.phone, now_timestamp()],
        )
        .map_err(|error| map_sqlite_error(workspace.db_path(), &error))?;

    success(command, row)
}

pub fn list_professionals(home_override: Option<&Path>) -> ClientResult<SuccessEnvelope> {
    let workspace = Workspace::open(home_override)?;
    let db_path = workspace.db_path();
    let mut statement = workspace
        .connection
        .prepare(
            "SELECT professional_id, name, commission_percent
             FROM professionals
             ORDER BY name ASC, professional_id ASC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let rows_iter = statement
        .query_map([], |row| {
            Ok(ProfessionalRow {
                professional_id: row.get(0)?,
                name: row.get(1)?,
                commission_percent: row.get(2)?,
            })
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    success("catalog professional list", RowsData::new(rows))
}

pub fn list_services(home_override: Option<&Path>) -> ClientResult<SuccessEnvelope> {
    let workspace = Workspace::open(home_override)?;
    let db_path = workspace.db_path();
    let mut statement = workspace
        .connection
        .prepare(
            "SELECT service_id, name, price, duration_minutes
             FROM services
             ORDER BY name ASC, service_id ASC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let rows_iter = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        let (service_id, name, price, duration_minutes) =
            row.map_err(|error| map_sqlite_error(db_path, &error))?;
        let price = parse_amount(db_path, "price", &price)?;
        rows.push(ServiceRow {
            service_id,
            name,
            price: format!("{price:.2}"),
            duration_minutes,
        });
    }
    success("catalog service list", RowsData::new(rows))
}

pub fn list_clients(home_override: Option<&Path>) -> ClientResult<SuccessEnvelope> {
    let workspace = Workspace::open(home_override)?;
    let db_path = workspace.db_path();
    let mut statement = workspace
        .connection
        .prepare(
            "SELECT client_id, name, phone
             FROM clients
             ORDER BY name ASC, client_id ASC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let rows_iter = statement
        .query_map([], |row| {
            Ok(ClientRow {
                client_id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
            })
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    success("catalog client list", RowsData::new(rows))
}
