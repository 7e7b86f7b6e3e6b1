use std::path::Path;

use rusqlite::params;

use crate::ClientResult;
use crate::commands::common::Workspace;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{ExpenseRow, RowsData};
use crate::recurrence::date::{build_range, format_iso_date};
use crate::schedule::store::parse_amount;
use crate::state::map_sqlite_error;

#[derive(Debug, Default)]
pub struct ExpenseListOptions<'a> {
    pub from: String,
    pub to: String,
    pub home_override: Option<&'a Path>,
}

/// Concrete expenses dated inside `[from, to]`.
pub fn list(options: ExpenseListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "expenses list";
    let range = build_range(&options.from, &options.to, command)?;

    let workspace = Workspace::open(options.home_override)?;
    let db_path = workspace.db_path();
    let mut statement = workspace
        .connection
        .prepare(
            "SELECT
                expense_id,
                recurring_expense_id,
                description,
                category,
                amount,
                date,
                paid
             FROM expenses
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date ASC, expense_id ASC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let rows_iter = statement
        .query_map(
            params![format_iso_date(&range.start), format_iso_date(&range.end)],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            },
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        let (expense_id, recurring_expense_id, description, category, amount, date, paid) =
            row.map_err(|error| map_sqlite_error(db_path, &error))?;
        let amount = parse_amount(db_path, "amount", &amount)?;
        rows.push(ExpenseRow {
            expense_id,
            recurring_expense_id,
            description,
            category,
            amount: format!("{amount:.2}"),
            date,
            paid: paid != 0,
        });
    }
    success(command, RowsData::new(rows))
}
