use std::io;

use serde_json::Value;

use super::format::{Column, field, key_value_rows, render_table, rows_of};

pub fn render_success(command: &str, data: &Value) -> io::Result<String> {
    let rendered = match command {
        "materialize" => render_materialize(data),
        "commission" => render_commission(data),
        "fixed add" => render_fixed_added(data),
        "fixed list" => render_definition_list(data, "fixed appointment", &FIXED_COLUMNS),
        "expense add" => render_expense_added(data),
        "expense list" => render_definition_list(data, "recurring expense", &EXPENSE_COLUMNS),
        "preview" => render_preview(data),
        "retire" => render_retire(data),
        "blackout add" => render_added("Blackout window added.", data, &BLACKOUT_FIELDS),
        "blackout list" => render_rows(data, "blackout window", &BLACKOUT_COLUMNS),
        "catalog professional add" => {
            render_added("Professional added.", data, &PROFESSIONAL_FIELDS)
        }
        "catalog professional list" => render_rows(data, "professional", &PROFESSIONAL_COLUMNS),
        "catalog service add" => render_added("Service added.", data, &SERVICE_FIELDS),
        "catalog service list" => render_rows(data, "service", &SERVICE_COLUMNS),
        "catalog client add" => render_added("Client added.", data, &CLIENT_FIELDS),
        "catalog client list" => render_rows(data, "client", &CLIENT_COLUMNS),
        "appointments add" => render_added("Appointment booked.", data, &APPOINTMENT_FIELDS),
        "appointments list" => render_rows(data, "appointment", &APPOINTMENT_COLUMNS),
        "expenses list" => render_rows(data, "expense", &EXPENSE_ROW_COLUMNS),
        _ => {
            return Err(io::Error::other(format!(
                "unsupported text output command `{command}`"
            )));
        }
    };
    Ok(rendered)
}

const FIXED_COLUMNS: [Column<'static>; 6] = [
    Column::left("Id", "fixed_appointment_id"),
    Column::left("Professional", "professional_id"),
    Column::left("Client", "client_id"),
    Column::left("Time", "time_of_day"),
    Column::left("Rule", "rule_summary"),
    Column::left("Active", "active"),
];

const EXPENSE_COLUMNS: [Column<'static>; 5] = [
    Column::left("Id", "recurring_expense_id"),
    Column::left("Description", "description"),
    Column::right("Amount", "amount"),
    Column::left("Rule", "rule_summary"),
    Column::left("Active", "active"),
];

const BLACKOUT_FIELDS: [(&str, &str); 6] = [
    ("Id", "blackout_id"),
    ("Professional", "professional_id"),
    ("From", "date_start"),
    ("To", "date_end"),
    ("Hours", "hours"),
    ("Reason", "reason"),
];

const BLACKOUT_COLUMNS: [Column<'static>; 5] = [
    Column::left("Id", "blackout_id"),
    Column::left("From", "date_start"),
    Column::left("To", "date_end"),
    Column::left("Hours", "hours"),
    Column::left("Reason", "reason"),
];

const PROFESSIONAL_FIELDS: [(&str, &str); 3] = [
    ("Id", "professional_id"),
    ("Name", "name"),
    ("Commission %", "commission_percent"),
];

const PROFESSIONAL_COLUMNS: [Column<'static>; 3] = [
    Column::left("Id", "professional_id"),
    Column::left("Name", "name"),
    Column::right("Commission %", "commission_percent"),
];

const SERVICE_FIELDS: [(&str, &str); 4] = [
    ("Id", "service_id"),
    ("Name", "name"),
    ("Price", "price"),
    ("Minutes", "duration_minutes"),
];

const SERVICE_COLUMNS: [Column<'static>; 4] = [
    Column::left("Id", "service_id"),
    Column::left("Name", "name"),
    Column::right("Price", "price"),
    Column::right("Minutes", "duration_minutes"),
];

const CLIENT_FIELDS: [(&str, &str); 3] = [("Id", "client_id"), ("Name", "name"), ("Phone", "phone")];

const CLIENT_COLUMNS: [Column<'static>; 3] = [
    Column::left("Id", "client_id"),
    Column::left("Name", "name"),
    Column::left("Phone", "phone"),
];

const APPOINTMENT_FIELDS: [(&str, &str); 6] = [
    ("Id", "appointment_id"),
    ("Date", "date"),
    ("Time", "time"),
    ("Professional", "professional_id"),
    ("Client", "client_id"),
    ("Service", "service_id"),
];

const APPOINTMENT_COLUMNS: [Column<'static>; 7] = [
    Column::left("Date", "date"),
    Column::left("Time", "time"),
    Column::left("Professional", "professional_id"),
    Column::left("Client", "client_id"),
    Column::left("Service", "service_id"),
    Column::left("Source", "fixed_appointment_id"),
    Column::left("Status", "status"),
];

const EXPENSE_ROW_COLUMNS: [Column<'static>; 5] = [
    Column::left("Date", "date"),
    Column::left("Description", "description"),
    Column::right("Amount", "amount"),
    Column::left("Source", "recurring_expense_id"),
    Column::left("Paid", "paid"),
];

fn render_materialize(data: &Value) -> String {
    let window = format!("{} to {}", field(data, "from"), field(data, "to"));
    let ran = data.get("ran").and_then(Value::as_bool).unwrap_or(false);
    if !ran {
        return [
            "Materialization is not due yet.".to_string(),
            String::new(),
            format!("  Last run:  {}", field(data, "last_materialized_at")),
            format!("  Next due:  {}", field(data, "next_due_at")),
            String::new(),
            "Run `agendar materialize` without --if-due to force a run.".to_string(),
        ]
        .join("\n");
    }

    let mut lines = vec![
        format!("Materialized {window}."),
        String::new(),
    ];
    lines.extend(render_table(
        &[
            Column::left("Kind", "kind"),
            Column::right("Created", "created"),
            Column::right("Duplicate", "skipped_duplicate"),
            Column::right("Blackout", "skipped_blackout"),
        ],
        &[
            summary_row("appointments", data.get("appointments")),
            summary_row("expenses", data.get("expenses")),
        ],
    ));
    lines.push(String::new());
    lines.push(format!("Next run due: {}", field(data, "next_due_at")));
    lines.join("\n")
}

fn summary_row(kind: &str, summary: Option<&Value>) -> Value {
    let mut row = summary.cloned().unwrap_or(Value::Null);
    if let Value::Object(map) = &mut row {
        map.insert("kind".to_string(), Value::String(kind.to_string()));
        return row;
    }
    serde_json::json!({ "kind": kind })
}

fn render_commission(data: &Value) -> String {
    let mut lines = vec![
        format!(
            "Commission for {} from {} to {}",
            field(data, "subject_id"),
            field(data, "from"),
            field(data, "to")
        ),
        String::new(),
    ];
    lines.extend(render_table(
        &[
            Column::left("Fixed appointment", "fixed_appointment_id"),
            Column::right("Occurrences", "occurrences"),
            Column::right("Value", "service_value"),
            Column::right("Rate %", "rate_percent"),
            Column::right("Amount", "amount"),
        ],
        &rows_from(data, "lines"),
    ));
    lines.push(String::new());
    lines.extend(key_value_rows(
        &[
            ("Rate %", field(data, "rate_percent")),
            ("Total", field(data, "total")),
        ],
        0,
    ));
    lines.join("\n")
}

fn render_fixed_added(data: &Value) -> String {
    let mut lines = vec!["Fixed appointment added.".to_string(), String::new()];
    lines.extend(key_value_rows(
        &[
            ("Id", field(data, "fixed_appointment_id")),
            ("Professional", field(data, "professional_id")),
            ("Client", field(data, "client_id")),
            ("Service", field(data, "service_id")),
            ("Time", field(data, "time_of_day")),
            ("Rule", rule_summary(data.get("rule"))),
        ],
        2,
    ));
    lines.push(String::new());
    lines.push("Run `agendar materialize` to book the upcoming occurrences.".to_string());
    lines.join("\n")
}

fn render_expense_added(data: &Value) -> String {
    let mut lines = vec!["Recurring expense added.".to_string(), String::new()];
    lines.extend(key_value_rows(
        &[
            ("Id", field(data, "recurring_expense_id")),
            ("Description", field(data, "description")),
            ("Amount", field(data, "amount")),
            ("Rule", rule_summary(data.get("rule"))),
        ],
        2,
    ));
    lines.join("\n")
}

fn render_definition_list(data: &Value, noun: &str, columns: &[Column<'_>]) -> String {
    let rows = rows_of(data)
        .into_iter()
        .map(|mut row| {
            let summary = rule_summary(row.get("rule"));
            if let Value::Object(map) = &mut row {
                map.insert("rule_summary".to_string(), Value::String(summary));
            }
            row
        })
        .collect::<Vec<Value>>();

    let mut lines = if rows.is_empty() {
        vec![format!("No {noun} definitions yet.")]
    } else {
        render_table(columns, &rows)
    };

    let unreadable = rows_from(data, "unreadable");
    if !unreadable.is_empty() {
        lines.push(String::new());
        lines.push(format!("{} unreadable {noun} definition(s):", unreadable.len()));
        lines.extend(render_table(
            &[
                Column::left("Id", "definition_id"),
                Column::left("Error", "code"),
                Column::left("Details", "message"),
            ],
            &unreadable,
        ));
    }
    lines.join("\n")
}

fn rule_summary(rule: Option<&Value>) -> String {
    let Some(rule) = rule else {
        return "-".to_string();
    };
    let mut summary = field(rule, "kind");
    if let Some(interval) = rule.get("interval").and_then(Value::as_u64)
        && interval > 1
    {
        summary.push_str(&format!(" x{interval}"));
    }
    if let Some(anchor) = rule.get("anchor_label").and_then(Value::as_str) {
        summary.push_str(&format!(" ({anchor})"));
    }
    summary.push_str(&format!(" from {}", field(rule, "valid_from")));
    if let Some(until) = rule.get("valid_until").and_then(Value::as_str) {
        summary.push_str(&format!(" until {until}"));
    }
    summary
}

fn render_preview(data: &Value) -> String {
    let occurrences = rows_from(data, "occurrences");
    let mut lines = vec![format!(
        "{} occurrence(s) of {} from {} to {}",
        occurrences.len(),
        field(data, "definition_id"),
        field(data, "from"),
        field(data, "to")
    )];
    if occurrences.is_empty() {
        return lines.join("\n");
    }
    lines.push(String::new());
    lines.extend(render_table(
        &[
            Column::left("Date", "date"),
            Column::left("Time", "time"),
            Column::left("Blocked", "blocked"),
        ],
        &occurrences,
    ));
    lines.join("\n")
}

fn render_retire(data: &Value) -> String {
    let id = field(data, "definition_id");
    match data.get("outcome").and_then(Value::as_str) {
        Some("deleted") => format!("Deleted {id}; it had no booked occurrences."),
        _ => format!(
            "Deactivated {id}; valid until {}. {} occurrence(s) kept, {} later one(s) removed.",
            field(data, "valid_until"),
            field(data, "linked_occurrences"),
            field(data, "removed_occurrences")
        ),
    }
}

fn render_added(title: &str, data: &Value, fields: &[(&str, &str)]) -> String {
    let data = with_hours(data);
    let entries = fields
        .iter()
        .map(|(label, key)| (*label, field(&data, key)))
        .collect::<Vec<(&str, String)>>();
    let mut lines = vec![title.to_string(), String::new()];
    lines.extend(key_value_rows(&entries, 2));
    lines.join("\n")
}

fn render_rows(data: &Value, noun: &str, columns: &[Column<'_>]) -> String {
    let rows = rows_of(data).iter().map(with_hours).collect::<Vec<Value>>();
    if rows.is_empty() {
        return format!("No {noun}s found.");
    }
    let mut lines = render_table(columns, &rows);
    lines.push(String::new());
    lines.push(format!("{} {noun}(s)", rows.len()));
    lines.join("\n")
}

/// Adds an `hours` field to blackout rows; other rows pass through.
fn with_hours(row: &Value) -> Value {
    let mut row = row.clone();
    let Some(all_day) = row.get("all_day").and_then(Value::as_bool) else {
        return row;
    };
    let hours = if all_day {
        "all day".to_string()
    } else {
        format!("{}-{}", field(&row, "time_start"), field(&row, "time_end"))
    };
    if let Value::Object(map) = &mut row {
        map.insert("hours".to_string(), Value::String(hours));
    }
    row
}

fn rows_from(data: &Value, key: &str) -> Vec<Value> {
    data.get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
