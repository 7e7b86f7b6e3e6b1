mod support;

use agendar_client::commands::blackout::{self, BlackoutAddOptions};
use agendar_client::commands::materialize::{self, MaterializeRunOptions};
use agendar_client::EngineConfig;
use support::agenda_testkit::{
    Catalog, add_fixed, add_recurring_expense, add_service, appointment_dates, count, date,
    materialize_on, open_db, rule, seed_catalog, temp_home,
};

const APPOINTMENTS_FOR: &str = "SELECT COUNT(*) FROM appointments WHERE fixed_appointment_id = ?1";

#[test]
fn second_run_over_the_same_horizon_creates_nothing() {
    let temp = temp_home("agendar-materialize-idempotent");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let catalog = seed_catalog(&home, None);
        let fixed_id = add_fixed(&home, &catalog, "09:00", rule("daily", None, "2025-01-01", None));

        let first = materialize_on(&home, "2025-01-01", false);
        assert_eq!(first["ran"], true);
        assert_eq!(first["from"], "2025-01-01");
        assert_eq!(first["to"], "2025-01-15");
        assert_eq!(first["appointments"]["created"], 15);

        let second = materialize_on(&home, "2025-01-01", false);
        assert_eq!(second["appointments"]["created"], 0);
        assert_eq!(second["appointments"]["skipped_duplicate"], 15);
        assert_eq!(second["appointments"]["skipped"], 15);

        assert_eq!(count(&home, APPOINTMENTS_FOR, &fixed_id), 15);
    }
}

#[test]
fn all_day_blackout_on_february_tenth_skips_that_monday_only() {
    let temp = temp_home("agendar-materialize-blackout");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let catalog = seed_catalog(&home, None);
        let fixed_id = add_fixed(
            &home,
            &catalog,
            "10:00",
            rule("weekly", Some("mon"), "2025-02-03", None),
        );
        let blocked = blackout::add(BlackoutAddOptions {
            professional_id: catalog.professional_id.clone(),
            from: "2025-02-10".to_string(),
            to: None,
            time_start: None,
            time_end: None,
            reason: Some("training".to_string()),
            home_override: Some(&home),
        });
        assert!(blocked.is_ok());

        let summary = materialize_on(&home, "2025-02-03", false);
        assert_eq!(summary["appointments"]["created"], 2);
        assert_eq!(summary["appointments"]["skipped_blackout"], 1);
        assert_eq!(
            appointment_dates(&home, &fixed_id),
            vec!["2025-02-03".to_string(), "2025-02-17".to_string()]
        );
    }
}

#[test]
fn storage_failure_in_one_definition_keeps_rows_and_other_definitions() {
    let temp = temp_home("agendar-materialize-isolation");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let catalog = seed_catalog(&home, None);
        let failing_id =
            add_fixed(&home, &catalog, "09:00", rule("daily", None, "2025-01-01", None));
        let healthy_id =
            add_fixed(&home, &catalog, "11:00", rule("daily", None, "2025-01-01", None));

        let trigger = open_db(&home).execute_batch(&format!(
            "CREATE TRIGGER fail_one_slot
             BEFORE INSERT ON appointments
             WHEN NEW.fixed_appointment_id = '{failing_id}' AND NEW.date = '2025-01-05'
             BEGIN
               SELECT RAISE(ABORT, 'forced_materialize_failure');
             END;"
        ));
        assert!(trigger.is_ok());

        let summary = materialize_on(&home, "2025-01-01", false);
        assert_eq!(summary["ran"], true);
        assert_eq!(summary["appointments"]["created"], 19);

        assert_eq!(count(&home, APPOINTMENTS_FOR, &failing_id), 4);
        assert_eq!(count(&home, APPOINTMENTS_FOR, &healthy_id), 15);
    }
}

#[test]
fn missing_service_is_isolated_to_its_definition() {
    let temp = temp_home("agendar-materialize-missing-ref");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let catalog = seed_catalog(&home, None);
        let doomed_service = add_service(&home, "Coloring", "250.00");
        let healthy_id =
            add_fixed(&home, &catalog, "09:00", rule("daily", None, "2025-01-01", None));
        let orphan_catalog = Catalog {
            professional_id: catalog.professional_id.clone(),
            service_id: doomed_service.clone(),
            client_id: catalog.client_id.clone(),
        };
        let orphan_id = add_fixed(
            &home,
            &orphan_catalog,
            "14:00",
            rule("daily", None, "2025-01-01", None),
        );

        let removed = open_db(&home).execute(
            "DELETE FROM services WHERE service_id = ?1",
            [&doomed_service],
        );
        assert_eq!(removed.ok(), Some(1));

        let summary = materialize_on(&home, "2025-01-01", false);
        assert_eq!(summary["appointments"]["created"], 15);
        assert_eq!(count(&home, APPOINTMENTS_FOR, &healthy_id), 15);
        assert_eq!(count(&home, APPOINTMENTS_FOR, &orphan_id), 0);
    }
}

#[test]
fn if_due_waits_for_the_run_interval() {
    let temp = temp_home("agendar-materialize-if-due");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let catalog = seed_catalog(&home, None);
        let fixed_id = add_fixed(&home, &catalog, "09:00", rule("daily", None, "2025-01-01", None));

        let first = materialize_on(&home, "2025-01-01", true);
        assert_eq!(first["ran"], true);
        assert_eq!(first["next_due_at"], "2025-01-08");

        let early = materialize_on(&home, "2025-01-05", true);
        assert_eq!(early["ran"], false);
        assert_eq!(early["last_materialized_at"], "2025-01-01");
        assert_eq!(early["appointments"]["created"], 0);

        let due = materialize_on(&home, "2025-01-08", true);
        assert_eq!(due["ran"], true);
        assert_eq!(due["appointments"]["created"], 7);
        assert_eq!(due["appointments"]["skipped_duplicate"], 8);

        assert_eq!(count(&home, APPOINTMENTS_FOR, &fixed_id), 22);
    }
}

#[test]
fn forced_run_ignores_the_run_interval() {
    let temp = temp_home("agendar-materialize-forced");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let catalog = seed_catalog(&home, None);
        add_fixed(&home, &catalog, "09:00", rule("daily", None, "2025-01-01", None));

        let first = materialize_on(&home, "2025-01-01", false);
        assert_eq!(first["ran"], true);
        let forced = materialize_on(&home, "2025-01-02", false);
        assert_eq!(forced["ran"], true);
        assert_eq!(forced["appointments"]["created"], 1);
    }
}

#[test]
fn recurring_expenses_are_projected_alongside_appointments() {
    let temp = temp_home("agendar-materialize-expenses");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let rent_id = add_recurring_expense(
            &home,
            "Studio rent",
            "2500.00",
            rule("monthly", Some("last"), "2025-01-01", None),
        );

        let summary = materialize_on(&home, "2025-01-20", false);
        assert_eq!(summary["expenses"]["created"], 1);
        assert_eq!(summary["appointments"]["created"], 0);

        let again = materialize_on(&home, "2025-01-20", false);
        assert_eq!(again["expenses"]["created"], 0);
        assert_eq!(again["expenses"]["skipped_duplicate"], 1);

        let stored_date = open_db(&home).query_row(
            "SELECT date FROM expenses WHERE recurring_expense_id = ?1",
            [&rent_id],
            |row| row.get::<_, String>(0),
        );
        assert_eq!(stored_date.ok(), Some("2025-01-31".to_string()));
    }
}

#[test]
fn invalid_configuration_is_rejected_before_touching_the_store() {
    let temp = temp_home("agendar-materialize-config");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let result = materialize::run_with_options(MaterializeRunOptions {
            today: date("2025-01-01"),
            if_due: false,
            config: EngineConfig {
                horizon_days: 7,
                run_interval_days: 7,
                default_commission_percent: 0,
            },
            home_override: Some(&home),
        });
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "invalid_config");
        }
        assert!(!home.join("agenda.db").exists());
    }
}
