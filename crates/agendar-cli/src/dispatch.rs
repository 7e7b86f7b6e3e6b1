use agendar_client::commands::appointments::{AppointmentListOptions, ManualAppointmentOptions};
use agendar_client::commands::blackout::{BlackoutAddOptions, BlackoutListOptions};
use agendar_client::commands::catalog::{ClientAddOptions, ProfessionalAddOptions, ServiceAddOptions};
use agendar_client::commands::commission::CommissionRunOptions;
use agendar_client::commands::definitions::{
    ExpenseAddOptions, FixedAddOptions, PreviewOptions, RetireOptions,
};
use agendar_client::commands::expenses::ExpenseListOptions;
use agendar_client::commands::materialize::MaterializeRunOptions;
use agendar_client::commands::{self, RuleInput};
use agendar_client::{ClientResult, EngineConfig, SuccessEnvelope};

use crate::cli::{
    AppointmentsCommand, BlackoutCommand, CatalogCommand, Cli, ClientCommand, Commands,
    ExpenseCommand, ExpensesCommand, FixedCommand, ProfessionalCommand, RuleArgs, ServiceCommand,
};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    let home = cli.home.as_deref();
    match &cli.command {
        Commands::Materialize { if_due } => {
            commands::materialize::run_with_options(MaterializeRunOptions {
                today: chrono::Local::now().date_naive(),
                if_due: *if_due,
                config: EngineConfig::from_env()?,
                home_override: home,
            })
        }
        Commands::Commission {
            fixed,
            professional,
            from,
            to,
        } => commands::commission::run_with_options(CommissionRunOptions {
            fixed_appointment_id: fixed.clone(),
            professional_id: professional.clone(),
            from: from.clone(),
            to: to.clone(),
            config: EngineConfig::from_env()?,
            home_override: home,
        }),
        Commands::Fixed { command } => match command {
            FixedCommand::Add {
                client,
                professional,
                service,
                time,
                notes,
                rule,
            } => commands::definitions::add_fixed_appointment(FixedAddOptions {
                client_id: client.clone(),
                professional_id: professional.clone(),
                service_id: service.clone(),
                time: time.clone(),
                notes: notes.clone(),
                rule: rule_input(rule),
                home_override: home,
            }),
            FixedCommand::List => commands::definitions::list_fixed_appointments(home),
        },
        Commands::Expense { command } => match command {
            ExpenseCommand::Add {
                description,
                amount,
                category,
                rule,
            } => commands::definitions::add_recurring_expense(ExpenseAddOptions {
                description: description.clone(),
                category: category.clone(),
                amount: amount.clone(),
                rule: rule_input(rule),
                home_override: home,
            }),
            ExpenseCommand::List => commands::definitions::list_recurring_expenses(home),
        },
        Commands::Preview {
            definition_id,
            from,
            to,
        } => commands::definitions::preview(PreviewOptions {
            definition_id: definition_id.clone(),
            from: from.clone(),
            to: to.clone(),
            home_override: home,
        }),
        Commands::Retire { definition_id, on } => commands::definitions::retire(RetireOptions {
            definition_id: definition_id.clone(),
            on: on.clone(),
            home_override: home,
        }),
        Commands::Blackout { command } => match command {
            BlackoutCommand::Add {
                professional,
                from,
                to,
                start,
                end,
                reason,
            } => commands::blackout::add(BlackoutAddOptions {
                professional_id: professional.clone(),
                from: from.clone(),
                to: to.clone(),
                time_start: start.clone(),
                time_end: end.clone(),
                reason: reason.clone(),
                home_override: home,
            }),
            BlackoutCommand::List {
                professional,
                from,
                to,
            } => commands::blackout::list(BlackoutListOptions {
                professional_id: professional.clone(),
                from: from.clone(),
                to: to.clone(),
                home_override: home,
            }),
        },
        Commands::Catalog { command } => match command {
            CatalogCommand::Professional { command } => match command {
                ProfessionalCommand::Add { name, commission } => {
                    commands::catalog::add_professional(ProfessionalAddOptions {
                        name: name.clone(),
                        commission_percent: *commission,
                        home_override: home,
                    })
                }
                ProfessionalCommand::List => commands::catalog::list_professionals(home),
            },
            CatalogCommand::Service { command } => match command {
                ServiceCommand::Add {
                    name,
                    price,
                    duration,
                } => commands::catalog::add_service(ServiceAddOptions {
                    name: name.clone(),
                    price: price.clone(),
                    duration_minutes: *duration,
                    home_override: home,
                }),
                ServiceCommand::List => commands::catalog::list_services(home),
            },
            CatalogCommand::Client { command } => match command {
                ClientCommand::Add { name, phone } => {
                    commands::catalog::add_client(ClientAddOptions {
                        name: name.clone(),
                        phone: phone.clone(),
                        home_override: home,
                    })
                }
                ClientCommand::List => commands::catalog::list_clients(home),
            },
        },
        Commands::Appointments { command } => match command {
            AppointmentsCommand::Add {
                client,
                professional,
                service,
                date,
                time,
                notes,
            } => commands::appointments::add_manual(ManualAppointmentOptions {
                client_id: client.clone(),
                professional_id: professional.clone(),
                service_id: service.clone(),
                date: date.clone(),
                time: time.clone(),
                notes: notes.clone(),
                home_override: home,
            }),
            AppointmentsCommand::List {
                from,
                to,
                professional,
            } => commands::appointments::list(AppointmentListOptions {
                from: from.clone(),
                to: to.clone(),
                professional_id: professional.clone(),
                home_override: home,
            }),
        },
        Commands::Expenses { command } => match command {
            ExpensesCommand::List { from, to } => commands::expenses::list(ExpenseListOptions {
                from: from.clone(),
                to: to.clone(),
                home_override: home,
            }),
        },
    }
}

fn rule_input(rule: &RuleArgs) -> RuleInput {
    RuleInput {
        kind: rule.every.clone(),
        interval: rule.interval,
        anchor: rule.on.clone(),
        from: rule.from.clone(),
        until: rule.until.clone(),
    }
}
