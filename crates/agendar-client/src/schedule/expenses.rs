use chrono::NaiveDate;

use crate::ClientResult;
use crate::recurrence::DateRange;
use crate::schedule::driver::{self, CandidateOutcome, MaterializeSummary, Materializer};
use crate::schedule::store::ScheduleStore;
use crate::schedule::types::{DefinitionLoad, InsertOutcome, NewExpense, RecurringExpense};

/// Creates concrete expenses for every active recurring expense in
/// `[horizon_start, horizon_end]`. Expenses ignore blackout windows.
pub fn project_expenses<S: ScheduleStore>(
    store: &S,
    horizon_start: NaiveDate,
    horizon_end: NaiveDate,
) -> ClientResult<MaterializeSummary> {
    driver::run(
        &ExpenseProjector { store },
        DateRange::new(horizon_start, horizon_end),
    )
}

struct ExpenseProjector<'s, S> {
    store: &'s S,
}

impl<S: ScheduleStore> Materializer for ExpenseProjector<'_, S> {
    type Definition = RecurringExpense;
    type Context = ();

    const LABEL: &'static str = "expense";

    fn load(&self) -> ClientResult<Vec<DefinitionLoad<RecurringExpense>>> {
        self.store.active_recurring_expenses()
    }

    fn prepare(&self, _definition: &RecurringExpense, _window: DateRange) -> ClientResult<()> {
        Ok(())
    }

    fn materialize_on(
        &self,
        definition: &RecurringExpense,
        _context: &(),
        date: NaiveDate,
    ) -> ClientResult<CandidateOutcome> {
        if self
            .store
            .expense_exists(&definition.recurring_expense_id, date)?
        {
            return Ok(CandidateOutcome::Duplicate);
        }

        match self
            .store
            .insert_expense(&NewExpense::from_definition(definition, date))?
        {
            InsertOutcome::Inserted(_) => Ok(CandidateOutcome::Created),
            InsertOutcome::Duplicate => Ok(CandidateOutcome::Duplicate),
        }
    }
}
