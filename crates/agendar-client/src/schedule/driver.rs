use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ClientResult;
use crate::recurrence::{DateRange, occurrences_in_range};
use crate::schedule::types::{DefinitionLoad, RecurringDefinition};

/// Counts produced by one materialization pass over a horizon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeSummary {
    pub created: i64,
    pub skipped_duplicate: i64,
    pub skipped_blackout: i64,
    pub skipped: i64,
}

impl MaterializeSummary {
    fn record(&mut self, outcome: CandidateOutcome) {
        match outcome {
            CandidateOutcome::Created => self.created += 1,
            CandidateOutcome::Duplicate => {
                self.skipped_duplicate += 1;
                self.skipped += 1;
            }
            CandidateOutcome::Blocked => {
                self.skipped_blackout += 1;
                self.skipped += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CandidateOutcome {
    Created,
    Duplicate,
    Blocked,
}

/// One kind of definition that can be turned into concrete rows.
pub(crate) trait Materializer {
    type Definition: RecurringDefinition;
    /// Per-definition state resolved once before candidates are visited.
    type Context;

    const LABEL: &'static str;

    fn load(&self) -> ClientResult<Vec<DefinitionLoad<Self::Definition>>>;

    fn prepare(&self, definition: &Self::Definition, window: DateRange)
    -> ClientResult<Self::Context>;

    fn materialize_on(
        &self,
        definition: &Self::Definition,
        context: &Self::Context,
        date: NaiveDate,
    ) -> ClientResult<CandidateOutcome>;
}

/// Walks every loaded definition across `horizon`. A failing definition is
/// logged and skipped; rows it already created stay in place.
pub(crate) fn run<M: Materializer>(
    materializer: &M,
    horizon: Option<DateRange>,
) -> ClientResult<MaterializeSummary> {
    let mut summary = MaterializeSummary::default();
    let Some(horizon) = horizon else {
        return Ok(summary);
    };

    for loaded in materializer.load()? {
        let definition = match loaded {
            Ok(definition) => definition,
            Err(invalid) => {
                warn!(
                    kind = M::LABEL,
                    definition_id = %invalid.definition_id,
                    code = %invalid.error.code,
                    error = %invalid.error.message,
                    "skipping unreadable definition"
                );
                continue;
            }
        };
        if !definition.is_active() {
            continue;
        }

        let rule = definition.rule();
        let Some(window) = horizon.clamp_to(rule.valid_from(), rule.valid_until()) else {
            continue;
        };

        if let Err(error) = materialize_definition(materializer, &definition, window, &mut summary)
        {
            warn!(
                kind = M::LABEL,
                definition_id = %definition.definition_id(),
                code = %error.code,
                error = %error.message,
                "definition failed during materialization"
            );
        }
    }

    info!(
        kind = M::LABEL,
        from = %horizon.start,
        to = %horizon.end,
        created = summary.created,
        skipped_duplicate = summary.skipped_duplicate,
        skipped_blackout = summary.skipped_blackout,
        "materialization finished"
    );
    Ok(summary)
}

fn materialize_definition<M: Materializer>(
    materializer: &M,
    definition: &M::Definition,
    window: DateRange,
    summary: &mut MaterializeSummary,
) -> ClientResult<()> {
    let context = materializer.prepare(definition, window)?;
    for date in occurrences_in_range(definition.rule(), window.start, window.end) {
        let outcome = materializer.materialize_on(definition, &context, date)?;
        if outcome != CandidateOutcome::Created {
            debug!(
                kind = M::LABEL,
                definition_id = %definition.definition_id(),
                date = %date,
                outcome = ?outcome,
                "candidate skipped"
            );
        }
        summary.record(outcome);
    }
    Ok(())
}
