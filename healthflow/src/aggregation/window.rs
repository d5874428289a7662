//! The date-windowed aggregation walk.
//!
//! Requirements are resolved once per run: every required data type is
//! gathered from all services and indexed by day. The walk then visits each
//! day of the range and each registered aggregator, handing it only that
//! day's slices.

use super::{AggregatorRegistry, DayInputs, RegisteredAggregator};
use crate::context::{DateRange, PipelineContext};
use crate::core::{AggregationFamily, CleanRecord, DataType, DayRecord};
use crate::errors::AggregationError;
use crate::stages::ItemTally;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

type DayIndex<'a> = BTreeMap<DataType, BTreeMap<NaiveDate, Vec<&'a CleanRecord>>>;

/// Output of one aggregation walk.
#[derive(Debug, Default)]
pub struct WindowOutput {
    /// Records per family, in date order.
    pub records: BTreeMap<AggregationFamily, Vec<DayRecord>>,
    /// Outcome of each (day, aggregator) item.
    pub tally: ItemTally,
}

/// Walks `range` and runs every registered aggregator once per day.
#[must_use]
pub fn aggregate_window(
    registry: &AggregatorRegistry,
    ctx: &PipelineContext,
    range: DateRange,
) -> WindowOutput {
    let index = build_index(registry, ctx);
    let mut output = WindowOutput::default();
    let mut seen: BTreeSet<(AggregationFamily, NaiveDate)> = BTreeSet::new();

    for entry in registry.iter() {
        for data_type in &entry.requires {
            if !index.contains_key(data_type) {
                debug!(
                    aggregator = entry.aggregator.name(),
                    data_type = %data_type,
                    "No records available; aggregator sees an empty slice"
                );
            }
        }
    }

    for day in range.days() {
        for entry in registry.iter() {
            let item = format!("{}@{}", entry.aggregator.name(), day);
            let inputs = inputs_for(entry, &index, day);

            match run_one(entry, day, &inputs) {
                Ok(Some(record)) => {
                    // Families are unique per registry and run_one pins the
                    // record to this day, so (family, day) is never repeated.
                    debug_assert!(
                        seen.insert((record.family(), day)),
                        "duplicate {} record for {}",
                        record.family(),
                        day
                    );
                    output.records.entry(record.family()).or_default().push(record);
                    output.tally.succeed(item);
                }
                Ok(None) => {
                    debug!(aggregator = entry.aggregator.name(), %day, "Nothing to aggregate");
                    output.tally.succeed(item);
                }
                Err(error) => output.tally.fail(item, error),
            }
        }
    }

    output
}

fn build_index<'a>(registry: &AggregatorRegistry, ctx: &'a PipelineContext) -> DayIndex<'a> {
    let mut index = DayIndex::new();
    for data_type in registry.required_data_types() {
        let records = ctx.records_of(data_type);
        if records.is_empty() {
            continue;
        }
        let by_day = index.entry(data_type).or_default();
        for record in records {
            by_day.entry(record.date()).or_default().push(record);
        }
    }
    index
}

fn inputs_for<'a>(entry: &RegisteredAggregator, index: &DayIndex<'a>, day: NaiveDate) -> DayInputs<'a> {
    entry.requires.iter().fold(DayInputs::new(), |inputs, data_type| {
        let slice = index
            .get(data_type)
            .and_then(|by_day| by_day.get(&day))
            .cloned()
            .unwrap_or_default();
        inputs.with_slice(*data_type, slice)
    })
}

/// Runs one aggregator for one day and checks what it returned.
fn run_one(
    entry: &RegisteredAggregator,
    day: NaiveDate,
    inputs: &DayInputs<'_>,
) -> Result<Option<DayRecord>, AggregationError> {
    let name = entry.aggregator.name();
    let outcome = catch_unwind(AssertUnwindSafe(|| entry.aggregator.aggregate_day(day, inputs)))
        .unwrap_or_else(|panic| {
            warn!("Aggregator {} panicked: {:?}", name, panic);
            Err(AggregationError::Failed {
                aggregator: name.to_string(),
                date: day,
                message: "aggregator panicked".to_string(),
            })
        })?;

    let Some(record) = outcome else {
        return Ok(None);
    };
    if record.family() != entry.family {
        return Err(AggregationError::FamilyMismatch {
            aggregator: name.to_string(),
            expected: entry.family,
            found: record.family(),
        });
    }
    if record.date() != day {
        return Err(AggregationError::DateMismatch {
            family: entry.family,
            expected: day,
            found: record.date(),
        });
    }
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransformedRecords;
    use crate::core::{SportType, StageStatus};
    use crate::testing::{fixtures, FailingAggregator};
    use std::sync::Arc;

    fn context(days: u32) -> PipelineContext {
        PipelineContext::new(DateRange::ending_at(fixtures::day(3), days), ["whoop", "nutrition"])
    }

    fn with_workouts(ctx: &mut PipelineContext, days: &[u32]) {
        let workouts = days
            .iter()
            .map(|d| fixtures::workout(fixtures::day(*d), SportType::Running, 40.0, Some(9.0)))
            .collect();
        let mut by_type = TransformedRecords::new();
        by_type.insert(DataType::Workouts, workouts);
        ctx.transformed_data.insert("whoop", by_type).unwrap();
    }

    #[test]
    fn test_one_record_per_family_per_day() {
        let mut ctx = context(3);
        with_workouts(&mut ctx, &[1, 3]);

        let output = aggregate_window(&AggregatorRegistry::standard(), &ctx, ctx.date_range());

        assert_eq!(output.records[&AggregationFamily::MacrosActivity].len(), 3);
        assert_eq!(output.records[&AggregationFamily::RecoveryMetrics].len(), 3);
        let training: Vec<NaiveDate> = output.records[&AggregationFamily::TrainingMetrics]
            .iter()
            .map(DayRecord::date)
            .collect();
        assert_eq!(training, vec![fixtures::day(1), fixtures::day(3)]);
        assert_eq!(output.tally.status(), StageStatus::Success);
        assert_eq!(output.tally.attempted(), 9);
    }

    #[test]
    fn test_records_outside_range_are_ignored() {
        let mut ctx = context(2);
        with_workouts(&mut ctx, &[1, 2, 3]);

        let output = aggregate_window(&AggregatorRegistry::standard(), &ctx, ctx.date_range());
        assert_eq!(output.records[&AggregationFamily::TrainingMetrics].len(), 2);
    }

    #[test]
    fn test_failing_aggregator_is_isolated() {
        let ctx = context(2);
        let registry = AggregatorRegistry::new()
            .with(Arc::new(crate::aggregation::MacrosActivityAggregator))
            .and_then(|r| {
                r.with(Arc::new(
                    FailingAggregator::new("broken", AggregationFamily::TrainingMetrics)
                        .failing_on(fixtures::day(3)),
                ))
            })
            .unwrap();

        let output = aggregate_window(&registry, &ctx, ctx.date_range());
        assert_eq!(output.records[&AggregationFamily::MacrosActivity].len(), 2);
        assert_eq!(output.tally.failed().len(), 1);
        assert_eq!(output.tally.failed()[0].item, "broken@2025-07-03");
        assert_eq!(output.tally.status(), StageStatus::Partial);
    }

    #[test]
    fn test_panicking_aggregator_is_contained() {
        let ctx = context(1);
        let registry = AggregatorRegistry::new()
            .with(Arc::new(
                FailingAggregator::new("panicky", AggregationFamily::RecoveryMetrics).panicking(),
            ))
            .unwrap();

        let output = aggregate_window(&registry, &ctx, ctx.date_range());
        assert!(output.records.is_empty());
        assert_eq!(output.tally.status(), StageStatus::Failed);
    }

    #[test]
    fn test_wrong_date_is_rejected() {
        let ctx = context(1);
        let registry = AggregatorRegistry::new()
            .with(Arc::new(
                FailingAggregator::new("drifting", AggregationFamily::TrainingMetrics)
                    .dated(fixtures::day(1)),
            ))
            .unwrap();

        let output = aggregate_window(&registry, &ctx, ctx.date_range());
        assert!(output.records.is_empty());
        assert!(output.tally.failed()[0].error.contains("returned while aggregating"));
    }
}
