//! Daily recovery, sleep and resilience.

use super::{Aggregator, DayInputs};
use crate::core::{
    AggregationFamily, DataType, DayRecord, RecoveryDay, RecoveryRecord, ResilienceRecord,
    SleepRecord,
};
use crate::errors::AggregationError;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Emits one `recovery_metrics` record every day; fields without a source
/// record stay blank. Naps never count as the night's sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryAggregator;

impl Aggregator for RecoveryAggregator {
    fn name(&self) -> &str {
        "recovery"
    }

    fn family(&self) -> AggregationFamily {
        AggregationFamily::RecoveryMetrics
    }

    fn required_data_types(&self) -> BTreeSet<DataType> {
        [DataType::Recovery, DataType::Sleep, DataType::Resilience]
            .into_iter()
            .collect()
    }

    fn aggregate_day(
        &self,
        date: NaiveDate,
        inputs: &DayInputs<'_>,
    ) -> Result<Option<DayRecord>, AggregationError> {
        let recovery = inputs.typed::<RecoveryRecord>(self.name())?.into_iter().next();
        let sleep = inputs
            .typed::<SleepRecord>(self.name())?
            .into_iter()
            .find(|s| !s.nap);
        let resilience = inputs.typed::<ResilienceRecord>(self.name())?.into_iter().next();

        Ok(Some(DayRecord::Recovery(RecoveryDay {
            date,
            recovery: recovery.and_then(|r| r.recovery_score),
            hrv: recovery.and_then(|r| r.hrv_rmssd),
            resting_hr: recovery.and_then(|r| r.resting_hr),
            sleep_need_minutes: sleep.and_then(|s| s.sleep_need_minutes),
            sleep_actual_minutes: sleep.and_then(|s| s.total_sleep_minutes),
            resilience_level: resilience.and_then(|r| r.level.clone()),
        })))
    }
}
