//! Built-in transformers and the registry the transform stage dispatches on.

mod rules;

pub use rules::Validate;

use crate::core::{
    ActivityRecord, CleanRecord, DataType, ExerciseRecord, NutritionRecord, RecoveryRecord,
    ResilienceRecord, SleepRecord, WeightRecord, WorkoutRecord,
};
use crate::errors::TransformationError;
use crate::stages::{Transformed, Transformer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Coerces extracted JSON records into one canonical record type.
///
/// A record that does not deserialize fails the whole list. A record that
/// deserializes but fails validation is dropped and reported in `filtered`.
/// Output is ordered by date, ties kept in input order.
pub struct RecordTransformer<R> {
    _record: PhantomData<fn() -> R>,
}

impl<R> RecordTransformer<R> {
    /// Creates a transformer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<R> Default for RecordTransformer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Validate> fmt::Debug for RecordTransformer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordTransformer")
            .field("data_type", &R::DATA_TYPE)
            .finish()
    }
}

impl<R: Validate> Transformer for RecordTransformer<R> {
    fn data_type(&self) -> DataType {
        R::DATA_TYPE
    }

    fn transform(&self, records: &[Value]) -> Result<Transformed, TransformationError> {
        let mut output = Transformed::default();

        for (index, value) in records.iter().enumerate() {
            let record: R = serde_json::from_value(value.clone()).map_err(|e| {
                TransformationError::Coercion {
                    data_type: R::DATA_TYPE,
                    index,
                    message: e.to_string(),
                }
            })?;

            match record.check() {
                Ok(()) => output.records.push(record.normalize().into()),
                Err(reason) => {
                    debug!(data_type = %R::DATA_TYPE, index, %reason, "Record filtered");
                    output
                        .filtered
                        .push(format!("{} record {index}: {reason}", R::DATA_TYPE));
                }
            }
        }

        output.records.sort_by_key(CleanRecord::date);
        Ok(output)
    }
}

/// Transformers keyed by the data type they produce.
#[derive(Debug, Clone, Default)]
pub struct TransformerRegistry {
    transformers: BTreeMap<DataType, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a built-in transformer for every data type.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with(Arc::new(RecordTransformer::<WorkoutRecord>::new()))
            .with(Arc::new(RecordTransformer::<ActivityRecord>::new()))
            .with(Arc::new(RecordTransformer::<WeightRecord>::new()))
            .with(Arc::new(RecordTransformer::<RecoveryRecord>::new()))
            .with(Arc::new(RecordTransformer::<SleepRecord>::new()))
            .with(Arc::new(RecordTransformer::<ExerciseRecord>::new()))
            .with(Arc::new(RecordTransformer::<NutritionRecord>::new()))
            .with(Arc::new(RecordTransformer::<ResilienceRecord>::new()))
    }

    /// Registers a transformer, replacing any for the same data type.
    #[must_use]
    pub fn with(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformers.insert(transformer.data_type(), transformer);
        self
    }

    /// Looks up the transformer for a data type.
    #[must_use]
    pub fn get(&self, data_type: DataType) -> Option<&Arc<dyn Transformer>> {
        self.transformers.get(&data_type)
    }

    /// Number of registered transformers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}
