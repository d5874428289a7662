//! Aggregator contract and the registry that maps names to requirements.

use super::{MacrosActivityAggregator, RecoveryAggregator, TrainingAggregator};
use crate::core::{AggregationFamily, CanonicalRecord, CleanRecord, DataType, DayRecord};
use crate::errors::{AggregationError, RegistryError};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

/// The records of one day, resolved per required data type.
#[derive(Debug, Clone, Default)]
pub struct DayInputs<'a> {
    slices: BTreeMap<DataType, Vec<&'a CleanRecord>>,
}

impl<'a> DayInputs<'a> {
    /// Creates empty inputs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the records of one type.
    #[must_use]
    pub fn with_slice(mut self, data_type: DataType, records: Vec<&'a CleanRecord>) -> Self {
        self.slices.insert(data_type, records);
        self
    }

    /// Returns the records of one type, empty if the type was not resolved.
    #[must_use]
    pub fn slice(&self, data_type: DataType) -> &[&'a CleanRecord] {
        self.slices
            .get(&data_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Borrows the records of one type as their typed form.
    ///
    /// # Errors
    ///
    /// Returns `AggregationError::UnexpectedRecord` if the slice holds a
    /// record of another type.
    pub fn typed<R: CanonicalRecord>(&self, aggregator: &str) -> Result<Vec<&'a R>, AggregationError> {
        self.slice(R::DATA_TYPE)
            .iter()
            .copied()
            .map(|record| {
                R::from_clean(record).ok_or_else(|| AggregationError::UnexpectedRecord {
                    aggregator: aggregator.to_string(),
                    expected: R::DATA_TYPE,
                    found: record.data_type(),
                })
            })
            .collect()
    }
}

/// Produces one family's record for a single day.
pub trait Aggregator: Send + Sync + Debug {
    /// Stable name, e.g. `macros`.
    fn name(&self) -> &str;

    /// The family this aggregator produces.
    fn family(&self) -> AggregationFamily;

    /// Data types the aggregator reads.
    fn required_data_types(&self) -> BTreeSet<DataType>;

    /// Aggregates one day.
    ///
    /// `inputs` only contains records dated `date`. Returning `Ok(None)` means
    /// the family has nothing to report for the day.
    ///
    /// # Errors
    ///
    /// Returns `AggregationError` if the day cannot be aggregated.
    fn aggregate_day(
        &self,
        date: NaiveDate,
        inputs: &DayInputs<'_>,
    ) -> Result<Option<DayRecord>, AggregationError>;
}

/// A registered aggregator with its requirements resolved.
#[derive(Debug, Clone)]
pub struct RegisteredAggregator {
    /// The aggregator.
    pub aggregator: Arc<dyn Aggregator>,
    /// Family it produces.
    pub family: AggregationFamily,
    /// Data types it reads.
    pub requires: BTreeSet<DataType>,
}

/// Ordered registry of aggregators.
///
/// Aggregators run in registration order. Names and families are unique.
#[derive(Debug, Clone, Default)]
pub struct AggregatorRegistry {
    entries: Vec<RegisteredAggregator>,
}

impl AggregatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with the three built-in families.
    #[must_use]
    pub fn standard() -> Self {
        let builtins: [Arc<dyn Aggregator>; 3] = [
            Arc::new(MacrosActivityAggregator),
            Arc::new(RecoveryAggregator),
            Arc::new(TrainingAggregator),
        ];
        Self {
            entries: builtins.into_iter().map(Self::resolve).collect(),
        }
    }

    fn resolve(aggregator: Arc<dyn Aggregator>) -> RegisteredAggregator {
        RegisteredAggregator {
            family: aggregator.family(),
            requires: aggregator.required_data_types(),
            aggregator,
        }
    }

    /// Registers an aggregator.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if the name or family is taken, or if the
    /// aggregator declares no requirements.
    pub fn register(&mut self, aggregator: Arc<dyn Aggregator>) -> Result<(), RegistryError> {
        let entry = Self::resolve(aggregator);
        let name = entry.aggregator.name().to_string();

        if self.get(&name).is_some() {
            return Err(RegistryError::DuplicateName(name));
        }
        if let Some(owner) = self.entries.iter().find(|e| e.family == entry.family) {
            return Err(RegistryError::DuplicateFamily {
                family: entry.family,
                owner: owner.aggregator.name().to_string(),
            });
        }
        if entry.requires.is_empty() {
            return Err(RegistryError::NoRequirements(name));
        }

        self.entries.push(entry);
        Ok(())
    }

    /// Registers an aggregator, builder style.
    ///
    /// # Errors
    ///
    /// See [`AggregatorRegistry::register`].
    pub fn with(mut self, aggregator: Arc<dyn Aggregator>) -> Result<Self, RegistryError> {
        self.register(aggregator)?;
        Ok(self)
    }

    /// Looks up an aggregator by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredAggregator> {
        self.entries.iter().find(|e| e.aggregator.name() == name)
    }

    /// Registered aggregators in order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredAggregator> {
        self.entries.iter()
    }

    /// Registered names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.aggregator.name()).collect()
    }

    /// Union of every aggregator's requirements.
    #[must_use]
    pub fn required_data_types(&self) -> BTreeSet<DataType> {
        self.entries
            .iter()
            .flat_map(|e| e.requires.iter().copied())
            .collect()
    }

    /// Number of registered aggregators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingAggregator;

    #[test]
    fn test_standard_registry() {
        let registry = AggregatorRegistry::standard();
        assert_eq!(registry.names(), vec!["macros", "recovery", "training"]);

        let macros = registry.get("macros").unwrap();
        assert_eq!(macros.family, AggregationFamily::MacrosActivity);
        assert!(macros.requires.contains(&DataType::Nutrition));
        assert!(macros.requires.contains(&DataType::Weight));

        assert!(registry.required_data_types().contains(&DataType::Sleep));
        assert!(!registry.required_data_types().contains(&DataType::Exercises));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = AggregatorRegistry::standard();
        let err = registry
            .register(Arc::new(TrainingAggregator))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("training".to_string()));
    }

    #[test]
    fn test_duplicate_family_rejected() {
        let registry = AggregatorRegistry::standard();
        let impostor = FailingAggregator::new("training_v2", AggregationFamily::TrainingMetrics);
        let err = registry.with(Arc::new(impostor)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateFamily { .. }));
    }

    #[test]
    fn test_registration_order_is_kept() {
        let registry = AggregatorRegistry::new()
            .with(Arc::new(TrainingAggregator))
            .and_then(|r| r.with(Arc::new(RecoveryAggregator)))
            .unwrap();
        assert_eq!(registry.names(), vec!["training", "recovery"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_typed_slice_rejects_foreign_records() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let sleep = crate::testing::fixtures::sleep(date, 420.0, 450.0);
        let inputs = DayInputs::new().with_slice(DataType::Workouts, vec![&sleep]);

        let err = inputs
            .typed::<crate::core::WorkoutRecord>("training")
            .unwrap_err();
        assert!(matches!(err, AggregationError::UnexpectedRecord { .. }));
        assert!(inputs.slice(DataType::Nutrition).is_empty());
    }
}
