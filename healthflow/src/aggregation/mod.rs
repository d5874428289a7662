//! Aggregation: the registry of families and the day-by-day window walk.
//!
//! Adding a family takes an [`Aggregator`] implementation and one registry
//! entry; the aggregate stage's control flow never changes.

mod macros;
mod recovery;
mod registry;
mod training;
mod window;

pub use macros::MacrosActivityAggregator;
pub use recovery::RecoveryAggregator;
pub use registry::{Aggregator, AggregatorRegistry, DayInputs, RegisteredAggregator};
pub use training::TrainingAggregator;
pub use window::{aggregate_window, WindowOutput};

use crate::core::WorkoutRecord;

/// The longest workout; the first one wins a tie.
pub(crate) fn longest_workout<'a>(workouts: &[&'a WorkoutRecord]) -> Option<&'a WorkoutRecord> {
    workouts.iter().copied().reduce(|best, next| {
        if next.duration_minutes > best.duration_minutes {
            next
        } else {
            best
        }
    })
}
