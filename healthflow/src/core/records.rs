//! Canonical per-source records produced by the transform stage.
//!
//! Field names double as CSV headers and as the keys extractors must emit.

#![allow(missing_docs)]

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of canonical data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Individual workouts.
    Workouts,
    /// Daily activity totals.
    Activity,
    /// Scale measurements.
    Weight,
    /// Daily recovery scores.
    Recovery,
    /// Sleep sessions.
    Sleep,
    /// Strength exercise sets.
    Exercises,
    /// Daily nutrition totals.
    Nutrition,
    /// Daily resilience levels.
    Resilience,
}

impl DataType {
    /// Every canonical data type.
    pub const ALL: [DataType; 8] = [
        Self::Workouts,
        Self::Activity,
        Self::Weight,
        Self::Recovery,
        Self::Sleep,
        Self::Exercises,
        Self::Nutrition,
        Self::Resilience,
    ];

    /// Returns the canonical identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workouts => "workouts",
            Self::Activity => "activity",
            Self::Weight => "weight",
            Self::Recovery => "recovery",
            Self::Sleep => "sleep",
            Self::Exercises => "exercises",
            Self::Nutrition => "nutrition",
            Self::Resilience => "resilience",
        }
    }

    /// Resolves an extractor output key to a canonical data type.
    ///
    /// Extractors are free to name their outputs `workout`, `workouts` or
    /// `workout_records`; this table is the one place that drift is absorbed.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let data_type = match key.trim().to_ascii_lowercase().as_str() {
            "workout" | "workouts" | "workout_records" => Self::Workouts,
            "activity" | "activities" | "activity_records" => Self::Activity,
            "weight" | "weights" | "weight_records" => Self::Weight,
            "recovery" | "recoveries" | "recovery_records" => Self::Recovery,
            "sleep" | "sleeps" | "sleep_records" => Self::Sleep,
            "exercise" | "exercises" | "exercise_records" => Self::Exercises,
            "nutrition" | "nutrition_records" => Self::Nutrition,
            "resilience" | "resilience_records" => Self::Resilience,
            _ => return None,
        };
        Some(data_type)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sport classification of a workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SportType {
    Cycling,
    Running,
    Walking,
    StrengthTraining,
    Yoga,
    Swimming,
    Basketball,
    Soccer,
    Tennis,
    Golf,
    Hiking,
    Rowing,
    Boxing,
    MartialArts,
    Dance,
    Climbing,
    Skiing,
    Snowboarding,
    Surfing,
    Other,
    /// Anything a provider reports that is not in the list above.
    #[default]
    #[serde(other)]
    Unknown,
}

impl SportType {
    /// Returns the snake_case identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cycling => "cycling",
            Self::Running => "running",
            Self::Walking => "walking",
            Self::StrengthTraining => "strength_training",
            Self::Yoga => "yoga",
            Self::Swimming => "swimming",
            Self::Basketball => "basketball",
            Self::Soccer => "soccer",
            Self::Tennis => "tennis",
            Self::Golf => "golf",
            Self::Hiking => "hiking",
            Self::Rowing => "rowing",
            Self::Boxing => "boxing",
            Self::MartialArts => "martial_arts",
            Self::Dance => "dance",
            Self::Climbing => "climbing",
            Self::Skiing => "skiing",
            Self::Snowboarding => "snowboarding",
            Self::Surfing => "surfing",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }

    /// Returns a title-cased label, e.g. `Strength Training`.
    #[must_use]
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns true for resistance training.
    #[must_use]
    pub fn is_strength(&self) -> bool {
        matches!(self, Self::StrengthTraining)
    }
}

impl fmt::Display for SportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub sport: SportType,
    pub duration_minutes: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub strain_score: Option<f64>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub average_heart_rate: Option<f64>,
    #[serde(default)]
    pub max_heart_rate: Option<f64>,
}

/// Daily activity totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub steps: Option<f64>,
    #[serde(default)]
    pub active_calories: Option<f64>,
    #[serde(default)]
    pub total_calories: Option<f64>,
}

/// A scale measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub date: NaiveDate,
    /// Measurement time; used to pick the latest reading of a day.
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    pub weight_kg: f64,
    #[serde(default)]
    pub body_fat_percentage: Option<f64>,
    #[serde(default)]
    pub muscle_mass_kg: Option<f64>,
}

/// A daily recovery score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub recovery_score: Option<f64>,
    #[serde(default)]
    pub hrv_rmssd: Option<f64>,
    #[serde(default)]
    pub resting_hr: Option<f64>,
}

/// A sleep session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub total_sleep_minutes: Option<f64>,
    #[serde(default)]
    pub time_in_bed_minutes: Option<f64>,
    #[serde(default)]
    pub sleep_need_minutes: Option<f64>,
    #[serde(default)]
    pub sleep_score: Option<f64>,
    #[serde(default)]
    pub nap: bool,
}

/// One set of a strength exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub date: NaiveDate,
    pub workout_id: String,
    pub exercise_name: String,
    pub set_number: u32,
    #[serde(default = "default_set_type")]
    pub set_type: String,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub reps: Option<u32>,
}

fn default_set_type() -> String {
    "normal".to_string()
}

/// Daily nutrition totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub date: NaiveDate,
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub alcohol: Option<f64>,
    #[serde(default)]
    pub fiber: Option<f64>,
    #[serde(default)]
    pub sugar: Option<f64>,
}

/// A daily resilience reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub sleep_recovery: Option<f64>,
    #[serde(default)]
    pub daytime_recovery: Option<f64>,
    #[serde(default)]
    pub stress: Option<f64>,
    #[serde(default)]
    pub level: Option<String>,
}

/// A canonical, provider-independent record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CleanRecord {
    /// See [`WorkoutRecord`].
    Workout(WorkoutRecord),
    /// See [`ActivityRecord`].
    Activity(ActivityRecord),
    /// See [`WeightRecord`].
    Weight(WeightRecord),
    /// See [`RecoveryRecord`].
    Recovery(RecoveryRecord),
    /// See [`SleepRecord`].
    Sleep(SleepRecord),
    /// See [`ExerciseRecord`].
    Exercise(ExerciseRecord),
    /// See [`NutritionRecord`].
    Nutrition(NutritionRecord),
    /// See [`ResilienceRecord`].
    Resilience(ResilienceRecord),
}

impl CleanRecord {
    /// Returns the calendar day the record belongs to.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Workout(r) => r.date,
            Self::Activity(r) => r.date,
            Self::Weight(r) => r.date,
            Self::Recovery(r) => r.date,
            Self::Sleep(r) => r.date,
            Self::Exercise(r) => r.date,
            Self::Nutrition(r) => r.date,
            Self::Resilience(r) => r.date,
        }
    }

    /// Returns the canonical data type of the record.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Workout(_) => DataType::Workouts,
            Self::Activity(_) => DataType::Activity,
            Self::Weight(_) => DataType::Weight,
            Self::Recovery(_) => DataType::Recovery,
            Self::Sleep(_) => DataType::Sleep,
            Self::Exercise(_) => DataType::Exercises,
            Self::Nutrition(_) => DataType::Nutrition,
            Self::Resilience(_) => DataType::Resilience,
        }
    }
}

/// A typed canonical record that can be wrapped in and borrowed back out of
/// a [`CleanRecord`].
pub trait CanonicalRecord: DeserializeOwned + Into<CleanRecord> + Send + Sync + 'static {
    /// The data type this record represents.
    const DATA_TYPE: DataType;

    /// Borrows the typed record if `record` holds this variant.
    fn from_clean(record: &CleanRecord) -> Option<&Self>;

    /// Calendar day of the record.
    fn day(&self) -> NaiveDate;
}

macro_rules! impl_canonical {
    ($($record:ident => $variant:ident, $data_type:ident);* $(;)?) => {
        $(
            impl From<$record> for CleanRecord {
                fn from(record: $record) -> Self {
                    Self::$variant(record)
                }
            }

            impl CanonicalRecord for $record {
                const DATA_TYPE: DataType = DataType::$data_type;

                fn from_clean(record: &CleanRecord) -> Option<&Self> {
                    match record {
                        CleanRecord::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn day(&self) -> NaiveDate {
                    self.date
                }
            }
        )*
    };
}

impl_canonical! {
    WorkoutRecord => Workout, Workouts;
    ActivityRecord => Activity, Activity;
    WeightRecord => Weight, Weight;
    RecoveryRecord => Recovery, Recovery;
    SleepRecord => Sleep, Sleep;
    ExerciseRecord => Exercise, Exercises;
    NutritionRecord => Nutrition, Nutrition;
    ResilienceRecord => Resilience, Resilience;
}
