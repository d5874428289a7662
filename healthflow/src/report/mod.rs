//! Markdown rendering of the weekly report.

use crate::errors::RenderError;
use crate::legacy::{LegacyTables, MacrosRow, RecoveryRow, TrainingRow};
use crate::stages::ReportRenderer;
use std::fmt::Write;

/// Recovery scores at or below this are low.
pub const RECOVERY_LOW_MAX: f64 = 33.0;
/// Recovery scores at or above this are high.
pub const RECOVERY_HIGH_MIN: f64 = 66.0;

const MISSING: &str = "-";

/// Recovery score class used for colour coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryClass {
    /// 0-33.
    Low,
    /// 34-65.
    Medium,
    /// 66-100.
    High,
}

impl RecoveryClass {
    /// Classifies a recovery score.
    #[must_use]
    pub fn of(score: f64) -> Self {
        if score <= RECOVERY_LOW_MAX {
            Self::Low
        } else if score < RECOVERY_HIGH_MIN {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// CSS class name.
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Low => "recovery-low",
            Self::Medium => "recovery-medium",
            Self::High => "recovery-high",
        }
    }
}

/// Share of calories from each macronutrient, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroRatios {
    /// Protein at 4 kcal/g.
    pub protein_pct: f64,
    /// Carbohydrates at 4 kcal/g.
    pub carbs_pct: f64,
    /// Fat at 9 kcal/g.
    pub fat_pct: f64,
}

/// Headline numbers for the summary section.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySummary {
    /// Calories summed over days that logged any.
    pub total_calories: f64,
    /// Mean protein over days that logged calories.
    pub average_protein: f64,
    /// Days whose main workout was strength training.
    pub strength_days: usize,
    /// `None` without logged calories.
    pub macro_ratios: Option<MacroRatios>,
}

impl WeeklySummary {
    /// Computes the summary from the report tables.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_tables(tables: &LegacyTables) -> Self {
        let active: Vec<&MacrosRow> = tables.macros.iter().filter(|r| r.calories > 0.0).collect();
        let total_calories: f64 = active.iter().map(|r| r.calories).sum();
        let protein: f64 = active.iter().map(|r| r.protein).sum();
        let average_protein = if active.is_empty() {
            0.0
        } else {
            protein / active.len() as f64
        };

        let macro_ratios = (total_calories > 0.0).then(|| {
            let carbs: f64 = active.iter().map(|r| r.carbs).sum();
            let fat: f64 = active.iter().map(|r| r.fat).sum();
            MacroRatios {
                protein_pct: protein * 4.0 / total_calories * 100.0,
                carbs_pct: carbs * 4.0 / total_calories * 100.0,
                fat_pct: fat * 9.0 / total_calories * 100.0,
            }
        });

        Self {
            total_calories,
            average_protein,
            strength_days: tables.training.iter().filter(|r| r.strength).count(),
            macro_ratios,
        }
    }
}

/// Renders the report as markdown with inline recovery classes.
#[derive(Debug, Clone, Default)]
pub struct MarkdownReportRenderer {
    title: Option<String>,
}

impl MarkdownReportRenderer {
    /// Creates a renderer with the default title.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the report title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn write_report(&self, out: &mut String, tables: &LegacyTables) -> std::fmt::Result {
        let summary = WeeklySummary::from_tables(tables);
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| format!("Weekly Health Report: {}", tables.window));

        writeln!(out, "# {title}")?;
        writeln!(out)?;
        writeln!(out, "## Summary")?;
        writeln!(out)?;
        writeln!(out, "**Key Metrics**:")?;
        writeln!(out)?;
        writeln!(out, "- Weekly Total Calories: {} kcal", thousands(summary.total_calories))?;
        writeln!(out, "- Average Protein: {:.1}g", summary.average_protein)?;
        writeln!(out, "- Strength Training Days: {}", summary.strength_days)?;
        if let Some(ratios) = summary.macro_ratios {
            writeln!(
                out,
                "- Macro Split: protein {:.0}% / carbs {:.0}% / fat {:.0}%",
                ratios.protein_pct, ratios.carbs_pct, ratios.fat_pct
            )?;
        }
        writeln!(out)?;

        writeln!(out, "## Weekly Macronutrients and Activity")?;
        writeln!(out)?;
        write_table(
            out,
            &["DATE", "CALORIES", "PROTEIN", "CARBS", "FAT", "ALCOHOL", "ACTIVITY", "STEPS", "WEIGHT"],
            tables.macros.iter().map(macros_cells),
            "No nutrition or activity data available for this period.",
        )?;
        writeln!(out)?;

        writeln!(out, "## Recovery Metrics")?;
        writeln!(out)?;
        write_table(
            out,
            &["DATE", "RECOVERY", "RES", "HRV", "HR", "SLEEP NEED", "SLEEP ACTUAL"],
            tables.recovery.iter().map(recovery_cells),
            "No recovery data available for this period.",
        )?;
        writeln!(out)?;

        writeln!(out, "## Training Log")?;
        writeln!(out)?;
        write_table(
            out,
            &["DATE", "SPORT", "DURATION", "STRAIN"],
            tables.training.iter().map(training_cells),
            "No training data available for this period.",
        )
    }
}

impl ReportRenderer for MarkdownReportRenderer {
    fn render(&self, tables: &LegacyTables) -> Result<String, RenderError> {
        let mut out = String::new();
        self.write_report(&mut out, tables)
            .map_err(|e| RenderError(format!("failed to write report: {e}")))?;
        Ok(out)
    }
}

fn write_table<I>(out: &mut String, headers: &[&str], rows: I, empty: &str) -> std::fmt::Result
where
    I: Iterator<Item = Vec<String>>,
{
    let rows: Vec<Vec<String>> = rows.collect();
    if rows.is_empty() {
        return writeln!(out, "{empty}");
    }
    writeln!(out, "| {} |", headers.join(" | "))?;
    writeln!(out, "|{}", "---|".repeat(headers.len()))?;
    for row in rows {
        writeln!(out, "| {} |", row.join(" | "))?;
    }
    Ok(())
}

fn date_cell(day: &str, date: &str) -> String {
    format!("{day} {date}")
}

fn number(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}")
}

fn optional(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| number(v, decimals))
}

fn thousands(value: f64) -> String {
    let digits = number(value.abs(), 0);
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && digits != "0" {
        grouped.insert(0, '-');
    }
    grouped
}

fn recovery_score(score: Option<f64>) -> String {
    score.map_or_else(
        || MISSING.to_string(),
        |s| {
            format!(
                "<span class=\"{}\">{s:.0}</span>",
                RecoveryClass::of(s).css_class()
            )
        },
    )
}

fn macros_cells(row: &MacrosRow) -> Vec<String> {
    vec![
        date_cell(&row.day, &row.date),
        number(row.calories, 0),
        number(row.protein, 0),
        number(row.carbs, 0),
        number(row.fat, 0),
        number(row.alcohol, 0),
        row.activity.clone(),
        number(row.steps, 0),
        optional(row.weight, 1),
    ]
}

fn recovery_cells(row: &RecoveryRow) -> Vec<String> {
    vec![
        date_cell(&row.day, &row.date),
        recovery_score(row.recovery),
        row.resilience_level
            .clone()
            .unwrap_or_else(|| MISSING.to_string()),
        optional(row.hrv, 0),
        optional(row.hr, 0),
        optional(row.sleep_need, 1),
        optional(row.sleep_actual, 1),
    ]
}

fn training_cells(row: &TrainingRow) -> Vec<String> {
    vec![
        date_cell(&row.day, &row.date),
        row.sport.clone(),
        row.duration.clone(),
        optional(row.strain, 1),
    ]
}
