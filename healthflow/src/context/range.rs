//! Inclusive calendar date ranges.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// A closed range of calendar days, `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, swapping the bounds if they are reversed.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// Creates the range of exactly `days` days ending on `end`.
    ///
    /// `days == 0` is treated as a single day. A span reaching past the
    /// earliest representable date starts at `NaiveDate::MIN`.
    #[must_use]
    pub fn ending_at(end: NaiveDate, days: u32) -> Self {
        let span = u64::from(days.max(1) - 1);
        let start = end.checked_sub_days(Days::new(span)).unwrap_or_else(|| {
            warn!(%end, days, "Range start out of bounds; clamping to the earliest date");
            NaiveDate::MIN
        });
        Self { start, end }
    }

    /// A single-day range.
    #[must_use]
    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// First day of the range.
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the range, bounds included.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from((self.end - self.start).num_days() + 1).unwrap_or(0)
    }

    /// Always false; a range holds at least one day.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns true if `day` falls inside the range.
    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Walks the range one day at a time.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    /// Splits the range into consecutive windows of at most `chunk_days` days.
    #[must_use]
    pub fn windows(&self, chunk_days: u32) -> Vec<DateRange> {
        let span = u64::try_from(self.len()).unwrap_or(u64::MAX);
        let step = u64::from(chunk_days).min(span).max(1);
        let mut windows = Vec::new();
        let mut cursor = self.start;
        loop {
            let window_end = cursor
                .checked_add_days(Days::new(step - 1))
                .map_or(self.end, |end| end.min(self.end));
            windows.push(Self::new(cursor, window_end));
            match window_end.succ_opt() {
                Some(next) if window_end < self.end => cursor = next,
                _ => break,
            }
        }
        windows
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    #[test]
    fn test_ending_at_has_exact_length() {
        for days in 1..=31 {
            let range = DateRange::ending_at(date(31), days);
            assert_eq!(range.len(), days as usize);
            assert_eq!((range.end() - range.start()).num_days() + 1, i64::from(days));
            assert_eq!(range.days().count(), days as usize);
        }
    }

    #[test]
    fn test_zero_days_is_single_day() {
        let range = DateRange::ending_at(date(10), 0);
        assert_eq!(range, DateRange::single(date(10)));
    }

    #[test]
    fn test_windows_cover_range() {
        let range = DateRange::new(date(1), date(7));
        let windows = range.windows(3);
        assert_eq!(
            windows,
            vec![
                DateRange::new(date(1), date(3)),
                DateRange::new(date(4), date(6)),
                DateRange::single(date(7)),
            ]
        );
        assert_eq!(range.windows(1).len(), 7);
    }

    #[test]
    fn test_ending_at_clamps_to_earliest_date() {
        let range = DateRange::ending_at(date(3), u32::MAX);
        assert_eq!(range.start(), NaiveDate::MIN);
        assert_eq!(range.end(), date(3));
    }

    #[test]
    fn test_oversized_chunk_is_single_window() {
        let range = DateRange::new(date(1), date(3));
        assert_eq!(range.windows(u32::MAX), vec![range]);
        assert_eq!(range.windows(3), vec![range]);
    }

    #[test]
    fn test_windows_at_latest_date() {
        let last = NaiveDate::MAX;
        let range = DateRange::new(last.pred_opt().unwrap(), last);
        assert_eq!(range.windows(1).len(), 2);
        assert_eq!(range.windows(u32::MAX), vec![range]);
    }

    #[test]
    fn test_display() {
        assert_eq!(DateRange::single(date(2)).to_string(), "2025-07-02");
        assert_eq!(DateRange::new(date(3), date(1)).to_string(), "2025-07-01..2025-07-03");
    }
}
