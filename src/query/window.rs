//! Date windows and period-over-period math.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// An inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Inclusive day count: a window of one day has length 1.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The immediately preceding window of equal length: same day count,
    /// ending the day before this window starts. No gap, no overlap.
    pub fn previous(&self) -> PeriodWindow {
        let len = self.days() as u64;
        PeriodWindow {
            start: self.start - Days::new(len),
            end: self.start - Days::new(1),
        }
    }

    /// Every calendar day in the window, in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Winrate as a percentage with one decimal, 0 when no games were played.
pub fn winrate_pct(games: i64, wins: i64) -> f64 {
    if games <= 0 {
        return 0.0;
    }
    (wins as f64 / games as f64 * 1000.0).round() / 10.0
}

/// Percentage-point winrate change, rounded to one decimal via x1000/10 so
/// the result survives float noise.
pub fn winrate_change_pp(
    cur_games: i64,
    cur_wins: i64,
    prev_games: i64,
    prev_wins: i64,
) -> f64 {
    let cur = if cur_games > 0 {
        cur_wins as f64 / cur_games as f64
    } else {
        0.0
    };
    let prev = if prev_games > 0 {
        prev_wins as f64 / prev_games as f64
    } else {
        0.0
    };
    ((cur - prev) * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_previous_window_no_gap_no_overlap() {
        let window = PeriodWindow::new(d("2024-01-08"), d("2024-01-14"));
        assert_eq!(window.days(), 7);

        let prev = window.previous();
        assert_eq!(prev.start, d("2024-01-01"));
        assert_eq!(prev.end, d("2024-01-07"));
        assert_eq!(prev.days(), window.days());
    }

    #[test]
    fn test_previous_window_single_day() {
        let window = PeriodWindow::new(d("2024-03-10"), d("2024-03-10"));
        let prev = window.previous();
        assert_eq!(prev.start, d("2024-03-09"));
        assert_eq!(prev.end, d("2024-03-09"));
    }

    #[test]
    fn test_previous_window_across_month_boundary() {
        let window = PeriodWindow::new(d("2024-03-01"), d("2024-03-31"));
        let prev = window.previous();
        assert_eq!(prev.start, d("2024-01-30"));
        assert_eq!(prev.end, d("2024-02-29"));
    }

    #[test]
    fn test_iter_days_dense() {
        let window = PeriodWindow::new(d("2024-01-30"), d("2024-02-02"));
        let days: Vec<NaiveDate> = window.iter_days().collect();
        assert_eq!(
            days,
            vec![d("2024-01-30"), d("2024-01-31"), d("2024-02-01"), d("2024-02-02")]
        );
    }

    #[test]
    fn test_winrate_pct() {
        assert_eq!(winrate_pct(0, 0), 0.0);
        assert_eq!(winrate_pct(3, 2), 66.7);
        assert_eq!(winrate_pct(10, 5), 50.0);
    }

    #[test]
    fn test_winrate_change_pp() {
        // 60% -> 50% is a -10pp change.
        assert_eq!(winrate_change_pp(10, 5, 10, 6), -10.0);
        // New entrant: previous defaults to 0, full current value as change.
        assert_eq!(winrate_change_pp(4, 3, 0, 0), 75.0);
        assert_eq!(winrate_change_pp(3, 1, 3, 2), -33.3);
    }
}
