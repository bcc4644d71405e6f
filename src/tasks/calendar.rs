//! Date arithmetic for the planner's week and month views.
//!
//! Weeks run Monday to Sunday.

use chrono::{Datelike, Duration, NaiveDate};

/// Cells in a month view: six rows of seven days.
pub const MONTH_GRID_CELLS: usize = 42;

/// The Monday on or before `date`, `None` before the first representable week.
pub fn monday_of(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_signed(Duration::days(i64::from(
        date.weekday().num_days_from_monday(),
    )))
}

/// The seven days of the week containing `today`, shifted by `offset` weeks.
/// `None` when the shifted week falls outside the supported date range.
pub fn week_days(today: NaiveDate, offset: i64) -> Option<Vec<NaiveDate>> {
    let monday = monday_of(today)?.checked_add_signed(Duration::try_weeks(offset)?)?;
    consecutive_days(monday, 7)
}

pub fn five_days_from(start: NaiveDate) -> Option<Vec<NaiveDate>> {
    consecutive_days(start, 5)
}

fn consecutive_days(start: NaiveDate, count: i64) -> Option<Vec<NaiveDate>> {
    (0..count)
        .map(|offset| start.checked_add_signed(Duration::days(offset)))
        .collect()
}

/// Month view for the month containing `date`: the tail of the previous month
/// back to a Monday, the month itself, then the start of the next month until
/// the grid is full.
pub fn month_grid(date: NaiveDate) -> Option<Vec<NaiveDate>> {
    let first = date.with_day(1).unwrap_or(date);
    consecutive_days(monday_of(first)?, MONTH_GRID_CELLS as i64)
}

/// `"3-9 Mar"` within one month, `"28 Feb - 6 Mar"` across two.
pub fn format_week_range(days: &[NaiveDate]) -> String {
    let (Some(start), Some(end)) = (days.first(), days.last()) else {
        return String::new();
    };

    if start.month() == end.month() {
        format!("{}-{} {}", start.day(), end.day(), start.format("%b"))
    } else {
        format!(
            "{} {} - {} {}",
            start.day(),
            start.format("%b"),
            end.day(),
            end.format("%b")
        )
    }
}

/// Column header, e.g. `"24 May - Today"` or `"25 May"`.
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    let label = format!("{} {}", date.day(), date.format("%b"));
    if is_same_date(date, today) {
        format!("{label} - Today")
    } else {
        label
    }
}

pub fn is_same_date(a: NaiveDate, b: NaiveDate) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_starts_on_monday() {
        // 2026-10-18 is a Sunday.
        let days = week_days(date(2026, 10, 18), 0).unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], date(2026, 10, 12));
        assert_eq!(days[6], date(2026, 10, 18));

        let next = week_days(date(2026, 10, 19), 1).unwrap();
        assert_eq!(next[0], date(2026, 10, 26));
        let previous = week_days(date(2026, 10, 19), -1).unwrap();
        assert_eq!(previous[0], date(2026, 10, 12));
    }

    #[test]
    fn five_days_roll_over_month_end() {
        let days = five_days_from(date(2026, 2, 26)).unwrap();
        assert_eq!(
            days,
            vec![
                date(2026, 2, 26),
                date(2026, 2, 27),
                date(2026, 2, 28),
                date(2026, 3, 1),
                date(2026, 3, 2)
            ]
        );
    }

    #[test]
    fn month_grid_fills_six_weeks() {
        // October 2026 starts on a Thursday.
        let grid = month_grid(date(2026, 10, 19)).unwrap();
        assert_eq!(grid.len(), MONTH_GRID_CELLS);
        assert_eq!(grid[0], date(2026, 9, 28));
        assert_eq!(grid[3], date(2026, 10, 1));
        assert_eq!(grid[41], date(2026, 11, 8));

        // A month starting on Monday has no leading days.
        assert_eq!(month_grid(date(2026, 6, 15)).unwrap()[0], date(2026, 6, 1));
    }

    #[test]
    fn out_of_range_dates_yield_none() {
        assert_eq!(week_days(date(2026, 10, 19), 100_000_000), None);
        assert_eq!(week_days(date(2026, 10, 19), i64::MIN), None);
        assert_eq!(month_grid(NaiveDate::MAX), None);
        assert_eq!(five_days_from(NaiveDate::MAX), None);
    }

    #[test]
    fn formats_week_ranges() {
        assert_eq!(format_week_range(&week_days(date(2026, 3, 4), 0).unwrap()), "2-8 Mar");
        assert_eq!(
            format_week_range(&week_days(date(2026, 3, 1), 0).unwrap()),
            "23 Feb - 1 Mar"
        );
        assert_eq!(format_week_range(&[]), "");
    }

    #[test]
    fn labels_today() {
        let today = date(2026, 5, 24);
        assert_eq!(day_label(today, today), "24 May - Today");
        assert_eq!(day_label(date(2026, 5, 25), today), "25 May");
        assert!(is_same_date(today, date(2026, 5, 24)));
    }
}
