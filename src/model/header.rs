//! Header tracks drawn above the timeline: years, months, ISO weeks and days.

use chrono::{Datelike, NaiveDate, Weekday};

use super::date::{add_days, last_day_of_month};
use super::timeline::{DateGrid, MONTH_NAMES};

/// One labelled cell in a header track, measured in grid columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSegment {
    pub label: String,
    pub start_index: i64,
    pub span: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTracks {
    pub years: Vec<HeaderSegment>,
    pub months: Vec<HeaderSegment>,
    pub weeks: Vec<HeaderSegment>,
    pub days: Vec<HeaderSegment>,
}

impl HeaderTracks {
    pub fn build(grid: &DateGrid) -> Self {
        Self {
            years: year_track(grid),
            months: month_track(grid),
            weeks: week_track(grid),
            days: day_track(grid),
        }
    }
}

fn segment(grid: &DateGrid, label: String, from: NaiveDate, to: NaiveDate) -> HeaderSegment {
    let start_index = grid.date_to_index(from);
    HeaderSegment {
        label,
        start_index,
        span: grid.date_to_index(to) - start_index + 1,
    }
}

fn year_track(grid: &DateGrid) -> Vec<HeaderSegment> {
    let range = grid.range();
    (range.start().year()..=range.end().year())
        .filter_map(|y| {
            let from = NaiveDate::from_ymd_opt(y, 1, 1)?.max(range.start());
            let to = NaiveDate::from_ymd_opt(y, 12, 31)?.min(range.end());
            Some(segment(grid, y.to_string(), from, to))
        })
        .collect()
}

fn month_track(grid: &DateGrid) -> Vec<HeaderSegment> {
    let range = grid.range();
    let mut out = Vec::new();
    let mut cursor = NaiveDate::from_ymd_opt(range.start().year(), range.start().month(), 1);
    while let Some(first) = cursor {
        if first > range.end() {
            break;
        }
        let Some(last) = last_day_of_month(first.year(), first.month()) else {
            break;
        };
        let from = first.max(range.start());
        let to = last.min(range.end());
        out.push(segment(
            grid,
            MONTH_NAMES[first.month0() as usize].to_string(),
            from,
            to,
        ));
        cursor = last.succ_opt();
    }
    out
}

/// Weeks start on Mondays; the first segment may begin mid-week at index 0
/// and the last is cut off at the range end.
fn week_track(grid: &DateGrid) -> Vec<HeaderSegment> {
    let range = grid.range();
    grid.days()
        .filter(|day| day.index == 0 || day.date.weekday() == Weekday::Mon)
        .map(|day| {
            let to_sunday = 6 - day.date.weekday().num_days_from_monday() as i64;
            let to = add_days(day.date, to_sunday).min(range.end());
            segment(
                grid,
                format!("KW {:02}", day.date.iso_week().week()),
                day.date,
                to,
            )
        })
        .collect()
}

fn day_track(grid: &DateGrid) -> Vec<HeaderSegment> {
    grid.days()
        .map(|day| HeaderSegment {
            label: day.date.day().to_string(),
            start_index: day.index,
            span: 1,
        })
        .collect()
}
