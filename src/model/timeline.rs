use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::date::{add_days, last_day_of_month};
use crate::error::RangeError;

pub const MIN_DAY_WIDTH: f32 = 2.0;
pub const MAX_DAY_WIDTH: f32 = 80.0;
const ZOOM_STEP: f32 = 1.2;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Whether the timeline shows the whole configured span of years or a single month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Annual,
    Monthly,
}

/// The visible window of dates. `start <= end` always holds, and a monthly
/// range covers exactly one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRange {
    start: NaiveDate,
    end: NaiveDate,
    mode: ViewMode,
}

impl ViewRange {
    /// Jan 1 of `start_year` through Dec 31 of `end_year`.
    pub fn annual(start_year: i32, end_year: i32) -> Result<Self, RangeError> {
        let start = NaiveDate::from_ymd_opt(start_year, 1, 1).ok_or(RangeError::InvalidMonth {
            year: start_year,
            month: 1,
        })?;
        let end = NaiveDate::from_ymd_opt(end_year, 12, 31).ok_or(RangeError::InvalidMonth {
            year: end_year,
            month: 12,
        })?;
        Self::checked(start, end, ViewMode::Annual)
    }

    /// A single calendar month (`month` is 1-based).
    pub fn monthly(year: i32, month: u32) -> Result<Self, RangeError> {
        let invalid = RangeError::InvalidMonth { year, month };
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or(invalid.clone())?;
        let end = last_day_of_month(year, month).ok_or(invalid)?;
        Self::checked(start, end, ViewMode::Monthly)
    }

    fn checked(start: NaiveDate, end: NaiveDate, mode: ViewMode) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end, mode })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Does `[start, end]` intersect the range at all?
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        end >= self.start && start <= self.end
    }

    pub fn clamp(&self, date: NaiveDate) -> NaiveDate {
        date.clamp(self.start, self.end)
    }
}

/// Maps calendar dates to integer day indices and pixel offsets for a view range.
///
/// Index 0 is the first visible day. Weekend days keep their columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateGrid {
    range: ViewRange,
    day_width: f32,
}

impl DateGrid {
    pub fn new(range: ViewRange, day_width: f32) -> Self {
        Self {
            range,
            day_width: day_width.clamp(MIN_DAY_WIDTH, MAX_DAY_WIDTH),
        }
    }

    pub fn range(&self) -> ViewRange {
        self.range
    }

    pub fn day_width(&self) -> f32 {
        self.day_width
    }

    /// Whole days from the range start; negative before it, past `total_days` after it.
    pub fn date_to_index(&self, date: NaiveDate) -> i64 {
        (date - self.range.start).num_days()
    }

    pub fn index_to_date(&self, index: i64) -> NaiveDate {
        add_days(self.range.start, index)
    }

    pub fn total_days(&self) -> i64 {
        self.date_to_index(self.range.end) + 1
    }

    pub fn last_index(&self) -> i64 {
        self.total_days() - 1
    }

    pub fn clamp_index(&self, index: i64) -> i64 {
        index.clamp(0, self.last_index())
    }

    pub fn pixel_to_index(&self, px: f32) -> i64 {
        let raw = (px / self.day_width).floor();
        // `as` saturates and maps NaN to 0.
        self.clamp_index(raw as i64)
    }

    pub fn index_to_pixel(&self, index: i64) -> f32 {
        index as f32 * self.day_width
    }

    /// Nearest whole-day offset for a horizontal pointer delta.
    pub fn delta_days(&self, delta_px: f32) -> i64 {
        (delta_px / self.day_width).round() as i64
    }

    pub fn total_width(&self) -> f32 {
        self.index_to_pixel(self.total_days())
    }

    pub fn is_weekend(&self, index: i64) -> bool {
        matches!(
            self.index_to_date(index).weekday(),
            Weekday::Sat | Weekday::Sun
        )
    }

    /// Every visible day with its rendering flags.
    pub fn days(&self) -> impl Iterator<Item = GridDay> + '_ {
        (0..self.total_days()).map(move |index| {
            let date = self.index_to_date(index);
            GridDay {
                index,
                date,
                weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
                month_start: date.day() == 1,
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDay {
    pub index: i64,
    pub date: NaiveDate,
    pub weekend: bool,
    pub month_start: bool,
}

/// Manages the visible viewport of the timeline: range, mode and zoom.
#[derive(Debug, Clone)]
pub struct Viewport {
    range: ViewRange,
    /// Pixels per day (controls zoom level).
    pub day_width: f32,
    start_year: i32,
    end_year: i32,
}

impl Viewport {
    /// Annual view over `start_year..=end_year`.
    pub fn new(start_year: i32, end_year: i32, day_width: f32) -> Result<Self, RangeError> {
        Ok(Self {
            range: ViewRange::annual(start_year, end_year)?,
            day_width: day_width.clamp(MIN_DAY_WIDTH, MAX_DAY_WIDTH),
            start_year,
            end_year,
        })
    }

    pub fn range(&self) -> ViewRange {
        self.range
    }

    pub fn mode(&self) -> ViewMode {
        self.range.mode()
    }

    pub fn grid(&self) -> DateGrid {
        DateGrid::new(self.range, self.day_width)
    }

    /// Zoom in (increase pixels per day).
    pub fn zoom_in(&mut self) {
        self.day_width = (self.day_width * ZOOM_STEP).min(MAX_DAY_WIDTH);
    }

    /// Zoom out (decrease pixels per day).
    pub fn zoom_out(&mut self) {
        self.day_width = (self.day_width / ZOOM_STEP).max(MIN_DAY_WIDTH);
    }

    pub fn set_day_width(&mut self, day_width: f32) {
        self.day_width = day_width.clamp(MIN_DAY_WIDTH, MAX_DAY_WIDTH);
    }

    /// Switch between annual and monthly display.
    ///
    /// Monthly mode opens on the month containing `focus` when that falls
    /// inside the configured years, otherwise on January of the first year,
    /// and zooms to `monthly_day_width`.
    pub fn set_mode(
        &mut self,
        mode: ViewMode,
        focus: NaiveDate,
        monthly_day_width: f32,
    ) -> Result<(), RangeError> {
        match mode {
            ViewMode::Annual => {
                self.range = ViewRange::annual(self.start_year, self.end_year)?;
            }
            ViewMode::Monthly => {
                let (year, month) = if (self.start_year..=self.end_year).contains(&focus.year()) {
                    (focus.year(), focus.month())
                } else {
                    (self.start_year, 1)
                };
                self.range = ViewRange::monthly(year, month)?;
                self.set_day_width(monthly_day_width);
            }
        }
        Ok(())
    }

    /// Jump straight to a month. Refused outside the configured years.
    pub fn show_month(&mut self, year: i32, month: u32) -> Result<bool, RangeError> {
        if !(self.start_year..=self.end_year).contains(&year) {
            return Ok(false);
        }
        self.range = ViewRange::monthly(year, month)?;
        Ok(true)
    }

    /// Step the monthly view forward or backward by whole months.
    ///
    /// Returns false (and stays put) in annual mode or when the step would
    /// leave the configured years.
    pub fn navigate_month(&mut self, direction: i32) -> bool {
        if self.range.mode() != ViewMode::Monthly {
            return false;
        }
        let start = self.range.start();
        let months = start.year() * 12 + start.month0() as i32 + direction;
        let (year, month) = (months.div_euclid(12), months.rem_euclid(12) as u32 + 1);
        self.show_month(year, month).unwrap_or(false)
    }

    /// Months selectable in the month picker, in order.
    pub fn selectable_months(&self) -> Vec<(i32, u32)> {
        (self.start_year..=self.end_year)
            .flat_map(|y| (1..=12).map(move |m| (y, m)))
            .collect()
    }

    /// Heading for the current range ("2025–2026", "March 2025").
    pub fn label(&self) -> String {
        match self.range.mode() {
            ViewMode::Annual => format!("{}–{}", self.start_year, self.end_year),
            ViewMode::Monthly => {
                let start = self.range.start();
                format!("{} {}", MONTH_NAMES[start.month0() as usize], start.year())
            }
        }
    }

    /// Horizontal scroll offset that puts `date` a third of the way into a
    /// viewport `visible_width` pixels wide.
    pub fn scroll_offset_for(&self, date: NaiveDate, visible_width: f32) -> f32 {
        let grid = self.grid();
        let x = grid.index_to_pixel(grid.date_to_index(date));
        (x - visible_width / 3.0).max(0.0)
    }
}
