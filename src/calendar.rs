use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::ops::RangeInclusive;

pub const MONTH_NAMES: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

/// Sunday-first weekday header.
pub const WEEKDAY_LABELS: [&str; 7] = ["D", "S", "T", "Q", "Q", "S", "S"];

/// Years offered by the year picker on either side of the current one.
pub const YEAR_WINDOW: i32 = 10;

const MAX_WEEKS: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub day: Option<u32>,
    pub iso_date: Option<String>,
}

impl DayCell {
    fn padding() -> Self {
        Self::default()
    }

    fn day(year: i32, month: u32, day: u32) -> Self {
        Self {
            day: Some(day),
            iso_date: Some(iso_date(year, month, day)),
        }
    }

    pub fn is_padding(&self) -> bool {
        self.day.is_none()
    }
}

pub type Week = [DayCell; 7];

/// Folds an arbitrary month offset into `(year, 0..=11)`.
pub fn normalize(year: i32, month: i32) -> (i32, u32) {
    let total = i64::from(year) * 12 + i64::from(month);
    let year = total.div_euclid(12).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    (year, total.rem_euclid(12) as u32)
}

/// Canonical `YYYY-MM-DD` key; `month` is zero-based.
pub fn iso_date(year: i32, month: u32, day: u32) -> String {
    format!("{year:04}-{:02}-{day:02}", month + 1)
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn first_of_month(year: i32, month: i32) -> Option<NaiveDate> {
    let (year, month) = normalize(year, month);
    NaiveDate::from_ymd_opt(year, month + 1, 1)
}

/// 0 = Sunday .. 6 = Saturday.
pub fn first_weekday(year: i32, month: i32) -> Option<u32> {
    first_of_month(year, month).map(|date| date.weekday().num_days_from_sunday())
}

pub fn days_in_month(year: i32, month: i32) -> Option<u32> {
    let first = first_of_month(year, month)?;
    // day 0 of the following month
    let last = first_of_month(year, month.checked_add(1)?)?.pred_opt()?;
    Some((last - first).num_days() as u32 + 1)
}

/// Builds the Sunday-first week rows for one month. Rows stop as soon as the
/// last day has been placed, so the grid never ends with an all-padding row.
pub fn month_grid(year: i32, month: i32) -> Vec<Week> {
    let (year, month) = normalize(year, month);
    let month = month as i32;
    let (Some(offset), Some(total)) = (first_weekday(year, month), days_in_month(year, month))
    else {
        return Vec::new();
    };

    let mut weeks = Vec::with_capacity(MAX_WEEKS);
    let mut current = 1;
    for week in 0..MAX_WEEKS {
        let row: Week = std::array::from_fn(|weekday| {
            let leading = week == 0 && (weekday as u32) < offset;
            if leading || current > total {
                DayCell::padding()
            } else {
                let cell = DayCell::day(year, month as u32, current);
                current += 1;
                cell
            }
        });
        weeks.push(row);
        if current > total {
            break;
        }
    }
    weeks
}

/// Month currently on display. `month` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarView {
    pub year: i32,
    pub month: i32,
}

impl CalendarView {
    pub fn new(year: i32, month: i32) -> Self {
        Self { year, month }
    }

    /// Opens on the month of `start_date` when it parses, otherwise on `today`.
    pub fn seeded(start_date: &str, today: NaiveDate) -> Self {
        let base = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap_or(today);
        Self::new(base.year(), base.month0() as i32)
    }

    pub fn go_prev(&mut self) {
        if self.month == 0 {
            self.month = 11;
            self.year = self.year.wrapping_sub(1);
        } else {
            self.month -= 1;
        }
    }

    pub fn go_next(&mut self) {
        if self.month == 11 {
            self.month = 0;
            self.year = self.year.wrapping_add(1);
        } else {
            self.month += 1;
        }
    }

    pub fn prev(self) -> Self {
        let mut view = self;
        view.go_prev();
        view
    }

    pub fn next(self) -> Self {
        let mut view = self;
        view.go_next();
        view
    }

    pub fn set_month(&mut self, month: i32) {
        self.month = month;
    }

    pub fn set_year(&mut self, year: i32) {
        self.year = year;
    }

    pub fn grid(&self) -> Vec<Week> {
        month_grid(self.year, self.month)
    }

    pub fn month_name(&self) -> &'static str {
        let (_, month) = normalize(self.year, self.month);
        MONTH_NAMES[month as usize]
    }
}

pub fn year_options(current_year: i32) -> RangeInclusive<i32> {
    current_year - YEAR_WINDOW..=current_year + YEAR_WINDOW
}
