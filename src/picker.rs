//! The date-range picker as a pure component: `render` turns the displayed
//! month plus the parent's selection into a view model, and `click` reports a
//! day back through the parent's `on_select` callback.

use crate::calendar::{self, CalendarView, DayCell, WEEKDAY_LABELS};
use crate::selection::{classify, CellFlags, CellTone, DateRangeSelection};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickerCell {
    pub day: Option<u32>,
    pub iso_date: Option<String>,
    #[serde(flatten)]
    pub flags: CellFlags,
    pub tone: Option<CellTone>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickerModel {
    pub year: i32,
    pub month: i32,
    /// `year`/`month` folded into the month the grid actually shows.
    pub display_year: i32,
    pub display_month: u32,
    pub month_name: &'static str,
    pub weekdays: [&'static str; 7],
    pub years: Vec<i32>,
    pub prev: CalendarView,
    pub next: CalendarView,
    pub weeks: Vec<Vec<PickerCell>>,
    pub selection: DateRangeSelection,
}

pub fn render(
    view: CalendarView,
    selection: &DateRangeSelection,
    today: &str,
    current_year: i32,
) -> PickerModel {
    let weeks = view
        .grid()
        .iter()
        .map(|week| {
            week.iter()
                .map(|cell| render_cell(cell, selection, today))
                .collect::<Vec<_>>()
        })
        .collect();
    let (display_year, display_month) = calendar::normalize(view.year, view.month);

    PickerModel {
        year: view.year,
        month: view.month,
        display_year,
        display_month,
        month_name: view.month_name(),
        weekdays: WEEKDAY_LABELS,
        years: calendar::year_options(current_year).collect(),
        prev: view.prev(),
        next: view.next(),
        weeks,
        selection: selection.clone(),
    }
}

fn render_cell(cell: &DayCell, selection: &DateRangeSelection, today: &str) -> PickerCell {
    let flags = cell
        .iso_date
        .as_deref()
        .map(|date| classify(date, selection, today))
        .unwrap_or_default();
    PickerCell {
        day: cell.day,
        iso_date: cell.iso_date.clone(),
        tone: cell.iso_date.as_ref().map(|_| flags.tone()),
        flags,
    }
}

/// Padding cells are inert; a real day is reported exactly once.
pub fn click(cell: &DayCell, mut on_select: impl FnMut(&str)) -> bool {
    match cell.iso_date.as_deref() {
        Some(date) => {
            on_select(date);
            true
        }
        None => false,
    }
}
