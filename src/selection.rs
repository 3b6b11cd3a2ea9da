use crate::period::{parse_date_key, PeriodError};
use serde::{Deserialize, Serialize};

/// Range being built by successive day clicks. Both ends are canonical
/// `YYYY-MM-DD` strings or empty, and ordering is plain string ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeSelection {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPhase {
    Empty,
    StartOnly,
    Complete,
}

impl DateRangeSelection {
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    pub fn phase(&self) -> SelectionPhase {
        match (self.start_date.is_empty(), self.end_date.is_empty()) {
            (true, true) => SelectionPhase::Empty,
            (false, true) => SelectionPhase::StartOnly,
            _ => SelectionPhase::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase() == SelectionPhase::Complete
    }

    /// Applies one day click.
    pub fn select(&mut self, date: &str) {
        match self.phase() {
            SelectionPhase::StartOnly => {
                // Re-clicking the start date closes a one-day range. This is
                // what users currently get; product has not confirmed it.
                if date >= self.start_date.as_str() {
                    self.end_date = date.to_string();
                } else {
                    self.end_date = std::mem::replace(&mut self.start_date, date.to_string());
                }
            }
            SelectionPhase::Empty | SelectionPhase::Complete => {
                self.start_date = date.to_string();
                self.end_date.clear();
            }
        }
    }

    pub fn selected(mut self, date: &str) -> Self {
        self.select(date);
        self
    }

    pub fn contains(&self, date: &str) -> bool {
        !self.start_date.is_empty()
            && !self.end_date.is_empty()
            && self.start_date.as_str() <= date
            && date <= self.end_date.as_str()
    }

    /// Both ends are canonical dates or empty, and an end never comes without
    /// a start on or before it.
    pub fn validate(&self) -> Result<(), PeriodError> {
        for value in [&self.start_date, &self.end_date] {
            if !value.is_empty() {
                parse_date_key(value)?;
            }
        }
        if !self.end_date.is_empty() && (self.start_date.is_empty() || self.end_date < self.start_date) {
            return Err(PeriodError::InvalidRange {
                start: self.start_date.clone(),
                end: self.end_date.clone(),
            });
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.start_date.clear();
        self.end_date.clear();
    }
}

/// Styling of a single day, listed from highest to lowest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellTone {
    Endpoint,
    InRange,
    Today,
    Plain,
}

impl CellTone {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Endpoint => "day endpoint",
            Self::InRange => "day in-range",
            Self::Today => "day today",
            Self::Plain => "day",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CellFlags {
    pub is_start: bool,
    pub is_end: bool,
    pub is_in_range: bool,
    pub is_today: bool,
}

impl CellFlags {
    pub fn tone(&self) -> CellTone {
        if self.is_start || self.is_end {
            CellTone::Endpoint
        } else if self.is_in_range {
            CellTone::InRange
        } else if self.is_today {
            CellTone::Today
        } else {
            CellTone::Plain
        }
    }
}

pub fn classify(iso_date: &str, selection: &DateRangeSelection, today: &str) -> CellFlags {
    CellFlags {
        is_start: iso_date == selection.start_date,
        is_end: iso_date == selection.end_date,
        is_in_range: selection.contains(iso_date),
        is_today: iso_date == today,
    }
}
