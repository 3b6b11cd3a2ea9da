use chrono::{Datelike, NaiveTime};
use serde::Serialize;

use crate::calendar::{days_in_month, iso_date};
use crate::period::{parse_date, PeriodError};

/// Date span sent as `startDate`/`endDate` to the CSV endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportKind {
    Monthly { month: String },
    Period,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub kind: ExportKind,
    pub range: ExportRange,
}

impl ExportRequest {
    /// `YYYY-MM` expands to the first through the last real day of the month.
    pub fn monthly(month: &str) -> Result<Self, PeriodError> {
        let first = parse_date(&format!("{month}-01"))
            .map_err(|_| PeriodError::InvalidDate(month.to_string()))?;
        let (year, month0) = (first.year(), first.month0());
        let last_day = days_in_month(year, month0 as i32)
            .ok_or_else(|| PeriodError::InvalidDate(month.to_string()))?;
        Ok(Self {
            kind: ExportKind::Monthly {
                month: format!("{year:04}-{:02}", month0 + 1),
            },
            range: ExportRange {
                start_date: iso_date(year, month0, 1),
                end_date: iso_date(year, month0, last_day),
            },
        })
    }

    pub fn period(start_date: &str, end_date: &str) -> Result<Self, PeriodError> {
        parse_date(start_date)?;
        parse_date(end_date)?;
        Ok(Self {
            kind: ExportKind::Period,
            range: ExportRange {
                start_date: start_date.to_string(),
                end_date: end_date.to_string(),
            },
        })
    }

    /// Download name for one meter's export.
    pub fn meter_file_name(&self, meter_id: i64, at: NaiveTime) -> String {
        match &self.kind {
            ExportKind::Monthly { month } => format!(
                "relatorio_mensal_medidor_{meter_id}_{}_{}.csv",
                compact(month),
                clock(at)
            ),
            ExportKind::Period => format!(
                "relatorio_periodo_medidor_{meter_id}_{}_{}_{}.csv",
                compact(&self.range.start_date),
                compact(&self.range.end_date),
                clock(at)
            ),
        }
    }

    /// Download name for the all-salas consolidated export.
    pub fn consolidated_file_name(&self, at: NaiveTime) -> String {
        match &self.kind {
            ExportKind::Monthly { month } => {
                format!("relatorio_consolidado_{}_{}.csv", compact(month), clock(at))
            }
            ExportKind::Period => format!(
                "relatorio_consolidado_periodo_{}_{}_{}.csv",
                compact(&self.range.start_date),
                compact(&self.range.end_date),
                clock(at)
            ),
        }
    }
}

fn compact(date: &str) -> String {
    date.replace('-', "")
}

fn clock(at: NaiveTime) -> String {
    at.format("%H%M%S").to_string()
}
