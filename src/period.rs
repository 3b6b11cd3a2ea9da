use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat,
    TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::date_key;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("local time {0} does not exist in this timezone")]
    NonexistentLocalTime(NaiveDateTime),
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("unknown window '{0}'")]
    UnknownWindow(String),
    #[error("range end '{end}' needs a start on or before it, got '{start}'")]
    InvalidRange { start: String, end: String },
}

/// Date and time bounds picked in the period selector. Empty strings mean
/// "not chosen".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub end_time: String,
}

impl Period {
    pub fn is_complete(&self) -> bool {
        !self.start_date.is_empty()
            && !self.start_time.is_empty()
            && !self.end_date.is_empty()
            && !self.end_time.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_empty()
            && self.start_time.is_empty()
            && self.end_date.is_empty()
            && self.end_time.is_empty()
    }

    /// UTC bounds for the history query (`dataInicio`, `dataFim`).
    pub fn to_utc_bounds<Tz: TimeZone>(
        &self,
        tz: &Tz,
        today: NaiveDate,
    ) -> Result<(Option<String>, Option<String>), PeriodError> {
        Ok((
            compose_iso(tz, &self.start_date, &self.start_time, today)?,
            compose_iso(tz, &self.end_date, &self.end_time, today)?,
        ))
    }

    pub fn label(&self, today: NaiveDate) -> Result<String, PeriodError> {
        let start = local_wall_time(&self.start_date, &self.start_time, today)?
            .map(display_local)
            .unwrap_or_else(|| "(início livre)".to_string());
        let end = local_wall_time(&self.end_date, &self.end_time, today)?
            .map(display_local)
            .unwrap_or_else(|| "(fim livre)".to_string());
        Ok(format!("{start} → {end}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    #[serde(rename = "hoje")]
    Today,
    #[serde(rename = "ontem")]
    Yesterday,
    #[serde(rename = "semana")]
    ThisWeek,
    #[serde(rename = "mes")]
    ThisMonth,
}

impl std::str::FromStr for Preset {
    type Err = PeriodError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "hoje" => Ok(Self::Today),
            "ontem" => Ok(Self::Yesterday),
            "semana" => Ok(Self::ThisWeek),
            "mes" => Ok(Self::ThisMonth),
            other => Err(PeriodError::UnknownPreset(other.to_string())),
        }
    }
}

pub fn apply_preset(preset: Preset, now: NaiveDateTime) -> Period {
    let today = now.date();
    let now_time = time_key(now.time());
    let (start, end, end_time) = match preset {
        Preset::Today => (today, today, now_time),
        Preset::Yesterday => {
            let yesterday = today - Duration::days(1);
            (yesterday, yesterday, "23:59".to_string())
        }
        Preset::ThisWeek => {
            let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
            (monday, today, now_time)
        }
        Preset::ThisMonth => (today.with_day(1).unwrap_or(today), today, now_time),
    };

    Period {
        start_date: date_key(start),
        start_time: "00:00".to_string(),
        end_date: date_key(end),
        end_time,
    }
}

/// Rolling window used when no custom period is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "1h")]
    LastHour,
    #[default]
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
}

impl Window {
    pub fn duration(self) -> Duration {
        match self {
            Self::LastHour => Duration::hours(1),
            Self::Last24Hours => Duration::hours(24),
            Self::Last7Days => Duration::days(7),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::LastHour => "Última hora",
            Self::Last24Hours => "Últimas 24 horas",
            Self::Last7Days => "Últimos 7 dias",
        }
    }

    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

impl std::str::FromStr for Window {
    type Err = PeriodError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "1h" => Ok(Self::LastHour),
            "24h" => Ok(Self::Last24Hours),
            "7d" => Ok(Self::Last7Days),
            other => Err(PeriodError::UnknownWindow(other.to_string())),
        }
    }
}

/// Turns a picked local date and time into a UTC ISO-8601 timestamp. Missing
/// date falls back to `today`, missing time to midnight, and a pair of blanks
/// means the bound is open.
pub fn compose_iso<Tz: TimeZone>(
    tz: &Tz,
    date: &str,
    time: &str,
    today: NaiveDate,
) -> Result<Option<String>, PeriodError> {
    let Some(local) = local_wall_time(date, time, today)? else {
        return Ok(None);
    };
    let utc = resolve_local(tz, local)?;
    Ok(Some(utc.to_rfc3339_opts(SecondsFormat::Millis, true)))
}

fn local_wall_time(
    date: &str,
    time: &str,
    today: NaiveDate,
) -> Result<Option<NaiveDateTime>, PeriodError> {
    if date.is_empty() && time.is_empty() {
        return Ok(None);
    }
    let date = if date.is_empty() { today } else { parse_date(date)? };
    let time = if time.is_empty() {
        NaiveTime::MIN
    } else {
        parse_time(time)?
    };
    Ok(Some(date.and_time(time)))
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, PeriodError> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(at) => Ok(at.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(PeriodError::NonexistentLocalTime(local)),
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, PeriodError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| PeriodError::InvalidDate(value.to_string()))
}

/// Like [`parse_date`] but only accepts the zero-padded form, so the result
/// orders correctly as a string.
pub fn parse_date_key(value: &str) -> Result<NaiveDate, PeriodError> {
    let date = parse_date(value)?;
    if date_key(date) != value {
        return Err(PeriodError::InvalidDate(value.to_string()));
    }
    Ok(date)
}

pub fn parse_time(value: &str) -> Result<NaiveTime, PeriodError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| PeriodError::InvalidTime(value.to_string()))
}

fn time_key(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn display_local(at: NaiveDateTime) -> String {
    at.format("%d/%m/%Y, %H:%M:%S").to_string()
}
