use crate::period::Period;
use crate::readings::{ChartSeries, Reading};
use crate::selection::DateRangeSelection;
use serde::{Deserialize, Serialize};

/// Persisted login state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Session {
    pub access_token: Option<String>,
    pub email: Option<String>,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionStatus {
    pub logged_in: bool,
    pub email: Option<String>,
}

impl From<&Session> for SessionStatus {
    fn from(session: &Session) -> Self {
        Self {
            logged_in: session.token().is_some(),
            email: session.email.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<i32>,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

impl CalendarQuery {
    pub fn selection(&self) -> DateRangeSelection {
        DateRangeSelection::new(self.start.clone(), self.end.clone())
    }
}

/// Day click posted by the server-rendered calendar.
#[derive(Debug, Deserialize)]
pub struct DayClickForm {
    pub date: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    pub year: i32,
    pub month: i32,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    #[serde(flatten)]
    pub selection: DateRangeSelection,
    pub date: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ReportQuery {
    #[serde(flatten)]
    pub period: Period,
    pub window: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ExportQuery {
    pub month: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SalaSearch {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaUser {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sala {
    pub meter_id: i64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_reading_at: Option<String>,
    #[serde(default)]
    pub user: Option<SalaUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaInfo {
    pub name: String,
    #[serde(default)]
    pub user: Option<SalaUser>,
}

#[derive(Debug, Serialize)]
pub struct MeterReport {
    pub meter_id: i64,
    pub sala: Option<SalaInfo>,
    pub period_label: String,
    pub online: bool,
    pub latest: Option<Reading>,
    pub average_voltage: Option<f64>,
    pub consumption_kwh: f64,
    pub readings: usize,
    pub series: ChartSeries,
}

/// Case-insensitive match on name or user email, plain substring on the
/// meter id.
pub fn filter_salas(salas: Vec<Sala>, search: &str) -> Vec<Sala> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return salas;
    }
    salas
        .into_iter()
        .filter(|sala| {
            sala.name.to_lowercase().contains(&needle)
                || sala.meter_id.to_string().contains(&needle)
                || sala
                    .user
                    .as_ref()
                    .is_some_and(|user| user.email.to_lowercase().contains(&needle))
        })
        .collect()
}
