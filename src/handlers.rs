use crate::api::{ApiClient, ApiError};
use crate::calendar::{date_key, CalendarView};
use crate::errors::AppError;
use crate::export::ExportRequest;
use crate::models::{
    filter_salas, CalendarQuery, DayClickForm, ExportQuery, LoginRequest, MeterReport,
    ReportQuery, Sala, SalaSearch, SelectRequest, Session, SessionStatus,
};
use crate::period::{apply_preset, parse_date_key, Period, Preset, Window};
use crate::picker::{self, PickerModel};
use crate::readings::{build_series, consumption_kwh, is_online, select_readings};
use crate::selection::DateRangeSelection;
use crate::state::AppState;
use crate::storage::persist_session;
use crate::ui::{calendar_href, render_index};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect},
    Form, Json,
};
use chrono::{Datelike, Local, NaiveDate, Utc};
use tracing::{info, warn};

pub async fn index(Query(query): Query<CalendarQuery>) -> Result<Html<String>, AppError> {
    let today = Local::now().date_naive();
    let model = calendar_model(&query, today)?;
    Ok(Html(render_index(&model, &date_key(today))))
}

pub async fn get_calendar(
    Query(query): Query<CalendarQuery>,
) -> Result<Json<PickerModel>, AppError> {
    let today = Local::now().date_naive();
    Ok(Json(calendar_model(&query, today)?))
}

fn calendar_model(query: &CalendarQuery, today: NaiveDate) -> Result<PickerModel, AppError> {
    let selection = query.selection();
    selection.validate()?;
    let mut view = CalendarView::seeded(&selection.start_date, today);
    if let Some(year) = query.year {
        view.set_year(year);
    }
    if let Some(month) = query.month {
        view.set_month(month);
    }
    Ok(picker::render(view, &selection, &date_key(today), today.year()))
}

pub async fn select_day(Form(form): Form<DayClickForm>) -> Result<Redirect, AppError> {
    let mut selection = DateRangeSelection::new(form.start, form.end);
    selection.validate()?;
    let view = CalendarView::new(form.year, form.month);
    let grid = view.grid();
    let cell = grid
        .iter()
        .flatten()
        .find(|cell| cell.iso_date.as_deref() == Some(form.date.as_str()))
        .ok_or_else(|| AppError::bad_request(format!("{} is not on the displayed month", form.date)))?;

    picker::click(cell, |date| selection.select(date));
    Ok(Redirect::to(&calendar_href(
        view,
        &selection.start_date,
        &selection.end_date,
    )))
}

pub async fn post_selection(
    Json(payload): Json<SelectRequest>,
) -> Result<Json<DateRangeSelection>, AppError> {
    payload.selection.validate()?;
    parse_date_key(&payload.date)?;
    Ok(Json(payload.selection.selected(&payload.date)))
}

pub async fn get_preset(Path(name): Path<String>) -> Result<Json<Period>, AppError> {
    let preset: Preset = name.parse()?;
    Ok(Json(apply_preset(preset, Local::now().naive_local())))
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionStatus> {
    let session = state.session.lock().await;
    Json(SessionStatus::from(&*session))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionStatus>, AppError> {
    let response = state.api.login(&payload).await?;
    let mut session = state.session.lock().await;
    *session = Session {
        access_token: Some(response.access_token),
        email: Some(payload.email),
    };
    persist_session(&state.data_path, &session).await?;
    info!("logged in as {}", session.email.as_deref().unwrap_or_default());
    Ok(Json(SessionStatus::from(&*session)))
}

pub async fn logout(State(state): State<AppState>) -> Result<Json<SessionStatus>, AppError> {
    end_session(&state).await?;
    Ok(Json(SessionStatus::default()))
}

async fn end_session(state: &AppState) -> Result<(), AppError> {
    let mut session = state.session.lock().await;
    *session = Session::default();
    persist_session(&state.data_path, &session).await
}

async fn require_api(state: &AppState) -> Result<ApiClient, AppError> {
    state
        .authed_api()
        .await
        .ok_or_else(|| AppError::unauthorized("login required"))
}

/// Drops the stored session when the backend no longer accepts the token.
async fn checked<T>(state: &AppState, result: Result<T, ApiError>) -> Result<T, AppError> {
    match result {
        Err(ApiError::Unauthorized) => {
            warn!("backend rejected token, clearing session");
            end_session(state).await?;
            Err(ApiError::Unauthorized.into())
        }
        other => other.map_err(AppError::from),
    }
}

pub async fn meter_report(
    State(state): State<AppState>,
    Path(meter_id): Path<i64>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<MeterReport>, AppError> {
    let api = require_api(&state).await?;
    let today = Local::now().date_naive();
    let custom = !query.period.is_empty();
    let window = match query.window.as_deref() {
        Some(value) if !value.is_empty() => value.parse::<Window>()?,
        _ => Window::default(),
    };

    let (period_label, (data_inicio, data_fim)) = if custom {
        (
            query.period.label(today)?,
            query.period.to_utc_bounds(&Local, today)?,
        )
    } else {
        (window.label().to_string(), (None, None))
    };

    let latest = match api.latest_reading(meter_id).await {
        Err(ApiError::Status { status, .. }) if status == reqwest::StatusCode::NOT_FOUND => None,
        other => Some(checked(&state, other).await?),
    };
    let history = checked(
        &state,
        api.historical_data(meter_id, data_inicio.as_deref(), data_fim.as_deref())
            .await,
    )
    .await?;
    let sala = match api.sala_info(meter_id).await {
        Ok(info) => Some(info),
        Err(ApiError::Unauthorized) => checked(&state, Err(ApiError::Unauthorized)).await?,
        Err(err) => {
            warn!("sala info unavailable for meter {meter_id}: {err}");
            None
        }
    };

    let now = Utc::now();
    let readings = select_readings(history, (!custom).then_some(window), now);

    Ok(Json(MeterReport {
        meter_id,
        sala,
        period_label,
        online: is_online(latest.as_ref(), now),
        average_voltage: latest.as_ref().map(|reading| reading.average_voltage()),
        consumption_kwh: consumption_kwh(&readings),
        readings: readings.len(),
        series: build_series(&readings, &Local),
        latest,
    }))
}

pub async fn admin_salas(
    State(state): State<AppState>,
    Query(query): Query<SalaSearch>,
) -> Result<Json<Vec<Sala>>, AppError> {
    let api = require_api(&state).await?;
    let salas = checked(&state, api.admin_salas().await).await?;
    Ok(Json(filter_salas(salas, &query.search)))
}

pub async fn export_meter_csv(
    State(state): State<AppState>,
    Path(meter_id): Path<i64>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = export_request(&query)?;
    let api = require_api(&state).await?;
    let body = checked(&state, api.export_meter_csv(meter_id, &request.range).await).await?;
    let file_name = request.meter_file_name(meter_id, Local::now().time());
    info!("exported {} bytes as {file_name}", body.len());
    Ok(csv_download(file_name, body))
}

pub async fn export_consolidated_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = export_request(&query)?;
    let api = require_api(&state).await?;
    let body = checked(&state, api.export_consolidated_csv(&request.range).await).await?;
    let file_name = request.consolidated_file_name(Local::now().time());
    info!("exported {} bytes as {file_name}", body.len());
    Ok(csv_download(file_name, body))
}

fn export_request(query: &ExportQuery) -> Result<ExportRequest, AppError> {
    let blank = |value: &Option<String>| value.as_deref().is_none_or(str::is_empty);
    if let Some(month) = query.month.as_deref().filter(|month| !month.is_empty()) {
        return Ok(ExportRequest::monthly(month)?);
    }
    if blank(&query.start_date) || blank(&query.end_date) {
        return Err(AppError::bad_request("start_date and end_date are required"));
    }
    Ok(ExportRequest::period(
        query.start_date.as_deref().unwrap_or_default(),
        query.end_date.as_deref().unwrap_or_default(),
    )?)
}

fn csv_download(file_name: String, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
}
