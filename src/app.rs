use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/calendar/select", post(handlers::select_day))
        .route("/api/calendar", get(handlers::get_calendar))
        .route("/api/selection", post(handlers::post_selection))
        .route("/api/period/preset/:name", get(handlers::get_preset))
        .route("/api/session", get(handlers::get_session))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route("/api/meters/:meter_id/report", get(handlers::meter_report))
        .route("/api/meters/:meter_id/export.csv", get(handlers::export_meter_csv))
        .route("/api/admin/salas", get(handlers::admin_salas))
        .route("/api/admin/export.csv", get(handlers::export_consolidated_csv))
        .with_state(state)
}
