use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use reqwest::{redirect::Policy, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const VALID_TOKEN: &str = "valid-token";
const EXPIRED_TOKEN: &str = "expired-token";
const METERS_ONLY_TOKEN: &str = "meters-only-token";

#[derive(Debug, Deserialize)]
struct Selection {
    start_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
struct SessionStatus {
    logged_in: bool,
    email: Option<String>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));
static BACKEND: Lazy<String> = Lazy::new(spawn_backend);

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn bearer(headers: &HeaderMap, tokens: &[&str]) -> Result<(), StatusCode> {
    let value = headers.get("authorization").and_then(|value| value.to_str().ok());
    match value.and_then(|value| value.strip_prefix("Bearer ")) {
        Some(token) if tokens.contains(&token) => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
    bearer(headers, &[VALID_TOKEN, METERS_ONLY_TOKEN])
}

async fn stub_login(Json(body): Json<Value>) -> impl IntoResponse {
    let token = match body["password"].as_str() {
        Some("expired") => EXPIRED_TOKEN,
        Some("meters-only") => METERS_ONLY_TOKEN,
        _ => VALID_TOKEN,
    };
    Json(json!({ "access_token": token }))
}

async fn stub_latest(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    Ok(Json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "pt": 3.2, "ept_c": 112.5,
        "uarms": 220.0, "ubrms": 221.0, "ucrms": 222.0,
        "pft": 0.97, "iarms": 4.0, "ibrms": 5.0, "icrms": 6.0, "qt": 0.4
    })))
}

async fn stub_history(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let bounded = ["dataInicio", "dataFim"]
        .iter()
        .all(|key| query.get(*key).is_some_and(|value| value.ends_with('Z')));
    if !bounded {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(json!([
        { "timestamp": "2024-03-10T15:30:00Z", "pt": 2.0, "ept_c": 112.5,
          "uarms": 220.0, "ubrms": 220.0, "ucrms": 220.0, "pft": 0.9,
          "iarms": 1.0, "ibrms": 1.0, "icrms": 1.0, "qt": 0.1 },
        { "timestamp": "2024-03-10T12:00:00Z", "pt": 1.0, "ept_c": 100.0,
          "uarms": 220.0, "ubrms": 220.0, "ucrms": 220.0, "pft": 0.9,
          "iarms": 1.0, "ibrms": 1.0, "icrms": 1.0, "qt": 0.1 }
    ])))
}

async fn stub_info(headers: HeaderMap, Path(meter_id): Path<i64>) -> Result<Json<Value>, StatusCode> {
    bearer(&headers, &[VALID_TOKEN])?;
    Ok(Json(json!({ "name": format!("Sala {meter_id}"), "user": { "email": "ana@uni.br" } })))
}

async fn stub_csv(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<String, StatusCode> {
    authorized(&headers)?;
    let start = query.get("startDate").cloned().unwrap_or_default();
    let end = query.get("endDate").cloned().unwrap_or_default();
    Ok(format!("timestamp,pt\n{start},1\n{end},2\n"))
}

async fn stub_salas(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    Ok(Json(json!([
        { "meterId": 7, "name": "Laboratório", "status": "ONLINE", "lastReadingAt": null, "user": { "email": "ana@uni.br" } },
        { "meterId": 8, "name": "Biblioteca", "status": "OFFLINE", "lastReadingAt": null, "user": null }
    ])))
}

fn stub_router() -> Router {
    let api = Router::new()
        .route("/auth/login", post(stub_login))
        .route("/eletroon/:meter_id/latest", get(stub_latest))
        .route("/eletroon/:meter_id", get(stub_history))
        .route("/eletroon/:meter_id/info", get(stub_info))
        .route("/eletroon/:meter_id/export/csv", get(stub_csv))
        .route("/admin/salas", get(stub_salas))
        .route("/admin/salas/consolidated-report/csv", get(stub_csv));
    Router::new().nest("/api", api)
}

/// Runs the fake backend on its own runtime so it outlives any single test.
fn spawn_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind backend port");
    listener.set_nonblocking(true).expect("nonblocking backend listener");
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("backend runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("backend listener");
            axum::serve(listener, stub_router()).await.expect("backend serve");
        });
    });
    format!("http://{addr}/api")
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("eletroon_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/session")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_eletroon_dashboard"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("ELETROON_API_URL", BACKEND.as_str())
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn login(client: &Client, server: &TestServer, password: &str) -> SessionStatus {
    client
        .post(format!("{}/api/login", server.base_url))
        .json(&json!({ "email": "ana@uni.br", "password": password }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_calendar_grid_for_leap_february() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let model: Value = client
        .get(format!("{}/api/calendar?year=2024&month=1", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let days: Vec<&Value> = model["weeks"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|week| week.as_array().unwrap())
        .filter(|cell| !cell["day"].is_null())
        .collect();
    assert_eq!(days.len(), 29);
    assert_eq!(days[28]["iso_date"], "2024-02-29");
    assert_eq!(model["month_name"], "fevereiro");
    assert_eq!(model["next"], json!({ "year": 2024, "month": 2 }));
}

#[tokio::test]
async fn http_selection_click_cycle() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let mut selection = Selection {
        start_date: String::new(),
        end_date: String::new(),
    };
    let mut steps = Vec::new();
    for date in ["2024-03-10", "2024-03-05", "2024-03-20"] {
        selection = client
            .post(format!("{}/api/selection", server.base_url))
            .json(&json!({
                "start_date": selection.start_date,
                "end_date": selection.end_date,
                "date": date,
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        steps.push((selection.start_date.clone(), selection.end_date.clone()));
    }

    assert_eq!(
        steps,
        vec![
            ("2024-03-10".to_string(), String::new()),
            ("2024-03-05".to_string(), "2024-03-10".to_string()),
            ("2024-03-20".to_string(), String::new()),
        ]
    );
}

#[tokio::test]
async fn http_day_form_redirects_with_new_range() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::builder().redirect(Policy::none()).build().unwrap();

    let response = client
        .post(format!("{}/calendar/select", server.base_url))
        .form(&[
            ("date", "2024-03-05"),
            ("start", "2024-03-10"),
            ("end", ""),
            ("year", "2024"),
            ("month", "2"),
        ])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    let location = response.headers()["location"].to_str().unwrap().to_string();
    assert_eq!(location, "/?year=2024&month=2&start=2024-03-05&end=2024-03-10");

    let page = Client::new()
        .get(format!("{}{location}", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains(r#"class="day endpoint" type="submit" data-date="2024-03-05""#));
    assert!(page.contains(r#"class="day in-range" type="submit" data-date="2024-03-07""#));
}

#[tokio::test]
async fn http_rejects_malformed_input() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/selection", server.base_url))
        .json(&json!({ "date": "10/03/2024" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = client
        .get(format!("{}/api/period/preset/ano", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let preset: Value = client
        .get(format!("{}/api/period/preset/ontem", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(preset["start_time"], "00:00");
    assert_eq!(preset["end_time"], "23:59");
    assert_eq!(preset["start_date"], preset["end_date"]);

    for selection in [
        json!({ "start_date": "2024-3-10", "date": "2024-03-20" }),
        json!({ "start_date": "2024-03-20", "end_date": "2024-03-10", "date": "2024-03-25" }),
        json!({ "end_date": "2024-03-10", "date": "2024-03-25" }),
    ] {
        let response = client
            .post(format!("{}/api/selection", server.base_url))
            .json(&selection)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST, "{selection}");
    }

    let response = client
        .get(format!("{}/", server.base_url))
        .query(&[("start", r#""><script>alert(1)</script>"#)])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/calendar/select", server.base_url))
        .form(&[
            ("date", "2024-03-20"),
            ("start", "2024-03-10\nX"),
            ("end", ""),
            ("year", "2024"),
            ("month", "2"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_report_aggregates_custom_period() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let status = login(&client, &server, "secret").await;
    assert!(status.logged_in);
    assert_eq!(status.email.as_deref(), Some("ana@uni.br"));

    let report: Value = client
        .get(format!(
            "{}/api/meters/7/report?start_date=2024-03-10&start_time=00:00&end_date=2024-03-10&end_time=23:59",
            server.base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(report["meter_id"], 7);
    assert_eq!(report["readings"], 2);
    assert_eq!(report["consumption_kwh"], 12.5);
    assert_eq!(report["online"], true);
    assert_eq!(report["average_voltage"], 221.0);
    assert_eq!(report["sala"]["name"], "Sala 7");
    assert_eq!(report["series"]["power"][0]["pt"], 1.0);
    assert_eq!(report["series"]["power"][1]["pt"], 2.0);
}

#[tokio::test]
async fn http_report_requires_login() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    client
        .post(format!("{}/api/logout", server.base_url))
        .send()
        .await
        .unwrap();
    let response = client
        .get(format!("{}/api/meters/7/report", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_rejected_token_logs_out() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    assert!(login(&client, &server, "expired").await.logged_in);
    let response = client
        .get(format!("{}/api/admin/salas", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    let status: SessionStatus = client
        .get(format!("{}/api/session", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!status.logged_in);
}

#[tokio::test]
async fn http_rejected_token_on_sala_info_logs_out() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    assert!(login(&client, &server, "meters-only").await.logged_in);
    let response = client
        .get(format!(
            "{}/api/meters/7/report?start_date=2024-03-10&start_time=00:00&end_date=2024-03-10&end_time=23:59",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    let status: SessionStatus = client
        .get(format!("{}/api/session", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!status.logged_in);
}

#[tokio::test]
async fn http_admin_salas_are_filtered() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    login(&client, &server, "secret").await;
    let salas: Value = client
        .get(format!("{}/api/admin/salas?search=biblio", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let salas = salas.as_array().unwrap();
    assert_eq!(salas.len(), 1);
    assert_eq!(salas[0]["meterId"], 8);
}

#[tokio::test]
async fn http_csv_exports_carry_download_names() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    login(&client, &server, "secret").await;

    let response = client
        .get(format!(
            "{}/api/meters/7/export.csv?start_date=2024-03-05&end_date=2024-03-10",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains("relatorio_periodo_medidor_7_20240305_20240310_"));
    let body = response.text().await.unwrap();
    assert!(body.contains("2024-03-05,1"));

    let response = client
        .get(format!("{}/api/admin/export.csv?month=2024-02", server.base_url))
        .send()
        .await
        .unwrap();
    let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains("relatorio_consolidado_202402_"));
    let body = response.text().await.unwrap();
    assert!(body.contains("2024-02-29,2"));

    let response = client
        .get(format!("{}/api/meters/7/export.csv?start_date=2024-03-05", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
