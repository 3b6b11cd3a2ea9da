//! Thin client for the EletroON REST backend.

use crate::export::ExportRange;
use crate::models::{LoginRequest, LoginResponse, Sala, SalaInfo};
use crate::readings::Reading;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("backend rejected the session")]
    Unauthorized,
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Same connection pool, different bearer token.
    pub fn with_token(&self, token: Option<&str>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: token.map(str::to_string),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.http.get(self.url(path))).await?;
        Ok(response.json().await?)
    }

    /// POST /auth/login
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let response = self
            .send(self.http.post(self.url("/auth/login")).json(request))
            .await?;
        Ok(response.json().await?)
    }

    /// GET /eletroon/{id}/latest
    pub async fn latest_reading(&self, meter_id: i64) -> Result<Reading, ApiError> {
        self.get_json(&format!("/eletroon/{meter_id}/latest")).await
    }

    /// GET /eletroon/{id} with optional `dataInicio`/`dataFim` bounds.
    pub async fn historical_data(
        &self,
        meter_id: i64,
        data_inicio: Option<&str>,
        data_fim: Option<&str>,
    ) -> Result<Vec<Reading>, ApiError> {
        let mut params = Vec::new();
        if let Some(start) = data_inicio {
            params.push(("dataInicio", start));
        }
        if let Some(end) = data_fim {
            params.push(("dataFim", end));
        }
        let request = self
            .http
            .get(self.url(&format!("/eletroon/{meter_id}")))
            .query(&params);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// GET /eletroon/{id}/info
    pub async fn sala_info(&self, meter_id: i64) -> Result<SalaInfo, ApiError> {
        self.get_json(&format!("/eletroon/{meter_id}/info")).await
    }

    /// GET /admin/salas
    pub async fn admin_salas(&self) -> Result<Vec<Sala>, ApiError> {
        self.get_json("/admin/salas").await
    }

    /// GET /eletroon/{id}/export/csv
    pub async fn export_meter_csv(
        &self,
        meter_id: i64,
        range: &ExportRange,
    ) -> Result<Vec<u8>, ApiError> {
        self.get_csv(&format!("/eletroon/{meter_id}/export/csv"), range)
            .await
    }

    /// GET /admin/salas/consolidated-report/csv
    pub async fn export_consolidated_csv(&self, range: &ExportRange) -> Result<Vec<u8>, ApiError> {
        self.get_csv("/admin/salas/consolidated-report/csv", range)
            .await
    }

    async fn get_csv(&self, path: &str, range: &ExportRange) -> Result<Vec<u8>, ApiError> {
        let request = self.http.get(self.url(path)).query(&[
            ("startDate", range.start_date.as_str()),
            ("endDate", range.end_date.as_str()),
        ]);
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
