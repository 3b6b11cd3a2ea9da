use crate::api::ApiClient;
use crate::models::Session;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub session: Arc<Mutex<Session>>,
    pub api: ApiClient,
}

impl AppState {
    pub fn new(data_path: PathBuf, session: Session, api: ApiClient) -> Self {
        Self {
            data_path,
            session: Arc::new(Mutex::new(session)),
            api,
        }
    }

    /// Client carrying the current bearer token, if logged in.
    pub async fn authed_api(&self) -> Option<ApiClient> {
        let session = self.session.lock().await;
        session.token().map(|token| self.api.with_token(Some(token)))
    }
}
