pub mod api;
pub mod app;
pub mod calendar;
pub mod config;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod period;
pub mod picker;
pub mod readings;
pub mod selection;
pub mod state;
pub mod storage;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::load_session;
