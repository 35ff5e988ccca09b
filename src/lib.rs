pub mod accounts;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod state;
pub mod storage;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
