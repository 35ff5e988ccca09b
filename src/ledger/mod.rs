pub mod dto;
mod error;
pub mod handlers;
mod model;
mod service;
mod store;

pub use error::LedgerError;
pub use model::{EntryDraft, EntryKind, LedgerEntry, Mutation, NewLedgerEntry};
pub use service::{Adjustment, LedgerService, Redemption, DEFAULT_REDEEM_AMOUNT};
pub use store::{Applied, CreditStore, LedgerStore};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::member_routes())
        .merge(handlers::admin_routes())
}
