use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    AdjustRequest, AdjustResponse, ScanRequest, ScanResponse, TransactionsResponse, UsersResponse,
};
use crate::{
    auth::{AdminUser, AuthUser},
    error::ApiError,
    state::AppState,
};

pub fn member_routes() -> Router<AppState> {
    Router::new().route("/users/transactions", get(my_transactions))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/scan", post(scan))
        .route("/admin/users", get(list_users))
        .route("/admin/credits", put(adjust_credits))
        .route("/admin/transactions/:user_id", get(user_transactions))
}

#[instrument(skip(state))]
pub async fn my_transactions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let transactions = state.ledger.history(user.id).await?;
    Ok(Json(TransactionsResponse { transactions }))
}

#[instrument(skip(state, payload))]
pub async fn scan(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, ApiError> {
    let Json(req) = payload?;
    let redemption = state
        .ledger
        .redeem(&req.qr_data, req.amount, req.meal_type.as_deref())
        .await?;
    tracing::info!(admin_id = %admin.id, user_id = %redemption.account_id, "scan processed");
    Ok(Json(ScanResponse {
        message: "Credit deducted successfully".into(),
        new_balance: redemption.new_balance,
        user_name: redemption.account_name,
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = state.store.list().await.map_err(ApiError::store)?;
    Ok(Json(UsersResponse { users }))
}

#[instrument(skip(state, payload))]
pub async fn adjust_credits(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    payload: Result<Json<AdjustRequest>, JsonRejection>,
) -> Result<Json<AdjustResponse>, ApiError> {
    let Json(req) = payload?;
    let adjustment = state
        .ledger
        .adjust(req.user_id, req.amount, req.notes.as_deref())
        .await?;
    tracing::info!(admin_id = %admin.id, user_id = %req.user_id, "credits adjusted by admin");
    Ok(Json(AdjustResponse {
        message: "Credits updated successfully".into(),
        new_balance: adjustment.new_balance,
    }))
}

#[instrument(skip(state))]
pub async fn user_transactions(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let transactions = state.ledger.history(user_id).await?;
    Ok(Json(TransactionsResponse { transactions }))
}
