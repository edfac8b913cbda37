use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::application::AppError;
use crate::domain::{Account, AccountId, Transaction};

use super::{ApiError, AppState};

/// Body of `POST /api/accounts`.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub balance: Option<Decimal>,
}

/// Body of the deposit and withdraw endpoints.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub amount: Option<Decimal>,
}

impl AmountRequest {
    fn required_amount(self) -> Result<Decimal, ApiError> {
        self.amount
            .ok_or_else(|| AppError::InvalidAmount("Amount is required".to_string()).into())
    }
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

pub async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(state.list_accounts().await?))
}

pub async fn get_account(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
) -> Result<Json<Account>, ApiError> {
    let Path(id) = path?;
    state
        .get_account(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::AccountNotFound(id).into())
}

pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let Json(request) = payload?;
    let account = state.create_account(request.name, request.balance).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn deposit(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let amount = request.required_amount()?;
    Ok(Json(state.deposit(id, amount).await?))
}

pub async fn withdraw(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let amount = request.required_amount()?;
    Ok(Json(state.withdraw(id, amount).await?))
}

pub async fn transaction_history(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.get_transaction_history(id).await?))
}
