use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateAccountRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    match services.gateway.create_account(body.into()).await {
        Ok(created) => (StatusCode::OK, Json(dto::CreateAccountResponse::from(created))).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn transfer_funds(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::TransferFundsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    match services.gateway.transfer_funds(body.into()).await {
        Ok(done) => (StatusCode::OK, Json(dto::TransferFundsResponse::from(done))).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn get_balance(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::GetBalanceRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    match services.gateway.get_balance(body.into()).await {
        Ok(report) => (StatusCode::OK, Json(dto::BalanceResponse::from(report))).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn get_movements(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::GetMovementsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    match services.gateway.get_movements(body.into()).await {
        Ok(history) => (StatusCode::OK, Json(dto::MovementsResponse::from(history))).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}
