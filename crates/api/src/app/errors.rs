use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use ledgergate_accounting::{ErrorKind, GatewayError};

pub fn gateway_error_to_response(err: GatewayError) -> axum::response::Response {
    match err.kind() {
        ErrorKind::InvalidArgument => {
            json_error(StatusCode::BAD_REQUEST, "invalid_argument", err.to_string())
        }
        ErrorKind::Internal => {
            error!(error = %err, "request failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", err.to_string())
        }
    }
}

/// Undecodable request bodies (bad JSON, missing fields, negative amounts)
/// are caller errors like any other invalid argument.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_argument", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_bad_requests() {
        let res = gateway_error_to_response(GatewayError::invalid_argument("amount must be greater than 0"));
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_failures_are_internal() {
        let res = gateway_error_to_response(GatewayError::TimedOut {
            operation: "get_account_balances",
            after_ms: 5_000,
        });
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
