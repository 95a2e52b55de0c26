use axum::{Router, routing::post};

pub mod system;
pub mod transactions;

/// Router for the ledger RPC endpoints.
pub fn router() -> Router {
    Router::new().nest(
        "/v1",
        Router::new()
            .route("/accounts", post(transactions::create_account))
            .route("/transfers", post(transactions::transfer_funds))
            .route("/balance", post(transactions::get_balance))
            .route("/movements", post(transactions::get_movements)),
    )
}
