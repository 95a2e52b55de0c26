use std::sync::Arc;
use std::time::Duration;

use ledgergate_accounting::{GatewayConfig, LedgerGateway};
use ledgergate_api::app::AppServices;
use ledgergate_core::AccountId;
use ledgergate_events::InMemoryPublisher;
use ledgergate_infra::{DeliveryPolicy, InMemoryEngine, NotificationDispatcher};
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    publisher: Arc<InMemoryPublisher>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory engine + publisher, ephemeral port.
        let publisher = Arc::new(InMemoryPublisher::new());
        let dispatcher = Arc::new(NotificationDispatcher::spawn(
            publisher.clone(),
            DeliveryPolicy {
                retry_base_delay: Duration::from_millis(1),
                ..DeliveryPolicy::default()
            },
        ));
        let gateway = LedgerGateway::new(
            Arc::new(InMemoryEngine::new()),
            dispatcher.clone(),
            GatewayConfig::default(),
        );
        let services = Arc::new(AppServices::new(gateway, Some(dispatcher)));

        let app = ledgergate_api::app::build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            publisher,
            handle,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = reqwest::Client::new()
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn open_account(&self, name: &str, bank: bool) -> String {
        let user_id = AccountId::new().to_string();
        let (status, body) = self
            .post(
                "/v1/accounts",
                json!({ "userId": user_id, "username": name, "bank": bank }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        user_id
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_account_echoes_id_and_name() {
    let srv = TestServer::spawn().await;
    let user_id = AccountId::new().to_string();

    let (status, body) = srv
        .post("/v1/accounts", json!({ "userId": user_id, "username": "alice" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["userId"], user_id);
    assert_eq!(
        body["message"],
        format!("Account created for alice with id: {user_id}")
    );
    // YYYY-MM-DD HH:MM
    assert_eq!(body["timestamp"].as_str().unwrap().len(), 16);
}

#[tokio::test]
async fn customer_payment_to_bank_shows_as_negative_balance() {
    let srv = TestServer::spawn().await;
    let alice = srv.open_account("alice", false).await;
    let bank = srv.open_account("bank", true).await;

    let (status, body) = srv
        .post(
            "/v1/transfers",
            json!({ "fromUserId": alice, "toUserId": bank, "amount": 500 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    let (status, body) = srv.post("/v1/balance", json!({ "userId": alice })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], "-500");

    let (status, body) = srv.post("/v1/movements", json!({ "userId": alice })).await;
    assert_eq!(status, StatusCode::OK);
    let movements = body["movements"].as_array().unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0]["fromUsername"], "alice");
    assert_eq!(movements[0]["toUsername"], "bank");
    assert_eq!(movements[0]["amount"], "500");
}

#[tokio::test]
async fn transfer_lifecycle_pay_refund_query() {
    let srv = TestServer::spawn().await;
    let bank = srv.open_account("bank", true).await;
    let alice = srv.open_account("alice", false).await;

    let (status, body) = srv
        .post(
            "/v1/transfers",
            json!({
                "fromUserId": alice,
                "toUserId": bank,
                "amount": 1000,
                "fromUserEmail": "alice@example.com",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], format!("Transferred 1000 from {alice} to {bank}"));
    let payment_id = body["transferId"].as_str().unwrap().to_string();

    let (status, body) = srv
        .post(
            "/v1/transfers",
            json!({ "fromUserId": bank, "toUserId": alice, "amount": 300 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let refund_id = body["transferId"].as_str().unwrap().to_string();

    let (status, body) = srv.post("/v1/balance", json!({ "userId": alice })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], "-700");
    assert_eq!(body["message"], format!("Balances for {alice}."));
    assert_eq!(body["balances"][0], json!({ "income": "300", "outcome": "1000" }));

    let (_, body) = srv.post("/v1/balance", json!({ "userId": bank })).await;
    assert_eq!(body["current"], "700");

    let (status, body) = srv
        .post("/v1/movements", json!({ "userId": alice, "limit": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let movements = body["movements"].as_array().unwrap();
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0]["transferId"], refund_id);
    assert_eq!(movements[0]["fromUsername"], "bank");
    assert_eq!(movements[0]["toUsername"], "alice");
    assert_eq!(movements[0]["amount"], "300");

    srv.services.shutdown().await;
    let published = srv.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].transaction_id, payment_id);
    assert_eq!(published[0].email, "alice@example.com");
}

#[tokio::test]
async fn input_errors_are_400_invalid_argument() {
    let srv = TestServer::spawn().await;
    let alice = AccountId::new().to_string();

    let (status, body) = srv
        .post(
            "/v1/transfers",
            json!({ "fromUserId": alice, "toUserId": AccountId::new().to_string(), "amount": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "invalid_argument");

    let (status, body) = srv
        .post(
            "/v1/balance",
            json!({ "userId": alice, "fromTime": 2000, "toTime": 1000 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");

    let (status, _) = srv
        .post("/v1/movements", json!({ "userId": "not-a-uuid" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn undecodable_bodies_are_400_invalid_argument() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post(
            "/v1/transfers",
            json!({
                "fromUserId": AccountId::new().to_string(),
                "toUserId": AccountId::new().to_string(),
                "amount": -5,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "invalid_argument");
    assert!(body["message"].as_str().unwrap().contains("amount"), "{body}");

    let (status, body) = srv.post("/v1/accounts", json!({ "username": "alice" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");

    let res = reqwest::Client::new()
        .post(format!("{}/v1/balance", srv.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn engine_rejections_are_500_with_result_code() {
    let srv = TestServer::spawn().await;
    let alice = srv.open_account("alice", false).await;
    let bob = srv.open_account("bob", false).await;

    let (status, body) = srv
        .post(
            "/v1/transfers",
            json!({ "fromUserId": alice, "toUserId": bob, "amount": 1 }),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "internal");
    assert!(
        body["message"].as_str().unwrap().contains("code=54 (exceeds_credits)"),
        "{body}"
    );
}

#[tokio::test]
async fn empty_account_has_zero_balance_and_no_movements() {
    let srv = TestServer::spawn().await;
    let alice = srv.open_account("alice", false).await;

    let (status, body) = srv.post("/v1/balance", json!({ "userId": alice })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], "0");
    assert_eq!(body["message"], format!("No balances found for {alice}"));

    let (status, body) = srv.post("/v1/movements", json!({ "userId": alice })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movements"], json!([]));
    assert_eq!(body["message"], format!("No movements found for {alice}"));
}
