//! Tests for the payment intent client

use super::{PaymentIntentClient, EMPTY_CHECKOUT_MESSAGE};
use crate::auth::StaticAuth;
use crate::idempotency::cancel_scope;
use crate::storage::InMemorySessionStorage;
use crate::types::{CheckoutItem, CheckoutPayload, ClientConfig, PaymentStatus};
use crate::ErrorKind;
use mockito::{Matcher, Server};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn test_config(url: String) -> ClientConfig {
    ClientConfig::new(url)
        .with_auth(Arc::new(StaticAuth::new("test-token").with_csrf("csrf-abc")))
        .with_retry_base_delay(Duration::from_millis(1))
}

fn test_client(url: String) -> PaymentIntentClient {
    PaymentIntentClient::in_memory(test_config(url)).unwrap()
}

fn checkout() -> CheckoutPayload {
    CheckoutPayload::new(vec![
        CheckoutItem::new("sku-1", 2).with_unit_price(Decimal::new(1000, 2))
    ])
    .with_field("shippingMethod", json!("standard"))
}

#[test]
fn test_client_creation() {
    let client = test_client("https://api.example.com/v1".to_string());
    assert_eq!(client.base_url(), "https://api.example.com/v1/");

    let result = PaymentIntentClient::in_memory(ClientConfig::new("not a url"));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Config);
}

#[tokio::test]
async fn test_create_intent_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/payment-intents")
        .match_header("authorization", "Bearer test-token")
        .match_header("x-csrf-token", "csrf-abc")
        .match_header(
            "x-request-id",
            Matcher::Regex("^[0-9a-f-]{36}$".to_string()),
        )
        .match_body(Matcher::PartialJson(json!({
            "description": "Order #1001",
            "checkoutData": { "shippingMethod": "standard" }
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "success": true,
                "data": {
                    "id": "pay_1",
                    "paymentIntentId": "pi_ext_1",
                    "status": "awaiting_payment",
                    "amount": "20.00",
                    "currency": "THB",
                    "qrCodeUrl": "https://cdn.example.com/qr/pay_1.png"
                },
                "redirectUrl": "https://pay.example.com/checkout/pay_1"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = test_client(server.url());
    let created = client
        .create_intent(Decimal::new(2000, 2), "Order #1001", HashMap::new(), &checkout())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created.intent.id, "pay_1");
    assert_eq!(created.intent.status, PaymentStatus::Pending);
    assert_eq!(created.intent.payment_intent_id.as_deref(), Some("pi_ext_1"));
    assert_eq!(
        created.redirect_url.as_deref(),
        Some("https://pay.example.com/checkout/pay_1")
    );
}

#[tokio::test]
async fn test_create_intent_accepts_minimal_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/payment-intents")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": { "id": "pay_9", "status": "awaiting_payment", "amount": 20 } })
                .to_string(),
        )
        .create_async()
        .await;

    let client = test_client(server.url());
    let created = client
        .create_intent(Decimal::new(20, 0), "Order", HashMap::new(), &checkout())
        .await
        .unwrap();

    assert_eq!(created.intent.id, "pay_9");
    assert_eq!(created.intent.status, PaymentStatus::Pending);
    assert_eq!(created.intent.amount, Decimal::new(20, 0));
    assert_eq!(created.intent.currency, "");
    assert_eq!(created.raw["data"]["id"], "pay_9");
}

#[tokio::test]
async fn test_create_intent_with_only_an_id() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/payment-intents")
        .with_status(201)
        .with_body(json!({ "id": "pay_10" }).to_string())
        .create_async()
        .await;

    let client = test_client(server.url());
    let created = client
        .create_intent(Decimal::new(5, 0), "Order", HashMap::new(), &checkout())
        .await
        .unwrap();

    assert_eq!(created.intent.id, "pay_10");
    assert_eq!(created.intent.status, PaymentStatus::Pending);
    assert_eq!(created.intent.amount, Decimal::ZERO);
}

#[tokio::test]
async fn test_create_intent_rejects_empty_checkout_without_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/payment-intents")
        .with_status(201)
        .expect(0)
        .create_async()
        .await;

    let client = test_client(server.url());
    let result = client
        .create_intent(
            Decimal::new(100, 0),
            "Empty",
            HashMap::new(),
            &CheckoutPayload::new(vec![]),
        )
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err
        .to_string()
        .starts_with("Checkout data with items is required"));
    assert_eq!(err.to_string(), EMPTY_CHECKOUT_MESSAGE);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_intent_failure_uses_server_message() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/payment-intents")
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(json!({ "success": false, "message": "Amount mismatch" }).to_string())
        .create_async()
        .await;

    let client = test_client(server.url());
    let err = client
        .create_intent(Decimal::new(1, 0), "Order", HashMap::new(), &checkout())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.to_string(), "Amount mismatch");
    assert_eq!(err.status_code(), Some(422));
}

#[tokio::test]
async fn test_create_intent_failure_falls_back_to_generic_message() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/payment-intents")
        .with_status(500)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let client = test_client(server.url());
    let err = client
        .create_intent(Decimal::new(1, 0), "Order", HashMap::new(), &checkout())
        .await
        .unwrap_err();

    assert!(err
        .to_string()
        .starts_with("Failed to create payment intent"));
}

#[tokio::test]
async fn test_transport_failure_is_a_value() {
    // Nothing listens on port 1
    let client = test_client("http://127.0.0.1:1".to_string());
    let err = client.query_status("pay_1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn test_query_status_is_cache_busted_and_prefers_nested_status() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/payment-intents/pay_1/status")
        .match_query(Matcher::Regex(r"^t=\d+$".to_string()))
        .match_header("cache-control", "no-cache")
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "status": "ok",
                "data": {
                    "id": "pay_1",
                    "status": "paid",
                    "amount": 20,
                    "currency": "THB"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = test_client(server.url());
    let result = client.query_status("pay_1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.status, PaymentStatus::Succeeded);
    assert_eq!(result.payment.unwrap().id, "pay_1");
    assert_eq!(result.raw["status"], "ok");
}

#[tokio::test]
async fn test_query_status_passes_unknown_values_through() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/payment-intents/pay_1/status")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({ "status": "weird_unknown" }).to_string())
        .create_async()
        .await;

    let client = test_client(server.url());
    let result = client.query_status("pay_1").await.unwrap();
    assert_eq!(result.status.as_str(), "weird_unknown");
    assert!(result.payment.is_none());
}

#[tokio::test]
async fn test_query_status_without_status_is_invalid_response() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/payment-intents/pay_1/status")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({ "success": true }).to_string())
        .create_async()
        .await;

    let client = test_client(server.url());
    let err = client.query_status("pay_1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidResponse);
}

#[tokio::test]
async fn test_cancel_success_clears_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/payment-intents/pay_1/cancel")
        .match_header(
            "idempotency-key",
            Matcher::Regex("^[0-9a-f]{32}$".to_string()),
        )
        .with_status(200)
        .with_body(json!({ "success": true }).to_string())
        .create_async()
        .await;

    let client = test_client(server.url());
    let outcome = client.cancel("pay_1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(outcome.payment_id, "pay_1");
    assert!(!outcome.already_cancelled);
    assert_eq!(
        client
            .idempotency()
            .peek(&cancel_scope("pay_1"))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_cancel_plain_text_ack_is_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/payment-intents/pay_1/cancel")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("OK")
        .expect(1)
        .create_async()
        .await;

    let client = test_client(server.url());
    let outcome = client.cancel("pay_1").await.unwrap();

    mock.assert_async().await;
    assert!(!outcome.already_cancelled);
    assert_eq!(outcome.raw, json!("OK"));
    assert_eq!(
        client
            .idempotency()
            .peek(&cancel_scope("pay_1"))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_cancel_failure_retains_token_for_retry() {
    let mut server = Server::new_async().await;
    let client =
        PaymentIntentClient::in_memory(test_config(server.url()).with_max_cancel_retries(0))
            .unwrap();
    let scope = cancel_scope("pay_1");

    // Two attempts before any success carry the same token
    let failing = server
        .mock("POST", "/payment-intents/pay_1/cancel")
        .with_status(503)
        .with_body(json!({ "message": "Upstream unavailable" }).to_string())
        .expect(2)
        .create_async()
        .await;

    let first = client.cancel("pay_1").await.unwrap_err();
    assert_eq!(first.to_string(), "Upstream unavailable");
    let token = client.idempotency().peek(&scope).await.unwrap().unwrap();

    client.cancel("pay_1").await.unwrap_err();
    assert_eq!(
        client.idempotency().peek(&scope).await.unwrap().as_deref(),
        Some(token.as_str())
    );
    failing.assert_async().await;
    failing.remove_async().await;

    // The eventual success uses that same token, then clears it
    let succeeding = server
        .mock("POST", "/payment-intents/pay_1/cancel")
        .match_header("idempotency-key", token.as_str())
        .with_status(200)
        .with_body(json!({ "success": true }).to_string())
        .create_async()
        .await;

    client.cancel("pay_1").await.unwrap();
    succeeding.assert_async().await;
    assert_eq!(client.idempotency().peek(&scope).await.unwrap(), None);

    // A new logical cancel gets a new token
    let next = client.idempotency().get_or_create(&scope).await.unwrap();
    assert_ne!(next, token);
}

#[tokio::test]
async fn test_cancel_retries_transient_failures_with_same_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/payment-intents/pay_1/cancel")
        .with_status(502)
        .expect(3)
        .create_async()
        .await;

    let client = test_client(server.url());
    let err = client.cancel("pay_1").await.unwrap_err();

    // One attempt plus two retries
    mock.assert_async().await;
    assert_eq!(err.status_code(), Some(502));
    assert!(client
        .idempotency()
        .peek(&cancel_scope("pay_1"))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_cancel_does_not_retry_client_errors() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/payment-intents/pay_1/cancel")
        .with_status(409)
        .with_body(json!({ "error": "Payment cannot be cancelled" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = test_client(server.url());
    let err = client.cancel("pay_1").await.unwrap_err();

    mock.assert_async().await;
    assert_eq!(err.to_string(), "Payment cannot be cancelled");
}

#[tokio::test]
async fn test_cancel_already_cancelled_is_success() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/payment-intents/pay_1/cancel")
        .with_status(200)
        .with_body(
            json!({ "success": true, "data": { "alreadyCancelled": true, "status": "expired" } })
                .to_string(),
        )
        .create_async()
        .await;

    let client = test_client(server.url());
    let outcome = client.cancel("pay_1").await.unwrap();

    assert!(outcome.already_cancelled);
    assert_eq!(
        client
            .idempotency()
            .peek(&cancel_scope("pay_1"))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_token_survives_client_restart_with_shared_storage() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/payment-intents/pay_1/cancel")
        .with_status(500)
        .create_async()
        .await;

    let storage = Arc::new(InMemorySessionStorage::new());
    let config = test_config(server.url()).with_max_cancel_retries(0);

    let first = PaymentIntentClient::new(config.clone(), storage.clone()).unwrap();
    first.cancel("pay_1").await.unwrap_err();
    let token = first
        .idempotency()
        .peek(&cancel_scope("pay_1"))
        .await
        .unwrap();

    let second = PaymentIntentClient::new(config, storage).unwrap();
    assert_eq!(
        second
            .idempotency()
            .peek(&cancel_scope("pay_1"))
            .await
            .unwrap(),
        token
    );
}

#[tokio::test]
async fn test_fetch_qr_url() {
    let mut server = Server::new_async().await;
    let _present = server
        .mock("GET", "/payment-intents/pi_1/qr")
        .with_status(200)
        .with_body(json!({ "data": { "qrCodeUrl": "https://cdn.example.com/qr.png" } }).to_string())
        .create_async()
        .await;
    let _absent = server
        .mock("GET", "/payment-intents/pi_2/qr")
        .with_status(200)
        .with_body(json!({ "data": {} }).to_string())
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/payment-intents/pi_3/qr")
        .with_status(404)
        .create_async()
        .await;

    let client = test_client(server.url());
    assert_eq!(
        client.fetch_qr_url("pi_1").await.unwrap().as_deref(),
        Some("https://cdn.example.com/qr.png")
    );
    assert_eq!(client.fetch_qr_url("pi_2").await.unwrap(), None);
    assert_eq!(client.fetch_qr_url("pi_3").await.unwrap(), None);
}

#[tokio::test]
async fn test_download_qr() {
    let mut server = Server::new_async().await;
    let png = vec![0x89, b'P', b'N', b'G'];
    let _image = server
        .mock("GET", "/payment-intents/pay_1/qr/download")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(png.clone())
        .create_async()
        .await;
    let _none = server
        .mock("GET", "/payment-intents/pay_2/qr/download")
        .with_status(404)
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/payment-intents/pay_3/qr/download")
        .with_status(500)
        .create_async()
        .await;

    let client = test_client(server.url());

    let artifact = client.download_qr("pay_1").await.unwrap().unwrap();
    assert_eq!(artifact.bytes.as_ref(), png.as_slice());
    assert_eq!(artifact.content_type.as_deref(), Some("image/png"));

    assert!(client.download_qr("pay_2").await.unwrap().is_none());
    assert_eq!(
        client.download_qr("pay_3").await.unwrap_err().kind(),
        ErrorKind::Transport
    );
}
