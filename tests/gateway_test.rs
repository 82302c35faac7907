//! Classifier Gateway and Proxy Tests
//!
//! Runs the HTTP gateway and the classification proxy against local stub
//! servers bound to ephemeral ports.

use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, test, web};
use fraud_monitor_rs::api::{self, SERVER_FALLBACK_REASON};
use fraud_monitor_rs::classifier::adapter::{Classifier, FailureKind};
use fraud_monitor_rs::classifier::groq::GroqAnalyzer;
use fraud_monitor_rs::classifier::http::HttpClassifier;
use fraud_monitor_rs::config::GroqConfig;
use fraud_monitor_rs::model::{SpendingRange, Transaction, UserProfile};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;

const COMPLETION_OK: &str = r#"{"choices":[{"message":{"role":"assistant","content":"{\"isFraud\": true, \"reason\": \"far above typical range\", \"fraudScore\": 95}"}}]}"#;
const COMPLETION_BAD_CONTENT: &str =
    r#"{"choices":[{"message":{"role":"assistant","content":"{\"verdict\": \"fraud\"}"}}]}"#;

/// Serve a fixed status and body on every POST to `path`; returns the base URL.
fn spawn_stub(path: &'static str, status: u16, body: &'static str) -> String {
    let server = HttpServer::new(move || {
        App::new().route(
            path,
            web::post().to(move || async move {
                HttpResponse::build(StatusCode::from_u16(status).unwrap())
                    .content_type("application/json")
                    .body(body)
            }),
        )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind stub server");

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}

/// An address nothing is listening on.
fn closed_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/analyze-transaction-groq", addr)
}

fn groq_config(base_url: String) -> GroqConfig {
    GroqConfig {
        api_key: Some("test-key".to_string()),
        base_url,
        ..GroqConfig::default()
    }
}

fn alice_transaction() -> Transaction {
    Transaction {
        transaction_id: "txn_1700000000000_1".to_string(),
        timestamp: chrono::Utc::now(),
        amount: dec!(900.00),
        currency: "USD".to_string(),
        merchant: "TechCorp Electronics".to_string(),
        country: "USA".to_string(),
        user: UserProfile {
            id: "user_1".to_string(),
            name: "Alice".to_string(),
            home_country: "USA".to_string(),
            typical_spending: SpendingRange::new(dec!(10), dec!(200)),
        },
    }
}

#[actix_web::test]
async fn test_gateway_returns_upstream_verdict() {
    let base = spawn_stub(
        "/verdict",
        200,
        r#"{"isFraud": true, "reason": "amount exceeds typical range", "fraudScore": 92}"#,
    );
    let classifier =
        tokio_test::assert_ok!(HttpClassifier::with_endpoint(&format!("{}/verdict", base)));

    let verdict = classifier.classify(&alice_transaction()).await;

    assert!(!verdict.is_fallback());
    assert!(verdict.result().is_fraud);
    assert_eq!(verdict.result().fraud_score, 92.0);
    assert_eq!(verdict.result().reason, "amount exceeds typical range");
}

#[actix_web::test]
async fn test_gateway_transport_failure_falls_back() {
    let classifier = tokio_test::assert_ok!(HttpClassifier::with_endpoint(&closed_endpoint()));

    let verdict = classifier.classify(&alice_transaction()).await;

    assert_eq!(verdict.failure_kind(), Some(FailureKind::Transport));
    assert!(verdict.result().is_fraud);
    assert_eq!(verdict.result().fraud_score, 80.0);
    assert!(verdict.result().reason.contains("Could not connect"));
}

#[actix_web::test]
async fn test_gateway_malformed_body_falls_back() {
    let base = spawn_stub("/verdict", 200, "this is not json");
    let classifier =
        tokio_test::assert_ok!(HttpClassifier::with_endpoint(&format!("{}/verdict", base)));

    let verdict = classifier.classify(&alice_transaction()).await;

    assert_eq!(verdict.failure_kind(), Some(FailureKind::MalformedResponse));
    assert_eq!(verdict.result().fraud_score, 80.0);
    assert!(verdict.result().reason.contains("Invalid response format"));
}

#[actix_web::test]
async fn test_gateway_mistyped_fields_fall_back() {
    let base = spawn_stub(
        "/verdict",
        200,
        r#"{"isFraud": "true", "reason": "x", "fraudScore": "high"}"#,
    );
    let classifier =
        tokio_test::assert_ok!(HttpClassifier::with_endpoint(&format!("{}/verdict", base)));

    let verdict = classifier.classify(&alice_transaction()).await;

    assert_eq!(verdict.failure_kind(), Some(FailureKind::MalformedResponse));
    assert!(verdict.result().is_fraud);
}

#[actix_web::test]
async fn test_gateway_error_status_without_reason() {
    let base = spawn_stub("/verdict", 503, "");
    let classifier =
        tokio_test::assert_ok!(HttpClassifier::with_endpoint(&format!("{}/verdict", base)));

    let verdict = classifier.classify(&alice_transaction()).await;

    assert_eq!(verdict.failure_kind(), Some(FailureKind::UpstreamStatus));
    assert_eq!(
        verdict.result().reason,
        "Network response was not ok (status: 503)"
    );
}

#[actix_web::test]
async fn test_proxy_relays_model_verdict() {
    let upstream = spawn_stub("/chat/completions", 200, COMPLETION_OK);
    let analyzer = Arc::new(tokio_test::assert_ok!(GroqAnalyzer::new(&groq_config(
        upstream
    ))));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analyzer))
            .configure(api::proxy_config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/analyze-transaction-groq")
        .set_json(alice_transaction())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({"isFraud": true, "reason": "far above typical range", "fraudScore": 95.0})
    );
}

#[actix_web::test]
async fn test_proxy_rejects_missing_transaction() {
    let analyzer = Arc::new(tokio_test::assert_ok!(GroqAnalyzer::new(&groq_config(
        "http://127.0.0.1:9".to_string()
    ))));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analyzer))
            .configure(api::proxy_config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/analyze-transaction-groq")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], json!("Transaction data is required."));
}

#[actix_web::test]
async fn test_proxy_forwards_loosely_shaped_document() {
    let upstream = spawn_stub("/chat/completions", 200, COMPLETION_OK);
    let analyzer = Arc::new(tokio_test::assert_ok!(GroqAnalyzer::new(&groq_config(
        upstream
    ))));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analyzer))
            .configure(api::proxy_config),
    )
    .await;

    // Non-RFC3339 timestamp, no currency, extra field
    let req = test::TestRequest::post()
        .uri("/analyze-transaction-groq")
        .set_json(json!({
            "transactionId": "t1",
            "timestamp": "2024-01-01 12:00",
            "amount": 900,
            "merchant": "TechCorp Electronics",
            "country": "USA",
            "channel": "web"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["fraudScore"], json!(95.0));
}

#[actix_web::test]
async fn test_proxy_rejects_non_object_body() {
    let analyzer = Arc::new(tokio_test::assert_ok!(GroqAnalyzer::new(&groq_config(
        "http://127.0.0.1:9".to_string()
    ))));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analyzer))
            .configure(api::proxy_config),
    )
    .await;

    for body in ["null", "[1, 2]", "42", "{not json"] {
        let req = test::TestRequest::post()
            .uri("/analyze-transaction-groq")
            .insert_header(("content-type", "application/json"))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {}", body);
    }
}

#[actix_web::test]
async fn test_proxy_invalid_model_output_returns_fallback() {
    let upstream = spawn_stub("/chat/completions", 200, COMPLETION_BAD_CONTENT);
    let analyzer = Arc::new(tokio_test::assert_ok!(GroqAnalyzer::new(&groq_config(
        upstream
    ))));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analyzer))
            .configure(api::proxy_config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/analyze-transaction-groq")
        .set_json(alice_transaction())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["isFraud"], json!(true));
    assert_eq!(body["fraudScore"], json!(80.0));
    assert_eq!(body["reason"], json!(SERVER_FALLBACK_REASON));
}

#[actix_web::test]
async fn test_gateway_through_proxy_relays_server_fallback_reason() {
    // Upstream model API rejects the key; the proxy answers 500 with its fallback body
    let upstream = spawn_stub("/chat/completions", 401, r#"{"error": "invalid api key"}"#);
    let analyzer = Arc::new(tokio_test::assert_ok!(GroqAnalyzer::new(&groq_config(
        upstream
    ))));

    let proxy = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(analyzer.clone()))
            .configure(api::proxy_config)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind proxy");
    let addr = proxy.addrs()[0];
    actix_web::rt::spawn(proxy.run());

    let classifier = tokio_test::assert_ok!(HttpClassifier::with_endpoint(&format!(
        "http://{}/analyze-transaction-groq",
        addr
    )));
    let verdict = classifier.classify(&alice_transaction()).await;

    assert_eq!(verdict.failure_kind(), Some(FailureKind::UpstreamStatus));
    assert_eq!(verdict.result().reason, SERVER_FALLBACK_REASON);
    assert_eq!(verdict.result().fraud_score, 80.0);
}
