// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use async_trait::async_trait;
use beacon_core::{AdapterType, BeaconError, HealthStatus, NotificationStatus, PluginAdapter};
use beacon_gateway::{AuthConfig, GatewayState, HealthState, WebhookConfig, build_router};
use beacon_test_utils::{TEST_CALLBACK_URL, TestHarness};
use beacon_twilio::compute_signature;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

fn state(harness: &TestHarness, webhook: WebhookConfig) -> GatewayState {
    GatewayState {
        service: harness.service.clone(),
        scheduler: harness.scheduler.clone(),
        tracker: harness.tracker.clone(),
        store: harness.storage.clone(),
        auth: AuthConfig {
            bearer_token: Some(TOKEN.to_string()),
        },
        webhook,
        health: HealthState {
            start_time: Instant::now(),
            prometheus_render: Some(Arc::new(|| "# TYPE beacon_up gauge\n".to_string())),
            components: vec![harness.storage.clone() as Arc<dyn PluginAdapter>],
        },
    }
}

fn unsigned() -> WebhookConfig {
    WebhookConfig::default()
}

async fn call(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn api(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn two_factor_trigger() -> Value {
    json!({
        "user_id": "u1",
        "phone_number": "+12015550123",
        "notification": {"kind": "two_factor_auth", "code": "482913"}
    })
}

fn webhook(form: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/sms/webhook/status")
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(sig) = signature {
        builder = builder.header("X-Twilio-Signature", sig);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = build_router(state(&harness, unsigned()));
    let request = Request::builder()
        .uri("/v1/notifications?user_id=u1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_and_metrics_are_public() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = build_router(state(&harness, unsigned()));

    let (status, body) = call(
        app.clone(),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body.get("issues").is_none());

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

struct OfflineProvider;

#[async_trait]
impl PluginAdapter for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        Ok(HealthStatus::Unhealthy("credentials rejected".into()))
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        Ok(())
    }
}

#[tokio::test]
async fn health_reports_unhealthy_components() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut state = state(&harness, unsigned());
    state.health.components.push(Arc::new(OfflineProvider));
    let app = build_router(state);

    let (status, body) = call(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["issues"][0], "offline: credentials rejected");
}

#[tokio::test]
async fn sync_trigger_then_list_detail_and_stats() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = build_router(state(&harness, unsigned()));

    let (status, body) = call(
        app.clone(),
        api("POST", "/v1/notifications", Some(two_factor_trigger())),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["outcome"], "sent");
    let id = body["notification"]["id"].as_str().unwrap().to_string();
    assert!(
        body["notification"]["body"]
            .as_str()
            .unwrap()
            .contains("482913")
    );

    let (status, body) = call(
        app.clone(),
        api("GET", "/v1/notifications?user_id=u1&kind=two_factor_auth", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["notifications"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        app.clone(),
        api("GET", &format!("/v1/notifications/{id}?user_id=u1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "sent");

    let (status, _) = call(
        app.clone(),
        api("GET", &format!("/v1/notifications/{id}?user_id=someone-else"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(app, api("GET", "/v1/stats?user_id=u1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"], 30);
    assert_eq!(body["total"], 1);
    assert_eq!(body["sent"], 1);
    assert_eq!(body["by_kind"]["two_factor_auth"], 1);
}

#[tokio::test]
async fn rejected_trigger_reports_reason() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = build_router(state(&harness, unsigned()));
    let mut trigger = two_factor_trigger();
    trigger["phone_number"] = json!("12345");

    let (status, body) = call(app, api("POST", "/v1/notifications", Some(trigger))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(body["reason"], "invalid_number");
}

#[tokio::test]
async fn async_trigger_is_accepted_and_dispatched() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = build_router(state(&harness, unsigned()));
    let mut trigger = two_factor_trigger();
    trigger["mode"] = json!("async");

    let (status, body) = call(app, api("POST", "/v1/notifications", Some(trigger))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "accepted");

    for _ in 0..200 {
        if !harness.notifications("u1").await.unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    harness.scheduler.shutdown().await;
    assert_eq!(harness.provider.send_count().await, 1);
    let records = harness.notifications("u1").await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn webhook_applies_status_and_acknowledges_duplicates() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = build_router(state(&harness, unsigned()));

    let (_, body) = call(
        app.clone(),
        api("POST", "/v1/notifications", Some(two_factor_trigger())),
    )
    .await;
    let sid = body["notification"]["provider_message_id"]
        .as_str()
        .unwrap()
        .to_string();
    let form = format!("MessageSid={sid}&MessageStatus=delivered");

    let (status, body) = call(app.clone(), webhook(&form, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "applied");

    let (status, body) = call(app.clone(), webhook(&form, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "unchanged");

    let late = format!("MessageSid={sid}&MessageStatus=sent");
    let (status, body) = call(app, webhook(&late, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "regressive");

    let records = harness.notifications("u1").await.unwrap();
    assert_eq!(records[0].status, NotificationStatus::Delivered);
}

#[tokio::test]
async fn webhook_unknown_message_is_acknowledged() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = build_router(state(&harness, unsigned()));
    let form = "MessageSid=SMnope&MessageStatus=delivered";
    let (status, body) = call(app, webhook(form, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "unknown_message");
}

#[tokio::test]
async fn webhook_missing_fields_is_bad_request() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = build_router(state(&harness, unsigned()));
    let (status, _) = call(app, webhook("MessageStatus=delivered", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_signature_is_enforced() {
    let harness = TestHarness::builder().build().await.unwrap();
    let config = WebhookConfig {
        auth_token: Some(SecretString::from("auth-token")),
        callback_url: Some(TEST_CALLBACK_URL.to_string()),
        verify_signatures: true,
    };
    let app = build_router(state(&harness, config));
    let form = "MessageSid=SMnope&MessageStatus=delivered";

    let (status, _) = call(app.clone(), webhook(form, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(app.clone(), webhook(form, Some("bm90LXZhbGlk"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let params = vec![
        ("MessageSid".to_string(), "SMnope".to_string()),
        ("MessageStatus".to_string(), "delivered".to_string()),
    ];
    let signature = compute_signature("auth-token", TEST_CALLBACK_URL, &params);
    let (status, body) = call(app, webhook(form, Some(&signature))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "unknown_message");
}
