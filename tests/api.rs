//! End-to-end tests driving the router with an in-memory challenge store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use custos::{
    api::{
        self, AuthConfig, AuthState,
        email::{EmailMessage, EmailSender},
    },
    gateway::AuthenticationGateway,
    otp::{OtpChallengeService, OtpConfig, SmsSender},
    pending::PendingRegistrationStore,
    store::{ChallengeStore, MemoryStore},
    throttle::{RequestThrottle, ThrottleConfig},
    token::TokenService,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const SECRET: &str = "YW4taW50ZWdyYXRpb24tdGVzdC1zaWduaW5nLWtleS0wMTIzNDU2Nzg5YWI=";

#[derive(Default)]
struct RecordingSms {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send(&self, _phone: &str, message: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message.to_string());
        Ok(())
    }
}

impl RecordingSms {
    fn last_code(&self) -> Option<String> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .last()
            .and_then(|message| message.split_whitespace().last())
            .map(str::to_string)
    }
}

#[derive(Default)]
struct RecordingEmail {
    messages: Mutex<Vec<EmailMessage>>,
}

impl EmailSender for RecordingEmail {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}

impl RecordingEmail {
    fn last_link_token(&self) -> Option<String> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .last()
            .and_then(|message| message.body.split("#token=").nth(1))
            .map(str::to_string)
    }
}

struct Harness {
    app: Router,
    sms: Arc<RecordingSms>,
    email: Arc<RecordingEmail>,
    tokens: TokenService,
}

fn harness(throttle_config: ThrottleConfig) -> Result<Harness> {
    let store: Arc<dyn ChallengeStore> = Arc::new(MemoryStore::new());
    let tokens = TokenService::new(&SecretString::from(SECRET.to_string()))?;
    let sms = Arc::new(RecordingSms::default());
    let email = Arc::new(RecordingEmail::default());

    let otp = OtpChallengeService::new(Arc::clone(&store), sms.clone(), OtpConfig::new());
    let pending = PendingRegistrationStore::new(Arc::clone(&store));
    let auth_state = Arc::new(AuthState::new(
        AuthConfig::new(),
        tokens.clone(),
        otp,
        pending,
        store,
        email.clone(),
    ));
    let gateway = Arc::new(AuthenticationGateway::new(
        tokens.clone(),
        vec!["/v1/auth/otp/".to_string()],
    ));
    let throttle = Arc::new(RequestThrottle::new(throttle_config));

    Ok(Harness {
        app: api::router(auth_state, gateway, throttle),
        sms,
        email,
        tokens,
    })
}

fn post_json(path: &str, client: &str, body: &Value) -> Result<Request<Body>> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(serde_json::to_vec(body)?))
        .context("failed to build request")
}

async fn json_body(response: axum::response::Response) -> Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    serde_json::from_slice(&bytes).context("response body is not JSON")
}

#[tokio::test]
async fn health_is_ok_with_memory_store() -> Result<()> {
    let harness = harness(ThrottleConfig::new())?;
    let response = harness
        .app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-App"));
    let body = json_body(response).await?;
    assert_eq!(body.get("store").and_then(Value::as_str), Some("ok"));
    Ok(())
}

#[tokio::test]
async fn requests_carry_a_request_id() -> Result<()> {
    let harness = harness(ThrottleConfig::new())?;
    let response = harness
        .app
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn otp_send_and_verify_mints_a_token() -> Result<()> {
    let harness = harness(ThrottleConfig::new())?;
    let phone = "+15551230001";

    let response = harness
        .app
        .clone()
        .oneshot(post_json(
            "/v1/auth/otp/send",
            "10.0.0.1",
            &json!({"phone": phone}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let code = harness.sms.last_code().context("no SMS recorded")?;
    let response = harness
        .app
        .oneshot(post_json(
            "/v1/auth/otp/verify",
            "10.0.0.1",
            &json!({"phone": phone, "code": code}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await?;
    let token = body
        .get("token")
        .and_then(Value::as_str)
        .context("missing token")?;
    let claims = harness.tokens.verify(token)?;
    assert_eq!(claims.sub, phone);
    assert_eq!(claims.contact.as_deref(), Some(phone));
    Ok(())
}

#[tokio::test]
async fn wrong_code_is_unauthorized() -> Result<()> {
    let harness = harness(ThrottleConfig::new())?;
    let phone = "+15551230002";

    let response = harness
        .app
        .clone()
        .oneshot(post_json(
            "/v1/auth/otp/send",
            "10.0.0.2",
            &json!({"phone": phone}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = harness
        .app
        .oneshot(post_json(
            "/v1/auth/otp/verify",
            "10.0.0.2",
            &json!({"phone": phone, "code": "000000"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn register_then_verify_email_mints_a_token() -> Result<()> {
    let harness = harness(ThrottleConfig::new())?;

    let response = harness
        .app
        .clone()
        .oneshot(post_json(
            "/v1/auth/register",
            "10.0.0.3",
            &json!({
                "email": "Ada@Example.COM",
                "first_name": "Ada",
                "last_name": "Lovelace"
            }),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let token = harness
        .email
        .last_link_token()
        .context("no verification email recorded")?;
    let response = harness
        .app
        .clone()
        .oneshot(post_json(
            "/v1/auth/verify-email",
            "10.0.0.3",
            &json!({"token": token}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await?;
    let session = body
        .get("token")
        .and_then(Value::as_str)
        .context("missing token")?;
    let claims = harness.tokens.verify(session)?;
    assert_eq!(claims.contact.as_deref(), Some("ada@example.com"));
    assert!(claims.complete);

    // The staged registration is single-use.
    let response = harness
        .app
        .oneshot(post_json(
            "/v1/auth/verify-email",
            "10.0.0.3",
            &json!({"token": token}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn password_reset_is_opaque_and_confirmable() -> Result<()> {
    let harness = harness(ThrottleConfig::new())?;

    let response = harness
        .app
        .clone()
        .oneshot(post_json(
            "/v1/auth/password-reset",
            "10.0.0.4",
            &json!({"email": "ada@example.com"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let token = harness
        .email
        .last_link_token()
        .context("no reset email recorded")?;
    let response = harness
        .app
        .oneshot(post_json(
            "/v1/auth/password-reset/confirm",
            "10.0.0.4",
            &json!({"token": token}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert!(body.get("token").and_then(Value::as_str).is_some());
    Ok(())
}

#[tokio::test]
async fn oauth_normalization_over_http() -> Result<()> {
    let harness = harness(ThrottleConfig::new())?;
    let response = harness
        .app
        .oneshot(post_json(
            "/v1/auth/oauth/github",
            "10.0.0.5",
            &json!({"id": 123, "name": "Ada Lovelace", "email": "ada@example.com"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await?;
    assert_eq!(
        body.get("provider_user_id").and_then(Value::as_str),
        Some("123")
    );
    assert_eq!(body.get("first_name").and_then(Value::as_str), Some("Ada"));
    assert_eq!(
        body.get("last_name").and_then(Value::as_str),
        Some("Lovelace")
    );
    Ok(())
}

#[tokio::test]
async fn auth_paths_are_throttled_per_client() -> Result<()> {
    let config = ThrottleConfig::new().with_max_requests(3);
    let harness = harness(config)?;
    let body = json!({"email": "ada@example.com"});

    for _ in 0..3 {
        let response = harness
            .app
            .clone()
            .oneshot(post_json("/v1/auth/password-reset", "10.1.0.1", &body)?)
            .await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = harness
        .app
        .clone()
        .oneshot(post_json("/v1/auth/password-reset", "10.1.0.1", &body)?)
        .await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // A different client key is unaffected.
    let response = harness
        .app
        .oneshot(post_json("/v1/auth/password-reset", "10.1.0.2", &body)?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn throttle_skips_non_auth_paths() -> Result<()> {
    let config = ThrottleConfig::new().with_max_requests(1);
    let harness = harness(config)?;

    for _ in 0..3 {
        let response = harness
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-forwarded-for", "10.1.0.3")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }
    Ok(())
}
