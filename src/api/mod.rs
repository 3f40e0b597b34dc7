use crate::{
    api::handlers::{auth, health, root},
    gateway::{AuthenticationGateway, gateway_middleware},
    otp::{LogSmsSender, OtpChallengeService, OtpConfig},
    pending::PendingRegistrationStore,
    store::{ChallengeStore, RedisStore},
    throttle::{RequestThrottle, ThrottleConfig, throttle_middleware},
    token::TokenService,
};
use anyhow::{Context, Result};
use axum::{
    Extension, Json, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post},
};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub mod email;
pub(crate) mod handlers;
// OpenAPI document generation lives in openapi.rs.
mod openapi;

pub use handlers::auth::{AuthConfig, AuthState};
pub use openapi::openapi;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Build the application router over an already-constructed state.
///
/// Split out from [`new`] so tests can drive the full middleware stack against
/// an in-memory store.
#[must_use]
pub fn router(
    auth_state: Arc<auth::AuthState>,
    gateway: Arc<AuthenticationGateway>,
    throttle: Arc<RequestThrottle>,
) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health))
        .route("/openapi.json", get(|| async { Json(openapi::openapi()) }))
        .route("/v1/auth/otp/send", post(auth::otp::send_otp))
        .route("/v1/auth/otp/verify", post(auth::otp::verify_otp))
        .route("/v1/auth/register", post(auth::register::register))
        .route("/v1/auth/verify-email", post(auth::register::verify_email))
        .route("/v1/auth/password-reset", post(auth::register::password_reset))
        .route(
            "/v1/auth/password-reset/confirm",
            post(auth::register::password_reset_confirm),
        )
        .route(
            "/v1/auth/oauth/:provider",
            post(auth::oauth::normalize_profile),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(middleware::from_fn_with_state(throttle, throttle_middleware))
                .layer(middleware::from_fn_with_state(gateway, gateway_middleware))
                .layer(Extension(auth_state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
#[allow(clippy::too_many_arguments)]
pub async fn new(
    port: u16,
    store_url: String,
    signing_secret: SecretString,
    auth_config: AuthConfig,
    otp_config: OtpConfig,
    throttle_config: ThrottleConfig,
    exempt_prefixes: Vec<String>,
) -> Result<()> {
    // Key problems abort startup, never first use.
    let tokens = TokenService::new(&signing_secret).context("Invalid signing secret")?;

    let redis = RedisStore::connect(&store_url)
        .await
        .context("Failed to connect to challenge store")?;
    redis
        .ping()
        .await
        .context("Challenge store did not answer PING")?;
    let store: Arc<dyn ChallengeStore> = Arc::new(redis);

    let otp = OtpChallengeService::new(Arc::clone(&store), Arc::new(LogSmsSender), otp_config);
    let pending = PendingRegistrationStore::new(Arc::clone(&store));
    let auth_state = Arc::new(auth::AuthState::new(
        auth_config,
        tokens.clone(),
        otp,
        pending,
        store,
        Arc::new(email::LogEmailSender),
    ));
    let gateway = Arc::new(AuthenticationGateway::new(tokens, exempt_prefixes));
    let throttle = Arc::new(RequestThrottle::new(throttle_config));

    let app = router(auth_state, gateway, throttle);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
