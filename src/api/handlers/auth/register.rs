//! Registration, email verification and password-reset endpoints.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::api::email::EmailMessage;
use crate::pending;
use crate::token::{Claims, Role};

use super::state::AuthState;
use super::types::{
    PasswordResetConfirmRequest, PasswordResetRequest, PendingReset, PendingUser, RegisterRequest,
    TokenResponse, VerifyEmailRequest,
};
use super::utils::{build_reset_url, build_verify_url, normalize_email, normalize_phone,
    valid_email, valid_phone};

/// Stage a registration and send the verification link.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 202, description = "Registration staged, verification email queued"),
        (status = 400, description = "Invalid input", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }
    let phone = match request.phone.as_deref().map(normalize_phone) {
        Some(phone) if !valid_phone(&phone) => {
            return (StatusCode::BAD_REQUEST, "Invalid phone number".to_string()).into_response();
        }
        other => other,
    };

    let token = match pending::generate_token() {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to generate verification token: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response();
        }
    };

    let staged = PendingUser {
        id: Uuid::new_v4(),
        email: email.clone(),
        phone,
        first_name: request.first_name,
        last_name: request.last_name,
    };
    if let Err(err) = auth_state
        .pending()
        .stage(&token, &staged, auth_state.config().pending_ttl())
        .await
    {
        error!("Failed to stage registration: {err}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Registration failed".to_string(),
        )
            .into_response();
    }

    let message = EmailMessage {
        to: email,
        subject: "Verify your email".to_string(),
        body: build_verify_url(auth_state.config().base_url(), &token),
    };
    if let Err(err) = auth_state.email().send(&message) {
        // The staged record stays valid; the user can register again.
        error!("Failed to send verification email: {err}");
    }

    StatusCode::ACCEPTED.into_response()
}

/// Consume the verification token and mint a session token for the new user.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = TokenResponse),
        (status = 400, description = "Invalid or expired token", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> impl IntoResponse {
    let request: VerifyEmailRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };
    let token = request.token.trim();
    if token.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing token".to_string()).into_response();
    }

    let staged: PendingUser = match auth_state.pending().consume(token).await {
        Ok(Some(staged)) => staged,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                "Invalid or expired token".to_string(),
            )
                .into_response();
        }
        Err(err) => {
            error!("Failed to consume verification token: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification failed".to_string(),
            )
                .into_response();
        }
    };

    let ttl = auth_state.config().token_ttl();
    let roles = std::iter::once(Role::User).collect();
    let complete = staged.first_name.is_some() && staged.last_name.is_some();
    let claims = Claims::new(
        &staged.id.to_string(),
        Some(&staged.email),
        &roles,
        complete,
        ttl,
    );
    match auth_state.tokens().issue_claims(&claims) {
        Ok(token) => (
            StatusCode::OK,
            Json(TokenResponse::bearer(token, ttl.as_secs())),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to issue token after email verification: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification failed".to_string(),
            )
                .into_response()
        }
    }
}

/// Stage a password reset (always returns 204 to avoid user enumeration).
#[utoipa::path(
    post,
    path = "/v1/auth/password-reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 204, description = "Reset accepted")
    ),
    tag = "auth"
)]
pub async fn password_reset(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PasswordResetRequest>>,
) -> impl IntoResponse {
    let request: PasswordResetRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        // Always return 204 for invalid emails to avoid account probing.
        return StatusCode::NO_CONTENT.into_response();
    }

    let token = match pending::generate_token() {
        Ok(token) => token,
        Err(err) => {
            // Fail closed but keep the response opaque.
            error!("Failed to generate reset token: {err}");
            return StatusCode::NO_CONTENT.into_response();
        }
    };

    let staged = PendingReset {
        email: email.clone(),
    };
    if let Err(err) = auth_state
        .pending()
        .stage(&token, &staged, auth_state.config().pending_ttl())
        .await
    {
        error!("Failed to stage password reset: {err}");
        return StatusCode::NO_CONTENT.into_response();
    }

    let message = EmailMessage {
        to: email,
        subject: "Reset your password".to_string(),
        body: build_reset_url(auth_state.config().base_url(), &token),
    };
    if let Err(err) = auth_state.email().send(&message) {
        error!("Failed to send reset email: {err}");
    }

    StatusCode::NO_CONTENT.into_response()
}

/// Consume the reset token and mint a short-lived grant for changing the
/// password downstream.
#[utoipa::path(
    post,
    path = "/v1/auth/password-reset/confirm",
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Reset confirmed", body = TokenResponse),
        (status = 400, description = "Invalid or expired token", body = String)
    ),
    tag = "auth"
)]
pub async fn password_reset_confirm(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PasswordResetConfirmRequest>>,
) -> impl IntoResponse {
    let request: PasswordResetConfirmRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };
    let token = request.token.trim();
    if token.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing token".to_string()).into_response();
    }

    let staged: PendingReset = match auth_state.pending().consume(token).await {
        Ok(Some(staged)) => staged,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                "Invalid or expired token".to_string(),
            )
                .into_response();
        }
        Err(err) => {
            error!("Failed to consume reset token: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Reset failed".to_string(),
            )
                .into_response();
        }
    };

    let ttl = auth_state.config().reset_grant_ttl();
    let roles = std::iter::once(Role::User).collect();
    let claims = Claims::new(&staged.email, Some(&staged.email), &roles, false, ttl);
    match auth_state.tokens().issue_claims(&claims) {
        Ok(token) => (
            StatusCode::OK,
            Json(TokenResponse::bearer(token, ttl.as_secs())),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to issue reset grant: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Reset failed".to_string(),
            )
                .into_response()
        }
    }
}
