//! Phone OTP endpoints.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use crate::otp::OtpError;
use crate::token::{Claims, Role};

use super::state::AuthState;
use super::types::{SendOtpRequest, TokenResponse, VerifyOtpRequest};
use super::utils::{normalize_phone, valid_phone};

/// Send a one-time code to the given phone number.
#[utoipa::path(
    post,
    path = "/v1/auth/otp/send",
    request_body = SendOtpRequest,
    responses(
        (status = 204, description = "Code sent"),
        (status = 400, description = "Invalid phone number", body = String),
        (status = 403, description = "Phone temporarily blocked", body = String),
        (status = 429, description = "Cooldown or hourly limit", body = String)
    ),
    tag = "auth"
)]
pub async fn send_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SendOtpRequest>>,
) -> impl IntoResponse {
    let request: SendOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let phone = normalize_phone(&request.phone);
    if !valid_phone(&phone) {
        return (StatusCode::BAD_REQUEST, "Invalid phone number".to_string()).into_response();
    }

    match auth_state.otp().send_otp(&phone).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(OtpError::PhoneBlocked) => (
            StatusCode::FORBIDDEN,
            "Phone temporarily blocked".to_string(),
        )
            .into_response(),
        Err(OtpError::CooldownActive) => (
            StatusCode::TOO_MANY_REQUESTS,
            "Please wait before requesting another code".to_string(),
        )
            .into_response(),
        Err(OtpError::HourlyLimitExceeded) => (
            StatusCode::TOO_MANY_REQUESTS,
            "Hourly code limit reached".to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to send verification code: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send code".to_string(),
            )
                .into_response()
        }
    }
}

/// Verify a one-time code and mint a session token on success.
#[utoipa::path(
    post,
    path = "/v1/auth/otp/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code verified", body = TokenResponse),
        (status = 400, description = "Invalid input or no active code", body = String),
        (status = 401, description = "Incorrect code", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let phone = normalize_phone(&request.phone);
    if !valid_phone(&phone) {
        return (StatusCode::BAD_REQUEST, "Invalid phone number".to_string()).into_response();
    }
    let code = request.code.trim();
    if code.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing code".to_string()).into_response();
    }

    match auth_state.otp().verify_otp(&phone, code).await {
        Ok(()) => {
            let ttl = auth_state.config().token_ttl();
            let roles = std::iter::once(Role::User).collect();
            let claims = Claims::new(&phone, Some(&phone), &roles, false, ttl);
            match auth_state.tokens().issue_claims(&claims) {
                Ok(token) => (
                    StatusCode::OK,
                    Json(TokenResponse::bearer(token, ttl.as_secs())),
                )
                    .into_response(),
                Err(err) => {
                    error!("Failed to issue token after code verification: {err}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Verification failed".to_string(),
                    )
                        .into_response()
                }
            }
        }
        Err(OtpError::NotFound) => (
            StatusCode::BAD_REQUEST,
            "Code expired or not requested".to_string(),
        )
            .into_response(),
        Err(OtpError::Incorrect) => {
            (StatusCode::UNAUTHORIZED, "Incorrect code".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to verify code: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification failed".to_string(),
            )
                .into_response()
        }
    }
}
