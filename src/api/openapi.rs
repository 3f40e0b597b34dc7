use super::handlers::{auth, health};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::otp::send_otp,
        auth::otp::verify_otp,
        auth::register::register,
        auth::register::verify_email,
        auth::register::password_reset,
        auth::register::password_reset_confirm,
        auth::oauth::normalize_profile,
    ),
    components(schemas(
        health::Health,
        auth::types::SendOtpRequest,
        auth::types::VerifyOtpRequest,
        auth::types::RegisterRequest,
        auth::types::VerifyEmailRequest,
        auth::types::PasswordResetRequest,
        auth::types::PasswordResetConfirmRequest,
        auth::types::TokenResponse,
        crate::oauth::CanonicalOAuthProfile,
    )),
    tags(
        (name = "auth", description = "Phone OTP, registration and OAuth normalization"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

/// Generated `OpenAPI` document for the HTTP surface.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::openapi;

    #[test]
    fn documents_all_auth_paths() {
        let doc = openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/v1/auth/otp/send"));
        assert!(paths.contains_key("/v1/auth/otp/verify"));
        assert!(paths.contains_key("/v1/auth/register"));
        assert!(paths.contains_key("/v1/auth/verify-email"));
        assert!(paths.contains_key("/v1/auth/password-reset"));
        assert!(paths.contains_key("/v1/auth/password-reset/confirm"));
        assert!(paths.contains_key("/v1/auth/oauth/{provider}"));
    }
}
