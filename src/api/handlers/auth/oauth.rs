//! OAuth profile normalization endpoint.

use axum::{
    Json,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::warn;

use crate::oauth::{self, CanonicalOAuthProfile, OAuthProvider};

/// Normalize a raw provider payload into the canonical profile shape.
#[utoipa::path(
    post,
    path = "/v1/auth/oauth/{provider}",
    request_body = Value,
    params(
        ("provider" = String, Path, description = "One of github, google, facebook")
    ),
    responses(
        (status = 200, description = "Normalized profile", body = CanonicalOAuthProfile),
        (status = 404, description = "Unknown provider", body = String),
        (status = 422, description = "Payload missing a stable identifier", body = String)
    ),
    tag = "auth"
)]
pub async fn normalize_profile(
    Path(provider): Path<String>,
    payload: Option<Json<Value>>,
) -> impl IntoResponse {
    let Some(provider) = OAuthProvider::parse(&provider) else {
        return (StatusCode::NOT_FOUND, "Unknown provider".to_string()).into_response();
    };
    let payload: Value = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match oauth::normalize(provider, &payload) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => {
            warn!(provider = provider.as_str(), "Rejected provider payload: {err}");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Provider payload is missing a stable identifier".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_profile;
    use axum::Json;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::json;

    #[tokio::test]
    async fn unknown_provider_is_404() {
        let response = normalize_profile(
            Path("myspace".to_string()),
            Some(Json(json!({"id": 1}))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn github_payload_normalizes() {
        let response = normalize_profile(
            Path("github".to_string()),
            Some(Json(json!({"id": 123, "name": "Ada Lovelace"}))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn null_identity_is_422() {
        let response = normalize_profile(
            Path("github".to_string()),
            Some(Json(json!({"id": null, "name": "Ada"}))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_payload_is_400() {
        let response = normalize_profile(Path("google".to_string()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
