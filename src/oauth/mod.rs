//! Third-party identity-provider profile normalization.
//!
//! One pure mapping function per provider, converging on
//! [`CanonicalOAuthProfile`]. The provider user id becomes the join key for
//! account linking, so a payload without a stable id fails fast instead of
//! silently proceeding.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Payload lacks a stable unique identifier (null/absent/empty id).
    #[error("provider payload is missing a stable user identifier")]
    MissingProviderIdentity,
}

/// Supported upstream providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Github,
    Google,
    Facebook,
}

impl OAuthProvider {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "github" => Some(Self::Github),
            "google" => Some(Self::Google),
            "facebook" => Some(Self::Facebook),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }
}

/// Provider-agnostic profile shape handed to the caller for account linking.
/// Never stored by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CanonicalOAuthProfile {
    pub provider_user_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Normalize a raw provider payload.
///
/// # Errors
///
/// Returns [`NormalizeError::MissingProviderIdentity`] when the payload has
/// no stable user id.
pub fn normalize(
    provider: OAuthProvider,
    payload: &Value,
) -> Result<CanonicalOAuthProfile, NormalizeError> {
    match provider {
        OAuthProvider::Github => normalize_github(payload),
        OAuthProvider::Google => normalize_google(payload),
        OAuthProvider::Facebook => normalize_facebook(payload),
    }
}

fn normalize_github(payload: &Value) -> Result<CanonicalOAuthProfile, NormalizeError> {
    let id = stable_id(payload.get("id"))?;
    let (first_name, last_name) = split_full_name(string_field(payload, "name").as_deref());
    Ok(CanonicalOAuthProfile {
        provider_user_id: id,
        email: string_field(payload, "email"),
        first_name,
        last_name,
        avatar_url: string_field(payload, "avatar_url"),
    })
}

fn normalize_google(payload: &Value) -> Result<CanonicalOAuthProfile, NormalizeError> {
    let id = stable_id(payload.get("sub"))?;
    // Google sends names pre-split; fall back to splitting "name" when absent.
    let first_name = string_field(payload, "given_name");
    let last_name = string_field(payload, "family_name");
    let (first_name, last_name) = if first_name.is_none() && last_name.is_none() {
        split_full_name(string_field(payload, "name").as_deref())
    } else {
        (first_name, last_name)
    };
    Ok(CanonicalOAuthProfile {
        provider_user_id: id,
        email: string_field(payload, "email"),
        first_name,
        last_name,
        avatar_url: string_field(payload, "picture"),
    })
}

fn normalize_facebook(payload: &Value) -> Result<CanonicalOAuthProfile, NormalizeError> {
    let id = stable_id(payload.get("id"))?;
    let first_name = string_field(payload, "first_name");
    let last_name = string_field(payload, "last_name");
    let (first_name, last_name) = if first_name.is_none() && last_name.is_none() {
        split_full_name(string_field(payload, "name").as_deref())
    } else {
        (first_name, last_name)
    };
    let avatar_url = payload
        .pointer("/picture/data/url")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    Ok(CanonicalOAuthProfile {
        provider_user_id: id,
        email: string_field(payload, "email"),
        first_name,
        last_name,
        avatar_url,
    })
}

/// Accept numeric or string ids; null, absent, and empty all fail.
fn stable_id(value: Option<&Value>) -> Result<String, NormalizeError> {
    match value {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(NormalizeError::MissingProviderIdentity),
    }
}

fn string_field(payload: &Value, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Best-effort split of a single full-name field: the first whitespace token
/// is the first name, the remainder (original separators intact) the last.
fn split_full_name(full_name: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(full_name) = full_name.map(str::trim).filter(|name| !name.is_empty()) else {
        return (None, None);
    };
    match full_name.split_once(char::is_whitespace) {
        Some((first, rest)) => (
            Some(first.to_string()),
            Some(rest.trim_start().to_string()).filter(|rest| !rest.is_empty()),
        ),
        None => (Some(full_name.to_string()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn github_profile_normalizes() -> Result<(), NormalizeError> {
        let payload = json!({
            "id": 123,
            "name": "Ada Lovelace",
            "email": "ada@x.com",
            "avatar_url": "https://avatars.example/123"
        });
        let profile = normalize(OAuthProvider::Github, &payload)?;
        assert_eq!(
            profile,
            CanonicalOAuthProfile {
                provider_user_id: "123".to_string(),
                email: Some("ada@x.com".to_string()),
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                avatar_url: Some("https://avatars.example/123".to_string()),
            }
        );
        Ok(())
    }

    #[test]
    fn null_id_fails_fast() {
        let payload = json!({ "id": null, "name": "Ada Lovelace" });
        let result = normalize(OAuthProvider::Github, &payload);
        assert!(matches!(result, Err(NormalizeError::MissingProviderIdentity)));
    }

    #[test]
    fn absent_and_empty_ids_fail_fast() {
        for payload in [json!({}), json!({ "id": "" }), json!({ "id": "  " })] {
            let result = normalize(OAuthProvider::Github, &payload);
            assert!(matches!(result, Err(NormalizeError::MissingProviderIdentity)));
        }
    }

    #[test]
    fn google_uses_pre_split_names() -> Result<(), NormalizeError> {
        let payload = json!({
            "sub": "10769150350006150715113082367",
            "given_name": "Grace",
            "family_name": "Hopper",
            "email": "grace@example.com",
            "picture": "https://lh3.example/photo.jpg"
        });
        let profile = normalize(OAuthProvider::Google, &payload)?;
        assert_eq!(profile.first_name.as_deref(), Some("Grace"));
        assert_eq!(profile.last_name.as_deref(), Some("Hopper"));
        assert_eq!(
            profile.provider_user_id,
            "10769150350006150715113082367".to_string()
        );
        Ok(())
    }

    #[test]
    fn facebook_nested_picture_url() -> Result<(), NormalizeError> {
        let payload = json!({
            "id": "44",
            "name": "Alan Mathison Turing",
            "picture": { "data": { "url": "https://graph.example/44/picture" } }
        });
        let profile = normalize(OAuthProvider::Facebook, &payload)?;
        assert_eq!(profile.first_name.as_deref(), Some("Alan"));
        assert_eq!(profile.last_name.as_deref(), Some("Mathison Turing"));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://graph.example/44/picture")
        );
        Ok(())
    }

    #[test]
    fn absent_names_stay_none_not_empty() -> Result<(), NormalizeError> {
        let payload = json!({ "id": 9 });
        let profile = normalize(OAuthProvider::Github, &payload)?;
        assert_eq!(profile.first_name, None);
        assert_eq!(profile.last_name, None);
        assert_eq!(profile.email, None);
        Ok(())
    }

    #[test]
    fn single_token_name_has_no_last_name() {
        assert_eq!(
            split_full_name(Some("Plato")),
            (Some("Plato".to_string()), None)
        );
        assert_eq!(split_full_name(Some("  ")), (None, None));
        assert_eq!(split_full_name(None), (None, None));
    }

    #[test]
    fn provider_parse_round_trips() {
        for provider in [
            OAuthProvider::Github,
            OAuthProvider::Google,
            OAuthProvider::Facebook,
        ] {
            assert_eq!(OAuthProvider::parse(provider.as_str()), Some(provider));
        }
        assert_eq!(OAuthProvider::parse("myspace"), None);
    }
}
