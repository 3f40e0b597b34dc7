//! Per-request authentication gateway.
//!
//! Turns an unauthenticated HTTP request into a role-bearing [`Principal`]
//! when a valid bearer token is present. Missing, expired, and malformed
//! tokens all proceed unauthenticated; per-route authorization decides
//! downstream whether that is acceptable. Roles come straight from verified
//! claims, with no store round-trip.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::token::{Claims, Error as TokenError, Role, TokenService};

/// Verified request identity, constructed transiently per request and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub contact: Option<String>,
    pub roles: BTreeSet<Role>,
    pub profile_complete: bool,
}

impl Principal {
    /// Build a principal from verified claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim roles fall outside the closed enum.
    pub fn from_claims(claims: &Claims) -> Result<Self, TokenError> {
        Ok(Self {
            subject: claims.sub.clone(),
            contact: claims.contact.clone(),
            roles: claims.role_set()?,
            profile_complete: claims.complete,
        })
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

pub struct AuthenticationGateway {
    tokens: TokenService,
    exempt_prefixes: Vec<String>,
}

impl std::fmt::Debug for AuthenticationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationGateway")
            .field("exempt_prefixes", &self.exempt_prefixes)
            .finish_non_exhaustive()
    }
}

impl AuthenticationGateway {
    #[must_use]
    pub fn new(tokens: TokenService, exempt_prefixes: Vec<String>) -> Self {
        Self {
            tokens,
            exempt_prefixes,
        }
    }

    /// Paths that carry their own short-lived credentials (OTP verification,
    /// profile completion) skip bearer-token processing entirely.
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Resolve the request headers into a principal, if a valid token is
    /// presented. `None` means "proceed unauthenticated".
    #[must_use]
    pub fn authenticate(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = bearer_token(headers)?;
        match self.tokens.verify(token) {
            Ok(claims) => match Principal::from_claims(&claims) {
                Ok(principal) => Some(principal),
                Err(err) => {
                    warn!("verified token carried invalid roles: {err}");
                    None
                }
            },
            Err(err) if err.is_expired() => {
                debug!("expired bearer token, proceeding unauthenticated");
                None
            }
            Err(err) => {
                // Tampered or corrupt tokens are a security signal, not a
                // user mistake.
                warn!("malformed bearer token rejected: {err}");
                None
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware attaching a [`Principal`] extension for downstream handlers.
pub async fn gateway_middleware(
    State(gateway): State<Arc<AuthenticationGateway>>,
    mut request: Request,
    next: Next,
) -> Response {
    if gateway.is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    if let Some(principal) = gateway.authenticate(request.headers()) {
        request.extensions_mut().insert(principal);
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use base64ct::{Base64, Encoding};
    use secrecy::SecretString;
    use std::time::Duration;

    fn tokens() -> TokenService {
        let secret = SecretString::from(Base64::encode_string(&[9u8; 32]));
        TokenService::new(&secret).expect("valid key")
    }

    fn gateway() -> AuthenticationGateway {
        AuthenticationGateway::new(
            tokens(),
            vec!["/health".to_string(), "/v1/auth/".to_string()],
        )
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header value"),
        );
        headers
    }

    #[test]
    fn valid_token_resolves_principal_with_roles() {
        let gateway = gateway();
        let roles: BTreeSet<Role> = [Role::Specialist, Role::User].into_iter().collect();
        let token = tokens()
            .issue("user-7", &roles, Duration::from_secs(60))
            .expect("token");

        let principal = gateway.authenticate(&bearer_headers(&token)).expect("principal");
        assert_eq!(principal.subject, "user-7");
        assert!(principal.has_role(Role::Specialist));
        assert!(!principal.has_role(Role::Admin));
        assert!(!principal.profile_complete);
    }

    #[test]
    fn missing_header_proceeds_unauthenticated() {
        assert_eq!(gateway().authenticate(&HeaderMap::new()), None);
    }

    #[test]
    fn expired_and_malformed_tokens_proceed_unauthenticated() {
        let gateway = gateway();
        let roles: BTreeSet<Role> = [Role::User].into_iter().collect();
        let expired = tokens()
            .issue("user-7", &roles, Duration::ZERO)
            .expect("token");

        assert_eq!(gateway.authenticate(&bearer_headers(&expired)), None);
        assert_eq!(gateway.authenticate(&bearer_headers("not.a.token")), None);
    }

    #[test]
    fn non_bearer_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&bearer_headers("")), None);
    }

    #[test]
    fn exempt_prefixes_match_path_starts() {
        let gateway = gateway();
        assert!(gateway.is_exempt("/health"));
        assert!(gateway.is_exempt("/v1/auth/otp/verify"));
        assert!(!gateway.is_exempt("/v1/forums"));
    }
}
