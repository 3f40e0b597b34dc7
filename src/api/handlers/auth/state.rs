//! Shared state for the authentication handlers.

use crate::{
    api::email::EmailSender,
    otp::OtpChallengeService,
    pending::PendingRegistrationStore,
    store::ChallengeStore,
    token::TokenService,
};
use std::{sync::Arc, time::Duration};

const DEFAULT_BASE_URL: &str = "https://custos.dev";
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(1800);
const DEFAULT_RESET_GRANT_TTL: Duration = Duration::from_secs(600);

/// Tunables for the authentication flows.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    token_ttl: Duration,
    pending_ttl: Duration,
    reset_grant_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_ttl: DEFAULT_TOKEN_TTL,
            pending_ttl: DEFAULT_PENDING_TTL,
            reset_grant_ttl: DEFAULT_RESET_GRANT_TTL,
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Public base URL used when building verification links.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Lifetime of session tokens minted on successful verification.
    #[must_use]
    pub const fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Lifetime of staged registrations awaiting email verification.
    #[must_use]
    pub const fn with_pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    /// Lifetime of the short-lived token minted after a confirmed reset.
    #[must_use]
    pub const fn with_reset_grant_ttl(mut self, ttl: Duration) -> Self {
        self.reset_grant_ttl = ttl;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    #[must_use]
    pub const fn pending_ttl(&self) -> Duration {
        self.pending_ttl
    }

    #[must_use]
    pub const fn reset_grant_ttl(&self) -> Duration {
        self.reset_grant_ttl
    }
}

/// Everything the authentication handlers need, bundled for an
/// `Extension<Arc<AuthState>>`.
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenService,
    otp: OtpChallengeService,
    pending: PendingRegistrationStore,
    store: Arc<dyn ChallengeStore>,
    email: Arc<dyn EmailSender>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        tokens: TokenService,
        otp: OtpChallengeService,
        pending: PendingRegistrationStore,
        store: Arc<dyn ChallengeStore>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            config,
            tokens,
            otp,
            pending,
            store,
            email,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub const fn otp(&self) -> &OtpChallengeService {
        &self.otp
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingRegistrationStore {
        &self.pending
    }

    #[must_use]
    pub fn store(&self) -> &dyn ChallengeStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn email(&self) -> &dyn EmailSender {
        self.email.as_ref()
    }
}
