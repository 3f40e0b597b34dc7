//! Authentication endpoints: phone OTP, staged registration, password reset
//! and OAuth profile normalization.

pub mod oauth;
pub mod otp;
pub mod register;
pub mod state;
pub mod types;
mod utils;

pub use state::{AuthConfig, AuthState};

#[cfg(test)]
pub(crate) mod test_support {
    use super::state::{AuthConfig, AuthState};
    use crate::api::email::LogEmailSender;
    use crate::otp::{LogSmsSender, OtpChallengeService, OtpConfig};
    use crate::pending::PendingRegistrationStore;
    use crate::store::{ChallengeStore, MemoryStore};
    use crate::token::TokenService;
    use secrecy::SecretString;
    use std::sync::Arc;

    /// In-memory [`AuthState`] for handler tests.
    pub(crate) fn auth_state() -> Arc<AuthState> {
        let store: Arc<dyn ChallengeStore> = Arc::new(MemoryStore::new());
        let secret = SecretString::from(
            "YW4taW50ZWdyYXRpb24tdGVzdC1zaWduaW5nLWtleS0wMTIzNDU2Nzg5YWI=".to_string(),
        );
        let tokens = TokenService::new(&secret).unwrap();
        let otp = OtpChallengeService::new(
            Arc::clone(&store),
            Arc::new(LogSmsSender),
            OtpConfig::new(),
        );
        let pending = PendingRegistrationStore::new(Arc::clone(&store));
        Arc::new(AuthState::new(
            AuthConfig::new(),
            tokens,
            otp,
            pending,
            store,
            Arc::new(LogEmailSender),
        ))
    }
}
