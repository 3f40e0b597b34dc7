//! Phone OTP challenge state machine.
//!
//! Per phone number: `NONE -> (send) -> ACTIVE -> (verify ok) -> NONE`,
//! `ACTIVE -> (verify fail, attempts == max) -> BLOCKED`, blocks and windows
//! self-expire through store TTLs so lockouts survive process restarts.
//! Only a hash of the code is ever stored, and "wrong code" is the same
//! error as "just became blocked" so callers cannot probe lockout state.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{Rng, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{error, warn};

use crate::store::{ChallengeStore, StoreError};

use super::sms::SmsSender;

const DEFAULT_CODE_LENGTH: usize = 6;
const DEFAULT_CODE_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_MAX_ATTEMPTS: i64 = 5;
const DEFAULT_RESEND_COOLDOWN: Duration = Duration::from_secs(60);
const DEFAULT_BLOCK_DURATION: Duration = Duration::from_secs(15 * 60);
const DEFAULT_HOURLY_SEND_CAP: i64 = 5;

/// The hourly counter window starts at the first send and is fixed.
const HOURLY_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("phone is temporarily blocked")]
    PhoneBlocked,
    #[error("resend cooldown is active")]
    CooldownActive,
    #[error("hourly send limit reached")]
    HourlyLimitExceeded,
    /// Expired and never-sent challenges are indistinguishable on purpose.
    #[error("no active challenge for this phone")]
    NotFound,
    /// Also returned when this failure exhausted the attempt budget.
    #[error("incorrect code")]
    Incorrect,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Copy, Debug)]
pub struct OtpConfig {
    code_length: usize,
    code_ttl: Duration,
    max_attempts: i64,
    resend_cooldown: Duration,
    block_duration: Duration,
    hourly_send_cap: i64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OtpConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            code_ttl: DEFAULT_CODE_TTL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            resend_cooldown: DEFAULT_RESEND_COOLDOWN,
            block_duration: DEFAULT_BLOCK_DURATION,
            hourly_send_cap: DEFAULT_HOURLY_SEND_CAP,
        }
    }

    #[must_use]
    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    #[must_use]
    pub fn with_code_ttl_seconds(mut self, seconds: u64) -> Self {
        self.code_ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: i64) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_resend_cooldown_seconds(mut self, seconds: u64) -> Self {
        self.resend_cooldown = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_block_seconds(mut self, seconds: u64) -> Self {
        self.block_duration = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_hourly_send_cap(mut self, cap: i64) -> Self {
        self.hourly_send_cap = cap;
        self
    }

    #[must_use]
    pub fn code_length(&self) -> usize {
        self.code_length
    }
}

pub struct OtpChallengeService {
    store: Arc<dyn ChallengeStore>,
    sender: Arc<dyn SmsSender>,
    config: OtpConfig,
}

impl OtpChallengeService {
    #[must_use]
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        sender: Arc<dyn SmsSender>,
        config: OtpConfig,
    ) -> Self {
        Self {
            store,
            sender,
            config,
        }
    }

    /// Generate and deliver a fresh challenge for `phone`.
    ///
    /// The cooldown slot is claimed with an atomic set-if-absent and the
    /// hourly counter is incremented before comparison, so concurrent sends
    /// for one phone cannot both pass the gates.
    ///
    /// # Errors
    ///
    /// Rejects with [`OtpError::PhoneBlocked`], [`OtpError::CooldownActive`],
    /// or [`OtpError::HourlyLimitExceeded`] before any challenge is staged.
    pub async fn send_otp(&self, phone: &str) -> Result<(), OtpError> {
        if self.store.exists(&block_key(phone)).await? {
            return Err(OtpError::PhoneBlocked);
        }
        let claimed = self
            .store
            .set_if_absent(&cooldown_key(phone), "1", self.config.resend_cooldown)
            .await?;
        if !claimed {
            return Err(OtpError::CooldownActive);
        }
        let sent_this_hour = self
            .store
            .increment(&hourly_key(phone), HOURLY_WINDOW)
            .await?;
        if sent_this_hour > self.config.hourly_send_cap {
            return Err(OtpError::HourlyLimitExceeded);
        }

        let code = generate_code(self.config.code_length);
        self.store
            .set(&code_key(phone), &hash_code(&code), self.config.code_ttl)
            .await?;
        self.store
            .set(&attempts_key(phone), "0", self.config.code_ttl)
            .await?;

        // The plaintext code exists only here and in the outbound message.
        let message = format!("Your verification code is {code}");
        if let Err(err) = self.sender.send(phone, &message).await {
            error!("Failed to hand off OTP message: {err}");
        }

        Ok(())
    }

    /// Check a candidate code against the active challenge.
    ///
    /// Not idempotent: every mismatch consumes an attempt, and the attempt
    /// that reaches the maximum establishes a phone block.
    ///
    /// # Errors
    ///
    /// [`OtpError::NotFound`] without an active challenge,
    /// [`OtpError::Incorrect`] on mismatch (blocked or not).
    pub async fn verify_otp(&self, phone: &str, candidate: &str) -> Result<(), OtpError> {
        let Some(stored_hash) = self.store.get(&code_key(phone)).await? else {
            return Err(OtpError::NotFound);
        };

        let candidate_hash = hash_code(candidate);
        if bool::from(candidate_hash.as_bytes().ct_eq(stored_hash.as_bytes())) {
            self.store.delete(&code_key(phone)).await?;
            self.store.delete(&attempts_key(phone)).await?;
            self.store.delete(&cooldown_key(phone)).await?;
            return Ok(());
        }

        let attempts = self
            .store
            .increment(&attempts_key(phone), self.config.code_ttl)
            .await?;
        if attempts >= self.config.max_attempts {
            warn!(attempts, "OTP attempts exhausted, blocking phone");
            self.store
                .set(&block_key(phone), "1", self.config.block_duration)
                .await?;
            self.store.delete(&code_key(phone)).await?;
            self.store.delete(&attempts_key(phone)).await?;
        }

        Err(OtpError::Incorrect)
    }
}

fn code_key(phone: &str) -> String {
    format!("otp:code:{phone}")
}

fn attempts_key(phone: &str) -> String {
    format!("otp:attempts:{phone}")
}

fn cooldown_key(phone: &str) -> String {
    format!("otp:cooldown:{phone}")
}

fn block_key(phone: &str) -> String {
    format!("otp:block:{phone}")
}

fn hourly_key(phone: &str) -> String {
    format!("otp:hourly:{phone}")
}

/// Fixed-length numeric code from the OS CSPRNG.
fn generate_code(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// One-way digest of a code; the raw code is never persisted.
fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    Base64UrlUnpadded::encode_string(&hasher.finalize())
}
