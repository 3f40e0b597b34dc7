//! Stateless HS256 session tokens.
//!
//! Tokens are compact JWTs signed with a shared symmetric key. No state is
//! kept between calls; a token is a pure function of its claims and the
//! process-wide signing key. Verification distinguishes "expired" from every
//! structural/signature failure because callers react differently: expired
//! prompts a silent re-login, anything else is a security event.

use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Minimum decoded signing-key length (256 bits for HMAC-SHA256).
pub const MIN_KEY_BYTES: usize = 32;

/// Closed set of roles a principal can carry.
///
/// Roles travel in token claims as plain strings and are re-validated against
/// this enum on every verify; an unknown role string fails verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Admin,
    Specialist,
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Specialist => "specialist",
            Self::User => "user",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "specialist" => Some(Self::Specialist),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Header {
    alg: String,
    typ: String,
}

impl Header {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Claim set carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    /// Email or phone the subject authenticated with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub roles: Vec<String>,
    /// Whether the subject has completed their profile.
    #[serde(default)]
    pub complete: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Build a claim set expiring `ttl` from now.
    #[must_use]
    pub fn new(
        subject: &str,
        contact: Option<&str>,
        roles: &BTreeSet<Role>,
        complete: bool,
        ttl: Duration,
    ) -> Self {
        let now = now_unix_seconds();
        Self {
            sub: subject.to_string(),
            contact: contact.map(str::to_string),
            roles: roles.iter().map(|role| role.as_str().to_string()).collect(),
            complete,
            iat: now,
            exp: now.saturating_add(ttl.as_secs().try_into().unwrap_or(i64::MAX)),
        }
    }

    /// Re-validate the claim role strings against the closed [`Role`] enum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRole`] for any string outside the enum.
    pub fn role_set(&self) -> Result<BTreeSet<Role>, Error> {
        self.roles
            .iter()
            .map(|role| Role::parse(role).ok_or_else(|| Error::UnknownRole(role.clone())))
            .collect()
    }
}

/// Signing-key configuration failures, detected at startup rather than at
/// first use.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("signing secret is not valid base64")]
    Encoding,
    #[error("signing secret must decode to at least {MIN_KEY_BYTES} bytes")]
    TooShort,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    Format,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("token expired")]
    Expired,
}

impl Error {
    /// Expired is the only non-malformed failure; everything else means the
    /// token was never validly issued or has been tampered with.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

/// Issues and verifies session tokens with a startup-validated signing key.
#[derive(Clone)]
pub struct TokenService {
    key: Vec<u8>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("key", &"***").finish()
    }
}

impl TokenService {
    /// Build the service from a base64-encoded shared secret.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if the secret is not base64 or decodes to fewer
    /// than [`MIN_KEY_BYTES`] bytes. This is meant to abort startup.
    pub fn new(secret: &SecretString) -> Result<Self, KeyError> {
        let key =
            Base64::decode_vec(secret.expose_secret().trim()).map_err(|_| KeyError::Encoding)?;
        if key.len() < MIN_KEY_BYTES {
            return Err(KeyError::TooShort);
        }
        Ok(Self { key })
    }

    /// Issue a token for a subject with the given roles, expiring after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded.
    pub fn issue(
        &self,
        subject: &str,
        roles: &BTreeSet<Role>,
        ttl: Duration,
    ) -> Result<String, Error> {
        self.issue_at(subject, roles, ttl, now_unix_seconds())
    }

    pub(crate) fn issue_at(
        &self,
        subject: &str,
        roles: &BTreeSet<Role>,
        ttl: Duration,
        now: i64,
    ) -> Result<String, Error> {
        let claims = Claims {
            sub: subject.to_string(),
            contact: None,
            roles: roles.iter().map(|role| role.as_str().to_string()).collect(),
            complete: false,
            iat: now,
            exp: now.saturating_add(ttl.as_secs().try_into().unwrap_or(i64::MAX)),
        };
        self.sign(&claims)
    }

    /// Issue a token from a fully caller-built claim set. The `iat`/`exp`
    /// fields are taken as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded.
    pub fn issue_claims(&self, claims: &Claims) -> Result<String, Error> {
        self.sign(claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, Error> {
        let header_b64 = b64e_json(&Header::hs256())?;
        let claims_b64 = b64e_json(claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| Error::InvalidSignature)?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a token and return its decoded claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Expired`] when the signature is valid but the token
    /// is past its expiry; any other error means the token is malformed.
    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        self.verify_at(token, now_unix_seconds())
    }

    pub(crate) fn verify_at(&self, token: &str, now: i64) -> Result<Claims, Error> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(Error::Format)?;
        let claims_b64 = parts.next().ok_or(Error::Format)?;
        let sig_b64 = parts.next().ok_or(Error::Format)?;
        if parts.next().is_some() {
            return Err(Error::Format);
        }

        let header: Header = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(Error::UnsupportedAlg(header.alg));
        }

        // Signature before claims: a tampered token must never surface claim
        // contents, not even an expiry verdict.
        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| Error::InvalidSignature)?;
        mac.update(format!("{header_b64}.{claims_b64}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| Error::InvalidSignature)?;

        let claims: Claims = b64d_json(claims_b64)?;
        claims.role_set()?;
        if claims.exp <= now {
            return Err(Error::Expired);
        }

        Ok(claims)
    }

    /// Non-throwing advisory check; malformed tokens also report `true`.
    #[must_use]
    pub fn is_expired(&self, token: &str) -> bool {
        self.verify(token).is_err()
    }
}
