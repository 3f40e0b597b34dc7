//! Small helpers for auth input validation and outbound link building.

use regex::Regex;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Normalize a phone number: strip spaces, dashes and parentheses, keep the
/// leading `+`.
pub(super) fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// E.164-style check on already-normalized input.
pub(super) fn valid_phone(phone_normalized: &str) -> bool {
    Regex::new(r"^\+[0-9]{7,15}$").is_ok_and(|regex| regex.is_match(phone_normalized))
}

/// Build the verification link included in outbound registration emails.
pub(super) fn build_verify_url(base_url: &str, token: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/verify-email#token={token}")
}

/// Build the password-reset link included in outbound reset emails.
pub(super) fn build_reset_url(base_url: &str, token: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/password-reset#token={token}")
}
