//! Identity and session security core: signed session tokens, phone OTP
//! challenges, staged registrations, per-client throttling and OAuth profile
//! normalization, served over HTTP with a Redis-backed challenge store.

pub mod api;
pub mod cli;
pub mod gateway;
pub mod oauth;
pub mod otp;
pub mod pending;
pub mod store;
pub mod throttle;
pub mod token;
