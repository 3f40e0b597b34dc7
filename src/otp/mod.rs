pub mod service;
pub mod sms;

pub use service::{OtpChallengeService, OtpConfig, OtpError};
pub use sms::{LogSmsSender, SmsSender};
