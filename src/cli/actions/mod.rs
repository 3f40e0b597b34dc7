pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        store_url: String,
        signing_secret: SecretString,
        base_url: String,
        token_ttl: u64,
        otp_length: usize,
        otp_ttl: u64,
        otp_max_attempts: i64,
        otp_resend_cooldown: u64,
        otp_block_duration: u64,
        otp_hourly_cap: i64,
        throttle_window: u64,
        throttle_max_requests: u32,
    },
}
