use crate::cli::actions::Action;
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        store_url: matches
            .get_one("store-url")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --store-url"))?,
        signing_secret: matches
            .get_one("signing-secret")
            .map(|s: &String| SecretString::from(s.to_string()))
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --signing-secret"))?,
        base_url: matches.get_one("base-url").map_or_else(
            || "https://custos.dev".to_string(),
            |s: &String| s.to_string(),
        ),
        token_ttl: matches.get_one::<u64>("token-ttl").copied().unwrap_or(3600),
        otp_length: matches
            .get_one::<usize>("otp-length")
            .copied()
            .unwrap_or(6),
        otp_ttl: matches.get_one::<u64>("otp-ttl").copied().unwrap_or(300),
        otp_max_attempts: matches
            .get_one::<i64>("otp-max-attempts")
            .copied()
            .unwrap_or(5),
        otp_resend_cooldown: matches
            .get_one::<u64>("otp-resend-cooldown")
            .copied()
            .unwrap_or(60),
        otp_block_duration: matches
            .get_one::<u64>("otp-block-duration")
            .copied()
            .unwrap_or(900),
        otp_hourly_cap: matches
            .get_one::<i64>("otp-hourly-cap")
            .copied()
            .unwrap_or(5),
        throttle_window: matches
            .get_one::<u64>("throttle-window")
            .copied()
            .unwrap_or(60),
        throttle_max_requests: matches
            .get_one::<u32>("throttle-max-requests")
            .copied()
            .unwrap_or(10),
    })
}
