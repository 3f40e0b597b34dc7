use crate::api;
use crate::cli::actions::Action;
use crate::otp::OtpConfig;
use crate::throttle::ThrottleConfig;
use anyhow::{Context, Result};
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            store_url,
            signing_secret,
            base_url,
            token_ttl,
            otp_length,
            otp_ttl,
            otp_max_attempts,
            otp_resend_cooldown,
            otp_block_duration,
            otp_hourly_cap,
            throttle_window,
            throttle_max_requests,
        } => {
            // Validate early so a typo fails startup, not the first link.
            Url::parse(&base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;

            let auth_config = api::AuthConfig::new()
                .with_base_url(base_url)
                .with_token_ttl(std::time::Duration::from_secs(token_ttl));

            let otp_config = OtpConfig::new()
                .with_code_length(otp_length)
                .with_code_ttl_seconds(otp_ttl)
                .with_max_attempts(otp_max_attempts)
                .with_resend_cooldown_seconds(otp_resend_cooldown)
                .with_block_seconds(otp_block_duration)
                .with_hourly_send_cap(otp_hourly_cap);

            let throttle_config = ThrottleConfig::new()
                .with_window_seconds(throttle_window)
                .with_max_requests(throttle_max_requests);

            // OTP verification carries its own one-time credential.
            let exempt_prefixes = vec!["/v1/auth/otp/".to_string()];

            api::new(
                port,
                store_url,
                signing_secret,
                auth_config,
                otp_config,
                throttle_config,
                exempt_prefixes,
            )
            .await?;
        }
    }

    Ok(())
}
