use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("custos")
        .about("Identity and session security core")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("CUSTOS_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("store-url")
                .short('s')
                .long("store-url")
                .help("Challenge store connection string, example: redis://localhost:6379")
                .env("CUSTOS_STORE_URL")
                .required(true),
        )
        .arg(
            Arg::new("signing-secret")
                .long("signing-secret")
                .help("Base64-encoded token signing secret, at least 32 bytes decoded")
                .env("CUSTOS_SIGNING_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .help("Public base URL used in verification and reset links")
                .default_value("https://custos.dev")
                .env("CUSTOS_BASE_URL"),
        )
        .arg(
            Arg::new("token-ttl")
                .long("token-ttl")
                .help("Session token lifetime in seconds")
                .default_value("3600")
                .env("CUSTOS_TOKEN_TTL")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("otp-length")
                .long("otp-length")
                .help("Number of digits in one-time codes")
                .default_value("6")
                .env("CUSTOS_OTP_LENGTH")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("otp-ttl")
                .long("otp-ttl")
                .help("One-time code lifetime in seconds")
                .default_value("300")
                .env("CUSTOS_OTP_TTL")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("otp-max-attempts")
                .long("otp-max-attempts")
                .help("Wrong attempts before a phone is blocked")
                .default_value("5")
                .env("CUSTOS_OTP_MAX_ATTEMPTS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("otp-resend-cooldown")
                .long("otp-resend-cooldown")
                .help("Seconds a phone must wait between code sends")
                .default_value("60")
                .env("CUSTOS_OTP_RESEND_COOLDOWN")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("otp-block-duration")
                .long("otp-block-duration")
                .help("Seconds a phone stays blocked after exhausting attempts")
                .default_value("900")
                .env("CUSTOS_OTP_BLOCK_DURATION")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("otp-hourly-cap")
                .long("otp-hourly-cap")
                .help("Codes a single phone may request per hour")
                .default_value("5")
                .env("CUSTOS_OTP_HOURLY_CAP")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("throttle-window")
                .long("throttle-window")
                .help("Sliding window length in seconds for request throttling")
                .default_value("60")
                .env("CUSTOS_THROTTLE_WINDOW")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("throttle-max-requests")
                .long("throttle-max-requests")
                .help("Requests allowed per client per window")
                .default_value("10")
                .env("CUSTOS_THROTTLE_MAX_REQUESTS")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("CUSTOS_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
