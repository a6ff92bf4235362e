use std::error::Error;

use clap::Parser;
use palgate_lib::constants::TIMESTAMP_OFFSET;
use palgate_lib::{Secret, TokenType, derive_token, derive_token_at, parse_phone_number};
use tracing::debug;

/// Derive a temporal token for the PalGate gate-control API.
///
/// The token goes verbatim into the `x-bt-token` request header and is
/// accepted by the server for roughly 5 seconds.
#[derive(Parser, Debug)]
#[command(name = "palgate", version, about)]
struct Args {
    /// Session secret as 32 hex characters
    #[arg(short, long)]
    secret: String,

    /// Phone number in international format, digits only
    #[arg(short, long)]
    phone: String,

    /// Token type: 0/sms, 1/primary or 2/secondary
    #[arg(short = 't', long, value_parser = parse_token_type)]
    token_type: TokenType,

    /// Explicit timestamp in seconds since epoch (defaults to now)
    #[arg(long)]
    timestamp: Option<u64>,

    /// Clock offset in seconds added before encoding
    #[arg(long, default_value_t = TIMESTAMP_OFFSET)]
    offset: i64,

    /// Emit JSON instead of the bare token
    #[arg(long)]
    json: bool,
}

fn parse_token_type(input: &str) -> Result<TokenType, String> {
    match input.to_ascii_lowercase().as_str() {
        "0" | "sms" => Ok(TokenType::Sms),
        "1" | "primary" => Ok(TokenType::Primary),
        "2" | "secondary" => Ok(TokenType::Secondary),
        other => Err(format!("unknown token type: {other}")),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let secret = Secret::from_hex(&args.secret)?;
    let phone = parse_phone_number(&args.phone)?;
    debug!(phone, token_type = %args.token_type, "deriving token");

    let token = match args.timestamp {
        Some(timestamp) => derive_token_at(&secret, phone, args.token_type, timestamp, args.offset)?,
        None if args.offset != TIMESTAMP_OFFSET => {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            derive_token_at(&secret, phone, args.token_type, now, args.offset)?
        }
        None => derive_token(&secret, phone, args.token_type)?,
    };

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "token": token,
                "token_type": args.token_type.to_string(),
                "phone": phone,
            })
        );
    } else {
        println!("{token}");
    }

    Ok(())
}
