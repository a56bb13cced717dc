//! Environment-driven configuration, read once at startup.

use anyhow::{bail, Result};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Bypass the payment oracle entirely; engines and clocks stay
    /// authoritative.
    pub test_mode: bool,
    /// Base64 secret for the escrow account (live mode only).
    pub escrow_secret: Option<String>,
    /// Public address players pay their stakes to.
    pub escrow_address: String,
    /// Destination of the house cut (live mode only).
    pub house_account: Option<String>,
    /// External payment-ledger RPC endpoint (live mode only).
    pub ledger_rpc_url: Option<String>,
    /// Ceiling on any single oracle call.
    pub oracle_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let test_mode = matches!(
            std::env::var("TEST_MODE").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes")
        );
        let escrow_secret = std::env::var("ESCROW_SECRET").ok();
        let house_account = std::env::var("HOUSE_ACCOUNT").ok();
        let ledger_rpc_url = std::env::var("LEDGER_RPC_URL").ok();
        let escrow_address = std::env::var("ESCROW_ADDRESS").ok();

        if !test_mode {
            if escrow_secret.is_none() {
                bail!("ESCROW_SECRET is required outside test mode");
            }
            if house_account.is_none() {
                bail!("HOUSE_ACCOUNT is required outside test mode");
            }
            if ledger_rpc_url.is_none() {
                bail!("LEDGER_RPC_URL is required outside test mode");
            }
            if escrow_address.is_none() {
                bail!("ESCROW_ADDRESS is required outside test mode");
            }
        }
        // Players are only ever told to pay the placeholder in test mode.
        let escrow_address = escrow_address.unwrap_or_else(|| "escrow-test".to_string());

        Ok(Self {
            host: std::env::var("STAKEMATE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: read_u16("STAKEMATE_PORT", 9300),
            test_mode,
            escrow_secret,
            escrow_address,
            house_account,
            ledger_rpc_url,
            oracle_timeout: Duration::from_millis(read_u64("ORACLE_TIMEOUT_MS", 5_000)),
        })
    }

    /// A config that talks to nothing; used by tests.
    pub fn test() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            test_mode: true,
            escrow_secret: None,
            escrow_address: "escrow-test".to_string(),
            house_account: Some("house-test".to_string()),
            ledger_rpc_url: None,
            oracle_timeout: Duration::from_millis(100),
        }
    }
}

fn read_u16(key: &str, fallback: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(fallback)
}

fn read_u64(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(fallback)
}
