use std::str::FromStr;

use serde::Deserialize;

use crate::error::AppError;

/// Global application settings loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// JSON-RPC endpoint of the chain the auction contracts live on.
    pub rpc_url: String,

    /// Auction contract addresses to index (hex, `0x`-prefixed).
    pub contract_addresses: Vec<String>,

    /// Block number to start indexing from (0 for genesis).
    pub start_block: u64,

    /// Last block to index. `None` follows the chain head until interrupted.
    pub end_block: Option<u64>,

    /// Number of blocks to fetch per batch.
    pub batch_size: u64,

    /// Chain id recorded on newly seen contracts when the RPC cannot report one.
    pub chain_id: u64,

    /// Reject events carrying an unknown phase number instead of falling back
    /// to `NotStarted`.
    pub strict_phases: bool,

    /// Where to write the JSON entity snapshot on shutdown, if anywhere.
    pub snapshot_path: Option<String>,
}

impl Settings {
    /// Load settings from environment variables (with optional `.env` file).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            rpc_url: std::env::var("RPC_URL").unwrap_or_else(|_| "http://localhost:8545".into()),
            contract_addresses: parse_list(&std::env::var("CONTRACT_ADDRESSES").unwrap_or_default()),
            start_block: parse_var("START_BLOCK", 0)?,
            end_block: optional_var("END_BLOCK")?,
            batch_size: parse_var("BATCH_SIZE", 500)?,
            chain_id: parse_var("CHAIN_ID", 1)?,
            strict_phases: parse_var("STRICT_PHASES", false)?,
            snapshot_path: std::env::var("SNAPSHOT_PATH").ok().filter(|p| !p.is_empty()),
        })
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    Ok(optional_var(key)?.unwrap_or(default))
}

fn optional_var<T: FromStr>(key: &str) -> Result<Option<T>, AppError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw:?}"))),
        _ => Ok(None),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_drops_empty() {
        let list = parse_list(" 0xAbC ,, 0xdef,");
        assert_eq!(list, vec!["0xabc".to_string(), "0xdef".to_string()]);
    }

    #[test]
    fn test_parse_list_empty() {
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_optional_var_rejects_garbage() {
        // SAFETY: the key is unique to this test.
        unsafe { std::env::set_var("BASAR_TEST_BAD_NUMBER", "twelve") };
        let result: Result<Option<u64>, _> = optional_var("BASAR_TEST_BAD_NUMBER");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_parse_var_uses_default_when_missing() {
        let value: u64 = parse_var("BASAR_TEST_SURELY_UNSET", 42).unwrap();
        assert_eq!(value, 42);
    }
}
