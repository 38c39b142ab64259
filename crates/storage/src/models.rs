use std::fmt;

use alloy::primitives::{Address, B256, U256};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::store::Entity;

/// Seconds in one UTC day bucket.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Starting value of `DailyStats::lowest_price`; any real price lowers it.
pub const LOWEST_PRICE_SENTINEL: &str = "999999999999999999999999999";

// ─── Phase ──────────────────────────────────────────────────────────────────

/// Sale phase of an auction contract, as encoded by the contract's `uint8` enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    NotStarted,
    Allowlist,
    Public,
    Ended,
}

impl Phase {
    /// Map the on-chain phase number; `None` for anything outside `0..=3`.
    pub fn from_number(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NotStarted),
            1 => Some(Self::Allowlist),
            2 => Some(Self::Public),
            3 => Some(Self::Ended),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "NotStarted",
            Self::Allowlist => "Allowlist",
            Self::Public => "Public",
            Self::Ended => "Ended",
        };
        f.write_str(name)
    }
}

// ─── Contract ───────────────────────────────────────────────────────────────

/// A deployed DutchBasar auction contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub chain_id: u64,
    pub owner: Address,
    pub total_supply: U256,
    pub max_supply: U256,
    pub current_phase: Phase,
    pub revealed: bool,
    pub provenance_hash: Option<B256>,
    /// Id of the most recently configured [`Auction`].
    pub active_auction: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Contract {
    pub fn id_for(address: Address) -> String {
        format!("{address:#x}")
    }

    pub fn new(address: Address, chain_id: u64, timestamp: u64) -> Self {
        Self {
            id: Self::id_for(address),
            address,
            name: String::new(),
            symbol: String::new(),
            chain_id,
            owner: Address::ZERO,
            total_supply: U256::ZERO,
            max_supply: U256::ZERO,
            current_phase: Phase::NotStarted,
            revealed: false,
            provenance_hash: None,
            active_auction: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}

// ─── Auction ────────────────────────────────────────────────────────────────

/// One auction configuration period of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id: String,
    pub contract: String,
    pub start_price: U256,
    pub end_price: U256,
    pub start_time: U256,
    pub end_time: U256,
    pub price_decay_rate: U256,
    pub current_phase: Phase,
    pub total_minted: U256,
    pub total_revenue: U256,
    pub unique_minters: U256,
    pub configured_at: u64,
}

impl Auction {
    pub fn id_for(contract: Address, configured_at: u64) -> String {
        format!("{contract:#x}-{configured_at}")
    }

    pub fn new(contract: Address, configured_at: u64) -> Self {
        Self {
            id: Self::id_for(contract, configured_at),
            contract: Contract::id_for(contract),
            start_price: U256::ZERO,
            end_price: U256::ZERO,
            start_time: U256::ZERO,
            end_time: U256::ZERO,
            price_decay_rate: U256::ZERO,
            current_phase: Phase::NotStarted,
            total_minted: U256::ZERO,
            total_revenue: U256::ZERO,
            unique_minters: U256::ZERO,
            configured_at,
        }
    }
}

// ─── Mint ───────────────────────────────────────────────────────────────────

/// An immutable record of one `Minted` log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mint {
    /// `{tx_hash}-{log_index}`.
    pub id: String,
    pub contract: String,
    /// Auction active when the mint happened, if one had been configured.
    pub auction: Option<String>,
    pub minter: String,
    pub recipient: Address,
    pub start_token_id: U256,
    pub quantity: U256,
    pub price_per_token: U256,
    pub total_cost: U256,
    pub phase: Phase,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub timestamp: u64,
    pub gas_used: u64,
    pub gas_price: U256,
}

// ─── Token ──────────────────────────────────────────────────────────────────

/// A minted NFT. Only `owner` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// `{contract}-{token_id}`.
    pub id: String,
    pub contract: String,
    pub token_id: U256,
    pub owner: String,
    /// Id of the originating [`Mint`].
    pub mint: String,
    pub created_at: u64,
}

impl Token {
    pub fn id_for(contract: Address, token_id: U256) -> String {
        format!("{contract:#x}-{token_id}")
    }
}

// ─── User ───────────────────────────────────────────────────────────────────

/// A wallet seen as a mint recipient or transfer party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub address: Address,
    pub total_tokens_owned: U256,
    pub total_tokens_minted: U256,
    pub total_spent: U256,
    pub mint_count: U256,
    pub first_seen_at: u64,
    pub last_seen_at: u64,
}

impl User {
    pub fn id_for(address: Address) -> String {
        format!("{address:#x}")
    }

    pub fn new(address: Address, timestamp: u64) -> Self {
        Self {
            id: Self::id_for(address),
            address,
            total_tokens_owned: U256::ZERO,
            total_tokens_minted: U256::ZERO,
            total_spent: U256::ZERO,
            mint_count: U256::ZERO,
            first_seen_at: timestamp,
            last_seen_at: timestamp,
        }
    }
}

// ─── Transfer ───────────────────────────────────────────────────────────────

/// An immutable record of a token changing hands (mints excluded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    /// `{tx_hash}-{log_index}`.
    pub id: String,
    pub token: String,
    pub from: String,
    pub to: String,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub timestamp: u64,
}

// ─── PriceSnapshot ──────────────────────────────────────────────────────────

/// A price observation on an auction's curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    /// `{auction}-{timestamp}`.
    pub id: String,
    pub auction: String,
    pub price: U256,
    pub timestamp: u64,
    pub block_number: u64,
    pub time_elapsed: U256,
    pub progress_percentage: BigDecimal,
}

impl PriceSnapshot {
    pub fn id_for(auction: &str, timestamp: u64) -> String {
        format!("{auction}-{timestamp}")
    }
}

// ─── DailyStats ─────────────────────────────────────────────────────────────

/// Mint aggregates for one contract over one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// `{contract}-{day_start}`.
    pub id: String,
    pub contract: String,
    /// Start of the day as a unix timestamp, rendered as a string.
    pub date: String,
    pub total_mints: U256,
    pub total_tokens_minted: U256,
    pub total_revenue: U256,
    pub unique_minters: U256,
    pub average_price: BigDecimal,
    pub highest_price: U256,
    pub lowest_price: U256,
}

impl DailyStats {
    /// Floor a timestamp to the start of its UTC day.
    pub fn day_start(timestamp: u64) -> u64 {
        timestamp / SECONDS_PER_DAY * SECONDS_PER_DAY
    }

    pub fn id_for(contract: Address, timestamp: u64) -> String {
        format!("{contract:#x}-{}", Self::day_start(timestamp))
    }

    pub fn new(contract: Address, timestamp: u64) -> Self {
        Self {
            id: Self::id_for(contract, timestamp),
            contract: Contract::id_for(contract),
            date: Self::day_start(timestamp).to_string(),
            total_mints: U256::ZERO,
            total_tokens_minted: U256::ZERO,
            total_revenue: U256::ZERO,
            unique_minters: U256::ZERO,
            average_price: BigDecimal::from(0),
            highest_price: U256::ZERO,
            lowest_price: lowest_price_sentinel(),
        }
    }
}

/// [`LOWEST_PRICE_SENTINEL`] as a number.
pub fn lowest_price_sentinel() -> U256 {
    U256::from_str_radix(LOWEST_PRICE_SENTINEL, 10).unwrap_or(U256::MAX)
}

// ─── GlobalStats ────────────────────────────────────────────────────────────

/// Aggregates across every indexed contract. Single row keyed [`GlobalStats::ID`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub id: String,
    pub total_contracts: U256,
    pub total_tokens_minted: U256,
    pub total_revenue: U256,
    pub total_users: U256,
    pub total_mints: U256,
    pub average_gas_used: BigDecimal,
    pub last_updated: u64,
}

impl GlobalStats {
    pub const ID: &'static str = "global";
}

impl Default for GlobalStats {
    fn default() -> Self {
        Self {
            id: Self::ID.to_string(),
            total_contracts: U256::ZERO,
            total_tokens_minted: U256::ZERO,
            total_revenue: U256::ZERO,
            total_users: U256::ZERO,
            total_mints: U256::ZERO,
            average_gas_used: BigDecimal::from(0),
            last_updated: 0,
        }
    }
}

// ─── MinterMark ─────────────────────────────────────────────────────────────

/// Marks that a user has minted within a scope (an auction or a daily bucket),
/// so unique-minter counters only grow on a user's first mint there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinterMark {
    /// `{scope}/{user}`.
    pub id: String,
    pub scope: String,
    pub user: String,
    pub first_mint: String,
}

impl MinterMark {
    pub fn id_for(scope: &str, user: &str) -> String {
        format!("{scope}/{user}")
    }
}

// ─── Entity impls ───────────────────────────────────────────────────────────

macro_rules! impl_entity {
    ($($ty:ty => $table:literal),* $(,)?) => {
        $(
            impl Entity for $ty {
                const TABLE: &'static str = $table;

                fn id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

impl_entity! {
    Contract => "contract",
    Auction => "auction",
    Mint => "mint",
    Token => "token",
    User => "user",
    Transfer => "transfer",
    PriceSnapshot => "price_snapshot",
    DailyStats => "daily_stats",
    GlobalStats => "global_stats",
    MinterMark => "minter_mark",
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const CONTRACT: Address = address!("00000000000000000000000000000000000000aa");

    #[test]
    fn test_phase_from_number() {
        assert_eq!(Phase::from_number(0), Some(Phase::NotStarted));
        assert_eq!(Phase::from_number(1), Some(Phase::Allowlist));
        assert_eq!(Phase::from_number(2), Some(Phase::Public));
        assert_eq!(Phase::from_number(3), Some(Phase::Ended));
        assert_eq!(Phase::from_number(4), None);
        assert_eq!(Phase::from_number(u8::MAX), None);
    }

    #[test]
    fn test_day_bucket() {
        assert_eq!(DailyStats::day_start(0), 0);
        assert_eq!(DailyStats::day_start(86_399), 0);
        assert_eq!(DailyStats::day_start(86_400), 86_400);
        assert_eq!(DailyStats::day_start(1_700_000_000), 1_699_920_000);
    }

    #[test]
    fn test_daily_stats_initial_bounds() {
        let stats = DailyStats::new(CONTRACT, 1_700_000_000);
        assert_eq!(stats.date, "1699920000");
        assert_eq!(stats.highest_price, U256::ZERO);
        assert_eq!(stats.lowest_price.to_string(), LOWEST_PRICE_SENTINEL);
    }

    #[test]
    fn test_ids_are_lowercase_hex() {
        let addr = address!("00000000000000000000000000000000000000AB");
        assert_eq!(Contract::id_for(addr), format!("0x{}ab", "0".repeat(38)));
        assert_eq!(Token::id_for(addr, U256::from(12)), format!("0x{}ab-12", "0".repeat(38)));
        assert_eq!(Auction::id_for(addr, 99), format!("0x{}ab-99", "0".repeat(38)));
    }

    #[test]
    fn test_serializes_camel_case() {
        let contract = Contract::new(CONTRACT, 1, 10);
        let json = serde_json::to_value(&contract).unwrap();
        assert!(json.get("totalSupply").is_some());
        assert!(json.get("activeAuction").is_some());
        assert_eq!(json["currentPhase"], "NotStarted");
    }
}
