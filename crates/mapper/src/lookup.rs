//! Get-or-create helpers shared by the handlers.
//!
//! Every helper performs a fresh read-modify-write against the store, so
//! callers must not hold a stale copy of a row a helper may touch (notably
//! [`GlobalStats`], which contract and user creation both bump).

use alloy::primitives::{Address, U256};
use basar_chain::EventMeta;
use basar_storage::{Auction, Contract, EntityStore, GlobalStats, MinterMark, Phase, User};
use tracing::{debug, warn};

use crate::error::MapperError;
use crate::mapper::MapperSettings;

/// Load the contract row, creating it (and counting it globally) on first sight.
///
/// The returned row is not saved; the caller owns the write.
pub(crate) fn contract<S: EntityStore>(
    store: &mut S,
    settings: &MapperSettings,
    address: Address,
    timestamp: u64,
) -> Result<Contract, MapperError> {
    if let Some(contract) = store.load::<Contract>(&Contract::id_for(address))? {
        return Ok(contract);
    }

    let mut global = global_stats(store)?;
    global.total_contracts += U256::from(1);
    store.save(&global)?;

    debug!(contract = %address, chain_id = settings.chain_id, "New contract");
    Ok(Contract::new(address, settings.chain_id, timestamp))
}

/// Load the user row, creating it (and counting it globally) on first sight.
///
/// The returned row is not saved; the caller owns the write.
pub(crate) fn user<S: EntityStore>(
    store: &mut S,
    address: Address,
    timestamp: u64,
) -> Result<User, MapperError> {
    if let Some(user) = store.load::<User>(&User::id_for(address))? {
        return Ok(user);
    }

    let mut global = global_stats(store)?;
    global.total_users += U256::from(1);
    store.save(&global)?;

    debug!(user = %address, "New user");
    Ok(User::new(address, timestamp))
}

/// The singleton aggregate row, or a zeroed one if none exists yet.
pub(crate) fn global_stats<S: EntityStore>(store: &S) -> Result<GlobalStats, MapperError> {
    Ok(store.load::<GlobalStats>(GlobalStats::ID)?.unwrap_or_default())
}

/// The auction the contract's most recent `AuctionConfigured` created.
pub(crate) fn active_auction<S: EntityStore>(
    store: &S,
    contract: &Contract,
) -> Result<Option<Auction>, MapperError> {
    let Some(id) = contract.active_auction.as_deref() else {
        return Ok(None);
    };

    let auction = store.load::<Auction>(id)?;
    if auction.is_none() {
        warn!(contract = %contract.id, auction = id, "Active auction row is missing");
    }
    Ok(auction)
}

/// Where a unique-minter counter lives.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MinterScope<'a> {
    Auction(&'a str),
    Day(&'a str),
}

impl MinterScope<'_> {
    fn key(&self) -> String {
        match self {
            Self::Auction(id) => format!("auction:{id}"),
            Self::Day(id) => format!("day:{id}"),
        }
    }
}

/// Record that `user` minted within `scope`. Returns `true` the first time only.
pub(crate) fn mark_minter<S: EntityStore>(
    store: &mut S,
    scope: MinterScope<'_>,
    user: &str,
    mint: &str,
) -> Result<bool, MapperError> {
    let scope = scope.key();
    let id = MinterMark::id_for(&scope, user);
    if store.exists::<MinterMark>(&id) {
        return Ok(false);
    }

    store.save(&MinterMark {
        id,
        scope,
        user: user.to_string(),
        first_mint: mint.to_string(),
    })?;
    Ok(true)
}

/// Map the on-chain phase number, applying the configured policy for unknown values.
pub(crate) fn phase(
    settings: &MapperSettings,
    raw: u8,
    meta: &EventMeta,
) -> Result<Phase, MapperError> {
    match Phase::from_number(raw) {
        Some(phase) => Ok(phase),
        None if settings.strict_phases => Err(MapperError::InvalidPhase {
            phase: raw,
            block_number: meta.block_number,
            log_index: meta.log_index,
        }),
        None => {
            warn!(
                phase = raw,
                block = meta.block_number,
                log_index = meta.log_index,
                contract = %meta.contract,
                "Unknown phase number, recording NotStarted"
            );
            Ok(Phase::NotStarted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{B256, address};
    use basar_storage::MemoryStore;

    const CONTRACT: Address = address!("00000000000000000000000000000000000000aa");

    fn meta() -> EventMeta {
        EventMeta {
            contract: CONTRACT,
            transaction_hash: B256::ZERO,
            log_index: 3,
            block_number: 9,
            timestamp: 1_000,
            gas_used: 0,
            gas_price: 0,
        }
    }

    #[test]
    fn test_phase_lenient_fallback() {
        let settings = MapperSettings::default();
        assert_eq!(phase(&settings, 2, &meta()).unwrap(), Phase::Public);
        assert_eq!(phase(&settings, 200, &meta()).unwrap(), Phase::NotStarted);
    }

    #[test]
    fn test_phase_strict_rejects() {
        let settings = MapperSettings {
            strict_phases: true,
            ..Default::default()
        };
        assert_eq!(phase(&settings, 3, &meta()).unwrap(), Phase::Ended);
        assert!(matches!(
            phase(&settings, 4, &meta()),
            Err(MapperError::InvalidPhase { phase: 4, block_number: 9, log_index: 3 })
        ));
    }

    #[test]
    fn test_mark_minter_first_time_only() {
        let mut store = MemoryStore::new();
        assert!(mark_minter(&mut store, MinterScope::Auction("a"), "u", "m1").unwrap());
        assert!(!mark_minter(&mut store, MinterScope::Auction("a"), "u", "m2").unwrap());
        // Same raw id under another scope kind is a separate counter.
        assert!(mark_minter(&mut store, MinterScope::Day("a"), "u", "m3").unwrap());
    }

    #[test]
    fn test_new_contract_counted_once() {
        let mut store = MemoryStore::new();
        let settings = MapperSettings::default();

        let created = contract(&mut store, &settings, CONTRACT, 1_000).unwrap();
        store.save(&created).unwrap();
        let again = contract(&mut store, &settings, CONTRACT, 2_000).unwrap();

        assert_eq!(again.created_at, 1_000);
        assert_eq!(global_stats(&store).unwrap().total_contracts, U256::from(1));
    }

    #[test]
    fn test_missing_active_auction_resolves_to_none() {
        let store = MemoryStore::new();
        let mut row = Contract::new(CONTRACT, 1, 0);
        row.active_auction = Some("gone".into());
        assert!(active_auction(&store, &row).unwrap().is_none());
    }
}
