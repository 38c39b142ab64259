//! Basar Replay — feeds DutchBasar auction events from a JSON-RPC node through
//! the mapper into an in-memory entity store.
//!
//! Flow:
//! 1. Connect to the RPC node and resolve the chain id
//! 2. Poll blocks in batches, fetching logs of the configured contracts
//! 3. Prefetch everything a batch needs (block timestamps, mint receipts,
//!    contract metadata) so that applying it cannot fail halfway
//! 4. Apply events in chain order, then advance the cursor
//! 5. On Ctrl-C or after `END_BLOCK`, dump the store as JSON if requested
//!
//! Reorgs are not handled: this is a local replay tool, not a production
//! runtime.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use alloy::{
    consensus::BlockHeader,
    eips::BlockNumberOrTag,
    primitives::{Address, B256},
    providers::Provider,
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use basar_chain::{BasarProvider, DutchBasar, TxGas, decoder, provider};
use basar_core::{AppError, Settings, telemetry};
use basar_mapper::{HandleOutcome, Mapper, MapperSettings};
use basar_storage::{
    Auction, Contract, EntityStore, MemoryStore, Mint, Token, Transfer, User,
};
use eyre::{Result, WrapErr};

/// What a call to [`index_next_batch`] achieved.
enum BatchResult {
    Indexed,
    CaughtUp,
    Finished,
}

/// Mutable state carried across batches.
struct Replay {
    mapper: Mapper,
    store: MemoryStore,
    contracts: Vec<Address>,
    /// Contracts whose metadata has already been fetched.
    known: HashSet<Address>,
    next_block: u64,
    applied: u64,
    skipped: u64,
    rejected: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Initialisation ──────────────────────────────────────────────────
    telemetry::init();
    let settings = Settings::from_env()?;

    let contracts = settings
        .contract_addresses
        .iter()
        .map(|raw| {
            raw.parse::<Address>()
                .wrap_err_with(|| format!("invalid contract address {raw:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if contracts.is_empty() {
        eyre::bail!("CONTRACT_ADDRESSES must list at least one auction contract");
    }

    tracing::info!(rpc = %settings.rpc_url, contracts = contracts.len(), "Starting Basar replay");

    let provider = provider::create_provider(&settings.rpc_url)?;

    let mut mapper_settings = MapperSettings::from(&settings);
    match provider.get_chain_id().await {
        Ok(chain_id) => mapper_settings.chain_id = chain_id,
        Err(e) => tracing::warn!(
            error = %e,
            fallback = mapper_settings.chain_id,
            "Could not query chain id, using configured value"
        ),
    }
    tracing::info!(
        chain_id = mapper_settings.chain_id,
        strict_phases = mapper_settings.strict_phases,
        "Mapper configured"
    );

    let mut replay = Replay {
        mapper: Mapper::new(mapper_settings),
        store: MemoryStore::new(),
        contracts,
        known: HashSet::new(),
        next_block: settings.start_block,
        applied: 0,
        skipped: 0,
        rejected: 0,
    };

    // ── Main Loop ───────────────────────────────────────────────────────
    tracing::info!(from_block = replay.next_block, "Starting replay loop");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully…");
                break;
            }
            result = index_next_batch(&provider, &mut replay, &settings) => {
                match result {
                    Ok(BatchResult::Indexed) => {}
                    Ok(BatchResult::CaughtUp) => {
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                    Ok(BatchResult::Finished) => {
                        tracing::info!(end_block = ?settings.end_block, "Reached end block");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Batch failed, retrying in 5s…");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }

    log_summary(&replay);

    if let Some(path) = &settings.snapshot_path {
        let json = serde_json::to_vec_pretty(&replay.store.snapshot())?;
        std::fs::write(path, json).wrap_err_with(|| format!("writing snapshot to {path}"))?;
        tracing::info!(path = %path, "Snapshot written");
    }

    tracing::info!("Replay stopped.");
    Ok(())
}

/// Fetch, decode and map the next batch of blocks.
///
/// All network reads happen before the first event is applied. A failure
/// therefore leaves both the store and the cursor untouched and the whole
/// batch is retried.
async fn index_next_batch(
    provider: &BasarProvider,
    replay: &mut Replay,
    settings: &Settings,
) -> Result<BatchResult> {
    let chain_head = provider.get_block_number().await.map_err(rpc_error)?;
    let head = settings.end_block.map_or(chain_head, |end| end.min(chain_head));

    if replay.next_block > head {
        return Ok(match settings.end_block {
            Some(end) if replay.next_block > end => BatchResult::Finished,
            _ => BatchResult::CaughtUp,
        });
    }

    let from = replay.next_block;
    let to = std::cmp::min(from + settings.batch_size.max(1) - 1, head);

    tracing::info!(from = from, to = to, head = chain_head, "Indexing batch");

    // ── Fetch logs ──────────────────────────────────────────────────
    let filter = Filter::new()
        .address(replay.contracts.clone())
        .event_signature(decoder::event_signatures())
        .from_block(from)
        .to_block(to);

    let mut logs = provider.get_logs(&filter).await.map_err(rpc_error)?;
    logs.sort_by_key(|log| (log.block_number, log.log_index));
    tracing::debug!(count = logs.len(), "Fetched logs");

    // ── Prefetch context ────────────────────────────────────────────
    let timestamps = block_timestamps(provider, &logs).await?;
    let gas = mint_receipts(provider, &logs).await?;

    let mut new_contracts = Vec::new();
    for log in &logs {
        let address = log.address();
        if !replay.known.contains(&address) && !new_contracts.iter().any(|(a, _)| *a == address) {
            let metadata = provider::fetch_metadata(provider, address).await;
            new_contracts.push((address, metadata));
        }
    }

    // ── Apply in chain order ────────────────────────────────────────
    for log in &logs {
        let address = log.address();
        let timestamp = log
            .block_number
            .and_then(|n| timestamps.get(&n).copied())
            .unwrap_or_default();

        if let Some(index) = new_contracts.iter().position(|(a, _)| *a == address) {
            let (address, metadata) = new_contracts.swap_remove(index);
            // Earlier events of this batch are already applied; never bail out here.
            match replay
                .mapper
                .apply_metadata(&mut replay.store, address, &metadata, timestamp)
            {
                Ok(()) => {
                    replay.known.insert(address);
                }
                Err(e) => {
                    let err = AppError::from(e);
                    tracing::warn!(contract = %address, error = %err, "Contract metadata not applied");
                }
            }
        }

        let tx_gas = log
            .transaction_hash
            .and_then(|hash| gas.get(&hash).copied())
            .unwrap_or_default();

        let event = match decoder::decode_log(log, timestamp, tx_gas) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(
                    block = ?log.block_number,
                    log_index = ?log.log_index,
                    error = %e,
                    "Undecodable log skipped"
                );
                replay.rejected += 1;
                continue;
            }
        };

        match replay.mapper.handle(&mut replay.store, &event) {
            Ok(HandleOutcome::Applied) => replay.applied += 1,
            Ok(HandleOutcome::Skipped(reason)) => {
                tracing::debug!(event = event.event.name(), ?reason, "Event skipped");
                replay.skipped += 1;
            }
            Err(e) => {
                let err = AppError::from(e);
                tracing::error!(
                    event = event.event.name(),
                    block = event.meta.block_number,
                    log_index = event.meta.log_index,
                    error = %err,
                    "Event rejected"
                );
                replay.rejected += 1;
            }
        }
    }

    replay.next_block = to + 1;

    tracing::info!(
        block = to,
        events = logs.len(),
        applied = replay.applied,
        "Batch complete"
    );

    Ok(BatchResult::Indexed)
}

/// Timestamps of every block referenced by `logs` that did not carry one.
async fn block_timestamps(provider: &BasarProvider, logs: &[Log]) -> Result<HashMap<u64, u64>> {
    let mut timestamps = HashMap::new();

    for log in logs {
        let Some(number) = log.block_number else {
            continue;
        };
        if let Some(ts) = log.block_timestamp {
            timestamps.insert(number, ts);
            continue;
        }
        if timestamps.contains_key(&number) {
            continue;
        }

        let block = provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await
            .map_err(rpc_error)?
            .ok_or_else(|| AppError::Rpc(format!("block {number} not found on chain")))?;
        timestamps.insert(number, block.header.timestamp());
    }

    Ok(timestamps)
}

/// Gas figures for every transaction that emitted a `Minted` log.
async fn mint_receipts(provider: &BasarProvider, logs: &[Log]) -> Result<HashMap<B256, TxGas>> {
    let mut gas = HashMap::new();

    for log in logs {
        let is_mint = log.inner.data.topics().first() == Some(&DutchBasar::Minted::SIGNATURE_HASH);
        let Some(hash) = log.transaction_hash.filter(|_| is_mint) else {
            continue;
        };
        if gas.contains_key(&hash) {
            continue;
        }

        let receipt = provider
            .get_transaction_receipt(hash)
            .await
            .map_err(rpc_error)?
            .ok_or_else(|| AppError::Rpc(format!("receipt for {hash:#x} not found")))?;
        gas.insert(
            hash,
            TxGas {
                gas_used: receipt.gas_used,
                gas_price: receipt.effective_gas_price,
            },
        );
    }

    Ok(gas)
}

fn rpc_error(err: impl std::fmt::Display) -> AppError {
    AppError::Rpc(err.to_string())
}

fn log_summary(replay: &Replay) {
    tracing::info!(
        next_block = replay.next_block,
        applied = replay.applied,
        skipped = replay.skipped,
        rejected = replay.rejected,
        contracts = replay.store.count::<Contract>(),
        auctions = replay.store.count::<Auction>(),
        mints = replay.store.count::<Mint>(),
        tokens = replay.store.count::<Token>(),
        transfers = replay.store.count::<Transfer>(),
        users = replay.store.count::<User>(),
        "Replay summary"
    );

    for contract in replay.contracts.iter().map(|a| Contract::id_for(*a)) {
        match replay.store.load::<Contract>(&contract) {
            Ok(Some(row)) => tracing::info!(
                contract = %row.id,
                name = %row.name,
                phase = %row.current_phase,
                total_supply = %row.total_supply,
                revealed = row.revealed,
                "Contract state"
            ),
            Ok(None) => tracing::info!(contract = %contract, "No events seen for contract"),
            Err(e) => tracing::warn!(contract = %contract, error = %e, "Could not read contract row"),
        }
    }
}
