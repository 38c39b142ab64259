//! One function per DutchBasar event.
//!
//! Each handler validates its input before the first write, so a rejected
//! event never leaves partial rows behind.

use alloy::primitives::{Address, B256, U256};
use basar_chain::{EventMeta, ZERO_ADDRESS};
use basar_storage::{Auction, Contract, EntityStore, Mint, Token, Transfer, User};
use tracing::{debug, info, warn};

use crate::aggregates;
use crate::error::{HandleOutcome, MapperError, SkipReason};
use crate::lookup::{self, MinterScope};
use crate::mapper::MapperSettings;

/// Price curve parameters carried by `AuctionConfigured`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AuctionParams {
    pub start_price: U256,
    pub end_price: U256,
    pub start_time: U256,
    pub end_time: U256,
    pub price_decay_rate: U256,
}

/// Parameters carried by `Minted`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MintParams {
    pub to: Address,
    pub token_id: U256,
    pub quantity: U256,
    pub price: U256,
    pub phase: u8,
}

// ─── Auction lifecycle ──────────────────────────────────────────────────────

pub(crate) fn auction_configured<S: EntityStore>(
    store: &mut S,
    settings: &MapperSettings,
    meta: &EventMeta,
    params: AuctionParams,
) -> Result<HandleOutcome, MapperError> {
    let mut contract = lookup::contract(store, settings, meta.contract, meta.timestamp)?;

    let auction_id = Auction::id_for(meta.contract, meta.timestamp);
    let mut auction = match store.load::<Auction>(&auction_id)? {
        Some(existing) => existing,
        None => {
            let mut fresh = Auction::new(meta.contract, meta.timestamp);
            fresh.current_phase = contract.current_phase;
            fresh
        }
    };

    auction.start_price = params.start_price;
    auction.end_price = params.end_price;
    auction.start_time = params.start_time;
    auction.end_time = params.end_time;
    auction.price_decay_rate = params.price_decay_rate;
    auction.configured_at = meta.timestamp;
    store.save(&auction)?;

    if contract.active_auction.as_deref() != Some(auction.id.as_str()) {
        debug!(
            contract = %contract.id,
            previous = ?contract.active_auction,
            auction = %auction.id,
            "Switching active auction"
        );
    }
    contract.active_auction = Some(auction.id.clone());
    contract.updated_at = meta.timestamp;
    store.save(&contract)?;

    aggregates::record_price_snapshot(store, &auction, params.start_price, meta)?;

    info!(
        contract = %contract.id,
        auction = %auction.id,
        start_price = %params.start_price,
        end_price = %params.end_price,
        start_time = %params.start_time,
        end_time = %params.end_time,
        "Auction configured"
    );
    Ok(HandleOutcome::Applied)
}

/// Shared by events whose only modeled effect is bumping `updated_at`.
pub(crate) fn touch_contract<S: EntityStore>(
    store: &mut S,
    settings: &MapperSettings,
    meta: &EventMeta,
) -> Result<HandleOutcome, MapperError> {
    let mut contract = lookup::contract(store, settings, meta.contract, meta.timestamp)?;
    contract.updated_at = meta.timestamp;
    store.save(&contract)?;
    Ok(HandleOutcome::Applied)
}

pub(crate) fn phase_changed<S: EntityStore>(
    store: &mut S,
    settings: &MapperSettings,
    meta: &EventMeta,
    new_phase: u8,
) -> Result<HandleOutcome, MapperError> {
    let phase = lookup::phase(settings, new_phase, meta)?;

    let mut contract = lookup::contract(store, settings, meta.contract, meta.timestamp)?;
    contract.current_phase = phase;
    contract.updated_at = meta.timestamp;
    store.save(&contract)?;

    if let Some(mut auction) = lookup::active_auction(store, &contract)? {
        auction.current_phase = phase;
        store.save(&auction)?;
    }

    info!(contract = %contract.id, %phase, "Phase changed");
    Ok(HandleOutcome::Applied)
}

pub(crate) fn revealed<S: EntityStore>(
    store: &mut S,
    settings: &MapperSettings,
    meta: &EventMeta,
    provenance_hash: B256,
) -> Result<HandleOutcome, MapperError> {
    let mut contract = lookup::contract(store, settings, meta.contract, meta.timestamp)?;
    contract.revealed = true;
    contract.provenance_hash = Some(provenance_hash);
    contract.updated_at = meta.timestamp;
    store.save(&contract)?;

    info!(contract = %contract.id, provenance = %provenance_hash, "Collection revealed");
    Ok(HandleOutcome::Applied)
}

// ─── Minting ────────────────────────────────────────────────────────────────

pub(crate) fn minted<S: EntityStore>(
    store: &mut S,
    settings: &MapperSettings,
    meta: &EventMeta,
    params: MintParams,
) -> Result<HandleOutcome, MapperError> {
    // Validate everything up front; nothing below may fail on input.
    let phase = lookup::phase(settings, params.phase, meta)?;
    let out_of_range = || MapperError::QuantityOutOfRange {
        quantity: params.quantity,
        block_number: meta.block_number,
        log_index: meta.log_index,
    };
    let count = u32::try_from(params.quantity).map_err(|_| out_of_range())?;
    // A known max supply caps a single mint; zero means the contract never reported one.
    if let Some(existing) = store.load::<Contract>(&Contract::id_for(meta.contract))? {
        if !existing.max_supply.is_zero() && params.quantity > existing.max_supply {
            return Err(out_of_range());
        }
    }
    let total_cost = params
        .price
        .checked_mul(params.quantity)
        .ok_or_else(|| overflow("mint total cost", meta))?;
    if params.token_id.checked_add(params.quantity).is_none() {
        return Err(overflow("token id range", meta));
    }

    let mut contract = lookup::contract(store, settings, meta.contract, meta.timestamp)?;
    let mut auction = lookup::active_auction(store, &contract)?;
    if auction.is_none() {
        debug!(contract = %contract.id, "Mint without a configured auction");
    }

    let recipient_id = User::id_for(params.to);
    let mint = Mint {
        id: meta.log_id(),
        contract: contract.id.clone(),
        auction: auction.as_ref().map(|a| a.id.clone()),
        minter: recipient_id.clone(),
        recipient: params.to,
        start_token_id: params.token_id,
        quantity: params.quantity,
        price_per_token: params.price,
        total_cost,
        phase,
        transaction_hash: meta.transaction_hash,
        block_number: meta.block_number,
        timestamp: meta.timestamp,
        gas_used: meta.gas_used,
        gas_price: U256::from(meta.gas_price),
    };
    store.save(&mint)?;

    let mut created = 0u64;
    for offset in 0..count {
        let token_id = params.token_id + U256::from(offset);
        let id = Token::id_for(meta.contract, token_id);
        if store.exists::<Token>(&id) {
            warn!(token = %id, mint = %mint.id, "Token already minted, keeping original origin");
            continue;
        }
        store.save(&Token {
            id,
            contract: contract.id.clone(),
            token_id,
            owner: recipient_id.clone(),
            mint: mint.id.clone(),
            created_at: meta.timestamp,
        })?;
        created += 1;
    }

    contract.total_supply = contract.total_supply.saturating_add(params.quantity);
    contract.updated_at = meta.timestamp;
    store.save(&contract)?;

    if let Some(auction) = auction.as_mut() {
        auction.total_minted = auction.total_minted.saturating_add(params.quantity);
        auction.total_revenue = auction.total_revenue.saturating_add(total_cost);
        let scope = MinterScope::Auction(&auction.id);
        if lookup::mark_minter(store, scope, &recipient_id, &mint.id)? {
            auction.unique_minters += U256::from(1);
        }
        store.save(&*auction)?;
    }

    let mut user = lookup::user(store, params.to, meta.timestamp)?;
    user.total_tokens_minted = user.total_tokens_minted.saturating_add(params.quantity);
    user.total_spent = user.total_spent.saturating_add(total_cost);
    user.mint_count += U256::from(1);
    user.total_tokens_owned = user.total_tokens_owned.saturating_add(U256::from(created));
    user.last_seen_at = meta.timestamp;
    store.save(&user)?;

    aggregates::update_daily_stats(store, &mint, meta)?;
    aggregates::update_global_stats(store, &mint)?;

    if let Some(auction) = &auction {
        aggregates::record_price_snapshot(store, auction, params.price, meta)?;
    }

    info!(
        contract = %contract.id,
        to = %params.to,
        start_token = %params.token_id,
        quantity = count,
        price = %params.price,
        %phase,
        "Minted"
    );
    Ok(HandleOutcome::Applied)
}

// ─── ERC-721 ────────────────────────────────────────────────────────────────

pub(crate) fn transfer<S: EntityStore>(
    store: &mut S,
    meta: &EventMeta,
    from: Address,
    to: Address,
    token_id: U256,
) -> Result<HandleOutcome, MapperError> {
    if from == ZERO_ADDRESS {
        return Ok(HandleOutcome::Skipped(SkipReason::MintTransfer));
    }

    let token_key = Token::id_for(meta.contract, token_id);
    let Some(mut token) = store.load::<Token>(&token_key)? else {
        warn!(
            token = %token_key,
            block = meta.block_number,
            log_index = meta.log_index,
            "Transfer of unknown token dropped"
        );
        return Ok(HandleOutcome::Skipped(SkipReason::UnknownToken));
    };

    let from_id = User::id_for(from);
    let to_id = User::id_for(to);

    store.save(&Transfer {
        id: meta.log_id(),
        token: token.id.clone(),
        from: from_id,
        to: to_id.clone(),
        transaction_hash: meta.transaction_hash,
        block_number: meta.block_number,
        timestamp: meta.timestamp,
    })?;

    token.owner = to_id;
    store.save(&token)?;

    // Sender first, then receiver: a self-transfer must see the sender's write.
    let mut sender = lookup::user(store, from, meta.timestamp)?;
    if sender.total_tokens_owned.is_zero() {
        warn!(user = %sender.id, token = %token.id, "Sender owns no tokens on record");
    } else {
        sender.total_tokens_owned -= U256::from(1);
    }
    sender.last_seen_at = meta.timestamp;
    store.save(&sender)?;

    let mut receiver = lookup::user(store, to, meta.timestamp)?;
    receiver.total_tokens_owned = receiver.total_tokens_owned.saturating_add(U256::from(1));
    receiver.last_seen_at = meta.timestamp;
    store.save(&receiver)?;

    debug!(token = %token.id, from = %from, to = %to, "Transfer");
    Ok(HandleOutcome::Applied)
}

fn overflow(what: &'static str, meta: &EventMeta) -> MapperError {
    MapperError::Overflow {
        what,
        block_number: meta.block_number,
        log_index: meta.log_index,
    }
}
