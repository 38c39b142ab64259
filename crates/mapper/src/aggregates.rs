use alloy::primitives::U256;
use basar_chain::EventMeta;
use basar_storage::{Auction, DailyStats, EntityStore, Mint, PriceSnapshot};
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};

use crate::error::MapperError;
use crate::lookup::{self, MinterScope};

/// Exact decimal value of a `U256`.
pub fn to_decimal(value: U256) -> BigDecimal {
    let digits = BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>());
    BigDecimal::new(digits, 0)
}

/// Percentage of the auction window covered by `elapsed`, clamped to `[0, 100]`.
///
/// A zero-length window reports 0.
pub fn progress_percentage(elapsed: U256, duration: U256) -> BigDecimal {
    if duration.is_zero() {
        return BigDecimal::from(0);
    }

    let hundred = BigDecimal::from(100);
    let progress = to_decimal(elapsed) * &hundred / to_decimal(duration);
    if progress > hundred { hundred } else { progress }
}

/// Append a price observation to the auction's time series.
///
/// Observations before `start_time` count as zero elapsed.
pub(crate) fn record_price_snapshot<S: EntityStore>(
    store: &mut S,
    auction: &Auction,
    price: U256,
    meta: &EventMeta,
) -> Result<PriceSnapshot, MapperError> {
    let time_elapsed = U256::from(meta.timestamp).saturating_sub(auction.start_time);
    let duration = auction.end_time.saturating_sub(auction.start_time);

    let snapshot = PriceSnapshot {
        id: PriceSnapshot::id_for(&auction.id, meta.timestamp),
        auction: auction.id.clone(),
        price,
        timestamp: meta.timestamp,
        block_number: meta.block_number,
        time_elapsed,
        progress_percentage: progress_percentage(time_elapsed, duration),
    };
    store.save(&snapshot)?;
    Ok(snapshot)
}

/// Fold a mint into its contract's bucket for the UTC day of the event.
pub(crate) fn update_daily_stats<S: EntityStore>(
    store: &mut S,
    mint: &Mint,
    meta: &EventMeta,
) -> Result<DailyStats, MapperError> {
    let id = DailyStats::id_for(meta.contract, meta.timestamp);
    let mut stats = store
        .load::<DailyStats>(&id)?
        .unwrap_or_else(|| DailyStats::new(meta.contract, meta.timestamp));

    stats.total_mints += U256::from(1);
    stats.total_tokens_minted = stats.total_tokens_minted.saturating_add(mint.quantity);
    stats.total_revenue = stats.total_revenue.saturating_add(mint.total_cost);

    if mint.price_per_token > stats.highest_price {
        stats.highest_price = mint.price_per_token;
    }
    if mint.price_per_token < stats.lowest_price {
        stats.lowest_price = mint.price_per_token;
    }

    if lookup::mark_minter(store, MinterScope::Day(&stats.id), &mint.minter, &mint.id)? {
        stats.unique_minters += U256::from(1);
    }

    if !stats.total_tokens_minted.is_zero() {
        stats.average_price =
            to_decimal(stats.total_revenue) / to_decimal(stats.total_tokens_minted);
    }

    store.save(&stats)?;
    Ok(stats)
}

/// Fold a mint into the global totals and the running mean of gas used.
pub(crate) fn update_global_stats<S: EntityStore>(
    store: &mut S,
    mint: &Mint,
) -> Result<(), MapperError> {
    let mut stats = lookup::global_stats(store)?;

    stats.total_tokens_minted = stats.total_tokens_minted.saturating_add(mint.quantity);
    stats.total_revenue = stats.total_revenue.saturating_add(mint.total_cost);
    stats.total_mints += U256::from(1);

    // avg_n = (avg_{n-1} * (n - 1) + gas) / n
    let n = to_decimal(stats.total_mints);
    let previous_total = &stats.average_gas_used * (&n - BigDecimal::from(1));
    stats.average_gas_used = (previous_total + BigDecimal::from(mint.gas_used)) / n;

    stats.last_updated = mint.timestamp;
    store.save(&stats)?;
    Ok(())
}
