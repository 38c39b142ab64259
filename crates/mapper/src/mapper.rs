use alloy::primitives::Address;
use basar_chain::{ContractMetadata, DecodedEvent, DutchBasarEvent};
use basar_core::Settings;
use basar_storage::EntityStore;
use tracing::{debug, info};

use crate::error::{HandleOutcome, MapperError, SkipReason};
use crate::handlers::{self, AuctionParams, MintParams};
use crate::lookup;

/// Knobs that change how events are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperSettings {
    /// Chain id stamped on contracts when they are first seen.
    pub chain_id: u64,
    /// Reject unknown phase numbers instead of recording `NotStarted`.
    pub strict_phases: bool,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            chain_id: 1,
            strict_phases: false,
        }
    }
}

impl From<&Settings> for MapperSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            chain_id: settings.chain_id,
            strict_phases: settings.strict_phases,
        }
    }
}

/// Turns decoded DutchBasar events into entity writes.
///
/// Holds no state between events: everything lives in the store passed to
/// [`Mapper::handle`]. Events must arrive in chain order (block number, then
/// log index) and each exactly once.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    settings: MapperSettings,
}

impl Mapper {
    pub fn new(settings: MapperSettings) -> Self {
        Self { settings }
    }

    /// Apply one event to the store.
    pub fn handle<S: EntityStore>(
        &self,
        store: &mut S,
        decoded: &DecodedEvent,
    ) -> Result<HandleOutcome, MapperError> {
        let meta = &decoded.meta;
        let settings = &self.settings;

        let outcome = match decoded.event {
            DutchBasarEvent::AuctionConfigured {
                start_price,
                end_price,
                start_time,
                end_time,
                price_decay_rate,
            } => handlers::auction_configured(
                store,
                settings,
                meta,
                AuctionParams {
                    start_price,
                    end_price,
                    start_time,
                    end_time,
                    price_decay_rate,
                },
            )?,
            DutchBasarEvent::AllowlistConfigured { .. }
            | DutchBasarEvent::RoyaltyUpdated { .. }
            | DutchBasarEvent::FundsWithdrawn { .. } => {
                handlers::touch_contract(store, settings, meta)?
            }
            DutchBasarEvent::PhaseChanged { new_phase } => {
                handlers::phase_changed(store, settings, meta, new_phase)?
            }
            DutchBasarEvent::Minted {
                to,
                token_id,
                quantity,
                price,
                phase,
            } => handlers::minted(
                store,
                settings,
                meta,
                MintParams {
                    to,
                    token_id,
                    quantity,
                    price,
                    phase,
                },
            )?,
            DutchBasarEvent::Revealed { provenance_hash } => {
                handlers::revealed(store, settings, meta, provenance_hash)?
            }
            DutchBasarEvent::Transfer { from, to, token_id } => {
                handlers::transfer(store, meta, from, to, token_id)?
            }
            DutchBasarEvent::Approval { .. } | DutchBasarEvent::ApprovalForAll { .. } => {
                HandleOutcome::Skipped(SkipReason::NotTracked)
            }
        };

        debug!(
            event = decoded.event.name(),
            block = meta.block_number,
            log_index = meta.log_index,
            ?outcome,
            "Event mapped"
        );
        Ok(outcome)
    }

    /// Record descriptive contract fields read from its view functions.
    ///
    /// Creates the contract row if this is its first sighting. Does not touch
    /// `updated_at`, which tracks events only.
    pub fn apply_metadata<S: EntityStore>(
        &self,
        store: &mut S,
        address: Address,
        metadata: &ContractMetadata,
        timestamp: u64,
    ) -> Result<(), MapperError> {
        let mut contract = lookup::contract(store, &self.settings, address, timestamp)?;
        contract.name = metadata.name.clone();
        contract.symbol = metadata.symbol.clone();
        contract.owner = metadata.owner;
        contract.max_supply = metadata.max_supply;
        store.save(&contract)?;

        info!(
            contract = %contract.id,
            name = %contract.name,
            symbol = %contract.symbol,
            max_supply = %contract.max_supply,
            "Contract metadata recorded"
        );
        Ok(())
    }
}
