use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use tracing::warn;

use crate::abi::DutchBasar;

/// The RPC provider type used throughout the application.
///
/// Type-erased so callers don't have to spell out the filler stack.
pub type BasarProvider = DynProvider;

/// Create an HTTP provider from an RPC URL string.
pub fn create_provider(rpc_url: &str) -> eyre::Result<BasarProvider> {
    let url = rpc_url.parse()?;
    let provider = ProviderBuilder::new().connect_http(url).erased();
    Ok(provider)
}

/// Descriptive fields of an auction contract that no event carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractMetadata {
    pub name: String,
    pub symbol: String,
    pub owner: Address,
    pub max_supply: U256,
}

/// Read name, symbol, owner and max supply from the contract's view functions.
///
/// Best effort: a reverting or missing getter leaves its field at the default
/// and logs a warning, since the indexer must not stop over cosmetic data.
pub async fn fetch_metadata(provider: &BasarProvider, address: Address) -> ContractMetadata {
    let contract = DutchBasar::new(address, provider.clone());
    let mut metadata = ContractMetadata::default();

    match contract.name().call().await {
        Ok(name) => metadata.name = name,
        Err(e) => warn!(contract = %address, error = %e, "name() call failed"),
    }
    match contract.symbol().call().await {
        Ok(symbol) => metadata.symbol = symbol,
        Err(e) => warn!(contract = %address, error = %e, "symbol() call failed"),
    }
    match contract.owner().call().await {
        Ok(owner) => metadata.owner = owner,
        Err(e) => warn!(contract = %address, error = %e, "owner() call failed"),
    }
    match contract.maxSupply().call().await {
        Ok(max_supply) => metadata.max_supply = max_supply,
        Err(e) => warn!(contract = %address, error = %e, "maxSupply() call failed"),
    }

    metadata
}
