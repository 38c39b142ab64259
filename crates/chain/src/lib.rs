pub mod abi;
pub mod decoder;
pub mod provider;

pub use abi::DutchBasar;
pub use decoder::{
    DecodedEvent, DutchBasarEvent, EventMeta, TxGas, ZERO_ADDRESS, decode_event, decode_log,
    event_signatures,
};
pub use provider::{BasarProvider, ContractMetadata, create_provider, fetch_metadata};
