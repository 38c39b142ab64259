use alloy::primitives::{Address, B256, Log as PrimitiveLog, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use basar_core::AppError;

use crate::abi::DutchBasar;

/// Zero address constant for mint detection.
pub const ZERO_ADDRESS: Address = Address::ZERO;

/// Gas figures of the transaction that emitted a log, taken from its receipt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxGas {
    pub gas_used: u64,
    pub gas_price: u128,
}

/// Transaction and block context delivered alongside every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMeta {
    /// Address of the emitting auction contract.
    pub contract: Address,
    pub transaction_hash: B256,
    pub log_index: u64,
    pub block_number: u64,
    /// Block timestamp in seconds.
    pub timestamp: u64,
    pub gas_used: u64,
    pub gas_price: u128,
}

impl EventMeta {
    /// Entity id shared by every row derived from this exact log.
    pub fn log_id(&self) -> String {
        format!("{:#x}-{}", self.transaction_hash, self.log_index)
    }
}

/// Classified DutchBasar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DutchBasarEvent {
    AuctionConfigured {
        start_price: U256,
        end_price: U256,
        start_time: U256,
        end_time: U256,
        price_decay_rate: U256,
    },
    AllowlistConfigured {
        merkle_root: B256,
        max_per_wallet: U256,
    },
    PhaseChanged {
        new_phase: u8,
    },
    Minted {
        to: Address,
        token_id: U256,
        quantity: U256,
        price: U256,
        phase: u8,
    },
    Revealed {
        provenance_hash: B256,
    },
    RoyaltyUpdated {
        receiver: Address,
        fee_numerator: u128,
    },
    FundsWithdrawn {
        to: Address,
        amount: U256,
    },
    Transfer {
        from: Address,
        to: Address,
        token_id: U256,
    },
    Approval {
        owner: Address,
        approved: Address,
        token_id: U256,
    },
    ApprovalForAll {
        owner: Address,
        operator: Address,
        approved: bool,
    },
}

impl DutchBasarEvent {
    /// ABI name of the event, used as a log field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuctionConfigured { .. } => "AuctionConfigured",
            Self::AllowlistConfigured { .. } => "AllowlistConfigured",
            Self::PhaseChanged { .. } => "PhaseChanged",
            Self::Minted { .. } => "Minted",
            Self::Revealed { .. } => "Revealed",
            Self::RoyaltyUpdated { .. } => "RoyaltyUpdated",
            Self::FundsWithdrawn { .. } => "FundsWithdrawn",
            Self::Transfer { .. } => "Transfer",
            Self::Approval { .. } => "Approval",
            Self::ApprovalForAll { .. } => "ApprovalForAll",
        }
    }
}

/// An event together with the context it was emitted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub meta: EventMeta,
    pub event: DutchBasarEvent,
}

/// Every topic0 this decoder understands, for building log filters.
pub fn event_signatures() -> Vec<B256> {
    vec![
        DutchBasar::AuctionConfigured::SIGNATURE_HASH,
        DutchBasar::AllowlistConfigured::SIGNATURE_HASH,
        DutchBasar::PhaseChanged::SIGNATURE_HASH,
        DutchBasar::Minted::SIGNATURE_HASH,
        DutchBasar::Revealed::SIGNATURE_HASH,
        DutchBasar::RoyaltyUpdated::SIGNATURE_HASH,
        DutchBasar::FundsWithdrawn::SIGNATURE_HASH,
        DutchBasar::Transfer::SIGNATURE_HASH,
        DutchBasar::Approval::SIGNATURE_HASH,
        DutchBasar::ApprovalForAll::SIGNATURE_HASH,
    ]
}

/// Decode an RPC log into a [`DecodedEvent`].
///
/// Returns `Ok(None)` for logs whose topic0 is not a DutchBasar event, and an
/// error for logs that are but lack block context or fail ABI decoding.
pub fn decode_log(log: &Log, timestamp: u64, gas: TxGas) -> Result<Option<DecodedEvent>, AppError> {
    let Some(event) = decode_event(&log.inner)? else {
        return Ok(None);
    };

    let block_number = log
        .block_number
        .ok_or_else(|| AppError::Decode(format!("{} log without block number", event.name())))?;
    let transaction_hash = log
        .transaction_hash
        .ok_or_else(|| AppError::Decode(format!("{} log without transaction hash", event.name())))?;
    let log_index = log
        .log_index
        .ok_or_else(|| AppError::Decode(format!("{} log without log index", event.name())))?;

    Ok(Some(DecodedEvent {
        meta: EventMeta {
            contract: log.address(),
            transaction_hash,
            log_index,
            block_number,
            timestamp: log.block_timestamp.unwrap_or(timestamp),
            gas_used: gas.gas_used,
            gas_price: gas.gas_price,
        },
        event,
    }))
}

/// Classify a raw log by topic0 and decode its parameters.
pub fn decode_event(log: &PrimitiveLog) -> Result<Option<DutchBasarEvent>, AppError> {
    let Some(topic0) = log.data.topics().first().copied() else {
        return Ok(None);
    };

    let event = if topic0 == DutchBasar::AuctionConfigured::SIGNATURE_HASH {
        let d = decode::<DutchBasar::AuctionConfigured>(log)?;
        DutchBasarEvent::AuctionConfigured {
            start_price: d.startPrice,
            end_price: d.endPrice,
            start_time: d.startTime,
            end_time: d.endTime,
            price_decay_rate: d.priceDecayRate,
        }
    } else if topic0 == DutchBasar::AllowlistConfigured::SIGNATURE_HASH {
        let d = decode::<DutchBasar::AllowlistConfigured>(log)?;
        DutchBasarEvent::AllowlistConfigured {
            merkle_root: d.merkleRoot,
            max_per_wallet: d.maxPerWallet,
        }
    } else if topic0 == DutchBasar::PhaseChanged::SIGNATURE_HASH {
        let d = decode::<DutchBasar::PhaseChanged>(log)?;
        DutchBasarEvent::PhaseChanged { new_phase: d.newPhase }
    } else if topic0 == DutchBasar::Minted::SIGNATURE_HASH {
        let d = decode::<DutchBasar::Minted>(log)?;
        DutchBasarEvent::Minted {
            to: d.to,
            token_id: d.tokenId,
            quantity: d.quantity,
            price: d.price,
            phase: d.phase,
        }
    } else if topic0 == DutchBasar::Revealed::SIGNATURE_HASH {
        let d = decode::<DutchBasar::Revealed>(log)?;
        DutchBasarEvent::Revealed {
            provenance_hash: d.provenanceHash,
        }
    } else if topic0 == DutchBasar::RoyaltyUpdated::SIGNATURE_HASH {
        let d = decode::<DutchBasar::RoyaltyUpdated>(log)?;
        DutchBasarEvent::RoyaltyUpdated {
            receiver: d.receiver,
            fee_numerator: d.feeNumerator.to::<u128>(),
        }
    } else if topic0 == DutchBasar::FundsWithdrawn::SIGNATURE_HASH {
        let d = decode::<DutchBasar::FundsWithdrawn>(log)?;
        DutchBasarEvent::FundsWithdrawn {
            to: d.to,
            amount: d.amount,
        }
    } else if topic0 == DutchBasar::Transfer::SIGNATURE_HASH {
        // ERC-20 transfers share this topic0 but carry three topics; only the
        // ERC-721 shape (tokenId indexed) belongs to us.
        if log.data.topics().len() != 4 {
            return Ok(None);
        }
        let d = decode::<DutchBasar::Transfer>(log)?;
        DutchBasarEvent::Transfer {
            from: d.from,
            to: d.to,
            token_id: d.tokenId,
        }
    } else if topic0 == DutchBasar::Approval::SIGNATURE_HASH {
        if log.data.topics().len() != 4 {
            return Ok(None);
        }
        let d = decode::<DutchBasar::Approval>(log)?;
        DutchBasarEvent::Approval {
            owner: d.owner,
            approved: d.approved,
            token_id: d.tokenId,
        }
    } else if topic0 == DutchBasar::ApprovalForAll::SIGNATURE_HASH {
        let d = decode::<DutchBasar::ApprovalForAll>(log)?;
        DutchBasarEvent::ApprovalForAll {
            owner: d.owner,
            operator: d.operator,
            approved: d.approved,
        }
    } else {
        return Ok(None);
    };

    Ok(Some(event))
}

fn decode<E: SolEvent>(log: &PrimitiveLog) -> Result<E, AppError> {
    E::decode_log(log)
        .map(|decoded| decoded.data)
        .map_err(|e| AppError::Decode(format!("{}: {e}", E::SIGNATURE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    const CONTRACT: Address = address!("00000000000000000000000000000000000000aa");
    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0000000000000000000000000000000000000b0b");

    fn raw<E: SolEvent>(event: &E) -> PrimitiveLog {
        PrimitiveLog {
            address: CONTRACT,
            data: event.encode_log_data(),
        }
    }

    #[test]
    fn test_decode_minted() {
        let log = raw(&DutchBasar::Minted {
            to: ALICE,
            tokenId: U256::from(7),
            quantity: U256::from(3),
            price: U256::from(55),
            phase: 2,
        });

        let event = decode_event(&log).unwrap().unwrap();
        assert_eq!(
            event,
            DutchBasarEvent::Minted {
                to: ALICE,
                token_id: U256::from(7),
                quantity: U256::from(3),
                price: U256::from(55),
                phase: 2,
            }
        );
        assert_eq!(event.name(), "Minted");
    }

    #[test]
    fn test_decode_auction_configured() {
        let log = raw(&DutchBasar::AuctionConfigured {
            startPrice: U256::from(100),
            endPrice: U256::from(10),
            startTime: U256::from(1_000),
            endTime: U256::from(4_600),
            priceDecayRate: U256::from(1),
        });

        match decode_event(&log).unwrap() {
            Some(DutchBasarEvent::AuctionConfigured { start_time, end_time, .. }) => {
                assert_eq!(start_time, U256::from(1_000));
                assert_eq!(end_time, U256::from(4_600));
            }
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn test_decode_erc721_transfer() {
        let log = raw(&DutchBasar::Transfer {
            from: ALICE,
            to: BOB,
            tokenId: U256::from(1),
        });

        assert_eq!(
            decode_event(&log).unwrap(),
            Some(DutchBasarEvent::Transfer {
                from: ALICE,
                to: BOB,
                token_id: U256::from(1),
            })
        );
    }

    #[test]
    fn test_erc20_shaped_transfer_is_ignored() {
        let mut log = raw(&DutchBasar::Transfer {
            from: ALICE,
            to: BOB,
            tokenId: U256::from(1),
        });
        let topics = log.data.topics()[..3].to_vec();
        log.data = alloy::primitives::LogData::new_unchecked(topics, U256::from(1).to_be_bytes_vec().into());

        assert_eq!(decode_event(&log).unwrap(), None);
    }

    #[test]
    fn test_unknown_topic_is_ignored() {
        let log = PrimitiveLog {
            address: CONTRACT,
            data: alloy::primitives::LogData::new_unchecked(
                vec![b256!("1111111111111111111111111111111111111111111111111111111111111111")],
                Default::default(),
            ),
        };
        assert_eq!(decode_event(&log).unwrap(), None);
    }

    #[test]
    fn test_truncated_payload_is_a_decode_error() {
        let mut log = raw(&DutchBasar::PhaseChanged { newPhase: 1 });
        let topics = log.data.topics().to_vec();
        log.data = alloy::primitives::LogData::new_unchecked(topics, Default::default());

        assert!(matches!(decode_event(&log), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_log_id_format() {
        let meta = EventMeta {
            contract: CONTRACT,
            transaction_hash: B256::repeat_byte(0xab),
            log_index: 4,
            block_number: 10,
            timestamp: 0,
            gas_used: 0,
            gas_price: 0,
        };
        assert_eq!(meta.log_id(), format!("0x{}-4", "ab".repeat(32)));
    }

    #[test]
    fn test_event_signatures_are_distinct() {
        let mut sigs = event_signatures();
        sigs.sort();
        sigs.dedup();
        assert_eq!(sigs.len(), 10);
    }
}
