//! Turns raw swap agent logs into canonical records.
//!
//! Indexed fields are read from the topic slots listed in each event's
//! [`EventSchema`]; the remaining fields are decoded from the log data using
//! the contract's JSON ABI, keyed by their declared names.

use crate::error::{ConstructionError, DecodeError};
use crate::events::{EventKind, EventSchema, TopicKind};
use crate::models::{
    BridgeEvent, ChainName, SwapDirection, SwapPairCreatedLog, SwapPairRegisterTxLog,
    SwapStartTxLog,
};
use alloy::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy::json_abi::{Event, JsonAbi};
use alloy::rpc::types::Log;
use alloy_primitives::{Address, B256, U256};
use std::collections::BTreeMap;

pub fn parse_abi(abi_json: &str) -> Result<JsonAbi, ConstructionError> {
    Ok(serde_json::from_str(abi_json)?)
}

#[derive(Debug, Clone)]
pub struct EventDecoder {
    schema: &'static EventSchema,
    payload: Vec<(String, DynSolType)>,
}

impl EventDecoder {
    /// Resolves the payload layout of `kind` from `abi` and checks that the
    /// ABI's indexed inputs line up with the topic schema.
    pub fn new(abi: &JsonAbi, kind: EventKind) -> Result<Self, ConstructionError> {
        let schema = kind.schema();
        let name = kind.abi_name();
        let event = abi
            .event(name)
            .and_then(|overloads| {
                overloads
                    .iter()
                    .find(|ev| ev.inputs.iter().filter(|i| i.indexed).count() == schema.topics.len())
            })
            .ok_or(ConstructionError::MissingEvent(name))?;

        check_indexed_layout(event, schema)?;

        let payload = event
            .inputs
            .iter()
            .filter(|input| !input.indexed)
            .map(|input| {
                let ty = input
                    .resolve()
                    .map_err(|e| ConstructionError::UnsupportedType {
                        event: name,
                        field: input.name.clone(),
                        reason: e.to_string(),
                    })?;
                Ok((input.name.clone(), ty))
            })
            .collect::<Result<Vec<_>, ConstructionError>>()?;

        Ok(EventDecoder { schema, payload })
    }

    pub fn kind(&self) -> EventKind {
        self.schema.kind
    }

    pub fn signature_hash(&self) -> B256 {
        self.schema.kind.signature_hash()
    }

    /// Extracts every indexed and payload field of `log` by name.
    pub fn decode_fields(&self, log: &Log) -> Result<DecodedFields, DecodeError> {
        let event = self.kind().abi_name();
        let topics = log.topics();

        let expected = self.signature_hash();
        match topics.first() {
            Some(found) if *found == expected => {}
            Some(found) => {
                return Err(DecodeError::SignatureMismatch {
                    event,
                    expected,
                    found: *found,
                });
            }
            None => return Err(DecodeError::MissingTopic { event, index: 0 }),
        }

        let mut fields = BTreeMap::new();
        for topic in self.schema.topics {
            let word = topics
                .get(topic.index)
                .ok_or(DecodeError::MissingTopic {
                    event,
                    index: topic.index,
                })?;
            let value = match topic.kind {
                TopicKind::Address => DynSolValue::Address(Address::from_word(*word)),
                TopicKind::RawWord => DynSolValue::FixedBytes(*word, 32),
            };
            fields.insert(topic.name.to_string(), value);
        }

        let payload_type =
            DynSolType::Tuple(self.payload.iter().map(|(_, ty)| ty.clone()).collect());
        let values = match payload_type
            .abi_decode_sequence(&log.data().data)
            .map_err(|source| DecodeError::Payload { event, source })?
        {
            DynSolValue::Tuple(values) => values,
            other => vec![other],
        };
        for ((name, _), value) in self.payload.iter().zip(values) {
            fields.insert(name.clone(), value);
        }

        Ok(DecodedFields { event, fields })
    }

    /// Decodes `log` into the canonical record for this event, tagged with
    /// `chain`.
    pub fn decode_event(&self, log: &Log, chain: ChainName) -> Result<BridgeEvent, DecodeError> {
        let fields = self.decode_fields(log)?;
        let meta = LogMeta::from_log(log)?;
        to_bridge_event(self.kind(), &fields, &meta, chain)
    }
}

fn check_indexed_layout(event: &Event, schema: &EventSchema) -> Result<(), ConstructionError> {
    let indexed: Vec<&str> = event
        .inputs
        .iter()
        .filter(|input| input.indexed)
        .map(|input| input.name.as_str())
        .collect();
    let expected: Vec<&str> = schema.topics.iter().map(|t| t.name).collect();
    if indexed != expected {
        return Err(ConstructionError::SchemaMismatch {
            event: schema.kind.abi_name(),
            reason: format!("ABI indexes {indexed:?}, layout expects {expected:?}"),
        });
    }
    Ok(())
}

/// Named values decoded from one log.
#[derive(Debug, Clone)]
pub struct DecodedFields {
    event: &'static str,
    fields: BTreeMap<String, DynSolValue>,
}

impl DecodedFields {
    fn get(&self, name: &str) -> Result<&DynSolValue, DecodeError> {
        self.fields.get(name).ok_or_else(|| DecodeError::MissingField {
            event: self.event,
            field: name.to_string(),
        })
    }

    fn type_error(&self, name: &str, reason: String) -> DecodeError {
        DecodeError::FieldType {
            event: self.event,
            field: name.to_string(),
            reason,
        }
    }

    pub fn address(&self, name: &str) -> Result<Address, DecodeError> {
        match self.get(name)? {
            DynSolValue::Address(addr) => Ok(*addr),
            other => Err(self.type_error(name, format!("expected address, got {other:?}"))),
        }
    }

    pub fn word(&self, name: &str) -> Result<B256, DecodeError> {
        match self.get(name)? {
            DynSolValue::FixedBytes(word, 32) => Ok(*word),
            other => Err(self.type_error(name, format!("expected bytes32, got {other:?}"))),
        }
    }

    pub fn uint(&self, name: &str) -> Result<U256, DecodeError> {
        match self.get(name)? {
            DynSolValue::Uint(value, _) => Ok(*value),
            other => Err(self.type_error(name, format!("expected uint, got {other:?}"))),
        }
    }

    pub fn uint8(&self, name: &str) -> Result<u8, DecodeError> {
        let value = self.uint(name)?;
        u8::try_from(value).map_err(|_| self.type_error(name, format!("{value} overflows u8")))
    }

    pub fn string(&self, name: &str) -> Result<String, DecodeError> {
        match self.get(name)? {
            DynSolValue::String(s) => Ok(s.clone()),
            other => Err(self.type_error(name, format!("expected string, got {other:?}"))),
        }
    }

    fn checksummed(&self, name: &str) -> Result<String, DecodeError> {
        Ok(self.address(name)?.to_checksum(None))
    }
}

/// Position of a log on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogMeta {
    pub block_hash: B256,
    pub tx_hash: B256,
    pub log_index: u64,
    pub height: u64,
}

impl LogMeta {
    pub fn from_log(log: &Log) -> Result<Self, DecodeError> {
        Ok(LogMeta {
            block_hash: log
                .block_hash
                .ok_or(DecodeError::MissingLogMetadata("block hash"))?,
            tx_hash: log
                .transaction_hash
                .ok_or(DecodeError::MissingLogMetadata("transaction hash"))?,
            log_index: log
                .log_index
                .ok_or(DecodeError::MissingLogMetadata("log index"))?,
            height: log
                .block_number
                .ok_or(DecodeError::MissingLogMetadata("block number"))?,
        })
    }
}

pub fn to_bridge_event(
    kind: EventKind,
    fields: &DecodedFields,
    meta: &LogMeta,
    chain: ChainName,
) -> Result<BridgeEvent, DecodeError> {
    let event = match kind {
        EventKind::Eth2BscSwapStarted => BridgeEvent::SwapStarted(SwapStartTxLog {
            direction: SwapDirection::Eth2Bsc,
            token_addr: fields.checksummed("erc20Addr")?,
            counterpart_token_addr: None,
            from_address: fields.checksummed("fromAddr")?,
            amount: fields.uint("amount")?,
            fee_amount: fields.uint("feeAmount")?,
            block_hash: meta.block_hash,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
            height: meta.height,
            chain,
        }),
        EventKind::Bsc2EthSwapStarted => BridgeEvent::SwapStarted(SwapStartTxLog {
            direction: SwapDirection::Bsc2Eth,
            token_addr: fields.checksummed("bep20Addr")?,
            counterpart_token_addr: Some(fields.checksummed("erc20Addr")?),
            from_address: fields.checksummed("fromAddr")?,
            amount: fields.uint("amount")?,
            fee_amount: fields.uint("feeAmount")?,
            block_hash: meta.block_hash,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
            height: meta.height,
            chain,
        }),
        EventKind::SwapPairRegister => BridgeEvent::SwapPairRegister(SwapPairRegisterTxLog {
            sponsor: fields.checksummed("sponsor")?,
            erc20_addr: fields.checksummed("erc20Addr")?,
            name: fields.string("name")?,
            symbol: fields.string("symbol")?,
            decimals: fields.uint8("decimals")?,
            block_hash: meta.block_hash,
            tx_hash: meta.tx_hash,
            log_index: meta.log_index,
            height: meta.height,
            chain,
        }),
        EventKind::SwapPairCreated => BridgeEvent::SwapPairCreated(SwapPairCreatedLog {
            bep20_addr: fields.checksummed("bep20Addr")?,
            erc20_addr: fields.checksummed("erc20Addr")?,
            name: fields.string("name")?,
            symbol: fields.string("symbol")?,
            decimals: fields.uint8("decimals")?,
            register_tx_hash: fields.word("ethRegisterTxHash")?,
            create_tx_hash: meta.tx_hash,
            block_hash: meta.block_hash,
            log_index: meta.log_index,
            height: meta.height,
            chain,
        }),
    };
    Ok(event)
}
