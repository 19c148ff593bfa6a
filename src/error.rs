use alloy_primitives::B256;
use std::time::Duration;
use thiserror::Error;

/// Raised while building an executor. Never produced by a scan.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("Invalid contract ABI: {0}")]
    InvalidAbi(#[from] serde_json::Error),
    #[error("Event {0} not found in contract ABI")]
    MissingEvent(&'static str),
    #[error("Event {event} does not match its topic layout: {reason}")]
    SchemaMismatch { event: &'static str, reason: String },
    #[error("Unsupported type for {event}.{field}: {reason}")]
    UnsupportedType {
        event: &'static str,
        field: String,
        reason: String,
    },
    #[error("Invalid contract address: {0}")]
    InvalidContractAddress(String),
}

/// Fails a whole scan call. No partial block is returned.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
    #[error("{op} failed: {cause:#}")]
    Rpc {
        op: &'static str,
        cause: anyhow::Error,
    },
    #[error("Block header {0} not available on node")]
    HeaderNotFound(u64),
    #[error("Asked for block {requested}, node returned block {returned}")]
    HeaderMismatch { requested: u64, returned: u64 },
}

/// Fails a single log. The executor skips the log and keeps going.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Event signature mismatch for {event}: expected {expected}, found {found}")]
    SignatureMismatch {
        event: &'static str,
        expected: B256,
        found: B256,
    },
    #[error("Log for {event} is missing topic {index}")]
    MissingTopic { event: &'static str, index: usize },
    #[error("Failed to decode {event} payload: {source}")]
    Payload {
        event: &'static str,
        source: alloy::dyn_abi::Error,
    },
    #[error("Decoded {event} is missing field {field}")]
    MissingField { event: &'static str, field: String },
    #[error("Field {event}.{field} has unexpected value: {reason}")]
    FieldType {
        event: &'static str,
        field: String,
        reason: String,
    },
    #[error("Log is missing {0}")]
    MissingLogMetadata(&'static str),
}
