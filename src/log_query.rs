use alloy::rpc::types::Filter;
use alloy_primitives::{Address, B256};

/// A log filter pinned to one block hash, one contract and one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub block_hash: B256,
    pub address: Address,
    pub topic0: B256,
}

impl LogQuery {
    pub fn new(block_hash: B256, address: Address, topic0: B256) -> Self {
        LogQuery {
            block_hash,
            address,
            topic0,
        }
    }

    pub fn to_filter(&self) -> Filter {
        Filter::new()
            .at_block_hash(self.block_hash)
            .address(self.address)
            .event_signature(self.topic0)
    }
}
