//! Per-block extraction of swap agent events.
//!
//! An [`Executor`] resolves a height to its header, issues one
//! [`LogQuery`] per watched event against that exact block hash and decodes
//! the matches. Each node call has its own timeout; any failed or timed out
//! call fails the whole scan. A log that does not decode is skipped.

use crate::config::Config;
use crate::decoder::{EventDecoder, parse_abi};
use crate::error::{ConstructionError, ExecutorError};
use crate::events::{BSC_SWAP_AGENT_ABI, ETH_SWAP_AGENT_ABI, EventKind};
use crate::log_query::LogQuery;
use crate::models::{BlockAndEventLogs, BridgeEvent, ChainName};
use alloy::rpc::types::Log;
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
}

/// Node operations the executor depends on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `None` when the node does not know the block yet.
    async fn header_by_number(&self, height: u64) -> anyhow::Result<Option<BlockHeader>>;

    async fn filter_logs(&self, query: &LogQuery) -> anyhow::Result<Vec<Log>>;

    /// Called after `op` was abandoned for exceeding its timeout.
    fn on_timeout(&self, _op: &'static str) {}
}

/// What a chain walker calls, once per height, for each side of the bridge.
#[async_trait]
pub trait Executor: Send + Sync {
    fn chain_name(&self) -> ChainName;

    async fn get_block_and_tx_events(
        &self,
        height: u64,
    ) -> Result<BlockAndEventLogs, ExecutorError>;
}

/// The contract side watched on one chain: its ABI and, in result order,
/// the events scanned for.
#[derive(Debug)]
pub struct ChainProfile {
    pub chain: ChainName,
    pub abi: &'static str,
    pub events: &'static [EventKind],
}

pub static BSC_PROFILE: ChainProfile = ChainProfile {
    chain: ChainName::Bsc,
    abi: BSC_SWAP_AGENT_ABI,
    events: &[EventKind::Bsc2EthSwapStarted, EventKind::SwapPairCreated],
};

pub static ETH_PROFILE: ChainProfile = ChainProfile {
    chain: ChainName::Eth,
    abi: ETH_SWAP_AGENT_ABI,
    events: &[EventKind::Eth2BscSwapStarted, EventKind::SwapPairRegister],
};

pub struct BlockEventExecutor {
    chain: ChainName,
    swap_agent_addr: Address,
    decoders: Vec<EventDecoder>,
    client: Arc<dyn ChainClient>,
    config: Arc<Config>,
}

impl BlockEventExecutor {
    pub fn new(
        profile: &ChainProfile,
        client: Arc<dyn ChainClient>,
        swap_agent_addr: &str,
        config: Arc<Config>,
    ) -> Result<Self, ConstructionError> {
        let swap_agent_addr = Address::from_str(swap_agent_addr)
            .map_err(|_| ConstructionError::InvalidContractAddress(swap_agent_addr.to_string()))?;

        let abi = parse_abi(profile.abi)?;
        let decoders = profile
            .events
            .iter()
            .map(|kind| EventDecoder::new(&abi, *kind))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BlockEventExecutor {
            chain: profile.chain,
            swap_agent_addr,
            decoders,
            client,
            config,
        })
    }

    pub fn chain_name(&self) -> ChainName {
        self.chain
    }

    async fn timed<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, ExecutorError> {
        let after: Duration = self.config.rpc_call_timeout;
        match timeout(after, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(cause)) => Err(ExecutorError::Rpc { op, cause }),
            Err(_) => {
                self.client.on_timeout(op);
                Err(ExecutorError::Timeout { op, after })
            }
        }
    }

    pub async fn get_block_and_tx_events(
        &self,
        height: u64,
    ) -> Result<BlockAndEventLogs, ExecutorError> {
        let header = self
            .timed("header_by_number", self.client.header_by_number(height))
            .await?
            .ok_or(ExecutorError::HeaderNotFound(height))?;
        if header.number != height {
            return Err(ExecutorError::HeaderMismatch {
                requested: height,
                returned: header.number,
            });
        }

        let events = self.get_logs(&header).await?;

        Ok(BlockAndEventLogs {
            height,
            chain: self.chain,
            block_hash: header.hash,
            parent_block_hash: header.parent_hash,
            block_time: header.timestamp,
            events,
        })
    }

    /// Events of every watched kind in `header`'s block, grouped by kind in
    /// profile order.
    pub async fn get_logs(&self, header: &BlockHeader) -> Result<Vec<BridgeEvent>, ExecutorError> {
        let mut events = Vec::new();
        for decoder in &self.decoders {
            events.extend(self.get_event_logs(decoder, header).await?);
        }
        Ok(events)
    }

    async fn get_event_logs(
        &self,
        decoder: &EventDecoder,
        header: &BlockHeader,
    ) -> Result<Vec<BridgeEvent>, ExecutorError> {
        let query = LogQuery::new(header.hash, self.swap_agent_addr, decoder.signature_hash());
        let logs = self
            .timed("filter_logs", self.client.filter_logs(&query))
            .await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            match decoder.decode_event(log, self.chain) {
                Ok(event) => {
                    log_found(&event);
                    events.push(event);
                }
                Err(e) => {
                    warn!(
                        "Failed to decode {:?} log in tx {:?} on {}: {}",
                        decoder.kind(),
                        log.transaction_hash,
                        self.chain,
                        e
                    );
                }
            }
        }
        Ok(events)
    }
}

fn log_found(event: &BridgeEvent) {
    match event {
        BridgeEvent::SwapStarted(ev) => debug!(
            "Found {:?} swap on {}, txHash: {}, token address: {}, amount: {}, fee amount: {}",
            ev.direction, ev.chain, ev.tx_hash, ev.token_addr, ev.amount, ev.fee_amount
        ),
        BridgeEvent::SwapPairRegister(ev) => debug!(
            "Found SwapPairRegister on {}, erc20 address: {}, sponsor: {}, name: {}, symbol: {}, decimals: {}",
            ev.chain, ev.erc20_addr, ev.sponsor, ev.name, ev.symbol, ev.decimals
        ),
        BridgeEvent::SwapPairCreated(ev) => debug!(
            "Found SwapPairCreated on {}, bep20 address: {}, erc20 address: {}, name: {}, symbol: {}, decimals: {}",
            ev.chain, ev.bep20_addr, ev.erc20_addr, ev.name, ev.symbol, ev.decimals
        ),
    }
}

/// Watches the BSC swap agent: BSC to ETH swaps and created pairs.
pub struct BscExecutor {
    inner: BlockEventExecutor,
}

impl BscExecutor {
    pub fn new(
        client: Arc<dyn ChainClient>,
        swap_agent_addr: &str,
        config: Arc<Config>,
    ) -> Result<Self, ConstructionError> {
        Ok(BscExecutor {
            inner: BlockEventExecutor::new(&BSC_PROFILE, client, swap_agent_addr, config)?,
        })
    }
}

#[async_trait]
impl Executor for BscExecutor {
    fn chain_name(&self) -> ChainName {
        self.inner.chain_name()
    }

    async fn get_block_and_tx_events(
        &self,
        height: u64,
    ) -> Result<BlockAndEventLogs, ExecutorError> {
        self.inner.get_block_and_tx_events(height).await
    }
}

/// Watches the ETH swap agent: ETH to BSC swaps and pair registrations.
pub struct EthExecutor {
    inner: BlockEventExecutor,
}

impl EthExecutor {
    pub fn new(
        client: Arc<dyn ChainClient>,
        swap_agent_addr: &str,
        config: Arc<Config>,
    ) -> Result<Self, ConstructionError> {
        Ok(EthExecutor {
            inner: BlockEventExecutor::new(&ETH_PROFILE, client, swap_agent_addr, config)?,
        })
    }
}

#[async_trait]
impl Executor for EthExecutor {
    fn chain_name(&self) -> ChainName {
        self.inner.chain_name()
    }

    async fn get_block_and_tx_events(
        &self,
        height: u64,
    ) -> Result<BlockAndEventLogs, ExecutorError> {
        self.inner.get_block_and_tx_events(height).await
    }
}
