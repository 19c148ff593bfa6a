use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainName {
    #[serde(rename = "BSC")]
    Bsc,
    #[serde(rename = "ETH")]
    Eth,
}

impl ChainName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainName::Bsc => "BSC",
            ChainName::Eth => "ETH",
        }
    }
}

impl fmt::Display for ChainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bsc" => Ok(ChainName::Bsc),
            "eth" => Ok(ChainName::Eth),
            _ => Err(anyhow::anyhow!("Unknown chain: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    Eth2Bsc,
    Bsc2Eth,
}

/// A swap initiated on the watched chain, in either direction.
///
/// `token_addr` is the token on the chain that emitted the log. For
/// `Bsc2Eth` swaps the contract also names the ERC20 counterpart, kept in
/// `counterpart_token_addr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStartTxLog {
    pub direction: SwapDirection,
    pub token_addr: String,
    pub counterpart_token_addr: Option<String>,
    pub from_address: String,
    #[serde(with = "decimal_u256")]
    pub amount: U256,
    #[serde(with = "decimal_u256")]
    pub fee_amount: U256,
    pub block_hash: B256,
    pub tx_hash: B256,
    pub log_index: u64,
    pub height: u64,
    pub chain: ChainName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPairRegisterTxLog {
    pub sponsor: String,
    pub erc20_addr: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub block_hash: B256,
    pub tx_hash: B256,
    pub log_index: u64,
    pub height: u64,
    pub chain: ChainName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPairCreatedLog {
    pub bep20_addr: String,
    pub erc20_addr: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// First indexed topic of the log, carried as emitted.
    pub register_tx_hash: B256,
    pub create_tx_hash: B256,
    pub block_hash: B256,
    pub log_index: u64,
    pub height: u64,
    pub chain: ChainName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    SwapStarted(SwapStartTxLog),
    SwapPairRegister(SwapPairRegisterTxLog),
    SwapPairCreated(SwapPairCreatedLog),
}

impl BridgeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeEvent::SwapStarted(_) => "SwapStarted",
            BridgeEvent::SwapPairRegister(_) => "SwapPairRegister",
            BridgeEvent::SwapPairCreated(_) => "SwapPairCreated",
        }
    }

    pub fn chain(&self) -> ChainName {
        match self {
            BridgeEvent::SwapStarted(ev) => ev.chain,
            BridgeEvent::SwapPairRegister(ev) => ev.chain,
            BridgeEvent::SwapPairCreated(ev) => ev.chain,
        }
    }

    pub fn tx_hash(&self) -> B256 {
        match self {
            BridgeEvent::SwapStarted(ev) => ev.tx_hash,
            BridgeEvent::SwapPairRegister(ev) => ev.tx_hash,
            BridgeEvent::SwapPairCreated(ev) => ev.create_tx_hash,
        }
    }

    pub fn log_index(&self) -> u64 {
        match self {
            BridgeEvent::SwapStarted(ev) => ev.log_index,
            BridgeEvent::SwapPairRegister(ev) => ev.log_index,
            BridgeEvent::SwapPairCreated(ev) => ev.log_index,
        }
    }

    /// Identifies one emitted log across both chains.
    pub fn dedup_key(&self) -> (ChainName, B256, u64) {
        (self.chain(), self.tx_hash(), self.log_index())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAndEventLogs {
    pub height: u64,
    pub chain: ChainName,
    pub block_hash: B256,
    pub parent_block_hash: B256,
    pub block_time: u64,
    pub events: Vec<BridgeEvent>,
}

/// Serializes a `U256` as a base-10 string.
pub mod decimal_u256 {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
    }
}
