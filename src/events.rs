use alloy_primitives::{B256, b256};
use std::collections::HashMap;
use std::sync::LazyLock;

pub const BSC_SWAP_AGENT_ABI: &str = include_str!("../abi/bsc_swap_agent.json");
pub const ETH_SWAP_AGENT_ABI: &str = include_str!("../abi/eth_swap_agent.json");

/// Swap agent events watched by the executors. Both agents emit a
/// `SwapStarted` event, but with different indexed layouts and hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Eth2BscSwapStarted,
    Bsc2EthSwapStarted,
    SwapPairRegister,
    SwapPairCreated,
}

static SIGNATURE_HASHES: LazyLock<HashMap<EventKind, B256>> = LazyLock::new(|| {
    HashMap::from([
        (
            EventKind::Eth2BscSwapStarted,
            b256!("0xf60309f865a6aa297da5fac6188136a02e5acfdf6e8f6d35257a9f4e9653170f"),
        ),
        (
            EventKind::Bsc2EthSwapStarted,
            b256!("0x49c08ff11118922c1e8298915531eff9ef6f8b39b44b3e9952b75d47e1d0cdd0"),
        ),
        (
            EventKind::SwapPairRegister,
            b256!("0xfe3bd005e346323fa452df8cafc28c55b99e3766ba8750571d139c6cf5bc08a0"),
        ),
        (
            EventKind::SwapPairCreated,
            b256!("0xcc0314763eabceb74cd3d30ae785c09bfe4e204af2088b3bfcdbbe5082133db5"),
        ),
    ])
});

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Eth2BscSwapStarted,
        EventKind::Bsc2EthSwapStarted,
        EventKind::SwapPairRegister,
        EventKind::SwapPairCreated,
    ];

    /// Event name as declared in the contract ABI.
    pub fn abi_name(self) -> &'static str {
        match self {
            EventKind::Eth2BscSwapStarted | EventKind::Bsc2EthSwapStarted => "SwapStarted",
            EventKind::SwapPairRegister => "SwapPairRegister",
            EventKind::SwapPairCreated => "SwapPairCreated",
        }
    }

    pub fn signature_hash(self) -> B256 {
        SIGNATURE_HASHES[&self]
    }

    pub fn schema(self) -> &'static EventSchema {
        match self {
            EventKind::Eth2BscSwapStarted => &ETH2BSC_SWAP_STARTED,
            EventKind::Bsc2EthSwapStarted => &BSC2ETH_SWAP_STARTED,
            EventKind::SwapPairRegister => &SWAP_PAIR_REGISTER,
            EventKind::SwapPairCreated => &SWAP_PAIR_CREATED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// Right-aligned 20 byte address.
    Address,
    /// The whole 32 byte word, not interpreted.
    RawWord,
}

#[derive(Debug, Clone, Copy)]
pub struct TopicField {
    pub index: usize,
    pub name: &'static str,
    pub kind: TopicKind,
}

/// Indexed layout of one event. Field names match the ABI input names.
#[derive(Debug)]
pub struct EventSchema {
    pub kind: EventKind,
    pub topics: &'static [TopicField],
}

const fn address(index: usize, name: &'static str) -> TopicField {
    TopicField {
        index,
        name,
        kind: TopicKind::Address,
    }
}

pub static ETH2BSC_SWAP_STARTED: EventSchema = EventSchema {
    kind: EventKind::Eth2BscSwapStarted,
    topics: &[address(1, "erc20Addr"), address(2, "fromAddr")],
};

pub static BSC2ETH_SWAP_STARTED: EventSchema = EventSchema {
    kind: EventKind::Bsc2EthSwapStarted,
    topics: &[
        address(1, "bep20Addr"),
        address(2, "erc20Addr"),
        address(3, "fromAddr"),
    ],
};

pub static SWAP_PAIR_REGISTER: EventSchema = EventSchema {
    kind: EventKind::SwapPairRegister,
    topics: &[address(1, "sponsor"), address(2, "erc20Addr")],
};

// TODO: confirm against mainnet SwapPairCreated logs whether topic 1 is the
// register tx hash or a padded address before relying on it downstream.
pub static SWAP_PAIR_CREATED: EventSchema = EventSchema {
    kind: EventKind::SwapPairCreated,
    topics: &[
        TopicField {
            index: 1,
            name: "ethRegisterTxHash",
            kind: TopicKind::RawWord,
        },
        address(2, "bep20Addr"),
        address(3, "erc20Addr"),
    ],
};
