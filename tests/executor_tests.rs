use alloy::dyn_abi::DynSolValue;
use alloy::rpc::types::Log;
use alloy_primitives::{Address, B256, Bytes, LogData, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use swap_agent_executor::config::Config;
use swap_agent_executor::error::{ConstructionError, ExecutorError};
use swap_agent_executor::events::EventKind;
use swap_agent_executor::executor::{BlockHeader, BscExecutor, ChainClient, EthExecutor, Executor};
use swap_agent_executor::log_query::LogQuery;
use swap_agent_executor::models::{BridgeEvent, ChainName, SwapDirection};

const SWAP_AGENT: &str = "0xab0f3e3d2a4f6a4e5a2d2f3fc4c4b6a8a1e3e2d1";
const HEIGHT: u64 = 1_000;

#[derive(Default)]
struct MockClient {
    header_delay: Option<Duration>,
    logs_delay: Option<Duration>,
    missing_header: bool,
    header_number: Option<u64>,
    fail_logs: bool,
    logs: HashMap<B256, Vec<Log>>,
    queries: Mutex<Vec<LogQuery>>,
    timeouts: Mutex<Vec<&'static str>>,
}

impl MockClient {
    fn with_logs(logs: Vec<Log>) -> Self {
        let mut by_topic: HashMap<B256, Vec<Log>> = HashMap::new();
        for log in logs {
            by_topic.entry(log.topics()[0]).or_default().push(log);
        }
        MockClient {
            logs: by_topic,
            ..MockClient::default()
        }
    }

    fn queries(&self) -> Vec<LogQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn timeouts(&self) -> Vec<&'static str> {
        self.timeouts.lock().unwrap().clone()
    }
}

fn header() -> BlockHeader {
    BlockHeader {
        number: HEIGHT,
        hash: B256::repeat_byte(0xbb),
        parent_hash: B256::repeat_byte(0xba),
        timestamp: 1_650_000_000,
    }
}

#[async_trait]
impl ChainClient for MockClient {
    async fn header_by_number(&self, height: u64) -> anyhow::Result<Option<BlockHeader>> {
        if let Some(delay) = self.header_delay {
            tokio::time::sleep(delay).await;
        }
        if self.missing_header || height != HEIGHT {
            return Ok(None);
        }
        Ok(Some(BlockHeader {
            number: self.header_number.unwrap_or(height),
            ..header()
        }))
    }

    async fn filter_logs(&self, query: &LogQuery) -> anyhow::Result<Vec<Log>> {
        self.queries.lock().unwrap().push(*query);
        if let Some(delay) = self.logs_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_logs {
            anyhow::bail!("connection reset by peer");
        }
        Ok(self.logs.get(&query.topic0).cloned().unwrap_or_default())
    }

    fn on_timeout(&self, op: &'static str) {
        self.timeouts.lock().unwrap().push(op);
    }
}

fn config(timeout: Duration) -> Arc<Config> {
    Arc::new(Config {
        rpc_call_timeout: timeout,
        ..Config::default()
    })
}

fn log(topics: Vec<B256>, data: Vec<u8>, tx_byte: u8, log_index: u64) -> Log {
    Log {
        inner: alloy_primitives::Log {
            address: SWAP_AGENT.parse().unwrap(),
            data: LogData::new_unchecked(topics, Bytes::from(data)),
        },
        block_hash: Some(header().hash),
        block_number: Some(HEIGHT),
        block_timestamp: None,
        transaction_hash: Some(B256::repeat_byte(tx_byte)),
        transaction_index: Some(0),
        log_index: Some(log_index),
        removed: false,
    }
}

fn amounts(amount: U256, fee: U256) -> Vec<u8> {
    DynSolValue::Tuple(vec![
        DynSolValue::Uint(amount, 256),
        DynSolValue::Uint(fee, 256),
    ])
    .abi_encode_params()
}

fn token_meta(name: &str, symbol: &str, decimals: u8) -> Vec<u8> {
    DynSolValue::Tuple(vec![
        DynSolValue::String(name.to_string()),
        DynSolValue::String(symbol.to_string()),
        DynSolValue::Uint(U256::from(decimals), 8),
    ])
    .abi_encode_params()
}

fn bsc_swap_log(tx_byte: u8, log_index: u64) -> Log {
    log(
        vec![
            EventKind::Bsc2EthSwapStarted.signature_hash(),
            Address::repeat_byte(0xb2).into_word(),
            Address::repeat_byte(0xe2).into_word(),
            Address::repeat_byte(0xf1).into_word(),
        ],
        amounts(
            U256::from(1_000_000_000_000_000_000u64),
            U256::from(1_000_000_000_000_000u64),
        ),
        tx_byte,
        log_index,
    )
}

fn bsc_executor(client: Arc<MockClient>, timeout: Duration) -> BscExecutor {
    BscExecutor::new(client, SWAP_AGENT, config(timeout)).unwrap()
}

#[tokio::test]
async fn bsc_swap_started_is_decoded_and_tagged() {
    let client = Arc::new(MockClient::with_logs(vec![bsc_swap_log(0x0c, 2)]));
    let executor = bsc_executor(client.clone(), Duration::from_secs(5));

    let block = executor.get_block_and_tx_events(HEIGHT).await.unwrap();

    assert_eq!(executor.chain_name(), ChainName::Bsc);
    assert_eq!(block.chain, ChainName::Bsc);
    assert_eq!(block.height, HEIGHT);
    assert_eq!(block.block_hash, header().hash);
    assert_eq!(block.parent_block_hash, header().parent_hash);
    assert_eq!(block.block_time, header().timestamp);
    assert_eq!(block.events.len(), 1);

    let BridgeEvent::SwapStarted(swap) = &block.events[0] else {
        panic!("expected swap started");
    };
    assert_eq!(swap.direction, SwapDirection::Bsc2Eth);
    assert_eq!(swap.amount.to_string(), "1000000000000000000");
    assert_eq!(swap.fee_amount.to_string(), "1000000000000000");
    assert_eq!(swap.chain, ChainName::Bsc);
    assert_eq!(swap.tx_hash, B256::repeat_byte(0x0c));
    assert_eq!(swap.block_hash, header().hash);
    assert_eq!(swap.log_index, 2);
    assert_eq!(
        swap.token_addr,
        Address::repeat_byte(0xb2).to_checksum(None)
    );
    assert_eq!(
        swap.counterpart_token_addr.as_deref(),
        Some(Address::repeat_byte(0xe2).to_checksum(None).as_str())
    );
    assert_eq!(
        swap.from_address,
        Address::repeat_byte(0xf1).to_checksum(None)
    );
}

#[tokio::test]
async fn queries_are_scoped_to_block_contract_and_event() {
    let client = Arc::new(MockClient::default());
    let executor = bsc_executor(client.clone(), Duration::from_secs(5));

    executor.get_block_and_tx_events(HEIGHT).await.unwrap();

    let contract: Address = SWAP_AGENT.parse().unwrap();
    let queries = client.queries();
    assert_eq!(
        queries,
        vec![
            LogQuery::new(
                header().hash,
                contract,
                EventKind::Bsc2EthSwapStarted.signature_hash()
            ),
            LogQuery::new(
                header().hash,
                contract,
                EventKind::SwapPairCreated.signature_hash()
            ),
        ]
    );
}

#[tokio::test]
async fn malformed_log_is_skipped() {
    let mut broken = bsc_swap_log(0x0d, 1);
    broken.inner.data = LogData::new_unchecked(
        broken.topics()[..3].to_vec(),
        broken.data().data.clone(),
    );
    let client = Arc::new(MockClient::with_logs(vec![broken, bsc_swap_log(0x0c, 2)]));
    let executor = bsc_executor(client, Duration::from_secs(5));

    let block = executor.get_block_and_tx_events(HEIGHT).await.unwrap();

    assert_eq!(block.events.len(), 1);
    assert_eq!(block.events[0].tx_hash(), B256::repeat_byte(0x0c));
}

#[tokio::test]
async fn block_without_bridge_logs_is_empty() {
    let client = Arc::new(MockClient::default());
    let executor = bsc_executor(client, Duration::from_secs(5));

    let block = executor.get_block_and_tx_events(HEIGHT).await.unwrap();

    assert_eq!(block.height, HEIGHT);
    assert!(block.events.is_empty());
}

#[tokio::test]
async fn header_timeout_fails_the_scan() {
    let client = Arc::new(MockClient {
        header_delay: Some(Duration::from_millis(500)),
        ..MockClient::default()
    });
    let executor = bsc_executor(client.clone(), Duration::from_millis(20));

    let err = executor.get_block_and_tx_events(HEIGHT).await.unwrap_err();

    assert!(matches!(
        err,
        ExecutorError::Timeout {
            op: "header_by_number",
            ..
        }
    ));
    assert!(client.queries().is_empty());
    assert_eq!(client.timeouts(), vec!["header_by_number"]);
}

#[tokio::test]
async fn log_query_timeout_fails_the_scan() {
    let client = Arc::new(MockClient {
        logs_delay: Some(Duration::from_millis(500)),
        ..MockClient::with_logs(vec![bsc_swap_log(0x0c, 0)])
    });
    let executor = bsc_executor(client.clone(), Duration::from_millis(20));

    let err = executor.get_block_and_tx_events(HEIGHT).await.unwrap_err();

    assert!(matches!(
        err,
        ExecutorError::Timeout {
            op: "filter_logs",
            ..
        }
    ));
    assert_eq!(client.queries().len(), 1);
    assert_eq!(client.timeouts(), vec!["filter_logs"]);
}

#[tokio::test]
async fn each_node_call_gets_a_fresh_timeout() {
    // Three calls of 60ms each exceed 150ms together but none does alone.
    let client = Arc::new(MockClient {
        header_delay: Some(Duration::from_millis(60)),
        logs_delay: Some(Duration::from_millis(60)),
        ..MockClient::with_logs(vec![bsc_swap_log(0x0c, 0)])
    });
    let executor = bsc_executor(client.clone(), Duration::from_millis(150));

    let block = executor.get_block_and_tx_events(HEIGHT).await.unwrap();

    assert_eq!(block.events.len(), 1);
    assert_eq!(client.queries().len(), 2);
    assert!(client.timeouts().is_empty());
}

#[tokio::test]
async fn header_for_another_height_is_rejected() {
    let client = Arc::new(MockClient {
        header_number: Some(HEIGHT + 1),
        ..MockClient::default()
    });
    let executor = bsc_executor(client.clone(), Duration::from_secs(5));

    let err = executor.get_block_and_tx_events(HEIGHT).await.unwrap_err();

    assert!(matches!(
        err,
        ExecutorError::HeaderMismatch {
            requested: HEIGHT,
            returned,
        } if returned == HEIGHT + 1
    ));
    assert!(client.queries().is_empty());
}

#[tokio::test]
async fn log_query_failure_fails_the_scan() {
    let client = Arc::new(MockClient {
        fail_logs: true,
        ..MockClient::with_logs(vec![bsc_swap_log(0x0c, 0)])
    });
    let executor = bsc_executor(client, Duration::from_secs(5));

    let err = executor.get_block_and_tx_events(HEIGHT).await.unwrap_err();

    assert!(matches!(err, ExecutorError::Rpc { op: "filter_logs", .. }));
    assert!(err.to_string().contains("connection reset by peer"));
}

#[tokio::test]
async fn unknown_height_is_an_error() {
    let client = Arc::new(MockClient {
        missing_header: true,
        ..MockClient::default()
    });
    let executor = bsc_executor(client, Duration::from_secs(5));

    let err = executor.get_block_and_tx_events(HEIGHT).await.unwrap_err();

    assert!(matches!(err, ExecutorError::HeaderNotFound(HEIGHT)));
}

#[tokio::test]
async fn swaps_come_before_pair_events_regardless_of_log_order() {
    let pair_created = log(
        vec![
            EventKind::SwapPairCreated.signature_hash(),
            B256::repeat_byte(0x7e),
            Address::repeat_byte(0xb3).into_word(),
            Address::repeat_byte(0xe3).into_word(),
        ],
        token_meta("Chainlink", "LINK", 18),
        0x0a,
        0,
    );
    let client = Arc::new(MockClient::with_logs(vec![
        pair_created,
        bsc_swap_log(0x0b, 5),
    ]));
    let executor = bsc_executor(client, Duration::from_secs(5));

    let block = executor.get_block_and_tx_events(HEIGHT).await.unwrap();

    let kinds: Vec<&str> = block.events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["SwapStarted", "SwapPairCreated"]);
    let BridgeEvent::SwapPairCreated(pair) = &block.events[1] else {
        panic!("expected pair created");
    };
    assert_eq!(pair.register_tx_hash, B256::repeat_byte(0x7e));
    assert_eq!(pair.symbol, "LINK");
    assert_eq!(pair.chain, ChainName::Bsc);
}

#[tokio::test]
async fn eth_executor_decodes_swaps_and_registrations() {
    let swap = log(
        vec![
            EventKind::Eth2BscSwapStarted.signature_hash(),
            Address::repeat_byte(0xe4).into_word(),
            Address::repeat_byte(0xf4).into_word(),
        ],
        amounts(U256::from(u128::MAX) * U256::from(3u8), U256::from(7u8)),
        0x01,
        0,
    );
    let register = log(
        vec![
            EventKind::SwapPairRegister.signature_hash(),
            Address::repeat_byte(0x5a).into_word(),
            Address::repeat_byte(0xe5).into_word(),
        ],
        token_meta("Tether USD", "USDT", 6),
        0x02,
        1,
    );
    let client = Arc::new(MockClient::with_logs(vec![register, swap]));
    let executor = EthExecutor::new(client.clone(), SWAP_AGENT, config(Duration::from_secs(5)))
        .unwrap();

    let block = executor.get_block_and_tx_events(HEIGHT).await.unwrap();

    assert_eq!(block.chain, ChainName::Eth);
    assert_eq!(block.events.len(), 2);
    let BridgeEvent::SwapStarted(swap) = &block.events[0] else {
        panic!("expected swap started");
    };
    assert_eq!(swap.direction, SwapDirection::Eth2Bsc);
    assert_eq!(swap.amount, U256::from(u128::MAX) * U256::from(3u8));
    assert_eq!(swap.token_addr, Address::repeat_byte(0xe4).to_checksum(None));
    let BridgeEvent::SwapPairRegister(register) = &block.events[1] else {
        panic!("expected pair register");
    };
    assert_eq!(register.sponsor, Address::repeat_byte(0x5a).to_checksum(None));
    assert_eq!(register.decimals, 6);
    assert_eq!(register.chain, ChainName::Eth);

    let topics: Vec<B256> = client.queries().iter().map(|q| q.topic0).collect();
    assert_eq!(
        topics,
        vec![
            EventKind::Eth2BscSwapStarted.signature_hash(),
            EventKind::SwapPairRegister.signature_hash()
        ]
    );
}

#[tokio::test]
async fn executors_are_usable_behind_one_capability() {
    let client = Arc::new(MockClient::with_logs(vec![bsc_swap_log(0x0c, 0)]));
    let executors: Vec<Arc<dyn Executor>> = vec![
        Arc::new(bsc_executor(client.clone(), Duration::from_secs(5))),
        Arc::new(
            EthExecutor::new(client.clone(), SWAP_AGENT, config(Duration::from_secs(5))).unwrap(),
        ),
    ];

    let handles: Vec<_> = executors
        .iter()
        .cloned()
        .map(|executor| tokio::spawn(async move { executor.get_block_and_tx_events(HEIGHT).await }))
        .collect();

    let mut chains = Vec::new();
    for handle in handles {
        let block = handle.await.unwrap().unwrap();
        assert!(block.events.iter().all(|e| e.chain() == block.chain));
        chains.push(block.chain);
    }
    assert_eq!(chains, vec![ChainName::Bsc, ChainName::Eth]);
}

#[test]
fn bad_contract_address_fails_construction() {
    let client = Arc::new(MockClient::default());
    let err = BscExecutor::new(client, "0xnot-an-address", config(Duration::from_secs(5)))
        .err()
        .unwrap();

    assert!(matches!(err, ConstructionError::InvalidContractAddress(_)));
}
