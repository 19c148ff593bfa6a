use crate::executor::{BlockHeader, ChainClient};
use crate::log_query::LogQuery;
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Log};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

type AlloyFullProvider = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

/// HTTP JSON-RPC client over one or more endpoints. A failed or timed out call
/// moves the next call to the following endpoint; the call itself is not retried.
#[derive(Clone)]
pub struct RpcClient {
    providers: Vec<AlloyFullProvider>,
    urls: Vec<String>,
    current_provider: Arc<AtomicUsize>,
}

impl RpcClient {
    pub fn new(rpc_urls: &[String]) -> Result<Self> {
        if rpc_urls.is_empty() {
            return Err(anyhow::anyhow!("At least one RPC URL must be provided"));
        }

        let mut providers = Vec::new();
        for url in rpc_urls {
            let parsed_url = url
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", url))?;
            let provider: AlloyFullProvider = ProviderBuilder::new().connect_http(parsed_url);
            providers.push(provider);
        }

        Ok(RpcClient {
            providers,
            urls: rpc_urls.to_vec(),
            current_provider: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_provider(&self) -> &AlloyFullProvider {
        let index = self.current_provider.load(Ordering::Relaxed) % self.providers.len();
        &self.providers[index]
    }

    pub fn get_current_url(&self) -> &str {
        let index = self.current_provider.load(Ordering::Relaxed) % self.urls.len();
        &self.urls[index]
    }

    pub fn rotate_provider(&self) {
        let next = self
            .current_provider
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
            % self.providers.len();

        if self.providers.len() > 1 {
            debug!("Rotating to RPC provider #{}", next);
        }
    }

    fn handle_error(&self, error_str: &str) -> anyhow::Error {
        let current_url = self.get_current_url();
        warn!(
            "RPC error on {}: {}, rotating provider",
            current_url, error_str
        );
        self.rotate_provider();
        anyhow::anyhow!("{}", error_str)
    }

    pub async fn get_latest_block(&self) -> Result<u64> {
        self.get_provider()
            .get_block_number()
            .await
            .map_err(|e| self.handle_error(&e.to_string()))
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn header_by_number(&self, height: u64) -> Result<Option<BlockHeader>> {
        let block = self
            .get_provider()
            .get_block_by_number(BlockNumberOrTag::Number(height))
            .await
            .map_err(|e| self.handle_error(&e.to_string()))?;

        Ok(block.map(|block| BlockHeader {
            number: block.header.number,
            hash: block.header.hash,
            parent_hash: block.header.parent_hash,
            timestamp: block.header.timestamp,
        }))
    }

    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        self.get_provider()
            .get_logs(&query.to_filter())
            .await
            .map_err(|e| self.handle_error(&e.to_string()))
    }

    fn on_timeout(&self, op: &'static str) {
        warn!(
            "{} timed out on {}, rotating provider",
            op,
            self.get_current_url()
        );
        self.rotate_provider();
    }
}
