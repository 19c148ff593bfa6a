use crate::models::ChainName;
use anyhow::{Context, Result};
use std::time::Duration;

const DEFAULT_RPC_CALL_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub bsc_rpc_urls: Vec<String>,
    pub eth_rpc_urls: Vec<String>,
    pub bsc_swap_agent_addr: Option<String>,
    pub eth_swap_agent_addr: Option<String>,
    /// Applied to each node call on its own, not to a whole scan.
    pub rpc_call_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bsc_rpc_urls: Vec::new(),
            eth_rpc_urls: Vec::new(),
            bsc_swap_agent_addr: None,
            eth_swap_agent_addr: None,
            rpc_call_timeout: Duration::from_secs(DEFAULT_RPC_CALL_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let rpc_call_timeout = match std::env::var("RPC_CALL_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(
                secs.parse()
                    .context("RPC_CALL_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_RPC_CALL_TIMEOUT_SECS),
        };

        Ok(Config {
            bsc_rpc_urls: url_list("BSC_RPC_URLS"),
            eth_rpc_urls: url_list("ETH_RPC_URLS"),
            bsc_swap_agent_addr: std::env::var("BSC_SWAP_AGENT_ADDR").ok(),
            eth_swap_agent_addr: std::env::var("ETH_SWAP_AGENT_ADDR").ok(),
            rpc_call_timeout,
        })
    }

    pub fn rpc_urls(&self, chain: ChainName) -> Result<&[String]> {
        let urls = match chain {
            ChainName::Bsc => &self.bsc_rpc_urls,
            ChainName::Eth => &self.eth_rpc_urls,
        };
        if urls.is_empty() {
            anyhow::bail!("{}_RPC_URLS must be set in .env", chain);
        }
        Ok(urls)
    }

    pub fn swap_agent_addr(&self, chain: ChainName) -> Result<&str> {
        let addr = match chain {
            ChainName::Bsc => &self.bsc_swap_agent_addr,
            ChainName::Eth => &self.eth_swap_agent_addr,
        };
        addr.as_deref()
            .with_context(|| format!("{}_SWAP_AGENT_ADDR must be set in .env", chain))
    }
}

fn url_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
