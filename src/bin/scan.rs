use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use swap_agent_executor::config::Config;
use swap_agent_executor::executor::{BscExecutor, ChainClient, EthExecutor, Executor};
use swap_agent_executor::formatters::{OutputFormat, format_blocks};
use swap_agent_executor::models::ChainName;
use swap_agent_executor::rpc::RpcClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scan")]
#[command(about = "Decode swap agent events from a range of blocks", long_about = None)]
struct Cli {
    /// bsc or eth
    #[arg(long)]
    chain: ChainName,

    #[arg(long)]
    from: u64,

    /// Defaults to the latest block
    #[arg(long)]
    to: Option<u64>,

    #[arg(long, default_value = "4")]
    concurrency: usize,

    #[arg(short, long, default_value = "table")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    let config = Arc::new(Config::from_env()?);
    info!("Configuration loaded");

    let client = RpcClient::new(config.rpc_urls(cli.chain)?)?;
    info!("RPC client connected to {}", client.get_current_url());

    let to = match cli.to {
        Some(to) => to,
        None => client.get_latest_block().await?,
    };
    if to < cli.from {
        anyhow::bail!("--to {} is below --from {}", to, cli.from);
    }

    let swap_agent_addr = config.swap_agent_addr(cli.chain)?;
    let client: Arc<dyn ChainClient> = Arc::new(client);
    let executor: Arc<dyn Executor> = match cli.chain {
        ChainName::Bsc => Arc::new(
            BscExecutor::new(client, swap_agent_addr, config.clone())
                .context("Failed to build BSC executor")?,
        ),
        ChainName::Eth => Arc::new(
            EthExecutor::new(client, swap_agent_addr, config.clone())
                .context("Failed to build ETH executor")?,
        ),
    };

    info!(
        "Scanning {} blocks {} to {} with swap agent {}",
        executor.chain_name(),
        cli.from,
        to,
        swap_agent_addr
    );

    let blocks: Vec<_> = stream::iter(cli.from..=to)
        .map(|height| {
            let executor = executor.clone();
            async move {
                executor
                    .get_block_and_tx_events(height)
                    .await
                    .with_context(|| format!("Failed to scan block {height}"))
            }
        })
        .buffered(cli.concurrency.max(1))
        .try_collect()
        .await?;

    let found: usize = blocks.iter().map(|b| b.events.len()).sum();
    info!("Found {} events in {} blocks", found, blocks.len());

    println!("{}", format_blocks(&blocks, &format));

    Ok(())
}
