use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cid_anchor::error::Result;
use cid_anchor::ledger::ethereum::{
    EthereumConfig, EthereumRegistry, DEFAULT_INCEPTION_HEIGHT, DEFAULT_LOG_WINDOW,
    DEFAULT_RPC_URL, SEPOLIA_CHAIN_ID,
};
use cid_anchor::storage::ipfs::{IpfsClient, IpfsConfig};
use cid_anchor::sync::RangeSynchronizer;
use cid_anchor::workflow::{AnchorWorkflow, InputSource};

#[derive(Parser)]
#[command(name = "cid-anchor")]
#[command(about = "Upload files to IPFS and anchor their CIDs in an Ethereum registry")]
#[command(version)]
struct Cli {
    /// Ethereum JSON-RPC endpoint.
    #[arg(long, env = "CID_ANCHOR_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Registry contract address.
    #[arg(long, env = "CID_ANCHOR_CONTRACT")]
    contract: Address,

    /// Chain ID for transaction signing.
    #[arg(long, default_value_t = SEPOLIA_CHAIN_ID)]
    chain_id: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file to IPFS and store its CID on the ledger
    Upload {
        /// Path of the file to upload.
        path: PathBuf,

        /// Private key (hex) of the anchoring account.
        #[arg(long, env = "CID_ANCHOR_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,

        /// IPFS HTTP API endpoint.
        #[arg(long, env = "CID_ANCHOR_IPFS_API", default_value = "http://localhost:5001")]
        ipfs_api: String,
    },
    /// List all CIDs anchored by an address
    List {
        /// Account address whose history to replay.
        address: String,

        /// First block height the contract could have emitted events at.
        #[arg(long, default_value_t = DEFAULT_INCEPTION_HEIGHT)]
        inception: u64,

        /// Maximum block span per event query.
        #[arg(long, default_value_t = DEFAULT_LOG_WINDOW)]
        window: u64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = EthereumConfig::new(cli.rpc_url, cli.chain_id, cli.contract);

    match cli.command {
        Commands::Upload {
            path,
            private_key,
            ipfs_api,
        } => {
            let ledger = EthereumRegistry::new(config.with_private_key(private_key))?;
            let storage = IpfsClient::connect(IpfsConfig::new(ipfs_api)).await?;

            let workflow = AnchorWorkflow::new(storage, ledger);
            let receipt = workflow.upload(InputSource::Path(path)).await?;

            println!("anchored in transaction {}", receipt.transaction_hash);
        }
        Commands::List {
            address,
            inception,
            window,
        } => {
            let ledger = EthereumRegistry::new(config)?;
            let sync = RangeSynchronizer::new(ledger, inception, window);

            let records = sync.list_for_account(&address).await?;
            for r in &records {
                println!("{}\t{}\t{}", r.block_height, r.cid, r.tx_hash);
            }
            println!("{} record(s)", records.len());
        }
    }

    Ok(())
}
