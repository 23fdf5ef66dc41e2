// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

#![doc = include_str!("../README.md")]

use std::{path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, warn};
use tokio::sync::broadcast::error::RecvError;
use vault_core::{
    directory::RetailerDirectory,
    feed::{spawn_refresh_loop, FeedConfig, NotificationLevel, ReceiptFeed},
    issuance::{Submitter, SubmitterConfig},
    manager::{adapters::WalletProvider, Reconciler},
    network::{self, SEPOLIA_CHAIN_ID},
    session::SessionManager,
};
use vault_service::{
    context::ServiceContext,
    contract::VaultContract,
    etherscan::{EtherscanClient, DEFAULT_ETHERSCAN_API_URL},
    file_store::JsonFileStore,
    metrics,
    rpc_wallet::RpcWallet,
    server,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on for JSON-RPC requests.
    /// Defaults to 8080.
    #[arg(long, default_value_t = 8080, env = "VAULT_PORT")]
    port: u16,

    /// Metrics server port.
    /// Defaults to 5000.
    #[arg(long, default_value_t = 5000, env = "VAULT_METRICS_PORT")]
    metrics_port: u16,

    /// JSON-RPC endpoint of the Ethereum node receipts are sent through.
    #[arg(long, default_value = "http://localhost:8545", env = "VAULT_RPC_URL")]
    rpc_url: String,

    /// Private key of the retailer account, as a hex string.
    #[arg(long, env = "VAULT_PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    /// ReceiptVault contract address. Defaults to the known deployment for the
    /// node's network.
    #[arg(long, env = "VAULT_CONTRACT_ADDRESS")]
    contract_address: Option<Address>,

    /// Etherscan-compatible API the transaction history is read from.
    #[arg(long, default_value = DEFAULT_ETHERSCAN_API_URL, env = "VAULT_ETHERSCAN_API_URL")]
    etherscan_api_url: String,

    #[arg(long, env = "VAULT_ETHERSCAN_API_KEY", hide_env_values = true)]
    etherscan_api_key: Option<String>,

    /// Do not read the transaction history at all.
    #[arg(long, env = "VAULT_DISABLE_HISTORY")]
    disable_history: bool,

    /// File the issued receipts are recorded in.
    #[arg(long, default_value = "receipts.json", env = "VAULT_STORE_PATH")]
    store_path: PathBuf,

    /// Chain raw receipt transactions must be sent on.
    /// Defaults to Sepolia.
    #[arg(long, default_value_t = SEPOLIA_CHAIN_ID, env = "VAULT_TARGET_CHAIN_ID")]
    target_chain_id: u64,

    /// Seconds between two refreshes of the receipt list.
    #[arg(
        long,
        default_value_t = 15,
        env = "VAULT_POLL_INTERVAL_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval_secs: u64,

    /// Milliseconds between an issued receipt and the refresh it triggers.
    #[arg(long, default_value_t = 1000, env = "VAULT_ISSUANCE_DELAY_MS")]
    issuance_delay_ms: u64,

    /// Additional known retailers, as ADDRESS=NAME.
    /// Expects a comma-separated list.
    #[arg(long, env = "VAULT_RETAILERS", value_delimiter = ',', value_parser = parse_retailer)]
    retailers: Vec<(Address, String)>,

    /// Maximum request body size in bytes.
    /// Defaults to 1MB.
    #[arg(long, default_value_t = 1024 * 1024, env = "VAULT_MAX_REQUEST_BODY_SIZE")]
    max_request_body_size: u32,

    /// Maximum response body size in bytes.
    /// Defaults to 10MB.
    #[arg(long, default_value_t = 10 * 1024 * 1024, env = "VAULT_MAX_RESPONSE_BODY_SIZE")]
    max_response_body_size: u32,

    /// Maximum number of concurrent connections.
    /// Defaults to 32.
    #[arg(long, default_value_t = 32, env = "VAULT_MAX_CONNECTIONS")]
    max_connections: u32,
}

fn parse_retailer(s: &str) -> Result<(Address, String), String> {
    let (address, name) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDRESS=NAME, got \"{s}\""))?;
    let address = Address::from_str(address.trim()).map_err(|e| e.to_string())?;
    Ok((address, name.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger.
    // Set the log level by setting the RUST_LOG environment variable.
    // tracing_subscriber also shows the jsonrpsee log spans.
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    debug!(
        "Settings: port {}, rpc {}, store {}, target chain {}",
        args.port,
        args.rpc_url,
        args.store_path.display(),
        args.target_chain_id
    );

    // Start the metrics server.
    // We just let it gracelessly get killed at the end of main()
    tokio::spawn(metrics::run_server(args.metrics_port));

    let signer = PrivateKeySigner::from_str(&args.private_key)?;
    info!("Retailer address: {:#40x}", signer.address());

    let wallet = RpcWallet::connect(args.rpc_url.parse()?, signer);
    let chain_id = wallet.chain_id().await?;
    let contract_address = match args.contract_address {
        Some(address) => Some(address),
        None => match network::contract_address(chain_id) {
            Ok(address) => Some(address),
            Err(e) => {
                warn!("{e}. Contract receipts are disabled");
                None
            }
        },
    };
    let contract =
        contract_address.map(|address| VaultContract::new(address, wallet.provider().clone()));
    let wallet = wallet.with_contract(contract);

    let history = (!args.disable_history)
        .then(|| EtherscanClient::new(args.etherscan_api_url, args.etherscan_api_key));
    let context = ServiceContext::new(JsonFileStore::new(args.store_path), history, wallet.clone());

    let directory = args
        .retailers
        .into_iter()
        .fold(RetailerDirectory::default(), |directory, (address, name)| {
            directory.with_retailer(address, name)
        });

    let sessions = SessionManager::new(Some(wallet));
    sessions.connect().await?;
    let account_watch = sessions.watch_account_changes();

    let submitter = Arc::new(Submitter::new(
        context.clone(),
        SubmitterConfig {
            target_chain_id: args.target_chain_id,
        },
    ));
    let feed = ReceiptFeed::new(Reconciler::new(context, directory));
    let refresh_loop = spawn_refresh_loop(
        feed.clone(),
        sessions.subscribe(),
        submitter.subscribe(),
        FeedConfig {
            poll_interval: Duration::from_secs(args.poll_interval_secs),
            issuance_delay: Duration::from_millis(args.issuance_delay_ms),
        },
    );

    // Notifications have no UI to go to, they end up in the logs.
    let mut notifications = feed.notifications();
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(n) if n.level == NotificationLevel::Error => {
                    error!("{}: {}", n.title, n.message)
                }
                Ok(n) => info!("{}: {}", n.title, n.message),
                Err(RecvError::Lagged(missed)) => warn!("Missed {missed} notifications"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Start the JSON-RPC server.
    // This await is non-blocking
    let (handle, _) = server::run_server(
        args.port,
        sessions,
        submitter,
        feed,
        args.max_request_body_size,
        args.max_response_body_size,
        args.max_connections,
    )
    .await?;
    info!("Server started. Listening on port {}.", args.port);

    let _ = handle.await;

    // If we're here, we've received a signal to exit.
    info!("Shutting down...");
    refresh_loop.abort();
    if let Some(account_watch) = account_watch {
        account_watch.abort();
    }
    Ok(())
}
