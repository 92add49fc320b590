// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger CLI
//!
//! Entry point for the `ledger-cli` binary. Loads the client configuration,
//! initializes logging, and drives the SDK through one submission:
//!
//! - `enroll`: obtain and persist credentials for a user
//! - `invoke`: endorse, assemble and broadcast a chaincode transaction
//! - `query`: endorse only and print the peers' responses
//! - `version`: print build version information

mod cli;
mod logging;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use ledger_sdk::config::{ClientConfig, PeerConfig, SIGNING_ALGORITHM};
use ledger_sdk::events::{EventHub, TcpEventSource};
use ledger_sdk::identity::HttpEnrollmentClient;
use ledger_sdk::store::FileKeyValueStore;
use ledger_sdk::transaction::collect_responses;
use ledger_sdk::transport::{OrdererClient, Peer};
use ledger_sdk::{Chain, Client};

use cli::{Commands, EnrollArgs, InvokeArgs, LedgerCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LedgerCli::parse();

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    let config = ClientConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    logging::init_logging(&config.logging.level, LogFormat::from_str_lossy(&cli.log_format));

    let client = open_client(config, &cli.state_dir)?;
    match cli.command {
        Commands::Enroll(args) => enroll(&client, args).await,
        Commands::Invoke(args) => invoke(&client, args).await,
        Commands::Query(args) => query(&client, args).await,
        Commands::Version => Ok(()),
    }
}

/// Builds the client with a file-backed state store under `state_dir`.
/// Keys land in `state_dir/keystore` unless the config names a keystore.
fn open_client(mut config: ClientConfig, state_dir: &Path) -> Result<Client> {
    if config.keystore.path.is_empty() {
        config.keystore.path = state_dir.join("keystore").to_string_lossy().into_owned();
    }
    let client = Client::from_config(config).context("failed to build client")?;

    let users = state_dir.join("users");
    let store = FileKeyValueStore::new(&users)
        .with_context(|| format!("failed to open state store at {}", users.display()))?;
    client.set_state_store(Arc::new(store));
    Ok(client)
}

async fn enroll(client: &Client, args: EnrollArgs) -> Result<()> {
    let enroller = HttpEnrollmentClient::from_config(&client.config().msp)?;
    let user = client
        .enroll_user(&enroller, &args.id, &args.secret)
        .await
        .with_context(|| format!("failed to enroll '{}'", args.id))?;
    println!("enrolled {}", user.name());
    Ok(())
}

/// Loads the user and wires the configured peers and orderer into a chain.
fn prepare_chain(client: &Client, args: &InvokeArgs) -> Result<(Arc<Chain>, Vec<PeerConfig>)> {
    if client.load_user_context(&args.user)?.is_none() {
        bail!("user '{}' is not enrolled; run `ledger-cli enroll` first", args.user);
    }

    let config = client.config();
    let peers = config.peers()?;
    if peers.is_empty() {
        bail!("no peers configured; add a [[peers]] section to the config");
    }
    let chain = client.new_chain(&args.chain)?;
    for peer in &peers {
        chain.add_peer(Arc::new(Peer::from_config(peer, &config.timeouts)));
    }
    chain.add_orderer(Arc::new(OrdererClient::from_config(
        &config.orderer,
        &config.timeouts,
    )));
    Ok((chain, peers))
}

async fn invoke(client: &Client, args: InvokeArgs) -> Result<()> {
    let (chain, peers) = prepare_chain(client, &args)?;

    let hub = if args.wait {
        let hub = EventHub::with_metrics(client.metrics().clone());
        let peer = &peers[0];
        hub.set_peer_addr(peer.event_address());
        hub.set_event_source(Arc::new(TcpEventSource::from_config(
            peer,
            &client.config().timeouts,
        )));
        hub.connect().await.context("failed to connect event hub")?;
        Some(hub)
    } else {
        None
    };

    let (signed, proposal, tx_id) =
        chain.create_transaction_proposal(&args.chaincode_id, &args.chain, &args.args)?;
    let committed = hub.as_ref().and_then(|h| h.watch_tx(&tx_id));

    let results = chain.send_transaction_proposal(&signed, 0).await?;
    for (url, result) in &results {
        if let Err(e) = &result.outcome {
            tracing::warn!(peer = %url, error = %e, "endorsement failed");
        }
    }
    let tx = chain.create_transaction(&proposal, &collect_responses(results))?;

    let sent = chain.send_transaction(&proposal, &tx).await?;
    let failed: Vec<String> = sent
        .values()
        .filter_map(|r| r.outcome.as_ref().err().map(|e| e.to_string()))
        .collect();
    if failed.len() == sent.len() {
        bail!("no orderer accepted transaction {tx_id}: {}", failed.join("; "));
    }

    if let Some(committed) = committed {
        let limit = client.config().timeouts.event();
        match tokio::time::timeout(limit, committed).await {
            Ok(Ok(Ok(()))) => tracing::info!(%tx_id, "transaction committed"),
            Ok(Ok(Err(reason))) => bail!("transaction {tx_id} was rejected: {reason}"),
            Ok(Err(_)) => bail!("event hub closed before transaction {tx_id} was seen"),
            Err(_) => bail!("no commit event for transaction {tx_id} within {limit:?}"),
        }
    }
    if let Some(hub) = hub {
        hub.disconnect();
    }

    println!("{tx_id}");
    print_metrics(client, args.metrics)
}

async fn query(client: &Client, args: InvokeArgs) -> Result<()> {
    let (chain, _) = prepare_chain(client, &args)?;
    let (signed, _, tx_id) =
        chain.create_transaction_proposal(&args.chaincode_id, &args.chain, &args.args)?;
    tracing::debug!(%tx_id, "query proposal created");

    let mut results: Vec<_> = chain
        .send_transaction_proposal(&signed, 0)
        .await?
        .into_iter()
        .collect();
    results.sort_by(|a, b| a.0.cmp(&b.0));
    for (url, result) in results {
        match &result.outcome {
            Ok(resp) => println!(
                "{url}: status={} payload={}",
                resp.response.status,
                String::from_utf8_lossy(&resp.response.payload)
            ),
            Err(e) => println!("{url}: error={e}"),
        }
    }
    print_metrics(client, args.metrics)
}

fn print_metrics(client: &Client, enabled: bool) -> Result<()> {
    if enabled {
        print!("{}", client.metrics().encode()?);
    }
    Ok(())
}

fn print_version() {
    println!("ledger-cli {}", env!("CARGO_PKG_VERSION"));
    println!("ledger-sdk signing: {SIGNING_ALGORITHM}");
}
