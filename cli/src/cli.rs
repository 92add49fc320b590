//! # CLI Interface
//!
//! Command-line structure for `ledger-cli`, defined with `clap` derive.
//! Subcommands: `enroll`, `invoke`, `query` and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Client for a permissioned ledger network.
///
/// Enrolls users with the membership service, sends chaincode proposals to
/// the configured peers, and submits endorsed transactions for ordering.
#[derive(Parser, Debug)]
#[command(
    name = "ledger-cli",
    about = "Submit chaincode transactions to a permissioned ledger network",
    version,
    propagate_version = true
)]
pub struct LedgerCli {
    /// Path to the client configuration file (TOML).
    #[arg(long, short = 'c', env = "LEDGER_CONFIG", default_value = "ledger.toml", global = true)]
    pub config: PathBuf,

    /// Directory holding persisted user records. Keys go to its `keystore`
    /// subdirectory unless the config names a keystore path.
    #[arg(long, env = "LEDGER_STATE_DIR", default_value = ".ledger", global = true)]
    pub state_dir: PathBuf,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "LEDGER_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enroll a user with the membership service and persist it.
    Enroll(EnrollArgs),
    /// Endorse a chaincode invocation and submit it for ordering.
    Invoke(InvokeArgs),
    /// Endorse a chaincode invocation and print the peers' responses
    /// without submitting it.
    Query(InvokeArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct EnrollArgs {
    /// Enrollment id registered with the membership service.
    #[arg(long)]
    pub id: String,

    /// Enrollment secret.
    #[arg(long, env = "LEDGER_ENROLL_SECRET")]
    pub secret: String,
}

#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Name of a previously enrolled user.
    #[arg(long, short = 'u')]
    pub user: String,

    /// Chain (channel) to submit on.
    #[arg(long, default_value = "testchainid")]
    pub chain: String,

    /// Chaincode name.
    #[arg(long = "chaincode", short = 'n')]
    pub chaincode_id: String,

    /// Wait for the commit event before exiting. Ignored by `query`.
    #[arg(long)]
    pub wait: bool,

    /// Print the SDK metrics in Prometheus text format when done.
    #[arg(long)]
    pub metrics: bool,

    /// Chaincode arguments, function name first.
    #[arg(required = true, last = true)]
    pub args: Vec<String>,
}
