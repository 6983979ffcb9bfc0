//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tollbooth_x402::PaymentScheme;

use crate::output::OutputFormat;

/// Tollbooth x402 payment CLI.
#[derive(Parser, Debug)]
#[command(name = "tollbooth")]
#[command(author = "Tollbooth Contributors")]
#[command(version)]
#[command(about = "Command-line interface for x402 micropayments")]
#[command(
    long_about = "Tollbooth negotiates HTTP 402 payments with signed amounts or commitment proofs.\n\nRun 'tollbooth keygen' to create a wallet."
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (human or json).
    #[arg(short, long, global = true, default_value = "human")]
    pub format: OutputFormatArg,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output format argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormatArg {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Payment scheme argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SchemeArg {
    /// Signed amount.
    Exact,
    /// Commitment and nullifier proof.
    ZkExact,
}

impl From<SchemeArg> for PaymentScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Exact => PaymentScheme::Exact,
            SchemeArg::ZkExact => PaymentScheme::ZkExact,
        }
    }
}

/// Header kinds understood by `decode`.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum HeaderKind {
    /// `PAYMENT-SIGNATURE` / `X-PAYMENT` payload.
    #[default]
    Payload,
    /// `PAYMENT-REQUIRED` requirement list.
    Requirements,
    /// `PAYMENT-RESPONSE` settlement receipt.
    Settlement,
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // =========================================================================
    // Wallet Commands
    // =========================================================================
    /// Create a new wallet key.
    Keygen {
        /// Overwrite an existing key.
        #[arg(long)]
        force: bool,
    },

    /// Show the wallet address.
    Whoami,

    // =========================================================================
    // Server Commands
    // =========================================================================
    /// Show what a request to METHOD PATH would have to pay.
    Route {
        /// HTTP method.
        method: String,

        /// Request path.
        path: String,
    },

    /// Look up a nullifier in the durable ledger.
    Nullifier {
        /// Nullifier as carried in the payment.
        nullifier: String,
    },

    // =========================================================================
    // Client Commands
    // =========================================================================
    /// Decode a base64 payment header.
    Decode {
        /// Header value.
        header: String,

        /// Which header the value came from.
        #[arg(short, long, value_enum, default_value = "payload")]
        kind: HeaderKind,
    },

    /// Send a request, paying if the server answers 402.
    Pay {
        /// Target URL.
        url: String,

        /// HTTP method.
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// JSON request body.
        #[arg(short, long)]
        data: Option<String>,

        /// Preferred scheme when several are offered.
        #[arg(short, long, value_enum)]
        scheme: Option<SchemeArg>,
    },
}
