//! Command-line interface for Tollbooth x402 payments.
//!
//! This crate provides the `tollbooth` binary. It includes commands for:
//!
//! - **Wallet**: create a key and show its address
//! - **Server**: inspect what a route charges and look up spent nullifiers
//! - **Client**: decode payment headers and make paid requests
//!
//! # Quick Start
//!
//! ```bash
//! # Create a wallet
//! tollbooth keygen
//!
//! # Call a metered endpoint, paying with a commitment proof
//! tollbooth pay https://api.example.com/api/agents/run -X POST --data '{}'
//!
//! # Inspect the receipt header
//! tollbooth decode <PAYMENT-RESPONSE value> --kind settlement
//! ```
//!
//! # Output Formats
//!
//! All commands support `--format`:
//!
//! - `human` (default): Human-readable with colors
//! - `json`: Machine-readable JSON
//!
//! # Configuration
//!
//! Configuration is loaded from `~/.tollbooth/config.toml`. Override with `--config`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;

// Re-export main types
pub use cli::{Cli, Commands, HeaderKind, OutputFormatArg, SchemeArg};
pub use config::CliConfig;
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, Render};
