//! Wallet loading shared by commands.

use std::path::Path;

use tollbooth_x402::LocalWallet;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Load the configured wallet.
///
/// # Errors
/// - `WalletNotInitialized` if the key file does not exist
pub fn load_wallet(config: &CliConfig) -> CliResult<LocalWallet> {
    let keyfile = &config.wallet.keyfile;
    if !keyfile.exists() {
        return Err(CliError::WalletNotInitialized);
    }
    read_wallet(keyfile)
}

/// Load the configured wallet if one exists.
pub fn try_load_wallet(config: &CliConfig) -> CliResult<Option<LocalWallet>> {
    let keyfile = &config.wallet.keyfile;
    if !keyfile.exists() {
        return Ok(None);
    }
    read_wallet(keyfile).map(Some)
}

fn read_wallet(keyfile: &Path) -> CliResult<LocalWallet> {
    let secret = std::fs::read_to_string(keyfile)?;
    Ok(LocalWallet::from_hex(secret.trim())?)
}
