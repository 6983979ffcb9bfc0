//! Create wallet command.

use tollbooth_crypto::{address_from_public_key, generate_identity};
use tracing::info;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{KeygenOutput, OutputFormat, Render};

/// Execute the keygen command.
pub fn keygen(config: CliConfig, format: OutputFormat, force: bool) -> CliResult<String> {
    let keyfile = &config.wallet.keyfile;
    if keyfile.exists() && !force {
        return Err(CliError::WalletExists(keyfile.display().to_string()));
    }

    let (private_key, public_key) = generate_identity();
    let address = address_from_public_key(&public_key);

    if let Some(parent) = keyfile.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(keyfile, hex::encode(private_key.as_bytes()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(keyfile, std::fs::Permissions::from_mode(0o600))?;
    }
    info!(address = %address, keyfile = %keyfile.display(), "Wallet created");

    let output = KeygenOutput {
        address: address.to_string(),
        keyfile: keyfile.display().to_string(),
    };
    Ok(output.render(format))
}
