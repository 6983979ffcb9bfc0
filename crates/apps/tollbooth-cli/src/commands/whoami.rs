//! Show wallet information command.

use tollbooth_crypto::public_key_from_private;
use tollbooth_x402::WalletSigner;

use crate::config::CliConfig;
use crate::context::load_wallet;
use crate::error::CliResult;
use crate::output::{OutputFormat, Render, WhoamiOutput};

/// Execute the whoami command.
pub fn whoami(config: CliConfig, format: OutputFormat) -> CliResult<String> {
    let wallet = load_wallet(&config)?;
    let public_key = public_key_from_private(wallet.private_key());

    let output = WhoamiOutput {
        address: wallet.address().to_string(),
        public_key: format!("0x{}", hex::encode(public_key.as_bytes())),
        keyfile: config.wallet.keyfile.display().to_string(),
    };
    Ok(output.render(format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::keygen::keygen;
    use crate::commands::test_support::setup_config;
    use crate::error::CliError;
    use tempfile::TempDir;

    #[test]
    fn test_whoami_after_keygen() {
        let temp_dir = TempDir::new().unwrap();
        let config = setup_config(&temp_dir);

        keygen(config.clone(), OutputFormat::Human, false).unwrap();

        let output = whoami(config, OutputFormat::Human).unwrap();
        assert!(output.contains("Address"));
        assert!(output.contains("Public Key"));
    }

    #[test]
    fn test_whoami_json() {
        let temp_dir = TempDir::new().unwrap();
        let config = setup_config(&temp_dir);
        keygen(config.clone(), OutputFormat::Human, false).unwrap();

        let output = whoami(config, OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert!(json["public_key"].as_str().unwrap().starts_with("0x"));
        assert_eq!(json["public_key"].as_str().unwrap().len(), 66);
    }

    #[test]
    fn test_whoami_without_wallet() {
        let temp_dir = TempDir::new().unwrap();
        let config = setup_config(&temp_dir);
        assert!(matches!(
            whoami(config, OutputFormat::Human),
            Err(CliError::WalletNotInitialized)
        ));
    }
}
