//! Nullifier lookup command.

use tollbooth_store::SqliteNullifierLedger;
use tollbooth_x402::nullifier::normalize_nullifier;
use tollbooth_x402::NullifierLedger;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{NullifierOutput, OutputFormat, Render};

/// Execute the nullifier command.
pub fn nullifier(config: CliConfig, format: OutputFormat, value: &str) -> CliResult<String> {
    let ledger = SqliteNullifierLedger::open(config.nullifier_db())?;
    let consumed_at = ledger.consumed_at(value)?;

    let output = NullifierOutput {
        nullifier: normalize_nullifier(value),
        spent: consumed_at.is_some(),
        consumed_at,
        total_consumed: ledger.len()?,
    };
    Ok(output.render(format))
}
