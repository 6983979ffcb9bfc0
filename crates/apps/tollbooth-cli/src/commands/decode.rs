//! Decode payment header command.

use tollbooth_x402::types::decode_header;
use tollbooth_x402::{PaymentPayload, PaymentRequirements, SettlementResponse};

use crate::cli::HeaderKind;
use crate::error::CliResult;
use crate::output::{DecodeOutput, OutputFormat, Render};

/// Execute the decode command.
///
/// The value is parsed into its typed form before display, so a header that
/// decodes to JSON of the wrong shape is rejected.
pub fn decode(format: OutputFormat, header: &str, kind: HeaderKind) -> CliResult<String> {
    let (label, value) = match kind {
        HeaderKind::Payload => {
            let payload = PaymentPayload::from_header(header)?;
            ("payment payload", serde_json::to_value(payload)?)
        }
        HeaderKind::Requirements => {
            let accepts: Vec<PaymentRequirements> = decode_header(header)?;
            ("payment requirements", serde_json::to_value(accepts)?)
        }
        HeaderKind::Settlement => {
            let settlement = SettlementResponse::from_header(header)?;
            ("settlement response", serde_json::to_value(settlement)?)
        }
    };

    let output = DecodeOutput {
        kind: label.to_string(),
        value,
    };
    Ok(output.render(format))
}
