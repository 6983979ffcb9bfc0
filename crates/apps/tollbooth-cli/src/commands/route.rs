//! Route lookup command.

use tollbooth_x402::PaymentGate;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{OutputFormat, Render, RouteOutput};

/// Execute the route command.
pub fn route(config: CliConfig, format: OutputFormat, method: &str, path: &str) -> CliResult<String> {
    let gate = PaymentGate::new(config.x402)?;
    let requirement = gate.requirements_for(method, path);

    let output = RouteOutput {
        method: method.to_ascii_uppercase(),
        path: path.to_string(),
        metered: requirement.is_some(),
        requirement,
    };
    Ok(output.render(format))
}
