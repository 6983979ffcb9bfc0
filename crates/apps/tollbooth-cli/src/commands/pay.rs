//! Paid request command.

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use tollbooth_x402::{PaymentClient, PaymentScheme, ReqwestTransport, RequestOptions, WalletSigner};
use tracing::debug;

use crate::config::CliConfig;
use crate::context::try_load_wallet;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, PayOutput, Render};

/// Execute the pay command.
///
/// Without a wallet the request is still sent; a 402 then surfaces as a
/// payment-required error.
pub async fn pay(
    config: CliConfig,
    format: OutputFormat,
    url: &str,
    method: &str,
    data: Option<String>,
    scheme: Option<PaymentScheme>,
) -> CliResult<String> {
    let options = request_options(method, data)?;

    let transport = ReqwestTransport::with_timeout(Duration::from_secs(config.http.timeout_secs))?;
    let mut client_config = config.client.clone();
    if let Some(scheme) = scheme {
        client_config.preferred_scheme = scheme;
    }
    let mut client = PaymentClient::new(transport).with_config(client_config);
    match try_load_wallet(&config)? {
        Some(wallet) => {
            debug!(address = %wallet.address(), "Paying with local wallet");
            client = client.with_signer(Arc::new(wallet) as Arc<dyn WalletSigner>);
        }
        None => debug!("No wallet configured, sending unpaid request"),
    }

    let response = client.request(url, options).await?;
    let output = PayOutput {
        status: response.status.as_u16(),
        payment_required: response.payment_required,
        payment_made: response.payment_made,
        body: response.text(),
        settlement: response.settlement,
    };
    Ok(output.render(format))
}

fn request_options(method: &str, data: Option<String>) -> CliResult<RequestOptions> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| CliError::user(format!("Invalid HTTP method: {}", method)))?;
    let options = match data {
        Some(body) => RequestOptions::post_json(body),
        None => RequestOptions::get(),
    };
    Ok(options.method(method))
}
