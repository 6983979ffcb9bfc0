//! Output formatting for CLI.

use colored::Colorize;
use serde::Serialize;
use tollbooth_x402::{PaymentRequirements, SettlementResponse};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use 'human' or 'json'.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Trait for renderable output.
pub trait Render: Serialize {
    /// Render as human-readable string.
    fn render_human(&self) -> String;

    /// Render as JSON string.
    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Render in the specified format.
    fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Human => self.render_human(),
            OutputFormat::Json => self.render_json(),
        }
    }
}

// =============================================================================
// Output Types
// =============================================================================

/// Output for wallet creation.
#[derive(Debug, Serialize)]
pub struct KeygenOutput {
    pub address: String,
    pub keyfile: String,
}

impl Render for KeygenOutput {
    fn render_human(&self) -> String {
        format!(
            "{} {}\n{} {}",
            "Wallet created:".green().bold(),
            self.address,
            "Key saved to:".green(),
            self.keyfile
        )
    }
}

/// Output for the whoami command.
#[derive(Debug, Serialize)]
pub struct WhoamiOutput {
    pub address: String,
    pub public_key: String,
    pub keyfile: String,
}

impl Render for WhoamiOutput {
    fn render_human(&self) -> String {
        format!(
            "{}    {}\n{} {}\n{}   {}",
            "Address:".bold(),
            self.address,
            "Public Key:".bold(),
            self.public_key,
            "Key file:".bold(),
            self.keyfile
        )
    }
}

/// Output for a route lookup.
#[derive(Debug, Serialize)]
pub struct RouteOutput {
    pub method: String,
    pub path: String,
    pub metered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement: Option<PaymentRequirements>,
}

impl Render for RouteOutput {
    fn render_human(&self) -> String {
        let target = format!("{} {}", self.method, self.path);
        match &self.requirement {
            None => format!("{} {}", target.bold(), "is free".green()),
            Some(req) => {
                let mut lines = vec![
                    format!("{} {}", target.bold(), "requires payment".yellow()),
                    format!("  Price:    {}", req.max_amount_required),
                    format!("  Scheme:   {}", req.scheme),
                    format!("  Network:  {}", req.network),
                    format!("  Pay to:   {}", req.pay_to),
                    format!("  Resource: {}", req.resource),
                ];
                if !req.description.is_empty() {
                    lines.push(format!("  About:    {}", req.description));
                }
                if let Some(contract) = &req.contract_address {
                    lines.push(format!("  Contract: {}", contract));
                }
                lines.join("\n")
            }
        }
    }
}

/// Output for a decoded header.
#[derive(Debug, Serialize)]
pub struct DecodeOutput {
    pub kind: String,
    pub value: serde_json::Value,
}

impl Render for DecodeOutput {
    fn render_human(&self) -> String {
        format!(
            "{} {}\n{}",
            "Decoded".bold(),
            self.kind.cyan(),
            serde_json::to_string_pretty(&self.value).unwrap_or_default()
        )
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(&self.value).unwrap_or_default()
    }
}

/// Output for a paid request.
#[derive(Debug, Serialize)]
pub struct PayOutput {
    pub status: u16,
    pub payment_required: bool,
    pub payment_made: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementResponse>,
    pub body: String,
}

impl Render for PayOutput {
    fn render_human(&self) -> String {
        let status = if self.status < 400 {
            self.status.to_string().green()
        } else {
            self.status.to_string().red()
        };
        let mut lines = vec![format!("{} {}", "Status:".bold(), status)];

        if self.payment_made {
            lines.push(format!("{} yes", "Paid:".bold()));
        }
        match &self.settlement {
            Some(s) if s.success => {
                let receipt = s
                    .tx_hash
                    .as_deref()
                    .or(s.receipt.as_deref())
                    .unwrap_or("-");
                lines.push(format!("{} {}", "Settled:".bold(), receipt));
            }
            Some(s) => lines.push(format!(
                "{} {}",
                "Settlement failed:".red().bold(),
                s.error.as_deref().unwrap_or("unknown error")
            )),
            None => {}
        }
        if !self.body.is_empty() {
            lines.push(String::new());
            lines.push(self.body.clone());
        }
        lines.join("\n")
    }
}

/// Output for a nullifier lookup.
#[derive(Debug, Serialize)]
pub struct NullifierOutput {
    pub nullifier: String,
    pub spent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<u64>,
    pub total_consumed: usize,
}

impl Render for NullifierOutput {
    fn render_human(&self) -> String {
        let state = if self.spent {
            "spent".red().bold()
        } else {
            "unspent".green().bold()
        };
        let mut out = format!("{} {}", self.nullifier, state);
        if let Some(at) = self.consumed_at {
            out.push_str(&format!("\n  Consumed at: {}", at));
        }
        out.push_str(&format!("\n  Ledger size: {}", self.total_consumed));
        out
    }
}
