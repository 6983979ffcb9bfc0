//! Tollbooth CLI binary entry point.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tollbooth_cli::{
    cli::{Cli, Commands},
    commands,
    config::{default_config_path, CliConfig},
    error::{CliError, CliResult},
    output::OutputFormat,
};

fn main() {
    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            let err = CliError::from(e);
            print_error(&err);
            std::process::exit(err.exit_code());
        }
    };
    rt.block_on(async_main(cli));
}

async fn async_main(cli: Cli) {
    // Initialize logging based on --verbose flag or RUST_LOG env var
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if cli.verbose || has_rust_log {
        let mut filter = EnvFilter::from_default_env();
        if cli.verbose {
            if let Ok(directive) = "tollbooth=debug".parse() {
                filter = filter.add_directive(directive);
            }
        }
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    match run(cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            print_error(&e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Print a user-friendly error message with exit code and recovery hint.
fn print_error(e: &CliError) {
    eprintln!(
        "{} [{}]: {}",
        "Error".red().bold(),
        e.exit_code().to_string().yellow(),
        e
    );

    if let Some(hint) = e.hint() {
        eprintln!("{}: {}", "Hint".cyan(), hint);
    }
}

async fn run(cli: Cli) -> CliResult<String> {
    // Load configuration
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = CliConfig::load(&config_path)?;

    // Get output format
    let format: OutputFormat = cli.format.into();

    // Dispatch command
    match cli.command {
        // Wallet commands
        Commands::Keygen { force } => commands::keygen(config, format, force),

        Commands::Whoami => commands::whoami(config, format),

        // Server commands
        Commands::Route { method, path } => commands::route(config, format, &method, &path),

        Commands::Nullifier { nullifier } => commands::nullifier(config, format, &nullifier),

        // Client commands
        Commands::Decode { header, kind } => commands::decode(format, &header, kind),

        Commands::Pay {
            url,
            method,
            data,
            scheme,
        } => {
            commands::pay(
                config,
                format,
                &url,
                &method,
                data,
                scheme.map(Into::into),
            )
            .await
        }
    }
}
