//! Siege - Development Tools

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "siege-tools")]
#[command(about = "Development tools for the siege realm backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a catalog file
    Validate {
        /// Path to a RON catalog
        path: String,
    },
    /// Run a scenario script and print the report as JSON
    Scenario {
        /// Path to a RON scenario
        path: String,
        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating catalog: {path}");
            siege_tools::validate::validate_catalog_file(std::path::Path::new(&path)).and_then(
                |summary| {
                    tracing::info!("Validation passed");
                    print_json(&summary, true)
                },
            )
        }
        Commands::Scenario { path, pretty } => {
            tracing::info!("Running scenario: {path}");
            siege_tools::scenario::Scenario::load(&path)
                .and_then(|scenario| scenario.run())
                .and_then(|report| print_json(&report, pretty))
        }
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> siege_tools::error::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
