//! QuickDrop CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Create or upgrade the storefront schema
//! qd-cli migrate
//!
//! # Insert the default catalog into an empty product table
//! qd-cli seed
//!
//! # Delete expired checkout passcodes
//! qd-cli otp purge
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run the embedded storefront migrations
//! - `seed` - Insert default catalog products that are not there yet
//! - `otp purge` - Remove passcodes whose validity window has closed

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "qd-cli")]
#[command(author, version, about = "QuickDrop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the product table with the default catalog
    Seed,
    /// Passcode maintenance
    Otp {
        #[command(subcommand)]
        action: OtpAction,
    },
}

#[derive(Subcommand)]
enum OtpAction {
    /// Delete expired passcodes
    Purge {
        /// Give up if the database does not answer within this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qd_cli=info,quickdrop_storefront=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => {
            commands::seed::catalog().await?;
        }
        Commands::Otp { action } => match action {
            OtpAction::Purge { timeout_secs } => {
                commands::otp::purge(std::time::Duration::from_secs(timeout_secs)).await?;
            }
        },
    }
    Ok(())
}
