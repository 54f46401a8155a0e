//! Sundry CLI - database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! sundry-cli migrate
//!
//! # Fold legacy voucher redemption rows into one record per customer and voucher
//! sundry-cli vouchers consolidate [--dry-run]
//!
//! # Apply time-based order transitions once
//! sundry-cli orders sweep
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sundry-cli")]
#[command(author, version, about = "Sundry CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Voucher maintenance
    Vouchers {
        #[command(subcommand)]
        action: VoucherAction,
    },
    /// Order maintenance
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum VoucherAction {
    /// Merge legacy redemption rows into one record per customer and voucher
    Consolidate {
        /// Report what would change, then roll back
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Mark overdue payments and auto-complete delivered orders
    Sweep,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Vouchers { action } => match action {
            VoucherAction::Consolidate { dry_run } => {
                commands::vouchers::consolidate(dry_run).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrderAction::Sweep => commands::orders::sweep().await?,
        },
    }
    Ok(())
}
