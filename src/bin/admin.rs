//! Homebase Admin CLI
//!
//! Read-only inspection of the server's change ledger.
//!
//! # Usage
//!
//! ```bash
//! homebase-admin ledger stats
//! homebase-admin ledger tail --limit 50
//! homebase-admin ledger tail --tenant 7c9e6679-7425-40de-944b-e07fc1f90ae7
//! ```
//!
//! # Environment Variables
//!
//! - `HOMEBASE_DATABASE_PATH`: SQLite database file
//! - `HOMEBASE_CONFIG`: Path to config file

use clap::{Args, Parser, Subcommand};
use homebase::db::{init_db, ChangeLedger};
use homebase::Config;
use std::path::PathBuf;
use uuid::Uuid;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "homebase-admin")]
#[command(version)]
#[command(about = "Homebase server administration tool")]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the change ledger
    Ledger(LedgerCommand),
}

#[derive(Args)]
struct LedgerCommand {
    #[command(subcommand)]
    command: LedgerSubcommand,
}

#[derive(Subcommand)]
enum LedgerSubcommand {
    /// Show entry counts and the latest ledger id
    Stats,
    /// Show the most recent entries, newest first
    Tail {
        /// Number of entries to show
        #[arg(long, short, default_value_t = 20)]
        limit: i64,
        /// Only entries owned by this tenant
        #[arg(long, short)]
        tenant: Option<Uuid>,
    },
}

// ============================================================================
// Commands
// ============================================================================

async fn ledger_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_db(&config.database_path).await?;
    let mut conn = pool.acquire().await?;
    let stats = ChangeLedger::stats(&mut conn).await?;

    println!("Database: {}", config.database_path.display());
    println!("Entries: {}", stats.count);
    match stats.latest_id {
        Some(id) => println!("Latest id: {}", id),
        None => println!("Latest id: -"),
    }

    if !stats.by_kind.is_empty() {
        println!();
        println!("{:<20} {:>10}", "KIND", "ENTRIES");
        println!("{}", "-".repeat(31));
        for (kind, count) in &stats.by_kind {
            println!("{:<20} {:>10}", kind, count);
        }
    }

    Ok(())
}

async fn ledger_tail(
    config: &Config,
    limit: i64,
    tenant: Option<Uuid>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_db(&config.database_path).await?;
    let mut conn = pool.acquire().await?;
    let entries = ChangeLedger::tail(&mut conn, limit.max(1), tenant).await?;

    if entries.is_empty() {
        println!("No ledger entries.");
        return Ok(());
    }

    println!(
        "{:>8}  {:<36} {:<8} {:<16} {:<36}  {:<36}",
        "ID", "TIMESTAMP", "OP", "KIND", "ENTITY", "TENANT"
    );
    println!("{}", "-".repeat(146));

    for entry in &entries {
        println!(
            "{:>8}  {:<36} {:<8} {:<16} {:<36}  {:<36}",
            entry.id,
            entry.timestamp.to_rfc3339(),
            entry.operation,
            entry.entity_kind,
            entry.entity_id,
            entry
                .tenant_id
                .map(|t| t.to_string())
                .unwrap_or_else(|| "(global)".to_string())
        );
    }

    println!();
    println!("Shown: {} entr(ies)", entries.len());

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Ledger(ledger_cmd) => match ledger_cmd.command {
            LedgerSubcommand::Stats => ledger_stats(&config).await,
            LedgerSubcommand::Tail { limit, tenant } => ledger_tail(&config, limit, tenant).await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
