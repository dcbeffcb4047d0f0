//! # Billbook CLI
//!
//! Command-line front end for a single-user Billbook install.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          billbook <command>                             │
//! │                                                                         │
//! │  CliConfig::load ──► StaticIdentity ──► TenantId                       │
//! │                                             │                           │
//! │  Database::new(DbConfig) ◄──────────────────┘                          │
//! │       │                                                                 │
//! │       ├── export / import          ──► BackupService                   │
//! │       ├── overdue / due-soon       ──► InvoiceRepository + payment     │
//! │       ├── mark-paid / mark-unpaid  ──► InvoiceRepository               │
//! │       ├── next-number              ──► SequenceRepository              │
//! │       ├── clients / invoices       ──► Client/InvoiceRepository        │
//! │       ├── courses                  ──► CourseRepository                │
//! │       └── dashboard                ──► analytics                       │
//! │                                                                         │
//! │  Results go to stdout as JSON; logs go to stderr.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! billbook export --output backup.json
//! billbook import backup.json --clear
//! BILLBOOK_LOG=debug billbook overdue
//! ```

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use billbook_core::{analytics, payment, Identity, StaticIdentity, TenantId};
use billbook_db::{Database, DbConfig};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "billbook", version, about = "Invoices, payments and backups for a small training business")]
struct Cli {
    /// Optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides BILLBOOK_DATABASE_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Credential to present; must name the configured user
    #[arg(long, global = true)]
    credential: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a backup of all clients and invoices
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore a backup file
    Import {
        file: PathBuf,
        /// Delete this user's clients and invoices first
        #[arg(long)]
        clear: bool,
    },
    /// Overdue invoices, most overdue first
    Overdue,
    /// Pending invoices due within the horizon
    DueSoon {
        /// Horizon in days (defaults to BILLBOOK_DUE_SOON_DAYS)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Show the next invoice number without using it
    NextNumber,
    /// List clients
    Clients {
        /// Case-insensitive name search
        #[arg(long)]
        search: Option<String>,
        /// Include invoice counts
        #[arg(long, conflicts_with = "search")]
        counts: bool,
    },
    /// List invoices
    Invoices {
        /// Only this client's invoices
        #[arg(long)]
        client: Option<String>,
    },
    /// Record payment of an invoice
    MarkPaid {
        id: String,
        /// Payment method when the invoice has none
        #[arg(long)]
        method: Option<String>,
    },
    /// Reverse a recorded payment
    MarkUnpaid { id: String },
    /// Revenue and status summary
    Dashboard,
    /// List course names, or add one
    Courses {
        #[arg(long)]
        add: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(db) = cli.db.clone() {
        config.database_path = db;
    }
    debug!(?config, "Configuration loaded");

    let identity = StaticIdentity::new(config.tenant()?);
    let tenant = identity.authenticate(cli.credential.as_deref())?;

    let db = Database::new(DbConfig::new(&config.database_path).max_connections(config.max_connections))
        .await
        .with_context(|| format!("opening {}", config.database_path.display()))?;

    let result = run(&db, &tenant, &config, cli.command).await;
    db.close().await;
    result
}

/// Logs go to stderr; `BILLBOOK_LOG` wins over `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("BILLBOOK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(db: &Database, tenant: &TenantId, config: &CliConfig, command: Command) -> Result<()> {
    let now = db.now();

    match command {
        Command::Export { output } => {
            let backup = db.backup(tenant).export().await?;
            let json = serde_json::to_string_pretty(&backup)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "Backup written");
                }
                None => println!("{json}"),
            }
        }

        Command::Import { file, clear } => {
            let json = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let stats = db.backup(tenant).import_json(&json, clear).await?;
            print_json(&stats)?;
        }

        Command::Overdue => {
            let rows: Vec<_> = db
                .invoices(tenant)
                .overdue()
                .await?
                .into_iter()
                .map(|entry| {
                    json!({
                        "id": entry.invoice.id,
                        "number": entry.invoice.number,
                        "clientId": entry.invoice.client_id,
                        "dueDate": entry.invoice.due_date,
                        "total": entry.invoice.total.to_string(),
                        "daysOverdue": entry.days_overdue,
                        "urgency": payment::urgency_level(&entry.invoice, now),
                        "reminder": payment::payment_reminder(&entry.invoice, now),
                    })
                })
                .collect();
            print_json(&rows)?;
        }

        Command::DueSoon { days } => {
            let horizon = days.unwrap_or(config.due_soon_days);
            let invoices = db.invoices(tenant).due_soon(horizon).await?;
            print_json(&invoices)?;
        }

        Command::NextNumber => {
            let next = db.sequences(tenant).preview_next().await?;
            println!("{next}");
        }

        Command::Clients { search, counts } => {
            let clients = db.clients(tenant);
            if counts {
                print_json(&clients.list_with_invoice_counts().await?)?;
            } else if let Some(term) = search {
                print_json(&clients.search(&term).await?)?;
            } else {
                print_json(&clients.list().await?)?;
            }
        }

        Command::Invoices { client } => {
            let invoices = db.invoices(tenant);
            let list = match client {
                Some(client_id) => invoices.list_for_client(&client_id).await?,
                None => invoices.list().await?,
            };
            print_json(&list)?;
        }

        Command::MarkPaid { id, method } => {
            let fallback = match method.or_else(|| config.default_payment_method.clone()) {
                Some(method) => method,
                None => db.settings(tenant).get().await?.default_payment_method().to_string(),
            };
            let invoice = db.invoices(tenant).mark_paid(&id, &fallback).await?;
            print_json(&invoice)?;
        }

        Command::MarkUnpaid { id } => {
            let invoice = db.invoices(tenant).mark_unpaid(&id).await?;
            print_json(&invoice)?;
        }

        Command::Dashboard => {
            let invoices = db.invoices(tenant).list().await?;
            let clients = db.clients(tenant).list().await?;
            print_json(&json!({
                "metrics": analytics::dashboard_metrics(&invoices, now),
                "monthlyRevenue": analytics::monthly_revenue(&invoices, now),
                "statusDistribution": analytics::status_distribution(&invoices),
                "topClients": analytics::top_clients(&invoices, &clients),
            }))?;
        }

        Command::Courses { add } => {
            let courses = db.courses(tenant);
            if let Some(name) = add {
                print_json(&courses.find_or_create(&name).await?)?;
            } else {
                print_json(&courses.list().await?)?;
            }
        }
    }

    Ok(())
}
