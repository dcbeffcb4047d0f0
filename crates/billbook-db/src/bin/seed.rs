//! # Seed Data Generator
//!
//! Populates the database with demo clients and invoices for development.
//!
//! ## Usage
//! ```bash
//! # Generate 12 clients (default) for the local user
//! cargo run -p billbook-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p billbook-db --bin seed -- --count 40
//!
//! # Specify database path and tenant
//! cargo run -p billbook-db --bin seed -- --db ./data/billbook.db --user user-42
//! ```
//!
//! ## Generated Data
//! - Clients named after a fixed list of training customers
//! - 1-4 invoices per client, issued over the last ~90 days
//! - Net 15 / Net 30 terms, so a share of them lands overdue or due soon
//! - Every third invoice marked as paid

use billbook_core::{
    InvoiceDraft, Money, NewClient, NewInvoiceItem, PaymentTerms, TenantId, DEFAULT_PAYMENT_METHOD,
};
use billbook_db::{Database, DbConfig};
use chrono::{Duration, Utc};
use std::env;

/// Company names for realistic client data
const COMPANIES: &[(&str, &str, &str)] = &[
    ("Acme Training", "Springfield", "IL"),
    ("Globex Corporation", "Cypress Creek", "OR"),
    ("Initech", "Austin", "TX"),
    ("Umbrella Learning", "Raccoon City", "MO"),
    ("Stark Industries", "Malibu", "CA"),
    ("Wayne Enterprises", "Gotham", "NJ"),
    ("Hooli", "Palo Alto", "CA"),
    ("Pied Piper", "Palo Alto", "CA"),
    ("Vandelay Industries", "New York", "NY"),
    ("Dunder Mifflin", "Scranton", "PA"),
    ("Soylent Systems", "Seattle", "WA"),
    ("Cyberdyne", "Sunnyvale", "CA"),
];

/// Line items: description and unit price in cents
const SERVICES: &[(&str, i64)] = &[
    ("Consulting", 15000),
    ("Workshop facilitation", 120000),
    ("Course materials", 4500),
    ("Curriculum design", 9500),
    ("Follow-up coaching session", 20000),
];

const TERMS: &[u32] = &[15, 30];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 12;
    let mut db_path = String::from("./billbook_dev.db");
    let mut user = String::from("local-user");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(12);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--user" | "-u" => {
                if i + 1 < args.len() {
                    user = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Billbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of clients to generate (default: 12)");
                println!("  -d, --db <PATH>    Database file path (default: ./billbook_dev.db)");
                println!("  -u, --user <ID>    Owning user id (default: local-user)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let tenant = TenantId::new(user)?;

    println!("🌱 Billbook Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("User:     {}", tenant);
    println!("Clients:  {}", count);
    println!();

    // Connect to database
    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing clients
    let clients = db.clients(&tenant);
    let existing = clients.count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} clients for {}", existing, tenant);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating clients and invoices...");

    let invoices = db.invoices(&tenant);
    let today = Utc::now().date_naive();
    let start = std::time::Instant::now();
    let mut generated_invoices = 0;

    for seed in 0..count {
        let client = match clients.create(generate_client(seed)).await {
            Ok(client) => client,
            Err(e) => {
                eprintln!("Failed to insert client #{}: {}", seed, e);
                continue;
            }
        };

        for n in 0..(1 + seed % 4) {
            let k = seed * 4 + n;
            let issued = today - Duration::days((k * 11 % 90) as i64);
            let terms = PaymentTerms::custom(TERMS[k % TERMS.len()], None);
            let (description, price) = SERVICES[k % SERVICES.len()];
            let item = NewInvoiceItem::new(description, (1 + k % 3) as f64, Money::from_cents(price));

            let invoice = match invoices
                .create(InvoiceDraft::new(&client.id, issued, terms, vec![item]))
                .await
            {
                Ok(invoice) => invoice,
                Err(e) => {
                    eprintln!("Failed to insert invoice for {}: {}", client.name, e);
                    continue;
                }
            };

            if k % 3 == 0 {
                invoices.mark_paid(&invoice.id, DEFAULT_PAYMENT_METHOD).await?;
            }
            generated_invoices += 1;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} clients and {} invoices in {:?}",
        clients.count().await?,
        generated_invoices,
        elapsed
    );

    // Summarize payment status
    println!();
    println!("Checking payment status...");
    let overdue = invoices.overdue().await?;
    println!("  Overdue:  {}", overdue.len());
    let due_soon = invoices.due_soon(7).await?;
    println!("  Due soon: {}", due_soon.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single client with realistic data.
fn generate_client(seed: usize) -> NewClient {
    let (company, city, state) = COMPANIES[seed % COMPANIES.len()];

    // Repeat names past the list get a numeric suffix
    let round = seed / COMPANIES.len();
    let name = if round == 0 {
        company.to_string()
    } else {
        format!("{} {}", company, round + 1)
    };
    let slug: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    NewClient {
        name,
        email: format!("billing@{}.example.com", slug),
        phone: Some(format!("555-01{:02}", seed % 100)),
        address: format!("{} Market Street", 100 + seed * 7),
        city: city.to_string(),
        state: state.to_string(),
        zip_code: format!("{:05}", 10000 + seed * 613 % 89999),
        tax_id: None,
        default_unit_price: Some(Money::from_cents(SERVICES[seed % SERVICES.len()].1)),
        billing_address: None,
        requires_course_info: false,
    }
}
