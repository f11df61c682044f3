use std::path::Path;

use chrono::{Duration, Utc};
use ev_console::adapters::db::{
    insert_transaction, open_connection, run_migrations, schema_version,
};
use ev_console::domain::transaction::{Transaction, TransactionStatus, TransactionType};
use rust_decimal::Decimal;
use rusqlite::Connection;

const DEMO_WALLET_ID: &str = "demo-wallet";

struct Options {
    path: String,
    force: bool,
    seed: bool,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("failed to create test db: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        print_help();
        return Ok(());
    };

    let path_ref = Path::new(&options.path);
    if let Some(parent) = path_ref.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|error| format!("failed to create parent directory: {error}"))?;
    }

    if options.force && path_ref.exists() {
        std::fs::remove_file(path_ref)
            .map_err(|error| format!("failed to remove existing db file: {error}"))?;
    }

    let mut connection = open_connection(&options.path).map_err(|error| error.to_string())?;
    run_migrations(&mut connection).map_err(|error| error.to_string())?;
    let version = schema_version(&connection).map_err(|error| error.to_string())?;

    if options.seed {
        let inserted = seed_demo_wallet(&connection)?;
        println!("seeded {inserted} transactions into wallet {DEMO_WALLET_ID}");
    }

    println!("created/updated test db at: {}", options.path);
    println!("schema version: {version}");
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut options = Options {
        path: if cfg!(windows) {
            ".\\data\\ev_console_test.db".to_string()
        } else {
            "./data/ev_console_test.db".to_string()
        },
        force: false,
        seed: false,
    };

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--path" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--path requires a value".to_string());
                };
                options.path = value.clone();
                index += 2;
            }
            "--force" => {
                options.force = true;
                index += 1;
            }
            "--seed" => {
                options.seed = true;
                index += 1;
            }
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(Some(options))
}

fn seed_demo_wallet(connection: &Connection) -> Result<usize, String> {
    let now = Utc::now();
    let entries = [
        (
            TransactionType::AddFunds,
            Decimal::new(200, 0),
            "Wallet top-up",
            None,
            Duration::days(3),
        ),
        (
            TransactionType::ChargingPayment,
            Decimal::new(468, 1),
            "Charging session",
            Some("Galeria Mokotów DC"),
            Duration::hours(30),
        ),
        (
            TransactionType::ChargingPayment,
            Decimal::new(182, 1),
            "Charging session",
            Some("Arkadia AC"),
            Duration::hours(2),
        ),
    ];

    for (transaction_type, amount, description, station_name, age) in &entries {
        let transaction = Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            wallet_id: DEMO_WALLET_ID.to_string(),
            transaction_type: *transaction_type,
            status: TransactionStatus::Completed,
            amount: *amount,
            description: (*description).to_string(),
            station_name: station_name.map(ToString::to_string),
            reference_id: None,
            created_at: now - *age,
        };
        insert_transaction(connection, &transaction).map_err(|error| error.to_string())?;
    }

    Ok(entries.len())
}

fn print_help() {
    println!("create_test_db");
    println!();
    println!("Usage:");
    println!("  cargo run --bin create_test_db -- [--path <file>] [--force] [--seed]");
    println!();
    println!("Options:");
    println!("  --path <file>   target sqlite file (default: ./data/ev_console_test.db)");
    println!("  --force         delete existing file before creating");
    println!("  --seed          insert a demo wallet history");
}
