use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

use crate::domain::clock::to_iso8601;
use crate::domain::transaction::{Transaction, TransactionStatus, TransactionType};

pub const LATEST_SCHEMA_VERSION: u32 = 2;

const MIGRATIONS: &[(u32, &str)] = &[
    (
        1,
        r#"
CREATE TABLE IF NOT EXISTS wallet_transactions (
    id TEXT PRIMARY KEY,
    wallet_id TEXT NOT NULL,
    transaction_type TEXT NOT NULL,
    status TEXT NOT NULL,
    amount TEXT NOT NULL,
    description TEXT NOT NULL,
    station_name TEXT,
    reference_id TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_wallet_transactions_wallet_created_at
ON wallet_transactions (wallet_id, created_at DESC);
"#,
    ),
    (
        2,
        r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_wallet_transactions_single_refund
ON wallet_transactions (reference_id)
WHERE transaction_type = 'REFUND';
"#,
    ),
];

const TRANSACTION_COLUMNS: &str = "id, wallet_id, transaction_type, status, amount, description, station_name, reference_id, created_at";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

pub fn insert_transaction(
    connection: &Connection,
    transaction: &Transaction,
) -> Result<(), DbError> {
    connection.execute(
        "INSERT INTO wallet_transactions (id, wallet_id, transaction_type, status, amount, description, station_name, reference_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            transaction.id,
            transaction.wallet_id,
            transaction.transaction_type.as_str(),
            transaction.status.as_str(),
            transaction.amount.to_string(),
            transaction.description,
            transaction.station_name,
            transaction.reference_id,
            to_iso8601(transaction.created_at),
        ],
    )?;

    Ok(())
}

pub fn get_transaction(connection: &Connection, id: &str) -> Result<Option<Transaction>, DbError> {
    let transaction = connection
        .query_row(
            &format!("SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions WHERE id = ?1"),
            params![id],
            map_transaction_row,
        )
        .optional()?;

    Ok(transaction)
}

pub fn list_wallet_transactions(
    connection: &Connection,
    wallet_id: &str,
) -> Result<Vec<Transaction>, DbError> {
    let mut statement = connection.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS}
         FROM wallet_transactions
         WHERE wallet_id = ?1
         ORDER BY created_at DESC, id DESC"
    ))?;

    let rows = statement.query_map(params![wallet_id], map_transaction_row)?;

    let mut transactions = Vec::new();
    for row in rows {
        transactions.push(row?);
    }

    Ok(transactions)
}

pub fn find_refund_for(
    connection: &Connection,
    transaction_id: &str,
) -> Result<Option<Transaction>, DbError> {
    let refund = connection
        .query_row(
            &format!(
                "SELECT {TRANSACTION_COLUMNS}
                 FROM wallet_transactions
                 WHERE transaction_type = 'REFUND' AND reference_id = ?1"
            ),
            params![transaction_id],
            map_transaction_row,
        )
        .optional()?;

    Ok(refund)
}

pub fn count_transactions(connection: &Connection) -> Result<i64, DbError> {
    let count = connection.query_row("SELECT COUNT(*) FROM wallet_transactions", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

fn map_transaction_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let transaction_type: String = row.get(2)?;
    let status: String = row.get(3)?;
    let amount: String = row.get(4)?;
    let created_at: String = row.get(8)?;

    Ok(Transaction {
        id: row.get(0)?,
        wallet_id: row.get(1)?,
        transaction_type: transaction_type
            .parse::<TransactionType>()
            .map_err(|error| conversion_error(2, error))?,
        status: status
            .parse::<TransactionStatus>()
            .map_err(|error| conversion_error(3, error))?,
        amount: amount
            .parse::<Decimal>()
            .map_err(|error| conversion_error(4, error))?,
        description: row.get(5)?,
        station_name: row.get(6)?,
        reference_id: row.get(7)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|value| value.with_timezone(&Utc))
            .map_err(|error| conversion_error(8, error))?,
    })
}

fn conversion_error<E>(column: usize, error: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use rusqlite::params;

    use super::{
        LATEST_SCHEMA_VERSION, count_transactions, find_refund_for, get_transaction,
        insert_transaction, list_wallet_transactions, open_connection, run_migrations,
        schema_version,
    };
    use crate::domain::transaction::{Transaction, TransactionStatus, TransactionType};

    fn temp_db_path(name: &str) -> PathBuf {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join(name);
        std::mem::forget(dir);
        path
    }

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("timestamp should parse")
            .with_timezone(&Utc)
    }

    fn sample_transaction(
        id: &str,
        wallet_id: &str,
        transaction_type: TransactionType,
        created_at: &str,
    ) -> Transaction {
        Transaction {
            id: id.to_string(),
            wallet_id: wallet_id.to_string(),
            transaction_type,
            status: TransactionStatus::Completed,
            amount: Decimal::new(4250, 2),
            description: "Charging session".to_string(),
            station_name: Some("Arkadia AC".to_string()),
            reference_id: None,
            created_at: at(created_at),
        }
    }

    #[test]
    fn migrates_fresh_database_to_latest_version() {
        let db_path = temp_db_path("fresh.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");

        run_migrations(&mut connection).expect("migrations should succeed");

        let version = schema_version(&connection).expect("schema version should be queryable");
        assert_eq!(version, LATEST_SCHEMA_VERSION);

        let index_count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name IN ('idx_wallet_transactions_wallet_created_at', 'idx_wallet_transactions_single_refund')",
                [],
                |row| row.get(0),
            )
            .expect("index check should work");
        assert_eq!(index_count, 2);
    }

    #[test]
    fn migrations_are_idempotent() {
        let db_path = temp_db_path("idempotent.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");

        run_migrations(&mut connection).expect("first migration run should succeed");
        run_migrations(&mut connection).expect("second migration run should succeed");

        let version = schema_version(&connection).expect("schema version should be queryable");
        assert_eq!(version, LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn rejects_newer_schema_version() {
        let db_path = temp_db_path("newer.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        connection
            .pragma_update(None, "user_version", LATEST_SCHEMA_VERSION + 1)
            .expect("pragma update should succeed");

        let result = run_migrations(&mut connection);

        assert!(result.is_err());
    }

    #[test]
    fn round_trips_transaction_fields() {
        let db_path = temp_db_path("roundtrip.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        let stored = sample_transaction(
            "tx-1",
            "wallet-1",
            TransactionType::ChargingPayment,
            "2026-02-20T18:12:03.120Z",
        );
        insert_transaction(&connection, &stored).expect("insert should succeed");

        let loaded = get_transaction(&connection, "tx-1")
            .expect("query should succeed")
            .expect("transaction should exist");
        assert_eq!(loaded, stored);

        let missing = get_transaction(&connection, "tx-404").expect("query should succeed");
        assert_eq!(missing, None);
    }

    #[test]
    fn lists_wallet_transactions_newest_first() {
        let db_path = temp_db_path("list.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        for (id, wallet_id, created_at) in [
            ("tx-a", "wallet-1", "2026-02-20T10:00:00.000Z"),
            ("tx-b", "wallet-1", "2026-02-22T10:00:00.000Z"),
            ("tx-c", "wallet-2", "2026-02-23T10:00:00.000Z"),
            ("tx-d", "wallet-1", "2026-02-21T10:00:00.000Z"),
        ] {
            insert_transaction(
                &connection,
                &sample_transaction(id, wallet_id, TransactionType::AddFunds, created_at),
            )
            .expect("insert should succeed");
        }

        let listed =
            list_wallet_transactions(&connection, "wallet-1").expect("list should succeed");
        let ids: Vec<&str> = listed.iter().map(|tx| tx.id.as_str()).collect();

        assert_eq!(ids, vec!["tx-b", "tx-d", "tx-a"]);
        assert_eq!(count_transactions(&connection).expect("count should succeed"), 4);
    }

    #[test]
    fn allows_only_one_refund_per_payment() {
        let db_path = temp_db_path("refund.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        let mut refund = sample_transaction(
            "refund-1",
            "wallet-1",
            TransactionType::Refund,
            "2026-02-20T11:00:00.000Z",
        );
        refund.reference_id = Some("tx-1".to_string());
        insert_transaction(&connection, &refund).expect("first refund should insert");

        let found = find_refund_for(&connection, "tx-1")
            .expect("query should succeed")
            .expect("refund should exist");
        assert_eq!(found.id, "refund-1");

        let mut duplicate = refund.clone();
        duplicate.id = "refund-2".to_string();
        assert!(insert_transaction(&connection, &duplicate).is_err());
    }

    #[test]
    fn reports_unknown_stored_enum_values() {
        let db_path = temp_db_path("corrupt.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        connection
            .execute(
                "INSERT INTO wallet_transactions (id, wallet_id, transaction_type, status, amount, description, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    "tx-bad",
                    "wallet-1",
                    "BONUS",
                    "COMPLETED",
                    "5.00",
                    "legacy row",
                    "2026-02-20T10:00:00.000Z"
                ],
            )
            .expect("raw insert should succeed");

        assert!(get_transaction(&connection, "tx-bad").is_err());
    }

    #[test]
    fn stores_amounts_as_exact_decimal_text() {
        let db_path = temp_db_path("decimal.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        let mut stored = sample_transaction(
            "tx-1",
            "wallet-1",
            TransactionType::AddFunds,
            "2026-02-20T10:00:00.000Z",
        );
        stored.amount = Decimal::new(1010, 2);
        insert_transaction(&connection, &stored).expect("insert should succeed");

        let raw: String = connection
            .query_row(
                "SELECT amount FROM wallet_transactions WHERE id = 'tx-1'",
                [],
                |row| row.get(0),
            )
            .expect("raw amount should be readable");
        assert_eq!(raw, "10.10");

        let loaded = get_transaction(&connection, "tx-1")
            .expect("query should succeed")
            .expect("transaction should exist");
        assert_eq!(loaded.amount, Decimal::new(1010, 2));
    }
}
