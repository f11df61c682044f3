use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::adapters::db;
use crate::adapters::db::DbError;
use crate::domain::clock::Clock;
use crate::domain::filters::{TransactionFilter, filter_transactions};
use crate::domain::transaction::{
    Transaction, TransactionStatus, TransactionType, calculate_wallet_balance,
    ensure_balance_covers, is_refund_eligible, to_ledger_amount, validate_transaction_amount,
};
use crate::domain::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database lock poisoned")]
    DbLockPoisoned,
    #[error("database operation failed: {0}")]
    Database(#[from] DbError),
    #[error("{0}")]
    Rejected(#[from] ValidationError),
    #[error("transaction {0} not found")]
    TransactionNotFound(String),
    #[error("transaction {0} is not eligible for a refund")]
    RefundNotEligible(String),
    #[error("transaction {0} has already been refunded")]
    AlreadyRefunded(String),
}

pub trait WalletQueryHandler {
    fn wallet_balance(&self, wallet_id: &str) -> Result<Decimal, ServiceError>;
    fn list_transactions(
        &self,
        wallet_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, ServiceError>;
    fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>, ServiceError>;
    fn get_schema_version(&self) -> Result<u32, ServiceError>;
    fn count_transactions(&self) -> Result<i64, ServiceError>;
}

pub trait WalletCommandHandler {
    fn top_up(&self, wallet_id: &str, amount: f64) -> Result<Transaction, ServiceError>;
    fn pay_for_charging(
        &self,
        wallet_id: &str,
        amount: f64,
        station_name: Option<&str>,
    ) -> Result<Transaction, ServiceError>;
    fn refund(&self, transaction_id: &str) -> Result<Transaction, ServiceError>;
}

#[derive(Clone)]
pub struct SqliteWalletService {
    connection: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
    refund_window_hours: u32,
}

impl SqliteWalletService {
    pub fn new(
        connection: Arc<Mutex<Connection>>,
        clock: Arc<dyn Clock>,
        refund_window_hours: u32,
    ) -> Self {
        Self {
            connection,
            clock,
            refund_window_hours,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn refund_window_hours(&self) -> u32 {
        self.refund_window_hours
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| ServiceError::DbLockPoisoned)?;
        op(&connection)
    }

    fn new_transaction(
        &self,
        wallet_id: &str,
        transaction_type: TransactionType,
        amount: Decimal,
        description: String,
    ) -> Transaction {
        Transaction {
            id: Uuid::new_v4().to_string(),
            wallet_id: wallet_id.to_string(),
            transaction_type,
            status: TransactionStatus::Completed,
            amount,
            description,
            station_name: None,
            reference_id: None,
            created_at: self.clock.now(),
        }
    }
}

impl WalletQueryHandler for SqliteWalletService {
    fn wallet_balance(&self, wallet_id: &str) -> Result<Decimal, ServiceError> {
        self.with_connection(|connection| {
            let transactions = db::list_wallet_transactions(connection, wallet_id)?;
            Ok(calculate_wallet_balance(&transactions))
        })
    }

    fn list_transactions(
        &self,
        wallet_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, ServiceError> {
        self.with_connection(|connection| {
            let transactions = db::list_wallet_transactions(connection, wallet_id)?;
            Ok(filter_transactions(&transactions, filter))
        })
    }

    fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>, ServiceError> {
        self.with_connection(|connection| Ok(db::get_transaction(connection, transaction_id)?))
    }

    fn get_schema_version(&self) -> Result<u32, ServiceError> {
        self.with_connection(|connection| Ok(db::schema_version(connection)?))
    }

    fn count_transactions(&self) -> Result<i64, ServiceError> {
        self.with_connection(|connection| Ok(db::count_transactions(connection)?))
    }
}

impl WalletCommandHandler for SqliteWalletService {
    fn top_up(&self, wallet_id: &str, amount: f64) -> Result<Transaction, ServiceError> {
        validate_transaction_amount(TransactionType::AddFunds, amount)?;
        let amount = to_ledger_amount(amount)?;

        let transaction = self.new_transaction(
            wallet_id,
            TransactionType::AddFunds,
            amount,
            "Wallet top-up".to_string(),
        );

        self.with_connection(|connection| {
            db::insert_transaction(connection, &transaction)?;
            Ok(())
        })?;

        tracing::info!(
            transaction_id = %transaction.id,
            wallet_id,
            amount = %amount,
            "wallet topped up"
        );

        Ok(transaction)
    }

    fn pay_for_charging(
        &self,
        wallet_id: &str,
        amount: f64,
        station_name: Option<&str>,
    ) -> Result<Transaction, ServiceError> {
        validate_transaction_amount(TransactionType::ChargingPayment, amount)?;
        let amount = to_ledger_amount(amount)?;

        let mut transaction = self.new_transaction(
            wallet_id,
            TransactionType::ChargingPayment,
            amount,
            "Charging session".to_string(),
        );
        transaction.station_name = station_name.map(ToString::to_string);

        // Balance check and insert share one lock so concurrent payments cannot overdraw.
        self.with_connection(|connection| {
            let history = db::list_wallet_transactions(connection, wallet_id)?;
            let balance = calculate_wallet_balance(&history);

            if let Err(error) = ensure_balance_covers(balance, amount) {
                tracing::warn!(
                    wallet_id,
                    amount = %amount,
                    balance = %balance,
                    error = %error,
                    "charging payment rejected"
                );
                return Err(error.into());
            }

            db::insert_transaction(connection, &transaction)?;
            Ok(())
        })?;

        tracing::info!(
            transaction_id = %transaction.id,
            wallet_id,
            amount = %amount,
            station_name = ?transaction.station_name,
            "charging payment recorded"
        );

        Ok(transaction)
    }

    fn refund(&self, transaction_id: &str) -> Result<Transaction, ServiceError> {
        let now = self.clock.now();

        let refund = self.with_connection(|connection| {
            let original = db::get_transaction(connection, transaction_id)?
                .ok_or_else(|| ServiceError::TransactionNotFound(transaction_id.to_string()))?;

            if !is_refund_eligible(&original, self.refund_window_hours, now) {
                return Err(ServiceError::RefundNotEligible(original.id));
            }

            if db::find_refund_for(connection, &original.id)?.is_some() {
                return Err(ServiceError::AlreadyRefunded(original.id));
            }

            let refund = Transaction {
                id: Uuid::new_v4().to_string(),
                wallet_id: original.wallet_id.clone(),
                transaction_type: TransactionType::Refund,
                status: TransactionStatus::Completed,
                amount: original.amount,
                description: format!("Refund: {}", original.description),
                station_name: original.station_name.clone(),
                reference_id: Some(original.id.clone()),
                created_at: now,
            };
            db::insert_transaction(connection, &refund)?;

            Ok(refund)
        })?;

        tracing::info!(
            refund_id = %refund.id,
            transaction_id,
            wallet_id = %refund.wallet_id,
            amount = %refund.amount,
            "charging payment refunded"
        );

        Ok(refund)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, Utc};
    use rust_decimal::Decimal;

    use super::{ServiceError, SqliteWalletService, WalletCommandHandler, WalletQueryHandler};
    use crate::adapters::db::insert_transaction;
    use crate::domain::clock::FixedClock;
    use crate::domain::filters::TransactionFilter;
    use crate::domain::transaction::{Transaction, TransactionStatus, TransactionType};
    use crate::domain::validation::ValidationError;
    use crate::test_support::shared_test_connection;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00.000Z")
            .expect("timestamp should parse")
            .with_timezone(&Utc)
    }

    fn zl(value: &str) -> Decimal {
        value.parse().expect("decimal literal should parse")
    }

    fn build_service(name: &str) -> SqliteWalletService {
        SqliteWalletService::new(
            shared_test_connection(name),
            Arc::new(FixedClock(now())),
            24,
        )
    }

    fn seed_payment(service: &SqliteWalletService, id: &str, created_at: DateTime<Utc>) {
        let connection = service.connection.lock().expect("lock should be available");
        insert_transaction(
            &connection,
            &Transaction {
                id: id.to_string(),
                wallet_id: "wallet-1".to_string(),
                transaction_type: TransactionType::ChargingPayment,
                status: TransactionStatus::Completed,
                amount: zl("30.00"),
                description: "Charging session".to_string(),
                station_name: Some("Arkadia AC".to_string()),
                reference_id: None,
                created_at,
            },
        )
        .expect("seed insert should succeed");
    }

    #[test]
    fn top_up_is_recorded_and_counted_in_balance() {
        let service = build_service("service-top-up");

        let transaction = service.top_up("wallet-1", 150.0).expect("top-up should succeed");

        assert_eq!(transaction.transaction_type, TransactionType::AddFunds);
        assert_eq!(transaction.created_at, now());
        assert_eq!(service.wallet_balance("wallet-1").expect("balance"), zl("150"));
        assert_eq!(service.wallet_balance("wallet-2").expect("balance"), Decimal::ZERO);
    }

    #[test]
    fn top_up_outside_bounds_is_rejected_without_writing() {
        let service = build_service("service-top-up-bounds");

        let result = service.top_up("wallet-1", 5.0);

        assert!(matches!(
            result,
            Err(ServiceError::Rejected(ValidationError::TopUpBelowMinimum))
        ));
        assert_eq!(service.count_transactions().expect("count"), 0);
    }

    #[test]
    fn payment_requires_sufficient_balance() {
        let service = build_service("service-payment");
        service.top_up("wallet-1", 50.0).expect("top-up should succeed");

        let rejected = service.pay_for_charging("wallet-1", 80.0, Some("Arkadia AC"));
        assert!(matches!(
            rejected,
            Err(ServiceError::Rejected(ValidationError::InsufficientBalance))
        ));

        let paid = service
            .pay_for_charging("wallet-1", 20.0, Some("Arkadia AC"))
            .expect("payment should succeed");
        assert_eq!(paid.station_name.as_deref(), Some("Arkadia AC"));
        assert_eq!(service.wallet_balance("wallet-1").expect("balance"), zl("30"));
    }

    #[test]
    fn fractional_top_ups_cover_a_payment_of_their_sum() {
        let service = build_service("service-fractional");
        service.top_up("wallet-1", 10.1).expect("top-up should succeed");
        service.top_up("wallet-1", 10.2).expect("top-up should succeed");
        assert_eq!(service.wallet_balance("wallet-1").expect("balance"), zl("20.30"));

        let paid = service
            .pay_for_charging("wallet-1", 20.3, Some("Arkadia AC"))
            .expect("payment should succeed");

        assert_eq!(paid.amount, zl("20.30"));
        assert_eq!(service.wallet_balance("wallet-1").expect("balance"), Decimal::ZERO);
    }

    #[test]
    fn payment_below_one_grosz_is_rejected() {
        let service = build_service("service-sub-grosz");
        service.top_up("wallet-1", 50.0).expect("top-up should succeed");

        let result = service.pay_for_charging("wallet-1", 0.001, None);

        assert!(matches!(
            result,
            Err(ServiceError::Rejected(ValidationError::AmountNotPositive))
        ));
        assert_eq!(service.count_transactions().expect("count"), 1);
    }

    #[test]
    fn refund_restores_balance_once() {
        let service = build_service("service-refund");
        service.top_up("wallet-1", 100.0).expect("top-up should succeed");
        seed_payment(&service, "payment-1", now() - Duration::hours(1));
        assert_eq!(service.wallet_balance("wallet-1").expect("balance"), zl("70"));

        let refund = service.refund("payment-1").expect("refund should succeed");
        assert_eq!(refund.reference_id.as_deref(), Some("payment-1"));
        assert_eq!(refund.amount, zl("30"));
        assert_eq!(service.wallet_balance("wallet-1").expect("balance"), zl("100"));

        let second = service.refund("payment-1");
        assert!(matches!(second, Err(ServiceError::AlreadyRefunded(id)) if id == "payment-1"));
    }

    #[test]
    fn refund_outside_window_is_not_eligible() {
        let service = build_service("service-refund-window");
        seed_payment(&service, "payment-old", now() - Duration::hours(25));

        let result = service.refund("payment-old");

        assert!(matches!(result, Err(ServiceError::RefundNotEligible(_))));
    }

    #[test]
    fn refund_of_unknown_transaction_is_not_found() {
        let service = build_service("service-refund-missing");

        let result = service.refund("nope");

        assert!(matches!(result, Err(ServiceError::TransactionNotFound(_))));
    }

    #[test]
    fn lists_transactions_through_filter() {
        let service = build_service("service-list");
        service.top_up("wallet-1", 100.0).expect("top-up should succeed");
        seed_payment(&service, "payment-1", now() - Duration::hours(2));

        let payments = service
            .list_transactions(
                "wallet-1",
                &TransactionFilter {
                    type_filter: Some("CHARGING_PAYMENT".to_string()),
                    ..TransactionFilter::default()
                },
            )
            .expect("list should succeed");

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].id, "payment-1");

        let everything = service
            .list_transactions("wallet-1", &TransactionFilter::default())
            .expect("list should succeed");
        assert_eq!(everything.len(), 2);
    }
}
