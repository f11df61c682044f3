use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::validation::ValidationError;

pub const MIN_TOP_UP_AMOUNT: f64 = 10.0;
pub const MAX_TOP_UP_AMOUNT: f64 = 1000.0;
pub const DEFAULT_REFUND_WINDOW_HOURS: u32 = 24;
/// Ledger amounts are kept in whole grosze.
pub const LEDGER_SCALE: u32 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    AddFunds,
    ChargingPayment,
    Refund,
    Transfer,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::AddFunds,
        TransactionType::ChargingPayment,
        TransactionType::Refund,
        TransactionType::Transfer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::AddFunds => "ADD_FUNDS",
            TransactionType::ChargingPayment => "CHARGING_PAYMENT",
            TransactionType::Refund => "REFUND",
            TransactionType::Transfer => "TRANSFER",
        }
    }

    /// Credits increase the wallet balance, everything else draws it down.
    pub fn is_credit(self) -> bool {
        matches!(self, TransactionType::AddFunds | TransactionType::Refund)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| UnknownVariant {
                kind: "transaction type",
                value: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 4] = [
        TransactionStatus::Pending,
        TransactionStatus::Completed,
        TransactionStatus::Failed,
        TransactionStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TransactionStatus::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| UnknownVariant {
                kind: "transaction status",
                value: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub wallet_id: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub description: String,
    pub station_name: Option<String>,
    /// For refunds, the id of the refunded payment.
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Presentation metadata shown next to a transaction in both apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayConfig {
    pub color: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub fn get_transaction_type_config(transaction_type: TransactionType) -> DisplayConfig {
    match transaction_type {
        TransactionType::AddFunds => DisplayConfig {
            color: "success",
            icon: "add-circle",
            label: "Top-up",
            description: "Funds added to wallet",
        },
        TransactionType::ChargingPayment => DisplayConfig {
            color: "primary",
            icon: "flash",
            label: "Charging",
            description: "Payment for a charging session",
        },
        TransactionType::Refund => DisplayConfig {
            color: "info",
            icon: "arrow-undo",
            label: "Refund",
            description: "Charging payment returned to wallet",
        },
        TransactionType::Transfer => DisplayConfig {
            color: "warning",
            icon: "swap-horizontal",
            label: "Transfer",
            description: "Funds moved to another wallet",
        },
    }
}

pub fn get_transaction_status_config(status: TransactionStatus) -> DisplayConfig {
    match status {
        TransactionStatus::Pending => DisplayConfig {
            color: "warning",
            icon: "time",
            label: "Pending",
            description: "Transaction is being processed",
        },
        TransactionStatus::Completed => DisplayConfig {
            color: "success",
            icon: "checkmark-circle",
            label: "Completed",
            description: "Transaction completed successfully",
        },
        TransactionStatus::Failed => DisplayConfig {
            color: "error",
            icon: "close-circle",
            label: "Failed",
            description: "Transaction could not be completed",
        },
        TransactionStatus::Cancelled => DisplayConfig {
            color: "muted",
            icon: "ban",
            label: "Cancelled",
            description: "Transaction was cancelled",
        },
    }
}

pub fn validate_transaction_amount(
    transaction_type: TransactionType,
    amount: f64,
) -> Result<(), ValidationError> {
    if amount.is_nan() || amount <= 0.0 {
        return Err(ValidationError::AmountNotPositive);
    }

    if transaction_type == TransactionType::AddFunds {
        if amount < MIN_TOP_UP_AMOUNT {
            return Err(ValidationError::TopUpBelowMinimum);
        }
        if amount > MAX_TOP_UP_AMOUNT {
            return Err(ValidationError::TopUpAboveMaximum);
        }
    }

    Ok(())
}

pub fn can_process_payment(
    transaction_type: TransactionType,
    amount: f64,
    balance: f64,
) -> Result<(), ValidationError> {
    validate_transaction_amount(transaction_type, amount)?;

    if transaction_type == TransactionType::ChargingPayment && balance < amount {
        return Err(ValidationError::InsufficientBalance);
    }

    Ok(())
}

/// Converts an accepted amount to ledger precision.
///
/// Amounts that round to zero grosze are rejected as non-positive.
pub fn to_ledger_amount(amount: f64) -> Result<Decimal, ValidationError> {
    let amount = Decimal::try_from(amount)
        .map_err(|_| ValidationError::AmountOutOfRange)?
        .round_dp_with_strategy(LEDGER_SCALE, RoundingStrategy::MidpointAwayFromZero);

    if amount <= Decimal::ZERO {
        return Err(ValidationError::AmountNotPositive);
    }

    Ok(amount)
}

/// Balance check for a charging payment against the persisted ledger.
pub fn ensure_balance_covers(balance: Decimal, amount: Decimal) -> Result<(), ValidationError> {
    if balance < amount {
        return Err(ValidationError::InsufficientBalance);
    }

    Ok(())
}

pub fn is_refund_eligible(
    transaction: &Transaction,
    hours_limit: u32,
    now: DateTime<Utc>,
) -> bool {
    if transaction.transaction_type != TransactionType::ChargingPayment {
        return false;
    }

    if transaction.status != TransactionStatus::Completed {
        return false;
    }

    now - transaction.created_at <= Duration::hours(i64::from(hours_limit))
}

pub fn calculate_wallet_balance(transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .filter(|transaction| transaction.status == TransactionStatus::Completed)
        .map(|transaction| {
            if transaction.transaction_type.is_credit() {
                transaction.amount
            } else {
                -transaction.amount
            }
        })
        .sum()
}
