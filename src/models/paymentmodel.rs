use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    /// Captured for a job that was already paid; needs a manual refund.
    Duplicate,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Mpesa,
    Cash,
    Credit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub amount: BigDecimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub phone_number: Option<String>,
    pub transaction_reference: String,
    pub receipt_number: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome reported by the gateway for one checkout session.
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    Completed {
        receipt_number: Option<String>,
        paid_at: Option<DateTime<Utc>>,
    },
    Failed {
        reason: String,
    },
    Processing,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub amount: BigDecimal,
    pub payment_method: PaymentMethod,
    pub phone_number: Option<String>,
    pub transaction_reference: String,
}
