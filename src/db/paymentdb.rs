// db/paymentdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::{NewPayment, Payment, PaymentStatus};

const PAYMENT_COLUMNS: &str = r#"
    id, job_id, client_id, amount, payment_method, payment_status, phone_number,
    transaction_reference, receipt_number, payment_date, created_at, updated_at
"#;

#[async_trait]
pub trait PaymentExt {
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, Error>;

    /// Newest first.
    async fn get_payments_for_job(&self, job_id: Uuid) -> Result<Vec<Payment>, Error>;

    async fn get_completed_payment_for_job(&self, job_id: Uuid)
        -> Result<Option<Payment>, Error>;

    async fn get_payment_by_reference(&self, reference: &str)
        -> Result<Option<Payment>, Error>;

    /// Both updates only touch a `pending` row; `None` means it was already settled
    /// (or does not exist). A capture for a job that already has a completed payment
    /// is recorded as `duplicate` instead of `completed`.
    async fn complete_payment(
        &self,
        reference: &str,
        receipt_number: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Payment>, Error>;

    async fn fail_payment(&self, reference: &str) -> Result<Option<Payment>, Error>;
}

impl DBClient {
    async fn settle_captured(
        &self,
        reference: &str,
        status: PaymentStatus,
        receipt_number: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET payment_status = $2, receipt_number = $3, payment_date = $4, updated_at = NOW()
            WHERE transaction_reference = $1 AND payment_status = 'pending'
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(reference)
        .bind(status)
        .bind(receipt_number)
        .bind(paid_at)
        .fetch_optional(&self.pool)
        .await
    }
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (job_id, client_id, amount, payment_method, payment_status, phone_number, transaction_reference)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(payment.job_id)
        .bind(payment.client_id)
        .bind(&payment.amount)
        .bind(payment.payment_method)
        .bind(&payment.phone_number)
        .bind(&payment.transaction_reference)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_payments_for_job(&self, job_id: Uuid) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE job_id = $1 ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_completed_payment_for_job(
        &self,
        job_id: Uuid,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE job_id = $1 AND payment_status = 'completed' LIMIT 1",
            PAYMENT_COLUMNS
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE transaction_reference = $1",
            PAYMENT_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn complete_payment(
        &self,
        reference: &str,
        receipt_number: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Payment>, Error> {
        let completed = self
            .settle_captured(reference, PaymentStatus::Completed, receipt_number.clone(), paid_at)
            .await;

        match completed {
            // The one-completed-payment-per-job index fired: the job was already paid.
            Err(Error::Database(e)) if e.is_unique_violation() => {
                self.settle_captured(reference, PaymentStatus::Duplicate, receipt_number, paid_at)
                    .await
            }
            other => other,
        }
    }

    async fn fail_payment(&self, reference: &str) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET payment_status = 'failed', updated_at = NOW()
            WHERE transaction_reference = $1 AND payment_status = 'pending'
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
    }
}
