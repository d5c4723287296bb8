// service/payment_service.rs
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::LogisticsStore,
    dtos::paymentdtos::{CallbackAck, InitiatePaymentDto, PaymentInitiatedDto, PaymentStatusDto},
    models::{
        jobmodel::{Job, JobStatus},
        paymentmodel::{ChargeOutcome, NewPayment, Payment, PaymentMethod, PaymentStatus},
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError,
        mpesa::{parse_callback, ChargeRequest, PaymentGateway},
    },
    utils::currency::to_whole_shillings,
};

/// What a reconciliation attempt did to the local record.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Completed(Payment),
    /// Money was captured for a job that was already paid.
    Duplicate(Payment),
    Failed(Payment),
    /// Already settled earlier; the replay changed nothing.
    AlreadySettled,
    /// Gateway has no final answer yet.
    StillPending,
    UnknownReference,
}

pub struct PaymentService {
    store: Arc<dyn LogisticsStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn LogisticsStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    async fn load_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.store
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    pub async fn initiate_payment(
        &self,
        client_id: Uuid,
        dto: InitiatePaymentDto,
    ) -> Result<PaymentInitiatedDto, ServiceError> {
        let job = self.load_job(dto.job_id).await?;

        if job.client_id != client_id {
            return Err(ServiceError::NotAuthorized(client_id, job.id));
        }

        if job.status != JobStatus::Delivered {
            return Err(ServiceError::InvalidState(
                job.id,
                job.status,
                "Payment can only be made for delivered jobs".to_string(),
            ));
        }

        if self.store.get_completed_payment_for_job(job.id).await?.is_some() {
            return Err(ServiceError::AlreadyPaid(job.id));
        }

        let charged_amount = to_whole_shillings(&job.total_amount);
        let session = self
            .gateway
            .initiate_charge(ChargeRequest {
                phone_number: dto.phone_number.clone(),
                amount: charged_amount,
                account_reference: job.job_number.clone(),
                description: format!("Payment for delivery {}", job.job_number),
            })
            .await?;

        let payment = self
            .store
            .create_payment(NewPayment {
                job_id: job.id,
                client_id,
                amount: job.total_amount.clone(),
                payment_method: PaymentMethod::Mpesa,
                phone_number: Some(dto.phone_number),
                transaction_reference: session.session_id.clone(),
            })
            .await
            .map_err(|e| {
                // The customer already has a prompt on their phone; keep the session
                // id so the charge can be matched by hand.
                tracing::error!(
                    job_id = %job.id,
                    session_id = %session.session_id,
                    error = %e,
                    "Charge initiated but payment record could not be saved"
                );
                ServiceError::from(e)
            })?;

        tracing::info!(
            job_id = %job.id,
            payment_id = %payment.id,
            session_id = %session.session_id,
            "Payment initiated"
        );

        Ok(PaymentInitiatedDto {
            payment_id: payment.id,
            checkout_request_id: session.session_id,
            customer_message: session.customer_message,
            amount: payment.amount,
            charged_amount,
        })
    }

    /// Applies a gateway outcome to the pending payment with this reference.
    /// Safe to call any number of times for the same reference.
    pub async fn reconcile(
        &self,
        reference: &str,
        outcome: ChargeOutcome,
    ) -> Result<Reconciliation, ServiceError> {
        let updated = match &outcome {
            ChargeOutcome::Processing => return Ok(Reconciliation::StillPending),
            ChargeOutcome::Completed {
                receipt_number,
                paid_at,
            } => self
                .store
                .complete_payment(reference, receipt_number.clone(), paid_at.unwrap_or_else(Utc::now))
                .await?
                .map(|p| match p.payment_status {
                    PaymentStatus::Duplicate => Reconciliation::Duplicate(p),
                    _ => Reconciliation::Completed(p),
                }),
            ChargeOutcome::Failed { .. } => self
                .store
                .fail_payment(reference)
                .await?
                .map(Reconciliation::Failed),
        };

        if let Some(result) = updated {
            match &result {
                Reconciliation::Completed(p) => tracing::info!(
                    job_id = %p.job_id,
                    reference = %reference,
                    receipt = ?p.receipt_number,
                    "Payment completed"
                ),
                Reconciliation::Duplicate(p) => tracing::error!(
                    job_id = %p.job_id,
                    payment_id = %p.id,
                    reference = %reference,
                    receipt = ?p.receipt_number,
                    "Second payment captured for an already paid job; needs manual refund"
                ),
                Reconciliation::Failed(p) => tracing::info!(
                    job_id = %p.job_id,
                    reference = %reference,
                    outcome = ?outcome,
                    "Payment failed"
                ),
                _ => {}
            }
            return Ok(result);
        }

        match self.store.get_payment_by_reference(reference).await? {
            Some(existing) => {
                tracing::debug!(
                    reference = %reference,
                    status = ?existing.payment_status,
                    "Ignoring replayed payment notification"
                );
                Ok(Reconciliation::AlreadySettled)
            }
            None => {
                tracing::warn!(reference = %reference, "Payment notification for unknown reference");
                Ok(Reconciliation::UnknownReference)
            }
        }
    }

    /// Callback entry point. Always produces an acknowledgement so the gateway
    /// stops retrying; problems are logged instead.
    pub async fn handle_callback(&self, payload: &Value) -> CallbackAck {
        let Some(callback) = parse_callback(payload) else {
            tracing::warn!("Received malformed M-Pesa callback");
            return CallbackAck::accepted("Callback received");
        };

        tracing::debug!(
            reference = %callback.checkout_request_id,
            amount = ?callback.amount,
            phone = ?callback.phone_number,
            "M-Pesa callback received"
        );

        match self.reconcile(&callback.checkout_request_id, callback.outcome).await {
            Ok(Reconciliation::UnknownReference) => CallbackAck::accepted("Payment record not found"),
            Ok(_) => CallbackAck::accepted("Accepted"),
            Err(e) => {
                tracing::error!(
                    reference = %callback.checkout_request_id,
                    error = %e,
                    "Failed to process M-Pesa callback"
                );
                CallbackAck::accepted("Callback processing error logged")
            }
        }
    }

    pub async fn payment_status(&self, user: &User, job_id: Uuid) -> Result<PaymentStatusDto, ServiceError> {
        let job = self.load_job(job_id).await?;
        if user.role != UserRole::Admin && !job.is_participant(user.id) {
            return Err(ServiceError::NotAuthorized(user.id, job_id));
        }

        let all_payments = self.store.get_payments_for_job(job_id).await?;
        Ok(summarize_payments(all_payments))
    }

    /// Asks the gateway about the newest pending payment and reconciles it.
    pub async fn refresh_pending_payment(
        &self,
        client_id: Uuid,
        job_id: Uuid,
    ) -> Result<PaymentStatusDto, ServiceError> {
        let job = self.load_job(job_id).await?;
        if job.client_id != client_id {
            return Err(ServiceError::NotAuthorized(client_id, job_id));
        }

        let payments = self.store.get_payments_for_job(job_id).await?;
        let pending = payments
            .iter()
            .find(|p| p.payment_status == PaymentStatus::Pending)
            .ok_or_else(|| ServiceError::PaymentNotFound(format!("pending payment for job {}", job_id)))?;

        let outcome = self.gateway.query_charge(&pending.transaction_reference).await?;
        self.reconcile(&pending.transaction_reference, outcome).await?;

        let all_payments = self.store.get_payments_for_job(job_id).await?;
        Ok(summarize_payments(all_payments))
    }
}

/// `payment` is the completed one if any, else the newest pending, else the newest.
fn summarize_payments(all_payments: Vec<Payment>) -> PaymentStatusDto {
    let completed = all_payments
        .iter()
        .find(|p| p.payment_status == PaymentStatus::Completed);
    let pending = all_payments
        .iter()
        .find(|p| p.payment_status == PaymentStatus::Pending);

    let payment = completed
        .or(pending)
        .or_else(|| all_payments.first())
        .cloned();

    PaymentStatusDto {
        has_payment: !all_payments.is_empty(),
        is_paid: completed.is_some(),
        is_pending: pending.is_some(),
        payment,
        all_payments,
    }
}
