// service/delivery_service.rs
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::LogisticsStore,
    dtos::jobdtos::{DeliveryConfirmationDto, ProofOfDeliveryDto},
    models::{
        jobmodel::{JobStatus, NewProofOfDelivery, ProofOfDelivery},
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError,
        job_state::JobAction,
        storage::{decode_photo, ObjectStorage},
    },
};

pub struct DeliveryService {
    store: Arc<dyn LogisticsStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl DeliveryService {
    pub fn new(store: Arc<dyn LogisticsStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    /// Records proof of delivery and closes the job. Either both are written or neither.
    pub async fn confirm_delivery(
        &self,
        driver_id: Uuid,
        dto: ProofOfDeliveryDto,
    ) -> Result<DeliveryConfirmationDto, ServiceError> {
        // A malformed photo is the caller's fault and is refused before anything is written.
        let photo = match dto.photo_base64.as_deref() {
            Some(encoded) if !encoded.trim().is_empty() => Some(decode_photo(encoded)?),
            _ => None,
        };

        let job = self
            .store
            .get_job_by_id(dto.job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(dto.job_id))?;

        if job.driver_id != Some(driver_id) {
            return Err(ServiceError::NotAuthorized(driver_id, job.id));
        }

        if job.status != JobStatus::InTransit {
            return Err(ServiceError::InvalidState(
                job.id,
                job.status,
                "Job must be in transit to mark as delivered".to_string(),
            ));
        }

        let photo_url = match photo {
            Some(bytes) => self.upload_photo(job.id, bytes).await,
            None => None,
        };

        let proof = NewProofOfDelivery {
            recipient_name: dto.recipient_name.trim().to_string(),
            recipient_phone: dto.recipient_phone,
            notes: dto.notes,
            photo_url,
        };

        match self.store.deliver_job_with_proof(job.id, driver_id, proof).await? {
            Some((job, proof_of_delivery)) => {
                tracing::info!(
                    job_id = %job.id,
                    driver_id = %driver_id,
                    has_photo = proof_of_delivery.photo_url.is_some(),
                    "Job delivered"
                );
                Ok(DeliveryConfirmationDto {
                    job,
                    proof_of_delivery,
                })
            }
            None => Err(ServiceError::InvalidTransition(
                job.id,
                JobAction::Deliver.to_str().to_string(),
            )),
        }
    }

    /// Upload failures leave the delivery without a photo.
    async fn upload_photo(&self, job_id: Uuid, bytes: Vec<u8>) -> Option<String> {
        let path = format!(
            "proof-of-delivery/pod-{}-{}.jpg",
            job_id,
            Utc::now().timestamp_millis()
        );

        match self.storage.put(&path, bytes, "image/jpeg").await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Delivery photo upload failed");
                None
            }
        }
    }

    pub async fn get_proof_of_delivery(
        &self,
        user: &User,
        job_id: Uuid,
    ) -> Result<Option<ProofOfDelivery>, ServiceError> {
        let job = self
            .store
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if user.role != UserRole::Admin && !job.is_participant(user.id) {
            return Err(ServiceError::NotAuthorized(user.id, job_id));
        }

        Ok(self.store.get_proof_of_delivery(job_id).await?)
    }
}
