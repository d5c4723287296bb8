// service/tracking_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::LogisticsStore,
    dtos::jobdtos::{TrackingHistoryDto, TrackingUpdateDto, MAX_TRACKING_POINTS},
    models::{
        jobmodel::{GeoPoint, JobStatus, NewTrackingPoint, TrackingPoint},
        usermodel::{User, UserRole},
    },
    service::error::ServiceError,
};

pub struct TrackingService {
    store: Arc<dyn LogisticsStore>,
}

impl TrackingService {
    pub fn new(store: Arc<dyn LogisticsStore>) -> Self {
        Self { store }
    }

    /// Appends a GPS fix for an in-transit job. The driver-location mirror is
    /// best effort and never fails the request.
    pub async fn record_position(
        &self,
        driver_id: Uuid,
        dto: TrackingUpdateDto,
    ) -> Result<TrackingPoint, ServiceError> {
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
                "Tracking is only available for jobs in transit".to_string(),
            ));
        }

        let position = GeoPoint {
            lat: dto.latitude,
            lng: dto.longitude,
        };

        let point = self
            .store
            .insert_tracking_point(NewTrackingPoint {
                job_id: job.id,
                driver_id,
                position,
                speed_kmh: dto.speed_kmh.unwrap_or(0.0),
                heading: dto.heading.unwrap_or(0.0),
                accuracy_meters: dto.accuracy_meters.unwrap_or(0.0),
            })
            .await?
            // Delivered or reassigned between the read above and the insert.
            .ok_or_else(|| ServiceError::InvalidTransition(job.id, "track".to_string()))?;

        if let Err(e) = self.store.update_driver_location(driver_id, position).await {
            tracing::warn!(driver_id = %driver_id, error = %e, "Failed to update driver location");
        }

        tracing::debug!(job_id = %job.id, lat = position.lat, lng = position.lng, "Tracking point recorded");

        Ok(point)
    }

    /// Most recent first, at most 100 points.
    pub async fn recent_positions(
        &self,
        user: &User,
        job_id: Uuid,
        limit: Option<i64>,
    ) -> Result<TrackingHistoryDto, ServiceError> {
        let job = self
            .store
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if user.role != UserRole::Admin && !job.is_participant(user.id) {
            return Err(ServiceError::NotAuthorized(user.id, job_id));
        }

        let limit = limit.unwrap_or(MAX_TRACKING_POINTS).clamp(1, MAX_TRACKING_POINTS);
        let points = self.store.get_recent_tracking_points(job_id, limit).await?;

        let driver_location = match job.driver_id {
            Some(driver_id) => self.store.get_driver_location(driver_id).await.unwrap_or_else(|e| {
                tracing::warn!(driver_id = %driver_id, error = %e, "Failed to load driver location");
                None
            }),
            None => None,
        };

        Ok(TrackingHistoryDto {
            job_id,
            status: job.status,
            points,
            driver_location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory::MemoryStore, trackingdb::TrackingExt};

    fn fix(job_id: Uuid, lat: f64) -> TrackingUpdateDto {
        TrackingUpdateDto {
            job_id,
            latitude: lat,
            longitude: 36.82,
            speed_kmh: Some(40.0),
            heading: None,
            accuracy_meters: Some(5.0),
        }
    }

    #[tokio::test]
    async fn tracking_requires_assigned_driver_and_transit() {
        let store = Arc::new(MemoryStore::new());
        let service = TrackingService::new(store.clone());
        let client = store.add_user(UserRole::Client);
        let driver = store.add_user(UserRole::Driver);
        let intruder = store.add_user(UserRole::Driver);

        let accepted = store.seed_job(client.id, Some(driver.id), JobStatus::Accepted);
        let moving = store.seed_job(client.id, Some(driver.id), JobStatus::InTransit);

        assert!(matches!(
            service.record_position(driver.id, fix(Uuid::new_v4(), -1.2)).await,
            Err(ServiceError::JobNotFound(_))
        ));
        assert!(matches!(
            service.record_position(intruder.id, fix(moving.id, -1.2)).await,
            Err(ServiceError::NotAuthorized(_, _))
        ));
        assert!(matches!(
            service.record_position(driver.id, fix(accepted.id, -1.2)).await,
            Err(ServiceError::InvalidState(_, JobStatus::Accepted, _))
        ));
        assert_eq!(store.tracking_count(accepted.id), 0);

        let point = service.record_position(driver.id, fix(moving.id, -1.2)).await.unwrap();
        assert_eq!(point.latitude, -1.2);
        assert_eq!(point.heading, 0.0);
        assert_eq!(store.tracking_count(moving.id), 1);

        let location = store.get_driver_location(driver.id).await.unwrap().unwrap();
        assert_eq!(location.current_lat, Some(-1.2));
    }

    #[tokio::test]
    async fn history_is_newest_first_clamped_and_participant_only() {
        let store = Arc::new(MemoryStore::new());
        let service = TrackingService::new(store.clone());
        let client = store.add_user(UserRole::Client);
        let driver = store.add_user(UserRole::Driver);
        let stranger = store.add_user(UserRole::Client);
        let admin = store.add_user(UserRole::Admin);
        let job = store.seed_job(client.id, Some(driver.id), JobStatus::InTransit);

        for i in 0..5 {
            service
                .record_position(driver.id, fix(job.id, -1.0 - i as f64 * 0.25))
                .await
                .unwrap();
        }

        let history = service.recent_positions(&client, job.id, Some(3)).await.unwrap();
        assert_eq!(history.points.len(), 3);
        assert_eq!(history.points[0].latitude, -2.0);
        assert!(history.driver_location.is_some());

        let history = service.recent_positions(&admin, job.id, Some(0)).await.unwrap();
        assert_eq!(history.points.len(), 1);

        let history = service.recent_positions(&driver, job.id, Some(10_000)).await.unwrap();
        assert_eq!(history.points.len(), 5);

        assert!(matches!(
            service.recent_positions(&stranger, job.id, None).await,
            Err(ServiceError::NotAuthorized(_, _))
        ));
    }

    #[tokio::test]
    async fn store_refuses_points_once_the_job_leaves_transit() {
        let store = Arc::new(MemoryStore::new());
        let client = store.add_user(UserRole::Client);
        let driver = store.add_user(UserRole::Driver);
        let delivered = store.seed_job(client.id, Some(driver.id), JobStatus::Delivered);

        let point = |job_id: Uuid, driver_id: Uuid| NewTrackingPoint {
            job_id,
            driver_id,
            position: GeoPoint { lat: -1.3, lng: 36.8 },
            speed_kmh: 0.0,
            heading: 0.0,
            accuracy_meters: 0.0,
        };

        assert!(store.insert_tracking_point(point(delivered.id, driver.id)).await.unwrap().is_none());
        assert_eq!(store.tracking_count(delivered.id), 0);

        let moving = store.seed_job(client.id, Some(driver.id), JobStatus::InTransit);
        let other = store.add_user(UserRole::Driver);
        assert!(store.insert_tracking_point(point(moving.id, other.id)).await.unwrap().is_none());
        assert!(store.insert_tracking_point(point(moving.id, driver.id)).await.unwrap().is_some());
    }
}
