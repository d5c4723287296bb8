// db/trackingdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::{
    jobmodel::{GeoPoint, NewTrackingPoint, TrackingPoint},
    usermodel::DriverLocation,
};

#[async_trait]
pub trait TrackingExt {
    /// Appends only while the job is in transit with this driver; `None` otherwise.
    async fn insert_tracking_point(&self, point: NewTrackingPoint)
        -> Result<Option<TrackingPoint>, Error>;

    /// Mirrors the last known position onto the driver's profile.
    async fn update_driver_location(
        &self,
        driver_id: Uuid,
        position: GeoPoint,
    ) -> Result<(), Error>;

    async fn get_driver_location(&self, driver_id: Uuid)
        -> Result<Option<DriverLocation>, Error>;

    /// Most recent first.
    async fn get_recent_tracking_points(
        &self,
        job_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TrackingPoint>, Error>;
}

#[async_trait]
impl TrackingExt for DBClient {
    async fn insert_tracking_point(
        &self,
        point: NewTrackingPoint,
    ) -> Result<Option<TrackingPoint>, Error> {
        sqlx::query_as::<_, TrackingPoint>(
            r#"
            INSERT INTO job_tracking (job_id, driver_id, latitude, longitude, speed_kmh, heading, accuracy_meters)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE EXISTS (
                SELECT 1 FROM jobs
                WHERE id = $1 AND driver_id = $2 AND status = 'in_transit'
            )
            RETURNING id, job_id, driver_id, latitude, longitude, speed_kmh, heading, accuracy_meters, recorded_at
            "#,
        )
        .bind(point.job_id)
        .bind(point.driver_id)
        .bind(point.position.lat)
        .bind(point.position.lng)
        .bind(point.speed_kmh)
        .bind(point.heading)
        .bind(point.accuracy_meters)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_driver_location(
        &self,
        driver_id: Uuid,
        position: GeoPoint,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO driver_profiles (user_id, current_lat, current_lng, last_location_update)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET current_lat = EXCLUDED.current_lat,
                current_lng = EXCLUDED.current_lng,
                last_location_update = EXCLUDED.last_location_update
            "#,
        )
        .bind(driver_id)
        .bind(position.lat)
        .bind(position.lng)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_driver_location(
        &self,
        driver_id: Uuid,
    ) -> Result<Option<DriverLocation>, Error> {
        sqlx::query_as::<_, DriverLocation>(
            r#"
            SELECT user_id, current_lat, current_lng, last_location_update
            FROM driver_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_recent_tracking_points(
        &self,
        job_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TrackingPoint>, Error> {
        sqlx::query_as::<_, TrackingPoint>(
            r#"
            SELECT id, job_id, driver_id, latitude, longitude, speed_kmh, heading, accuracy_meters, recorded_at
            FROM job_tracking
            WHERE job_id = $1
            ORDER BY recorded_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(job_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
