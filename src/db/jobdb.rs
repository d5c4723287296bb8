// db/jobdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::{
    models::jobmodel::*,
    service::job_state::JobAction,
};

const JOB_COLUMNS: &str = r#"
    id, job_number, client_id, driver_id, status,
    total_distance_km, estimated_duration_minutes,
    base_fee, distance_fee, handling_fee, subtotal, platform_fee, total_amount,
    total_weight_kg, is_overweight, overweight_acknowledged,
    requires_straps, requires_tarp, has_fragile_items, special_instructions,
    scheduled_pickup_time, actual_pickup_time, actual_delivery_time,
    created_at, updated_at
"#;

const STOP_COLUMNS: &str = r#"
    id, job_id, stop_order, stop_type, address, location_lat, location_lng,
    contact_name, contact_phone, is_difficult_access, access_notes, created_at
"#;

const JOB_MATERIAL_COLUMNS: &str = r#"
    id, job_id, material_id, quantity, unit_weight_kg, total_weight_kg, handling_fee, created_at
"#;

const POD_COLUMNS: &str = r#"
    id, job_id, recipient_name, recipient_phone, notes, photo_url, delivered_at
"#;

#[async_trait]
pub trait JobExt {
    /// Inserts the job with its stops and material lines in one transaction.
    async fn create_job(&self, new_job: NewJob) -> Result<JobDetails, Error>;

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    async fn get_job_stops(&self, job_id: Uuid) -> Result<Vec<JobStop>, Error>;

    async fn get_job_materials(&self, job_id: Uuid) -> Result<Vec<JobMaterial>, Error>;

    async fn get_jobs_for_client(&self, client_id: Uuid) -> Result<Vec<Job>, Error>;

    async fn get_jobs_for_driver(&self, driver_id: Uuid) -> Result<Vec<Job>, Error>;

    async fn get_all_jobs(&self, limit: i64) -> Result<Vec<Job>, Error>;

    async fn get_available_jobs(&self) -> Result<Vec<Job>, Error>;

    /// Guarded transitions. `None` means the guard did not hold and nothing changed.
    async fn accept_job(&self, job_id: Uuid, driver_id: Uuid) -> Result<Option<Job>, Error>;

    async fn start_job_transit(&self, job_id: Uuid, driver_id: Uuid)
        -> Result<Option<Job>, Error>;

    async fn cancel_job(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    /// Flips the job to delivered and records proof in one transaction.
    /// `None` when the job was not in transit for this driver; nothing is written.
    async fn deliver_job_with_proof(
        &self,
        job_id: Uuid,
        driver_id: Uuid,
        proof: NewProofOfDelivery,
    ) -> Result<Option<(Job, ProofOfDelivery)>, Error>;

    async fn get_proof_of_delivery(&self, job_id: Uuid)
        -> Result<Option<ProofOfDelivery>, Error>;

    async fn get_job_counts(&self) -> Result<JobCounts, Error>;

    async fn get_revenue_summary(&self, month_start: DateTime<Utc>)
        -> Result<RevenueSummary, Error>;

    async fn get_driver_delivered_jobs(&self, driver_id: Uuid) -> Result<Vec<Job>, Error>;
}

#[async_trait]
impl JobExt for DBClient {
    async fn create_job(&self, new_job: NewJob) -> Result<JobDetails, Error> {
        let mut tx = self.pool.begin().await?;

        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs (
                job_number, client_id, status,
                total_distance_km, estimated_duration_minutes,
                base_fee, distance_fee, handling_fee, subtotal, platform_fee, total_amount,
                total_weight_kg, is_overweight, overweight_acknowledged,
                requires_straps, requires_tarp, has_fragile_items,
                special_instructions, scheduled_pickup_time
            )
            VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(&new_job.job_number)
        .bind(new_job.client_id)
        .bind(&new_job.total_distance_km)
        .bind(new_job.estimated_duration_minutes)
        .bind(&new_job.base_fee)
        .bind(&new_job.distance_fee)
        .bind(&new_job.handling_fee)
        .bind(&new_job.subtotal)
        .bind(&new_job.platform_fee)
        .bind(&new_job.total_amount)
        .bind(&new_job.total_weight_kg)
        .bind(new_job.is_overweight)
        .bind(new_job.overweight_acknowledged)
        .bind(new_job.requires_straps)
        .bind(new_job.requires_tarp)
        .bind(new_job.has_fragile_items)
        .bind(&new_job.special_instructions)
        .bind(new_job.scheduled_pickup_time)
        .fetch_one(&mut *tx)
        .await?;

        let mut stops = Vec::with_capacity(new_job.stops.len());
        for stop in &new_job.stops {
            let row = sqlx::query_as::<_, JobStop>(&format!(
                r#"
                INSERT INTO job_stops (
                    job_id, stop_order, stop_type, address, location_lat, location_lng,
                    contact_name, contact_phone, is_difficult_access, access_notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING {}
                "#,
                STOP_COLUMNS
            ))
            .bind(job.id)
            .bind(stop.stop_order)
            .bind(stop.stop_type)
            .bind(&stop.address)
            .bind(stop.location.lat)
            .bind(stop.location.lng)
            .bind(&stop.contact_name)
            .bind(&stop.contact_phone)
            .bind(stop.is_difficult_access)
            .bind(&stop.access_notes)
            .fetch_one(&mut *tx)
            .await?;
            stops.push(row);
        }

        let mut materials = Vec::with_capacity(new_job.materials.len());
        for line in &new_job.materials {
            let row = sqlx::query_as::<_, JobMaterial>(&format!(
                r#"
                INSERT INTO job_materials (
                    job_id, material_id, quantity, unit_weight_kg, total_weight_kg, handling_fee
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {}
                "#,
                JOB_MATERIAL_COLUMNS
            ))
            .bind(job.id)
            .bind(line.material_id)
            .bind(line.quantity)
            .bind(&line.unit_weight_kg)
            .bind(&line.total_weight_kg)
            .bind(&line.handling_fee)
            .fetch_one(&mut *tx)
            .await?;
            materials.push(row);
        }

        tx.commit().await?;

        Ok(JobDetails {
            job,
            stops,
            materials,
        })
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_job_stops(&self, job_id: Uuid) -> Result<Vec<JobStop>, Error> {
        sqlx::query_as::<_, JobStop>(&format!(
            "SELECT {} FROM job_stops WHERE job_id = $1 ORDER BY stop_order",
            STOP_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_job_materials(&self, job_id: Uuid) -> Result<Vec<JobMaterial>, Error> {
        sqlx::query_as::<_, JobMaterial>(&format!(
            "SELECT {} FROM job_materials WHERE job_id = $1 ORDER BY created_at",
            JOB_MATERIAL_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_jobs_for_client(&self, client_id: Uuid) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE client_id = $1 ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_jobs_for_driver(&self, driver_id: Uuid) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE driver_id = $1 ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_all_jobs(&self, limit: i64) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs ORDER BY created_at DESC LIMIT $1",
            JOB_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_available_jobs(&self) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE status = 'pending' ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn accept_job(&self, job_id: Uuid, driver_id: Uuid) -> Result<Option<Job>, Error> {
        // Single statement: concurrent accepts serialize on the row lock and
        // only the first sees the guard hold.
        sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET driver_id = $2, status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND status::text = ANY($3)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job_id)
        .bind(driver_id)
        .bind(JobAction::Accept.guard_values())
        .fetch_optional(&self.pool)
        .await
    }

    async fn start_job_transit(
        &self,
        job_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'in_transit', actual_pickup_time = NOW(), updated_at = NOW()
            WHERE id = $1 AND driver_id = $2 AND status::text = ANY($3)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job_id)
        .bind(driver_id)
        .bind(JobAction::StartTransit.guard_values())
        .fetch_optional(&self.pool)
        .await
    }

    async fn cancel_job(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'cancelled', driver_id = NULL, updated_at = NOW()
            WHERE id = $1 AND status::text = ANY($2)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job_id)
        .bind(JobAction::Cancel.guard_values())
        .fetch_optional(&self.pool)
        .await
    }

    async fn deliver_job_with_proof(
        &self,
        job_id: Uuid,
        driver_id: Uuid,
        proof: NewProofOfDelivery,
    ) -> Result<Option<(Job, ProofOfDelivery)>, Error> {
        let mut tx = self.pool.begin().await?;

        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'delivered', actual_delivery_time = NOW(), updated_at = NOW()
            WHERE id = $1 AND driver_id = $2 AND status::text = ANY($3)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job_id)
        .bind(driver_id)
        .bind(JobAction::Deliver.guard_values())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = job else {
            tx.rollback().await?;
            return Ok(None);
        };

        let pod = sqlx::query_as::<_, ProofOfDelivery>(&format!(
            r#"
            INSERT INTO proof_of_delivery (job_id, recipient_name, recipient_phone, notes, photo_url, delivered_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING {}
            "#,
            POD_COLUMNS
        ))
        .bind(job_id)
        .bind(&proof.recipient_name)
        .bind(&proof.recipient_phone)
        .bind(&proof.notes)
        .bind(&proof.photo_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some((job, pod)))
    }

    async fn get_proof_of_delivery(
        &self,
        job_id: Uuid,
    ) -> Result<Option<ProofOfDelivery>, Error> {
        sqlx::query_as::<_, ProofOfDelivery>(&format!(
            "SELECT {} FROM proof_of_delivery WHERE job_id = $1",
            POD_COLUMNS
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_job_counts(&self) -> Result<JobCounts, Error> {
        sqlx::query_as::<_, JobCounts>(
            r#"
            SELECT
                COUNT(*)::BIGINT AS total,
                COUNT(*) FILTER (WHERE status = 'pending')::BIGINT AS pending,
                COUNT(*) FILTER (WHERE status IN ('accepted', 'in_transit'))::BIGINT AS active,
                COUNT(*) FILTER (WHERE status = 'delivered')::BIGINT AS completed,
                COUNT(*) FILTER (WHERE status = 'cancelled')::BIGINT AS cancelled
            FROM jobs
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    async fn get_revenue_summary(
        &self,
        month_start: DateTime<Utc>,
    ) -> Result<RevenueSummary, Error> {
        sqlx::query_as::<_, RevenueSummary>(
            r#"
            SELECT
                COALESCE(SUM(total_amount), 0) AS total_revenue,
                COALESCE(SUM(platform_fee) FILTER (WHERE actual_delivery_time >= $1), 0)
                    AS platform_fees_this_month
            FROM jobs
            WHERE status = 'delivered'
            "#,
        )
        .bind(month_start)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_driver_delivered_jobs(&self, driver_id: Uuid) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {} FROM jobs
            WHERE driver_id = $1 AND status = 'delivered'
            ORDER BY actual_delivery_time DESC NULLS LAST
            "#,
            JOB_COLUMNS
        ))
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await
    }
}
