// service/job_service.rs
use std::sync::Arc;

use chrono::{Datelike, TimeZone, Utc};
use num_traits::ToPrimitive;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::LogisticsStore,
    dtos::jobdtos::*,
    models::{
        jobmodel::*,
        materialmodel::Material,
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError,
        job_state::JobAction,
        pricing_service::{MaterialSelection, PriceQuote, PricingEngine, WeightAdvisory},
    },
    utils::currency::{decimal_from_f64, format_one_decimal},
};

const ADMIN_JOB_LIST_LIMIT: i64 = 500;

pub struct JobService {
    store: Arc<dyn LogisticsStore>,
    pricing: Arc<PricingEngine>,
}

/// Clients see their jobs, drivers their assigned jobs and the open board, admins everything.
pub fn ensure_can_view(job: &Job, user: &User) -> Result<(), ServiceError> {
    let open_to_driver = user.role == UserRole::Driver && job.status == JobStatus::Pending;
    if user.role == UserRole::Admin || job.is_participant(user.id) || open_to_driver {
        Ok(())
    } else {
        Err(ServiceError::NotAuthorized(user.id, job.id))
    }
}

/// Human-facing job reference, e.g. `JOB-20240315-9F2C4A1B`.
pub fn generate_job_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("JOB-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

impl JobService {
    pub fn new(store: Arc<dyn LogisticsStore>, pricing: Arc<PricingEngine>) -> Self {
        Self { store, pricing }
    }

    pub async fn list_materials(&self) -> Result<Vec<Material>, ServiceError> {
        Ok(self.store.get_active_materials().await?)
    }

    async fn quote(
        &self,
        distance_km: f64,
        materials: &[MaterialSelectionDto],
    ) -> Result<PriceQuote, ServiceError> {
        let distance = decimal_from_f64(distance_km)
            .ok_or_else(|| ServiceError::Validation("Valid distance is required".to_string()))?;

        let selections: Vec<MaterialSelection> = materials
            .iter()
            .map(|m| MaterialSelection {
                material_id: m.material_id,
                quantity: m.quantity,
            })
            .collect();

        let ids: Vec<Uuid> = selections.iter().map(|s| s.material_id).collect();
        let catalog = self.store.get_materials_by_ids(&ids).await?;

        self.pricing.compute_price(&distance, &selections, &catalog)
    }

    pub async fn calculate_price(&self, dto: &PriceCalculationDto) -> Result<PriceQuote, ServiceError> {
        self.quote(dto.distance_km, &dto.materials).await
    }

    pub async fn create_job(
        &self,
        client_id: Uuid,
        dto: CreateJobDto,
    ) -> Result<JobDetails, ServiceError> {
        validate_stops(&dto.stops)?;

        let quote = self.quote(dto.total_distance_km, &dto.materials).await?;

        match self.pricing.weight_advisory(&quote.total_weight_kg) {
            WeightAdvisory::Blocked => {
                return Err(ServiceError::Validation(format!(
                    "Load of {}kg exceeds the vehicle capacity and cannot be booked",
                    format_one_decimal(&quote.total_weight_kg)
                )));
            }
            WeightAdvisory::Overweight if !dto.overweight_acknowledged => {
                return Err(ServiceError::Validation(format!(
                    "Load of {}kg is over capacity; acknowledge the overweight warning to continue",
                    format_one_decimal(&quote.total_weight_kg)
                )));
            }
            _ => {}
        }

        let stops = dto
            .stops
            .iter()
            .enumerate()
            .map(|(index, stop)| NewJobStop {
                stop_order: index as i32 + 1,
                stop_type: stop.stop_type,
                address: stop.address.trim().to_string(),
                location: GeoPoint {
                    lat: stop.lat,
                    lng: stop.lng,
                },
                contact_name: stop.contact_name.clone(),
                contact_phone: stop.contact_phone.clone(),
                is_difficult_access: stop.is_difficult_access,
                access_notes: stop.access_notes.clone(),
            })
            .collect();

        let materials = quote
            .materials
            .iter()
            .map(|line| NewJobMaterial {
                material_id: line.material_id,
                quantity: line.quantity,
                unit_weight_kg: line.unit_weight_kg.clone(),
                total_weight_kg: line.total_weight_kg.clone(),
                handling_fee: line.handling_fee.clone(),
            })
            .collect();

        let new_job = NewJob {
            job_number: generate_job_number(),
            client_id,
            total_distance_km: quote.total_distance_km.clone(),
            estimated_duration_minutes: quote.estimated_duration_minutes.to_i32().unwrap_or(i32::MAX),
            base_fee: quote.base_fee,
            distance_fee: quote.distance_fee,
            handling_fee: quote.handling_fee,
            subtotal: quote.subtotal,
            platform_fee: quote.platform_fee,
            total_amount: quote.total_amount,
            total_weight_kg: quote.total_weight_kg,
            is_overweight: quote.is_overweight,
            overweight_acknowledged: dto.overweight_acknowledged,
            requires_straps: quote.requires_straps,
            requires_tarp: quote.requires_tarp,
            has_fragile_items: quote.has_fragile_items,
            special_instructions: dto.special_instructions,
            scheduled_pickup_time: dto.scheduled_pickup_time,
            stops,
            materials,
        };

        let details = self.store.create_job(new_job).await?;

        tracing::info!(
            job_id = %details.job.id,
            job_number = %details.job.job_number,
            client_id = %client_id,
            total = %details.job.total_amount,
            "Job created"
        );

        Ok(details)
    }

    pub async fn list_jobs(
        &self,
        user: &User,
        status: Option<JobStatus>,
    ) -> Result<Vec<Job>, ServiceError> {
        let jobs = match user.role {
            UserRole::Client => self.store.get_jobs_for_client(user.id).await?,
            UserRole::Driver => self.store.get_jobs_for_driver(user.id).await?,
            UserRole::Admin => self.store.get_all_jobs(ADMIN_JOB_LIST_LIMIT).await?,
        };

        Ok(match status {
            Some(status) => jobs.into_iter().filter(|j| j.status == status).collect(),
            None => jobs,
        })
    }

    pub async fn available_jobs(&self) -> Result<Vec<Job>, ServiceError> {
        Ok(self.store.get_available_jobs().await?)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.store
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    pub async fn get_job_details(&self, user: &User, job_id: Uuid) -> Result<JobDetails, ServiceError> {
        let job = self.get_job(job_id).await?;
        ensure_can_view(&job, user)?;

        let (stops, materials) = futures::try_join!(
            self.store.get_job_stops(job_id),
            self.store.get_job_materials(job_id)
        )?;

        Ok(JobDetails {
            job,
            stops,
            materials,
        })
    }

    /// Claims a pending job. Under contention exactly one driver gets `Ok`.
    pub async fn accept_job(&self, job_id: Uuid, driver_id: Uuid) -> Result<Job, ServiceError> {
        match self.store.accept_job(job_id, driver_id).await? {
            Some(job) => {
                tracing::info!(job_id = %job_id, driver_id = %driver_id, "Job accepted");
                Ok(job)
            }
            None => Err(self.guard_failure(job_id, JobAction::Accept).await?),
        }
    }

    pub async fn start_transit(&self, job_id: Uuid, driver_id: Uuid) -> Result<Job, ServiceError> {
        let job = self.get_job(job_id).await?;
        if job.driver_id != Some(driver_id) {
            return Err(ServiceError::NotAuthorized(driver_id, job_id));
        }

        match self.store.start_job_transit(job_id, driver_id).await? {
            Some(job) => {
                tracing::info!(job_id = %job_id, driver_id = %driver_id, "Job in transit");
                Ok(job)
            }
            None => Err(ServiceError::InvalidTransition(
                job_id,
                JobAction::StartTransit.to_str().to_string(),
            )),
        }
    }

    pub async fn cancel_job(&self, user: &User, job_id: Uuid) -> Result<Job, ServiceError> {
        let job = self.get_job(job_id).await?;
        if user.role != UserRole::Admin && job.client_id != user.id {
            return Err(ServiceError::NotAuthorized(user.id, job_id));
        }

        match self.store.cancel_job(job_id).await? {
            Some(job) => {
                tracing::info!(job_id = %job_id, cancelled_by = %user.id, "Job cancelled");
                Ok(job)
            }
            None => Err(ServiceError::InvalidTransition(
                job_id,
                JobAction::Cancel.to_str().to_string(),
            )),
        }
    }

    /// Entry point for `PATCH /jobs/:id`. Delivery goes through proof of delivery.
    pub async fn apply_action(
        &self,
        user: &User,
        job_id: Uuid,
        action: JobAction,
    ) -> Result<Job, ServiceError> {
        match action {
            JobAction::Accept | JobAction::StartTransit if user.role != UserRole::Driver => {
                Err(ServiceError::NotAuthorized(user.id, job_id))
            }
            JobAction::Accept => self.accept_job(job_id, user.id).await,
            JobAction::StartTransit => self.start_transit(job_id, user.id).await,
            JobAction::Cancel => self.cancel_job(user, job_id).await,
            JobAction::Deliver => Err(ServiceError::Validation(
                "Deliveries are confirmed by submitting proof of delivery".to_string(),
            )),
        }
    }

    async fn guard_failure(&self, job_id: Uuid, action: JobAction) -> Result<ServiceError, ServiceError> {
        match self.store.get_job_by_id(job_id).await? {
            None => Ok(ServiceError::JobNotFound(job_id)),
            Some(_) => Ok(ServiceError::InvalidTransition(job_id, action.to_str().to_string())),
        }
    }

    pub async fn driver_earnings(&self, driver_id: Uuid) -> Result<DriverEarningsDto, ServiceError> {
        let delivered = self.store.get_driver_delivered_jobs(driver_id).await?;

        let mut total_earnings = BigDecimal::from(0);
        let jobs: Vec<DriverJobEarning> = delivered
            .into_iter()
            .map(|job| {
                let earnings = self.pricing.driver_earnings(&job.total_amount);
                total_earnings += &earnings;
                DriverJobEarning {
                    job_id: job.id,
                    job_number: job.job_number,
                    total_amount: job.total_amount,
                    earnings,
                    delivered_at: job.actual_delivery_time,
                }
            })
            .collect();

        Ok(DriverEarningsDto {
            completed_jobs: jobs.len() as i64,
            total_earnings,
            earnings_percentage: self.pricing.config().driver_earnings_percentage.clone(),
            jobs,
        })
    }

    pub async fn admin_stats(&self) -> Result<AdminStatsDto, ServiceError> {
        let now = Utc::now();
        let month_start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(now);

        let jobs = self.store.get_job_counts().await?;
        let users = self.store.get_user_counts().await?;
        let revenue = self.store.get_revenue_summary(month_start).await?;

        Ok(AdminStatsDto {
            jobs,
            users,
            revenue,
        })
    }
}

/// Exactly one pickup, first in the route, followed by delivery stops.
fn validate_stops(stops: &[JobStopDto]) -> Result<(), ServiceError> {
    if stops.len() < 2 || stops.len() as u64 > MAX_STOPS_PER_JOB {
        return Err(ServiceError::Validation(format!(
            "A job needs between 2 and {} stops",
            MAX_STOPS_PER_JOB
        )));
    }

    let pickups = stops.iter().filter(|s| s.stop_type == StopType::Pickup).count();
    if pickups != 1 || stops[0].stop_type != StopType::Pickup {
        return Err(ServiceError::Validation(
            "The first stop must be the only pickup location".to_string(),
        ));
    }

    Ok(())
}
