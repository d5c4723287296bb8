// db/memory.rs
//
// In-process store for service and router tests. Every guarded write runs its
// check and its mutation under one lock, matching the single-statement
// conditional updates of the Postgres implementation.
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_traits::Zero;
use sqlx::Error;
use uuid::Uuid;

use super::{
    jobdb::JobExt, materialdb::MaterialExt, paymentdb::PaymentExt, trackingdb::TrackingExt,
    userdb::UserExt,
};
use crate::{
    models::{
        jobmodel::*,
        materialmodel::Material,
        paymentmodel::{NewPayment, Payment, PaymentStatus},
        usermodel::{
            ClientProfile, DriverLocation, DriverProfile, User, UserCounts, UserRole,
        },
    },
    service::job_state::{next_status, JobAction},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    client_profiles: Vec<ClientProfile>,
    driver_profiles: Vec<DriverProfile>,
    // Location columns of `driver_profiles`.
    driver_locations: Vec<DriverLocation>,
    materials: Vec<Material>,
    jobs: Vec<Job>,
    stops: Vec<JobStop>,
    job_materials: Vec<JobMaterial>,
    tracking: Vec<TrackingPoint>,
    proofs: Vec<ProofOfDelivery>,
    payments: Vec<Payment>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// When set, the next deliver call fails at the proof insert and rolls back.
    fail_next_proof_insert: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn add_user(&self, role: UserRole) -> User {
        let id = Uuid::new_v4();
        let user = User {
            id,
            email: format!("{}@sitelink.test", id.simple()),
            full_name: format!("Test {}", role.to_str()),
            phone: "0712345678".to_string(),
            role,
            is_active: true,
            created_at: Utc::now(),
        };
        self.lock().users.push(user.clone());
        user
    }

    pub fn add_client_profile(&self, user_id: Uuid, company_name: &str) {
        self.lock().client_profiles.push(ClientProfile {
            user_id,
            company_name: Some(company_name.to_string()),
            business_type: Some("contractor".to_string()),
        });
    }

    pub fn add_driver_profile(&self, user_id: Uuid, license_number: &str) {
        self.lock().driver_profiles.push(DriverProfile {
            user_id,
            license_number: Some(license_number.to_string()),
            license_expiry: None,
            is_verified: false,
        });
    }

    pub fn add_material(&self, material: Material) {
        self.lock().materials.push(material);
    }

    /// Inserts a job row directly in the given state, bypassing creation checks.
    pub fn seed_job(&self, client_id: Uuid, driver_id: Option<Uuid>, status: JobStatus) -> Job {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            job_number: format!("JOB-TEST-{}", &Uuid::new_v4().simple().to_string()[..8]),
            client_id,
            driver_id,
            status,
            total_distance_km: BigDecimal::from(15),
            estimated_duration_minutes: 38,
            base_fee: BigDecimal::from(500),
            distance_fee: BigDecimal::from(500),
            handling_fee: BigDecimal::from(40),
            subtotal: BigDecimal::from(1040),
            platform_fee: BigDecimal::from(208),
            total_amount: BigDecimal::from(1248),
            total_weight_kg: BigDecimal::from(200),
            is_overweight: false,
            overweight_acknowledged: false,
            requires_straps: false,
            requires_tarp: false,
            has_fragile_items: false,
            special_instructions: None,
            scheduled_pickup_time: None,
            actual_pickup_time: None,
            actual_delivery_time: if status == JobStatus::Delivered { Some(now) } else { None },
            created_at: now,
            updated_at: now,
        };
        self.lock().jobs.push(job.clone());
        job
    }

    pub fn job(&self, job_id: Uuid) -> Option<Job> {
        self.lock().jobs.iter().find(|j| j.id == job_id).cloned()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.lock().payments.clone()
    }

    pub fn tracking_count(&self, job_id: Uuid) -> usize {
        self.lock().tracking.iter().filter(|p| p.job_id == job_id).count()
    }

    pub fn fail_next_proof_insert(&self) {
        *self.fail_next_proof_insert.lock().unwrap() = true;
    }

    /// Applies a guarded transition under the table lock.
    fn transition(
        &self,
        job_id: Uuid,
        action: JobAction,
        apply: impl FnOnce(&mut Job),
        guard: impl FnOnce(&Job) -> bool,
    ) -> Option<Job> {
        let mut tables = self.lock();
        let job = tables.jobs.iter_mut().find(|j| j.id == job_id)?;
        let target = next_status(job.status, action)?;
        if !guard(job) {
            return None;
        }
        job.status = target;
        job.updated_at = Utc::now();
        apply(job);
        Some(job.clone())
    }
}

#[async_trait]
impl MaterialExt for MemoryStore {
    async fn get_active_materials(&self) -> Result<Vec<Material>, Error> {
        Ok(self.lock().materials.iter().filter(|m| m.is_active).cloned().collect())
    }

    async fn get_materials_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Material>, Error> {
        Ok(self
            .lock()
            .materials
            .iter()
            .filter(|m| m.is_active && ids.contains(&m.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserExt for MemoryStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        Ok(self.lock().users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn get_user_counts(&self) -> Result<UserCounts, Error> {
        let tables = self.lock();
        Ok(UserCounts {
            total: tables.users.len() as i64,
            clients: tables.users.iter().filter(|u| u.role == UserRole::Client).count() as i64,
            drivers: tables.users.iter().filter(|u| u.role == UserRole::Driver).count() as i64,
        })
    }

    async fn get_all_users(&self) -> Result<Vec<User>, Error> {
        let mut users = self.lock().users.clone();
        users.reverse();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn get_client_profiles(&self) -> Result<Vec<ClientProfile>, Error> {
        Ok(self.lock().client_profiles.clone())
    }

    async fn get_driver_profiles(&self) -> Result<Vec<DriverProfile>, Error> {
        Ok(self.lock().driver_profiles.clone())
    }

    async fn toggle_user_active(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        let mut tables = self.lock();
        Ok(tables.users.iter_mut().find(|u| u.id == user_id).map(|user| {
            user.is_active = !user.is_active;
            user.clone()
        }))
    }

    async fn verify_driver(&self, user_id: Uuid) -> Result<Option<DriverProfile>, Error> {
        let mut tables = self.lock();
        Ok(tables
            .driver_profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .map(|profile| {
                profile.is_verified = true;
                profile.clone()
            }))
    }
}

#[async_trait]
impl JobExt for MemoryStore {
    async fn create_job(&self, new_job: NewJob) -> Result<JobDetails, Error> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            job_number: new_job.job_number,
            client_id: new_job.client_id,
            driver_id: None,
            status: JobStatus::Pending,
            total_distance_km: new_job.total_distance_km,
            estimated_duration_minutes: new_job.estimated_duration_minutes,
            base_fee: new_job.base_fee,
            distance_fee: new_job.distance_fee,
            handling_fee: new_job.handling_fee,
            subtotal: new_job.subtotal,
            platform_fee: new_job.platform_fee,
            total_amount: new_job.total_amount,
            total_weight_kg: new_job.total_weight_kg,
            is_overweight: new_job.is_overweight,
            overweight_acknowledged: new_job.overweight_acknowledged,
            requires_straps: new_job.requires_straps,
            requires_tarp: new_job.requires_tarp,
            has_fragile_items: new_job.has_fragile_items,
            special_instructions: new_job.special_instructions,
            scheduled_pickup_time: new_job.scheduled_pickup_time,
            actual_pickup_time: None,
            actual_delivery_time: None,
            created_at: now,
            updated_at: now,
        };

        let stops: Vec<JobStop> = new_job
            .stops
            .into_iter()
            .map(|s| JobStop {
                id: Uuid::new_v4(),
                job_id: job.id,
                stop_order: s.stop_order,
                stop_type: s.stop_type,
                address: s.address,
                location_lat: s.location.lat,
                location_lng: s.location.lng,
                contact_name: s.contact_name,
                contact_phone: s.contact_phone,
                is_difficult_access: s.is_difficult_access,
                access_notes: s.access_notes,
                created_at: now,
            })
            .collect();

        let materials: Vec<JobMaterial> = new_job
            .materials
            .into_iter()
            .map(|m| JobMaterial {
                id: Uuid::new_v4(),
                job_id: job.id,
                material_id: m.material_id,
                quantity: m.quantity,
                unit_weight_kg: m.unit_weight_kg,
                total_weight_kg: m.total_weight_kg,
                handling_fee: m.handling_fee,
                created_at: now,
            })
            .collect();

        let mut tables = self.lock();
        tables.jobs.push(job.clone());
        tables.stops.extend(stops.iter().cloned());
        tables.job_materials.extend(materials.iter().cloned());

        Ok(JobDetails { job, stops, materials })
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        Ok(self.job(job_id))
    }

    async fn get_job_stops(&self, job_id: Uuid) -> Result<Vec<JobStop>, Error> {
        let mut stops: Vec<JobStop> =
            self.lock().stops.iter().filter(|s| s.job_id == job_id).cloned().collect();
        stops.sort_by_key(|s| s.stop_order);
        Ok(stops)
    }

    async fn get_job_materials(&self, job_id: Uuid) -> Result<Vec<JobMaterial>, Error> {
        Ok(self
            .lock()
            .job_materials
            .iter()
            .filter(|m| m.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn get_jobs_for_client(&self, client_id: Uuid) -> Result<Vec<Job>, Error> {
        Ok(newest_first(
            self.lock().jobs.iter().filter(|j| j.client_id == client_id).cloned().collect(),
        ))
    }

    async fn get_jobs_for_driver(&self, driver_id: Uuid) -> Result<Vec<Job>, Error> {
        Ok(newest_first(
            self.lock()
                .jobs
                .iter()
                .filter(|j| j.driver_id == Some(driver_id))
                .cloned()
                .collect(),
        ))
    }

    async fn get_all_jobs(&self, limit: i64) -> Result<Vec<Job>, Error> {
        let mut jobs = newest_first(self.lock().jobs.clone());
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }

    async fn get_available_jobs(&self) -> Result<Vec<Job>, Error> {
        Ok(newest_first(
            self.lock()
                .jobs
                .iter()
                .filter(|j| j.status == JobStatus::Pending)
                .cloned()
                .collect(),
        ))
    }

    async fn accept_job(&self, job_id: Uuid, driver_id: Uuid) -> Result<Option<Job>, Error> {
        Ok(self.transition(
            job_id,
            JobAction::Accept,
            |job| job.driver_id = Some(driver_id),
            |_| true,
        ))
    }

    async fn start_job_transit(
        &self,
        job_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<Job>, Error> {
        Ok(self.transition(
            job_id,
            JobAction::StartTransit,
            |job| job.actual_pickup_time = Some(Utc::now()),
            |job| job.driver_id == Some(driver_id),
        ))
    }

    async fn cancel_job(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        Ok(self.transition(job_id, JobAction::Cancel, |job| job.driver_id = None, |_| true))
    }

    async fn deliver_job_with_proof(
        &self,
        job_id: Uuid,
        driver_id: Uuid,
        proof: NewProofOfDelivery,
    ) -> Result<Option<(Job, ProofOfDelivery)>, Error> {
        let mut tables = self.lock();
        let Some(index) = tables.jobs.iter().position(|j| j.id == job_id) else {
            return Ok(None);
        };

        let current = &tables.jobs[index];
        let Some(target) = next_status(current.status, JobAction::Deliver) else {
            return Ok(None);
        };
        if current.driver_id != Some(driver_id) {
            return Ok(None);
        }

        // Nothing has been written yet, so failing here leaves the job untouched.
        let mut fail = self.fail_next_proof_insert.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(Error::Protocol("proof_of_delivery insert failed".to_string()));
        }
        if tables.proofs.iter().any(|p| p.job_id == job_id) {
            return Err(Error::Protocol("duplicate proof_of_delivery".to_string()));
        }

        let now = Utc::now();
        let job = &mut tables.jobs[index];
        job.status = target;
        job.actual_delivery_time = Some(now);
        job.updated_at = now;
        let job = job.clone();

        let pod = ProofOfDelivery {
            id: Uuid::new_v4(),
            job_id,
            recipient_name: proof.recipient_name,
            recipient_phone: proof.recipient_phone,
            notes: proof.notes,
            photo_url: proof.photo_url,
            delivered_at: now,
        };
        tables.proofs.push(pod.clone());

        Ok(Some((job, pod)))
    }

    async fn get_proof_of_delivery(
        &self,
        job_id: Uuid,
    ) -> Result<Option<ProofOfDelivery>, Error> {
        Ok(self.lock().proofs.iter().find(|p| p.job_id == job_id).cloned())
    }

    async fn get_job_counts(&self) -> Result<JobCounts, Error> {
        let tables = self.lock();
        let count = |statuses: &[JobStatus]| {
            tables.jobs.iter().filter(|j| statuses.contains(&j.status)).count() as i64
        };
        Ok(JobCounts {
            total: tables.jobs.len() as i64,
            pending: count(&[JobStatus::Pending]),
            active: count(&[JobStatus::Accepted, JobStatus::InTransit]),
            completed: count(&[JobStatus::Delivered]),
            cancelled: count(&[JobStatus::Cancelled]),
        })
    }

    async fn get_revenue_summary(
        &self,
        month_start: DateTime<Utc>,
    ) -> Result<RevenueSummary, Error> {
        let tables = self.lock();
        let mut summary = RevenueSummary {
            total_revenue: BigDecimal::zero(),
            platform_fees_this_month: BigDecimal::zero(),
        };
        for job in tables.jobs.iter().filter(|j| j.status == JobStatus::Delivered) {
            summary.total_revenue += &job.total_amount;
            if job.actual_delivery_time.map_or(false, |t| t >= month_start) {
                summary.platform_fees_this_month += &job.platform_fee;
            }
        }
        Ok(summary)
    }

    async fn get_driver_delivered_jobs(&self, driver_id: Uuid) -> Result<Vec<Job>, Error> {
        Ok(self
            .lock()
            .jobs
            .iter()
            .filter(|j| j.driver_id == Some(driver_id) && j.status == JobStatus::Delivered)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TrackingExt for MemoryStore {
    async fn insert_tracking_point(
        &self,
        point: NewTrackingPoint,
    ) -> Result<Option<TrackingPoint>, Error> {
        let mut tables = self.lock();
        let in_transit = tables.jobs.iter().any(|j| {
            j.id == point.job_id
                && j.driver_id == Some(point.driver_id)
                && j.status == JobStatus::InTransit
        });
        if !in_transit {
            return Ok(None);
        }

        let row = TrackingPoint {
            id: Uuid::new_v4(),
            job_id: point.job_id,
            driver_id: point.driver_id,
            latitude: point.position.lat,
            longitude: point.position.lng,
            speed_kmh: point.speed_kmh,
            heading: point.heading,
            accuracy_meters: point.accuracy_meters,
            recorded_at: Utc::now(),
        };
        tables.tracking.push(row.clone());
        Ok(Some(row))
    }

    async fn update_driver_location(
        &self,
        driver_id: Uuid,
        position: GeoPoint,
    ) -> Result<(), Error> {
        let mut tables = self.lock();
        if !tables.driver_profiles.iter().any(|p| p.user_id == driver_id) {
            tables.driver_profiles.push(DriverProfile {
                user_id: driver_id,
                license_number: None,
                license_expiry: None,
                is_verified: false,
            });
        }
        let now = Some(Utc::now());
        match tables.driver_locations.iter_mut().find(|l| l.user_id == driver_id) {
            Some(location) => {
                location.current_lat = Some(position.lat);
                location.current_lng = Some(position.lng);
                location.last_location_update = now;
            }
            None => tables.driver_locations.push(DriverLocation {
                user_id: driver_id,
                current_lat: Some(position.lat),
                current_lng: Some(position.lng),
                last_location_update: now,
            }),
        }
        Ok(())
    }

    async fn get_driver_location(
        &self,
        driver_id: Uuid,
    ) -> Result<Option<DriverLocation>, Error> {
        Ok(self
            .lock()
            .driver_locations
            .iter()
            .find(|l| l.user_id == driver_id)
            .cloned())
    }

    async fn get_recent_tracking_points(
        &self,
        job_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TrackingPoint>, Error> {
        // Insertion order breaks ties between identical timestamps.
        let mut points: Vec<TrackingPoint> = self
            .lock()
            .tracking
            .iter()
            .filter(|p| p.job_id == job_id)
            .cloned()
            .collect();
        points.reverse();
        points.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        points.truncate(limit.max(0) as usize);
        Ok(points)
    }
}

#[async_trait]
impl PaymentExt for MemoryStore {
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, Error> {
        let now = Utc::now();
        let row = Payment {
            id: Uuid::new_v4(),
            job_id: payment.job_id,
            client_id: payment.client_id,
            amount: payment.amount,
            payment_method: payment.payment_method,
            payment_status: PaymentStatus::Pending,
            phone_number: payment.phone_number,
            transaction_reference: payment.transaction_reference,
            receipt_number: None,
            payment_date: None,
            created_at: now,
            updated_at: now,
        };
        self.lock().payments.push(row.clone());
        Ok(row)
    }

    async fn get_payments_for_job(&self, job_id: Uuid) -> Result<Vec<Payment>, Error> {
        let mut payments: Vec<Payment> = self
            .lock()
            .payments
            .iter()
            .filter(|p| p.job_id == job_id)
            .cloned()
            .collect();
        payments.reverse();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn get_completed_payment_for_job(
        &self,
        job_id: Uuid,
    ) -> Result<Option<Payment>, Error> {
        Ok(self
            .lock()
            .payments
            .iter()
            .find(|p| p.job_id == job_id && p.payment_status == PaymentStatus::Completed)
            .cloned())
    }

    async fn get_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, Error> {
        Ok(self
            .lock()
            .payments
            .iter()
            .find(|p| p.transaction_reference == reference)
            .cloned())
    }

    async fn complete_payment(
        &self,
        reference: &str,
        receipt_number: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Payment>, Error> {
        let mut tables = self.lock();
        let Some(index) = tables.payments.iter().position(|p| {
            p.transaction_reference == reference && p.payment_status == PaymentStatus::Pending
        }) else {
            return Ok(None);
        };
        let job_id = tables.payments[index].job_id;
        let already_paid = tables
            .payments
            .iter()
            .any(|p| p.job_id == job_id && p.payment_status == PaymentStatus::Completed);

        let payment = &mut tables.payments[index];
        payment.payment_status = if already_paid {
            PaymentStatus::Duplicate
        } else {
            PaymentStatus::Completed
        };
        payment.receipt_number = receipt_number;
        payment.payment_date = Some(paid_at);
        payment.updated_at = Utc::now();
        Ok(Some(payment.clone()))
    }

    async fn fail_payment(&self, reference: &str) -> Result<Option<Payment>, Error> {
        let mut tables = self.lock();
        let Some(payment) = tables.payments.iter_mut().find(|p| {
            p.transaction_reference == reference && p.payment_status == PaymentStatus::Pending
        }) else {
            return Ok(None);
        };
        payment.payment_status = PaymentStatus::Failed;
        payment.updated_at = Utc::now();
        Ok(Some(payment.clone()))
    }
}

fn newest_first(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.reverse();
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    jobs
}
