use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Accepted,
    InTransit,
    Delivered,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Accepted,
        JobStatus::InTransit,
        JobStatus::Delivered,
        JobStatus::Cancelled,
    ];

    pub fn to_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Accepted => "accepted",
            JobStatus::InTransit => "in_transit",
            JobStatus::Delivered => "delivered",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Delivered | JobStatus::Cancelled)
    }

    /// Statuses in which a job must carry a driver id.
    pub fn requires_driver(&self) -> bool {
        matches!(
            self,
            JobStatus::Accepted | JobStatus::InTransit | JobStatus::Delivered
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "stop_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StopType {
    Pickup,
    Delivery,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub job_number: String,
    pub client_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub status: JobStatus,

    pub total_distance_km: BigDecimal,
    pub estimated_duration_minutes: i32,

    pub base_fee: BigDecimal,
    pub distance_fee: BigDecimal,
    pub handling_fee: BigDecimal,
    pub subtotal: BigDecimal,
    pub platform_fee: BigDecimal,
    pub total_amount: BigDecimal,

    pub total_weight_kg: BigDecimal,
    pub is_overweight: bool,
    pub overweight_acknowledged: bool,
    pub requires_straps: bool,
    pub requires_tarp: bool,
    pub has_fragile_items: bool,
    pub special_instructions: Option<String>,

    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub actual_pickup_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A driver is attached exactly while the job is accepted, in transit or delivered.
    pub fn is_consistent(&self) -> bool {
        self.driver_id.is_some() == self.status.requires_driver()
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.driver_id == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobStop {
    pub id: Uuid,
    pub job_id: Uuid,
    pub stop_order: i32,
    pub stop_type: StopType,
    pub address: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub is_difficult_access: bool,
    pub access_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobMaterial {
    pub id: Uuid,
    pub job_id: Uuid,
    pub material_id: Uuid,
    pub quantity: i32,
    pub unit_weight_kg: BigDecimal,
    pub total_weight_kg: BigDecimal,
    pub handling_fee: BigDecimal,
    pub created_at: DateTime<Utc>,
}

/// Job together with its stops and material line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetails {
    #[serde(flatten)]
    pub job: Job,
    pub stops: Vec<JobStop>,
    pub materials: Vec<JobMaterial>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrackingPoint {
    pub id: Uuid,
    pub job_id: Uuid,
    pub driver_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    pub heading: f64,
    pub accuracy_meters: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProofOfDelivery {
    pub id: Uuid,
    pub job_id: Uuid,
    pub recipient_name: String,
    pub recipient_phone: Option<String>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Default, PartialEq)]
pub struct JobCounts {
    pub total: i64,
    pub pending: i64,
    pub active: i64,
    pub completed: i64,
    pub cancelled: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Default, PartialEq)]
pub struct RevenueSummary {
    /// Sum of total_amount over every delivered job.
    pub total_revenue: BigDecimal,
    /// Platform fees on jobs delivered since the start of the current month.
    pub platform_fees_this_month: BigDecimal,
}

/// Insert payloads. Ids and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewJobStop {
    pub stop_order: i32,
    pub stop_type: StopType,
    pub address: String,
    pub location: GeoPoint,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub is_difficult_access: bool,
    pub access_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewJobMaterial {
    pub material_id: Uuid,
    pub quantity: i32,
    pub unit_weight_kg: BigDecimal,
    pub total_weight_kg: BigDecimal,
    pub handling_fee: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_number: String,
    pub client_id: Uuid,
    pub total_distance_km: BigDecimal,
    pub estimated_duration_minutes: i32,
    pub base_fee: BigDecimal,
    pub distance_fee: BigDecimal,
    pub handling_fee: BigDecimal,
    pub subtotal: BigDecimal,
    pub platform_fee: BigDecimal,
    pub total_amount: BigDecimal,
    pub total_weight_kg: BigDecimal,
    pub is_overweight: bool,
    pub overweight_acknowledged: bool,
    pub requires_straps: bool,
    pub requires_tarp: bool,
    pub has_fragile_items: bool,
    pub special_instructions: Option<String>,
    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub stops: Vec<NewJobStop>,
    pub materials: Vec<NewJobMaterial>,
}

#[derive(Debug, Clone)]
pub struct NewTrackingPoint {
    pub job_id: Uuid,
    pub driver_id: Uuid,
    pub position: GeoPoint,
    pub speed_kmh: f64,
    pub heading: f64,
    pub accuracy_meters: f64,
}

#[derive(Debug, Clone)]
pub struct NewProofOfDelivery {
    pub recipient_name: String,
    pub recipient_phone: Option<String>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
}
