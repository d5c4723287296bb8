use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validate_kenyan_phone;
use crate::{
    models::{
        jobmodel::*,
        usermodel::DriverLocation,
    },
    service::job_state::JobAction,
};

pub const MAX_STOPS_PER_JOB: u64 = 5;
pub const MAX_TRACKING_POINTS: i64 = 100;

// Pricing DTOs
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MaterialSelectionDto {
    pub material_id: Uuid,

    #[validate(range(min = 1, max = 10000, message = "Quantity must be a positive number"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PriceCalculationDto {
    #[validate(range(min = 0.1, max = 1000.0, message = "Distance must be between 0.1 and 1000 km"))]
    pub distance_km: f64,

    #[validate(length(min = 1, max = 20, message = "Between 1 and 20 materials are required"))]
    #[validate]
    pub materials: Vec<MaterialSelectionDto>,
}

// Job DTOs
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobStopDto {
    pub stop_type: StopType,

    #[validate(length(min = 3, max = 500, message = "Address must be between 3 and 500 characters"))]
    pub address: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub lng: f64,

    #[validate(length(max = 255, message = "Contact name is too long"))]
    pub contact_name: Option<String>,

    #[validate(custom = "validate_kenyan_phone")]
    pub contact_phone: Option<String>,

    #[serde(default)]
    pub is_difficult_access: bool,

    #[validate(length(max = 500, message = "Access notes must be under 500 characters"))]
    pub access_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJobDto {
    #[validate(length(min = 2, max = 5, message = "A job needs a pickup and 1 to 4 delivery stops"))]
    #[validate]
    pub stops: Vec<JobStopDto>,

    #[validate(length(min = 1, max = 20, message = "Between 1 and 20 materials are required"))]
    #[validate]
    pub materials: Vec<MaterialSelectionDto>,

    #[validate(range(min = 0.1, max = 1000.0, message = "Distance must be between 0.1 and 1000 km"))]
    pub total_distance_km: f64,

    pub scheduled_pickup_time: Option<DateTime<Utc>>,

    #[validate(length(max = 1000, message = "Special instructions must be under 1000 characters"))]
    pub special_instructions: Option<String>,

    #[serde(default)]
    pub overweight_acknowledged: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobActionDto {
    pub action: JobAction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
}

// Tracking DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TrackingUpdateDto {
    pub job_id: Uuid,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,

    #[validate(range(min = 0.0, max = 200.0, message = "Speed must be between 0 and 200 km/h"))]
    pub speed_kmh: Option<f64>,

    #[validate(range(min = 0.0, max = 360.0, message = "Heading must be between 0 and 360 degrees"))]
    pub heading: Option<f64>,

    #[validate(range(min = 0.0, message = "Accuracy must be positive"))]
    pub accuracy_meters: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackingQuery {
    pub job_id: Uuid,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackingHistoryDto {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub points: Vec<TrackingPoint>,
    pub driver_location: Option<DriverLocation>,
}

// Proof of delivery DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProofOfDeliveryDto {
    pub job_id: Uuid,

    #[validate(length(min = 2, max = 255, message = "Recipient name must be between 2 and 255 characters"))]
    pub recipient_name: String,

    #[validate(custom = "validate_kenyan_phone")]
    pub recipient_phone: Option<String>,

    #[validate(length(max = 1000, message = "Notes must be under 1000 characters"))]
    pub notes: Option<String>,

    /// Base64 JPEG, optionally as a data URL.
    pub photo_base64: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobIdQuery {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryConfirmationDto {
    pub job: Job,
    pub proof_of_delivery: ProofOfDelivery,
}

// Driver and admin DTOs
#[derive(Debug, Serialize, Deserialize)]
pub struct DriverJobEarning {
    pub job_id: Uuid,
    pub job_number: String,
    pub total_amount: sqlx::types::BigDecimal,
    pub earnings: sqlx::types::BigDecimal,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DriverEarningsDto {
    pub completed_jobs: i64,
    pub total_earnings: sqlx::types::BigDecimal,
    pub earnings_percentage: sqlx::types::BigDecimal,
    pub jobs: Vec<DriverJobEarning>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminStatsDto {
    pub jobs: JobCounts,
    pub users: crate::models::usermodel::UserCounts,
    pub revenue: RevenueSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(stop_type: StopType) -> JobStopDto {
        JobStopDto {
            stop_type,
            address: "Mombasa Road, Nairobi".to_string(),
            lat: -1.3,
            lng: 36.8,
            contact_name: None,
            contact_phone: Some("0712345678".to_string()),
            is_difficult_access: false,
            access_notes: None,
        }
    }

    fn job_dto() -> CreateJobDto {
        CreateJobDto {
            stops: vec![stop(StopType::Pickup), stop(StopType::Delivery)],
            materials: vec![MaterialSelectionDto { material_id: Uuid::new_v4(), quantity: 4 }],
            total_distance_km: 15.0,
            scheduled_pickup_time: None,
            special_instructions: None,
            overweight_acknowledged: false,
        }
    }

    #[test]
    fn test_create_job_dto_validation() {
        assert!(job_dto().validate().is_ok());

        let mut dto = job_dto();
        dto.stops.truncate(1);
        assert!(dto.validate().is_err());

        let mut dto = job_dto();
        dto.stops[1].lat = 95.0;
        assert!(dto.validate().is_err());

        let mut dto = job_dto();
        dto.stops[0].contact_phone = Some("12345".to_string());
        assert!(dto.validate().is_err());

        let mut dto = job_dto();
        dto.materials[0].quantity = 0;
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_tracking_dto_validation() {
        let dto = TrackingUpdateDto {
            job_id: Uuid::new_v4(),
            latitude: -1.29,
            longitude: 36.82,
            speed_kmh: Some(45.0),
            heading: Some(180.0),
            accuracy_meters: Some(8.0),
        };
        assert!(dto.validate().is_ok());

        let too_fast = TrackingUpdateDto { speed_kmh: Some(250.0), ..dto };
        assert!(too_fast.validate().is_err());
    }

    #[test]
    fn test_job_action_deserializes_snake_case() {
        let dto: JobActionDto = serde_json::from_str(r#"{"action":"start_transit"}"#).unwrap();
        assert_eq!(dto.action, JobAction::StartTransit);
        assert!(serde_json::from_str::<JobActionDto>(r#"{"action":"teleport"}"#).is_err());
    }
}
