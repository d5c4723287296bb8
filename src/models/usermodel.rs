use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Driver,
    Admin,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Client => "client",
            UserRole::Driver => "driver",
            UserRole::Admin => "admin",
        }
    }
}

/// Account row owned by the identity provider. Read-only from this service.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct ClientProfile {
    pub user_id: Uuid,
    pub company_name: Option<String>,
    pub business_type: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct DriverProfile {
    pub user_id: Uuid,
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub is_verified: bool,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct DriverLocation {
    pub user_id: Uuid,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub last_location_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, Default, PartialEq)]
pub struct UserCounts {
    pub total: i64,
    pub clients: i64,
    pub drivers: i64,
}
