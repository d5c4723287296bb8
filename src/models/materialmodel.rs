use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

/// Catalog entry. Maintained outside this service; jobs snapshot the weight and
/// handling fee at booking time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub unit_type: String,
    pub unit_weight_kg: BigDecimal,
    pub handling_fee_per_unit: BigDecimal,
    pub requires_straps: bool,
    pub requires_tarp: bool,
    pub is_fragile: bool,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
