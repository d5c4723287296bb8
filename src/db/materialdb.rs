// db/materialdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::materialmodel::Material;

const MATERIAL_COLUMNS: &str = r#"
    id, name, category, unit_type, unit_weight_kg, handling_fee_per_unit,
    requires_straps, requires_tarp, is_fragile, description, is_active,
    created_at, updated_at
"#;

#[async_trait]
pub trait MaterialExt {
    async fn get_active_materials(&self) -> Result<Vec<Material>, Error>;

    /// Active materials among `ids`. Missing or retired ids are simply absent.
    async fn get_materials_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Material>, Error>;
}

#[async_trait]
impl MaterialExt for DBClient {
    async fn get_active_materials(&self) -> Result<Vec<Material>, Error> {
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE is_active = true ORDER BY category, name",
            MATERIAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_materials_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Material>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE id = ANY($1) AND is_active = true",
            MATERIAL_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }
}
