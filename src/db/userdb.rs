// db/userdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::{ClientProfile, DriverProfile, User, UserCounts};

const USER_COLUMNS: &str = "id, email, full_name, phone, role, is_active, created_at";

#[async_trait]
pub trait UserExt {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error>;

    async fn get_user_counts(&self) -> Result<UserCounts, Error>;

    /// Newest first.
    async fn get_all_users(&self) -> Result<Vec<User>, Error>;

    async fn get_client_profiles(&self) -> Result<Vec<ClientProfile>, Error>;

    async fn get_driver_profiles(&self) -> Result<Vec<DriverProfile>, Error>;

    /// Flips `is_active`; `None` when the user does not exist.
    async fn toggle_user_active(&self, user_id: Uuid) -> Result<Option<User>, Error>;

    /// `None` when the user has no driver profile.
    async fn verify_driver(&self, user_id: Uuid) -> Result<Option<DriverProfile>, Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_counts(&self) -> Result<UserCounts, Error> {
        sqlx::query_as::<_, UserCounts>(
            r#"
            SELECT
                COUNT(*)::BIGINT AS total,
                COUNT(*) FILTER (WHERE role = 'client')::BIGINT AS clients,
                COUNT(*) FILTER (WHERE role = 'driver')::BIGINT AS drivers
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    async fn get_all_users(&self) -> Result<Vec<User>, Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_client_profiles(&self) -> Result<Vec<ClientProfile>, Error> {
        sqlx::query_as::<_, ClientProfile>(
            "SELECT user_id, company_name, business_type FROM client_profiles",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_driver_profiles(&self) -> Result<Vec<DriverProfile>, Error> {
        sqlx::query_as::<_, DriverProfile>(
            "SELECT user_id, license_number, license_expiry, is_verified FROM driver_profiles",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn toggle_user_active(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = NOT is_active WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn verify_driver(&self, user_id: Uuid) -> Result<Option<DriverProfile>, Error> {
        sqlx::query_as::<_, DriverProfile>(
            r#"
            UPDATE driver_profiles
            SET is_verified = TRUE
            WHERE user_id = $1
            RETURNING user_id, license_number, license_expiry, is_verified
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
