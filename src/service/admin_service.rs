// service/admin_service.rs
use std::{collections::HashMap, sync::Arc};

use uuid::Uuid;

use crate::{
    db::LogisticsStore,
    dtos::userdtos::{AdminUserAction, AdminUserActionDto, AdminUserUpdateDto, AdminUserView},
    models::usermodel::User,
    service::error::ServiceError,
};

pub struct AdminService {
    store: Arc<dyn LogisticsStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn LogisticsStore>) -> Self {
        Self { store }
    }

    /// Every account, newest first, joined with its role profiles.
    pub async fn list_users(&self) -> Result<Vec<AdminUserView>, ServiceError> {
        let (users, client_profiles, driver_profiles) = futures::try_join!(
            self.store.get_all_users(),
            self.store.get_client_profiles(),
            self.store.get_driver_profiles(),
        )?;

        let mut clients: HashMap<Uuid, _> =
            client_profiles.into_iter().map(|p| (p.user_id, p)).collect();
        let mut drivers: HashMap<Uuid, _> =
            driver_profiles.into_iter().map(|p| (p.user_id, p)).collect();

        Ok(users
            .into_iter()
            .map(|user| AdminUserView {
                client_profile: clients.remove(&user.id),
                driver_profile: drivers.remove(&user.id),
                user,
            })
            .collect())
    }

    pub async fn update_user(
        &self,
        admin: &User,
        dto: AdminUserActionDto,
    ) -> Result<AdminUserUpdateDto, ServiceError> {
        match dto.action {
            AdminUserAction::ToggleActive => {
                // The caller is active, so toggling themselves would only ever lock them out.
                if dto.user_id == admin.id {
                    return Err(ServiceError::Validation(
                        "You cannot deactivate your own account".to_string(),
                    ));
                }

                let user = self
                    .store
                    .toggle_user_active(dto.user_id)
                    .await?
                    .ok_or(ServiceError::UserNotFound(dto.user_id))?;

                tracing::info!(
                    admin_id = %admin.id,
                    user_id = %user.id,
                    is_active = user.is_active,
                    "User active flag changed"
                );

                let message = if user.is_active {
                    "User activated"
                } else {
                    "User deactivated"
                };

                Ok(AdminUserUpdateDto {
                    message: message.to_string(),
                    user,
                    driver_profile: None,
                })
            }
            AdminUserAction::VerifyDriver => {
                let user = self
                    .store
                    .get_user(dto.user_id)
                    .await?
                    .ok_or(ServiceError::UserNotFound(dto.user_id))?;

                let profile = self
                    .store
                    .verify_driver(user.id)
                    .await?
                    .ok_or(ServiceError::DriverProfileNotFound(user.id))?;

                tracing::info!(admin_id = %admin.id, user_id = %user.id, "Driver verified");

                Ok(AdminUserUpdateDto {
                    message: "Driver verified successfully".to_string(),
                    user,
                    driver_profile: Some(profile),
                })
            }
        }
    }
}
