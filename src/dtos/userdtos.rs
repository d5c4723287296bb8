// dtos/userdtos.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::usermodel::{ClientProfile, DriverProfile, User};

/// A user row with whichever role profiles exist for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: User,
    pub client_profile: Option<ClientProfile>,
    pub driver_profile: Option<DriverProfile>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminUserAction {
    ToggleActive,
    VerifyDriver,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminUserActionDto {
    pub user_id: Uuid,
    pub action: AdminUserAction,
}

#[derive(Debug, Serialize)]
pub struct AdminUserUpdateDto {
    pub message: String,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_profile: Option<DriverProfile>,
}
