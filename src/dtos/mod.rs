pub mod jobdtos;
pub mod paymentdtos;
pub mod userdtos;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

fn validate_kenyan_phone(phone: &str) -> Result<(), validator::ValidationError> {
    if crate::utils::phone::is_valid_kenyan_phone(phone) {
        Ok(())
    } else {
        Err(validator::ValidationError::new(
            "Invalid Kenyan phone number. Use format 0712345678 or +254712345678",
        ))
    }
}
