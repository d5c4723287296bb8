use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::Validate;

use super::validate_kenyan_phone;
use crate::models::paymentmodel::Payment;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct InitiatePaymentDto {
    pub job_id: Uuid,

    #[validate(custom = "validate_kenyan_phone")]
    pub phone_number: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentJobDto {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentInitiatedDto {
    pub payment_id: Uuid,
    pub checkout_request_id: String,
    pub customer_message: String,
    pub amount: BigDecimal,
    /// What the customer is actually prompted for.
    pub charged_amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentStatusDto {
    pub has_payment: bool,
    pub is_paid: bool,
    pub is_pending: bool,
    pub payment: Option<Payment>,
    pub all_payments: Vec<Payment>,
}

/// Acknowledgement body the gateway expects from the callback URL.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl CallbackAck {
    pub fn accepted(desc: &str) -> Self {
        Self {
            result_code: 0,
            result_desc: desc.to_string(),
        }
    }
}
