// service/mpesa.rs
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::MpesaConfig,
    models::paymentmodel::ChargeOutcome,
    service::error::ServiceError,
    utils::phone::to_msisdn,
};

/// Safaricom reports times in East Africa Time.
const EAT_OFFSET_HOURS: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChargeRequest {
    pub phone_number: String,
    /// Whole shillings.
    pub amount: i64,
    pub account_reference: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChargeSession {
    /// CheckoutRequestID, the correlation key for the callback.
    pub session_id: String,
    pub merchant_request_id: String,
    pub customer_message: String,
}

/// One parsed STK callback.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackResult {
    pub checkout_request_id: String,
    pub outcome: ChargeOutcome,
    pub amount: Option<f64>,
    pub phone_number: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate_charge(&self, request: ChargeRequest) -> Result<ChargeSession, ServiceError>;

    async fn query_charge(&self, session_id: &str) -> Result<ChargeOutcome, ServiceError>;
}

pub struct MpesaGateway {
    config: MpesaConfig,
    client: reqwest::Client,
}

impl MpesaGateway {
    pub fn new(config: MpesaConfig, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client for M-Pesa: {}", e);
                reqwest::Client::new()
            });

        Self { config, client }
    }

    async fn access_token(&self) -> Result<String, ServiceError> {
        let response = self
            .client
            .get(format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                self.config.base_url()
            ))
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalService(format!("M-Pesa auth request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalService(
                "Failed to generate M-Pesa access token".to_string(),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalService(format!("Invalid M-Pesa auth response: {}", e)))?;

        body["access_token"]
            .as_str()
            .map(|token| token.to_string())
            .ok_or_else(|| ServiceError::ExternalService("M-Pesa returned no access token".to_string()))
    }

    fn password(&self, timestamp: &str) -> String {
        stk_password(&self.config.business_short_code, &self.config.passkey, timestamp)
    }

    async fn post_json(&self, path: &str, token: &str, payload: &Value) -> Result<Value, ServiceError> {
        let response = self
            .client
            .post(format!("{}{}", self.config.base_url(), path))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalService(format!("M-Pesa request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalService(format!("Invalid M-Pesa response: {}", e)))?;

        // The query endpoint answers 500 while the customer is still on the prompt,
        // so non-2xx bodies are handed back for inspection.
        if !status.is_success() && body.get("errorCode").is_none() {
            return Err(ServiceError::ExternalService(format!(
                "M-Pesa responded with {}",
                status
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl PaymentGateway for MpesaGateway {
    async fn initiate_charge(&self, request: ChargeRequest) -> Result<ChargeSession, ServiceError> {
        let phone = to_msisdn(&request.phone_number).map_err(ServiceError::Validation)?;
        let token = self.access_token().await?;
        let timestamp = stk_timestamp(Utc::now());

        let payload = serde_json::json!({
            "BusinessShortCode": self.config.business_short_code,
            "Password": self.password(&timestamp),
            "Timestamp": timestamp,
            "TransactionType": "CustomerPayBillOnline",
            "Amount": request.amount,
            "PartyA": phone,
            "PartyB": self.config.business_short_code,
            "PhoneNumber": phone,
            "CallBackURL": self.config.callback_url,
            "AccountReference": request.account_reference,
            "TransactionDesc": request.description,
        });

        let body = self
            .post_json("/mpesa/stkpush/v1/processrequest", &token, &payload)
            .await?;

        if body["ResponseCode"].as_str() != Some("0") {
            let reason = body["ResponseDescription"]
                .as_str()
                .or_else(|| body["errorMessage"].as_str())
                .unwrap_or("M-Pesa STK Push failed");
            return Err(ServiceError::ExternalService(reason.to_string()));
        }

        let session_id = body["CheckoutRequestID"].as_str().unwrap_or("").to_string();
        if session_id.is_empty() {
            return Err(ServiceError::ExternalService(
                "M-Pesa returned no CheckoutRequestID".to_string(),
            ));
        }

        tracing::info!(session_id = %session_id, amount = request.amount, "STK push initiated");

        Ok(ChargeSession {
            session_id,
            merchant_request_id: body["MerchantRequestID"].as_str().unwrap_or("").to_string(),
            customer_message: body["CustomerMessage"]
                .as_str()
                .unwrap_or("Check your phone to complete payment")
                .to_string(),
        })
    }

    async fn query_charge(&self, session_id: &str) -> Result<ChargeOutcome, ServiceError> {
        let token = self.access_token().await?;
        let timestamp = stk_timestamp(Utc::now());

        let payload = serde_json::json!({
            "BusinessShortCode": self.config.business_short_code,
            "Password": self.password(&timestamp),
            "Timestamp": timestamp,
            "CheckoutRequestID": session_id,
        });

        let body = self
            .post_json("/mpesa/stkpushquery/v1/query", &token, &payload)
            .await?;

        Ok(parse_query_response(&body))
    }
}

/// `YYYYMMDDHHmmss` in East Africa Time.
pub fn stk_timestamp(now: DateTime<Utc>) -> String {
    (now + chrono::Duration::hours(EAT_OFFSET_HOURS))
        .format("%Y%m%d%H%M%S")
        .to_string()
}

pub fn stk_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{}{}{}", short_code, passkey, timestamp))
}

/// Parses a `TransactionDate` such as `20240315143012` (EAT) into UTC.
pub fn parse_transaction_date(raw: &Value) -> Option<DateTime<Utc>> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };

    NaiveDateTime::parse_from_str(&text, "%Y%m%d%H%M%S")
        .ok()
        .map(|local| local.and_utc() - chrono::Duration::hours(EAT_OFFSET_HOURS))
}

/// Interprets a `Body.stkCallback` payload. `None` if it is not an STK callback.
pub fn parse_callback(payload: &Value) -> Option<CallbackResult> {
    let callback = payload.get("Body")?.get("stkCallback")?;
    let checkout_request_id = callback["CheckoutRequestID"].as_str()?.to_string();

    let result_code = match &callback["ResultCode"] {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    };

    let items = callback["CallbackMetadata"]["Item"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    let metadata = |name: &str| -> Option<Value> {
        items
            .iter()
            .find(|item| item["Name"].as_str() == Some(name))
            .and_then(|item| item.get("Value").cloned())
    };

    let outcome = if result_code == Some(0) {
        ChargeOutcome::Completed {
            receipt_number: metadata("MpesaReceiptNumber")
                .and_then(|v| v.as_str().map(|s| s.to_string())),
            paid_at: metadata("TransactionDate").and_then(|v| parse_transaction_date(&v)),
        }
    } else {
        ChargeOutcome::Failed {
            reason: callback["ResultDesc"]
                .as_str()
                .unwrap_or("Payment was not completed")
                .to_string(),
        }
    };

    Some(CallbackResult {
        checkout_request_id,
        outcome,
        amount: metadata("Amount").and_then(|v| v.as_f64()),
        phone_number: metadata("PhoneNumber").map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        }),
    })
}

/// Maps an STK query answer. A missing ResultCode means the customer has not
/// responded to the prompt yet.
pub fn parse_query_response(body: &Value) -> ChargeOutcome {
    let result_code = match &body["ResultCode"] {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    match result_code.as_deref() {
        Some("0") => ChargeOutcome::Completed {
            receipt_number: None,
            paid_at: None,
        },
        Some(_) => ChargeOutcome::Failed {
            reason: body["ResultDesc"]
                .as_str()
                .unwrap_or("Payment was not completed")
                .to_string(),
        },
        None => ChargeOutcome::Processing,
    }
}
