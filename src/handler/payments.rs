// handler/payments.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Query,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    dtos::{
        jobdtos::JobIdQuery,
        paymentdtos::{InitiatePaymentDto, PaymentJobDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::{auth, role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn payments_handler() -> Router {
    let protected_routes = Router::new()
        .route(
            "/initiate",
            post(initiate_payment).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Client])
            })),
        )
        .route(
            "/refresh",
            post(refresh_payment).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Client])
            })),
        )
        .route("/status", get(get_payment_status))
        .layer(middleware::from_fn(auth));

    // Called by the gateway, no auth
    let public_routes = Router::new()
        .route("/callback", post(mpesa_callback).get(callback_health));

    Router::new().merge(protected_routes).merge(public_routes)
}

pub async fn initiate_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<InitiatePaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let initiated = app_state
        .payment_service
        .initiate_payment(auth.user.id, body)
        .await?;

    Ok(Json(ApiResponse::success(
        "Payment request sent. Check your phone to complete the payment",
        initiated,
    )))
}

pub async fn get_payment_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<JobIdQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let status = app_state
        .payment_service
        .payment_status(&auth.user, params.job_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Payment status retrieved successfully",
        status,
    )))
}

pub async fn refresh_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<PaymentJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    let status = app_state
        .payment_service
        .refresh_pending_payment(auth.user.id, body.job_id)
        .await?;

    Ok(Json(ApiResponse::success("Payment status refreshed", status)))
}

/// Always answers `ResultCode: 0`, even for bodies that are not JSON.
pub async fn mpesa_callback(
    Extension(app_state): Extension<Arc<AppState>>,
    body: Bytes,
) -> impl IntoResponse {
    let payload: Value = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "M-Pesa callback body is not valid JSON");
        Value::Null
    });

    Json(app_state.payment_service.handle_callback(&payload).await)
}

pub async fn callback_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "M-Pesa callback endpoint is active"
    }))
}
