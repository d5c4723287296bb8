// handler/delivery.rs
use std::sync::Arc;

use axum::{
    extract::Query,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{
        jobdtos::{JobIdQuery, ProofOfDeliveryDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn delivery_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(submit_proof_of_delivery).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Driver])
            })),
        )
        .route("/", get(get_proof_of_delivery))
}

pub async fn submit_proof_of_delivery(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<ProofOfDeliveryDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let confirmation = app_state
        .delivery_service
        .confirm_delivery(auth.user.id, body)
        .await?;

    Ok(Json(ApiResponse::success(
        "Delivery confirmed successfully",
        confirmation,
    )))
}

pub async fn get_proof_of_delivery(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<JobIdQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let proof = app_state
        .delivery_service
        .get_proof_of_delivery(&auth.user, params.job_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Proof of delivery retrieved successfully",
        proof,
    )))
}
