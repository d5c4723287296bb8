// handler/tracking.rs
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
        jobdtos::{TrackingQuery, TrackingUpdateDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn tracking_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(record_position).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Driver])
            })),
        )
        .route("/", get(get_tracking_history))
}

pub async fn record_position(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<TrackingUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let point = app_state
        .tracking_service
        .record_position(auth.user.id, body)
        .await?;

    Ok(Json(ApiResponse::success("Location updated", point)))
}

pub async fn get_tracking_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<TrackingQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let history = app_state
        .tracking_service
        .recent_positions(&auth.user, params.job_id, params.limit)
        .await?;

    Ok(Json(ApiResponse::success(
        "Tracking history retrieved successfully",
        history,
    )))
}
