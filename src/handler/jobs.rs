// handler/jobs.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        jobdtos::{CreateJobDto, JobActionDto, JobListQuery},
        ApiResponse,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn jobs_handler() -> Router {
    Router::new()
        .route("/", get(list_jobs))
        .route(
            "/",
            post(create_job).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Client])
            })),
        )
        .route(
            "/available",
            get(get_available_jobs).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Driver])
            })),
        )
        .route("/:job_id", get(get_job_details))
        .route("/:job_id", patch(update_job_status))
}

pub async fn list_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<JobListQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.job_service.list_jobs(&auth.user, params.status).await?;

    Ok(Json(ApiResponse::success("Jobs retrieved successfully", jobs)))
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state.job_service.create_job(auth.user.id, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Job created successfully", job)),
    ))
}

pub async fn get_available_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.job_service.available_jobs().await?;

    Ok(Json(ApiResponse::success(
        "Available jobs retrieved successfully",
        jobs,
    )))
}

pub async fn get_job_details(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let details = app_state.job_service.get_job_details(&auth.user, job_id).await?;

    Ok(Json(ApiResponse::success("Job retrieved successfully", details)))
}

pub async fn update_job_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<JobActionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .apply_action(&auth.user, job_id, body.action)
        .await?;

    let message = format!("Job {} successful", body.action.to_str());
    Ok(Json(ApiResponse::success(&message, job)))
}
