// handler/admin.rs
use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::{get, patch},
    Extension, Json, Router,
};

use crate::{
    dtos::{userdtos::AdminUserActionDto, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/stats", get(get_admin_stats))
        .route("/users", get(get_users))
        .route("/users", patch(update_user))
}

pub async fn get_admin_stats(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state.job_service.admin_stats().await?;

    Ok(Json(ApiResponse::success("Stats retrieved successfully", stats)))
}

pub async fn get_users(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let users = app_state.admin_service.list_users().await?;

    Ok(Json(ApiResponse::success("Users retrieved successfully", users)))
}

pub async fn update_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<AdminUserActionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let updated = app_state.admin_service.update_user(&auth.user, body).await?;
    let message = updated.message.clone();

    Ok(Json(ApiResponse::success(&message, updated)))
}
