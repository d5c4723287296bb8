// handler/driver.rs
use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{dtos::ApiResponse, error::HttpError, middleware::JWTAuthMiddeware, AppState};

pub fn driver_handler() -> Router {
    Router::new().route("/earnings", get(get_driver_earnings))
}

pub async fn get_driver_earnings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let earnings = app_state.job_service.driver_earnings(auth.user.id).await?;

    Ok(Json(ApiResponse::success(
        "Earnings retrieved successfully",
        earnings,
    )))
}
