// handler/catalog.rs
use std::sync::Arc;

use axum::{response::IntoResponse, routing::{get, post}, Extension, Json, Router};
use validator::Validate;

use crate::{
    dtos::{jobdtos::PriceCalculationDto, ApiResponse},
    error::HttpError,
    AppState,
};

pub fn materials_handler() -> Router {
    Router::new().route("/", get(list_materials))
}

pub fn pricing_handler() -> Router {
    Router::new().route("/calculate", post(calculate_price))
}

pub async fn list_materials(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let materials = app_state.job_service.list_materials().await?;

    Ok(Json(ApiResponse::success(
        "Materials retrieved successfully",
        materials,
    )))
}

pub async fn calculate_price(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<PriceCalculationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let quote = app_state.job_service.calculate_price(&body).await?;

    Ok(Json(ApiResponse::success("Price calculated successfully", quote)))
}
