use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{error::HttpError, models::jobmodel::JobStatus};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Material {0} not found")]
    MaterialNotFound(Uuid),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("User {0} has no driver profile")]
    DriverProfileNotFound(Uuid),

    #[error("No payment found for {0}")]
    PaymentNotFound(String),

    #[error("User {0} is not authorized to perform this action on job {1}")]
    NotAuthorized(Uuid, Uuid),

    #[error("Job {0} is {1:?}: {2}")]
    InvalidState(Uuid, JobStatus, String),

    #[error("Job {0} can no longer be updated: {1}")]
    InvalidTransition(Uuid, String),

    #[error("Job {0} has already been paid")]
    AlreadyPaid(Uuid),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) | ServiceError::InvalidState(_, _, _) => {
                StatusCode::BAD_REQUEST
            }

            ServiceError::JobNotFound(_)
            | ServiceError::MaterialNotFound(_)
            | ServiceError::UserNotFound(_)
            | ServiceError::DriverProfileNotFound(_)
            | ServiceError::PaymentNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::NotAuthorized(_, _) => StatusCode::FORBIDDEN,

            ServiceError::InvalidTransition(_, _) | ServiceError::AlreadyPaid(_) => {
                StatusCode::CONFLICT
            }

            ServiceError::ExternalService(_) => StatusCode::BAD_GATEWAY,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match error {
            // Driver-facing wording for a lost dispatch race or a job that moved on.
            ServiceError::InvalidTransition(_, _) => {
                HttpError::new("Job no longer available for this action", status)
            }
            ServiceError::Database(ref e) => {
                tracing::error!(error = %e, "database error");
                HttpError::server_error("Internal server error")
            }
            _ => HttpError::new(error.to_string(), status),
        }
    }
}
