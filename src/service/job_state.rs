// service/job_state.rs
//
// Lifecycle table for jobs. The store layers turn `allowed_from` into the
// `WHERE status = ANY(..)` guard of a single conditional update, so the table
// here is the only place the legal transitions are written down.
use serde::{Deserialize, Serialize};

use crate::models::jobmodel::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    Accept,
    StartTransit,
    Deliver,
    Cancel,
}

impl JobAction {
    pub const ALL: [JobAction; 4] = [
        JobAction::Accept,
        JobAction::StartTransit,
        JobAction::Deliver,
        JobAction::Cancel,
    ];

    pub fn to_str(&self) -> &str {
        match self {
            JobAction::Accept => "accept",
            JobAction::StartTransit => "start_transit",
            JobAction::Deliver => "deliver",
            JobAction::Cancel => "cancel",
        }
    }

    /// Statuses the job must currently be in for this action to apply.
    pub fn allowed_from(&self) -> &'static [JobStatus] {
        match self {
            JobAction::Accept => &[JobStatus::Pending],
            JobAction::StartTransit => &[JobStatus::Accepted],
            JobAction::Deliver => &[JobStatus::InTransit],
            // Once the load is on the truck the job can only be delivered.
            JobAction::Cancel => &[JobStatus::Pending, JobStatus::Accepted],
        }
    }

    pub fn target(&self) -> JobStatus {
        match self {
            JobAction::Accept => JobStatus::Accepted,
            JobAction::StartTransit => JobStatus::InTransit,
            JobAction::Deliver => JobStatus::Delivered,
            JobAction::Cancel => JobStatus::Cancelled,
        }
    }

    /// Guard values in the form bound to the SQL `ANY($n)` parameter.
    pub fn guard_values(&self) -> Vec<String> {
        self.allowed_from()
            .iter()
            .map(|status| status.to_str().to_string())
            .collect()
    }
}

/// Status after applying `action` to a job in `current`, or `None` if the guard fails.
pub fn next_status(current: JobStatus, action: JobAction) -> Option<JobStatus> {
    if action.allowed_from().contains(&current) {
        Some(action.target())
    } else {
        None
    }
}
