//! Scheduling error taxonomy
//!
//! Every failure the route-assembly surface can report. None of these are
//! retried automatically; a retry without a change would reproduce the
//! same answer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// A referenced shift/vehicle/route/employee/stop does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The entity exists but cannot take the operation (no driver,
    /// illegal status transition).
    #[error("{0}")]
    InvalidState(String),

    /// The request itself is malformed (duration over the ceiling, empty
    /// stop list).
    #[error("{0}")]
    InvalidArgument(String),

    /// Availability overlap, already-assigned employee, already-attached
    /// stop. The message carries the counts/reason for the end user.
    #[error("{0}")]
    Conflict(String),

    #[error("route is at vehicle capacity ({capacity})")]
    CapacityExceeded { capacity: i32 },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ScheduleError {
    /// Wire code used in NATS error responses
    pub fn code(&self) -> &'static str {
        match self {
            ScheduleError::NotFound(_) => "NOT_FOUND",
            ScheduleError::InvalidState(_) => "INVALID_STATE",
            ScheduleError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ScheduleError::Conflict(_) => "CONFLICT",
            ScheduleError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            ScheduleError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ScheduleError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(ScheduleError::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(
            ScheduleError::CapacityExceeded { capacity: 4 }.code(),
            "CAPACITY_EXCEEDED"
        );
    }

    #[test]
    fn test_capacity_message_names_the_limit() {
        let error = ScheduleError::CapacityExceeded { capacity: 12 };
        assert_eq!(error.to_string(), "route is at vehicle capacity (12)");
    }
}
