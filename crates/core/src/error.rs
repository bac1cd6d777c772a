//! Error types for Salon Core

use chrono::{NaiveDate, NaiveTime};
use rusqlite::ErrorCode;
use thiserror::Error;
use uuid::Uuid;

use crate::models::AppointmentStatus;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// True when the database refused the operation because another writer
    /// holds the lock.
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            Error::Database(rusqlite::Error::SqliteFailure(e, _))
                if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        )
    }

    /// True for unique/check constraint failures.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome taxonomy of the booking write path.
///
/// Every variant is an expected result the caller branches on; `SlotTaken`
/// and `InvalidSlot` mean "recompute slots and ask again", `StoreUnavailable`
/// means "the store itself failed, retrying may help".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("Slot {date} {time} is already taken for staff {staff_id}")]
    SlotTaken {
        staff_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    },

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl BookingError {
    /// Only store failures are worth retrying without user involvement.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::StoreUnavailable(_))
    }
}

impl From<Error> for BookingError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(what) => BookingError::NotFound(what),
            Error::PermissionDenied(why) | Error::Authentication(why) => {
                BookingError::PermissionDenied(why)
            }
            other => BookingError::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::os::raw::c_int) -> Error {
        Error::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            None,
        ))
    }

    #[test]
    fn busy_is_contention() {
        let err = sqlite_failure(rusqlite::ffi::SQLITE_BUSY);
        assert!(err.is_contention());
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn constraint_is_detected() {
        let err = sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT);
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn infra_errors_map_to_store_unavailable() {
        let err: BookingError = sqlite_failure(rusqlite::ffi::SQLITE_BUSY).into();
        assert!(err.is_retryable());

        let err: BookingError = Error::NotFound("appointment".into()).into();
        assert_eq!(err, BookingError::NotFound("appointment".into()));
        assert!(!err.is_retryable());
    }
}
