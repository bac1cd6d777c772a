//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::models::{AppointmentStatus, PaymentMethod};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

fn conversion_error<E>(e: E) -> SqlError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

fn invalid(what: &str, value: &str) -> SqlError {
    conversion_error(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid {what}: {value}"),
    ))
}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(conversion_error)
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

/// Parse a calendar date stored as YYYY-MM-DD
pub fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(conversion_error)
}

/// Parse a time of day stored as HH:MM
pub fn parse_time(s: &str) -> Result<NaiveTime, SqlError> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(conversion_error)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn parse_status(s: &str) -> Result<AppointmentStatus, SqlError> {
    AppointmentStatus::parse(s).ok_or_else(|| invalid("status", s))
}

pub fn parse_payment(s: &str) -> Result<PaymentMethod, SqlError> {
    PaymentMethod::parse(s).ok_or_else(|| invalid("payment method", s))
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_and_time_round_trip() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        let time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_eq!(parse_date(&format_date(date)).unwrap(), date);
        assert_eq!(parse_time(&format_time(time)).unwrap(), time);
    }

    #[test]
    fn bad_status_is_a_conversion_error() {
        assert!(matches!(
            parse_status("lost"),
            Err(SqlError::FromSqlConversionFailure(..))
        ));
    }
}
