use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};

use crate::error::ApiError;
use crate::models::Operation;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCreateRequest {
    pub name: String,
    pub date: String,
    pub amount: f64,
    pub category_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationUpdateRequest {
    pub name: Option<String>,
    pub date: Option<String>,
    pub amount: Option<f64>,
    pub category_id: Option<i64>,
}

/// Listing filters. `author` may only name the actor; both time bounds
/// are inclusive.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationListQuery {
    pub author: Option<i64>,
    pub category_id: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub amount: f64,
    pub category_id: i64,
    pub owner_id: i64,
}

impl From<Operation> for OperationResponse {
    fn from(operation: Operation) -> Self {
        Self {
            id: operation.id,
            name: operation.name,
            date: operation.date,
            amount: operation.amount,
            category_id: operation.category_id,
            owner_id: operation.owner_id,
        }
    }
}

const NAIVE_DATETIME: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const NAIVE_DATE: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Parses a timestamp and normalizes it to UTC. A value carrying an
/// offset is converted; one without an offset is assumed to already be
/// UTC; a bare date means midnight UTC.
pub fn parse_utc(value: &str) -> Result<OffsetDateTime, ApiError> {
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(parsed.to_offset(time::UtcOffset::UTC));
    }
    if let Ok(parsed) = PrimitiveDateTime::parse(value, NAIVE_DATETIME) {
        return Ok(parsed.assume_utc());
    }
    if let Ok(parsed) = Date::parse(value, NAIVE_DATE) {
        return Ok(parsed.midnight().assume_utc());
    }
    Err(ApiError::Validation(format!(
        "could not parse timestamp '{value}'"
    )))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn rfc3339_with_offset_is_converted_to_utc() {
        let parsed = parse_utc("2024-12-25T03:00:00+03:00").unwrap();
        assert_eq!(parsed, datetime!(2024-12-25 00:00 UTC));
        assert!(parsed.offset().is_utc());
    }

    #[test]
    fn zulu_suffix_is_accepted() {
        let parsed = parse_utc("2024-12-25T00:00:00Z").unwrap();
        assert_eq!(parsed, datetime!(2024-12-25 00:00 UTC));
    }

    #[test]
    fn naive_datetime_is_assumed_utc() {
        let parsed = parse_utc("2024-12-25T12:30:00").unwrap();
        assert_eq!(parsed, datetime!(2024-12-25 12:30 UTC));
    }

    #[test]
    fn bare_date_means_midnight_utc() {
        let parsed = parse_utc("2024-12-25").unwrap();
        assert_eq!(parsed, datetime!(2024-12-25 00:00 UTC));
    }

    #[test]
    fn garbage_is_a_validation_error() {
        assert!(matches!(
            parse_utc("yesterday"),
            Err(ApiError::Validation(_))
        ));
    }
}
