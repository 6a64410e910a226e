//! REST API endpoints.
//!
//! Axum-based HTTP API over the dashboard assemblers: leaderboards,
//! top movers, batch history and league metadata.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::query::window::PeriodWindow;
use crate::query::QueryError;

pub mod routes;
pub mod state;

pub use routes::build_router;

/// Longest date range a single request may cover.
pub const MAX_WINDOW_DAYS: i64 = 366;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Timeout(String),

    #[error("Internal error")]
    Internal,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "QUERY_TIMEOUT"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// The timeout message is user-actionable and passed through; everything
/// else surfaces as a generic failure, the details stay in the logs.
impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Timeout { .. } => ApiError::Timeout(err.to_string()),
            QueryError::Filter(_) | QueryError::Database(_) | QueryError::Serialization(_) => {
                tracing::error!(error = %err, "dashboard query failed");
                ApiError::Internal
            }
        }
    }
}

// ── Shared parameter parsing ────────────────────────────────────────────────

/// Parse and validate an inclusive ISO date window.
pub fn parse_window(start: &str, end: &str) -> Result<PeriodWindow, ApiError> {
    let start = parse_date(start, "startDate")?;
    let end = parse_date(end, "endDate")?;
    if start > end {
        return Err(ApiError::BadRequest(
            "startDate must not be after endDate".to_string(),
        ));
    }
    let window = PeriodWindow::new(start, end);
    if window.days() > MAX_WINDOW_DAYS {
        return Err(ApiError::BadRequest(format!(
            "date range exceeds {} days",
            MAX_WINDOW_DAYS
        )));
    }
    Ok(window)
}

fn parse_date(s: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("{field} must be an ISO date (YYYY-MM-DD)")))
}

/// Parse a comma-separated id list, e.g. `"1,2,3"`.
pub fn parse_id_list(raw: &str, field: &str) -> Result<Vec<i64>, ApiError> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("{field} must be a list of ids")))
        })
        .collect()
}

/// Parse a comma-separated role list, case-insensitively.
pub fn parse_role_list(raw: &str) -> Result<Vec<crate::models::Role>, ApiError> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            crate::models::Role::parse(&s.trim().to_ascii_uppercase())
                .ok_or_else(|| ApiError::BadRequest(format!("unknown role: {}", s.trim())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_valid() {
        let w = parse_window("2024-01-08", "2024-01-14").unwrap();
        assert_eq!(w.days(), 7);
    }

    #[test]
    fn test_parse_window_rejects_inverted_range() {
        let err = parse_window("2024-01-14", "2024-01-08").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_parse_window_rejects_bad_format() {
        assert!(parse_window("14/01/2024", "2024-01-14").is_err());
        assert!(parse_window("2024-01-08", "not-a-date").is_err());
    }

    #[test]
    fn test_parse_window_rejects_oversized_span() {
        let err = parse_window("2023-01-01", "2024-06-01").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_parse_role_list_case_insensitive() {
        use crate::models::Role;
        assert_eq!(
            parse_role_list("top,JUNGLE, mid").unwrap(),
            vec![Role::Top, Role::Jungle, Role::Mid]
        );
        assert!(parse_role_list("coach").is_err());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2, 3", "teamIds").unwrap(), vec![1, 2, 3]);
        assert!(parse_id_list("1,x", "teamIds").is_err());
        assert!(parse_id_list("", "teamIds").unwrap().is_empty());
    }

    #[test]
    fn test_timeout_maps_to_504_with_message() {
        let err: ApiError = QueryError::Timeout {
            operation: "leaderboard:teams".to_string(),
            timeout_ms: 10_000,
        }
        .into();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_database_error_surfaces_generic() {
        let err: ApiError = QueryError::Database(sqlx::Error::PoolClosed).into();
        assert!(matches!(err, ApiError::Internal));
    }
}
