//! League metadata for populating filter dropdowns.

use axum::extract::State;
use axum::Json;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::League;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<League>>, ApiError> {
    Ok(Json(state.service.active_leagues().await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::util::ServiceExt;

    use crate::api::build_router;
    use crate::api::state::AppState;
    use crate::config::{AppConfig, ServerConfig};
    use crate::dashboard::DashboardService;

    // A lazy pool never connects unless a query runs, so requests rejected
    // at the validation layer can be tested without a database.
    fn test_state() -> AppState {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        AppState {
            service: Arc::new(DashboardService::new(pool, &AppConfig::default())),
        }
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state(), &ServerConfig::default());
        let (status, json) = get_json(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_leaderboard_rejects_bad_dates() {
        let app = build_router(test_state(), &ServerConfig::default());
        let (status, json) = get_json(
            app,
            "/api/leaderboard/teams?startDate=2024-01-14&endDate=2024-01-08",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_leaderboard_rejects_missing_dates() {
        let app = build_router(test_state(), &ServerConfig::default());
        let (status, _) = get_json(app, "/api/leaderboard/players").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_movers_reject_unknown_view_mode() {
        let app = build_router(test_state(), &ServerConfig::default());
        let (status, json) = get_json(
            app,
            "/api/movers/gainers?startDate=2024-01-08&endDate=2024-01-14&viewMode=guilds",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("viewMode"));
    }

    #[tokio::test]
    async fn test_history_rejects_empty_ids() {
        let app = build_router(test_state(), &ServerConfig::default());
        let (status, _) = get_json(
            app,
            "/api/history/teams?startDate=2024-01-08&endDate=2024-01-14&ids=",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_rejects_oversized_span() {
        let app = build_router(test_state(), &ServerConfig::default());
        let (status, json) = get_json(
            app,
            "/api/history/players?startDate=2022-01-01&endDate=2024-01-01&ids=1",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]["message"].as_str().unwrap().contains("366"));
    }
}
